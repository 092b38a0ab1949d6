//! Outbound notifications produced by the simulation.
//!
//! The core never talks to sockets. Every operation returns a list of
//! [`Outbound`] values and the network layer decides how to deliver them.

use shared::{Packet, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    All,
    AllExcept(SessionId),
    Session(SessionId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipient: Recipient,
    pub packet: Packet,
}

impl Outbound {
    pub fn to_all(packet: Packet) -> Self {
        Self {
            recipient: Recipient::All,
            packet,
        }
    }

    pub fn to_all_except(session_id: SessionId, packet: Packet) -> Self {
        Self {
            recipient: Recipient::AllExcept(session_id),
            packet,
        }
    }

    pub fn to_session(session_id: SessionId, packet: Packet) -> Self {
        Self {
            recipient: Recipient::Session(session_id),
            packet,
        }
    }

    /// Whether a session with `session_id` should receive this notification.
    pub fn reaches(&self, session_id: SessionId) -> bool {
        match self.recipient {
            Recipient::All => true,
            Recipient::AllExcept(excluded) => excluded != session_id,
            Recipient::Session(target) => target == session_id,
        }
    }
}
