//! Session bookkeeping for the UDP gateway
//!
//! This module tracks which network address belongs to which session:
//! - Session id assignment and capacity limits
//! - Address lookup for incoming datagrams
//! - Liveness tracking and timeout detection
//!
//! A session outlives its snake. After elimination the session stays
//! registered and keeps receiving broadcasts until it disconnects, times out
//! or reconnects with a fresh `Connect`.

use log::info;
use shared::SessionId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client as seen by the transport layer
#[derive(Debug)]
pub struct Session {
    /// Identifier handed to the simulation
    pub id: SessionId,
    /// Where replies for this session are sent
    pub addr: SocketAddr,
    /// Last time any datagram arrived from this session
    pub last_seen: Instant,
}

impl Session {
    pub fn new(id: SessionId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing has been heard from this session within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Registry of live sessions.
///
/// Ids start at 1 and are never reused while the server runs, so a late
/// datagram can't be attributed to a newer session.
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
    next_session_id: SessionId,
    max_sessions: usize,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize, timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
            max_sessions,
            timeout,
        }
    }

    /// Registers a new session. Returns None when the server is full.
    pub fn add_session(&mut self, addr: SocketAddr) -> Option<SessionId> {
        if self.sessions.len() >= self.max_sessions {
            return None;
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        info!("Session {} opened from {}", session_id, addr);
        self.sessions.insert(session_id, Session::new(session_id, addr));

        Some(session_id)
    }

    /// Returns true if the session existed.
    pub fn remove_session(&mut self, session_id: &SessionId) -> bool {
        if let Some(session) = self.sessions.remove(session_id) {
            info!("Session {} closed", session.id);
            true
        } else {
            false
        }
    }

    pub fn find_session_by_addr(&self, addr: SocketAddr) -> Option<SessionId> {
        self.sessions
            .iter()
            .find(|(_, session)| session.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn addr_of(&self, session_id: &SessionId) -> Option<SocketAddr> {
        self.sessions.get(session_id).map(|session| session.addr)
    }

    /// Marks the session as alive. Returns false for unknown ids.
    pub fn touch(&mut self, session_id: &SessionId) -> bool {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.touch();
            true
        } else {
            false
        }
    }

    /// Removes every session that has gone quiet and returns their ids.
    pub fn check_timeouts(&mut self) -> Vec<SessionId> {
        let timeout = self.timeout;
        let timed_out: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for session_id in &timed_out {
            self.remove_session(session_id);
        }

        timed_out
    }

    /// All (session id, address) pairs, for broadcasting.
    pub fn session_addrs(&self) -> Vec<(SessionId, SocketAddr)> {
        self.sessions
            .iter()
            .map(|(id, session)| (*id, session.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    fn manager(max_sessions: usize) -> SessionManager {
        SessionManager::new(max_sessions, Duration::from_secs(5))
    }

    #[test]
    fn test_session_timeout() {
        let mut session = Session::new(1, test_addr());
        assert!(!session.is_timed_out(Duration::from_secs(1)));

        session.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(session.is_timed_out(Duration::from_secs(1)));

        session.touch();
        assert!(!session.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_add_sessions_assigns_increasing_ids() {
        let mut manager = manager(3);

        assert_eq!(manager.add_session(test_addr()), Some(1));
        assert_eq!(manager.add_session(test_addr2()), Some(2));
        assert_eq!(manager.len(), 2);
        assert!(!manager.is_empty());
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut manager = manager(3);

        let first = manager.add_session(test_addr()).unwrap();
        assert!(manager.remove_session(&first));
        let second = manager.add_session(test_addr()).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_capacity_limit() {
        let mut manager = manager(1);

        assert!(manager.add_session(test_addr()).is_some());
        assert!(manager.add_session(test_addr2()).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_nonexistent_session() {
        let mut manager = manager(2);
        assert!(!manager.remove_session(&999));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_find_session_by_addr() {
        let mut manager = manager(2);
        let id1 = manager.add_session(test_addr()).unwrap();
        let id2 = manager.add_session(test_addr2()).unwrap();

        assert_eq!(manager.find_session_by_addr(test_addr()), Some(id1));
        assert_eq!(manager.addr_of(&id2), Some(test_addr2()));

        let unknown: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(manager.find_session_by_addr(unknown), None);
        assert_eq!(manager.addr_of(&42), None);
    }

    #[test]
    fn test_check_timeouts_removes_quiet_sessions() {
        let mut manager = SessionManager::new(4, Duration::from_millis(500));
        let quiet = manager.add_session(test_addr()).unwrap();
        let active = manager.add_session(test_addr2()).unwrap();

        if let Some(session) = manager.sessions.get_mut(&quiet) {
            session.last_seen = Instant::now() - Duration::from_secs(1);
        }

        assert_eq!(manager.check_timeouts(), vec![quiet]);
        assert_eq!(manager.len(), 1);
        assert!(manager.touch(&active));
        assert!(!manager.touch(&quiet));
    }

    #[test]
    fn test_session_addrs() {
        let mut manager = manager(4);
        manager.add_session(test_addr());
        manager.add_session(test_addr2());

        let mut addrs = manager.session_addrs();
        addrs.sort_by_key(|(id, _)| *id);
        assert_eq!(addrs, vec![(1, test_addr()), (2, test_addr2())]);
    }
}
