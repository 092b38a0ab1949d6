//! UDP gateway: turns datagrams into simulation calls, runs the tick, and
//! delivers the simulation's outbound packets

use crate::config::ServerConfig;
use crate::events::{Outbound, Recipient};
use crate::game::GameState;
use crate::session_manager::SessionManager;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, SessionId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Client packets are small; anything bigger than this is dropped.
const RECV_BUFFER_SIZE: usize = 2048;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    SessionTimeout { session_id: SessionId },
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<SessionId>,
    },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    sessions: Arc<RwLock<SessionManager>>,
    game_state: GameState,
    tick_duration: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(config: &ServerConfig) -> Result<Self, BoxError> {
        let addr = config.bind_address();
        let socket = Arc::new(UdpSocket::bind(&addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            sessions: Arc::new(RwLock::new(SessionManager::new(
                config.max_sessions,
                config.session_timeout,
            ))),
            game_state: GameState::new(config.simulation()),
            tick_duration: config.tick_interval,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle that can stop [`Server::run`] from another task.
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; RECV_BUFFER_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let sessions = Arc::clone(&self.sessions);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let session_addrs = {
                            let sessions_guard = sessions.read().await;
                            sessions_guard.session_addrs()
                        };

                        if session_addrs.is_empty() {
                            continue;
                        }

                        let data = match serialize(&packet) {
                            Ok(data) => data,
                            Err(e) => {
                                error!("Failed to encode broadcast packet: {}", e);
                                continue;
                            }
                        };

                        for (session_id, addr) in session_addrs {
                            if Some(session_id) == exclude {
                                continue;
                            }

                            if let Err(e) = socket.send_to(&data, addr).await {
                                error!("Failed to send to session {}: {}", session_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors session timeouts
    fn spawn_timeout_checker(&self) {
        let sessions = Arc::clone(&self.sessions);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut sessions_guard = sessions.write().await;
                    sessions_guard.check_timeouts()
                };

                for session_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::SessionTimeout { session_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), BoxError> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, exclude: Option<SessionId>) {
        if let Err(e) = self
            .game_tx
            .send(GameMessage::BroadcastPacket { packet, exclude })
        {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Queues simulation output for delivery. Packets addressed to sessions
    /// that are already gone are dropped.
    async fn route(&self, outbound: Vec<Outbound>) {
        for Outbound { recipient, packet } in outbound {
            match recipient {
                Recipient::All => self.broadcast_packet(packet, None),
                Recipient::AllExcept(session_id) => {
                    self.broadcast_packet(packet, Some(session_id))
                }
                Recipient::Session(session_id) => {
                    let addr = {
                        let sessions = self.sessions.read().await;
                        sessions.addr_of(&session_id)
                    };
                    match addr {
                        Some(addr) => self.send_packet(packet, addr),
                        None => debug!("Dropping packet for closed session {}", session_id),
                    }
                }
            }
        }
    }

    /// Looks up the session behind `addr` and marks it alive.
    async fn active_session(&self, addr: SocketAddr) -> Option<SessionId> {
        let mut sessions = self.sessions.write().await;
        let session_id = sessions.find_session_by_addr(addr)?;
        sessions.touch(&session_id);
        Some(session_id)
    }

    /// Processes incoming packets and updates game state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { name } => {
                info!("Player '{}' connecting from {}", name, addr);

                // A second Connect from the same address starts over
                let existing_session = {
                    let sessions = self.sessions.read().await;
                    sessions.find_session_by_addr(addr)
                };

                if let Some(existing_id) = existing_session {
                    info!("Replacing session {} from {}", existing_id, addr);
                    {
                        let mut sessions = self.sessions.write().await;
                        sessions.remove_session(&existing_id);
                    }
                    let outbound = self.game_state.disconnect(existing_id);
                    self.route(outbound).await;
                }

                let session_id = {
                    let mut sessions = self.sessions.write().await;
                    sessions.add_session(addr)
                };

                match session_id {
                    Some(session_id) => {
                        self.send_packet(Packet::Connected { session_id }, addr);
                        let outbound = self.game_state.connect(session_id, &name);
                        self.route(outbound).await;
                    }
                    None => {
                        warn!("Rejecting {}: server full", addr);
                        self.send_packet(
                            Packet::Rejected {
                                reason: "Server full".to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            Packet::ChangeDirection { direction } => {
                if let Some(session_id) = self.active_session(addr).await {
                    self.game_state.change_direction(session_id, direction);
                }
            }

            Packet::Heartbeat => {
                self.active_session(addr).await;
            }

            Packet::Disconnect => {
                let session_id = {
                    let sessions = self.sessions.read().await;
                    sessions.find_session_by_addr(addr)
                };

                if let Some(session_id) = session_id {
                    {
                        let mut sessions = self.sessions.write().await;
                        sessions.remove_session(&session_id);
                    }
                    let outbound = self.game_state.disconnect(session_id);
                    self.route(outbound).await;
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Runs one simulation step and ships everything it produced
    async fn advance_tick(&mut self) {
        let started = Instant::now();
        let outbound = self.game_state.step();
        self.route(outbound).await;

        // Periodic performance monitoring
        if self.game_state.tick % 100 == 0 {
            let session_count = {
                let sessions = self.sessions.read().await;
                sessions.len()
            };

            if session_count > 0 {
                debug!(
                    "Tick {}: {} sessions, {} snakes, step took {:?}",
                    self.game_state.tick,
                    session_count,
                    self.game_state.player_count(),
                    started.elapsed()
                );
            }
        }
    }

    /// Main server loop.
    ///
    /// Inbound packets and ticks are handled one at a time on this task, so
    /// a tick never sees a half-applied command and vice versa.
    pub async fn run(&mut self) -> Result<(), BoxError> {
        // Initialize concurrent tasks
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.tick_duration);
        // Late ticks are caught up rather than skipped.
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        info!(
            "Server started: {}x{} grid, tick every {:?}",
            self.game_state.grid().width,
            self.game_state.grid().height,
            self.tick_duration
        );

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::SessionTimeout { session_id }) => {
                            info!("Session {} timed out", session_id);
                            let outbound = self.game_state.disconnect(session_id);
                            self.route(outbound).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    self.advance_tick().await;
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Direction;

    fn test_config(max_sessions: usize) -> ServerConfig {
        ServerConfig {
            port: 0,
            max_sessions,
            seed: Some(5),
            ..ServerConfig::default()
        }
    }

    fn drain(server: &mut Server) -> Vec<GameMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = server.game_rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[tokio::test]
    async fn test_connect_flow() {
        let mut server = Server::new(&test_config(4)).await.unwrap();

        server
            .handle_packet(
                Packet::Connect {
                    name: "ana".to_string(),
                },
                addr(9001),
            )
            .await;

        let messages = drain(&mut server);
        assert_eq!(messages.len(), 3);

        match &messages[0] {
            GameMessage::SendPacket {
                packet: Packet::Connected { session_id },
                addr: a,
            } => {
                assert_eq!(*session_id, 1);
                assert_eq!(*a, addr(9001));
            }
            other => panic!("Unexpected message {:?}", other),
        }
        assert!(matches!(
            &messages[1],
            GameMessage::SendPacket {
                packet: Packet::GameState { .. },
                ..
            }
        ));
        assert!(matches!(
            &messages[2],
            GameMessage::BroadcastPacket {
                packet: Packet::PlayerJoined { id: 1, .. },
                exclude: Some(1),
            }
        ));
        assert_eq!(server.game_state.player_count(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_session() {
        let mut server = Server::new(&test_config(4)).await.unwrap();
        let connect = Packet::Connect {
            name: "bo".to_string(),
        };

        server.handle_packet(connect.clone(), addr(9002)).await;
        drain(&mut server);
        server.handle_packet(connect, addr(9002)).await;

        let messages = drain(&mut server);
        assert!(matches!(
            &messages[0],
            GameMessage::BroadcastPacket {
                packet: Packet::PlayerLeft { id: 1 },
                exclude: None,
            }
        ));
        assert!(matches!(
            &messages[1],
            GameMessage::SendPacket {
                packet: Packet::Connected { session_id: 2 },
                ..
            }
        ));
        assert_eq!(server.game_state.player_count(), 1);
        assert!(server.game_state.store().contains(&2));
    }

    #[tokio::test]
    async fn test_server_full() {
        let mut server = Server::new(&test_config(1)).await.unwrap();
        let connect = Packet::Connect {
            name: String::new(),
        };

        server.handle_packet(connect.clone(), addr(9003)).await;
        drain(&mut server);
        server.handle_packet(connect, addr(9004)).await;

        let messages = drain(&mut server);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            GameMessage::SendPacket {
                packet: Packet::Rejected { reason },
                addr: a,
            } => {
                assert_eq!(reason, "Server full");
                assert_eq!(*a, addr(9004));
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_direction_and_disconnect() {
        let mut server = Server::new(&test_config(4)).await.unwrap();
        server
            .handle_packet(
                Packet::Connect {
                    name: "cy".to_string(),
                },
                addr(9005),
            )
            .await;
        drain(&mut server);

        let current = server.game_state.store().get(&1).unwrap().direction;
        let turn = Direction::ALL
            .into_iter()
            .find(|d| *d != current && *d != current.opposite())
            .unwrap();
        server
            .handle_packet(Packet::ChangeDirection { direction: turn }, addr(9005))
            .await;
        assert_eq!(server.game_state.store().get(&1).unwrap().direction, turn);

        // Unknown address: ignored
        server
            .handle_packet(Packet::ChangeDirection { direction: current }, addr(9999))
            .await;
        server.handle_packet(Packet::Disconnect, addr(9999)).await;
        assert!(drain(&mut server).is_empty());

        server.handle_packet(Packet::Disconnect, addr(9005)).await;
        assert_eq!(server.game_state.player_count(), 0);
        assert!(server.sessions.read().await.is_empty());
        assert!(matches!(
            drain(&mut server).as_slice(),
            [GameMessage::BroadcastPacket {
                packet: Packet::PlayerLeft { id: 1 },
                exclude: None,
            }]
        ));
    }

    #[tokio::test]
    async fn test_route_drops_closed_sessions() {
        let mut server = Server::new(&test_config(4)).await.unwrap();
        let live = {
            let mut sessions = server.sessions.write().await;
            sessions.add_session(addr(9006)).unwrap()
        };

        server
            .route(vec![
                Outbound::to_session(live, Packet::PlayerLeft { id: 8 }),
                Outbound::to_session(77, Packet::PlayerLeft { id: 8 }),
                Outbound::to_all_except(live, Packet::PlayerLeft { id: 8 }),
            ])
            .await;

        let messages = drain(&mut server);
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            &messages[0],
            GameMessage::SendPacket { addr: a, .. } if *a == addr(9006)
        ));
        assert!(matches!(
            &messages[1],
            GameMessage::BroadcastPacket { exclude: Some(id), .. } if *id == live
        ));
    }

    #[tokio::test]
    async fn test_tick_broadcasts_state() {
        let mut server = Server::new(&test_config(4)).await.unwrap();

        server.advance_tick().await;

        assert_eq!(server.game_state.tick, 1);
        assert!(matches!(
            drain(&mut server).as_slice(),
            [GameMessage::BroadcastPacket {
                packet: Packet::GameState { .. },
                exclude: None,
            }]
        ));
    }
}
