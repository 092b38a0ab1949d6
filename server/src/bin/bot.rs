//! Headless client for poking at a running server.
//!
//! Connects, turns in a random direction every so often, keeps the session
//! alive with heartbeats and logs whatever the server sends back.

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use shared::{Direction, Packet, SessionId, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, Duration, Instant};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: SocketAddr,

    /// Display name to join with
    #[arg(short, long, default_value = "bot")]
    name: String,

    /// Milliseconds between random turns
    #[arg(short, long, default_value = "400")]
    turn_ms: u64,

    /// Seconds to play before disconnecting
    #[arg(short, long, default_value = "30")]
    duration: u64,

    /// Join again after being eliminated
    #[arg(short, long)]
    respawn: bool,
}

async fn send(socket: &UdpSocket, packet: &Packet, server: SocketAddr) -> Result<(), BoxError> {
    let data = serialize(packet)?;
    socket.send_to(&data, server).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Bot socket bound to {}", socket.local_addr()?);

    let connect = Packet::Connect {
        name: args.name.clone(),
    };
    send(&socket, &connect, args.server).await?;
    info!("Sent connect to {}", args.server);

    let mut session_id: Option<SessionId> = None;
    let mut alive = false;
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut turn_interval = interval(Duration::from_millis(args.turn_ms));
    let mut heartbeat_interval = interval(Duration::from_secs(1));
    let deadline = sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);
    let started = Instant::now();

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buffer) => {
                let (len, _) = match result {
                    Ok(received) => received,
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        continue;
                    }
                };

                match deserialize::<Packet>(&buffer[..len]) {
                    Ok(Packet::Connected { session_id: id }) => {
                        info!("Joined as session {}", id);
                        session_id = Some(id);
                        alive = true;
                    }
                    Ok(Packet::Rejected { reason }) => {
                        warn!("Rejected: {}", reason);
                        break;
                    }
                    Ok(Packet::GameState { players, food, .. }) => {
                        let me = session_id.and_then(|id| players.get(&id));
                        match me {
                            Some(snake) => debug!(
                                "{} players, food at ({}, {}), my length {} score {}",
                                players.len(), food.x, food.y, snake.len(), snake.score
                            ),
                            None => debug!("{} players, spectating", players.len()),
                        }
                    }
                    Ok(Packet::PlayerJoined { id, player }) => {
                        info!("Session {} joined as '{}' ({})", id, player.name, player.color.to_css());
                    }
                    Ok(Packet::PlayerLeft { id }) => info!("Session {} left", id),
                    Ok(Packet::FoodEaten { player_id, .. }) => {
                        if Some(player_id) == session_id {
                            info!("Ate food");
                        }
                    }
                    Ok(Packet::SnakeDamaged { remaining_score, .. }) => {
                        info!("Got hit, score now {}", remaining_score);
                    }
                    Ok(Packet::GameOver { reason, kind, victims }) => {
                        info!("Game over after {:?}: {} ({:?}, victims {:?})", started.elapsed(), reason, kind, victims);
                        alive = false;
                        if args.respawn {
                            send(&socket, &connect, args.server).await?;
                        } else {
                            break;
                        }
                    }
                    Ok(other) => warn!("Unexpected packet: {:?}", other),
                    Err(e) => warn!("Failed to deserialize packet: {}", e),
                }
            },

            _ = turn_interval.tick() => {
                if alive {
                    if let Some(&direction) = Direction::ALL.choose(&mut rand::thread_rng()) {
                        send(&socket, &Packet::ChangeDirection { direction }, args.server).await?;
                    }
                }
            },

            _ = heartbeat_interval.tick() => {
                if session_id.is_some() {
                    send(&socket, &Packet::Heartbeat, args.server).await?;
                }
            },

            _ = &mut deadline => {
                info!("Time is up");
                break;
            },
        }
    }

    send(&socket, &Packet::Disconnect, args.server).await?;
    info!("Bot finished");

    Ok(())
}
