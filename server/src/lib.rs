//! # Snake Arena Server Library
//!
//! Authoritative server for a multiplayer snake game played on a wrapping
//! grid. The server owns the only true copy of every snake and of the food
//! cell, advances the world on a fixed tick, judges collisions and pushes
//! the results to every connected client.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Clients only ever send direction changes. Movement, growth, collisions
//! and scoring are decided here and broadcast as a full `GameState` after
//! every tick.
//!
//! ### Session Management
//! Handles the lifecycle of client sessions:
//! - Connection establishment and session id assignment
//! - Direction changes, with reversal prevention for multi-segment snakes
//! - Disconnection, timeouts and reconnects from the same address
//!
//! ### Event Delivery
//! Besides the per-tick state, the server sends targeted notifications:
//! joins, leaves, food consumption, eliminations and damage.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! One task owns the [`game::GameState`] and processes inbound packets and
//! ticks strictly one after another. A tick moves every snake before any
//! collision is evaluated, so verdicts are always computed against the fully
//! moved world.
//!
//! ### Pure Core, Thin Gateway
//! The simulation modules never touch sockets. Every operation returns a list
//! of [`events::Outbound`] notifications tagged with their recipients; the
//! [`network`] module maps those onto UDP datagrams.
//!
//! ### Reproducible Randomness
//! Spawn positions, colors and food placement all come from one seedable
//! random source owned by the game state. A fixed seed replays the same game
//! for the same sequence of inputs.
//!
//! ## Module Organization
//!
//! - `grid`: wrapping coordinate arithmetic and random cells
//! - `store`: the session → snake map and snake creation
//! - `collision`: per-tick collision verdicts
//! - `resolution`: eliminations and damage
//! - `game`: the tick step and inbound handlers
//! - `events`: outbound notification envelopes
//! - `session_manager`: address ↔ session bookkeeping and timeouts
//! - `network`: UDP transport and the main loop
//! - `config`: defaults, JSON config file and command-line flags
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ServerConfig::default();
//!     let mut server = Server::new(&config).await?;
//!
//!     // Runs until a shutdown message arrives
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod collision;
pub mod config;
pub mod events;
pub mod game;
pub mod grid;
pub mod network;
pub mod resolution;
pub mod session_manager;
pub mod store;
