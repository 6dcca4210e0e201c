//! # Territory Server Library
//!
//! This library provides the authoritative server for a real-time territory
//! capture game. Players walk around a shared plane, leave a trail while
//! outside their own territory, and capture the area enclosed when the trail
//! returns home. The server owns the only true copy of every player.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! Every position update is applied here, in arrival order. Territory merges,
//! eliminations and clipping are decided by the server and pushed to clients
//! as a full snapshot after each change.
//!
//! ### Spawn Placement
//! Joining players are placed at their requested point if it is far enough
//! from everyone else; otherwise a spiral search, random sampling and finally
//! a max-min grid pick a free spot.
//!
//! ### Client Management
//! Handles the lifecycle of TCP connections:
//! - Id assignment and capacity limits
//! - Idle timeout detection and cleanup
//! - Per-connection outbound queues
//!
//! ## Architecture Design
//!
//! ### Single-Writer Event Loop
//! Connection tasks only decode and validate. Every decoded packet is sent to
//! one loop that owns the game state, so mutations never interleave and the
//! outcome of a sequence of updates is deterministic.
//!
//! ### TCP Framing
//! Packets are bincode payloads behind a 4-byte length prefix. TCP gives the
//! per-connection ordering the capture rules depend on.
//!
//! ## Module Organization
//!
//! - `registry`: players keyed by connection id, iterated in id order
//! - `spawn`: spawn validation and fallback placement
//! - `movement`: trail bookkeeping and loop closure
//! - `capture`: elimination and clipping of rivals after a capture
//! - `events`: capture outcomes and the notifications they produce
//! - `broadcast`: the `Gateway` seam between the core and delivery
//! - `game`: the facade the event loop drives
//! - `client_manager`: open connections, the production `Gateway`
//! - `network`: listener, connection tasks and the event loop
//! - `config`: tunables for all of the above
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", ServerConfig::default()).await?;
//!
//!     // Accepts connections, applies packets in order and broadcasts
//!     // snapshots until shut down.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod capture;
pub mod client_manager;
pub mod config;
pub mod events;
pub mod game;
pub mod movement;
pub mod network;
pub mod registry;
pub mod spawn;
