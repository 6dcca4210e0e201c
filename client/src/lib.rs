//! # Territory Bot Client Library
//!
//! A headless client for the territory server. It connects over TCP, joins
//! under a username, and walks square loops out of its territory and back in,
//! so every loop closes and captures area. Server notifications are logged.
//! It exists for soak testing the server without a browser.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The client's view of the world:
//! - Its own id and spawn point
//! - The latest full snapshot of every player
//! - Counters for captures, kills and deaths
//!
//! ### Input Module (`input`)
//! The `Pilot`, which scripts movement:
//! - Square loops of a configurable side and step
//! - Reset on respawn
//! - Pause and resume, used to rest at home between loops
//!
//! ### Network Module (`network`)
//! Connection handling:
//! - TCP connect and frame decoding on a reader task
//! - Join, periodic moves and rejoin after elimination
//! - Clean disconnect on exit
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{BotConfig, Client};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BotConfig {
//!         server: "127.0.0.1:8080".to_string(),
//!         username: "bot".to_string(),
//!         requested_position: shared::DEFAULT_POSITION,
//!         step: shared::MOVE_STEP,
//!         loop_size: 60,
//!         move_interval: Duration::from_millis(50),
//!         max_loops: Some(3),
//!         rest: Some(Duration::from_secs(1)),
//!     };
//!
//!     let mut client = Client::connect(config).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
