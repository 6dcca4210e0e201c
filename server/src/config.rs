//! Tunables for the game core and the network server.

use shared::{Coord, DEFAULT_POSITION};
use std::time::Duration;

/// Geometry and spawn parameters. Units match the coordinates players send.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Fallback spawn point and center of the fallback sampling box.
    pub default_position: Coord,
    /// Half-width of the fallback sampling box around `default_position`.
    pub spawn_extent: f64,
    /// Minimum distance between a new spawn and any existing player.
    pub min_spawn_distance: f64,
    /// Half side length of the square territory handed out at spawn.
    pub seed_half_size: f64,
    /// Candidates tried by each of the spiral and random passes.
    pub spawn_attempts: usize,
    /// Points per side of the last-resort grid.
    pub grid_resolution: usize,
    /// Longest trail a player may drag outside their territory. Further
    /// outward moves are refused until the player heads back in.
    pub max_trail_len: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_position: DEFAULT_POSITION,
            spawn_extent: 0.005,
            min_spawn_distance: 0.0005,
            seed_half_size: 0.0002,
            spawn_attempts: 20,
            grid_resolution: 10,
            max_trail_len: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_clients: usize,
    /// Frames that may wait on one connection before it is dropped as too slow.
    pub outbox_capacity: usize,
    /// Clients silent for longer than this are dropped. `None` disables the check.
    pub idle_timeout: Option<Duration>,
    /// Seed for spawn sampling; random when absent.
    pub rng_seed: Option<u64>,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_clients: 64,
            outbox_capacity: 256,
            idle_timeout: Some(Duration::from_secs(120)),
            rng_seed: None,
            game: GameConfig::default(),
        }
    }
}
