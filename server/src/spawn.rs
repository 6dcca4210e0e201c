//! Turns a requested join position into a collision-free spawn point.
//!
//! Resolution walks four progressively weaker strategies and stops at the
//! first that yields a valid point:
//!
//! 1. the requested position itself
//! 2. a widening spiral of random-angle samples around the request
//! 3. uniform samples inside the fallback box around the default position
//! 4. the point of a fixed grid over that box farthest from every player
//!
//! The last step cannot fail, so resolution always returns a position. Its
//! cost is bounded by `players × grid_resolution²` distance checks.

use crate::config::GameConfig;
use crate::registry::PlayerRegistry;
use log::debug;
use rand::Rng;
use shared::geometry::{distance, point_in_polygon};
use shared::Coord;
use std::f64::consts::TAU;

/// Which pass produced the spawn point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnStrategy {
    Requested,
    Spiral,
    Random,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnOutcome {
    pub position: Coord,
    pub strategy: SpawnStrategy,
}

impl SpawnOutcome {
    /// True when the caller must tell the client its request was moved.
    pub fn relocated(&self) -> bool {
        self.strategy != SpawnStrategy::Requested
    }
}

#[derive(Debug, Clone)]
pub struct SpawnResolver {
    config: GameConfig,
}

impl SpawnResolver {
    pub fn new(config: GameConfig) -> Self {
        Self { config }
    }

    /// A point is valid when it keeps `min_spawn_distance` from every player
    /// and lies outside every territory.
    pub fn is_valid(&self, candidate: Coord, registry: &PlayerRegistry) -> bool {
        registry.iter().all(|player| {
            distance(candidate, player.position) >= self.config.min_spawn_distance
                && !point_in_polygon(candidate, &player.territory)
        })
    }

    pub fn resolve<R: Rng>(
        &self,
        requested: Coord,
        registry: &PlayerRegistry,
        rng: &mut R,
    ) -> SpawnOutcome {
        if self.is_valid(requested, registry) {
            return SpawnOutcome {
                position: requested,
                strategy: SpawnStrategy::Requested,
            };
        }

        if let Some(position) = self.spiral_search(requested, registry, rng) {
            return SpawnOutcome {
                position,
                strategy: SpawnStrategy::Spiral,
            };
        }

        if let Some(position) = self.random_search(registry, rng) {
            return SpawnOutcome {
                position,
                strategy: SpawnStrategy::Random,
            };
        }

        debug!(
            "Spawn sampling exhausted near {:?}, falling back to grid",
            requested
        );
        SpawnOutcome {
            position: self.grid_fallback(registry),
            strategy: SpawnStrategy::Grid,
        }
    }

    fn spiral_search<R: Rng>(
        &self,
        requested: Coord,
        registry: &PlayerRegistry,
        rng: &mut R,
    ) -> Option<Coord> {
        let min = self.config.min_spawn_distance;

        (0..self.config.spawn_attempts).find_map(|attempt| {
            let radius = min + attempt as f64 * min / 2.0;
            let angle = rng.gen_range(0.0..TAU);
            let candidate = [
                requested[0] + radius * angle.cos(),
                requested[1] + radius * angle.sin(),
            ];
            self.is_valid(candidate, registry).then_some(candidate)
        })
    }

    fn random_search<R: Rng>(
        &self,
        registry: &PlayerRegistry,
        rng: &mut R,
    ) -> Option<Coord> {
        let [cx, cy] = self.config.default_position;
        let extent = self.config.spawn_extent;

        (0..self.config.spawn_attempts).find_map(|_| {
            let candidate = [
                cx + rng.gen_range(-extent..=extent),
                cy + rng.gen_range(-extent..=extent),
            ];
            self.is_valid(candidate, registry).then_some(candidate)
        })
    }

    /// Grid point maximizing the distance to its nearest player.
    pub fn grid_fallback(&self, registry: &PlayerRegistry) -> Coord {
        if registry.is_empty() {
            return self.config.default_position;
        }

        let [cx, cy] = self.config.default_position;
        let extent = self.config.spawn_extent;
        let n = self.config.grid_resolution.max(1);
        let step = if n > 1 {
            2.0 * extent / (n - 1) as f64
        } else {
            0.0
        };
        let origin = if n > 1 { -extent } else { 0.0 };

        let mut best = self.config.default_position;
        let mut best_clearance = f64::NEG_INFINITY;

        for i in 0..n {
            for j in 0..n {
                let candidate = [
                    cx + origin + i as f64 * step,
                    cy + origin + j as f64 * step,
                ];
                let clearance = registry
                    .iter()
                    .map(|player| distance(candidate, player.position))
                    .fold(f64::INFINITY, f64::min);

                if clearance > best_clearance {
                    best_clearance = clearance;
                    best = candidate;
                }
            }
        }

        best
    }
}
