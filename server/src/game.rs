use crate::broadcast::Gateway;
use crate::config::GameConfig;
use crate::movement::apply_move;
use crate::registry::PlayerRegistry;
use crate::spawn::{SpawnOutcome, SpawnResolver};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientId, ClientPacket, Coord, Player, ServerPacket};

/// The authoritative world.
///
/// Owned by a single task; every operation runs to completion and then
/// publishes the full player map through the gateway if anything changed.
#[derive(Debug)]
pub struct GameState {
    registry: PlayerRegistry,
    spawner: SpawnResolver,
    config: GameConfig,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic spawn sampling, for tests and replays.
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, rng: StdRng) -> Self {
        Self {
            registry: PlayerRegistry::new(),
            spawner: SpawnResolver::new(config.clone()),
            config,
            rng,
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn player(&self, id: ClientId) -> Option<&Player> {
        self.registry.get(id)
    }

    /// Routes a validated client packet.
    pub fn handle_packet<G: Gateway>(
        &mut self,
        client_id: ClientId,
        packet: ClientPacket,
        gateway: &mut G,
    ) {
        match packet {
            ClientPacket::Join {
                username,
                requested_position,
            } => {
                self.join(client_id, username, requested_position, gateway);
            }
            ClientPacket::Move { position } => self.handle_move(client_id, position, gateway),
            ClientPacket::GetPlayers => self.send_players(client_id, gateway),
            ClientPacket::Disconnect => self.remove_player(client_id, gateway),
        }
    }

    /// Spawns a player for `client_id`.
    ///
    /// Returns the spawn outcome, or `None` if the connection already has a
    /// live player.
    pub fn join<G: Gateway>(
        &mut self,
        client_id: ClientId,
        username: String,
        requested: Coord,
        gateway: &mut G,
    ) -> Option<SpawnOutcome> {
        if self.registry.contains(client_id) {
            warn!("Client {} sent join while already playing", client_id);
            return None;
        }

        let outcome = self.spawner.resolve(requested, &self.registry, &mut self.rng);
        let player = Player::new(
            client_id,
            username,
            outcome.position,
            self.config.seed_half_size,
        );

        info!(
            "Player {} ({}) joined at {:?} via {:?}",
            client_id, player.username, outcome.position, outcome.strategy
        );
        self.registry.insert(player);

        gateway.send_to(
            client_id,
            ServerPacket::SpawnPosition {
                position: outcome.position,
            },
        );
        if outcome.relocated() {
            gateway.send_to(client_id, ServerPacket::InvalidSpawnLocation);
        }
        gateway.publish_snapshot(self.registry.players());

        Some(outcome)
    }

    pub fn handle_move<G: Gateway>(
        &mut self,
        client_id: ClientId,
        position: Coord,
        gateway: &mut G,
    ) {
        if !self.registry.contains(client_id) {
            debug!("Ignoring move from client {} with no player", client_id);
            return;
        }

        let events = apply_move(&mut self.registry, client_id, position, &self.config);
        for event in &events {
            for (target, packet) in event.notifications() {
                gateway.send_to(target, packet);
            }
        }
        gateway.publish_snapshot(self.registry.players());
    }

    /// Drops the player for a closed or departing connection.
    pub fn remove_player<G: Gateway>(&mut self, client_id: ClientId, gateway: &mut G) {
        if let Some(player) = self.registry.remove(client_id) {
            info!("Removed player {} ({})", client_id, player.username);
            gateway.publish_snapshot(self.registry.players());
        }
    }

    /// Answers a snapshot request without touching the registry.
    pub fn send_players<G: Gateway>(&self, client_id: ClientId, gateway: &mut G) {
        gateway.send_to(
            client_id,
            ServerPacket::UpdatePlayers {
                players: self.registry.snapshot(),
            },
        );
    }
}
