use log::{debug, info, warn};
use shared::{ClientId, Coord, Player, ServerPacket};
use std::collections::BTreeMap;

/// What the bot should do after a server packet has been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reaction {
    Nothing,
    /// The server placed our player; start walking from here.
    Spawned(Coord),
    /// Our player was eliminated and no longer exists on the server.
    Died,
    /// The server closed the session.
    Disconnected,
}

/// The bot's view of the world, rebuilt from server packets.
#[derive(Debug, Default)]
pub struct ClientGameState {
    pub client_id: Option<ClientId>,
    pub spawn: Option<Coord>,
    /// Latest snapshot, replaced wholesale on every update.
    pub players: BTreeMap<ClientId, Player>,
    pub captures: u32,
    pub kills: u32,
    pub deaths: u32,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn me(&self) -> Option<&Player> {
        self.client_id.and_then(|id| self.players.get(&id))
    }

    pub fn score(&self) -> f64 {
        self.me().map_or(0.0, |player| player.score)
    }

    pub fn apply(&mut self, packet: ServerPacket) -> Reaction {
        match packet {
            ServerPacket::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                Reaction::Nothing
            }
            ServerPacket::SpawnPosition { position } => {
                info!("Spawned at {:?}", position);
                self.spawn = Some(position);
                Reaction::Spawned(position)
            }
            ServerPacket::InvalidSpawnLocation => {
                warn!("Requested spawn was taken; server relocated us");
                Reaction::Nothing
            }
            ServerPacket::UpdatePlayers { players } => {
                debug!("Snapshot with {} players", players.len());
                self.players = players;
                Reaction::Nothing
            }
            ServerPacket::TerritoryCaptured {
                captured_from,
                username,
            } => {
                self.captures += 1;
                info!("Captured territory from {} ({})", username, captured_from);
                Reaction::Nothing
            }
            ServerPacket::TerritoryLost {
                captured_by,
                username,
            } => {
                info!("Lost territory to {} ({})", username, captured_by);
                Reaction::Nothing
            }
            ServerPacket::PlayerKilled { killed, username } => {
                self.kills += 1;
                info!("Eliminated {} ({})", username, killed);
                Reaction::Nothing
            }
            ServerPacket::PlayerDied {
                killed_by,
                username,
            } => {
                self.deaths += 1;
                self.spawn = None;
                warn!("Eliminated by {} ({})", username, killed_by);
                Reaction::Died
            }
            ServerPacket::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.client_id = None;
                self.spawn = None;
                Reaction::Disconnected
            }
        }
    }
}
