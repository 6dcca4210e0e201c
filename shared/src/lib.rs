use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod framing;
pub mod geometry;

pub use framing::{decode_payload, encode_frame, read_frame, write_frame, MAX_FRAME_LEN};

/// A coordinate pair. Latitude/longitude degrees in practice, but every
/// geometry routine treats it as a plain planar point.
pub type Coord = [f64; 2];

/// Connection identity assigned by the server.
pub type ClientId = u32;

/// Multiplier applied to raw polygon area so scores are legible.
pub const AREA_SCALE: f64 = 1e7;
/// Tokyo Tower.
pub const DEFAULT_POSITION: Coord = [35.6586, 139.7454];
/// Distance a client advances per movement frame.
pub const MOVE_STEP: f64 = 0.00001;
pub const MAX_USERNAME_LEN: usize = 32;

const PLAYER_COLORS: [&str; 8] = [
    "blue", "red", "green", "purple", "orange", "cyan", "magenta", "yellow",
];

/// Picks the display color for a connection.
pub fn color_for(client_id: ClientId) -> String {
    PLAYER_COLORS[client_id as usize % PLAYER_COLORS.len()].to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame of {0} bytes exceeds the {max} byte limit", max = MAX_FRAME_LEN)]
    FrameTooLarge(usize),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("coordinate {0:?} is not finite")]
    InvalidCoordinate(Coord),
    #[error("username must be 1..={max} characters", max = MAX_USERNAME_LEN)]
    InvalidUsername,
}

/// Messages a client may send.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ClientPacket {
    Join {
        username: String,
        requested_position: Coord,
    },
    Move {
        position: Coord,
    },
    GetPlayers,
    Disconnect,
}

impl ClientPacket {
    /// Boundary check run before a packet reaches the game core.
    ///
    /// Usernames are trimmed in place, so a validated packet is also normalized.
    pub fn validate(&mut self) -> Result<(), ProtocolError> {
        match self {
            ClientPacket::Join {
                username,
                requested_position,
            } => {
                let trimmed = username.trim();
                if trimmed.is_empty() || trimmed.chars().count() > MAX_USERNAME_LEN {
                    return Err(ProtocolError::InvalidUsername);
                }
                *username = trimmed.to_string();
                check_coord(*requested_position)
            }
            ClientPacket::Move { position } => check_coord(*position),
            ClientPacket::GetPlayers | ClientPacket::Disconnect => Ok(()),
        }
    }
}

fn check_coord(coord: Coord) -> Result<(), ProtocolError> {
    if coord.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(ProtocolError::InvalidCoordinate(coord))
    }
}

/// Messages the server sends, either to one connection or to everyone.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerPacket {
    Connected {
        client_id: ClientId,
    },
    SpawnPosition {
        position: Coord,
    },
    InvalidSpawnLocation,
    /// Full registry. Receivers replace their previous copy wholesale.
    UpdatePlayers {
        players: BTreeMap<ClientId, Player>,
    },
    TerritoryCaptured {
        captured_from: ClientId,
        username: String,
    },
    TerritoryLost {
        captured_by: ClientId,
        username: String,
    },
    PlayerDied {
        killed_by: ClientId,
        username: String,
    },
    PlayerKilled {
        killed: ClientId,
        username: String,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: ClientId,
    pub username: String,
    pub position: Coord,
    /// Convex polygon with at least three vertices.
    pub territory: Vec<Coord>,
    /// Path walked since leaving the territory; empty while inside it.
    pub trail: Vec<Coord>,
    pub is_inside_territory: bool,
    pub color: String,
    /// Always `polygon_area(territory)`. Change it only via `set_territory`.
    pub score: f64,
}

impl Player {
    /// Creates a player standing in the middle of a fresh seed square.
    pub fn new(id: ClientId, username: String, position: Coord, seed_half_size: f64) -> Self {
        let mut player = Self {
            id,
            username,
            position,
            territory: Vec::new(),
            trail: Vec::new(),
            is_inside_territory: true,
            color: color_for(id),
            score: 0.0,
        };
        player.reseed(seed_half_size);
        player
    }

    pub fn set_territory(&mut self, territory: Vec<Coord>) {
        self.score = geometry::polygon_area(&territory);
        self.territory = territory;
    }

    /// Replaces the territory with a seed square around the current position.
    /// The player ends up inside it, so any trail is dropped.
    pub fn reseed(&mut self, seed_half_size: f64) {
        self.set_territory(geometry::seed_polygon(self.position, seed_half_size));
        self.refresh_inside();
    }

    /// Recomputes the inside flag after the territory changed under the player.
    pub fn refresh_inside(&mut self) {
        self.is_inside_territory = geometry::point_in_polygon(self.position, &self.territory);
        if self.is_inside_territory {
            self.trail.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_player_creation() {
        let player = Player::new(3, "alice".to_string(), [0.0, 0.0], 0.5);
        assert_eq!(player.id, 3);
        assert_eq!(player.territory.len(), 4);
        assert!(player.trail.is_empty());
        assert!(player.is_inside_territory);
        assert_approx_eq!(player.score, 1.0 * AREA_SCALE, 1e-6);
    }

    #[test]
    fn test_set_territory_recomputes_score() {
        let mut player = Player::new(1, "bob".to_string(), [0.0, 0.0], 0.5);
        player.set_territory(vec![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]]);
        assert_approx_eq!(player.score, 2.0 * AREA_SCALE, 1e-6);
    }

    #[test]
    fn test_refresh_inside_clears_trail_when_inside() {
        let mut player = Player::new(1, "bob".to_string(), [0.0, 0.0], 0.5);
        player.is_inside_territory = false;
        player.trail = vec![[1.0, 1.0], [1.5, 1.5]];
        player.refresh_inside();
        assert!(player.is_inside_territory);
        assert!(player.trail.is_empty());
    }

    #[test]
    fn test_refresh_inside_keeps_trail_when_outside() {
        let mut player = Player::new(1, "bob".to_string(), [0.0, 0.0], 0.5);
        player.position = [3.0, 3.0];
        player.trail = vec![[3.0, 3.0]];
        player.refresh_inside();
        assert!(!player.is_inside_territory);
        assert_eq!(player.trail.len(), 1);
    }

    #[test]
    fn test_color_assignment_cycles() {
        assert_eq!(color_for(0), color_for(8));
        assert_ne!(color_for(1), color_for(2));
    }

    #[test]
    fn test_validate_trims_username() {
        let mut packet = ClientPacket::Join {
            username: "  carol ".to_string(),
            requested_position: [1.0, 2.0],
        };
        assert!(packet.validate().is_ok());
        match packet {
            ClientPacket::Join { username, .. } => assert_eq!(username, "carol"),
            _ => panic!("Wrong packet type after validation"),
        }
    }

    #[test]
    fn test_validate_rejects_blank_or_long_username() {
        let mut blank = ClientPacket::Join {
            username: "   ".to_string(),
            requested_position: [0.0, 0.0],
        };
        assert!(matches!(
            blank.validate(),
            Err(ProtocolError::InvalidUsername)
        ));

        let mut long = ClientPacket::Join {
            username: "x".repeat(MAX_USERNAME_LEN + 1),
            requested_position: [0.0, 0.0],
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_coordinates() {
        let mut packet = ClientPacket::Move {
            position: [f64::NAN, 0.0],
        };
        assert!(matches!(
            packet.validate(),
            Err(ProtocolError::InvalidCoordinate(_))
        ));

        let mut packet = ClientPacket::Move {
            position: [0.0, f64::INFINITY],
        };
        assert!(packet.validate().is_err());

        assert!(ClientPacket::GetPlayers.validate().is_ok());
    }

    #[test]
    fn test_packet_serialization_update_players() {
        let mut players = BTreeMap::new();
        players.insert(1, Player::new(1, "a".to_string(), [0.0, 0.0], 0.1));
        players.insert(2, Player::new(2, "b".to_string(), [5.0, 5.0], 0.1));

        let packet = ServerPacket::UpdatePlayers { players };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: ServerPacket = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            ServerPacket::UpdatePlayers { players } => {
                assert_eq!(players.len(), 2);
                assert_eq!(players[&1].username, "a");
                assert_eq!(players[&2].territory.len(), 4);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
