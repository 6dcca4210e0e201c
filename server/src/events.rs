use shared::{ClientId, ServerPacket};

/// Outcomes of a movement update that other layers react to.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A trail re-entered its territory and the territory was merged.
    LoopClosed { player: ClientId, score: f64 },
    /// `victim` stood inside the killer's new territory and was removed.
    Eliminated {
        killer: ClientId,
        killer_name: String,
        victim: ClientId,
        victim_name: String,
    },
    /// `victim` lost the part of its territory covered by the capturer's loop.
    TerritoryClipped {
        capturer: ClientId,
        capturer_name: String,
        victim: ClientId,
        victim_name: String,
        /// Too little survived, so the victim was given a fresh seed square.
        reseeded: bool,
    },
}

impl GameEvent {
    /// Targeted notifications this event produces, in delivery order.
    pub fn notifications(&self) -> Vec<(ClientId, ServerPacket)> {
        match self {
            GameEvent::LoopClosed { .. } => Vec::new(),
            GameEvent::Eliminated {
                killer,
                killer_name,
                victim,
                victim_name,
            } => vec![
                (
                    *victim,
                    ServerPacket::PlayerDied {
                        killed_by: *killer,
                        username: killer_name.clone(),
                    },
                ),
                (
                    *killer,
                    ServerPacket::PlayerKilled {
                        killed: *victim,
                        username: victim_name.clone(),
                    },
                ),
            ],
            GameEvent::TerritoryClipped {
                capturer,
                capturer_name,
                victim,
                victim_name,
                ..
            } => vec![
                (
                    *capturer,
                    ServerPacket::TerritoryCaptured {
                        captured_from: *victim,
                        username: victim_name.clone(),
                    },
                ),
                (
                    *victim,
                    ServerPacket::TerritoryLost {
                        captured_by: *capturer,
                        username: capturer_name.clone(),
                    },
                ),
            ],
        }
    }
}
