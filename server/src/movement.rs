//! Per-update trail and territory bookkeeping.

use crate::capture::resolve_capture;
use crate::config::GameConfig;
use crate::events::GameEvent;
use crate::registry::PlayerRegistry;
use log::{debug, warn};
use shared::geometry::{merge_polygon, point_in_polygon};
use shared::{ClientId, Coord};

/// Applies one position update for `id`.
///
/// Unknown ids are ignored: a move can legitimately arrive after its player
/// disconnected or was eliminated. An outward move with a trail already at
/// `max_trail_len` points is refused and leaves the player untouched.
///
/// | was inside | is inside | effect                                  |
/// |------------|-----------|-----------------------------------------|
/// | yes        | no        | trail restarts at the new position      |
/// | no         | no        | new position appended to the trail      |
/// | no         | yes       | loop closes if the trail has 2+ points  |
/// | yes        | yes       | nothing                                 |
pub fn apply_move(
    registry: &mut PlayerRegistry,
    id: ClientId,
    position: Coord,
    config: &GameConfig,
) -> Vec<GameEvent> {
    let Some(player) = registry.get_mut(id) else {
        return Vec::new();
    };

    let was_inside = player.is_inside_territory;
    let is_inside = point_in_polygon(position, &player.territory);
    if !was_inside && !is_inside && player.trail.len() >= config.max_trail_len {
        warn!(
            "Player {} trail reached {} points, refusing move",
            id,
            player.trail.len()
        );
        return Vec::new();
    }

    player.position = position;
    player.is_inside_territory = is_inside;

    match (was_inside, is_inside) {
        (true, false) => {
            player.trail = vec![position];
            Vec::new()
        }
        (false, false) => {
            player.trail.push(position);
            Vec::new()
        }
        (false, true) => {
            let trail = std::mem::take(&mut player.trail);
            if trail.len() < 2 {
                return Vec::new();
            }

            let mut points = player.territory.clone();
            points.extend(trail);
            points.push(position);
            let new_territory = merge_polygon(&points);

            debug!(
                "Player {} closed a loop: {} -> {} vertices",
                id,
                player.territory.len(),
                new_territory.len()
            );

            let mut events = resolve_capture(registry, id, new_territory, config);
            if let Some(player) = registry.get(id) {
                events.insert(
                    0,
                    GameEvent::LoopClosed {
                        player: id,
                        score: player.score,
                    },
                );
            }
            events
        }
        (true, true) => Vec::new(),
    }
}
