//! Consequences of a closed loop for every other player.

use crate::config::GameConfig;
use crate::events::GameEvent;
use crate::registry::PlayerRegistry;
use log::{debug, info};
use shared::geometry::{merge_polygon, point_in_polygon, points_outside, polygons_overlap};
use shared::{ClientId, Coord};

/// Gives `actor` its merged territory and settles every rival against it.
///
/// Rivals are visited in registry order. A rival standing inside the new
/// territory is eliminated outright; only otherwise is its territory clipped.
/// Clipping keeps the hull of the rival's vertices outside the new
/// territory, or reseeds the rival in place when fewer than three survive.
pub fn resolve_capture(
    registry: &mut PlayerRegistry,
    actor: ClientId,
    new_territory: Vec<Coord>,
    config: &GameConfig,
) -> Vec<GameEvent> {
    let mut events = Vec::new();

    let actor_name = match registry.get_mut(actor) {
        Some(player) => {
            player.set_territory(new_territory.clone());
            player.username.clone()
        }
        None => return events,
    };

    for rival_id in registry.ids() {
        if rival_id == actor {
            continue;
        }

        let Some(rival) = registry.get_mut(rival_id) else {
            continue;
        };

        if point_in_polygon(rival.position, &new_territory) {
            let victim_name = rival.username.clone();
            registry.remove(rival_id);
            info!(
                "Player {} ({}) eliminated by {} ({})",
                rival_id, victim_name, actor, actor_name
            );
            events.push(GameEvent::Eliminated {
                killer: actor,
                killer_name: actor_name.clone(),
                victim: rival_id,
                victim_name,
            });
            continue;
        }

        if !polygons_overlap(&new_territory, &rival.territory) {
            continue;
        }

        let keep = points_outside(&rival.territory, &new_territory);
        let clipped = if keep.len() >= 3 {
            merge_polygon(&keep)
        } else {
            Vec::new()
        };

        let reseeded = clipped.len() < 3;
        if reseeded {
            rival.reseed(config.seed_half_size);
        } else {
            rival.set_territory(clipped);
            rival.refresh_inside();
        }

        debug!(
            "Player {} clipped player {} (reseeded: {}, score now {:.2})",
            actor, rival_id, reseeded, rival.score
        );
        events.push(GameEvent::TerritoryClipped {
            capturer: actor,
            capturer_name: actor_name.clone(),
            victim: rival_id,
            victim_name: rival.username.clone(),
            reseeded,
        });
    }

    events
}
