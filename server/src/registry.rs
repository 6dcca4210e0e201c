//! Authoritative set of live players.

use shared::{ClientId, Player};
use std::collections::BTreeMap;

/// Players keyed by connection id.
///
/// Ids are handed out in increasing order, so iterating the map visits
/// players in connection order. Capture resolution relies on that ordering
/// to produce the same outcome for the same inputs.
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<ClientId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a player under its own id, returning any player it replaced.
    pub fn insert(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.id, player)
    }

    pub fn remove(&mut self, id: ClientId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Ids in iteration order.
    pub fn ids(&self) -> Vec<ClientId> {
        self.players.keys().copied().collect()
    }

    /// The full map, as published to clients.
    pub fn players(&self) -> &BTreeMap<ClientId, Player> {
        &self.players
    }

    pub fn snapshot(&self) -> BTreeMap<ClientId, Player> {
        self.players.clone()
    }
}
