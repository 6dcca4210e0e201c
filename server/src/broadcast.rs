//! Outbound seam between the game core and whatever delivers messages.
//!
//! The core calls `publish_snapshot` after every registry mutation and
//! `send_to` for targeted notifications. Full snapshots keep clients simple;
//! a delta-based gateway can replace this without touching the core.

use shared::{ClientId, Player, ServerPacket};
use std::collections::BTreeMap;

pub trait Gateway {
    /// Delivers a packet to one connection. Unknown ids are ignored.
    fn send_to(&mut self, client_id: ClientId, packet: ServerPacket);

    /// Pushes the complete player map to every connection.
    fn publish_snapshot(&mut self, players: &BTreeMap<ClientId, Player>);
}

/// Gateway that keeps everything it is asked to deliver, in order.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    pub sent: Vec<(ClientId, ServerPacket)>,
    pub snapshots: Vec<BTreeMap<ClientId, Player>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets sent to `client_id`, oldest first.
    pub fn sent_to(&self, client_id: ClientId) -> Vec<&ServerPacket> {
        self.sent
            .iter()
            .filter(|(id, _)| *id == client_id)
            .map(|(_, packet)| packet)
            .collect()
    }

    pub fn last_snapshot(&self) -> Option<&BTreeMap<ClientId, Player>> {
        self.snapshots.last()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
        self.snapshots.clear();
    }
}

impl Gateway for RecordingGateway {
    fn send_to(&mut self, client_id: ClientId, packet: ServerPacket) {
        self.sent.push((client_id, packet));
    }

    fn publish_snapshot(&mut self, players: &BTreeMap<ClientId, Player>) {
        self.snapshots.push(players.clone());
    }
}
