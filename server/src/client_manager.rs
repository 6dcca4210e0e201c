//! Connection bookkeeping for the territory server
//!
//! This module tracks every open TCP connection, independently of whether it
//! has joined the game yet:
//! - Connection lifecycle (accept, disconnect, idle timeout)
//! - Client id assignment and capacity limits
//! - Outbound frame queues, one per connection
//!
//! `ClientManager` is the production `Gateway`: packets are encoded once and
//! the same frame is queued on every targeted connection. Queues are bounded;
//! a connection whose queue fills up is dropped instead of buffering without
//! limit.

use crate::broadcast::Gateway;
use log::{debug, error, info, warn};
use shared::{encode_frame, ClientId, Player, ServerPacket};
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::AbortHandle;

/// An encoded frame shared by every connection it is queued on.
pub type Frame = Arc<Vec<u8>>;

/// One open connection
///
/// The writer task owns the socket's write half and drains `outbox`; it
/// finishes once the sender here is dropped. The reader task is aborted
/// explicitly on removal.
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: ClientId,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// Last time a packet arrived from this client
    pub last_seen: Instant,
    outbox: mpsc::Sender<Frame>,
    reader: Option<AbortHandle>,
}

impl Client {
    pub fn new(id: ClientId, addr: SocketAddr, outbox: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            outbox,
            reader: None,
        }
    }

    /// Queues a frame for the writer task without waiting.
    ///
    /// Fails with `Full` when the peer is not reading fast enough and with
    /// `Closed` when the writer has already gone away.
    pub fn queue(&self, frame: Frame) -> Result<(), TrySendError<Frame>> {
        self.outbox.try_send(frame)
    }

    /// Returns true if nothing has been received within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// All open connections, ordered by id
pub struct ClientManager {
    clients: BTreeMap<ClientId, Client>,
    /// Next id to hand out; ids are never reused within a process
    next_client_id: ClientId,
    max_clients: usize,
    /// Connections whose outbox overflowed, awaiting `take_slow_clients`
    slow: BTreeSet<ClientId>,
}

impl ClientManager {
    /// Creates an empty manager. Ids start from 1.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: BTreeMap::new(),
            next_client_id: 1,
            max_clients,
            slow: BTreeSet::new(),
        }
    }

    /// Registers a new connection.
    ///
    /// Returns `None` when the server is at capacity; the caller is
    /// responsible for telling the peer.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbox: mpsc::Sender<Frame>,
    ) -> Option<ClientId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, outbox));

        Some(client_id)
    }

    /// Records the reader task so it can be stopped on removal.
    pub fn attach_reader(&mut self, client_id: ClientId, reader: AbortHandle) {
        match self.clients.get_mut(&client_id) {
            Some(client) => client.reader = Some(reader),
            None => reader.abort(),
        }
    }

    /// Forgets a connection, stopping its reader and letting its writer drain.
    ///
    /// Returns true if the client was present.
    pub fn remove_client(&mut self, client_id: ClientId) -> bool {
        if let Some(client) = self.clients.remove(&client_id) {
            info!("Client {} ({}) disconnected", client.id, client.addr);
            true
        } else {
            false
        }
    }

    /// Marks a client as active.
    pub fn touch(&mut self, client_id: ClientId) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    /// Removes clients idle for longer than `timeout` and returns their ids
    /// so the game can drop their players too.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<ClientId> {
        let timed_out: Vec<ClientId> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(timeout))
            .map(|client| client.id)
            .collect();

        for client_id in &timed_out {
            info!("Client {} timed out", client_id);
            self.remove_client(*client_id);
        }

        timed_out
    }

    /// Removes every connection that fell behind since the last call and
    /// returns their ids so the game can drop their players too.
    pub fn take_slow_clients(&mut self) -> Vec<ClientId> {
        let slow: Vec<ClientId> = std::mem::take(&mut self.slow).into_iter().collect();
        for client_id in &slow {
            self.remove_client(*client_id);
        }
        slow
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.clients.contains_key(&client_id)
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn encode(packet: &ServerPacket) -> Option<Frame> {
        match encode_frame(packet) {
            Ok(frame) => Some(Arc::new(frame)),
            Err(e) => {
                error!("Failed to encode outbound packet: {}", e);
                None
            }
        }
    }

    fn deliver(client: &Client, frame: Frame, slow: &mut BTreeSet<ClientId>) {
        match client.queue(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if slow.insert(client.id) {
                    warn!("Client {} is not keeping up, dropping it", client.id);
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Writer for client {} already closed", client.id);
            }
        }
    }
}

impl Gateway for ClientManager {
    fn send_to(&mut self, client_id: ClientId, packet: ServerPacket) {
        let Some(client) = self.clients.get(&client_id) else {
            debug!("Dropping packet for unknown client {}", client_id);
            return;
        };
        if let Some(frame) = Self::encode(&packet) {
            Self::deliver(client, frame, &mut self.slow);
        }
    }

    fn publish_snapshot(&mut self, players: &BTreeMap<ClientId, Player>) {
        if self.clients.is_empty() {
            return;
        }

        let packet = ServerPacket::UpdatePlayers {
            players: players.clone(),
        };
        let Some(frame) = Self::encode(&packet) else {
            if let Some(largest) = players
                .values()
                .max_by_key(|player| player.trail.len() + player.territory.len())
            {
                error!(
                    "Snapshot not sent; largest player is {} with {} trail and {} territory points",
                    largest.id,
                    largest.trail.len(),
                    largest.territory.len()
                );
            }
            return;
        };
        for client in self.clients.values() {
            Self::deliver(client, Arc::clone(&frame), &mut self.slow);
        }
    }
}
