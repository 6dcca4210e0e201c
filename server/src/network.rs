//! Server network layer: TCP connections feeding a single game loop

use crate::broadcast::Gateway;
use crate::client_manager::{ClientManager, Frame};
use crate::config::ServerConfig;
use crate::game::GameState;
use log::{debug, error, info, warn};
use shared::{
    decode_payload, encode_frame, read_frame, write_frame, ClientId, ClientPacket, ServerPacket,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::interval;

const TIMEOUT_CHECK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        client_id: ClientId,
        packet: ClientPacket,
    },
    ConnectionClosed {
        client_id: ClientId,
    },
    Shutdown,
}

/// Owns the listener, every connection and the game state.
///
/// Game mutations only ever happen inside `run`, one message at a time.
pub struct Server {
    listener: TcpListener,
    clients: ClientManager,
    game: GameState,
    idle_timeout: Option<Duration>,
    outbox_capacity: usize,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(addr: &str, config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        let game = match config.rng_seed {
            Some(seed) => GameState::with_seed(config.game, seed),
            None => GameState::new(config.game),
        };
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            clients: ClientManager::new(config.max_clients),
            game,
            idle_timeout: config.idle_timeout,
            outbox_capacity: config.outbox_capacity.max(1),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping `run` from another task.
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns the task that drains a connection's outbox into its socket.
    fn spawn_writer(
        client_label: String,
        mut writer: OwnedWriteHalf,
        capacity: usize,
    ) -> mpsc::Sender<Frame> {
        let (outbox, mut frames) = mpsc::channel::<Frame>(capacity);

        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                if let Err(e) = write_frame(&mut writer, &frame).await {
                    debug!("Write to {} failed: {}", client_label, e);
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });

        outbox
    }

    /// Spawns the task that decodes frames from one connection.
    ///
    /// Undecodable or invalid packets are dropped; framing errors and EOF
    /// end the connection.
    fn spawn_reader(
        client_id: ClientId,
        mut reader: OwnedReadHalf,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let payload = match read_frame(&mut reader).await {
                    Ok(Some(payload)) => payload,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Closing client {}: {}", client_id, e);
                        break;
                    }
                };

                let mut packet = match decode_payload::<ClientPacket>(&payload) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("Failed to decode packet from client {}: {}", client_id, e);
                        continue;
                    }
                };
                if let Err(e) = packet.validate() {
                    warn!("Rejected packet from client {}: {}", client_id, e);
                    continue;
                }

                if server_tx
                    .send(ServerMessage::PacketReceived { client_id, packet })
                    .is_err()
                {
                    return;
                }
            }

            let _ = server_tx.send(ServerMessage::ConnectionClosed { client_id });
        })
    }

    fn handle_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }
        let (reader, writer) = stream.into_split();
        let outbox = Self::spawn_writer(addr.to_string(), writer, self.outbox_capacity);

        let Some(client_id) = self.clients.add_client(addr, outbox.clone()) else {
            warn!("Rejecting {}: server full", addr);
            let rejection = ServerPacket::Disconnected {
                reason: "Server full".to_string(),
            };
            match encode_frame(&rejection) {
                Ok(frame) => {
                    let _ = outbox.try_send(Arc::new(frame));
                }
                Err(e) => error!("Failed to encode rejection: {}", e),
            }
            return;
        };

        let reader = Self::spawn_reader(client_id, reader, self.server_tx.clone());
        self.clients.attach_reader(client_id, reader.abort_handle());

        self.clients
            .send_to(client_id, ServerPacket::Connected { client_id });
    }

    fn handle_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::PacketReceived { client_id, packet } => {
                // Late packets from a connection already dropped.
                if !self.clients.contains(client_id) {
                    return true;
                }
                self.clients.touch(client_id);

                let disconnecting = packet == ClientPacket::Disconnect;
                self.game.handle_packet(client_id, packet, &mut self.clients);
                if disconnecting {
                    self.clients.remove_client(client_id);
                }
                true
            }
            ServerMessage::ConnectionClosed { client_id } => {
                self.clients.remove_client(client_id);
                self.game.remove_player(client_id, &mut self.clients);
                true
            }
            ServerMessage::Shutdown => false,
        }
    }

    fn check_timeouts(&mut self, timeout: Duration) {
        for client_id in self.clients.check_timeouts(timeout) {
            self.game.remove_player(client_id, &mut self.clients);
        }
    }

    /// Drops connections whose outbox overflowed, along with their players.
    ///
    /// Removing a player publishes a snapshot that can overflow another
    /// queue, so this repeats until no connection is left behind.
    fn drop_slow_clients(&mut self) {
        loop {
            let slow = self.clients.take_slow_clients();
            if slow.is_empty() {
                break;
            }
            for client_id in slow {
                self.game.remove_player(client_id, &mut self.clients);
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), ServerError> {
        let mut timeout_interval = interval(TIMEOUT_CHECK_PERIOD);

        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.handle_connection(stream, addr),
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                },

                message = self.server_rx.recv() => {
                    // The loop holds its own sender, so `None` cannot happen.
                    let Some(message) = message else { break };
                    if !self.handle_message(message) {
                        info!("Server shutting down");
                        break;
                    }
                    self.drop_slow_clients();
                },

                _ = timeout_interval.tick() => {
                    if let Some(timeout) = self.idle_timeout {
                        self.check_timeouts(timeout);
                    }
                    self.drop_slow_clients();
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use tokio::net::TcpStream;

    fn test_config() -> ServerConfig {
        ServerConfig {
            max_clients: 2,
            outbox_capacity: 64,
            idle_timeout: None,
            rng_seed: Some(7),
            game: GameConfig {
                default_position: [0.0, 0.0],
                ..GameConfig::default()
            },
        }
    }

    async fn next_packet(stream: &mut TcpStream) -> ServerPacket {
        let payload = read_frame(stream).await.unwrap().unwrap();
        decode_payload(&payload).unwrap()
    }

    async fn send_packet(stream: &mut TcpStream, packet: &ClientPacket) {
        let frame = encode_frame(packet).unwrap();
        write_frame(stream, &frame).await.unwrap();
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

        tx.send(ServerMessage::PacketReceived {
            client_id: 3,
            packet: ClientPacket::GetPlayers,
        })
        .unwrap();

        match rx.try_recv().unwrap() {
            ServerMessage::PacketReceived { client_id, packet } => {
                assert_eq!(client_id, 3);
                assert_eq!(packet, ClientPacket::GetPlayers);
            }
            other => panic!("Unexpected message type {:?}", other),
        }
    }

    #[test]
    fn test_error_message_formatting() {
        let error = ServerError::Bind {
            addr: "0.0.0.0:1".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(error.to_string(), "failed to bind 0.0.0.0:1: in use");
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let first = Server::new("127.0.0.1:0", test_config()).await.unwrap();
        let addr = first.local_addr().unwrap().to_string();

        let second = Server::new(&addr, test_config()).await;
        assert!(matches!(second, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_connect_join_and_snapshot() {
        let mut server = Server::new("127.0.0.1:0", test_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = tokio::spawn(async move { server.run().await });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        assert_eq!(
            next_packet(&mut stream).await,
            ServerPacket::Connected { client_id: 1 }
        );

        send_packet(
            &mut stream,
            &ClientPacket::Join {
                username: "  ann  ".into(),
                requested_position: [0.0, 0.0],
            },
        )
        .await;

        assert_eq!(
            next_packet(&mut stream).await,
            ServerPacket::SpawnPosition {
                position: [0.0, 0.0]
            }
        );
        match next_packet(&mut stream).await {
            ServerPacket::UpdatePlayers { players } => {
                assert_eq!(players[&1].username, "ann");
            }
            other => panic!("Unexpected packet {:?}", other),
        }

        shutdown.send(ServerMessage::Shutdown).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_full_server_rejects_connection() {
        let config = ServerConfig {
            max_clients: 1,
            ..test_config()
        };
        let mut server = Server::new("127.0.0.1:0", config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = tokio::spawn(async move { server.run().await });

        let mut first = TcpStream::connect(addr).await.unwrap();
        assert!(matches!(
            next_packet(&mut first).await,
            ServerPacket::Connected { .. }
        ));

        let mut second = TcpStream::connect(addr).await.unwrap();
        assert_eq!(
            next_packet(&mut second).await,
            ServerPacket::Disconnected {
                reason: "Server full".to_string()
            }
        );
        assert!(read_frame(&mut second).await.unwrap().is_none());

        shutdown.send(ServerMessage::Shutdown).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_client_that_stops_reading_is_dropped() {
        let config = ServerConfig {
            outbox_capacity: 4,
            ..test_config()
        };
        let mut server = Server::new("127.0.0.1:0", config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = tokio::spawn(async move { server.run().await });

        let mut stuck = TcpStream::connect(addr).await.unwrap();
        next_packet(&mut stuck).await;
        let mut mover = TcpStream::connect(addr).await.unwrap();
        next_packet(&mut mover).await;

        send_packet(
            &mut mover,
            &ClientPacket::Join {
                username: "ann".into(),
                requested_position: [0.0, 0.0],
            },
        )
        .await;
        next_packet(&mut mover).await;
        next_packet(&mut mover).await;

        // Every move outside the territory grows the trail, and with it every
        // snapshot, until the socket buffers of the idle connection fill up.
        for i in 0..2_000 {
            let position = [0.001 + i as f64 * 0.00001, 0.0];
            send_packet(&mut mover, &ClientPacket::Move { position }).await;
            assert!(matches!(
                next_packet(&mut mover).await,
                ServerPacket::UpdatePlayers { .. }
            ));
        }

        // The idle connection gets what was already queued, then EOF.
        let drained = tokio::time::timeout(Duration::from_secs(10), async {
            while let Ok(Some(_)) = read_frame(&mut stuck).await {}
        })
        .await;
        assert!(drained.is_ok(), "idle connection was never dropped");

        send_packet(&mut mover, &ClientPacket::GetPlayers).await;
        match next_packet(&mut mover).await {
            ServerPacket::UpdatePlayers { players } => assert_eq!(players.len(), 1),
            other => panic!("Unexpected packet {:?}", other),
        }

        shutdown.send(ServerMessage::Shutdown).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_invalid_packet_is_dropped_connection_survives() {
        let mut server = Server::new("127.0.0.1:0", test_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = tokio::spawn(async move { server.run().await });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        next_packet(&mut stream).await;

        send_packet(
            &mut stream,
            &ClientPacket::Join {
                username: "   ".into(),
                requested_position: [0.0, 0.0],
            },
        )
        .await;
        send_packet(&mut stream, &ClientPacket::GetPlayers).await;

        assert_eq!(
            next_packet(&mut stream).await,
            ServerPacket::UpdatePlayers {
                players: Default::default()
            }
        );

        shutdown.send(ServerMessage::Shutdown).unwrap();
        handle.await.unwrap().unwrap();
    }
}
