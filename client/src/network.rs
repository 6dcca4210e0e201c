use crate::game::{ClientGameState, Reaction};
use crate::input::Pilot;
use log::{debug, error, info, warn};
use shared::{
    decode_payload, encode_frame, read_frame, write_frame, ClientPacket, Coord, ServerPacket,
};
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant};

/// Everything the bot needs to know before connecting.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub server: String,
    pub username: String,
    pub requested_position: Coord,
    pub step: f64,
    pub loop_size: u32,
    pub move_interval: Duration,
    /// Leave after this many completed loops; run forever when `None`.
    pub max_loops: Option<u32>,
    /// Stand still at home this long after each completed loop.
    pub rest: Option<Duration>,
}

pub struct Client {
    writer: OwnedWriteHalf,
    inbound: mpsc::UnboundedReceiver<ServerPacket>,
    config: BotConfig,
    game_state: ClientGameState,
    pilot: Option<Pilot>,
    joined: bool,
    /// Loops already followed by a rest
    rested_loops: u32,
    resume_at: Option<Instant>,
}

impl Client {
    pub async fn connect(config: BotConfig) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Connecting to {}...", config.server);
        let stream = TcpStream::connect(&config.server).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        Ok(Client {
            writer,
            inbound: Self::spawn_reader(reader),
            config,
            game_state: ClientGameState::new(),
            pilot: None,
            joined: false,
            rested_loops: 0,
            resume_at: None,
        })
    }

    /// Reads frames on a separate task so the main loop can select on a channel.
    fn spawn_reader(mut reader: OwnedReadHalf) -> mpsc::UnboundedReceiver<ServerPacket> {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let payload = match read_frame(&mut reader).await {
                    Ok(Some(payload)) => payload,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        break;
                    }
                };
                match decode_payload::<ServerPacket>(&payload) {
                    Ok(packet) => {
                        if tx.send(packet).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to decode server packet: {}", e),
                }
            }
        });

        rx
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    async fn send_packet(
        &mut self,
        packet: &ClientPacket,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let frame = encode_frame(packet)?;
        write_frame(&mut self.writer, &frame).await?;
        Ok(())
    }

    async fn join(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let packet = ClientPacket::Join {
            username: self.config.username.clone(),
            requested_position: self.config.requested_position,
        };
        self.send_packet(&packet).await?;
        self.joined = true;
        Ok(())
    }

    /// Applies a server packet. Returns false when the session is over.
    fn handle_packet(&mut self, packet: ServerPacket) -> bool {
        match self.game_state.apply(packet) {
            Reaction::Nothing => {}
            Reaction::Spawned(position) => match self.pilot.as_mut() {
                Some(pilot) => pilot.reset(position),
                None => {
                    self.pilot = Some(Pilot::new(
                        position,
                        self.config.step,
                        self.config.loop_size,
                    ))
                }
            },
            Reaction::Died => {
                info!(
                    "Rejoining after death (kills {}, captures {})",
                    self.game_state.kills, self.game_state.captures
                );
                self.joined = false;
                // The old route leads back into the killer's territory.
                self.pilot = None;
                self.rested_loops = 0;
                self.resume_at = None;
            }
            Reaction::Disconnected => return false,
        }
        true
    }

    async fn step(&mut self) -> Result<bool, Box<dyn std::error::Error>> {
        if !self.joined {
            if self.game_state.client_id.is_some() {
                self.join().await?;
            }
            return Ok(true);
        }

        let Some(pilot) = self.pilot.as_mut() else {
            return Ok(true);
        };
        if let Some(max_loops) = self.config.max_loops {
            if pilot.loops_completed() >= max_loops {
                info!(
                    "Completed {} loops with score {:.2}",
                    max_loops,
                    self.game_state.score()
                );
                return Ok(false);
            }
        }
        if let Some(rest) = self.config.rest {
            if pilot.is_paused() {
                if self.resume_at.is_some_and(|at| Instant::now() >= at) {
                    pilot.toggle_pause();
                    self.resume_at = None;
                    debug!("Resuming after rest");
                }
            } else if pilot.loops_completed() > self.rested_loops {
                self.rested_loops = pilot.loops_completed();
                pilot.toggle_pause();
                self.resume_at = Some(Instant::now() + rest);
                info!("Loop {} done, resting for {:?}", self.rested_loops, rest);
            }
        }
        if let Some(position) = pilot.next_position() {
            self.send_packet(&ClientPacket::Move { position }).await?;
        }
        Ok(true)
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut move_interval = interval(self.config.move_interval);

        loop {
            tokio::select! {
                packet = self.inbound.recv() => {
                    let Some(packet) = packet else {
                        warn!("Server closed the connection");
                        return Ok(());
                    };
                    if !self.handle_packet(packet) {
                        return Ok(());
                    }
                },

                _ = move_interval.tick() => {
                    if !self.step().await? {
                        break;
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, leaving the game...");
                    break;
                },
            }
        }

        let _ = self.send_packet(&ClientPacket::Disconnect).await;
        Ok(())
    }
}
