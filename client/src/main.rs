use clap::Parser;
use client::network::{BotConfig, Client};
use log::info;
use shared::{DEFAULT_POSITION, MOVE_STEP};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Name shown to other players
    #[arg(short = 'u', long, default_value = "bot")]
    username: String,

    /// Distance moved per update
    #[arg(long, default_value_t = MOVE_STEP)]
    step: f64,

    /// Steps per side of each loop
    #[arg(short = 'l', long, default_value = "60")]
    loop_size: u32,

    /// Milliseconds between moves
    #[arg(short = 'i', long, default_value = "50")]
    interval_ms: u64,

    /// Requested spawn latitude
    #[arg(long, default_value_t = DEFAULT_POSITION[0], allow_negative_numbers = true)]
    lat: f64,

    /// Requested spawn longitude
    #[arg(long, default_value_t = DEFAULT_POSITION[1], allow_negative_numbers = true)]
    lng: f64,

    /// Disconnect after this many loops
    #[arg(long)]
    max_loops: Option<u32>,

    /// Milliseconds to rest at home after each loop (0 never rests)
    #[arg(long, default_value = "0")]
    rest_ms: u64,
}

impl Args {
    fn bot_config(&self) -> BotConfig {
        BotConfig {
            server: self.server.clone(),
            username: self.username.clone(),
            requested_position: [self.lat, self.lng],
            step: self.step,
            loop_size: self.loop_size,
            move_interval: Duration::from_millis(self.interval_ms.max(1)),
            max_loops: self.max_loops,
            rest: (self.rest_ms > 0).then(|| Duration::from_millis(self.rest_ms)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting bot {}...", args.username);
    info!(
        "Loop of {} steps x {} every {}ms",
        args.loop_size, args.step, args.interval_ms
    );

    let mut client = Client::connect(args.bot_config()).await?;
    client.run().await?;

    Ok(())
}
