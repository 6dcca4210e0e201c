use clap::Parser;
use log::{error, info};
use server::config::{GameConfig, ServerConfig};
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of concurrent connections
    #[arg(short, long, default_value = "64")]
    max_clients: usize,

    /// Seconds of silence before a client is dropped (0 disables)
    #[arg(long, default_value = "120")]
    idle_timeout_secs: u64,

    /// Seed for spawn placement, for reproducible sessions
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum distance between a new spawn and existing players
    #[arg(long, default_value = "0.0005")]
    min_spawn_distance: f64,

    /// Half side length of the starting territory square
    #[arg(long, default_value = "0.0002")]
    seed_half_size: f64,

    /// Longest trail a player may drag outside their territory
    #[arg(long, default_value = "10000")]
    max_trail_len: usize,

    /// Frames queued per connection before it is dropped as too slow
    #[arg(long, default_value = "256")]
    outbox_capacity: usize,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            max_clients: self.max_clients,
            outbox_capacity: self.outbox_capacity,
            idle_timeout: (self.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.idle_timeout_secs)),
            rng_seed: self.seed,
            game: GameConfig {
                min_spawn_distance: self.min_spawn_distance,
                seed_half_size: self.seed_half_size,
                max_trail_len: self.max_trail_len,
                ..GameConfig::default()
            },
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
    let addr = format!("{}:{}", args.host, args.port);

    info!("Starting territory server...");
    info!(
        "Max clients: {}, idle timeout: {}s",
        args.max_clients, args.idle_timeout_secs
    );

    let mut server = Server::new(&addr, args.server_config()).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped with error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
