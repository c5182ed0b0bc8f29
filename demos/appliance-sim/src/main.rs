//! Simulated keg scale appliance.
//!
//! Serves the `/scales` WebSocket so the client and the CLI can be tried
//! without hardware:
//!   cargo run -p kegscale-appliance-sim -- --port 8080 --scales 2
//!   kegscale --appliance http://localhost:8080 watch

mod appliance;
mod server;

use appliance::Appliance;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "appliance-sim", about = "Simulated keg scale appliance")]
struct Args {
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Number of simulated scales
    #[arg(short, long, default_value_t = 2)]
    scales: usize,

    /// Milliseconds between live measurement pushes
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("appliance_sim=info".parse()?))
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.tick_ms > 0, "--tick-ms must be greater than zero");

    let addr: SocketAddr = ([127, 0, 0, 1], args.port).into();
    tracing::info!("Simulating {} scales on {}", args.scales, addr);

    server::run(
        addr,
        Appliance::new(args.scales),
        Duration::from_millis(args.tick_ms),
    )
    .await
}
