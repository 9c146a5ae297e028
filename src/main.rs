//! Curling Engine Client
//!
//! Connects to a match server and plays one match.
//!
//! Usage: `curling-engine <host> <port>`. A wrong argument count exits with
//! status 1; every other failure is logged and exits with status 0.

use std::process::ExitCode;

use anyhow::Context;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use curling_engine::{
    network::client::ConfigError,
    ClientConfig, PlannerConfig, ProtocolClient, TurnPlanner, VERSION,
};

fn main() -> ExitCode {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }

    let args: Vec<String> = std::env::args().collect();
    let config = match ClientConfig::from_args(&args) {
        Ok(config) => config,
        Err(e @ ConfigError::Usage { .. }) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
        Err(e) => {
            error!("{}", e);
            return ExitCode::SUCCESS;
        }
    };

    info!("Curling Engine v{}", VERSION);

    if let Err(e) = run(config) {
        error!("{:#}", e);
    }
    ExitCode::SUCCESS
}

fn run(config: ClientConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async move {
        let address = config.address();
        let stream = TcpStream::connect(&address)
            .await
            .with_context(|| format!("Failed to connect to {address}"))?;
        stream.set_nodelay(true).context("Failed to configure socket")?;
        info!("Connected to {} as {}", address, config.name);

        let (read_half, write_half) = stream.into_split();
        let planner = TurnPlanner::new(PlannerConfig::default());
        let mut client = ProtocolClient::new(BufReader::new(read_half), write_half, planner, config.name);

        client.run().await.context("Match aborted")?;
        info!("Match finished");
        Ok::<(), anyhow::Error>(())
    })
}
