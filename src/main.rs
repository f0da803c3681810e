use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use iris_ideation::{
    capabilities::CapabilityClient,
    config::Config,
    engine::{EngineCore, ExplorationOptions, ExplorationSession},
};

/// Explore refinements of a research idea with a guided tree search.
#[derive(Debug, Parser)]
#[command(name = "iris-ideation", version, about)]
struct Cli {
    /// The research goal to ideate on
    #[arg(required_unless_present = "resume")]
    goal: Option<String>,

    /// Number of exploration iterations to run
    #[arg(short, long)]
    iterations: Option<u32>,

    /// Write the final tree to this JSON file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Resume from a tree snapshot instead of starting fresh
    #[arg(long, conflicts_with = "goal")]
    resume: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "IRIS ideation engine starting..."
    );

    // Initialize the capability client
    let client = match CapabilityClient::new(&config.capabilities, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %c.generation_url(), "Capability client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize capability client");
            return Err(e.into());
        }
    };

    let core = EngineCore::from_client(client);
    let options = ExplorationOptions {
        exploration_constant: config.engine.exploration_constant,
        default_iterations: config.engine.default_iterations as u32,
    };

    let session = match &cli.resume {
        Some(path) => ExplorationSession::resume(core, path, options).await?,
        None => {
            // clap guarantees the goal is present when not resuming.
            let goal = cli.goal.as_deref().unwrap_or_default();
            ExplorationSession::new(core, goal, options)?
        }
    };

    info!(session_id = %session.id(), "Session ready");

    let report = match session.explore(cli.iterations).await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Exploration failed");
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(path) = &cli.snapshot {
        session.save_snapshot(path).await?;
    }

    info!("Done");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        iris_ideation::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        iris_ideation::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
