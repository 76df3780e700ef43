use anyhow::Result;
use chain_scouter::config::Config;
use chain_scouter::logging;
use chain_scouter::records::ChainLabel;
use chain_scouter::registry::MonitorRegistry;
use chain_scouter::retry::RetryPolicies;
use chain_scouter::sink::{OutputFormat, sink_for};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "scouter")]
#[command(about = "Watch EVM chains for native and ERC20 transfers touching a wallet", long_about = None)]
struct Cli {
    /// JSON file listing the chains to watch; defaults to the built-in networks.
    #[arg(long)]
    chains: Option<PathBuf>,

    #[arg(short, long, default_value = "text")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    info!("Starting chain scouter");

    let config = match &cli.chains {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    info!("Configuration loaded: {} chain(s)", config.chains.len());

    let mut policies = RetryPolicies::default();
    if let Some(backoff) = config.retry_backoff {
        info!("Retry backoff unit set to {:?}", backoff);
        policies = policies.with_backoff(backoff);
    }

    let sink = sink_for(OutputFormat::from(cli.format.as_str()));
    let mut registry = MonitorRegistry::build(config.chains, sink, policies);

    if registry.connect_all().await == 0 {
        anyhow::bail!("No chain could be connected, check the node URLs");
    }

    let monitors = registry.start_all();
    tokio::pin!(monitors);

    tokio::select! {
        outcomes = &mut monitors => report_stopped(&outcomes),
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("Received shutdown signal, stopping");
                Ok(())
            }
            Err(e) => {
                warn!("Unable to listen for shutdown signal: {}", e);
                let outcomes = monitors.await;
                report_stopped(&outcomes)
            }
        },
    }
}

fn report_stopped(outcomes: &[(ChainLabel, chain_scouter::error::Result<()>)]) -> Result<()> {
    let failed = outcomes.iter().filter(|(_, result)| result.is_err()).count();
    error!(
        "All {} chain monitor(s) stopped, {} with errors",
        outcomes.len(),
        failed
    );
    anyhow::bail!("All chain monitors stopped")
}
