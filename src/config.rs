use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Networks watched when no chain file is given: display name, chain id and
/// the environment variable holding the node URL.
pub const NETWORKS: &[(&str, u64, &str)] = &[
    ("Sepolia", 11155111, "SEPOLIA"),
    ("ZetaChain Testnet", 7001, "ZETACHAIN"),
    ("BNB Smart Chain Testnet", 97, "BSC"),
    ("Polygon Amoy Testnet", 80002, "POLYGON_AMOY"),
    ("Avalanche Fuji Testnet", 43113, "AVALANCHE_FUJI"),
    ("Base Sepolia", 84532, "BASE"),
    ("Optimism Sepolia", 11155420, "OPTIMISM"),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitorConfig {
    pub chain_name: String,
    pub chain_id: u64,
    pub wallet_address: Address,
    #[serde(default)]
    pub node_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub chains: Vec<MonitorConfig>,
    pub retry_backoff: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let wallet_str = lookup("WALLET_ADDRESS").context("WALLET_ADDRESS must be set in .env")?;
        let wallet_address =
            Address::from_str(wallet_str.trim()).context("Invalid WALLET_ADDRESS format")?;

        let chains = NETWORKS
            .iter()
            .map(|&(chain_name, chain_id, url_var)| MonitorConfig {
                chain_name: chain_name.to_string(),
                chain_id,
                wallet_address,
                node_url: lookup(url_var).filter(|url| !url.trim().is_empty()),
            })
            .collect();

        Ok(Config {
            chains,
            retry_backoff: retry_backoff(&lookup)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        dotenv::dotenv().ok();

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read chain file {}", path.display()))?;
        let chains: Vec<MonitorConfig> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid chain file {}", path.display()))?;

        Ok(Config {
            chains,
            retry_backoff: retry_backoff(&|key: &str| std::env::var(key).ok())?,
        })
    }
}

fn retry_backoff(lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<Duration>> {
    lookup("RETRY_BACKOFF_MS")
        .map(|ms| {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .context("RETRY_BACKOFF_MS must be a whole number of milliseconds")
        })
        .transpose()
}
