use crate::config::MonitorConfig;
use crate::error::Result;
use crate::monitor::ChainMonitor;
use crate::records::ChainLabel;
use crate::retry::RetryPolicies;
use crate::sink::TransferSink;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub struct MonitorRegistry {
    configs: Vec<MonitorConfig>,
    sink: Arc<dyn TransferSink>,
    policies: RetryPolicies,
    monitors: Vec<ChainMonitor>,
}

impl MonitorRegistry {
    pub fn build(
        configs: Vec<MonitorConfig>,
        sink: Arc<dyn TransferSink>,
        policies: RetryPolicies,
    ) -> Self {
        info!("Creating monitors for {} chain(s)", configs.len());
        MonitorRegistry {
            configs,
            sink,
            policies,
            monitors: Vec::new(),
        }
    }

    /// Adds an already connected monitor.
    pub fn push(&mut self, monitor: ChainMonitor) {
        self.monitors.push(monitor);
    }

    pub fn monitors(&self) -> &[ChainMonitor] {
        &self.monitors
    }

    /// Connects every configured chain concurrently. Chains that fail are
    /// logged and left out; the rest still start. Returns the number of
    /// connected monitors.
    pub async fn connect_all(&mut self) -> usize {
        let configs = std::mem::take(&mut self.configs);
        let attempts = configs.iter().map(|config| {
            ChainMonitor::connect(config, Arc::clone(&self.sink), self.policies)
        });
        let results = join_all(attempts).await;

        for (config, result) in configs.iter().zip(results) {
            match result {
                Ok(monitor) => self.monitors.push(monitor),
                Err(e) => error!(
                    "Skipping {} (chain id {}): {}",
                    config.chain_name, config.chain_id, e
                ),
            }
        }

        info!("{} chain monitor(s) connected", self.monitors.len());
        self.monitors.len()
    }

    /// Runs every monitor on its own task and waits for all of them to stop.
    /// One chain stopping never affects another.
    pub async fn start_all(self) -> Vec<(ChainLabel, Result<()>)> {
        let mut tasks = JoinSet::new();
        for mut monitor in self.monitors {
            tasks.spawn(async move {
                let result = monitor.run().await;
                (monitor.chain().clone(), result)
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((chain, result)) => {
                    match &result {
                        Ok(()) => info!("Monitor for {} stopped", chain),
                        Err(e) => error!(
                            "Monitor for {} stopped: {} (cause: {})",
                            chain,
                            e,
                            e.root_cause()
                        ),
                    }
                    outcomes.push((chain, result));
                }
                Err(e) => warn!("Monitor task aborted: {}", e),
            }
        }
        outcomes
    }
}
