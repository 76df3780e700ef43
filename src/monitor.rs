use crate::classifier::TransactionClassifier;
use crate::config::MonitorConfig;
use crate::error::{Result, ScoutError};
use crate::node::{AlloyNodeClient, NodeClient};
use crate::records::ChainLabel;
use crate::retry::{RetryPolicies, retry};
use crate::sink::TransferSink;
use alloy_primitives::B256;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    #[default]
    Idle,
    Processing {
        block_number: u64,
    },
}

/// FIFO of announced block numbers with a single-flight guard.
#[derive(Debug, Default)]
pub struct BlockQueue {
    pending: VecDeque<u64>,
    state: MonitorState,
}

impl BlockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block_number: u64) {
        self.pending.push_back(block_number);
    }

    /// Takes the oldest pending block if nothing is in flight.
    pub fn begin_next(&mut self) -> Option<u64> {
        if self.state != MonitorState::Idle {
            return None;
        }
        let block_number = self.pending.pop_front()?;
        self.state = MonitorState::Processing { block_number };
        Some(block_number)
    }

    pub fn finish(&mut self) {
        self.state = MonitorState::Idle;
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

struct BlockProcessor {
    chain: ChainLabel,
    client: Arc<dyn NodeClient>,
    classifier: TransactionClassifier,
    sink: Arc<dyn TransferSink>,
    policies: RetryPolicies,
}

impl BlockProcessor {
    async fn process_block(&mut self, block_number: u64) -> Result<usize> {
        info!(
            "Looking for transactions at block {} on {}",
            block_number, self.chain
        );

        let client = Arc::clone(&self.client);
        let node = client.as_ref();
        let hashes = retry(self.policies.block, "get_block", || async move {
            node.get_block_transactions(block_number)
                .await?
                .ok_or_else(|| ScoutError::NotFound(format!("block {block_number}")))
        })
        .await
        .map_err(|e| ScoutError::fatal_block(block_number, e))?;

        if hashes.is_empty() {
            info!("No transactions found at block {} on {}", block_number, self.chain);
            return Ok(0);
        }
        info!(
            "Found {} transactions at block {} on {}",
            hashes.len(),
            block_number,
            self.chain
        );

        let total = hashes.len();
        let mut emitted = 0;
        for (index, hash) in hashes.into_iter().enumerate() {
            debug!(
                "Processing transaction {}/{} at block {} on {}",
                index + 1,
                total,
                block_number,
                self.chain
            );
            emitted += self.process_transaction(node, hash).await;
        }

        Ok(emitted)
    }

    async fn process_transaction(&mut self, client: &dyn NodeClient, hash: B256) -> usize {
        let (tx, receipt) = tokio::join!(
            retry(self.policies.transaction, "get_transaction", || async move {
                client
                    .get_transaction(hash)
                    .await?
                    .ok_or_else(|| ScoutError::NotFound(format!("transaction {hash}")))
            }),
            retry(self.policies.receipt, "get_transaction_receipt", || async move {
                client
                    .get_transaction_receipt(hash)
                    .await?
                    .ok_or_else(|| ScoutError::NotFound(format!("receipt {hash}")))
            }),
        );

        let (tx, receipt) = match (tx, receipt) {
            (Ok(tx), Ok(receipt)) => (tx, receipt),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Skipping transaction {} on {}: {}", hash, self.chain, e);
                return 0;
            }
        };

        let mut emitted = 0;
        for record in self.classifier.classify(client, &tx, &receipt).await {
            match self.sink.emit(&record) {
                Ok(()) => emitted += 1,
                Err(e) => error!(
                    "Failed to emit {} transfer {} on {}: {}",
                    record.kind(),
                    hash,
                    self.chain,
                    e
                ),
            }
        }
        emitted
    }
}

/// Watches one chain: queues announced blocks and processes them one at a
/// time, oldest first.
pub struct ChainMonitor {
    chain: ChainLabel,
    processor: BlockProcessor,
    queue: BlockQueue,
}

impl ChainMonitor {
    pub fn new(
        config: &MonitorConfig,
        client: Arc<dyn NodeClient>,
        sink: Arc<dyn TransferSink>,
        policies: RetryPolicies,
    ) -> Self {
        let chain = ChainLabel::new(config.chain_name.clone(), config.chain_id);
        let classifier = TransactionClassifier::new(chain.clone(), config.wallet_address, policies);

        ChainMonitor {
            chain: chain.clone(),
            processor: BlockProcessor {
                chain,
                client,
                classifier,
                sink,
                policies,
            },
            queue: BlockQueue::new(),
        }
    }

    /// Opens the node connection for `config` and builds a monitor that owns it.
    pub async fn connect(
        config: &MonitorConfig,
        sink: Arc<dyn TransferSink>,
        policies: RetryPolicies,
    ) -> Result<Self> {
        let url = config
            .node_url
            .as_deref()
            .ok_or_else(|| ScoutError::Configuration {
                chain_name: config.chain_name.clone(),
                chain_id: config.chain_id,
            })?;

        let client = AlloyNodeClient::connect(url)
            .await
            .map_err(|e| ScoutError::Connection {
                chain_name: config.chain_name.clone(),
                chain_id: config.chain_id,
                reason: e.to_string(),
            })?;
        info!(
            "Connected to node for {} {}",
            config.chain_name, config.chain_id
        );

        Ok(Self::new(config, Arc::new(client), sink, policies))
    }

    pub fn chain(&self) -> &ChainLabel {
        &self.chain
    }

    pub fn state(&self) -> MonitorState {
        self.queue.state()
    }

    /// Subscribes to new blocks and processes them until the subscription
    /// ends or a block fails hard.
    pub async fn run(&mut self) -> Result<()> {
        let blocks = self.processor.client.subscribe_blocks().await?;
        info!("Listening for new blocks on {}", self.chain);
        self.run_with(blocks).await
    }

    /// Drives the monitor from an explicit block number stream. Everything
    /// logged while it runs, retries included, carries a `chain` span with
    /// the chain name and id.
    pub async fn run_with(&mut self, blocks: BoxStream<'static, u64>) -> Result<()> {
        let span = info_span!("chain", name = %self.chain.name, id = self.chain.id);
        self.drive(blocks).instrument(span).await
    }

    async fn drive(&mut self, blocks: BoxStream<'static, u64>) -> Result<()> {
        let mut blocks = blocks.fuse();
        let mut open = true;

        loop {
            let Some(block_number) = self.queue.begin_next() else {
                if !open {
                    warn!("New block subscription closed on {}", self.chain);
                    return Err(ScoutError::SubscriptionClosed);
                }
                match blocks.next().await {
                    Some(n) => enqueue(&mut self.queue, &self.chain, n),
                    None => open = false,
                }
                continue;
            };

            let Self {
                chain,
                processor,
                queue,
            } = &mut *self;

            let processing = processor.process_block(block_number);
            tokio::pin!(processing);

            let outcome = loop {
                tokio::select! {
                    outcome = &mut processing => break outcome,
                    next = blocks.next(), if open => match next {
                        Some(n) => enqueue(queue, chain, n),
                        None => open = false,
                    },
                }
            };

            match outcome {
                Ok(emitted) => {
                    info!(
                        "Finished block {} on {}: {} transfer(s), {} block(s) queued",
                        block_number,
                        chain,
                        emitted,
                        queue.len()
                    );
                    queue.finish();
                }
                Err(e) => {
                    error!("Failed to process block {} on {}: {}", block_number, chain, e);
                    return Err(e);
                }
            }
        }
    }
}

fn enqueue(queue: &mut BlockQueue, chain: &ChainLabel, block_number: u64) {
    info!("New block mined: {} on {}", block_number, chain);
    if let MonitorState::Processing { block_number: current } = queue.state() {
        debug!(
            "Already processing block {} on {}, queuing block {}",
            current, chain, block_number
        );
    }
    queue.push(block_number);
}
