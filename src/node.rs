use crate::error::{Result, ScoutError};
use crate::events::IERC20;
use alloy::consensus::Transaction;
use alloy::network::TransactionResponse;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::BlockNumberOrTag;
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::future::IntoFuture;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

const HTTP_POLL_INTERVAL: Duration = Duration::from_secs(4);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120); // 2 minutes timeout per request

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionView {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptView {
    pub hash: B256,
    pub logs: Vec<LogEntry>,
}

/// Read access to one chain's node.
///
/// Lookups return `Ok(None)` when the node answers but has no such object;
/// transport failures are `Err`.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn get_block_transactions(&self, block_number: u64) -> Result<Option<Vec<B256>>>;

    async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionView>>;

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptView>>;

    async fn token_name(&self, token: Address) -> Result<String>;

    async fn token_symbol(&self, token: Address) -> Result<String>;

    async fn token_decimals(&self, token: Address) -> Result<u8>;

    /// Stream of newly mined block numbers.
    async fn subscribe_blocks(&self) -> Result<BoxStream<'static, u64>>;
}

async fn timed<T, E, F>(request: F) -> Result<T>
where
    F: IntoFuture<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    timed_for(REQUEST_TIMEOUT, request).await
}

async fn timed_for<T, E, F>(limit: Duration, request: F) -> Result<T>
where
    F: IntoFuture<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    match timeout(limit, request.into_future()).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ScoutError::node(e)),
        Err(_) => Err(ScoutError::Node(format!(
            "request timeout after {} seconds",
            limit.as_secs()
        ))),
    }
}

/// Block numbers to announce after one poll of the chain head.
///
/// The first successful poll announces only the head. Later polls announce
/// every number after `last_seen` up to the head. A failed poll (`None`)
/// announces nothing.
fn next_blocks(last_seen: Option<u64>, latest: Option<u64>) -> Vec<u64> {
    match (last_seen, latest) {
        (_, None) => Vec::new(),
        (None, Some(latest)) => vec![latest],
        (Some(last), Some(latest)) if latest > last => ((last + 1)..=latest).collect(),
        (Some(_), Some(_)) => Vec::new(),
    }
}

#[derive(Clone)]
pub struct AlloyNodeClient {
    provider: DynProvider,
    pubsub: bool,
}

impl AlloyNodeClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let pubsub = url.starts_with("ws://") || url.starts_with("wss://");
        let provider = timed_for(CONNECT_TIMEOUT, ProviderBuilder::new().connect(url))
            .await?
            .erased();

        Ok(AlloyNodeClient { provider, pubsub })
    }

    fn poll_new_blocks(&self) -> BoxStream<'static, u64> {
        let mut ticker = interval(HTTP_POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let state = (self.provider.clone(), ticker, None::<u64>);

        stream::unfold(state, |(provider, mut ticker, last_seen)| async move {
            ticker.tick().await;
            let latest = provider
                .get_block_number()
                .await
                .inspect_err(|e| warn!("Block number poll failed: {}", e))
                .ok();
            let fresh = next_blocks(last_seen, latest);
            let last_seen = fresh.last().copied().or(last_seen);
            Some((fresh, (provider, ticker, last_seen)))
        })
        .flat_map(stream::iter)
        .boxed()
    }
}

#[async_trait]
impl NodeClient for AlloyNodeClient {
    async fn get_block_transactions(&self, block_number: u64) -> Result<Option<Vec<B256>>> {
        let block = timed(
            self.provider
                .get_block_by_number(BlockNumberOrTag::Number(block_number)),
        )
        .await?;

        Ok(block.map(|block| block.transactions.hashes().collect()))
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionView>> {
        let tx = timed(self.provider.get_transaction_by_hash(hash)).await?;

        Ok(tx.map(|tx| TransactionView {
            hash: TransactionResponse::tx_hash(&tx),
            from: TransactionResponse::from(&tx),
            to: Transaction::to(&tx),
            value: Transaction::value(&tx),
        }))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptView>> {
        let receipt = timed(self.provider.get_transaction_receipt(hash)).await?;

        Ok(receipt.map(|receipt| ReceiptView {
            hash: receipt.transaction_hash,
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| LogEntry {
                    address: log.address(),
                    topics: log.topics().to_vec(),
                    data: log.data().data.clone(),
                })
                .collect(),
        }))
    }

    async fn token_name(&self, token: Address) -> Result<String> {
        let contract = IERC20::new(token, self.provider.clone());
        timed(contract.name().call()).await
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        let contract = IERC20::new(token, self.provider.clone());
        timed(contract.symbol().call()).await
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        let contract = IERC20::new(token, self.provider.clone());
        timed(contract.decimals().call()).await
    }

    async fn subscribe_blocks(&self) -> Result<BoxStream<'static, u64>> {
        if !self.pubsub {
            info!("Polling for new blocks every {:?}", HTTP_POLL_INTERVAL);
            return Ok(self.poll_new_blocks());
        }

        let subscription = self
            .provider
            .subscribe_blocks()
            .await
            .map_err(ScoutError::node)?;
        debug!("Subscribed to new block headers");

        Ok(subscription
            .into_stream()
            .map(|header| header.number)
            .boxed())
    }
}
