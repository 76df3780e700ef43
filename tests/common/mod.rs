#![allow(dead_code)]

use alloy::sol_types::SolEvent;
use alloy_primitives::{Address, B256, Bytes, U256, address};
use async_trait::async_trait;
use chain_scouter::config::MonitorConfig;
use chain_scouter::error::{Result, ScoutError};
use chain_scouter::events::Transfer;
use chain_scouter::node::{LogEntry, NodeClient, ReceiptView, TransactionView};
use chain_scouter::retry::{RetryPolicies, RetryPolicy};
use futures::stream::{self, BoxStream, StreamExt};
use chain_scouter::logging;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

pub const WALLET: Address = address!("0x8ba1f109551bd432803012645ac136ddd64dba72");
pub const OTHER: Address = address!("0x000000000000000000000000000000000000dEaD");

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn hash(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

pub fn ether(tenths: u64) -> U256 {
    U256::from(tenths) * U256::from(100_000_000_000_000_000u64)
}

pub fn fast_policies() -> RetryPolicies {
    RetryPolicies::uniform(RetryPolicy::new(3, 1, Duration::from_millis(1)))
}

pub fn monitor_config(name: &str, chain_id: u64) -> MonitorConfig {
    MonitorConfig {
        chain_name: name.to_string(),
        chain_id,
        wallet_address: WALLET,
        node_url: None,
    }
}

pub fn tx(hash: B256, from: Address, to: Option<Address>, value: U256) -> TransactionView {
    TransactionView {
        hash,
        from,
        to,
        value,
    }
}

pub fn transfer_log(token: Address, from: Address, to: Address, value: u64) -> LogEntry {
    LogEntry {
        address: token,
        topics: vec![Transfer::SIGNATURE_HASH, from.into_word(), to.into_word()],
        data: Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec()),
    }
}

pub fn approval_log(token: Address) -> LogEntry {
    LogEntry {
        address: token,
        topics: vec![B256::repeat_byte(0x8c), WALLET.into_word(), OTHER.into_word()],
        data: Bytes::from(U256::from(1u8).to_be_bytes::<32>().to_vec()),
    }
}

pub fn receipt(hash: B256, logs: Vec<LogEntry>) -> ReceiptView {
    ReceiptView { hash, logs }
}

/// Byte buffer shared between a writer and the test reading it back.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The binary's log formatting, writing plain text into `buffer`.
pub fn log_subscriber(buffer: &SharedBuffer) -> impl Subscriber + Send + Sync {
    let buffer = buffer.clone();
    logging::subscriber(EnvFilter::new("info"), move || buffer.clone(), false)
}

/// In-memory node answering from scripted blocks, transactions and tokens.
#[derive(Default)]
pub struct ScriptedNode {
    blocks: HashMap<u64, Vec<B256>>,
    transactions: HashMap<B256, TransactionView>,
    receipts: HashMap<B256, ReceiptView>,
    tokens: HashMap<Address, (String, String, u8)>,
    failing_tokens: HashSet<Address>,
    block_failures: Mutex<HashMap<u64, u32>>,
    block_delay: Option<Duration>,
    announced: Vec<u64>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(mut self, number: u64, hashes: Vec<B256>) -> Self {
        self.blocks.insert(number, hashes);
        self
    }

    pub fn transaction(mut self, tx: TransactionView, receipt: ReceiptView) -> Self {
        self.receipts.insert(tx.hash, receipt);
        self.transactions.insert(tx.hash, tx);
        self
    }

    /// A transaction the node knows but whose receipt is missing.
    pub fn transaction_without_receipt(mut self, tx: TransactionView) -> Self {
        self.transactions.insert(tx.hash, tx);
        self
    }

    pub fn token(mut self, address: Address, name: &str, symbol: &str, decimals: u8) -> Self {
        self.tokens
            .insert(address, (name.to_string(), symbol.to_string(), decimals));
        self
    }

    pub fn failing_token(mut self, address: Address) -> Self {
        self.failing_tokens.insert(address);
        self
    }

    /// Makes the first `times` lookups of `number` fail with a transport error.
    pub fn flaky_block(self, number: u64, times: u32) -> Self {
        self.block_failures.lock().unwrap().insert(number, times);
        self
    }

    pub fn slow_blocks(mut self, delay: Duration) -> Self {
        self.block_delay = Some(delay);
        self
    }

    pub fn announce(mut self, numbers: Vec<u64>) -> Self {
        self.announced = numbers;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn token_entry(&self, token: Address) -> Result<&(String, String, u8)> {
        if self.failing_tokens.contains(&token) {
            return Err(ScoutError::Node("execution reverted".to_string()));
        }
        self.tokens
            .get(&token)
            .ok_or_else(|| ScoutError::Node(format!("no contract at {token}")))
    }
}

#[async_trait]
impl NodeClient for ScriptedNode {
    async fn get_block_transactions(&self, block_number: u64) -> Result<Option<Vec<B256>>> {
        self.record(format!("block {block_number}"));
        if let Some(delay) = self.block_delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.block_failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&block_number) {
                if *left > 0 {
                    *left -= 1;
                    return Err(ScoutError::Node("connection reset".to_string()));
                }
            }
        }

        Ok(self.blocks.get(&block_number).cloned())
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionView>> {
        self.record(format!("tx {hash}"));
        Ok(self.transactions.get(&hash).cloned())
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptView>> {
        self.record(format!("receipt {hash}"));
        Ok(self.receipts.get(&hash).cloned())
    }

    async fn token_name(&self, token: Address) -> Result<String> {
        self.record(format!("name {token}"));
        self.token_entry(token).map(|(name, _, _)| name.clone())
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        self.record(format!("symbol {token}"));
        self.token_entry(token).map(|(_, symbol, _)| symbol.clone())
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        self.record(format!("decimals {token}"));
        self.token_entry(token).map(|(_, _, decimals)| *decimals)
    }

    async fn subscribe_blocks(&self) -> Result<BoxStream<'static, u64>> {
        self.record("subscribe".to_string());
        Ok(stream::iter(self.announced.clone()).boxed())
    }
}
