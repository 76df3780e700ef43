use crate::error::Result;
use crate::events::{Transfer, decode_transfer_event};
use crate::node::{NodeClient, ReceiptView, TransactionView};
use crate::records::{
    ChainLabel, NATIVE_DECIMALS, NativeTransfer, TokenInfo, TokenTransfer, TransferRecord,
    format_amount,
};
use crate::retry::{RetryPolicies, retry};
use alloy_primitives::Address;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Resolved token metadata, keyed by contract address. Unbounded: it holds
/// one entry per token contract the monitor has seen, for the monitor's
/// whole life.
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: HashMap<Address, TokenInfo>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token: Address) -> Option<&TokenInfo> {
        self.tokens.get(&token)
    }

    pub fn insert(&mut self, info: TokenInfo) {
        self.tokens.insert(info.token_address, info);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

pub struct TransactionClassifier {
    chain: ChainLabel,
    wallet: Address,
    policies: RetryPolicies,
    cache: TokenCache,
}

impl TransactionClassifier {
    pub fn new(chain: ChainLabel, wallet: Address, policies: RetryPolicies) -> Self {
        TransactionClassifier {
            chain,
            wallet,
            policies,
            cache: TokenCache::new(),
        }
    }

    pub fn cached_tokens(&self) -> usize {
        self.cache.len()
    }

    /// True when the watched wallet sent or received the transaction.
    pub fn is_relevant(&self, tx: &TransactionView) -> bool {
        tx.from == self.wallet || tx.to == Some(self.wallet)
    }

    fn is_party(&self, event: &Transfer) -> bool {
        event.from == self.wallet || event.to == self.wallet
    }

    /// Produces the native and token transfer records for one transaction.
    ///
    /// Only the receipt's first log is considered for token transfers. Token
    /// metadata failures are logged and drop the token record only.
    pub async fn classify(
        &mut self,
        client: &dyn NodeClient,
        tx: &TransactionView,
        receipt: &ReceiptView,
    ) -> Vec<TransferRecord> {
        let direct = self.is_relevant(tx);

        let token_event = receipt.logs.first().and_then(|log| {
            decode_transfer_event(log)
                .inspect_err(|e| {
                    debug!(
                        "First log of {} on {} is not an ERC20 transfer: {}",
                        tx.hash, self.chain, e
                    )
                })
                .ok()
                .map(|event| (log.address, event))
        });
        let via_event = token_event
            .as_ref()
            .is_some_and(|(_, event)| self.is_party(event));

        if !direct && !via_event {
            return Vec::new();
        }

        let mut records = Vec::new();

        if direct && !tx.value.is_zero() {
            if let Some(amount) = format_amount(tx.value, NATIVE_DECIMALS) {
                records.push(TransferRecord::Native(NativeTransfer {
                    chain_name: self.chain.name.clone(),
                    chain_id: self.chain.id,
                    transaction_hash: tx.hash,
                    from: tx.from,
                    to: tx.to,
                    transfer_amount: amount,
                }));
            }
        }

        if let Some((token, event)) = token_event {
            match self.token_info(client, token).await {
                Ok(info) => match format_amount(event.value, info.token_decimal) {
                    Some(amount) => records.push(TransferRecord::Token(TokenTransfer {
                        chain_name: self.chain.name.clone(),
                        chain_id: self.chain.id,
                        transaction_hash: receipt.hash,
                        from: event.from,
                        to: event.to,
                        transfer_amount: amount,
                        token_info: info,
                    })),
                    None => warn!(
                        "Token {:?} on {} reports unusable decimals {}",
                        token, self.chain, info.token_decimal
                    ),
                },
                Err(e) => warn!(
                    "Failed to get token info for {:?} on {}: {}",
                    token, self.chain, e
                ),
            }
        }

        records
    }

    async fn token_info(&mut self, client: &dyn NodeClient, token: Address) -> Result<TokenInfo> {
        if let Some(info) = self.cache.get(token) {
            return Ok(info.clone());
        }

        let token_name = retry(self.policies.token_name, "token name", || {
            client.token_name(token)
        })
        .await?;
        let token_symbol = retry(self.policies.token_symbol, "token symbol", || {
            client.token_symbol(token)
        })
        .await?;
        let token_decimal = retry(self.policies.token_decimals, "token decimals", || {
            client.token_decimals(token)
        })
        .await?;

        info!(
            "Resolved token {:?} on {}: {} ({}), {} decimals",
            token, self.chain, token_name, token_symbol, token_decimal
        );

        let info = TokenInfo {
            token_address: token,
            token_name,
            token_symbol,
            token_decimal,
        };
        self.cache.insert(info.clone());
        Ok(info)
    }
}
