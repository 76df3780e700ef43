use alloy_primitives::{Address, B256, U256};
use serde::Serialize;
use std::fmt;

pub const NATIVE_DECIMALS: u8 = 18;

/// Chain identity carried into records and log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLabel {
    pub name: String,
    pub id: u64,
}

impl ChainLabel {
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        ChainLabel {
            name: name.into(),
            id,
        }
    }
}

impl fmt::Display for ChainLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (chain id {})", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub token_address: Address,
    pub token_name: String,
    pub token_symbol: String,
    pub token_decimal: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeTransfer {
    pub chain_name: String,
    pub chain_id: u64,
    pub transaction_hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub transfer_amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenTransfer {
    pub chain_name: String,
    pub chain_id: u64,
    pub transaction_hash: B256,
    pub from: Address,
    pub to: Address,
    pub transfer_amount: String,
    pub token_info: TokenInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferRecord {
    Native(NativeTransfer),
    Token(TokenTransfer),
}

impl TransferRecord {
    pub fn transaction_hash(&self) -> B256 {
        match self {
            TransferRecord::Native(t) => t.transaction_hash,
            TransferRecord::Token(t) => t.transaction_hash,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TransferRecord::Native(_) => "native",
            TransferRecord::Token(_) => "token",
        }
    }
}

/// Renders a base-unit integer as a decimal string with `decimals` fractional
/// digits, trailing zeros trimmed down to one (`1500000` @ 6 -> `"1.5"`).
///
/// Returns `None` when `10^decimals` does not fit in 256 bits.
pub fn format_amount(value: U256, decimals: u8) -> Option<String> {
    let unit = U256::from(10u8).checked_pow(U256::from(decimals))?;
    let whole = value / unit;
    let fraction = value % unit;

    let digits = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };

    Some(format!("{whole}.{digits}"))
}
