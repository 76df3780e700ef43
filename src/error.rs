use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("node URL not configured for chain {chain_name} ({chain_id})")]
    Configuration { chain_name: String, chain_id: u64 },

    #[error("failed to connect to node for chain {chain_name} ({chain_id}): {reason}")]
    Connection {
        chain_name: String,
        chain_id: u64,
        reason: String,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("node request failed: {0}")]
    Node(String),

    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<ScoutError>,
    },

    #[error("log decode failed: {0}")]
    Decode(String),

    #[error("block {block_number} failed: {source}")]
    FatalBlock {
        block_number: u64,
        #[source]
        source: Box<ScoutError>,
    },

    #[error("new block subscription closed")]
    SubscriptionClosed,

    #[error("output sink error: {0}")]
    Sink(String),
}

impl ScoutError {
    pub fn node(err: impl std::fmt::Display) -> Self {
        ScoutError::Node(err.to_string())
    }

    pub fn fatal_block(block_number: u64, source: ScoutError) -> Self {
        ScoutError::FatalBlock {
            block_number,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through retry and block wrappers.
    pub fn root_cause(&self) -> &ScoutError {
        match self {
            ScoutError::RetryExhausted { source, .. } | ScoutError::FatalBlock { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
