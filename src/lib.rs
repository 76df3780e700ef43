pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod monitor;
pub mod node;
pub mod records;
pub mod registry;
pub mod retry;
pub mod sink;

pub use classifier::TransactionClassifier;
pub use config::{Config, MonitorConfig};
pub use error::ScoutError;
pub use monitor::{ChainMonitor, MonitorState};
pub use node::{AlloyNodeClient, NodeClient};
pub use records::{NativeTransfer, TokenInfo, TokenTransfer, TransferRecord};
pub use registry::MonitorRegistry;
pub use retry::{RetryPolicies, RetryPolicy};
pub use sink::{OutputFormat, TransferSink};
