use crate::error::{Result, ScoutError};
use crate::node::LogEntry;
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);

    #[sol(rpc)]
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
}

pub fn decode_transfer_event(log: &LogEntry) -> Result<Transfer> {
    Transfer::decode_raw_log(log.topics.iter().copied(), &log.data)
        .map_err(|e| ScoutError::Decode(e.to_string()))
}
