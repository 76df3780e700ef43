use crate::error::{Result, ScoutError};
use crate::records::TransferRecord;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Text,
        }
    }
}

/// Destination for matched transfers.
pub trait TransferSink: Send + Sync {
    fn emit(&self, record: &TransferRecord) -> Result<()>;
}

pub fn sink_for(format: OutputFormat) -> Arc<dyn TransferSink> {
    match format {
        OutputFormat::Text => Arc::new(TracingSink),
        OutputFormat::Json => Arc::new(JsonLinesSink::new(std::io::stdout())),
        OutputFormat::Csv => Arc::new(CsvSink::new(std::io::stdout())),
    }
}

pub struct TracingSink;

impl TransferSink for TracingSink {
    fn emit(&self, record: &TransferRecord) -> Result<()> {
        match record {
            TransferRecord::Native(t) => info!(
                chain = %t.chain_name,
                chain_id = t.chain_id,
                tx = %t.transaction_hash,
                from = %t.from,
                to = ?t.to,
                amount = %t.transfer_amount,
                "Native token transfer"
            ),
            TransferRecord::Token(t) => info!(
                chain = %t.chain_name,
                chain_id = t.chain_id,
                tx = %t.transaction_hash,
                from = %t.from,
                to = %t.to,
                amount = %t.transfer_amount,
                token = %t.token_info.token_address,
                symbol = %t.token_info.token_symbol,
                "Token transfer"
            ),
        }
        Ok(())
    }
}

pub struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        JsonLinesSink {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> TransferSink for JsonLinesSink<W> {
    fn emit(&self, record: &TransferRecord) -> Result<()> {
        let line = serde_json::to_string(record).map_err(|e| ScoutError::Sink(e.to_string()))?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| ScoutError::Sink("output lock poisoned".to_string()))?;
        writeln!(out, "{line}")
            .and_then(|_| out.flush())
            .map_err(|e| ScoutError::Sink(e.to_string()))
    }
}

const CSV_HEADER: [&str; 11] = [
    "kind",
    "chain_name",
    "chain_id",
    "transaction_hash",
    "from",
    "to",
    "transfer_amount",
    "token_address",
    "token_name",
    "token_symbol",
    "token_decimal",
];

struct CsvOutput<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
}

pub struct CsvSink<W: Write> {
    out: Mutex<CsvOutput<W>>,
}

impl<W: Write + Send> CsvSink<W> {
    pub fn new(out: W) -> Self {
        CsvSink {
            out: Mutex::new(CsvOutput {
                writer: csv::WriterBuilder::new().has_headers(false).from_writer(out),
                header_written: false,
            }),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        let out = self
            .out
            .into_inner()
            .map_err(|_| ScoutError::Sink("output lock poisoned".to_string()))?;
        out.writer
            .into_inner()
            .map_err(|e| ScoutError::Sink(e.to_string()))
    }
}

fn csv_row(record: &TransferRecord) -> [String; 11] {
    match record {
        TransferRecord::Native(t) => [
            record.kind().to_string(),
            t.chain_name.clone(),
            t.chain_id.to_string(),
            format!("{:?}", t.transaction_hash),
            format!("{:?}", t.from),
            t.to.map(|to| format!("{to:?}")).unwrap_or_default(),
            t.transfer_amount.clone(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ],
        TransferRecord::Token(t) => [
            record.kind().to_string(),
            t.chain_name.clone(),
            t.chain_id.to_string(),
            format!("{:?}", t.transaction_hash),
            format!("{:?}", t.from),
            format!("{:?}", t.to),
            t.transfer_amount.clone(),
            format!("{:?}", t.token_info.token_address),
            t.token_info.token_name.clone(),
            t.token_info.token_symbol.clone(),
            t.token_info.token_decimal.to_string(),
        ],
    }
}

impl<W: Write + Send> TransferSink for CsvSink<W> {
    fn emit(&self, record: &TransferRecord) -> Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| ScoutError::Sink("output lock poisoned".to_string()))?;
        let CsvOutput {
            writer,
            header_written,
        } = &mut *out;

        if !*header_written {
            writer
                .write_record(CSV_HEADER)
                .map_err(|e| ScoutError::Sink(e.to_string()))?;
            *header_written = true;
        }
        writer
            .write_record(csv_row(record))
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .map_err(|e| ScoutError::Sink(e.to_string()))
    }
}

/// Keeps every emitted record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<TransferRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TransferRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl TransferSink for MemorySink {
    fn emit(&self, record: &TransferRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| ScoutError::Sink("record lock poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }
}
