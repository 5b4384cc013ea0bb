//! Readers and writers for `nodes.txt` and `transactions.txt`.
//!
//! Both formats are line oriented. Lines are trimmed, and blank lines and
//! lines starting with `#` are ignored. A line that does not parse is kept as
//! a [`SkippedRecord`] and loading carries on; only an unreadable file fails.

use std::{
    fmt, fs,
    io::{self, BufWriter, Write},
    num::ParseIntError,
    path::{Path, PathBuf},
};

use aml_primitives::{AccountId, Transaction};
use log::{info, warn};

pub const NODES_FILE: &str = "nodes.txt";
pub const TRANSACTIONS_FILE: &str = "transactions.txt";

const TRANSACTION_FIELDS: [&str; 5] = ["id", "sender", "receiver", "amount", "time"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    FieldCount { found: usize },
    Field { name: &'static str, source: ParseIntError },
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::FieldCount { .. } => None,
            RecordError::Field { source, .. } => Some(source),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::FieldCount { found } => {
                write!(f, "expected {} fields, found {}", TRANSACTION_FIELDS.len(), found)
            }
            RecordError::Field { name, source } => write!(f, "bad {}: {}", name, source),
        }
    }
}

/// A line that could not be parsed. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub line: usize,
    pub content: String,
    pub reason: RecordError,
}

impl fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} {:?}: {}", self.line, self.content, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRecord>,
}

impl<T> Loaded<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: io::Error },
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => write!(f, "cannot read {}: {}", path.display(), source),
        }
    }
}

fn data_lines(raw: &str) -> impl Iterator<Item = (usize, &str)> {
    raw.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn parse_lines<T>(raw: &str, parse: impl Fn(&str) -> Result<T, RecordError>) -> Loaded<T> {
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    for (line, content) in data_lines(raw) {
        match parse(content) {
            Ok(record) => records.push(record),
            Err(reason) => {
                let record = SkippedRecord {
                    line,
                    content: content.to_string(),
                    reason,
                };
                warn!("skipping {}", record);
                skipped.push(record);
            }
        }
    }
    Loaded { records, skipped }
}

fn field<T: std::str::FromStr<Err = ParseIntError>>(
    name: &'static str,
    raw: &str,
) -> Result<T, RecordError> {
    raw.trim()
        .parse()
        .map_err(|source| RecordError::Field { name, source })
}

pub fn parse_node_record(line: &str) -> Result<AccountId, RecordError> {
    field("account id", line).map(AccountId)
}

/// `id,sender,receiver,amount,time`, each field trimmed.
pub fn parse_transaction_record(line: &str) -> Result<Transaction, RecordError> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() != TRANSACTION_FIELDS.len() {
        return Err(RecordError::FieldCount { found: parts.len() });
    }
    Ok(Transaction::new(
        field(TRANSACTION_FIELDS[0], parts[0])?,
        field(TRANSACTION_FIELDS[1], parts[1])?,
        field(TRANSACTION_FIELDS[2], parts[2])?,
        field(TRANSACTION_FIELDS[3], parts[3])?,
        field(TRANSACTION_FIELDS[4], parts[4])?,
    ))
}

pub fn format_transaction_record(transaction: &Transaction) -> String {
    format!(
        "{},{},{},{},{}",
        transaction.id, transaction.sender, transaction.receiver, transaction.amount, transaction.time
    )
}

pub fn parse_nodes(raw: &str) -> Loaded<AccountId> {
    parse_lines(raw, parse_node_record)
}

pub fn parse_transactions(raw: &str) -> Loaded<Transaction> {
    parse_lines(raw, parse_transaction_record)
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_nodes(path: impl AsRef<Path>) -> Result<Loaded<AccountId>, LoadError> {
    let path = path.as_ref();
    let loaded = parse_nodes(&read(path)?);
    info!(
        "loaded {} accounts from {} ({} skipped)",
        loaded.len(),
        path.display(),
        loaded.skipped.len()
    );
    Ok(loaded)
}

pub fn read_transactions(path: impl AsRef<Path>) -> Result<Loaded<Transaction>, LoadError> {
    let path = path.as_ref();
    let loaded = parse_transactions(&read(path)?);
    info!(
        "loaded {} transactions from {} ({} skipped)",
        loaded.len(),
        path.display(),
        loaded.skipped.len()
    );
    Ok(loaded)
}

pub fn write_nodes(path: impl AsRef<Path>, nodes: &[AccountId]) -> io::Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    for node in nodes {
        writeln!(out, "{}", node)?;
    }
    out.flush()
}

pub fn write_transactions(path: impl AsRef<Path>, transactions: &[Transaction]) -> io::Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    for transaction in transactions {
        writeln!(out, "{}", format_transaction_record(transaction))?;
    }
    out.flush()
}
