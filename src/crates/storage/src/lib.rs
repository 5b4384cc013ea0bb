//! Persisted snapshot of a [`TransactionGraph`] in sled.
//!
//! Two trees: `accounts` keyed by the big-endian account id, and `edges`
//! keyed by big-endian `source ++ target`. Values are fixed-width
//! little-endian records.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use aml_primitives::{Account, AccountId, Edge, TransactionGraph, TransactionId};
use log::{debug, info};
use sled::{Batch, Db, IVec, Tree};

pub const ACCOUNT_TREE_NAME: &str = "accounts";
pub const EDGE_TREE_NAME: &str = "edges";

const ACCOUNT_VALUE_LEN: usize = 25;
const EDGE_KEY_LEN: usize = 16;
const EDGE_VALUE_LEN: usize = 28;

#[derive(Debug)]
pub enum StoreError {
    /// The store directory could not be reset or opened.
    Init { path: PathBuf, source: sled::Error },
    Backend(sled::Error),
    Serialization(String),
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Init { source, .. } => Some(source),
            StoreError::Backend(e) => Some(e),
            StoreError::Serialization(_) => None,
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Init { path, source } => {
                write!(f, "cannot initialise graph store at {}: {}", path.display(), source)
            }
            StoreError::Backend(e) => write!(f, "backend error: {}", e),
            StoreError::Serialization(e) => write!(f, "serialization error: {}", e),
        }
    }
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Backend(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistSummary {
    pub accounts: usize,
    pub edges: usize,
}

pub struct GraphStore {
    path: PathBuf,
    db: Db,
    accounts: Tree,
    edges: Tree,
}

impl GraphStore {
    /// Wipes whatever is at `path` and opens an empty store there.
    pub fn open_fresh(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        match fs::remove_dir_all(path) {
            Ok(()) => info!("cleared previous graph store at {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StoreError::Init {
                    path: path.to_path_buf(),
                    source: sled::Error::Io(e),
                });
            }
        }
        Self::open_existing(path)
    }

    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let init = |source| StoreError::Init {
            path: path.clone(),
            source,
        };
        let db = sled::open(&path).map_err(init)?;
        let accounts = db.open_tree(ACCOUNT_TREE_NAME).map_err(init)?;
        let edges = db.open_tree(EDGE_TREE_NAME).map_err(init)?;
        debug!("opened graph store at {}", path.display());
        Ok(Self {
            path,
            db,
            accounts,
            edges,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes every account and edge of `graph`, replacing stored records with
    /// the same key.
    pub fn persist(&self, graph: &TransactionGraph) -> Result<PersistSummary, StoreError> {
        let mut accounts = Batch::default();
        for account in graph.accounts() {
            accounts.insert(
                account.id().to_be_bytes().to_vec(),
                Self::encode_account(account).to_vec(),
            );
        }
        let mut edges = Batch::default();
        for edge in graph.edges() {
            edges.insert(
                Self::edge_key(edge.source, edge.target).to_vec(),
                Self::encode_edge(edge).to_vec(),
            );
        }
        self.accounts.apply_batch(accounts)?;
        self.edges.apply_batch(edges)?;

        let summary = PersistSummary {
            accounts: graph.account_count(),
            edges: graph.edge_count(),
        };
        info!(
            "persisted {} accounts and {} edges to {}",
            summary.accounts,
            summary.edges,
            self.path.display()
        );
        Ok(summary)
    }

    pub fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        match self.accounts.get(id.to_be_bytes())? {
            Some(raw) => Ok(Some(Self::decode_account(id, &raw)?)),
            None => Ok(None),
        }
    }

    pub fn edge(&self, source: AccountId, target: AccountId) -> Result<Option<Edge>, StoreError> {
        match self.edges.get(Self::edge_key(source, target))? {
            Some(raw) => Ok(Some(Self::decode_edge(source, target, &raw)?)),
            None => Ok(None),
        }
    }

    /// Outgoing edges of `source`, by ascending target.
    pub fn edges_from(&self, source: AccountId) -> Result<Vec<Edge>, StoreError> {
        let mut out = Vec::new();
        for entry in self.edges.scan_prefix(source.to_be_bytes()) {
            let (key, value) = entry?;
            let (source, target) = Self::decode_edge_key(&key)?;
            out.push(Self::decode_edge(source, target, &value)?);
        }
        Ok(out)
    }

    /// Labeled accounts in ascending id order.
    pub fn suspects(&self) -> Result<Vec<AccountId>, StoreError> {
        let mut out = Vec::new();
        for entry in self.accounts.iter() {
            let (key, value) = entry?;
            let id = Self::decode_account_key(&key)?;
            if Self::decode_account(id, &value)?.is_suspect() {
                out.push(id);
            }
        }
        Ok(out)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the number of bytes flushed.
    pub fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.db.flush()?)
    }

    fn edge_key(source: AccountId, target: AccountId) -> [u8; EDGE_KEY_LEN] {
        let mut key = [0u8; EDGE_KEY_LEN];
        key[..8].copy_from_slice(&source.to_be_bytes());
        key[8..].copy_from_slice(&target.to_be_bytes());
        key
    }

    fn decode_account_key(raw: &[u8]) -> Result<AccountId, StoreError> {
        let bytes: [u8; 8] = raw.try_into().map_err(|_| {
            StoreError::Serialization(format!("expected 8-byte account key, got {} bytes", raw.len()))
        })?;
        Ok(AccountId::from_be_bytes(bytes))
    }

    fn decode_edge_key(raw: &[u8]) -> Result<(AccountId, AccountId), StoreError> {
        if raw.len() != EDGE_KEY_LEN {
            return Err(StoreError::Serialization(format!(
                "expected {EDGE_KEY_LEN}-byte edge key, got {} bytes",
                raw.len()
            )));
        }
        let source = Self::decode_account_key(&raw[..8])?;
        let target = Self::decode_account_key(&raw[8..])?;
        Ok((source, target))
    }

    fn encode_account(account: &Account) -> [u8; ACCOUNT_VALUE_LEN] {
        let mut value = [0u8; ACCOUNT_VALUE_LEN];
        value[..8].copy_from_slice(&account.inbound().to_le_bytes());
        value[8..16].copy_from_slice(&account.outbound().to_le_bytes());
        value[16..24].copy_from_slice(&account.balance_score().to_bits().to_le_bytes());
        value[24] = account.is_suspect() as u8;
        value
    }

    fn decode_account(id: AccountId, raw: &[u8]) -> Result<Account, StoreError> {
        if raw.len() != ACCOUNT_VALUE_LEN {
            return Err(StoreError::Serialization(format!(
                "expected {ACCOUNT_VALUE_LEN}-byte account record, got {} bytes",
                raw.len()
            )));
        }
        Ok(Account::from_parts(
            id,
            u64::from_le_bytes(le8(&raw[..8])),
            u64::from_le_bytes(le8(&raw[8..16])),
            f64::from_bits(u64::from_le_bytes(le8(&raw[16..24]))),
            raw[24] != 0,
        ))
    }

    fn encode_edge(edge: &Edge) -> [u8; EDGE_VALUE_LEN] {
        let mut value = [0u8; EDGE_VALUE_LEN];
        value[..4].copy_from_slice(&edge.weight.to_le_bytes());
        value[4..12].copy_from_slice(&edge.amount.to_le_bytes());
        value[12..20].copy_from_slice(&edge.time.to_le_bytes());
        value[20..28].copy_from_slice(&edge.transaction.get().to_le_bytes());
        value
    }

    fn decode_edge(source: AccountId, target: AccountId, raw: &IVec) -> Result<Edge, StoreError> {
        if raw.len() != EDGE_VALUE_LEN {
            return Err(StoreError::Serialization(format!(
                "expected {EDGE_VALUE_LEN}-byte edge record, got {} bytes",
                raw.len()
            )));
        }
        let mut weight = [0u8; 4];
        weight.copy_from_slice(&raw[..4]);
        Ok(Edge {
            source,
            target,
            weight: u32::from_le_bytes(weight),
            amount: i64::from_le_bytes(le8(&raw[4..12])),
            time: i64::from_le_bytes(le8(&raw[12..20])),
            transaction: TransactionId(u64::from_le_bytes(le8(&raw[20..28]))),
        })
    }
}

// Callers check the record length first.
fn le8(raw: &[u8]) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(raw);
    bytes
}
