//! Scoped ownership of the graph for one detection run.
//!
//! A [`GraphSession`] holds the in-memory [`TransactionGraph`] and, when a
//! store directory is given, the sled [`GraphStore`] that receives the final
//! snapshot. Dropping the session flushes the store on every exit path.

use std::path::Path;

use aml_primitives::TransactionGraph;
use aml_storage::{GraphStore, PersistSummary, StoreError};
use log::{info, warn};

pub struct GraphSession {
    graph: TransactionGraph,
    store: Option<GraphStore>,
    closed: bool,
}

impl GraphSession {
    pub fn in_memory() -> Self {
        info!("starting in-memory graph session");
        Self {
            graph: TransactionGraph::new(),
            store: None,
            closed: false,
        }
    }

    /// Resets the store at `path` before anything else runs. A store that
    /// cannot be reset aborts the run.
    pub fn with_store(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = GraphStore::open_fresh(path)?;
        info!("starting graph session backed by {}", store.path().display());
        Ok(Self {
            graph: TransactionGraph::new(),
            store: Some(store),
            closed: false,
        })
    }

    pub fn graph(&self) -> &TransactionGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut TransactionGraph {
        &mut self.graph
    }

    pub fn store(&self) -> Option<&GraphStore> {
        self.store.as_ref()
    }

    /// Writes the current graph into the store. `None` for in-memory sessions.
    pub fn persist(&self) -> Result<Option<PersistSummary>, StoreError> {
        match &self.store {
            Some(store) => store.persist(&self.graph).map(Some),
            None => Ok(None),
        }
    }

    /// Flushes the store and ends the session, surfacing flush errors that
    /// `Drop` can only log.
    pub fn close(mut self) -> Result<(), StoreError> {
        self.closed = true;
        if let Some(store) = &self.store {
            store.flush()?;
        }
        info!("graph session closed");
        Ok(())
    }

    /// Ends the session and hands the graph to the caller.
    pub fn into_graph(mut self) -> TransactionGraph {
        std::mem::take(&mut self.graph)
    }
}

impl Drop for GraphSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Some(store) = &self.store {
            if let Err(e) = store.flush() {
                warn!("failed to flush graph store on shutdown: {}", e);
            }
        }
        info!("graph session shut down");
    }
}
