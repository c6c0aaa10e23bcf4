//! Transaction bookkeeping.
//!
//! Transactions here are tokens with a state and a record of the vertices
//! they wrote. The store applies writes immediately; the record lets the
//! engine bring indices up to date when a transaction ends.

use parking_lot::RwLock;
use revgraph_common::types::{SecurityToken, TransactionToken, VertexInformation, VertexTypeId};
use revgraph_common::utils::error::{Error, Result, TransactionError};
use revgraph_common::utils::hash::{FxHashMap, FxHashSet};
use revgraph_core::execution::PendingIndexUpdates;
use std::sync::atomic::{AtomicU64, Ordering};

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Transaction is active.
    Active,
    /// Transaction is committed.
    Committed,
    /// Transaction is aborted.
    Aborted,
}

struct TxInfo {
    state: TxState,
    security: SecurityToken,
    touched: FxHashSet<VertexInformation>,
}

/// Hands out transaction tokens and tracks their state.
pub struct TransactionManager {
    next_tx: AtomicU64,
    transactions: RwLock<FxHashMap<TransactionToken, TxInfo>>,
}

impl TransactionManager {
    /// Creates a new transaction manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_tx: AtomicU64::new(1),
            transactions: RwLock::new(FxHashMap::default()),
        }
    }

    /// Begins a new transaction on behalf of `security`.
    pub fn begin(&self, security: SecurityToken) -> TransactionToken {
        let tx = TransactionToken::new(self.next_tx.fetch_add(1, Ordering::Relaxed));
        self.transactions.write().insert(
            tx,
            TxInfo {
                state: TxState::Active,
                security,
                touched: FxHashSet::default(),
            },
        );
        tracing::trace!(%tx, "transaction started");
        tx
    }

    /// Commits a transaction and returns the vertices it touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not active.
    pub fn commit(&self, tx: TransactionToken) -> Result<Vec<VertexInformation>> {
        self.finish(tx, TxState::Committed)
    }

    /// Aborts a transaction and returns the vertices it touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not active.
    pub fn abort(&self, tx: TransactionToken) -> Result<Vec<VertexInformation>> {
        self.finish(tx, TxState::Aborted)
    }

    fn finish(&self, tx: TransactionToken, state: TxState) -> Result<Vec<VertexInformation>> {
        let mut txns = self.transactions.write();
        let info = txns.get_mut(&tx).ok_or_else(|| {
            Error::Transaction(TransactionError::InvalidState(format!(
                "transaction {tx} not found"
            )))
        })?;
        if info.state != TxState::Active {
            return Err(TransactionError::NotActive(tx.as_u64()).into());
        }
        info.state = state;
        let mut touched: Vec<_> = info.touched.drain().collect();
        touched.sort_unstable();
        tracing::trace!(%tx, ?state, touched = touched.len(), "transaction finished");
        Ok(touched)
    }

    /// Records that `tx` wrote `vertex`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not active.
    pub fn touch(&self, tx: TransactionToken, vertex: VertexInformation) -> Result<()> {
        let mut txns = self.transactions.write();
        match txns.get_mut(&tx) {
            Some(info) if info.state == TxState::Active => {
                info.touched.insert(vertex);
                Ok(())
            }
            _ => Err(TransactionError::NotActive(tx.as_u64()).into()),
        }
    }

    /// Returns the vertices `tx` touched so far, without clearing them.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not active.
    pub fn pending(&self, tx: TransactionToken) -> Result<Vec<VertexInformation>> {
        match self.transactions.read().get(&tx) {
            Some(info) if info.state == TxState::Active => {
                let mut touched: Vec<_> = info.touched.iter().copied().collect();
                touched.sort_unstable();
                Ok(touched)
            }
            _ => Err(TransactionError::NotActive(tx.as_u64()).into()),
        }
    }

    /// Fails unless `tx` is active.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::NotActive`] otherwise.
    pub fn ensure_active(&self, tx: TransactionToken) -> Result<()> {
        if self.is_active(tx) {
            Ok(())
        } else {
            Err(TransactionError::NotActive(tx.as_u64()).into())
        }
    }

    /// Returns the state of a transaction.
    #[must_use]
    pub fn state(&self, tx: TransactionToken) -> Option<TxState> {
        self.transactions.read().get(&tx).map(|info| info.state)
    }

    /// Returns `true` if the transaction is active.
    #[must_use]
    pub fn is_active(&self, tx: TransactionToken) -> bool {
        self.state(tx) == Some(TxState::Active)
    }

    /// Returns the security token a transaction was started with.
    #[must_use]
    pub fn owner(&self, tx: TransactionToken) -> Option<SecurityToken> {
        self.transactions.read().get(&tx).map(|info| info.security)
    }

    /// Returns the number of active transactions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.transactions
            .read()
            .values()
            .filter(|info| info.state == TxState::Active)
            .count()
    }

    /// Cleans up completed transactions.
    pub fn gc(&self) {
        let mut txns = self.transactions.write();
        txns.retain(|_, info| info.state == TxState::Active);
    }
}

impl PendingIndexUpdates for TransactionManager {
    fn has_pending(&self, vertex_type: VertexTypeId) -> bool {
        self.transactions.read().values().any(|info| {
            info.state == TxState::Active && info.touched.iter().any(|v| v.type_id == vertex_type)
        })
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
