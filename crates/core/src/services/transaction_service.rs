use std::collections::HashSet;

use crate::errors::CoreError;
use crate::models::settings::OversellPolicy;
use crate::models::transaction::{normalize_symbol, Broker, Transaction, TransactionSortOrder};
use crate::services::ledger_service::LedgerService;

/// Edits the transaction log and guards what enters it.
///
/// Pure business logic with no I/O. The log keeps insertion order, which is the
/// tie-break the ledger uses for same-date transactions.
pub struct TransactionService {
    ledger: LedgerService,
}

impl TransactionService {
    pub fn new(oversell_policy: OversellPolicy) -> Self {
        Self {
            ledger: LedgerService::with_policy(oversell_policy),
        }
    }

    /// Strict record validation.
    ///
    /// Rules:
    /// - Symbol must be non-empty
    /// - Shares must be finite and positive
    /// - Price and fee must be finite and non-negative
    pub fn validate(&self, txn: &Transaction) -> Result<(), CoreError> {
        if txn.id.trim().is_empty() {
            return Err(CoreError::ValidationError("Transaction id must not be empty".into()));
        }
        if normalize_symbol(&txn.symbol).is_empty() {
            return Err(CoreError::ValidationError(format!(
                "Transaction {}: symbol must not be empty",
                txn.id
            )));
        }
        if !txn.shares.is_finite() || txn.shares <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Transaction {}: shares must be positive, got {}",
                txn.id, txn.shares
            )));
        }
        if !txn.price.is_finite() || txn.price < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Transaction {}: price must be non-negative, got {}",
                txn.id, txn.price
            )));
        }
        if !txn.fee.is_finite() || txn.fee < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Transaction {}: fee must be non-negative, got {}",
                txn.id, txn.fee
            )));
        }
        Ok(())
    }

    /// Append a transaction to the log.
    /// Rejects invalid records, reused ids, and (under `Reject`) sells that
    /// exceed the shares held at that broker.
    pub fn add(&self, log: &mut Vec<Transaction>, txn: Transaction) -> Result<(), CoreError> {
        self.add_all(log, vec![txn]).map(|_| ())
    }

    /// Append a batch of transactions (all-or-nothing). Returns their ids.
    ///
    /// The batch is staged as a whole before any partition is replayed, so
    /// its records may arrive in any order: a sell listed ahead of the buy
    /// that covers it is accepted.
    pub fn add_all(
        &self,
        log: &mut Vec<Transaction>,
        batch: Vec<Transaction>,
    ) -> Result<Vec<String>, CoreError> {
        let mut staged: Vec<Transaction> = Vec::with_capacity(batch.len());
        for mut txn in batch {
            txn.symbol = normalize_symbol(&txn.symbol);
            self.validate(&txn)?;
            if log.iter().chain(staged.iter()).any(|t| t.id == txn.id) {
                return Err(CoreError::DuplicateTransaction(txn.id));
            }
            staged.push(txn);
        }

        let mut touched: Vec<(String, Broker)> = Vec::new();
        for txn in &staged {
            let key = (txn.symbol.clone(), txn.broker);
            if !touched.contains(&key) {
                touched.push(key);
            }
        }
        let ids: Vec<String> = staged.iter().map(|t| t.id.clone()).collect();

        let base = log.len();
        log.extend(staged);
        for (symbol, broker) in &touched {
            if let Err(e) = self.check_partition(log, symbol, *broker) {
                log.truncate(base);
                return Err(e);
            }
        }
        Ok(ids)
    }

    /// Remove a transaction by id, returning it.
    /// Removing a buy that later sells depend on is rolled back.
    pub fn remove(&self, log: &mut Vec<Transaction>, id: &str) -> Result<Transaction, CoreError> {
        let idx = Self::position(log, id)?;
        let removed = log.remove(idx);

        if let Err(e) = self.check_partition(log, &removed.symbol, removed.broker) {
            log.insert(idx, removed);
            return Err(e);
        }
        Ok(removed)
    }

    /// Replace the transaction stored under `id`. The replacement keeps the
    /// original id and log position.
    pub fn update(
        &self,
        log: &mut [Transaction],
        id: &str,
        mut replacement: Transaction,
    ) -> Result<(), CoreError> {
        let idx = Self::position(log, id)?;
        replacement.id = log[idx].id.clone();
        replacement.symbol = normalize_symbol(&replacement.symbol);
        self.validate(&replacement)?;

        let (new_symbol, new_broker) = (replacement.symbol.clone(), replacement.broker);
        let old = std::mem::replace(&mut log[idx], replacement);

        let mut check = self.check_partition(log, &old.symbol, old.broker);
        if check.is_ok() {
            check = self.check_partition(log, &new_symbol, new_broker);
        }
        if let Err(e) = check {
            log[idx] = old;
            return Err(e);
        }
        Ok(())
    }

    /// Set or clear the notes on an existing transaction.
    pub fn set_notes(
        &self,
        log: &mut [Transaction],
        id: &str,
        notes: Option<String>,
    ) -> Result<(), CoreError> {
        let idx = Self::position(log, id)?;
        log[idx].notes = notes;
        Ok(())
    }

    /// Transactions in the requested display order.
    pub fn sorted<'a>(&self, log: &'a [Transaction], order: &TransactionSortOrder) -> Vec<&'a Transaction> {
        let mut txns: Vec<&Transaction> = log.iter().collect();
        match order {
            TransactionSortOrder::DateDesc => txns.sort_by(|a, b| b.date.cmp(&a.date)),
            TransactionSortOrder::DateAsc => txns.sort_by(|a, b| a.date.cmp(&b.date)),
            TransactionSortOrder::SymbolAsc => txns.sort_by(|a, b| a.symbol.cmp(&b.symbol)),
            TransactionSortOrder::ValueDesc => txns.sort_by(|a, b| {
                b.gross_value()
                    .partial_cmp(&a.gross_value())
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
        }
        txns
    }

    /// Replay just the (symbol, broker) partition and surface an oversell.
    /// A no-op under `OversellPolicy::Clamp`.
    fn check_partition(&self, log: &[Transaction], symbol: &str, broker: Broker) -> Result<(), CoreError> {
        if self.ledger.oversell_policy() != OversellPolicy::Reject {
            return Ok(());
        }
        let symbol = normalize_symbol(symbol);
        let partition: Vec<Transaction> = log
            .iter()
            .filter(|t| t.broker == broker && normalize_symbol(&t.symbol) == symbol)
            .cloned()
            .collect();
        self.ledger.replay(&partition).map(|_| ())
    }

    /// Ids that appear more than once in `log`, each listed once.
    pub fn duplicate_ids(log: &[Transaction]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        for txn in log {
            if !seen.insert(txn.id.as_str()) && !duplicates.contains(&txn.id) {
                duplicates.push(txn.id.clone());
            }
        }
        duplicates
    }

    fn position(log: &[Transaction], id: &str) -> Result<usize, CoreError> {
        log.iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))
    }
}

impl Default for TransactionService {
    fn default() -> Self {
        Self::new(OversellPolicy::default())
    }
}
