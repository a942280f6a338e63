use crate::errors::CoreError;
use crate::models::transaction::Transaction;

/// Durable home of the transaction log.
///
/// The ledger only needs "give me every transaction" and "store exactly
/// these"; everything derived (holdings, realized positions) is recomputed
/// and never persisted.
pub trait TransactionRepository: Send {
    /// Load the full log in stored order.
    fn load(&self) -> Result<Vec<Transaction>, CoreError>;

    /// Replace the stored log with `transactions`.
    fn save(&mut self, transactions: &[Transaction]) -> Result<(), CoreError>;
}

/// Repository kept entirely in memory. Useful for tests and for hosts that
/// persist the log themselves.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    transactions: Vec<Transaction>,
    saves: usize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing log.
    pub fn with_transactions(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            saves: 0,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl TransactionRepository for InMemoryRepository {
    fn load(&self) -> Result<Vec<Transaction>, CoreError> {
        Ok(self.transactions.clone())
    }

    fn save(&mut self, transactions: &[Transaction]) -> Result<(), CoreError> {
        self.transactions = transactions.to_vec();
        self.saves += 1;
        Ok(())
    }
}
