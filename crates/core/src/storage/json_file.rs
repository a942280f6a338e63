use log::info;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;
use crate::models::transaction::Transaction;

use super::document;
use super::repository::TransactionRepository;

/// Transaction log stored as a JSON file on disk (native only).
///
/// A missing file loads as an empty log. A legacy bare array is accepted and
/// rewritten in document form on the next save.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TransactionRepository for JsonFileRepository {
    fn load(&self) -> Result<Vec<Transaction>, CoreError> {
        if !self.path.exists() {
            info!("No ledger file at {}; starting empty", self.path.display());
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(&self.path)?;
        let transactions = document::decode(&bytes)?;
        info!("Loaded {} transactions from {}", transactions.len(), self.path.display());
        Ok(transactions)
    }

    fn save(&mut self, transactions: &[Transaction]) -> Result<(), CoreError> {
        let bytes = document::encode(transactions)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, bytes)?;
        info!("Saved {} transactions to {}", transactions.len(), self.path.display());
        Ok(())
    }
}
