pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use models::{
    holding::{AllocationBy, AllocationSlice, Holding, PortfolioStats},
    price::{PriceBook, PriceQuote},
    realized::{RealizedPosition, RealizedSummary},
    report::{LedgerReport, PortfolioSnapshot},
    settings::{OversellPolicy, Settings},
    transaction::{normalize_symbol, Broker, Transaction, TransactionSortOrder, TransactionType},
};
use providers::registry::QuoteProviderRegistry;
use services::{
    fee_service::FeeService, ledger_service::LedgerService, price_service::PriceService,
    transaction_service::TransactionService, valuation_service::ValuationService,
};
use storage::{document, repository::TransactionRepository};

use errors::CoreError;

/// Main entry point for the stock ledger core library.
/// Holds the transaction log, the latest quotes, and the services that
/// derive holdings and realized P/L from them.
///
/// Nothing derived is cached: every read replays the full log.
#[must_use]
pub struct StockLedger {
    transactions: Vec<Transaction>,
    settings: Settings,
    prices: PriceBook,
    transaction_service: TransactionService,
    ledger_service: LedgerService,
    valuation_service: ValuationService,
    fee_service: FeeService,
    price_service: PriceService,
    /// Tracks whether the log changed since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for StockLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockLedger")
            .field("transactions", &self.transactions.len())
            .field("oversell_policy", &self.settings.oversell_policy)
            .field("quotes", &self.prices.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl StockLedger {
    /// Create an empty ledger with default settings.
    pub fn create_new() -> Self {
        Self::build(Vec::new(), Settings::default())
    }

    /// Create an empty ledger with the given settings.
    pub fn with_settings(settings: Settings) -> Self {
        Self::build(Vec::new(), settings)
    }

    /// Load the log from a repository, with default settings.
    pub fn load(repository: &dyn TransactionRepository) -> Result<Self, CoreError> {
        Self::load_with_settings(repository, Settings::default())
    }

    /// Load the log from a repository.
    ///
    /// Stored records are taken as-is apart from symbol normalization; an
    /// inconsistent stored log surfaces when the ledger is next replayed.
    /// Repeated ids are kept but logged, since edits by id only reach the
    /// first record carrying it.
    pub fn load_with_settings(
        repository: &dyn TransactionRepository,
        settings: Settings,
    ) -> Result<Self, CoreError> {
        let mut transactions = repository.load()?;
        for txn in &mut transactions {
            txn.symbol = normalize_symbol(&txn.symbol);
        }
        for id in TransactionService::duplicate_ids(&transactions) {
            log::warn!("Stored ledger repeats transaction id '{id}'; edits apply to its first record");
        }
        log::info!("Ledger loaded with {} transactions", transactions.len());
        Ok(Self::build(transactions, settings))
    }

    /// Write the log to a repository.
    /// Clears the unsaved-changes flag on success.
    pub fn save(&mut self, repository: &mut dyn TransactionRepository) -> Result<(), CoreError> {
        repository.save(&self.transactions)?;
        self.dirty = false;
        Ok(())
    }

    // ── Transaction Management ──────────────────────────────────────

    /// Record a transaction. Returns its id.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<String, CoreError> {
        let id = transaction.id.clone();
        self.transaction_service.add(&mut self.transactions, transaction)?;
        self.dirty = true;
        Ok(id)
    }

    /// Build and record a transaction from its parts. Returns the new id.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        transaction_type: TransactionType,
        broker: Broker,
        symbol: &str,
        shares: f64,
        price: f64,
        fee: f64,
        date: chrono::NaiveDate,
    ) -> Result<String, CoreError> {
        self.add_transaction(Transaction::new(transaction_type, broker, symbol, shares, price, fee, date))
    }

    /// Add multiple transactions at once (all-or-nothing), in any order.
    /// Returns the ids of the added transactions.
    pub fn add_transactions(&mut self, transactions: Vec<Transaction>) -> Result<Vec<String>, CoreError> {
        let ids = self
            .transaction_service
            .add_all(&mut self.transactions, transactions)?;
        if !ids.is_empty() {
            self.dirty = true;
        }
        Ok(ids)
    }

    /// Remove a transaction by id, returning it.
    pub fn remove_transaction(&mut self, id: &str) -> Result<Transaction, CoreError> {
        let removed = self.transaction_service.remove(&mut self.transactions, id)?;
        self.dirty = true;
        Ok(removed)
    }

    /// Replace the transaction stored under `id`, keeping the id.
    pub fn update_transaction(&mut self, id: &str, replacement: Transaction) -> Result<(), CoreError> {
        self.transaction_service
            .update(&mut self.transactions, id, replacement)?;
        self.dirty = true;
        Ok(())
    }

    /// Set or clear notes on an existing transaction.
    pub fn set_transaction_notes(&mut self, id: &str, notes: Option<String>) -> Result<(), CoreError> {
        self.transaction_service
            .set_notes(&mut self.transactions, id, notes)?;
        self.dirty = true;
        Ok(())
    }

    /// Drop every transaction.
    pub fn clear_transactions(&mut self) {
        if !self.transactions.is_empty() {
            self.transactions.clear();
            self.dirty = true;
        }
    }

    #[must_use]
    pub fn get_transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// All transactions, newest first. Same-date entries list the most
    /// recently recorded first.
    #[must_use]
    pub fn get_transactions(&self) -> Vec<&Transaction> {
        let mut txns: Vec<&Transaction> = self.transactions.iter().rev().collect();
        txns.sort_by(|a, b| b.date.cmp(&a.date));
        txns
    }

    /// Transactions for one symbol (case-insensitive), newest first.
    #[must_use]
    pub fn get_transactions_for_symbol(&self, symbol: &str) -> Vec<&Transaction> {
        let symbol = normalize_symbol(symbol);
        self.get_transactions()
            .into_iter()
            .filter(|t| t.symbol == symbol)
            .collect()
    }

    /// Transactions at one broker, newest first.
    #[must_use]
    pub fn get_transactions_for_broker(&self, broker: Broker) -> Vec<&Transaction> {
        self.get_transactions()
            .into_iter()
            .filter(|t| t.broker == broker)
            .collect()
    }

    #[must_use]
    pub fn get_transactions_sorted(&self, order: &TransactionSortOrder) -> Vec<&Transaction> {
        self.transaction_service.sorted(&self.transactions, order)
    }

    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    // ── Export / Import ─────────────────────────────────────────────

    /// Export the log as a `{ "transactions": [...] }` JSON document.
    pub fn export_json(&self) -> Result<String, CoreError> {
        let bytes = document::encode(&self.transactions)?;
        String::from_utf8(bytes)
            .map_err(|e| CoreError::Serialization(format!("Ledger JSON is not UTF-8: {e}")))
    }

    /// Import transactions from a JSON document (or a bare array) and append
    /// them (all-or-nothing). Returns the number imported.
    pub fn import_json(&mut self, json: &str) -> Result<usize, CoreError> {
        let transactions = document::decode(json.as_bytes())?;
        let count = transactions.len();
        self.add_transactions(transactions)?;
        Ok(count)
    }

    // ── Prices ──────────────────────────────────────────────────────

    /// Record the latest quote for a symbol (last write wins).
    pub fn update_price(
        &mut self,
        symbol: &str,
        current: f64,
        previous_close: Option<f64>,
    ) -> Result<(), CoreError> {
        self.prices.update(symbol, current, previous_close)
    }

    #[must_use]
    pub fn get_price(&self, symbol: &str) -> Option<PriceQuote> {
        self.prices.get(symbol).copied()
    }

    #[must_use]
    pub fn prices(&self) -> &PriceBook {
        &self.prices
    }

    pub fn clear_prices(&mut self) {
        self.prices.clear();
    }

    /// Fetch quotes for every symbol currently held and store them.
    /// Per-symbol failures are logged and skipped. Returns the number of
    /// quotes stored.
    pub async fn refresh_prices(&mut self) -> Result<usize, CoreError> {
        let mut symbols: Vec<String> = Vec::new();
        for holding in self.ledger_service.replay(&self.transactions)?.holdings {
            if !symbols.contains(&holding.symbol) {
                symbols.push(holding.symbol);
            }
        }
        if symbols.is_empty() {
            return Ok(0);
        }
        if !self.price_service.has_providers() {
            return Err(CoreError::NoProvider(symbols.join(", ")));
        }

        let stored = self.price_service.refresh(&mut self.prices, &symbols).await;
        log::info!("Refreshed {stored} of {} quotes", symbols.len());
        Ok(stored)
    }

    /// Names of the configured quote providers, in priority order.
    #[must_use]
    pub fn get_provider_names(&self) -> Vec<String> {
        self.price_service.get_provider_names()
    }

    /// Replace the quote providers (e.g., with a custom or offline source).
    pub fn set_quote_providers(&mut self, registry: QuoteProviderRegistry) {
        self.price_service = PriceService::new(registry);
    }

    // ── Ledger & Valuation ──────────────────────────────────────────

    /// Replay the log and mark the holdings to the current price book.
    pub fn report(&self) -> Result<LedgerReport, CoreError> {
        let mut report = self.ledger_service.replay(&self.transactions)?;
        self.valuation_service
            .apply_prices(&mut report.holdings, &self.prices);
        Ok(report)
    }

    pub fn holdings(&self) -> Result<Vec<Holding>, CoreError> {
        Ok(self.report()?.holdings)
    }

    pub fn realized_positions(&self) -> Result<Vec<RealizedPosition>, CoreError> {
        Ok(self.report()?.realized_positions)
    }

    pub fn total_realized_pl(&self) -> Result<f64, CoreError> {
        Ok(self.report()?.total_realized_pl)
    }

    pub fn stats(&self) -> Result<PortfolioStats, CoreError> {
        let report = self.report()?;
        Ok(self
            .valuation_service
            .portfolio_stats(&report.holdings, report.total_realized_pl))
    }

    /// Holdings, realized positions, stats and the realized summary from a
    /// single replay.
    pub fn snapshot(&self) -> Result<PortfolioSnapshot, CoreError> {
        let report = self.report()?;
        let stats = self
            .valuation_service
            .portfolio_stats(&report.holdings, report.total_realized_pl);
        let realized_summary = self
            .valuation_service
            .realized_summary(&report.realized_positions);

        Ok(PortfolioSnapshot {
            holdings: report.holdings,
            realized_positions: report.realized_positions,
            stats,
            realized_summary,
            unmatched_sells: report.unmatched_sells,
        })
    }

    pub fn allocation(&self, by: AllocationBy) -> Result<Vec<AllocationSlice>, CoreError> {
        let report = self.report()?;
        Ok(self.valuation_service.allocation(&report.holdings, by))
    }

    pub fn realized_summary(&self) -> Result<RealizedSummary, CoreError> {
        let report = self.ledger_service.replay(&self.transactions)?;
        Ok(self
            .valuation_service
            .realized_summary(&report.realized_positions))
    }

    /// Expected fee for a prospective trade under the broker's schedule.
    #[must_use]
    pub fn estimate_fee(
        &self,
        broker: Broker,
        transaction_type: TransactionType,
        shares: f64,
        price: f64,
    ) -> f64 {
        self.fee_service
            .estimate(broker, transaction_type, shares, price)
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn get_settings(&self) -> &Settings {
        &self.settings
    }

    /// Change how oversells are handled. Affects subsequent edits and reads.
    pub fn set_oversell_policy(&mut self, policy: OversellPolicy) {
        self.settings.oversell_policy = policy;
        self.ledger_service = LedgerService::with_policy(policy);
        self.transaction_service = TransactionService::new(policy);
    }

    /// Set an API key for a quote provider (e.g., "finnhub").
    /// Rebuilds the provider registry so the new key takes effect immediately.
    pub fn set_api_key(&mut self, provider: String, key: String) {
        self.settings.api_keys.insert(provider, key);
        let registry = QuoteProviderRegistry::new_with_defaults(&self.settings.api_keys);
        self.price_service = PriceService::new(registry);
    }

    /// Remove an API key for a provider.
    /// Rebuilds the provider registry so the removal takes effect immediately.
    pub fn remove_api_key(&mut self, provider: &str) -> bool {
        let removed = self.settings.api_keys.remove(provider).is_some();
        if removed {
            let registry = QuoteProviderRegistry::new_with_defaults(&self.settings.api_keys);
            self.price_service = PriceService::new(registry);
        }
        removed
    }

    /// Returns `true` if the log has been modified since the last save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(transactions: Vec<Transaction>, settings: Settings) -> Self {
        let policy = settings.oversell_policy;
        let registry = QuoteProviderRegistry::new_with_defaults(&settings.api_keys);

        Self {
            transactions,
            prices: PriceBook::new(),
            transaction_service: TransactionService::new(policy),
            ledger_service: LedgerService::with_policy(policy),
            valuation_service: ValuationService::new(),
            fee_service: FeeService::new(),
            price_service: PriceService::new(registry),
            settings,
            dirty: false,
        }
    }
}
