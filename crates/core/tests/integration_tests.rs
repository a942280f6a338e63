// ═══════════════════════════════════════════════════════════════════
// Integration Tests: StockLedger facade end to end
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;

use stock_ledger_core::errors::CoreError;
use stock_ledger_core::models::holding::AllocationBy;
use stock_ledger_core::models::price::PriceQuote;
use stock_ledger_core::models::settings::{OversellPolicy, Settings};
use stock_ledger_core::models::transaction::{Broker, Transaction, TransactionSortOrder, TransactionType};
use stock_ledger_core::providers::registry::QuoteProviderRegistry;
use stock_ledger_core::providers::traits::QuoteProvider;
use stock_ledger_core::storage::json_file::JsonFileRepository;
use stock_ledger_core::storage::repository::{InMemoryRepository, TransactionRepository};
use stock_ledger_core::StockLedger;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Two lots of AAPL at Firstrade, one sell spanning both, plus a Taiwan
/// position at FubonTW.
fn seeded() -> StockLedger {
    let mut ledger = StockLedger::create_new();
    ledger
        .add_transactions(vec![
            Transaction::buy(Broker::Firstrade, "AAPL", 10.0, 10.0, 5.0, d(2024, 1, 1)).with_id("b1"),
            Transaction::buy(Broker::Firstrade, "AAPL", 10.0, 20.0, 5.0, d(2024, 1, 5)).with_id("b2"),
            Transaction::sell(Broker::Firstrade, "AAPL", 15.0, 25.0, 0.0, d(2024, 1, 10)).with_id("s1"),
            Transaction::buy(Broker::FubonTW, "2330", 1000.0, 600.0, 855.0, d(2024, 1, 3)).with_id("tw1"),
        ])
        .unwrap();
    ledger
}

struct StaticProvider;

#[async_trait]
impl QuoteProvider for StaticProvider {
    fn name(&self) -> &str {
        "Static"
    }

    async fn get_quote(&self, ticker: &str) -> Result<PriceQuote, CoreError> {
        match ticker {
            "AAPL" => Ok(PriceQuote::new(30.0, Some(28.0))),
            "2330.TW" => Ok(PriceQuote::new(650.0, Some(640.0))),
            _ => Err(CoreError::PriceNotAvailable {
                symbol: ticker.to_string(),
            }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Lifecycle & persistence
// ═══════════════════════════════════════════════════════════════════

mod lifecycle {
    use super::*;

    #[test]
    fn create_new_is_empty_and_clean() {
        let ledger = StockLedger::create_new();
        assert_eq!(ledger.transaction_count(), 0);
        assert!(!ledger.has_unsaved_changes());
        assert!(ledger.holdings().unwrap().is_empty());
        assert_eq!(ledger.get_settings(), &Settings::default());
    }

    #[test]
    fn mutation_marks_dirty_and_save_clears() {
        let mut ledger = seeded();
        assert!(ledger.has_unsaved_changes());

        let mut repo = InMemoryRepository::new();
        ledger.save(&mut repo).unwrap();
        assert!(!ledger.has_unsaved_changes());
        assert_eq!(repo.transactions().len(), 4);
    }

    #[test]
    fn load_restores_log() {
        let mut ledger = seeded();
        let mut repo = InMemoryRepository::new();
        ledger.save(&mut repo).unwrap();

        let loaded = StockLedger::load(&repo).unwrap();
        assert_eq!(loaded.transaction_count(), 4);
        assert!(!loaded.has_unsaved_changes());
        assert_eq!(loaded.report().unwrap(), ledger.report().unwrap());
    }

    #[test]
    fn load_with_settings_applies_policy() {
        let repo = InMemoryRepository::with_transactions(vec![Transaction::sell(
            Broker::Firstrade,
            "AAPL",
            1.0,
            10.0,
            0.0,
            d(2024, 1, 1),
        )]);
        let settings = Settings {
            oversell_policy: OversellPolicy::Clamp,
            ..Settings::default()
        };

        let ledger = StockLedger::load_with_settings(&repo, settings).unwrap();
        let report = ledger.report().unwrap();
        assert_eq!(report.unmatched_sells.len(), 1);

        let strict = StockLedger::load(&repo).unwrap();
        assert!(matches!(strict.report(), Err(CoreError::Oversell { .. })));
    }

    #[test]
    fn load_keeps_repeated_ids() {
        let repo = InMemoryRepository::with_transactions(vec![
            Transaction::buy(Broker::Firstrade, "AAPL", 1.0, 10.0, 0.0, d(2024, 1, 1)).with_id("dup"),
            Transaction::buy(Broker::Firstrade, "AAPL", 2.0, 10.0, 0.0, d(2024, 1, 2)).with_id("dup"),
        ]);

        let ledger = StockLedger::load(&repo).unwrap();
        assert_eq!(ledger.transaction_count(), 2);
        assert_eq!(ledger.get_transaction("dup").unwrap().shares, 1.0);
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = JsonFileRepository::new(dir.path().join("ledger.json"));

        let mut ledger = seeded();
        ledger.save(&mut repo).unwrap();

        let loaded = StockLedger::load(&repo).unwrap();
        assert_eq!(loaded.get_transactions().len(), 4);
        assert_eq!(loaded.get_transaction("s1").unwrap().shares, 15.0);
    }

    #[test]
    fn failed_save_keeps_dirty_flag() {
        struct FailingRepository;

        impl TransactionRepository for FailingRepository {
            fn load(&self) -> Result<Vec<Transaction>, CoreError> {
                Ok(Vec::new())
            }

            fn save(&mut self, _: &[Transaction]) -> Result<(), CoreError> {
                Err(CoreError::FileIO("disk full".into()))
            }
        }

        let mut ledger = seeded();
        assert!(ledger.save(&mut FailingRepository).is_err());
        assert!(ledger.has_unsaved_changes());
    }

    #[test]
    fn debug_output_is_summary() {
        let ledger = seeded();
        let debug = format!("{ledger:?}");
        assert!(debug.contains("StockLedger"));
        assert!(debug.contains("transactions: 4"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Transaction management
// ═══════════════════════════════════════════════════════════════════

mod transactions {
    use super::*;

    #[test]
    fn record_returns_id() {
        let mut ledger = StockLedger::create_new();
        let id = ledger
            .record(TransactionType::Buy, Broker::FubonSub, "qqq", 2.0, 400.0, 1.0, d(2024, 1, 1))
            .unwrap();

        let txn = ledger.get_transaction(&id).unwrap();
        assert_eq!(txn.symbol, "QQQ");
    }

    #[test]
    fn add_many_is_all_or_nothing() {
        let mut ledger = seeded();
        let result = ledger.add_transactions(vec![
            Transaction::buy(Broker::Firstrade, "MSFT", 1.0, 300.0, 0.0, d(2024, 2, 1)),
            Transaction::sell(Broker::Firstrade, "MSFT", 2.0, 310.0, 0.0, d(2024, 2, 2)),
        ]);

        assert!(result.is_err());
        assert_eq!(ledger.transaction_count(), 4);
        assert!(ledger.get_transactions_for_symbol("MSFT").is_empty());
    }

    #[test]
    fn import_accepts_newest_first_document() {
        let json = r#"{ "transactions": [
            { "id": "s1", "date": "2024-03-01", "broker": "Firstrade", "symbol": "AAPL",
              "type": "Sell", "shares": 5, "price": 120, "fee": 0 },
            { "id": "b1", "date": "2024-01-01", "broker": "Firstrade", "symbol": "AAPL",
              "type": "Buy", "shares": 10, "price": 100, "fee": 0 }
        ] }"#;
        let mut ledger = StockLedger::create_new();

        assert_eq!(ledger.import_json(json).unwrap(), 2);
        let report = ledger.report().unwrap();
        assert_eq!(report.holdings.len(), 1);
        assert!(approx(report.holdings[0].shares, 5.0));
        assert!(approx(report.total_realized_pl, 100.0));
    }

    #[test]
    fn listing_is_newest_first() {
        let mut ledger = StockLedger::create_new();
        for (id, date) in [("a", d(2024, 1, 1)), ("b", d(2024, 1, 2)), ("c", d(2024, 1, 2))] {
            ledger
                .add_transaction(Transaction::buy(Broker::Firstrade, "AAPL", 1.0, 1.0, 0.0, date).with_id(id))
                .unwrap();
        }

        let txns = ledger.get_transactions();
        let ids: Vec<&str> = txns.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn filters() {
        let ledger = seeded();
        assert_eq!(ledger.get_transactions_for_symbol("aapl").len(), 3);
        assert_eq!(ledger.get_transactions_for_broker(Broker::FubonTW).len(), 1);
        assert!(ledger.get_transactions_for_broker(Broker::FubonSub).is_empty());
    }

    #[test]
    fn sorted_by_value() {
        let ledger = seeded();
        let sorted = ledger.get_transactions_sorted(&TransactionSortOrder::ValueDesc);
        assert_eq!(sorted[0].id, "tw1");
    }

    #[test]
    fn remove_and_update() {
        let mut ledger = seeded();

        let removed = ledger.remove_transaction("s1").unwrap();
        assert_eq!(removed.id, "s1");
        assert!(ledger.realized_positions().unwrap().is_empty());

        let replacement = Transaction::buy(Broker::Firstrade, "AAPL", 20.0, 10.0, 5.0, d(2024, 1, 1));
        ledger.update_transaction("b1", replacement).unwrap();
        let aapl = ledger
            .holdings()
            .unwrap()
            .into_iter()
            .find(|h| h.symbol == "AAPL")
            .unwrap();
        assert!(approx(aapl.shares, 30.0));
    }

    #[test]
    fn remove_needed_buy_is_rejected() {
        let mut ledger = seeded();
        assert!(matches!(
            ledger.remove_transaction("b1"),
            Err(CoreError::Oversell { .. })
        ));
        assert_eq!(ledger.transaction_count(), 4);
    }

    #[test]
    fn notes() {
        let mut ledger = seeded();
        ledger.set_transaction_notes("tw1", Some("core holding".into())).unwrap();
        assert_eq!(
            ledger.get_transaction("tw1").unwrap().notes.as_deref(),
            Some("core holding")
        );
        assert!(matches!(
            ledger.set_transaction_notes("missing", None),
            Err(CoreError::TransactionNotFound(_))
        ));
    }

    #[test]
    fn clear() {
        let mut ledger = seeded();
        let mut repo = InMemoryRepository::new();
        ledger.save(&mut repo).unwrap();

        ledger.clear_transactions();
        assert_eq!(ledger.transaction_count(), 0);
        assert!(ledger.has_unsaved_changes());
        assert_eq!(ledger.total_realized_pl().unwrap(), 0.0);
    }

    #[test]
    fn export_import_json() {
        let ledger = seeded();
        let json = ledger.export_json().unwrap();
        assert!(json.contains("\"transactions\""));

        let mut copy = StockLedger::create_new();
        assert_eq!(copy.import_json(&json).unwrap(), 4);
        assert_eq!(copy.report().unwrap(), ledger.report().unwrap());

        // Importing the same ids again is rejected as a whole
        assert!(matches!(
            copy.import_json(&json),
            Err(CoreError::DuplicateTransaction(_))
        ));
        assert_eq!(copy.transaction_count(), 4);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Ledger & valuation
// ═══════════════════════════════════════════════════════════════════

mod valuation {
    use super::*;

    #[test]
    fn report_matches_worked_example() {
        let ledger = seeded();
        let report = ledger.report().unwrap();

        assert_eq!(report.realized_positions.len(), 2);
        assert!(approx(report.total_realized_pl, 167.5));

        let aapl = report.holdings.iter().find(|h| h.symbol == "AAPL").unwrap();
        assert!(approx(aapl.shares, 5.0));
        assert!(approx(aapl.avg_cost, 20.5));
    }

    #[test]
    fn prices_flow_into_holdings_and_stats() {
        let mut ledger = seeded();
        ledger.update_price("aapl", 30.0, Some(28.0)).unwrap();

        let aapl = ledger
            .holdings()
            .unwrap()
            .into_iter()
            .find(|h| h.symbol == "AAPL")
            .unwrap();
        assert_eq!(aapl.current_price, Some(30.0));
        assert!(approx(aapl.market_value, 150.0));
        assert!(approx(aapl.day_change.unwrap(), 10.0));

        let stats = ledger.stats().unwrap();
        // 2330 unpriced: valued at its cost of 600855
        assert!((stats.total_value - (150.0 + 600_855.0)).abs() < 1e-6);
        assert!((stats.total_cost - (102.5 + 600_855.0)).abs() < 1e-6);
        assert!((stats.total_unrealized_pl - 47.5).abs() < 1e-6);
        assert!(approx(stats.total_realized_pl, 167.5));
    }

    #[test]
    fn invalid_price_is_rejected() {
        let mut ledger = seeded();
        assert!(ledger.update_price("AAPL", 0.0, None).is_err());
        assert!(ledger.get_price("AAPL").is_none());
        assert!(ledger.prices().is_empty());
    }

    #[test]
    fn clearing_prices_reverts_to_cost() {
        let mut ledger = seeded();
        ledger.update_price("AAPL", 30.0, None).unwrap();
        ledger.clear_prices();

        let stats = ledger.stats().unwrap();
        assert!(stats.total_unrealized_pl.abs() < 1e-6);
    }

    #[test]
    fn snapshot_is_consistent() {
        let mut ledger = seeded();
        ledger.update_price("AAPL", 30.0, None).unwrap();
        ledger.update_price("2330", 650.0, None).unwrap();

        let snapshot = ledger.snapshot().unwrap();
        assert_eq!(snapshot.holdings, ledger.holdings().unwrap());
        assert_eq!(snapshot.stats, ledger.stats().unwrap());
        assert_eq!(snapshot.realized_summary, ledger.realized_summary().unwrap());
        assert_eq!(snapshot.realized_summary.short_term.count, 2);
        assert!(snapshot.unmatched_sells.is_empty());

        let sum: f64 = snapshot.holdings.iter().map(|h| h.market_value - h.total_cost).sum();
        assert!((snapshot.stats.total_unrealized_pl - sum).abs() < 1e-6);
    }

    #[test]
    fn allocation_by_broker() {
        let mut ledger = seeded();
        ledger.update_price("AAPL", 30.0, None).unwrap();
        ledger.update_price("2330", 650.0, None).unwrap();

        let slices = ledger.allocation(AllocationBy::Broker).unwrap();
        assert_eq!(slices[0].name, "FubonTW");
        assert!(approx(slices[0].value, 650_000.0));
        assert_eq!(slices[1].name, "Firstrade");
        let total: f64 = slices.iter().map(|s| s.percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn reads_are_repeatable() {
        let ledger = seeded();
        assert_eq!(ledger.snapshot().unwrap(), ledger.snapshot().unwrap());
    }

    #[test]
    fn estimate_fee_uses_broker_schedule() {
        let ledger = StockLedger::create_new();
        assert_eq!(ledger.estimate_fee(Broker::Firstrade, TransactionType::Buy, 10.0, 100.0), 0.0);
        assert_eq!(ledger.estimate_fee(Broker::FubonTW, TransactionType::Buy, 10.0, 50.0), 20.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Oversell policy
// ═══════════════════════════════════════════════════════════════════

mod oversell_policy {
    use super::*;

    #[test]
    fn clamp_reports_unmatched_sell() {
        let mut ledger = StockLedger::with_settings(Settings {
            oversell_policy: OversellPolicy::Clamp,
            ..Settings::default()
        });
        ledger
            .add_transaction(Transaction::buy(Broker::Firstrade, "AMC", 5.0, 4.0, 0.0, d(2024, 1, 1)))
            .unwrap();
        ledger
            .add_transaction(Transaction::sell(Broker::Firstrade, "AMC", 8.0, 5.0, 0.0, d(2024, 1, 2)).with_id("over"))
            .unwrap();

        let snapshot = ledger.snapshot().unwrap();
        assert_eq!(snapshot.unmatched_sells.len(), 1);
        assert_eq!(snapshot.unmatched_sells[0].transaction_id, "over");
        assert!(snapshot.holdings.is_empty());

        // Switching back to Reject surfaces the inconsistency on read
        ledger.set_oversell_policy(OversellPolicy::Reject);
        assert_eq!(ledger.get_settings().oversell_policy, OversellPolicy::Reject);
        assert!(matches!(ledger.snapshot(), Err(CoreError::Oversell { .. })));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Price refresh & providers
// ═══════════════════════════════════════════════════════════════════

mod refresh {
    use super::*;

    fn with_static_provider(mut ledger: StockLedger) -> StockLedger {
        let mut registry = QuoteProviderRegistry::new();
        registry.register(Box::new(StaticProvider));
        ledger.set_quote_providers(registry);
        ledger
    }

    #[tokio::test]
    async fn refresh_quotes_held_symbols() {
        let mut ledger = with_static_provider(seeded());

        let stored = ledger.refresh_prices().await.unwrap();
        assert_eq!(stored, 2);
        assert_eq!(ledger.get_price("AAPL").unwrap().current, 30.0);
        assert_eq!(ledger.get_price("2330").unwrap().previous_close, Some(640.0));

        let tw = ledger
            .holdings()
            .unwrap()
            .into_iter()
            .find(|h| h.symbol == "2330")
            .unwrap();
        assert!(approx(tw.day_change.unwrap(), 10_000.0));
    }

    #[tokio::test]
    async fn refresh_skips_closed_positions() {
        let mut ledger = with_static_provider(StockLedger::create_new());
        ledger
            .add_transactions(vec![
                Transaction::buy(Broker::Firstrade, "AAPL", 1.0, 10.0, 0.0, d(2024, 1, 1)),
                Transaction::sell(Broker::Firstrade, "AAPL", 1.0, 12.0, 0.0, d(2024, 1, 2)),
            ])
            .unwrap();

        assert_eq!(ledger.refresh_prices().await.unwrap(), 0);
        assert!(ledger.prices().is_empty());
    }

    #[tokio::test]
    async fn refresh_without_providers_fails() {
        let mut ledger = seeded();
        ledger.set_quote_providers(QuoteProviderRegistry::new());
        assert!(matches!(
            ledger.refresh_prices().await,
            Err(CoreError::NoProvider(_))
        ));
    }

    #[test]
    fn api_keys_rebuild_providers() {
        let mut ledger = StockLedger::create_new();
        assert_eq!(ledger.get_provider_names(), vec!["Yahoo Finance"]);

        ledger.set_api_key("finnhub".into(), "key".into());
        assert_eq!(ledger.get_provider_names(), vec!["Finnhub", "Yahoo Finance"]);

        assert!(ledger.remove_api_key("finnhub"));
        assert!(!ledger.remove_api_key("finnhub"));
        assert_eq!(ledger.get_provider_names(), vec!["Yahoo Finance"]);
    }
}
