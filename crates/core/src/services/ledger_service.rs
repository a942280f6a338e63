use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::normalize::sanitize_amount;
use crate::models::realized::RealizedPosition;
use crate::models::report::{LedgerReport, UnmatchedSell};
use crate::models::settings::OversellPolicy;
use crate::models::transaction::{normalize_symbol, Broker, Currency, Transaction, TransactionType};

/// Positions at or below this many shares are closed out and not reported.
pub const HOLDING_EPSILON: f64 = 1e-6;

/// Sales held at least this many days are long-term.
pub const LONG_TERM_DAYS: i64 = 365;

/// Lot remainders at or below this are float residue, not shares.
const LOT_DUST: f64 = 1e-9;

/// A remaining slice of one buy.
#[derive(Debug, Clone)]
struct Lot {
    remaining: f64,
    /// Size when the buy was recorded; fees are apportioned against this
    original: f64,
    price: f64,
    fee: f64,
    acquired: NaiveDate,
}

impl Lot {
    /// Buy fee attributable to `shares` of this lot, apportioned per unit of
    /// the lot's original size.
    fn fee_for(&self, shares: f64) -> f64 {
        if self.original > 0.0 {
            self.fee / self.original * shares
        } else {
            0.0
        }
    }
}

/// Working state for one (symbol, broker) pair.
#[derive(Debug)]
struct Partition {
    symbol: String,
    broker: Broker,
    currency: Currency,
    /// Oldest lot at the front
    lots: VecDeque<Lot>,
    total_shares: f64,
    total_cost: f64,
}

impl Partition {
    fn new(symbol: String, broker: Broker, currency: Currency) -> Self {
        Self {
            symbol,
            broker,
            currency,
            lots: VecDeque::new(),
            total_shares: 0.0,
            total_cost: 0.0,
        }
    }
}

/// The lot ledger: replays a transaction log into open holdings and realized
/// positions using first-in-first-out lot matching.
///
/// Pure and deterministic. No state survives between calls; every replay
/// starts from the complete log it is handed.
#[derive(Debug, Clone, Default)]
pub struct LedgerService {
    oversell_policy: OversellPolicy,
}

impl LedgerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(oversell_policy: OversellPolicy) -> Self {
        Self { oversell_policy }
    }

    pub fn oversell_policy(&self) -> OversellPolicy {
        self.oversell_policy
    }

    /// Replay `transactions` (any order) and derive holdings, realized
    /// positions and the realized total.
    ///
    /// Transactions are ordered by date; same-date transactions keep their
    /// relative input order. Each (symbol, broker) pair is replayed
    /// independently.
    pub fn replay(&self, transactions: &[Transaction]) -> Result<LedgerReport, CoreError> {
        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        ordered.sort_by_key(|t| t.date); // stable: ties keep input order

        let mut partitions: Vec<Partition> = Vec::new();
        let mut index: HashMap<(String, Broker), usize> = HashMap::new();
        let mut report = LedgerReport::default();

        for txn in ordered {
            let symbol = normalize_symbol(&txn.symbol);
            let slot = *index.entry((symbol.clone(), txn.broker)).or_insert_with(|| {
                partitions.push(Partition::new(symbol, txn.broker, txn.currency()));
                partitions.len() - 1
            });
            let partition = &mut partitions[slot];

            match txn.transaction_type {
                TransactionType::Buy => Self::apply_buy(partition, txn),
                TransactionType::Sell => self.apply_sell(partition, txn, &mut report)?,
            }
        }

        report.holdings = partitions
            .into_iter()
            .filter(|p| p.total_shares > HOLDING_EPSILON)
            .map(|p| Holding::from_basis(p.symbol, p.broker, p.currency, p.total_shares, p.total_cost))
            .collect();

        debug!(
            "Replayed {} transactions: {} holdings, {} realized positions",
            transactions.len(),
            report.holdings.len(),
            report.realized_positions.len()
        );

        Ok(report)
    }

    fn apply_buy(partition: &mut Partition, txn: &Transaction) {
        let shares = sanitize_amount(txn.shares, "shares", &txn.id);
        let price = sanitize_amount(txn.price, "price", &txn.id);
        let fee = sanitize_amount(txn.fee, "fee", &txn.id);

        if shares <= 0.0 {
            warn!("Transaction {}: buy of zero shares ignored", txn.id);
            return;
        }

        partition.lots.push_back(Lot {
            remaining: shares,
            original: shares,
            price,
            fee,
            acquired: txn.date,
        });
        partition.total_shares += shares;
        partition.total_cost += shares * price + fee;
    }

    fn apply_sell(
        &self,
        partition: &mut Partition,
        txn: &Transaction,
        report: &mut LedgerReport,
    ) -> Result<(), CoreError> {
        let shares = sanitize_amount(txn.shares, "shares", &txn.id);
        let sale_price = sanitize_amount(txn.price, "price", &txn.id);
        let fee = sanitize_amount(txn.fee, "fee", &txn.id);

        if shares <= 0.0 {
            warn!("Transaction {}: sell of zero shares ignored", txn.id);
            return Ok(());
        }

        // Checked up front so a rejected replay never emits half a sell.
        if self.oversell_policy == OversellPolicy::Reject
            && shares > partition.total_shares + LOT_DUST
        {
            return Err(CoreError::Oversell {
                symbol: partition.symbol.clone(),
                broker: partition.broker.to_string(),
                date: txn.date.to_string(),
                requested: shares,
                available: partition.total_shares.max(0.0),
            });
        }

        let sale_fee_per_share = fee / shares;
        let mut to_sell = shares;

        while to_sell > LOT_DUST {
            let Some(lot) = partition.lots.front_mut() else {
                break;
            };

            let take = to_sell.min(lot.remaining);
            let acquisition_fee = lot.fee_for(take);
            let sale_fee = sale_fee_per_share * take;

            let adjusted_cost = lot.price * take + acquisition_fee;
            let sales_proceeds = sale_price * take - sale_fee;
            let net_gain_loss = sales_proceeds - adjusted_cost;
            let days_held = (txn.date - lot.acquired).num_days();

            report.realized_positions.push(RealizedPosition {
                symbol: partition.symbol.clone(),
                broker: partition.broker,
                currency: partition.currency,
                quantity: take,
                date_acquired: lot.acquired,
                date_sold: txn.date,
                days_held,
                acquisition_price: lot.price,
                acquisition_fee,
                sale_price,
                sale_fee,
                adjusted_cost,
                sales_proceeds,
                net_gain_loss,
                gain_loss_percent: if adjusted_cost != 0.0 {
                    net_gain_loss / adjusted_cost * 100.0
                } else {
                    0.0
                },
                is_short_term: days_held < LONG_TERM_DAYS,
            });
            report.total_realized_pl += net_gain_loss;

            lot.remaining -= take;
            partition.total_shares -= take;
            partition.total_cost -= adjusted_cost;
            to_sell -= take;

            if lot.remaining <= LOT_DUST {
                if let Some(spent) = partition.lots.pop_front() {
                    // Drop the residue with the lot so totals keep matching the queue.
                    partition.total_shares -= spent.remaining;
                    partition.total_cost -= spent.price * spent.remaining + spent.fee_for(spent.remaining);
                }
            }
        }

        if to_sell > LOT_DUST {
            warn!(
                "Transaction {}: sell of {} {} at {} on {} exceeds holdings by {}; excess left unmatched",
                txn.id, shares, partition.symbol, partition.broker, txn.date, to_sell
            );
            report.unmatched_sells.push(UnmatchedSell {
                transaction_id: txn.id.clone(),
                symbol: partition.symbol.clone(),
                broker: partition.broker,
                date: txn.date,
                unmatched_shares: to_sell,
            });
        }

        Ok(())
    }
}
