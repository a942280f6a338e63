pub mod fee_service;
pub mod ledger_service;
pub mod price_service;
pub mod transaction_service;
pub mod valuation_service;
