pub mod executor;
pub mod ledger;
pub mod validator;

pub use executor::MarketExecutor;
pub use ledger::OrderLedger;
pub use validator::{validate_order, OrderLimits, ValidationError};
