pub mod copytrade;
pub mod health;
pub mod orders;
pub mod snipes;
