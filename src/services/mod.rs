pub mod copy_relay;
pub mod fees;
pub mod limit_monitor;
pub mod notifier;
pub mod oracle_health;
pub mod snipe_monitor;
pub mod stop_loss_monitor;
pub mod supervisor;

pub use copy_relay::{CopyRelay, RelayFilter};
pub use fees::{FeeCollector, PercentageFeeCollector};
pub use limit_monitor::LimitMonitor;
pub use notifier::{AlertEvent, AlertSink, LogAlertSink, TelegramAlertSink};
pub use oracle_health::OracleHealth;
pub use snipe_monitor::SnipeMonitor;
pub use stop_loss_monitor::StopLossMonitor;
pub use supervisor::MonitorSupervisor;
