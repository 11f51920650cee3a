pub mod errors;
pub mod ratelimit;
pub mod table;

pub use errors::{ListenerError, WalletError};
pub use table::Table;

/// Render an epoch-millis timestamp for display
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
