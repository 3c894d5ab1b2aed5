//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod dividend;
pub mod history;
pub mod log;
pub mod notify;
pub mod price;
pub mod recommend;
pub mod signal;
pub mod yields;

// Re-export main types for cleaner imports
pub use cache::{YieldCache, YieldStore};
pub use dividend::DividendProvider;
pub use notify::Notifier;
pub use price::{PriceHistoryProvider, PricePoint, PriceSeries, RawHistory};
pub use signal::{ScoreRow, ScoreTable, SignalParams};
