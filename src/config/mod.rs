//! Configuration module for beta-scope.

// Can all be private now because we have a public re-export.
mod analysis;
mod binance;
mod debug;
mod persistence;
mod types;
mod universe;

// Public
pub mod constants;

// Re-export commonly used items
pub use analysis::AnalysisConfig;
pub use binance::{BINANCE, BINANCE_QUOTE_ASSETS, BinanceApiConfig};
pub use debug::DF;
pub use persistence::{PERSISTENCE, export_filename};
pub use types::{AggregateMethod, Beta, ChangePct, RiskLevel};
pub use universe::UNIVERSE;
