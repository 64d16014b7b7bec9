// Plain-text and CSV rendering of request output
mod export;
mod table;

pub use export::{market_csv, write_market_csv};
pub use table::{cache_table, market_table, pattern_table};
