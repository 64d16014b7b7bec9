//! File persistence configuration
use crate::utils::epoch_ms_to_filename_stamp;

/// Configuration for the kline cache database
pub struct CachePersistenceConfig {
    /// SQLite file holding cached klines and their covered ranges
    pub db_path: &'static str,
}

/// Configuration for CSV exports
pub struct ExportPersistenceConfig {
    /// Directory exports are written into (created on demand)
    pub directory: &'static str,
    pub filename_base: &'static str,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub cache: CachePersistenceConfig,
    pub export: ExportPersistenceConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    cache: CachePersistenceConfig {
        db_path: "klines.sqlite",
    },
    export: ExportPersistenceConfig {
        directory: "downloads",
        filename_base: "betas",
    },
};

/// Generate the export filename for a market scan
/// Example: "betas_BTCUSDT_20240108_1500_all.csv"
pub fn export_filename(benchmark: &str, start_ms: i64, session: &str) -> String {
    format!(
        "{}_{}_{}_{}.csv",
        PERSISTENCE.export.filename_base,
        benchmark,
        epoch_ms_to_filename_stamp(start_ms),
        session
    )
}
