use {
    crate::domain::{Candle, TimeRange},
    anyhow::{Context, Result},
    async_trait::async_trait,
    serde::Serialize,
    sqlx::{
        ConnectOptions, Pool, QueryBuilder, Row, Sqlite,
        sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    },
    std::{path::Path, time::Duration},
};

/// One cached (symbol, interval) key and the range it fully covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedKey {
    pub symbol: String,
    pub interval: String,
    pub coverage: TimeRange,
    pub candles: i64,
}

#[async_trait]
pub trait MarketDataStorage: Send + Sync {
    async fn initialize(&self) -> Result<()>;
    /// Contiguous range of open times known to be fully cached.
    async fn get_coverage(&self, pair: &str, interval: &str) -> Result<Option<TimeRange>>;
    /// Inserts `candles` (existing open times win) and records `coverage`
    /// for the key, atomically.
    async fn merge_range(
        &self,
        pair: &str,
        interval: &str,
        candles: &[Candle],
        coverage: TimeRange,
    ) -> Result<u64>;
    async fn load_candles(&self, pair: &str, interval: &str, range: TimeRange)
    -> Result<Vec<Candle>>;
    /// Drops candles and coverage for `pair` (every interval). Returns rows removed.
    async fn invalidate(&self, pair: &str) -> Result<u64>;
    async fn cached_keys(&self) -> Result<Vec<CachedKey>>;
}

pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

impl SqliteStorage {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create cache directory {}", parent.display()))?;
        }

        let connection_options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(60))
            .synchronous(SqliteSynchronous::Normal)
            .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connection_options)
            .await
            .with_context(|| format!("open kline cache {}", db_path.display()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl MarketDataStorage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS klines (
                symbol TEXT NOT NULL,
                interval TEXT NOT NULL,
                open_time INTEGER NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                base_vol REAL NOT NULL,
                quote_vol REAL NOT NULL,
                PRIMARY KEY (symbol, interval, open_time)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("create klines table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS coverage (
                symbol TEXT NOT NULL,
                interval TEXT NOT NULL,
                start_ms INTEGER NOT NULL,
                end_ms INTEGER NOT NULL,
                PRIMARY KEY (symbol, interval)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("create coverage table")?;

        Ok(())
    }

    async fn get_coverage(&self, pair: &str, interval: &str) -> Result<Option<TimeRange>> {
        let row = sqlx::query(
            r#"
            SELECT start_ms, end_ms
            FROM coverage
            WHERE symbol = ? AND interval = ?
            "#,
        )
        .bind(pair)
        .bind(interval)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("read coverage for {} {}", pair, interval))?;

        Ok(row.map(|r| TimeRange {
            start_ms: r.get("start_ms"),
            end_ms: r.get("end_ms"),
        }))
    }

    /// Batches candles in chunks of 3000 to stay within SQLite's 32k parameter limit.
    async fn merge_range(
        &self,
        pair: &str,
        interval: &str,
        candles: &[Candle],
        coverage: TimeRange,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("begin merge")?;
        let mut inserted = 0;

        for chunk in candles.chunks(3000) {
            let mut query_builder = QueryBuilder::new(
                "INSERT OR IGNORE INTO klines (symbol, interval, open_time, open, high, low, close, base_vol, quote_vol) ",
            );

            query_builder.push_values(chunk, |mut b, c| {
                b.push_bind(pair)
                    .push_bind(interval)
                    .push_bind(c.timestamp_ms)
                    .push_bind(c.open_price)
                    .push_bind(c.high_price)
                    .push_bind(c.low_price)
                    .push_bind(c.close_price)
                    .push_bind(c.base_asset_volume)
                    .push_bind(c.quote_asset_volume);
            });

            inserted += query_builder
                .build()
                .execute(&mut *tx)
                .await
                .with_context(|| format!("insert klines for {} {}", pair, interval))?
                .rows_affected();
        }

        sqlx::query(
            r#"
            INSERT INTO coverage (symbol, interval, start_ms, end_ms)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(symbol, interval) DO UPDATE SET
                start_ms = excluded.start_ms,
                end_ms = excluded.end_ms
            "#,
        )
        .bind(pair)
        .bind(interval)
        .bind(coverage.start_ms)
        .bind(coverage.end_ms)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("record coverage for {} {}", pair, interval))?;

        tx.commit().await.context("commit merge")?;
        Ok(inserted)
    }

    async fn load_candles(
        &self,
        pair: &str,
        interval: &str,
        range: TimeRange,
    ) -> Result<Vec<Candle>> {
        let rows = sqlx::query(
            r#"
            SELECT open_time, open, high, low, close, base_vol, quote_vol
            FROM klines
            WHERE symbol = ? AND interval = ? AND open_time >= ? AND open_time <= ?
            ORDER BY open_time ASC
            "#,
        )
        .bind(pair)
        .bind(interval)
        .bind(range.start_ms)
        .bind(range.end_ms)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("load klines for {} {}", pair, interval))?;

        let candles = rows
            .iter()
            .map(|row| {
                Candle::new(
                    row.get("open_time"),
                    row.get("open"),
                    row.get("high"),
                    row.get("low"),
                    row.get("close"),
                    row.get("base_vol"),
                    row.get("quote_vol"),
                )
            })
            .collect();

        Ok(candles)
    }

    async fn invalidate(&self, pair: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("begin invalidate")?;
        let removed = sqlx::query("DELETE FROM klines WHERE symbol = ?")
            .bind(pair)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("delete klines for {}", pair))?
            .rows_affected();
        sqlx::query("DELETE FROM coverage WHERE symbol = ?")
            .bind(pair)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("delete coverage for {}", pair))?;
        tx.commit().await.context("commit invalidate")?;
        Ok(removed)
    }

    async fn cached_keys(&self) -> Result<Vec<CachedKey>> {
        let rows = sqlx::query(
            r#"
            SELECT c.symbol, c.interval, c.start_ms, c.end_ms,
                   (SELECT COUNT(*) FROM klines k
                     WHERE k.symbol = c.symbol AND k.interval = c.interval) AS candles
            FROM coverage c
            ORDER BY c.symbol, c.interval
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("list cached keys")?;

        Ok(rows
            .iter()
            .map(|row| CachedKey {
                symbol: row.get("symbol"),
                interval: row.get("interval"),
                coverage: TimeRange {
                    start_ms: row.get("start_ms"),
                    end_ms: row.get("end_ms"),
                },
                candles: row.get("candles"),
            })
            .collect())
    }
}
