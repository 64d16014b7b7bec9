use anyhow::Context;
use futures::StreamExt;

use crate::analysis::{SymbolBeta, pattern_analysis_pure, rank_market, symbol_beta_pure};
use crate::config::{AnalysisConfig, DF, constants};
use crate::data::DataFetcher;
use crate::error::BetaError;
use crate::models::{MarketFailure, MarketReport, PatternReport, PriceSeries};

use super::messages::{MarketRequest, PatternRequest};

/// Request-scoped entry point: fetch through the cache, analyse on the
/// blocking pool, hand back plain reports.
pub struct BetaEngine {
    fetcher: DataFetcher,
    config: AnalysisConfig,
}

impl BetaEngine {
    pub fn new(fetcher: DataFetcher, config: AnalysisConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &DataFetcher {
        &self.fetcher
    }

    /// Beta of every requested symbol against the benchmark over the whole range.
    /// Symbols that fail are reported in `failures`; only a benchmark failure
    /// fails the request.
    pub async fn scan_market(&self, request: MarketRequest) -> Result<MarketReport, BetaError> {
        self.config.validate()?;
        if request.top_k == 0 {
            return Err(BetaError::InvalidConfiguration(
                "top-k must be at least 1".to_string(),
            ));
        }
        let benchmark = self.config.benchmark.to_uppercase();
        let bench = self
            .fetcher
            .fetch_series(&benchmark, request.range)
            .await?;

        let mut symbols: Vec<String> = request
            .symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        symbols.sort();
        symbols.dedup();

        let outcomes: Vec<(String, Result<SymbolBeta, BetaError>)> =
            futures::stream::iter(symbols)
                .map(|symbol| {
                    let bench = &bench;
                    let benchmark = &benchmark;
                    let request = &request;
                    async move {
                        let result = self
                            .analyse_symbol(&symbol, benchmark, bench, request)
                            .await;
                        (symbol, result)
                    }
                })
                .buffer_unordered(constants::market::SCAN_CONCURRENCY)
                .collect()
                .await;

        let mut betas = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(beta) => betas.push(beta),
                Err(e) => {
                    if DF.log_market_scan {
                        log::info!("market scan: {} failed: {}", symbol, e);
                    }
                    failures.push(MarketFailure {
                        symbol,
                        reason: e.to_string(),
                    });
                }
            }
        }
        failures.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        if !failures.is_empty() {
            log::warn!(
                "market scan: {} of {} symbol(s) failed",
                failures.len(),
                failures.len() + betas.len()
            );
        }

        Ok(MarketReport {
            benchmark,
            range: request.range,
            session: request.session,
            top_k: request.top_k,
            entries: rank_market(betas),
            failures,
        })
    }

    async fn analyse_symbol(
        &self,
        symbol: &str,
        benchmark: &str,
        bench: &PriceSeries,
        request: &MarketRequest,
    ) -> Result<SymbolBeta, BetaError> {
        let asset = if symbol == benchmark {
            bench.clone()
        } else {
            self.fetcher.fetch_series(symbol, request.range).await?
        };
        let bench = bench.clone();
        let (range, session) = (request.range, request.session);

        tokio::task::spawn_blocking(move || symbol_beta_pure(&asset, &bench, range, session))
            .await
            .context("Market beta task panicked")?
    }

    /// Recurring-window analysis of one symbol against the benchmark.
    pub async fn analyze_pattern(
        &self,
        request: PatternRequest,
    ) -> Result<PatternReport, BetaError> {
        // reject bad settings before any network traffic
        self.config.validate()?;

        let (asset, bench) = self
            .fetcher
            .fetch_aligned(&request.symbol, &self.config.benchmark, request.range)
            .await?;

        let config = self.config.clone();
        let now_ms = self.fetcher.now_ms();
        tokio::task::spawn_blocking(move || {
            pattern_analysis_pure(
                &asset,
                &bench,
                request.range,
                request.session,
                &config,
                now_ms,
            )
        })
        .await
        .context("Pattern analysis task panicked")?
    }
}
