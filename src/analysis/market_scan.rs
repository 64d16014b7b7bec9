use crate::analysis::{TradingSession, compute_returns};
use crate::config::{Beta, ChangePct, RiskLevel};
use crate::domain::TimeRange;
use crate::error::BetaError;
use crate::models::{MarketEntry, PriceSeries};
use crate::utils::population_beta;

/// Whole-range beta of one symbol before it is ranked.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolBeta {
    pub symbol: String,
    pub beta: Beta,
    pub sample_count: usize,
    pub price_change: ChangePct,
    pub last_close: f64,
    pub incomplete: bool,
}

/// Beta over every return of the requested range (after the session filter).
pub fn symbol_beta_pure(
    asset: &PriceSeries,
    bench: &PriceSeries,
    range: TimeRange,
    session: TradingSession,
) -> Result<SymbolBeta, BetaError> {
    let (asset, bench) = PriceSeries::align(asset, bench);
    let asset = asset.filtered(|ts| session.contains(ts));
    let bench = bench.filtered(|ts| session.contains(ts));

    let asset_returns = compute_returns(&asset)?;
    let bench_returns = compute_returns(&bench)?;

    let beta = population_beta(&asset_returns.returns, &bench_returns.returns).ok_or_else(
        || BetaError::DataUnavailable {
            symbol: asset.symbol().to_string(),
            range,
            reason: format!(
                "beta undefined against {} (flat or non-finite returns)",
                bench.symbol()
            ),
        },
    )?;

    // compute_returns guarantees at least two prices, so both closes exist
    let price_change = asset.price_change().unwrap_or_default();
    let last_close = asset.last_close().unwrap_or_default();

    Ok(SymbolBeta {
        symbol: asset.symbol().to_string(),
        beta: Beta::new(beta),
        sample_count: asset_returns.len(),
        price_change,
        last_close,
        incomplete: asset.incomplete || bench.incomplete,
    })
}

/// Sorts by beta (highest first, symbol breaks ties) and ranks every symbol.
/// Nothing is cut here; top/bottom views come from `MarketReport`.
pub fn rank_market(mut betas: Vec<SymbolBeta>) -> Vec<MarketEntry> {
    betas.sort_by(|a, b| {
        b.beta
            .value()
            .total_cmp(&a.beta.value())
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    betas
        .into_iter()
        .enumerate()
        .map(|(i, b)| MarketEntry {
            rank: i + 1,
            risk_level: RiskLevel::from_beta(b.beta),
            symbol: b.symbol,
            beta: b.beta,
            sample_count: b.sample_count,
            price_change: b.price_change,
            last_close: b.last_close,
            incomplete: b.incomplete,
        })
        .collect()
}
