//! Strategy universe for multi-strategy backtesting.
//!
//! Parses strategy lists from configuration and checks that each strategy's
//! weights can be simulated against the shared price grid.

use crate::domain::backtest::{validate_alignment, BacktestConfig};
use crate::domain::error::RebalsimError;
use crate::domain::price_grid::PriceGrid;
use crate::domain::weights::WeightMatrix;
use crate::ports::data_port::DataPort;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in strategy list")]
    EmptyToken,

    #[error("duplicate strategy: {0}")]
    DuplicateName(String),

    #[error("no strategies configured")]
    NoStrategies,

    #[error("all strategies failed validation")]
    AllStrategiesFailed,
}

pub fn parse_strategies(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let name = token.trim();
        if name.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(name.to_string()) {
            return Err(UniverseError::DuplicateName(name.to_string()));
        }
        names.push(name.to_string());
    }

    Ok(names)
}

#[derive(Debug, Clone)]
pub struct StrategyUniverse {
    pub strategies: Vec<(String, WeightMatrix)>,
}

impl StrategyUniverse {
    pub fn count(&self) -> usize {
        self.strategies.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|(name, _)| name.as_str())
    }
}

#[derive(Debug)]
pub struct UniverseValidationResult {
    pub universe: StrategyUniverse,
    pub skipped: Vec<SkippedStrategy>,
}

#[derive(Debug, Clone)]
pub struct SkippedStrategy {
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The weights could not be loaded.
    NoWeights(String),
    /// Rebalance dates or assets do not line up with the price grid.
    Misaligned(String),
}

/// Load each strategy's weights and keep those that align with `grid`.
pub fn validate_universe(
    data_port: &dyn DataPort,
    names: Vec<String>,
    grid: &PriceGrid,
    config: &BacktestConfig,
) -> Result<UniverseValidationResult, RebalsimError> {
    if names.is_empty() {
        return Err(UniverseError::NoStrategies.into());
    }

    let mut strategies = Vec::new();
    let mut skipped = Vec::new();

    for name in names {
        let weights = match data_port.fetch_weights(&name) {
            Ok(w) => w,
            Err(e) => {
                warn!(strategy = %name, error = %e, "skipping strategy");
                skipped.push(SkippedStrategy {
                    name,
                    reason: SkipReason::NoWeights(e.to_string()),
                });
                continue;
            }
        };

        if let Err(e) = validate_alignment(&weights, grid, config) {
            warn!(strategy = %name, error = %e, "skipping strategy");
            skipped.push(SkippedStrategy {
                name,
                reason: SkipReason::Misaligned(e.to_string()),
            });
            continue;
        }

        info!(strategy = %name, rebalances = weights.len(), "strategy ok");
        strategies.push((name, weights));
    }

    if strategies.is_empty() {
        return Err(UniverseError::AllStrategiesFailed.into());
    }

    if !skipped.is_empty() {
        info!(
            "backtesting {} of {} strategies",
            strategies.len(),
            strategies.len() + skipped.len()
        );
    }

    Ok(UniverseValidationResult {
        universe: StrategyUniverse { strategies },
        skipped,
    })
}
