//! Report generation port trait.

use crate::domain::backtest::{BacktestResult, StrategyResult};
use crate::domain::error::RebalsimError;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write_multi(&self, results: &[StrategyResult], output_path: &str) -> Result<(), RebalsimError>;

    /// Default implementation: a single result reported under `strategy`.
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &str,
        output_path: &str,
    ) -> Result<(), RebalsimError> {
        self.write_multi(
            &[StrategyResult {
                name: strategy.to_string(),
                result: result.clone(),
            }],
            output_path,
        )
    }
}
