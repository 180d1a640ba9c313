//! CSV report adapter: one `date,strategy,balance` row per reported point.

use crate::domain::backtest::StrategyResult;
use crate::domain::error::RebalsimError;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct BalanceRow<'a> {
    date: String,
    strategy: &'a str,
    balance: String,
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Serialize `results` into any writer, strategies in the given order.
    pub fn write_to<W: Write>(&self, results: &[StrategyResult], out: W) -> Result<(), RebalsimError> {
        let mut wtr = csv::Writer::from_writer(out);
        for strategy in results {
            for point in strategy.result.trajectory.points() {
                wtr.serialize(BalanceRow {
                    date: point.date.format("%Y-%m-%d").to_string(),
                    strategy: &strategy.name,
                    balance: format!("{:.2}", point.balance),
                })
                .map_err(|e| RebalsimError::Report {
                    reason: format!("failed to write row: {e}"),
                })?;
            }
        }
        wtr.flush()?;
        Ok(())
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_multi(&self, results: &[StrategyResult], output_path: &str) -> Result<(), RebalsimError> {
        let file = std::fs::File::create(output_path).map_err(|e| RebalsimError::Report {
            reason: format!("failed to create {output_path}: {e}"),
        })?;
        self.write_to(results, file)
    }
}
