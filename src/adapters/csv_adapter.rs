//! CSV file data adapter.
//!
//! Prices come from one wide file (`date,ASSET1,ASSET2,...`). Each strategy
//! has its own wide weights file in `weights_dir`, named `<strategy>.csv`,
//! with one row per rebalance date. Empty cells are missing prices or assets
//! that are not held.

use crate::domain::error::RebalsimError;
use crate::domain::series::PriceTable;
use crate::domain::weights::{Rebalance, WeightMatrix};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    prices_path: PathBuf,
    weights_dir: PathBuf,
}

/// Header and dated rows of a wide CSV file, cells left unparsed.
struct WideCsv {
    columns: Vec<String>,
    rows: Vec<(NaiveDate, Vec<String>)>,
}

impl CsvAdapter {
    pub fn new(prices_path: PathBuf, weights_dir: PathBuf) -> Self {
        Self {
            prices_path,
            weights_dir,
        }
    }

    /// Build from the `[data]` section. Relative paths resolve against `base_dir`.
    pub fn from_config(config: &dyn ConfigPort, base_dir: &Path) -> Result<Self, RebalsimError> {
        let prices = config.require_string("data", "prices")?;
        let weights_dir = config.require_string("data", "weights_dir")?;
        Ok(Self::new(base_dir.join(prices), base_dir.join(weights_dir)))
    }

    fn weights_path(&self, strategy: &str) -> PathBuf {
        self.weights_dir.join(format!("{}.csv", strategy))
    }

    fn read_wide(path: &Path) -> Result<WideCsv, RebalsimError> {
        let content = fs::read_to_string(path).map_err(|e| {
            RebalsimError::data(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| RebalsimError::data(format!("CSV parse error in {}: {}", path.display(), e)))?;
        if headers.len() < 2 {
            return Err(RebalsimError::data(format!(
                "{} needs a date column and at least one asset column",
                path.display()
            )));
        }
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| {
                RebalsimError::data(format!("CSV parse error in {}: {}", path.display(), e))
            })?;
            let date_str = record
                .get(0)
                .ok_or_else(|| RebalsimError::data("missing date column"))?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                RebalsimError::data(format!("invalid date '{}': {}", date_str, e))
            })?;
            let cells = record.iter().skip(1).map(str::to_string).collect();
            rows.push((date, cells));
        }

        rows.sort_by_key(|(date, _)| *date);
        Ok(WideCsv { columns, rows })
    }

    fn parse_cell(cell: &str, column: &str, date: NaiveDate) -> Result<Option<f64>, RebalsimError> {
        if cell.is_empty() {
            return Ok(None);
        }
        cell.parse::<f64>().map(Some).map_err(|e| {
            RebalsimError::data(format!("invalid value '{}' for {} on {}: {}", cell, column, date, e))
        })
    }

    fn read_prices(&self, end_date: Option<NaiveDate>) -> Result<PriceTable, RebalsimError> {
        let wide = Self::read_wide(&self.prices_path)?;
        let mut rows = Vec::with_capacity(wide.rows.len());
        for (date, cells) in wide.rows {
            if end_date.is_some_and(|end| date > end) {
                continue;
            }
            let prices = wide
                .columns
                .iter()
                .zip(&cells)
                .map(|(asset, cell)| {
                    Ok::<_, RebalsimError>(Self::parse_cell(cell, asset, date)?.unwrap_or(f64::NAN))
                })
                .collect::<Result<Vec<f64>, RebalsimError>>()?;
            rows.push((date, prices));
        }
        PriceTable::new(wide.columns, rows)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, end_date: NaiveDate) -> Result<PriceTable, RebalsimError> {
        self.read_prices(Some(end_date))
    }

    fn fetch_weights(&self, strategy: &str) -> Result<WeightMatrix, RebalsimError> {
        let wide = Self::read_wide(&self.weights_path(strategy))?;
        let mut rebalances = Vec::with_capacity(wide.rows.len());
        for (date, cells) in wide.rows {
            let targets = wide
                .columns
                .iter()
                .zip(&cells)
                .map(|(asset, cell)| {
                    Ok::<_, RebalsimError>((asset.clone(), Self::parse_cell(cell, asset, date)?))
                })
                .collect::<Result<BTreeMap<String, Option<f64>>, RebalsimError>>()?;
            rebalances.push(Rebalance::new(date, targets));
        }
        WeightMatrix::new(rebalances)
    }

    fn list_strategies(&self) -> Result<Vec<String>, RebalsimError> {
        let entries = fs::read_dir(&self.weights_dir).map_err(|e| {
            RebalsimError::data(format!(
                "failed to read directory {}: {}",
                self.weights_dir.display(),
                e
            ))
        })?;

        let mut strategies = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| RebalsimError::data(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(stem) = name_str.strip_suffix(".csv") {
                strategies.push(stem.to_string());
            }
        }

        strategies.sort();
        Ok(strategies)
    }

    fn get_data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RebalsimError> {
        let prices = self.read_prices(None)?;
        Ok(prices
            .first_date()
            .zip(prices.last_date())
            .map(|(first, last)| (first, last, prices.len())))
    }
}
