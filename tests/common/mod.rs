#![allow(dead_code)]

use chrono::NaiveDate;
use rebalsim::domain::backtest::BacktestConfig;
use rebalsim::domain::cost::CostParameters;
use rebalsim::domain::error::RebalsimError;
use rebalsim::domain::frequency::Frequency;
use rebalsim::domain::series::PriceTable;
use rebalsim::domain::weights::{Rebalance, WeightMatrix};
use rebalsim::ports::data_port::DataPort;
use std::collections::{BTreeMap, HashMap};

pub struct MockDataPort {
    pub prices: PriceTable,
    pub weights: BTreeMap<String, WeightMatrix>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new(prices: PriceTable) -> Self {
        Self {
            prices,
            weights: BTreeMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_weights(mut self, strategy: &str, weights: WeightMatrix) -> Self {
        self.weights.insert(strategy.to_string(), weights);
        self
    }

    pub fn with_error(mut self, strategy: &str, reason: &str) -> Self {
        self.errors.insert(strategy.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, end_date: NaiveDate) -> Result<PriceTable, RebalsimError> {
        let rows = self
            .prices
            .dates()
            .iter()
            .enumerate()
            .filter(|(_, d)| **d <= end_date)
            .map(|(i, d)| (*d, self.prices.row(i).to_vec()))
            .collect();
        PriceTable::new(self.prices.assets().to_vec(), rows)
    }

    fn fetch_weights(&self, strategy: &str) -> Result<WeightMatrix, RebalsimError> {
        if let Some(reason) = self.errors.get(strategy) {
            return Err(RebalsimError::data(reason.clone()));
        }
        self.weights
            .get(strategy)
            .cloned()
            .ok_or_else(|| RebalsimError::data(format!("no weights for {strategy}")))
    }

    fn list_strategies(&self) -> Result<Vec<String>, RebalsimError> {
        Ok(self.weights.keys().cloned().collect())
    }

    fn get_data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RebalsimError> {
        Ok(self
            .prices
            .first_date()
            .zip(self.prices.last_date())
            .map(|(a, b)| (a, b, self.prices.len())))
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Price table from `(date, prices)` rows over `assets`.
pub fn make_prices<const N: usize>(assets: &[&str; N], rows: &[(&str, [f64; N])]) -> PriceTable {
    PriceTable::new(
        assets.iter().map(|a| a.to_string()).collect(),
        rows.iter().map(|(d, p)| (date(d), p.to_vec())).collect(),
    )
    .unwrap()
}

/// Daily prices from `start`, one geometric drift per asset.
pub fn drifting_prices(start: &str, days: usize, drifts: &[(&str, f64)]) -> PriceTable {
    let start = date(start);
    let rows = (0..days)
        .map(|i| {
            let d = start + chrono::Days::new(i as u64);
            let row = drifts
                .iter()
                .map(|(_, g)| 100.0 * (1.0 + g).powi(i as i32))
                .collect();
            (d, row)
        })
        .collect();
    PriceTable::new(drifts.iter().map(|(a, _)| a.to_string()).collect(), rows).unwrap()
}

pub fn make_rebalance(d: &str, targets: &[(&str, Option<f64>)]) -> Rebalance {
    Rebalance::new(
        date(d),
        targets.iter().map(|(a, w)| (a.to_string(), *w)).collect(),
    )
}

pub fn make_weights(rebalances: Vec<Rebalance>) -> WeightMatrix {
    WeightMatrix::new(rebalances).unwrap()
}

pub fn make_config(end: &str, starting_balance: f64) -> BacktestConfig {
    BacktestConfig {
        end_date: date(end),
        starting_balance,
        costs: CostParameters::default(),
        report_frequency: Frequency::Days(1),
        simulation_frequency: Frequency::Days(1),
    }
}
