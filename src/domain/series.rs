//! Date-indexed series: the raw price table, per-period returns and the
//! balance trajectory.
//!
//! Every series here keeps its dates strictly increasing. Constructors that
//! accept caller data validate the ordering; internal builders produce it by
//! construction.

use chrono::NaiveDate;
use std::collections::HashSet;

use super::error::RebalsimError;

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Prices per date, one column per asset. Missing observations are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    assets: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl PriceTable {
    /// Build a table, rejecting duplicate assets, ragged rows and dates that
    /// are not strictly increasing.
    pub fn new(
        assets: Vec<String>,
        rows: Vec<(NaiveDate, Vec<f64>)>,
    ) -> Result<Self, RebalsimError> {
        let mut seen = HashSet::new();
        for asset in &assets {
            if !seen.insert(asset.as_str()) {
                return Err(RebalsimError::alignment(format!(
                    "duplicate price column {asset}"
                )));
            }
        }

        let mut dates = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (date, row) in rows {
            if row.len() != assets.len() {
                return Err(RebalsimError::alignment(format!(
                    "price row {date} has {} values for {} assets",
                    row.len(),
                    assets.len()
                )));
            }
            if let Some(&prev) = dates.last() {
                if date <= prev {
                    return Err(RebalsimError::alignment(format!(
                        "price dates not strictly increasing: {date} after {prev}"
                    )));
                }
            }
            dates.push(date);
            values.push(row);
        }

        Ok(Self {
            assets,
            dates,
            rows: values,
        })
    }

    /// Assemble a table whose dates are already known to be strictly increasing.
    pub(crate) fn from_parts(assets: Vec<String>, dates: Vec<NaiveDate>, rows: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(dates.len(), rows.len());
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        Self {
            assets,
            dates,
            rows,
        }
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn column_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Price of `asset` on `date`, if both exist. May be `NaN`.
    pub fn price(&self, asset: &str, date: NaiveDate) -> Option<f64> {
        let col = self.column_index(asset)?;
        let row = self.dates.binary_search(&date).ok()?;
        Some(self.rows[row][col])
    }
}

/// Simple returns of a set of assets over one rebalance period. The rebalance
/// date itself is never a row: its price is the base of the first return.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeriodReturns {
    pub assets: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<Vec<f64>>,
}

impl PeriodReturns {
    pub fn new(assets: Vec<String>, dates: Vec<NaiveDate>, rows: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(dates.len(), rows.len());
        Self {
            assets,
            dates,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: f64,
}

/// Portfolio balance per date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BalanceTrajectory {
    points: Vec<BalancePoint>,
}

impl BalanceTrajectory {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Insert or overwrite the balance on `date`, keeping dates ordered.
    pub fn insert(&mut self, date: NaiveDate, balance: f64) {
        match self.points.last() {
            Some(last) if last.date < date => self.points.push(BalancePoint { date, balance }),
            None => self.points.push(BalancePoint { date, balance }),
            Some(_) => match self.points.binary_search_by_key(&date, |p| p.date) {
                Ok(i) => self.points[i].balance = balance,
                Err(i) => self.points.insert(i, BalancePoint { date, balance }),
            },
        }
    }

    /// Merge every point of `other` into this trajectory.
    pub fn extend_from(&mut self, other: &BalanceTrajectory) {
        for point in &other.points {
            self.insert(point.date, point.balance);
        }
    }

    pub fn points(&self) -> &[BalancePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&BalancePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&BalancePoint> {
        self.points.last()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].balance)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn balances(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.balance)
    }
}

impl FromIterator<(NaiveDate, f64)> for BalanceTrajectory {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        let mut trajectory = BalanceTrajectory::new();
        for (date, balance) in iter {
            trajectory.insert(date, balance);
        }
        trajectory
    }
}
