//! Price grid construction and calendar resampling.
//!
//! Resampling keeps the last non-missing observation of every column within
//! each bin and forward-fills bins without one, so percentage changes between
//! any two grid dates are defined once an asset has its first price.

use chrono::NaiveDate;

use super::error::RebalsimError;
use super::frequency::Frequency;
use super::series::{BalanceTrajectory, PeriodReturns, PriceTable};

/// Bin `dates` by `step`, keep the last non-`NaN` value per column and bin,
/// then forward-fill. `value(row, col)` reads the source.
fn resample_last_ffill<F>(
    dates: &[NaiveDate],
    width: usize,
    value: F,
    step: Frequency,
) -> (Vec<NaiveDate>, Vec<Vec<f64>>)
where
    F: Fn(usize, usize) -> f64,
{
    let (Some(&origin), Some(&last)) = (dates.first(), dates.last()) else {
        return (Vec::new(), Vec::new());
    };

    let final_label = step.bin_label(last, origin);
    let mut labels = Vec::new();
    let mut label = step.bin_label(origin, origin);
    while label <= final_label {
        labels.push(label);
        let next = step.next_label(label);
        if next <= label {
            break;
        }
        label = next;
    }

    let mut bins = vec![vec![f64::NAN; width]; labels.len()];
    let mut bin = 0;
    for (row, &date) in dates.iter().enumerate() {
        let target = step.bin_label(date, origin);
        while bin < labels.len() && labels[bin] < target {
            bin += 1;
        }
        if bin == labels.len() {
            break;
        }
        for (col, slot) in bins[bin].iter_mut().enumerate() {
            let v = value(row, col);
            if !v.is_nan() {
                *slot = v;
            }
        }
    }

    for i in 1..bins.len() {
        for col in 0..width {
            if bins[i][col].is_nan() {
                bins[i][col] = bins[i - 1][col];
            }
        }
    }

    (labels, bins)
}

/// Resample a price table onto `step`.
pub fn resample_table(prices: &PriceTable, step: Frequency) -> PriceTable {
    let (dates, rows) = resample_last_ffill(
        prices.dates(),
        prices.assets().len(),
        |row, col| prices.row(row)[col],
        step,
    );
    PriceTable::from_parts(prices.assets().to_vec(), dates, rows)
}

/// Resample a balance trajectory onto `step`.
pub fn resample_trajectory(trajectory: &BalanceTrajectory, step: Frequency) -> BalanceTrajectory {
    let dates: Vec<NaiveDate> = trajectory.dates().collect();
    let points = trajectory.points();
    let (labels, rows) = resample_last_ffill(&dates, 1, |row, _| points[row].balance, step);
    labels
        .into_iter()
        .zip(rows)
        .map(|(date, row)| (date, row[0]))
        .collect()
}

/// A price table on a uniform calendar step with forward-filled gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceGrid {
    table: PriceTable,
    step: Frequency,
}

impl PriceGrid {
    pub fn build(prices: &PriceTable, step: Frequency) -> Self {
        Self {
            table: resample_table(prices, step),
            step,
        }
    }

    pub fn table(&self) -> &PriceTable {
        &self.table
    }

    pub fn step(&self) -> Frequency {
        self.step
    }

    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.table.first_date()?, self.table.last_date()?))
    }

    /// Simple returns of `assets` for the grid dates in `(start, end]`, each
    /// relative to the preceding grid date.
    pub fn period_returns(
        &self,
        assets: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PeriodReturns, RebalsimError> {
        let (first, last) = self
            .span()
            .ok_or_else(|| RebalsimError::alignment("price grid is empty"))?;
        if start < first || end > last {
            return Err(RebalsimError::alignment(format!(
                "period {start} to {end} outside price data {first} to {last}"
            )));
        }

        let columns = assets
            .iter()
            .map(|asset| {
                self.table.column_index(asset).ok_or_else(|| {
                    RebalsimError::alignment(format!("no price column for {asset}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dates = self.table.dates();
        let lo = dates.partition_point(|&d| d < start);
        let hi = dates.partition_point(|&d| d <= end);

        let mut out_dates = Vec::new();
        let mut out_rows = Vec::new();
        for i in (lo + 1)..hi {
            let prev_row = self.table.row(i - 1);
            let row = self.table.row(i);
            let mut returns = Vec::with_capacity(columns.len());
            for (asset, &col) in assets.iter().zip(&columns) {
                let (prev, price) = (prev_row[col], row[col]);
                if prev.is_nan() || price.is_nan() {
                    let missing = if prev.is_nan() { dates[i - 1] } else { dates[i] };
                    return Err(RebalsimError::alignment(format!(
                        "no price for {asset} on {missing}"
                    )));
                }
                returns.push(price / prev - 1.0);
            }
            out_dates.push(dates[i]);
            out_rows.push(returns);
        }

        Ok(PeriodReturns::new(assets.to_vec(), out_dates, out_rows))
    }
}

/// Resample raw prices onto the simulation step.
pub fn build_price_grid(prices: &PriceTable, step: Frequency) -> PriceGrid {
    PriceGrid::build(prices, step)
}
