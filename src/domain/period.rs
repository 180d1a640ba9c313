//! Balance simulation over a single rebalance period.
//!
//! Each position compounds through the period's log returns from its initial
//! dollar allocation. Positions are rounded to cents on every date, the
//! balance path is their sum, and the drifted end-of-period weights feed the
//! next period's turnover.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use super::error::RebalsimError;
use super::series::{round_to, BalanceTrajectory, PeriodReturns};
use super::weights::Weights;

const ACCOUNTING_DECIMALS: i32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodOutcome {
    pub path: BalanceTrajectory,
    /// Dollar value of each position on the last date of the period.
    pub terminal_values: BTreeMap<String, f64>,
    pub terminal_weights: Weights,
}

/// Simulate one period starting from `balance` (already net of rebalance
/// cost). `leverage_daily_cost` is subtracted from every day-over-day change
/// of the balance path. A balance of exactly zero ends the period on that
/// date with `ZeroBalance`.
pub fn simulate_period(
    weights: &Weights,
    balance: f64,
    returns: &PeriodReturns,
    leverage_daily_cost: f64,
) -> Result<PeriodOutcome, RebalsimError> {
    if returns.is_empty() {
        return Ok(PeriodOutcome {
            path: BalanceTrajectory::new(),
            terminal_values: weights.iter().map(|(a, w)| (a.clone(), w * balance)).collect(),
            terminal_weights: weights.clone(),
        });
    }

    if !weights.has_defined() {
        debug!(balance, days = returns.len(), "no weights defined, holding balance flat");
        return Ok(PeriodOutcome {
            path: returns.dates.iter().map(|&date| (date, balance)).collect(),
            terminal_values: weights.assets().map(|a| (a.clone(), 0.0)).collect(),
            terminal_weights: weights.assets().map(|a| (a.clone(), 0.0)).collect(),
        });
    }

    let positions = weights
        .iter()
        .filter(|(_, w)| w.is_finite())
        .map(|(asset, w)| {
            let col = returns.column_index(asset).ok_or_else(|| {
                RebalsimError::alignment(format!("no returns for held asset {asset}"))
            })?;
            Ok::<_, RebalsimError>((asset, col, w * balance))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut log_growth = vec![0.0_f64; positions.len()];
    let mut navs = vec![0.0_f64; positions.len()];
    let mut path = BalanceTrajectory::new();

    for (row, &date) in returns.rows.iter().zip(&returns.dates) {
        let mut total = 0.0;
        for (k, &(asset, col, allocation)) in positions.iter().enumerate() {
            let r = row[col];
            log_growth[k] += log_return(asset, date, r)?;
            navs[k] = round_to(allocation * log_growth[k].exp(), ACCOUNTING_DECIMALS);
            total += navs[k];
        }
        let total = round_to(total, ACCOUNTING_DECIMALS);
        path.insert(date, total);
        if total == 0.0 {
            break;
        }
    }

    let raw_final = path.last().map_or(0.0, |p| p.balance);
    let path = if leverage_daily_cost > 0.0 {
        apply_leverage_drag(&path, balance, leverage_daily_cost)
    } else {
        path
    };

    let Some(last) = path.last().copied() else {
        return Err(RebalsimError::alignment("period produced no balance"));
    };
    if last.balance == 0.0 || raw_final == 0.0 {
        return Err(RebalsimError::ZeroBalance {
            date: last.date,
            path,
        });
    }

    let scale = last.balance / raw_final;
    let terminal_values: BTreeMap<String, f64> = positions
        .iter()
        .zip(&navs)
        .map(|(&(asset, _, _), &nav)| (asset.clone(), nav * scale))
        .collect();
    let terminal_weights = terminal_values
        .iter()
        .map(|(asset, value)| (asset.clone(), value / last.balance))
        .collect();

    Ok(PeriodOutcome {
        path,
        terminal_values,
        terminal_weights,
    })
}

fn log_return(asset: &str, date: NaiveDate, r: f64) -> Result<f64, RebalsimError> {
    let growth = 1.0 + r;
    if !growth.is_finite() || growth <= 0.0 {
        return Err(RebalsimError::NumericDomain {
            asset: asset.to_string(),
            date,
            value: r,
        });
    }
    Ok(growth.ln())
}

/// Re-compound `path` from `start` with `daily_cost` taken off every
/// day-over-day change. The drag is charged on the absolute balance, so a
/// negative balance keeps falling; a zero balance stays zero.
fn apply_leverage_drag(path: &BalanceTrajectory, start: f64, daily_cost: f64) -> BalanceTrajectory {
    let mut previous = start;
    let mut current = start;
    let mut dragged = BalanceTrajectory::new();
    for point in path.points() {
        if point.balance == 0.0 || previous == 0.0 {
            dragged.insert(point.date, 0.0);
            break;
        }
        current = current * (point.balance / previous) - current.abs() * daily_cost;
        previous = point.balance;
        dragged.insert(point.date, round_to(current, ACCOUNTING_DECIMALS));
    }
    dragged
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn weights(entries: &[(&str, f64)]) -> Weights {
        entries.iter().map(|&(a, w)| (a, w)).collect()
    }

    fn returns(assets: &[&str], rows: Vec<Vec<f64>>) -> PeriodReturns {
        let dates = (0..rows.len()).map(|i| d(2 + i as u32)).collect();
        PeriodReturns::new(assets.iter().map(|a| a.to_string()).collect(), dates, rows)
    }

    #[test]
    fn single_asset_tracks_price_ratio() {
        // Prices 100 -> 110 -> 99 -> 105
        let r = returns(&["A"], vec![vec![0.10], vec![-0.10], vec![105.0 / 99.0 - 1.0]]);
        let out = simulate_period(&weights(&[("A", 1.0)]), 1000.0, &r, 0.0).unwrap();

        let balances: Vec<f64> = out.path.balances().collect();
        assert_abs_diff_eq!(balances[0], 1100.0, epsilon = 0.01);
        assert_abs_diff_eq!(balances[1], 990.0, epsilon = 0.01);
        assert_abs_diff_eq!(balances[2], 1050.0, epsilon = 0.01);
        assert_abs_diff_eq!(out.terminal_weights.weight("A"), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn weights_drift_with_prices() {
        let r = returns(&["A", "B"], vec![vec![1.0, 0.0]]);
        let out = simulate_period(&weights(&[("A", 0.5), ("B", 0.5)]), 1000.0, &r, 0.0).unwrap();

        assert_eq!(out.path.last().unwrap().balance, 1500.0);
        assert_abs_diff_eq!(out.terminal_weights.weight("A"), 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.terminal_weights.weight("B"), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn terminal_values_sum_to_final_balance() {
        let r = returns(
            &["A", "B", "C"],
            vec![vec![0.013, -0.021, 0.004], vec![0.007, 0.011, -0.033]],
        );
        let out = simulate_period(
            &weights(&[("A", 0.2), ("B", 0.5), ("C", 0.3)]),
            12_345.67,
            &r,
            0.0,
        )
        .unwrap();
        let sum: f64 = out.terminal_values.values().sum();
        assert_abs_diff_eq!(sum, out.path.last().unwrap().balance, epsilon = 0.01);
        assert_abs_diff_eq!(out.terminal_weights.sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn undefined_weights_hold_balance_flat() {
        let r = returns(&[], vec![vec![], vec![], vec![]]);
        let w = weights(&[("A", f64::NAN), ("B", f64::NAN)]);
        let out = simulate_period(&w, 750.25, &r, 0.0).unwrap();

        assert_eq!(out.path.len(), 3);
        assert!(out.path.balances().all(|b| b == 750.25));
        assert_eq!(out.terminal_weights.weight("A"), 0.0);
        assert_eq!(out.terminal_weights.weight("B"), 0.0);
        assert_eq!(out.terminal_weights.len(), 2);
    }

    #[test]
    fn empty_weights_hold_balance_flat() {
        let r = returns(&[], vec![vec![], vec![]]);
        let out = simulate_period(&Weights::new(), 500.0, &r, 0.0001).unwrap();
        assert_eq!(out.path.balances().collect::<Vec<_>>(), vec![500.0, 500.0]);
        assert!(out.terminal_weights.is_empty());
    }

    #[test]
    fn empty_period_leaves_weights_unchanged() {
        let w = weights(&[("A", 0.6), ("B", 0.4)]);
        let out = simulate_period(&w, 1000.0, &PeriodReturns::default(), 0.0).unwrap();
        assert!(out.path.is_empty());
        assert_eq!(out.terminal_weights, w);
    }

    #[test]
    fn leverage_drag_compounds_daily() {
        let drag = 0.05 / 360.0 * 0.5;
        let r = returns(&["A", "B"], vec![vec![0.0, 0.0]; 3]);
        let w = weights(&[("A", 1.5), ("B", -0.5)]);
        let out = simulate_period(&w, 10_000.0, &r, drag).unwrap();

        let balances: Vec<f64> = out.path.balances().collect();
        for (i, b) in balances.iter().enumerate() {
            let expected = 10_000.0 * (1.0 - drag).powi(i as i32 + 1);
            assert_abs_diff_eq!(*b, expected, epsilon = 0.01);
        }
        assert_abs_diff_eq!(out.terminal_weights.weight("A"), 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(out.terminal_weights.weight("B"), -0.5, epsilon = 1e-9);
        let sum: f64 = out.terminal_values.values().sum();
        assert_abs_diff_eq!(sum, *balances.last().unwrap(), epsilon = 0.01);
    }

    #[test]
    fn total_loss_is_a_numeric_domain_error() {
        let r = returns(&["A", "B"], vec![vec![0.01, 0.0], vec![-1.0, 0.0]]);
        let err = simulate_period(&weights(&[("A", 0.5), ("B", 0.5)]), 100.0, &r, 0.0).unwrap_err();
        match err {
            RebalsimError::NumericDomain { asset, date, value } => {
                assert_eq!(asset, "A");
                assert_eq!(date, d(3));
                assert_eq!(value, -1.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_return_is_rejected() {
        let r = returns(&["A"], vec![vec![f64::INFINITY]]);
        assert!(matches!(
            simulate_period(&weights(&[("A", 1.0)]), 100.0, &r, 0.0),
            Err(RebalsimError::NumericDomain { .. })
        ));
    }

    #[test]
    fn zero_terminal_balance_is_reported_with_path() {
        // Offsetting long and short legs that end flat.
        let r = returns(&["A", "B"], vec![vec![0.0, 0.0]]);
        let w = weights(&[("A", 1.0), ("B", -1.0)]);
        match simulate_period(&w, 100.0, &r, 0.0).unwrap_err() {
            RebalsimError::ZeroBalance { date, path } => {
                assert_eq!(date, d(2));
                assert_eq!(path.len(), 1);
                assert_eq!(path.last().unwrap().balance, 0.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_balance_under_leverage_drag_halts() {
        let r = returns(&["A", "B"], vec![vec![0.0, 0.0]; 3]);
        let w = weights(&[("A", 1.0), ("B", -1.0)]);
        match simulate_period(&w, 100.0, &r, 0.05 / 360.0).unwrap_err() {
            RebalsimError::ZeroBalance { date, path } => {
                assert_eq!(date, d(2));
                assert_eq!(path.balances().collect::<Vec<_>>(), vec![0.0]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_mid_period_stops_the_path() {
        // B's short leg wipes out the book on day 2, later returns are ignored.
        let r = returns(&["A", "B"], vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.0]]);
        let w = weights(&[("A", 1.0), ("B", -0.5)]);
        match simulate_period(&w, 100.0, &r, 0.0).unwrap_err() {
            RebalsimError::ZeroBalance { date, path } => {
                assert_eq!(date, d(3));
                assert_eq!(path.balances().collect::<Vec<_>>(), vec![50.0, 0.0]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn leverage_drag_follows_a_negative_balance() {
        // B up 250% turns the book negative: 100 - 50 * 3.5 = -75.
        let r = returns(&["A", "B"], vec![vec![0.0, 2.5], vec![0.0, 0.5]]);
        let w = weights(&[("A", 1.0), ("B", -0.5)]);
        let plain = simulate_period(&w, 100.0, &r, 0.0).unwrap();
        assert_eq!(plain.path.balances().collect::<Vec<_>>(), vec![-75.0, -162.5]);

        let drag = 0.05 / 360.0;
        let dragged = simulate_period(&w, 100.0, &r, drag).unwrap();
        let balances: Vec<f64> = dragged.path.balances().collect();
        let first = -75.0 - 100.0 * drag;
        let second = first * (162.5 / 75.0) - first.abs() * drag;
        assert_abs_diff_eq!(balances[0], first, epsilon = 0.01);
        assert_abs_diff_eq!(balances[1], second, epsilon = 0.01);
        assert!(balances[1] < -162.5);
    }

    #[test]
    fn held_asset_without_returns_column_is_misaligned() {
        let r = returns(&["A"], vec![vec![0.0]]);
        assert!(matches!(
            simulate_period(&weights(&[("A", 0.5), ("B", 0.5)]), 100.0, &r, 0.0),
            Err(RebalsimError::DataAlignment { .. })
        ));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let r = returns(&["A"], vec![vec![0.02], vec![0.03]]);
        let w = weights(&[("A", 1.0)]);
        let (r_before, w_before) = (r.clone(), w.clone());
        simulate_period(&w, 100.0, &r, 0.001).unwrap();
        assert_eq!(r, r_before);
        assert_eq!(w, w_before);
    }
}
