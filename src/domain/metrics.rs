//! Performance summary of a balance trajectory.

use super::series::{BalancePoint, BalanceTrajectory};

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub starting_balance: f64,
    pub final_balance: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    /// Longest run of observations spent below a previous peak.
    pub max_drawdown_duration: usize,
    pub best_return: f64,
    pub worst_return: f64,
    pub observations: usize,
}

impl Metrics {
    pub fn compute(trajectory: &BalanceTrajectory) -> Self {
        let points = trajectory.points();
        let starting_balance = points.first().map_or(0.0, |p| p.balance);
        let final_balance = points.last().map_or(starting_balance, |p| p.balance);

        let total_return = if starting_balance > 0.0 {
            (final_balance - starting_balance) / starting_balance
        } else {
            0.0
        };

        let days = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (last.date - first.date).num_days() as f64,
            _ => 0.0,
        };
        let years = days / DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 && total_return.is_finite() {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(points);
        let (best_return, worst_return) = compute_extremes(points);

        Metrics {
            starting_balance,
            final_balance,
            total_return,
            annualized_return,
            max_drawdown,
            max_drawdown_duration,
            best_return,
            worst_return,
            observations: points.len(),
        }
    }
}

fn compute_drawdown(points: &[BalancePoint]) -> (f64, usize) {
    let Some(first) = points.first() else {
        return (0.0, 0);
    };

    let mut peak = first.balance;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut duration = 0usize;

    for point in points {
        if point.balance >= peak {
            peak = point.balance;
            duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.balance) / peak);
            duration += 1;
            max_duration = max_duration.max(duration);
        }
    }

    (max_dd, max_duration)
}

fn compute_extremes(points: &[BalancePoint]) -> (f64, f64) {
    let returns: Vec<f64> = points
        .windows(2)
        .filter(|w| w[0].balance > 0.0)
        .map(|w| w[1].balance / w[0].balance - 1.0)
        .collect();
    if returns.is_empty() {
        return (0.0, 0.0);
    }
    let best = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst = returns.iter().copied().fold(f64::INFINITY, f64::min);
    (best, worst)
}
