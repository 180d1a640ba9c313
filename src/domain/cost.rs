//! Rebalancing and leverage cost models.
//!
//! Both costs are fractions of the portfolio balance. The rebalance cost is
//! charged once when new weights take effect; the leverage cost is a daily
//! drag over the whole following period.

use super::series::round_to;
use super::weights::Weights;

pub const DEFAULT_DAY_COUNT: u32 = 360;

/// Cost settings for a whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostParameters {
    /// Cost per unit of weight traded, e.g. 0.001 for 10 bps.
    pub transaction_cost_rate: f64,
    /// Annual financing rate charged on negative weights.
    pub annual_cost_of_debt: f64,
    pub day_count: u32,
}

impl Default for CostParameters {
    fn default() -> Self {
        CostParameters {
            transaction_cost_rate: 0.0,
            annual_cost_of_debt: 0.0,
            day_count: DEFAULT_DAY_COUNT,
        }
    }
}

impl CostParameters {
    pub fn rebalance_cost(&self, current: &Weights, previous: &Weights) -> f64 {
        rebalance_cost(current, previous, self.transaction_cost_rate)
    }

    pub fn leverage_cost(&self, weights: &Weights) -> f64 {
        leverage_cost(weights, self.annual_cost_of_debt, self.day_count)
    }
}

/// Turnover cost: `Σ |current - previous| * rate` over the union of assets,
/// rounded to 6 decimals. Zero whenever `rate <= 0`.
pub fn rebalance_cost(current: &Weights, previous: &Weights, rate: f64) -> f64 {
    if rate <= 0.0 {
        return 0.0;
    }
    let total: f64 = current
        .union_assets(previous)
        .into_iter()
        .map(|asset| (current.weight(asset) - previous.weight(asset)).abs() * rate)
        .sum();
    round_to(total, 6)
}

/// Daily financing drag on short exposure: `annual_rate / day_count * Σ |w<0|`.
pub fn leverage_cost(weights: &Weights, annual_rate: f64, day_count: u32) -> f64 {
    if annual_rate <= 0.0 || day_count == 0 {
        return 0.0;
    }
    let short_exposure: f64 = weights
        .iter()
        .filter(|(_, w)| *w < 0.0)
        .map(|(_, w)| w.abs())
        .sum();
    if short_exposure > 0.0 {
        annual_rate / f64::from(day_count) * short_exposure
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn weights(entries: &[(&str, f64)]) -> Weights {
        entries.iter().map(|&(a, w)| (a, w)).collect()
    }

    #[test]
    fn turnover_from_single_asset_to_split() {
        let previous = weights(&[("A", 1.0)]);
        let current = weights(&[("A", 0.5), ("B", 0.5)]);
        let cost = rebalance_cost(&current, &previous, 0.01);
        assert_abs_diff_eq!(cost, 0.01, epsilon = 1e-12);
        assert_eq!(round_to(1000.0 * (1.0 - cost), 2), 990.0);
    }

    #[test]
    fn turnover_counts_exited_assets() {
        let previous = weights(&[("A", 0.4), ("B", 0.6)]);
        let current = weights(&[("A", 1.0)]);
        // |1.0 - 0.4| + |0 - 0.6| = 1.2
        assert_abs_diff_eq!(
            rebalance_cost(&current, &previous, 0.001),
            0.0012,
            epsilon = 1e-12
        );
    }

    #[test]
    fn first_rebalance_charges_full_gross_exposure() {
        let current = weights(&[("A", 1.5), ("B", -0.5)]);
        assert_abs_diff_eq!(
            rebalance_cost(&current, &Weights::new(), 0.01),
            0.02,
            epsilon = 1e-12
        );
    }

    #[test]
    fn disabled_rate_ignores_malformed_vectors() {
        let current = weights(&[("A", f64::NAN)]);
        let previous = weights(&[("A", f64::INFINITY)]);
        assert_eq!(rebalance_cost(&current, &previous, 0.0), 0.0);
        assert_eq!(rebalance_cost(&current, &previous, -0.5), 0.0);
    }

    #[test]
    fn unchanged_weights_cost_nothing() {
        let w = weights(&[("A", 0.3), ("B", 0.7)]);
        assert_eq!(rebalance_cost(&w, &w, 0.05), 0.0);
    }

    #[test]
    fn cost_is_rounded_to_six_places() {
        let previous = weights(&[("A", 0.0)]);
        let current = weights(&[("A", 0.333_333_333)]);
        assert_eq!(rebalance_cost(&current, &previous, 0.001), 0.000333);
    }

    #[test]
    fn leverage_drag_on_short_leg() {
        let w = weights(&[("A", 1.5), ("B", -0.5)]);
        let drag = leverage_cost(&w, 0.05, 360);
        assert_abs_diff_eq!(drag, 0.05 / 360.0 * 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(drag, 0.0000694, epsilon = 1e-7);
    }

    #[test]
    fn no_leverage_drag_without_shorts_or_rate() {
        let long_only = weights(&[("A", 0.6), ("B", 0.4)]);
        assert_eq!(leverage_cost(&long_only, 0.05, 360), 0.0);

        let short = weights(&[("A", 1.5), ("B", -0.5)]);
        assert_eq!(leverage_cost(&short, 0.0, 360), 0.0);
        assert_eq!(leverage_cost(&short, 0.05, 0), 0.0);
    }

    #[test]
    fn parameters_delegate_to_free_functions() {
        let params = CostParameters {
            transaction_cost_rate: 0.01,
            annual_cost_of_debt: 0.036,
            day_count: 360,
        };
        let previous = weights(&[("A", 1.0)]);
        let current = weights(&[("A", 1.2), ("B", -0.2)]);
        assert_abs_diff_eq!(
            params.rebalance_cost(&current, &previous),
            0.004,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(params.leverage_cost(&current), 0.00002, epsilon = 1e-15);
    }

    #[test]
    fn default_day_count_is_360() {
        assert_eq!(CostParameters::default().day_count, 360);
    }
}
