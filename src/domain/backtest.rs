//! Backtest engine: walks the rebalance schedule and threads the balance and
//! drifted weights from one period into the next.
//!
//! BacktestConfig defines the run parameters.

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::cost::CostParameters;
use super::error::RebalsimError;
use super::frequency::Frequency;
use super::period::simulate_period;
use super::price_grid::{resample_trajectory, PriceGrid};
use super::schedule::build_schedule;
use super::series::{round_to, BalanceTrajectory, PriceTable};
use super::weights::{WeightMatrix, Weights};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub end_date: NaiveDate,
    pub starting_balance: f64,
    pub costs: CostParameters,
    /// Step of the reported trajectory.
    pub report_frequency: Frequency,
    /// Step of the price grid the simulation runs on.
    pub simulation_frequency: Frequency,
}

/// Accounting for one simulated period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rebalance_cost: f64,
    pub leverage_cost: f64,
    pub starting_balance: f64,
    pub net_starting_balance: f64,
    pub ending_balance: f64,
}

/// Where a run stopped early because the balance reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt {
    pub period: usize,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    /// Balance on the reporting frequency.
    pub trajectory: BalanceTrajectory,
    /// Balance on every simulation date, starting balance included.
    pub simulated: BalanceTrajectory,
    pub terminal_weights: Weights,
    pub periods: Vec<PeriodSummary>,
    pub halted: Option<Halt>,
}

impl BacktestResult {
    pub fn final_balance(&self) -> Option<f64> {
        self.simulated.last().map(|p| p.balance)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub name: String,
    pub result: BacktestResult,
}

/// Resample `prices` onto the simulation step and run the backtest.
pub fn run_backtest(
    weights: &WeightMatrix,
    prices: &PriceTable,
    config: &BacktestConfig,
) -> Result<BacktestResult, RebalsimError> {
    let grid = PriceGrid::build(prices, config.simulation_frequency);
    run_on_grid(weights, &grid, config)
}

/// Run several strategies over one shared price grid.
pub fn run_strategies(
    strategies: &[(String, WeightMatrix)],
    grid: &PriceGrid,
    config: &BacktestConfig,
) -> Result<Vec<StrategyResult>, RebalsimError> {
    strategies
        .iter()
        .map(|(name, weights)| {
            debug!(strategy = %name, rebalances = weights.len(), "running strategy");
            run_on_grid(weights, grid, config).map(|result| StrategyResult {
                name: name.clone(),
                result,
            })
        })
        .collect()
}

/// Check that every rebalance, the end date and every held asset fall inside
/// the grid before any period is simulated.
pub fn validate_alignment(
    weights: &WeightMatrix,
    grid: &PriceGrid,
    config: &BacktestConfig,
) -> Result<(), RebalsimError> {
    if !config.starting_balance.is_finite() {
        return Err(RebalsimError::ConfigInvalid {
            section: "backtest".into(),
            key: "starting_balance".into(),
            reason: "starting_balance must be a finite number".into(),
        });
    }

    let (first, last) = grid
        .span()
        .ok_or_else(|| RebalsimError::alignment("price grid is empty"))?;
    let start = weights
        .first_date()
        .ok_or_else(|| RebalsimError::alignment("weight matrix has no rebalance dates"))?;

    if start < first || start > last {
        return Err(RebalsimError::alignment(format!(
            "first rebalance {start} outside price data {first} to {last}"
        )));
    }
    if config.end_date < start || config.end_date > last {
        return Err(RebalsimError::alignment(format!(
            "end date {} outside {start} to {last}",
            config.end_date
        )));
    }

    let missing: Vec<String> = weights
        .held_assets()
        .into_iter()
        .filter(|asset| grid.table().column_index(asset).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(RebalsimError::alignment(format!(
            "no price column for {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Run the period loop on an existing grid.
pub fn run_on_grid(
    weights: &WeightMatrix,
    grid: &PriceGrid,
    config: &BacktestConfig,
) -> Result<BacktestResult, RebalsimError> {
    validate_alignment(weights, grid, config)?;
    let schedule = build_schedule(&weights.dates(), config.end_date)?;

    let mut balance = config.starting_balance;
    let mut previous = Weights::new();
    let mut simulated = BalanceTrajectory::new();
    let mut periods = Vec::with_capacity(schedule.len());
    let mut halted = None;

    for period in &schedule {
        let targets = weights.held_weights(period.index);
        let assets: Vec<String> = targets.assets().cloned().collect();

        let returns = match grid.period_returns(&assets, period.start, period.end) {
            Ok(r) => r,
            Err(e) => return Err(abort(period.index, period.start, &simulated, weights, config, e)),
        };
        if returns.is_empty() {
            debug!(index = period.index, start = %period.start, "no grid dates in period, skipping");
            continue;
        }

        let rebalance_cost = config.costs.rebalance_cost(&targets, &previous);
        let leverage_cost = config.costs.leverage_cost(&targets);
        let net_starting_balance = round_to(balance * (1.0 - rebalance_cost), 2);
        debug!(
            index = period.index,
            start = %period.start,
            end = %period.end,
            rebalance_cost,
            leverage_cost,
            net_starting_balance,
            "simulating period"
        );

        let outcome = match simulate_period(&targets, net_starting_balance, &returns, leverage_cost) {
            Ok(outcome) => outcome,
            Err(RebalsimError::ZeroBalance { date, path }) => {
                warn!(index = period.index, %date, "balance reached zero, stopping run");
                simulated.extend_from(&path);
                periods.push(PeriodSummary {
                    index: period.index,
                    start: period.start,
                    end: period.end,
                    rebalance_cost,
                    leverage_cost,
                    starting_balance: balance,
                    net_starting_balance,
                    ending_balance: 0.0,
                });
                balance = 0.0;
                previous.carry_forward(&Weights::new());
                halted = Some(Halt {
                    period: period.index,
                    date,
                });
                break;
            }
            Err(e) => return Err(abort(period.index, period.start, &simulated, weights, config, e)),
        };

        simulated.extend_from(&outcome.path);
        let ending_balance = outcome.path.last().map_or(net_starting_balance, |p| p.balance);
        periods.push(PeriodSummary {
            index: period.index,
            start: period.start,
            end: period.end,
            rebalance_cost,
            leverage_cost,
            starting_balance: balance,
            net_starting_balance,
            ending_balance,
        });
        balance = ending_balance;
        previous.carry_forward(&outcome.terminal_weights);
    }

    let simulated = with_starting_balance(&simulated, weights, config);
    let trajectory = resample_trajectory(&simulated, config.report_frequency);
    debug!(final_balance = balance, points = trajectory.len(), "backtest complete");

    Ok(BacktestResult {
        trajectory,
        simulated,
        terminal_weights: previous,
        periods,
        halted,
    })
}

fn with_starting_balance(
    simulated: &BalanceTrajectory,
    weights: &WeightMatrix,
    config: &BacktestConfig,
) -> BalanceTrajectory {
    let mut full = simulated.clone();
    if let Some(start) = weights.first_date() {
        full.insert(start, config.starting_balance);
    }
    full
}

fn abort(
    period: usize,
    date: NaiveDate,
    simulated: &BalanceTrajectory,
    weights: &WeightMatrix,
    config: &BacktestConfig,
    source: RebalsimError,
) -> RebalsimError {
    RebalsimError::PeriodAborted {
        period,
        date,
        trajectory: with_starting_balance(simulated, weights, config),
        source: Box::new(source),
    }
}
