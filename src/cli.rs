//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_strategies, BacktestConfig, StrategyResult};
use crate::domain::config_validation::{validate_backtest_config, validate_data_config};
use crate::domain::cost::{CostParameters, DEFAULT_DAY_COUNT};
use crate::domain::error::RebalsimError;
use crate::domain::frequency::Frequency;
use crate::domain::metrics::Metrics;
use crate::domain::price_grid::PriceGrid;
use crate::domain::universe::{parse_strategies, validate_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "rebalsim", about = "Portfolio rebalancing backtester")]
pub struct Cli {
    /// Log every simulated period
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Run a single strategy instead of the configured list
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Check configuration and data alignment without simulating
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show price data range and available strategies
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);
    match cli.command {
        Command::Backtest {
            config,
            output,
            strategy,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, strategy.as_deref())
            } else {
                run_backtest(&config, output.as_ref(), strategy.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
    }
}

/// Install the stderr subscriber. `RUST_LOG` applies unless `verbose` is set.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn fail(err: &RebalsimError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RebalsimError> {
    info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn config_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Load and validate config, then open the CSV data it points at.
fn open_data(config_path: &Path) -> Result<(FileConfigAdapter, CsvAdapter), RebalsimError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    let data = CsvAdapter::from_config(&config, config_dir(config_path))?;
    Ok((config, data))
}

fn run_backtest(
    config_path: &Path,
    output_path: Option<&PathBuf>,
    strategy_override: Option<&str>,
) -> ExitCode {
    let (config, data) = match open_data(config_path) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_backtest_config(&config) {
        return fail(&e);
    }
    let bt_config = match build_backtest_config(&config) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let names = match resolve_strategies(strategy_override, &config, &data) {
        Ok(n) => n,
        Err(e) => return fail(&e),
    };

    let results = match run_backtest_pipeline(&data, names, &bt_config) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    print_summary(&results);

    let output = match output_path {
        Some(p) => Some(p.display().to_string()),
        None => config
            .get_string("report", "output")
            .map(|p| config_dir(config_path).join(p.trim()).display().to_string()),
    };
    let reporter = CsvReportAdapter::new();
    let written = match &output {
        Some(path) => reporter.write_multi(&results, path),
        None => reporter.write_to(&results, std::io::stdout().lock()),
    };
    if let Err(e) = written {
        return fail(&e);
    }
    if let Some(path) = output {
        eprintln!("\nReport written to: {path}");
    }
    ExitCode::SUCCESS
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, RebalsimError> {
    let end_date = adapter.require_date("backtest", "end_date")?;
    let day_count = adapter.get_int("backtest", "day_count", i64::from(DEFAULT_DAY_COUNT))?;
    let day_count = u32::try_from(day_count)
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| RebalsimError::ConfigInvalid {
            section: "backtest".into(),
            key: "day_count".into(),
            reason: "day_count must be a positive number of days".into(),
        })?;

    Ok(BacktestConfig {
        end_date,
        starting_balance: adapter.get_double("backtest", "starting_balance", 0.0)?,
        costs: CostParameters {
            transaction_cost_rate: adapter.get_double("backtest", "transaction_cost", 0.0)?,
            annual_cost_of_debt: adapter.get_double("backtest", "cost_of_debt", 0.0)?,
            day_count,
        },
        report_frequency: adapter.get_frequency(
            "backtest",
            "report_frequency",
            Frequency::default(),
        )?,
        simulation_frequency: adapter.get_frequency(
            "backtest",
            "simulation_frequency",
            Frequency::default(),
        )?,
    })
}

/// Strategy names from the override, the `[data] strategies` list, or every
/// weights file the data port knows about, in that order.
pub fn resolve_strategies(
    strategy_override: Option<&str>,
    config: &dyn ConfigPort,
    data: &dyn DataPort,
) -> Result<Vec<String>, RebalsimError> {
    if let Some(name) = strategy_override {
        return Ok(parse_strategies(name)?);
    }
    match config.get_string("data", "strategies") {
        Some(list) if !list.trim().is_empty() => Ok(parse_strategies(&list)?),
        _ => data.list_strategies(),
    }
}

/// Load prices, build the shared grid, drop strategies that cannot run and
/// simulate the rest.
pub fn run_backtest_pipeline(
    data: &dyn DataPort,
    names: Vec<String>,
    config: &BacktestConfig,
) -> Result<Vec<StrategyResult>, RebalsimError> {
    let prices = data.fetch_prices(config.end_date)?;
    info!(
        assets = prices.assets().len(),
        rows = prices.len(),
        "loaded prices"
    );
    let grid = PriceGrid::build(&prices, config.simulation_frequency);
    info!(step = %grid.step(), dates = grid.table().len(), "built price grid");

    let validated = validate_universe(data, names, &grid, config)?;
    info!(
        strategies = validated.universe.count(),
        "running backtest to {}", config.end_date
    );
    run_strategies(&validated.universe.strategies, &grid, config)
}

fn print_summary(results: &[StrategyResult]) {
    for strategy in results {
        let metrics = Metrics::compute(&strategy.result.simulated);
        eprintln!("\n=== {} ===", strategy.name);
        eprintln!("Periods:          {}", strategy.result.periods.len());
        eprintln!("Final Balance:    {:.2}", metrics.final_balance);
        eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
        eprintln!(
            "Annual Return:    {:.2}%",
            metrics.annualized_return * 100.0
        );
        eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
        eprintln!("Best Step:        {:.2}%", metrics.best_return * 100.0);
        eprintln!("Worst Step:       {:.2}%", metrics.worst_return * 100.0);
        if let Some(halt) = strategy.result.halted {
            eprintln!(
                "Halted:           balance reached zero on {} (period {})",
                halt.date, halt.period
            );
        }
    }
}

pub fn run_dry_run(config_path: &Path, strategy_override: Option<&str>) -> ExitCode {
    let (config, data) = match open_data(config_path) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_backtest_config(&config) {
        return fail(&e);
    }
    let bt_config = match build_backtest_config(&config) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    eprintln!("Config validated successfully");

    eprintln!("\nBacktest:");
    eprintln!("  starting balance:     {:.2}", bt_config.starting_balance);
    eprintln!("  end date:             {}", bt_config.end_date);
    eprintln!("  transaction cost:     {}", bt_config.costs.transaction_cost_rate);
    eprintln!("  cost of debt:         {}", bt_config.costs.annual_cost_of_debt);
    eprintln!("  day count:            {}", bt_config.costs.day_count);
    eprintln!("  simulation frequency: {}", bt_config.simulation_frequency);
    eprintln!("  report frequency:     {}", bt_config.report_frequency);

    match resolve_strategies(strategy_override, &config, &data) {
        Ok(names) => eprintln!("\nStrategies: {}", names.join(", ")),
        Err(e) => return fail(&e),
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let (config, data) = match open_data(config_path) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_backtest_config(&config) {
        return fail(&e);
    }
    let bt_config = match build_backtest_config(&config) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let names = match resolve_strategies(None, &config, &data) {
        Ok(n) => n,
        Err(e) => return fail(&e),
    };

    let prices = match data.fetch_prices(bt_config.end_date) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let grid = PriceGrid::build(&prices, bt_config.simulation_frequency);
    let validated = match validate_universe(&data, names, &grid, &bt_config) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };

    for name in validated.universe.names() {
        eprintln!("  {name}: OK");
    }
    for skipped in &validated.skipped {
        eprintln!("  {}: skipped ({:?})", skipped.name, skipped.reason);
    }
    eprintln!(
        "\n{} of {} strategies ready to run.",
        validated.universe.count(),
        validated.universe.count() + validated.skipped.len()
    );
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path) -> ExitCode {
    let (_config, data) = match open_data(config_path) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };

    match data.get_data_range() {
        Ok(Some((first, last, count))) => println!("prices: {count} rows, {first} to {last}"),
        Ok(None) => eprintln!("prices: no data found"),
        Err(e) => return fail(&e),
    }

    match data.list_strategies() {
        Ok(strategies) if strategies.is_empty() => eprintln!("No strategies found"),
        Ok(strategies) => {
            for name in &strategies {
                match data.fetch_weights(name) {
                    Ok(w) => match (w.first_date(), w.last_date()) {
                        (Some(first), Some(last)) => println!(
                            "{name}: {} rebalances, {first} to {last}",
                            w.len()
                        ),
                        _ => println!("{name}: no rebalances"),
                    },
                    Err(e) => eprintln!("error reading {name}: {e}"),
                }
            }
            eprintln!("{} strategies found", strategies.len());
        }
        Err(e) => return fail(&e),
    }
    ExitCode::SUCCESS
}
