//! Configuration validation.
//!
//! Validates all config fields before any data is loaded.

use crate::domain::cost::DEFAULT_DAY_COUNT;
use crate::domain::error::RebalsimError;
use crate::domain::frequency::Frequency;
use crate::domain::universe::parse_strategies;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), RebalsimError> {
    validate_starting_balance(config)?;
    validate_non_negative(config, "transaction_cost")?;
    validate_non_negative(config, "cost_of_debt")?;
    validate_day_count(config)?;
    config.require_date("backtest", "end_date")?;
    validate_frequency(config, "report_frequency")?;
    validate_frequency(config, "simulation_frequency")?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), RebalsimError> {
    config.require_string("data", "prices")?;
    config.require_string("data", "weights_dir")?;
    if let Some(list) = config.get_string("data", "strategies") {
        if !list.trim().is_empty() {
            parse_strategies(&list)?;
        }
    }
    Ok(())
}

fn validate_starting_balance(config: &dyn ConfigPort) -> Result<(), RebalsimError> {
    let value = config.get_double("backtest", "starting_balance", 0.0)?;
    if !(value.is_finite() && value > 0.0) {
        return Err(RebalsimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "starting_balance".to_string(),
            reason: "starting_balance must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_non_negative(config: &dyn ConfigPort, key: &str) -> Result<(), RebalsimError> {
    let value = config.get_double("backtest", key, 0.0)?;
    if !(value.is_finite() && value >= 0.0) {
        return Err(RebalsimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: key.to_string(),
            reason: format!("{key} must be non-negative"),
        });
    }
    Ok(())
}

fn validate_day_count(config: &dyn ConfigPort) -> Result<(), RebalsimError> {
    let value = config.get_int("backtest", "day_count", i64::from(DEFAULT_DAY_COUNT))?;
    if value <= 0 || value > i64::from(u32::MAX) {
        return Err(RebalsimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "day_count".to_string(),
            reason: "day_count must be a positive number of days".to_string(),
        });
    }
    Ok(())
}

fn validate_frequency(config: &dyn ConfigPort, key: &str) -> Result<(), RebalsimError> {
    config
        .get_frequency("backtest", key, Frequency::default())
        .map(|_| ())
        .map_err(|e| RebalsimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })
}
