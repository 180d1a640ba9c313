//! INI file configuration adapter.

use crate::domain::error::RebalsimError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RebalsimError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| RebalsimError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frequency::Frequency;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[data]
prices = data/prices.csv
weights_dir = data/weights
strategies = momentum, carry

[backtest]
starting_balance = 10000
transaction_cost = 0.001
cost_of_debt = 0.05
day_count = 365
end_date = 2024-12-31
report_frequency = M

[report]
output = balances.csv
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("data", "prices"),
            Some("data/prices.csv".to_string())
        );
        assert_eq!(
            adapter.get_string("report", "output"),
            Some("balances.csv".to_string())
        );
        assert_eq!(
            adapter.get_double("backtest", "starting_balance", 0.0).unwrap(),
            10000.0
        );
        assert_eq!(
            adapter.get_double("backtest", "transaction_cost", 0.0).unwrap(),
            0.001
        );
        assert_eq!(adapter.get_int("backtest", "day_count", 360).unwrap(), 365);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nstarting_balance = 100\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_only_when_missing() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nday_count = abc\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "missing", 42).unwrap(), 42);
        assert!(matches!(
            adapter.get_int("backtest", "day_count", 360),
            Err(RebalsimError::ConfigInvalid { key, .. }) if key == "day_count"
        ));
    }

    #[test]
    fn get_double_rejects_non_numeric() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\ntransaction_cost = 10bps\ncost_of_debt = five\n",
        )
        .unwrap();
        assert!(matches!(
            adapter.get_double("backtest", "transaction_cost", 0.0),
            Err(RebalsimError::ConfigInvalid { key, .. }) if key == "transaction_cost"
        ));
        assert!(matches!(
            adapter.get_double("backtest", "cost_of_debt", 0.0),
            Err(RebalsimError::ConfigInvalid { key, .. }) if key == "cost_of_debt"
        ));
        assert_eq!(adapter.get_double("backtest", "missing", 0.5).unwrap(), 0.5);
    }

    #[test]
    fn require_helpers_read_typed_values() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.require_date("backtest", "end_date").unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
        assert_eq!(
            adapter
                .get_frequency("backtest", "report_frequency", Frequency::default())
                .unwrap(),
            Frequency::MonthEnd
        );
        assert_eq!(
            adapter
                .get_frequency("backtest", "simulation_frequency", Frequency::default())
                .unwrap(),
            Frequency::Days(1)
        );
        assert!(matches!(
            adapter.require_string("report", "missing"),
            Err(RebalsimError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "strategies"),
            Some("momentum, carry".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(RebalsimError::ConfigParse { .. })));
    }
}
