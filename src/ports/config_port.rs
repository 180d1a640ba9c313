//! Configuration access port trait.

use crate::domain::error::RebalsimError;
use crate::domain::frequency::Frequency;
use chrono::NaiveDate;
use std::str::FromStr;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Integer value, `default` when the key is absent. A value that does not
    /// parse is `ConfigInvalid`, never the default.
    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, RebalsimError> {
        parse_value(self.get_string(section, key), section, key, default, "an integer")
    }

    /// Numeric value, `default` when the key is absent. A value that does not
    /// parse is `ConfigInvalid`, never the default.
    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, RebalsimError> {
        parse_value(self.get_string(section, key), section, key, default, "a number")
    }

    /// Non-empty string value, or `ConfigMissing`.
    fn require_string(&self, section: &str, key: &str) -> Result<String, RebalsimError> {
        match self.get_string(section, key) {
            Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Err(RebalsimError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            }),
        }
    }

    fn require_date(&self, section: &str, key: &str) -> Result<NaiveDate, RebalsimError> {
        let raw = self.require_string(section, key)?;
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| RebalsimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("invalid {key} format, expected YYYY-MM-DD"),
        })
    }

    /// Frequency alias, falling back to `default` when the key is absent.
    fn get_frequency(
        &self,
        section: &str,
        key: &str,
        default: Frequency,
    ) -> Result<Frequency, RebalsimError> {
        match self.get_string(section, key) {
            Some(s) if !s.trim().is_empty() => Ok(s.trim().parse()?),
            _ => Ok(default),
        }
    }
}

fn parse_value<T: FromStr>(
    raw: Option<String>,
    section: &str,
    key: &str,
    default: T,
    expected: &str,
) -> Result<T, RebalsimError> {
    match raw {
        Some(s) if !s.trim().is_empty() => {
            s.trim().parse().map_err(|_| RebalsimError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("{key} must be {expected}, got {:?}", s.trim()),
            })
        }
        _ => Ok(default),
    }
}
