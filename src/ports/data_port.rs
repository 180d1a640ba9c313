//! Data access port trait.

use crate::domain::error::RebalsimError;
use crate::domain::series::PriceTable;
use crate::domain::weights::WeightMatrix;
use chrono::NaiveDate;

pub trait DataPort {
    /// Every price row dated on or before `end_date`.
    fn fetch_prices(&self, end_date: NaiveDate) -> Result<PriceTable, RebalsimError>;

    fn fetch_weights(&self, strategy: &str) -> Result<WeightMatrix, RebalsimError>;

    fn list_strategies(&self) -> Result<Vec<String>, RebalsimError>;

    /// First date, last date and row count of the price data.
    fn get_data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RebalsimError>;
}
