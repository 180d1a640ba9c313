//! Rebalance period boundaries.

use chrono::NaiveDate;
use tracing::debug;

use super::error::RebalsimError;

/// One holding period. `index` is the position of the rebalance whose
/// weights apply. Balances are observed on `(start, end]`; the price on
/// `start` is the base of the first return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalancePeriod {
    pub index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub is_final: bool,
}

impl RebalancePeriod {
    pub fn is_zero_length(&self) -> bool {
        self.start == self.end
    }
}

/// Periods between consecutive rebalance dates, the last one closing on
/// `end_date`. Zero-length periods are dropped; a final period that would
/// start on `end_date` ends the schedule.
pub fn build_schedule(
    rebalance_dates: &[NaiveDate],
    end_date: NaiveDate,
) -> Result<Vec<RebalancePeriod>, RebalsimError> {
    let Some(&last) = rebalance_dates.last() else {
        return Err(RebalsimError::alignment("no rebalance dates"));
    };
    if let Some(pair) = rebalance_dates.windows(2).find(|w| w[1] < w[0]) {
        return Err(RebalsimError::alignment(format!(
            "rebalance date {} precedes {}",
            pair[1], pair[0]
        )));
    }
    if end_date < last {
        return Err(RebalsimError::alignment(format!(
            "end date {end_date} precedes last rebalance {last}"
        )));
    }

    let n = rebalance_dates.len();
    let mut periods = Vec::with_capacity(n);
    for (index, &start) in rebalance_dates.iter().enumerate() {
        let is_final = index + 1 == n;
        let end = if is_final {
            end_date
        } else {
            rebalance_dates[index + 1]
        };
        let period = RebalancePeriod {
            index,
            start,
            end,
            is_final,
        };
        if period.is_zero_length() {
            debug!(index, %start, "skipping zero-length period");
            continue;
        }
        periods.push(period);
    }
    Ok(periods)
}
