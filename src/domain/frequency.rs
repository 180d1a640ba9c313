//! Calendar frequencies for resampling prices and balances.
//!
//! Accepts the pandas offset aliases the input data is usually described
//! with: `D`, `<n>D`, `B`, `W`, `W-<DAY>`, `M`/`ME`, `Q`/`QE` and
//! `A`/`Y`/`YE` (case-insensitive).
//!
//! `D` and `B` bins are labelled by their first day. Weekly, monthly,
//! quarterly and yearly bins are closed on their period-end date and labelled
//! by it.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::fmt;
use std::str::FromStr;

use super::error::FrequencyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Every `n` calendar days, counted from the first observation.
    Days(u32),
    /// Monday to Friday; weekend observations fall into the preceding Friday.
    BusinessDay,
    /// Weeks ending on the given weekday.
    Weekly(Weekday),
    MonthEnd,
    QuarterEnd,
    YearEnd,
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Days(1)
    }
}

impl FromStr for Frequency {
    type Err = FrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alias = s.trim().to_uppercase();
        if alias.is_empty() {
            return Err(FrequencyError::new(s, "empty frequency"));
        }

        match alias.as_str() {
            "D" => return Ok(Frequency::Days(1)),
            "B" => return Ok(Frequency::BusinessDay),
            "W" => return Ok(Frequency::Weekly(Weekday::Sun)),
            "M" | "ME" => return Ok(Frequency::MonthEnd),
            "Q" | "QE" => return Ok(Frequency::QuarterEnd),
            "A" | "Y" | "YE" => return Ok(Frequency::YearEnd),
            _ => {}
        }

        if let Some(day) = alias.strip_prefix("W-") {
            let weekday = day
                .parse::<Weekday>()
                .map_err(|_| FrequencyError::new(s, format!("unknown weekday '{day}'")))?;
            return Ok(Frequency::Weekly(weekday));
        }

        if let Some(count) = alias.strip_suffix('D') {
            let n: u32 = count
                .parse()
                .map_err(|_| FrequencyError::new(s, "expected <n>D with a positive count"))?;
            if n == 0 {
                return Err(FrequencyError::new(s, "day count must be at least 1"));
            }
            return Ok(Frequency::Days(n));
        }

        Err(FrequencyError::new(s, "unknown alias"))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Days(1) => write!(f, "D"),
            Frequency::Days(n) => write!(f, "{n}D"),
            Frequency::BusinessDay => write!(f, "B"),
            Frequency::Weekly(day) => write!(f, "W-{}", weekday_alias(*day)),
            Frequency::MonthEnd => write!(f, "M"),
            Frequency::QuarterEnd => write!(f, "Q"),
            Frequency::YearEnd => write!(f, "A"),
        }
    }
}

impl Frequency {
    /// Label of the bin containing `date`. `origin` anchors `Days(n)` bins and
    /// must not be after `date`.
    pub fn bin_label(&self, date: NaiveDate, origin: NaiveDate) -> NaiveDate {
        match *self {
            Frequency::Days(n) => {
                let n = i64::from(n.max(1));
                let offset = (date - origin).num_days().max(0);
                add_days(origin, (offset / n) * n)
            }
            Frequency::BusinessDay => match date.weekday() {
                Weekday::Sat => sub_days(date, 1),
                Weekday::Sun => sub_days(date, 2),
                _ => date,
            },
            Frequency::Weekly(anchor) => {
                let ahead = (7 + anchor.num_days_from_monday()
                    - date.weekday().num_days_from_monday())
                    % 7;
                add_days(date, i64::from(ahead))
            }
            Frequency::MonthEnd => month_end(date.year(), date.month()),
            Frequency::QuarterEnd => {
                let quarter_month = ((date.month() - 1) / 3) * 3 + 3;
                month_end(date.year(), quarter_month)
            }
            Frequency::YearEnd => month_end(date.year(), 12),
        }
    }

    /// Label of the bin that follows the bin labelled `label`.
    pub fn next_label(&self, label: NaiveDate) -> NaiveDate {
        match *self {
            Frequency::Days(n) => add_days(label, i64::from(n.max(1))),
            Frequency::BusinessDay => match label.weekday() {
                Weekday::Fri => add_days(label, 3),
                Weekday::Sat => add_days(label, 2),
                _ => add_days(label, 1),
            },
            Frequency::Weekly(_) => add_days(label, 7),
            Frequency::MonthEnd | Frequency::QuarterEnd | Frequency::YearEnd => {
                let next = add_days(label, 1);
                self.bin_label(next, next)
            }
        }
    }
}

fn weekday_alias(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
        Weekday::Sun => "SUN",
    }
}

fn add_days(date: NaiveDate, n: i64) -> NaiveDate {
    date.checked_add_days(Days::new(n.unsigned_abs()))
        .unwrap_or(NaiveDate::MAX)
}

fn sub_days(date: NaiveDate, n: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(n)).unwrap_or(NaiveDate::MIN)
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
