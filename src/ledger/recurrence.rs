use std::{fmt, str::FromStr};

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Period at which a recurring template produces occurrences.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub const NONE: &'static str = "none";

    /// Parses a stored recurrence value. Only the exact lowercase names
    /// recur; `none`, an empty value and anything else mean "does not recur".
    pub fn from_stored(raw: Option<&str>) -> Option<Recurrence> {
        raw.and_then(|value| value.parse().ok())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Recurrence::Daily => "Daily",
            Recurrence::Weekly => "Weekly",
            Recurrence::Monthly => "Monthly",
        }
    }

    /// Advances `from` by exactly one period.
    ///
    /// Monthly steps keep the day of month and let it overflow into the
    /// following month when the target month is shorter, so 2024-01-31 steps
    /// to 2024-03-02. Returns `None` only when the result leaves chrono's
    /// representable range.
    pub fn next_date(&self, from: NaiveDate) -> Option<NaiveDate> {
        match self {
            Recurrence::Daily => from.checked_add_days(Days::new(1)),
            Recurrence::Weekly => from.checked_add_days(Days::new(7)),
            Recurrence::Monthly => add_month_with_overflow(from),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown recurrence `{0}`")]
pub struct UnknownRecurrence(pub String);

impl FromStr for Recurrence {
    type Err = UnknownRecurrence;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            other => Err(UnknownRecurrence(other.to_string())),
        }
    }
}

fn add_month_with_overflow(from: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if from.month() == 12 {
        (from.year() + 1, 1)
    } else {
        (from.year(), from.month() + 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    first.checked_add_days(Days::new(u64::from(from.day() - 1)))
}
