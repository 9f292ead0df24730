// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Utility functions and types for date operators
//!
//! Dates travel through remappers as JSON strings. This module converts them
//! to chrono values, applies calendar arithmetic and renders them back.
//! Arithmetic happens in the fixed offset the input carries; there is no time
//! zone database involved.

use chrono::{
    DateTime, FixedOffset, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc,
};
use serde_json::Value;

use crate::core::{RemapperError, Result};

/// A date value read from remapper data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    /// Calendar date without time (`2024-01-31`)
    Date(NaiveDate),
    /// Instant with a fixed UTC offset
    DateTime(DateTime<FixedOffset>),
}

impl ParsedDate {
    /// The value as an instant; dates are taken at midnight UTC.
    pub fn to_datetime(&self) -> DateTime<FixedOffset> {
        match self {
            Self::Date(date) => date.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset(),
            Self::DateTime(datetime) => *datetime,
        }
    }

    pub fn is_date_only(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Render as `YYYY-MM-DD` or RFC 3339 with millisecond precision
    pub fn to_value(&self) -> Value {
        match self {
            Self::Date(date) => Value::String(date.format("%Y-%m-%d").to_string()),
            Self::DateTime(datetime) => Value::String(DateTimeUtils::format_rfc3339(datetime)),
        }
    }
}

/// Utility functions for date operations
pub struct DateTimeUtils;

impl DateTimeUtils {
    /// Read a date from a JSON value.
    ///
    /// Strings must be RFC 3339 or `YYYY-MM-DD`, integers are epoch
    /// milliseconds. Other value types are a type mismatch.
    pub fn from_value(operator: &str, value: &Value) -> Result<ParsedDate> {
        match value {
            Value::String(s) => Self::parse_str(s)
                .ok_or_else(|| RemapperError::invalid_date(operator, format!("'{s}'"))),
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(|datetime| ParsedDate::DateTime(datetime.fixed_offset()))
                .ok_or_else(|| RemapperError::invalid_date(operator, n.to_string())),
            other => Err(RemapperError::type_mismatch(
                operator,
                "date string or epoch milliseconds",
                other,
            )),
        }
    }

    /// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date
    pub fn parse_str(s: &str) -> Option<ParsedDate> {
        if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
            return Some(ParsedDate::DateTime(datetime));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(ParsedDate::Date)
    }

    /// Parse with a strftime-style format.
    ///
    /// Formats with an offset yield that offset, formats with a time but no
    /// offset are read as UTC, formats with only date fields yield a date.
    pub fn parse_with_format(s: &str, format: &str) -> Option<ParsedDate> {
        if let Ok(datetime) = DateTime::parse_from_str(s, format) {
            return Some(ParsedDate::DateTime(datetime));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ParsedDate::DateTime(naive.and_utc().fixed_offset()));
        }
        NaiveDate::parse_from_str(s, format).ok().map(ParsedDate::Date)
    }

    /// RFC 3339 with milliseconds, `Z` for a zero offset
    pub fn format_rfc3339(datetime: &DateTime<FixedOffset>) -> String {
        datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn format_now(now: DateTime<Utc>) -> String {
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Calendar and clock offsets applied by `date.add`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateDuration {
    pub years: i64,
    pub months: i64,
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl DateDuration {
    /// Parse an ISO 8601 duration such as `P1Y2M3DT4H5M6S`, `P2W` or `-P1D`.
    ///
    /// A leading minus negates every component. Fractional components are
    /// not supported.
    pub fn parse_iso8601(input: &str) -> std::result::Result<Self, String> {
        let (negative, rest) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };
        let body = rest
            .strip_prefix('P')
            .ok_or_else(|| format!("duration '{input}' must start with 'P'"))?;
        if body.is_empty() || body == "T" {
            return Err(format!("duration '{input}' has no components"));
        }

        let mut duration = Self::default();
        let mut in_time = false;
        let mut number = String::new();
        let mut seen_component = false;

        for c in body.chars() {
            match c {
                'T' if !in_time && number.is_empty() => in_time = true,
                '0'..='9' => number.push(c),
                designator => {
                    if number.is_empty() {
                        return Err(format!("missing number before '{designator}' in '{input}'"));
                    }
                    let amount: i64 = number
                        .parse()
                        .map_err(|_| format!("component too large in '{input}'"))?;
                    number.clear();
                    let slot = match (in_time, designator) {
                        (false, 'Y') => &mut duration.years,
                        (false, 'M') => &mut duration.months,
                        (false, 'W') => &mut duration.weeks,
                        (false, 'D') => &mut duration.days,
                        (true, 'H') => &mut duration.hours,
                        (true, 'M') => &mut duration.minutes,
                        (true, 'S') => &mut duration.seconds,
                        _ => return Err(format!("unexpected '{designator}' in '{input}'")),
                    };
                    *slot = slot
                        .checked_add(amount)
                        .ok_or_else(|| format!("component too large in '{input}'"))?;
                    seen_component = true;
                }
            }
        }

        if !number.is_empty() {
            return Err(format!("trailing number without designator in '{input}'"));
        }
        if !seen_component {
            return Err(format!("duration '{input}' has no components"));
        }

        Ok(if negative { duration.negated() } else { duration })
    }

    pub fn negated(self) -> Self {
        Self {
            years: -self.years,
            months: -self.months,
            weeks: -self.weeks,
            days: -self.days,
            hours: -self.hours,
            minutes: -self.minutes,
            seconds: -self.seconds,
        }
    }

    /// Whether only calendar components (years to days) are set
    pub fn is_date_only(&self) -> bool {
        self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    fn total_months(&self) -> Option<i64> {
        self.years.checked_mul(12)?.checked_add(self.months)
    }

    fn exact_delta(&self) -> Option<TimeDelta> {
        [
            TimeDelta::try_weeks(self.weeks)?,
            TimeDelta::try_days(self.days)?,
            TimeDelta::try_hours(self.hours)?,
            TimeDelta::try_minutes(self.minutes)?,
            TimeDelta::try_seconds(self.seconds)?,
        ]
        .into_iter()
        .try_fold(TimeDelta::zero(), |total, delta| total.checked_add(&delta))
    }

    /// Apply to a date or instant.
    ///
    /// Months and years go first, clamping to the last day of the month,
    /// then weeks, days and clock units are added as exact durations. A date
    /// stays a date when no clock units are involved. `None` on overflow.
    pub fn apply(&self, date: ParsedDate) -> Option<ParsedDate> {
        let months = self.total_months()?;
        let delta = self.exact_delta()?;

        match date {
            ParsedDate::Date(date) if self.is_date_only() => {
                let shifted = shift_months(
                    date,
                    months,
                    NaiveDate::checked_add_months,
                    NaiveDate::checked_sub_months,
                )?;
                shifted.checked_add_signed(delta).map(ParsedDate::Date)
            }
            other => {
                let datetime = other.to_datetime();
                let shifted = shift_months(
                    datetime,
                    months,
                    DateTime::checked_add_months,
                    DateTime::checked_sub_months,
                )?;
                shifted.checked_add_signed(delta).map(ParsedDate::DateTime)
            }
        }
    }
}

fn shift_months<T>(
    value: T,
    months: i64,
    add: fn(T, Months) -> Option<T>,
    sub: fn(T, Months) -> Option<T>,
) -> Option<T> {
    let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        add(value, Months::new(magnitude))
    } else {
        sub(value, Months::new(magnitude))
    }
}
