use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;

use crate::error::FieldErrors;

/// Closed interval of calendar days, `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(rename = "startDate", with = "iso_date")]
    pub start: Date,
    #[serde(rename = "endDate", with = "iso_date")]
    pub end: Date,
}

impl DateRange {
    /// Builds a range without checking its ordering; see [`DateRange::is_valid_ordering`].
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    /// A stay must end strictly after it starts.
    pub fn is_valid_ordering(&self) -> bool {
        is_valid_ordering(self.start, self.end)
    }

    /// Inclusive overlap: any shared day counts, so a checkout day equal to
    /// another stay's check-in day conflicts.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn contains(&self, day: Date) -> bool {
        self.start <= day && day <= self.end
    }
}

pub fn is_valid_ordering(start: Date, end: Date) -> bool {
    end > start
}

/// Stay dates exactly as the client sent them. Parsing waits until the spot is
/// known to exist, so an unknown spot is reported ahead of bad dates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedDates {
    pub start_date: Option<Value>,
    pub end_date: Option<Value>,
}

impl RequestedDates {
    #[cfg(test)]
    pub fn from_range(range: DateRange) -> Self {
        Self {
            start_date: Some(Value::String(range.start.to_string())),
            end_date: Some(Value::String(range.end.to_string())),
        }
    }

    pub fn parse(&self) -> Result<DateRange, FieldErrors> {
        let mut errors = FieldErrors::new();
        let start = parse_day(self.start_date.as_ref(), "startDate", &mut errors);
        let end = parse_day(self.end_date.as_ref(), "endDate", &mut errors);
        match (start, end) {
            (Some(start), Some(end)) => Ok(DateRange::new(start, end)),
            _ => Err(errors),
        }
    }
}

fn parse_day(value: Option<&Value>, field: &'static str, errors: &mut FieldErrors) -> Option<Date> {
    let text = match value {
        None | Some(Value::Null) => {
            errors.insert(field, format!("{field} is required"));
            return None;
        }
        Some(Value::String(text)) => text.trim(),
        Some(_) => "",
    };
    match Date::parse(text, iso_date::FORMAT) {
        Ok(day) => Some(day),
        Err(_) => {
            errors.insert(field, format!("{field} must be a date in YYYY-MM-DD format"));
            None
        }
    }
}

/// `YYYY-MM-DD` serde adapter for [`time::Date`].
pub mod iso_date {
    use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};
    use time::{format_description::FormatItem, macros::format_description, Date};

    pub(super) const FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = date.format(FORMAT).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let text = String::deserialize(deserializer)?;
        Date::parse(text.trim(), FORMAT).map_err(D::Error::custom)
    }
}
