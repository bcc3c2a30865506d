use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::AppError;

/// Day-first format used for every date column in the store.
pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIME_FORMAT: &str = "%H:%M";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| AppError::StoreError(format!("invalid date '{}': {}", raw, e)))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, AppError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| AppError::StoreError(format!("invalid time '{}': {}", raw, e)))
}

/// Normalise a `datePosted` value from a detail page's structured data.
pub fn parse_posted_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.date_naive());
    }

    let datetime_formats = [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }

    // Date-only shapes, the store's own format last
    for format in ["%Y-%m-%d", "%Y/%m/%d", DATE_FORMAT] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

/// Serde adapters for the CSV store. Blank cells are `None`, never a sentinel.
pub mod serde_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_date(&raw).map_err(serde::de::Error::custom)
    }
}

pub mod serde_opt_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => s.serialize_str(&super::format_date(*date)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => super::parse_date(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

pub mod serde_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

/// Blank-tolerant text cells: whitespace-only counts as empty.
pub mod serde_opt_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(text: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        match text {
            Some(text) => s.serialize_str(text),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.filter(|text| !text.trim().is_empty()))
    }
}
