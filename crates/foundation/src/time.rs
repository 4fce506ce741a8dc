use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Date format used in the address bar and in config files.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Returns the timestamp for 12:00 UTC on `day`.
///
/// Selected and available dates are pinned to midday so that a viewer in any
/// timezone sees the same calendar day.
pub fn midday_utc(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::default())) + Duration::hours(12)
}

/// Drops the time of day from `ts` and pins it to midday UTC.
pub fn normalize(ts: DateTime<Utc>) -> DateTime<Utc> {
    midday_utc(ts.date_naive())
}

pub fn day_of(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

pub fn format_date(ts: DateTime<Utc>) -> String {
    ts.format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParseError {
    pub input: String,
}

impl fmt::Display for DateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid date: {:?}", self.input)
    }
}

impl std::error::Error for DateParseError {}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp into a normalized date.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, DateParseError> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Ok(midday_utc(day));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(normalize(ts.with_timezone(&Utc)));
    }
    Err(DateParseError {
        input: raw.to_string(),
    })
}

/// Normalizes a millisecond epoch timestamp. Out-of-range values yield `None`.
pub fn from_epoch_ms(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(normalize)
}

/// One queryable calendar day for a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateItem {
    #[serde(with = "day_serde")]
    pub display_date: DateTime<Utc>,
    /// Server-side layer to query for this day on multi-temporal WMS sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_layer: Option<String>,
}

impl DateItem {
    pub fn new(display_date: DateTime<Utc>) -> Self {
        Self {
            display_date: normalize(display_date),
            query_layer: None,
        }
    }

    pub fn on_day(day: NaiveDate) -> Self {
        Self::new(midday_utc(day))
    }

    pub fn with_query_layer(mut self, layer: impl Into<String>) -> Self {
        self.query_layer = Some(layer.into());
        self
    }

    pub fn day(&self) -> NaiveDate {
        day_of(self.display_date)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDay {
    Text(String),
    EpochMs(i64),
}

impl RawDay {
    fn into_date<E: serde::de::Error>(self) -> Result<DateTime<Utc>, E> {
        match self {
            RawDay::Text(s) => parse_date(&s).map_err(E::custom),
            RawDay::EpochMs(ms) => {
                from_epoch_ms(ms).ok_or_else(|| E::custom(format!("timestamp out of range: {ms}")))
            }
        }
    }
}

// Dates are written as `YYYY-MM-DD`; epoch milliseconds are accepted on read.
mod day_serde {
    use super::{RawDay, format_date};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_date(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        RawDay::deserialize(d)?.into_date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn normalize_pins_to_midday() {
        let late = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        let n = normalize(late);
        assert_eq!(n.hour(), 12);
        assert_eq!(format_date(n), "2024-03-09");
    }

    #[test]
    fn parse_accepts_plain_and_rfc3339() {
        let a = parse_date("2024-01-02").unwrap();
        let b = parse_date("2024-01-02T03:04:05Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_date("02/01/2024").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn date_item_reads_strings_and_epoch_ms() {
        let from_str: DateItem = serde_json::from_str(r#"{"display_date":"2024-01-01"}"#).unwrap();
        // 2024-01-01T00:00:00Z
        let from_ms: DateItem =
            serde_json::from_str(r#"{"display_date":1704067200000,"query_layer":"rain_1"}"#)
                .unwrap();
        assert_eq!(from_str.day(), from_ms.day());
        assert_eq!(from_ms.query_layer.as_deref(), Some("rain_1"));
    }

    #[test]
    fn date_item_ignores_unused_server_fields() {
        let item: DateItem = serde_json::from_str(
            r#"{"display_date":"2024-01-01","start_date":"2023-12-25","end_date":"2024-01-07"}"#,
        )
        .unwrap();
        assert_eq!(serde_json::to_string(&item).unwrap(), r#"{"display_date":"2024-01-01"}"#);
    }

    #[test]
    fn date_item_writes_plain_dates() {
        let item = DateItem::on_day(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(json, r#"{"display_date":"2024-05-01"}"#);
    }
}
