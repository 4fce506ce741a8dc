//! Kobo form responses as point-data features.
//!
//! A form-field mapping says which response keys hold the name, timestamp,
//! geometry and measure. Responses are filtered by a time window and by exact
//! field matches (`status` matches `_validation_status.label`).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use foundation::{DateItem, normalize};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FormError {
    #[error("response {index} is not a JSON object")]
    NotAnObject { index: usize },
    #[error("response {index} is missing field {field:?}")]
    MissingField { index: usize, field: String },
    #[error("response {index} has invalid timestamp {raw:?}")]
    InvalidDatetime { index: usize, raw: String },
    #[error("response {index} has invalid geometry {raw:?}")]
    InvalidGeometry { index: usize, raw: String },
    #[error("response {index} has invalid measure {raw:?}")]
    InvalidMeasure { index: usize, raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields {
    pub name: String,
    pub datetime: String,
    pub geom: String,
    pub measure: String,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormFeature {
    pub date: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
    pub status: Option<String>,
    pub name: Option<String>,
    /// Unmapped, non-internal response fields.
    pub properties: BTreeMap<String, Value>,
}

const STATUS_KEY: &str = "status";
const VALIDATION_KEY: &str = "_validation_status";

/// Converts raw responses into features.
///
/// Responses outside `[begin, end]` or failing a filter are skipped; a
/// response that passes but has a malformed mapped field is an error.
pub fn parse_form_responses(
    responses: &[Value],
    fields: &FormFields,
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<FormFeature>, FormError> {
    let mut out = Vec::new();
    for (index, response) in responses.iter().enumerate() {
        let obj = response
            .as_object()
            .ok_or(FormError::NotAnObject { index })?;

        let raw_dt = text_field(obj, &fields.datetime).ok_or_else(|| FormError::MissingField {
            index,
            field: fields.datetime.clone(),
        })?;
        let date = parse_form_datetime(&raw_dt)
            .ok_or(FormError::InvalidDatetime { index, raw: raw_dt })?;
        if date < begin || date > end {
            continue;
        }

        let status = obj
            .get(VALIDATION_KEY)
            .and_then(|v| v.get("label"))
            .and_then(Value::as_str)
            .map(str::to_string);
        if !matches_filters(obj, status.as_deref(), &fields.filters) {
            tracing::trace!(index, "form response filtered out");
            continue;
        }

        let raw_geom = text_field(obj, &fields.geom).ok_or_else(|| FormError::MissingField {
            index,
            field: fields.geom.clone(),
        })?;
        let (lat, lon) =
            parse_geometry(&raw_geom).ok_or(FormError::InvalidGeometry { index, raw: raw_geom })?;

        let raw_measure =
            text_field(obj, &fields.measure).ok_or_else(|| FormError::MissingField {
                index,
                field: fields.measure.clone(),
            })?;
        let value = raw_measure
            .trim()
            .parse::<f64>()
            .map_err(|_| FormError::InvalidMeasure {
                index,
                raw: raw_measure.clone(),
            })?;

        let mapped = [&fields.name, &fields.datetime, &fields.geom, &fields.measure];
        let properties = obj
            .iter()
            .filter(|(k, _)| !k.starts_with('_') && !mapped.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        out.push(FormFeature {
            date,
            lat,
            lon,
            value,
            status,
            name: text_field(obj, &fields.name),
            properties,
        });
    }
    tracing::debug!(
        total = responses.len(),
        kept = out.len(),
        "parsed form responses"
    );
    Ok(out)
}

/// Distinct calendar days of `features`, ascending.
pub fn dates_from_features(features: &[FormFeature]) -> Vec<DateItem> {
    let mut days: Vec<DateTime<Utc>> = features.iter().map(|f| normalize(f.date)).collect();
    days.sort();
    days.dedup();
    days.into_iter().map(DateItem::new).collect()
}

// Numbers and strings both count as text; the form export mixes them.
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches_filters(
    obj: &Map<String, Value>,
    status: Option<&str>,
    filters: &BTreeMap<String, String>,
) -> bool {
    filters.iter().all(|(key, expected)| {
        if key == STATUS_KEY {
            status == Some(expected.as_str())
        } else {
            text_field(obj, key).as_deref() == Some(expected.as_str())
        }
    })
}

/// Kobo timestamps carry no offset; they are treated as UTC.
fn parse_form_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// `"lat lon alt accuracy"`; only the first two parts are used.
fn parse_geometry(raw: &str) -> Option<(f64, f64)> {
    let mut parts = raw.split_whitespace();
    let lat = parts.next()?.parse::<f64>().ok()?;
    let lon = parts.next()?.parse::<f64>().ok()?;
    Some((lat, lon))
}
