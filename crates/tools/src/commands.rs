use std::fs;
use std::path::{Path, PathBuf};

use catalog::forms::{FormError, FormFeature, FormFields, dates_from_features, parse_form_responses};
use catalog::{AvailableDatesTable, CatalogError};
use chrono::{DateTime, Duration, Utc};
use foundation::{DateParseError, LayerId, format_date, parse_date};
use layers::{LayerRegistry, RegistryError};
use reconcile::{MapState, ReconcileState, Reconciler};
use runtime::{MemoryHistory, NotificationBus, Posted};
use serde::Serialize;
use timeline::{compute_selectable_dates, find_closest_date};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Date(#[from] DateParseError),
    #[error("no candidate dates given")]
    NoCandidates,
}

fn read(path: &Path) -> Result<String, CommandError> {
    fs::read_to_string(path).map_err(|source| CommandError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CommandError> {
    serde_json::from_str(&read(path)?).map_err(|source| CommandError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_registry(path: &Path) -> Result<LayerRegistry, CommandError> {
    let registry = LayerRegistry::from_json(&read(path)?)?;
    tracing::info!(path = ?path, layers = registry.len(), "loaded layer registry");
    Ok(registry)
}

pub fn load_dates(path: &Path) -> Result<AvailableDatesTable, CommandError> {
    let table = AvailableDatesTable::from_json(&read(path)?)?;
    tracing::info!(path = ?path, layers = table.len(), "loaded available dates");
    Ok(table)
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SelectableReport {
    pub layers: Vec<String>,
    pub unknown: Vec<String>,
    pub dates: Vec<String>,
}

pub fn selectable(
    registry: &LayerRegistry,
    table: &AvailableDatesTable,
    ids: &[LayerId],
) -> SelectableReport {
    let (layers, unknown) = registry.resolve(ids);
    for id in &unknown {
        tracing::warn!(layer = %id, "unknown layer id");
    }
    let dates = compute_selectable_dates(&layers, table);
    SelectableReport {
        layers: layers.iter().map(|l| l.id.to_string()).collect(),
        unknown: unknown.iter().map(LayerId::to_string).collect(),
        dates: dates.into_iter().map(format_date).collect(),
    }
}

pub fn closest(target: &str, candidates: &[String]) -> Result<String, CommandError> {
    if candidates.is_empty() {
        return Err(CommandError::NoCandidates);
    }
    let target = parse_date(target)?;
    let parsed = candidates
        .iter()
        .map(|c| parse_date(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format_date(find_closest_date(target, &parsed)))
}

#[derive(Debug, Serialize)]
pub struct ReconcileReport {
    pub state: ReconcileState,
    pub query: String,
    pub selected_layers: Vec<String>,
    pub selected_date: Option<String>,
    pub notifications: Vec<Posted>,
}

/// Runs the reconciler over an address-bar query until it settles.
pub fn reconcile(
    registry: LayerRegistry,
    table: AvailableDatesTable,
    query: &str,
    today: Option<DateTime<Utc>>,
) -> ReconcileReport {
    let mut reconciler = Reconciler::new(registry);
    if let Some(today) = today {
        reconciler = reconciler.with_today(today);
    }
    let mut map = MapState::with_available_dates(table);
    let mut history = MemoryHistory::from_query(query);
    let mut bus = NotificationBus::new();

    let state = reconciler.settle(&mut map, &mut history, &mut bus);
    ReconcileReport {
        state,
        query: history.query_string(),
        selected_layers: map
            .display_layers()
            .iter()
            .map(|l| l.id.to_string())
            .collect(),
        selected_date: map.selected_date().map(format_date),
        notifications: bus.drain(),
    }
}

/// Inclusive window from the start of `begin` to the end of `end`, both UTC days.
pub fn day_window(begin: &str, end: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), CommandError> {
    let begin = parse_date(begin)? - Duration::hours(12);
    let end = parse_date(end)? + Duration::hours(12) - Duration::milliseconds(1);
    Ok((begin, end))
}

#[derive(Debug, Serialize)]
pub struct FormsReport {
    pub features: Vec<FormFeature>,
    pub dates: Vec<String>,
}

pub fn forms(
    responses_path: &Path,
    fields_path: &Path,
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<FormsReport, CommandError> {
    let responses: Vec<serde_json::Value> = read_json(responses_path)?;
    let fields: FormFields = read_json(fields_path)?;
    let features = parse_form_responses(&responses, &fields, begin, end)?;
    let dates = dates_from_features(&features)
        .into_iter()
        .map(|d| format_date(d.display_date))
        .collect();
    Ok(FormsReport { features, dates })
}
