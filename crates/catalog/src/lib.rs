pub mod forms;

use std::collections::BTreeMap;

use foundation::{DateItem, LayerId, from_epoch_ms, parse_date};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("dates table is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dates table corrupt: {0}")]
    Corrupt(String),
}

/// Read access to per-layer available dates.
pub trait DateSource {
    fn dates_for(&self, layer: &LayerId) -> Option<&[DateItem]>;

    fn is_empty(&self) -> bool;
}

/// Server-provided available dates, keyed by layer id.
///
/// Every mutation bumps `revision`, which callers use to detect that the table
/// changed without comparing contents.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableDatesTable {
    #[serde(skip)]
    revision: u64,
    #[serde(flatten)]
    dates: BTreeMap<LayerId, Vec<DateItem>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Item(DateItem),
    Text(String),
    EpochMs(i64),
}

impl RawEntry {
    fn into_item(self) -> Result<DateItem, CatalogError> {
        match self {
            RawEntry::Item(item) => Ok(item),
            RawEntry::Text(s) => parse_date(&s)
                .map(DateItem::new)
                .map_err(|e| CatalogError::Corrupt(e.to_string())),
            RawEntry::EpochMs(ms) => from_epoch_ms(ms)
                .map(DateItem::new)
                .ok_or_else(|| CatalogError::Corrupt(format!("timestamp out of range: {ms}"))),
        }
    }
}

impl AvailableDatesTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `{ "<layer id>": [ ... ] }` where each entry is a `DateItem` object,
    /// a date string, or epoch milliseconds.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let parsed: BTreeMap<LayerId, Vec<RawEntry>> = serde_json::from_str(raw)?;
        let mut table = Self::new();
        for (layer, entries) in parsed {
            let items = entries
                .into_iter()
                .map(RawEntry::into_item)
                .collect::<Result<Vec<_>, _>>()?;
            table.insert(layer, items);
        }
        Ok(table)
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the dates for `layer`. Items are kept sorted by display date.
    pub fn insert(&mut self, layer: LayerId, mut items: Vec<DateItem>) {
        items.sort_by_key(|i| i.display_date);
        tracing::debug!(layer = %layer, count = items.len(), "available dates updated");
        self.dates.insert(layer, items);
        self.revision += 1;
    }

    pub fn remove(&mut self, layer: &LayerId) -> bool {
        let removed = self.dates.remove(layer).is_some();
        if removed {
            self.revision += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.dates.is_empty() {
            self.dates.clear();
            self.revision += 1;
        }
    }

    pub fn layers(&self) -> impl Iterator<Item = &LayerId> {
        self.dates.keys()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }
}

impl DateSource for AvailableDatesTable {
    fn dates_for(&self, layer: &LayerId) -> Option<&[DateItem]> {
        self.dates.get(layer).map(Vec::as_slice)
    }

    fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
