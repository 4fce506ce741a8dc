use catalog::AvailableDatesTable;
use chrono::{DateTime, Utc};
use foundation::{LayerId, format_date, join_layer_ids, normalize, parse_layer_ids};
use layers::{LayerDefinition, sort_for_display};
use runtime::{DATE_KEY, LAYER_IDS_KEY, UrlHistory};

/// View state owned by the host and handed to the reconciler by reference.
#[derive(Debug, Default, Clone)]
pub struct MapState {
    selected_layers: Vec<LayerDefinition>,
    selected_date: Option<DateTime<Utc>>,
    available_dates: AvailableDatesTable,
}

impl MapState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_available_dates(available_dates: AvailableDatesTable) -> Self {
        Self {
            available_dates,
            ..Self::default()
        }
    }

    /// Selected layers in the order they were added.
    pub fn selected_layers(&self) -> &[LayerDefinition] {
        &self.selected_layers
    }

    /// Selected layers in rendering order.
    pub fn display_layers(&self) -> Vec<LayerDefinition> {
        let mut layers = self.selected_layers.clone();
        sort_for_display(&mut layers);
        layers
    }

    pub fn set_selected_layers(&mut self, layers: Vec<LayerDefinition>) {
        self.selected_layers = layers;
    }

    pub fn clear_selected_layers(&mut self) {
        self.selected_layers.clear();
    }

    pub fn selected_date(&self) -> Option<DateTime<Utc>> {
        self.selected_date
    }

    pub fn set_selected_date(&mut self, date: DateTime<Utc>) {
        self.selected_date = Some(normalize(date));
    }

    pub fn available_dates(&self) -> &AvailableDatesTable {
        &self.available_dates
    }

    pub fn available_dates_mut(&mut self) -> &mut AvailableDatesTable {
        &mut self.available_dates
    }
}

/// Layer ids currently in the address bar, in addition order.
pub fn address_layer_ids(history: &impl UrlHistory) -> Vec<LayerId> {
    history
        .get(LAYER_IDS_KEY)
        .map(|raw| parse_layer_ids(&raw))
        .unwrap_or_default()
}

/// Writes `ids` to the address bar, dropping the key when the list is empty.
pub fn write_layer_ids(history: &mut impl UrlHistory, ids: &[LayerId]) {
    if ids.is_empty() {
        history.remove(LAYER_IDS_KEY);
    } else {
        history.update(LAYER_IDS_KEY, &join_layer_ids(ids));
    }
}

/// Appends `id` as the most recently added layer. Re-adding moves it to the end.
pub fn add_layer(history: &mut impl UrlHistory, id: LayerId) {
    let mut ids = address_layer_ids(history);
    ids.retain(|existing| existing != &id);
    ids.push(id);
    write_layer_ids(history, &ids);
}

pub fn remove_layer(history: &mut impl UrlHistory, id: &LayerId) {
    let mut ids = address_layer_ids(history);
    ids.retain(|existing| existing != id);
    write_layer_ids(history, &ids);
}

/// Records a user date choice in the address bar.
pub fn select_date(history: &mut impl UrlHistory, date: DateTime<Utc>) {
    history.update(DATE_KEY, &format_date(date));
}
