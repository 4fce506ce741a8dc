use std::collections::{BTreeMap, BTreeSet};

use catalog::DateSource;
use chrono::{DateTime, NaiveDate, Utc};
use foundation::{DateItem, midday_utc};
use layers::LayerDefinition;

/// Whether `layer` constrains the selectable dates.
pub fn takes_part_in_dates(layer: &LayerDefinition) -> bool {
    layer.supports_dates() && layer.is_main()
}

/// Candidate dates for one layer, in table order.
///
/// Static dates win; otherwise the table entry of the layer's date source
/// (the companion layer for composites). Unknown layers yield no dates.
pub fn dates_for_layer(layer: &LayerDefinition, table: &impl DateSource) -> Vec<DateItem> {
    if let Some(items) = layer.static_date_items() {
        return items;
    }
    table
        .dates_for(layer.date_source())
        .map(<[DateItem]>::to_vec)
        .unwrap_or_default()
}

/// Days valid for every date-bearing main layer in `layers`, as midday UTC
/// timestamps in ascending order.
///
/// A layer with no dates empties the result. With no date-bearing layers the
/// result is empty too, which callers read as "unconstrained".
pub fn compute_selectable_dates(
    layers: &[LayerDefinition],
    table: &impl DateSource,
) -> Vec<DateTime<Utc>> {
    let participating: Vec<&LayerDefinition> =
        layers.iter().filter(|l| takes_part_in_dates(l)).collect();
    if participating.is_empty() {
        return Vec::new();
    }

    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for layer in &participating {
        // Repeated entries for one day count once per layer.
        let days: BTreeSet<NaiveDate> = dates_for_layer(layer, table)
            .iter()
            .map(DateItem::day)
            .collect();
        if days.is_empty() {
            tracing::debug!(layer = %layer.id, "layer has no available dates");
        }
        for day in days {
            *counts.entry(day).or_insert(0) += 1;
        }
    }

    let required = participating.len();
    let selectable: Vec<DateTime<Utc>> = counts
        .into_iter()
        .filter(|(_, n)| *n >= required)
        .map(|(day, _)| midday_utc(day))
        .collect();
    tracing::trace!(
        layers = required,
        selectable = selectable.len(),
        "computed selectable dates"
    );
    selectable
}
