//! Keeps the selected layers and date consistent with the available dates.
//!
//! The host calls [`Reconciler::observe`] whenever one of the inputs may have
//! changed: layer ids or date in the address bar, or the available-dates table.
//! A pass reads those inputs, corrects them where needed (dropping unknown or
//! conflicting layers, snapping the date) and reports the resulting state.

use catalog::DateSource;
use chrono::{DateTime, Utc};
use foundation::{LayerId, format_date, normalize, parse_date};
use layers::{LayerDefinition, LayerRegistry};
use runtime::{DATE_KEY, LAYER_IDS_KEY, NotificationSink, UrlHistory};
use serde::Serialize;
use timeline::{
    compute_selectable_dates, dates_for_layer, find_closest_date, includes_day, items_include_day,
    latest_date, takes_part_in_dates,
};

use crate::issue::ReconcileIssue;
use crate::state::{MapState, address_layer_ids, write_layer_ids};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    /// No date-bearing layer is selected.
    Idle,
    /// Date-bearing layers are selected but their dates have not arrived.
    AwaitingServerDates,
    LayersConsistent,
    /// A layer was evicted because no date was shared.
    LayersConflicting,
    /// The selected date was snapped to the nearest selectable date.
    DateOutOfRange,
}

/// The inputs a pass depends on. A pass only needs to run when this changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputSnapshot {
    pub layer_ids: Option<String>,
    pub date: Option<String>,
    pub dates_revision: u64,
}

impl InputSnapshot {
    pub fn capture(history: &impl UrlHistory, state: &MapState) -> Self {
        Self {
            layer_ids: history.get(LAYER_IDS_KEY),
            date: history.get(DATE_KEY),
            dates_revision: state.available_dates().revision(),
        }
    }

    pub fn differs(&self, other: &InputSnapshot) -> bool {
        self != other
    }
}

/// Upper bound on passes in [`Reconciler::settle`]. Every correcting pass
/// shrinks the layer list or lands the date on a selectable day, so two or three
/// passes settle in practice.
const MAX_SETTLE_PASSES: usize = 8;

#[derive(Debug)]
pub struct Reconciler {
    registry: LayerRegistry,
    state: ReconcileState,
    last_inputs: Option<InputSnapshot>,
    /// Last (removed, kept) pair reported as non-overlapping.
    overlap_reported: Option<(LayerId, LayerId)>,
    today: Option<DateTime<Utc>>,
}

impl Reconciler {
    pub fn new(registry: LayerRegistry) -> Self {
        Self {
            registry,
            state: ReconcileState::Idle,
            last_inputs: None,
            overlap_reported: None,
            today: None,
        }
    }

    /// Fixes the date used when nothing else is available. Defaults to the
    /// current day.
    pub fn with_today(mut self, today: DateTime<Utc>) -> Self {
        self.today = Some(normalize(today));
        self
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn state(&self) -> ReconcileState {
        self.state
    }

    /// Whether a "no overlap" warning is armed against repeating.
    pub fn overlap_reported(&self) -> bool {
        self.overlap_reported.is_some()
    }

    /// Runs a pass if the inputs changed since the last observed pass.
    pub fn observe(
        &mut self,
        map: &mut MapState,
        history: &mut impl UrlHistory,
        notifications: &mut impl NotificationSink,
    ) -> Option<ReconcileState> {
        let inputs = InputSnapshot::capture(history, map);
        if let Some(last) = &self.last_inputs
            && !last.differs(&inputs)
        {
            return None;
        }
        self.last_inputs = Some(inputs);
        Some(self.recompute(map, history, notifications))
    }

    /// Observes until the inputs stop changing and returns the final state.
    pub fn settle(
        &mut self,
        map: &mut MapState,
        history: &mut impl UrlHistory,
        notifications: &mut impl NotificationSink,
    ) -> ReconcileState {
        for _ in 0..MAX_SETTLE_PASSES {
            if self.observe(map, history, notifications).is_none() {
                break;
            }
        }
        self.state
    }

    /// Runs one pass unconditionally.
    pub fn recompute(
        &mut self,
        map: &mut MapState,
        history: &mut impl UrlHistory,
        notifications: &mut impl NotificationSink,
    ) -> ReconcileState {
        let next = self.pass(map, history, notifications);
        self.enter(next)
    }

    fn pass(
        &mut self,
        map: &mut MapState,
        history: &mut impl UrlHistory,
        notifications: &mut impl NotificationSink,
    ) -> ReconcileState {
        let ids = address_layer_ids(history);
        if ids.is_empty() {
            map.clear_selected_layers();
            self.overlap_reported = None;
            return ReconcileState::Idle;
        }

        let (mut layers, unknown) = self.registry.resolve(&ids);
        for id in unknown {
            report(notifications, ReconcileIssue::InvalidLayerIdentifier { id });
        }
        if layers.len() != ids.len() {
            write_layer_ids(history, &ids_of(&layers));
        }
        map.set_selected_layers(layers.clone());

        if !layers.iter().any(takes_part_in_dates) {
            self.overlap_reported = None;
            return ReconcileState::Idle;
        }
        if self.awaiting_dates(map) {
            return ReconcileState::AwaitingServerDates;
        }

        let mut evicted = false;
        let selectable = loop {
            let selectable = compute_selectable_dates(&layers, map.available_dates());
            let dated: Vec<&LayerDefinition> =
                layers.iter().filter(|l| takes_part_in_dates(l)).collect();
            if !selectable.is_empty() || dated.len() < 2 {
                if !evicted {
                    self.overlap_reported = None;
                }
                break selectable;
            }
            // Keep the most recently added layer, drop the one added before it.
            let removed = dated[dated.len() - 2];
            let kept = dated[dated.len() - 1];
            let pair = (removed.id.clone(), kept.id.clone());
            tracing::info!(removed = %removed.id, kept = %kept.id, "no overlapping dates; evicting layer");
            if self.overlap_reported.as_ref() != Some(&pair) {
                report(
                    notifications,
                    ReconcileIssue::NoDateOverlap {
                        removed: removed.display_name().to_string(),
                        kept: kept.display_name().to_string(),
                    },
                );
            }
            self.overlap_reported = Some(pair.clone());
            layers.retain(|l| l.id != pair.0);
            write_layer_ids(history, &ids_of(&layers));
            evicted = true;
        };
        map.set_selected_layers(layers);

        let outcome = self.reconcile_date(map, &selectable, history, notifications);
        if evicted {
            ReconcileState::LayersConflicting
        } else {
            outcome
        }
    }

    // Pending until the table is populated; after that a layer missing from it
    // simply has no dates.
    fn awaiting_dates(&self, map: &MapState) -> bool {
        map.available_dates().is_empty()
    }

    fn reconcile_date(
        &self,
        map: &mut MapState,
        selectable: &[DateTime<Utc>],
        history: &mut impl UrlHistory,
        notifications: &mut impl NotificationSink,
    ) -> ReconcileState {
        let requested = match history.get(DATE_KEY) {
            Some(raw) => match parse_date(&raw) {
                Ok(date) => Some(date),
                Err(_) => {
                    let fallback = self.fallback_date(selectable);
                    report(
                        notifications,
                        ReconcileIssue::InvalidDate {
                            raw,
                            fallback: format_date(fallback),
                        },
                    );
                    None
                }
            },
            None => None,
        };

        let Some(requested) = requested else {
            let fallback = self.fallback_date(selectable);
            tracing::debug!(date = %format_date(fallback), "defaulting selected date");
            history.update(DATE_KEY, &format_date(fallback));
            map.set_selected_date(fallback);
            return ReconcileState::LayersConsistent;
        };
        map.set_selected_date(requested);

        let day = requested.date_naive();
        if selectable.is_empty() || includes_day(selectable, day) {
            return ReconcileState::LayersConsistent;
        }

        let snapped = find_closest_date(requested, selectable);
        let culprit = map
            .display_layers()
            .into_iter()
            .filter(takes_part_in_dates)
            .find(|layer| {
                let mut own = dates_for_layer(layer, map.available_dates());
                own.sort_by_key(|i| i.display_date);
                !items_include_day(&own, day)
            });
        let layer = culprit
            .map(|l| l.display_name().to_string())
            .unwrap_or_else(|| "the selected layers".to_string());
        tracing::info!(
            layer = %layer,
            requested = %format_date(requested),
            snapped = %format_date(snapped),
            "selected date unavailable; snapping"
        );
        report(
            notifications,
            ReconcileIssue::LayerDataUnavailable {
                layer,
                requested: format_date(requested),
                substituted: format_date(snapped),
            },
        );
        history.update(DATE_KEY, &format_date(snapped));
        map.set_selected_date(snapped);
        ReconcileState::DateOutOfRange
    }

    fn fallback_date(&self, selectable: &[DateTime<Utc>]) -> DateTime<Utc> {
        latest_date(selectable)
            .or(self.today)
            .unwrap_or_else(|| normalize(Utc::now()))
    }

    fn enter(&mut self, next: ReconcileState) -> ReconcileState {
        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, "reconcile state change");
        }
        self.state = next;
        next
    }
}

fn ids_of(layers: &[LayerDefinition]) -> Vec<LayerId> {
    layers.iter().map(|l| l.id.clone()).collect()
}

fn report(notifications: &mut impl NotificationSink, issue: ReconcileIssue) {
    tracing::warn!("{issue}");
    notifications.notify(issue.to_notification());
}
