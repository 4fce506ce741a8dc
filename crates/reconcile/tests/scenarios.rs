use catalog::AvailableDatesTable;
use layers::LayerRegistry;
use pretty_assertions::assert_eq;
use reconcile::{MapState, ReconcileState, Reconciler, add_layer, remove_layer, select_date};
use runtime::{DATE_KEY, LAYER_IDS_KEY, MemoryHistory, NotificationBus, UrlHistory};

const LAYERS: &str = r#"{
    "flood": { "title": "Flood extent", "type": "wms", "server_layer_name": "flood_extent" },
    "storm": { "title": "Storm surge", "type": "wms", "server_layer_name": "storm_surge" },
    "flood_risk": { "title": "Flood risk", "type": "composite", "date_layer": "flood" },
    "adm1": { "title": "Provinces", "type": "boundary" }
}"#;

const DATES: &str = r#"{
    "flood": ["2024-01-01", "2024-01-02"],
    "storm": ["2024-01-03"]
}"#;

fn setup() -> (Reconciler, MapState, MemoryHistory, NotificationBus) {
    let registry = LayerRegistry::from_json(LAYERS).unwrap();
    let table = AvailableDatesTable::from_json(DATES).unwrap();
    (
        Reconciler::new(registry),
        MapState::with_available_dates(table),
        MemoryHistory::new(),
        NotificationBus::new(),
    )
}

#[test]
fn user_session_walks_through_states() {
    let (mut r, mut map, mut h, mut bus) = setup();
    assert_eq!(r.settle(&mut map, &mut h, &mut bus), ReconcileState::Idle);

    add_layer(&mut h, "adm1".into());
    add_layer(&mut h, "flood".into());
    assert_eq!(
        r.settle(&mut map, &mut h, &mut bus),
        ReconcileState::LayersConsistent
    );
    assert_eq!(h.get(DATE_KEY).as_deref(), Some("2024-01-02"));
    assert_eq!(map.display_layers()[0].id.as_str(), "adm1");

    // Composite borrows flood's dates, so the pair stays consistent.
    add_layer(&mut h, "flood_risk".into());
    select_date(&mut h, map.selected_date().unwrap() - chrono::Duration::days(1));
    assert_eq!(
        r.settle(&mut map, &mut h, &mut bus),
        ReconcileState::LayersConsistent
    );
    assert_eq!(h.get(DATE_KEY).as_deref(), Some("2024-01-01"));
    assert!(bus.posted().is_empty());

    // Storm shares no day with either flood layer. The pass evicts flood_risk,
    // then flood, and snaps the date onto storm's only day.
    add_layer(&mut h, "storm".into());
    assert_eq!(
        r.observe(&mut map, &mut h, &mut bus),
        Some(ReconcileState::LayersConflicting)
    );
    assert_eq!(h.get(LAYER_IDS_KEY).as_deref(), Some("adm1,storm"));
    assert!(r.overlap_reported());

    assert_eq!(
        r.settle(&mut map, &mut h, &mut bus),
        ReconcileState::LayersConsistent
    );
    assert_eq!(h.get(DATE_KEY).as_deref(), Some("2024-01-03"));

    let messages: Vec<String> = bus
        .drain()
        .into_iter()
        .map(|p| p.notification.message)
        .collect();
    assert_eq!(
        messages,
        vec![
            "No dates overlap between Storm surge and Flood risk. Flood risk has been removed."
                .to_string(),
            "No dates overlap between Storm surge and Flood extent. Flood extent has been removed."
                .to_string(),
            "No data for Storm surge on 2024-01-01. The closest date, 2024-01-03, has been loaded instead."
                .to_string(),
        ]
    );
}

#[test]
fn clearing_layer_ids_returns_to_idle_and_resets_overlap_trigger() {
    let (mut r, mut map, mut h, mut bus) = setup();
    add_layer(&mut h, "flood".into());
    add_layer(&mut h, "storm".into());
    assert_eq!(
        r.observe(&mut map, &mut h, &mut bus),
        Some(ReconcileState::LayersConflicting)
    );
    assert!(r.overlap_reported());

    remove_layer(&mut h, &"storm".into());
    assert_eq!(h.get(LAYER_IDS_KEY), None);
    assert_eq!(r.settle(&mut map, &mut h, &mut bus), ReconcileState::Idle);
    assert!(!r.overlap_reported());
    assert!(map.selected_layers().is_empty());
}

#[test]
fn unlisted_layer_does_not_hold_the_view_in_waiting() {
    let (mut r, mut map, mut h, mut bus) = setup();
    h.update(LAYER_IDS_KEY, "storm,flood_risk");
    map.available_dates_mut().remove(&"flood".into());

    // flood_risk borrows flood's dates, which the server no longer lists.
    assert_eq!(
        r.observe(&mut map, &mut h, &mut bus),
        Some(ReconcileState::LayersConflicting)
    );
    assert_eq!(h.get(LAYER_IDS_KEY).as_deref(), Some("flood_risk"));
    assert_eq!(
        r.settle(&mut map, &mut h, &mut bus),
        ReconcileState::LayersConsistent
    );
    assert_eq!(bus.posted().len(), 1);
}
