use chrono::NaiveDate;
use foundation::{DateItem, LayerId, midday_utc};
use serde::{Deserialize, Serialize};

/// Kind-specific layer configuration, tagged by `type` in the layer config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    Wms {
        server_layer_name: String,
    },
    AdminLevelData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_url: Option<String>,
    },
    StaticRaster {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_url: Option<String>,
    },
    /// Dates are borrowed from `date_layer`.
    Composite {
        date_layer: LayerId,
    },
    PointData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_url: Option<String>,
    },
    Impact {
        hazard_layer: LayerId,
    },
    Boundary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGroup {
    pub id: String,
    #[serde(default)]
    pub main: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDefinition {
    pub id: LayerId,
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub kind: LayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<LayerGroup>,
    /// Static date list; takes precedence over server-provided dates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<NaiveDate>>,
}

impl LayerDefinition {
    pub fn new(id: impl Into<LayerId>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            kind,
            group: None,
            dates: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_group(mut self, id: impl Into<String>, main: bool) -> Self {
        self.group = Some(LayerGroup {
            id: id.into(),
            main,
        });
        self
    }

    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Self {
        self.dates = Some(dates);
        self
    }

    /// Title for user-facing messages; falls back to the id.
    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            self.id.as_str()
        } else {
            &self.title
        }
    }

    /// Whether the layer takes part in date selection.
    pub fn supports_dates(&self) -> bool {
        let declares = self.dates.is_some();
        match &self.kind {
            LayerKind::Wms { .. } | LayerKind::Composite { .. } => true,
            LayerKind::AdminLevelData { date_url }
            | LayerKind::StaticRaster { date_url }
            | LayerKind::PointData { date_url } => declares || date_url.is_some(),
            LayerKind::Impact { .. } | LayerKind::Boundary => false,
        }
    }

    /// A layer is main unless it belongs to a group as a non-main member.
    pub fn is_main(&self) -> bool {
        self.group.as_ref().is_none_or(|g| g.main)
    }

    /// Layer whose dates this layer uses: the companion for composites, itself otherwise.
    pub fn date_source(&self) -> &LayerId {
        match &self.kind {
            LayerKind::Composite { date_layer } => date_layer,
            _ => &self.id,
        }
    }

    pub fn static_date_items(&self) -> Option<Vec<DateItem>> {
        self.dates.as_ref().map(|days| {
            days.iter()
                .map(|d| DateItem::new(midday_utc(*d)))
                .collect()
        })
    }

    fn display_rank(&self) -> u8 {
        match self.kind {
            LayerKind::Boundary => 0,
            LayerKind::PointData { .. } => 1,
            _ => 2,
        }
    }
}

/// Orders layers for rendering: boundaries first, then point data, then the rest.
/// Stable within each rank, so addition order is otherwise kept.
pub fn sort_for_display(layers: &mut [LayerDefinition]) {
    layers.sort_by_key(LayerDefinition::display_rank);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_tagged_layer_config() {
        let json = r#"{
            "id": "rain",
            "title": "Rainfall",
            "type": "wms",
            "server_layer_name": "rfh_dekad",
            "group": { "id": "rain_group", "main": true }
        }"#;
        let layer: LayerDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(
            layer.kind,
            LayerKind::Wms {
                server_layer_name: "rfh_dekad".to_string()
            }
        );
        assert!(layer.is_main());
        assert!(layer.supports_dates());
    }

    #[test]
    fn date_support_depends_on_kind_and_declared_dates() {
        let admin = LayerDefinition::new("a", LayerKind::AdminLevelData { date_url: None });
        assert!(!admin.supports_dates());
        assert!(admin.clone().with_dates(vec![day(2024, 1, 1)]).supports_dates());

        let raster = LayerDefinition::new(
            "r",
            LayerKind::StaticRaster {
                date_url: Some("https://example.org/dates".into()),
            },
        );
        assert!(raster.supports_dates());

        let impact = LayerDefinition::new(
            "i",
            LayerKind::Impact {
                hazard_layer: "rain".into(),
            },
        );
        assert!(!impact.supports_dates());
        assert!(!LayerDefinition::new("b", LayerKind::Boundary).supports_dates());
    }

    #[test]
    fn non_main_group_member_is_not_main() {
        let l = LayerDefinition::new("x", LayerKind::Boundary).with_group("g", false);
        assert!(!l.is_main());
    }

    #[test]
    fn composite_borrows_date_source() {
        let c = LayerDefinition::new(
            "combo",
            LayerKind::Composite {
                date_layer: "rain".into(),
            },
        );
        assert_eq!(c.date_source().as_str(), "rain");
        let w = LayerDefinition::new(
            "rain",
            LayerKind::Wms {
                server_layer_name: "rfh".into(),
            },
        );
        assert_eq!(w.date_source().as_str(), "rain");
    }

    #[test]
    fn display_sort_puts_boundaries_and_points_first() {
        let wms = |id: &str| {
            LayerDefinition::new(
                id,
                LayerKind::Wms {
                    server_layer_name: id.to_string(),
                },
            )
        };
        let mut layers = vec![
            wms("w1"),
            LayerDefinition::new("pts", LayerKind::PointData { date_url: None }),
            wms("w2"),
            LayerDefinition::new("adm", LayerKind::Boundary),
        ];
        sort_for_display(&mut layers);
        let ids: Vec<&str> = layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["adm", "pts", "w1", "w2"]);
    }

    #[test]
    fn static_dates_are_normalized_items() {
        let l = LayerDefinition::new("s", LayerKind::StaticRaster { date_url: None })
            .with_dates(vec![day(2024, 2, 1)]);
        let items = l.static_date_items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].day(), day(2024, 2, 1));
    }
}
