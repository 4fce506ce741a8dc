use std::collections::BTreeMap;

use foundation::LayerId;
use serde_json::{Map, Value};

use crate::layer::{LayerDefinition, LayerKind};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("layer config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("layer config must be an array, {{\"layers\": [...]}} or an object keyed by id")]
    UnexpectedShape,
    #[error("invalid layer at {at}: {source}")]
    InvalidLayer {
        at: String,
        source: serde_json::Error,
    },
    #[error("duplicate layer id: {0}")]
    DuplicateId(LayerId),
    #[error("layer {layer} references unknown layer {target}")]
    DanglingReference { layer: LayerId, target: LayerId },
}

fn parse_layer(at: String, value: Value) -> Result<LayerDefinition, RegistryError> {
    serde_json::from_value(value).map_err(|source| RegistryError::InvalidLayer { at, source })
}

fn parse_list(items: Vec<Value>) -> Result<Vec<LayerDefinition>, RegistryError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| parse_layer(format!("index {i}"), v))
        .collect()
}

// Values may omit `id`; the key supplies it.
fn parse_keyed(entries: Map<String, Value>) -> Result<Vec<LayerDefinition>, RegistryError> {
    entries
        .into_iter()
        .map(|(key, mut value)| {
            if let Value::Object(obj) = &mut value {
                obj.entry("id").or_insert_with(|| Value::String(key.clone()));
            }
            parse_layer(format!("key {key:?}"), value)
        })
        .collect()
}

/// Read-only keyed collection of layer definitions.
#[derive(Debug, Default, Clone)]
pub struct LayerRegistry {
    layers: BTreeMap<LayerId, LayerDefinition>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry and checks that composite and impact references resolve.
    pub fn from_layers(
        layers: impl IntoIterator<Item = LayerDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for layer in layers {
            if map.contains_key(&layer.id) {
                return Err(RegistryError::DuplicateId(layer.id));
            }
            map.insert(layer.id.clone(), layer);
        }
        let registry = Self { layers: map };
        registry.check_references()?;
        Ok(registry)
    }

    /// Accepts a JSON array of layers, `{ "layers": [...] }`, or an object keyed by
    /// layer id where each value may omit `id`.
    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let layers = match serde_json::from_str::<Value>(raw)? {
            Value::Array(items) => parse_list(items)?,
            Value::Object(mut obj) => match obj.remove("layers") {
                Some(Value::Array(items)) if obj.is_empty() => parse_list(items)?,
                Some(other) => {
                    obj.insert("layers".to_string(), other);
                    parse_keyed(obj)?
                }
                None => parse_keyed(obj)?,
            },
            _ => return Err(RegistryError::UnexpectedShape),
        };
        Self::from_layers(layers)
    }

    fn check_references(&self) -> Result<(), RegistryError> {
        for layer in self.layers.values() {
            let target = match &layer.kind {
                LayerKind::Composite { date_layer } => date_layer,
                LayerKind::Impact { hazard_layer } => hazard_layer,
                _ => continue,
            };
            if !self.layers.contains_key(target) {
                return Err(RegistryError::DanglingReference {
                    layer: layer.id.clone(),
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &LayerId) -> Option<&LayerDefinition> {
        self.layers.get(id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.layers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerDefinition> {
        self.layers.values()
    }

    /// Looks up `ids` in order. Returns the known layers and the unknown ids.
    /// Repeated ids resolve once, at their first position.
    pub fn resolve(&self, ids: &[LayerId]) -> (Vec<LayerDefinition>, Vec<LayerId>) {
        let mut found: Vec<LayerDefinition> = Vec::with_capacity(ids.len());
        let mut unknown: Vec<LayerId> = Vec::new();
        for id in ids {
            if found.iter().any(|l| &l.id == id) || unknown.contains(id) {
                continue;
            }
            match self.layers.get(id) {
                Some(layer) => found.push(layer.clone()),
                None => unknown.push(id.clone()),
            }
        }
        (found, unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const KEYED: &str = r#"{
        "rain": { "title": "Rainfall", "type": "wms", "server_layer_name": "rfh" },
        "rain_anomaly": { "type": "composite", "date_layer": "rain" },
        "adm1": { "type": "boundary" }
    }"#;

    #[test]
    fn loads_keyed_config_and_injects_ids() {
        let reg = LayerRegistry::from_json(KEYED).unwrap();
        assert_eq!(reg.len(), 3);
        let rain = reg.get(&LayerId::from("rain")).unwrap();
        assert_eq!(rain.display_name(), "Rainfall");
        assert!(reg.contains(&LayerId::from("adm1")));
    }

    #[test]
    fn loads_list_and_wrapped_configs() {
        let list = r#"[{ "id": "adm1", "type": "boundary" }]"#;
        let wrapped = r#"{ "layers": [{ "id": "adm1", "type": "boundary" }] }"#;
        assert_eq!(LayerRegistry::from_json(list).unwrap().len(), 1);
        assert_eq!(LayerRegistry::from_json(wrapped).unwrap().len(), 1);
    }

    #[test]
    fn rejects_duplicates_and_dangling_references() {
        let dup = r#"[{ "id": "a", "type": "boundary" }, { "id": "a", "type": "boundary" }]"#;
        assert!(matches!(
            LayerRegistry::from_json(dup),
            Err(RegistryError::DuplicateId(_))
        ));

        let dangling = r#"[{ "id": "c", "type": "composite", "date_layer": "nope" }]"#;
        assert!(matches!(
            LayerRegistry::from_json(dangling),
            Err(RegistryError::DanglingReference { .. })
        ));

        assert!(matches!(
            LayerRegistry::from_json("not json"),
            Err(RegistryError::Json(_))
        ));
    }

    #[test]
    fn bad_layer_error_names_the_entry_and_field() {
        let list = r#"[
            { "id": "adm1", "type": "boundary" },
            { "id": "rain", "type": "wms" }
        ]"#;
        let err = LayerRegistry::from_json(list).unwrap_err();
        assert!(matches!(&err, RegistryError::InvalidLayer { at, .. } if at == "index 1"));
        assert!(err.to_string().contains("server_layer_name"), "{err}");

        let keyed = r#"{ "rain": { "type": "wms" } }"#;
        let err = LayerRegistry::from_json(keyed).unwrap_err();
        assert!(err.to_string().starts_with("invalid layer at key \"rain\""), "{err}");

        assert!(matches!(
            LayerRegistry::from_json("42"),
            Err(RegistryError::UnexpectedShape)
        ));
    }

    #[test]
    fn resolve_splits_known_and_unknown_keeping_order() {
        let reg = LayerRegistry::from_json(KEYED).unwrap();
        let ids: Vec<LayerId> = ["rain_anomaly", "ghost", "rain", "rain_anomaly"]
            .into_iter()
            .map(LayerId::from)
            .collect();
        let (found, unknown) = reg.resolve(&ids);
        let found_ids: Vec<&str> = found.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(found_ids, vec!["rain_anomaly", "rain"]);
        assert_eq!(unknown, vec![LayerId::from("ghost")]);
    }
}
