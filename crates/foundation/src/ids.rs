use std::fmt;

use serde::{Deserialize, Serialize};

/// Layer identifier as it appears in the layer config and the address bar.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        LayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        LayerId(s.to_string())
    }
}

impl From<String> for LayerId {
    fn from(s: String) -> Self {
        LayerId(s)
    }
}

impl AsRef<str> for LayerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parses a comma-separated id list (`"a,b,,c"`). Blank segments are skipped.
pub fn parse_layer_ids(raw: &str) -> Vec<LayerId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(LayerId::from)
        .collect()
}

pub fn join_layer_ids(ids: &[LayerId]) -> String {
    ids.iter()
        .map(LayerId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::{LayerId, join_layer_ids, parse_layer_ids};

    #[test]
    fn parse_skips_blank_segments() {
        let ids = parse_layer_ids(" flood,,storm , ");
        assert_eq!(ids, vec![LayerId::from("flood"), LayerId::from("storm")]);
    }

    #[test]
    fn join_round_trips_order() {
        let ids = vec![LayerId::from("b"), LayerId::from("a")];
        assert_eq!(join_layer_ids(&ids), "b,a");
        assert!(parse_layer_ids("").is_empty());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&LayerId::from("rain")).unwrap();
        assert_eq!(json, "\"rain\"");
    }
}
