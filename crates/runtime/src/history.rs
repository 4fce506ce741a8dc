use url::form_urlencoded;

/// Address-bar key holding the comma-separated list of selected layer ids.
pub const LAYER_IDS_KEY: &str = "hazardLayerIds";
/// Address-bar key holding the selected date.
pub const DATE_KEY: &str = "date";

/// Browsable URL state, as seen by the reconciler.
pub trait UrlHistory {
    fn get(&self, key: &str) -> Option<String>;
    fn update(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// Query-string backed history. Keeps parameter order and every pushed URL.
#[derive(Debug, Default, Clone)]
pub struct MemoryHistory {
    params: Vec<(String, String)>,
    entries: Vec<String>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `a=1&b=2`, with or without a leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut params: Vec<(String, String)> = Vec::new();
        for (k, v) in form_urlencoded::parse(query.as_bytes()) {
            // Last occurrence wins, first position is kept.
            match params.iter_mut().find(|(key, _)| k == key.as_str()) {
                Some(slot) => slot.1 = v.into_owned(),
                None => params.push((k.into_owned(), v.into_owned())),
            }
        }
        Self {
            params,
            entries: Vec::new(),
        }
    }

    pub fn query_string(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.params {
            ser.append_pair(k, v);
        }
        ser.finish()
    }

    /// Query strings pushed by `update`/`remove`, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    fn push_entry(&mut self) {
        let q = self.query_string();
        tracing::debug!(query = %q, "history push");
        self.entries.push(q);
    }
}

impl UrlHistory for MemoryHistory {
    fn get(&self, key: &str) -> Option<String> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn update(&mut self, key: &str, value: &str) {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(slot) if slot.1 == value => return,
            Some(slot) => slot.1 = value.to_string(),
            None => self.params.push((key.to_string(), value.to_string())),
        }
        self.push_entry();
    }

    fn remove(&mut self, key: &str) {
        let before = self.params.len();
        self.params.retain(|(k, _)| k != key);
        if self.params.len() != before {
            self.push_entry();
        }
    }
}
