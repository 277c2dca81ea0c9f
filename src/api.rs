// Wire shapes shared with the backend service.

use serde::Deserialize;
use serde_json::Value;

/// One raw catalog item as the backend returns it: an open-ended mapping of
/// backend-defined fields. Normalization (see `mapping`) turns this into a
/// `MediaItem`.
pub type RawItem = serde_json::Map<String, Value>;

/// Paginated list body. Older backend revisions used `items`, newer ones
/// `results`; accept both.
#[derive(Debug, Default, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub results: Option<Vec<RawItem>>,
    #[serde(default)]
    pub items: Option<Vec<RawItem>>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
}

impl ListResponse {
    pub fn into_items(self) -> Vec<RawItem> {
        self.results.or(self.items).unwrap_or_default()
    }
}
