use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::title::TitleKind;

/// Saved-for-later entry, stored under `users/{uid}/watchlist/{id}`
///
/// Carries a snapshot of the title so lists can render without re-fetching it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    #[serde(default)]
    pub id: String,
    /// Raw type label; older entries use `movies`
    #[serde(rename = "type", default)]
    pub kind_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl WatchlistEntry {
    pub fn new(id: impl Into<String>, kind: TitleKind, added_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind_label: kind.as_str().to_string(),
            title: None,
            thumbnail_url: None,
            added_at: Some(added_at),
        }
    }

    /// Normalized kind; `None` for entries without a recognizable type
    pub fn kind(&self) -> Option<TitleKind> {
        TitleKind::parse_label(&self.kind_label)
    }
}
