use serde::Serialize;
use crate::season::EpisodeRef;
use crate::title::{Title, TitleKind};

/// A title ready for rendering in a row, with optional playback state
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RowItem {
    #[serde(flatten)]
    pub title: Title,
    /// Clamped progress fraction, only set for continue-watching rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Episode being watched, for series in continue-watching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeRef>,
}

impl RowItem {
    pub fn from_title(title: Title) -> Self {
        Self {
            title,
            progress: None,
            current_time: None,
            duration: None,
            episode: None,
        }
    }

    pub fn kind(&self) -> TitleKind {
        self.title.kind()
    }
}

/// Result of loading a row: items, a loading flag and a mode-level error
///
/// Per-item failures never set `error`; they only shrink `items`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RowData {
    pub items: Vec<RowItem>,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RowData {
    pub fn loading() -> Self {
        Self {
            items: Vec::new(),
            loading: true,
            error: None,
        }
    }

    pub fn loaded(items: Vec<RowItem>) -> Self {
        Self {
            items,
            loading: false,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: Some(error.into()),
        }
    }
}
