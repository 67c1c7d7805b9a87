use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::season::EpisodeRef;

/// Saved playback position for a movie, stored under `users/{uid}/progress/{movieId}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Saved playback position for one episode
///
/// Stored under `users/{uid}/watching/{seriesId}-{season}-{episode}`. Title and
/// thumbnail are denormalized from the episode (or series) at write time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl WatchingRecord {
    /// Document id for an episode record: `{seriesId}-{season}-{episode}`
    pub fn document_id(series_id: &str, episode: EpisodeRef) -> String {
        format!("{}-{}-{}", series_id, episode.season_number, episode.episode_number)
    }

    pub fn episode(&self) -> Option<EpisodeRef> {
        match (self.season_number, self.episode_number) {
            (Some(season), Some(episode)) => Some(EpisodeRef::new(season, episode)),
            _ => None,
        }
    }
}

/// Entry of the denormalized `watching` array kept on the user record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchingSummary {
    #[serde(default)]
    pub series_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl WatchingSummary {
    pub fn episode(&self) -> Option<EpisodeRef> {
        match (self.season_number, self.episode_number) {
            (Some(season), Some(episode)) => Some(EpisodeRef::new(season, episode)),
            _ => None,
        }
    }
}

/// The `users/{uid}` document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub watching: Vec<WatchingSummary>,
}

impl UserRecord {
    pub fn is_watching(&self, series_id: &str) -> bool {
        self.watching.iter().any(|w| w.series_id == series_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_watching_record_document_id() {
        assert_eq!(WatchingRecord::document_id("s9", EpisodeRef::new(2, 7)), "s9-2-7");
    }

    #[test]
    fn test_user_record_tolerates_missing_watching() {
        let user: UserRecord = serde_json::from_value(json!({ "email": "a@b.c" })).unwrap();
        assert!(user.watching.is_empty());
        assert!(!user.is_watching("s1"));
    }
}
