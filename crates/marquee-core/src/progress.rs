//! Playback progress: resume points, display fractions and the per-session
//! state machine that persists positions while a title plays

use chrono::{DateTime, Duration, Utc};
use marquee_config::PlaybackConfig;
use marquee_models::{EpisodeRef, ProgressRecord, WatchingRecord, WatchingSummary};
use marquee_store::{to_fields, DocumentPath, DocumentStore, Fields, StoreError, WriteOp};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ProgressSettings {
    pub save_interval: Duration,
    pub resume_rewind_secs: f64,
    pub rewatch_threshold: f64,
    pub completed_recent: Duration,
    pub display_cap: f64,
}

impl From<&PlaybackConfig> for ProgressSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            save_interval: Duration::seconds(config.save_interval_secs.min(86_400) as i64),
            resume_rewind_secs: config.resume_rewind_secs,
            rewatch_threshold: config.rewatch_threshold,
            completed_recent: Duration::hours(config.completed_recent_hours.clamp(0, 24 * 365)),
            display_cap: config.display_cap,
        }
    }
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

/// Raw watched fraction, 0 when the duration is unknown
pub fn progress_fraction(current_time: f64, duration: f64) -> f64 {
    if duration > 0.0 && current_time.is_finite() && duration.is_finite() {
        current_time / duration
    } else {
        0.0
    }
}

/// Fraction clamped to `[0, cap]` for progress bars
pub fn display_progress(current_time: f64, duration: f64, cap: f64) -> f64 {
    progress_fraction(current_time, duration).clamp(0.0, cap)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeReason {
    NoRecord,
    /// Completed within the recent window
    RecentlyCompleted,
    Completed,
    /// Past the rewatch threshold
    NearlyFinished,
    Resumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResumePoint {
    pub position: f64,
    pub reason: ResumeReason,
}

impl ResumePoint {
    fn start(reason: ResumeReason) -> Self {
        Self { position: 0.0, reason }
    }
}

/// Fields of a saved record that decide where playback resumes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedPosition {
    pub current_time: f64,
    pub duration: f64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&ProgressRecord> for SavedPosition {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            current_time: record.current_time,
            duration: record.duration,
            completed: record.completed,
            completed_at: record.completed_at,
        }
    }
}

impl From<&WatchingRecord> for SavedPosition {
    fn from(record: &WatchingRecord) -> Self {
        Self {
            current_time: record.current_time,
            duration: record.duration,
            completed: record.completed,
            completed_at: record.completed_at,
        }
    }
}

/// Where playback should start given the saved record
///
/// Completed titles always restart; the recent/old split only changes the reason.
pub fn resume_point(saved: Option<&SavedPosition>, now: DateTime<Utc>, settings: &ProgressSettings) -> ResumePoint {
    let Some(saved) = saved else {
        return ResumePoint::start(ResumeReason::NoRecord);
    };

    if saved.completed {
        let recent = saved
            .completed_at
            .map(|at| now - at < settings.completed_recent)
            .unwrap_or(false);
        return ResumePoint::start(if recent {
            ResumeReason::RecentlyCompleted
        } else {
            ResumeReason::Completed
        });
    }

    if saved.current_time <= 0.0 || saved.duration <= 0.0 {
        return ResumePoint::start(ResumeReason::NoRecord);
    }

    if progress_fraction(saved.current_time, saved.duration) > settings.rewatch_threshold {
        return ResumePoint::start(ResumeReason::NearlyFinished);
    }

    ResumePoint {
        position: (saved.current_time - settings.resume_rewind_secs).max(0.0),
        reason: ResumeReason::Resumed,
    }
}

/// What is being played
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackTarget {
    Movie {
        movie_id: String,
    },
    Episode {
        series_id: String,
        episode: EpisodeRef,
        /// Denormalized onto the watching record
        title: String,
        thumbnail_url: Option<String>,
    },
}

impl PlaybackTarget {
    pub fn movie(movie_id: impl Into<String>) -> Self {
        PlaybackTarget::Movie { movie_id: movie_id.into() }
    }

    /// Path of the record holding this target's progress for `uid`
    pub fn record_path(&self, uid: &str) -> DocumentPath {
        match self {
            PlaybackTarget::Movie { movie_id } => DocumentPath::new(format!("users/{}/progress", uid), movie_id.clone()),
            PlaybackTarget::Episode { series_id, episode, .. } => DocumentPath::new(
                format!("users/{}/watching", uid),
                WatchingRecord::document_id(series_id, *episode),
            ),
        }
    }

    fn summary(&self) -> Option<WatchingSummary> {
        match self {
            PlaybackTarget::Movie { .. } => None,
            PlaybackTarget::Episode { series_id, episode, title, thumbnail_url } => Some(WatchingSummary {
                series_id: series_id.clone(),
                season_number: Some(episode.season_number),
                episode_number: Some(episode.episode_number),
                title: Some(title.clone()),
                thumbnail_url: Some(thumbnail_url.clone().unwrap_or_default()),
            }),
        }
    }

    /// Fields identifying the episode, written alongside every episode update
    fn identity_fields(&self) -> Fields {
        let mut fields = Fields::new();
        if let PlaybackTarget::Episode { series_id, episode, title, thumbnail_url } = self {
            fields.insert("seriesId".into(), json!(series_id));
            fields.insert("seasonNumber".into(), json!(episode.season_number));
            fields.insert("episodeNumber".into(), json!(episode.episode_number));
            fields.insert("title".into(), json!(title));
            fields.insert("thumbnailUrl".into(), json!(thumbnail_url.clone().unwrap_or_default()));
        }
        fields
    }
}

impl std::fmt::Display for PlaybackTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackTarget::Movie { movie_id } => write!(f, "movie {}", movie_id),
            PlaybackTarget::Episode { series_id, episode, .. } => write!(f, "series {} {}", series_id, episode),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoUser,
    NotPlaying,
    UnknownDuration,
    InvalidPosition,
    Throttled,
}

/// Result of a progress write; failures are reported here and never raised
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum PersistOutcome {
    Saved,
    Skipped(SkipReason),
    Failed(String),
}

/// One playback of one title by one user
pub struct PlaybackSession {
    store: Arc<dyn DocumentStore>,
    uid: Option<String>,
    target: PlaybackTarget,
    settings: ProgressSettings,
    state: PlaybackState,
    last_attempt: Option<DateTime<Utc>>,
    last_position: Option<(f64, f64)>,
    record_exists: bool,
}

impl PlaybackSession {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        uid: Option<String>,
        target: PlaybackTarget,
        settings: ProgressSettings,
    ) -> Self {
        Self {
            store,
            uid,
            target,
            settings,
            state: PlaybackState::Idle,
            last_attempt: None,
            last_position: None,
            record_exists: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn target(&self) -> &PlaybackTarget {
        &self.target
    }

    /// Read the saved record and decide where to start; read failures start at 0
    pub async fn start(&mut self, now: DateTime<Utc>) -> ResumePoint {
        self.state = PlaybackState::Loading;

        let saved = match self.load_saved().await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Failed to read saved progress for {}: {}", self.target, e);
                None
            }
        };
        if let Some(saved) = &saved {
            self.record_exists = true;
            if saved.duration > 0.0 {
                self.last_position = Some((saved.current_time, saved.duration));
            }
        }

        let resume = resume_point(saved.as_ref(), now, &self.settings);
        debug!("Resuming {} at {:.1}s ({:?})", self.target, resume.position, resume.reason);
        self.state = PlaybackState::Playing;
        resume
    }

    async fn load_saved(&self) -> Result<Option<SavedPosition>, StoreError> {
        let Some(uid) = &self.uid else {
            return Ok(None);
        };
        let Some(doc) = self.store.get(&self.target.record_path(uid)).await? else {
            return Ok(None);
        };
        let saved = match self.target {
            PlaybackTarget::Movie { .. } => SavedPosition::from(&doc.decode::<ProgressRecord>()?),
            PlaybackTarget::Episode { .. } => SavedPosition::from(&doc.decode::<WatchingRecord>()?),
        };
        Ok(Some(saved))
    }

    /// Persist the position at most once per save interval
    pub async fn on_time_update(&mut self, position: f64, duration: f64, now: DateTime<Utc>) -> PersistOutcome {
        if self.state != PlaybackState::Playing {
            return PersistOutcome::Skipped(SkipReason::NotPlaying);
        }
        if !(duration > 0.0 && duration.is_finite()) {
            return PersistOutcome::Skipped(SkipReason::UnknownDuration);
        }
        if !position.is_finite() {
            return PersistOutcome::Skipped(SkipReason::InvalidPosition);
        }
        self.last_position = Some((position, duration));

        let Some(uid) = self.uid.clone() else {
            return PersistOutcome::Skipped(SkipReason::NoUser);
        };
        if let Some(last) = self.last_attempt {
            if now - last < self.settings.save_interval {
                return PersistOutcome::Skipped(SkipReason::Throttled);
            }
        }
        self.last_attempt = Some(now);

        let mut data = self.target.identity_fields();
        data.insert("currentTime".into(), json!(position));
        data.insert("duration".into(), json!(duration));
        data.insert("updatedAt".into(), json!(now));

        let mut batch = vec![WriteOp::Merge { path: self.target.record_path(&uid), data }];
        if !self.record_exists && self.needs_watching_entry(&uid).await {
            if let Some(op) = self.watching_union(&uid) {
                batch.push(op);
            }
        }

        match self.store.commit(batch).await {
            Ok(()) => {
                self.record_exists = true;
                debug!("Saved progress for {} at {:.1}/{:.1}", self.target, position, duration);
                PersistOutcome::Saved
            }
            Err(e) => {
                warn!("Failed to save progress for {}: {}", self.target, e);
                PersistOutcome::Failed(e.to_string())
            }
        }
    }

    /// Mark the target completed, keeping the last known position
    pub async fn on_ended(&mut self, now: DateTime<Utc>) -> PersistOutcome {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Completed) {
            return PersistOutcome::Skipped(SkipReason::NotPlaying);
        }
        self.state = PlaybackState::Completed;

        let Some(uid) = self.uid.clone() else {
            return PersistOutcome::Skipped(SkipReason::NoUser);
        };

        let mut data = self.target.identity_fields();
        data.insert("completed".into(), Value::Bool(true));
        data.insert("completedAt".into(), json!(now));
        if let Some((position, duration)) = self.last_position {
            data.insert("currentTime".into(), json!(position));
            data.insert("duration".into(), json!(duration));
            data.insert("updatedAt".into(), json!(now));
        }

        let mut batch = vec![WriteOp::Merge { path: self.target.record_path(&uid), data }];
        if self.needs_watching_entry(&uid).await {
            if let Some(op) = self.watching_union(&uid) {
                batch.push(op);
            }
        }

        match self.store.commit(batch).await {
            Ok(()) => {
                self.record_exists = true;
                info!("Marked {} as completed", self.target);
                PersistOutcome::Saved
            }
            Err(e) => {
                warn!("Failed to mark {} as completed: {}", self.target, e);
                PersistOutcome::Failed(e.to_string())
            }
        }
    }

    async fn needs_watching_entry(&self, uid: &str) -> bool {
        let PlaybackTarget::Episode { series_id, .. } = &self.target else {
            return false;
        };
        match self.store.get(&DocumentPath::new("users", uid)).await {
            Ok(Some(doc)) => match doc.decode::<marquee_models::UserRecord>() {
                Ok(user) => !user.is_watching(series_id),
                Err(_) => true,
            },
            Ok(None) => true,
            Err(e) => {
                debug!("Could not read user record for {}: {}", uid, e);
                true
            }
        }
    }

    fn watching_union(&self, uid: &str) -> Option<WriteOp> {
        let summary = self.target.summary()?;
        let value = to_fields(&summary).ok().map(Value::Object)?;
        Some(WriteOp::ArrayUnion {
            path: DocumentPath::new("users", uid),
            field: "watching".to_string(),
            value,
        })
    }
}
