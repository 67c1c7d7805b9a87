//! Row assembly: continue-watching, watchlist and genre rows
//!
//! Each mode merges store records with catalog titles into [`RowItem`]s.
//! Items whose title (or episode) no longer resolves are dropped without
//! failing the row; only a failure of the mode's primary reads surfaces as
//! [`RowData::error`].

use chrono::{DateTime, Utc};
use futures::future::join_all;
use marquee_models::{
    EpisodeRef, ProgressRecord, RowData, RowItem, TitleKind, UserRecord, WatchingRecord, WatchlistEntry,
};
use marquee_store::{Document, DocumentPath, DocumentStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use crate::catalog::Catalog;
use crate::collate::sort_by_title;
use crate::error::CoreResult;
use crate::progress::{display_progress, ProgressSettings};
use crate::watchlist::Watchlist;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowMode {
    ContinueWatching,
    Watchlist,
    BrowseByGenre { genre: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRequest {
    pub uid: Option<String>,
    pub kind: Option<TitleKind>,
    pub mode: RowMode,
}

/// Shared flag telling an in-flight load whether its result is still wanted
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// The consumer went away; pending results are discarded
    pub fn end(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-progress item before its title is resolved
#[derive(Debug, Clone)]
enum Pending {
    Movie {
        id: String,
        current_time: f64,
        duration: f64,
    },
    /// Candidate positions, newest first; the first that resolves is shown
    Series { id: String, points: Vec<SeriesPoint> },
}

#[derive(Debug, Clone)]
struct SeriesPoint {
    episode: Option<EpisodeRef>,
    current_time: f64,
    duration: f64,
    updated_at: Option<DateTime<Utc>>,
}

impl Pending {
    fn kind(&self) -> TitleKind {
        match self {
            Pending::Movie { .. } => TitleKind::Movie,
            Pending::Series { .. } => TitleKind::Series,
        }
    }
}

#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn DocumentStore>,
    catalog: Catalog,
    watchlist: Watchlist,
    display_cap: f64,
}

impl Aggregator {
    pub fn new(catalog: Catalog, settings: &ProgressSettings) -> Self {
        let store = catalog.store().clone();
        Self {
            watchlist: Watchlist::new(store.clone()),
            store,
            catalog,
            display_cap: settings.display_cap,
        }
    }

    /// Load one row; failures are reported through `RowData::error`
    pub async fn load(&self, request: &RowRequest) -> RowData {
        let uid = request.uid.as_deref().filter(|u| !u.is_empty());
        let result = match &request.mode {
            RowMode::ContinueWatching => self.continue_watching(uid, request.kind).await,
            RowMode::Watchlist => self.watchlist(uid, request.kind).await,
            RowMode::BrowseByGenre { genre } => self.browse(request.kind, genre.as_deref()).await,
        };
        match result {
            Ok(items) => RowData::loaded(items),
            Err(e) => {
                warn!("Failed to load {:?} row: {}", request.mode, e);
                RowData::failed(e.to_string())
            }
        }
    }

    /// Load a row into `slot`, touching it only while `liveness` holds
    ///
    /// Returns false when the result was discarded.
    pub async fn load_into(&self, request: &RowRequest, slot: &RwLock<RowData>, liveness: &Liveness) -> bool {
        if !liveness.is_live() {
            return false;
        }
        *slot.write().await = RowData::loading();

        let data = self.load(request).await;
        if !liveness.is_live() {
            debug!("Discarding {:?} row loaded after teardown", request.mode);
            return false;
        }
        *slot.write().await = data;
        true
    }

    pub async fn continue_watching(&self, uid: Option<&str>, kind: Option<TitleKind>) -> CoreResult<Vec<RowItem>> {
        let Some(uid) = uid else {
            return Ok(Vec::new());
        };

        let progress_collection = format!("users/{}/progress", uid);
        let watching_collection = format!("users/{}/watching", uid);
        let user_path = DocumentPath::new("users", uid);
        let (progress_docs, watching_docs, user_doc) = futures::try_join!(
            self.store.list(&progress_collection),
            self.store.list(&watching_collection),
            self.store.get(&user_path)
        )?;

        let user = user_doc
            .map(|doc| doc.decode::<UserRecord>())
            .transpose()
            .unwrap_or_else(|e| {
                warn!("Ignoring malformed user record for {}: {}", uid, e);
                None
            })
            .unwrap_or_default();

        let pending: Vec<Pending> = merge_pending(&progress_docs, &watching_docs, &user)
            .into_iter()
            .filter(|p| kind.map_or(true, |k| p.kind() == k))
            .collect();

        let resolved = join_all(pending.iter().map(|p| self.resolve_pending(p))).await;
        let items: Vec<RowItem> = resolved.into_iter().flatten().collect();
        info!("Continue watching for {}: {} of {} entries resolved", uid, items.len(), pending.len());
        Ok(items)
    }

    /// Walk a series' points newest first; orphaned episodes are skipped
    async fn first_resolved_point(
        &self,
        series_id: &str,
        points: &[SeriesPoint],
    ) -> Option<(f64, f64, Option<EpisodeRef>, Option<f64>)> {
        for point in points {
            let Some(episode) = point.episode else {
                return Some((point.current_time, point.duration, None, None));
            };
            match self
                .catalog
                .resolve_episode(series_id, episode.season_number, episode.episode_number)
                .await
            {
                Ok(Some(resolved)) => {
                    return Some((point.current_time, point.duration, Some(episode), resolved.episode.duration))
                }
                Ok(None) => debug!("Skipping {} of series {}: episode not found", episode, series_id),
                Err(e) => debug!("Skipping {} of series {}: {}", episode, series_id, e),
            }
        }
        debug!("Dropping series {} from continue watching: no position resolves", series_id);
        None
    }

    async fn resolve_pending(&self, pending: &Pending) -> Option<RowItem> {
        let kind = pending.kind();
        let id = match pending {
            Pending::Movie { id, .. } | Pending::Series { id, .. } => id,
        };
        let title = match self.catalog.find_title(kind, id).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                debug!("Dropping {} {} from continue watching: title not found", kind, id);
                return None;
            }
            Err(e) => {
                debug!("Dropping {} {} from continue watching: {}", kind, id, e);
                return None;
            }
        };

        let (current_time, duration, episode, fallback_duration) = match pending {
            Pending::Movie { current_time, duration, .. } => (*current_time, *duration, None, title.duration()),
            Pending::Series { points, .. } => self.first_resolved_point(id, points).await?,
        };

        let effective_duration = if duration > 0.0 {
            duration
        } else {
            fallback_duration.filter(|d| *d > 0.0).unwrap_or(0.0)
        };

        let mut item = RowItem::from_title(title);
        item.progress = Some(display_progress(current_time, effective_duration, self.display_cap));
        item.current_time = Some(current_time);
        item.duration = (effective_duration > 0.0).then_some(effective_duration);
        item.episode = episode;
        Some(item)
    }

    pub async fn watchlist(&self, uid: Option<&str>, kind: Option<TitleKind>) -> CoreResult<Vec<RowItem>> {
        let Some(uid) = uid else {
            return Ok(Vec::new());
        };

        let entries: Vec<WatchlistEntry> = self.watchlist.list(uid).await?;
        let wanted: Vec<(TitleKind, String)> = entries
            .iter()
            .filter_map(|entry| match entry.kind() {
                Some(k) => Some((k, entry.id.clone())),
                None => {
                    debug!("Skipping watchlist entry {} with type '{}'", entry.id, entry.kind_label);
                    None
                }
            })
            .filter(|(k, _)| kind.map_or(true, |wanted| *k == wanted))
            .collect();

        let titles = join_all(wanted.iter().map(|(k, id)| self.catalog.find_title(*k, id))).await;
        let mut items: Vec<RowItem> = titles
            .into_iter()
            .zip(&wanted)
            .filter_map(|(result, (k, id))| match result {
                Ok(Some(title)) => Some(RowItem::from_title(title)),
                Ok(None) => {
                    debug!("Dropping watchlist entry {} {}: title not found", k, id);
                    None
                }
                Err(e) => {
                    debug!("Dropping watchlist entry {} {}: {}", k, id, e);
                    None
                }
            })
            .collect();

        sort_by_title(&mut items, |item| item.title.name());
        Ok(items)
    }

    /// Genre row for one kind, or both kinds merged and sorted by title
    ///
    /// When both kinds are requested a failure of one kind is logged and the
    /// other kind is still shown.
    pub async fn browse(&self, kind: Option<TitleKind>, genre: Option<&str>) -> CoreResult<Vec<RowItem>> {
        if let Some(kind) = kind {
            let titles = self.catalog.by_genre(kind, genre).await?;
            return Ok(titles.into_iter().map(RowItem::from_title).collect());
        }

        let (movies, series) = futures::join!(
            self.catalog.by_genre(TitleKind::Movie, genre),
            self.catalog.by_genre(TitleKind::Series, genre)
        );
        let (movies, series) = match (movies, series) {
            (Err(e), Err(_)) => return Err(e),
            (movies, series) => (
                movies.unwrap_or_else(|e| {
                    warn!("Movies unavailable for genre row: {}", e);
                    Vec::new()
                }),
                series.unwrap_or_else(|e| {
                    warn!("Series unavailable for genre row: {}", e);
                    Vec::new()
                }),
            ),
        };

        let mut items: Vec<RowItem> = movies.into_iter().chain(series).map(RowItem::from_title).collect();
        sort_by_title(&mut items, |item| item.title.name());
        Ok(items)
    }
}

/// Merge movie progress, episode records and the denormalized watching list
///
/// Episode records group per series, newest `updatedAt` first; the watching
/// list entry for a series is its last fallback.
fn merge_pending(progress_docs: &[Document], watching_docs: &[Document], user: &UserRecord) -> Vec<Pending> {
    let mut pending = Vec::new();

    for doc in progress_docs {
        match doc.decode::<ProgressRecord>() {
            Ok(record) => pending.push(Pending::Movie {
                id: doc.id.clone(),
                current_time: record.current_time,
                duration: record.duration,
            }),
            Err(e) => warn!("Skipping malformed progress record: {}", e),
        }
    }

    let mut series_order: Vec<String> = Vec::new();
    let mut series_points: HashMap<String, Vec<SeriesPoint>> = HashMap::new();
    for doc in watching_docs {
        let record = match doc.decode::<WatchingRecord>() {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed watching record: {}", e);
                continue;
            }
        };
        let series_id = record
            .series_id
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| doc.id.split('-').next().map(str::to_string))
            .unwrap_or_default();
        if series_id.is_empty() {
            continue;
        }

        let point = SeriesPoint {
            episode: record.episode(),
            current_time: record.current_time,
            duration: record.duration,
            updated_at: record.updated_at,
        };
        series_points
            .entry(series_id.clone())
            .or_insert_with(|| {
                series_order.push(series_id);
                Vec::new()
            })
            .push(point);
    }

    for points in series_points.values_mut() {
        // None sorts before Some, so reversing puts undated records last
        points.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }

    for summary in &user.watching {
        if summary.series_id.is_empty() {
            continue;
        }
        let point = SeriesPoint {
            episode: summary.episode(),
            current_time: 0.0,
            duration: 0.0,
            updated_at: None,
        };
        series_points
            .entry(summary.series_id.clone())
            .or_insert_with(|| {
                series_order.push(summary.series_id.clone());
                Vec::new()
            })
            .push(point);
    }

    for id in series_order {
        if let Some(points) = series_points.remove(&id) {
            pending.push(Pending::Series { id, points });
        }
    }

    pending
}

#[cfg(test)]
mod tests;
