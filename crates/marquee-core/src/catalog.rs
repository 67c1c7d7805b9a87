//! Read access to titles, seasons and episodes, plus admin-only curation
//!
//! Every catalog read goes through [`Catalog`]. Documents that fail to decode
//! are logged and skipped so one malformed title never hides a whole row.

use futures::future::join_all;
use marquee_config::Config;
use marquee_models::{Episode, EpisodeRef, Movie, Season, SeasonPlan, Series, Title, TitleKind};
use marquee_store::{to_fields, Direction, Document, DocumentPath, DocumentStore, Fields, Query, StoreError, WriteOp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::collate::sort_by_title;
use crate::error::{CoreError, CoreResult};
use crate::session::{AdminGate, Identity};

/// A season together with one of its episodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEpisode {
    pub season: Season,
    pub episode: Episode,
}

impl ResolvedEpisode {
    pub fn episode_ref(&self) -> EpisodeRef {
        EpisodeRef::new(self.season.number, self.episode.number)
    }
}

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
    page_size: usize,
    gate: AdminGate,
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            gate: AdminGate::default(),
        }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self::new(store, config.catalog.page_size).with_admin_gate(AdminGate::from_config(&config.admin))
    }

    pub fn with_admin_gate(mut self, gate: AdminGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn admin_gate(&self) -> &AdminGate {
        &self.gate
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Titles of `kind` in `genre`, or an unfiltered page when no genre is given
    ///
    /// Matches on the `genres` array first; only when that finds nothing does
    /// it fall back to the legacy single `genre` field.
    pub async fn by_genre(&self, kind: TitleKind, genre: Option<&str>) -> CoreResult<Vec<Title>> {
        let collection = kind.collection();
        let genre = genre.map(str::trim).filter(|g| !g.is_empty());

        let Some(genre) = genre else {
            let docs = self.store.query(&Query::collection(collection).limit(self.page_size)).await?;
            return Ok(decode_titles(kind, &docs));
        };

        let docs = self
            .store
            .query(&Query::collection(collection).where_array_contains("genres", genre))
            .await?;
        if !docs.is_empty() {
            return Ok(decode_titles(kind, &docs));
        }

        debug!("No {} with genres containing '{}', trying legacy genre field", collection, genre);
        let docs = self
            .store
            .query(&Query::collection(collection).where_eq("genre", genre))
            .await?;
        Ok(decode_titles(kind, &docs))
    }

    pub async fn find_title(&self, kind: TitleKind, id: &str) -> CoreResult<Option<Title>> {
        if id.is_empty() || id.contains('/') {
            return Ok(None);
        }
        let Some(doc) = self.store.get(&DocumentPath::new(kind.collection(), id)).await? else {
            return Ok(None);
        };
        Ok(Some(decode_title(kind, &doc)?))
    }

    pub async fn get_title(&self, kind: TitleKind, id: &str) -> CoreResult<Title> {
        self.find_title(kind, id)
            .await?
            .ok_or_else(|| CoreError::not_found(kind.as_str(), id))
    }

    pub async fn list_titles(&self, kind: TitleKind) -> CoreResult<Vec<Title>> {
        let docs = self.store.list(kind.collection()).await?;
        Ok(decode_titles(kind, &docs))
    }

    /// Case-insensitive substring match on title over movies and series
    pub async fn search(&self, term: &str) -> CoreResult<Vec<Title>> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let (movies, series) = futures::try_join!(
            self.list_titles(TitleKind::Movie),
            self.list_titles(TitleKind::Series)
        )?;

        let mut matches: Vec<Title> = movies
            .into_iter()
            .chain(series)
            .filter(|t| t.name().to_lowercase().contains(&needle))
            .collect();
        sort_by_title(&mut matches, |t| t.name());
        debug!("Search '{}' matched {} titles", term, matches.len());
        Ok(matches)
    }

    pub async fn seasons(&self, series_id: &str) -> CoreResult<Vec<Season>> {
        let docs = self
            .store
            .query(&Query::collection(seasons_collection(series_id)).order_by("number", Direction::Ascending))
            .await?;
        Ok(decode_all(&docs))
    }

    pub async fn find_season(&self, series_id: &str, number: u32) -> CoreResult<Option<Season>> {
        let docs = self
            .store
            .query(&Query::collection(seasons_collection(series_id)).where_eq("number", number).limit(1))
            .await?;
        Ok(decode_all::<Season>(&docs).into_iter().next())
    }

    /// Episodes of one season ordered by number; empty when the season does not exist
    pub async fn episodes(&self, series_id: &str, season_number: u32) -> CoreResult<Vec<Episode>> {
        let Some(season) = self.find_season(series_id, season_number).await? else {
            return Ok(Vec::new());
        };
        self.season_episodes(series_id, &season.id).await
    }

    async fn season_episodes(&self, series_id: &str, season_id: &str) -> CoreResult<Vec<Episode>> {
        let docs = self
            .store
            .query(
                &Query::collection(episodes_collection(series_id, season_id))
                    .order_by("number", Direction::Ascending),
            )
            .await?;
        Ok(decode_all(&docs))
    }

    pub async fn resolve_episode(
        &self,
        series_id: &str,
        season_number: u32,
        episode_number: u32,
    ) -> CoreResult<Option<ResolvedEpisode>> {
        let Some(season) = self.find_season(series_id, season_number).await? else {
            return Ok(None);
        };
        let docs = self
            .store
            .query(
                &Query::collection(episodes_collection(series_id, &season.id))
                    .where_eq("number", episode_number)
                    .limit(1),
            )
            .await?;
        Ok(decode_all::<Episode>(&docs)
            .into_iter()
            .next()
            .map(|episode| ResolvedEpisode { season, episode }))
    }

    /// The episode after `current`: next in the same season, else the first of the following season
    pub async fn next_episode(&self, series_id: &str, current: EpisodeRef) -> CoreResult<Option<ResolvedEpisode>> {
        if let Some(season) = self.find_season(series_id, current.season_number).await? {
            let episodes = self.season_episodes(series_id, &season.id).await?;
            if let Some(episode) = episodes.into_iter().find(|e| e.number > current.episode_number) {
                return Ok(Some(ResolvedEpisode { season, episode }));
            }
        }

        let Some(next_season) = self.find_season(series_id, current.season_number + 1).await? else {
            return Ok(None);
        };
        let episodes = self.season_episodes(series_id, &next_season.id).await?;
        Ok(episodes.into_iter().next().map(|episode| ResolvedEpisode {
            season: next_season,
            episode,
        }))
    }

    /// Create a movie; returns its id
    pub async fn create_movie(&self, actor: Option<&Identity>, mut movie: Movie) -> CoreResult<String> {
        self.gate.authorize(actor)?;
        validate_title_name(&movie.info.title)?;
        if movie.video_url.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(CoreError::validation("a movie needs a video URL"));
        }
        let id = self.assign_id(TitleKind::Movie, &movie.info.id, &movie.info.title).await?;
        movie.info.id = id.clone();

        let path = DocumentPath::new(TitleKind::Movie.collection(), id.clone());
        self.store
            .commit(vec![WriteOp::Set { path, data: title_fields(TitleKind::Movie, &movie)? }])
            .await?;
        info!("Created movie {} ({})", movie.info.title, id);
        Ok(id)
    }

    /// Create a series with its seasons and episodes in one batch; returns its id
    pub async fn create_series(
        &self,
        actor: Option<&Identity>,
        mut series: Series,
        seasons: Vec<SeasonPlan>,
    ) -> CoreResult<String> {
        self.gate.authorize(actor)?;
        validate_title_name(&series.info.title)?;
        if seasons.is_empty() {
            return Err(CoreError::validation("a series needs at least one season"));
        }
        let mut numbers = HashSet::new();
        for plan in &seasons {
            validate_season_plan(plan)?;
            if !numbers.insert(plan.number) {
                return Err(CoreError::validation(format!("season {} appears twice", plan.number)));
            }
        }

        let id = self.assign_id(TitleKind::Series, &series.info.id, &series.info.title).await?;
        series.info.id = id.clone();

        let mut batch = vec![WriteOp::Set {
            path: DocumentPath::new(TitleKind::Series.collection(), id.clone()),
            data: title_fields(TitleKind::Series, &series)?,
        }];
        for plan in &seasons {
            batch.extend(season_writes(&id, plan)?);
        }

        let episode_count: usize = seasons.iter().map(|s| s.episodes.len()).sum();
        self.store.commit(batch).await?;
        info!(
            "Created series {} ({}) with {} seasons and {} episodes",
            series.info.title,
            id,
            seasons.len(),
            episode_count
        );
        Ok(id)
    }

    /// Overwrite the curated fields of an existing title
    pub async fn update_title(&self, actor: Option<&Identity>, title: Title) -> CoreResult<()> {
        self.gate.authorize(actor)?;
        validate_title_name(title.name())?;
        let kind = title.kind();
        let id = title.id().to_string();
        if self.find_title(kind, &id).await?.is_none() {
            return Err(CoreError::not_found(kind.as_str(), id));
        }

        let data = match &title {
            Title::Movie(movie) => {
                if movie.video_url.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    return Err(CoreError::validation("a movie needs a video URL"));
                }
                title_fields(kind, movie)?
            }
            Title::Series(series) => title_fields(kind, series)?,
        };
        self.store
            .commit(vec![WriteOp::Merge { path: DocumentPath::new(kind.collection(), id.clone()), data }])
            .await?;
        info!("Updated {} {}", kind, id);
        Ok(())
    }

    /// Delete a title; a series takes its seasons and episodes with it
    pub async fn delete_title(&self, actor: Option<&Identity>, kind: TitleKind, id: &str) -> CoreResult<()> {
        self.gate.authorize(actor)?;
        if self.find_title(kind, id).await?.is_none() {
            return Err(CoreError::not_found(kind.as_str(), id));
        }

        let mut batch = Vec::new();
        if kind == TitleKind::Series {
            let seasons = self.seasons(id).await?;
            batch.extend(self.season_deletes(id, &seasons).await?);
        }
        batch.push(WriteOp::Delete { path: DocumentPath::new(kind.collection(), id) });

        let removed = batch.len();
        self.store.commit(batch).await?;
        info!("Deleted {} {} ({} documents)", kind, id, removed);
        Ok(())
    }

    pub async fn add_season(&self, actor: Option<&Identity>, series_id: &str, plan: SeasonPlan) -> CoreResult<()> {
        self.gate.authorize(actor)?;
        validate_season_plan(&plan)?;
        self.require_series(series_id).await?;
        if self.find_season(series_id, plan.number).await?.is_some() {
            return Err(CoreError::validation(format!(
                "series {} already has a season {}",
                series_id, plan.number
            )));
        }

        let batch = season_writes(series_id, &plan)?;
        self.store.commit(batch).await?;
        info!("Added season {} to series {} ({} episodes)", plan.number, series_id, plan.episodes.len());
        Ok(())
    }

    pub async fn add_episode(
        &self,
        actor: Option<&Identity>,
        series_id: &str,
        season_number: u32,
        mut episode: Episode,
    ) -> CoreResult<()> {
        self.gate.authorize(actor)?;
        if episode.number == 0 {
            return Err(CoreError::validation("episode numbers start at 1"));
        }
        self.require_series(series_id).await?;
        let season = self
            .find_season(series_id, season_number)
            .await?
            .ok_or_else(|| CoreError::not_found("season", format!("{}/{}", series_id, season_number)))?;

        let existing = self.season_episodes(series_id, &season.id).await?;
        if existing.iter().any(|e| e.number == episode.number) {
            return Err(CoreError::validation(format!(
                "season {} already has an episode {}",
                season_number, episode.number
            )));
        }

        episode.id = episode_doc_id(episode.number);
        let path = DocumentPath::new(episodes_collection(series_id, &season.id), episode.id.clone());
        self.store
            .commit(vec![WriteOp::Set { path, data: to_fields(&episode)? }])
            .await?;
        info!("Added episode {} to series {}", EpisodeRef::new(season_number, episode.number), series_id);
        Ok(())
    }

    pub async fn delete_season(&self, actor: Option<&Identity>, series_id: &str, season_number: u32) -> CoreResult<()> {
        self.gate.authorize(actor)?;
        let season = self
            .find_season(series_id, season_number)
            .await?
            .ok_or_else(|| CoreError::not_found("season", format!("{}/{}", series_id, season_number)))?;

        let batch = self.season_deletes(series_id, std::slice::from_ref(&season)).await?;
        self.store.commit(batch).await?;
        info!("Deleted season {} of series {}", season_number, series_id);
        Ok(())
    }

    pub async fn delete_episode(
        &self,
        actor: Option<&Identity>,
        series_id: &str,
        season_number: u32,
        episode_number: u32,
    ) -> CoreResult<()> {
        self.gate.authorize(actor)?;
        let resolved = self
            .resolve_episode(series_id, season_number, episode_number)
            .await?
            .ok_or_else(|| {
                CoreError::not_found("episode", format!("{} {}", series_id, EpisodeRef::new(season_number, episode_number)))
            })?;

        let path = DocumentPath::new(episodes_collection(series_id, &resolved.season.id), resolved.episode.id.clone());
        self.store.commit(vec![WriteOp::Delete { path }]).await?;
        info!("Deleted episode {} of series {}", resolved.episode_ref(), series_id);
        Ok(())
    }

    async fn require_series(&self, series_id: &str) -> CoreResult<()> {
        match self.find_title(TitleKind::Series, series_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found("series", series_id)),
        }
    }

    /// Delete operations for the given seasons and all their episodes
    async fn season_deletes(&self, series_id: &str, seasons: &[Season]) -> CoreResult<Vec<WriteOp>> {
        let collections: Vec<String> = seasons
            .iter()
            .map(|season| episodes_collection(series_id, &season.id))
            .collect();
        let listings = join_all(collections.iter().map(|c| self.store.list(c))).await;

        let mut batch = Vec::new();
        for ((season, collection), episodes) in seasons.iter().zip(&collections).zip(listings) {
            for doc in episodes? {
                batch.push(WriteOp::Delete { path: DocumentPath::new(collection.clone(), doc.id) });
            }
            batch.push(WriteOp::Delete { path: DocumentPath::new(seasons_collection(series_id), season.id.clone()) });
        }
        Ok(batch)
    }

    /// Explicit id if given (validated and unused), otherwise one derived from the title
    async fn assign_id(&self, kind: TitleKind, requested: &str, title: &str) -> CoreResult<String> {
        let requested = requested.trim();
        if !requested.is_empty() {
            validate_title_id(requested)?;
            if self.find_title(kind, requested).await?.is_some() {
                return Err(CoreError::validation(format!("{} {} already exists", kind, requested)));
            }
            return Ok(requested.to_string());
        }

        let base = slugify(title);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.find_title(kind, &candidate).await?.is_some() {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }
}

pub fn seasons_collection(series_id: &str) -> String {
    format!("series/{}/seasons", series_id)
}

pub fn episodes_collection(series_id: &str, season_id: &str) -> String {
    format!("series/{}/seasons/{}/episodes", series_id, season_id)
}

fn season_doc_id(number: u32) -> String {
    format!("season_{}", number)
}

fn episode_doc_id(number: u32) -> String {
    format!("episode_{}", number)
}

/// Writes creating one season document and its episodes
fn season_writes(series_id: &str, plan: &SeasonPlan) -> CoreResult<Vec<WriteOp>> {
    let season = Season {
        id: season_doc_id(plan.number),
        number: plan.number,
        title: if plan.title.trim().is_empty() {
            format!("Season {}", plan.number)
        } else {
            plan.title.clone()
        },
    };
    let mut batch = vec![WriteOp::Set {
        path: DocumentPath::new(seasons_collection(series_id), season.id.clone()),
        data: to_fields(&season)?,
    }];

    let collection = episodes_collection(series_id, &season.id);
    for episode in &plan.episodes {
        let mut episode = episode.clone();
        episode.id = episode_doc_id(episode.number);
        batch.push(WriteOp::Set {
            path: DocumentPath::new(collection.clone(), episode.id.clone()),
            data: to_fields(&episode)?,
        });
    }
    Ok(batch)
}

fn title_fields<T: Serialize>(kind: TitleKind, value: &T) -> CoreResult<Fields> {
    let mut fields = to_fields(value)?;
    fields.insert("type".to_string(), Value::String(kind.as_str().to_string()));
    Ok(fields)
}

fn validate_title_name(title: &str) -> CoreResult<()> {
    if title.trim().is_empty() {
        return Err(CoreError::validation("title must not be empty"));
    }
    Ok(())
}

/// Title ids end up inside episode record ids (`{series}-{season}-{episode}`), so no '-' allowed
fn validate_title_id(id: &str) -> CoreResult<()> {
    if id.contains('/') || id.contains('-') || id.chars().any(char::is_whitespace) {
        return Err(CoreError::validation(format!(
            "invalid id '{}': use letters, digits and underscores",
            id
        )));
    }
    Ok(())
}

fn validate_season_plan(plan: &SeasonPlan) -> CoreResult<()> {
    if plan.number == 0 {
        return Err(CoreError::validation("season numbers start at 1"));
    }
    let mut numbers = HashSet::new();
    for episode in &plan.episodes {
        if episode.number == 0 {
            return Err(CoreError::validation("episode numbers start at 1"));
        }
        if !numbers.insert(episode.number) {
            return Err(CoreError::validation(format!(
                "episode {} appears twice in season {}",
                episode.number, plan.number
            )));
        }
    }
    Ok(())
}

/// Lowercase ASCII slug joined by underscores, e.g. "Stranger Things" -> "stranger_things"
fn slugify(title: &str) -> String {
    let folded = crate::collate::collation_key(title);
    let mut slug = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    let slug: String = slug.chars().take(48).collect();
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "title".to_string()
    } else {
        slug.to_string()
    }
}

pub(crate) fn decode_title(kind: TitleKind, doc: &Document) -> Result<Title, StoreError> {
    Ok(match kind {
        TitleKind::Movie => Title::Movie(doc.decode::<Movie>()?),
        TitleKind::Series => Title::Series(doc.decode::<Series>()?),
    })
}

fn decode_titles(kind: TitleKind, docs: &[Document]) -> Vec<Title> {
    docs.iter()
        .filter_map(|doc| match decode_title(kind, doc) {
            Ok(title) => Some(title),
            Err(e) => {
                warn!("Skipping malformed {} document: {}", kind, e);
                None
            }
        })
        .collect()
}

fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping malformed document: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests;
