//! Catalog curation; every command requires an admin session

use crate::app::App;
use crate::output::Output;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use marquee_models::{Episode, Movie, SeasonPlan, Series, Title, TitleInfo, TitleKind};
use serde_json::json;
use std::path::Path;

/// Fields shared by `add-movie`, `add-series` and `update`
#[derive(Debug, Clone, Default)]
pub struct TitleFields {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub genres: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub banner_url: Option<String>,
    pub year: Option<u32>,
}

impl TitleFields {
    fn into_info(self) -> TitleInfo {
        let mut info = TitleInfo::new(self.id.unwrap_or_default(), self.title);
        info.description = self.description.unwrap_or_default();
        info.genres = clean_genres(self.genres);
        info.thumbnail_url = self.thumbnail_url;
        info.banner_url = self.banner_url;
        info.year = self.year;
        info
    }
}

/// Genres may be repeated or comma separated; blanks and duplicates are dropped
fn clean_genres(raw: Vec<String>) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for genre in raw.iter().flat_map(|g| g.split(',')).map(str::trim).filter(|g| !g.is_empty()) {
        if !genres.iter().any(|g| g.eq_ignore_ascii_case(genre)) {
            genres.push(genre.to_string());
        }
    }
    genres
}

/// Seasons for `add-series`: a JSON plan file, or `count` seasons of `episodes` each
pub fn season_plans(plan_file: Option<&Path>, seasons: u32, episodes: u32) -> Result<Vec<SeasonPlan>> {
    if let Some(path) = plan_file {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read season plan {}", path.display()))?;
        let plans: Vec<SeasonPlan> = serde_json::from_str(&content)
            .wrap_err_with(|| format!("Invalid season plan in {}", path.display()))?;
        return Ok(plans);
    }

    Ok((1..=seasons)
        .map(|number| SeasonPlan {
            number,
            title: String::new(),
            episodes: (1..=episodes).map(|n| Episode { number: n, ..Episode::default() }).collect(),
        })
        .collect())
}

pub async fn run_add_movie(
    app: &App,
    fields: TitleFields,
    video_url: String,
    duration: Option<f64>,
    output: &Output,
) -> Result<()> {
    let actor = app.identity()?;
    let movie = Movie { info: fields.into_info(), video_url: Some(video_url), duration };
    let id = app.catalog.create_movie(actor.as_ref(), movie).await?;
    output.success(format!("Created movie {}", id));
    output.data(&json!({ "id": id, "type": TitleKind::Movie }));
    Ok(())
}

pub async fn run_add_series(app: &App, fields: TitleFields, plans: Vec<SeasonPlan>, output: &Output) -> Result<()> {
    let actor = app.identity()?;
    let seasons = plans.len();
    let id = app
        .catalog
        .create_series(actor.as_ref(), Series { info: fields.into_info() }, plans)
        .await?;
    output.success(format!("Created series {} with {} season(s)", id, seasons));
    output.data(&json!({ "id": id, "type": TitleKind::Series }));
    Ok(())
}

/// Replace the given fields of an existing title, keeping the rest
pub async fn run_update(
    app: &App,
    kind: TitleKind,
    id: &str,
    fields: TitleFields,
    video_url: Option<String>,
    output: &Output,
) -> Result<()> {
    let actor = app.identity()?;
    let mut title = app.catalog.get_title(kind, id).await?;

    let info = title.info_mut();
    if !fields.title.trim().is_empty() {
        info.title = fields.title;
    }
    if let Some(description) = fields.description {
        info.description = description;
    }
    if !fields.genres.is_empty() {
        info.genres = clean_genres(fields.genres);
    }
    if fields.thumbnail_url.is_some() {
        info.thumbnail_url = fields.thumbnail_url;
    }
    if fields.banner_url.is_some() {
        info.banner_url = fields.banner_url;
    }
    if fields.year.is_some() {
        info.year = fields.year;
    }
    if let (Some(url), Title::Movie(movie)) = (video_url, &mut title) {
        movie.video_url = Some(url);
    }

    app.catalog.update_title(actor.as_ref(), title).await?;
    output.success(format!("Updated {} {}", kind, id));
    Ok(())
}

pub async fn run_delete(app: &App, kind: TitleKind, id: &str, output: &Output) -> Result<()> {
    let actor = app.identity()?;
    app.catalog.delete_title(actor.as_ref(), kind, id).await?;
    output.success(format!("Deleted {} {}", kind, id));
    Ok(())
}

pub async fn run_add_season(
    app: &App,
    series_id: &str,
    number: u32,
    title: Option<String>,
    episodes: u32,
    output: &Output,
) -> Result<()> {
    let actor = app.identity()?;
    let plan = SeasonPlan {
        number,
        title: title.unwrap_or_default(),
        episodes: (1..=episodes).map(|n| Episode { number: n, ..Episode::default() }).collect(),
    };
    app.catalog.add_season(actor.as_ref(), series_id, plan).await?;
    output.success(format!("Added season {} to {}", number, series_id));
    Ok(())
}

pub async fn run_add_episode(
    app: &App,
    series_id: &str,
    season: u32,
    episode: Episode,
    output: &Output,
) -> Result<()> {
    let actor = app.identity()?;
    let number = episode.number;
    app.catalog.add_episode(actor.as_ref(), series_id, season, episode).await?;
    output.success(format!("Added episode {} to season {} of {}", number, season, series_id));
    Ok(())
}

pub async fn run_delete_season(app: &App, series_id: &str, season: u32, output: &Output) -> Result<()> {
    let actor = app.identity()?;
    app.catalog.delete_season(actor.as_ref(), series_id, season).await?;
    output.success(format!("Deleted season {} of {}", season, series_id));
    Ok(())
}

pub async fn run_delete_episode(app: &App, series_id: &str, season: u32, episode: u32, output: &Output) -> Result<()> {
    let actor = app.identity()?;
    app.catalog.delete_episode(actor.as_ref(), series_id, season, episode).await?;
    output.success(format!("Deleted episode {} of season {} of {}", episode, season, series_id));
    Ok(())
}

/// `admin seasons <series>`: list seasons and episodes
pub async fn run_list_seasons(app: &App, series_id: &str, output: &Output) -> Result<()> {
    let series = app.catalog.get_title(TitleKind::Series, series_id).await?;
    let seasons = app.catalog.seasons(series_id).await?;
    if seasons.is_empty() {
        output.warn(format!("{} has no seasons", series.name()));
    }

    let mut listing = Vec::new();
    for season in seasons {
        let episodes = app.catalog.episodes(series_id, season.number).await?;
        if output.is_human() {
            let rows: Vec<(&str, String)> = episodes
                .iter()
                .map(|e| ("", format!("{:>3}. {}", e.number, e.display_title())))
                .collect();
            output.key_values(&format!("{} · {}", series.name(), season.title), &rows);
        }
        listing.push(json!({ "season": season, "episodes": episodes }));
    }
    output.data(&listing);
    Ok(())
}
