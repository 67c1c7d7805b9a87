use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog entry kind
///
/// Older documents (and some watchlist entries) carry the collection name
/// `movies` instead of `movie`; both parse to `Movie`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TitleKind {
    #[serde(alias = "movies")]
    Movie,
    Series,
}

impl TitleKind {
    pub const ALL: [TitleKind; 2] = [TitleKind::Movie, TitleKind::Series];

    /// Name of the store collection holding titles of this kind
    pub fn collection(&self) -> &'static str {
        match self {
            TitleKind::Movie => "movies",
            TitleKind::Series => "series",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TitleKind::Movie => "movie",
            TitleKind::Series => "series",
        }
    }

    /// Normalize a loosely-typed label (`movie`, `movies`, `series`) to a kind
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "movie" | "movies" => Some(TitleKind::Movie),
            "series" => Some(TitleKind::Series),
            _ => None,
        }
    }
}

impl fmt::Display for TitleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TitleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or_else(|| format!("Invalid title type: {}. Use 'movie' or 'series'", s))
    }
}

/// Fields shared by movies and series
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Deprecated single-genre field, still read for documents written before `genres` existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_year", skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
}

impl TitleInfo {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// True if the genre appears in `genres` or in the legacy `genre` field
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g == genre) || self.genre.as_deref() == Some(genre)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[serde(flatten)]
    pub info: TitleInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Runtime in seconds, when curated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    #[serde(flatten)]
    pub info: TitleInfo,
}

/// A movie or a series, tagged by `type` when serialized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Title {
    #[serde(alias = "movies")]
    Movie(Movie),
    Series(Series),
}

impl Title {
    pub fn kind(&self) -> TitleKind {
        match self {
            Title::Movie(_) => TitleKind::Movie,
            Title::Series(_) => TitleKind::Series,
        }
    }

    pub fn info(&self) -> &TitleInfo {
        match self {
            Title::Movie(m) => &m.info,
            Title::Series(s) => &s.info,
        }
    }

    pub fn info_mut(&mut self) -> &mut TitleInfo {
        match self {
            Title::Movie(m) => &mut m.info,
            Title::Series(s) => &mut s.info,
        }
    }

    pub fn id(&self) -> &str {
        &self.info().id
    }

    pub fn name(&self) -> &str {
        &self.info().title
    }

    pub fn video_url(&self) -> Option<&str> {
        match self {
            Title::Movie(m) => m.video_url.as_deref(),
            Title::Series(_) => None,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        match self {
            Title::Movie(m) => m.duration,
            Title::Series(_) => None,
        }
    }
}

/// Accept `2019`, `"2019"` or nothing; anything unparsable becomes `None`
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|y| u32::try_from(y).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parse_label_normalizes_plural() {
        assert_eq!(TitleKind::parse_label("movies"), Some(TitleKind::Movie));
        assert_eq!(TitleKind::parse_label("Movie"), Some(TitleKind::Movie));
        assert_eq!(TitleKind::parse_label("series"), Some(TitleKind::Series));
        assert_eq!(TitleKind::parse_label("anime"), None);
    }

    #[test]
    fn test_movie_decodes_with_defaults() {
        let movie: Movie = serde_json::from_value(json!({
            "title": "Alien",
            "videoUrl": "https://cdn.example/alien.mp4",
            "year": "1979"
        }))
        .unwrap();
        assert_eq!(movie.info.title, "Alien");
        assert_eq!(movie.info.year, Some(1979));
        assert!(movie.info.genres.is_empty());
        assert_eq!(movie.video_url.as_deref(), Some("https://cdn.example/alien.mp4"));
    }

    #[test]
    fn test_title_serializes_type_tag() {
        let title = Title::Series(Series { info: TitleInfo::new("s1", "Dark") });
        let value = serde_json::to_value(&title).unwrap();
        assert_eq!(value["type"], "series");
        assert_eq!(value["id"], "s1");
        assert_eq!(value["title"], "Dark");
    }

    #[test]
    fn test_has_genre_checks_legacy_field() {
        let mut info = TitleInfo::new("m1", "Heat");
        info.genre = Some("Crime".to_string());
        assert!(info.has_genre("Crime"));
        info.genre = None;
        info.genres = vec!["Drama".to_string()];
        assert!(info.has_genre("Drama"));
        assert!(!info.has_genre("Crime"));
    }
}
