//! Playable-source resolution for stored video URLs
//!
//! Most URLs are handed to the player untouched. Google Drive share links are
//! not directly streamable, so they expand into an ordered list of endpoint
//! variants for the player to try in turn.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

static DRIVE_FILE_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/file/d/([\w-]+)").unwrap());
static DRIVE_ID_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[&?]id=([\w-]+)").unwrap());
static BARE_FILE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]{25,}$").unwrap());

const DRIVE_HOST: &str = "drive.google.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "urls", rename_all = "snake_case")]
pub enum VideoSource {
    /// Nothing to play
    None,
    /// Play the URL as stored
    Direct(String),
    /// Try each URL in order until one loads
    Candidates(Vec<String>),
}

impl VideoSource {
    /// URLs in the order the player should attempt them
    pub fn urls(&self) -> Vec<String> {
        match self {
            VideoSource::None => Vec::new(),
            VideoSource::Direct(url) => vec![url.clone()],
            VideoSource::Candidates(urls) => urls.clone(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, VideoSource::None)
    }
}

/// Resolve a stored video URL into something the player can attempt
pub fn resolve_video_source(url: Option<&str>) -> VideoSource {
    let url = match url.map(str::trim) {
        Some(u) if !u.is_empty() => u,
        _ => return VideoSource::None,
    };

    if !url.contains(DRIVE_HOST) {
        return VideoSource::Direct(url.to_string());
    }

    match extract_drive_file_id(url) {
        Some(file_id) => {
            debug!("Expanding Drive link with file id {}", file_id);
            VideoSource::Candidates(drive_candidates(&file_id, url))
        }
        None => VideoSource::Direct(url.to_string()),
    }
}

/// File id from a Drive link: `/file/d/{id}`, then `?id=`/`&id=`, then a bare id
pub fn extract_drive_file_id(url: &str) -> Option<String> {
    if let Some(caps) = DRIVE_FILE_PATH.captures(url) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = DRIVE_ID_PARAM.captures(url) {
        return Some(caps[1].to_string());
    }
    if BARE_FILE_ID.is_match(url) {
        return Some(url.to_string());
    }
    None
}

fn drive_candidates(file_id: &str, original: &str) -> Vec<String> {
    vec![
        format!("https://drive.google.com/uc?export=view&id={}", file_id),
        format!("https://drive.google.com/file/d/{}/preview", file_id),
        format!("https://drive.google.com/uc?export=download&id={}", file_id),
        format!("https://drive.google.com/uc?id={}", file_id),
        format!("https://docs.google.com/uc?export=download&id={}", file_id),
        format!("https://drive.google.com/uc?export=media&id={}", file_id),
        original.to_string(),
    ]
}

/// Player-side walk over the candidate list
///
/// `current` is the URL being attempted. A playback error advances to the next
/// candidate; once the list runs out the source is unavailable.
#[derive(Debug, Clone)]
pub struct CandidateCursor {
    urls: Vec<String>,
    index: usize,
    loaded: bool,
}

impl CandidateCursor {
    pub fn new(source: &VideoSource) -> Self {
        Self {
            urls: source.urls(),
            index: 0,
            loaded: false,
        }
    }

    pub fn current(&self) -> Option<&str> {
        if self.loaded || !self.is_exhausted() {
            self.urls.get(self.index).map(String::as_str)
        } else {
            None
        }
    }

    /// Record a load failure for the current candidate and move on
    pub fn on_error(&mut self) -> Option<&str> {
        if self.loaded || self.is_exhausted() {
            return self.current();
        }
        if let Some(failed) = self.urls.get(self.index) {
            debug!("Video candidate {} failed: {}", self.index, failed);
        }
        self.index += 1;
        if self.is_exhausted() {
            warn!("All {} video candidates failed", self.urls.len());
        }
        self.current()
    }

    /// The current candidate loaded; stop advancing
    pub fn on_loaded(&mut self) {
        if !self.is_exhausted() {
            self.loaded = true;
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.urls.len()
    }

    /// True once every candidate failed ("video unavailable")
    pub fn is_unavailable(&self) -> bool {
        !self.loaded && self.is_exhausted()
    }

    pub fn attempts(&self) -> usize {
        (self.index + 1).min(self.urls.len())
    }
}

/// Request each candidate in order and return the first answering with a success status
pub async fn probe_first_playable(client: &reqwest::Client, candidates: &[String]) -> Option<String> {
    for url in candidates {
        match client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Candidate {} answered {}", url, response.status());
                return Some(url.clone());
            }
            Ok(response) => {
                debug!("Candidate {} answered {}", url, response.status());
            }
            Err(e) => {
                debug!("Candidate {} unreachable: {}", url, e);
            }
        }
    }
    warn!("No playable candidate among {} URLs", candidates.len());
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE_ID: &str = "1aBcDeFgHiJkLmNoPqRsTuVwXyZ_-012";

    #[test]
    fn test_missing_and_plain_urls() {
        assert_eq!(resolve_video_source(None), VideoSource::None);
        assert_eq!(resolve_video_source(Some("  ")), VideoSource::None);
        assert_eq!(
            resolve_video_source(Some("https://cdn.example/heat.mp4")),
            VideoSource::Direct("https://cdn.example/heat.mp4".to_string())
        );
    }

    #[test]
    fn test_drive_file_path_expands_in_order() {
        let url = format!("https://drive.google.com/file/d/{}/view?usp=sharing", FILE_ID);
        let VideoSource::Candidates(urls) = resolve_video_source(Some(&url)) else {
            panic!("expected candidates");
        };
        assert_eq!(urls.len(), 7);
        assert_eq!(urls[0], format!("https://drive.google.com/uc?export=view&id={}", FILE_ID));
        assert_eq!(urls[1], format!("https://drive.google.com/file/d/{}/preview", FILE_ID));
        assert_eq!(urls[4], format!("https://docs.google.com/uc?export=download&id={}", FILE_ID));
        assert_eq!(urls[6], url);
    }

    #[test]
    fn test_drive_id_param_and_unrecognized_link() {
        let url = "https://drive.google.com/open?id=abc_123";
        assert_eq!(extract_drive_file_id(url).as_deref(), Some("abc_123"));

        let folder = "https://drive.google.com/drive/folders";
        assert_eq!(resolve_video_source(Some(folder)), VideoSource::Direct(folder.to_string()));
    }

    #[test]
    fn test_bare_id_extraction() {
        assert_eq!(extract_drive_file_id(FILE_ID).as_deref(), Some(FILE_ID));
        assert_eq!(extract_drive_file_id("short-id"), None);
    }

    #[test]
    fn test_cursor_advances_until_exhausted() {
        let source = VideoSource::Candidates(vec!["a".into(), "b".into()]);
        let mut cursor = CandidateCursor::new(&source);
        assert_eq!(cursor.current(), Some("a"));
        assert_eq!(cursor.on_error(), Some("b"));
        assert_eq!(cursor.on_error(), None);
        assert!(cursor.is_unavailable());
        // Further errors are ignored
        assert_eq!(cursor.on_error(), None);
    }

    #[test]
    fn test_cursor_stops_at_loaded_candidate() {
        let source = VideoSource::Candidates(vec!["a".into(), "b".into(), "c".into()]);
        let mut cursor = CandidateCursor::new(&source);
        cursor.on_error();
        cursor.on_loaded();
        assert_eq!(cursor.on_error(), Some("b"));
        assert!(cursor.is_loaded());
        assert!(!cursor.is_unavailable());
        assert_eq!(cursor.attempts(), 2);
    }

    #[test]
    fn test_cursor_for_missing_source_is_unavailable() {
        let cursor = CandidateCursor::new(&VideoSource::None);
        assert!(cursor.is_unavailable());
        assert_eq!(cursor.current(), None);
    }
}
