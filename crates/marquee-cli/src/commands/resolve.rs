use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use marquee_core::{probe_first_playable, resolve_video_source, CandidateCursor, VideoSource};
use owo_colors::OwoColorize;
use serde_json::json;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run_resolve(url: &str, probe: bool, output: &Output) -> Result<()> {
    let source = resolve_video_source(Some(url));
    let urls = source.urls();

    match &source {
        VideoSource::None => output.warn("Nothing to play: the URL is empty"),
        VideoSource::Direct(direct) => output.info(format!("{} {}", "direct".bright_cyan(), direct)),
        VideoSource::Candidates(candidates) => {
            output.info(format!("{} {} candidates", "drive".bright_cyan(), candidates.len()));
            for (i, candidate) in candidates.iter().enumerate() {
                output.info(format!("  {}. {}", i + 1, candidate));
            }
        }
    }

    let mut playable = None;
    if probe && !urls.is_empty() {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;
        playable = probe_first_playable(&client, &urls).await;

        // Walk the cursor the way a player would, one failure per rejected candidate
        let mut cursor = CandidateCursor::new(&source);
        while let Some(current) = cursor.current() {
            if Some(current) == playable.as_deref() {
                cursor.on_loaded();
                break;
            }
            cursor.on_error();
        }

        match &playable {
            Some(url) => output.success(format!("Playable after {} attempt(s): {}", cursor.attempts(), url)),
            None => output.error("Video unavailable: no candidate responded"),
        }
    }

    output.data(&json!({ "source": source, "playable": playable }));
    Ok(())
}
