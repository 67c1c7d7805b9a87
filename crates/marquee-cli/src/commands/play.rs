//! `play`: drive one playback session from the command line
//!
//! Positions given with `--at` are fed to the session as time updates. The
//! simulated clock advances by the distance between consecutive positions,
//! as it would during uninterrupted playback.

use crate::app::App;
use crate::output::Output;
use chrono::{DateTime, Duration, Utc};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use marquee_core::{resolve_video_source, PersistOutcome, PlaybackSession, PlaybackTarget, ResumeReason};
use marquee_models::{EpisodeRef, TitleKind};
use owo_colors::OwoColorize;
use serde_json::json;

pub struct PlayArgs {
    pub kind: TitleKind,
    pub id: String,
    pub season: u32,
    pub episode: u32,
    pub positions: Vec<f64>,
    pub duration: Option<f64>,
    pub end: bool,
}

/// `3725.4` becomes `1:02:05`
pub fn clock_label(secs: f64) -> String {
    let total = if secs.is_finite() { secs.max(0.0) as u64 } else { 0 };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

fn resume_label(reason: ResumeReason) -> &'static str {
    match reason {
        ResumeReason::NoRecord => "first time watching",
        ResumeReason::RecentlyCompleted => "finished recently, starting over",
        ResumeReason::Completed => "finished before, starting over",
        ResumeReason::NearlyFinished => "almost finished last time, starting over",
        ResumeReason::Resumed => "resuming where you left off",
    }
}

fn outcome_label(outcome: &PersistOutcome) -> String {
    match outcome {
        PersistOutcome::Saved => "saved".green().to_string(),
        PersistOutcome::Skipped(reason) => format!("skipped ({:?})", reason).bright_black().to_string(),
        PersistOutcome::Failed(e) => format!("failed: {}", e).red().to_string(),
    }
}

const MAX_STEP_MILLIS: f64 = 86_400_000.0;

fn advance(clock: DateTime<Utc>, from: f64, to: f64) -> DateTime<Utc> {
    let step = (to - from).abs() * 1000.0;
    let millis = if step.is_finite() { step.min(MAX_STEP_MILLIS) as i64 } else { 0 };
    clock + Duration::milliseconds(millis)
}

pub async fn run_play(app: &App, args: PlayArgs, output: &Output) -> Result<()> {
    let uid = app.uid()?;
    if uid.is_none() {
        output.warn("Not signed in; progress will not be saved");
    }

    let title = app.catalog.get_title(args.kind, &args.id).await?;
    let (target, video_url, known_duration, label) = match args.kind {
        TitleKind::Movie => (
            PlaybackTarget::movie(title.id()),
            title.video_url().map(str::to_string),
            title.duration(),
            title.name().to_string(),
        ),
        TitleKind::Series => {
            let resolved = app
                .catalog
                .resolve_episode(title.id(), args.season, args.episode)
                .await?
                .ok_or_else(|| eyre!("{} has no episode {}", title.name(), EpisodeRef::new(args.season, args.episode)))?;
            let episode_ref = resolved.episode_ref();
            let episode_title = resolved.episode.display_title();
            let thumbnail = resolved
                .episode
                .thumbnail_url
                .clone()
                .or_else(|| title.info().thumbnail_url.clone());
            (
                PlaybackTarget::Episode {
                    series_id: title.id().to_string(),
                    episode: episode_ref,
                    title: episode_title.clone(),
                    thumbnail_url: thumbnail,
                },
                resolved.episode.video_url.clone(),
                resolved.episode.duration,
                format!("{} {} · {}", title.name(), episode_ref, episode_title),
            )
        }
    };

    let source = resolve_video_source(video_url.as_deref());
    if source.is_none() {
        output.error(format!("{} has no playable video", label));
        output.data(&json!({ "title": label, "source": source }));
        return Ok(());
    }

    let duration = args.duration.or(known_duration).unwrap_or(0.0);
    let mut session = PlaybackSession::new(app.store.clone(), uid, target, app.settings());

    let mut clock = Utc::now();
    let resume = session.start(clock).await;
    output.info(format!("{} {}", "▶".bright_cyan(), label.bold()));
    output.info(format!("  source: {}", source.urls().join(" | ")));
    output.info(format!("  start at {} ({})", clock_label(resume.position), resume_label(resume.reason)));

    let mut updates = Vec::new();
    let mut last = resume.position;
    for position in &args.positions {
        clock = advance(clock, last, *position);
        last = *position;
        let outcome = session.on_time_update(*position, duration, clock).await;
        output.info(format!("  {} {}", clock_label(*position), outcome_label(&outcome)));
        updates.push(json!({ "position": position, "outcome": outcome }));
    }

    let mut ended = None;
    let mut up_next = None;
    if args.end {
        let outcome = session.on_ended(clock).await;
        output.info(format!("  ended {}", outcome_label(&outcome)));
        ended = Some(outcome);

        if let PlaybackTarget::Episode { series_id, episode, .. } = session.target() {
            match app.catalog.next_episode(series_id, *episode).await? {
                Some(next) => {
                    output.info(format!("  up next: {} {}", next.episode_ref(), next.episode.display_title()));
                    up_next = Some(next.episode_ref());
                }
                None => output.info("  that was the last episode"),
            }
        }
    }

    output.data(&json!({
        "title": label,
        "source": source,
        "resume": resume,
        "updates": updates,
        "ended": ended,
        "upNext": up_next,
        "state": session.state(),
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_label() {
        assert_eq!(clock_label(0.0), "0:00");
        assert_eq!(clock_label(65.9), "1:05");
        assert_eq!(clock_label(3725.4), "1:02:05");
        assert_eq!(clock_label(-3.0), "0:00");
    }

    #[test]
    fn test_clock_advances_by_distance_played() {
        let start = Utc::now();
        assert_eq!(advance(start, 10.0, 15.5), start + Duration::milliseconds(5500));
        assert_eq!(advance(start, 15.0, 5.0), start + Duration::seconds(10));
    }
}
