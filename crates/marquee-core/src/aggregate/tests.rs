use super::*;
use async_trait::async_trait;
use chrono::Duration;
use marquee_models::{Episode, Movie, SeasonPlan, Series, TitleInfo, WatchingSummary};
use marquee_store::{to_fields, MemoryStore, Query, StoreError, WriteOp};
use serde_json::json;
use crate::session::{AdminGate, Identity};

fn admin() -> Identity {
    Identity::new("admin-uid", "admin@example.com")
}

async fn fixture() -> (Arc<MemoryStore>, Aggregator) {
    let store = Arc::new(MemoryStore::new());
    let catalog = Catalog::new(store.clone(), 10).with_admin_gate(AdminGate::new(["admin@example.com"]));

    for (id, title, genres, duration) in [
        ("heat", "Heat", vec!["Crime"], Some(3600.0)),
        ("alien", "Alien", vec!["Horror"], None),
        ("zodiac", "Zodiac", vec!["Crime"], None),
    ] {
        let mut info = TitleInfo::new(id, title);
        info.genres = genres.into_iter().map(String::from).collect();
        catalog
            .create_movie(
                Some(&admin()),
                Movie { info, video_url: Some(format!("https://cdn.example/{}.mp4", id)), duration },
            )
            .await
            .unwrap();
    }

    let mut dark = TitleInfo::new("dark", "Dark");
    dark.genres = vec!["Crime".to_string()];
    let episodes = (1..=3)
        .map(|n| Episode { number: n, duration: Some(3000.0), ..Episode::default() })
        .collect();
    catalog
        .create_series(
            Some(&admin()),
            Series { info: dark },
            vec![SeasonPlan { number: 1, title: String::new(), episodes }],
        )
        .await
        .unwrap();
    catalog
        .create_series(
            Some(&admin()),
            Series { info: TitleInfo::new("ozark", "Ozark") },
            vec![SeasonPlan { number: 1, title: String::new(), episodes: vec![Episode { number: 1, ..Episode::default() }] }],
        )
        .await
        .unwrap();

    let aggregator = Aggregator::new(catalog, &ProgressSettings::default());
    (store, aggregator)
}

async fn put(store: &MemoryStore, collection: &str, id: &str, value: serde_json::Value) {
    store
        .set(&DocumentPath::new(collection, id), to_fields(&value).unwrap())
        .await
        .unwrap();
}

fn ids(items: &[RowItem]) -> Vec<&str> {
    items.iter().map(|i| i.title.id()).collect()
}

#[tokio::test]
async fn test_personal_rows_without_user_are_empty() {
    let (_, aggregator) = fixture().await;
    for mode in [RowMode::ContinueWatching, RowMode::Watchlist] {
        let data = aggregator.load(&RowRequest { uid: None, kind: None, mode }).await;
        assert!(data.items.is_empty());
        assert!(data.error.is_none());
        assert!(!data.loading);
    }
}

#[tokio::test]
async fn test_continue_watching_progress() {
    let (store, aggregator) = fixture().await;
    put(&store, "users/u1/progress", "heat", json!({ "currentTime": 3500.0, "duration": 3600.0 })).await;
    // No duration on the record: the movie's curated runtime is used
    put(&store, "users/u1/progress", "alien", json!({ "currentTime": 100.0 })).await;

    let items = aggregator.continue_watching(Some("u1"), Some(TitleKind::Movie)).await.unwrap();
    let heat = items.iter().find(|i| i.title.id() == "heat").unwrap();
    assert!((heat.progress.unwrap() - 0.9722).abs() < 1e-3);
    assert_eq!(heat.duration, Some(3600.0));

    let alien = items.iter().find(|i| i.title.id() == "alien").unwrap();
    assert_eq!(alien.progress, Some(0.0));
    assert_eq!(alien.duration, None);
}

#[tokio::test]
async fn test_finished_movie_progress_is_capped() {
    let (store, aggregator) = fixture().await;
    put(&store, "users/u1/progress", "heat", json!({ "currentTime": 3600.0, "duration": 3600.0 })).await;
    let items = aggregator.continue_watching(Some("u1"), None).await.unwrap();
    assert_eq!(items[0].progress, Some(0.99));
}

#[tokio::test]
async fn test_series_in_records_and_user_list_appears_once() {
    let (store, aggregator) = fixture().await;
    let now = Utc::now();
    put(
        &store,
        "users/u1/watching",
        "dark-1-1",
        json!({ "seriesId": "dark", "seasonNumber": 1, "episodeNumber": 1, "currentTime": 2900.0, "duration": 3000.0, "updatedAt": now - Duration::hours(3) }),
    )
    .await;
    // Older documents lack seriesId; it comes from the document id
    put(
        &store,
        "users/u1/watching",
        "dark-1-2",
        json!({ "seasonNumber": 1, "episodeNumber": 2, "currentTime": 600.0, "duration": 3000.0, "updatedAt": now }),
    )
    .await;
    let summary = WatchingSummary {
        series_id: "dark".into(),
        season_number: Some(1),
        episode_number: Some(1),
        ..WatchingSummary::default()
    };
    let ozark = WatchingSummary { series_id: "ozark".into(), ..WatchingSummary::default() };
    put(&store, "users", "u1", json!({ "watching": [summary.clone(), summary, ozark] })).await;

    let items = aggregator.continue_watching(Some("u1"), Some(TitleKind::Series)).await.unwrap();
    assert_eq!(ids(&items), vec!["dark", "ozark"]);

    let dark = &items[0];
    assert_eq!(dark.episode, Some(EpisodeRef::new(1, 2)));
    assert!((dark.progress.unwrap() - 0.2).abs() < 1e-9);
    assert_eq!(items[1].progress, Some(0.0));
}

#[tokio::test]
async fn test_orphaned_entries_are_dropped() {
    let (store, aggregator) = fixture().await;
    put(&store, "users/u1/progress", "deleted_movie", json!({ "currentTime": 10.0, "duration": 100.0 })).await;
    put(
        &store,
        "users/u1/watching",
        "dark-4-1",
        json!({ "seriesId": "dark", "seasonNumber": 4, "episodeNumber": 1, "currentTime": 10.0, "duration": 100.0 }),
    )
    .await;
    put(&store, "users/u1/progress", "zodiac", json!({ "currentTime": 10.0, "duration": 100.0 })).await;

    let data = aggregator
        .load(&RowRequest { uid: Some("u1".into()), kind: None, mode: RowMode::ContinueWatching })
        .await;
    assert!(data.error.is_none());
    assert_eq!(ids(&data.items), vec!["zodiac"]);
}

#[tokio::test]
async fn test_orphaned_latest_episode_falls_back_to_older_record() {
    let (store, aggregator) = fixture().await;
    let now = Utc::now();
    put(
        &store,
        "users/u1/watching",
        "dark-1-1",
        json!({ "seriesId": "dark", "seasonNumber": 1, "episodeNumber": 1, "currentTime": 300.0, "duration": 3000.0, "updatedAt": now - Duration::days(30) }),
    )
    .await;
    put(
        &store,
        "users/u1/watching",
        "dark-1-9",
        json!({ "seriesId": "dark", "seasonNumber": 1, "episodeNumber": 9, "currentTime": 60.0, "duration": 3000.0, "updatedAt": now }),
    )
    .await;

    let items = aggregator.continue_watching(Some("u1"), None).await.unwrap();
    assert_eq!(ids(&items), vec!["dark"]);
    assert_eq!(items[0].episode, Some(EpisodeRef::new(1, 1)));
    assert_eq!(items[0].current_time, Some(300.0));
}

#[tokio::test]
async fn test_user_list_rescues_series_with_only_orphaned_records() {
    let (store, aggregator) = fixture().await;
    put(
        &store,
        "users/u1/watching",
        "dark-2-1",
        json!({ "seriesId": "dark", "seasonNumber": 2, "episodeNumber": 1, "currentTime": 60.0, "duration": 3000.0 }),
    )
    .await;
    let summary = WatchingSummary {
        series_id: "dark".into(),
        season_number: Some(1),
        episode_number: Some(2),
        ..WatchingSummary::default()
    };
    put(&store, "users", "u1", json!({ "watching": [summary] })).await;

    let items = aggregator.continue_watching(Some("u1"), None).await.unwrap();
    assert_eq!(ids(&items), vec!["dark"]);
    assert_eq!(items[0].episode, Some(EpisodeRef::new(1, 2)));
}

#[tokio::test]
async fn test_progress_session_feeds_continue_watching() {
    use crate::progress::{PlaybackSession, PlaybackTarget};

    let (store, aggregator) = fixture().await;
    let mut session = PlaybackSession::new(
        store.clone(),
        Some("u1".into()),
        PlaybackTarget::Episode {
            series_id: "dark".into(),
            episode: EpisodeRef::new(1, 3),
            title: "Episode 3".into(),
            thumbnail_url: None,
        },
        ProgressSettings::default(),
    );
    let now = Utc::now();
    session.start(now).await;
    session.on_time_update(1500.0, 3000.0, now).await;

    let items = aggregator.continue_watching(Some("u1"), None).await.unwrap();
    assert_eq!(ids(&items), vec!["dark"]);
    assert_eq!(items[0].episode, Some(EpisodeRef::new(1, 3)));
    assert_eq!(items[0].progress, Some(0.5));
}

#[tokio::test]
async fn test_watchlist_row_sorted_and_filtered() {
    let (store, aggregator) = fixture().await;
    put(&store, "users/u1/watchlist", "zodiac", json!({ "id": "zodiac", "type": "movie" })).await;
    put(&store, "users/u1/watchlist", "alien", json!({ "id": "alien", "type": "movies" })).await;
    put(&store, "users/u1/watchlist", "dark", json!({ "id": "dark", "type": "series" })).await;
    put(&store, "users/u1/watchlist", "gone", json!({ "id": "gone", "type": "movie" })).await;
    put(&store, "users/u1/watchlist", "odd", json!({ "id": "odd" })).await;
    // A title whose name was never filled in sorts first
    put(&store, "movies", "untitled", json!({ "videoUrl": "https://cdn.example/u.mp4" })).await;
    put(&store, "users/u1/watchlist", "untitled", json!({ "id": "untitled", "type": "movie" })).await;

    let all = aggregator.watchlist(Some("u1"), None).await.unwrap();
    assert_eq!(ids(&all), vec!["untitled", "alien", "dark", "zodiac"]);

    let movies = aggregator.watchlist(Some("u1"), Some(TitleKind::Movie)).await.unwrap();
    assert_eq!(ids(&movies), vec!["untitled", "alien", "zodiac"]);
}

#[tokio::test]
async fn test_browse_rows() {
    let (store, aggregator) = fixture().await;
    put(&store, "series", "legacy", json!({ "title": "Babylon Berlin", "genre": "Crime" })).await;

    let movies = aggregator.browse(Some(TitleKind::Movie), Some("Crime")).await.unwrap();
    assert_eq!(ids(&movies), vec!["heat", "zodiac"]);

    // "dark" matches through `genres`, so the legacy-only series is not merged in
    let series = aggregator.browse(Some(TitleKind::Series), Some("Crime")).await.unwrap();
    assert_eq!(ids(&series), vec!["dark"]);

    let both = aggregator.browse(None, Some("Crime")).await.unwrap();
    assert_eq!(ids(&both), vec!["dark", "heat", "zodiac"]);
    assert!(both.iter().all(|i| i.progress.is_none()));
}

#[tokio::test]
async fn test_legacy_genre_row() {
    let (store, aggregator) = fixture().await;
    put(&store, "series", "legacy", json!({ "title": "Babylon Berlin", "genre": "Noir" })).await;
    let series = aggregator.browse(Some(TitleKind::Series), Some("Noir")).await.unwrap();
    assert_eq!(ids(&series), vec!["legacy"]);
}

struct UnavailableStore;

#[async_trait]
impl DocumentStore for UnavailableStore {
    fn backend_name(&self) -> &str {
        "unavailable"
    }

    async fn get(&self, _path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        Err(StoreError::Unavailable("offline".into()))
    }

    async fn query(&self, _query: &Query) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Unavailable("offline".into()))
    }

    async fn commit(&self, _batch: Vec<WriteOp>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".into()))
    }
}

#[tokio::test]
async fn test_read_failure_sets_row_error() {
    let aggregator = Aggregator::new(Catalog::new(Arc::new(UnavailableStore), 10), &ProgressSettings::default());
    for mode in [
        RowMode::ContinueWatching,
        RowMode::Watchlist,
        RowMode::BrowseByGenre { genre: Some("Crime".into()) },
    ] {
        let data = aggregator.load(&RowRequest { uid: Some("u1".into()), kind: None, mode }).await;
        assert!(data.items.is_empty());
        assert!(data.error.unwrap().contains("offline"));
    }
}

#[tokio::test]
async fn test_load_into_respects_liveness() {
    let (_, aggregator) = fixture().await;
    let slot = RwLock::new(RowData::default());
    let request = RowRequest { uid: None, kind: Some(TitleKind::Movie), mode: RowMode::BrowseByGenre { genre: None } };

    let liveness = Liveness::new();
    assert!(aggregator.load_into(&request, &slot, &liveness).await);
    assert_eq!(slot.read().await.items.len(), 3);

    let ended = Liveness::new();
    ended.end();
    *slot.write().await = RowData::default();
    assert!(!aggregator.load_into(&request, &slot, &ended).await);
    assert!(slot.read().await.items.is_empty());
}
