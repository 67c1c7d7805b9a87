use super::*;
use marquee_models::TitleInfo;
use marquee_store::MemoryStore;
use serde_json::json;

fn admin() -> Identity {
    Identity::new("admin-uid", "admin@example.com")
}

fn catalog() -> Catalog {
    Catalog::new(Arc::new(MemoryStore::new()), 10).with_admin_gate(AdminGate::new(["admin@example.com"]))
}

fn movie(id: &str, title: &str, genres: &[&str]) -> Movie {
    let mut info = TitleInfo::new(id, title);
    info.genres = genres.iter().map(|g| g.to_string()).collect();
    Movie {
        info,
        video_url: Some(format!("https://cdn.example/{}.mp4", id)),
        duration: Some(5400.0),
    }
}

fn episode(number: u32) -> Episode {
    Episode {
        number,
        title: format!("Chapter {}", number),
        video_url: Some(format!("https://cdn.example/ep{}.mp4", number)),
        ..Episode::default()
    }
}

fn season(number: u32, episodes: &[u32]) -> SeasonPlan {
    SeasonPlan {
        number,
        title: String::new(),
        episodes: episodes.iter().map(|n| episode(*n)).collect(),
    }
}

async fn seed_series(catalog: &Catalog) -> String {
    let series = Series { info: TitleInfo::new("dark", "Dark") };
    catalog
        .create_series(Some(&admin()), series, vec![season(2, &[1]), season(1, &[2, 1, 3])])
        .await
        .unwrap()
}

#[tokio::test]
async fn test_by_genre_prefers_genres_array() {
    let catalog = catalog();
    catalog.create_movie(Some(&admin()), movie("heat", "Heat", &["Crime", "Drama"])).await.unwrap();
    catalog.create_movie(Some(&admin()), movie("alien", "Alien", &["Horror"])).await.unwrap();

    let crime = catalog.by_genre(TitleKind::Movie, Some("Crime")).await.unwrap();
    assert_eq!(crime.len(), 1);
    assert_eq!(crime[0].id(), "heat");
    assert_eq!(crime[0].kind(), TitleKind::Movie);
}

#[tokio::test]
async fn test_by_genre_falls_back_to_legacy_field() {
    let catalog = catalog();
    catalog
        .store()
        .set(
            &DocumentPath::new("movies", "old"),
            to_fields(&json!({ "title": "Old Timer", "genre": "Drama", "videoUrl": "https://cdn.example/old.mp4" }))
                .unwrap(),
        )
        .await
        .unwrap();

    let drama = catalog.by_genre(TitleKind::Movie, Some("Drama")).await.unwrap();
    assert_eq!(drama.len(), 1);
    assert_eq!(drama[0].name(), "Old Timer");

    // Once any title matches through `genres`, the legacy field is not consulted
    catalog.create_movie(Some(&admin()), movie("new", "New Wave", &["Drama"])).await.unwrap();
    let drama = catalog.by_genre(TitleKind::Movie, Some("Drama")).await.unwrap();
    assert_eq!(drama.iter().map(|t| t.id()).collect::<Vec<_>>(), vec!["new"]);
}

#[tokio::test]
async fn test_unfiltered_browse_is_bounded() {
    let catalog = Catalog::new(Arc::new(MemoryStore::new()), 3).with_admin_gate(AdminGate::new(["admin@example.com"]));
    for i in 0..5 {
        catalog
            .create_movie(Some(&admin()), movie(&format!("m{}", i), &format!("Movie {}", i), &[]))
            .await
            .unwrap();
    }
    assert_eq!(catalog.by_genre(TitleKind::Movie, None).await.unwrap().len(), 3);
    assert_eq!(catalog.by_genre(TitleKind::Movie, Some("  ")).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_search_is_case_insensitive_across_kinds() {
    let catalog = catalog();
    catalog.create_movie(Some(&admin()), movie("dark_water", "Dark Water", &[])).await.unwrap();
    seed_series(&catalog).await;
    catalog.create_movie(Some(&admin()), movie("heat", "Heat", &[])).await.unwrap();

    let results = catalog.search("DARK").await.unwrap();
    assert_eq!(results.iter().map(|t| t.name()).collect::<Vec<_>>(), vec!["Dark", "Dark Water"]);
    assert!(catalog.search("   ").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_seasons_and_episodes_are_ordered() {
    let catalog = catalog();
    let id = seed_series(&catalog).await;
    assert_eq!(id, "dark");

    let seasons = catalog.seasons(&id).await.unwrap();
    assert_eq!(seasons.iter().map(|s| s.number).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(seasons[0].title, "Season 1");

    let episodes = catalog.episodes(&id, 1).await.unwrap();
    assert_eq!(episodes.iter().map(|e| e.number).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(catalog.episodes(&id, 9).await.unwrap().is_empty());

    let resolved = catalog.resolve_episode(&id, 1, 2).await.unwrap().unwrap();
    assert_eq!(resolved.episode.title, "Chapter 2");
    assert!(catalog.resolve_episode(&id, 1, 7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_next_episode_crosses_seasons() {
    let catalog = catalog();
    let id = seed_series(&catalog).await;

    let next = catalog.next_episode(&id, EpisodeRef::new(1, 1)).await.unwrap().unwrap();
    assert_eq!(next.episode_ref(), EpisodeRef::new(1, 2));

    let next = catalog.next_episode(&id, EpisodeRef::new(1, 3)).await.unwrap().unwrap();
    assert_eq!(next.episode_ref(), EpisodeRef::new(2, 1));

    assert!(catalog.next_episode(&id, EpisodeRef::new(2, 1)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_curation_requires_admin() {
    let catalog = catalog();
    let viewer = Identity::new("u1", "viewer@example.com");
    let err = catalog.create_movie(Some(&viewer), movie("heat", "Heat", &[])).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));
    let err = catalog.create_movie(None, movie("heat", "Heat", &[])).await.unwrap_err();
    assert!(matches!(err, CoreError::NotSignedIn));
    assert!(catalog.find_title(TitleKind::Movie, "heat").await.unwrap().is_none());
}

#[tokio::test]
async fn test_curation_validation() {
    let catalog = catalog();
    let mut no_video = movie("x", "X", &[]);
    no_video.video_url = None;
    assert!(matches!(
        catalog.create_movie(Some(&admin()), no_video).await,
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        catalog.create_movie(Some(&admin()), movie("y", "  ", &[])).await,
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        catalog.create_movie(Some(&admin()), movie("bad-id", "Bad", &[])).await,
        Err(CoreError::Validation(_))
    ));

    let series = Series { info: TitleInfo::new("", "Empty") };
    assert!(matches!(
        catalog.create_series(Some(&admin()), series.clone(), Vec::new()).await,
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        catalog
            .create_series(Some(&admin()), series.clone(), vec![season(1, &[1]), season(1, &[2])])
            .await,
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        catalog.create_series(Some(&admin()), series, vec![season(1, &[1, 1])]).await,
        Err(CoreError::Validation(_))
    ));
    assert_eq!(catalog.list_titles(TitleKind::Series).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_generated_ids_are_unique_slugs() {
    let catalog = catalog();
    let first = catalog.create_movie(Some(&admin()), movie("", "Amélie", &[])).await.unwrap();
    let second = catalog.create_movie(Some(&admin()), movie("", "Amélie", &[])).await.unwrap();
    assert_eq!(first, "amelie");
    assert_eq!(second, "amelie_2");
}

#[test]
fn test_slug_truncation_leaves_no_trailing_separator() {
    let title = format!("{} {}", "a".repeat(47), "tail");
    let slug = slugify(&title);
    assert_eq!(slug, "a".repeat(47));
    assert_eq!(slugify("Dark: Season One!"), "dark_season_one");
    assert_eq!(slugify("!!!"), "title");
}

#[tokio::test]
async fn test_add_season_and_episode() {
    let catalog = catalog();
    let id = seed_series(&catalog).await;

    assert!(matches!(
        catalog.add_season(Some(&admin()), &id, season(1, &[])).await,
        Err(CoreError::Validation(_))
    ));
    catalog.add_season(Some(&admin()), &id, season(3, &[1, 2])).await.unwrap();
    assert_eq!(catalog.seasons(&id).await.unwrap().len(), 3);

    catalog.add_episode(Some(&admin()), &id, 2, episode(2)).await.unwrap();
    assert!(matches!(
        catalog.add_episode(Some(&admin()), &id, 2, episode(2)).await,
        Err(CoreError::Validation(_))
    ));
    let err = catalog.add_episode(Some(&admin()), &id, 8, episode(1)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_series_removes_subtree() {
    let catalog = catalog();
    let id = seed_series(&catalog).await;
    catalog.create_movie(Some(&admin()), movie("heat", "Heat", &[])).await.unwrap();

    catalog.delete_title(Some(&admin()), TitleKind::Series, &id).await.unwrap();
    assert!(catalog.find_title(TitleKind::Series, &id).await.unwrap().is_none());
    assert!(catalog.seasons(&id).await.unwrap().is_empty());
    assert!(catalog.store().list("series/dark/seasons/season_1/episodes").await.unwrap().is_empty());
    assert!(catalog.find_title(TitleKind::Movie, "heat").await.unwrap().is_some());

    let err = catalog.delete_title(Some(&admin()), TitleKind::Series, &id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_season_and_episode() {
    let catalog = catalog();
    let id = seed_series(&catalog).await;

    catalog.delete_episode(Some(&admin()), &id, 1, 2).await.unwrap();
    let numbers: Vec<u32> = catalog.episodes(&id, 1).await.unwrap().iter().map(|e| e.number).collect();
    assert_eq!(numbers, vec![1, 3]);

    catalog.delete_season(Some(&admin()), &id, 1).await.unwrap();
    assert_eq!(catalog.seasons(&id).await.unwrap().len(), 1);
    assert!(catalog.store().list("series/dark/seasons/season_1/episodes").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_title_merges_fields() {
    let catalog = catalog();
    catalog.create_movie(Some(&admin()), movie("heat", "Heat", &["Crime"])).await.unwrap();

    let mut title = catalog.get_title(TitleKind::Movie, "heat").await.unwrap();
    title.info_mut().description = "Los Angeles, 1995.".to_string();
    catalog.update_title(Some(&admin()), title).await.unwrap();

    let updated = catalog.get_title(TitleKind::Movie, "heat").await.unwrap();
    assert_eq!(updated.info().description, "Los Angeles, 1995.");
    assert_eq!(updated.info().genres, vec!["Crime".to_string()]);

    let missing = Title::Movie(movie("nope", "Nope", &[]));
    assert!(catalog.update_title(Some(&admin()), missing).await.unwrap_err().is_not_found());
}
