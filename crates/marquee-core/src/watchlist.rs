use chrono::{DateTime, Utc};
use marquee_models::{Title, WatchlistEntry};
use marquee_store::{to_fields, DocumentPath, DocumentStore};
use std::sync::Arc;
use tracing::{debug, info};
use crate::error::{CoreError, CoreResult};

/// Per-user saved-for-later list under `users/{uid}/watchlist`
///
/// Membership is checked and changed in two separate store calls; two
/// concurrent toggles on the same title can both observe the old state.
#[derive(Clone)]
pub struct Watchlist {
    store: Arc<dyn DocumentStore>,
}

impl Watchlist {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn collection(uid: &str) -> String {
        format!("users/{}/watchlist", uid)
    }

    fn entry_path(uid: &str, title_id: &str) -> CoreResult<DocumentPath> {
        if uid.is_empty() {
            return Err(CoreError::NotSignedIn);
        }
        let path = DocumentPath::new(Self::collection(uid), title_id);
        path.validate()?;
        Ok(path)
    }

    pub async fn contains(&self, uid: &str, title_id: &str) -> CoreResult<bool> {
        let path = Self::entry_path(uid, title_id)?;
        Ok(self.store.get(&path).await?.is_some())
    }

    /// Insert (or overwrite) the entry with a snapshot of the title
    pub async fn add(&self, uid: &str, title: &Title, now: DateTime<Utc>) -> CoreResult<()> {
        let path = Self::entry_path(uid, title.id())?;
        let mut entry = WatchlistEntry::new(title.id(), title.kind(), now);
        entry.title = Some(title.name().to_string());
        entry.thumbnail_url = title.info().thumbnail_url.clone();

        self.store.set(&path, to_fields(&entry)?).await?;
        info!("Added {} {} to watchlist of {}", title.kind(), title.id(), uid);
        Ok(())
    }

    /// Remove the entry; removing an absent entry is a no-op
    pub async fn remove(&self, uid: &str, title_id: &str) -> CoreResult<()> {
        let path = Self::entry_path(uid, title_id)?;
        self.store.delete(&path).await?;
        info!("Removed {} from watchlist of {}", title_id, uid);
        Ok(())
    }

    /// Flip membership; returns whether the title is in the list afterwards
    pub async fn toggle(&self, uid: &str, title: &Title, now: DateTime<Utc>) -> CoreResult<bool> {
        if self.contains(uid, title.id()).await? {
            self.remove(uid, title.id()).await?;
            Ok(false)
        } else {
            self.add(uid, title, now).await?;
            Ok(true)
        }
    }

    /// Raw entries in store order; entries that fail to decode are skipped
    pub async fn list(&self, uid: &str) -> CoreResult<Vec<WatchlistEntry>> {
        if uid.is_empty() {
            return Err(CoreError::NotSignedIn);
        }
        let docs = self.store.list(&Self::collection(uid)).await?;
        let entries: Vec<WatchlistEntry> = docs
            .iter()
            .filter_map(|doc| match doc.decode::<WatchlistEntry>() {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping malformed watchlist entry: {}", e);
                    None
                }
            })
            .collect();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_models::{Movie, Series, TitleInfo, TitleKind};
    use marquee_store::MemoryStore;

    fn heat() -> Title {
        let mut info = TitleInfo::new("m1", "Heat");
        info.thumbnail_url = Some("https://cdn.example/heat.jpg".to_string());
        Title::Movie(Movie { info, video_url: Some("https://cdn.example/heat.mp4".into()), duration: None })
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_membership() {
        let watchlist = Watchlist::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        assert!(!watchlist.contains("u1", "m1").await.unwrap());

        assert!(watchlist.toggle("u1", &heat(), now).await.unwrap());
        assert!(watchlist.contains("u1", "m1").await.unwrap());

        assert!(!watchlist.toggle("u1", &heat(), now).await.unwrap());
        assert!(!watchlist.contains("u1", "m1").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let watchlist = Watchlist::new(Arc::new(MemoryStore::new()));
        watchlist.add("u1", &heat(), Utc::now()).await.unwrap();
        // Adding again overwrites the same entry
        watchlist.add("u1", &heat(), Utc::now()).await.unwrap();
        assert_eq!(watchlist.list("u1").await.unwrap().len(), 1);

        watchlist.remove("u1", "m1").await.unwrap();
        assert!(!watchlist.contains("u1", "m1").await.unwrap());
        // Removing a missing entry is fine
        watchlist.remove("u1", "m1").await.unwrap();
    }

    #[tokio::test]
    async fn test_entry_snapshot() {
        let watchlist = Watchlist::new(Arc::new(MemoryStore::new()));
        let dark = Title::Series(Series { info: TitleInfo::new("s1", "Dark") });
        watchlist.add("u1", &heat(), Utc::now()).await.unwrap();
        watchlist.add("u1", &dark, Utc::now()).await.unwrap();

        let entries = watchlist.list("u1").await.unwrap();
        let heat_entry = entries.iter().find(|e| e.id == "m1").unwrap();
        assert_eq!(heat_entry.kind(), Some(TitleKind::Movie));
        assert_eq!(heat_entry.title.as_deref(), Some("Heat"));
        assert_eq!(heat_entry.thumbnail_url.as_deref(), Some("https://cdn.example/heat.jpg"));
        assert!(heat_entry.added_at.is_some());
        assert_eq!(entries.iter().find(|e| e.id == "s1").unwrap().kind(), Some(TitleKind::Series));

        // Lists are per user
        assert!(watchlist.list("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_requires_user() {
        let watchlist = Watchlist::new(Arc::new(MemoryStore::new()));
        assert!(matches!(watchlist.toggle("", &heat(), Utc::now()).await, Err(CoreError::NotSignedIn)));
    }
}
