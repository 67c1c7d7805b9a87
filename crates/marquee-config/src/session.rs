use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
struct SessionData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Persisted identity of the signed-in user, kept in `session.toml`
///
/// The identity service itself is external; this only remembers which
/// uid/email pair the last sign-in produced, plus any extra keys a front end
/// wants to keep between runs.
pub struct SessionFile {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl SessionFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            values: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let session: SessionData = toml::from_str(&content)?;
            self.values = session.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let session = SessionData {
            data: self.values.clone(),
        };
        let content = toml::to_string_pretty(&session)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.values.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn uid(&self) -> Option<&String> {
        self.get("uid")
    }

    pub fn email(&self) -> Option<&String> {
        self.get("email")
    }

    pub fn signed_in_at(&self) -> Option<DateTime<Utc>> {
        self.get("signed_in_at")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Record a sign-in
    pub fn set_identity(&mut self, uid: String, email: String, at: DateTime<Utc>) {
        self.set("uid".to_string(), uid);
        self.set("email".to_string(), email);
        self.set("signed_in_at".to_string(), at.to_rfc3339());
    }

    /// Forget the signed-in identity
    pub fn clear(&mut self) {
        self.remove("uid");
        self.remove("email");
        self.remove("signed_in_at");
    }

    pub fn is_signed_in(&self) -> bool {
        self.uid().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_session_file_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut session = SessionFile::new(path.clone());
        let at = Utc::now();
        session.set_identity("u1".to_string(), "viewer@example.com".to_string(), at);
        session.save().unwrap();

        let mut loaded = SessionFile::new(path);
        loaded.load().unwrap();
        assert!(loaded.is_signed_in());
        assert_eq!(loaded.uid(), Some(&"u1".to_string()));
        assert_eq!(loaded.email(), Some(&"viewer@example.com".to_string()));
        // RFC 3339 keeps sub-second precision, allow a little slack anyway
        let loaded_at = loaded.signed_in_at().unwrap();
        assert!((loaded_at - at).num_seconds().abs() < 2);
    }

    #[test]
    fn test_session_file_clear() {
        let mut session = SessionFile::new(PathBuf::from("/tmp/marquee-session-test"));
        session.set_identity("u1".to_string(), "viewer@example.com".to_string(), Utc::now());
        assert!(session.is_signed_in());
        session.clear();
        assert!(!session.is_signed_in());
        assert_eq!(session.email(), None);
    }
}
