//! `login`, `logout` and `whoami`
//!
//! The CLI signs in against [`LocalIdentity`], a development stand-in for the
//! hosted identity provider that keeps accounts in the document store. The
//! resulting identity and the login throttle counters are remembered in the
//! session file between invocations.

use crate::app::App;
use crate::output::Output;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use marquee_config::SessionFile;
use marquee_core::{
    Identity, IdentityFailure, IdentityService, LoginThrottle, SessionManager, SessionProvider, ThrottleState,
};
use marquee_models::UserRecord;
use marquee_store::{DocumentPath, DocumentStore, Fields};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

const MIN_PASSWORD_LEN: usize = 6;

/// Accounts stored as `users/{uid}` documents, uid derived from the email
///
/// Passwords are only checked for length; this is not an authentication
/// boundary.
pub struct LocalIdentity {
    store: Arc<dyn DocumentStore>,
}

impl LocalIdentity {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// `Alice@Example.com` becomes `alice_example_com`
    pub fn uid_for(email: &str) -> String {
        email
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }

    async fn account(&self, uid: &str) -> Result<Option<UserRecord>, IdentityFailure> {
        let doc = self
            .store
            .get(&DocumentPath::new("users", uid))
            .await
            .map_err(|e| {
                warn!("Identity lookup failed: {}", e);
                IdentityFailure::new("auth/network-request-failed")
            })?;
        Ok(doc.and_then(|d| d.decode::<UserRecord>().ok()))
    }
}

fn validate_email(email: &str) -> Result<(), IdentityFailure> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.contains('@') && domain.contains('.') && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(IdentityFailure::new("auth/invalid-email"))
    }
}

#[async_trait]
impl IdentityService for LocalIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityFailure> {
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityFailure::new("auth/weak-password"));
        }

        let uid = Self::uid_for(email);
        if self.account(&uid).await?.is_some_and(|user| user.email.is_some()) {
            return Err(IdentityFailure::new("auth/email-already-in-use"));
        }

        let mut fields = Fields::new();
        fields.insert("email".into(), json!(email.to_lowercase()));
        fields.insert("createdAt".into(), json!(Utc::now()));
        self.store
            .merge(&DocumentPath::new("users", uid.clone()), fields)
            .await
            .map_err(|e| {
                warn!("Failed to create account document: {}", e);
                IdentityFailure::new("auth/network-request-failed")
            })?;
        Ok(Identity::new(uid, email.to_lowercase()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityFailure> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(IdentityFailure::new("auth/invalid-credential"));
        }

        let uid = Self::uid_for(email);
        match self.account(&uid).await? {
            Some(UserRecord { email: Some(stored), .. }) => Ok(Identity::new(uid, stored)),
            _ => Err(IdentityFailure::new("auth/user-not-found")),
        }
    }

    async fn sign_out(&self, identity: &Identity) -> Result<(), IdentityFailure> {
        debug!("Local sign-out for {}", identity.uid);
        Ok(())
    }
}

fn throttle_state(session: &SessionFile) -> ThrottleState {
    ThrottleState {
        failures: session.get("failed_attempts").and_then(|v| v.parse().ok()).unwrap_or(0),
        locked_until: session
            .get("locked_until")
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

fn store_throttle_state(session: &mut SessionFile, state: ThrottleState) {
    session.set("failed_attempts".to_string(), state.failures.to_string());
    match state.locked_until {
        Some(until) => session.set("locked_until".to_string(), until.to_rfc3339()),
        None => session.remove("locked_until"),
    }
}

fn manager(app: &App, session: &SessionFile, current: Option<Identity>) -> SessionManager {
    let throttle = LoginThrottle::from_config(&app.config.auth);
    throttle.restore(throttle_state(session));
    SessionManager::new(
        Arc::new(LocalIdentity::new(app.store.clone())),
        throttle,
        SessionProvider::new(current),
    )
}

pub async fn run_login(app: &App, email: &str, password: &str, sign_up: bool, output: &Output) -> Result<()> {
    let mut session = app.session_file()?;
    let manager = manager(app, &session, None);
    let now = Utc::now();

    let result = if sign_up {
        manager.sign_up(email, password).await
    } else {
        manager.sign_in(email, password, now).await
    };

    store_throttle_state(&mut session, manager.throttle().snapshot());
    if let Ok(identity) = &result {
        session.set_identity(identity.uid.clone(), identity.email.clone(), now);
    }
    session.save().map_err(|e| eyre!("Failed to save session: {}", e))?;

    let identity = result?;
    output.success(format!("Signed in as {}", identity.email));
    output.data(&json!({ "uid": identity.uid, "email": identity.email }));
    Ok(())
}

pub async fn run_logout(app: &App, output: &Output) -> Result<()> {
    let mut session = app.session_file()?;
    let Some(identity) = app.identity()? else {
        output.info("Not signed in");
        return Ok(());
    };

    manager(app, &session, Some(identity.clone())).sign_out().await?;
    session.clear();
    session.save().map_err(|e| eyre!("Failed to save session: {}", e))?;
    output.success(format!("Signed out {}", identity.email));
    Ok(())
}

pub fn run_whoami(app: &App, output: &Output) -> Result<()> {
    let session = app.session_file()?;
    let Some(identity) = app.identity()? else {
        output.info("Not signed in. Run 'marquee login --email <email> --password <password>'.");
        output.data(&json!({ "signedIn": false }));
        return Ok(());
    };

    let admin = app.catalog.admin_gate().is_admin(&identity);
    if output.is_human() {
        output.key_values(
            "Session",
            &[
                ("Email", identity.email.clone()),
                ("User id", identity.uid.clone()),
                ("Admin", if admin { "yes".to_string() } else { "no".to_string() }),
                (
                    "Signed in",
                    session.signed_in_at().map(|at| at.to_rfc3339()).unwrap_or_default(),
                ),
            ],
        );
    }
    output.data(&json!({
        "signedIn": true,
        "uid": identity.uid,
        "email": identity.email,
        "admin": admin,
        "signedInAt": session.signed_in_at(),
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_store::MemoryStore;

    #[test]
    fn test_uid_is_a_valid_document_id() {
        assert_eq!(LocalIdentity::uid_for(" Alice.B@Example.com "), "alice_b_example_com");
        assert!(DocumentPath::new("users", LocalIdentity::uid_for("a/b@c.d")).validate().is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let identity = LocalIdentity::new(Arc::new(MemoryStore::new()));
        let created = identity.sign_up("viewer@example.com", "secret1").await.unwrap();
        assert_eq!(created.uid, "viewer_example_com");

        let signed_in = identity.sign_in("Viewer@Example.com", "anything").await.unwrap();
        assert_eq!(signed_in, created);

        let again = identity.sign_up("viewer@example.com", "secret1").await.unwrap_err();
        assert_eq!(again.code, "auth/email-already-in-use");
    }

    #[tokio::test]
    async fn test_sign_in_failures() {
        let identity = LocalIdentity::new(Arc::new(MemoryStore::new()));
        assert_eq!(identity.sign_in("nobody@example.com", "pw").await.unwrap_err().code, "auth/user-not-found");
        assert_eq!(identity.sign_in("not-an-email", "pw").await.unwrap_err().code, "auth/invalid-email");
        assert_eq!(identity.sign_up("new@example.com", "12345").await.unwrap_err().code, "auth/weak-password");
    }

    #[tokio::test]
    async fn test_sign_up_keeps_existing_user_data() {
        let store = Arc::new(MemoryStore::new());
        let mut fields = Fields::new();
        fields.insert("watching".into(), json!([{ "seriesId": "dark" }]));
        store.set(&DocumentPath::new("users", "viewer_example_com"), fields).await.unwrap();

        LocalIdentity::new(store.clone()).sign_up("viewer@example.com", "secret1").await.unwrap();
        let user: UserRecord = store
            .get(&DocumentPath::new("users", "viewer_example_com"))
            .await
            .unwrap()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(user.watching.len(), 1);
        assert_eq!(user.email.as_deref(), Some("viewer@example.com"));
    }

    #[test]
    fn test_throttle_state_round_trips_through_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SessionFile::new(dir.path().join("session.toml"));
        let until = Utc::now();
        store_throttle_state(&mut session, ThrottleState { failures: 5, locked_until: Some(until) });
        session.save().unwrap();

        let mut reloaded = SessionFile::new(dir.path().join("session.toml"));
        reloaded.load().unwrap();
        let state = throttle_state(&reloaded);
        assert_eq!(state.failures, 5);
        assert_eq!(state.locked_until.map(|t| t.timestamp()), Some(until.timestamp()));
    }
}
