//! Signed-in identity, login throttling and the admin gate
//!
//! Authentication itself belongs to an external identity service reached
//! through [`IdentityService`]. [`SessionManager`] wraps it with the failed
//! attempt throttle and publishes the resulting identity through a
//! [`SessionProvider`] that other components subscribe to.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use marquee_config::{AdminConfig, AuthConfig};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
        }
    }
}

/// Failure reported by the identity provider, identified by its error code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityFailure {
    pub code: String,
}

impl IdentityFailure {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityFailure>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityFailure>;
    async fn sign_out(&self, identity: &Identity) -> Result<(), IdentityFailure>;
}

/// User-facing message for a provider error code
pub fn auth_error_message(code: &str) -> &'static str {
    match code {
        "auth/invalid-email" => "The email address is not valid.",
        "auth/user-not-found" | "auth/wrong-password" | "auth/invalid-credential" => {
            "Incorrect email or password."
        }
        "auth/email-already-in-use" => "An account already exists for this email.",
        "auth/weak-password" => "The password must have at least 6 characters.",
        "auth/too-many-requests" => "Too many attempts. Try again later.",
        "auth/network-request-failed" => "Network error. Check your connection.",
        "auth/user-disabled" => "This account has been disabled.",
        _ => "Authentication failed. Try again.",
    }
}

/// Current identity, observable by subscribers
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct SessionProvider {
    sender: Arc<watch::Sender<Option<Identity>>>,
}

impl SessionProvider {
    pub fn new(initial: Option<Identity>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.sender.borrow().clone()
    }

    pub fn uid(&self) -> Option<String> {
        self.sender.borrow().as_ref().map(|i| i.uid.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.sender.subscribe()
    }

    pub fn set(&self, identity: Option<Identity>) {
        self.sender.send_replace(identity);
    }
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Throttle counters, persisted between processes by short-lived front ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleState {
    pub failures: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Refuses attempts for a while after too many consecutive failures
#[derive(Debug)]
pub struct LoginThrottle {
    max_failures: u32,
    lockout: Duration,
    state: Mutex<ThrottleState>,
}

impl LoginThrottle {
    pub fn new(max_failures: u32, lockout: Duration) -> Self {
        Self {
            max_failures: max_failures.max(1),
            lockout,
            state: Mutex::new(ThrottleState::default()),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.max_failed_attempts,
            Duration::seconds(config.lockout_secs.min(86_400) as i64),
        )
    }

    /// Err with the remaining lockout while locked
    pub fn check(&self, now: DateTime<Utc>) -> CoreResult<()> {
        let mut state = self.lock_state();
        if let Some(until) = state.locked_until {
            if now < until {
                let remaining = (until - now).num_seconds().max(1) as u64;
                return Err(CoreError::Locked { retry_after_secs: remaining });
            }
            state.locked_until = None;
            state.failures = 0;
        }
        Ok(())
    }

    pub fn record_failure(&self, now: DateTime<Utc>) {
        let mut state = self.lock_state();
        state.failures += 1;
        if state.failures >= self.max_failures {
            state.locked_until = Some(now + self.lockout);
            warn!("Locking sign-in for {}s after {} failed attempts", self.lockout.num_seconds(), state.failures);
        }
    }

    pub fn record_success(&self) {
        let mut state = self.lock_state();
        state.failures = 0;
        state.locked_until = None;
    }

    pub fn failures(&self) -> u32 {
        self.lock_state().failures
    }

    pub fn snapshot(&self) -> ThrottleState {
        *self.lock_state()
    }

    pub fn restore(&self, state: ThrottleState) {
        *self.lock_state() = state;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ThrottleState> {
        // Counters remain consistent after a poisoning panic
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Sign-in flow: throttle, identity provider, session publication
pub struct SessionManager {
    identity: Arc<dyn IdentityService>,
    throttle: LoginThrottle,
    provider: SessionProvider,
}

impl SessionManager {
    pub fn new(identity: Arc<dyn IdentityService>, throttle: LoginThrottle, provider: SessionProvider) -> Self {
        Self {
            identity,
            throttle,
            provider,
        }
    }

    pub fn provider(&self) -> &SessionProvider {
        &self.provider
    }

    pub fn throttle(&self) -> &LoginThrottle {
        &self.throttle
    }

    pub async fn sign_in(&self, email: &str, password: &str, now: DateTime<Utc>) -> CoreResult<Identity> {
        self.throttle.check(now)?;
        match self.identity.sign_in(email.trim(), password).await {
            Ok(identity) => {
                self.throttle.record_success();
                info!("Signed in as {}", identity.email);
                self.provider.set(Some(identity.clone()));
                Ok(identity)
            }
            Err(failure) => {
                self.throttle.record_failure(now);
                debug!("Sign-in failed with code {}", failure.code);
                Err(identity_error(failure))
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> CoreResult<Identity> {
        let identity = self
            .identity
            .sign_up(email.trim(), password)
            .await
            .map_err(identity_error)?;
        info!("Created account for {}", identity.email);
        self.provider.set(Some(identity.clone()));
        Ok(identity)
    }

    pub async fn sign_out(&self) -> CoreResult<()> {
        if let Some(identity) = self.provider.current() {
            self.identity.sign_out(&identity).await.map_err(identity_error)?;
            info!("Signed out {}", identity.email);
        }
        self.provider.set(None);
        Ok(())
    }
}

fn identity_error(failure: IdentityFailure) -> CoreError {
    CoreError::Identity {
        message: auth_error_message(&failure.code).to_string(),
        code: failure.code,
    }
}

/// Allow-list check for catalog curation
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    allowed: Vec<String>,
}

impl AdminGate {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(&config.allowed_emails)
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        let email = identity.email.trim().to_lowercase();
        self.allowed.iter().any(|a| *a == email)
    }

    pub fn authorize(&self, actor: Option<&Identity>) -> CoreResult<()> {
        match actor {
            None => Err(CoreError::NotSignedIn),
            Some(identity) if self.is_admin(identity) => Ok(()),
            Some(identity) => Err(CoreError::Forbidden(format!(
                "{} is not allowed to curate the catalog",
                identity.email
            ))),
        }
    }
}
