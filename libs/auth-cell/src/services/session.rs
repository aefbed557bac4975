// libs/auth-cell/src/services/session.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use role_directory_cell::{ForceLogoutMonitor, RoleDirectoryService, SessionHooks};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_store::{Collection, StoreError};
use shared_utils::jwt::validate_token;

use crate::models::{AuthError, SessionRecord};

type MonitorRegistry = Arc<RwLock<HashMap<String, JoinHandle<()>>>>;

/// Owns the cookie sessions. Opening one validates the bearer token, stores
/// the session record, registers the user with the role directory and
/// spawns a force-logout monitor that revokes the session if an admin
/// raises the flag.
#[derive(Clone)]
pub struct SessionService {
    config: Arc<AppConfig>,
    sessions: Collection<SessionRecord>,
    directory: RoleDirectoryService,
    monitors: MonitorRegistry,
}

impl SessionService {
    pub fn new(
        config: Arc<AppConfig>,
        sessions: Collection<SessionRecord>,
        directory: RoleDirectoryService,
    ) -> Self {
        Self {
            config,
            sessions,
            directory,
            monitors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn open_session(&self, token: &str) -> Result<SessionRecord, AuthError> {
        let user = validate_token(token, &self.config.jwt_secret).map_err(AuthError::InvalidToken)?;

        let now = Utc::now();
        let record = SessionRecord {
            token: token.to_string(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: now + Duration::seconds(self.config.session_max_age_seconds),
        };

        // Re-sending the same token just refreshes the session window.
        match self.sessions.insert(record.clone()).await {
            Ok(_) => {}
            Err(StoreError::Duplicate { .. }) => {
                self.sessions
                    .try_update(&record.token, |existing| {
                        *existing = record.clone();
                        Ok::<(), StoreError>(())
                    })
                    .await?;
            }
            Err(other) => return Err(other.into()),
        }

        // First sign-in lands the user in the directory as a patient. A
        // directory hiccup never blocks the login itself.
        if let Err(e) = self.directory.register(&user.id).await {
            warn!("Could not register {} with the role directory: {}", user.id, e);
        }

        self.spawn_monitor(&user.id).await;
        info!("Session opened for {}", user.id);
        Ok(record)
    }

    /// Closes the session behind a token. Unknown tokens are fine; logout
    /// must succeed no matter how stale the client's cookie is.
    pub async fn close_session(&self, token: &str) -> Result<(), AuthError> {
        match self.sessions.remove(&token.to_string()).await {
            Ok(record) => {
                self.stop_monitor(&record.user_id).await;
                info!("Session closed for {}", record.user_id);
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => Ok(()),
            Err(other) => Err(other.into()),
        }
    }

    /// Resolves a cookie token back to its user, enforcing both the session
    /// window and the token's own validity.
    pub async fn resolve(&self, token: &str) -> Result<User, AuthError> {
        let record = self
            .sessions
            .get(&token.to_string())
            .await
            .ok_or(AuthError::NotAuthenticated)?;

        if record.expires_at < Utc::now() {
            debug!("Session for {} expired, removing", record.user_id);
            let _ = self.sessions.remove(&record.token).await;
            return Err(AuthError::NotAuthenticated);
        }

        validate_token(token, &self.config.jwt_secret).map_err(|_| AuthError::NotAuthenticated)
    }

    /// Revokes every open session of one user. Used by the force-logout
    /// monitor; the next gated request then bounces to the login page.
    pub async fn revoke_user_sessions(&self, user_id: &str) {
        let open = self.sessions.find(|s| s.user_id == user_id).await;
        for record in open {
            if let Err(e) = self.sessions.remove(&record.token).await {
                warn!("Could not revoke a session for {}: {}", user_id, e);
            }
        }
    }

    async fn spawn_monitor(&self, user_id: &str) {
        let hooks = Arc::new(SessionRevoker {
            sessions: self.clone(),
            user_id: user_id.to_string(),
        });
        let monitor = ForceLogoutMonitor::new(self.directory.clone(), user_id, hooks);

        let mut monitors = self.monitors.write().await;
        // A second login replaces the previous monitor rather than stacking.
        if let Some(previous) = monitors.insert(user_id.to_string(), monitor.spawn()) {
            previous.abort();
        }
    }

    async fn stop_monitor(&self, user_id: &str) {
        if let Some(handle) = self.monitors.write().await.remove(user_id) {
            handle.abort();
        }
    }

    /// Drops the registry entry without aborting. The revoker runs inside
    /// the monitor task, which must stay alive through its remaining hooks.
    async fn forget_monitor(&self, user_id: &str) {
        self.monitors.write().await.remove(user_id);
    }
}

/// What a consumed force-logout signal does to this cell: drop the user's
/// sessions, then leave the routing to the gates, which send the now
/// cookie-less client to the login page.
struct SessionRevoker {
    sessions: SessionService,
    user_id: String,
}

#[async_trait]
impl SessionHooks for SessionRevoker {
    async fn sign_out(&self) {
        self.sessions.revoke_user_sessions(&self.user_id).await;
        self.sessions.forget_monitor(&self.user_id).await;
    }

    async fn redirect_to_login(&self) {
        info!("{} will be routed to the login page", self.user_id);
    }
}
