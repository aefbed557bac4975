use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::services::directory::RoleDirectoryService;

/// What actually happens to a session when its user is forced out. The
/// concrete implementation lives with whoever owns the session (cookie
/// registry, test double), keeping this cell free of session plumbing.
#[async_trait]
pub trait SessionHooks: Send + Sync {
    async fn sign_out(&self);
    async fn redirect_to_login(&self);
}

/// Watches one user's directory record and consumes the force-logout signal
/// when it appears. One monitor serves one live session; it finishes after
/// consuming, and the next login spawns a fresh one.
pub struct ForceLogoutMonitor {
    directory: RoleDirectoryService,
    user_id: String,
    hooks: Arc<dyn SessionHooks>,
}

impl ForceLogoutMonitor {
    pub fn new(
        directory: RoleDirectoryService,
        user_id: impl Into<String>,
        hooks: Arc<dyn SessionHooks>,
    ) -> Self {
        Self {
            directory,
            user_id: user_id.into(),
            hooks,
        }
    }

    /// Runs until the signal is consumed or the directory feed closes.
    /// Aborting the task tears the subscription down with it.
    pub async fn run(self) {
        let mut watch = self.directory.watch(&self.user_id);
        while let Some(record) = watch.next().await {
            if record.force_logout {
                self.consume().await;
                break;
            }
        }
        debug!("Force-logout monitor for {} stopped", self.user_id);
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The consumption cycle, in strict order: reset the flag so the next
    /// login does not bounce straight back out, then sign the session out,
    /// then route to the login entry point. The reset is best-effort; a
    /// failed write never blocks the remaining steps.
    pub async fn consume(&self) {
        info!("Consuming force-logout signal for {}", self.user_id);

        if let Err(e) = self.directory.clear_force_logout(&self.user_id).await {
            warn!("Failed to reset force-logout flag for {}: {}", self.user_id, e);
        }

        self.hooks.sign_out().await;
        self.hooks.redirect_to_login().await;
    }
}
