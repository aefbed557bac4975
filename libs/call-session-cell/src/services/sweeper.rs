// libs/call-session-cell/src/services/sweeper.rs
use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::CallSessionError;
use crate::services::session::CallSessionService;

/// Background task expiring unanswered calls. Runs on its own cadence with
/// every cycle bounded by a timeout, so a slow sweep can never back up the
/// interactive call paths. A cycle that fails or times out is simply
/// retried at the next tick.
pub struct CallSweeper {
    sessions: CallSessionService,
    interval: Duration,
    cycle_timeout: Duration,
    expiry: ChronoDuration,
    is_shutdown: tokio::sync::RwLock<bool>,
}

impl CallSweeper {
    pub fn new(sessions: CallSessionService, config: &AppConfig) -> Self {
        Self {
            sessions,
            interval: Duration::from_secs(config.sweep_interval_seconds),
            cycle_timeout: Duration::from_secs(config.sweep_timeout_seconds),
            expiry: ChronoDuration::minutes(config.call_expiry_minutes),
            is_shutdown: tokio::sync::RwLock::new(false),
        }
    }

    pub async fn run(&self) {
        info!(
            "Call sweeper started: every {:?}, expiry {} min",
            self.interval,
            self.expiry.num_minutes()
        );
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if *self.is_shutdown.read().await {
                        break;
                    }
                    self.sweep_once().await;
                }
                _ = self.wait_for_shutdown() => {
                    break;
                }
            }
        }

        info!("Call sweeper stopped");
    }

    pub async fn shutdown(&self) {
        info!("Stopping call sweeper");
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }

    async fn sweep_once(&self) {
        let sweep = self.sessions.sweep_expired(Utc::now(), self.expiry);
        match timeout(self.cycle_timeout, sweep).await {
            Ok(Ok(outcome)) => {
                if outcome.examined > 0 {
                    info!(
                        "Sweep pass: {} examined, {} marked missed",
                        outcome.examined, outcome.swept
                    );
                } else {
                    debug!("Sweep pass: nothing waiting past expiry");
                }
            }
            Ok(Err(CallSessionError::SweepPartialFailure { failures })) => {
                // Retried next cycle; never escalated further.
                warn!("Sweep pass left {} sessions unswept", failures.len());
            }
            Ok(Err(err)) => {
                warn!("Sweep pass failed: {}", err);
            }
            Err(_) => {
                warn!("Sweep pass timed out after {:?}", self.cycle_timeout);
            }
        }
    }

    async fn wait_for_shutdown(&self) {
        loop {
            if *self.is_shutdown.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
