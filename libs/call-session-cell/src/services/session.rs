// libs/call-session-cell/src/services/session.rs
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_store::Collection;

use crate::models::{
    CallSession, CallSessionError, CallSessionStatus, CallerIdentity, InitiateCallRequest,
    SweepFailure, SweepOutcome,
};

/// Owns the call-session lifecycle: `Waiting -> Active -> Ended`, with
/// `Waiting -> Missed` when nobody answers before the expiry threshold.
#[derive(Clone)]
pub struct CallSessionService {
    sessions: Collection<CallSession>,
}

impl CallSessionService {
    pub fn new(sessions: Collection<CallSession>) -> Self {
        Self { sessions }
    }

    /// Starts a call for an authenticated caller. The channel name combines
    /// the caller identity with the initiation instant in milliseconds, so
    /// it is unique without any coordination.
    pub async fn initiate(
        &self,
        identity: Option<CallerIdentity>,
        request: InitiateCallRequest,
    ) -> Result<CallSession, CallSessionError> {
        let identity = identity.ok_or(CallSessionError::NotAuthenticated)?;

        let now = Utc::now();
        let session = CallSession {
            id: Uuid::new_v4(),
            channel_name: format!("{}_{}", identity.user_id, now.timestamp_millis()),
            patient_id: identity.user_id,
            patient_name: identity.name,
            patient_email: identity.email,
            patient_phone: identity.phone,
            call_type: request.call_type,
            urgency: request.urgency,
            status: CallSessionStatus::Waiting,
            requested_at: now,
            answered_at: None,
            ended_at: None,
        };

        let created = self.sessions.insert(session).await?;
        info!(
            "Call {} initiated by {} on channel {}",
            created.id, created.patient_id, created.channel_name
        );
        Ok(created)
    }

    pub async fn get(&self, channel_name: &str) -> Result<CallSession, CallSessionError> {
        self.sessions
            .get(&channel_name.to_string())
            .await
            .ok_or_else(|| CallSessionError::NotFound(channel_name.to_string()))
    }

    /// Marks a channel answered (`Waiting -> Active`). Safe to call
    /// repeatedly: a session that is already active or terminal is returned
    /// unchanged.
    pub async fn mark_active(&self, channel_name: &str) -> Result<CallSession, CallSessionError> {
        let current = self.get(channel_name).await?;
        if current.status != CallSessionStatus::Waiting {
            debug!(
                "Channel {} is {}, mark_active is a no-op",
                channel_name, current.status
            );
            return Ok(current);
        }

        let updated = self
            .sessions
            .try_update(&channel_name.to_string(), |session| {
                // Re-checked under the lock; someone may have answered or
                // hung up since the read above.
                if session.status == CallSessionStatus::Waiting {
                    session.status = CallSessionStatus::Active;
                    session.answered_at = Some(Utc::now());
                }
                Ok::<(), CallSessionError>(())
            })
            .await?;

        info!("Channel {} answered", updated.channel_name);
        Ok(updated)
    }

    /// Hangs up a channel (any non-terminal status `-> Ended`). Idempotent:
    /// a second end is a successful no-op with no further side effects -
    /// double-end races between patient and receptionist are expected.
    pub async fn end(&self, channel_name: &str) -> Result<CallSession, CallSessionError> {
        let current = self.get(channel_name).await?;
        if current.status.is_terminal() {
            debug!("Channel {} already {}", channel_name, current.status);
            return Ok(current);
        }

        let updated = self
            .sessions
            .try_update(&channel_name.to_string(), |session| {
                if !session.status.is_terminal() {
                    session.status = CallSessionStatus::Ended;
                    session.ended_at = Some(Utc::now());
                }
                Ok::<(), CallSessionError>(())
            })
            .await?;

        info!("Channel {} ended", updated.channel_name);
        Ok(updated)
    }

    /// The reception queue: everyone still waiting, oldest first.
    pub async fn waiting_sessions(&self) -> Vec<CallSession> {
        let mut waiting = self
            .sessions
            .find(|s| s.status == CallSessionStatus::Waiting)
            .await;
        waiting.sort_by_key(|s| s.requested_at);
        waiting
    }

    /// Expires unanswered calls: every `Waiting` session requested before
    /// `now - expiry` becomes `Missed`.
    pub async fn sweep_expired(
        &self,
        now: DateTime<Utc>,
        expiry: Duration,
    ) -> Result<SweepOutcome, CallSessionError> {
        let cutoff = now - expiry;
        let stale = self
            .sessions
            .find(|s| s.status == CallSessionStatus::Waiting && s.requested_at < cutoff)
            .await;
        self.sweep_sessions(stale, now).await
    }

    /// The collect-and-continue core of the sweep. One failed update never
    /// aborts the rest of the batch; every committed expiry stands, and the
    /// failures come back together in `SweepPartialFailure` for the caller
    /// to log and retry next cycle.
    pub async fn sweep_sessions(
        &self,
        stale: Vec<CallSession>,
        now: DateTime<Utc>,
    ) -> Result<SweepOutcome, CallSessionError> {
        let mut outcome = SweepOutcome {
            examined: stale.len(),
            ..Default::default()
        };
        let mut failures = Vec::new();

        for session in stale {
            let result = self
                .sessions
                .try_update(&session.channel_name, |record| {
                    // Answered or ended between the scan and this write.
                    if record.status == CallSessionStatus::Waiting {
                        record.status = CallSessionStatus::Missed;
                        record.ended_at = Some(now);
                    }
                    Ok::<(), CallSessionError>(())
                })
                .await;

            match result {
                Ok(updated) if updated.status == CallSessionStatus::Missed => {
                    info!(
                        "Channel {} expired unanswered, marked missed",
                        updated.channel_name
                    );
                    outcome.swept += 1;
                }
                Ok(updated) => {
                    debug!(
                        "Channel {} no longer waiting ({}), left alone",
                        updated.channel_name, updated.status
                    );
                }
                Err(err) => {
                    warn!(
                        "Sweep could not update channel {}: {}",
                        session.channel_name, err
                    );
                    failures.push(SweepFailure {
                        channel_name: session.channel_name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(outcome)
        } else {
            Err(CallSessionError::SweepPartialFailure { failures })
        }
    }
}
