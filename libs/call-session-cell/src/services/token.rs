// libs/call-session-cell/src/services/token.rs
use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::debug;

use shared_config::AppConfig;

use crate::models::CallSessionError;

type HmacSha256 = Hmac<Sha256>;

/// Privilege level inside a media channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RtcRole {
    Publisher,
    Subscriber,
}

impl RtcRole {
    /// `publisher` grants publish rights; any other value joins as a
    /// subscriber.
    pub fn from_param(value: &str) -> Self {
        if value.eq_ignore_ascii_case("publisher") {
            RtcRole::Publisher
        } else {
            RtcRole::Subscriber
        }
    }
}

impl fmt::Display for RtcRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtcRole::Publisher => write!(f, "publisher"),
            RtcRole::Subscriber => write!(f, "subscriber"),
        }
    }
}

/// A signed media credential with its validity window.
#[derive(Debug, Clone, Serialize)]
pub struct RtcToken {
    pub token: String,
    pub channel_name: String,
    pub uid: String,
    pub role: RtcRole,
    pub expires_at: DateTime<Utc>,
}

/// Capability interface for media credential issuance. Call handling
/// depends only on this, never on a concrete vendor SDK, so the signer can
/// be swapped without touching the session code.
pub trait RtcTokenProvider: Send + Sync {
    fn issue(
        &self,
        channel_name: &str,
        uid: &str,
        role: RtcRole,
        now: DateTime<Utc>,
    ) -> Result<RtcToken, CallSessionError>;
}

/// Signs `app_id.channel.uid.role.salt.expires_at` with HMAC-SHA256 over
/// the app certificate. The salt keeps two tokens for identical parameters
/// distinct.
pub struct HmacTokenSigner {
    app_id: String,
    app_certificate: String,
    ttl_seconds: u64,
}

impl HmacTokenSigner {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            app_id: config.agora_app_id.clone(),
            app_certificate: config.agora_app_certificate.clone(),
            ttl_seconds: config.rtc_token_ttl_seconds,
        }
    }
}

impl RtcTokenProvider for HmacTokenSigner {
    fn issue(
        &self,
        channel_name: &str,
        uid: &str,
        role: RtcRole,
        now: DateTime<Utc>,
    ) -> Result<RtcToken, CallSessionError> {
        if self.app_id.is_empty() || self.app_certificate.is_empty() {
            return Err(CallSessionError::RtcNotConfigured);
        }

        let expires_at = now + Duration::seconds(self.ttl_seconds as i64);
        let salt: u32 = rand::random();
        let payload = format!(
            "{}.{}.{}.{}.{}.{}",
            self.app_id,
            channel_name,
            uid,
            role,
            salt,
            expires_at.timestamp()
        );

        let mut mac = HmacSha256::new_from_slice(self.app_certificate.as_bytes())
            .map_err(|e| CallSessionError::TokenSigning(e.to_string()))?;
        mac.update(payload.as_bytes());
        let signature = mac.finalize().into_bytes();

        let body = general_purpose::URL_SAFE_NO_PAD.encode(payload);
        let signature = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        debug!(
            "Issued {} token for channel {} (uid {})",
            role, channel_name, uid
        );
        Ok(RtcToken {
            token: format!("007{}.{}", body, signature),
            channel_name: channel_name.to_string(),
            uid: uid.to_string(),
            role,
            expires_at,
        })
    }
}
