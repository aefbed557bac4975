use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub agora_app_id: String,
    pub agora_app_certificate: String,
    pub rtc_token_ttl_seconds: u64,
    pub session_cookie_name: String,
    pub session_max_age_seconds: i64,
    pub call_expiry_minutes: i64,
    pub sweep_interval_seconds: u64,
    pub sweep_timeout_seconds: u64,
    pub default_clinic_slots: Vec<String>,
    pub environment: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            agora_app_id: env::var("AGORA_APP_ID")
                .unwrap_or_else(|_| {
                    warn!("AGORA_APP_ID not set, using empty value");
                    String::new()
                }),
            agora_app_certificate: env::var("AGORA_APP_CERTIFICATE")
                .unwrap_or_else(|_| {
                    warn!("AGORA_APP_CERTIFICATE not set, using empty value");
                    String::new()
                }),
            rtc_token_ttl_seconds: parse_env("RTC_TOKEN_TTL_SECONDS", 3600),
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "session_token".to_string()),
            session_max_age_seconds: parse_env("SESSION_MAX_AGE_SECONDS", 86400),
            call_expiry_minutes: parse_env("CALL_EXPIRY_MINUTES", 5),
            sweep_interval_seconds: parse_env("SWEEP_INTERVAL_SECONDS", 300),
            sweep_timeout_seconds: parse_env("SWEEP_TIMEOUT_SECONDS", 30),
            default_clinic_slots: env::var("DEFAULT_CLINIC_SLOTS")
                .unwrap_or_else(|_| {
                    "09:00,09:30,10:00,10:30,11:00,11:30,14:00,14:30,15:00,15:30,16:00,16:30"
                        .to_string()
                })
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    pub fn is_rtc_configured(&self) -> bool {
        !self.agora_app_id.is_empty() && !self.agora_app_certificate.is_empty()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid value, using default", name);
            default
        }),
        Err(_) => default,
    }
}
