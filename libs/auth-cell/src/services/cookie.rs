// libs/auth-cell/src/services/cookie.rs
use axum::http::HeaderMap;

use shared_config::AppConfig;

/// `Set-Cookie` value for a fresh session. HTTP-only so page scripts never
/// see the token; `Secure` is added outside development.
pub fn build_session_cookie(config: &AppConfig, token: &str) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        config.session_cookie_name, token, config.session_max_age_seconds
    );
    if config.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires the session cookie immediately.
pub fn clear_session_cookie(config: &AppConfig) -> String {
    let mut cookie = format!(
        "{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax",
        config.session_cookie_name
    );
    if config.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pulls the session token out of the `Cookie` request header, if present.
pub fn session_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == cookie_name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use shared_utils::test_utils::TestConfig;

    #[test]
    fn session_cookie_is_http_only_with_the_configured_lifetime() {
        let config = TestConfig::default().to_app_config();

        let cookie = build_session_cookie(&config, "abc123");

        assert!(cookie.starts_with("session_token=abc123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn production_cookies_are_marked_secure() {
        let mut config = TestConfig::default().to_app_config();
        config.environment = "production".to_string();

        assert!(build_session_cookie(&config, "abc").contains("Secure"));
        assert!(clear_session_cookie(&config).contains("Secure"));
    }

    #[test]
    fn clearing_sets_an_immediate_expiry() {
        let config = TestConfig::default().to_app_config();

        let cookie = clear_session_cookie(&config);

        assert!(cookie.starts_with("session_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn the_session_token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            "theme=dark; session_token=tok-1; lang=en".parse().unwrap(),
        );

        assert_eq!(
            session_token_from_headers(&headers, "session_token"),
            Some("tok-1".to_string())
        );
    }

    #[test]
    fn missing_or_empty_cookies_yield_nothing() {
        let headers = HeaderMap::new();
        assert_eq!(session_token_from_headers(&headers, "session_token"), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "session_token=; theme=dark".parse().unwrap());
        assert_eq!(session_token_from_headers(&headers, "session_token"), None);
    }
}
