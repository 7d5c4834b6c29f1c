//! Session cookie handling.
//!
//! The bearer token travels in a single cookie. Setting it starts a session
//! on the client; clearing it only removes the client's copy, the token
//! itself stays valid until its natural expiry.

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{DateTime, Utc};

pub const SESSION_COOKIE: &str = "token";

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

const CLEARED: &str =
    "token=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax";
const CLEARED_SECURE: &str =
    "token=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Secure";

/// Builds `Set-Cookie` values for the session and reads it back.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookieManager {
    secure: bool,
}

impl SessionCookieManager {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Cookie carrying `token` until `expires_at`.
    pub fn issue(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<HeaderValue, header::InvalidHeaderValue> {
        let max_age = (expires_at - now).num_seconds().max(0);
        let mut cookie = format!(
            "{}={}; Path=/; Expires={}; Max-Age={}; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            token,
            expires_at.format(HTTP_DATE),
            max_age,
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::try_from(cookie)
    }

    /// Cookie that makes the client drop the session immediately.
    pub fn clear(&self) -> HeaderValue {
        HeaderValue::from_static(if self.secure { CLEARED_SECURE } else { CLEARED })
    }

    /// Value of the session cookie, if the request carries one.
    ///
    /// `Some("")` means the cookie is present but empty.
    pub fn read<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.trim() == SESSION_COOKIE)
            .map(|(_, value)| value.trim().trim_matches('"'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn issue_sets_path_and_expiry() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let cookie = SessionCookieManager::new(false)
            .issue("abc.def.ghi", now + Duration::minutes(60), now)
            .unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("token=abc.def.ghi; Path=/;"));
        assert!(cookie.contains("Expires=Tue, 14 Nov 2023 23:13:20 GMT"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn secure_flag_is_appended() {
        let now = Utc::now();
        let manager = SessionCookieManager::new(true);
        let issued = manager.issue("t", now + Duration::minutes(1), now).unwrap();
        assert!(issued.to_str().unwrap().ends_with("; Secure"));
        assert!(manager.clear().to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn clear_expires_immediately() {
        let cleared = SessionCookieManager::new(false).clear();
        let cleared = cleared.to_str().unwrap();
        assert!(cleared.starts_with("token=;"));
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[test]
    fn read_finds_cookie_among_others() {
        let manager = SessionCookieManager::new(false);
        let headers = headers_with("theme=dark; token=abc.def.ghi; lang=en");
        assert_eq!(manager.read(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn read_distinguishes_missing_and_empty() {
        let manager = SessionCookieManager::new(false);
        assert_eq!(manager.read(&HeaderMap::new()), None);
        assert_eq!(manager.read(&headers_with("theme=dark")), None);
        assert_eq!(manager.read(&headers_with("token=")), Some(""));
    }

    #[test]
    fn read_does_not_match_prefixed_names() {
        let manager = SessionCookieManager::new(false);
        assert_eq!(manager.read(&headers_with("csrftoken=x")), None);
    }
}
