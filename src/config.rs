//! Cookie attribute configuration

use salvo_core::http::cookie;
use std::time::Duration;

/// Attributes written on the session cookie.
///
/// A [`CookieStore`](crate::CookieStore) holds the defaults; every new
/// [`Session`](crate::Session) gets a copy that can be changed per session.
#[derive(Clone, Debug, PartialEq)]
pub struct CookieOptions {
    /// Cookie path (default: "/")
    pub path: String,

    /// Cookie domain (default: None - current domain only)
    pub domain: Option<String>,

    /// Max age in seconds (default: 30 days).
    ///
    /// `0` writes a browser-session cookie, a negative value deletes the cookie.
    pub max_age: i64,

    /// Secure flag for cookie (default: false)
    pub secure: bool,

    /// HttpOnly flag for cookie (default: true)
    pub http_only: bool,

    /// SameSite attribute for cookie (default: Lax)
    pub same_site: Option<SameSite>,

    /// Partitioned attribute (CHIPS) for cookie (default: false)
    pub partitioned: bool,
}

/// SameSite cookie attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    /// Strict - cookie only sent for same-site requests
    Strict,
    /// Lax - cookie sent for same-site requests and top-level navigations
    Lax,
    /// None - cookie sent for all requests (requires Secure)
    None,
}

impl From<SameSite> for cookie::SameSite {
    fn from(same_site: SameSite) -> Self {
        match same_site {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: 86400 * 30,
            secure: false,
            http_only: true,
            same_site: Some(SameSite::Lax),
            partitioned: false,
        }
    }
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cookie path (default: "/")
    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = path.into();
        self
    }

    /// Set the cookie domain
    pub fn with_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set max age in seconds
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Set max age from Duration
    pub fn with_max_age_duration(mut self, duration: Duration) -> Self {
        self.max_age = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);
        self
    }

    /// Set the Secure flag (default: false)
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the HttpOnly flag (default: true)
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set the SameSite attribute; None omits it
    pub fn with_same_site(mut self, same_site: impl Into<Option<SameSite>>) -> Self {
        self.same_site = same_site.into();
        self
    }

    /// Set the Partitioned attribute (default: false)
    pub fn with_partitioned(mut self, partitioned: bool) -> Self {
        self.partitioned = partitioned;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = CookieOptions::new()
            .with_path("/app")
            .with_domain("example.com")
            .with_max_age_duration(Duration::from_secs(3600))
            .with_secure(true)
            .with_same_site(SameSite::Strict)
            .with_partitioned(true);

        assert_eq!(options.path, "/app");
        assert_eq!(options.domain.as_deref(), Some("example.com"));
        assert_eq!(options.max_age, 3600);
        assert!(options.secure && options.http_only && options.partitioned);
        assert_eq!(options.same_site, Some(SameSite::Strict));
        assert_eq!(CookieOptions::new().with_same_site(None::<SameSite>).same_site, None);
    }
}
