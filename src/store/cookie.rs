//! Cookie-backed session store
//!
//! Nothing is kept server-side: the session values travel in the cookie,
//! encoded by the first codec of the chain.

use salvo_core::http::cookie::time::{Duration, OffsetDateTime};
use salvo_core::http::cookie::Cookie;
use salvo_core::{Request, Response};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::codec::{codecs_from_pairs, decode_chain, Codec, DEFAULT_MAX_LENGTH};
use crate::config::CookieOptions;
use crate::error::SessionError;
use crate::registry::{validate_cookie_name, Registry};
use crate::session::{Session, SessionValues};

/// Stores sessions in cookies, encoded by an ordered codec chain.
///
/// The first codec encodes every cookie written. When reading, each codec
/// is tried in order and the first success wins. To rotate keys, put the
/// new codec first and keep the old one after it for at least the codec
/// max age; then drop it.
pub struct CookieStore {
    codecs: Vec<Box<dyn Codec>>,
    options: CookieOptions,
    clock: Arc<dyn Clock>,
    max_cookie_length: usize,
}

impl CookieStore {
    /// Create a store from a codec chain, current codec first
    pub fn new(codecs: Vec<Box<dyn Codec>>) -> Result<Self, SessionError> {
        if codecs.is_empty() {
            return Err(SessionError::NoCodecsConfigured);
        }
        Ok(Self {
            codecs,
            options: CookieOptions::default(),
            clock: Arc::new(SystemClock),
            max_cookie_length: DEFAULT_MAX_LENGTH,
        })
    }

    /// Create a store from `(hash_key, block_key)` pairs, current pair first
    pub fn from_key_pairs(pairs: &[(&[u8], Option<&[u8]>)]) -> Result<Self, SessionError> {
        let codecs = codecs_from_pairs(pairs)?
            .into_iter()
            .map(|codec| Box::new(codec) as Box<dyn Codec>)
            .collect();
        Self::new(codecs)
    }

    /// Set the default cookie options for new sessions
    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }

    /// Clock used to compute `Expires`
    pub fn with_clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Longest raw cookie value accepted, checked before percent-decoding;
    /// 0 disables the check (default: 4096)
    pub fn with_max_cookie_length(mut self, max: usize) -> Self {
        self.max_cookie_length = max;
        self
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    pub fn codec_count(&self) -> usize {
        self.codecs.len()
    }

    /// Set the default cookie max age and every codec's max token age
    pub fn set_max_age(&mut self, seconds: i64) {
        self.options.max_age = seconds;
        for codec in &mut self.codecs {
            codec.set_max_age(seconds);
        }
    }

    /// Resolve the session `name` for this request through its registry.
    ///
    /// The first call per name decodes the cookie; later calls return the
    /// same session and the same error.
    pub fn get(&self, registry: &mut Registry, req: &Request, name: &str) -> (Session, Option<SessionError>) {
        registry.get(self, req, name)
    }

    /// Decode the session `name` from the request cookie, bypassing the registry.
    ///
    /// A missing cookie yields a new, empty session and no error. An
    /// unusable one yields a new, empty session together with the reason;
    /// callers should treat both the same way.
    pub fn new_session(&self, req: &Request, name: &str) -> (Session, Option<SessionError>) {
        self.load(name, req.cookie(name).map(|c| c.value()))
    }

    /// Build the session `name` from a raw cookie value, if any
    pub fn load(&self, name: &str, raw: Option<&str>) -> (Session, Option<SessionError>) {
        let options = self.options.clone();
        let Some(raw) = raw else {
            return (Session::new(name, options), None);
        };

        match self.decode_raw(name, raw) {
            Ok(values) => (Session::restored(name.to_string(), values, options), None),
            Err(e) => {
                tracing::warn!(cookie = name, error = %e, "discarding session cookie that failed to decode");
                (Session::new(name, options), Some(e))
            }
        }
    }

    fn decode_raw(&self, name: &str, raw: &str) -> Result<SessionValues, SessionError> {
        if self.max_cookie_length != 0 && raw.len() > self.max_cookie_length {
            return Err(SessionError::LengthExceeded {
                length: raw.len(),
                max: self.max_cookie_length,
            });
        }

        // Some clients percent-encode cookie values
        let token = match urlencoding::decode(raw) {
            Ok(d) => d.into_owned(),
            Err(_) => raw.to_string(),
        };
        decode_chain(&self.codecs, name, &token)
    }

    /// Encode the session with the current codec and add its cookie to the response.
    ///
    /// Encoding failures are returned; the cookie is never written truncated.
    pub fn save(&self, res: &mut Response, session: &Session) -> Result<(), SessionError> {
        let cookie = self.build_cookie(session)?;
        res.add_cookie(cookie);
        Ok(())
    }

    /// Build the `Set-Cookie` cookie for `session` without writing it
    pub fn build_cookie(&self, session: &Session) -> Result<Cookie<'static>, SessionError> {
        validate_cookie_name(session.name())?;
        let codec = self.codecs.first().ok_or(SessionError::NoCodecsConfigured)?;
        let value = codec.encode(session.name(), &session.values())?;
        let options = session.options();

        let mut cookie_builder = Cookie::build((session.name().to_string(), value))
            .path(options.path)
            .http_only(options.http_only)
            .secure(options.secure)
            .partitioned(options.partitioned);

        if let Some(domain) = options.domain {
            cookie_builder = cookie_builder.domain(domain);
        }

        if let Some(same_site) = options.same_site {
            cookie_builder = cookie_builder.same_site(same_site.into());
        }

        // Expires is written alongside Max-Age for clients that ignore Max-Age
        match options.max_age.cmp(&0) {
            Ordering::Greater => {
                cookie_builder = cookie_builder.max_age(Duration::seconds(options.max_age));
                let expires = self.clock.now().timestamp().saturating_add(options.max_age);
                if let Ok(expires) = OffsetDateTime::from_unix_timestamp(expires) {
                    cookie_builder = cookie_builder.expires(expires);
                }
            }
            Ordering::Less => {
                cookie_builder = cookie_builder
                    .max_age(Duration::ZERO)
                    .expires(OffsetDateTime::UNIX_EPOCH + Duration::seconds(1));
            }
            Ordering::Equal => {}
        }

        Ok(cookie_builder.build())
    }
}

impl std::fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieStore")
            .field("codecs", &self.codecs.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
