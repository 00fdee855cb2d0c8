//! Encrypted, authenticated, self-expiring cookie values
//!
//! Token layout, before the outer base64:
//!
//! ```text
//! timestamp | base64(iv ++ ciphertext) | hmac(name | timestamp | base64(...))
//! ```
//!
//! The cookie name is covered by the MAC but never written into the token,
//! so a value issued for one cookie cannot be replayed under another name.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE, Engine};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::cipher::{AesCtr, Cipher};
use super::serializer::{JsonSerializer, Serializer};
use super::Codec;
use crate::clock::{Clock, SystemClock};
use crate::error::SessionError;
use crate::session::SessionValues;

/// Default maximum token length, the practical per-cookie limit of browsers
pub const DEFAULT_MAX_LENGTH: usize = 4096;

/// Default maximum token age: 30 days
pub const DEFAULT_MAX_AGE: i64 = 86400 * 30;

/// Hash function used for the HMAC
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// MAC length in bytes
    pub fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    fn mac(self, key: &[u8], input: &[u8]) -> Result<Vec<u8>, SessionError> {
        match self {
            HashAlgorithm::Sha256 => hmac_digest::<Hmac<Sha256>>(key, input),
            HashAlgorithm::Sha384 => hmac_digest::<Hmac<Sha384>>(key, input),
            HashAlgorithm::Sha512 => hmac_digest::<Hmac<Sha512>>(key, input),
        }
    }
}

fn hmac_digest<M: Mac + KeyInit>(key: &[u8], input: &[u8]) -> Result<Vec<u8>, SessionError> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| SessionError::Configuration(format!("invalid MAC key: {}", e)))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Encodes and decodes authenticated (and optionally encrypted) cookie values.
///
/// Without a block key the payload is only signed: anyone holding the cookie
/// can read it, but cannot change it.
pub struct SecureCookie<S: Serializer = JsonSerializer> {
    hash_key: Vec<u8>,
    hash: HashAlgorithm,
    cipher: Option<Arc<dyn Cipher>>,
    serializer: S,
    max_length: usize,
    max_age: i64,
    min_age: i64,
    clock: Arc<dyn Clock>,
}

impl SecureCookie<JsonSerializer> {
    /// Create a codec from a MAC key and an optional AES key (16, 24 or 32 bytes).
    ///
    /// The MAC key should be at least 32 bytes; see
    /// [`generate_random_key`](super::generate_random_key).
    pub fn new(hash_key: &[u8], block_key: Option<&[u8]>) -> Result<Self, SessionError> {
        if hash_key.is_empty() {
            return Err(SessionError::Configuration("hash key is not set".to_string()));
        }
        let cipher = match block_key {
            Some(key) => Some(Arc::new(AesCtr::new(key)?) as Arc<dyn Cipher>),
            None => None,
        };
        Ok(Self {
            hash_key: hash_key.to_vec(),
            hash: HashAlgorithm::default(),
            cipher,
            serializer: JsonSerializer,
            max_length: DEFAULT_MAX_LENGTH,
            max_age: DEFAULT_MAX_AGE,
            min_age: 0,
            clock: Arc::new(SystemClock),
        })
    }
}

impl<S: Serializer> SecureCookie<S> {
    /// Set the HMAC hash function (default: SHA-256)
    pub fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    /// Replace the encryption step
    pub fn with_cipher<C: Cipher>(mut self, cipher: C) -> Self {
        self.cipher = Some(Arc::new(cipher));
        self
    }

    /// Replace the serializer
    pub fn with_serializer<S2: Serializer>(self, serializer: S2) -> SecureCookie<S2> {
        SecureCookie {
            hash_key: self.hash_key,
            hash: self.hash,
            cipher: self.cipher,
            serializer,
            max_length: self.max_length,
            max_age: self.max_age,
            min_age: self.min_age,
            clock: self.clock,
        }
    }

    /// Maximum encoded length in bytes; 0 disables the check (default: 4096)
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Maximum token age in seconds; 0 disables the check (default: 30 days)
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Minimum token age in seconds; 0 disables the check (default)
    pub fn with_min_age(mut self, seconds: i64) -> Self {
        self.min_age = seconds;
        self
    }

    pub fn with_clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn max_age(&self) -> i64 {
        self.max_age
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Serialize, encrypt, sign and encode `value` for the cookie `name`.
    pub fn encode<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<String, SessionError> {
        let mut payload = self.serializer.serialize(value)?;
        if let Some(cipher) = &self.cipher {
            payload = cipher.encrypt(&payload)?;
        }
        let encoded = URL_SAFE.encode(&payload);

        let timestamp = self.clock.now().timestamp().to_string();
        let mac = self.signature(name, timestamp.as_bytes(), encoded.as_bytes())?;

        let mut assembled = Vec::with_capacity(timestamp.len() + encoded.len() + mac.len() + 2);
        assembled.extend_from_slice(timestamp.as_bytes());
        assembled.push(b'|');
        assembled.extend_from_slice(encoded.as_bytes());
        assembled.push(b'|');
        assembled.extend_from_slice(&mac);

        let token = URL_SAFE.encode(&assembled);
        if self.max_length != 0 && token.len() > self.max_length {
            return Err(SessionError::LengthExceeded {
                length: token.len(),
                max: self.max_length,
            });
        }
        Ok(token)
    }

    /// Verify and decode a token produced by [`encode`](Self::encode) for the same `name`.
    pub fn decode<T: DeserializeOwned>(&self, name: &str, token: &str) -> Result<T, SessionError> {
        if self.max_length != 0 && token.len() > self.max_length {
            return Err(SessionError::LengthExceeded {
                length: token.len(),
                max: self.max_length,
            });
        }

        let raw = URL_SAFE
            .decode(token)
            .map_err(|e| SessionError::MalformedToken(e.to_string()))?;

        // The MAC is raw bytes and may itself contain '|'
        let mut parts = raw.splitn(3, |b| *b == b'|');
        let (timestamp, value, mac) = match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(v), Some(m)) => (t, v, m),
            _ => {
                return Err(SessionError::MalformedToken(
                    "expected timestamp|value|mac".to_string(),
                ))
            }
        };

        // Checked before anything else is parsed out of the token.
        let expected = self.signature(name, timestamp, value)?;
        if !bool::from(expected.as_slice().ct_eq(mac)) {
            return Err(SessionError::AuthenticationFailed);
        }

        let issued: i64 = std::str::from_utf8(timestamp)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| SessionError::MalformedToken("invalid timestamp".to_string()))?;
        let now = self.clock.now().timestamp();
        if self.min_age != 0 && issued > now.saturating_sub(self.min_age) {
            return Err(SessionError::TimestampTooNew);
        }
        if self.max_age != 0 && issued < now.saturating_sub(self.max_age) {
            return Err(SessionError::TimestampTooOld);
        }

        let mut payload = URL_SAFE
            .decode(value)
            .map_err(|e| SessionError::MalformedToken(e.to_string()))?;
        if let Some(cipher) = &self.cipher {
            payload = cipher.decrypt(&payload)?;
        }
        self.serializer.deserialize(&payload)
    }

    fn signature(&self, name: &str, timestamp: &[u8], value: &[u8]) -> Result<Vec<u8>, SessionError> {
        let mut input = Vec::with_capacity(name.len() + timestamp.len() + value.len() + 2);
        input.extend_from_slice(name.as_bytes());
        input.push(b'|');
        input.extend_from_slice(timestamp);
        input.push(b'|');
        input.extend_from_slice(value);
        self.hash.mac(&self.hash_key, &input)
    }
}

impl<S: Serializer + Clone> Clone for SecureCookie<S> {
    fn clone(&self) -> Self {
        Self {
            hash_key: self.hash_key.clone(),
            hash: self.hash,
            cipher: self.cipher.clone(),
            serializer: self.serializer.clone(),
            max_length: self.max_length,
            max_age: self.max_age,
            min_age: self.min_age,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: Serializer> std::fmt::Debug for SecureCookie<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureCookie")
            .field("hash", &self.hash)
            .field("encrypted", &self.cipher.is_some())
            .field("max_length", &self.max_length)
            .field("max_age", &self.max_age)
            .field("min_age", &self.min_age)
            .finish_non_exhaustive()
    }
}

impl<S: Serializer> Codec for SecureCookie<S> {
    fn encode(&self, name: &str, values: &SessionValues) -> Result<String, SessionError> {
        SecureCookie::encode(self, name, values)
    }

    fn decode(&self, name: &str, token: &str) -> Result<SessionValues, SessionError> {
        SecureCookie::decode(self, name, token)
    }

    fn set_max_age(&mut self, seconds: i64) {
        self.max_age = seconds;
    }
}
