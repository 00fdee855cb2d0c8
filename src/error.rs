//! Session error types

use std::fmt;

/// Errors that can occur while encoding, decoding or resolving sessions.
///
/// When a cookie is unusable, resolving a session through
/// [`CookieStore`](crate::CookieStore) yields a new, empty session paired
/// with one of the decode-side variants below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Invalid codec or store configuration (missing MAC key, bad block key size)
    Configuration(String),
    /// Cookie name contains characters outside the RFC 6265 token grammar
    InvalidCookieName(String),
    /// Token does not have the expected structure
    MalformedToken(String),
    /// MAC verification failed
    AuthenticationFailed,
    /// Token was issued before the maximum age window
    TimestampTooOld,
    /// Token was issued inside the minimum age window
    TimestampTooNew,
    /// Payload could not be decrypted
    DecryptionError(String),
    /// Payload could not be deserialized
    DeserializationError(String),
    /// Value could not be serialized
    SerializationError(String),
    /// Payload could not be encrypted (random source failure included)
    EncryptionError(String),
    /// Encoded token is longer than the configured maximum
    LengthExceeded { length: usize, max: usize },
    /// A cookie store was built with an empty codec chain
    NoCodecsConfigured,
    /// No cookie store was installed in the request depot
    StoreNotInstalled,
    /// Every codec in a chain failed; one entry per codec, in chain order
    Multiple(Vec<SessionError>),
}

impl SessionError {
    /// Whether this error came from the decode path.
    ///
    /// For [`SessionError::Multiple`] this holds when every inner error does.
    pub fn is_decode(&self) -> bool {
        match self {
            SessionError::MalformedToken(_)
            | SessionError::AuthenticationFailed
            | SessionError::TimestampTooOld
            | SessionError::TimestampTooNew
            | SessionError::DecryptionError(_)
            | SessionError::DeserializationError(_) => true,
            SessionError::Multiple(errors) => errors.iter().all(SessionError::is_decode),
            _ => false,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Configuration(msg) => write!(f, "Session configuration error: {}", msg),
            SessionError::InvalidCookieName(name) => write!(f, "Invalid cookie name: {:?}", name),
            SessionError::MalformedToken(msg) => write!(f, "Malformed session token: {}", msg),
            SessionError::AuthenticationFailed => write!(f, "Session token MAC mismatch"),
            SessionError::TimestampTooOld => write!(f, "Session token expired"),
            SessionError::TimestampTooNew => write!(f, "Session token timestamp too new"),
            SessionError::DecryptionError(msg) => write!(f, "Decryption error: {}", msg),
            SessionError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            SessionError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            SessionError::EncryptionError(msg) => write!(f, "Encryption error: {}", msg),
            SessionError::LengthExceeded { length, max } => {
                write!(f, "Session token length {} exceeds maximum {}", length, max)
            }
            SessionError::NoCodecsConfigured => write!(f, "No session codecs configured"),
            SessionError::StoreNotInstalled => {
                write!(f, "No session store installed for this request")
            }
            SessionError::Multiple(errors) => {
                write!(f, "All {} session codecs failed", errors.len())?;
                for (i, err) in errors.iter().enumerate() {
                    write!(f, "; [{}] {}", i, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SessionError {}
