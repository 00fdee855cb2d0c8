//! Cookie value codecs

mod cipher;
mod secure_cookie;
mod serializer;

pub use cipher::{generate_random_key, AesCtr, Cipher, IV_LEN};
pub use secure_cookie::{HashAlgorithm, SecureCookie, DEFAULT_MAX_AGE, DEFAULT_MAX_LENGTH};
pub use serializer::{JsonSerializer, Serializer};

use crate::error::SessionError;
use crate::session::SessionValues;

/// Turns session values into an opaque cookie value and back.
///
/// A [`CookieStore`](crate::CookieStore) holds an ordered chain of codecs:
/// the first one encodes, all of them are tried in order when decoding.
pub trait Codec: Send + Sync + 'static {
    fn encode(&self, name: &str, values: &SessionValues) -> Result<String, SessionError>;

    fn decode(&self, name: &str, token: &str) -> Result<SessionValues, SessionError>;

    /// Update the maximum token age in seconds, if the codec has one
    fn set_max_age(&mut self, _seconds: i64) {}
}

/// Decode `token` with each codec in order, returning the first success.
///
/// When every codec fails the error is [`SessionError::Multiple`] with one
/// entry per codec, in chain order.
pub fn decode_chain(
    codecs: &[Box<dyn Codec>],
    name: &str,
    token: &str,
) -> Result<SessionValues, SessionError> {
    if codecs.is_empty() {
        return Err(SessionError::NoCodecsConfigured);
    }
    let mut errors = Vec::with_capacity(codecs.len());
    for (index, codec) in codecs.iter().enumerate() {
        match codec.decode(name, token) {
            Ok(values) => return Ok(values),
            Err(e) => {
                tracing::debug!(cookie = name, codec = index, error = %e, "session codec rejected cookie");
                errors.push(e);
            }
        }
    }
    Err(SessionError::Multiple(errors))
}

/// Build one codec per `(hash_key, block_key)` pair, keeping their order.
///
/// Put the current key pair first and older ones after it.
pub fn codecs_from_pairs(pairs: &[(&[u8], Option<&[u8]>)]) -> Result<Vec<SecureCookie>, SessionError> {
    pairs
        .iter()
        .map(|(hash_key, block_key)| SecureCookie::new(hash_key, *block_key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_chain_falls_through_to_older_key() {
        let old = SecureCookie::new(b"old-hash-key-old-hash-key-000000", Some(&[1u8; 16][..])).unwrap();
        let new = SecureCookie::new(b"new-hash-key-new-hash-key-000000", Some(&[2u8; 16][..])).unwrap();

        let mut values = SessionValues::default();
        values.set("user", "alice").unwrap();
        let token = Codec::encode(&old, "session", &values).unwrap();

        let chain: Vec<Box<dyn Codec>> = vec![Box::new(new), Box::new(old)];
        let decoded = decode_chain(&chain, "session", &token).unwrap();
        assert_eq!(decoded.get::<String>("user"), Some("alice".to_string()));
    }

    #[test]
    fn test_decode_chain_aggregates_failures() {
        let chain: Vec<Box<dyn Codec>> = codecs_from_pairs(&[
            (b"key-one".as_slice(), None),
            (b"key-two".as_slice(), Some(&[3u8; 32][..])),
        ])
        .unwrap()
        .into_iter()
        .map(|c| Box::new(c) as Box<dyn Codec>)
        .collect();

        match decode_chain(&chain, "session", "bm90IGEgdG9rZW4=").unwrap_err() {
            SessionError::Multiple(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().all(|e| matches!(e, SessionError::MalformedToken(_))));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_chain_empty() {
        assert_eq!(
            decode_chain(&[], "session", "anything").unwrap_err(),
            SessionError::NoCodecsConfigured
        );
    }

    #[test]
    fn test_codecs_from_pairs_rejects_bad_block_key() {
        let err = codecs_from_pairs(&[(b"hash".as_slice(), Some(b"bad".as_slice()))]).unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
    }
}
