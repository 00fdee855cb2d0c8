//! Payload encryption
//!
//! The default cipher is AES in counter mode. A fresh random IV is generated
//! for every call to [`Cipher::encrypt`] and prepended to the ciphertext.

use aes::{Aes128, Aes192, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::SessionError;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes192Ctr = ctr::Ctr128BE<Aes192>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// AES block size, which is also the IV width
pub const IV_LEN: usize = 16;

/// Symmetric encryption applied to the serialized payload before it is signed.
pub trait Cipher: Send + Sync + 'static {
    /// Encrypt `plaintext`, returning whatever `decrypt` needs to reverse it
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SessionError>;

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SessionError>;
}

#[derive(Clone)]
enum AesKey {
    Aes128(Vec<u8>),
    Aes192(Vec<u8>),
    Aes256(Vec<u8>),
}

/// AES-CTR with a random IV per message.
///
/// The key length picks the variant: 16 bytes for AES-128, 24 for AES-192,
/// 32 for AES-256.
#[derive(Clone)]
pub struct AesCtr {
    key: AesKey,
}

impl AesCtr {
    pub fn new(key: &[u8]) -> Result<Self, SessionError> {
        let key = match key.len() {
            16 => AesKey::Aes128(key.to_vec()),
            24 => AesKey::Aes192(key.to_vec()),
            32 => AesKey::Aes256(key.to_vec()),
            n => {
                return Err(SessionError::Configuration(format!(
                    "encryption key must be 16, 24 or 32 bytes, got {}",
                    n
                )))
            }
        };
        Ok(Self { key })
    }

    /// Key size in bits
    pub fn key_bits(&self) -> usize {
        match &self.key {
            AesKey::Aes128(_) => 128,
            AesKey::Aes192(_) => 192,
            AesKey::Aes256(_) => 256,
        }
    }

    fn apply_keystream(&self, iv: &[u8], buf: &mut [u8]) -> Result<(), String> {
        match &self.key {
            AesKey::Aes128(k) => Aes128Ctr::new_from_slices(k, iv)
                .map(|mut c| c.apply_keystream(buf))
                .map_err(|e| e.to_string()),
            AesKey::Aes192(k) => Aes192Ctr::new_from_slices(k, iv)
                .map(|mut c| c.apply_keystream(buf))
                .map_err(|e| e.to_string()),
            AesKey::Aes256(k) => Aes256Ctr::new_from_slices(k, iv)
                .map(|mut c| c.apply_keystream(buf))
                .map_err(|e| e.to_string()),
        }
    }
}

impl std::fmt::Debug for AesCtr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesCtr")
            .field("key_bits", &self.key_bits())
            .finish_non_exhaustive()
    }
}

impl Cipher for AesCtr {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SessionError> {
        let mut iv = [0u8; IV_LEN];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| SessionError::EncryptionError(format!("failed to generate IV: {}", e)))?;

        let mut out = Vec::with_capacity(IV_LEN + plaintext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(plaintext);
        self.apply_keystream(&iv, &mut out[IV_LEN..])
            .map_err(SessionError::EncryptionError)?;
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SessionError> {
        if data.len() < IV_LEN {
            return Err(SessionError::DecryptionError(format!(
                "ciphertext shorter than IV ({} < {})",
                data.len(),
                IV_LEN
            )));
        }
        let (iv, ciphertext) = data.split_at(IV_LEN);
        let mut plaintext = ciphertext.to_vec();
        self.apply_keystream(iv, &mut plaintext)
            .map_err(SessionError::DecryptionError)?;
        Ok(plaintext)
    }
}

/// Generate `len` bytes of key material from the operating system's random source.
pub fn generate_random_key(len: usize) -> Result<Vec<u8>, SessionError> {
    let mut key = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|e| SessionError::Configuration(format!("failed to generate key: {}", e)))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_key_length() {
        let err = AesCtr::new(&[0u8; 20]).unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
        assert_eq!(AesCtr::new(&[1u8; 24]).unwrap().key_bits(), 192);
    }

    #[test]
    fn test_encrypt_decrypt() {
        for len in [16, 24, 32] {
            let cipher = AesCtr::new(&generate_random_key(len).unwrap()).unwrap();
            let data = cipher.encrypt(b"hello session").unwrap();
            assert_eq!(data.len(), IV_LEN + 13);
            assert_ne!(&data[IV_LEN..], b"hello session");
            assert_eq!(cipher.decrypt(&data).unwrap(), b"hello session");
        }
    }

    #[test]
    fn test_fresh_iv_per_message() {
        let cipher = AesCtr::new(&[7u8; 32]).unwrap();
        let a = cipher.encrypt(b"same plaintext").unwrap();
        let b = cipher.encrypt(b"same plaintext").unwrap();
        assert_ne!(a[..IV_LEN], b[..IV_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_decrypt_too_short() {
        let cipher = AesCtr::new(&[7u8; 16]).unwrap();
        let err = cipher.decrypt(&[0u8; IV_LEN - 1]).unwrap_err();
        assert!(matches!(err, SessionError::DecryptionError(_)));
    }

    #[test]
    fn test_wrong_key_does_not_recover_plaintext() {
        let a = AesCtr::new(&[1u8; 16]).unwrap();
        let b = AesCtr::new(&[2u8; 16]).unwrap();
        let data = a.encrypt(b"secret").unwrap();
        assert_ne!(b.decrypt(&data).unwrap(), b"secret");
    }
}
