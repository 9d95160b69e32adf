//! Envelope encryption/decryption
//!
//! Envelope format (base64 text):
//! ```text
//! base64( [16 bytes: random IV][N bytes: ciphertext] )
//! ```
//!
//! - `Aes256Gcm`: the IV slot is a 16-byte GCM nonce and the ciphertext ends
//!   with a 16-byte tag. Wrong keys and tampering are always detected.
//! - `Aes256Cbc`: AES-256-CBC with PKCS#7 padding and no tag. A wrong key is
//!   only caught when the padding comes out invalid, which misses roughly
//!   1 in 256 attempts, and tampering goes undetected.

use aes::Aes256;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::AesGcm;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use std::fmt;
use zeroize::Zeroize;

use geocrypt_core::config::CipherSuite;
use geocrypt_core::{GeoError, GeoResult};

use crate::kdf::DerivedKey;
use crate::IV_SIZE;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Base64 text of `IV ‖ ciphertext`, as stored and transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherEnvelope(String);

impl CipherEnvelope {
    /// Wrap envelope text received from storage. Validation happens on decrypt.
    pub fn from_base64(text: impl Into<String>) -> Self {
        Self(text.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CipherEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CipherEnvelope {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encrypt base64 `content` under `key` with a fresh random IV.
pub fn encrypt(content: &str, key: &DerivedKey, suite: CipherSuite) -> GeoResult<CipherEnvelope> {
    let mut plaintext = STANDARD
        .decode(content.trim())
        .map_err(|e| GeoError::InvalidInputEncoding(e.to_string()))?;

    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = match suite {
        CipherSuite::Aes256Cbc => Aes256CbcEnc::new(key.as_bytes().into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(&plaintext),
        CipherSuite::Aes256Gcm => {
            let cipher = Aes256Gcm16::new(key.as_bytes().into());
            let nonce = aes_gcm::Nonce::<U16>::from_slice(&iv);
            cipher
                .encrypt(nonce, plaintext.as_ref())
                .map_err(|e| GeoError::EncryptionFailed(e.to_string()))?
        }
    };
    tracing::debug!(
        ?suite,
        plaintext_len = plaintext.len(),
        ciphertext_len = ciphertext.len(),
        "encrypted envelope"
    );
    plaintext.zeroize();

    let mut blob = Vec::with_capacity(IV_SIZE + ciphertext.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);
    Ok(CipherEnvelope(STANDARD.encode(&blob)))
}

/// Decrypt an envelope and return the plaintext re-encoded as base64.
///
/// `expected_file_type` only labels the diagnostic span; it is not bound
/// into the ciphertext.
pub fn decrypt(
    envelope: &str,
    key: &DerivedKey,
    suite: CipherSuite,
    expected_file_type: &str,
) -> GeoResult<String> {
    let span = tracing::debug_span!("decrypt", ?suite, file_type = expected_file_type);
    let _enter = span.enter();

    let blob = STANDARD
        .decode(envelope.trim())
        .map_err(|e| GeoError::InvalidInputEncoding(e.to_string()))?;
    if blob.len() < IV_SIZE {
        return Err(GeoError::MalformedEnvelope {
            len: blob.len(),
            min: IV_SIZE,
        });
    }

    let (iv_bytes, ciphertext) = blob.split_at(IV_SIZE);
    let mut iv = [0u8; IV_SIZE];
    iv.copy_from_slice(iv_bytes);

    let mut plaintext = match suite {
        CipherSuite::Aes256Cbc => Aes256CbcDec::new(key.as_bytes().into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| GeoError::DecryptionFailed)?,
        CipherSuite::Aes256Gcm => {
            let cipher = Aes256Gcm16::new(key.as_bytes().into());
            let nonce = aes_gcm::Nonce::<U16>::from_slice(&iv);
            cipher
                .decrypt(nonce, ciphertext)
                .map_err(|_| GeoError::DecryptionFailed)?
        }
    };

    if plaintext.is_empty() {
        return Err(GeoError::EmptyResult);
    }
    tracing::debug!(plaintext_len = plaintext.len(), "decrypted envelope");

    let encoded = STANDARD.encode(&plaintext);
    plaintext.zeroize();
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KEY_SIZE, TAG_SIZE};

    const SUITES: [CipherSuite; 2] = [CipherSuite::Aes256Gcm, CipherSuite::Aes256Cbc];
    const HELLO: &str = "SGVsbG8="; // "Hello"

    fn key(fill: u8) -> DerivedKey {
        DerivedKey::from_bytes([fill; KEY_SIZE])
    }

    fn raw(envelope: &CipherEnvelope) -> Vec<u8> {
        STANDARD.decode(envelope.as_str()).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        for suite in SUITES {
            let env = encrypt(HELLO, &key(1), suite).unwrap();
            assert_eq!(decrypt(env.as_str(), &key(1), suite, "txt").unwrap(), HELLO);
        }
    }

    #[test]
    fn test_fresh_iv_each_time() {
        for suite in SUITES {
            let a = encrypt(HELLO, &key(1), suite).unwrap();
            let b = encrypt(HELLO, &key(1), suite).unwrap();
            assert_ne!(a, b);
            assert_ne!(raw(&a)[..IV_SIZE], raw(&b)[..IV_SIZE], "IV prefixes must differ");
        }
    }

    #[test]
    fn test_envelope_sizes() {
        let content = STANDARD.encode([0u8; 100]);

        // CBC pads 100 → 112
        let cbc = encrypt(&content, &key(1), CipherSuite::Aes256Cbc).unwrap();
        assert_eq!(raw(&cbc).len(), IV_SIZE + 112);

        // GCM is length-preserving plus the tag
        let gcm = encrypt(&content, &key(1), CipherSuite::Aes256Gcm).unwrap();
        assert_eq!(raw(&gcm).len(), IV_SIZE + 100 + TAG_SIZE);
    }

    #[test]
    fn test_rejects_non_base64_content() {
        for suite in SUITES {
            let err = encrypt("not base64!!", &key(1), suite).unwrap_err();
            assert!(matches!(err, GeoError::InvalidInputEncoding(_)));
        }
    }

    #[test]
    fn test_rejects_non_base64_envelope() {
        let err = decrypt("%%%", &key(1), CipherSuite::Aes256Gcm, "txt").unwrap_err();
        assert!(matches!(err, GeoError::InvalidInputEncoding(_)));
    }

    #[test]
    fn test_rejects_short_envelope() {
        let short = STANDARD.encode([0u8; IV_SIZE - 1]);
        for suite in SUITES {
            let err = decrypt(&short, &key(1), suite, "txt").unwrap_err();
            assert!(matches!(err, GeoError::MalformedEnvelope { len: 15, min: 16 }));
        }
    }

    #[test]
    fn test_iv_only_envelope_fails() {
        let iv_only = STANDARD.encode([0u8; IV_SIZE]);
        for suite in SUITES {
            let err = decrypt(&iv_only, &key(1), suite, "txt").unwrap_err();
            assert!(matches!(err, GeoError::DecryptionFailed), "{suite:?}");
        }
    }

    #[test]
    fn test_empty_plaintext_is_empty_result() {
        for suite in SUITES {
            let env = encrypt("", &key(1), suite).unwrap();
            let err = decrypt(env.as_str(), &key(1), suite, "txt").unwrap_err();
            assert!(matches!(err, GeoError::EmptyResult), "{suite:?}");
        }
    }

    #[test]
    fn test_gcm_wrong_key_always_fails() {
        let env = encrypt(HELLO, &key(1), CipherSuite::Aes256Gcm).unwrap();
        let err = decrypt(env.as_str(), &key(2), CipherSuite::Aes256Gcm, "txt").unwrap_err();
        assert!(matches!(err, GeoError::DecryptionFailed));
    }

    #[test]
    fn test_gcm_detects_tampering() {
        let env = encrypt(HELLO, &key(1), CipherSuite::Aes256Gcm).unwrap();
        let mut blob = raw(&env);
        blob[IV_SIZE] ^= 0x01;
        let tampered = STANDARD.encode(&blob);
        let err = decrypt(&tampered, &key(1), CipherSuite::Aes256Gcm, "txt").unwrap_err();
        assert!(matches!(err, GeoError::DecryptionFailed));
    }

    #[test]
    fn test_cbc_wrong_key_rarely_accepted() {
        // Without a tag, a wrong key passes the padding check by chance
        // (~1/256). Over 200 trials expect a handful at most, never a
        // correct plaintext.
        let mut accepted = 0;
        for _ in 0..200 {
            let env = encrypt(HELLO, &key(1), CipherSuite::Aes256Cbc).unwrap();
            match decrypt(env.as_str(), &key(2), CipherSuite::Aes256Cbc, "txt") {
                Ok(garbage) => {
                    assert_ne!(garbage, HELLO);
                    accepted += 1;
                }
                Err(e) => assert!(matches!(e, GeoError::DecryptionFailed | GeoError::EmptyResult)),
            }
        }
        assert!(accepted < 20, "wrong key accepted {accepted}/200 times");
    }

    #[test]
    fn test_cbc_vs_gcm_not_interchangeable() {
        let env = encrypt(HELLO, &key(1), CipherSuite::Aes256Cbc).unwrap();
        let err = decrypt(env.as_str(), &key(1), CipherSuite::Aes256Gcm, "txt").unwrap_err();
        assert!(matches!(err, GeoError::DecryptionFailed));
    }

    #[test]
    fn test_large_content() {
        let data: Vec<u8> = (0..100 * 1024).map(|i| (i % 251) as u8).collect();
        let content = STANDARD.encode(&data);
        for suite in SUITES {
            let env = encrypt(&content, &key(9), suite).unwrap();
            assert_eq!(decrypt(env.as_str(), &key(9), suite, "bin").unwrap(), content);
        }
    }

    #[test]
    fn test_envelope_whitespace_tolerated() {
        let env = encrypt(HELLO, &key(1), CipherSuite::Aes256Gcm).unwrap();
        let stored = CipherEnvelope::from_base64(format!("{}\n", env.as_str()));
        assert_eq!(stored, env);
    }
}
