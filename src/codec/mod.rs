//! Envelope codec: JSON plaintext ⇄ [`Envelope`] for a given profile and secret.
//!
//! # Encrypt
//! 1. Plaintext must be UTF-8 JSON; the secret must be non-empty.
//! 2. key = scrypt(secret, "salt", profile key length).
//! 3. A fresh random 16-byte IV on every call.
//! 4. CBC: PKCS#7, no tag.  GCM: AAD `"json-encrypt"`, 16-byte tag.
//!
//! # Decrypt
//! Structural checks run first and in a fixed order, before any key
//! derivation or cipher work:
//!   1. `iv` and `encrypted` present
//!   2. `authTag` present when the profile is GCM
//!   3. every field is hex of the expected length
//!
//! GCM failures are [`CodecError::AuthenticationFailed`].  CBC has no
//! integrity check, so its proxy is the JSON check on the output: bad padding
//! or unparseable plaintext is [`CodecError::InvalidResult`].
//!
//! The codec performs no I/O.

use serde::de::IgnoredAny;
use thiserror::Error;
use tracing::debug;

use crate::crypto::{self, CryptoError, KdfParams, IV_LEN};
use crate::envelope::Envelope;
use crate::profile::{CipherProfile, Mode};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Input is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("Secret must not be empty")]
    EmptySecret,
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),
    /// GCM tag check failed: wrong secret, wrong profile, or tampering.
    #[error("Authentication failed — wrong secret, wrong algorithm or tampered envelope")]
    AuthenticationFailed,
    /// Decryption "succeeded" but the output is not JSON.  For CBC this is
    /// the only signal of a wrong secret or profile.
    #[error("Decrypted data is not valid JSON — wrong secret or wrong algorithm")]
    InvalidResult,
    #[error(transparent)]
    Crypto(CryptoError),
}

impl From<CryptoError> for CodecError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::AuthenticationFailed => CodecError::AuthenticationFailed,
            CryptoError::BadPadding           => CodecError::InvalidResult,
            other                             => CodecError::Crypto(other),
        }
    }
}

// ── Codec ────────────────────────────────────────────────────────────────────

/// Stateless apart from the scrypt cost parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec {
    kdf: KdfParams,
}

impl EnvelopeCodec {
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    /// Encrypt a JSON document into a new envelope.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        profile:   CipherProfile,
        secret:    &str,
    ) -> Result<Envelope, CodecError> {
        validate_json(plaintext).map_err(CodecError::InvalidJson)?;
        if secret.is_empty() {
            return Err(CodecError::EmptySecret);
        }

        let key = crypto::derive_key(secret, profile.key_len(), &self.kdf)?;
        let iv = crypto::generate_iv()?;
        debug!(%profile, bytes = plaintext.len(), "encrypting");

        let envelope = match profile.mode() {
            Mode::Cbc => {
                let ciphertext = crypto::cbc_encrypt(&key, &iv, plaintext)?;
                Envelope::from_parts(&iv, &ciphertext, None)
            }
            Mode::Gcm => {
                let (ciphertext, tag) = crypto::gcm_seal(&key, &iv, plaintext)?;
                Envelope::from_parts(&iv, &ciphertext, Some(&tag))
            }
        };
        Ok(envelope)
    }

    /// Decrypt an envelope back into the original JSON bytes.
    pub fn decrypt(
        &self,
        envelope: &Envelope,
        profile:  CipherProfile,
        secret:   &str,
    ) -> Result<Vec<u8>, CodecError> {
        if envelope.iv.is_empty() {
            return Err(CodecError::MalformedEnvelope("missing field `iv`".into()));
        }
        if envelope.encrypted.is_empty() {
            return Err(CodecError::MalformedEnvelope("missing field `encrypted`".into()));
        }
        let gcm_tag = match profile.mode() {
            Mode::Cbc => None,
            Mode::Gcm => match envelope.decode_auth_tag()? {
                Some(tag) => Some(tag),
                None => {
                    return Err(CodecError::MalformedEnvelope(format!(
                        "missing field `authTag` required by {profile}"
                    )))
                }
            },
        };
        let iv: [u8; IV_LEN] = envelope.decode_iv()?;
        let ciphertext = envelope.decode_ciphertext()?;
        if profile.mode() == Mode::Cbc && ciphertext.len() % IV_LEN != 0 {
            return Err(CodecError::MalformedEnvelope(format!(
                "`encrypted` is {} bytes, not a whole number of {IV_LEN}-byte blocks",
                ciphertext.len()
            )));
        }
        if secret.is_empty() {
            return Err(CodecError::EmptySecret);
        }

        let key = crypto::derive_key(secret, profile.key_len(), &self.kdf)?;
        debug!(%profile, bytes = ciphertext.len(), "decrypting");

        let plaintext = match gcm_tag {
            Some(tag) => crypto::gcm_open(&key, &iv, &ciphertext, &tag)?,
            None      => crypto::cbc_decrypt(&key, &iv, &ciphertext)?,
        };

        validate_json(&plaintext).map_err(|_| CodecError::InvalidResult)?;
        Ok(plaintext)
    }

    /// Parse envelope JSON and decrypt it.
    pub fn decrypt_slice(
        &self,
        envelope_json: &[u8],
        profile:       CipherProfile,
        secret:        &str,
    ) -> Result<Vec<u8>, CodecError> {
        let envelope = Envelope::from_slice(envelope_json)?;
        self.decrypt(&envelope, profile, secret)
    }
}

/// Encrypt with the default scrypt parameters.
pub fn encrypt(plaintext: &[u8], profile: CipherProfile, secret: &str) -> Result<Envelope, CodecError> {
    EnvelopeCodec::default().encrypt(plaintext, profile, secret)
}

/// Decrypt with the default scrypt parameters.
pub fn decrypt(envelope: &Envelope, profile: CipherProfile, secret: &str) -> Result<Vec<u8>, CodecError> {
    EnvelopeCodec::default().decrypt(envelope, profile, secret)
}

/// Check that `bytes` is one complete UTF-8 JSON value, without building it.
fn validate_json(bytes: &[u8]) -> Result<(), String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    serde_json::from_str::<IgnoredAny>(text).map_err(|e| e.to_string())?;
    Ok(())
}
