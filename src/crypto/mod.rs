//! scrypt key derivation and the raw AES-CBC / AES-GCM primitives.
//!
//! Key derivation: scrypt(secret, salt="salt", N=2^14, r=8, p=1) → 16/24/32-byte key
//! CBC:            AES-CBC, PKCS#7 padding, 16-byte IV
//! GCM:            AES-GCM, 16-byte nonce, AAD "json-encrypt", detached 16-byte tag
//!
//! Nothing here knows about hex, JSON or envelopes; see [`crate::codec`].

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit, Nonce, OsRng as AeadOsRng, Tag};
use aes_gcm::AesGcm;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;
use zeroize::Zeroizing;

/// Byte length of the IV carried by every envelope (also the GCM nonce).
pub const IV_LEN: usize = 16;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Fixed scrypt salt.  Decryption needs nothing but secret and profile, so the
/// salt cannot vary per file.
pub const KDF_SALT: &[u8] = b"salt";

/// Associated data bound into every GCM tag.
pub const GCM_AAD: &[u8] = b"json-encrypt";

type Aes128Gcm16 = AesGcm<Aes128, U16>;
type Aes192Gcm16 = AesGcm<Aes192, U16>;
type Aes256Gcm16 = AesGcm<Aes256, U16>;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes192CbcEnc = cbc::Encryptor<Aes192>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes192CbcDec = cbc::Decryptor<Aes192>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Unsupported key length: {0} bytes")]
    InvalidKeyLength(usize),
    #[error("Secure random source unavailable: {0}")]
    Rng(String),
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Authentication failed — wrong secret, wrong algorithm or tampered data")]
    AuthenticationFailed,
    #[error("Invalid padding — wrong secret or wrong algorithm")]
    BadPadding,
}

// ── Key derivation ───────────────────────────────────────────────────────────

/// scrypt cost parameters.
///
/// Keys only match when both sides use the same parameters, so anything other
/// than [`KdfParams::default`] produces envelopes other tools cannot open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// log2 of the CPU/memory cost N.
    pub log_n: u8,
    pub r:     u32,
    pub p:     u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self { log_n: 14, r: 8, p: 1 }
    }
}

impl KdfParams {
    /// Cheap parameters for tests and benchmarks.  Not interoperable.
    pub fn fast() -> Self {
        Self { log_n: 4, r: 8, p: 1 }
    }
}

/// Derive a `key_len`-byte key from `secret` with scrypt and the fixed salt.
///
/// Deterministic: the same secret, length and parameters always give the same
/// key.  The returned buffer is wiped on drop.
pub fn derive_key(
    secret:  &str,
    key_len: usize,
    params:  &KdfParams,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let scrypt_params = scrypt::Params::new(params.log_n, params.r, params.p, key_len)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let mut key = Zeroizing::new(vec![0u8; key_len]);
    scrypt::scrypt(secret.as_bytes(), KDF_SALT, &scrypt_params, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Fresh IV from the operating system CSPRNG.
pub fn generate_iv() -> Result<[u8; IV_LEN], CryptoError> {
    let mut iv = [0u8; IV_LEN];
    AeadOsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| CryptoError::Rng(e.to_string()))?;
    Ok(iv)
}

// ── CBC ──────────────────────────────────────────────────────────────────────

/// AES-CBC encrypt with PKCS#7 padding.  Key size selects AES-128/192/256.
pub fn cbc_encrypt(key: &[u8], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match key.len() {
        16 => cbc_encrypt_with::<Aes128CbcEnc>(key, iv, plaintext),
        24 => cbc_encrypt_with::<Aes192CbcEnc>(key, iv, plaintext),
        32 => cbc_encrypt_with::<Aes256CbcEnc>(key, iv, plaintext),
        n  => Err(CryptoError::InvalidKeyLength(n)),
    }
}

/// AES-CBC decrypt and strip PKCS#7 padding.
///
/// CBC carries no integrity check: a wrong key usually surfaces as
/// [`CryptoError::BadPadding`], but can also yield garbage that happens to
/// unpad cleanly.  Callers must validate the result.
pub fn cbc_decrypt(key: &[u8], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match key.len() {
        16 => cbc_decrypt_with::<Aes128CbcDec>(key, iv, ciphertext),
        24 => cbc_decrypt_with::<Aes192CbcDec>(key, iv, ciphertext),
        32 => cbc_decrypt_with::<Aes256CbcDec>(key, iv, ciphertext),
        n  => Err(CryptoError::InvalidKeyLength(n)),
    }
}

fn cbc_encrypt_with<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: KeyIvInit + BlockEncryptMut,
{
    let cipher = C::new_from_slices(key, iv)
        .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt_with<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: KeyIvInit + BlockDecryptMut,
{
    let cipher = C::new_from_slices(key, iv)
        .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::BadPadding)
}

// ── GCM ──────────────────────────────────────────────────────────────────────

/// AES-GCM encrypt with [`GCM_AAD`].  Returns `(ciphertext, tag)`; the
/// ciphertext is the same length as the plaintext.
pub fn gcm_seal(
    key:       &[u8],
    iv:        &[u8; IV_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN]), CryptoError> {
    match key.len() {
        16 => gcm_seal_with::<Aes128Gcm16>(key, iv, plaintext),
        24 => gcm_seal_with::<Aes192Gcm16>(key, iv, plaintext),
        32 => gcm_seal_with::<Aes256Gcm16>(key, iv, plaintext),
        n  => Err(CryptoError::InvalidKeyLength(n)),
    }
}

/// AES-GCM decrypt, verifying `tag` over the ciphertext and [`GCM_AAD`].
///
/// Any mismatch (wrong key, wrong key size, altered IV, ciphertext or tag)
/// is [`CryptoError::AuthenticationFailed`].
pub fn gcm_open(
    key:        &[u8],
    iv:         &[u8; IV_LEN],
    ciphertext: &[u8],
    tag:        &[u8; TAG_LEN],
) -> Result<Vec<u8>, CryptoError> {
    match key.len() {
        16 => gcm_open_with::<Aes128Gcm16>(key, iv, ciphertext, tag),
        24 => gcm_open_with::<Aes192Gcm16>(key, iv, ciphertext, tag),
        32 => gcm_open_with::<Aes256Gcm16>(key, iv, ciphertext, tag),
        n  => Err(CryptoError::InvalidKeyLength(n)),
    }
}

fn gcm_seal_with<C>(
    key:       &[u8],
    iv:        &[u8; IV_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN]), CryptoError>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U16, TagSize = U16>,
{
    let cipher = C::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
    let mut buf = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<C>::from_slice(iv), GCM_AAD, &mut buf)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());
    Ok((buf, tag_bytes))
}

fn gcm_open_with<C>(
    key:        &[u8],
    iv:         &[u8; IV_LEN],
    ciphertext: &[u8],
    tag:        &[u8; TAG_LEN],
) -> Result<Vec<u8>, CryptoError>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U16, TagSize = U16>,
{
    let cipher = C::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
    let mut buf = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(Nonce::<C>::from_slice(iv), GCM_AAD, &mut buf, Tag::<C>::from_slice(tag))
        .map_err(|_| CryptoError::AuthenticationFailed)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(len: usize) -> Zeroizing<Vec<u8>> {
        derive_key("correct horse", len, &KdfParams::fast()).unwrap()
    }

    #[test]
    fn derive_key_is_deterministic() {
        assert_eq!(*key(32), *key(32));
    }

    #[test]
    fn derive_key_honours_length_and_secret() {
        let params = KdfParams::fast();
        assert_eq!(key(16).len(), 16);
        assert_eq!(key(24).len(), 24);
        let other = derive_key("battery staple", 32, &params).unwrap();
        assert_ne!(*key(32), *other);
    }

    #[test]
    fn derive_key_rejects_bad_params() {
        let params = KdfParams { log_n: 0, r: 0, p: 0 };
        assert!(matches!(
            derive_key("x", 32, &params),
            Err(CryptoError::KeyDerivation(_))
        ));
    }

    #[test]
    fn generated_ivs_differ() {
        assert_ne!(generate_iv().unwrap(), generate_iv().unwrap());
    }

    #[test]
    fn cbc_pads_to_block_size() {
        let iv = [7u8; IV_LEN];
        for len in [16, 24, 32] {
            let ct = cbc_encrypt(&key(len), &iv, b"{\"a\":1}").unwrap();
            assert_eq!(ct.len(), 16);
            let full_block = cbc_encrypt(&key(len), &iv, &[b' '; 16]).unwrap();
            assert_eq!(full_block.len(), 32);
            assert_eq!(cbc_decrypt(&key(len), &iv, &ct).unwrap(), b"{\"a\":1}");
        }
    }

    #[test]
    fn cbc_rejects_truncated_ciphertext() {
        let iv = [7u8; IV_LEN];
        let ct = cbc_encrypt(&key(32), &iv, b"[1,2,3]").unwrap();
        assert!(matches!(
            cbc_decrypt(&key(32), &iv, &ct[..ct.len() - 1]),
            Err(CryptoError::BadPadding)
        ));
    }

    #[test]
    fn gcm_ciphertext_matches_plaintext_length() {
        let iv = generate_iv().unwrap();
        let (ct, tag) = gcm_seal(&key(24), &iv, b"{\"k\":\"v\"}").unwrap();
        assert_eq!(ct.len(), 9);
        assert_eq!(gcm_open(&key(24), &iv, &ct, &tag).unwrap(), b"{\"k\":\"v\"}");
    }

    #[test]
    fn gcm_detects_tampering() {
        let iv = generate_iv().unwrap();
        let (mut ct, tag) = gcm_seal(&key(16), &iv, b"{\"k\":\"v\"}").unwrap();
        ct[0] ^= 1;
        assert!(matches!(
            gcm_open(&key(16), &iv, &ct, &tag),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn unsupported_key_length_is_an_error() {
        let iv = [0u8; IV_LEN];
        assert!(matches!(cbc_encrypt(&[0u8; 20], &iv, b""), Err(CryptoError::InvalidKeyLength(20))));
        assert!(matches!(gcm_seal(&[0u8; 8], &iv, b""), Err(CryptoError::InvalidKeyLength(8))));
    }
}
