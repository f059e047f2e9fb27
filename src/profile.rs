//! Cipher profiles: the closed set of algorithm selectors.
//!
//! A profile fixes key length and block mode together.  It is never written
//! into an envelope; whoever decrypts must supply the same profile that was
//! used to encrypt.
//!
//! | Profile       | Key bytes | IV bytes | Tag |
//! |---------------|-----------|----------|-----|
//! | `aes-128-cbc` | 16        | 16       | no  |
//! | `aes-192-cbc` | 24        | 16       | no  |
//! | `aes-256-cbc` | 32        | 16       | no  |
//! | `aes-128-gcm` | 16        | 16       | 16  |
//! | `aes-192-gcm` | 24        | 16       | 16  |
//! | `aes-256-gcm` | 32        | 16       | 16  |

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::crypto::{IV_LEN, TAG_LEN};

// ── Mode ─────────────────────────────────────────────────────────────────────

/// Block cipher mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Cipher block chaining with PKCS#7 padding.  No integrity check.
    Cbc,
    /// Galois/counter mode.  Authenticated; produces a 16-byte tag.
    Gcm,
}

// ── CipherProfile ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherProfile {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes192Gcm,
    Aes256Gcm,
}

impl CipherProfile {
    /// Every supported profile, CBC first.
    pub const ALL: [CipherProfile; 6] = [
        CipherProfile::Aes128Cbc,
        CipherProfile::Aes192Cbc,
        CipherProfile::Aes256Cbc,
        CipherProfile::Aes128Gcm,
        CipherProfile::Aes192Gcm,
        CipherProfile::Aes256Gcm,
    ];

    #[inline]
    pub fn mode(self) -> Mode {
        match self {
            CipherProfile::Aes128Cbc
            | CipherProfile::Aes192Cbc
            | CipherProfile::Aes256Cbc => Mode::Cbc,
            CipherProfile::Aes128Gcm
            | CipherProfile::Aes192Gcm
            | CipherProfile::Aes256Gcm => Mode::Gcm,
        }
    }

    /// Derived key length in bytes.
    #[inline]
    pub fn key_len(self) -> usize {
        match self {
            CipherProfile::Aes128Cbc | CipherProfile::Aes128Gcm => 16,
            CipherProfile::Aes192Cbc | CipherProfile::Aes192Gcm => 24,
            CipherProfile::Aes256Cbc | CipherProfile::Aes256Gcm => 32,
        }
    }

    /// IV length in bytes.  GCM uses the same 16-byte value as its nonce.
    #[inline]
    pub fn iv_len(self) -> usize {
        IV_LEN
    }

    /// Authentication tag length, or `None` when the mode has no tag.
    #[inline]
    pub fn tag_len(self) -> Option<usize> {
        match self.mode() {
            Mode::Cbc => None,
            Mode::Gcm => Some(TAG_LEN),
        }
    }

    #[inline]
    pub fn is_authenticated(self) -> bool {
        self.mode() == Mode::Gcm
    }

    /// Canonical lowercase name, as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            CipherProfile::Aes128Cbc => "aes-128-cbc",
            CipherProfile::Aes192Cbc => "aes-192-cbc",
            CipherProfile::Aes256Cbc => "aes-256-cbc",
            CipherProfile::Aes128Gcm => "aes-128-gcm",
            CipherProfile::Aes192Gcm => "aes-192-gcm",
            CipherProfile::Aes256Gcm => "aes-256-gcm",
        }
    }

    /// Parse a profile name.  Case-insensitive, surrounding whitespace ignored.
    pub fn from_name(s: &str) -> Option<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.name() == wanted)
    }
}

impl fmt::Display for CipherProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported algorithm '{0}' (expected one of: {names})", names = supported_names())]
pub struct UnsupportedProfile(pub String);

fn supported_names() -> String {
    CipherProfile::ALL.map(CipherProfile::name).join(", ")
}

impl FromStr for CipherProfile {
    type Err = UnsupportedProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnsupportedProfile(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for p in CipherProfile::ALL {
            assert_eq!(p.name().parse::<CipherProfile>().unwrap(), p);
            assert_eq!(p.to_string(), p.name());
        }
    }

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!(CipherProfile::from_name(" AES-256-GCM "), Some(CipherProfile::Aes256Gcm));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "aes-512-ctr".parse::<CipherProfile>().unwrap_err();
        assert_eq!(err, UnsupportedProfile("aes-512-ctr".into()));
        assert!(err.to_string().contains("aes-192-cbc"));
    }

    #[test]
    fn key_length_and_mode_come_together() {
        assert_eq!(CipherProfile::Aes192Cbc.key_len(), 24);
        assert_eq!(CipherProfile::Aes192Cbc.mode(), Mode::Cbc);
        assert_eq!(CipherProfile::Aes192Cbc.tag_len(), None);
        assert_eq!(CipherProfile::Aes128Gcm.key_len(), 16);
        assert_eq!(CipherProfile::Aes128Gcm.tag_len(), Some(16));
        assert!(CipherProfile::ALL.iter().all(|p| p.iv_len() == 16));
    }
}
