//! The persisted envelope: `{"iv", "encrypted", "authTag"?}` as hex strings.
//!
//! There is intentionally no algorithm field.  An envelope on its own does not
//! say which profile produced it.

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;
use crate::crypto::{IV_LEN, TAG_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// 16-byte IV, hex.
    pub iv:        String,
    /// Ciphertext, hex.
    pub encrypted: String,
    /// 16-byte GCM tag, hex.  Absent for CBC profiles.
    #[serde(rename = "authTag", default, skip_serializing_if = "Option::is_none")]
    pub auth_tag:  Option<String>,
}

/// On-disk shape with every field optional, so a missing field is reported as
/// a malformed envelope instead of a generic deserialisation error.
#[derive(Deserialize)]
struct RawEnvelope {
    iv:        Option<String>,
    encrypted: Option<String>,
    #[serde(rename = "authTag")]
    auth_tag:  Option<String>,
}

impl Envelope {
    /// Hex-encode raw cipher output into an envelope.
    pub fn from_parts(iv: &[u8; IV_LEN], ciphertext: &[u8], tag: Option<&[u8; TAG_LEN]>) -> Self {
        Self {
            iv:        hex::encode(iv),
            encrypted: hex::encode(ciphertext),
            auth_tag:  tag.map(hex::encode),
        }
    }

    /// Parse envelope JSON.
    ///
    /// Fails with [`CodecError::MalformedEnvelope`] when the bytes are not a
    /// JSON object or when `iv` / `encrypted` are missing.  `authTag` is only
    /// checked later, once the profile is known.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        let raw: RawEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| CodecError::MalformedEnvelope(format!("not an envelope object: {e}")))?;
        let iv = raw.iv
            .ok_or_else(|| CodecError::MalformedEnvelope("missing field `iv`".into()))?;
        let encrypted = raw.encrypted
            .ok_or_else(|| CodecError::MalformedEnvelope("missing field `encrypted`".into()))?;
        Ok(Self { iv, encrypted, auth_tag: raw.auth_tag })
    }

    /// Serialise as pretty-printed JSON (two-space indent).
    pub fn to_vec_pretty(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    // ── Field decoding ───────────────────────────────────────────────────────

    pub fn decode_iv(&self) -> Result<[u8; IV_LEN], CodecError> {
        decode_fixed("iv", &self.iv)
    }

    pub fn decode_ciphertext(&self) -> Result<Vec<u8>, CodecError> {
        hex::decode(&self.encrypted)
            .map_err(|e| CodecError::MalformedEnvelope(format!("`encrypted` is not hex: {e}")))
    }

    /// Decode `authTag`, or `Ok(None)` when the field is absent.
    pub fn decode_auth_tag(&self) -> Result<Option<[u8; TAG_LEN]>, CodecError> {
        self.auth_tag
            .as_deref()
            .map(|t| decode_fixed("authTag", t))
            .transpose()
    }
}

fn decode_fixed<const N: usize>(field: &str, value: &str) -> Result<[u8; N], CodecError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(value, &mut out).map_err(|e| {
        CodecError::MalformedEnvelope(format!("`{field}` must be {} hex chars: {e}", N * 2))
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbc_envelope_omits_auth_tag() {
        let env = Envelope::from_parts(&[0xab; IV_LEN], &[1, 2, 3], None);
        let json = String::from_utf8(env.to_vec_pretty().unwrap()).unwrap();
        assert!(json.contains("\"iv\": \"abababababababababababababababab\""));
        assert!(json.contains("\"encrypted\": \"010203\""));
        assert!(!json.contains("authTag"));
    }

    #[test]
    fn gcm_envelope_carries_auth_tag_and_no_algorithm() {
        let env = Envelope::from_parts(&[0; IV_LEN], &[9], Some(&[0xff; TAG_LEN]));
        let value: serde_json::Value = serde_json::from_slice(&env.to_vec_pretty().unwrap()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["authTag"], "ffffffffffffffffffffffffffffffff");
        assert!(!obj.contains_key("algorithm"));
    }

    #[test]
    fn from_slice_reports_missing_fields() {
        let err = Envelope::from_slice(br#"{"encrypted":"00"}"#).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEnvelope(ref m) if m.contains("`iv`")));

        let err = Envelope::from_slice(br#"{"iv":"00"}"#).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEnvelope(ref m) if m.contains("`encrypted`")));

        let err = Envelope::from_slice(b"[1,2]").unwrap_err();
        assert!(matches!(err, CodecError::MalformedEnvelope(_)));
    }

    #[test]
    fn from_slice_accepts_fields_in_any_order() {
        let env = Envelope::from_slice(br#"{"authTag":"aa","encrypted":"bb","iv":"cc"}"#).unwrap();
        assert_eq!(env.iv, "cc");
        assert_eq!(env.encrypted, "bb");
        assert_eq!(env.auth_tag.as_deref(), Some("aa"));
    }

    #[test]
    fn decoding_checks_lengths_and_hex() {
        let mut env = Envelope::from_parts(&[1; IV_LEN], &[2; 4], Some(&[3; TAG_LEN]));
        assert_eq!(env.decode_iv().unwrap(), [1; IV_LEN]);
        assert_eq!(env.decode_ciphertext().unwrap(), vec![2; 4]);
        assert_eq!(env.decode_auth_tag().unwrap(), Some([3; TAG_LEN]));

        env.iv.truncate(30);
        assert!(matches!(env.decode_iv(), Err(CodecError::MalformedEnvelope(_))));
        env.encrypted = "zz".into();
        assert!(matches!(env.decode_ciphertext(), Err(CodecError::MalformedEnvelope(_))));
        env.auth_tag = None;
        assert_eq!(env.decode_auth_tag().unwrap(), None);
    }
}
