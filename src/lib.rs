//! Password-based encryption of JSON documents into algorithm-less envelopes.
//!
//! ```no_run
//! use jsonseal::{codec, CipherProfile};
//!
//! let envelope = codec::encrypt(br#"{"token":"abc"}"#, CipherProfile::Aes256Gcm, "pw")?;
//! let json = codec::decrypt(&envelope, CipherProfile::Aes256Gcm, "pw")?;
//! assert_eq!(json, br#"{"token":"abc"}"#);
//! # Ok::<(), jsonseal::codec::CodecError>(())
//! ```

pub mod batch;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod file;
pub mod profile;

pub use batch::{run_batch, BatchReport, BatchRun, Outcome};
pub use codec::{CodecError, EnvelopeCodec};
pub use envelope::Envelope;
pub use file::{decrypt_file, encrypt_file, Direction};
pub use profile::{CipherProfile, Mode};
