//! Single-file encrypt/decrypt: read, run the codec, write the result.
//!
//! ```no_run
//! use jsonseal::codec::EnvelopeCodec;
//! use jsonseal::file::{encrypt_file, decrypt_file};
//! use jsonseal::CipherProfile;
//!
//! let codec = EnvelopeCodec::default();
//! let enc = encrypt_file(&codec, "config.json".as_ref(), CipherProfile::Aes256Gcm, "pw", false)?;
//! assert_eq!(enc, std::path::Path::new("config.enc"));
//! let json = decrypt_file(&codec, &enc, CipherProfile::Aes256Gcm, "pw", true)?;
//! # Ok::<(), jsonseal::file::FileError>(())
//! ```
//!
//! Outputs are written to a temporary file in the destination directory and
//! then renamed into place, so a destination is either the complete result
//! or untouched.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;
use thiserror::Error;
use tracing::debug;

use crate::codec::{CodecError, EnvelopeCodec};
use crate::profile::CipherProfile;

pub const JSON_EXT: &str = "json";
pub const ENC_EXT:  &str = "enc";

// ── Direction ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    /// Extension of the files this direction consumes.
    pub fn input_ext(self) -> &'static str {
        match self {
            Direction::Encrypt => JSON_EXT,
            Direction::Decrypt => ENC_EXT,
        }
    }

    /// Extension of the files this direction produces.
    pub fn output_ext(self) -> &'static str {
        match self {
            Direction::Encrypt => ENC_EXT,
            Direction::Decrypt => JSON_EXT,
        }
    }

    /// Whether `path` carries this direction's input extension (any case).
    pub fn accepts(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(self.input_ext()))
    }

    /// `x.json` → `x.enc` when encrypting, `x.enc` → `x.json` when decrypting.
    pub fn output_path(self, input: &Path) -> Result<PathBuf, FileError> {
        if !self.accepts(input) {
            return Err(FileError::WrongExtension {
                path:     input.to_owned(),
                expected: self.input_ext(),
            });
        }
        Ok(input.with_extension(self.output_ext()))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Encrypt => "encrypt",
            Direction::Decrypt => "decrypt",
        })
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum FileError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Not a .{expected} file: {}", .path.display())]
    WrongExtension { path: PathBuf, expected: &'static str },
    #[error("Output already exists: {} (overwrite not allowed)", .0.display())]
    OutputExists(PathBuf),
    #[error("Output path has no parent directory: {}", .0.display())]
    InvalidOutputPath(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("{}: {source}", .path.display())]
    Codec { path: PathBuf, source: CodecError },
    #[error("Envelope serialisation failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl FileError {
    fn io(path: &Path, source: io::Error) -> Self {
        FileError::Io { path: path.to_owned(), source }
    }

    fn codec(path: &Path, source: CodecError) -> Self {
        FileError::Codec { path: path.to_owned(), source }
    }

    /// The codec failure behind this error, if any.
    pub fn codec_error(&self) -> Option<&CodecError> {
        match self {
            FileError::Codec { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

/// Encrypt `input` (`*.json`) into a sibling `*.enc` envelope.
///
/// Returns the output path.
pub fn encrypt_file(
    codec:     &EnvelopeCodec,
    input:     &Path,
    profile:   CipherProfile,
    secret:    &str,
    overwrite: bool,
) -> Result<PathBuf, FileError> {
    process_file(codec, Direction::Encrypt, input, profile, secret, overwrite)
}

/// Decrypt `input` (`*.enc`) into a sibling `*.json` document.
///
/// Returns the output path.
pub fn decrypt_file(
    codec:     &EnvelopeCodec,
    input:     &Path,
    profile:   CipherProfile,
    secret:    &str,
    overwrite: bool,
) -> Result<PathBuf, FileError> {
    process_file(codec, Direction::Decrypt, input, profile, secret, overwrite)
}

/// Run one file through the codec in the given direction.
///
/// Nothing is written unless the codec succeeds.  Without `overwrite`, an
/// existing output is reported as [`FileError::OutputExists`] and left as is.
pub fn process_file(
    codec:     &EnvelopeCodec,
    direction: Direction,
    input:     &Path,
    profile:   CipherProfile,
    secret:    &str,
    overwrite: bool,
) -> Result<PathBuf, FileError> {
    let output = direction.output_path(input)?;
    let data = read_input(input)?;
    if !overwrite && output.exists() {
        return Err(FileError::OutputExists(output));
    }

    let result = match direction {
        Direction::Encrypt => codec
            .encrypt(&data, profile, secret)
            .map_err(|e| FileError::codec(input, e))?
            .to_vec_pretty()?,
        Direction::Decrypt => codec
            .decrypt_slice(&data, profile, secret)
            .map_err(|e| FileError::codec(input, e))?,
    };

    write_output(&output, &result, overwrite)?;
    debug!(%direction, input = %input.display(), output = %output.display(), "wrote output");
    Ok(output)
}

/// Cheap up-front checks for a path given on the command line: it must exist,
/// and a file must carry `direction`'s input extension.  Directories pass.
pub fn check_input(direction: Direction, path: &Path) -> Result<(), FileError> {
    let meta = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FileError::NotFound(path.to_owned()),
        _ => FileError::io(path, e),
    })?;
    if !meta.is_dir() {
        direction.output_path(path)?;
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>, FileError> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FileError::NotFound(path.to_owned()),
        _ => FileError::io(path, e),
    })
}

/// Write `data` to `path` through a temporary file in the same directory.
///
/// With `overwrite == false` the final rename refuses to replace an existing
/// file, which closes the window between the caller's existence check and
/// the write.
pub fn write_output(path: &Path, data: &[u8], overwrite: bool) -> Result<(), FileError> {
    let dir = match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => return Err(FileError::InvalidOutputPath(path.to_owned())),
    };

    let mut tmp = Builder::new()
        .prefix(".jsonseal")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| FileError::io(path, e))?;
    tmp.write_all(data).map_err(|e| FileError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| FileError::io(path, e))?;

    let persisted = if overwrite { tmp.persist(path) } else { tmp.persist_noclobber(path) };
    persisted.map_err(|e| match e.error.kind() {
        io::ErrorKind::AlreadyExists => FileError::OutputExists(path.to_owned()),
        _ => FileError::io(path, e.error),
    })?;
    Ok(())
}
