//! Settings resolution for the command-line front end.
//!
//! Each value is taken from the first source that supplies a non-empty one:
//!
//! 1. an explicit argument
//! 2. the environment (`JSONSEAL_ALGORITHM`, `JSONSEAL_SECRET`)
//! 3. an interactive prompt
//!
//! Environment access and prompting go through parameters so resolution
//! itself has no hidden process-wide state.

use std::io;

use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::KdfParams;
use crate::profile::{CipherProfile, UnsupportedProfile};

pub const ENV_ALGORITHM: &str = "JSONSEAL_ALGORITHM";
pub const ENV_SECRET:    &str = "JSONSEAL_SECRET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    UnsupportedProfile(#[from] UnsupportedProfile),
    #[error("Secret must not be empty")]
    EmptySecret,
    #[error("Prompt failed: {0}")]
    Prompt(#[from] io::Error),
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Argument,
    Environment,
    Prompt,
}

/// Interactive fallback for values missing from arguments and environment.
pub trait Prompter {
    fn algorithm(&mut self) -> io::Result<String>;
    fn secret(&mut self) -> io::Result<String>;
}

/// Values supplied explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub algorithm: Option<String>,
    pub secret:    Option<String>,
    pub recursive: bool,
    pub overwrite: bool,
}

/// Fully resolved settings for one invocation.
pub struct Settings {
    pub profile:   CipherProfile,
    pub secret:    Zeroizing<String>,
    pub kdf:       KdfParams,
    pub recursive: bool,
    pub overwrite: bool,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("profile", &self.profile)
            .field("secret", &"<redacted>")
            .field("kdf", &self.kdf)
            .field("recursive", &self.recursive)
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

impl Settings {
    /// Resolve settings from `overrides`, then `env`, then `prompter`.
    ///
    /// `env` looks up one variable by name; pass `|k| std::env::var(k).ok()`
    /// for the real environment.
    pub fn resolve<E, P>(overrides: Overrides, env: E, prompter: &mut P) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
        P: Prompter + ?Sized,
    {
        let (algorithm, source) = resolve_value(overrides.algorithm, env(ENV_ALGORITHM), || prompter.algorithm())?;
        let profile = algorithm.parse::<CipherProfile>()?;
        debug!(%profile, ?source, "algorithm resolved");

        let (secret, source) = resolve_value(overrides.secret, env(ENV_SECRET), || prompter.secret())?;
        debug!(?source, "secret resolved");
        let secret = Zeroizing::new(secret);
        if secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        Ok(Self {
            profile,
            secret,
            kdf:       KdfParams::default(),
            recursive: overrides.recursive,
            overwrite: overrides.overwrite,
        })
    }
}

/// Pick `explicit`, else `env`, else whatever `prompt` returns.
///
/// Empty strings count as absent, so `JSONSEAL_SECRET=` falls through to the
/// prompt.  The prompt is only called when both other sources are empty.
pub fn resolve_value<F>(
    explicit: Option<String>,
    env:      Option<String>,
    prompt:   F,
) -> io::Result<(String, Source)>
where
    F: FnOnce() -> io::Result<String>,
{
    if let Some(v) = explicit.filter(|v| !v.is_empty()) {
        return Ok((v, Source::Argument));
    }
    if let Some(v) = env.filter(|v| !v.is_empty()) {
        return Ok((v, Source::Environment));
    }
    Ok((prompt()?, Source::Prompt))
}
