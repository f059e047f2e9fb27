//! Batch runner: apply one direction to every matching file under a root.
//!
//! Each file is processed inside its own failure boundary.  Whatever goes
//! wrong with one file (unreadable, malformed envelope, wrong secret, output
//! already present) becomes a [`Failure`] in the report and the batch moves on.
//! Only setup problems with the root itself abort the run.
//!
//! A root with no matching files yields [`BatchRun::Empty`], which callers can
//! tell apart from a report in which every file failed.

pub mod discover;

pub use discover::{discover, Discovered};

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::codec::EnvelopeCodec;
use crate::file::{process_file, Direction};
use crate::profile::CipherProfile;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Success {
    pub input:  PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub input:  PathBuf,
    pub reason: String,
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(Success),
    Failure(Failure),
}

impl Outcome {
    pub fn input(&self) -> &Path {
        match self {
            Outcome::Success(s) => &s.input,
            Outcome::Failure(f) => &f.input,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub successes: Vec<Success>,
    pub failures:  Vec<Failure>,
}

impl BatchReport {
    pub fn push(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success(s) => self.successes.push(s),
            Outcome::Failure(f) => self.failures.push(f),
        }
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// True when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line tally, e.g. `"3 succeeded, 1 failed (4 total)"`.
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed ({} total)",
            self.successes.len(),
            self.failures.len(),
            self.total()
        )
    }
}

/// Result of a whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchRun {
    /// Discovery found nothing to process.
    Empty,
    Completed(BatchReport),
}

impl BatchRun {
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            BatchRun::Empty        => None,
            BatchRun::Completed(r) => Some(r),
        }
    }
}

/// Errors that stop a batch before any file is touched.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Directory not found: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Cannot access {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Everything a batch needs besides the file list.
#[derive(Debug, Clone, Copy)]
pub struct Job<'a> {
    pub direction: Direction,
    pub profile:   CipherProfile,
    pub secret:    &'a str,
    pub overwrite: bool,
}

// ── Processing ────────────────────────────────────────────────────────────────

/// Process one file.  Never fails: errors come back as [`Outcome::Failure`].
pub fn process_one(codec: &EnvelopeCodec, job: &Job<'_>, path: &Path) -> Outcome {
    match process_file(codec, job.direction, path, job.profile, job.secret, job.overwrite) {
        Ok(output) => {
            info!(direction = %job.direction, input = %path.display(), output = %output.display(), "ok");
            Outcome::Success(Success { input: path.to_owned(), output })
        }
        Err(e) => {
            warn!(direction = %job.direction, input = %path.display(), error = %e, "failed");
            Outcome::Failure(Failure { input: path.to_owned(), reason: e.to_string() })
        }
    }
}

/// Discover files under `root` and process each of them.
pub fn run_batch(
    codec:     &EnvelopeCodec,
    root:      &Path,
    recursive: bool,
    job:       &Job<'_>,
) -> Result<BatchRun, BatchError> {
    run_batch_with_progress(codec, root, recursive, job, |_| {})
}

/// Like [`run_batch`], calling `on_outcome` for every file in discovery order.
///
/// Files are processed sequentially unless the `parallel` feature is enabled,
/// in which case they run on the Rayon pool and `on_outcome` is called once
/// all of them have finished.
pub fn run_batch_with_progress<F>(
    codec:      &EnvelopeCodec,
    root:       &Path,
    recursive:  bool,
    job:        &Job<'_>,
    mut on_outcome: F,
) -> Result<BatchRun, BatchError>
where
    F: FnMut(&Outcome),
{
    let Discovered { files, errors } = discover(root, recursive, job.direction)?;
    if files.is_empty() && errors.is_empty() {
        info!(root = %root.display(), direction = %job.direction, "no matching files");
        return Ok(BatchRun::Empty);
    }

    let (files, clashes) = reject_shared_outputs(files, job.direction);

    let mut report = BatchReport::default();
    for failure in errors.into_iter().chain(clashes) {
        let outcome = Outcome::Failure(failure);
        on_outcome(&outcome);
        report.push(outcome);
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        let outcomes: Vec<Outcome> = files
            .par_iter()
            .map(|path| process_one(codec, job, path))
            .collect();
        for outcome in outcomes {
            on_outcome(&outcome);
            report.push(outcome);
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        for path in &files {
            let outcome = process_one(codec, job, path);
            on_outcome(&outcome);
            report.push(outcome);
        }
    }

    info!(root = %root.display(), direction = %job.direction, "{}", report.summary());
    Ok(BatchRun::Completed(report))
}

/// Split off inputs whose output path another input also maps to, such as
/// `a.json` and `a.JSON` both producing `a.enc`.  None of them is processed.
fn reject_shared_outputs(files: Vec<PathBuf>, direction: Direction) -> (Vec<PathBuf>, Vec<Failure>) {
    let mut claims: HashMap<PathBuf, usize> = HashMap::new();
    for path in &files {
        if let Ok(output) = direction.output_path(path) {
            *claims.entry(output).or_default() += 1;
        }
    }

    let mut clashes = Vec::new();
    let files = files
        .into_iter()
        .filter_map(|path| match direction.output_path(&path) {
            Ok(output) if claims[&output] > 1 => {
                warn!(input = %path.display(), output = %output.display(), "output shared with another input");
                clashes.push(Failure {
                    reason: format!("Output {} would also be written from another input", output.display()),
                    input:  path,
                });
                None
            }
            _ => Some(path),
        })
        .collect();
    (files, clashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KdfParams;
    use std::fs;
    use tempfile::tempdir;

    fn codec() -> EnvelopeCodec {
        EnvelopeCodec::new(KdfParams::fast())
    }

    fn job(direction: Direction) -> Job<'static> {
        Job { direction, profile: CipherProfile::Aes128Gcm, secret: "batch", overwrite: false }
    }

    #[test]
    fn summary_counts_both_sides() {
        let mut report = BatchReport::default();
        report.push(Outcome::Success(Success { input: "a.json".into(), output: "a.enc".into() }));
        report.push(Outcome::Failure(Failure { input: "b.json".into(), reason: "nope".into() }));
        assert_eq!(report.summary(), "1 succeeded, 1 failed (2 total)");
        assert!(!report.is_clean());
    }

    #[test]
    fn process_one_turns_errors_into_failures() {
        let dir = tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, b"{oops").unwrap();

        let outcome = process_one(&codec(), &job(Direction::Encrypt), &bad);
        match outcome {
            Outcome::Failure(f) => {
                assert_eq!(f.input, bad);
                assert!(f.reason.contains("not valid JSON"), "{}", f.reason);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!dir.path().join("bad.enc").exists());
    }

    #[test]
    fn empty_root_is_distinct_from_all_failed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), b"hi").unwrap();
        assert_eq!(run_batch(&codec(), dir.path(), true, &job(Direction::Encrypt)).unwrap(), BatchRun::Empty);

        fs::write(dir.path().join("broken.json"), b"nope").unwrap();
        let run = run_batch(&codec(), dir.path(), true, &job(Direction::Encrypt)).unwrap();
        let report = run.report().unwrap();
        assert_eq!(report.successes.len(), 0);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn inputs_sharing_an_output_are_all_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), b"{\"v\":1}").unwrap();
        fs::write(dir.path().join("a.JSON"), b"{\"v\":2}").unwrap();
        fs::write(dir.path().join("b.json"), b"{\"v\":3}").unwrap();
        if fs::read_dir(dir.path()).unwrap().count() < 3 {
            // Case-insensitive filesystem: the pair is a single file.
            return;
        }

        let job = Job { overwrite: true, ..job(Direction::Encrypt) };
        let run = run_batch(&codec(), dir.path(), false, &job).unwrap();
        let report = run.report().unwrap();
        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.successes[0].input, dir.path().join("b.json"));
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| f.reason.contains("a.enc")), "{:?}", report.failures);
        assert!(!dir.path().join("a.enc").exists());
    }

    #[cfg(unix)]
    #[test]
    fn unlistable_subdirectory_alone_is_not_an_empty_batch() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("inside.json"), b"{}").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let enforced = fs::read_dir(&locked).is_err();
        let run = run_batch(&codec(), dir.path(), true, &job(Direction::Encrypt));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if !enforced {
            // Privileged user: permissions are not enforced.
            return;
        }

        match run.unwrap() {
            BatchRun::Completed(report) => {
                assert!(report.successes.is_empty());
                assert_eq!(report.failures.len(), 1);
                assert_eq!(report.failures[0].input, locked);
            }
            BatchRun::Empty => panic!("a scan with errors must not look empty"),
        }
    }

    #[test]
    fn progress_sees_every_file_in_order() {
        let dir = tempdir().unwrap();
        for name in ["c.json", "a.json", "b.json"] {
            fs::write(dir.path().join(name), b"{\"n\":1}").unwrap();
        }

        let mut seen = Vec::new();
        let run = run_batch_with_progress(&codec(), dir.path(), false, &job(Direction::Encrypt), |o| {
            seen.push(o.input().file_name().unwrap().to_string_lossy().into_owned());
        })
        .unwrap();

        assert_eq!(seen, ["a.json", "b.json", "c.json"]);
        assert!(run.report().unwrap().is_clean());
    }
}
