use clap::{Args, Parser, Subcommand, ValueEnum};
use jsonseal::batch::{run_batch_with_progress, BatchRun, Job, Outcome};
use jsonseal::config::{Overrides, Prompter, Settings};
use jsonseal::file::{check_input, process_file, Direction};
use jsonseal::{CipherProfile, EnvelopeCodec};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "jsonseal", version, about = "Encrypt JSON files into algorithm-less envelopes")]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a .json file, or every .json file in a directory
    Encrypt(Target),
    /// Decrypt a .enc file, or every .enc file in a directory
    Decrypt(Target),
    /// List supported algorithms
    Algorithms,
}

#[derive(Args)]
struct Target {
    /// File or directory
    path: PathBuf,
    /// Algorithm, e.g. aes-256-gcm (default: $JSONSEAL_ALGORITHM, then prompt)
    #[arg(short, long)]
    algorithm: Option<String>,
    /// Secret (default: $JSONSEAL_SECRET, then hidden prompt)
    #[arg(short, long)]
    secret: Option<String>,
    /// Descend into subdirectories when PATH is a directory
    #[arg(short, long)]
    recursive: bool,
    /// Replace existing output files
    #[arg(short = 'f', long)]
    overwrite: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Commands::Algorithms => {
            for p in CipherProfile::ALL {
                println!("{p}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Encrypt(target) => execute(Direction::Encrypt, target),
        Commands::Decrypt(target) => execute(Direction::Decrypt, target),
    }
}

// ── Encrypt / decrypt ────────────────────────────────────────────────────────

fn execute(direction: Direction, target: Target) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let path = target.path;
    // Fail on a missing path or wrong extension before prompting for anything.
    check_input(direction, &path)?;

    let overrides = Overrides {
        algorithm: target.algorithm,
        secret:    target.secret,
        recursive: target.recursive,
        overwrite: target.overwrite,
    };
    let settings = Settings::resolve(overrides, |k| std::env::var(k).ok(), &mut TerminalPrompter)?;
    let codec = EnvelopeCodec::new(settings.kdf);

    if !path.is_dir() {
        let output = process_file(&codec, direction, &path, settings.profile, &settings.secret, settings.overwrite)?;
        println!("{}  {} -> {}", direction, path.display(), output.display());
        return Ok(ExitCode::SUCCESS);
    }

    let job = Job {
        direction,
        profile:   settings.profile,
        secret:    &settings.secret,
        overwrite: settings.overwrite,
    };
    match run_batch_with_progress(&codec, &path, settings.recursive, &job, print_outcome)? {
        BatchRun::Empty => {
            println!("No .{} files found in {}", direction.input_ext(), path.display());
            Ok(ExitCode::SUCCESS)
        }
        BatchRun::Completed(report) => {
            println!("{}", report.summary());
            Ok(if report.is_clean() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Success(s) => println!("  ok    {} -> {}", s.input.display(), s.output.display()),
        Outcome::Failure(f) => println!("  FAIL  {}: {}", f.input.display(), f.reason),
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn algorithm(&mut self) -> io::Result<String> {
        let mut err = io::stderr().lock();
        writeln!(err, "Algorithm:")?;
        for (i, p) in CipherProfile::ALL.iter().enumerate() {
            writeln!(err, "  {}) {}", i + 1, p)?;
        }
        write!(err, "Choose [1-{}]: ", CipherProfile::ALL.len())?;
        err.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let answer = line.trim();
        // Accept either the menu number or the name itself.
        Ok(match answer.parse::<usize>() {
            Ok(n) if (1..=CipherProfile::ALL.len()).contains(&n) => CipherProfile::ALL[n - 1].name().to_owned(),
            _ => answer.to_owned(),
        })
    }

    fn secret(&mut self) -> io::Result<String> {
        rpassword::prompt_password("Secret: ")
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}
