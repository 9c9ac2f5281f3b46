//! cipherhunt - find encrypted-looking files in a filesystem event stream.
//!
//! Usage:
//!   cipherhunt run [INPUT]   Classify fs:stat records (JSON Lines) and report per owner
//!   cipherhunt check         Verify the classifier program can be found
//!   cipherhunt --help        Show help

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cipherhunt_core::{HomeDirResolver, HuntConfig};
use cipherhunt_pipeline::{
    HuntOutcome, HuntStats, HuntWarning, Hunter, ProcessClassifier, Report, open_input,
    spawn_jsonl_reader,
};

#[derive(Parser)]
#[command(
    name = "cipherhunt",
    version,
    about = "Find encrypted-looking files in a filesystem event stream",
    long_about = "cipherhunt reads filesystem stat records, runs an external classifier \
                  once per distinct path and reports flagged files grouped by owner.\n\n\
                  The classifier is any program that exits 0 when the file passed as its \
                  last argument looks encrypted (TCHunt-ng by default)."
)]
struct Cli {
    /// Config file (defaults to <config dir>/cipherhunt/config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify records and print the per-owner report
    Run(RunArgs),

    /// Check that the classifier program can be found
    Check {
        /// Classifier program (overrides config)
        #[arg(long)]
        classifier: Option<String>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// JSON Lines file of records, or `-` for stdin
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Classifier program (overrides config)
    #[arg(long)]
    classifier: Option<String>,

    /// Argument passed to the classifier before the path (repeatable)
    #[arg(long = "arg", allow_hyphen_values = true)]
    classifier_args: Vec<String>,

    /// Accepted record kind (repeatable, replaces configured kinds)
    #[arg(short, long = "kind")]
    kinds: Vec<String>,

    /// Number of concurrent classifications (0 = one per CPU)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Per-file classifier timeout (e.g. "500ms", "30s", "2m")
    #[arg(short, long)]
    timeout: Option<String>,

    /// How long in-flight classifications may run after Ctrl-C
    #[arg(long)]
    grace: Option<String>,

    /// User home directory as USER=DIR (repeatable)
    #[arg(long = "home")]
    homes: Vec<String>,

    /// Do not infer owners from /home/<user>, /Users/<user> and /root
    #[arg(long)]
    no_conventional_homes: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// JSON output document.
#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a Report,
    stats: &'a HuntStats,
    warnings: &'a [HuntWarning],
    cancelled: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        match cli.command {
            Command::Run(args) => run_hunt(cli.config.as_deref(), args).await,
            Command::Check { classifier } => run_check(cli.config.as_deref(), classifier),
        }
    });

    // Stdin reads may still be parked on a blocking thread after cancellation.
    rt.shutdown_timeout(Duration::from_millis(100));

    result
}

/// Log to stderr so reports on stdout stay clean.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,hunt=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run a hunt over a record stream and emit the report.
async fn run_hunt(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let config = build_config(config_path, &args)?;

    let classifier = ProcessClassifier::from_config(&config)
        .context("Classifier unavailable; install it or pass --classifier")?;
    eprintln!("Using classifier {}", classifier.program().display());

    let resolver = HomeDirResolver::from_homes(config.user_homes.clone(), config.conventional_homes);
    let capacity = config.channel_capacity;
    let hunter = Hunter::new(config, Arc::new(classifier), Arc::new(resolver))?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, finishing in-flight files...");
            ctrl_c.cancel();
        }
    });

    let mut progress_rx = hunter.subscribe();
    let progress_task = tokio::spawn(async move {
        while let Ok(progress) = progress_rx.recv().await {
            tracing::info!(
                target: "hunt",
                processed = progress.stats.paths_processed(),
                classified = progress.stats.classified,
                rate = %format!("{:.1}/s", progress.paths_per_second()),
                "progress"
            );
        }
    });

    let reader = open_input(&args.input)
        .await
        .with_context(|| format!("Cannot open input {}", args.input.display()))?;
    let (records, reader_task) = spawn_jsonl_reader(reader, capacity);

    let outcome = hunter.run(records, cancel).await.context("Hunt failed")?;
    progress_task.abort();

    let mut input_error = None;
    if outcome.cancelled {
        reader_task.abort();
    } else {
        match reader_task.await.context("Input reader failed")? {
            Ok(summary) if summary.malformed > 0 => {
                eprintln!("Skipped {} malformed line(s)", summary.malformed);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(target: "source", error = %e, "input ended early, report is partial");
                input_error = Some(e);
            }
        }
    }

    write_output(&outcome, args.format, args.output.as_deref())?;
    print_summary(&outcome);

    match input_error {
        Some(e) => Err(e).context(
            "Failed to read all records; the report covers those read before the error",
        ),
        None => Ok(()),
    }
}

/// Check that the classifier resolves.
fn run_check(config_path: Option<&Path>, classifier: Option<String>) -> Result<()> {
    let mut config =
        HuntConfig::load_or_default(config_path).context("Failed to load configuration")?;
    if let Some(classifier) = classifier {
        config.classifier = classifier;
    }

    let classifier = ProcessClassifier::from_config(&config)?;
    println!(
        "{} -> {} (timeout {}ms)",
        config.classifier,
        classifier.program().display(),
        config.timeout_ms
    );
    Ok(())
}

/// Merge the config file with command-line overrides.
fn build_config(config_path: Option<&Path>, args: &RunArgs) -> Result<HuntConfig> {
    let mut config =
        HuntConfig::load_or_default(config_path).context("Failed to load configuration")?;

    if let Some(classifier) = &args.classifier {
        config.classifier = classifier.clone();
    }
    if !args.classifier_args.is_empty() {
        config.classifier_args = args.classifier_args.clone();
    }
    if !args.kinds.is_empty() {
        config.accepted_kinds = args.kinds.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(timeout) = &args.timeout {
        config.timeout_ms = duration_ms(parse_duration(timeout)?);
    }
    if let Some(grace) = &args.grace {
        config.grace_period_ms = duration_ms(parse_duration(grace)?);
    }
    config.user_homes.extend(parse_homes(&args.homes)?);
    if args.no_conventional_homes {
        config.conventional_homes = false;
    }

    config.validate()?;
    Ok(config)
}

/// Write the report in the requested format.
fn write_output(outcome: &HuntOutcome, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let body = match format {
        OutputFormat::Text => outcome.report.text.clone(),
        OutputFormat::Json => {
            let doc = JsonOutput {
                report: &outcome.report,
                stats: &outcome.stats,
                warnings: &outcome.warnings,
                cancelled: outcome.cancelled,
            };
            let mut json = serde_json::to_string_pretty(&doc)?;
            json.push('\n');
            json
        }
    };

    match output {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => print!("{body}"),
    }

    Ok(())
}

/// Print a one-paragraph run summary to stderr.
fn print_summary(outcome: &HuntOutcome) {
    let stats = &outcome.stats;
    eprintln!(
        "{} of {} file(s) flagged across {} owner(s) in {:.2}s",
        stats.classified,
        stats.paths_processed(),
        outcome.report.owner_count(),
        outcome.duration.as_secs_f64()
    );
    if stats.invocation_failures > 0 {
        eprintln!(
            "{} classifier failure(s) treated as not flagged",
            stats.invocation_failures
        );
    }
    if outcome.cancelled {
        eprintln!("Run was interrupted; the report is partial");
    }
}

/// Parse `USER=DIR` pairs.
fn parse_homes(pairs: &[String]) -> Result<BTreeMap<String, PathBuf>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((user, dir)) if !user.is_empty() && !dir.is_empty() => {
                Ok((user.to_string(), PathBuf::from(dir)))
            }
            _ => Err(eyre!("Invalid --home value {pair:?}, expected USER=DIR")),
        })
        .collect()
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Parse a duration string (e.g., "500ms", "30s", "2m", "1h").
fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num, multiplier) = if let Some(num) = s.strip_suffix("ms") {
        (num.parse::<f64>()?, 0.001)
    } else if let Some(num) = s.strip_suffix('s') {
        (num.parse::<f64>()?, 1.0)
    } else if let Some(num) = s.strip_suffix('m') {
        (num.parse::<f64>()?, 60.0)
    } else if let Some(num) = s.strip_suffix('h') {
        (num.parse::<f64>()?, 60.0 * 60.0)
    } else {
        (s.parse::<f64>()?, 1.0) // Default to seconds
    };

    if !num.is_finite() || num <= 0.0 {
        bail!("Duration must be positive: {s}");
    }

    Duration::try_from_secs_f64(num * multiplier).map_err(|_| eyre!("Duration out of range: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("5").unwrap(), Duration::from_secs(5));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("1e30h").is_err());
    }

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(250)), 250);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_parse_homes() {
        let homes = parse_homes(&["alice=/data/alice".to_string()]).unwrap();
        assert_eq!(homes.get("alice"), Some(&PathBuf::from("/data/alice")));

        assert!(parse_homes(&["alice".to_string()]).is_err());
        assert!(parse_homes(&["=/x".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "cipherhunt",
            "run",
            "events.jsonl",
            "--classifier",
            "tchunt",
            "--arg",
            "-q",
            "-j",
            "4",
            "--home",
            "bob=/srv/bob",
            "--format",
            "json",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.input, PathBuf::from("events.jsonl"));
        assert_eq!(args.classifier_args, vec!["-q".to_string()]);
        assert_eq!(args.workers, Some(4));
        assert!(matches!(args.format, OutputFormat::Json));
    }
}
