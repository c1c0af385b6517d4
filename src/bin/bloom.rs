//! Bloom CLI - Command-line interface for Synheart Bloom
//!
//! Commands:
//! - quality: Extract diary qualities from analysis text
//! - score: Score a day's activity bundle without a store
//! - ingest: Append activity records to a store file
//! - finalize: Compute, persist and report a user's day
//! - calendar: Print a user's month grid

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use synheart_bloom::calendar::weeks;
use synheart_bloom::pipeline::{score_day, DailyProcessor};
use synheart_bloom::quality::extract_diary_quality;
use synheart_bloom::scoring::PrecomputedAnalysis;
use synheart_bloom::store::InMemoryStore;
use synheart_bloom::types::{CalendarCell, DayActivity, ScoreBand, UserId, YearMonth};
use synheart_bloom::{ComputeError, BLOOM_VERSION};

/// Bloom - On-device daily wellbeing scoring engine
#[derive(Parser)]
#[command(name = "bloom")]
#[command(author = "Synheart AI Inc")]
#[command(version = BLOOM_VERSION)]
#[command(about = "Score daily wellbeing activities and lay them out by month", long_about = None)]
struct Cli {
    /// Default log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract diary qualities from analysis text
    Quality {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Score a day's activity bundle without touching a store
    Score {
        /// Activity bundle JSON (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Diary analysis text to use instead of calling an analyzer
        #[arg(long)]
        analysis: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Append activity records to a store
    Ingest {
        /// Store file (created if missing)
        #[arg(long)]
        store: PathBuf,

        /// User id
        #[arg(long)]
        user: String,

        /// Activity bundle JSON (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Override the word-chain session's target rounds
        #[arg(long)]
        target_rounds: Option<u32>,
    },

    /// Compute and persist a user's daily summary
    Finalize {
        /// Store file
        #[arg(long)]
        store: PathBuf,

        /// User id
        #[arg(long)]
        user: String,

        /// Summary date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,

        /// Diary analysis text to use instead of calling an analyzer
        #[arg(long)]
        analysis: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Print a user's month calendar
    Calendar {
        /// Store file
        #[arg(long)]
        store: PathBuf,

        /// Month (YYYY-MM), defaults to the current month
        #[arg(long)]
        month: Option<String>,

        /// User id
        #[arg(long)]
        user: String,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: CalendarFormat,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum CalendarFormat {
    /// Week rows for the terminal
    Text,
    /// JSON array of cells
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("synheart_bloom={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), BloomCliError> {
    match cli.command {
        Commands::Quality {
            input,
            output_format,
        } => cmd_quality(&input, &output_format),

        Commands::Score {
            input,
            analysis,
            output_format,
        } => cmd_score(&input, analysis.as_deref(), &output_format),

        Commands::Ingest {
            store,
            user,
            input,
            target_rounds,
        } => cmd_ingest(&store, &user, &input, target_rounds),

        Commands::Finalize {
            store,
            user,
            date,
            analysis,
            output_format,
        } => cmd_finalize(&store, &user, date.as_deref(), analysis.as_deref(), &output_format),

        Commands::Calendar {
            store,
            month,
            user,
            output_format,
        } => cmd_calendar(&store, &user, month.as_deref(), &output_format),
    }
}

fn cmd_quality(input: &Path, output_format: &OutputFormat) -> Result<(), BloomCliError> {
    let raw = read_input(input)?;
    let quality = extract_diary_quality(&raw);
    println!("{}", format_output(&quality, output_format)?);
    Ok(())
}

fn cmd_score(
    input: &Path,
    analysis: Option<&Path>,
    output_format: &OutputFormat,
) -> Result<(), BloomCliError> {
    let activity: DayActivity = serde_json::from_str(&read_input(input)?)?;
    let analyzer = load_analysis(analysis)?;

    let scores = score_day(&activity, &analyzer);
    println!("{}", format_output(&scores, output_format)?);
    Ok(())
}

fn cmd_ingest(
    store_path: &Path,
    user: &str,
    input: &Path,
    target_rounds: Option<u32>,
) -> Result<(), BloomCliError> {
    let user = UserId::new(user)?;
    let mut activity: DayActivity = serde_json::from_str(&read_input(input)?)?;

    if let Some(word) = activity.word.as_mut() {
        if let Some(rounds) = target_rounds {
            word.target_rounds = rounds;
        }
        word.validate()?;
    }

    let mut store = load_store(store_path)?;
    store.record_activity(&user, activity);
    save_store(store_path, &store)?;

    tracing::info!(user = %user, store = %store_path.display(), "recorded activity");
    Ok(())
}

fn cmd_finalize(
    store_path: &Path,
    user: &str,
    date: Option<&str>,
    analysis: Option<&Path>,
    output_format: &OutputFormat,
) -> Result<(), BloomCliError> {
    let user = UserId::new(user)?;
    let date = match date {
        Some(d) => parse_date(d)?,
        None => Local::now().date_naive(),
    };
    let analyzer = load_analysis(analysis)?;

    let mut store = load_store(store_path)?;
    let report = DailyProcessor::new(&analyzer).finalize_day(&mut store, &user, date);
    save_store(store_path, &store)?;

    println!("{}", format_output(&report, output_format)?);
    Ok(())
}

fn cmd_calendar(
    store_path: &Path,
    user: &str,
    month: Option<&str>,
    output_format: &CalendarFormat,
) -> Result<(), BloomCliError> {
    let user = UserId::new(user)?;
    let month = match month {
        Some(m) => m.parse::<YearMonth>()?,
        None => YearMonth::of(Local::now().date_naive()),
    };

    let store = load_store(store_path)?;
    let analyzer = PrecomputedAnalysis(None);
    let cells = DailyProcessor::new(&analyzer).month_view(&store, &user, month, None)?;

    match output_format {
        CalendarFormat::Text => print!("{}", render_calendar(month, &cells)),
        CalendarFormat::Json => println!("{}", serde_json::to_string(&cells)?),
        CalendarFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&cells)?),
    }
    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, BloomCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_analysis(path: Option<&Path>) -> Result<PrecomputedAnalysis, BloomCliError> {
    Ok(PrecomputedAnalysis(path.map(read_input).transpose()?))
}

fn load_store(path: &Path) -> Result<InMemoryStore, BloomCliError> {
    if !path.exists() {
        tracing::info!(store = %path.display(), "store file not found, starting empty");
        return Ok(InMemoryStore::new());
    }
    Ok(InMemoryStore::from_json(&fs::read_to_string(path)?)?)
}

fn save_store(path: &Path, store: &InMemoryStore) -> Result<(), BloomCliError> {
    fs::write(path, store.to_json()?)?;
    Ok(())
}

fn parse_date(date: &str) -> Result<NaiveDate, BloomCliError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| BloomCliError::InvalidDate(format!("{date}: {e}")))
}

fn format_output<T: Serialize>(value: &T, format: &OutputFormat) -> Result<String, BloomCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

/// Sunday-first week rows; scored days show their total and band marker
fn render_calendar(month: YearMonth, cells: &[CalendarCell]) -> String {
    let mut out = format!("{month}\n Su     Mo     Tu     We     Th     Fr     Sa\n");
    for week in weeks(cells) {
        let row: Vec<String> = week
            .iter()
            .map(|cell| match &cell.summary {
                Some(summary) => format!(
                    "{:>3}:{:<3}",
                    cell.label,
                    format!("{}{}", summary.total_score, band_marker(summary.total_score))
                ),
                None => format!("{:>3}    ", cell.label),
            })
            .collect();
        out.push_str(row.join("").trim_end());
        out.push('\n');
    }
    out
}

fn band_marker(score: u8) -> &'static str {
    match ScoreBand::for_score(score) {
        ScoreBand::Low => "-",
        ScoreBand::Fair => "",
        ScoreBand::Good => "+",
    }
}

// Error types

#[derive(Debug)]
enum BloomCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    InvalidDate(String),
}

impl From<io::Error> for BloomCliError {
    fn from(e: io::Error) -> Self {
        BloomCliError::Io(e)
    }
}

impl From<ComputeError> for BloomCliError {
    fn from(e: ComputeError) -> Self {
        BloomCliError::Compute(e)
    }
}

impl From<serde_json::Error> for BloomCliError {
    fn from(e: serde_json::Error) -> Self {
        BloomCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BloomCliError> for CliError {
    fn from(e: BloomCliError) -> Self {
        match e {
            BloomCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BloomCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidUserId(_) => ("INVALID_USER", "Pass a non-blank --user"),
                    ComputeError::InvalidMonth(_) => ("INVALID_MONTH", "Use YYYY-MM, e.g. 2024-05"),
                    ComputeError::InvalidTelemetry(_) => (
                        "INVALID_TELEMETRY",
                        "Word-chain telemetry needs valid_answer_ratio in [0, 1] and target_rounds >= 1",
                    ),
                    ComputeError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    _ => ("COMPUTE_ERROR", "Check input records"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            BloomCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax and field names".to_string()),
            },
            BloomCliError::InvalidDate(msg) => CliError {
                code: "INVALID_DATE".to_string(),
                message: msg,
                hint: Some("Use YYYY-MM-DD".to_string()),
            },
        }
    }
}
