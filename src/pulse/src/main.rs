//! Pulse — marketing analytics aggregation over exported GA4 and Search
//! Console reports.
//!
//! Reads report JSON, runs the cohort, funnel or keyword analysis and writes
//! the dashboard payload to stdout. Logs go to stderr.

mod input;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use pulse_core::config::PulseConfig;
use pulse_core::RawRow;
use pulse_reporting::{
    build_cohort_report, build_funnel_report, build_keyword_report, JourneyRecord, KeywordCategorizer,
    KeywordMetric, NormalizeRow, RecordNormalizer, SessionRecord,
};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(about = "Cohort, funnel and keyword analysis over GA4 and Search Console reports")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables with prefix PULSE__ override it)
    #[arg(long, env = "PULSE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Weekly cohorts with retention and LTV estimates from a sessions report
    Cohorts {
        #[arg(long)]
        input: PathBuf,
        /// Maximum cohorts to show (overrides config)
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Funnel steps and top converting journeys from a page-journey report
    Funnel {
        #[arg(long)]
        input: PathBuf,
        /// Number of top journeys to show (overrides config)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Keyword ranking changes between two Search Console periods
    Keywords {
        #[arg(long)]
        current: PathBuf,
        #[arg(long)]
        previous: Option<PathBuf>,
        /// Size of the opportunity/rising/falling lists (overrides config)
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = PulseConfig::load(cli.config.as_deref())?;
    let normalizer = RecordNormalizer::new(&config.funnel);

    match cli.command {
        Command::Cohorts {
            input,
            limit,
            format,
        } => {
            if let Some(limit) = limit {
                config.cohort.max_cohorts = limit;
            }
            let records: Vec<SessionRecord> = normalize_file(&normalizer, &input).await?;
            let report = build_cohort_report(&records, &config.cohort);
            match format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Csv => print!("{}", report.to_csv()),
            }
        }
        Command::Funnel { input, limit } => {
            if let Some(limit) = limit {
                config.funnel.top_journeys = limit;
            }
            let journeys: Vec<JourneyRecord> = normalize_file(&normalizer, &input).await?;
            print_json(&build_funnel_report(&journeys, &config.funnel))?;
        }
        Command::Keywords {
            current,
            previous,
            limit,
        } => {
            if let Some(limit) = limit {
                config.keywords.list_limit = limit;
            }
            let (current_rows, previous_rows) =
                input::load_period_pair(&current, previous.as_deref()).await?;
            let categorizer = KeywordCategorizer::from_config(&config.keywords.categories);
            let mut current: Vec<KeywordMetric> = normalize_rows(&normalizer, &current_rows, &current);
            let mut previous: Vec<KeywordMetric> = match previous.as_deref() {
                Some(path) => normalize_rows(&normalizer, &previous_rows, path),
                None => Vec::new(),
            };
            categorizer.assign(&mut current);
            categorizer.assign(&mut previous);
            print_json(&build_keyword_report(&current, &previous, &config.keywords))?;
        }
    }
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pulse=info,pulse_reporting=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn normalize_file<T: NormalizeRow>(
    normalizer: &RecordNormalizer,
    path: &Path,
) -> anyhow::Result<Vec<T>> {
    let rows = input::load_rows(path).await?;
    Ok(normalize_rows(normalizer, &rows, path))
}

/// Malformed rows are dropped so one bad row does not blank the report.
fn normalize_rows<T: NormalizeRow>(normalizer: &RecordNormalizer, rows: &[RawRow], path: &Path) -> Vec<T> {
    let (records, rejected) = normalizer.normalize_lenient::<T>(rows);
    if rejected > 0 {
        warn!(path = %path.display(), rejected, kept = records.len(), "Dropped malformed rows");
    } else {
        info!(path = %path.display(), rows = records.len(), "Report normalized");
    }
    records
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
