//! Gluco CLI - Command-line interface for Gluco Flux
//!
//! Commands:
//! - analyze: Analyze glucose reading records
//! - split: Split a message into chat-sized chunks
//! - send: Dry-run paced dispatch, writing transport calls as NDJSON
//! - validate: Validate reading records
//! - config: Print the effective configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use gluco_flux::config::{AnalysisConfig, GlucoFluxConfig};
use gluco_flux::messaging::{markdown_to_html, ChunkingPolicy, Dispatcher, WriterTransport};
use gluco_flux::pipeline::GlucoseProcessor;
use gluco_flux::schema::{ReadingRecord, ReadingRecordAdapter, SCHEMA_VERSION};
use gluco_flux::types::AnalysisResult;
use gluco_flux::{GLUCO_FLUX_VERSION, PRODUCER_NAME};

/// Gluco - Glucose analysis and chat delivery engine
#[derive(Parser)]
#[command(name = "gluco")]
#[command(version = GLUCO_FLUX_VERSION)]
#[command(about = "Analyze glucose logs and prepare chat replies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze glucose reading records
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Days before the latest reading to include (0 = all)
        #[arg(long)]
        window_days: Option<u32>,

        /// Configuration file (JSON); defaults come from GLUCO_* variables otherwise
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Split a message into chat-sized chunks
    Split {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Maximum characters per chunk
        #[arg(long, default_value = "4096")]
        max_length: usize,

        /// Convert each chunk to chat HTML
        #[arg(long)]
        html: bool,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Dry-run a paced dispatch; transport calls are written to stdout as NDJSON
    Send {
        /// Target chat identifier
        #[arg(long)]
        chat_id: String,

        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the pause between chunks (milliseconds)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Treat each input line as a streamed fragment
        #[arg(long)]
        stream: bool,
    },

    /// Validate reading records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Configuration file (JSON) to load and check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ignore GLUCO_* environment variables
        #[arg(long)]
        defaults: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array when the input starts with `[`, NDJSON otherwise
    Auto,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON
    Ndjson,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable summary
    Text,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), GlucoCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            input_format,
            output_format,
            window_days,
            config,
        } => cmd_analyze(
            &input,
            &output,
            input_format,
            output_format,
            window_days,
            config.as_deref(),
        ),

        Commands::Split {
            input,
            max_length,
            html,
            output_format,
        } => cmd_split(&input, max_length, html, output_format),

        Commands::Send {
            chat_id,
            input,
            config,
            delay_ms,
            stream,
        } => cmd_send(&chat_id, &input, config.as_deref(), delay_ms, stream),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Config { config, defaults } => cmd_config(config.as_deref(), defaults),
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    window_days: Option<u32>,
    config: Option<&Path>,
) -> Result<(), GlucoCliError> {
    let input_data = read_input(input)?;
    let records = parse_records(&input_data, &input_format)?;

    if records.is_empty() {
        return Err(GlucoCliError::NoReadings);
    }

    let settings = load_config(config, false)?;
    let mut processor = GlucoseProcessor::with_config(settings.analysis)?;
    if let Some(days) = window_days {
        processor = processor.with_window(days);
    }

    let result = processor.process_records(&records)?;
    debug!(
        total_readings = result.total_readings,
        window_days = result.window_days,
        "analysis complete"
    );

    let output_data = match output_format {
        OutputFormat::Ndjson | OutputFormat::Json => serde_json::to_string(&result)? + "\n",
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&result)? + "\n",
        OutputFormat::Text => format_summary(&result),
    };

    write_output(output, &output_data)
}

fn cmd_split(
    input: &Path,
    max_length: usize,
    html: bool,
    output_format: OutputFormat,
) -> Result<(), GlucoCliError> {
    let message = read_input(input)?;
    let chunks: Vec<String> = ChunkingPolicy::new(max_length)
        .split(&message)
        .into_iter()
        .map(|chunk| if html { markdown_to_html(&chunk) } else { chunk })
        .collect();

    match output_format {
        OutputFormat::Ndjson => {
            for (index, text) in chunks.iter().enumerate() {
                let line = ChunkLine {
                    index,
                    total: chunks.len(),
                    chars: text.chars().count(),
                    text,
                };
                println!("{}", serde_json::to_string(&line)?);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&chunks)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&chunks)?),
        OutputFormat::Text => {
            for (index, text) in chunks.iter().enumerate() {
                println!("--- chunk {}/{} ---", index + 1, chunks.len());
                println!("{}", text);
            }
        }
    }

    Ok(())
}

fn cmd_send(
    chat_id: &str,
    input: &Path,
    config: Option<&Path>,
    delay_ms: Option<u64>,
    stream: bool,
) -> Result<(), GlucoCliError> {
    let mut dispatch = load_config(config, false)?.dispatch;
    if let Some(ms) = delay_ms {
        dispatch.inter_chunk_delay_ms = ms;
    }

    let transport = WriterTransport::new(io::stdout());
    let mut dispatcher = Dispatcher::new(transport, dispatch);

    let report = if stream {
        let reader: Box<dyn BufRead> = if is_std_stream(input) {
            warn_if_interactive();
            Box::new(io::stdin().lock())
        } else {
            Box::new(io::BufReader::new(fs::File::open(input)?))
        };

        let mut streaming = dispatcher.stream(chat_id);
        for line in reader.lines() {
            let line = line?;
            streaming.push(&format!("{}\n", line))?;
        }
        streaming.finish()?
    } else {
        let message = read_input(input)?;
        dispatcher.send(chat_id, &message)?
    };

    eprintln!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), GlucoCliError> {
    let input_data = read_input(input)?;
    let records = parse_records(&input_data, &input_format)?;

    let results = ReadingRecordAdapter::validate_records(&records);

    let report = ValidationReport {
        schema_version: SCHEMA_VERSION.to_string(),
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                record_id: r.record_id.clone(),
                error: r.result.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report ({})", report.schema_version);
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (index {}): {}",
                    err.record_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(GlucoCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_config(config: Option<&Path>, defaults: bool) -> Result<(), GlucoCliError> {
    let settings = load_config(config, defaults)?;
    let report = ConfigReport {
        producer: PRODUCER_NAME.to_string(),
        version: GLUCO_FLUX_VERSION.to_string(),
        config: settings,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// Helper functions

/// `-` stands for stdin or stdout
fn is_std_stream(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn warn_if_interactive() {
    if atty::is(atty::Stream::Stdin) {
        warn!("reading from an interactive terminal; end input with Ctrl-D");
    }
}

fn read_input(input: &Path) -> Result<String, GlucoCliError> {
    if is_std_stream(input) {
        warn_if_interactive();
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), GlucoCliError> {
    if is_std_stream(output) {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn parse_records(data: &str, format: &InputFormat) -> Result<Vec<ReadingRecord>, GlucoCliError> {
    let records = match format {
        InputFormat::Auto => ReadingRecordAdapter::parse(data)?,
        InputFormat::Ndjson => ReadingRecordAdapter::parse_ndjson(data)?,
        InputFormat::Json => ReadingRecordAdapter::parse_array(data)?,
    };
    Ok(records)
}

/// Configuration file when given, otherwise defaults with optional GLUCO_* overrides
fn load_config(path: Option<&Path>, ignore_env: bool) -> Result<GlucoFluxConfig, GlucoCliError> {
    match path {
        Some(path) => Ok(GlucoFluxConfig::from_json(&fs::read_to_string(path)?)?),
        None if ignore_env => Ok(GlucoFluxConfig::default()),
        None => Ok(GlucoFluxConfig {
            analysis: AnalysisConfig::from_env().map_err(gluco_flux::ComputeError::from)?,
            ..GlucoFluxConfig::default()
        }),
    }
}

fn format_summary(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let mut line = |s: String| {
        out.push_str(&s);
        out.push('\n');
    };

    line("Glucose Summary".to_string());
    line("===============".to_string());

    if !result.has_data {
        line(format!("No readings in the last {} days", result.window_days));
        return out;
    }

    line(format!(
        "Readings: {} over {} days",
        result.total_readings, result.days_analyzed
    ));
    if let Some(range) = &result.date_range {
        line(format!("Period:   {} to {}", range.start, range.end));
    }
    if let Some(avg) = result.averages.overall {
        line(format!("Average:  {:.1} mg/dL", avg));
    }
    if let Some(tir) = &result.time_in_range {
        line(format!(
            "In range: {:.1}% (above {:.1}%, below {:.1}%)",
            tir.percentage, tir.above_percentage, tir.below_percentage
        ));
    }
    if let Some(var) = &result.variability {
        line(format!(
            "CV:       {:.1}% ({})",
            var.coefficient_of_variation,
            var.classification.as_str()
        ));
    }
    if let Some(trend) = &result.trend {
        line(format!(
            "Trend:    {} ({:+.2} mg/dL per day)",
            trend.direction.as_str(),
            trend.slope_per_day
        ));
    }

    if !result.insights.is_empty() {
        line(String::new());
        line("Insights:".to_string());
        for insight in &result.insights {
            line(format!("  - {}", insight));
        }
    }
    if !result.concerns.is_empty() {
        line(String::new());
        line("Concerns:".to_string());
        for concern in &result.concerns {
            line(format!("  - {}", concern));
        }
    }
    if let Some(goals) = &result.glucose_goals {
        line(String::new());
        line(format!("Target: {} ({})", goals.target, goals.reasoning));
    }

    out
}

// Error types

#[derive(Debug)]
enum GlucoCliError {
    Io(io::Error),
    Compute(gluco_flux::ComputeError),
    Json(serde_json::Error),
    Dispatch(gluco_flux::DispatchError),
    NoReadings,
    ValidationFailed(usize),
}

impl From<io::Error> for GlucoCliError {
    fn from(e: io::Error) -> Self {
        GlucoCliError::Io(e)
    }
}

impl From<gluco_flux::ComputeError> for GlucoCliError {
    fn from(e: gluco_flux::ComputeError) -> Self {
        GlucoCliError::Compute(e)
    }
}

impl From<serde_json::Error> for GlucoCliError {
    fn from(e: serde_json::Error) -> Self {
        GlucoCliError::Json(e)
    }
}

impl From<gluco_flux::DispatchError> for GlucoCliError {
    fn from(e: gluco_flux::DispatchError) -> Self {
        GlucoCliError::Dispatch(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GlucoCliError> for CliError {
    fn from(e: GlucoCliError) -> Self {
        match e {
            GlucoCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            GlucoCliError::Compute(gluco_flux::ComputeError::Config(e)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'gluco config' to inspect the effective settings".to_string()),
            },
            GlucoCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            GlucoCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            GlucoCliError::Dispatch(e) => CliError {
                code: "DISPATCH_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            GlucoCliError::NoReadings => CliError {
                code: "NO_READINGS".to_string(),
                message: "No readings found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            GlucoCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ChunkLine<'a> {
    index: usize,
    total: usize,
    chars: usize,
    text: &'a str,
}

#[derive(serde::Serialize)]
struct ValidationReport {
    schema_version: String,
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    record_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct ConfigReport {
    producer: String,
    version: String,
    config: GlucoFluxConfig,
}
