//! Therapy Flux CLI
//!
//! Commands:
//! - serve: Run the metrics service
//! - replay: Drive an exercise session from recorded frames (NDJSON)
//! - summary: Fetch records from a metrics service and summarize progress
//! - config: Print the effective exercise configuration

use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use therapy_flux::client::MetricsClient;
use therapy_flux::clock::ManualClock;
use therapy_flux::gesture::CelebrationEffect;
use therapy_flux::media::{DeviceSlot, MediaKind, MediaSource, MediaStream};
use therapy_flux::metrics::MemorySink;
use therapy_flux::server::{self, ServerConfig};
use therapy_flux::types::{LandmarkFrame, SpectralFrame, TherapyMetricRecord};
use therapy_flux::vocalization::{BalloonView, TrackerUpdate};
use therapy_flux::{
    OralMotorSession, ProgressSummary, SessionDeps, TherapyConfig, TherapyError,
    VocalizationSession, DEFAULT_CHILD_ID, FLUX_VERSION, PRODUCER_NAME,
};

/// Therapy Flux - signal interpretation for gamified therapy exercises
#[derive(Parser)]
#[command(name = "therapy-flux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Run therapy exercise sessions and the metrics service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the metrics service (HOST, PORT, CORS_ORIGINS, METRICS_SNAPSHOT)
    Serve {
        /// Override the bind address
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Replay recorded frames through an exercise session
    Replay {
        /// Exercise to run
        #[arg(short, long, value_enum)]
        exercise: Exercise,

        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Exercise configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Child the metric record is attributed to
        #[arg(long, default_value = DEFAULT_CHILD_ID)]
        child_id: String,

        /// Seed for treat selection
        #[arg(long)]
        seed: Option<u64>,

        /// Post the resulting metric to this metrics service
        #[arg(long)]
        submit: Option<String>,
    },

    /// Summarize progress from a metrics service
    Summary {
        /// Metrics service base URL
        #[arg(long, default_value = "http://localhost:3001")]
        server: String,

        /// Restrict to one child
        #[arg(long)]
        child_id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective exercise configuration
    Config {
        /// Configuration file to load and validate (JSON)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Exercise {
    /// Mouth-opening treat collection (landmark frames)
    OralMotor,
    /// Sustained-voice balloon ascent (spectral frames)
    Balloon,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

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

fn init_tracing() {
    // Logs go to stderr so replay output on stdout stays line-delimited JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "therapy_flux=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), FluxCliError> {
    match cli.command {
        Commands::Serve { host, port } => cmd_serve(host, port),

        Commands::Replay {
            exercise,
            input,
            config,
            child_id,
            seed,
            submit,
        } => {
            let config = load_config(config.as_deref())?;
            let input_data = read_input(&input)?;
            let record = match exercise {
                Exercise::OralMotor => replay_oral_motor(&input_data, &config, &child_id, seed)?,
                Exercise::Balloon => replay_balloon(&input_data, &config, &child_id)?,
            };

            if let Some(url) = submit {
                let runtime = tokio::runtime::Runtime::new()?;
                let stored = runtime.block_on(MetricsClient::new(url).submit(&record))?;
                tracing::info!(id = %stored.id, "metric submitted");
            }
            Ok(())
        }

        Commands::Summary {
            server,
            child_id,
            json,
        } => cmd_summary(&server, child_id.as_deref(), json),

        Commands::Config { file } => {
            let config = load_config(file.as_deref())?;
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}

fn cmd_serve(host: Option<String>, port: Option<u16>) -> Result<(), FluxCliError> {
    let mut config = ServerConfig::from_env()?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    tracing::info!(host = %config.host, port = config.port, "loaded server configuration");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(config))?;
    Ok(())
}

fn cmd_summary(server: &str, child_id: Option<&str>, json: bool) -> Result<(), FluxCliError> {
    let runtime = tokio::runtime::Runtime::new()?;
    let records = runtime.block_on(MetricsClient::new(server).fetch_recent(child_id))?;
    let summary = ProgressSummary::from_records(&records);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "producer": PRODUCER_NAME,
                "version": FLUX_VERSION,
                "child_id": child_id,
                "summary": summary,
            }))?
        );
    } else {
        println!("{summary}");
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<TherapyConfig, FluxCliError> {
    match path {
        Some(path) => Ok(TherapyConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(TherapyConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, FluxCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

// Replay

/// One recorded landmark frame
#[derive(Deserialize)]
struct LandmarkLine {
    timestamp_ms: u64,
    #[serde(flatten)]
    frame: LandmarkFrame,
}

/// One recorded spectral frame
#[derive(Deserialize)]
struct SpectralLine {
    timestamp_ms: u64,
    #[serde(flatten)]
    frame: SpectralFrame,
}

/// Line written to stdout during replay
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplayOutput<'a> {
    Gesture { at_ms: u64, ratio: f64, treats: u32 },
    Effect { at_ms: u64, effect: CelebrationEffect },
    Balloon { at_ms: u64, view: BalloonView },
    GoalReached { at_ms: u64 },
    SilenceTimeout { at_ms: u64, silent_ms: u64 },
    Metric { record: &'a TherapyMetricRecord },
}

/// Recorded frames are already captured; opening always succeeds
struct ReplaySource;

struct ReplayStream;

impl MediaStream for ReplayStream {
    fn close(&mut self) {}
}

impl MediaSource for ReplaySource {
    fn open(&self, _kind: MediaKind) -> Result<Box<dyn MediaStream>, TherapyError> {
        Ok(Box::new(ReplayStream))
    }
}

fn parse_lines<T: for<'de> Deserialize<'de>>(input: &str) -> Result<Vec<T>, FluxCliError> {
    let lines = input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line.trim()).map_err(|e| {
                FluxCliError::ParseError(format!("Failed to parse frame on line {}: {}", index + 1, e))
            })
        })
        .collect::<Result<Vec<T>, _>>()?;

    if lines.is_empty() {
        return Err(FluxCliError::NoFrames);
    }
    Ok(lines)
}

fn replay_deps(kind: MediaKind, clock: &ManualClock, sink: &MemorySink) -> SessionDeps {
    SessionDeps {
        source: Arc::new(ReplaySource),
        slot: DeviceSlot::new(kind),
        sink: Arc::new(sink.clone()),
        clock: Arc::new(clock.clone()),
    }
}

fn emit(out: &mut impl Write, line: &ReplayOutput<'_>) -> Result<(), FluxCliError> {
    writeln!(out, "{}", serde_json::to_string(line)?)?;
    Ok(())
}

fn replay_oral_motor(
    input: &str,
    config: &TherapyConfig,
    child_id: &str,
    seed: Option<u64>,
) -> Result<TherapyMetricRecord, FluxCliError> {
    let frames: Vec<LandmarkLine> = parse_lines(input)?;
    let clock = ManualClock::new(frames[0].timestamp_ms);
    let sink = MemorySink::new();
    let deps = replay_deps(MediaKind::Camera, &clock, &sink);

    let mut session = match seed {
        Some(seed) => OralMotorSession::new(config, child_id, deps, StdRng::seed_from_u64(seed)),
        None => OralMotorSession::with_entropy(config, child_id, deps),
    };
    session.start()?;

    let mut stdout = io::stdout().lock();
    for line in &frames {
        clock.set(line.timestamp_ms);
        let outcome = session.process_frame(&line.frame);

        if let Some(event) = outcome.event {
            emit(
                &mut stdout,
                &ReplayOutput::Gesture {
                    at_ms: event.at_ms,
                    ratio: event.ratio,
                    treats: event.treats_collected,
                },
            )?;
        }
        for effect in outcome.effects {
            emit(
                &mut stdout,
                &ReplayOutput::Effect {
                    at_ms: line.timestamp_ms,
                    effect,
                },
            )?;
        }
    }

    let record = session.stop().ok_or(FluxCliError::NoMetric)?;
    emit(&mut stdout, &ReplayOutput::Metric { record: &record })?;
    stdout.flush()?;
    Ok(record)
}

fn replay_balloon(
    input: &str,
    config: &TherapyConfig,
    child_id: &str,
) -> Result<TherapyMetricRecord, FluxCliError> {
    let frames: Vec<SpectralLine> = parse_lines(input)?;
    let expected_bins = config.vocalization.bin_count();
    if let Some(line) = frames.iter().find(|l| l.frame.magnitudes.len() != expected_bins) {
        tracing::warn!(
            expected = expected_bins,
            found = line.frame.magnitudes.len(),
            at_ms = line.timestamp_ms,
            "frame bin count differs from configured fft size"
        );
    }
    let clock = ManualClock::new(frames[0].timestamp_ms);
    let sink = MemorySink::new();
    let deps = replay_deps(MediaKind::Microphone, &clock, &sink);

    let mut session = VocalizationSession::new(config, child_id, deps);
    session.start()?;

    let mut stdout = io::stdout().lock();
    let mut finished = None;
    for line in &frames {
        clock.set(line.timestamp_ms);
        let outcome = session.process_frame(&line.frame);
        let at_ms = line.timestamp_ms;

        match outcome.update {
            Some(TrackerUpdate::Voiced(_)) => {
                emit(
                    &mut stdout,
                    &ReplayOutput::Balloon {
                        at_ms,
                        view: session.game().view(),
                    },
                )?;
            }
            Some(TrackerUpdate::SilenceTimeout { silent_ms }) => {
                emit(&mut stdout, &ReplayOutput::SilenceTimeout { at_ms, silent_ms })?;
            }
            Some(TrackerUpdate::Silent { .. }) | None => {}
        }
        if outcome.goal_reached {
            emit(&mut stdout, &ReplayOutput::GoalReached { at_ms })?;
        }
        if outcome.finished.is_some() {
            finished = outcome.finished;
            break;
        }
    }

    let record = match finished {
        Some(record) => record,
        None => session.stop().ok_or(FluxCliError::NoMetric)?,
    };
    emit(&mut stdout, &ReplayOutput::Metric { record: &record })?;
    stdout.flush()?;
    Ok(record)
}

// Error types

#[derive(Debug)]
enum FluxCliError {
    Io(io::Error),
    Therapy(TherapyError),
    Json(serde_json::Error),
    NoFrames,
    NoMetric,
    ParseError(String),
}

impl From<io::Error> for FluxCliError {
    fn from(e: io::Error) -> Self {
        FluxCliError::Io(e)
    }
}

impl From<TherapyError> for FluxCliError {
    fn from(e: TherapyError) -> Self {
        FluxCliError::Therapy(e)
    }
}

impl From<serde_json::Error> for FluxCliError {
    fn from(e: serde_json::Error) -> Self {
        FluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FluxCliError> for CliError {
    fn from(e: FluxCliError) -> Self {
        match e {
            FluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FluxCliError::Therapy(e) => {
                let hint = match &e {
                    TherapyError::InvalidConfig(_) | TherapyError::JsonError(_) => {
                        "Run 'therapy-flux config' to see a valid configuration"
                    }
                    TherapyError::Persistence(_) => "Check that the metrics service is running",
                    TherapyError::Io(_) => "Check the bind address and snapshot path",
                    _ => "Check input and retry",
                };
                CliError {
                    code: "THERAPY_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FluxCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            FluxCliError::NoMetric => CliError {
                code: "NO_METRIC".to_string(),
                message: "Session ended without a metric record".to_string(),
                hint: None,
            },
            FluxCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some(
                    "Each line needs timestamp_ms plus points (oral-motor) or magnitudes and sample_rate_hz (balloon)"
                        .to_string(),
                ),
            },
        }
    }
}
