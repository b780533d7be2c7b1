//! CLI entry point for the transport workload analyzer.
//!
//! Loads one transport log, then answers a single query about it as a JSON
//! envelope on stdout.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Value, json, to_value};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transport_workload::analyzers::registry::AnalysisParams;
use transport_workload::config::EngineConfig;
use transport_workload::engine::Engine;
use transport_workload::error::EngineError;
use transport_workload::output::{Envelope, append_workload, print_json};

#[derive(Parser)]
#[command(name = "transport_workload")]
#[command(about = "Workload fairness analytics for transport logs", long_about = None)]
struct Cli {
    /// Transport log to load (CSV)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// JSON engine config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Drop transports longer than this many minutes
    #[arg(long, global = true)]
    max_duration: Option<f64>,

    /// Column holding the transporter id
    #[arg(long, global = true)]
    transporter_column: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Row/column counts, column types and the duration filter outcome
    Summary,
    /// Column names of the loaded table
    Columns,
    /// First rows of the table
    Sample {
        #[arg(short = 'n', long)]
        size: Option<usize>,
    },
    /// Distinct values of one column
    Unique {
        #[arg(value_name = "COLUMN")]
        column: String,
    },
    /// Rows whose cells equal every COL=VALUE pair
    Filter {
        #[arg(
            short = 'w',
            long = "where",
            value_name = "COL=VALUE",
            value_parser = parse_key_val,
            required = true
        )]
        conditions: Vec<(String, String)>,
    },
    /// Per-bucket and per-hour workload statistics
    Workload {
        /// Also append the per-bucket rows to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Buckets with the most uneven workload split
    Highest {
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Buckets with the most even workload split
    Lowest {
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Buckets around the median workload split
    Median {
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Lifetime totals per transporter
    Transporters,
    /// Names of the registered analyses
    Analyses,
    /// Run one registered analysis
    Run {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Run every registered analysis with default parameters
    RunAll,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/transport_workload.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transport_workload.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive(LevelFilter::DEBUG.into()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let printed = match run(cli) {
        Ok(data) => print_json(&Envelope::ok(data)).map(|_| ExitCode::SUCCESS),
        Err(e) => {
            let status = e
                .downcast_ref::<EngineError>()
                .map_or(500, EngineError::status_code);
            error!(error = %e, status, "Command failed");
            print_json(&Envelope::failure(e.to_string(), status)).map(|_| ExitCode::FAILURE)
        }
    };

    printed.unwrap_or_else(|e| {
        error!(error = %e, "Failed to write response");
        ExitCode::FAILURE
    })
}

fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut config = config.with_env()?;
    if let Some(minutes) = cli.max_duration {
        config.max_duration_minutes = minutes;
    }
    if let Some(column) = &cli.transporter_column {
        config.transporter_column = column.clone();
    }
    Ok(config)
}

#[tracing::instrument(skip_all)]
fn run(cli: Cli) -> Result<Value> {
    let mut engine = Engine::new(engine_config(&cli)?);
    if let Some(path) = &cli.file {
        engine.load(path)?;
    }

    let data = match cli.command {
        Commands::Summary => to_value(engine.data_summary()?)?,
        Commands::Columns => to_value(engine.columns()?)?,
        Commands::Sample { size } => {
            let size = size.unwrap_or(engine.config().sample_size);
            to_value(engine.sample(size)?)?
        }
        Commands::Unique { column } => json!({
            "column": column,
            "values": engine.unique_values(&column)?,
        }),
        Commands::Filter { conditions } => {
            let filters: BTreeMap<String, String> = conditions.into_iter().collect();
            to_value(engine.filter_data(&filters)?)?
        }
        Commands::Workload { csv } => {
            let report = engine.analyze_workload()?;
            if let Some(path) = csv {
                append_workload(&path, &report.workload_stats)?;
            }
            to_value(report)?
        }
        Commands::Highest { limit } => to_value(engine.highest_inequality(limit)?)?,
        Commands::Lowest { limit } => to_value(engine.lowest_inequality(limit)?)?,
        Commands::Median { limit } => to_value(engine.median_inequality(limit)?)?,
        Commands::Transporters => to_value(engine.transporter_summary()?)?,
        Commands::Analyses => to_value(Engine::available_analyses())?,
        Commands::Run { name, params } => {
            let params: AnalysisParams = params.into_iter().collect();
            info!(analysis = %name, ?params, "Running analysis");
            to_value(engine.run_analysis(&name, &params)?)?
        }
        Commands::RunAll => to_value(engine.run_all_analyses()?)?,
    };

    Ok(data)
}
