//! vcap - virtual-CPU capability snapshots
//!
//! Thin operator surface over the capability engine:
//! - `snapshot`: refresh once and print the capability snapshot
//! - `models`: list every candidate model the hypervisor reports
//! - `check`: validate the resolved configuration

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, info_span};
use tracing_subscriber::filter::LevelFilter;
use vcap_common::{format_error_human, OutputFormat, StructuredError, SCHEMA_VERSION};
use vcap_config::{resolve_config, ConfigSource, Settings, ValidationError};
use vcap_core::exit_codes::ExitCode;
use vcap_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat};
use vcap_core::refresh::{load_capabilities, ModelFailure};
use vcap_core::{refresh, CapabilityAggregator, CapabilitySnapshot, DirectorySource, Usability};

/// vcap - which CPU models and features this node's hypervisor can expose
#[derive(Parser)]
#[command(name = "vcap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to vcap.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the documents directory from the configuration
    #[arg(long, global = true, env = "VCAP_DOCUMENTS_DIR")]
    dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Log output format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh once and print the capability snapshot
    Snapshot,
    /// List every model in the capability document with its usability
    Models(ModelsArgs),
    /// Validate the resolved configuration
    Check,
}

#[derive(Args, Debug)]
struct ModelsArgs {
    /// Only list models flagged usable
    #[arg(long)]
    usable: bool,
}

/// JSON payload of `vcap snapshot`.
#[derive(Serialize)]
struct SnapshotEnvelope<'a> {
    schema_version: &'static str,
    generated_at: String,
    run_id: &'a str,
    fingerprint: String,
    candidates: &'a [String],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    failures: &'a [ModelFailure],
    snapshot: &'a CapabilitySnapshot,
}

#[derive(Serialize)]
struct ModelRow<'a> {
    mode: &'a str,
    vendor: &'a str,
    model: &'a str,
    usable: Usability,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    config_path: Option<String>,
    config_source: String,
    settings: &'a Settings,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let level = if cli.global.quiet {
        Some(LevelFilter::ERROR)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LevelFilter::DEBUG),
            _ => Some(LevelFilter::TRACE),
        }
    };
    let format = match cli.global.log_format.as_deref().map(str::parse::<LogFormat>) {
        Some(Ok(format)) => Some(format),
        Some(Err(message)) => {
            eprintln!("{}", message);
            return ExitCode::ArgsError.into();
        }
        None => None,
    };
    init_logging(&LogConfig::from_env(level, format));

    let run_id = generate_run_id();
    let span = info_span!("vcap", run_id = %run_id);
    let _enter = span.enter();

    let result = match cli.command {
        Commands::Snapshot => run_snapshot(&cli.global, &run_id),
        Commands::Models(ref args) => run_models(&cli.global, args),
        Commands::Check => run_check(&cli.global),
    };

    match result {
        Ok(code) => code.into(),
        Err(err) => {
            report_error(&cli.global, &err);
            ExitCode::from_error(&err).into()
        }
    }
}

fn report_error(global: &GlobalOpts, err: &vcap_common::Error) {
    let use_color = !global.no_color && std::io::stderr().is_terminal();
    eprintln!("{}", format_error_human(err, use_color));
    if global.format.is_machine() {
        println!("{}", StructuredError::from(err).to_json());
    }
}

fn settings_error(err: ValidationError) -> vcap_common::Error {
    match err {
        ValidationError::IoError(message) => vcap_common::Error::Config(message),
        other => vcap_common::Error::InvalidSettings(other.to_string()),
    }
}

/// Resolve and load settings, applying the `--dir` override.
fn load_settings(
    global: &GlobalOpts,
) -> vcap_common::Result<(Settings, ConfigSource, Option<PathBuf>)> {
    if let Some(path) = global.config.as_deref() {
        if !path.exists() {
            return Err(vcap_common::Error::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
    }

    let resolved = resolve_config(global.config.as_deref());
    let mut settings = Settings::load(&resolved).map_err(settings_error)?;
    if let Some(dir) = &global.dir {
        settings.documents_dir = dir.clone();
    }
    debug!(source = %resolved.source, dir = %settings.documents_dir.display(), "settings loaded");
    Ok((settings, resolved.source, resolved.path))
}

fn print_json<T: Serialize>(format: OutputFormat, value: &T) -> vcap_common::Result<()> {
    let text = match format {
        OutputFormat::Compact => serde_json::to_string(value)?,
        _ => serde_json::to_string_pretty(value)?,
    };
    println!("{}", text);
    Ok(())
}

fn run_snapshot(global: &GlobalOpts, run_id: &str) -> vcap_common::Result<ExitCode> {
    let (settings, _, _) = load_settings(global)?;
    let source = DirectorySource::from_settings(&settings);
    let aggregator = CapabilityAggregator::new((&settings).into());

    let report = refresh(&source, &aggregator)?;

    match global.format {
        OutputFormat::Json | OutputFormat::Compact => {
            let envelope = SnapshotEnvelope {
                schema_version: SCHEMA_VERSION,
                generated_at: chrono::Utc::now().to_rfc3339(),
                run_id,
                fingerprint: report.snapshot.fingerprint(),
                candidates: &report.candidates,
                failures: &report.failures,
                snapshot: &report.snapshot,
            };
            print_json(global.format, &envelope)?;
        }
        OutputFormat::Summary => println!("{}", report.snapshot.summary()),
        OutputFormat::Exitcode => {}
    }

    Ok(ExitCode::from_report(&report))
}

fn run_models(global: &GlobalOpts, args: &ModelsArgs) -> vcap_common::Result<ExitCode> {
    let (settings, _, _) = load_settings(global)?;
    let source = DirectorySource::from_settings(&settings);
    let capabilities = load_capabilities(&source)?;

    let rows: Vec<ModelRow<'_>> = capabilities
        .models()
        .filter(|(_, model)| !args.usable || model.usable == Usability::Yes)
        .map(|(mode, model)| ModelRow {
            mode: &mode.name,
            vendor: &mode.vendor,
            model: &model.name,
            usable: model.usable,
        })
        .collect();

    match global.format {
        OutputFormat::Json | OutputFormat::Compact => print_json(global.format, &rows)?,
        OutputFormat::Summary => {
            for row in &rows {
                println!("{:<20} {:<32} {}", row.mode, row.model, row.usable);
            }
        }
        OutputFormat::Exitcode => {}
    }

    Ok(if !capabilities.usable_models().is_empty() {
        ExitCode::Clean
    } else {
        ExitCode::NoUsableModels
    })
}

fn run_check(global: &GlobalOpts) -> vcap_common::Result<ExitCode> {
    let (settings, source, path) = load_settings(global)?;

    match global.format {
        OutputFormat::Json | OutputFormat::Compact => {
            let report = CheckReport {
                config_path: path.map(|p| p.display().to_string()),
                config_source: source.to_string(),
                settings: &settings,
            };
            print_json(global.format, &report)?;
        }
        OutputFormat::Summary => {
            let origin = path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("Config OK ({}: {})", source, origin);
        }
        OutputFormat::Exitcode => {}
    }

    Ok(ExitCode::Clean)
}
