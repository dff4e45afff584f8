use anyhow::{Context, Result};
use clap::Parser;
use platecam::ocr::{OcrEngine, PassthroughOcr, TesseractOcr};
use platecam::source::SourceSpec;
use platecam::{Mode, PlatecamConfig, PlatecamOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// Log file used when the dashboard owns the terminal and no file was given
const DEFAULT_LOG_FILE: &str = "platecam.log";

#[derive(Parser, Debug)]
#[command(name = "platecam")]
#[command(about = "Parking lane camera that logs vehicle entries and exits by license plate")]
#[command(version)]
#[command(long_about = "Reads license plates from a camera, a directory of still images or a \
recorded OCR transcript, and reconciles each sighting against durable entry, exit and fishy \
logs. The operator switches the lane between ENTRY and EXIT mode from the keyboard.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "platecam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH", help = "Write logs to a file (default platecam.log while the dashboard is shown)")]
    log_file: Option<PathBuf>,

    /// Lane mode to start in
    #[arg(short, long, value_name = "MODE", help = "Starting mode: entry or exit (overrides parking.initial_mode)")]
    mode: Option<Mode>,

    /// Where frames come from
    #[arg(
        short,
        long,
        default_value = "camera",
        value_name = "SOURCE",
        help = "Frame source: camera, images:<dir> or transcript:<file>"
    )]
    source: SourceSpec,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the system")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - prepare the logs but don't read frames
    #[arg(long, help = "Perform dry run - create the plate logs and report occupancy, then exit")]
    dry_run: bool,

    #[arg(long, help = "Do not read mode switches from the keyboard")]
    no_keyboard: bool,

    #[arg(long, help = "Do not draw the terminal dashboard")]
    no_display: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let mut config = PlatecamConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;
    if let Some(mode) = args.mode {
        config.parking.initial_mode = mode;
    }
    if args.no_display {
        config.display.enabled = false;
    }
    if args.no_keyboard {
        config.keyboard.enabled = false;
    }

    let dashboard = config.display.enabled && !args.validate_config && !args.dry_run;
    let _log_guard = init_logging(&args, dashboard)?;

    info!("Starting platecam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    // Validate configuration if requested
    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().context("Invalid configuration")?;

    let source = args
        .source
        .build(&config.camera)
        .with_context(|| format!("Failed to set up frame source {}", args.source))?;

    // Transcripts are already recognized text
    let ocr: Arc<dyn OcrEngine> = if args.source.is_pre_recognized() {
        Arc::new(PassthroughOcr)
    } else {
        Arc::new(TesseractOcr::new(&config.ocr))
    };

    let mut orchestrator = PlatecamOrchestrator::builder(config)
        .with_source(source)
        .with_ocr(ocr)
        .build()
        .context("Failed to create orchestrator")?;

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize system: {}", e);
        e
    })?;

    if args.dry_run {
        let occupancy = orchestrator.occupancy();
        info!("Dry run mode - plate logs ready, no frames read");
        println!(
            "✓ Dry run completed successfully - {} occupied, {} vacant",
            occupancy.occupied, occupancy.vacant
        );
        return Ok(());
    }

    // Run the main loop with signal handling
    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    info!("Platecam exited with code: {}", exit_code);
    drop(_log_guard);

    // Exit with appropriate code for systemd
    std::process::exit(exit_code);
}

fn init_logging(args: &Args, dashboard: bool) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    // Create environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("platecam={}", log_level)));

    // The dashboard owns the terminal, so logs go to a file while it is shown
    let log_file = args
        .log_file
        .clone()
        .or_else(|| dashboard.then(|| PathBuf::from(DEFAULT_LOG_FILE)));

    let (writer, guard, ansi) = match log_file {
        Some(path) => {
            let directory = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path {} has no file name", path.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), None, true),
    };

    // Configure format based on options
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    let default_config = toml::to_string_pretty(&PlatecamConfig::default())
        .context("Failed to serialize default configuration")?;

    println!("# Platecam Configuration File");
    println!("# This is the default configuration with all available options.");
    println!("# Any key can also be set through the environment, e.g.");
    println!("# PLATECAM_DISPLAY_ENABLED=false");
    println!();
    println!("{}", default_config);
    Ok(())
}
