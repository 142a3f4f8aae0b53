//! Host Inventory
//!
//! Scans the local host for storage exports and network devices and prints
//! one inventory document on stdout. Logs go to stderr.

use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use host_inventory::{Error, HostProbe, Inventory, InventoryScanner, Result, ScannerConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Output encoding of the inventory document
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

/// Scanners selectable with `--only`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScanTarget {
    Nfs,
    Scst,
    Nvmeof,
    Network,
}

/// Host Inventory - storage exports and network devices of this host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML scanner configuration
    #[arg(long, env = "HOST_INVENTORY_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Run only these scanners (repeatable)
    #[arg(long, value_enum)]
    only: Vec<ScanTarget>,

    /// Run scanners one after the other instead of concurrently
    #[arg(long)]
    sequential: bool,

    /// Print the JSON Schema of the inventory document and exit
    #[arg(long)]
    schema: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    if args.schema {
        let schema = schemars::schema_for!(Inventory);
        return emit(&serde_json::to_string_pretty(&schema)?);
    }

    let config = load_config(&args)?;

    info!("Starting {} {}", host_inventory::NAME, host_inventory::VERSION);

    let scanner = InventoryScanner::new(config, Arc::new(HostProbe::new()));
    let inventory = if args.sequential {
        scanner.discover()
    } else {
        scanner.discover_concurrent().await
    };

    let rendered = match args.format {
        OutputFormat::Json if args.pretty => serde_json::to_string_pretty(&inventory)?,
        OutputFormat::Json => serde_json::to_string(&inventory)?,
        OutputFormat::Yaml => serde_yaml::to_string(&inventory)?,
    };
    emit(&rendered)
}

fn load_config(args: &Args) -> Result<ScannerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ScannerConfig::from_yaml_file(path)?
        }
        None => ScannerConfig::default(),
    };

    if !args.only.is_empty() {
        config.nfs.enabled = args.only.contains(&ScanTarget::Nfs);
        config.scst.enabled = args.only.contains(&ScanTarget::Scst);
        config.nvmeof.enabled = args.only.contains(&ScanTarget::Nvmeof);
        config.network.enabled = args.only.contains(&ScanTarget::Network);
    }

    Ok(config)
}

fn emit(document: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", document)?;
    stdout.flush()?;
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let result = if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))
}
