//! VFIO Classifier
//!
//! Command-line front end for classifying VFIO group paths and the IOMMU
//! groups behind them.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vfio_classifier::{
    ClassifierConfig, DeviceInfo, DisplayDetector, GroupInspector, GroupReport, ScanPolicy,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// VFIO Classifier - IOMMU group and display controller detection
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "VFIO_CLASSIFIER_CONFIG")]
    config: Option<PathBuf>,

    /// Root of the VFIO group device nodes
    #[arg(long, env = "VFIO_ROOT")]
    vfio_root: Option<PathBuf>,

    /// Root of the sysfs IOMMU group topology
    #[arg(long, env = "IOMMU_GROUPS_ROOT")]
    iommu_groups_root: Option<PathBuf>,

    /// Class code prefix identifying display controllers
    #[arg(long, env = "DISPLAY_CLASS_PREFIX")]
    display_class_prefix: Option<String>,

    /// How member results are aggregated
    #[arg(long, env = "SCAN_POLICY", value_enum)]
    scan_policy: Option<PolicyArg>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a VFIO group holds a display controller
    Check {
        /// Host device path, e.g. /dev/vfio/12
        path: PathBuf,
    },
    /// Classify every member of a VFIO group
    Inspect {
        /// Host device path, e.g. /dev/vfio/12
        path: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List VFIO groups on this host
    Groups {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a device type tag denotes a block device
    Block {
        /// mknod(1) type tag: b, c, u or p
        dev_type: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    FirstReadable,
    AnyDisplay,
}

impl From<PolicyArg> for ScanPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::FirstReadable => ScanPolicy::FirstReadable,
            PolicyArg::AnyDisplay => ScanPolicy::AnyDisplay,
        }
    }
}

/// Exit code for an inconclusive display check
const EXIT_INCONCLUSIVE: u8 = 2;

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = load_config(&args)?;
    debug!(?config, "Using classifier configuration");

    let inspector = GroupInspector::new(config);

    match args.command {
        Command::Check { path } => {
            let detector: &dyn DisplayDetector = &inspector;
            match detector.has_display_controller(&path) {
                Ok(display) => {
                    println!("{}", display);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) if e.is_fatal() => {
                    Err(e).with_context(|| format!("failed to inspect {}", path.display()))
                }
                Err(e) => {
                    println!("false");
                    eprintln!("inconclusive: {}", e);
                    Ok(ExitCode::from(EXIT_INCONCLUSIVE))
                }
            }
        }
        Command::Inspect { path, json } => {
            let report = inspector
                .inspect(&path)
                .with_context(|| format!("failed to inspect {}", path.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Groups { json } => {
            let groups = inspector.list_groups().context("failed to list VFIO groups")?;
            if json {
                let reports: Vec<GroupReport> = groups
                    .iter()
                    .filter_map(|g| inspector.inspect(g).ok())
                    .collect();
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for group in &groups {
                    let display = match inspector.has_display_controller(group) {
                        Ok(true) => "display".to_string(),
                        Ok(false) => "-".to_string(),
                        Err(e) => format!("? ({})", e),
                    };
                    println!("{:<24} {}", group.display(), display);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Block { dev_type } => {
            let info = DeviceInfo::new(String::new(), dev_type);
            println!("{}", info.is_block());
            Ok(ExitCode::SUCCESS)
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

fn load_config(args: &Args) -> anyhow::Result<ClassifierConfig> {
    let mut config = match &args.config {
        Some(path) => ClassifierConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ClassifierConfig::default(),
    };

    if let Some(root) = &args.vfio_root {
        config.vfio_root = root.clone();
    }
    if let Some(root) = &args.iommu_groups_root {
        config.iommu_groups_root = root.clone();
    }
    if let Some(prefix) = &args.display_class_prefix {
        config.display_class_prefix = prefix.clone();
    }
    if let Some(policy) = args.scan_policy {
        config.scan_policy = policy.into();
    }

    config.validate()?;
    Ok(config)
}

fn print_report(report: &GroupReport) {
    println!("IOMMU group {} ({})", report.group_id, report.host_path.display());
    println!("  devices: {}", report.devices_path.display());
    for member in &report.members {
        let class = member.class_code.as_deref().unwrap_or("-");
        let marker = if member.display_controller { " [display]" } else { "" };
        println!("  {:<40} {:<10} {}{}", member.name, member.kind.to_string(), class, marker);
        if let Some(err) = &member.error {
            println!("    {}", err);
        }
    }
    println!("  display controller: {}", report.has_display_controller);
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
