//! gprov verification gate (gp-verify)
//!
//! Boundary binary for the provisioning pipeline: resolves the hardware
//! platform against the variant catalog and verifies the unit against its
//! required specification before manufacturing or factory restore may
//! proceed.
//!
//! The library core is pure - it reports mismatches instead of exiting.
//! This binary owns the fail-closed policy: any mismatch, unresolved
//! platform, or error terminates with a non-zero status after printing the
//! full diagnostic dump.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use gp_core::{
    compare, sanity_check, DmiSource, HwSpec, Identifier, ResolvedVariant, ValidationReport,
    VariantRegistry,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "gp-verify")]
#[command(version)]
#[command(about = "gprov manufacturing gate - platform identification and verification")]
struct Cli {
    /// Registry document overriding the built-in catalog
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the running platform and print it as JSON
    Identify {
        /// Code name to fall back to when live matching fails
        #[arg(long)]
        fallback: Option<String>,
    },

    /// Verify the platform against its required specification
    Verify {
        /// Required-specification document
        #[arg(long)]
        spec: PathBuf,

        /// Detected-specification document produced by the platform detectors
        #[arg(long)]
        detected: PathBuf,

        /// Code name to fall back to when live matching fails
        #[arg(long)]
        fallback: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    info!("gp-verify {} starting", VERSION);

    let registry = match &cli.registry {
        Some(path) => VariantRegistry::load_file(path)
            .with_context(|| format!("loading registry {}", path.display()))?,
        None => VariantRegistry::builtin(),
    };
    let mut engine = Identifier::new(registry, DmiSource::live());

    match cli.command {
        Commands::Identify { fallback } => {
            let resolved = resolve(&mut engine, fallback)?;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify {
            spec,
            detected,
            fallback,
        } => {
            let required = HwSpec::load_file(&spec)
                .with_context(|| format!("loading required spec {}", spec.display()))?;
            sanity_check(&required).context("required spec failed sanity check")?;

            let detected = HwSpec::load_file(&detected)
                .with_context(|| format!("loading detected spec {}", detected.display()))?;

            let resolved = resolve(&mut engine, fallback)?;
            let mismatches = compare(&required, &detected, &resolved, resolved.via_fallback)?;

            if mismatches.is_empty() {
                info!(code_name = %required.code_name, "specification validation passed");
                return Ok(ExitCode::SUCCESS);
            }

            let report = ValidationReport {
                mismatches,
                detected_json: detected.to_json_pretty()?,
                raw_tables: engine.source_mut().dump_tables(),
            };
            print_failure(&report);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Resolve the platform, using the supplied fallback code name when live
/// matching fails. An unresolved platform is fatal here.
fn resolve(engine: &mut Identifier, fallback: Option<String>) -> anyhow::Result<ResolvedVariant> {
    let resolved = match fallback {
        Some(code_name) => engine
            .identify_with_fallback(|| Ok::<_, String>(code_name))?
            .clone(),
        None => match engine.identify()? {
            Some(resolved) => resolved.clone(),
            None => bail!("platform not identified; pass --fallback <code-name> if intended"),
        },
    };
    Ok(resolved)
}

/// Emit the full diagnostic trail for a failed validation
fn print_failure(report: &ValidationReport) {
    error!(
        error_count = report.error_count(),
        "specification validation FAILED - unit must not proceed"
    );
    for mismatch in &report.mismatches {
        eprintln!(
            "MISMATCH {}: required {:?}, detected {:?}",
            mismatch.field, mismatch.required, mismatch.detected
        );
    }
    eprintln!("--- detected specification ---");
    eprintln!("{}", report.detected_json);
    eprintln!("--- raw identity tables ---");
    eprintln!("{}", report.raw_tables);
}
