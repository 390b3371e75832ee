/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for Syn-Preflight. Validates VM resource
    directives against the host, derives disk tuning hints,
    installs requested packages, and emits the resolved
    launch configuration for the launcher scripts.

  Security / Safety Notes:
    Reads /proc and statfs; runs apt-get as the container
    user; performs HTTPS GET requests to geolocation services
    only when a package install needs a mirror decision.

  Dependencies:
    clap for CLI/env parsing, tokio for the async runtime.

  Operational Scope:
    Invoked by the container entrypoint before the VM starts.
    Any error aborts the launch with a step-specific code.

  Revision History:
    2025-11-12 COD  Authored Syn-Preflight runtime.
    2025-11-19 COD  Print one diagnostic per failure.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI, environment, and file
============================================================*/

mod apt;
mod config;
mod country;
mod error;
mod host;
mod installer;
mod logger;
mod memory;
mod preflight;
mod report;
mod size;
mod status;
mod storage;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{ArgAction, Parser};

use apt::Apt;
use config::PreflightConfig;
use country::{default_probes, CountryCode, CountryResolver};
use error::Result;
use installer::{PackageInstaller, PackageRequest};
use logger::{LogLevel, Logger};
use preflight::Directives;
use report::write_report;
use status::StatusPage;

/// Command-line arguments for Syn-Preflight.
#[derive(Debug, Parser)]
#[command(
    name = "Syn-Preflight",
    version,
    author = "Synavera Systems",
    about = "Pre-flight resolver for the containerised VM launcher"
)]
struct Cli {
    /// Storage folder holding the VM disks.
    #[arg(long, env = "STORAGE", default_value = "/storage")]
    storage: PathBuf,
    /// Guest memory size (e.g. 2G, 512MB, 4096).
    #[arg(long, env = "RAM_SIZE", default_value = "2G", allow_hyphen_values = true)]
    ram_size: String,
    /// Set to N to skip the available-memory check.
    #[arg(long, env = "RAM_CHECK", default_value = "Y")]
    ram_check: String,
    /// Number of guest CPU cores.
    #[arg(long, env = "CPU_CORES", default_value = "2", allow_hyphen_values = true)]
    cpu_cores: String,
    /// Timezone identifier used for the country heuristic.
    #[arg(long, env = "TZ")]
    timezone: Option<String>,
    /// Two-letter country code; skips country detection.
    #[arg(long, env = "COUNTRY")]
    country: Option<String>,
    /// Package to ensure, as NAME or NAME=DESCRIPTION.
    #[arg(long = "package", value_name = "PKG", action = ArgAction::Append)]
    packages: Vec<String>,
    /// Override configuration file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Write the resolved configuration as JSON.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", err.diagnostic());
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Validate package names before touching the host.
    let requests = cli
        .packages
        .iter()
        .map(|spec| PackageRequest::parse(spec))
        .collect::<Result<Vec<_>>>()?;

    let config = PreflightConfig::load_from_optional_path(cli.config.as_deref())?;

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .unwrap_or_else(|| config.log_dir().join(format!("preflight_{session_stamp}.log")));
    let logger = Logger::new(Some(log_path), cli.verbose)?;
    logger.info("INIT", "Syn-Preflight starting.");

    let directives = Directives {
        storage: cli.storage.clone(),
        ram_size: cli.ram_size.clone(),
        ram_check: cli.ram_check.clone(),
        cpu_cores: cli.cpu_cores.clone(),
    };
    let mut report = preflight::run(&directives, &config.paths.shared_memory, &logger)
        .inspect_err(|err| logger.record(LogLevel::Error, "PREFLIGHT", err.to_string()))?;

    // Geolocation is only consulted on behalf of package installs.
    let probes = if requests.is_empty() {
        Vec::new()
    } else {
        default_probes()?
    };
    let resolver = CountryResolver::new(
        preset_country(cli.country.as_deref(), &logger),
        cli.timezone.clone(),
        probes,
    );

    if !requests.is_empty() {
        let status = StatusPage::new(config.paths.status_page.clone());
        let mut installer =
            PackageInstaller::new(Apt::new(&config.apt), &resolver, &logger, &status);
        for request in requests {
            installer
                .ensure(request)
                .await
                .inspect_err(|err| logger.record(LogLevel::Error, "PACKAGE", err.to_string()))?;
        }
    }
    report.country = resolver.cached().cloned();

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
        logger.info("REPORT", format!("Report written to {}", path.display()));
    }
    for line in report.env_lines() {
        println!("{line}");
    }

    logger.info("COMPLETE", "Pre-flight checks passed.");
    logger.finalize()?;

    Ok(ExitCode::SUCCESS)
}

fn preset_country(raw: Option<&str>, logger: &Logger) -> Option<CountryCode> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
    let code = CountryCode::parse(raw);
    if code.is_none() {
        logger.warn(
            "COUNTRY",
            format!("Ignoring invalid COUNTRY value `{raw}`; it will be detected instead"),
        );
    }
    code
}
