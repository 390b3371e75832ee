/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::apt
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Interface with apt/dpkg to query installed packages,
    point the Debian sources at a regional mirror, refresh
    the package index, and install packages.

  Security / Safety Notes:
    Runs apt-get non-interactively with the container's
    privileges. Package names are validated before being
    passed as arguments.

  Dependencies:
    tokio::process for async command execution.

  Operational Scope:
    Backs the package installer inside the launcher image.

  Revision History:
    2025-11-12 COD  Crafted apt integration layer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic command invocation with explicit checks
    - Reusable helpers for external command diagnostics
============================================================*/

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::AptConfig;
use crate::error::{PreflightError, Result};

/// Package-management operations consumed by the installer.
pub trait PackageManager {
    async fn is_installed(&self, package: &str) -> Result<bool>;
    /// Point package sources at `host` instead of the default mirror.
    async fn use_mirror(&self, host: &str) -> Result<()>;
    async fn refresh_index(&self) -> Result<()>;
    async fn install(&self, package: &str) -> Result<()>;
}

/// Debian `apt` backend.
pub struct Apt {
    sources: PathBuf,
    default_host: String,
}

impl Apt {
    pub fn new(config: &AptConfig) -> Self {
        Self {
            sources: config.sources.clone(),
            default_host: config.default_host.clone(),
        }
    }
}

impl PackageManager for Apt {
    async fn is_installed(&self, package: &str) -> Result<bool> {
        let stdout = run("apt-mark", &["showinstall"]).await?;
        Ok(stdout.lines().any(|line| line.trim() == package))
    }

    async fn use_mirror(&self, host: &str) -> Result<()> {
        rewrite_sources(&self.sources, &self.default_host, host)
    }

    async fn refresh_index(&self) -> Result<()> {
        run("apt-get", &["-qq", "update"]).await.map(drop)
    }

    async fn install(&self, package: &str) -> Result<()> {
        run(
            "apt-get",
            &["-qq", "--no-install-recommends", "-y", "install", package],
        )
        .await
        .map(drop)
    }
}

/// Debian policy: lower-case alphanumerics plus `+ - .`, at least two
/// characters, starting with an alphanumeric.
pub fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() >= 2
        && (first.is_ascii_lowercase() || first.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+-.".contains(c))
}

/// Replace every occurrence of `from` with `to` in the sources file.
pub fn rewrite_sources(path: &Path, from: &str, to: &str) -> Result<()> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        PreflightError::Filesystem(format!(
            "Failed to read package sources {}: {err}",
            path.display()
        ))
    })?;
    if !contents.contains(from) {
        return Ok(());
    }
    std::fs::write(path, contents.replace(from, to)).map_err(|err| {
        PreflightError::Filesystem(format!(
            "Failed to rewrite package sources {}: {err}",
            path.display()
        ))
    })
}

async fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .env("DEBIAN_FRONTEND", "noninteractive")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|err| map_spawn_error(err, program))?;

    if !output.status.success() {
        return Err(PreflightError::CommandFailure {
            command: format!("{program} {}", args.join(" ")),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|err| {
        PreflightError::Serialization(format!("{program} emitted invalid UTF-8: {err}"))
    })
}

fn map_spawn_error(err: io::Error, command: &str) -> PreflightError {
    if err.kind() == io::ErrorKind::NotFound {
        PreflightError::CommandMissing {
            command: command.into(),
        }
    } else {
        PreflightError::Runtime(format!("Failed to spawn {command}: {err}"))
    }
}
