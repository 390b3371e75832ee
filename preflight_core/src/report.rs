/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::report
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Describe the resolved launch configuration for the VM
    launcher, both as JSON and as shell assignments.

  Security / Safety Notes:
    Reports are written to operator-controlled paths; no
    privileged operations are performed.

  Dependencies:
    serde for JSON serialization, chrono for timestamps.

  Operational Scope:
    Produced at the end of a successful pre-flight run and
    sourced by the launcher scripts.

  Revision History:
    2025-11-12 COD  Authored launch report writer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Stable key names for downstream scripts
    - Unset hints are omitted rather than emitted empty
============================================================*/

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::country::CountryCode;
use crate::error::{PreflightError, Result};
use crate::memory::MemoryStatus;
use crate::preflight::CpuAllocation;
use crate::size::SizeSpec;
use crate::storage::FilesystemProfile;

#[derive(Debug, Serialize)]
pub struct PreflightReport {
    pub generated_at: String,
    pub storage: PathBuf,
    pub filesystem: FilesystemProfile,
    pub ram: SizeSpec,
    pub memory: MemoryStatus,
    pub cpu: CpuAllocation,
    pub country: Option<CountryCode>,
}

impl PreflightReport {
    pub fn new(
        storage: PathBuf,
        filesystem: FilesystemProfile,
        ram: SizeSpec,
        memory: MemoryStatus,
        cpu: CpuAllocation,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            storage,
            filesystem,
            ram,
            memory,
            cpu,
            country: None,
        }
    }

    /// `KEY=value` lines for the launcher to source.
    pub fn env_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("STORAGE={}", shell_quote(&self.storage.display().to_string())),
            format!("FS={}", shell_quote(&self.filesystem.filesystem)),
            format!("RAM_SIZE={}", self.ram.normalized()),
            format!("RAM_WANTED={}", self.ram.bytes()),
            format!("CPU_CORES={}", self.cpu.effective),
        ];
        if let Some(io_mode) = self.filesystem.io_mode() {
            lines.push(format!("DISK_IO={}", io_mode.as_str()));
        }
        if let Some(cache_mode) = self.filesystem.cache_mode() {
            lines.push(format!("DISK_CACHE={}", cache_mode.as_str()));
        }
        if let Some(country) = &self.country {
            lines.push(format!("COUNTRY={country}"));
        }
        lines
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Persist the report as pretty JSON.
pub fn write_report(report: &PreflightReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            PreflightError::Filesystem(format!(
                "Failed to create report directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    let file = File::create(path).map_err(|err| {
        PreflightError::Filesystem(format!(
            "Failed to create report file {}: {err}",
            path.display()
        ))
    })?;
    serde_json::to_writer_pretty(file, report).map_err(|err| {
        PreflightError::Serialization(format!(
            "Failed to write report {}: {err}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(filesystem: &str) -> PreflightReport {
        let ram = SizeSpec::parse("512MB").unwrap();
        let memory = MemoryStatus::evaluate(ram.bytes(), 8 << 30, 16 << 30, true, filesystem);
        PreflightReport::new(
            PathBuf::from("/storage"),
            FilesystemProfile::for_filesystem(filesystem),
            ram,
            memory,
            CpuAllocation {
                requested: 2,
                host: 8,
                effective: 2,
            },
        )
    }

    #[test]
    fn env_lines_omit_default_hints() {
        let lines = report("xfs").env_lines();
        assert_eq!(
            lines,
            [
                "STORAGE='/storage'",
                "FS='xfs'",
                "RAM_SIZE=512M",
                "RAM_WANTED=536870912",
                "CPU_CORES=2",
            ]
        );
    }

    #[test]
    fn env_lines_carry_hints_and_country() {
        let mut report = report("tmpfs");
        report.country = CountryCode::parse("cn");
        let lines = report.env_lines();
        assert!(lines.contains(&"DISK_IO=threads".to_string()));
        assert!(lines.contains(&"DISK_CACHE=writeback".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("COUNTRY=CN"));
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn json_report_round_trips_key_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");
        write_report(&report("ecryptfs"), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["ram"]["bytes"], 536_870_912);
        assert_eq!(value["memory"]["verdict"], "ok");
        assert_eq!(value["filesystem"]["hints"]["io_mode"], "threads");
        assert_eq!(value["filesystem"]["hints"]["cache_mode"], "writeback");
        assert!(value["country"].is_null());
    }
}
