/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::preflight
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Validate operator resource directives against the host
    in a fixed order, stopping at the first failure.

  Security / Safety Notes:
    Read-only host inspection; nothing is modified.

  Dependencies:
    host, size, memory, and storage modules.

  Operational Scope:
    Runs before any package installation or VM launch.

  Revision History:
    2025-11-12 COD  Assembled pre-flight validation sequence.
    2025-11-19 COD  Clamp oversized core counts; reject zero.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Fail fast with one error per failing step
    - Host facts gathered once and passed explicitly
============================================================*/

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{PreflightError, Result};
use crate::host::{self, HostMemory};
use crate::logger::Logger;
use crate::memory::{enforcement_enabled, MemoryStatus, Verdict};
use crate::report::PreflightReport;
use crate::size::SizeSpec;
use crate::storage::FilesystemProfile;

/// Operator-supplied resource directives, as received.
#[derive(Debug, Clone)]
pub struct Directives {
    pub storage: PathBuf,
    pub ram_size: String,
    pub ram_check: String,
    pub cpu_cores: String,
}

/// Requested vs. effective CPU allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CpuAllocation {
    pub requested: u64,
    pub host: u32,
    pub effective: u32,
}

/// Run every check against the live host.
pub fn run(
    directives: &Directives,
    shared_memory: &Path,
    logger: &Logger,
) -> Result<PreflightReport> {
    check_storage(&directives.storage)?;
    check_shared_memory(shared_memory)?;

    let cpu = allocate_cores(&directives.cpu_cores, host::logical_cores(), logger)?;
    let ram = SizeSpec::parse(&directives.ram_size)?;

    let filesystem = host::filesystem_type(&directives.storage)?;
    logger.info(
        "STORAGE",
        format!("{} is on {filesystem}", directives.storage.display()),
    );

    let memory = check_memory(
        &ram,
        host::read_memory()?,
        enforcement_enabled(&directives.ram_check),
        &filesystem,
        logger,
    )?;

    let profile = FilesystemProfile::for_filesystem(&filesystem);
    if let Some(hints) = profile.hints {
        logger.info(
            "STORAGE",
            format!(
                "Using io={} cache={} for {filesystem}",
                hints.io_mode.as_str(),
                hints.cache_mode.as_str()
            ),
        );
    }

    Ok(PreflightReport::new(
        directives.storage.clone(),
        profile,
        ram,
        memory,
        cpu,
    ))
}

pub fn check_storage(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(PreflightError::StorageMissing {
            path: path.display().to_string(),
        })
    }
}

pub fn check_shared_memory(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(PreflightError::SharedMemoryMissing {
            path: path.display().to_string(),
        })
    }
}

/// Validate CPU_CORES (digits and spaces only) and clamp it to the host.
pub fn allocate_cores(raw: &str, host_cores: u32, logger: &Logger) -> Result<CpuAllocation> {
    let compact: String = raw.chars().filter(|c| *c != ' ').collect();
    if compact.is_empty() || !compact.chars().all(|c| c.is_ascii_digit()) {
        return Err(PreflightError::InvalidCores {
            value: raw.to_string(),
        });
    }
    // Digits only, so the parse can fail on overflow alone.
    let requested = compact.parse::<u64>().unwrap_or(u64::MAX);
    if requested == 0 {
        return Err(PreflightError::InvalidCores {
            value: raw.to_string(),
        });
    }

    let effective = match u32::try_from(requested) {
        Ok(cores) if cores <= host_cores => cores,
        _ => {
            logger.warn(
                "CPU",
                format!(
                    "The amount for CPU_CORES ({requested}) exceeds the amount of logical cores available, so will be limited to {host_cores}"
                ),
            );
            host_cores
        }
    };

    Ok(CpuAllocation {
        requested,
        host: host_cores,
        effective,
    })
}

/// Apply the memory governor; a fatal verdict becomes an error.
pub fn check_memory(
    ram: &SizeSpec,
    host: HostMemory,
    enforce: bool,
    filesystem: &str,
    logger: &Logger,
) -> Result<MemoryStatus> {
    let status = MemoryStatus::evaluate(
        ram.bytes(),
        host.available,
        host.total,
        enforce,
        filesystem,
    );
    logger.info(
        "MEMORY",
        format!(
            "RAM_SIZE={} wanted={} available={} total={}",
            ram,
            status.wanted_display(),
            status.available_display(),
            status.total_display()
        ),
    );
    if !enforce {
        logger.debug("MEMORY", "RAM_CHECK disabled by operator");
    }

    match status.verdict {
        Verdict::Ok => Ok(status),
        Verdict::Warning => {
            logger.warn(
                "MEMORY",
                format!(
                    "Your configured RAM_SIZE of {} is too high for the {} of memory available; continuing because {filesystem} caches hide reclaimable memory",
                    status.wanted_display(),
                    status.available_display()
                ),
            );
            Ok(status)
        }
        Verdict::Fatal => Err(PreflightError::MemoryExceeded {
            wanted: status.wanted_display(),
            available: status.available_display(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: HostMemory = HostMemory {
        total: 8_589_934_592,
        available: 4_000_000_000,
    };

    fn logger() -> Logger {
        Logger::console(false)
    }

    #[test]
    fn storage_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_storage(dir.path()).is_ok());
        let file = dir.path().join("disk.img");
        std::fs::write(&file, "").unwrap();
        for path in [file, dir.path().join("missing")] {
            let err = check_storage(&path).unwrap_err();
            assert!(matches!(err, PreflightError::StorageMissing { .. }));
        }
    }

    #[test]
    fn shared_memory_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_shared_memory(dir.path()).is_ok());
        let err = check_shared_memory(&dir.path().join("shm")).unwrap_err();
        assert!(matches!(err, PreflightError::SharedMemoryMissing { .. }));
    }

    #[test]
    fn cpu_cores_accept_digits_and_spaces() {
        let cpu = allocate_cores(" 4 ", 8, &logger()).unwrap();
        assert_eq!(cpu.requested, 4);
        assert_eq!(cpu.effective, 4);
    }

    #[test]
    fn cpu_cores_reject_other_characters() {
        for raw in ["", "  ", "four", "4c", "-2", "2.5", "max", "0", " 0 0 "] {
            let err = allocate_cores(raw, 8, &logger()).unwrap_err();
            assert!(matches!(err, PreflightError::InvalidCores { .. }), "{raw:?}");
        }
    }

    #[test]
    fn cpu_cores_are_clamped_to_host() {
        let cpu = allocate_cores("16", 4, &logger()).unwrap();
        assert_eq!(cpu.requested, 16);
        assert_eq!(cpu.effective, 4);
    }

    #[test]
    fn oversized_cpu_cores_are_clamped_not_rejected() {
        let cpu = allocate_cores("99999999999", 4, &logger()).unwrap();
        assert_eq!(cpu.requested, 99_999_999_999);
        assert_eq!(cpu.effective, 4);

        let cpu = allocate_cores(&"9".repeat(40), 4, &logger()).unwrap();
        assert_eq!(cpu.requested, u64::MAX);
        assert_eq!(cpu.effective, 4);
    }

    #[test]
    fn memory_shortfall_is_fatal_on_xfs() {
        let ram = SizeSpec::parse("4G").unwrap();
        let err = check_memory(&ram, HOST, true, "xfs", &logger()).unwrap_err();
        match err {
            PreflightError::MemoryExceeded { wanted, available } => {
                assert_eq!(wanted, "4 GB");
                assert_eq!(available, "3 GB");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn memory_shortfall_continues_on_zfs() {
        let ram = SizeSpec::parse("4G").unwrap();
        let status = check_memory(&ram, HOST, true, "zfs", &logger()).unwrap();
        assert_eq!(status.verdict, Verdict::Warning);
    }

    #[test]
    fn memory_check_can_be_disabled() {
        let ram = SizeSpec::parse("64G").unwrap();
        let status = check_memory(&ram, HOST, false, "xfs", &logger()).unwrap();
        assert_eq!(status.verdict, Verdict::Ok);
    }

    #[test]
    fn run_stops_at_missing_storage() {
        let dir = tempfile::tempdir().unwrap();
        let directives = Directives {
            storage: dir.path().join("storage"),
            ram_size: "2G".into(),
            ram_check: "N".into(),
            cpu_cores: "abc".into(),
        };
        let err = run(&directives, dir.path(), &logger()).unwrap_err();
        assert!(matches!(err, PreflightError::StorageMissing { .. }));
    }

    #[test]
    fn run_checks_cores_before_memory() {
        let dir = tempfile::tempdir().unwrap();
        let directives = Directives {
            storage: dir.path().to_path_buf(),
            ram_size: "".into(),
            ram_check: "N".into(),
            cpu_cores: "abc".into(),
        };
        let err = run(&directives, dir.path(), &logger()).unwrap_err();
        assert!(matches!(err, PreflightError::InvalidCores { .. }));
    }

    #[test]
    fn run_rejects_low_memory_size() {
        let dir = tempfile::tempdir().unwrap();
        let directives = Directives {
            storage: dir.path().to_path_buf(),
            ram_size: "64M".into(),
            ram_check: "N".into(),
            cpu_cores: "1".into(),
        };
        let err = run(&directives, dir.path(), &logger()).unwrap_err();
        assert_eq!(err.step(), "memory");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn run_produces_report_when_check_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let directives = Directives {
            storage: dir.path().to_path_buf(),
            ram_size: "2G".into(),
            ram_check: "N".into(),
            cpu_cores: "1".into(),
        };
        let report = run(&directives, dir.path(), &logger()).unwrap();
        assert_eq!(report.ram.bytes(), 2_147_483_648);
        assert_eq!(report.cpu.effective, 1);
        assert_eq!(report.memory.verdict, Verdict::Ok);
    }
}
