/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::host
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Introspect the host: memory figures, logical CPU count,
    and the filesystem type backing a path.

  Security / Safety Notes:
    Read-only access to /proc and statfs(2); no privileges
    are required or requested.

  Dependencies:
    nix for statfs.

  Operational Scope:
    Supplies raw host facts to the pre-flight sequence.

  Revision History:
    2025-11-12 COD  Added host introspection helpers.
    2025-11-19 COD  Switched to nix statfs and std core count.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Pure parsers separated from syscalls for testability
    - Explicit failure when /proc data is unusable
============================================================*/

use std::path::Path;

use nix::sys::statfs::statfs;

use crate::error::{PreflightError, Result};

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Host memory figures in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostMemory {
    pub total: u64,
    pub available: u64,
}

/// Read total and available memory from `/proc/meminfo`.
pub fn read_memory() -> Result<HostMemory> {
    let contents = std::fs::read_to_string(MEMINFO_PATH).map_err(|err| {
        PreflightError::Runtime(format!("Failed to read {MEMINFO_PATH}: {err}"))
    })?;
    parse_meminfo(&contents).ok_or_else(|| {
        PreflightError::Runtime(format!(
            "{MEMINFO_PATH} lacks MemTotal/MemAvailable entries"
        ))
    })
}

fn parse_meminfo(contents: &str) -> Option<HostMemory> {
    let mut total = None;
    let mut available = None;
    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => &mut total,
            "MemAvailable" => &mut available,
            _ => continue,
        };
        let kib: u64 = value.split_whitespace().next()?.parse().ok()?;
        *slot = Some(kib.saturating_mul(1024));
    }
    Some(HostMemory {
        total: total?,
        available: available?,
    })
}

/// Number of logical CPUs available to this process (at least 1).
pub fn logical_cores() -> u32 {
    std::thread::available_parallelism()
        .ok()
        .and_then(|n| u32::try_from(n.get()).ok())
        .unwrap_or(1)
}

/// Filesystem type name of the mount holding `path`, in `stat -f` style.
pub fn filesystem_type(path: &Path) -> Result<String> {
    let stats = statfs(path).map_err(|err| {
        PreflightError::Filesystem(format!("statfs on {} failed: {err}", path.display()))
    })?;
    // f_type is signed on some targets; magics are 32-bit.
    let magic = (stats.filesystem_type().0 as u64) & 0xFFFF_FFFF;
    Ok(filesystem_name(magic).to_string())
}

fn filesystem_name(magic: u64) -> &'static str {
    match magic {
        0xEF53 => "ext2/ext3",
        0x5846_5342 => "xfs",
        0x9123_683E => "btrfs",
        0x2FC1_2FC1 => "zfs",
        0x0102_1994 => "tmpfs",
        0xF15F => "ecryptfs",
        0x794C_7630 => "overlayfs",
        0x6969 => "nfs",
        0xFE53_4D42 => "smb2",
        0xFF53_4D42 => "cifs",
        0x6573_5546 => "fuseblk",
        0x5346_544E => "ntfs",
        0x4D44 => "msdos",
        0x2011_BAB0 => "exfat",
        0x0102_1997 => "v9fs",
        0xF2F5_2010 => "f2fs",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "MemTotal:       16303428 kB\n\
MemFree:         1022140 kB\n\
MemAvailable:    9876544 kB\n\
Buffers:          523112 kB\n";

    #[test]
    fn meminfo_reports_bytes() {
        let memory = parse_meminfo(SAMPLE).unwrap();
        assert_eq!(memory.total, 16_303_428 * 1024);
        assert_eq!(memory.available, 9_876_544 * 1024);
    }

    #[test]
    fn meminfo_without_available_is_rejected() {
        assert_eq!(parse_meminfo("MemTotal: 1024 kB\n"), None);
        assert_eq!(parse_meminfo("MemTotal: lots kB\nMemAvailable: 1 kB\n"), None);
    }

    #[test]
    fn magic_numbers_map_to_stat_names() {
        assert_eq!(filesystem_name(0xEF53), "ext2/ext3");
        assert_eq!(filesystem_name(0x2FC1_2FC1), "zfs");
        assert_eq!(filesystem_name(0x0102_1994), "tmpfs");
        assert_eq!(filesystem_name(0xF15F), "ecryptfs");
        assert_eq!(filesystem_name(0xDEAD), "unknown");
    }

    #[test]
    fn filesystem_type_of_temp_dir_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let name = filesystem_type(dir.path()).unwrap();
        assert!(!name.is_empty());
    }

    #[test]
    fn filesystem_type_of_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = filesystem_type(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, PreflightError::Filesystem(_)));
    }

    #[test]
    fn at_least_one_core_is_reported() {
        assert!(logical_cores() >= 1);
    }
}
