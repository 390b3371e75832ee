/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::memory
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Compare the requested guest memory against host headroom
    and render byte figures for operator-facing messages.

  Security / Safety Notes:
    Pure decision logic; host figures are supplied by the
    host probe module.

  Dependencies:
    serde for report serialization.

  Operational Scope:
    Invoked once per pre-flight run after RAM_SIZE parsing.

  Revision History:
    2025-11-12 COD  Authored memory governor and formatter.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Never overstate available headroom in diagnostics
    - Filesystem-aware policy kept in one place
============================================================*/

use serde::Serialize;

/// Headroom reserved for the host beyond the guest allocation.
pub const SPARE_BYTES: u64 = 500_000_000;

/// Filesystem whose page cache (ZFS ARC) hides reclaimable memory, so a
/// shortfall there is reported but not enforced.
pub const EXEMPT_FILESYSTEM: &str = "zfs";

/// Outcome of the memory headroom check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Ok,
    Warning,
    Fatal,
}

/// Snapshot of the memory comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryStatus {
    pub total: u64,
    pub available: u64,
    pub wanted: u64,
    pub spare: u64,
    pub verdict: Verdict,
}

impl MemoryStatus {
    /// Evaluate `wanted` against host memory.
    ///
    /// `wanted` must already have passed the size floor in
    /// [`crate::size::SizeSpec::parse`].
    pub fn evaluate(
        wanted: u64,
        available: u64,
        total: u64,
        enforce: bool,
        filesystem: &str,
    ) -> Self {
        let violated = enforce && wanted.saturating_add(SPARE_BYTES) > available;
        let verdict = match (violated, is_exempt(filesystem)) {
            (false, _) => Verdict::Ok,
            (true, true) => Verdict::Warning,
            (true, false) => Verdict::Fatal,
        };
        Self {
            total,
            available,
            wanted,
            spare: SPARE_BYTES,
            verdict,
        }
    }

    pub fn available_display(&self) -> String {
        format_bytes(self.available, Rounding::Down)
    }

    pub fn total_display(&self) -> String {
        format_bytes(self.total, Rounding::Up)
    }

    pub fn wanted_display(&self) -> String {
        format_bytes(self.wanted, Rounding::Down)
    }
}

fn is_exempt(filesystem: &str) -> bool {
    filesystem.eq_ignore_ascii_case(EXEMPT_FILESYSTEM)
}

/// Interpret the RAM_CHECK directive; only an explicit opt-out disables it.
pub fn enforcement_enabled(flag: &str) -> bool {
    let flag = flag.trim().to_ascii_lowercase();
    if flag.starts_with('n') {
        return false;
    }
    !matches!(flag.as_str(), "0" | "false" | "off" | "disable" | "disabled")
}

/// Direction used when collapsing a byte count to a whole unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

const UNITS: [&str; 6] = ["bytes", "KB", "MB", "GB", "TB", "PB"];

/// Render `bytes` as a whole number of the largest fitting 1024-based unit.
pub fn format_bytes(bytes: u64, rounding: Rounding) -> String {
    let mut index = 0;
    while index + 1 < UNITS.len() && bytes >= 1u64 << (10 * (index + 1)) {
        index += 1;
    }
    let divisor = 1u64 << (10 * index);
    let mut value = match rounding {
        Rounding::Down => bytes / divisor,
        Rounding::Up => bytes.div_ceil(divisor),
    };
    if value == 1024 && index + 1 < UNITS.len() {
        value = 1;
        index += 1;
    }
    format!("{value} {}", UNITS[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    const WANTED: u64 = 4_294_967_296;
    const AVAILABLE: u64 = 4_000_000_000;

    #[test]
    fn shortfall_is_fatal_on_regular_filesystems() {
        for fs in ["ext2/ext3", "xfs", "btrfs", "overlayfs"] {
            let status = MemoryStatus::evaluate(WANTED, AVAILABLE, 8 << 30, true, fs);
            assert_eq!(status.verdict, Verdict::Fatal, "{fs}");
        }
    }

    #[test]
    fn shortfall_is_only_a_warning_on_zfs() {
        let status = MemoryStatus::evaluate(WANTED, AVAILABLE, 8 << 30, true, "zfs");
        assert_eq!(status.verdict, Verdict::Warning);
    }

    #[test]
    fn spare_margin_counts_against_available() {
        let available = WANTED + SPARE_BYTES;
        let status = MemoryStatus::evaluate(WANTED, available, available, true, "xfs");
        assert_eq!(status.verdict, Verdict::Ok);
        let status = MemoryStatus::evaluate(WANTED, available - 1, available, true, "xfs");
        assert_eq!(status.verdict, Verdict::Fatal);
    }

    #[test]
    fn disabled_enforcement_never_fails() {
        let status = MemoryStatus::evaluate(WANTED, 0, 0, false, "xfs");
        assert_eq!(status.verdict, Verdict::Ok);
    }

    #[test]
    fn ram_check_opt_out_values() {
        for flag in ["N", "no", "No", "0", "false", "OFF", "disabled"] {
            assert!(!enforcement_enabled(flag), "{flag}");
        }
        for flag in ["Y", "yes", "", "1", "true", "enforce"] {
            assert!(enforcement_enabled(flag), "{flag}");
        }
    }

    #[test]
    fn available_rounds_down_and_total_rounds_up() {
        assert_eq!(format_bytes(AVAILABLE, Rounding::Down), "3 GB");
        assert_eq!(format_bytes(AVAILABLE, Rounding::Up), "4 GB");
        let status = MemoryStatus::evaluate(WANTED, AVAILABLE, 16_500_000_000, true, "xfs");
        assert_eq!(status.available_display(), "3 GB");
        assert_eq!(status.total_display(), "16 GB");
        assert_eq!(status.wanted_display(), "4 GB");
    }

    #[test]
    fn small_figures_use_smaller_units() {
        assert_eq!(format_bytes(700 * 1024 * 1024 + 1, Rounding::Down), "700 MB");
        assert_eq!(format_bytes(700 * 1024 * 1024 + 1, Rounding::Up), "701 MB");
        assert_eq!(format_bytes(512, Rounding::Up), "512 bytes");
    }

    #[test]
    fn rounding_up_to_1024_promotes_unit() {
        assert_eq!(format_bytes((1 << 30) - 1, Rounding::Up), "1 GB");
        assert_eq!(format_bytes((1 << 30) - 1, Rounding::Down), "1023 MB");
    }
}
