/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::storage
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Derive disk engine tuning hints (DISK_IO / DISK_CACHE)
    from the filesystem backing the storage folder.

  Security / Safety Notes:
    Static lookup only.

  Dependencies:
    serde for report serialization.

  Operational Scope:
    Consulted after the storage filesystem type is detected.

  Revision History:
    2025-11-12 COD  Added filesystem profile table.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Hints are paired so partial tuning cannot be expressed
============================================================*/

use serde::Serialize;

/// Asynchronous I/O backend for the disk engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IoMode {
    Threads,
}

impl IoMode {
    pub fn as_str(self) -> &'static str {
        match self {
            IoMode::Threads => "threads",
        }
    }
}

/// Host page cache mode for the disk engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    Writeback,
}

impl CacheMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheMode::Writeback => "writeback",
        }
    }
}

/// I/O and cache modes, always set together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiskHints {
    pub io_mode: IoMode,
    pub cache_mode: CacheMode,
}

/// Tuning profile for one filesystem type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilesystemProfile {
    pub filesystem: String,
    /// `None` means the engine defaults apply.
    pub hints: Option<DiskHints>,
}

impl FilesystemProfile {
    pub fn for_filesystem(filesystem: &str) -> Self {
        // ecryptfs and tmpfs reject O_DIRECT, which native AIO with
        // cache=none requires.
        let hints = match filesystem.to_ascii_lowercase().as_str() {
            "ecryptfs" | "tmpfs" => Some(DiskHints {
                io_mode: IoMode::Threads,
                cache_mode: CacheMode::Writeback,
            }),
            _ => None,
        };
        Self {
            filesystem: filesystem.to_string(),
            hints,
        }
    }

    pub fn io_mode(&self) -> Option<IoMode> {
        self.hints.map(|hints| hints.io_mode)
    }

    pub fn cache_mode(&self) -> Option<CacheMode> {
        self.hints.map(|hints| hints.cache_mode)
    }
}
