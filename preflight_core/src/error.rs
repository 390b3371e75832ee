/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Syn-Preflight error types so every failing
    pre-flight step maps to one diagnostic and one exit code.

  Security / Safety Notes:
    Diagnostics carry operator-supplied values (sizes, paths,
    package names) only; no host secrets are echoed.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Returned by every validation and provisioning step and
    consumed once by the binary entry point.

  Revision History:
    2025-11-12 COD  Established pre-flight error taxonomy.
    2025-11-19 COD  Added single-line operator diagnostic.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable exit codes for the launcher scripts
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

use crate::size::SizeError;

/// Result alias for Syn-Preflight operations.
pub type Result<T> = std::result::Result<T, PreflightError>;

/// Enumerates high-level error domains surfaced by Syn-Preflight.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("Storage folder ({path}) not found")]
    StorageMissing { path: String },
    #[error("Shared memory folder ({path}) not found, mount /dev/shm into the container")]
    SharedMemoryMissing { path: String },
    #[error("Invalid amount of CPU_CORES: {value}")]
    InvalidCores { value: String },
    #[error(transparent)]
    MemorySize(#[from] SizeError),
    #[error(
        "Your configured RAM_SIZE of {wanted} is too high for the {available} of memory available, please set a lower value"
    )]
    MemoryExceeded { wanted: String, available: String },
    #[error("Required command `{command}` not found in PATH")]
    CommandMissing { command: String },
    #[error("Command `{command}` failed with status {status}: {stderr}")]
    CommandFailure {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PreflightError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            PreflightError::StorageMissing { .. } => 13,
            PreflightError::SharedMemoryMissing { .. } => 14,
            PreflightError::InvalidCores { .. } => 15,
            PreflightError::MemorySize(_) => 16,
            PreflightError::MemoryExceeded { .. } => 17,
            PreflightError::CommandMissing { .. } => 10,
            PreflightError::CommandFailure { .. } => 11,
            PreflightError::Config(_) => 20,
            PreflightError::Serialization(_) => 31,
            PreflightError::Filesystem(_) => 40,
            PreflightError::Io(_) => 41,
            PreflightError::Runtime(_) => 50,
        }
    }

    /// Name the pre-flight step that produced this error.
    pub fn step(&self) -> &'static str {
        match self {
            PreflightError::StorageMissing { .. } => "storage",
            PreflightError::SharedMemoryMissing { .. } => "shared-memory",
            PreflightError::InvalidCores { .. } => "cpu",
            PreflightError::MemorySize(_) | PreflightError::MemoryExceeded { .. } => "memory",
            PreflightError::CommandMissing { .. } | PreflightError::CommandFailure { .. } => {
                "install"
            }
            PreflightError::Config(_) => "config",
            PreflightError::Serialization(_) => "report",
            PreflightError::Filesystem(_) | PreflightError::Io(_) => "filesystem",
            PreflightError::Runtime(_) => "runtime",
        }
    }

    /// The single operator-facing line printed before exiting.
    pub fn diagnostic(&self) -> String {
        format!("[Syn-Preflight] {}: {self}", self.step())
    }
}
