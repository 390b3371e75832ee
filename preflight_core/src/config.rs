/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load Syn-Preflight file configuration: log locations,
    host mount points, and apt source settings.

  Security / Safety Notes:
    Configuration is read-only; missing files fall back to
    built-in defaults rather than failing.

  Dependencies:
    serde + toml for parsing, dirs for XDG locations.

  Operational Scope:
    Loaded once at startup. Resource directives (RAM_SIZE,
    CPU_CORES, ...) come from the CLI/environment instead.

  Revision History:
    2025-11-12 COD  Introduced layered configuration file.
    2025-11-19 COD  Empty status_page disables the page.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit defaults for every key
    - Unknown keys rejected to surface typos early
============================================================*/

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::error::{PreflightError, Result};

const APP_DIR: &str = "syn-preflight";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreflightConfig {
    pub paths: PathsConfig,
    pub apt: AptConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub log_dir: Option<PathBuf>,
    pub shared_memory: PathBuf,
    /// Page served by the status webserver; an empty string disables it.
    #[serde(deserialize_with = "non_empty_path")]
    pub status_page: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            shared_memory: PathBuf::from("/dev/shm"),
            status_page: Some(PathBuf::from("/run/shm/msg.html")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AptConfig {
    pub sources: PathBuf,
    /// Host replaced when a regional mirror is selected.
    pub default_host: String,
}

impl Default for AptConfig {
    fn default() -> Self {
        Self {
            sources: PathBuf::from("/etc/apt/sources.list.d/debian.sources"),
            default_host: "deb.debian.org".to_string(),
        }
    }
}

impl PreflightConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            PreflightError::Config(format!(
                "Failed to read config {}: {err}",
                path.display()
            ))
        })?;
        toml::from_str(&raw).map_err(|err| {
            PreflightError::Config(format!("Invalid config {}: {err}", path.display()))
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.paths.log_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("logs")
        })
    }
}

fn non_empty_path<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let path = PathBuf::deserialize(deserializer)?;
    Ok((!path.as_os_str().is_empty()).then_some(path))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_container_layout() {
        let config = PreflightConfig::default();
        assert_eq!(config.paths.shared_memory, PathBuf::from("/dev/shm"));
        assert_eq!(
            config.apt.sources,
            PathBuf::from("/etc/apt/sources.list.d/debian.sources")
        );
        assert_eq!(config.apt.default_host, "deb.debian.org");
        assert_eq!(
            config.paths.status_page,
            Some(PathBuf::from("/run/shm/msg.html"))
        );
        assert!(config.log_dir().ends_with("syn-preflight/logs"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[paths]\nlog_dir = \"/var/log/preflight\"\n\n[apt]\ndefault_host = \"ftp.debian.org\"\n",
        )
        .unwrap();

        let config = PreflightConfig::load_from_optional_path(Some(&path)).unwrap();
        assert_eq!(config.log_dir(), PathBuf::from("/var/log/preflight"));
        assert_eq!(config.apt.default_host, "ftp.debian.org");
        assert_eq!(config.paths.shared_memory, PathBuf::from("/dev/shm"));
    }

    #[test]
    fn status_page_can_be_moved_or_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[paths]\nstatus_page = \"/srv/msg.html\"\n").unwrap();
        let config = PreflightConfig::load_from_optional_path(Some(&path)).unwrap();
        assert_eq!(config.paths.status_page, Some(PathBuf::from("/srv/msg.html")));

        std::fs::write(&path, "[paths]\nstatus_page = \"\"\n").unwrap();
        let config = PreflightConfig::load_from_optional_path(Some(&path)).unwrap();
        assert_eq!(config.paths.status_page, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[apt]\nmirror = \"x\"\n").unwrap();
        assert!(matches!(
            PreflightConfig::load_from_optional_path(Some(&path)),
            Err(PreflightError::Config(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(PreflightConfig::load_from_optional_path(Some(&missing)).is_err());
    }
}
