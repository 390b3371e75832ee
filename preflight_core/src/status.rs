/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::status
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Publish the current progress message to the page served
    by the launcher's status webserver while the VM is not
    yet reachable.

  Security / Safety Notes:
    Messages are HTML-escaped before being written.

  Dependencies:
    std::fs only.

  Operational Scope:
    Updated by the package installer before long-running
    installs.

  Revision History:
    2025-11-12 COD  Added live status page writer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Whole-file replacement so readers never see partial text
============================================================*/

use std::path::{Path, PathBuf};

use crate::error::{PreflightError, Result};

/// File-backed live status surface. Disabled when no path is set.
pub struct StatusPage {
    path: Option<PathBuf>,
}

impl StatusPage {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn publish(&self, message: &str) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let body = format!("<p>{}</p>\n", escape_html(message));
        let staging = path.with_extension("tmp");
        let parent = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)
            .and_then(|_| std::fs::write(&staging, body))
            .and_then(|_| std::fs::rename(&staging, path))
            .map_err(|err| {
                PreflightError::Filesystem(format!(
                    "Failed to update status page {}: {err}",
                    path.display()
                ))
            })
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
