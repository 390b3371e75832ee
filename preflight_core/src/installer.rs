/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::installer
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Ensure system packages needed by the launcher are present,
    selecting a regional mirror when the host country has one.

  Security / Safety Notes:
    Package names are validated before reaching the package
    manager. Country lookups happen only when an install is
    actually required.

  Dependencies:
    country resolver, apt backend, status page, logger.

  Operational Scope:
    Runs after the pre-flight checks for every package the
    operator or launcher requested.

  Revision History:
    2025-11-12 COD  Authored idempotent package installer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Idempotent: installed packages cost no network traffic
    - Install failures are fatal, never retried
============================================================*/

use std::collections::HashSet;

use crate::apt::{is_valid_package_name, PackageManager};
use crate::country::{CountryCode, CountryResolver};
use crate::error::{PreflightError, Result};
use crate::logger::Logger;
use crate::status::StatusPage;

/// Regional package mirrors keyed by country.
const MIRRORS: [(&str, &str); 1] = [("CN", "mirrors.ustc.edu.cn")];

pub fn mirror_for(country: &CountryCode) -> Option<&'static str> {
    MIRRORS
        .iter()
        .find(|(code, _)| *code == country.as_str())
        .map(|(_, host)| *host)
}

/// A single install request; dropped once handled.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    pub name: String,
    pub description: String,
    pub installed: bool,
}

impl PackageRequest {
    /// Parse `NAME=DESCRIPTION`; the description defaults to the name.
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, description) = match spec.split_once('=') {
            Some((name, description)) => (name.trim(), description.trim()),
            None => (spec.trim(), ""),
        };
        if !is_valid_package_name(name) {
            return Err(PreflightError::Config(format!(
                "Invalid package name `{name}`"
            )));
        }
        let description = if description.is_empty() {
            name
        } else {
            description
        };
        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            installed: false,
        })
    }
}

pub struct PackageInstaller<'a, M: PackageManager> {
    manager: M,
    resolver: &'a CountryResolver,
    logger: &'a Logger,
    status: &'a StatusPage,
    installed: HashSet<String>,
    mirror_applied: bool,
}

impl<'a, M: PackageManager> PackageInstaller<'a, M> {
    pub fn new(
        manager: M,
        resolver: &'a CountryResolver,
        logger: &'a Logger,
        status: &'a StatusPage,
    ) -> Self {
        Self {
            manager,
            resolver,
            logger,
            status,
            installed: HashSet::new(),
            mirror_applied: false,
        }
    }

    /// Install `request` unless it is already present.
    pub async fn ensure(&mut self, mut request: PackageRequest) -> Result<()> {
        request.installed = self.installed.contains(&request.name)
            || self.manager.is_installed(&request.name).await?;
        if request.installed {
            self.logger.debug(
                "PACKAGE",
                format!("{} already installed", request.name),
            );
            self.installed.insert(request.name);
            return Ok(());
        }

        let message = format!("Installing {}...", request.description);
        self.logger.info("PACKAGE", &message);
        self.status.publish(&message)?;

        self.select_mirror().await?;
        self.manager.refresh_index().await?;
        self.manager.install(&request.name).await?;

        self.logger
            .info("PACKAGE", format!("Installed {}", request.name));
        self.installed.insert(request.name);
        Ok(())
    }

    async fn select_mirror(&mut self) -> Result<()> {
        if self.mirror_applied {
            return Ok(());
        }
        let country = match self.resolver.cached() {
            Some(code) => Some(code),
            None => self.resolver.resolve(self.logger).await,
        };
        if let Some(host) = country.and_then(mirror_for) {
            self.manager.use_mirror(host).await?;
            self.logger
                .info("MIRROR", format!("Package sources switched to {host}"));
        }
        self.mirror_applied = true;
        Ok(())
    }

    #[cfg(test)]
    fn manager(&self) -> &M {
        &self.manager
    }
}
