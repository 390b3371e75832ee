/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::country
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Resolve the host's two-letter country code for package
    mirror selection: preset value, timezone heuristic, then
    an ordered chain of public geolocation services.

  Security / Safety Notes:
    Performs read-only HTTPS GET requests; nothing about the
    host is transmitted beyond the request itself. Endpoints
    are compiled in and not operator-configurable.

  Dependencies:
    reqwest for HTTP, serde_json for field extraction,
    tokio OnceCell for the process-lifetime cache.

  Operational Scope:
    Consulted lazily by the package installer, only when a
    package actually needs installing.

  Revision History:
    2025-11-12 COD  Implemented geolocation fallback chain.
    2025-11-19 COD  Shared fallible HTTP client for the chain.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Bounded waits; every probe carries its own timeout
    - Probe failures are absorbed, never escalated
    - Single resolution per process
============================================================*/

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::error::{PreflightError, Result};
use crate::logger::Logger;

/// Per-provider request timeout.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Geolocation services in the order they are consulted, with the JSON
/// pointer of the country field in each response.
const PROVIDERS: [(&str, &str, &str); 5] = [
    ("ipapi.is", "https://api.ipapi.is", "/location/country_code"),
    ("ifconfig.co", "https://ifconfig.co/json", "/country_iso"),
    ("ip2location.io", "https://api.ip2location.io", "/country_code"),
    ("ipinfo.io", "https://ipinfo.io/json", "/country"),
    ("myip.com", "https://api.myip.com", "/cc"),
];

/// Timezones that pin the host to a single country.
const TIMEZONE_COUNTRIES: [(&str, &str); 6] = [
    ("asia/harbin", "CN"),
    ("asia/beijing", "CN"),
    ("asia/urumqi", "CN"),
    ("asia/kashgar", "CN"),
    ("asia/shanghai", "CN"),
    ("asia/chongqing", "CN"),
];

/// Providers answer with this when they cannot place an address.
const UNKNOWN_SENTINEL: &str = "XX";

/// ISO 3166-1 alpha-2 code, upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    /// Accept exactly two ASCII letters other than the `XX` sentinel.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != 2 || !raw.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let code = raw.to_ascii_uppercase();
        if code == UNKNOWN_SENTINEL {
            return None;
        }
        Some(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Country implied by a timezone identifier, if it is unambiguous.
pub fn country_from_timezone(timezone: &str) -> Option<CountryCode> {
    let timezone = timezone.trim().to_ascii_lowercase();
    TIMEZONE_COUNTRIES
        .iter()
        .find(|(zone, _)| *zone == timezone)
        .and_then(|(_, code)| CountryCode::parse(code))
}

pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;

/// One geolocation lookup. Implementations return the raw extracted
/// value; validation is applied by [`CountryResolver`].
pub trait CountryProbe {
    fn name(&self) -> &str;
    fn lookup(&self) -> ProbeFuture<'_>;
}

/// Geolocation service answering with a JSON document.
pub struct HttpProbe {
    name: String,
    url: String,
    pointer: String,
    client: reqwest::Client,
}

/// HTTP client shared by every provider in the chain.
pub fn probe_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("Syn-Preflight/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| PreflightError::Runtime(format!("Failed to build HTTP client: {err}")))
}

impl HttpProbe {
    pub fn new(name: &str, url: &str, pointer: &str, client: reqwest::Client) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            pointer: pointer.to_string(),
            client,
        }
    }

    async fn fetch(&self) -> Option<String> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body = response.json::<Value>().await.ok()?;
        body.pointer(&self.pointer)?.as_str().map(str::to_string)
    }
}

impl CountryProbe for HttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self) -> ProbeFuture<'_> {
        Box::pin(self.fetch())
    }
}

/// The compiled-in provider chain.
pub fn default_probes() -> Result<Vec<Box<dyn CountryProbe>>> {
    let client = probe_client(PROBE_TIMEOUT)?;
    Ok(PROVIDERS
        .iter()
        .map(|(name, url, pointer)| {
            Box::new(HttpProbe::new(name, url, pointer, client.clone())) as Box<dyn CountryProbe>
        })
        .collect())
}

/// Resolves the country once and serves the cached answer afterwards.
pub struct CountryResolver {
    timezone: Option<String>,
    probes: Vec<Box<dyn CountryProbe>>,
    resolved: OnceCell<Option<CountryCode>>,
}

impl CountryResolver {
    /// A valid `preset` is cached immediately and no lookup ever runs.
    pub fn new(
        preset: Option<CountryCode>,
        timezone: Option<String>,
        probes: Vec<Box<dyn CountryProbe>>,
    ) -> Self {
        Self {
            timezone,
            probes,
            resolved: OnceCell::new_with(preset.map(Some)),
        }
    }

    /// The cached code, without triggering resolution.
    pub fn cached(&self) -> Option<&CountryCode> {
        self.resolved.get().and_then(Option::as_ref)
    }

    /// Resolve on first call; later calls return the cached outcome,
    /// including an unresolved one.
    pub async fn resolve(&self, logger: &Logger) -> Option<&CountryCode> {
        self.resolved
            .get_or_init(|| self.run_chain(logger))
            .await
            .as_ref()
    }

    async fn run_chain(&self, logger: &Logger) -> Option<CountryCode> {
        if let Some(code) = self.timezone.as_deref().and_then(country_from_timezone) {
            logger.info("COUNTRY", format!("Timezone implies country {code}"));
            return Some(code);
        }

        for probe in &self.probes {
            match probe.lookup().await {
                Some(raw) => match CountryCode::parse(&raw) {
                    Some(code) => {
                        logger.info(
                            "COUNTRY",
                            format!("{} reported country {code}", probe.name()),
                        );
                        return Some(code);
                    }
                    None => logger.debug(
                        "PROBE",
                        format!("{} returned unusable value `{raw}`", probe.name()),
                    ),
                },
                None => logger.debug("PROBE", format!("{}: no answer", probe.name())),
            }
        }

        logger.info(
            "COUNTRY",
            "Country unresolved; default package mirrors will be used",
        );
        None
    }
}
