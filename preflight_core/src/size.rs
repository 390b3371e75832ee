/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::size
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Normalise operator-supplied memory sizes (RAM_SIZE) into
    byte counts using IEC (1024-based) units.

  Security / Safety Notes:
    Pure parsing; no I/O. Arithmetic is checked so oversized
    inputs are rejected instead of wrapping.

  Dependencies:
    thiserror for the parse error taxonomy.

  Operational Scope:
    Feeds the memory governor during pre-flight validation.

  Revision History:
    2025-11-12 COD  Ported RAM_SIZE normalisation rules.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Legacy bare-number heuristic reproduced verbatim
    - Deterministic normalisation before parsing
    - Explicit error paths for each rejection
============================================================*/

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Smallest accepted memory size (130 MiB).
pub const MIN_SIZE_BYTES: u64 = 136_314_880;

/// Bare numbers below this are whole gigabytes, at or above it megabytes.
const LEGACY_GIGABYTE_LIMIT: u64 = 130;

/// Rejections produced while parsing a size string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SizeError {
    #[error("RAM_SIZE not specified")]
    NotSpecified,
    #[error("Invalid RAM_SIZE: {0}")]
    Invalid(String),
    #[error("RAM_SIZE is too low: {0}")]
    TooLow(String),
}

/// A parsed size directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeSpec {
    raw: String,
    normalized: String,
    bytes: u64,
}

impl SizeSpec {
    /// Parse `input` into a validated size.
    pub fn parse(input: &str) -> Result<Self, SizeError> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(SizeError::NotSpecified);
        }

        let normalized = normalize(&apply_legacy_unit(compact));
        let bytes = parse_iec(&normalized).ok_or_else(|| SizeError::Invalid(normalized.clone()))?;
        if bytes < MIN_SIZE_BYTES {
            return Err(SizeError::TooLow(normalized));
        }

        Ok(Self {
            raw: input.to_string(),
            normalized,
            bytes,
        })
    }

    /// Upper-cased form with unit aliases folded (e.g. `512M`).
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

fn apply_legacy_unit(mut value: String) -> String {
    if !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return value;
    }
    let whole = value.split('.').next().unwrap_or_default();
    let as_gigabytes = if whole.is_empty() {
        true
    } else {
        whole
            .parse::<u64>()
            .map(|n| n < LEGACY_GIGABYTE_LIMIT)
            .unwrap_or(false)
    };
    value.push(if as_gigabytes { 'G' } else { 'M' });
    value
}

fn normalize(value: &str) -> String {
    value
        .to_ascii_uppercase()
        .replace("MB", "M")
        .replace("GB", "G")
        .replace("TB", "T")
}

fn unit_multiplier(unit: char) -> Option<u128> {
    let power = match unit {
        'K' => 1,
        'M' => 2,
        'G' => 3,
        'T' => 4,
        'P' => 5,
        'E' => 6,
        _ => return None,
    };
    Some(1u128 << (10 * power))
}

fn parse_iec(value: &str) -> Option<u64> {
    let (number, multiplier) = match value.chars().last()? {
        c if c.is_ascii_digit() || c == '.' => (value, 1u128),
        unit => (&value[..value.len() - unit.len_utf8()], unit_multiplier(unit)?),
    };

    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    // Digits past the 20th weigh less than a hundredth of a byte even at E.
    let fraction = &fraction[..fraction.len().min(20)];

    let whole_value: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let scale = 10u128.checked_pow(fraction.len() as u32)?;
    let fraction_value: u128 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().ok()?
    };

    let whole_bytes = whole_value.checked_mul(multiplier)?;
    let fraction_bytes = fraction_value.checked_mul(multiplier)?.div_ceil(scale);
    let total = whole_bytes.checked_add(fraction_bytes)?;
    u64::try_from(total).ok()
}
