//! Wire gauge designations.
//!
//! A [`Gauge`] is a normalized categorical code. Field entry is forgiving
//! ("14", "#14", "14awg", "250MCM", "00") but every accepted spelling maps to
//! one canonical form so code-table lookups are exact:
//!
//! - AWG sizes: `"14 AWG"`, `"1/0 AWG"`
//! - Large sizes: `"250 kcmil"`
//!
//! Whether a gauge is *known* is a question for the code tables, not the
//! parser: `"3 AWG"` parses fine but has no box-fill allowance.
//!
//! ```rust
//! use elec_core::gauge::Gauge;
//!
//! let g: Gauge = "#12".parse().unwrap();
//! assert_eq!(g.as_str(), "12 AWG");
//! assert_eq!(Gauge::parse("00").unwrap().as_str(), "2/0 AWG");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Normalized wire size code
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gauge(String);

impl Gauge {
    /// Parse and normalize a gauge designation.
    pub fn parse(text: &str) -> CalcResult<Self> {
        let compact: String = text
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let compact = compact.trim_start_matches('#');

        let invalid = || {
            CalcError::invalid_input(
                "gauge",
                text,
                "Expected an AWG size (e.g. 14, 1/0) or kcmil size (e.g. 250 kcmil)",
            )
        };

        if compact.is_empty() {
            return Err(invalid());
        }

        for suffix in ["kcmil", "mcm"] {
            if let Some(number) = compact.strip_suffix(suffix) {
                let kcmil: u32 = number.parse().map_err(|_| invalid())?;
                if kcmil == 0 {
                    return Err(invalid());
                }
                return Ok(Gauge(format!("{} kcmil", kcmil)));
            }
        }

        let awg = compact.strip_suffix("awg").unwrap_or(compact);

        // "0", "00", ... are the trade shorthand for 1/0 through 4/0
        if !awg.is_empty() && awg.len() <= 4 && awg.chars().all(|c| c == '0') {
            return Ok(Gauge(format!("{}/0 AWG", awg.len())));
        }

        if let Some(aughts) = awg.strip_suffix("/0") {
            return match aughts.parse::<u8>() {
                Ok(n @ 1..=4) => Ok(Gauge(format!("{}/0 AWG", n))),
                _ => Err(invalid()),
            };
        }

        match awg.parse::<u8>() {
            Ok(n @ 1..=40) => Ok(Gauge(format!("{} AWG", n))),
            _ => Err(invalid()),
        }
    }

    /// Canonical text form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Gauge {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gauge::parse(s)
    }
}

impl TryFrom<String> for Gauge {
    type Error = CalcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Gauge::parse(&value)
    }
}

impl From<Gauge> for String {
    fn from(gauge: Gauge) -> Self {
        gauge.0
    }
}
