//! # Conduit Fill Calculation
//!
//! Checks that a raceway's cross-section is not overfilled by its conductors
//! per NEC Chapter 9, Tables 1, 4 and 5.
//!
//! The result reports two different numbers on purpose:
//!
//! - `fill_percentage` - conductor area as a share of the raceway's raw area
//!   ("how full is it")
//! - `within_limits` - conductor area against the cap for this conductor
//!   count ("is it legal")
//!
//! ## Example
//!
//! ```rust
//! use elec_core::calculations::conduit_fill::{calculate, ConduitDescriptor};
//! use elec_core::categories::ConduitType;
//! use elec_core::gauge::Gauge;
//! use elec_core::wire::WireSpec;
//!
//! let conduit = ConduitDescriptor::standard(ConduitType::Emt, "1/2");
//! let wires = vec![WireSpec::wire(Gauge::parse("12").unwrap(), 4)];
//!
//! let result = calculate(&conduit, &wires).unwrap();
//! assert_eq!(result.conductor_count, 4);
//! assert_eq!(result.allowed_fill_percentage, 40.0);
//! assert!(result.within_limits);
//! ```

use serde::{Deserialize, Serialize};

use crate::categories::{ConduitType, Insulation};
use crate::code_tables::CodeTables;
use crate::errors::{CalcError, CalcResult};
use crate::gauge::Gauge;
use crate::wire::WireSpec;

/// The raceway being filled.
///
/// Without `internal_area_sq_in` the area comes from Chapter 9, Table 4.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConduitDescriptor {
    pub conduit_type: ConduitType,

    /// Trade size, e.g. "3/4", "1-1/4"
    pub trade_size: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_area_sq_in: Option<f64>,
}

impl ConduitDescriptor {
    pub fn standard(conduit_type: ConduitType, trade_size: impl Into<String>) -> Self {
        ConduitDescriptor {
            conduit_type,
            trade_size: trade_size.into(),
            internal_area_sq_in: None,
        }
    }

    pub fn with_area(conduit_type: ConduitType, trade_size: impl Into<String>, area_sq_in: f64) -> Self {
        ConduitDescriptor {
            conduit_type,
            trade_size: trade_size.into(),
            internal_area_sq_in: Some(area_sq_in),
        }
    }

    pub fn resolve_area(&self, tables: &CodeTables) -> CalcResult<f64> {
        match self.internal_area_sq_in {
            Some(area) if area > 0.0 && area.is_finite() => Ok(area),
            Some(area) => Err(CalcError::invalid_input(
                "internal_area_sq_in",
                area.to_string(),
                "Conduit area must be positive",
            )),
            None => tables.conduit_area(self.conduit_type, &self.trade_size),
        }
    }
}

/// Input for a labelled conduit fill item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConduitFillInput {
    pub label: String,

    pub conduit: ConduitDescriptor,

    #[serde(default)]
    pub wires: Vec<WireSpec>,
}

impl ConduitFillInput {
    pub fn calculate(&self, tables: &CodeTables) -> CalcResult<ConduitFillResult> {
        calculate_with(tables, &self.conduit, &self.wires)
    }
}

/// Conductors of one insulation/gauge/area, merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAreaDetail {
    pub insulation: Insulation,
    pub gauge: Gauge,
    pub quantity: u64,
    pub area_per_wire_sq_in: f64,
    pub total_area_sq_in: f64,
}

/// Results from conduit fill calculation.
///
/// ## JSON Example
///
/// ```json
/// {
///   "conduit_type": "emt",
///   "trade_size": "1/2",
///   "conduit_area_sq_in": 0.304,
///   "total_conductor_area_sq_in": 0.0532,
///   "conductor_count": 4,
///   "allowed_fill_percentage": 40.0,
///   "max_allowed_area_sq_in": 0.1216,
///   "fill_percentage": 17.5,
///   "within_limits": true,
///   "wires": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConduitFillResult {
    pub conduit_type: ConduitType,
    pub trade_size: String,
    pub conduit_area_sq_in: f64,
    pub total_conductor_area_sq_in: f64,
    pub conductor_count: u64,
    /// Chapter 9, Table 1 cap for `conductor_count`, as a percentage
    pub allowed_fill_percentage: f64,
    pub max_allowed_area_sq_in: f64,
    /// Share of the raw raceway area; independent of the cap
    pub fill_percentage: f64,
    pub within_limits: bool,
    pub wires: Vec<WireAreaDetail>,
}

impl ConduitFillResult {
    /// Area still usable under the cap (negative when over)
    pub fn remaining_allowed_area_sq_in(&self) -> f64 {
        self.max_allowed_area_sq_in - self.total_conductor_area_sq_in
    }
}

/// Conduit fill with the embedded NEC 2023 tables.
pub fn calculate(conduit: &ConduitDescriptor, wires: &[WireSpec]) -> CalcResult<ConduitFillResult> {
    calculate_with(CodeTables::nec_2023(), conduit, wires)
}

/// Area of one conductor: the override when given, else Table 5.
fn conductor_area(tables: &CodeTables, spec: &WireSpec) -> CalcResult<f64> {
    match spec.area_sq_in {
        Some(area) => Ok(area),
        None => tables.conductor_area(spec.insulation(), &spec.gauge),
    }
}

/// Conduit fill against a specific set of code tables.
///
/// # Errors
///
/// * `InvalidInput` - non-positive area, negative quantity, a non-conductor
///   entry (device, clamp, fitting), or no conductors at all
/// * `UnknownGauge` - no Table 5 area for an entry's insulation and gauge
/// * `UnknownCodeLookup` - no area supplied and the trade size is not in Table 4
pub fn calculate_with(
    tables: &CodeTables,
    conduit: &ConduitDescriptor,
    wires: &[WireSpec],
) -> CalcResult<ConduitFillResult> {
    let conduit_area = conduit.resolve_area(tables)?;

    let mut details: Vec<WireAreaDetail> = Vec::new();
    for spec in wires {
        spec.validate()?;
        if !spec.conductor_type.is_conductor() {
            return Err(CalcError::invalid_input(
                "conductor_type",
                spec.conductor_type.code(),
                "Only wires and grounds occupy conduit area",
            ));
        }
        let area = conductor_area(tables, spec)?;
        let quantity = spec.count();
        if quantity == 0 {
            continue;
        }

        let insulation = spec.insulation();
        match details.iter_mut().find(|d| {
            d.insulation == insulation && d.gauge == spec.gauge && d.area_per_wire_sq_in == area
        }) {
            Some(detail) => {
                detail.quantity += quantity;
                detail.total_area_sq_in = detail.quantity as f64 * area;
            }
            None => details.push(WireAreaDetail {
                insulation,
                gauge: spec.gauge.clone(),
                quantity,
                area_per_wire_sq_in: area,
                total_area_sq_in: quantity as f64 * area,
            }),
        }
    }

    let conductor_count: u64 = details.iter().map(|d| d.quantity).sum();
    let allowed_fill_percentage = tables.conduit_fill_cap(conductor_count)?;

    let total_conductor_area_sq_in: f64 = details.iter().map(|d| d.total_area_sq_in).sum();
    let max_allowed_area_sq_in = conduit_area * allowed_fill_percentage / 100.0;
    let within_limits = total_conductor_area_sq_in <= max_allowed_area_sq_in;

    let result = ConduitFillResult {
        conduit_type: conduit.conduit_type,
        trade_size: conduit.trade_size.clone(),
        conduit_area_sq_in: conduit_area,
        total_conductor_area_sq_in,
        conductor_count,
        allowed_fill_percentage,
        max_allowed_area_sq_in,
        fill_percentage: total_conductor_area_sq_in / conduit_area * 100.0,
        within_limits,
        wires: details,
    };

    tracing::debug!(
        conduit_area_sq_in = result.conduit_area_sq_in,
        conductor_area_sq_in = result.total_conductor_area_sq_in,
        conductor_count = result.conductor_count,
        fill_percentage = result.fill_percentage,
        "conduit fill calculated"
    );
    if !within_limits {
        tracing::warn!(
            fill_percentage = result.fill_percentage,
            allowed = result.allowed_fill_percentage,
            "conduit fill exceeds allowed percentage"
        );
    }

    Ok(result)
}

/// Upper bound of [`max_identical_conductors`], the largest quantity a
/// [`WireSpec`] line can carry.
pub const MAX_IDENTICAL_CONDUCTORS: u64 = i32::MAX as u64;

/// Largest number of identical conductors the raceway can legally hold.
///
/// Accounts for the cap changing with count: two conductors may not fit at
/// 31% while three fit at 40%. The answer saturates at
/// [`MAX_IDENTICAL_CONDUCTORS`].
pub fn max_identical_conductors(
    tables: &CodeTables,
    conduit: &ConduitDescriptor,
    spec: &WireSpec,
) -> CalcResult<u64> {
    spec.validate()?;
    if !spec.conductor_type.is_conductor() {
        return Err(CalcError::invalid_input(
            "conductor_type",
            spec.conductor_type.code(),
            "Only wires and grounds occupy conduit area",
        ));
    }
    let conduit_area = conduit.resolve_area(tables)?;
    let area = conductor_area(tables, spec)?;

    let fits = |n: u64| -> CalcResult<bool> {
        let cap = tables.conduit_fill_cap(n)?;
        Ok(n as f64 * area <= conduit_area * cap / 100.0)
    };

    let mut best = 0;
    for n in 1..=2 {
        if fits(n)? {
            best = n;
        }
    }

    let cap = tables.conduit_fill_cap(3)?;
    let estimate = (conduit_area * cap / 100.0 / area).floor();
    let mut n = if estimate >= MAX_IDENTICAL_CONDUCTORS as f64 {
        MAX_IDENTICAL_CONDUCTORS
    } else {
        estimate as u64
    };
    while n >= 3 && !fits(n)? {
        n -= 1;
    }
    while n >= 2 && n < MAX_IDENTICAL_CONDUCTORS && fits(n + 1)? {
        n += 1;
    }
    if n >= 3 && fits(n)? {
        best = n;
    }
    Ok(best)
}
