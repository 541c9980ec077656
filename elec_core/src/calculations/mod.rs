//! # Code-Compliance Calculations
//!
//! Each calculation follows the same pattern:
//!
//! - `*Input` - labelled input parameters (JSON-serializable)
//! - `*Result` - calculation results (JSON-serializable)
//! - `calculate(...)` / `calculate_with(tables, ...)` - pure functions that
//!   either return a complete result or a [`CalcError`](crate::errors::CalcError)
//!
//! Calculators never touch storage. They read [`CodeTables`] and their
//! arguments, nothing else, so they can run concurrently without
//! coordination.
//!
//! ## Available Calculations
//!
//! - [`box_fill`] - Outlet/junction box volume (NEC 314.16)
//! - [`conduit_fill`] - Raceway cross-sectional fill (NEC Chapter 9)
//! - [`dwelling_load`] - Dwelling service load (NEC Article 220)
//! - [`voltage_drop`] - Circuit voltage drop (NEC Chapter 9, Tables 8 and 9)

pub mod box_fill;
pub mod conduit_fill;
pub mod dwelling_load;
pub mod voltage_drop;

use serde::{Deserialize, Serialize};

use crate::code_tables::CodeTables;
use crate::errors::CalcResult;

pub use box_fill::{BoxDescriptor, BoxFillInput, BoxFillResult, ComponentAllowance};
pub use conduit_fill::{ConduitDescriptor, ConduitFillInput, ConduitFillResult, WireAreaDetail};
pub use dwelling_load::{
    ApplianceLoadDetail, ApplianceSpec, DwellingDescriptor, DwellingLoadInput, DwellingLoadResult,
};
pub use voltage_drop::{CircuitDescriptor, VoltageDropInput, VoltageDropResult};

/// Enum wrapper for all calculation inputs.
///
/// ## JSON Example
///
/// ```json
/// {
///   "type": "BoxFill",
///   "label": "Kitchen J-box",
///   "box": { "box_type": "square", "dimensions": "4x4x1.5" },
///   "wires": [{ "gauge": "12 AWG", "quantity": 4 }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalculationItem {
    BoxFill(BoxFillInput),
    ConduitFill(ConduitFillInput),
    DwellingLoad(DwellingLoadInput),
    VoltageDrop(VoltageDropInput),
}

impl CalculationItem {
    /// Get the user-provided label for this calculation
    pub fn label(&self) -> &str {
        match self {
            CalculationItem::BoxFill(b) => &b.label,
            CalculationItem::ConduitFill(c) => &c.label,
            CalculationItem::DwellingLoad(d) => &d.label,
            CalculationItem::VoltageDrop(v) => &v.label,
        }
    }

    /// Get the calculation type as a string
    pub fn calc_type(&self) -> &'static str {
        match self {
            CalculationItem::BoxFill(_) => "BoxFill",
            CalculationItem::ConduitFill(_) => "ConduitFill",
            CalculationItem::DwellingLoad(_) => "DwellingLoad",
            CalculationItem::VoltageDrop(_) => "VoltageDrop",
        }
    }

    pub fn calculate(&self, tables: &CodeTables) -> CalcResult<CalculationOutcome> {
        Ok(match self {
            CalculationItem::BoxFill(input) => CalculationOutcome::BoxFill(input.calculate(tables)?),
            CalculationItem::ConduitFill(input) => {
                CalculationOutcome::ConduitFill(input.calculate(tables)?)
            }
            CalculationItem::DwellingLoad(input) => {
                CalculationOutcome::DwellingLoad(input.calculate(tables)?)
            }
            CalculationItem::VoltageDrop(input) => {
                CalculationOutcome::VoltageDrop(input.calculate(tables)?)
            }
        })
    }
}

/// Result of running a [`CalculationItem`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalculationOutcome {
    BoxFill(BoxFillResult),
    ConduitFill(ConduitFillResult),
    DwellingLoad(DwellingLoadResult),
    VoltageDrop(VoltageDropResult),
}

impl CalculationOutcome {
    /// Pass/fail verdict. Dwelling loads have no limit of their own.
    pub fn within_limits(&self) -> bool {
        match self {
            CalculationOutcome::BoxFill(r) => r.within_limits,
            CalculationOutcome::ConduitFill(r) => r.within_limits,
            CalculationOutcome::DwellingLoad(_) => true,
            CalculationOutcome::VoltageDrop(r) => r.within_limits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_from_json() {
        let json = r#"{
            "type": "ConduitFill",
            "label": "Feeder",
            "conduit": { "conduit_type": "emt", "trade_size": "1/2" },
            "wires": [{ "gauge": "12", "quantity": 10 }]
        }"#;
        let item: CalculationItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.label(), "Feeder");
        assert_eq!(item.calc_type(), "ConduitFill");

        let outcome = item.calculate(CodeTables::nec_2023()).unwrap();
        assert!(!outcome.within_limits());
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"type\":\"ConduitFill\""));
    }

    #[test]
    fn test_dwelling_item_always_within_limits() {
        let item = CalculationItem::DwellingLoad(DwellingLoadInput {
            label: "House".to_string(),
            dwelling: DwellingDescriptor::new("House", 1200.0, 240),
            appliances: vec![],
        });
        let outcome = item.calculate(CodeTables::nec_2023()).unwrap();
        assert!(outcome.within_limits());
    }

    #[test]
    fn test_voltage_drop_item_from_json() {
        let json = r#"{
            "type": "VoltageDrop",
            "label": "Shop feeder",
            "circuit": { "gauge": "12", "length_ft": 100.0, "load_amps": 20.0, "source_voltage": 120.0 }
        }"#;
        let item: CalculationItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.label(), "Shop feeder");
        assert_eq!(item.calc_type(), "VoltageDrop");

        let outcome = item.calculate(CodeTables::nec_2023()).unwrap();
        assert!(!outcome.within_limits());
        match outcome {
            CalculationOutcome::VoltageDrop(r) => assert!((r.voltage_drop_volts - 7.72).abs() < 1e-9),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_errors_propagate() {
        let json = r#"{
            "type": "BoxFill",
            "label": "Bad",
            "box": { "box_type": "device", "dimensions": "9x9x9" },
            "wires": []
        }"#;
        let item: CalculationItem = serde_json::from_str(json).unwrap();
        let err = item.calculate(CodeTables::nec_2023()).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_CODE_LOOKUP");
    }
}
