//! # Dwelling Load Calculation
//!
//! Total electrical demand of a dwelling unit for sizing the service
//! entrance and panel (NEC Article 220, standard method).
//!
//! ## Method
//!
//! 1. General lighting: square footage × lighting factor (3 VA/ft²).
//! 2. Lighting, non-motor appliances and the small-appliance and laundry
//!    circuits share one progressive demand-factor schedule (Table 220.42).
//!    Lighting fills the schedule from zero; the appliance pool continues
//!    from the cumulative position where lighting ends.
//! 3. Motors stay out of the demand pool. The largest motor entry
//!    (wattage × quantity) counts at 125%, every other motor at 100%.
//! 4. Total VA / service voltage gives the service current.
//!
//! ## Example
//!
//! ```rust
//! use elec_core::calculations::dwelling_load::{calculate, ApplianceSpec, DwellingDescriptor};
//!
//! let dwelling = DwellingDescriptor::new("Smith residence", 1500.0, 240);
//! let appliances = vec![ApplianceSpec::motor("Well pump", 1000.0, 240.0, 1)];
//!
//! let result = calculate(&dwelling, &appliances).unwrap();
//! assert_eq!(result.general_lighting_va, 4500.0);
//! // 3000 at 100% + 1500 at 35%
//! assert_eq!(result.lighting_demand_va, 3525.0);
//! assert_eq!(result.largest_motor_va, 1250.0);
//! assert_eq!(result.total_va, 4775.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::code_tables::CodeTables;
use crate::errors::{CalcError, CalcResult};

/// The dwelling being calculated.
///
/// ## JSON Example
///
/// ```json
/// {
///   "name": "Unit 2B",
///   "square_footage": 1500.0,
///   "service_voltage": 240,
///   "small_appliance_circuits": 2,
///   "laundry_circuits": 1
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellingDescriptor {
    pub name: String,

    pub square_footage: f64,

    /// Nominal service voltage, typically 240
    pub service_voltage: i32,

    /// 20 A small-appliance branch circuits (220.52(A)), 2 when absent
    #[serde(default = "default_small_appliance_circuits")]
    pub small_appliance_circuits: u32,

    /// Laundry branch circuits (220.52(B)), 1 when absent
    #[serde(default = "default_laundry_circuits")]
    pub laundry_circuits: u32,
}

/// Minimum small-appliance circuits a dwelling kitchen requires (210.11(C)(1))
pub const MIN_SMALL_APPLIANCE_CIRCUITS: u32 = 2;

/// Minimum laundry circuits where laundry facilities exist (210.11(C)(2))
pub const MIN_LAUNDRY_CIRCUITS: u32 = 1;

fn default_small_appliance_circuits() -> u32 {
    MIN_SMALL_APPLIANCE_CIRCUITS
}

fn default_laundry_circuits() -> u32 {
    MIN_LAUNDRY_CIRCUITS
}

impl DwellingDescriptor {
    pub fn new(name: impl Into<String>, square_footage: f64, service_voltage: i32) -> Self {
        DwellingDescriptor {
            name: name.into(),
            square_footage,
            service_voltage,
            small_appliance_circuits: 0,
            laundry_circuits: 0,
        }
    }

    pub fn with_circuits(mut self, small_appliance: u32, laundry: u32) -> Self {
        self.small_appliance_circuits = small_appliance;
        self.laundry_circuits = laundry;
        self
    }

    /// The code minimum of two small-appliance and one laundry circuit.
    pub fn with_minimum_circuits(self) -> Self {
        self.with_circuits(MIN_SMALL_APPLIANCE_CIRCUITS, MIN_LAUNDRY_CIRCUITS)
    }

    pub fn validate(&self) -> CalcResult<()> {
        if !(self.square_footage > 0.0 && self.square_footage.is_finite()) {
            return Err(CalcError::invalid_input(
                "square_footage",
                self.square_footage.to_string(),
                "Square footage must be positive",
            ));
        }
        if self.service_voltage <= 0 {
            return Err(CalcError::invalid_input(
                "service_voltage",
                self.service_voltage.to_string(),
                "Service voltage must be positive",
            ));
        }
        Ok(())
    }
}

/// One appliance line of the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceSpec {
    pub name: String,

    /// Nameplate rating in watts (treated as VA)
    pub wattage: f64,

    pub voltage_rating: f64,

    #[serde(default)]
    pub is_motor_load: bool,

    pub quantity: i32,
}

impl ApplianceSpec {
    pub fn new(name: impl Into<String>, wattage: f64, voltage_rating: f64, quantity: i32) -> Self {
        ApplianceSpec {
            name: name.into(),
            wattage,
            voltage_rating,
            is_motor_load: false,
            quantity,
        }
    }

    pub fn motor(name: impl Into<String>, wattage: f64, voltage_rating: f64, quantity: i32) -> Self {
        ApplianceSpec {
            is_motor_load: true,
            ..Self::new(name, wattage, voltage_rating, quantity)
        }
    }

    /// Wattage × quantity
    pub fn connected_va(&self) -> f64 {
        self.wattage * f64::from(self.quantity.max(0))
    }

    pub fn validate(&self) -> CalcResult<()> {
        if self.quantity < 0 {
            return Err(CalcError::invalid_input(
                "quantity",
                self.quantity.to_string(),
                format!("Quantity of '{}' cannot be negative", self.name),
            ));
        }
        if !(self.wattage >= 0.0 && self.wattage.is_finite()) {
            return Err(CalcError::invalid_input(
                "wattage",
                self.wattage.to_string(),
                format!("Wattage of '{}' cannot be negative", self.name),
            ));
        }
        if !(self.voltage_rating > 0.0 && self.voltage_rating.is_finite()) {
            return Err(CalcError::invalid_input(
                "voltage_rating",
                self.voltage_rating.to_string(),
                format!("Voltage rating of '{}' must be positive", self.name),
            ));
        }
        Ok(())
    }
}

/// Input for a labelled dwelling load item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellingLoadInput {
    pub label: String,

    pub dwelling: DwellingDescriptor,

    #[serde(default)]
    pub appliances: Vec<ApplianceSpec>,
}

impl DwellingLoadInput {
    pub fn calculate(&self, tables: &CodeTables) -> CalcResult<DwellingLoadResult> {
        calculate_with(tables, &self.dwelling, &self.appliances)
    }
}

/// Per-appliance breakdown line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceLoadDetail {
    pub name: String,
    pub quantity: u32,
    pub connected_va: f64,
    pub is_motor_load: bool,
    /// Current at the appliance's own voltage rating
    pub amps: f64,
    /// True for the motor charged at 125%
    pub is_largest_motor: bool,
}

/// Results from dwelling load calculation.
///
/// ## JSON Example
///
/// ```json
/// {
///   "general_lighting_va": 4500.0,
///   "lighting_demand_va": 3525.0,
///   "appliance_va": 0.0,
///   "largest_motor_va": 1250.0,
///   "other_motor_va": 0.0,
///   "total_va": 4775.0,
///   "total_amps": 19.895833333333332,
///   "connected_va": 5500.0,
///   "recommended_service_amps": 20,
///   "appliances": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellingLoadResult {
    /// Square footage × lighting factor, before demand factors
    pub general_lighting_va: f64,
    /// Lighting after demand factors
    pub lighting_demand_va: f64,
    /// Non-motor appliance and circuit load after demand factors
    pub appliance_va: f64,
    /// 125% of the largest motor entry, 0 without motors
    pub largest_motor_va: f64,
    /// Remaining motor entries at 100%
    pub other_motor_va: f64,
    pub total_va: f64,
    pub total_amps: f64,
    /// Everything at nameplate, before demand factors and motor adders
    pub connected_va: f64,
    pub recommended_service_amps: u32,
    pub appliances: Vec<ApplianceLoadDetail>,
}

/// Dwelling load with the embedded NEC 2023 tables.
pub fn calculate(
    dwelling: &DwellingDescriptor,
    appliances: &[ApplianceSpec],
) -> CalcResult<DwellingLoadResult> {
    calculate_with(CodeTables::nec_2023(), dwelling, appliances)
}

/// Dwelling load against a specific set of code tables.
///
/// # Errors
///
/// * `InvalidInput` - non-positive square footage or voltage, negative
///   quantity or wattage, non-positive appliance voltage rating
pub fn calculate_with(
    tables: &CodeTables,
    dwelling: &DwellingDescriptor,
    appliances: &[ApplianceSpec],
) -> CalcResult<DwellingLoadResult> {
    dwelling.validate()?;
    for appliance in appliances {
        appliance.validate()?;
    }

    let general_lighting_va = dwelling.square_footage * tables.lighting_va_per_sq_ft();

    let circuit_va = f64::from(dwelling.small_appliance_circuits) * tables.small_appliance_circuit_va()
        + f64::from(dwelling.laundry_circuits) * tables.laundry_circuit_va();
    let non_motor_va: f64 = appliances
        .iter()
        .filter(|a| !a.is_motor_load)
        .map(ApplianceSpec::connected_va)
        .sum::<f64>()
        + circuit_va;
    let lighting_demand_va = tables.demanded_va(0.0, general_lighting_va);
    let appliance_va = tables.demanded_va(general_lighting_va, non_motor_va);

    let largest_motor = appliances
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_motor_load)
        .fold(None, |best: Option<(usize, f64)>, (i, a)| {
            let va = a.connected_va();
            match best {
                Some((_, best_va)) if best_va >= va => best,
                _ => Some((i, va)),
            }
        });

    let motor_va: f64 = appliances
        .iter()
        .filter(|a| a.is_motor_load)
        .map(ApplianceSpec::connected_va)
        .sum();
    let (largest_index, largest_motor_va, other_motor_va) = match largest_motor {
        Some((i, va)) => (Some(i), va * tables.largest_motor_factor(), motor_va - va),
        None => (None, 0.0, 0.0),
    };

    let total_va = lighting_demand_va + appliance_va + other_motor_va + largest_motor_va;
    let total_amps = total_va / f64::from(dwelling.service_voltage);

    let details = appliances
        .iter()
        .enumerate()
        .map(|(i, a)| ApplianceLoadDetail {
            name: a.name.clone(),
            quantity: a.quantity.max(0) as u32,
            connected_va: a.connected_va(),
            is_motor_load: a.is_motor_load,
            amps: a.connected_va() / a.voltage_rating,
            is_largest_motor: largest_index == Some(i),
        })
        .collect();

    let result = DwellingLoadResult {
        general_lighting_va,
        lighting_demand_va,
        appliance_va,
        largest_motor_va,
        other_motor_va,
        total_va,
        total_amps,
        connected_va: general_lighting_va + non_motor_va + motor_va,
        recommended_service_amps: tables.recommended_service_amps(total_amps),
        appliances: details,
    };

    tracing::debug!(
        dwelling = %dwelling.name,
        lighting_va = result.general_lighting_va,
        lighting_demand_va = result.lighting_demand_va,
        appliance_va = result.appliance_va,
        total_va = result.total_va,
        total_amps = result.total_amps,
        "dwelling load calculated"
    );

    Ok(result)
}
