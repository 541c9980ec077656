//! # Voltage Drop Calculation
//!
//! Voltage lost along a circuit run, checked against the recommended limit
//! of the informational notes to 210.19(A) and 215.2(A).
//!
//! ## Method
//!
//! Resistance comes from Chapter 9, Table 8 and reactance from Table 9, both
//! per 1000 ft. For AC circuits the effective impedance follows Table 9,
//! Note 2:
//!
//! ```text
//! Ze = R × PF + X × sin(acos PF)
//! ```
//!
//! DC circuits use R alone. The drop is `I × Ze × multiplier`, where the
//! multiplier is 2 for single-phase and DC runs and √3 for three-phase.
//!
//! ## Example
//!
//! ```rust
//! use elec_core::calculations::voltage_drop::{calculate, CircuitDescriptor};
//! use elec_core::gauge::Gauge;
//!
//! // 20 A on 100 ft of 12 AWG copper at 120 V
//! let circuit = CircuitDescriptor::single_phase(Gauge::parse("12").unwrap(), 100.0, 20.0, 120.0);
//!
//! let result = calculate(&circuit).unwrap();
//! assert!((result.voltage_drop_volts - 7.72).abs() < 1e-9);
//! assert!(!result.within_limits);
//! ```

use serde::{Deserialize, Serialize};

use crate::categories::{ConductorMaterial, RacewayMaterial, SystemType, TemperatureRating};
use crate::code_tables::CodeTables;
use crate::errors::{CalcError, CalcResult};
use crate::gauge::Gauge;

fn default_power_factor() -> f64 {
    1.0
}

/// One circuit run.
///
/// ## JSON Example
///
/// ```json
/// {
///   "system_type": "three_phase",
///   "material": "aluminum",
///   "raceway": "steel",
///   "temperature_rating": "75c",
///   "gauge": "2 AWG",
///   "length_ft": 200.0,
///   "load_amps": 50.0,
///   "source_voltage": 480.0,
///   "power_factor": 0.9
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitDescriptor {
    #[serde(default)]
    pub system_type: SystemType,

    #[serde(default)]
    pub material: ConductorMaterial,

    #[serde(default)]
    pub raceway: RacewayMaterial,

    #[serde(default)]
    pub temperature_rating: TemperatureRating,

    pub gauge: Gauge,

    /// One-way length of the run
    pub length_ft: f64,

    pub load_amps: f64,

    pub source_voltage: f64,

    /// Ignored for DC
    #[serde(default = "default_power_factor")]
    pub power_factor: f64,

    /// Overrides the tables' recommended limit, e.g. 5.0 for a feeder
    /// and branch circuit combined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_percent: Option<f64>,
}

impl CircuitDescriptor {
    /// Copper in PVC at 75°C, unity power factor
    pub fn single_phase(gauge: Gauge, length_ft: f64, load_amps: f64, source_voltage: f64) -> Self {
        CircuitDescriptor {
            system_type: SystemType::SinglePhase,
            material: ConductorMaterial::Copper,
            raceway: RacewayMaterial::Pvc,
            temperature_rating: TemperatureRating::C75,
            gauge,
            length_ft,
            load_amps,
            source_voltage,
            power_factor: 1.0,
            limit_percent: None,
        }
    }

    pub fn with_system(mut self, system_type: SystemType) -> Self {
        self.system_type = system_type;
        self
    }

    pub fn with_material(mut self, material: ConductorMaterial, raceway: RacewayMaterial) -> Self {
        self.material = material;
        self.raceway = raceway;
        self
    }

    pub fn with_power_factor(mut self, power_factor: f64) -> Self {
        self.power_factor = power_factor;
        self
    }

    pub fn with_limit(mut self, limit_percent: f64) -> Self {
        self.limit_percent = Some(limit_percent);
        self
    }

    pub fn validate(&self) -> CalcResult<()> {
        if !(self.length_ft > 0.0 && self.length_ft.is_finite()) {
            return Err(CalcError::invalid_input(
                "length_ft",
                self.length_ft.to_string(),
                "Circuit length must be positive",
            ));
        }
        if !(self.load_amps >= 0.0 && self.load_amps.is_finite()) {
            return Err(CalcError::invalid_input(
                "load_amps",
                self.load_amps.to_string(),
                "Load current cannot be negative",
            ));
        }
        if !(self.source_voltage > 0.0 && self.source_voltage.is_finite()) {
            return Err(CalcError::invalid_input(
                "source_voltage",
                self.source_voltage.to_string(),
                "Source voltage must be positive",
            ));
        }
        if !(self.power_factor > 0.0 && self.power_factor <= 1.0) {
            return Err(CalcError::invalid_input(
                "power_factor",
                self.power_factor.to_string(),
                "Power factor must be in (0, 1]",
            ));
        }
        if let Some(limit) = self.limit_percent {
            if !(limit > 0.0 && limit <= 100.0) {
                return Err(CalcError::invalid_input(
                    "limit_percent",
                    limit.to_string(),
                    "Limit must be a percentage in (0, 100]",
                ));
            }
        }
        Ok(())
    }
}

/// Input for a labelled voltage drop item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageDropInput {
    pub label: String,

    pub circuit: CircuitDescriptor,
}

impl VoltageDropInput {
    pub fn calculate(&self, tables: &CodeTables) -> CalcResult<VoltageDropResult> {
        calculate_with(tables, &self.circuit)
    }
}

/// Results from voltage drop calculation.
///
/// ## JSON Example
///
/// ```json
/// {
///   "voltage_drop_volts": 7.72,
///   "voltage_drop_percent": 6.433333333333334,
///   "end_voltage": 112.28,
///   "resistance_ohms_per_kft": 1.93,
///   "reactance_ohms_per_kft": 0.054,
///   "circuit_impedance_ohms": 0.386,
///   "limit_percent": 3.0,
///   "max_length_ft": 46.63212435233161,
///   "within_limits": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageDropResult {
    pub voltage_drop_volts: f64,
    pub voltage_drop_percent: f64,
    /// Voltage left at the load
    pub end_voltage: f64,
    /// After the temperature correction
    pub resistance_ohms_per_kft: f64,
    /// After the raceway correction, reported for DC as well
    pub reactance_ohms_per_kft: f64,
    /// Effective impedance of the whole run, multiplier included
    pub circuit_impedance_ohms: f64,
    pub limit_percent: f64,
    /// Longest run that stays within the limit; `None` at zero load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length_ft: Option<f64>,
    pub within_limits: bool,
}

/// Voltage drop with the embedded NEC 2023 tables.
pub fn calculate(circuit: &CircuitDescriptor) -> CalcResult<VoltageDropResult> {
    calculate_with(CodeTables::nec_2023(), circuit)
}

/// Voltage drop against a specific set of code tables.
///
/// # Errors
///
/// * `InvalidInput` - non-positive length or voltage, negative current,
///   power factor outside (0, 1], limit outside (0, 100]
/// * `UnknownGauge` - gauge missing from the resistance or reactance table
pub fn calculate_with(tables: &CodeTables, circuit: &CircuitDescriptor) -> CalcResult<VoltageDropResult> {
    circuit.validate()?;

    let resistance = tables.conductor_resistance(circuit.material, &circuit.gauge, circuit.temperature_rating)?;
    let reactance = tables.conductor_reactance(circuit.raceway, &circuit.gauge)?;

    let impedance_per_kft = if circuit.system_type.is_ac() {
        let pf = circuit.power_factor;
        resistance * pf + reactance * pf.acos().sin()
    } else {
        resistance
    };
    let impedance_per_ft = impedance_per_kft / 1000.0 * circuit.system_type.multiplier();

    let circuit_impedance_ohms = impedance_per_ft * circuit.length_ft;
    let voltage_drop_volts = circuit.load_amps * circuit_impedance_ohms;
    let voltage_drop_percent = voltage_drop_volts / circuit.source_voltage * 100.0;
    let limit_percent = circuit
        .limit_percent
        .unwrap_or_else(|| tables.voltage_drop_limit_percent());

    let max_length_ft = (circuit.load_amps > 0.0).then(|| {
        let allowed_volts = circuit.source_voltage * limit_percent / 100.0;
        allowed_volts / (circuit.load_amps * impedance_per_ft)
    });

    let result = VoltageDropResult {
        voltage_drop_volts,
        voltage_drop_percent,
        end_voltage: circuit.source_voltage - voltage_drop_volts,
        resistance_ohms_per_kft: resistance,
        reactance_ohms_per_kft: reactance,
        circuit_impedance_ohms,
        limit_percent,
        max_length_ft,
        within_limits: voltage_drop_percent <= limit_percent,
    };

    tracing::debug!(
        gauge = %circuit.gauge,
        length_ft = circuit.length_ft,
        drop_percent = result.voltage_drop_percent,
        within_limits = result.within_limits,
        "voltage drop calculated"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn g(text: &str) -> Gauge {
        Gauge::parse(text).unwrap()
    }

    #[test]
    fn test_single_phase_copper() {
        // 20 A * 1.93 ohm/kft * 0.1 kft * 2 = 7.72 V
        let circuit = CircuitDescriptor::single_phase(g("12"), 100.0, 20.0, 120.0);
        let result = calculate(&circuit).unwrap();
        assert!((result.voltage_drop_volts - 7.72).abs() < 1e-9);
        assert!((result.voltage_drop_percent - 6.4333333).abs() < 1e-6);
        assert!((result.end_voltage - 112.28).abs() < 1e-9);
        assert_eq!(result.resistance_ohms_per_kft, 1.93);
        assert_eq!(result.reactance_ohms_per_kft, 0.054);
        assert_eq!(result.limit_percent, 3.0);
        assert!(!result.within_limits);
    }

    #[test]
    fn test_three_phase_aluminum_with_power_factor() {
        // R = 0.319 * 0.2 = 0.0638, X = 0.045 * 1.2 * 0.2 = 0.0108
        // Ze = 0.0638 * 0.9 + 0.0108 * sin(acos 0.9) = 0.062128
        // drop = 50 * 0.062128 * √3 = 5.3804 V, 1.121% of 480 V
        let circuit = CircuitDescriptor::single_phase(g("2"), 200.0, 50.0, 480.0)
            .with_system(SystemType::ThreePhase)
            .with_material(ConductorMaterial::Aluminum, RacewayMaterial::Steel)
            .with_power_factor(0.9);
        let result = calculate(&circuit).unwrap();
        assert_eq!(result.resistance_ohms_per_kft, 0.319);
        assert!((result.reactance_ohms_per_kft - 0.054).abs() < 1e-12);
        assert!((result.voltage_drop_volts - 5.380409).abs() < 1e-5);
        assert!((result.voltage_drop_percent - 1.120919).abs() < 1e-5);
        assert!(result.within_limits);
    }

    #[test]
    fn test_dc_ignores_reactance() {
        // 15 A * 1.21 ohm/kft * 0.05 kft * 2 = 1.815 V of 24 V
        let circuit = CircuitDescriptor::single_phase(g("10"), 50.0, 15.0, 24.0)
            .with_system(SystemType::Dc)
            .with_power_factor(0.5);
        let result = calculate(&circuit).unwrap();
        assert!((result.voltage_drop_volts - 1.815).abs() < 1e-9);
        assert!((result.voltage_drop_percent - 7.5625).abs() < 1e-9);
        assert!((result.end_voltage - 22.185).abs() < 1e-9);
        assert_eq!(result.reactance_ohms_per_kft, 0.050);
        assert!(!result.within_limits);
    }

    #[test]
    fn test_within_recommended_limit() {
        // 20 A * 0.491 * 0.05 * 2 = 0.982 V of 240 V
        let circuit = CircuitDescriptor::single_phase(g("6"), 50.0, 20.0, 240.0);
        let result = calculate(&circuit).unwrap();
        assert!((result.voltage_drop_volts - 0.982).abs() < 1e-9);
        assert!((result.end_voltage - 239.018).abs() < 1e-9);
        assert!(result.within_limits);
    }

    #[test]
    fn test_temperature_rating_scales_resistance() {
        let mut circuit = CircuitDescriptor::single_phase(g("12"), 100.0, 20.0, 120.0);
        let base = calculate(&circuit).unwrap();
        circuit.temperature_rating = TemperatureRating::C90;
        let hot = calculate(&circuit).unwrap();
        assert!((hot.voltage_drop_volts - base.voltage_drop_volts * 1.05).abs() < 1e-9);
        circuit.temperature_rating = TemperatureRating::C60;
        let cool = calculate(&circuit).unwrap();
        assert!(cool.voltage_drop_volts < base.voltage_drop_volts);
    }

    #[test]
    fn test_custom_limit_and_max_length() {
        let circuit = CircuitDescriptor::single_phase(g("12"), 100.0, 20.0, 120.0).with_limit(7.0);
        let result = calculate(&circuit).unwrap();
        assert_eq!(result.limit_percent, 7.0);
        assert!(result.within_limits);

        // At max_length_ft the drop sits exactly on the limit
        let max = result.max_length_ft.unwrap();
        let at_max = CircuitDescriptor {
            length_ft: max,
            ..circuit.clone()
        };
        let edge = calculate(&at_max).unwrap();
        assert!((edge.voltage_drop_percent - 7.0).abs() < 1e-9);

        let idle = CircuitDescriptor {
            load_amps: 0.0,
            ..circuit
        };
        let result = calculate(&idle).unwrap();
        assert_eq!(result.voltage_drop_volts, 0.0);
        assert!(result.max_length_ft.is_none());
        assert!(result.within_limits);
    }

    #[test]
    fn test_unknown_gauge() {
        let circuit = CircuitDescriptor::single_phase(g("18"), 100.0, 5.0, 120.0);
        assert_eq!(calculate(&circuit).unwrap_err().error_code(), "UNKNOWN_GAUGE");

        let aluminum_fourteen = CircuitDescriptor::single_phase(g("14"), 100.0, 5.0, 120.0)
            .with_material(ConductorMaterial::Aluminum, RacewayMaterial::Pvc);
        assert_eq!(
            calculate(&aluminum_fourteen).unwrap_err().error_code(),
            "UNKNOWN_GAUGE"
        );
    }

    #[test]
    fn test_invalid_inputs() {
        let base = CircuitDescriptor::single_phase(g("12"), 100.0, 20.0, 120.0);
        let cases = [
            CircuitDescriptor { length_ft: 0.0, ..base.clone() },
            CircuitDescriptor { load_amps: -1.0, ..base.clone() },
            CircuitDescriptor { source_voltage: 0.0, ..base.clone() },
            CircuitDescriptor { power_factor: 0.0, ..base.clone() },
            CircuitDescriptor { power_factor: 1.2, ..base.clone() },
            base.clone().with_limit(0.0),
        ];
        for circuit in &cases {
            assert_eq!(calculate(circuit).unwrap_err().error_code(), "INVALID_INPUT");
        }
    }

    #[test]
    fn test_defaults_from_json() {
        let json = r#"{ "gauge": "12", "length_ft": 100.0, "load_amps": 20.0, "source_voltage": 120.0 }"#;
        let circuit: CircuitDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(circuit, CircuitDescriptor::single_phase(g("12"), 100.0, 20.0, 120.0));
    }

    proptest! {
        #[test]
        fn prop_drop_grows_with_length(
            length in 1.0f64..2000.0,
            extra in 0.0f64..2000.0,
            amps in 0.1f64..200.0,
            pf in 0.5f64..=1.0,
        ) {
            let short = CircuitDescriptor::single_phase(g("8"), length, amps, 240.0)
                .with_power_factor(pf);
            let long = CircuitDescriptor { length_ft: length + extra, ..short.clone() };
            let a = calculate(&short).unwrap();
            let b = calculate(&long).unwrap();
            prop_assert!(b.voltage_drop_volts >= a.voltage_drop_volts);
            prop_assert!(!b.within_limits || a.within_limits);
        }
    }
}
