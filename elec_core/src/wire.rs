//! Wire inventory entries shared by box fill and conduit fill.

use serde::{Deserialize, Serialize};

use crate::categories::{ConductorType, Insulation};
use crate::errors::{CalcError, CalcResult};
use crate::gauge::Gauge;

/// One line of a wire/device inventory.
///
/// `quantity` is signed so that a negative count coming from a form or a
/// file reaches validation and is reported as an input error instead of
/// failing to parse.
///
/// ## JSON Example
///
/// ```json
/// { "gauge": "12 AWG", "conductor_type": "wire", "quantity": 3, "insulation": "thhn" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSpec {
    pub gauge: Gauge,

    #[serde(default)]
    pub conductor_type: ConductorType,

    pub quantity: i32,

    /// Insulation for raceway area lookups; THHN when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulation: Option<Insulation>,

    /// Per-conductor area override in square inches (manufacturer data)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_sq_in: Option<f64>,
}

impl WireSpec {
    pub fn new(conductor_type: ConductorType, gauge: Gauge, quantity: i32) -> Self {
        WireSpec {
            gauge,
            conductor_type,
            quantity,
            insulation: None,
            area_sq_in: None,
        }
    }

    pub fn wire(gauge: Gauge, quantity: i32) -> Self {
        Self::new(ConductorType::Wire, gauge, quantity)
    }

    pub fn ground(gauge: Gauge, quantity: i32) -> Self {
        Self::new(ConductorType::Ground, gauge, quantity)
    }

    pub fn device(gauge: Gauge, quantity: i32) -> Self {
        Self::new(ConductorType::Device, gauge, quantity)
    }

    pub fn with_insulation(mut self, insulation: Insulation) -> Self {
        self.insulation = Some(insulation);
        self
    }

    pub fn with_area(mut self, area_sq_in: f64) -> Self {
        self.area_sq_in = Some(area_sq_in);
        self
    }

    pub fn insulation(&self) -> Insulation {
        self.insulation.unwrap_or_default()
    }

    /// Counted quantity; zero until validated non-negative
    pub fn count(&self) -> u64 {
        u64::try_from(self.quantity).unwrap_or(0)
    }

    pub fn validate(&self) -> CalcResult<()> {
        if self.quantity < 0 {
            return Err(CalcError::invalid_input(
                "quantity",
                self.quantity.to_string(),
                format!("Quantity of {} {} cannot be negative", self.gauge, self.conductor_type),
            ));
        }
        if let Some(area) = self.area_sq_in {
            if !(area > 0.0 && area.is_finite()) {
                return Err(CalcError::invalid_input(
                    "area_sq_in",
                    area.to_string(),
                    "Conductor area must be positive",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(text: &str) -> Gauge {
        Gauge::parse(text).unwrap()
    }

    #[test]
    fn test_defaults_from_json() {
        let spec: WireSpec = serde_json::from_str(r#"{"gauge": "14", "quantity": 2}"#).unwrap();
        assert_eq!(spec.conductor_type, ConductorType::Wire);
        assert_eq!(spec.insulation(), Insulation::Thhn);
        assert_eq!(spec.gauge.as_str(), "14 AWG");
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let spec = WireSpec::wire(g("12"), -1);
        assert_eq!(spec.count(), 0);
        assert_eq!(spec.validate().unwrap_err().error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_area_override_must_be_positive() {
        assert!(WireSpec::wire(g("12"), 1).with_area(0.0).validate().is_err());
        assert!(WireSpec::wire(g("12"), 1).with_area(0.05).validate().is_ok());
    }
}
