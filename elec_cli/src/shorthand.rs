//! Compact command-line notations for inventory lines.
//!
//! - Wires: `QTYxGAUGE[:INSULATION]`, e.g. `2x14`, `4x12:thhn`, `1x1/0:xhhw`.
//!   A bare gauge (`14`) means one.
//! - Appliances: `NAME:WATTS[:QTY][:VOLTS]`, e.g. `Dishwasher:1200`,
//!   `Heater:1500:2:240`.

use elec_core::calculations::ApplianceSpec;
use elec_core::categories::{ConductorType, Insulation};
use elec_core::gauge::Gauge;
use elec_core::wire::WireSpec;

#[derive(Debug, Clone, PartialEq)]
pub struct WireArg {
    pub quantity: i32,
    pub gauge: Gauge,
    pub insulation: Option<Insulation>,
}

impl WireArg {
    pub fn into_spec(self, conductor_type: ConductorType) -> WireSpec {
        WireSpec {
            gauge: self.gauge,
            conductor_type,
            quantity: self.quantity,
            insulation: self.insulation,
            area_sq_in: None,
        }
    }
}

pub fn parse_wire(text: &str) -> Result<WireArg, String> {
    let text = text.trim();
    let (body, insulation) = match text.split_once(':') {
        Some((body, ins)) => (body, Some(Insulation::from_code(ins.trim()).map_err(|e| e.to_string())?)),
        None => (text, None),
    };

    let (quantity, gauge) = match body.split_once(['x', 'X']) {
        Some((qty, gauge)) => {
            let quantity = qty
                .trim()
                .parse::<i32>()
                .map_err(|_| format!("'{}': quantity before 'x' must be a whole number", text))?;
            (quantity, gauge)
        }
        None => (1, body),
    };

    let gauge = Gauge::parse(gauge.trim()).map_err(|e| e.to_string())?;
    Ok(WireArg {
        quantity,
        gauge,
        insulation,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceArg {
    pub name: String,
    pub wattage: f64,
    pub quantity: i32,
    /// Falls back to the service voltage
    pub voltage: Option<f64>,
}

impl ApplianceArg {
    pub fn into_spec(self, is_motor_load: bool, service_voltage: i32) -> ApplianceSpec {
        ApplianceSpec {
            name: self.name,
            wattage: self.wattage,
            voltage_rating: self.voltage.unwrap_or_else(|| f64::from(service_voltage)),
            is_motor_load,
            quantity: self.quantity,
        }
    }
}

pub fn parse_appliance(text: &str) -> Result<ApplianceArg, String> {
    let mut parts = text.split(':').map(str::trim);
    let name = parts.next().filter(|n| !n.is_empty()).ok_or_else(|| {
        format!("'{}': expected NAME:WATTS[:QTY][:VOLTS]", text)
    })?;
    let number = |part: Option<&str>, what: &str| -> Result<Option<f64>, String> {
        part.map(|p| {
            p.parse::<f64>()
                .map_err(|_| format!("'{}': {} '{}' is not a number", text, what, p))
        })
        .transpose()
    };

    let wattage = number(parts.next(), "wattage")?
        .ok_or_else(|| format!("'{}': missing wattage, expected NAME:WATTS", text))?;
    let quantity = match parts.next() {
        Some(q) => q
            .parse::<i32>()
            .map_err(|_| format!("'{}': quantity '{}' is not a whole number", text, q))?,
        None => 1,
    };
    let voltage = number(parts.next(), "voltage")?;
    if parts.next().is_some() {
        return Err(format!("'{}': too many ':' separated fields", text));
    }

    Ok(ApplianceArg {
        name: name.to_string(),
        wattage,
        quantity,
        voltage,
    })
}
