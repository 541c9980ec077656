//! # Box Fill Calculation
//!
//! Checks that a junction or device box has enough interior volume for its
//! conductors, grounds, devices, and fittings per NEC 314.16(B).
//!
//! ## Counting Rules
//!
//! - Each wire counts once at its own gauge's allowance
//! - All equipment grounding conductors together count once, at the
//!   allowance of the largest ground present
//! - Each device yoke counts twice, at the largest gauge present
//! - All internal clamps together count once, at the largest gauge present
//! - Each support fitting (stud, hickey) counts once, at the largest gauge present
//!
//! "Present" means quantity > 0. Every entry's gauge must still resolve in the
//! tables, including zero-quantity entries.
//!
//! ## Example
//!
//! ```rust
//! use elec_core::calculations::box_fill::{calculate, BoxDescriptor};
//! use elec_core::categories::BoxType;
//! use elec_core::gauge::Gauge;
//! use elec_core::wire::WireSpec;
//!
//! let fourteen = Gauge::parse("14").unwrap();
//! let descriptor = BoxDescriptor::with_volume(BoxType::Square, "4x4x1.25", 18.0);
//! let wires = vec![
//!     WireSpec::wire(fourteen.clone(), 2),
//!     WireSpec::ground(fourteen, 1),
//! ];
//!
//! let result = calculate(&descriptor, &wires).unwrap();
//! assert_eq!(result.total_required_volume_in3, 6.0);
//! assert!(result.within_limits);
//! ```

use serde::{Deserialize, Serialize};

use crate::categories::{BoxType, ConductorType};
use crate::code_tables::CodeTables;
use crate::errors::{CalcError, CalcResult};
use crate::wire::WireSpec;

/// The box being filled.
///
/// ## JSON Example
///
/// ```json
/// { "box_type": "square", "dimensions": "4x4x1.5" }
/// ```
///
/// Without `volume_in3` the volume comes from the standard box table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxDescriptor {
    pub box_type: BoxType,

    /// Free-form size label, e.g. "4x4x1.5"
    #[serde(default)]
    pub dimensions: String,

    /// Marked volume in cubic inches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_in3: Option<f64>,
}

impl BoxDescriptor {
    /// A standard box whose volume comes from Table 314.16(A)
    pub fn standard(box_type: BoxType, dimensions: impl Into<String>) -> Self {
        BoxDescriptor {
            box_type,
            dimensions: dimensions.into(),
            volume_in3: None,
        }
    }

    /// A box with a marked volume
    pub fn with_volume(box_type: BoxType, dimensions: impl Into<String>, volume_in3: f64) -> Self {
        BoxDescriptor {
            box_type,
            dimensions: dimensions.into(),
            volume_in3: Some(volume_in3),
        }
    }

    /// Supplied volume if present, otherwise the table volume.
    pub fn resolve_volume(&self, tables: &CodeTables) -> CalcResult<f64> {
        match self.volume_in3 {
            Some(volume) if volume > 0.0 && volume.is_finite() => Ok(volume),
            Some(volume) => Err(CalcError::invalid_input(
                "volume_in3",
                volume.to_string(),
                "Box volume must be positive",
            )),
            None => tables.standard_box_volume(self.box_type, &self.dimensions),
        }
    }
}

/// Input for a labelled box fill item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxFillInput {
    /// User label, e.g. "Kitchen J-box"
    pub label: String,

    #[serde(rename = "box")]
    pub descriptor: BoxDescriptor,

    #[serde(default)]
    pub wires: Vec<WireSpec>,
}

impl BoxFillInput {
    pub fn calculate(&self, tables: &CodeTables) -> CalcResult<BoxFillResult> {
        calculate_with(tables, &self.descriptor, &self.wires)
    }
}

/// One line of the volume breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentAllowance {
    pub kind: ConductorType,

    /// e.g. "12 AWG conductor", "Device yoke(s)"
    pub description: String,

    /// How many items this line covers
    pub quantity: u64,

    /// Allowance per counted unit (a yoke is one unit of two conductors)
    pub allowance_per_unit_in3: f64,

    /// Volume charged for this line
    pub volume_in3: f64,
}

/// Results from box fill calculation.
///
/// ## JSON Example
///
/// ```json
/// {
///   "box_type": "square",
///   "dimensions": "4x4x1.25",
///   "box_volume_in3": 18.0,
///   "total_required_volume_in3": 6.0,
///   "remaining_volume_in3": 12.0,
///   "fill_percentage": 33.333333333333336,
///   "within_limits": true,
///   "components": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxFillResult {
    pub box_type: BoxType,
    pub dimensions: String,
    pub box_volume_in3: f64,
    pub total_required_volume_in3: f64,
    /// Negative when overfilled
    pub remaining_volume_in3: f64,
    /// Not clamped; above 100 when overfilled
    pub fill_percentage: f64,
    pub within_limits: bool,
    pub components: Vec<ComponentAllowance>,
}

/// Box fill with the embedded NEC 2023 tables.
pub fn calculate(descriptor: &BoxDescriptor, wires: &[WireSpec]) -> CalcResult<BoxFillResult> {
    calculate_with(CodeTables::nec_2023(), descriptor, wires)
}

/// Box fill against a specific set of code tables.
///
/// # Errors
///
/// * `InvalidInput` - non-positive box volume or a negative quantity
/// * `UnknownGauge` - an entry's gauge has no volume allowance
/// * `UnknownCodeLookup` - no volume supplied and the box is not a standard size
pub fn calculate_with(
    tables: &CodeTables,
    descriptor: &BoxDescriptor,
    wires: &[WireSpec],
) -> CalcResult<BoxFillResult> {
    let box_volume = descriptor.resolve_volume(tables)?;

    let mut entries = Vec::with_capacity(wires.len());
    for spec in wires {
        spec.validate()?;
        let allowance = tables.volume_allowance(&spec.gauge)?;
        entries.push((spec, allowance));
    }

    let present = |kinds: &[ConductorType]| {
        entries
            .iter()
            .filter(|(spec, _)| spec.count() > 0 && kinds.contains(&spec.conductor_type))
            .map(|(_, allowance)| *allowance)
            .fold(None, |acc: Option<f64>, a| Some(acc.map_or(a, |m| m.max(a))))
    };
    let count_of = |kind: ConductorType| -> u64 {
        entries
            .iter()
            .filter(|(spec, _)| spec.conductor_type == kind)
            .map(|(spec, _)| spec.count())
            .sum()
    };

    let mut components = Vec::new();

    for (spec, allowance) in &entries {
        if spec.conductor_type == ConductorType::Wire && spec.count() > 0 {
            components.push(ComponentAllowance {
                kind: ConductorType::Wire,
                description: format!("{} conductor", spec.gauge),
                quantity: spec.count(),
                allowance_per_unit_in3: *allowance,
                volume_in3: spec.count() as f64 * allowance,
            });
        }
    }

    if let Some(largest_ground) = present(&[ConductorType::Ground]) {
        components.push(ComponentAllowance {
            kind: ConductorType::Ground,
            description: "Equipment grounding conductors (counted once)".to_string(),
            quantity: count_of(ConductorType::Ground),
            allowance_per_unit_in3: largest_ground,
            volume_in3: largest_ground,
        });
    }

    use ConductorType::{Clamp, Device, Ground, SupportFitting, Wire};

    if let Some(largest) = present(&[Wire, Ground, Device]) {
        let yokes = count_of(Device);
        if yokes > 0 {
            components.push(ComponentAllowance {
                kind: Device,
                description: "Device yoke(s), two conductors each".to_string(),
                quantity: yokes,
                allowance_per_unit_in3: 2.0 * largest,
                volume_in3: yokes as f64 * 2.0 * largest,
            });
        }
    }

    if let Some(largest) = present(&[Wire, Ground, Clamp]) {
        let clamps = count_of(Clamp);
        if clamps > 0 {
            components.push(ComponentAllowance {
                kind: Clamp,
                description: "Internal cable clamps (counted once)".to_string(),
                quantity: clamps,
                allowance_per_unit_in3: largest,
                volume_in3: largest,
            });
        }
    }

    if let Some(largest) = present(&[Wire, Ground, SupportFitting]) {
        let fittings = count_of(SupportFitting);
        if fittings > 0 {
            components.push(ComponentAllowance {
                kind: SupportFitting,
                description: "Support fitting(s)".to_string(),
                quantity: fittings,
                allowance_per_unit_in3: largest,
                volume_in3: fittings as f64 * largest,
            });
        }
    }

    let total_required_volume_in3: f64 = components.iter().map(|c| c.volume_in3).sum();
    let within_limits = total_required_volume_in3 <= box_volume;

    let result = BoxFillResult {
        box_type: descriptor.box_type,
        dimensions: descriptor.dimensions.clone(),
        box_volume_in3: box_volume,
        total_required_volume_in3,
        remaining_volume_in3: box_volume - total_required_volume_in3,
        fill_percentage: total_required_volume_in3 / box_volume * 100.0,
        within_limits,
        components,
    };

    tracing::debug!(
        box_volume_in3 = result.box_volume_in3,
        required_in3 = result.total_required_volume_in3,
        fill_percentage = result.fill_percentage,
        "box fill calculated"
    );
    if !within_limits {
        tracing::warn!(
            overage_in3 = -result.remaining_volume_in3,
            "box fill exceeds box volume"
        );
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gauge::Gauge;
    use proptest::prelude::*;

    fn g(text: &str) -> Gauge {
        Gauge::parse(text).unwrap()
    }

    fn test_box() -> BoxDescriptor {
        BoxDescriptor::with_volume(BoxType::Square, "4x4x1.25", 18.0)
    }

    #[test]
    fn test_two_wires_and_ground() {
        let wires = vec![WireSpec::wire(g("14"), 2), WireSpec::ground(g("14"), 1)];
        let result = calculate(&test_box(), &wires).unwrap();

        assert!((result.total_required_volume_in3 - 6.0).abs() < 1e-9);
        assert!((result.remaining_volume_in3 - 12.0).abs() < 1e-9);
        assert!((result.fill_percentage - 33.33).abs() < 0.01);
        assert!(result.within_limits);
        assert_eq!(result.components.len(), 2);
    }

    #[test]
    fn test_grounds_count_once_at_largest() {
        let wires = vec![
            WireSpec::wire(g("12"), 4),
            WireSpec::ground(g("14"), 3),
            WireSpec::ground(g("12"), 2),
        ];
        let result = calculate(&test_box(), &wires).unwrap();
        // 4 * 2.25 + one 12 AWG ground allowance
        assert!((result.total_required_volume_in3 - 11.25).abs() < 1e-9);
        let ground = result
            .components
            .iter()
            .find(|c| c.kind == ConductorType::Ground)
            .unwrap();
        assert_eq!(ground.quantity, 5);
        assert_eq!(ground.volume_in3, 2.25);
    }

    #[test]
    fn test_device_counts_double_largest() {
        let wires = vec![
            WireSpec::wire(g("14"), 2),
            WireSpec::wire(g("12"), 2),
            WireSpec::device(g("14"), 1),
        ];
        let result = calculate(&test_box(), &wires).unwrap();
        // 2*2.0 + 2*2.25 + 2*2.25
        assert!((result.total_required_volume_in3 - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_device_without_conductors_uses_own_gauge() {
        let wires = vec![WireSpec::device(g("12"), 2)];
        let result = calculate(&test_box(), &wires).unwrap();
        assert!((result.total_required_volume_in3 - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamps_and_fittings() {
        let wires = vec![
            WireSpec::wire(g("12"), 2),
            WireSpec::new(ConductorType::Clamp, g("12"), 2),
            WireSpec::new(ConductorType::SupportFitting, g("12"), 1),
        ];
        let result = calculate(&test_box(), &wires).unwrap();
        // 2 wires + one clamp allowance + one fitting allowance, all 2.25
        assert!((result.total_required_volume_in3 - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_wires() {
        let result = calculate(&test_box(), &[]).unwrap();
        assert_eq!(result.total_required_volume_in3, 0.0);
        assert_eq!(result.fill_percentage, 0.0);
        assert!(result.within_limits);
        assert!(result.components.is_empty());
    }

    #[test]
    fn test_exact_fill_is_within_limits() {
        // 9 * 2.0 = 18.0 exactly
        let wires = vec![WireSpec::wire(g("14"), 9)];
        let result = calculate(&test_box(), &wires).unwrap();
        assert_eq!(result.total_required_volume_in3, 18.0);
        assert_eq!(result.remaining_volume_in3, 0.0);
        assert!(result.within_limits);
    }

    #[test]
    fn test_overfill_not_clamped() {
        let wires = vec![WireSpec::wire(g("12"), 10)];
        let result = calculate(&test_box(), &wires).unwrap();
        assert!((result.fill_percentage - 125.0).abs() < 1e-9);
        assert!((result.remaining_volume_in3 + 4.5).abs() < 1e-9);
        assert!(!result.within_limits);
    }

    #[test]
    fn test_standard_box_volume_lookup() {
        let descriptor = BoxDescriptor::standard(BoxType::Device, "3x2x3.5");
        let result = calculate(&descriptor, &[WireSpec::wire(g("14"), 4)]).unwrap();
        assert_eq!(result.box_volume_in3, 18.0);
    }

    #[test]
    fn test_nonstandard_box_without_volume() {
        let descriptor = BoxDescriptor::standard(BoxType::Other, "custom");
        let err = calculate(&descriptor, &[]).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_CODE_LOOKUP");
    }

    #[test]
    fn test_invalid_volume() {
        let mut descriptor = test_box();
        descriptor.volume_in3 = Some(0.0);
        assert_eq!(
            calculate(&descriptor, &[]).unwrap_err().error_code(),
            "INVALID_INPUT"
        );
        descriptor.volume_in3 = Some(-3.0);
        assert!(calculate(&descriptor, &[]).is_err());
    }

    #[test]
    fn test_negative_quantity() {
        let wires = vec![WireSpec::wire(g("14"), -1)];
        assert_eq!(
            calculate(&test_box(), &wires).unwrap_err().error_code(),
            "INVALID_INPUT"
        );
    }

    #[test]
    fn test_unknown_gauge_even_at_zero_quantity() {
        let wires = vec![WireSpec::wire(g("14"), 2), WireSpec::wire(g("4"), 0)];
        assert_eq!(
            calculate(&test_box(), &wires).unwrap_err().error_code(),
            "UNKNOWN_GAUGE"
        );
    }

    #[test]
    fn test_components_sum_to_total() {
        let wires = vec![
            WireSpec::wire(g("10"), 3),
            WireSpec::ground(g("12"), 2),
            WireSpec::device(g("10"), 1),
            WireSpec::new(ConductorType::Clamp, g("10"), 1),
        ];
        let result = calculate(&test_box(), &wires).unwrap();
        let sum: f64 = result.components.iter().map(|c| c.volume_in3).sum();
        assert_eq!(sum, result.total_required_volume_in3);
    }

    #[test]
    fn test_recalculation_is_idempotent() {
        let wires = vec![WireSpec::wire(g("12"), 3), WireSpec::ground(g("12"), 1)];
        let first = calculate(&test_box(), &wires).unwrap();
        let second = calculate(&test_box(), &wires).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_input_serialization() {
        let input = BoxFillInput {
            label: "J-1".to_string(),
            descriptor: test_box(),
            wires: vec![WireSpec::wire(g("14"), 2)],
        };
        let json = serde_json::to_string_pretty(&input).unwrap();
        assert!(json.contains("\"box\""));
        let roundtrip: BoxFillInput = serde_json::from_str(&json).unwrap();
        assert_eq!(input, roundtrip);
    }

    fn arb_entry() -> impl Strategy<Value = (ConductorType, &'static str, i32)> {
        (
            prop::sample::select(ConductorType::ALL.to_vec()),
            prop::sample::select(vec!["18", "16", "14", "12", "10", "8", "6"]),
            0..6i32,
        )
    }

    proptest! {
        #[test]
        fn prop_fill_percentage_identity(
            entries in prop::collection::vec(arb_entry(), 0..8),
            volume in 1.0f64..80.0,
        ) {
            let wires: Vec<WireSpec> = entries
                .iter()
                .map(|(kind, gauge, qty)| WireSpec::new(*kind, g(gauge), *qty))
                .collect();
            let descriptor = BoxDescriptor::with_volume(BoxType::Other, "", volume);
            let result = calculate(&descriptor, &wires).unwrap();
            prop_assert_eq!(
                result.fill_percentage,
                result.total_required_volume_in3 / result.box_volume_in3 * 100.0
            );
            prop_assert_eq!(
                result.within_limits,
                result.total_required_volume_in3 <= result.box_volume_in3
            );
        }

        #[test]
        fn prop_more_quantity_never_helps(
            entries in prop::collection::vec(arb_entry(), 1..8),
            pick in any::<prop::sample::Index>(),
            extra in 1..4i32,
            volume in 1.0f64..80.0,
        ) {
            let wires: Vec<WireSpec> = entries
                .iter()
                .map(|(kind, gauge, qty)| WireSpec::new(*kind, g(gauge), *qty))
                .collect();
            let mut grown = wires.clone();
            let i = pick.index(grown.len());
            grown[i].quantity += extra;

            let descriptor = BoxDescriptor::with_volume(BoxType::Other, "", volume);
            let before = calculate(&descriptor, &wires).unwrap();
            let after = calculate(&descriptor, &grown).unwrap();
            prop_assert!(after.total_required_volume_in3 >= before.total_required_volume_in3);
            prop_assert!(!(after.within_limits && !before.within_limits));
        }
    }
}
