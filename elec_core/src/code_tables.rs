//! # Code Tables
//!
//! Every code-derived number the calculators use: conductor volume
//! allowances, standard box volumes, conductor and conduit areas, conduit
//! fill caps, the general lighting factor, the dwelling demand-factor
//! schedule, and conductor resistance and reactance for voltage drop.
//!
//! Tables are configuration data, not constants in the calculators. The NEC
//! 2023 edition ships embedded in the crate and is parsed once per process
//! ([`CodeTables::nec_2023`]); another edition or a local amendment can be
//! loaded from a TOML document with [`CodeTables::load`]. Once built a
//! `CodeTables` value is immutable and safe to share between threads.
//!
//! ## Example
//!
//! ```rust
//! use elec_core::code_tables::CodeTables;
//! use elec_core::gauge::Gauge;
//!
//! let tables = CodeTables::nec_2023();
//! let allowance = tables.volume_allowance(&Gauge::parse("12").unwrap()).unwrap();
//! assert_eq!(allowance, 2.25);
//! assert_eq!(tables.conduit_fill_cap(3).unwrap(), 40.0);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::categories::{
    BoxType, ConductorMaterial, ConduitType, Insulation, RacewayMaterial, TemperatureRating,
};
use crate::errors::{CalcError, CalcResult};
use crate::gauge::Gauge;

const NEC_2023_TOML: &str = include_str!("../tables/nec_2023.toml");

static NEC_2023: Lazy<CodeTables> = Lazy::new(|| {
    CodeTables::from_toml_str(NEC_2023_TOML).expect("embedded NEC 2023 tables are valid")
});

/// Conduit fill percentages by conductor count (Chapter 9, Table 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillCaps {
    pub one_conductor: f64,
    pub two_conductors: f64,
    pub over_two_conductors: f64,
}

/// Article 220 constants for dwelling calculations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellingFactors {
    pub lighting_va_per_sq_ft: f64,
    pub largest_motor_factor: f64,
    pub small_appliance_circuit_va: f64,
    pub laundry_circuit_va: f64,
    pub service_ratings_amps: Vec<u32>,
}

/// One tier of the progressive demand-factor schedule.
///
/// `up_to_va` is the cumulative upper bound of the tier; `None` marks the
/// open-ended final tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandBracket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_to_va: Option<f64>,
    pub factor: f64,
}

#[derive(Debug, Deserialize)]
struct VoltageDropDocument {
    recommended_limit_percent: f64,
    temperature_factors: BTreeMap<String, f64>,
    reactance_factors: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct BoxVolumeRow {
    box_type: BoxType,
    dimensions: String,
    volume_in3: f64,
}

#[derive(Debug, Deserialize)]
struct TableDocument {
    edition: String,
    conductor_volumes: BTreeMap<String, f64>,
    #[serde(default)]
    box_volumes: Vec<BoxVolumeRow>,
    conductor_areas: BTreeMap<String, BTreeMap<String, f64>>,
    conduit_areas: BTreeMap<String, BTreeMap<String, f64>>,
    conduit_fill: FillCaps,
    dwelling: DwellingFactors,
    demand_brackets: Vec<DemandBracket>,
    conductor_resistance: BTreeMap<String, BTreeMap<String, f64>>,
    conductor_reactance: BTreeMap<String, f64>,
    voltage_drop: VoltageDropDocument,
}

/// Validated, immutable set of code tables for one code edition.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeTables {
    edition: String,
    conductor_volumes: BTreeMap<Gauge, f64>,
    box_volumes: BTreeMap<(BoxType, String), f64>,
    conductor_areas: BTreeMap<(Insulation, Gauge), f64>,
    conduit_areas: BTreeMap<(ConduitType, String), f64>,
    fill_caps: FillCaps,
    dwelling: DwellingFactors,
    demand_brackets: Vec<DemandBracket>,
    conductor_resistance: BTreeMap<(ConductorMaterial, Gauge), f64>,
    conductor_reactance: BTreeMap<Gauge, f64>,
    voltage_drop_limit_percent: f64,
    temperature_factors: BTreeMap<TemperatureRating, f64>,
    reactance_factors: BTreeMap<RacewayMaterial, f64>,
}

/// Row counts and headline factors, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub edition: String,
    pub conductor_volume_gauges: Vec<String>,
    pub standard_boxes: usize,
    pub conductor_area_entries: usize,
    pub conduit_area_entries: usize,
    pub fill_caps: FillCaps,
    pub lighting_va_per_sq_ft: f64,
    pub demand_brackets: Vec<DemandBracket>,
    pub resistance_entries: usize,
    pub voltage_drop_limit_percent: f64,
}

impl CodeTables {
    /// The embedded NEC 2023 tables, parsed on first use.
    pub fn nec_2023() -> &'static CodeTables {
        &NEC_2023
    }

    /// Parse and validate a table document.
    pub fn from_toml_str(text: &str) -> CalcResult<Self> {
        let doc: TableDocument =
            toml::from_str(text).map_err(|e| CalcError::table_error(e.to_string()))?;

        let mut conductor_volumes = BTreeMap::new();
        for (key, volume) in doc.conductor_volumes {
            let gauge = table_gauge(&key, "conductor_volumes")?;
            positive(volume, "conductor_volumes", &key)?;
            conductor_volumes.insert(gauge, volume);
        }

        let mut box_volumes = BTreeMap::new();
        for row in doc.box_volumes {
            let key = normalize_dimensions(&row.dimensions);
            positive(row.volume_in3, "box_volumes", &row.dimensions)?;
            if box_volumes
                .insert((row.box_type, key), row.volume_in3)
                .is_some()
            {
                return Err(CalcError::table_error(format!(
                    "box_volumes: duplicate entry {}:{}",
                    row.box_type, row.dimensions
                )));
            }
        }

        let mut conductor_areas = BTreeMap::new();
        for (insulation, rows) in doc.conductor_areas {
            let insulation = Insulation::from_code(&insulation)
                .map_err(|e| CalcError::table_error(format!("conductor_areas: {}", e)))?;
            for (key, area) in rows {
                let gauge = table_gauge(&key, "conductor_areas")?;
                positive(area, "conductor_areas", &key)?;
                conductor_areas.insert((insulation, gauge), area);
            }
        }

        let mut conduit_areas = BTreeMap::new();
        for (conduit_type, rows) in doc.conduit_areas {
            let conduit_type = ConduitType::from_code(&conduit_type)
                .map_err(|e| CalcError::table_error(format!("conduit_areas: {}", e)))?;
            for (size, area) in rows {
                positive(area, "conduit_areas", &size)?;
                conduit_areas.insert((conduit_type, normalize_trade_size(&size)), area);
            }
        }

        let caps = doc.conduit_fill;
        for (name, cap) in [
            ("one_conductor", caps.one_conductor),
            ("two_conductors", caps.two_conductors),
            ("over_two_conductors", caps.over_two_conductors),
        ] {
            if !(cap > 0.0 && cap <= 100.0) {
                return Err(CalcError::table_error(format!(
                    "conduit_fill.{} must be in (0, 100], got {}",
                    name, cap
                )));
            }
        }

        validate_dwelling(&doc.dwelling)?;
        validate_brackets(&doc.demand_brackets)?;

        let mut conductor_resistance = BTreeMap::new();
        for (material, rows) in doc.conductor_resistance {
            let material = ConductorMaterial::from_code(&material)
                .map_err(|e| CalcError::table_error(format!("conductor_resistance: {}", e)))?;
            for (key, ohms) in rows {
                let gauge = table_gauge(&key, "conductor_resistance")?;
                positive(ohms, "conductor_resistance", &key)?;
                conductor_resistance.insert((material, gauge), ohms);
            }
        }

        let mut conductor_reactance = BTreeMap::new();
        for (key, ohms) in doc.conductor_reactance {
            let gauge = table_gauge(&key, "conductor_reactance")?;
            positive(ohms, "conductor_reactance", &key)?;
            conductor_reactance.insert(gauge, ohms);
        }

        let drop = doc.voltage_drop;
        if !(drop.recommended_limit_percent > 0.0 && drop.recommended_limit_percent <= 100.0) {
            return Err(CalcError::table_error(format!(
                "voltage_drop.recommended_limit_percent must be in (0, 100], got {}",
                drop.recommended_limit_percent
            )));
        }
        let temperature_factors = complete_factors(
            drop.temperature_factors,
            "voltage_drop.temperature_factors",
            &TemperatureRating::ALL,
            TemperatureRating::from_code,
            TemperatureRating::code,
        )?;
        let reactance_factors = complete_factors(
            drop.reactance_factors,
            "voltage_drop.reactance_factors",
            &RacewayMaterial::ALL,
            RacewayMaterial::from_code,
            RacewayMaterial::code,
        )?;

        Ok(CodeTables {
            edition: doc.edition,
            conductor_volumes,
            box_volumes,
            conductor_areas,
            conduit_areas,
            fill_caps: caps,
            dwelling: doc.dwelling,
            demand_brackets: doc.demand_brackets,
            conductor_resistance,
            conductor_reactance,
            voltage_drop_limit_percent: drop.recommended_limit_percent,
            temperature_factors,
            reactance_factors,
        })
    }

    /// Load a table document from disk.
    pub fn load(path: &Path) -> CalcResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CalcError::file_error("read tables", path.display().to_string(), e.to_string()))?;
        let tables = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), edition = %tables.edition, "loaded code tables");
        Ok(tables)
    }

    /// Code edition label, e.g. "NEC 2023"
    pub fn edition(&self) -> &str {
        &self.edition
    }

    /// Box-fill volume allowance per conductor, cubic inches (Table 314.16(B)).
    pub fn volume_allowance(&self, gauge: &Gauge) -> CalcResult<f64> {
        self.conductor_volumes
            .get(gauge)
            .copied()
            .ok_or_else(|| CalcError::unknown_gauge(gauge.as_str(), "conductor volumes (314.16(B))"))
    }

    /// Gauges with a box-fill volume allowance
    pub fn box_fill_gauges(&self) -> impl Iterator<Item = &Gauge> {
        self.conductor_volumes.keys()
    }

    /// Volume of a standard box from its type and dimensions label (Table 314.16(A)).
    ///
    /// The label is matched ignoring whitespace, case, and inch marks.
    pub fn standard_box_volume(&self, box_type: BoxType, dimensions: &str) -> CalcResult<f64> {
        let key = normalize_dimensions(dimensions);
        self.box_volumes
            .get(&(box_type, key))
            .copied()
            .ok_or_else(|| {
                CalcError::unknown_lookup(
                    "box volumes (314.16(A))",
                    format!("{}:{}", box_type, dimensions),
                )
            })
    }

    /// Standard box sizes for a type, as (dimensions, volume) pairs
    pub fn standard_boxes(&self, box_type: BoxType) -> Vec<(&str, f64)> {
        self.box_volumes
            .iter()
            .filter(|((t, _), _)| *t == box_type)
            .map(|((_, dims), v)| (dims.as_str(), *v))
            .collect()
    }

    /// Cross-sectional area of one insulated conductor, square inches (Chapter 9, Table 5).
    pub fn conductor_area(&self, insulation: Insulation, gauge: &Gauge) -> CalcResult<f64> {
        self.conductor_areas
            .get(&(insulation, gauge.clone()))
            .copied()
            .ok_or_else(|| {
                CalcError::unknown_gauge(
                    gauge.as_str(),
                    format!("{} conductor areas (Chapter 9, Table 5)", insulation.code().to_uppercase()),
                )
            })
    }

    /// Total internal area of a raceway, square inches (Chapter 9, Table 4).
    pub fn conduit_area(&self, conduit_type: ConduitType, trade_size: &str) -> CalcResult<f64> {
        self.conduit_areas
            .get(&(conduit_type, normalize_trade_size(trade_size)))
            .copied()
            .ok_or_else(|| {
                CalcError::unknown_lookup(
                    "conduit areas (Chapter 9, Table 4)",
                    format!("{} {}", conduit_type, trade_size),
                )
            })
    }

    /// Trade sizes listed for a raceway type, smallest first
    pub fn trade_sizes(&self, conduit_type: ConduitType) -> Vec<(&str, f64)> {
        let mut sizes: Vec<(&str, f64)> = self
            .conduit_areas
            .iter()
            .filter(|((t, _), _)| *t == conduit_type)
            .map(|((_, size), area)| (size.as_str(), *area))
            .collect();
        sizes.sort_by(|a, b| a.1.total_cmp(&b.1));
        sizes
    }

    /// Allowed fill percentage for a conductor count (Chapter 9, Table 1).
    ///
    /// Returns a percentage (53.0, not 0.53). Zero conductors is an input error.
    pub fn conduit_fill_cap(&self, conductor_count: u64) -> CalcResult<f64> {
        match conductor_count {
            0 => Err(CalcError::invalid_input(
                "conductor_count",
                "0",
                "A conduit fill calculation needs at least one conductor",
            )),
            1 => Ok(self.fill_caps.one_conductor),
            2 => Ok(self.fill_caps.two_conductors),
            _ => Ok(self.fill_caps.over_two_conductors),
        }
    }

    /// General lighting load per square foot of dwelling (220.12)
    pub fn lighting_va_per_sq_ft(&self) -> f64 {
        self.dwelling.lighting_va_per_sq_ft
    }

    /// Demand factor of the bracket that contains `cumulative_va`.
    ///
    /// Bracket upper bounds are inclusive: the 3000th VA is still at 100%.
    pub fn demand_factor_bracket(&self, cumulative_va: f64) -> f64 {
        self.demand_brackets
            .iter()
            .find(|b| b.up_to_va.map_or(true, |upper| cumulative_va <= upper))
            .or_else(|| self.demand_brackets.last())
            .map_or(1.0, |b| b.factor)
    }

    /// Demand load of `amount_va` placed on the schedule at cumulative
    /// position `start_va`.
    ///
    /// Each VA is taxed at the rate of the bracket it falls in, so
    /// `demanded_va(0, a + b) == demanded_va(0, a) + demanded_va(a, b)`.
    pub fn demanded_va(&self, start_va: f64, amount_va: f64) -> f64 {
        let end = start_va + amount_va;
        let mut lower = 0.0_f64;
        let mut demanded = 0.0;
        for bracket in &self.demand_brackets {
            let upper = bracket.up_to_va.unwrap_or(f64::INFINITY);
            let overlap = (end.min(upper) - start_va.max(lower)).max(0.0);
            demanded += overlap * bracket.factor;
            lower = upper;
        }
        demanded
    }

    /// The demand-factor schedule, lowest tier first
    pub fn demand_brackets(&self) -> &[DemandBracket] {
        &self.demand_brackets
    }

    /// Multiplier on the largest motor (430.24)
    pub fn largest_motor_factor(&self) -> f64 {
        self.dwelling.largest_motor_factor
    }

    /// VA per small-appliance branch circuit (220.52(A))
    pub fn small_appliance_circuit_va(&self) -> f64 {
        self.dwelling.small_appliance_circuit_va
    }

    /// VA per laundry branch circuit (220.52(B))
    pub fn laundry_circuit_va(&self) -> f64 {
        self.dwelling.laundry_circuit_va
    }

    /// Smallest standard rating that carries `amps`.
    ///
    /// Beyond the largest listed rating, rounds up to the next 100 A.
    pub fn recommended_service_amps(&self, amps: f64) -> u32 {
        self.dwelling
            .service_ratings_amps
            .iter()
            .copied()
            .find(|&rating| amps <= f64::from(rating))
            .unwrap_or_else(|| ((amps / 100.0).ceil() * 100.0) as u32)
    }

    /// Conductor resistance in ohms per 1000 ft (Chapter 9, Table 8),
    /// scaled from the 75°C value to the insulation rating.
    pub fn conductor_resistance(
        &self,
        material: ConductorMaterial,
        gauge: &Gauge,
        rating: TemperatureRating,
    ) -> CalcResult<f64> {
        let base = self
            .conductor_resistance
            .get(&(material, gauge.clone()))
            .copied()
            .ok_or_else(|| {
                CalcError::unknown_gauge(
                    gauge.as_str(),
                    format!("{} resistance (Chapter 9, Table 8)", material),
                )
            })?;
        let factor = self
            .temperature_factors
            .get(&rating)
            .copied()
            .ok_or_else(|| CalcError::unknown_lookup("voltage_drop.temperature_factors", rating.code()))?;
        Ok(base * factor)
    }

    /// Inductive reactance in ohms per 1000 ft (Chapter 9, Table 9),
    /// scaled from the PVC value to the raceway.
    pub fn conductor_reactance(&self, raceway: RacewayMaterial, gauge: &Gauge) -> CalcResult<f64> {
        let base = self
            .conductor_reactance
            .get(gauge)
            .copied()
            .ok_or_else(|| CalcError::unknown_gauge(gauge.as_str(), "reactance (Chapter 9, Table 9)"))?;
        let factor = self
            .reactance_factors
            .get(&raceway)
            .copied()
            .ok_or_else(|| CalcError::unknown_lookup("voltage_drop.reactance_factors", raceway.code()))?;
        Ok(base * factor)
    }

    /// Recommended maximum voltage drop, percent of source voltage
    pub fn voltage_drop_limit_percent(&self) -> f64 {
        self.voltage_drop_limit_percent
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            edition: self.edition.clone(),
            conductor_volume_gauges: self
                .conductor_volumes
                .keys()
                .map(|g| g.to_string())
                .collect(),
            standard_boxes: self.box_volumes.len(),
            conductor_area_entries: self.conductor_areas.len(),
            conduit_area_entries: self.conduit_areas.len(),
            fill_caps: self.fill_caps,
            lighting_va_per_sq_ft: self.dwelling.lighting_va_per_sq_ft,
            demand_brackets: self.demand_brackets.clone(),
            resistance_entries: self.conductor_resistance.len(),
            voltage_drop_limit_percent: self.voltage_drop_limit_percent,
        }
    }
}

fn table_gauge(key: &str, table: &str) -> CalcResult<Gauge> {
    Gauge::parse(key).map_err(|_| CalcError::table_error(format!("{}: bad gauge key '{}'", table, key)))
}

fn positive(value: f64, table: &str, key: &str) -> CalcResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(CalcError::table_error(format!(
            "{}: value for '{}' must be positive, got {}",
            table, key, value
        )))
    }
}

/// Parse a factor table that must name every variant of a category.
fn complete_factors<K: Ord + Copy>(
    rows: BTreeMap<String, f64>,
    table: &str,
    all: &[K],
    parse: fn(&str) -> CalcResult<K>,
    code: fn(&K) -> &'static str,
) -> CalcResult<BTreeMap<K, f64>> {
    let mut factors = BTreeMap::new();
    for (key, factor) in rows {
        let variant = parse(&key).map_err(|e| CalcError::table_error(format!("{}: {}", table, e)))?;
        positive(factor, table, &key)?;
        factors.insert(variant, factor);
    }
    if let Some(missing) = all.iter().find(|k| !factors.contains_key(*k)) {
        return Err(CalcError::table_error(format!("{}: missing '{}'", table, code(missing))));
    }
    Ok(factors)
}

fn validate_dwelling(dwelling: &DwellingFactors) -> CalcResult<()> {
    positive(dwelling.lighting_va_per_sq_ft, "dwelling", "lighting_va_per_sq_ft")?;
    positive(dwelling.small_appliance_circuit_va, "dwelling", "small_appliance_circuit_va")?;
    positive(dwelling.laundry_circuit_va, "dwelling", "laundry_circuit_va")?;
    if dwelling.largest_motor_factor < 1.0 {
        return Err(CalcError::table_error(
            "dwelling.largest_motor_factor must be at least 1.0",
        ));
    }
    let ratings = &dwelling.service_ratings_amps;
    if ratings.is_empty() || ratings.windows(2).any(|w| w[0] >= w[1]) {
        return Err(CalcError::table_error(
            "dwelling.service_ratings_amps must be non-empty and strictly ascending",
        ));
    }
    Ok(())
}

fn validate_brackets(brackets: &[DemandBracket]) -> CalcResult<()> {
    let Some((last, bounded)) = brackets.split_last() else {
        return Err(CalcError::table_error("demand_brackets must not be empty"));
    };
    if last.up_to_va.is_some() {
        return Err(CalcError::table_error(
            "the last demand bracket must be open-ended (no up_to_va)",
        ));
    }
    let mut previous = 0.0;
    for bracket in bounded {
        match bracket.up_to_va {
            Some(upper) if upper > previous => previous = upper,
            Some(upper) => {
                return Err(CalcError::table_error(format!(
                    "demand bracket bounds must ascend, {} follows {}",
                    upper, previous
                )))
            }
            None => {
                return Err(CalcError::table_error(
                    "only the last demand bracket may be open-ended",
                ))
            }
        }
    }
    for bracket in brackets {
        if !(bracket.factor > 0.0 && bracket.factor <= 1.0) {
            return Err(CalcError::table_error(format!(
                "demand factor must be in (0, 1], got {}",
                bracket.factor
            )));
        }
    }
    Ok(())
}

/// `4 x 4 x 1-1/2"` style labels reduce to `4x4x1-1/2`
pub(crate) fn normalize_dimensions(dimensions: &str) -> String {
    dimensions
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '"')
        .map(|c| if c == '×' { 'x' } else { c.to_ascii_lowercase() })
        .collect()
}

/// `1 1/4"` and `1-1/4` both reduce to `1-1/4`
pub(crate) fn normalize_trade_size(size: &str) -> String {
    let trimmed = size.trim().trim_end_matches('"').trim();
    let trimmed = trimmed.strip_suffix("in").unwrap_or(trimmed).trim();
    trimmed.split_whitespace().collect::<Vec<_>>().join("-")
}
