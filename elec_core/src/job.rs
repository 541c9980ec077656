//! # Job Data Structures
//!
//! A `Job` is the root container for everything stored about one site:
//! catalogs of wire and appliance records, the box fill, conduit fill
//! and dwelling load records that reference them, and self-contained
//! voltage drop records. Jobs serialize to `.elj`
//! files as human-readable JSON (see [`store`](crate::store) for atomic saves).
//!
//! ## Structure
//!
//! ```text
//! Job
//! ├── meta: JobMetadata (version, owner, job number, client, timestamps)
//! ├── settings: JobSettings (code edition, default service voltage)
//! ├── wires: HashMap<Uuid, WireRecord>            catalog
//! ├── appliances: HashMap<Uuid, ApplianceRecord>  catalog
//! ├── box_fills: HashMap<Uuid, BoxFillRecord>          ─┐
//! ├── conduit_fills: HashMap<Uuid, ConduitFillRecord>   ├─ {id, quantity} → catalog
//! ├── dwelling_loads: HashMap<Uuid, DwellingLoadRecord> ─┘
//! └── voltage_drops: HashMap<Uuid, VoltageDropRecord>     circuit inline
//! ```
//!
//! Associations always point from a calculation record into a catalog,
//! never the other way, so a catalog entry cannot be removed while any
//! record still uses it.
//!
//! ## Example
//!
//! ```rust
//! use elec_core::calculations::BoxDescriptor;
//! use elec_core::categories::{BoxType, ConductorType};
//! use elec_core::code_tables::CodeTables;
//! use elec_core::gauge::Gauge;
//! use elec_core::job::{Association, BoxFillRecord, Job, WireRecord};
//!
//! let mut job = Job::new("J. Sparks", "24-117", "Harbor Homes");
//! let wire = job.add_wire(WireRecord::new(ConductorType::Wire, Gauge::parse("14").unwrap()));
//!
//! let record = BoxFillRecord::new(
//!     "Hall switch",
//!     BoxDescriptor::with_volume(BoxType::Device, "3x2x3.5", 18.0),
//!     vec![Association::new(wire, 2)],
//! );
//! let id = job.add_box_fill(record).unwrap();
//!
//! let result = job.recalculate_box_fill(&id, CodeTables::nec_2023()).unwrap();
//! assert_eq!(result.total_required_volume_in3, 4.0);
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::{
    box_fill, conduit_fill, dwelling_load, voltage_drop, ApplianceSpec, BoxDescriptor,
    BoxFillResult, CalculationItem, CircuitDescriptor, ConduitDescriptor, ConduitFillResult,
    DwellingDescriptor, DwellingLoadResult, VoltageDropResult,
};
use crate::categories::{ConductorType, Insulation};
use crate::code_tables::CodeTables;
use crate::errors::{CalcError, CalcResult};
use crate::gauge::Gauge;
use crate::wire::WireSpec;

/// Current schema version for .elj files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root job container, serialized to `.elj` files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub meta: JobMetadata,

    pub settings: JobSettings,

    #[serde(default)]
    pub wires: HashMap<Uuid, WireRecord>,

    #[serde(default)]
    pub appliances: HashMap<Uuid, ApplianceRecord>,

    #[serde(default)]
    pub box_fills: HashMap<Uuid, BoxFillRecord>,

    #[serde(default)]
    pub conduit_fills: HashMap<Uuid, ConduitFillRecord>,

    #[serde(default)]
    pub dwelling_loads: HashMap<Uuid, DwellingLoadRecord>,

    #[serde(default)]
    pub voltage_drops: HashMap<Uuid, VoltageDropRecord>,
}

/// Job metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Electrician or engineer responsible for the job
    pub owner: String,

    /// Job number, e.g. "24-117"
    pub job_number: String,

    pub client: String,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

/// Job-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Code edition the results were computed against, e.g. "NEC 2023"
    pub code_edition: String,

    /// Service voltage used for new dwelling records
    pub default_service_voltage: i32,
}

impl Default for JobSettings {
    fn default() -> Self {
        JobSettings {
            code_edition: CodeTables::nec_2023().edition().to_string(),
            default_service_voltage: 240,
        }
    }
}

/// Catalog entry for a conductor, device, clamp or fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    pub gauge: Gauge,

    #[serde(default)]
    pub conductor_type: ConductorType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulation: Option<Insulation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_sq_in: Option<f64>,
}

impl WireRecord {
    pub fn new(conductor_type: ConductorType, gauge: Gauge) -> Self {
        WireRecord {
            gauge,
            conductor_type,
            insulation: None,
            area_sq_in: None,
        }
    }

    /// Value input for the calculators
    pub fn spec(&self, quantity: i32) -> WireSpec {
        WireSpec {
            gauge: self.gauge.clone(),
            conductor_type: self.conductor_type,
            quantity,
            insulation: self.insulation,
            area_sq_in: self.area_sq_in,
        }
    }

    fn from_spec(spec: &WireSpec) -> Self {
        WireRecord {
            gauge: spec.gauge.clone(),
            conductor_type: spec.conductor_type,
            insulation: spec.insulation,
            area_sq_in: spec.area_sq_in,
        }
    }
}

/// Catalog entry for an appliance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceRecord {
    pub name: String,
    pub wattage: f64,
    pub voltage_rating: f64,
    #[serde(default)]
    pub is_motor_load: bool,
}

impl ApplianceRecord {
    pub fn new(name: impl Into<String>, wattage: f64, voltage_rating: f64, is_motor_load: bool) -> Self {
        ApplianceRecord {
            name: name.into(),
            wattage,
            voltage_rating,
            is_motor_load,
        }
    }

    pub fn spec(&self, quantity: i32) -> ApplianceSpec {
        ApplianceSpec {
            name: self.name.clone(),
            wattage: self.wattage,
            voltage_rating: self.voltage_rating,
            is_motor_load: self.is_motor_load,
            quantity,
        }
    }

    fn from_spec(spec: &ApplianceSpec) -> Self {
        ApplianceRecord::new(spec.name.clone(), spec.wattage, spec.voltage_rating, spec.is_motor_load)
    }
}

/// Join row: a catalog entry used `quantity` times by a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub id: Uuid,
    pub quantity: i32,
}

impl Association {
    pub fn new(id: Uuid, quantity: i32) -> Self {
        Association { id, quantity }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxFillRecord {
    pub label: String,

    #[serde(rename = "box")]
    pub descriptor: BoxDescriptor,

    #[serde(default)]
    pub wires: Vec<Association>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<BoxFillResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_at: Option<DateTime<Utc>>,
}

impl BoxFillRecord {
    pub fn new(label: impl Into<String>, descriptor: BoxDescriptor, wires: Vec<Association>) -> Self {
        BoxFillRecord {
            label: label.into(),
            descriptor,
            wires,
            result: None,
            calculated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConduitFillRecord {
    pub label: String,

    pub conduit: ConduitDescriptor,

    #[serde(default)]
    pub wires: Vec<Association>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ConduitFillResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_at: Option<DateTime<Utc>>,
}

impl ConduitFillRecord {
    pub fn new(label: impl Into<String>, conduit: ConduitDescriptor, wires: Vec<Association>) -> Self {
        ConduitFillRecord {
            label: label.into(),
            conduit,
            wires,
            result: None,
            calculated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DwellingLoadRecord {
    pub label: String,

    pub dwelling: DwellingDescriptor,

    #[serde(default)]
    pub appliances: Vec<Association>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DwellingLoadResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_at: Option<DateTime<Utc>>,
}

impl DwellingLoadRecord {
    pub fn new(
        label: impl Into<String>,
        dwelling: DwellingDescriptor,
        appliances: Vec<Association>,
    ) -> Self {
        DwellingLoadRecord {
            label: label.into(),
            dwelling,
            appliances,
            result: None,
            calculated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageDropRecord {
    pub label: String,

    pub circuit: CircuitDescriptor,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<VoltageDropResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_at: Option<DateTime<Utc>>,
}

impl VoltageDropRecord {
    pub fn new(label: impl Into<String>, circuit: CircuitDescriptor) -> Self {
        VoltageDropRecord {
            label: label.into(),
            circuit,
            result: None,
            calculated_at: None,
        }
    }
}

/// Kind of calculation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    BoxFill,
    ConduitFill,
    DwellingLoad,
    VoltageDrop,
}

impl RecordKind {
    pub fn name(&self) -> &'static str {
        match self {
            RecordKind::BoxFill => "box fill",
            RecordKind::ConduitFill => "conduit fill",
            RecordKind::DwellingLoad => "dwelling load",
            RecordKind::VoltageDrop => "voltage drop",
        }
    }
}

/// Outcome of recalculating one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalcReport {
    pub id: Uuid,
    pub kind: RecordKind,
    pub label: String,
    /// Verdict when the calculation succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within_limits: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CalcError>,
}

impl RecalcReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl Job {
    /// Create a new empty job.
    ///
    /// # Example
    ///
    /// ```rust
    /// use elec_core::job::Job;
    ///
    /// let job = Job::new("J. Sparks", "24-117", "Harbor Homes");
    /// assert_eq!(job.meta.job_number, "24-117");
    /// ```
    pub fn new(owner: impl Into<String>, job_number: impl Into<String>, client: impl Into<String>) -> Self {
        let now = Utc::now();
        Job {
            meta: JobMetadata {
                version: SCHEMA_VERSION.to_string(),
                owner: owner.into(),
                job_number: job_number.into(),
                client: client.into(),
                created: now,
                modified: now,
            },
            settings: JobSettings::default(),
            wires: HashMap::new(),
            appliances: HashMap::new(),
            box_fills: HashMap::new(),
            conduit_fills: HashMap::new(),
            dwelling_loads: HashMap::new(),
            voltage_drops: HashMap::new(),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn record_count(&self) -> usize {
        self.box_fills.len()
            + self.conduit_fills.len()
            + self.dwelling_loads.len()
            + self.voltage_drops.len()
    }

    // --- catalogs ---

    pub fn add_wire(&mut self, record: WireRecord) -> Uuid {
        let id = Uuid::new_v4();
        self.wires.insert(id, record);
        self.touch();
        id
    }

    /// Remove a wire catalog entry.
    ///
    /// Refused with `InvalidInput` while a box or conduit record uses it.
    pub fn remove_wire(&mut self, id: &Uuid) -> CalcResult<WireRecord> {
        if !self.wires.contains_key(id) {
            return Err(CalcError::record_not_found("wire", id));
        }
        let users: Vec<&str> = self
            .box_fills
            .values()
            .filter(|r| r.wires.iter().any(|a| a.id == *id))
            .map(|r| r.label.as_str())
            .chain(
                self.conduit_fills
                    .values()
                    .filter(|r| r.wires.iter().any(|a| a.id == *id))
                    .map(|r| r.label.as_str()),
            )
            .collect();
        if !users.is_empty() {
            return Err(CalcError::invalid_input(
                "wire",
                id.to_string(),
                format!("Still referenced by: {}", users.join(", ")),
            ));
        }
        let record = self.wires.remove(id).ok_or_else(|| CalcError::record_not_found("wire", id))?;
        self.touch();
        Ok(record)
    }

    pub fn add_appliance(&mut self, record: ApplianceRecord) -> Uuid {
        let id = Uuid::new_v4();
        self.appliances.insert(id, record);
        self.touch();
        id
    }

    /// Remove an appliance catalog entry.
    ///
    /// Refused with `InvalidInput` while a dwelling record uses it.
    pub fn remove_appliance(&mut self, id: &Uuid) -> CalcResult<ApplianceRecord> {
        if !self.appliances.contains_key(id) {
            return Err(CalcError::record_not_found("appliance", id));
        }
        let users: Vec<&str> = self
            .dwelling_loads
            .values()
            .filter(|r| r.appliances.iter().any(|a| a.id == *id))
            .map(|r| r.label.as_str())
            .collect();
        if !users.is_empty() {
            return Err(CalcError::invalid_input(
                "appliance",
                id.to_string(),
                format!("Still referenced by: {}", users.join(", ")),
            ));
        }
        let record = self
            .appliances
            .remove(id)
            .ok_or_else(|| CalcError::record_not_found("appliance", id))?;
        self.touch();
        Ok(record)
    }

    // --- calculation records ---

    /// Add a box fill record. Every association must name a catalog wire.
    pub fn add_box_fill(&mut self, record: BoxFillRecord) -> CalcResult<Uuid> {
        self.check_wire_refs(&record.wires)?;
        let id = Uuid::new_v4();
        self.box_fills.insert(id, record);
        self.touch();
        Ok(id)
    }

    pub fn remove_box_fill(&mut self, id: &Uuid) -> Option<BoxFillRecord> {
        let record = self.box_fills.remove(id);
        if record.is_some() {
            self.touch();
        }
        record
    }

    /// Add a conduit fill record. Every association must name a catalog wire.
    pub fn add_conduit_fill(&mut self, record: ConduitFillRecord) -> CalcResult<Uuid> {
        self.check_wire_refs(&record.wires)?;
        let id = Uuid::new_v4();
        self.conduit_fills.insert(id, record);
        self.touch();
        Ok(id)
    }

    pub fn remove_conduit_fill(&mut self, id: &Uuid) -> Option<ConduitFillRecord> {
        let record = self.conduit_fills.remove(id);
        if record.is_some() {
            self.touch();
        }
        record
    }

    /// Add a dwelling load record. Every association must name a catalog appliance.
    pub fn add_dwelling_load(&mut self, record: DwellingLoadRecord) -> CalcResult<Uuid> {
        for assoc in &record.appliances {
            if !self.appliances.contains_key(&assoc.id) {
                return Err(CalcError::record_not_found("appliance", assoc.id));
            }
        }
        let id = Uuid::new_v4();
        self.dwelling_loads.insert(id, record);
        self.touch();
        Ok(id)
    }

    pub fn remove_dwelling_load(&mut self, id: &Uuid) -> Option<DwellingLoadRecord> {
        let record = self.dwelling_loads.remove(id);
        if record.is_some() {
            self.touch();
        }
        record
    }

    /// Add a voltage drop record. The circuit is stored inline.
    pub fn add_voltage_drop(&mut self, record: VoltageDropRecord) -> Uuid {
        let id = Uuid::new_v4();
        self.voltage_drops.insert(id, record);
        self.touch();
        id
    }

    pub fn remove_voltage_drop(&mut self, id: &Uuid) -> Option<VoltageDropRecord> {
        let record = self.voltage_drops.remove(id);
        if record.is_some() {
            self.touch();
        }
        record
    }

    /// Store a value-level calculation as catalog entries plus a record.
    ///
    /// Inventory lines matching an existing catalog entry reuse it.
    pub fn import_item(&mut self, item: &CalculationItem) -> CalcResult<(RecordKind, Uuid)> {
        match item {
            CalculationItem::BoxFill(input) => {
                let wires = self.import_wires(&input.wires);
                let record = BoxFillRecord::new(input.label.clone(), input.descriptor.clone(), wires);
                Ok((RecordKind::BoxFill, self.add_box_fill(record)?))
            }
            CalculationItem::ConduitFill(input) => {
                let wires = self.import_wires(&input.wires);
                let record = ConduitFillRecord::new(input.label.clone(), input.conduit.clone(), wires);
                Ok((RecordKind::ConduitFill, self.add_conduit_fill(record)?))
            }
            CalculationItem::DwellingLoad(input) => {
                let appliances = input
                    .appliances
                    .iter()
                    .map(|spec| {
                        let id = self.find_or_add_appliance(ApplianceRecord::from_spec(spec));
                        Association::new(id, spec.quantity)
                    })
                    .collect();
                let record =
                    DwellingLoadRecord::new(input.label.clone(), input.dwelling.clone(), appliances);
                Ok((RecordKind::DwellingLoad, self.add_dwelling_load(record)?))
            }
            CalculationItem::VoltageDrop(input) => {
                let record = VoltageDropRecord::new(input.label.clone(), input.circuit.clone());
                Ok((RecordKind::VoltageDrop, self.add_voltage_drop(record)))
            }
        }
    }

    fn import_wires(&mut self, specs: &[WireSpec]) -> Vec<Association> {
        specs
            .iter()
            .map(|spec| {
                let id = self.find_or_add_wire(WireRecord::from_spec(spec));
                Association::new(id, spec.quantity)
            })
            .collect()
    }

    fn find_or_add_wire(&mut self, record: WireRecord) -> Uuid {
        let existing = self
            .wires
            .iter()
            .find(|(_, w)| **w == record)
            .map(|(id, _)| *id);
        match existing {
            Some(id) => id,
            None => self.add_wire(record),
        }
    }

    fn find_or_add_appliance(&mut self, record: ApplianceRecord) -> Uuid {
        let existing = self
            .appliances
            .iter()
            .find(|(_, a)| **a == record)
            .map(|(id, _)| *id);
        match existing {
            Some(id) => id,
            None => self.add_appliance(record),
        }
    }

    fn check_wire_refs(&self, associations: &[Association]) -> CalcResult<()> {
        for assoc in associations {
            if !self.wires.contains_key(&assoc.id) {
                return Err(CalcError::record_not_found("wire", assoc.id));
            }
        }
        Ok(())
    }

    fn resolve_wires(&self, associations: &[Association]) -> CalcResult<Vec<WireSpec>> {
        associations
            .iter()
            .map(|assoc| {
                self.wires
                    .get(&assoc.id)
                    .map(|w| w.spec(assoc.quantity))
                    .ok_or_else(|| CalcError::record_not_found("wire", assoc.id))
            })
            .collect()
    }

    fn resolve_appliances(&self, associations: &[Association]) -> CalcResult<Vec<ApplianceSpec>> {
        associations
            .iter()
            .map(|assoc| {
                self.appliances
                    .get(&assoc.id)
                    .map(|a| a.spec(assoc.quantity))
                    .ok_or_else(|| CalcError::record_not_found("appliance", assoc.id))
            })
            .collect()
    }

    // --- recalculation ---

    /// Recompute a box fill record and store the result.
    ///
    /// On failure the previously stored result is kept.
    pub fn recalculate_box_fill(&mut self, id: &Uuid, tables: &CodeTables) -> CalcResult<&BoxFillResult> {
        let record = self
            .box_fills
            .get(id)
            .ok_or_else(|| CalcError::record_not_found("box fill", id))?;
        let wires = self.resolve_wires(&record.wires)?;
        let result = box_fill::calculate_with(tables, &record.descriptor, &wires)?;

        self.touch();
        let record = self
            .box_fills
            .get_mut(id)
            .ok_or_else(|| CalcError::record_not_found("box fill", id))?;
        record.calculated_at = Some(Utc::now());
        Ok(record.result.insert(result))
    }

    /// Recompute a conduit fill record and store the result.
    ///
    /// On failure the previously stored result is kept.
    pub fn recalculate_conduit_fill(
        &mut self,
        id: &Uuid,
        tables: &CodeTables,
    ) -> CalcResult<&ConduitFillResult> {
        let record = self
            .conduit_fills
            .get(id)
            .ok_or_else(|| CalcError::record_not_found("conduit fill", id))?;
        let wires = self.resolve_wires(&record.wires)?;
        let result = conduit_fill::calculate_with(tables, &record.conduit, &wires)?;

        self.touch();
        let record = self
            .conduit_fills
            .get_mut(id)
            .ok_or_else(|| CalcError::record_not_found("conduit fill", id))?;
        record.calculated_at = Some(Utc::now());
        Ok(record.result.insert(result))
    }

    /// Recompute a dwelling load record and store the result.
    ///
    /// On failure the previously stored result is kept.
    pub fn recalculate_dwelling_load(
        &mut self,
        id: &Uuid,
        tables: &CodeTables,
    ) -> CalcResult<&DwellingLoadResult> {
        let record = self
            .dwelling_loads
            .get(id)
            .ok_or_else(|| CalcError::record_not_found("dwelling load", id))?;
        let appliances = self.resolve_appliances(&record.appliances)?;
        let result = dwelling_load::calculate_with(tables, &record.dwelling, &appliances)?;

        self.touch();
        let record = self
            .dwelling_loads
            .get_mut(id)
            .ok_or_else(|| CalcError::record_not_found("dwelling load", id))?;
        record.calculated_at = Some(Utc::now());
        Ok(record.result.insert(result))
    }

    /// Recompute a voltage drop record and store the result.
    ///
    /// On failure the previously stored result is kept.
    pub fn recalculate_voltage_drop(
        &mut self,
        id: &Uuid,
        tables: &CodeTables,
    ) -> CalcResult<&VoltageDropResult> {
        let record = self
            .voltage_drops
            .get(id)
            .ok_or_else(|| CalcError::record_not_found("voltage drop", id))?;
        let result = voltage_drop::calculate_with(tables, &record.circuit)?;

        self.touch();
        let record = self
            .voltage_drops
            .get_mut(id)
            .ok_or_else(|| CalcError::record_not_found("voltage drop", id))?;
        record.calculated_at = Some(Utc::now());
        Ok(record.result.insert(result))
    }

    /// Recompute one record of any kind and report the outcome.
    pub fn recalculate(&mut self, kind: RecordKind, id: &Uuid, tables: &CodeTables) -> RecalcReport {
        let label = match kind {
            RecordKind::BoxFill => self.box_fills.get(id).map(|r| r.label.clone()),
            RecordKind::ConduitFill => self.conduit_fills.get(id).map(|r| r.label.clone()),
            RecordKind::DwellingLoad => self.dwelling_loads.get(id).map(|r| r.label.clone()),
            RecordKind::VoltageDrop => self.voltage_drops.get(id).map(|r| r.label.clone()),
        }
        .unwrap_or_default();

        let outcome = match kind {
            RecordKind::BoxFill => self.recalculate_box_fill(id, tables).map(|r| r.within_limits),
            RecordKind::ConduitFill => self.recalculate_conduit_fill(id, tables).map(|r| r.within_limits),
            RecordKind::DwellingLoad => self.recalculate_dwelling_load(id, tables).map(|_| true),
            RecordKind::VoltageDrop => self.recalculate_voltage_drop(id, tables).map(|r| r.within_limits),
        };
        if let Err(e) = &outcome {
            tracing::warn!(kind = kind.name(), label = %label, error = %e, "recalculation failed");
        }

        let (within_limits, error) = match outcome {
            Ok(verdict) => (Some(verdict), None),
            Err(e) => (None, Some(e)),
        };
        RecalcReport {
            id: *id,
            kind,
            label,
            within_limits,
            error,
        }
    }

    /// Recompute every record, ordered by kind then label.
    ///
    /// One failing record does not stop the others. The job's code edition
    /// moves to `tables` only when every record succeeds.
    pub fn recalculate_all(&mut self, tables: &CodeTables) -> Vec<RecalcReport> {
        let mut targets: Vec<(RecordKind, String, Uuid)> = self
            .box_fills
            .iter()
            .map(|(id, r)| (RecordKind::BoxFill, r.label.clone(), *id))
            .chain(self.conduit_fills.iter().map(|(id, r)| (RecordKind::ConduitFill, r.label.clone(), *id)))
            .chain(self.dwelling_loads.iter().map(|(id, r)| (RecordKind::DwellingLoad, r.label.clone(), *id)))
            .chain(self.voltage_drops.iter().map(|(id, r)| (RecordKind::VoltageDrop, r.label.clone(), *id)))
            .collect();
        targets.sort();

        let reports: Vec<RecalcReport> = targets
            .into_iter()
            .map(|(kind, _, id)| self.recalculate(kind, &id, tables))
            .collect();

        let failed = reports.iter().filter(|r| !r.is_ok()).count();
        if failed == 0 {
            self.settings.code_edition = tables.edition().to_string();
        }
        tracing::info!(
            job = %self.meta.job_number,
            records = reports.len(),
            failed,
            "job recalculated"
        );
        reports
    }
}

impl Default for Job {
    fn default() -> Self {
        Job::new("", "", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::{BoxFillInput, DwellingLoadInput, VoltageDropInput};
    use crate::categories::{BoxType, ConduitType};

    fn g(text: &str) -> Gauge {
        Gauge::parse(text).unwrap()
    }

    fn job_with_box() -> (Job, Uuid, Uuid) {
        let mut job = Job::new("Test Owner", "24-001", "Test Client");
        let wire = job.add_wire(WireRecord::new(ConductorType::Wire, g("14")));
        let record = BoxFillRecord::new(
            "J-1",
            BoxDescriptor::with_volume(BoxType::Device, "3x2x3.5", 18.0),
            vec![Association::new(wire, 2)],
        );
        let id = job.add_box_fill(record).unwrap();
        (job, wire, id)
    }

    #[test]
    fn test_job_creation() {
        let job = Job::new("Test Owner", "24-001", "Test Client");
        assert_eq!(job.meta.owner, "Test Owner");
        assert_eq!(job.meta.version, SCHEMA_VERSION);
        assert_eq!(job.settings.code_edition, "NEC 2023");
        assert_eq!(job.settings.default_service_voltage, 240);
        assert_eq!(job.record_count(), 0);
    }

    #[test]
    fn test_recalculate_box_fill_stores_result() {
        let (mut job, _, id) = job_with_box();
        assert!(job.box_fills[&id].result.is_none());

        let total = job
            .recalculate_box_fill(&id, CodeTables::nec_2023())
            .unwrap()
            .total_required_volume_in3;
        assert_eq!(total, 4.0);

        let record = &job.box_fills[&id];
        assert!(record.result.is_some());
        assert!(record.calculated_at.is_some());
    }

    #[test]
    fn test_failed_recalculation_keeps_previous_result() {
        let (mut job, _, id) = job_with_box();
        job.recalculate_box_fill(&id, CodeTables::nec_2023()).unwrap();
        let before = job.box_fills[&id].result.clone();
        let stamped = job.box_fills[&id].calculated_at;

        job.box_fills.get_mut(&id).unwrap().wires[0].quantity = -3;
        let err = job.recalculate_box_fill(&id, CodeTables::nec_2023()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert_eq!(job.box_fills[&id].result, before);
        assert_eq!(job.box_fills[&id].calculated_at, stamped);
    }

    #[test]
    fn test_referenced_wire_cannot_be_removed() {
        let (mut job, wire, id) = job_with_box();
        let err = job.remove_wire(&wire).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(err.to_string().contains("J-1"));

        job.remove_box_fill(&id).unwrap();
        assert!(job.remove_wire(&wire).is_ok());
        assert!(job.wires.is_empty());
    }

    #[test]
    fn test_missing_references() {
        let mut job = Job::new("Owner", "24-002", "Client");
        let record = ConduitFillRecord::new(
            "C-1",
            ConduitDescriptor::standard(ConduitType::Emt, "1/2"),
            vec![Association::new(Uuid::new_v4(), 3)],
        );
        assert_eq!(job.add_conduit_fill(record).unwrap_err().error_code(), "RECORD_NOT_FOUND");
        assert_eq!(
            job.remove_appliance(&Uuid::new_v4()).unwrap_err().error_code(),
            "RECORD_NOT_FOUND"
        );
        assert!(job.recalculate_dwelling_load(&Uuid::new_v4(), CodeTables::nec_2023()).is_err());
    }

    #[test]
    fn test_dwelling_record() {
        let mut job = Job::new("Owner", "24-003", "Client");
        let pump = job.add_appliance(ApplianceRecord::new("Well pump", 1000.0, 240.0, true));
        let record = DwellingLoadRecord::new(
            "Main house",
            DwellingDescriptor::new("Main house", 1500.0, 240),
            vec![Association::new(pump, 1)],
        );
        let id = job.add_dwelling_load(record).unwrap();
        let result = job.recalculate_dwelling_load(&id, CodeTables::nec_2023()).unwrap();
        assert_eq!(result.total_va, 4775.0);

        assert!(job.remove_appliance(&pump).is_err());
    }

    #[test]
    fn test_recalculate_all_reports_each_record() {
        let (mut job, wire, _) = job_with_box();
        let conduit = ConduitFillRecord::new(
            "C-1",
            ConduitDescriptor::standard(ConduitType::Emt, "9"),
            vec![Association::new(wire, 3)],
        );
        job.add_conduit_fill(conduit).unwrap();

        let reports = job.recalculate_all(CodeTables::nec_2023());
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].kind, RecordKind::BoxFill);
        assert_eq!(reports[0].within_limits, Some(true));
        assert_eq!(reports[1].kind, RecordKind::ConduitFill);
        assert_eq!(
            reports[1].error.as_ref().map(|e| e.error_code()),
            Some("UNKNOWN_CODE_LOOKUP")
        );
    }

    #[test]
    fn test_edition_only_updated_when_every_record_succeeds() {
        let tables = CodeTables::nec_2023();
        let (mut job, wire, _) = job_with_box();
        job.settings.code_edition = "NEC 2020".to_string();
        let conduit = ConduitFillRecord::new(
            "C-1",
            ConduitDescriptor::standard(ConduitType::Emt, "9"),
            vec![Association::new(wire, 3)],
        );
        let bad = job.add_conduit_fill(conduit).unwrap();

        job.recalculate_all(tables);
        assert_eq!(job.settings.code_edition, "NEC 2020");

        job.remove_conduit_fill(&bad);
        let reports = job.recalculate_all(tables);
        assert!(reports.iter().all(RecalcReport::is_ok));
        assert_eq!(job.settings.code_edition, tables.edition());
    }

    #[test]
    fn test_voltage_drop_record() {
        let mut job = Job::new("Owner", "24-005", "Client");
        let item = CalculationItem::VoltageDrop(VoltageDropInput {
            label: "Garage run".to_string(),
            circuit: CircuitDescriptor::single_phase(g("12"), 100.0, 20.0, 120.0),
        });
        let (kind, id) = job.import_item(&item).unwrap();
        assert_eq!(kind, RecordKind::VoltageDrop);
        assert_eq!(job.record_count(), 1);
        assert!(job.wires.is_empty());

        let report = job.recalculate(kind, &id, CodeTables::nec_2023());
        assert_eq!(report.label, "Garage run");
        assert_eq!(report.within_limits, Some(false));
        let stored = job.voltage_drops[&id].result.as_ref().unwrap();
        assert!((stored.voltage_drop_volts - 7.72).abs() < 1e-9);

        job.voltage_drops.get_mut(&id).unwrap().circuit.source_voltage = 0.0;
        let report = job.recalculate(kind, &id, CodeTables::nec_2023());
        assert_eq!(report.error.as_ref().map(|e| e.error_code()), Some("INVALID_INPUT"));
        assert!(job.voltage_drops[&id].result.is_some());

        assert!(job.remove_voltage_drop(&id).is_some());
        assert_eq!(job.record_count(), 0);
    }

    #[test]
    fn test_import_item_reuses_catalog_entries() {
        let mut job = Job::new("Owner", "24-004", "Client");
        let wires = vec![WireSpec::wire(g("12"), 4), WireSpec::ground(g("12"), 1)];
        let item = |label: &str| {
            CalculationItem::BoxFill(BoxFillInput {
                label: label.to_string(),
                descriptor: BoxDescriptor::standard(BoxType::Square, "4x4x1.5"),
                wires: wires.clone(),
            })
        };
        job.import_item(&item("B-1")).unwrap();
        job.import_item(&item("B-2")).unwrap();
        assert_eq!(job.wires.len(), 2);
        assert_eq!(job.box_fills.len(), 2);

        let dwelling = CalculationItem::DwellingLoad(DwellingLoadInput {
            label: "House".to_string(),
            dwelling: DwellingDescriptor::new("House", 2000.0, 240),
            appliances: vec![ApplianceSpec::new("Range", 8000.0, 240.0, 1)],
        });
        let (kind, id) = job.import_item(&dwelling).unwrap();
        assert_eq!(kind, RecordKind::DwellingLoad);
        assert_eq!(job.dwelling_loads[&id].appliances.len(), 1);
    }

    #[test]
    fn test_job_serialization() {
        let (mut job, _, _) = job_with_box();
        job.recalculate_all(CodeTables::nec_2023());
        let json = serde_json::to_string_pretty(&job).unwrap();
        assert!(json.contains("24-001"));
        assert!(json.contains("calculated_at"));

        let roundtrip: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.box_fills.len(), 1);
        assert_eq!(roundtrip.wires.len(), 1);
    }
}
