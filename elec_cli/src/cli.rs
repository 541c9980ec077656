//! CLI definition using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use elec_core::categories::{
    BoxType, ConductorMaterial, ConduitType, RacewayMaterial, SystemType, TemperatureRating,
};
use elec_core::gauge::Gauge;
use serde::{Deserialize, Serialize};

use crate::shorthand::{parse_appliance, parse_wire, ApplianceArg, WireArg};

/// Output format for results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "elec")]
#[command(version)]
#[command(about = "Box fill, conduit fill, dwelling load and voltage drop checks against the NEC")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Code tables TOML file (defaults to the embedded NEC 2023 tables)
    #[arg(long, global = true, env = "ELEC_TABLES")]
    pub tables: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Exit non-zero when a result is out of limits
    #[arg(long, global = true)]
    pub strict: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Box fill (NEC 314.16)
    Box {
        /// Marked box volume in cubic inches
        #[arg(long)]
        volume: Option<f64>,

        /// Box type for standard volume lookup
        #[arg(long = "box-type", default_value = "device")]
        box_type: BoxType,

        /// Box dimensions, e.g. 4x4x1.5 (looked up when --volume is absent)
        #[arg(long, default_value = "")]
        dims: String,

        /// Insulated conductors, e.g. 2x14 (repeatable)
        #[arg(long, value_parser = parse_wire)]
        wire: Vec<WireArg>,

        /// Equipment grounding conductors, e.g. 2x14
        #[arg(long, value_parser = parse_wire)]
        ground: Vec<WireArg>,

        /// Device yokes, e.g. 1x14
        #[arg(long, value_parser = parse_wire)]
        device: Vec<WireArg>,

        /// Internal cable clamps, e.g. 1x14
        #[arg(long, value_parser = parse_wire)]
        clamp: Vec<WireArg>,

        /// Support fittings (studs, hickeys), e.g. 1x14
        #[arg(long, value_parser = parse_wire)]
        fitting: Vec<WireArg>,

        #[arg(long, default_value = "box")]
        label: String,
    },

    /// Conduit fill (NEC Chapter 9)
    Conduit {
        /// Raceway type (emt, imc, rmc, pvc_schedule_40, pvc_schedule_80, ent)
        #[arg(long = "type", default_value = "emt")]
        conduit_type: ConduitType,

        /// Trade size, e.g. 1/2, 3/4, 1-1/4
        #[arg(long)]
        size: String,

        /// Internal area override in square inches
        #[arg(long)]
        area: Option<f64>,

        /// Conductors as QTYxGAUGE[:INSULATION], e.g. 4x12:thhn (repeatable)
        #[arg(long, value_parser = parse_wire)]
        wire: Vec<WireArg>,

        #[arg(long, default_value = "conduit")]
        label: String,
    },

    /// Dwelling service load (NEC Article 220)
    Dwelling {
        /// Living area in square feet
        #[arg(long)]
        sqft: f64,

        /// Service voltage. Uses config value if not specified.
        #[arg(long)]
        voltage: Option<i32>,

        #[arg(long, default_value = "dwelling")]
        name: String,

        /// Small-appliance branch circuits (code minimum 2)
        #[arg(long = "small-appliance", default_value_t = 2)]
        small_appliance: u32,

        /// Laundry branch circuits (0 when the unit has no laundry)
        #[arg(long, default_value_t = 1)]
        laundry: u32,

        /// Non-motor appliance as NAME:WATTS[:QTY][:VOLTS] (repeatable)
        #[arg(long, value_parser = parse_appliance)]
        appliance: Vec<ApplianceArg>,

        /// Motor load as NAME:WATTS[:QTY][:VOLTS] (repeatable)
        #[arg(long, value_parser = parse_appliance)]
        motor: Vec<ApplianceArg>,
    },

    /// Voltage drop over a circuit run (NEC Chapter 9, Tables 8 and 9)
    #[command(visible_alias = "drop")]
    VoltageDrop {
        /// single_phase, three_phase or dc
        #[arg(long, default_value = "single_phase")]
        system: SystemType,

        /// copper or aluminum
        #[arg(long, default_value = "copper")]
        material: ConductorMaterial,

        /// pvc, steel, aluminum or direct_burial
        #[arg(long, default_value = "pvc")]
        raceway: RacewayMaterial,

        /// Insulation temperature rating: 60c, 75c or 90c
        #[arg(long = "temp", default_value = "75c")]
        temperature_rating: TemperatureRating,

        /// Conductor size, e.g. 12, 1/0, 250kcmil
        #[arg(long)]
        gauge: Gauge,

        /// One-way length in feet
        #[arg(long)]
        length: f64,

        /// Load current in amperes
        #[arg(long)]
        amps: f64,

        /// Source voltage
        #[arg(long)]
        volts: f64,

        /// Power factor, ignored for DC
        #[arg(long, default_value_t = 1.0)]
        pf: f64,

        /// Allowed drop in percent (defaults to the tables' recommendation)
        #[arg(long)]
        limit: Option<f64>,

        #[arg(long, default_value = "circuit")]
        label: String,
    },

    /// Run a calculation described by a JSON file
    Calc {
        /// JSON calculation item ("type": BoxFill | ConduitFill | DwellingLoad | VoltageDrop)
        input: PathBuf,
    },

    /// Manage job files
    Job {
        #[command(subcommand)]
        action: JobAction,
    },

    /// Show the active code tables
    Tables,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum JobAction {
    /// Create an empty job file
    New {
        file: PathBuf,

        #[arg(long, default_value = "")]
        number: String,

        #[arg(long, default_value = "")]
        client: String,

        /// Responsible person (defaults to the configured user)
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show catalogs and stored results
    Show { file: PathBuf },

    /// Add a JSON calculation item to a job
    Add { file: PathBuf, input: PathBuf },

    /// Recalculate every record and save the results
    Recalc { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
