//! Categorical codes shared by the calculators and the code tables.
//!
//! Each category has a stable `code()` used in JSON, in the code table
//! documents, and on the command line.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

macro_rules! categorical {
    ($name:ident, $field:literal) => {
        impl $name {
            /// Look up a variant by its code (case-insensitive, `-` treated as `_`)
            pub fn from_code(code: &str) -> CalcResult<Self> {
                let wanted = code.trim().to_ascii_lowercase().replace('-', "_");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.code() == wanted)
                    .ok_or_else(|| {
                        let known: Vec<&str> = Self::ALL.iter().map(|v| v.code()).collect();
                        CalcError::invalid_input(
                            $field,
                            code,
                            format!("Expected one of: {}", known.join(", ")),
                        )
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CalcError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_code(s)
            }
        }
    };
}

/// What a box-fill or conduit-fill entry represents (NEC 314.16(B)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConductorType {
    /// Insulated conductor entering the box
    #[default]
    Wire,
    /// Equipment grounding conductor
    Ground,
    /// Device yoke or strap (switch, receptacle)
    Device,
    /// Internal cable clamp
    Clamp,
    /// Fixture stud or hickey
    SupportFitting,
}

impl ConductorType {
    pub const ALL: [ConductorType; 5] = [
        ConductorType::Wire,
        ConductorType::Ground,
        ConductorType::Device,
        ConductorType::Clamp,
        ConductorType::SupportFitting,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ConductorType::Wire => "wire",
            ConductorType::Ground => "ground",
            ConductorType::Device => "device",
            ConductorType::Clamp => "clamp",
            ConductorType::SupportFitting => "support_fitting",
        }
    }

    /// Wires and grounds occupy raceway area; the rest only exist in boxes.
    pub fn is_conductor(&self) -> bool {
        matches!(self, ConductorType::Wire | ConductorType::Ground)
    }
}

categorical!(ConductorType, "conductor_type");

/// Conductor insulation type (NEC Chapter 9, Table 5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Insulation {
    /// THHN / THWN-2 nylon jacketed
    #[default]
    Thhn,
    /// THWN (dimensioned as THHN)
    Thwn,
    Thw,
    Xhhw,
    Tw,
}

impl Insulation {
    pub const ALL: [Insulation; 5] = [
        Insulation::Thhn,
        Insulation::Thwn,
        Insulation::Thw,
        Insulation::Xhhw,
        Insulation::Tw,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Insulation::Thhn => "thhn",
            Insulation::Thwn => "thwn",
            Insulation::Thw => "thw",
            Insulation::Xhhw => "xhhw",
            Insulation::Tw => "tw",
        }
    }
}

categorical!(Insulation, "insulation");

/// Box construction, the first half of a Table 314.16(A) key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoxType {
    /// Single-gang device box
    #[default]
    Device,
    /// Masonry box
    Masonry,
    /// Square box (4" and 4-11/16")
    Square,
    /// Round or octagonal ceiling box
    RoundOctagonal,
    /// Anything not in the standard table; volume must be supplied
    Other,
}

impl BoxType {
    pub const ALL: [BoxType; 5] = [
        BoxType::Device,
        BoxType::Masonry,
        BoxType::Square,
        BoxType::RoundOctagonal,
        BoxType::Other,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            BoxType::Device => "device",
            BoxType::Masonry => "masonry",
            BoxType::Square => "square",
            BoxType::RoundOctagonal => "round_octagonal",
            BoxType::Other => "other",
        }
    }
}

categorical!(BoxType, "box_type");

/// Raceway type (NEC Chapter 9, Table 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConduitType {
    /// Electrical metallic tubing
    #[default]
    Emt,
    /// Intermediate metal conduit
    Imc,
    /// Rigid metal conduit
    Rmc,
    PvcSchedule40,
    PvcSchedule80,
    /// Electrical nonmetallic tubing
    Ent,
}

impl ConduitType {
    pub const ALL: [ConduitType; 6] = [
        ConduitType::Emt,
        ConduitType::Imc,
        ConduitType::Rmc,
        ConduitType::PvcSchedule40,
        ConduitType::PvcSchedule80,
        ConduitType::Ent,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ConduitType::Emt => "emt",
            ConduitType::Imc => "imc",
            ConduitType::Rmc => "rmc",
            ConduitType::PvcSchedule40 => "pvc_schedule_40",
            ConduitType::PvcSchedule80 => "pvc_schedule_80",
            ConduitType::Ent => "ent",
        }
    }
}

categorical!(ConduitType, "conduit_type");

/// Circuit type for voltage drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SystemType {
    #[default]
    SinglePhase,
    ThreePhase,
    Dc,
}

impl SystemType {
    pub const ALL: [SystemType; 3] = [SystemType::SinglePhase, SystemType::ThreePhase, SystemType::Dc];

    pub fn code(&self) -> &'static str {
        match self {
            SystemType::SinglePhase => "single_phase",
            SystemType::ThreePhase => "three_phase",
            SystemType::Dc => "dc",
        }
    }

    /// Length multiplier: out and back for two-wire circuits, √3 line to line.
    pub fn multiplier(&self) -> f64 {
        match self {
            SystemType::SinglePhase | SystemType::Dc => 2.0,
            SystemType::ThreePhase => 3.0_f64.sqrt(),
        }
    }

    /// DC circuits have no reactance or power factor.
    pub fn is_ac(&self) -> bool {
        !matches!(self, SystemType::Dc)
    }
}

categorical!(SystemType, "system_type");

/// Conductor metal (Chapter 9, Table 8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConductorMaterial {
    #[default]
    Copper,
    Aluminum,
}

impl ConductorMaterial {
    pub const ALL: [ConductorMaterial; 2] = [ConductorMaterial::Copper, ConductorMaterial::Aluminum];

    pub fn code(&self) -> &'static str {
        match self {
            ConductorMaterial::Copper => "copper",
            ConductorMaterial::Aluminum => "aluminum",
        }
    }
}

categorical!(ConductorMaterial, "material");

/// What surrounds the conductors, for reactance (Chapter 9, Table 9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RacewayMaterial {
    #[default]
    Pvc,
    Steel,
    Aluminum,
    /// Direct burial, no raceway
    DirectBurial,
}

impl RacewayMaterial {
    pub const ALL: [RacewayMaterial; 4] = [
        RacewayMaterial::Pvc,
        RacewayMaterial::Steel,
        RacewayMaterial::Aluminum,
        RacewayMaterial::DirectBurial,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            RacewayMaterial::Pvc => "pvc",
            RacewayMaterial::Steel => "steel",
            RacewayMaterial::Aluminum => "aluminum",
            RacewayMaterial::DirectBurial => "direct_burial",
        }
    }
}

categorical!(RacewayMaterial, "raceway");

/// Conductor insulation temperature rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum TemperatureRating {
    #[serde(rename = "60c")]
    C60,
    #[default]
    #[serde(rename = "75c")]
    C75,
    #[serde(rename = "90c")]
    C90,
}

impl TemperatureRating {
    pub const ALL: [TemperatureRating; 3] =
        [TemperatureRating::C60, TemperatureRating::C75, TemperatureRating::C90];

    pub fn code(&self) -> &'static str {
        match self {
            TemperatureRating::C60 => "60c",
            TemperatureRating::C75 => "75c",
            TemperatureRating::C90 => "90c",
        }
    }
}

categorical!(TemperatureRating, "temperature_rating");
