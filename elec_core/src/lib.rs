//! # elec_core - Electrical Code-Compliance Calculation Engine
//!
//! `elec_core` checks the everyday NEC calculations an electrician signs off
//! on: box fill, conduit fill, dwelling service load, and voltage drop. All inputs and
//! outputs are JSON-serializable, and every failure is a structured
//! [`CalcError`].
//!
//! ## Design Philosophy
//!
//! - **Stateless**: calculators are pure functions over value inputs
//! - **Tables as data**: code values live in a TOML document, not in formulas
//! - **Rich Errors**: structured error types, never partial results
//!
//! ## Quick Start
//!
//! ```rust
//! use elec_core::calculations::box_fill::{calculate, BoxDescriptor};
//! use elec_core::categories::BoxType;
//! use elec_core::gauge::Gauge;
//! use elec_core::wire::WireSpec;
//!
//! let fourteen = Gauge::parse("14").unwrap();
//! let box_ = BoxDescriptor::with_volume(BoxType::Device, "3x2x3.5", 18.0);
//! let wires = vec![
//!     WireSpec::wire(fourteen.clone(), 2),
//!     WireSpec::ground(fourteen, 1),
//! ];
//!
//! let result = calculate(&box_, &wires).unwrap();
//! assert_eq!(result.total_required_volume_in3, 6.0);
//! assert!(result.within_limits);
//! ```
//!
//! ## Modules
//!
//! - [`calculations`] - box fill, conduit fill, dwelling load, voltage drop
//! - [`code_tables`] - NEC lookup tables, embedded or loaded from TOML
//! - [`gauge`], [`categories`], [`wire`] - shared value types
//! - [`job`] - job container with catalogs and stored results
//! - [`store`] - job files with atomic saves and locking
//! - [`errors`] - structured error types

pub mod calculations;
pub mod categories;
pub mod code_tables;
pub mod errors;
pub mod gauge;
pub mod job;
#[cfg(not(target_arch = "wasm32"))]
pub mod store;
pub mod wire;

pub use calculations::{CalculationItem, CalculationOutcome};
pub use code_tables::CodeTables;
pub use errors::{CalcError, CalcResult};
pub use gauge::Gauge;
pub use job::{Job, JobMetadata, JobSettings};
#[cfg(not(target_arch = "wasm32"))]
pub use store::{FileLock, JobStore, LockInfo};
pub use wire::WireSpec;
