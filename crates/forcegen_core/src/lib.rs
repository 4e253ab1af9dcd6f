//! # Force Generator Core
//!
//! Procedural force generation for a tactical wargame: availability
//! weighting, random assignment tables and formation solving.
//!
//! This crate contains **only** generation logic:
//! - No rendering
//! - No IO
//! - No system randomness (every call takes an injected RNG)
//!
//! This separation enables:
//! - Reproducible forces from a seed
//! - Loading data from any source (files, embedded, network)
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`availability`] - Availability codes and weights
//! - [`factions`] - Faction graph and per-era faction data
//! - [`records`] - Chassis and model records built from the catalog
//! - [`rat_generator`] - Availability resolution and table generation
//! - [`unit_table`] - Sampling from generated tables
//! - [`formation`] - Formation templates and the formation solver
//! - [`force`] - Force tree expansion

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod availability;
pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod factions;
pub mod force;
pub mod formation;
pub mod mission_role;
pub mod parameters;
pub mod rat_generator;
pub mod records;
pub mod unit_kind;
pub mod unit_table;
pub mod weighting;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::availability::{AvailabilityRating, GENERAL_FACTION};
    pub use crate::catalog::{CatalogHandle, InMemoryCatalog, UnitCatalog, UnitSummary};
    pub use crate::config::GeneratorConfig;
    pub use crate::error::{GenerationError, Result};
    pub use crate::factions::{FactionGraph, FactionRecord};
    pub use crate::force::{Eschelon, ForceDescriptor, ForceTreeBuilder, GeneratedForce};
    pub use crate::formation::{FormationRegistry, FormationSolver, FormationType};
    pub use crate::mission_role::MissionRole;
    pub use crate::parameters::Parameters;
    pub use crate::rat_generator::{GeneratorData, RatData, RatGenerator};
    pub use crate::records::{ModelRecord, UnitRecords};
    pub use crate::unit_kind::{CombatRole, MovementMode, NetworkMask, UnitType, WeightClass};
    pub use crate::unit_table::UnitTable;
    pub use crate::weighting::TableEntry;
}
