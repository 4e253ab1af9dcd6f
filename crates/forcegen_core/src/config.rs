//! Tunable generator settings.
//!
//! Every constant the weighting and search stages depend on lives here so
//! data sets can retune them without code changes. All fields default, so a
//! RON file only needs the values it overrides:
//!
//! ```ron
//! GeneratorConfig(
//!     cohesion: CohesionConfig(base_target: 9),
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};
use crate::mission_role::MissionRole;

/// Top-level generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Bounds applied when converting table weights to integers.
    pub rescale: RescaleBounds,
    /// Mission role adjustment constants.
    pub roles: RoleTuning,
    /// Chassis reuse heuristic for untemplated formations.
    pub cohesion: CohesionConfig,
    /// Maximum members of each network type.
    pub network: NetworkSizes,
    /// Limits for the formation search.
    pub search: SearchLimits,
}

impl GeneratorConfig {
    /// Parse a configuration from RON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid RON for this type.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GenerationError::DataParseError {
            what: "generator config".to_string(),
            message: e.to_string(),
        })
    }
}

/// Weight rescaling bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescaleBounds {
    /// Smallest positive weight after rescaling.
    pub min_weight: f64,
    /// Largest weight after rescaling.
    pub max_weight: f64,
}

impl Default for RescaleBounds {
    fn default() -> Self {
        Self {
            min_weight: 0.5,
            max_weight: 1000.0,
        }
    }
}

/// One tier of the specialization penalty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyCategory {
    /// Label used in logs.
    pub name: String,
    /// Roles that place a model in this category.
    pub roles: Vec<MissionRole>,
}

impl PenaltyCategory {
    fn new(name: &str, roles: &[MissionRole]) -> Self {
        Self {
            name: name.to_string(),
            roles: roles.to_vec(),
        }
    }
}

/// Constants for [`crate::mission_role::adjust_availability_by_role`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleTuning {
    /// Divisor applied to strictness for partial bonuses.
    pub strictness_divisor: f64,
    /// Penalty for the first matched niche category; the n-th match costs
    /// `n * penalty_step`.
    pub penalty_step: f64,
    /// Niche categories in the order they are tested.
    pub penalty_categories: Vec<PenaltyCategory>,
    /// Roles that exclude a model outright unless requested.
    pub excluded_unless_requested: Vec<MissionRole>,
    /// Years after introduction before a design counts as training stock.
    pub training_age: i32,
}

impl Default for RoleTuning {
    fn default() -> Self {
        use MissionRole as R;
        Self {
            strictness_divisor: 3.0,
            penalty_step: 1.0,
            penalty_categories: vec![
                PenaltyCategory::new("support", &[R::Support, R::Cargo, R::Tug]),
                PenaltyCategory::new("civilian", &[R::Civilian, R::Training]),
                PenaltyCategory::new("recon", &[R::Recon, R::EwSupport, R::Spotter]),
                PenaltyCategory::new("urban", &[R::Urban, R::AntiInfantry, R::InfSupport]),
                PenaltyCategory::new("specialist", &[R::Incendiary, R::Marine, R::Xct]),
                PenaltyCategory::new("specops", &[R::SpecOps]),
            ],
            excluded_unless_requested: vec![
                R::Artillery,
                R::MissileArtillery,
                R::Civilian,
                R::Training,
            ],
            training_age: 30,
        }
    }
}

/// Chassis reuse heuristic settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohesionConfig {
    /// 2d6 target for reusing a chassis at the lowest rating.
    pub base_target: u32,
    /// Target reduction at the highest rating.
    pub max_rating_bonus: u32,
}

impl Default for CohesionConfig {
    fn default() -> Self {
        Self {
            base_target: 10,
            max_rating_bonus: 4,
        }
    }
}

/// Maximum network sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSizes {
    /// Standard C3: one master and up to three slaves.
    pub c3: usize,
    /// Improved C3.
    pub c3i: usize,
    /// Nova CEWS.
    pub nova: usize,
}

impl Default for NetworkSizes {
    fn default() -> Self {
        Self {
            c3: 4,
            c3i: 6,
            nova: 3,
        }
    }
}

/// Formation search limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// Maximum distributions produced by one enumeration step.
    pub max_distributions: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_distributions: 4096,
        }
    }
}
