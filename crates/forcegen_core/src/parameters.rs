//! Table query parameters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::mission_role::MissionRole;
use crate::records::ModelFilter;
use crate::unit_kind::{MovementMode, NetworkMask, UnitType, WeightClass};

/// Query for one weighted unit table.
///
/// Equal parameters always produce the same table, so values of this type
/// double as table cache keys.
///
/// # Example
///
/// ```
/// use forcegen_core::parameters::Parameters;
/// use forcegen_core::unit_kind::{UnitType, WeightClass};
///
/// let params = Parameters::new("FS", UnitType::Mek, 3025)
///     .with_rating("B")
///     .with_weight_classes([WeightClass::Heavy, WeightClass::Assault]);
/// assert_eq!(params.weight_classes.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameters {
    /// Faction supplying the units.
    pub faction: String,
    /// Faction fielding the units, when it differs from the supplier.
    #[serde(default)]
    pub deploying_faction: Option<String>,
    /// Unit type.
    pub unit_type: UnitType,
    /// Game year.
    pub year: i32,
    /// Equipment rating level name.
    #[serde(default)]
    pub rating: Option<String>,
    /// Allowed weight classes; empty allows all.
    #[serde(default)]
    pub weight_classes: BTreeSet<WeightClass>,
    /// Network equipment every unit must carry.
    #[serde(default)]
    pub network: NetworkMask,
    /// Allowed movement modes; empty allows all.
    #[serde(default)]
    pub movement_modes: BTreeSet<MovementMode>,
    /// Desired mission roles.
    #[serde(default)]
    pub roles: BTreeSet<MissionRole>,
    /// Mission roles that disqualify a unit.
    #[serde(default)]
    pub roles_excluded: BTreeSet<MissionRole>,
    /// How strongly desired roles bias the table.
    #[serde(default)]
    pub role_strictness: u8,
}

impl Parameters {
    /// Parameters with no filters.
    #[must_use]
    pub fn new(faction: impl Into<String>, unit_type: UnitType, year: i32) -> Self {
        Self {
            faction: faction.into(),
            deploying_faction: None,
            unit_type,
            year,
            rating: None,
            weight_classes: BTreeSet::new(),
            network: NetworkMask::NONE,
            movement_modes: BTreeSet::new(),
            roles: BTreeSet::new(),
            roles_excluded: BTreeSet::new(),
            role_strictness: 1,
        }
    }

    /// Set the equipment rating.
    #[must_use]
    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    /// Set the deploying faction.
    #[must_use]
    pub fn with_deploying_faction(mut self, faction: impl Into<String>) -> Self {
        self.deploying_faction = Some(faction.into());
        self
    }

    /// Restrict weight classes.
    #[must_use]
    pub fn with_weight_classes(mut self, classes: impl IntoIterator<Item = WeightClass>) -> Self {
        self.weight_classes = classes.into_iter().collect();
        self
    }

    /// Restrict movement modes.
    #[must_use]
    pub fn with_movement_modes(mut self, modes: impl IntoIterator<Item = MovementMode>) -> Self {
        self.movement_modes = modes.into_iter().collect();
        self
    }

    /// Request mission roles at a strictness.
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = MissionRole>, strictness: u8) -> Self {
        self.roles = roles.into_iter().collect();
        self.role_strictness = strictness;
        self
    }

    /// Exclude mission roles.
    #[must_use]
    pub fn with_roles_excluded(mut self, roles: impl IntoIterator<Item = MissionRole>) -> Self {
        self.roles_excluded = roles.into_iter().collect();
        self
    }

    /// Require network equipment.
    #[must_use]
    pub fn with_network(mut self, network: NetworkMask) -> Self {
        self.network = network;
        self
    }

    /// Faction whose force-structure data shapes the table.
    #[must_use]
    pub fn shaping_faction(&self) -> &str {
        self.deploying_faction.as_deref().unwrap_or(&self.faction)
    }

    /// Model filter for these parameters.
    #[must_use]
    pub fn model_filter(&self) -> ModelFilter<'_> {
        ModelFilter {
            year: self.year,
            weight_classes: &self.weight_classes,
            movement_modes: &self.movement_modes,
            network: self.network,
            roles_excluded: &self.roles_excluded,
        }
    }
}
