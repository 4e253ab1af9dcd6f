//! Formation templates and the formation solver.
//!
//! A [`FormationType`] is a named set of requirements a group of units must
//! meet together: per-unit criteria, minimum counts and percentages of units
//! matching a predicate, and optionally groups of matched units (fighter
//! pairs flying the same chassis, for example).
//!
//! [`FormationSolver`] turns a template plus one or more table queries into
//! concrete units. The enumeration helpers live in [`combinations`].

pub mod combinations;
mod network;
mod registry;
mod solver;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::mission_role::MissionRole;
use crate::parameters::Parameters;
use crate::records::ModelRecord;
use crate::unit_kind::{CombatRole, UnitType, WeightClass};

pub use network::{NetworkKind, NetworkPlan, NetworkRole};
pub use registry::FormationRegistry;
pub use solver::FormationSolver;

/// Declarative test on a single model.
///
/// # Example
///
/// ```
/// use forcegen_core::formation::UnitPredicate;
/// use forcegen_core::unit_kind::{CombatRole, WeightClass};
///
/// let heavy_brawler = UnitPredicate::All(vec![
///     UnitPredicate::WeightAtLeast(WeightClass::Heavy),
///     UnitPredicate::Role(vec![CombatRole::Brawler]),
/// ]);
/// # let _ = heavy_brawler;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum UnitPredicate {
    /// Every model.
    #[default]
    Any,
    /// Weight class at least this heavy.
    WeightAtLeast(WeightClass),
    /// Weight class at most this heavy.
    WeightAtMost(WeightClass),
    /// Exactly this weight class.
    WeightIs(WeightClass),
    /// One of the listed combat roles.
    Role(Vec<CombatRole>),
    /// Declares the mission role.
    Mission(MissionRole),
    /// Walking MP at least.
    WalkAtLeast(u8),
    /// Walking MP at most.
    WalkAtMost(u8),
    /// Jumping MP at least.
    JumpAtLeast(u8),
    /// Long range share of weapon BV at least.
    LongRangeAtLeast(f64),
    /// One of the listed unit types.
    UnitTypeIn(Vec<UnitType>),
    /// Every inner predicate holds.
    All(Vec<UnitPredicate>),
    /// At least one inner predicate holds.
    AnyOf(Vec<UnitPredicate>),
    /// The inner predicate fails.
    Not(Box<UnitPredicate>),
}

impl UnitPredicate {
    /// Test a model.
    #[must_use]
    pub fn matches(&self, model: &ModelRecord) -> bool {
        match self {
            Self::Any => true,
            Self::WeightAtLeast(w) => model.weight_class >= *w,
            Self::WeightAtMost(w) => model.weight_class <= *w,
            Self::WeightIs(w) => model.weight_class == *w,
            Self::Role(roles) => roles.contains(&model.combat_role),
            Self::Mission(role) => model.has_role(*role),
            Self::WalkAtLeast(mp) => model.walk_mp >= *mp,
            Self::WalkAtMost(mp) => model.walk_mp <= *mp,
            Self::JumpAtLeast(mp) => model.jump_mp >= *mp,
            Self::LongRangeAtLeast(share) => model.metrics.long_range >= *share,
            Self::UnitTypeIn(types) => types.contains(&model.unit_type),
            Self::All(inner) => inner.iter().all(|p| p.matches(model)),
            Self::AnyOf(inner) => inner.iter().any(|p| p.matches(model)),
            Self::Not(inner) => !inner.matches(model),
        }
    }
}

/// Relation every pair of units in a matched group must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PairPredicate {
    /// Same chassis.
    #[default]
    SameChassis,
    /// Same model.
    SameModel,
    /// Same weight class.
    SameWeightClass,
}

impl PairPredicate {
    /// Test two models.
    #[must_use]
    pub fn matches(self, a: &ModelRecord, b: &ModelRecord) -> bool {
        match self {
            Self::SameChassis => a.chassis_key == b.chassis_key,
            Self::SameModel => a.key == b.key,
            Self::SameWeightClass => a.weight_class == b.weight_class,
        }
    }

    fn class_key(self, model: &ModelRecord) -> String {
        match self {
            Self::SameChassis => model.chassis_key.clone(),
            Self::SameModel => model.key.clone(),
            Self::SameWeightClass => format!("{:?}", model.weight_class),
        }
    }
}

/// Groups of matched units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingConstraint {
    /// Unit types the groups are drawn from; empty allows all.
    #[serde(default)]
    pub unit_types: Vec<UnitType>,
    /// Units per group.
    pub group_size: usize,
    /// Number of groups.
    pub num_groups: usize,
    /// Test every grouped unit must pass.
    #[serde(default)]
    pub predicate: UnitPredicate,
    /// Relation between members of a group.
    #[serde(default)]
    pub pair: PairPredicate,
    /// Human readable summary.
    #[serde(default)]
    pub description: String,
}

impl GroupingConstraint {
    /// Whether `units` contain `num_groups` disjoint groups of `group_size`
    /// units that pass the predicate and are pairwise matched.
    #[must_use]
    pub fn satisfied_by(&self, units: &[Arc<ModelRecord>], num_groups: usize) -> bool {
        if self.group_size == 0 {
            return true;
        }
        let mut classes: BTreeMap<String, usize> = BTreeMap::new();
        for unit in units {
            let eligible = self.unit_types.is_empty() || self.unit_types.contains(&unit.unit_type);
            if eligible && self.predicate.matches(unit) {
                *classes.entry(self.pair.class_key(unit)).or_default() += 1;
            }
        }
        classes.values().map(|n| n / self.group_size).sum::<usize>() >= num_groups
    }
}

/// One formation requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// At least `min` units match.
    Count {
        /// Minimum matching units.
        min: usize,
        /// The test.
        predicate: UnitPredicate,
        /// Human readable summary.
        #[serde(default)]
        description: String,
        /// This and the next constraint are alternatives.
        #[serde(default)]
        paired_with_next: bool,
    },
    /// At least `min_fraction` of the units match.
    Percent {
        /// Minimum matching share, 0 to 1.
        min_fraction: f64,
        /// The test.
        predicate: UnitPredicate,
        /// Human readable summary.
        #[serde(default)]
        description: String,
        /// This and the next constraint are alternatives.
        #[serde(default)]
        paired_with_next: bool,
    },
    /// Matched groups.
    Grouping(GroupingConstraint),
}

impl Constraint {
    /// Minimum matching units in a formation of `total` units.
    #[must_use]
    pub fn min_count(&self, total: usize) -> usize {
        match self {
            Self::Count { min, .. } => (*min).min(total),
            Self::Percent { min_fraction, .. } => {
                let needed = (min_fraction * total as f64 - 1e-9).ceil().max(0.0);
                (needed as usize).min(total)
            }
            Self::Grouping(_) => 0,
        }
    }

    /// Strict minimum, not capped at the formation size.
    pub(crate) fn required(&self, total: usize) -> usize {
        match self {
            Self::Count { min, .. } => *min,
            _ => self.min_count(total),
        }
    }

    /// The per-unit test, if this is a counting constraint.
    #[must_use]
    pub fn predicate(&self) -> Option<&UnitPredicate> {
        match self {
            Self::Count { predicate, .. } | Self::Percent { predicate, .. } => Some(predicate),
            Self::Grouping(_) => None,
        }
    }

    /// Whether this and the next constraint are alternatives.
    #[must_use]
    pub fn paired_with_next(&self) -> bool {
        match self {
            Self::Count {
                paired_with_next, ..
            }
            | Self::Percent {
                paired_with_next, ..
            } => *paired_with_next,
            Self::Grouping(_) => false,
        }
    }

    /// Human readable summary.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Count { description, .. } | Self::Percent { description, .. } => {
                description.as_str()
            }
            Self::Grouping(g) => g.description.as_str(),
        }
    }
}

/// A named formation template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationType {
    /// Name.
    pub name: String,
    /// Unit types that may fill the formation; empty allows all.
    #[serde(default)]
    pub unit_types: Vec<UnitType>,
    /// Lightest weight class allowed.
    #[serde(default)]
    pub min_weight_class: Option<WeightClass>,
    /// Heaviest weight class allowed.
    #[serde(default)]
    pub max_weight_class: Option<WeightClass>,
    /// Test every unit must pass.
    #[serde(default)]
    pub main_criteria: UnitPredicate,
    /// Role used when the requirements are abandoned.
    #[serde(default)]
    pub ideal_role: Option<CombatRole>,
    /// Requirements, in order.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl FormationType {
    /// An unconstrained template.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit_types: Vec::new(),
            min_weight_class: None,
            max_weight_class: None,
            main_criteria: UnitPredicate::Any,
            ideal_role: None,
            constraints: Vec::new(),
        }
    }

    /// Whether the template accepts a unit type.
    #[must_use]
    pub fn allows_unit_type(&self, unit_type: UnitType) -> bool {
        self.unit_types.is_empty() || self.unit_types.contains(&unit_type)
    }

    /// Per-unit test: weight limits, unit types and main criteria.
    #[must_use]
    pub fn main_matches(&self, model: &ModelRecord) -> bool {
        self.allows_unit_type(model.unit_type)
            && self.min_weight_class.map_or(true, |w| model.weight_class >= w)
            && self.max_weight_class.map_or(true, |w| model.weight_class <= w)
            && self.main_criteria.matches(model)
    }

    /// Counting constraints, in order.
    pub fn numeric_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(|c| !matches!(c, Constraint::Grouping(_)))
    }

    /// The grouping constraint, if any.
    #[must_use]
    pub fn grouping(&self) -> Option<&GroupingConstraint> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Grouping(g) => Some(g),
            _ => None,
        })
    }

    /// Narrow a query to the template's weight limits.
    #[must_use]
    pub fn restrict(&self, params: &Parameters) -> Parameters {
        let mut params = params.clone();
        if self.min_weight_class.is_none() && self.max_weight_class.is_none() {
            return params;
        }
        let allowed: Vec<WeightClass> = WeightClass::ALL
            .iter()
            .copied()
            .filter(|w| self.min_weight_class.map_or(true, |min| *w >= min))
            .filter(|w| self.max_weight_class.map_or(true, |max| *w <= max))
            .collect();
        if params.weight_classes.is_empty() {
            params.weight_classes = allowed.into_iter().collect();
        } else if params.weight_classes.iter().any(|w| allowed.contains(w)) {
            params.weight_classes.retain(|w| allowed.contains(w));
        }
        params
    }

    /// Whether `units` meet every counting constraint, honoring pairs.
    #[must_use]
    pub fn constraints_met(&self, units: &[Arc<ModelRecord>]) -> bool {
        let total = units.len();
        let numeric: Vec<&Constraint> = self.numeric_constraints().collect();
        let met = |c: &Constraint| {
            c.predicate().map_or(true, |p| {
                units.iter().filter(|u| p.matches(u)).count() >= c.required(total)
            })
        };
        let mut i = 0;
        while i < numeric.len() {
            if numeric[i].paired_with_next() && i + 1 < numeric.len() {
                if !met(numeric[i]) && !met(numeric[i + 1]) {
                    return false;
                }
                i += 2;
            } else {
                if !met(numeric[i]) {
                    return false;
                }
                i += 1;
            }
        }
        true
    }
}
