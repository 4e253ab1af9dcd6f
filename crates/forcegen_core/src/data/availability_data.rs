//! Availability file structure.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityRating;
use crate::catalog::UnitCatalog;
use crate::mission_role::MissionRole;
use crate::rat_generator::{RatData, RecordKind};
use crate::records::chassis_key;
use crate::unit_kind::UnitType;

/// Availability codes for every era.
///
/// # Example RON
///
/// ```ron
/// AvailabilityData(
///     eras: [
///         EraData(
///             year: 3025,
///             chassis: [
///                 ChassisAvailability(
///                     chassis: "Locust",
///                     unit_type: Mek,
///                     codes: "FS:7,DC:6-,General:5",
///                     models: [
///                         ModelAvailability(model: "LCT-1V", codes: "General:8", roles: [Recon]),
///                     ],
///                 ),
///             ],
///         ),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AvailabilityData {
    /// Eras in any order.
    #[serde(default)]
    pub eras: Vec<EraData>,
}

/// Codes recorded for one era.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraData {
    /// First year of the era.
    pub year: i32,
    /// Chassis entries.
    #[serde(default)]
    pub chassis: Vec<ChassisAvailability>,
}

/// One chassis and its models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisAvailability {
    /// Chassis name as it appears in the catalog.
    pub chassis: String,
    /// Unit type.
    pub unit_type: UnitType,
    /// Omni chassis.
    #[serde(default)]
    pub omni: bool,
    /// Comma separated availability codes.
    #[serde(default)]
    pub codes: String,
    /// Model entries.
    #[serde(default)]
    pub models: Vec<ModelAvailability>,
}

/// One model of a chassis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAvailability {
    /// Model name; empty for single-model units.
    pub model: String,
    /// Comma separated availability codes.
    #[serde(default)]
    pub codes: String,
    /// Mission roles the model declares.
    #[serde(default)]
    pub roles: Vec<MissionRole>,
}

impl ChassisAvailability {
    /// Key of the chassis record.
    #[must_use]
    pub fn key(&self) -> String {
        chassis_key(&self.chassis, self.unit_type, self.omni)
    }

    fn model_key(&self, model: &ModelAvailability) -> String {
        if model.model.is_empty() {
            self.chassis.clone()
        } else {
            format!("{} {}", self.chassis, model.model)
        }
    }
}

impl AvailabilityData {
    /// Parse every code into availability records.
    #[must_use]
    pub fn to_rat_data(&self) -> RatData {
        let mut data = RatData::new();
        for era in &self.eras {
            data.add_era(era.year);
            for chassis in &era.chassis {
                let key = chassis.key();
                for rating in AvailabilityRating::parse_list(&key, era.year, &chassis.codes) {
                    data.insert(RecordKind::Chassis, rating);
                }
                for model in &chassis.models {
                    let key = chassis.model_key(model);
                    for rating in AvailabilityRating::parse_list(&key, era.year, &model.codes) {
                        data.insert(RecordKind::Model, rating);
                    }
                }
            }
        }
        tracing::info!("Parsed {} availability records in {} eras", data.len(), self.eras.len());
        data
    }

    /// Mission roles by model key, merged across eras.
    #[must_use]
    pub fn role_assignments(&self) -> BTreeMap<String, BTreeSet<MissionRole>> {
        let mut roles: BTreeMap<String, BTreeSet<MissionRole>> = BTreeMap::new();
        for chassis in self.eras.iter().flat_map(|e| &e.chassis) {
            for model in &chassis.models {
                if !model.roles.is_empty() {
                    roles
                        .entry(chassis.model_key(model))
                        .or_default()
                        .extend(model.roles.iter().copied());
                }
            }
        }
        roles
    }

    /// Check the data against a catalog.
    ///
    /// Reports duplicate eras and models the catalog does not know.
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self, catalog: &dyn UnitCatalog) -> Vec<String> {
        let mut errors = Vec::new();
        let mut years = BTreeSet::new();
        for era in &self.eras {
            if !years.insert(era.year) {
                errors.push(format!("Era {} is listed more than once", era.year));
            }
            for chassis in &era.chassis {
                for model in &chassis.models {
                    let key = chassis.model_key(model);
                    if catalog.by_key(&key).is_none() {
                        errors.push(format!("Era {} lists unknown model '{key}'", era.year));
                    }
                }
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, TechBase, UnitSummary};
    use crate::unit_kind::{CombatRole, MovementMode, WeightClass};

    fn sample() -> AvailabilityData {
        ron::from_str(
            r#"AvailabilityData(
                eras: [
                    EraData(
                        year: 3025,
                        chassis: [
                            ChassisAvailability(
                                chassis: "Locust",
                                unit_type: Mek,
                                codes: "FS:7,DC:6-",
                                models: [
                                    ModelAvailability(model: "LCT-1V", codes: "General:8", roles: [Recon]),
                                ],
                            ),
                        ],
                    ),
                    EraData(year: 3050),
                ],
            )"#,
        )
        .expect("valid RON")
    }

    #[test]
    fn test_to_rat_data() {
        let data = sample().to_rat_data();
        assert_eq!(data.eras().collect::<Vec<_>>(), vec![3025, 3050]);
        let fs = data
            .rating(RecordKind::Chassis, 3025, "Locust[Mek]", "FS")
            .expect("FS chassis record");
        assert!((fs.availability() - 7.0).abs() < f64::EPSILON);
        assert!(data
            .rating(RecordKind::Model, 3025, "Locust LCT-1V", "General")
            .is_some());
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn test_role_assignments() {
        let roles = sample().role_assignments();
        assert!(roles["Locust LCT-1V"].contains(&MissionRole::Recon));
    }

    #[test]
    fn test_validate_reports_unknown_models() {
        let catalog = InMemoryCatalog::new(vec![UnitSummary {
            chassis: "Locust".to_string(),
            model: "LCT-1E".to_string(),
            unit_type: UnitType::Mek,
            weight_class: WeightClass::Light,
            tonnage: 20,
            movement_mode: MovementMode::Biped,
            year: 3000,
            tech_base: TechBase::InnerSphere,
            omni: false,
            walk_mp: 8,
            jump_mp: 0,
            armor: 48,
            combat_role: CombatRole::Scout,
            equipment: Vec::new(),
        }]);
        let mut data = sample();
        data.eras.push(EraData {
            year: 3025,
            chassis: Vec::new(),
        });
        let errors = data.validate(&catalog);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("LCT-1V"));
        assert!(errors[1].contains("more than once"));
    }
}
