//! Named formation templates.
//!
//! [`FormationRegistry::standard`] carries the common ground and aerospace
//! formations. Data sets may add or replace templates from RON:
//!
//! ```ron
//! [
//!     FormationType(
//!         name: "Sniper Lance",
//!         unit_types: [Mek],
//!         ideal_role: Some(Sniper),
//!         constraints: [
//!             Percent(min_fraction: 0.75, predicate: Role([Sniper])),
//!         ],
//!     ),
//! ]
//! ```

use std::collections::BTreeMap;

use super::combinations::MAX_CONSTRAINTS;
use super::{Constraint, FormationType, GroupingConstraint, PairPredicate, UnitPredicate};
use crate::error::{GenerationError, Result};
use crate::mission_role::MissionRole;
use crate::unit_kind::{CombatRole, UnitType, WeightClass};

const GROUND: [UnitType; 3] = [UnitType::Mek, UnitType::Tank, UnitType::ProtoMek];
const FIGHTERS: [UnitType; 2] = [UnitType::AeroSpaceFighter, UnitType::ConvFighter];

fn count(min: usize, predicate: UnitPredicate, description: &str) -> Constraint {
    Constraint::Count {
        min,
        predicate,
        description: description.to_string(),
        paired_with_next: false,
    }
}

fn percent(min_fraction: f64, predicate: UnitPredicate, description: &str) -> Constraint {
    Constraint::Percent {
        min_fraction,
        predicate,
        description: description.to_string(),
        paired_with_next: false,
    }
}

/// Mark a constraint as the first of an either-or pair.
fn or_next(mut constraint: Constraint) -> Constraint {
    match &mut constraint {
        Constraint::Count {
            paired_with_next, ..
        }
        | Constraint::Percent {
            paired_with_next, ..
        } => *paired_with_next = true,
        Constraint::Grouping(_) => {}
    }
    constraint
}

fn roles(roles: &[CombatRole]) -> UnitPredicate {
    UnitPredicate::Role(roles.to_vec())
}

fn ground(name: &str) -> FormationType {
    FormationType {
        unit_types: GROUND.to_vec(),
        ..FormationType::new(name)
    }
}

fn squadron(name: &str, ideal_role: CombatRole, share: Constraint) -> FormationType {
    FormationType {
        unit_types: FIGHTERS.to_vec(),
        ideal_role: Some(ideal_role),
        constraints: vec![
            share,
            Constraint::Grouping(GroupingConstraint {
                unit_types: FIGHTERS.to_vec(),
                group_size: 2,
                num_groups: 3,
                predicate: UnitPredicate::Any,
                pair: PairPredicate::SameChassis,
                description: "Fighters fly in pairs of the same chassis".to_string(),
            }),
        ],
        ..FormationType::new(name)
    }
}

/// Formation templates by name.
#[derive(Debug, Clone, Default)]
pub struct FormationRegistry {
    formations: BTreeMap<String, FormationType>,
}

impl FormationRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in templates.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn standard() -> Self {
        use CombatRole as R;
        use UnitPredicate as P;
        use WeightClass as W;

        let heavy_half = || percent(0.5, P::WeightAtLeast(W::Heavy), "Half heavy or larger");
        let mut registry = Self::new();

        registry.insert(FormationType {
            ideal_role: Some(R::Brawler),
            constraints: vec![
                heavy_half(),
                count(
                    3,
                    roles(&[R::Brawler, R::Sniper, R::Skirmisher, R::Juggernaut]),
                    "Three line combat units",
                ),
            ],
            ..ground("Battle")
        });
        registry.insert(FormationType {
            min_weight_class: Some(W::Medium),
            ideal_role: Some(R::Brawler),
            constraints: vec![
                heavy_half(),
                count(
                    3,
                    roles(&[R::Brawler, R::Sniper, R::Skirmisher, R::Juggernaut]),
                    "Three line combat units",
                ),
            ],
            ..ground("Heavy Battle")
        });
        registry.insert(FormationType {
            max_weight_class: Some(W::Heavy),
            ideal_role: Some(R::Skirmisher),
            constraints: vec![
                percent(0.5, P::WeightIs(W::Medium), "Half medium"),
                count(
                    3,
                    roles(&[R::Brawler, R::Sniper, R::Skirmisher]),
                    "Three line combat units",
                ),
            ],
            ..ground("Medium Battle")
        });
        registry.insert(FormationType {
            max_weight_class: Some(W::Medium),
            ideal_role: Some(R::Skirmisher),
            constraints: vec![
                percent(0.75, P::WeightAtMost(W::Light), "Three quarters light"),
                count(1, roles(&[R::Scout]), "One scout"),
            ],
            ..ground("Light Battle")
        });
        registry.insert(FormationType {
            min_weight_class: Some(W::Heavy),
            ideal_role: Some(R::Juggernaut),
            constraints: vec![
                count(1, P::WeightIs(W::Assault), "One assault"),
                or_next(count(2, roles(&[R::Juggernaut]), "Two juggernauts")),
                count(2, roles(&[R::Sniper]), "Two snipers"),
            ],
            ..ground("Assault")
        });
        registry.insert(FormationType {
            ideal_role: Some(R::MissileBoat),
            constraints: vec![percent(
                0.75,
                roles(&[R::MissileBoat, R::Sniper]),
                "Three quarters missile boats or snipers",
            )],
            ..ground("Fire")
        });
        registry.insert(FormationType {
            min_weight_class: Some(W::Medium),
            ideal_role: Some(R::Sniper),
            constraints: vec![
                count(2, P::WeightAtLeast(W::Heavy), "Two heavy or larger"),
                percent(0.5, P::LongRangeAtLeast(0.5), "Half long range"),
            ],
            ..ground("Direct Fire")
        });
        registry.insert(FormationType {
            main_criteria: P::WalkAtLeast(5),
            ideal_role: Some(R::Scout),
            constraints: vec![count(2, roles(&[R::Scout, R::Striker]), "Two scouts or strikers")],
            ..ground("Recon")
        });
        registry.insert(FormationType {
            main_criteria: P::WalkAtLeast(4),
            ideal_role: Some(R::Scout),
            constraints: vec![
                count(2, P::WalkAtLeast(5), "Two units with walk 5"),
                count(1, P::WeightAtLeast(W::Heavy), "One heavy or larger"),
            ],
            ..ground("Heavy Recon")
        });
        registry.insert(FormationType {
            max_weight_class: Some(W::Heavy),
            main_criteria: P::AnyOf(vec![P::WalkAtLeast(5), P::JumpAtLeast(5)]),
            ideal_role: Some(R::Striker),
            constraints: vec![percent(
                0.5,
                roles(&[R::Striker, R::Skirmisher]),
                "Half strikers or skirmishers",
            )],
            ..ground("Striker")
        });
        registry.insert(FormationType {
            max_weight_class: Some(W::Heavy),
            ideal_role: Some(R::Striker),
            constraints: vec![
                percent(0.75, P::WalkAtLeast(6), "Three quarters walk 6"),
                count(1, P::LongRangeAtLeast(0.5), "One long range unit"),
            ],
            ..ground("Pursuit")
        });
        registry.insert(FormationType {
            constraints: vec![
                percent(
                    0.5,
                    roles(&[R::Sniper, R::MissileBoat, R::Skirmisher, R::Juggernaut]),
                    "Half line combat units",
                ),
                count(
                    1,
                    roles(&[R::Brawler, R::Striker, R::Scout]),
                    "One brawler, striker or scout",
                ),
            ],
            ..ground("Command")
        });
        registry.insert(FormationType {
            ideal_role: Some(R::Sniper),
            constraints: vec![count(2, P::Mission(MissionRole::AntiAircraft), "Two anti-aircraft")],
            ..ground("Anti-Air")
        });
        registry.insert(FormationType {
            ideal_role: Some(R::Ambusher),
            constraints: vec![
                percent(
                    0.5,
                    P::AnyOf(vec![P::JumpAtLeast(1), P::Mission(MissionRole::Urban)]),
                    "Half jump capable or urban",
                ),
                percent(0.5, P::WalkAtMost(4), "Half walk 4 or less"),
            ],
            ..ground("Urban")
        });

        registry.insert(squadron(
            "Aerospace Superiority Squadron",
            R::Dogfighter,
            percent(
                0.5,
                roles(&[R::Interceptor, R::Dogfighter, R::FastDogfighter]),
                "Half interceptors or dogfighters",
            ),
        ));
        registry.insert(squadron(
            "Strike Squadron",
            R::AttackFighter,
            percent(
                0.5,
                roles(&[R::AttackFighter, R::Dogfighter]),
                "Half attack fighters or dogfighters",
            ),
        ));
        registry.insert(squadron(
            "Fire Support Squadron",
            R::FireSupport,
            percent(0.5, roles(&[R::FireSupport]), "Half fire support"),
        ));
        registry.insert(squadron(
            "Interceptor Squadron",
            R::Interceptor,
            percent(0.5, roles(&[R::Interceptor]), "Half interceptors"),
        ));

        registry
    }

    /// Parse a list of templates from RON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid RON list of templates or
    /// a template has more than [`MAX_CONSTRAINTS`] counting constraints.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let formations: Vec<FormationType> =
            ron::from_str(text).map_err(|e| GenerationError::DataParseError {
                what: "formation templates".to_string(),
                message: e.to_string(),
            })?;
        if let Some(f) = formations
            .iter()
            .find(|f| f.numeric_constraints().count() > MAX_CONSTRAINTS)
        {
            return Err(GenerationError::DataParseError {
                what: format!("formation template '{}'", f.name),
                message: format!("more than {MAX_CONSTRAINTS} counting constraints"),
            });
        }
        let mut registry = Self::new();
        registry.extend(formations);
        Ok(registry)
    }

    /// Add a template, replacing any with the same name.
    pub fn insert(&mut self, formation: FormationType) {
        self.formations.insert(formation.name.clone(), formation);
    }

    /// Add templates, replacing same-named ones.
    pub fn extend(&mut self, formations: impl IntoIterator<Item = FormationType>) {
        for formation in formations {
            self.insert(formation);
        }
    }

    /// Look up a template.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FormationType> {
        self.formations.get(name)
    }

    /// Template names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formations.keys().map(String::as_str)
    }

    /// All templates.
    pub fn iter(&self) -> impl Iterator<Item = &FormationType> {
        self.formations.values()
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.formations.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formations.is_empty()
    }
}
