//! Force tree expansion.
//!
//! A [`ForceDescriptor`] describes the structure of a force: a company of
//! three lances, a cluster of trinaries, a single squadron. Faction, year,
//! rating and unit type set on a node apply to everything below it.
//! [`ForceTreeBuilder`] walks the tree and fills each leaf with units, using
//! the node's formation template when it has one and the chassis cohesion
//! heuristic otherwise.

use std::sync::Arc;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};
use crate::formation::{FormationRegistry, FormationSolver};
use crate::mission_role::MissionRole;
use crate::parameters::Parameters;
use crate::rat_generator::RatGenerator;
use crate::records::ModelRecord;
use crate::unit_kind::{CombatRole, MovementMode, NetworkMask, UnitType, WeightClass};
use crate::unit_table::UnitTable;

/// Organizational level of a force node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Eschelon {
    /// Single Clan unit or infantry point.
    Point,
    /// Two fighters.
    Flight,
    /// Inner Sphere lance of four.
    Lance,
    /// Clan star of five.
    Star,
    /// ComStar level II of six.
    LevelII,
    /// Six fighters.
    Squadron,
    /// Three lances.
    Company,
    /// Two stars.
    Binary,
    /// Three stars.
    Trinary,
    /// Three companies.
    Battalion,
    /// Three trinaries.
    Cluster,
    /// Six level IIs.
    LevelIII,
}

impl Eschelon {
    /// Units in a leaf of this size, if it is a leaf level.
    #[must_use]
    pub const fn default_units(self) -> Option<usize> {
        match self {
            Self::Point => Some(1),
            Self::Flight => Some(2),
            Self::Lance => Some(4),
            Self::Star => Some(5),
            Self::LevelII | Self::Squadron => Some(6),
            _ => None,
        }
    }

    /// Child level and count for a composite level.
    #[must_use]
    pub const fn default_subforces(self) -> Option<(Self, usize)> {
        match self {
            Self::Company => Some((Self::Lance, 3)),
            Self::Binary => Some((Self::Star, 2)),
            Self::Trinary => Some((Self::Star, 3)),
            Self::Cluster => Some((Self::Trinary, 3)),
            Self::Battalion => Some((Self::Company, 3)),
            Self::LevelIII => Some((Self::LevelII, 6)),
            _ => None,
        }
    }
}

/// One node of a force structure.
///
/// Every field except the name is optional; unset fields are inherited from
/// the parent node.
///
/// ```ron
/// ForceDescriptor(
///     name: "1st Company",
///     eschelon: Some(Company),
///     faction: Some("FS"),
///     year: Some(3025),
///     rating: Some("B"),
///     unit_type: Some(Mek),
///     formation: Some("Battle"),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceDescriptor {
    /// Display name.
    pub name: String,
    /// Organizational level; composite levels expand to default children
    /// when no subforces are listed.
    #[serde(default)]
    pub eschelon: Option<Eschelon>,
    /// Supplying faction.
    #[serde(default)]
    pub faction: Option<String>,
    /// Fielding faction, when it differs from the supplier.
    #[serde(default)]
    pub deploying_faction: Option<String>,
    /// Game year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Equipment rating.
    #[serde(default)]
    pub rating: Option<String>,
    /// Unit type.
    #[serde(default)]
    pub unit_type: Option<UnitType>,
    /// Formation template for leaves.
    #[serde(default)]
    pub formation: Option<String>,
    /// Units in this leaf, overriding the eschelon default.
    #[serde(default)]
    pub units: Option<usize>,
    /// Weight classes for leaf units.
    #[serde(default)]
    pub weight_classes: Vec<WeightClass>,
    /// Desired mission roles for leaf units.
    #[serde(default)]
    pub roles: Vec<MissionRole>,
    /// Network equipment tags (`c3_master`, `c3i`, `nova`, ...).
    #[serde(default)]
    pub network: Vec<String>,
    /// Child nodes.
    #[serde(default)]
    pub subforces: Vec<ForceDescriptor>,
}

impl ForceDescriptor {
    /// A node with nothing but a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            eschelon: None,
            faction: None,
            deploying_faction: None,
            year: None,
            rating: None,
            unit_type: None,
            formation: None,
            units: None,
            weight_classes: Vec::new(),
            roles: Vec::new(),
            network: Vec::new(),
            subforces: Vec::new(),
        }
    }

    /// Parse a descriptor tree from RON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid descriptor.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GenerationError::DataParseError {
            what: "force descriptor".to_string(),
            message: e.to_string(),
        })
    }

    fn children(&self) -> Vec<Self> {
        if !self.subforces.is_empty() || self.units.is_some() {
            return self.subforces.clone();
        }
        let Some((eschelon, count)) = self.eschelon.and_then(Eschelon::default_subforces) else {
            return Vec::new();
        };
        (1..=count)
            .map(|i| Self {
                eschelon: Some(eschelon),
                ..Self::new(format!("{} {i}", eschelon_name(eschelon)))
            })
            .collect()
    }
}

fn eschelon_name(eschelon: Eschelon) -> &'static str {
    match eschelon {
        Eschelon::Point => "Point",
        Eschelon::Flight => "Flight",
        Eschelon::Lance => "Lance",
        Eschelon::Star => "Star",
        Eschelon::LevelII => "Level II",
        Eschelon::Squadron => "Squadron",
        Eschelon::Company => "Company",
        Eschelon::Binary => "Binary",
        Eschelon::Trinary => "Trinary",
        Eschelon::Battalion => "Battalion",
        Eschelon::Cluster => "Cluster",
        Eschelon::LevelIII => "Level III",
    }
}

fn own_or_parent<T: Clone>(own: &[T], parent: &[T]) -> Vec<T> {
    if own.is_empty() {
        parent.to_vec()
    } else {
        own.to_vec()
    }
}

/// Values a node passes to its children.
#[derive(Debug, Clone, Default)]
struct Inherited {
    faction: Option<String>,
    deploying_faction: Option<String>,
    year: Option<i32>,
    rating: Option<String>,
    unit_type: Option<UnitType>,
    formation: Option<String>,
    weight_classes: Vec<WeightClass>,
    roles: Vec<MissionRole>,
    network: Vec<String>,
}

impl Inherited {
    fn apply(&self, node: &ForceDescriptor) -> Self {
        Self {
            faction: node.faction.clone().or_else(|| self.faction.clone()),
            deploying_faction: node
                .deploying_faction
                .clone()
                .or_else(|| self.deploying_faction.clone()),
            year: node.year.or(self.year),
            rating: node.rating.clone().or_else(|| self.rating.clone()),
            unit_type: node.unit_type.or(self.unit_type),
            formation: node.formation.clone().or_else(|| self.formation.clone()),
            weight_classes: own_or_parent(&node.weight_classes, &self.weight_classes),
            roles: own_or_parent(&node.roles, &self.roles),
            network: own_or_parent(&node.network, &self.network),
        }
    }

    fn params(&self, name: &str) -> Result<Parameters> {
        let missing = |field| GenerationError::IncompleteDescriptor {
            name: name.to_string(),
            field,
        };
        let faction = self.faction.clone().ok_or_else(|| missing("faction"))?;
        let year = self.year.ok_or_else(|| missing("year"))?;
        let unit_type = self.unit_type.ok_or_else(|| missing("unit type"))?;

        let mut params = Parameters::new(faction, unit_type, year)
            .with_weight_classes(self.weight_classes.iter().copied())
            .with_roles(self.roles.iter().copied(), 1);
        if let Some(rating) = &self.rating {
            params = params.with_rating(rating.clone());
        }
        if let Some(deploying) = &self.deploying_faction {
            params = params.with_deploying_faction(deploying.clone());
        }
        Ok(params)
    }
}

/// A unit placed in a generated force.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedUnit {
    /// Catalog key.
    pub key: String,
    /// Chassis name.
    pub chassis: String,
    /// Model name.
    pub model: String,
    /// Unit type.
    pub unit_type: UnitType,
    /// Weight class.
    pub weight_class: WeightClass,
    /// Tonnage.
    pub tonnage: u32,
    /// Movement mode.
    pub movement_mode: MovementMode,
    /// Battlefield role.
    pub combat_role: CombatRole,
    /// Declared mission roles.
    pub roles: Vec<MissionRole>,
}

impl From<&ModelRecord> for GeneratedUnit {
    fn from(model: &ModelRecord) -> Self {
        Self {
            key: model.key.clone(),
            chassis: model.chassis.clone(),
            model: model.model.clone(),
            unit_type: model.unit_type,
            weight_class: model.weight_class,
            tonnage: model.tonnage,
            movement_mode: model.movement_mode,
            combat_role: model.combat_role,
            roles: model.roles.iter().copied().collect(),
        }
    }
}

/// A generated force node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedForce {
    /// Display name.
    pub name: String,
    /// Organizational level.
    pub eschelon: Option<Eschelon>,
    /// Formation template used, if the template could be satisfied.
    pub formation: Option<String>,
    /// Units of a leaf node.
    pub units: Vec<GeneratedUnit>,
    /// Child nodes.
    pub subforces: Vec<GeneratedForce>,
}

impl GeneratedForce {
    /// Units in this node and every descendant.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len() + self.subforces.iter().map(Self::unit_count).sum::<usize>()
    }

    /// Every unit in depth-first order.
    #[must_use]
    pub fn all_units(&self) -> Vec<&GeneratedUnit> {
        let mut units: Vec<&GeneratedUnit> = self.units.iter().collect();
        for child in &self.subforces {
            units.extend(child.all_units());
        }
        units
    }
}

/// Expands force descriptors into generated forces.
pub struct ForceTreeBuilder<'g> {
    generator: &'g mut RatGenerator,
    formations: &'g FormationRegistry,
}

impl<'g> ForceTreeBuilder<'g> {
    /// Create a builder using `generator` for tables and `formations` for
    /// template lookups.
    pub fn new(generator: &'g mut RatGenerator, formations: &'g FormationRegistry) -> Self {
        Self {
            generator,
            formations,
        }
    }

    /// Expand a descriptor tree.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::IncompleteDescriptor`] when a leaf has no
    /// faction, year, unit type or unit count after inheritance.
    pub fn build(
        &mut self,
        descriptor: &ForceDescriptor,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedForce> {
        self.build_node(descriptor, &Inherited::default(), rng)
    }

    fn build_node(
        &mut self,
        node: &ForceDescriptor,
        parent: &Inherited,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedForce> {
        let inherited = parent.apply(node);
        let children = node.children();
        if !children.is_empty() {
            let subforces = children
                .iter()
                .map(|child| self.build_node(child, &inherited, rng))
                .collect::<Result<Vec<_>>>()?;
            return Ok(GeneratedForce {
                name: node.name.clone(),
                eschelon: node.eschelon,
                formation: None,
                units: Vec::new(),
                subforces,
            });
        }

        let count = node
            .units
            .or_else(|| node.eschelon.and_then(Eschelon::default_units))
            .ok_or_else(|| GenerationError::IncompleteDescriptor {
                name: node.name.clone(),
                field: "unit count",
            })?;
        // The network shapes the formation; it never filters the table.
        let params = inherited.params(&node.name)?;
        let network = NetworkMask::from_tags(&inherited.network);

        let mut formation_used = None;
        let mut units = Vec::new();
        if let Some(name) = &inherited.formation {
            match self.formations.get(name) {
                Some(formation) => {
                    units = FormationSolver::new(self.generator).generate_formation(
                        formation,
                        std::slice::from_ref(&params),
                        &[count],
                        network,
                        false,
                        None,
                        None,
                        rng,
                    )?;
                    if units.is_empty() {
                        tracing::warn!(
                            "{}: {name} formation could not be met, using cohesion heuristic",
                            node.name
                        );
                    } else {
                        formation_used = Some(name.clone());
                    }
                }
                None => tracing::warn!("{}: unknown formation {name}", node.name),
            }
        }
        if units.is_empty() {
            units = self.generate_lance(&params, count, rng);
        }

        tracing::debug!("{}: {} of {count} units", node.name, units.len());
        Ok(GeneratedForce {
            name: node.name.clone(),
            eschelon: node.eschelon,
            formation: formation_used,
            units: units.iter().map(|u| GeneratedUnit::from(u.as_ref())).collect(),
            subforces: Vec::new(),
        })
    }

    /// Fill `count` slots without a template.
    ///
    /// Each slot after the first reuses an already chosen chassis on a 2d6
    /// roll against the cohesion target, which drops as the rating rises.
    /// Otherwise a fresh unit is drawn, relaxing the query step by step when
    /// the table has nothing: neighbouring weight classes, then no roles,
    /// then any motive, then any weight class. May return fewer units when
    /// even the relaxed tables are empty.
    pub fn generate_lance(
        &mut self,
        params: &Parameters,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Arc<ModelRecord>> {
        let target = self.cohesion_target(params);
        let table = UnitTable::create(self.generator, params.clone());
        let mut units: Vec<Arc<ModelRecord>> = Vec::with_capacity(count);

        for _ in 0..count {
            let roll: u32 = rng.gen_range(1..=6) + rng.gen_range(1..=6);
            let reused = if !units.is_empty() && roll >= target {
                table.sample_one(rng, &|m| {
                    units.iter().any(|u| u.chassis_key == m.chassis_key)
                })
            } else {
                None
            };
            match reused.or_else(|| self.sample_fresh(&table, params, rng)) {
                Some(unit) => units.push(unit),
                None => {
                    tracing::warn!(
                        "no {} units for {} in {}",
                        params.unit_type,
                        params.faction,
                        params.year
                    );
                    break;
                }
            }
        }
        units
    }

    fn cohesion_target(&self, params: &Parameters) -> u32 {
        let data = self.generator.data();
        let cohesion = data.config.cohesion;
        let levels = data.factions.rating_level_system(&params.faction).len();
        let bonus = data
            .factions
            .rating_index(&params.faction, params.rating.as_deref())
            .filter(|_| levels > 1)
            .map_or(0, |i| {
                let scaled = cohesion.max_rating_bonus as usize * i / (levels - 1);
                u32::try_from(scaled).unwrap_or(cohesion.max_rating_bonus)
            });
        cohesion.base_target.saturating_sub(bonus)
    }

    fn sample_fresh(
        &mut self,
        table: &UnitTable,
        params: &Parameters,
        rng: &mut dyn RngCore,
    ) -> Option<Arc<ModelRecord>> {
        if let Some(unit) = table.sample_one(rng, &|_| true) {
            return Some(unit);
        }
        for relaxed in relaxations(params) {
            let table = UnitTable::create(self.generator, relaxed.clone());
            if let Some(unit) = table.sample_one(rng, &|_| true) {
                tracing::debug!("relaxed query to {:?}", relaxed);
                return Some(unit);
            }
        }
        None
    }
}

/// Progressively looser versions of a query.
fn relaxations(params: &Parameters) -> Vec<Parameters> {
    let mut steps = Vec::new();
    let mut relaxed = params.clone();
    if !relaxed.weight_classes.is_empty() {
        relaxed.weight_classes = params
            .weight_classes
            .iter()
            .flat_map(|w| w.with_neighbours())
            .collect();
        if relaxed.weight_classes != params.weight_classes {
            steps.push(relaxed.clone());
        }
    }
    if !relaxed.roles.is_empty() {
        relaxed.roles.clear();
        steps.push(relaxed.clone());
    }
    if !relaxed.movement_modes.is_empty() {
        relaxed.movement_modes.clear();
        steps.push(relaxed.clone());
    }
    if !relaxed.weight_classes.is_empty() {
        relaxed.weight_classes.clear();
        steps.push(relaxed);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::AvailabilityRating;
    use crate::catalog::{InMemoryCatalog, TechBase, UnitSummary};
    use crate::factions::{FactionGraph, FactionRecord};
    use crate::rat_generator::{GeneratorData, RatData, RecordKind};
    use crate::records::UnitRecords;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeMap;

    fn mek(chassis: &str, weight_class: WeightClass, role: CombatRole) -> UnitSummary {
        UnitSummary {
            chassis: chassis.to_string(),
            model: "A".to_string(),
            unit_type: UnitType::Mek,
            weight_class,
            tonnage: 50,
            movement_mode: MovementMode::Biped,
            year: 3000,
            tech_base: TechBase::InnerSphere,
            omni: false,
            walk_mp: 5,
            jump_mp: 0,
            armor: 100,
            combat_role: role,
            equipment: Vec::new(),
        }
    }

    fn generator() -> RatGenerator {
        let units = vec![
            mek("Locust", WeightClass::Light, CombatRole::Scout),
            mek("Jenner", WeightClass::Light, CombatRole::Striker),
            mek("Hunchback", WeightClass::Medium, CombatRole::Brawler),
            mek("Marauder", WeightClass::Heavy, CombatRole::Sniper),
            mek("Warhammer", WeightClass::Heavy, CombatRole::Brawler),
            mek("Atlas", WeightClass::Assault, CombatRole::Juggernaut),
        ];
        let mut availability = RatData::new();
        for unit in &units {
            availability.insert(
                RecordKind::Chassis,
                AvailabilityRating::new(format!("{}[Mek]", unit.chassis), "FS", 3025, 6.0),
            );
            availability.insert(
                RecordKind::Model,
                AvailabilityRating::new(unit.key(), "FS", 3025, 6.0),
            );
        }
        let mut fs = FactionRecord::new("FS", "Federated Suns");
        fs.rating_levels = ["F", "D", "C", "B", "A"].map(String::from).to_vec();
        RatGenerator::new(GeneratorData {
            availability,
            factions: FactionGraph::from_records([fs]).expect("factions"),
            records: UnitRecords::build(&InMemoryCatalog::new(units), &BTreeMap::new()),
            ..GeneratorData::default()
        })
    }

    fn company() -> ForceDescriptor {
        ForceDescriptor {
            eschelon: Some(Eschelon::Company),
            faction: Some("FS".to_string()),
            year: Some(3025),
            rating: Some("B".to_string()),
            unit_type: Some(UnitType::Mek),
            ..ForceDescriptor::new("1st Company")
        }
    }

    #[test]
    fn test_company_expands_to_three_lances() {
        let mut gen = generator();
        let registry = FormationRegistry::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let force = ForceTreeBuilder::new(&mut gen, &registry)
            .build(&company(), &mut rng)
            .expect("complete descriptor");
        assert_eq!(force.subforces.len(), 3);
        assert!(force.subforces.iter().all(|l| l.units.len() == 4));
        assert_eq!(force.unit_count(), 12);
        assert_eq!(force.subforces[1].name, "Lance 2");
    }

    #[test]
    fn test_formation_is_used_when_satisfiable() {
        let mut gen = generator();
        let registry = FormationRegistry::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let lance = ForceDescriptor {
            eschelon: Some(Eschelon::Lance),
            formation: Some("Battle".to_string()),
            ..company()
        };
        let force = ForceTreeBuilder::new(&mut gen, &registry)
            .build(&lance, &mut rng)
            .expect("complete descriptor");
        assert_eq!(force.formation.as_deref(), Some("Battle"));
        let heavy = force
            .units
            .iter()
            .filter(|u| u.weight_class >= WeightClass::Heavy)
            .count();
        assert!(heavy >= 2);
    }

    #[test]
    fn test_unsatisfiable_formation_degrades_to_heuristic() {
        let mut gen = generator();
        let registry = FormationRegistry::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let lance = ForceDescriptor {
            eschelon: Some(Eschelon::Lance),
            formation: Some("Anti-Air".to_string()),
            ..company()
        };
        let force = ForceTreeBuilder::new(&mut gen, &registry)
            .build(&lance, &mut rng)
            .expect("complete descriptor");
        assert!(force.formation.is_none());
        assert_eq!(force.units.len(), 4);
    }

    #[test]
    fn test_missing_faction_is_an_error() {
        let mut gen = generator();
        let registry = FormationRegistry::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let lance = ForceDescriptor {
            eschelon: Some(Eschelon::Lance),
            year: Some(3025),
            unit_type: Some(UnitType::Mek),
            ..ForceDescriptor::new("Orphan")
        };
        let result = ForceTreeBuilder::new(&mut gen, &registry).build(&lance, &mut rng);
        assert!(matches!(
            result,
            Err(GenerationError::IncompleteDescriptor { field: "faction", .. })
        ));
    }

    #[test]
    fn test_children_inherit_and_override() {
        let mut gen = generator();
        let registry = FormationRegistry::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut heavy = ForceDescriptor::new("Heavy Lance");
        heavy.units = Some(4);
        heavy.weight_classes = vec![WeightClass::Heavy];
        let mut root = company();
        root.eschelon = None;
        root.subforces = vec![heavy];
        let force = ForceTreeBuilder::new(&mut gen, &registry)
            .build(&root, &mut rng)
            .expect("complete descriptor");
        let lance = &force.subforces[0];
        assert_eq!(lance.units.len(), 4);
        assert!(lance.units.iter().all(|u| u.weight_class == WeightClass::Heavy));
    }

    #[test]
    fn test_generate_lance_relaxes_weight_class() {
        let mut gen = generator();
        let registry = FormationRegistry::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let params = Parameters::new("FS", UnitType::Mek, 3025)
            .with_weight_classes([WeightClass::UltraLight]);
        let units = ForceTreeBuilder::new(&mut gen, &registry).generate_lance(&params, 3, &mut rng);
        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| u.weight_class == WeightClass::Light));
    }

    #[test]
    fn test_cohesion_target_drops_with_rating() {
        let mut gen = generator();
        let registry = FormationRegistry::standard();
        let builder = ForceTreeBuilder::new(&mut gen, &registry);
        let low = Parameters::new("FS", UnitType::Mek, 3025).with_rating("F");
        let high = Parameters::new("FS", UnitType::Mek, 3025).with_rating("A");
        assert_eq!(builder.cohesion_target(&low), 10);
        assert_eq!(builder.cohesion_target(&high), 6);
    }

    #[test]
    fn test_descriptor_from_ron() {
        let descriptor = ForceDescriptor::from_ron_str(
            r#"ForceDescriptor(
                name: "Alpha",
                eschelon: Some(Trinary),
                faction: Some("CJF"),
                year: Some(3050),
                unit_type: Some(Mek),
                network: ["c3i"],
            )"#,
        )
        .expect("valid RON");
        let stars = descriptor.children();
        assert_eq!(stars.len(), 3);
        assert_eq!(stars[0].eschelon, Some(Eschelon::Star));
    }
}
