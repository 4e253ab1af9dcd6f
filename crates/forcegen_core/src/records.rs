//! Chassis and model records built from the unit catalog.
//!
//! Each catalog entry becomes one [`ModelRecord`]; models sharing a chassis
//! name, unit type and omni flag are grouped under one [`ChassisRecord`].
//! Equipment-derived metrics are computed here, once, and never change.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::catalog::{EquipmentSummary, TechBase, UnitCatalog, UnitSummary};
use crate::mission_role::MissionRole;
use crate::unit_kind::{CombatRole, MovementMode, NetworkMask, UnitType, WeightClass};

/// Weapons reaching at least this many hexes count as long range.
pub const LONG_RANGE_HEXES: u32 = 15;

/// Weapons reaching at most this many hexes count as short range.
pub const SHORT_RANGE_HEXES: u32 = 9;

/// Metrics derived from a model's equipment list.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedMetrics {
    /// Share of weapon BV able to engage aircraft.
    pub flak: f64,
    /// Share of weapon BV from long range weapons.
    pub long_range: f64,
    /// Share of weapon BV from short range weapons.
    pub short_range: f64,
    /// Share of weapon BV from ammunition-fed weapons.
    pub ammo_dependency: f64,
    /// Carries incendiary weapons.
    pub incendiary: bool,
    /// Carries anti-personnel weapons.
    pub anti_personnel: bool,
    /// Effective speed: the better of walking MP and jumping MP.
    pub speed: u8,
}

impl DerivedMetrics {
    /// Compute metrics for an equipment list.
    #[must_use]
    pub fn from_equipment(equipment: &[EquipmentSummary], walk_mp: u8, jump_mp: u8) -> Self {
        let weapons: Vec<&EquipmentSummary> =
            equipment.iter().filter(|e| e.battle_value > 0.0).collect();
        let total: f64 = weapons.iter().map(|e| e.battle_value).sum();
        let share = |keep: &dyn Fn(&EquipmentSummary) -> bool| {
            if total <= 0.0 {
                return 0.0;
            }
            weapons
                .iter()
                .filter(|e| keep(e))
                .map(|e| e.battle_value)
                .sum::<f64>()
                / total
        };

        Self {
            flak: share(&|e| e.has_tag("flak")),
            long_range: share(&|e| e.max_range >= LONG_RANGE_HEXES),
            short_range: share(&|e| e.max_range > 0 && e.max_range <= SHORT_RANGE_HEXES),
            ammo_dependency: share(&|e| e.has_tag("ammo")),
            incendiary: equipment.iter().any(|e| e.has_tag("incendiary")),
            anti_personnel: equipment.iter().any(|e| e.has_tag("anti_personnel")),
            speed: walk_mp.max(jump_mp),
        }
    }
}

/// One unit design.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    /// Catalog key ("Atlas AS7-D").
    pub key: String,
    /// Key of the owning chassis record.
    pub chassis_key: String,
    /// Chassis name.
    pub chassis: String,
    /// Model designation.
    pub model: String,
    /// Unit family.
    pub unit_type: UnitType,
    /// Weight class.
    pub weight_class: WeightClass,
    /// Tonnage.
    pub tonnage: u32,
    /// Motive type.
    pub movement_mode: MovementMode,
    /// Introduction year.
    pub intro_year: i32,
    /// Omni unit.
    pub omni: bool,
    /// Clan technology.
    pub clan: bool,
    /// Inner Sphere unit carrying recovered Star League technology.
    pub star_league: bool,
    /// Declared mission roles.
    pub roles: BTreeSet<MissionRole>,
    /// Battlefield role.
    pub combat_role: CombatRole,
    /// Network equipment carried.
    pub network: NetworkMask,
    /// Walking MP.
    pub walk_mp: u8,
    /// Jumping MP.
    pub jump_mp: u8,
    /// Armor points.
    pub armor: u32,
    /// Equipment-derived metrics.
    pub metrics: DerivedMetrics,
}

impl ModelRecord {
    /// Build a record from a catalog entry and its declared roles.
    #[must_use]
    pub fn from_summary(summary: &UnitSummary, roles: BTreeSet<MissionRole>) -> Self {
        let clan = summary.tech_base == TechBase::Clan;
        let star_league = !clan && summary.equipment.iter().any(|e| e.has_tag("advanced"));
        let tags: Vec<&str> = summary
            .equipment
            .iter()
            .flat_map(|e| e.tags.iter().map(String::as_str))
            .collect();

        Self {
            key: summary.key(),
            chassis_key: chassis_key(&summary.chassis, summary.unit_type, summary.omni),
            chassis: summary.chassis.clone(),
            model: summary.model.clone(),
            unit_type: summary.unit_type,
            weight_class: summary.weight_class,
            tonnage: summary.tonnage,
            movement_mode: summary.movement_mode,
            intro_year: summary.year,
            omni: summary.omni,
            clan,
            star_league,
            roles,
            combat_role: summary.combat_role,
            network: NetworkMask::from_tags(&tags),
            walk_mp: summary.walk_mp,
            jump_mp: summary.jump_mp,
            armor: summary.armor,
            metrics: DerivedMetrics::from_equipment(
                &summary.equipment,
                summary.walk_mp,
                summary.jump_mp,
            ),
        }
    }

    /// Check if the model declares a mission role.
    #[must_use]
    pub fn has_role(&self, role: MissionRole) -> bool {
        self.roles.contains(&role)
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.key
    }
}

/// Key for a chassis: name, unit type and omni flag.
#[must_use]
pub fn chassis_key(chassis: &str, unit_type: UnitType, omni: bool) -> String {
    if omni {
        format!("{chassis}[{}]Omni", unit_type.display_name())
    } else {
        format!("{chassis}[{}]", unit_type.display_name())
    }
}

/// A unit family and its variants.
#[derive(Debug, Clone)]
pub struct ChassisRecord {
    /// Chassis key.
    pub key: String,
    /// Chassis name.
    pub name: String,
    /// Unit family.
    pub unit_type: UnitType,
    /// Omni chassis.
    pub omni: bool,
    /// Variants, in catalog order.
    pub models: Vec<Arc<ModelRecord>>,
}

/// Model filters applied while building a table.
#[derive(Debug, Clone, Copy)]
pub struct ModelFilter<'a> {
    /// Latest allowed introduction year.
    pub year: i32,
    /// Allowed weight classes; empty allows all.
    pub weight_classes: &'a BTreeSet<WeightClass>,
    /// Allowed movement modes; empty allows all.
    pub movement_modes: &'a BTreeSet<MovementMode>,
    /// Network equipment every model must carry.
    pub network: NetworkMask,
    /// Roles that disqualify a model.
    pub roles_excluded: &'a BTreeSet<MissionRole>,
}

impl ModelFilter<'_> {
    /// Whether a model passes the filter.
    #[must_use]
    pub fn accepts(&self, model: &ModelRecord) -> bool {
        model.intro_year <= self.year
            && (self.weight_classes.is_empty() || self.weight_classes.contains(&model.weight_class))
            && (self.movement_modes.is_empty()
                || self.movement_modes.contains(&model.movement_mode))
            && model.network.contains(self.network)
            && !model.roles.iter().any(|r| self.roles_excluded.contains(r))
    }
}

impl ChassisRecord {
    /// Earliest introduction year among the models.
    #[must_use]
    pub fn intro_year(&self) -> i32 {
        self.models
            .iter()
            .map(|m| m.intro_year)
            .min()
            .unwrap_or(i32::MAX)
    }

    /// Whether any model is Clan technology.
    #[must_use]
    pub fn is_clan(&self) -> bool {
        self.models.iter().any(|m| m.clan)
    }

    /// Models passing a filter.
    pub fn filtered_models<'a>(
        &'a self,
        filter: &'a ModelFilter<'a>,
    ) -> impl Iterator<Item = &'a Arc<ModelRecord>> + 'a {
        self.models.iter().filter(move |m| filter.accepts(m))
    }
}

/// Chassis and model records indexed by key.
#[derive(Debug, Clone, Default)]
pub struct UnitRecords {
    chassis: BTreeMap<String, ChassisRecord>,
    models: BTreeMap<String, Arc<ModelRecord>>,
}

impl UnitRecords {
    /// Build records for every catalog entry.
    ///
    /// `roles` maps model keys to declared mission roles; models without an
    /// entry have none.
    #[must_use]
    pub fn build(
        catalog: &dyn UnitCatalog,
        roles: &BTreeMap<String, BTreeSet<MissionRole>>,
    ) -> Self {
        let mut records = Self::default();
        for summary in catalog.all_units() {
            let model_roles = roles.get(&summary.key()).cloned().unwrap_or_default();
            records.insert(ModelRecord::from_summary(summary, model_roles));
        }
        for key in roles.keys() {
            if !records.models.contains_key(key) {
                tracing::warn!("Role assignment for unknown model '{key}'");
            }
        }
        tracing::info!(
            "Built {} chassis records with {} models",
            records.chassis.len(),
            records.models.len()
        );
        records
    }

    /// Add a model, creating its chassis record if needed.
    pub fn insert(&mut self, model: ModelRecord) {
        let model = Arc::new(model);
        self.chassis
            .entry(model.chassis_key.clone())
            .or_insert_with(|| ChassisRecord {
                key: model.chassis_key.clone(),
                name: model.chassis.clone(),
                unit_type: model.unit_type,
                omni: model.omni,
                models: Vec::new(),
            })
            .models
            .push(Arc::clone(&model));
        self.models.insert(model.key.clone(), model);
    }

    /// Get a chassis by key.
    #[must_use]
    pub fn chassis(&self, key: &str) -> Option<&ChassisRecord> {
        self.chassis.get(key)
    }

    /// Get a model by key.
    #[must_use]
    pub fn model(&self, key: &str) -> Option<&Arc<ModelRecord>> {
        self.models.get(key)
    }

    /// All chassis of a unit type, in key order.
    pub fn chassis_of_type(&self, unit_type: UnitType) -> impl Iterator<Item = &ChassisRecord> {
        self.chassis
            .values()
            .filter(move |c| c.unit_type == unit_type)
    }

    /// Number of models.
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;

    fn weapon(name: &str, bv: f64, range: u32, tags: &[&str]) -> EquipmentSummary {
        EquipmentSummary {
            name: name.to_string(),
            battle_value: bv,
            max_range: range,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    fn summary(chassis: &str, model: &str, year: i32, equipment: Vec<EquipmentSummary>) -> UnitSummary {
        UnitSummary {
            chassis: chassis.to_string(),
            model: model.to_string(),
            unit_type: UnitType::Mek,
            weight_class: WeightClass::Heavy,
            tonnage: 70,
            movement_mode: MovementMode::Biped,
            year,
            tech_base: TechBase::InnerSphere,
            omni: false,
            walk_mp: 4,
            jump_mp: 0,
            armor: 200,
            combat_role: CombatRole::MissileBoat,
            equipment,
        }
    }

    #[test]
    fn test_metrics_from_equipment() {
        let equipment = vec![
            weapon("LRM 20", 180.0, 21, &["ammo", "flak"]),
            weapon("Medium Laser", 46.0, 9, &[]),
            weapon("SRM 6", 59.0, 9, &["ammo", "anti_personnel"]),
            weapon("Heat Sink", 0.0, 0, &[]),
        ];
        let m = DerivedMetrics::from_equipment(&equipment, 4, 0);
        let total = 180.0 + 46.0 + 59.0;
        assert!((m.long_range - 180.0 / total).abs() < 1e-9);
        assert!((m.short_range - 105.0 / total).abs() < 1e-9);
        assert!((m.ammo_dependency - 239.0 / total).abs() < 1e-9);
        assert!((m.flak - 180.0 / total).abs() < 1e-9);
        assert!(m.anti_personnel);
        assert!(!m.incendiary);
        assert_eq!(m.speed, 4);
    }

    #[test]
    fn test_metrics_without_weapons() {
        let m = DerivedMetrics::from_equipment(&[], 3, 5);
        assert_eq!(m.long_range, 0.0);
        assert_eq!(m.speed, 5);
    }

    #[test]
    fn test_model_from_summary() {
        let mut s = summary("Catapult", "CPLT-C3", 3050, vec![
            weapon("Arrow IV", 240.0, 24, &["ammo", "advanced"]),
            weapon("C3 Slave", 0.0, 0, &["c3_slave"]),
        ]);
        s.omni = false;
        let roles = BTreeSet::from([MissionRole::Artillery]);
        let m = ModelRecord::from_summary(&s, roles);
        assert_eq!(m.key, "Catapult CPLT-C3");
        assert_eq!(m.chassis_key, "Catapult[Mek]");
        assert!(m.star_league);
        assert!(!m.clan);
        assert!(m.network.contains(NetworkMask::C3_SLAVE));
        assert!(m.has_role(MissionRole::Artillery));
    }

    #[test]
    fn test_chassis_grouping_and_intro_year() {
        let catalog = InMemoryCatalog::new(vec![
            summary("Catapult", "CPLT-C1", 2561, vec![]),
            summary("Catapult", "CPLT-K2", 2580, vec![]),
            summary("Marauder", "MAD-3R", 2819, vec![]),
        ]);
        let records = UnitRecords::build(&catalog, &BTreeMap::new());
        let chassis = records.chassis("Catapult[Mek]").expect("chassis");
        assert_eq!(chassis.models.len(), 2);
        assert_eq!(chassis.intro_year(), 2561);
        assert_eq!(records.chassis_of_type(UnitType::Mek).count(), 2);
        assert_eq!(records.chassis_of_type(UnitType::Tank).count(), 0);
        assert_eq!(records.model_count(), 3);
    }

    #[test]
    fn test_model_filter() {
        let catalog = InMemoryCatalog::new(vec![
            summary("Catapult", "CPLT-C1", 2561, vec![]),
            summary("Catapult", "CPLT-C3", 3050, vec![]),
        ]);
        let roles = BTreeMap::from([(
            "Catapult CPLT-C1".to_string(),
            BTreeSet::from([MissionRole::FireSupport]),
        )]);
        let records = UnitRecords::build(&catalog, &roles);
        let chassis = records.chassis("Catapult[Mek]").expect("chassis");

        let empty_w = BTreeSet::new();
        let empty_m = BTreeSet::new();
        let excluded = BTreeSet::from([MissionRole::FireSupport]);
        let none = BTreeSet::new();
        let filter = ModelFilter {
            year: 3025,
            weight_classes: &empty_w,
            movement_modes: &empty_m,
            network: NetworkMask::NONE,
            roles_excluded: &none,
        };
        assert_eq!(chassis.filtered_models(&filter).count(), 1);

        let filter = ModelFilter {
            year: 3060,
            roles_excluded: &excluded,
            ..filter
        };
        let keys: Vec<_> = chassis.filtered_models(&filter).map(|m| m.key.clone()).collect();
        assert_eq!(keys, vec!["Catapult CPLT-C3".to_string()]);

        let lights = BTreeSet::from([WeightClass::Light]);
        let filter = ModelFilter {
            weight_classes: &lights,
            ..filter
        };
        assert_eq!(chassis.filtered_models(&filter).count(), 0);
    }
}
