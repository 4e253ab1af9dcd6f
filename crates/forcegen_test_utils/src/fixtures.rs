//! Test fixtures and helpers.
//!
//! A small but complete data set: a catalog covering every weight class,
//! tanks of three motive types, fighters, C3 equipped units and Clan
//! OmniMeks; an Inner Sphere and Clan faction graph; availability codes
//! for the 3025 and 3050 eras.

use std::collections::BTreeMap;

use forcegen_core::catalog::{EquipmentSummary, InMemoryCatalog, TechBase, UnitSummary};
use forcegen_core::config::GeneratorConfig;
use forcegen_core::data::{AvailabilityData, ChassisAvailability, EraData, ModelAvailability};
use forcegen_core::factions::{
    EraTechMix, FactionGraph, FactionRecord, SalvageSources, TechCategory, YearRange,
};
use forcegen_core::mission_role::MissionRole;
use forcegen_core::rat_generator::{GeneratorData, RatGenerator};
use forcegen_core::records::UnitRecords;
use forcegen_core::unit_kind::{CombatRole, MovementMode, UnitType, WeightClass};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seeded RNG for reproducible tests.
#[must_use]
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Rating levels used by the Inner Sphere factions.
pub const IS_RATINGS: [&str; 5] = ["F", "D", "C", "B", "A"];

/// A single-weapon unit.
#[must_use]
pub fn unit(
    chassis: &str,
    model: &str,
    unit_type: UnitType,
    weight_class: WeightClass,
    movement_mode: MovementMode,
    role: CombatRole,
) -> UnitSummary {
    UnitSummary {
        chassis: chassis.to_string(),
        model: model.to_string(),
        unit_type,
        weight_class,
        tonnage: 50,
        movement_mode,
        year: 2750,
        tech_base: TechBase::InnerSphere,
        omni: false,
        walk_mp: 5,
        jump_mp: 0,
        armor: 150,
        combat_role: role,
        equipment: vec![weapon("Large Laser", 123.0, 15, &[])],
    }
}

/// A Mek with the given walking MP.
#[must_use]
pub fn mek(chassis: &str, model: &str, weight_class: WeightClass, role: CombatRole, walk_mp: u8) -> UnitSummary {
    UnitSummary {
        walk_mp,
        ..unit(chassis, model, UnitType::Mek, weight_class, MovementMode::Biped, role)
    }
}

/// An equipment entry.
#[must_use]
pub fn weapon(name: &str, battle_value: f64, max_range: u32, tags: &[&str]) -> EquipmentSummary {
    EquipmentSummary {
        name: name.to_string(),
        battle_value,
        max_range,
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
    }
}

fn with_equipment(mut unit: UnitSummary, equipment: EquipmentSummary) -> UnitSummary {
    unit.equipment.push(equipment);
    unit
}

fn clan_omni(unit: UnitSummary) -> UnitSummary {
    UnitSummary {
        tech_base: TechBase::Clan,
        omni: true,
        year: 2945,
        ..unit
    }
}

/// The sample catalog.
#[must_use]
pub fn sample_catalog() -> InMemoryCatalog {
    use CombatRole as R;
    use MovementMode as M;
    use UnitType as T;
    use WeightClass as W;

    let tank = |chassis, class, mode, role| unit(chassis, "", T::Tank, class, mode, role);
    let fighter =
        |chassis, model, class, role| unit(chassis, model, T::AeroSpaceFighter, class, M::Aerodyne, role);

    let units = vec![
        mek("Locust", "LCT-1V", W::Light, R::Scout, 8),
        mek("Jenner", "JR7-D", W::Light, R::Striker, 7),
        mek("Panther", "PNT-9R", W::Light, R::Brawler, 4),
        mek("Hunchback", "HBK-4G", W::Medium, R::Brawler, 4),
        mek("Griffin", "GRF-1N", W::Medium, R::Skirmisher, 5),
        mek("Centurion", "CN9-A", W::Medium, R::Brawler, 4),
        mek("Marauder", "MAD-3R", W::Heavy, R::Sniper, 4),
        mek("Warhammer", "WHM-6R", W::Heavy, R::Brawler, 4),
        with_equipment(
            mek("Catapult", "CPLT-C1", W::Heavy, R::MissileBoat, 4),
            weapon("LRM 15", 136.0, 21, &["ammo"]),
        ),
        mek("Atlas", "AS7-D", W::Assault, R::Juggernaut, 3),
        mek("Awesome", "AWS-8Q", W::Assault, R::Sniper, 3),
        with_equipment(
            mek("Cyclops", "CP-11-A", W::Assault, R::Juggernaut, 4),
            weapon("C3 Master Computer", 0.0, 0, &["c3_master"]),
        ),
        with_equipment(
            mek("Enforcer", "ENF-5D", W::Medium, R::Brawler, 4),
            weapon("C3 Slave Unit", 0.0, 0, &["c3_slave"]),
        ),
        with_equipment(
            mek("Hunchback", "HBK-5S", W::Medium, R::Brawler, 4),
            weapon("C3 Slave Unit", 0.0, 0, &["c3_slave"]),
        ),
        clan_omni(mek("Timber Wolf", "Prime", W::Heavy, R::Skirmisher, 5)),
        clan_omni(mek("Dire Wolf", "Prime", W::Assault, R::Juggernaut, 3)),
        tank("Scorpion Light Tank", W::Light, M::Tracked, R::Brawler),
        tank("J. Edgar Light Hover Tank", W::Light, M::Hover, R::Striker),
        tank("Galleon Light Tank", W::Light, M::Wheeled, R::Striker),
        tank("Vedette Medium Tank", W::Medium, M::Tracked, R::Striker),
        tank("Bulldog Medium Tank", W::Medium, M::Tracked, R::Brawler),
        tank("Saladin Assault Hover Tank", W::Medium, M::Hover, R::Ambusher),
        tank("Condor Heavy Hover Tank", W::Heavy, M::Hover, R::Skirmisher),
        tank("Rommel Tank", W::Heavy, M::Tracked, R::Brawler),
        tank("Demolisher Heavy Tank", W::Assault, M::Tracked, R::Juggernaut),
        with_equipment(
            tank("Partisan Air Defense Tank", W::Assault, M::Tracked, R::Sniper),
            weapon("AC/5", 70.0, 18, &["flak", "ammo"]),
        ),
        fighter("Lucifer", "LCF-R15", W::Medium, R::AttackFighter),
        fighter("Stuka", "STU-K5", W::Heavy, R::FireSupport),
        fighter("Corsair", "CSR-V12", W::Medium, R::Dogfighter),
        fighter("Sparrowhawk", "SPR-H5", W::Light, R::Interceptor),
        fighter("Stingray", "F-90", W::Medium, R::Dogfighter),
    ];
    InMemoryCatalog::new(units)
}

fn rating_levels() -> Vec<String> {
    IS_RATINGS.iter().map(|r| (*r).to_string()).collect()
}

/// The sample faction graph.
///
/// `IS` is the Inner Sphere root with ratings F-A. `FS`, `DC` and `LA`
/// inherit from it, `MERC` from both `FS` and `DC`. `FS` takes 10% salvage
/// from `DC`. `CLAN` and `CJF` carry Clan tech targets.
///
/// # Panics
///
/// Panics if the records fail validation.
#[must_use]
pub fn sample_factions() -> FactionGraph {
    let mut is = FactionRecord::new("IS", "Inner Sphere");
    is.rating_levels = rating_levels();
    is.tech_mix.insert(
        3050,
        EraTechMix {
            targets: BTreeMap::from([
                (TechCategory::Omni, vec![0, 0, 0, 5, 10]),
                (TechCategory::IsAdvanced, vec![0, 5, 10, 20, 30]),
            ]),
            omni_margin: 5,
            tech_margin: 5,
            upgrade_margin: 5,
        },
    );

    let mut fs = FactionRecord::new("FS", "Federated Suns");
    fs.parent_factions = vec!["IS".to_string()];
    fs.alt_names.insert(3028, "Federated Commonwealth".to_string());
    fs.salvage.insert(
        3025,
        SalvageSources {
            pct: 10,
            sources: BTreeMap::from([("DC".to_string(), 1)]),
        },
    );

    let mut dc = FactionRecord::new("DC", "Draconis Combine");
    dc.parent_factions = vec!["IS".to_string()];

    let mut la = FactionRecord::new("LA", "Lyran Commonwealth");
    la.parent_factions = vec!["IS".to_string()];
    la.weight_distribution.insert(
        3025,
        BTreeMap::from([(UnitType::Mek, vec![0, 2, 3, 4, 4, 0])]),
    );

    let mut merc = FactionRecord::new("MERC", "Mercenary");
    merc.parent_factions = vec!["FS".to_string(), "DC".to_string()];

    let mut clan = FactionRecord::new("CLAN", "Clan General");
    clan.clan = true;
    clan.rating_levels = ["PGC", "Solahma", "FL", "SL", "Keshik"]
        .iter()
        .map(|r| (*r).to_string())
        .collect();
    clan.tech_mix.insert(
        3050,
        EraTechMix {
            targets: BTreeMap::from([
                (TechCategory::Omni, vec![10, 20, 40, 60, 80]),
                (TechCategory::Clan, vec![60, 70, 80, 90, 100]),
            ]),
            omni_margin: 10,
            tech_margin: 10,
            upgrade_margin: 0,
        },
    );

    let mut cjf = FactionRecord::new("CJF", "Clan Jade Falcon");
    cjf.clan = true;
    cjf.parent_factions = vec!["CLAN".to_string()];
    cjf.active_years = vec![YearRange {
        start: Some(2807),
        end: None,
    }];

    FactionGraph::from_records([is, fs, dc, la, merc, clan, cjf])
        .expect("sample factions are consistent")
}

/// Chassis codes as `(chassis, unit type, omni, 3025 codes, 3050 codes)`.
const CHASSIS_CODES: &[(&str, UnitType, bool, &str, &str)] = &[
    ("Locust", UnitType::Mek, false, "General:7,FS:8", "General:6"),
    ("Jenner", UnitType::Mek, false, "DC:8,General:5", "DC:7,General:4"),
    ("Panther", UnitType::Mek, false, "DC:7,General:4", "DC:6,General:4"),
    ("Hunchback", UnitType::Mek, false, "General:7", "General:7,FS:8"),
    ("Griffin", UnitType::Mek, false, "General:6", "General:6"),
    ("Centurion", UnitType::Mek, false, "FS:7,General:4", "FS:7,General:4"),
    ("Marauder", UnitType::Mek, false, "General:6", "General:6"),
    ("Warhammer", UnitType::Mek, false, "General:6+", "General:6"),
    ("Catapult", UnitType::Mek, false, "General:6", "General:6"),
    ("Atlas", UnitType::Mek, false, "General:4,FS:5", "General:4"),
    ("Awesome", UnitType::Mek, false, "General:5", "General:5"),
    ("Cyclops", UnitType::Mek, false, "", "FS:4,DC:4"),
    ("Enforcer", UnitType::Mek, false, "FS:5", "FS:6"),
    ("Timber Wolf", UnitType::Mek, true, "", "CLAN:7,CJF:8"),
    ("Dire Wolf", UnitType::Mek, true, "", "CLAN:5"),
    ("Scorpion Light Tank", UnitType::Tank, false, "General:7", "General:6"),
    ("J. Edgar Light Hover Tank", UnitType::Tank, false, "General:6", "General:6"),
    ("Galleon Light Tank", UnitType::Tank, false, "General:6", "General:5"),
    ("Vedette Medium Tank", UnitType::Tank, false, "General:8", "General:7"),
    ("Bulldog Medium Tank", UnitType::Tank, false, "General:6", "General:6"),
    ("Saladin Assault Hover Tank", UnitType::Tank, false, "General:6", "General:6"),
    ("Condor Heavy Hover Tank", UnitType::Tank, false, "General:6", "General:6"),
    ("Rommel Tank", UnitType::Tank, false, "LA:6,General:3", "LA:6,General:3"),
    ("Demolisher Heavy Tank", UnitType::Tank, false, "General:5", "General:5"),
    ("Partisan Air Defense Tank", UnitType::Tank, false, "General:5", "General:5"),
    ("Lucifer", UnitType::AeroSpaceFighter, false, "General:7", "General:6"),
    ("Stuka", UnitType::AeroSpaceFighter, false, "General:5", "General:5"),
    ("Corsair", UnitType::AeroSpaceFighter, false, "General:6", "General:6"),
    ("Sparrowhawk", UnitType::AeroSpaceFighter, false, "General:6", "General:6"),
    ("Stingray", UnitType::AeroSpaceFighter, false, "General:6", "General:6"),
];

/// Declared mission roles by model key.
const MODEL_ROLES: &[(&str, MissionRole)] = &[
    ("Locust LCT-1V", MissionRole::Recon),
    ("Catapult CPLT-C1", MissionRole::FireSupport),
    ("Partisan Air Defense Tank", MissionRole::AntiAircraft),
];

/// The sample availability file.
///
/// Every model of a listed chassis gets `General:8`, except the C3 slave
/// Hunchback which only appears in 3050.
#[must_use]
pub fn sample_availability() -> AvailabilityData {
    let catalog = sample_catalog();
    let mut eras = Vec::new();
    for (year, era_index) in [(3025, 0), (3050, 1)] {
        let mut chassis = Vec::new();
        for &(name, unit_type, omni, codes_3025, codes_3050) in CHASSIS_CODES {
            let codes = if era_index == 0 { codes_3025 } else { codes_3050 };
            if codes.is_empty() {
                continue;
            }
            let models = catalog_models(&catalog, name)
                .into_iter()
                .filter(|model| year >= 3050 || model != "HBK-5S")
                .map(|model| {
                    let key = if model.is_empty() {
                        name.to_string()
                    } else {
                        format!("{name} {model}")
                    };
                    ModelAvailability {
                        roles: MODEL_ROLES
                            .iter()
                            .filter(|(k, _)| *k == key)
                            .map(|(_, r)| *r)
                            .collect(),
                        model,
                        codes: "General:8".to_string(),
                    }
                })
                .collect();
            chassis.push(ChassisAvailability {
                chassis: name.to_string(),
                unit_type,
                omni,
                codes: codes.to_string(),
                models,
            });
        }
        eras.push(EraData { year, chassis });
    }
    AvailabilityData { eras }
}

fn catalog_models(catalog: &InMemoryCatalog, chassis: &str) -> Vec<String> {
    use forcegen_core::catalog::UnitCatalog;
    catalog
        .all_units()
        .filter(|u| u.chassis == chassis)
        .map(|u| u.model.clone())
        .collect()
}

/// Everything the generator needs, built from the sample data.
#[must_use]
pub fn sample_data() -> GeneratorData {
    let availability = sample_availability();
    GeneratorData {
        availability: availability.to_rat_data(),
        factions: sample_factions(),
        records: UnitRecords::build(&sample_catalog(), &availability.role_assignments()),
        config: GeneratorConfig::default(),
    }
}

/// A generator over [`sample_data`].
#[must_use]
pub fn sample_generator() -> RatGenerator {
    RatGenerator::new(sample_data())
}
