//! Availability resolution and table generation against the sample data.
//!
//! The sample data set lives in `forcegen_test_utils::fixtures`.

use forcegen_core::availability::AvailabilityRating;
use forcegen_core::catalog::CatalogHandle;
use forcegen_core::mission_role::MissionRole;
use forcegen_core::parameters::Parameters;
use forcegen_core::rat_generator::{RatGenerator, RecordKind};
use forcegen_core::unit_kind::{UnitType, WeightClass};
use forcegen_core::weighting::{TableCandidate, TableEntry};
use forcegen_test_utils::fixtures::{sample_data, sample_generator};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn share(table: &[TableEntry], pred: impl Fn(&TableCandidate) -> bool) -> f64 {
    let total: u32 = table.iter().map(|e| e.weight).sum();
    let part: u32 = table.iter().filter(|e| pred(&e.candidate)).map(|e| e.weight).sum();
    f64::from(part) / f64::from(total)
}

fn is_chassis(chassis: &str) -> impl Fn(&TableCandidate) -> bool + '_ {
    move |c| c.unit().is_some_and(|m| m.chassis == chassis)
}

// ==========================================================================
// Availability Resolution
// ==========================================================================

#[test]
fn test_faction_record_wins_over_general() {
    let mut gen = sample_generator();
    let fs = gen.interpolated_availability(RecordKind::Chassis, "Locust[Mek]", "FS", 3025, None);
    let dc = gen.interpolated_availability(RecordKind::Chassis, "Locust[Mek]", "DC", 3025, None);
    assert_eq!(fs, Some(8.0));
    assert_eq!(dc, Some(7.0));
}

#[test]
fn test_interpolation_between_eras() {
    let mut gen = sample_generator();
    let av = gen
        .interpolated_availability(RecordKind::Chassis, "Locust[Mek]", "FS", 3030, None)
        .expect("both eras have records");
    // 8 in 3025, General 6 in 3050.
    assert!(approx(av, 7.6));
}

#[test]
fn test_multi_parent_merge_averages_weights() {
    let mut gen = sample_generator();
    let merged = gen
        .resolve(RecordKind::Chassis, 3025, "Jenner[Mek]", "MERC", 3025)
        .expect("parents have records");
    // FS falls back to General:5, DC declares 8.
    let expected = AvailabilityRating::calc_av_rating(
        (AvailabilityRating::calc_weight(5.0) + AvailabilityRating::calc_weight(8.0)) / 2.0,
    );
    assert!(approx(merged.availability(), expected));
    assert!(merged.availability() > 6.5);
}

#[test]
fn test_merge_waits_for_parent_start_year() {
    let mut data = sample_data();
    data.availability.insert(
        RecordKind::Chassis,
        AvailabilityRating::new("Jenner[Mek]", "DC", 3025, 8.0).with_start_year(3030),
    );
    let mut gen = RatGenerator::new(data);
    let early = gen
        .resolve(RecordKind::Chassis, 3025, "Jenner[Mek]", "MERC", 3027)
        .expect("FS record has started");
    assert!(approx(early.availability(), 5.0));
    let later = gen
        .resolve(RecordKind::Chassis, 3025, "Jenner[Mek]", "MERC", 3030)
        .expect("both parents have started");
    assert!(later.availability() > 6.5);
}

#[test]
fn test_unit_missing_from_first_era_ramps_in() {
    let mut gen = sample_generator();
    assert!(gen
        .resolve(RecordKind::Chassis, 3025, "Cyclops[Mek]", "FS", 3025)
        .is_none());
    let av = gen
        .interpolated_availability(RecordKind::Chassis, "Cyclops[Mek]", "FS", 3040, None)
        .expect("3050 record");
    assert!(approx(av, 4.0 * 15.0 / 25.0));
}

#[test]
fn test_unknown_unit_has_no_availability() {
    let mut gen = sample_generator();
    assert_eq!(
        gen.interpolated_availability(RecordKind::Chassis, "Mackie[Mek]", "FS", 3030, None),
        None
    );
}

// ==========================================================================
// Table Generation
// ==========================================================================

#[test]
fn test_table_weights_are_positive_and_bounded() {
    let mut gen = sample_generator();
    for faction in ["FS", "DC", "LA", "MERC", "CJF"] {
        let table = gen.generate_table(&Parameters::new(faction, UnitType::Mek, 3050));
        assert!(!table.is_empty(), "{faction} table is empty");
        assert!(table.iter().all(|e| e.weight >= 1 && e.weight <= 1000));
    }
}

#[test]
fn test_table_respects_intro_year_and_type() {
    let mut gen = sample_generator();
    let table = gen.generate_table(&Parameters::new("FS", UnitType::Mek, 3025));
    assert!(table
        .iter()
        .filter_map(|e| e.candidate.unit())
        .all(|m| m.unit_type == UnitType::Mek && m.intro_year <= 3025));
    assert!(!table.iter().any(|e| is_chassis("Timber Wolf")(&e.candidate)));
}

#[test]
fn test_salvage_row_follows_faction_data() {
    let mut gen = sample_generator();
    let fs = gen.generate_table(&Parameters::new("FS", UnitType::Mek, 3025));
    let salvage = share(&fs, |c| matches!(c, TableCandidate::Salvage(f) if f == "DC"));
    assert!(salvage > 0.05 && salvage < 0.15, "salvage share {salvage}");

    let dc = gen.generate_table(&Parameters::new("DC", UnitType::Mek, 3025));
    assert!(!dc
        .iter()
        .any(|e| matches!(e.candidate, TableCandidate::Salvage(_))));
}

#[test]
fn test_weight_distribution_shapes_table() {
    let mut gen = sample_generator();
    let params = Parameters::new("LA", UnitType::Mek, 3025)
        .with_weight_classes([WeightClass::Light, WeightClass::Heavy]);
    let table = gen.generate_table(&params);
    let light = share(&table, |c| c.unit().is_some_and(|m| m.weight_class == WeightClass::Light));
    let heavy = share(&table, |c| c.unit().is_some_and(|m| m.weight_class == WeightClass::Heavy));
    // Lyran distribution gives light 2 and heavy 4.
    let ratio = heavy / light;
    assert!(ratio > 1.7 && ratio < 2.3, "heavy/light ratio {ratio}");
}

#[test]
fn test_deploying_faction_shapes_supplier_table() {
    let mut gen = sample_generator();
    let classes = [WeightClass::Light, WeightClass::Heavy];
    let own = gen.generate_table(&Parameters::new("DC", UnitType::Mek, 3025).with_weight_classes(classes));
    let for_la = gen.generate_table(
        &Parameters::new("DC", UnitType::Mek, 3025)
            .with_weight_classes(classes)
            .with_deploying_faction("LA"),
    );
    let heavy = |t: &[TableEntry]| {
        share(t, |c| c.unit().is_some_and(|m| m.weight_class == WeightClass::Heavy))
    };
    assert!(heavy(&for_la) > heavy(&own));
}

#[test]
fn test_clan_tech_share_is_enforced() {
    let mut gen = sample_generator();
    let table = gen.generate_table(&Parameters::new("CJF", UnitType::Mek, 3050).with_rating("Keshik"));
    let clan = share(&table, |c| c.unit().is_some_and(|m| m.clan));
    assert!(clan >= 0.85, "clan share {clan}");

    let table = gen.generate_table(&Parameters::new("CJF", UnitType::Mek, 3050).with_rating("PGC"));
    let clan_low = share(&table, |c| c.unit().is_some_and(|m| m.clan));
    assert!(clan_low < clan);
}

#[test]
fn test_gating_role_drops_units_without_it() {
    let mut gen = sample_generator();
    let plain = gen.generate_table(&Parameters::new("FS", UnitType::Mek, 3025));
    assert!(!plain.is_empty());
    let incendiary = gen.generate_table(
        &Parameters::new("FS", UnitType::Mek, 3025).with_roles([MissionRole::Incendiary], 2),
    );
    assert!(incendiary.is_empty());
}

#[test]
fn test_excluded_role_removes_units() {
    let mut gen = sample_generator();
    let params = Parameters::new("FS", UnitType::Tank, 3025)
        .with_roles_excluded([MissionRole::AntiAircraft]);
    let table = gen.generate_table(&params);
    assert!(!table.is_empty());
    assert!(!table.iter().any(|e| is_chassis("Partisan Air Defense Tank")(&e.candidate)));
}

#[test]
fn test_generator_from_background_load() {
    let handle = CatalogHandle::spawn(|| Ok(sample_data())).expect("thread spawns");
    let mut gen = RatGenerator::from_handle(handle).expect("load succeeds");
    assert!(!gen.generate_table(&Parameters::new("FS", UnitType::Mek, 3025)).is_empty());
}
