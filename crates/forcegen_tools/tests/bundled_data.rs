//! End to end runs over the bundled data set.

use std::path::PathBuf;

use forcegen_core::force::{ForceDescriptor, ForceTreeBuilder};
use forcegen_core::parameters::Parameters;
use forcegen_core::rat_generator::RatGenerator;
use forcegen_core::unit_kind::UnitType;
use forcegen_test_utils::fixtures::seeded_rng;
use forcegen_tools::data_loader::DataSet;
use forcegen_tools::report::TableReport;
use forcegen_tools::validate::validate_data_directory;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/data")
}

fn load_descriptor(name: &str) -> ForceDescriptor {
    let path = data_dir().join("forces").join(name);
    let text = std::fs::read_to_string(path).expect("descriptor exists");
    ForceDescriptor::from_ron_str(&text).expect("descriptor parses")
}

#[test]
fn test_bundled_data_validates_cleanly() {
    let report = validate_data_directory(&data_dir()).expect("bundled data loads");
    assert!(report.is_valid(), "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn test_tables_for_every_faction() {
    let data = DataSet::load(&data_dir()).expect("bundled data loads");
    let mut generator = RatGenerator::new(data.generator_data().expect("consistent"));
    for faction in ["FS", "DC", "CC", "LA", "MERC", "CJF", "CW"] {
        let query = Parameters::new(faction, UnitType::Mek, 3050);
        let table = generator.generate_table(&query);
        assert!(!table.is_empty(), "{faction} has no Meks in 3050");
        let report = TableReport::new(query, &table);
        assert!(report.rows.iter().all(|r| (1..=1000).contains(&r.weight)));
    }
}

#[test]
fn test_clan_units_stay_with_the_clans() {
    let data = DataSet::load(&data_dir()).expect("bundled data loads");
    let mut generator = RatGenerator::new(data.generator_data().expect("consistent"));
    let table = generator.generate_table(&Parameters::new("FS", UnitType::Mek, 3050));
    assert!(table
        .iter()
        .all(|e| e.candidate.label() != "Timber Wolf Prime"));
}

#[test]
fn test_company_descriptor_generates() {
    let data = DataSet::load(&data_dir()).expect("bundled data loads");
    let registry = data.formation_registry();
    let mut generator = RatGenerator::new(data.generator_data().expect("consistent"));
    let descriptor = load_descriptor("fs_company.ron");
    let force = ForceTreeBuilder::new(&mut generator, &registry)
        .build(&descriptor, &mut seeded_rng(3))
        .expect("complete descriptor");
    assert_eq!(force.subforces.len(), 3);
    assert_eq!(force.unit_count(), 12);
    let json = serde_json::to_string(&force).expect("serializable");
    assert!(json.contains("Command Lance"));
}

#[test]
fn test_same_seed_same_force() {
    let data = DataSet::load(&data_dir()).expect("bundled data loads");
    let registry = data.formation_registry();
    let descriptor = load_descriptor("cjf_trinary.ron");
    let run = || {
        let mut generator = RatGenerator::new(data.generator_data().expect("consistent"));
        ForceTreeBuilder::new(&mut generator, &registry)
            .build(&descriptor, &mut seeded_rng(9))
            .expect("complete descriptor")
    };
    let first = run();
    assert_eq!(first.unit_count(), 15);
    assert_eq!(first, run());
}
