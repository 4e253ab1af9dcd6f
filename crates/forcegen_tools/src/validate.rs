//! Data validation utilities.
//!
//! Validation reports every problem at once instead of stopping at the
//! first, so a data author can fix a whole file in one pass.

use std::collections::BTreeSet;
use std::path::Path;

use forcegen_core::availability::{AvailabilityRating, GENERAL_FACTION};
use forcegen_core::catalog::UnitCatalog;
use forcegen_core::factions::FactionGraph;
use forcegen_core::formation::combinations::MAX_CONSTRAINTS;
use forcegen_core::formation::Constraint;
use forcegen_core::records::chassis_key;

use crate::data_loader::{DataLoadError, DataSet};

/// Problems found in a data set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that make the data unusable.
    pub errors: Vec<String>,
    /// Suspicious entries the generator tolerates.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate all RON data files in a directory.
///
/// # Errors
///
/// Returns an error if a data file cannot be read or parsed.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport, DataLoadError> {
    let data = DataSet::load(path)?;
    Ok(validate_data_set(&data))
}

/// Validate a loaded data set.
#[must_use]
pub fn validate_data_set(data: &DataSet) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut unit_keys = BTreeSet::new();
    for unit in &data.units {
        if !unit_keys.insert(unit.key()) {
            report
                .errors
                .push(format!("Unit '{}' is listed more than once", unit.key()));
        }
    }

    let mut graph = FactionGraph::new();
    for faction in &data.factions {
        if let Err(e) = graph.insert(faction.clone()) {
            report.errors.push(e.to_string());
        }
    }
    report.errors.extend(graph.validate());

    let catalog = data.catalog();
    report.errors.extend(data.availability.validate(&catalog));

    let chassis_keys: BTreeSet<String> = catalog
        .all_units()
        .map(|u| chassis_key(&u.chassis, u.unit_type, u.omni))
        .collect();
    let mut unknown_factions = BTreeSet::new();
    for era in &data.availability.eras {
        for chassis in &era.chassis {
            let key = chassis.key();
            if !chassis_keys.contains(&key) {
                report
                    .warnings
                    .push(format!("Era {} lists chassis '{key}' with no catalog units", era.year));
            }
            let codes = std::iter::once(chassis.codes.as_str())
                .chain(chassis.models.iter().map(|m| m.codes.as_str()));
            for code in codes {
                for rating in AvailabilityRating::parse_list(&key, era.year, code) {
                    let faction = rating.faction();
                    if faction != GENERAL_FACTION && !graph.contains(faction) {
                        unknown_factions.insert(faction.to_string());
                    }
                }
            }
        }
    }
    report.warnings.extend(
        unknown_factions
            .into_iter()
            .map(|f| format!("Availability codes name unknown faction '{f}'")),
    );

    for formation in &data.formations {
        let numeric = formation.numeric_constraints().count();
        if numeric > MAX_CONSTRAINTS {
            report.errors.push(format!(
                "Formation '{}' has {numeric} counting constraints, at most {MAX_CONSTRAINTS} allowed",
                formation.name
            ));
        }
        for constraint in &formation.constraints {
            match constraint {
                Constraint::Percent { min_fraction, .. } if !(0.0..=1.0).contains(min_fraction) => {
                    report.errors.push(format!(
                        "Formation '{}' requires a share of {min_fraction}",
                        formation.name
                    ));
                }
                Constraint::Grouping(g) if g.group_size == 0 => {
                    report
                        .errors
                        .push(format!("Formation '{}' has groups of zero units", formation.name));
                }
                _ => {}
            }
        }
    }

    report
}
