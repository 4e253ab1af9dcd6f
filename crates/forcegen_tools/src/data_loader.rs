//! RON data loading.
//!
//! A data directory holds:
//!
//! | File                | Contents                         | Required |
//! |---------------------|----------------------------------|----------|
//! | `units.ron`         | `Vec<UnitSummary>`               | yes      |
//! | `factions.ron`      | `Vec<FactionRecord>`             | yes      |
//! | `availability.ron`  | `AvailabilityData`               | yes      |
//! | `config.ron`        | `GeneratorConfig`                | no       |
//! | `formations.ron`    | `Vec<FormationType>`             | no       |
//!
//! Formation templates from `formations.ron` are added to the standard
//! ones, replacing any with the same name.

use std::fs;
use std::path::{Path, PathBuf};

use forcegen_core::catalog::{CatalogHandle, InMemoryCatalog, UnitSummary};
use forcegen_core::config::GeneratorConfig;
use forcegen_core::data::AvailabilityData;
use forcegen_core::error::GenerationError;
use forcegen_core::factions::{FactionGraph, FactionRecord};
use forcegen_core::formation::{FormationRegistry, FormationType};
use forcegen_core::rat_generator::GeneratorData;
use forcegen_core::records::UnitRecords;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Catalog file name.
pub const UNITS_FILE: &str = "units.ron";
/// Faction file name.
pub const FACTIONS_FILE: &str = "factions.ron";
/// Availability file name.
pub const AVAILABILITY_FILE: &str = "availability.ron";
/// Optional configuration file name.
pub const CONFIG_FILE: &str = "config.ron";
/// Optional formation template file name.
pub const FORMATIONS_FILE: &str = "formations.ron";

/// Environment variable overriding the data directory search.
pub const DATA_DIR_ENV: &str = "FORCEGEN_DATA_DIR";

/// Errors raised while loading a data directory.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Failed to read a file.
    #[error("IO error reading '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a RON file.
    #[error("Parse error in '{path}': {source}")]
    Parse {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// The data directory does not exist.
    #[error("Data directory not found: {0}")]
    DirectoryNotFound(String),

    /// The files parsed but do not form a consistent data set.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Raw contents of a data directory.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    /// Unit catalog.
    pub units: Vec<UnitSummary>,
    /// Faction records.
    pub factions: Vec<FactionRecord>,
    /// Availability codes.
    pub availability: AvailabilityData,
    /// Tunable constants.
    pub config: GeneratorConfig,
    /// Extra formation templates.
    pub formations: Vec<FormationType>,
}

impl DataSet {
    /// Read every data file in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is missing or a file cannot be
    /// read or parsed.
    pub fn load(dir: &Path) -> Result<Self, DataLoadError> {
        if !dir.is_dir() {
            return Err(DataLoadError::DirectoryNotFound(dir.display().to_string()));
        }
        let data = Self {
            units: read_ron(&dir.join(UNITS_FILE))?,
            factions: read_ron(&dir.join(FACTIONS_FILE))?,
            availability: read_ron(&dir.join(AVAILABILITY_FILE))?,
            config: read_optional_ron(&dir.join(CONFIG_FILE))?.unwrap_or_default(),
            formations: read_optional_ron(&dir.join(FORMATIONS_FILE))?.unwrap_or_default(),
        };
        tracing::info!(
            "Loaded {} units, {} factions, {} eras from {}",
            data.units.len(),
            data.factions.len(),
            data.availability.eras.len(),
            dir.display()
        );
        Ok(data)
    }

    /// The unit catalog.
    #[must_use]
    pub fn catalog(&self) -> InMemoryCatalog {
        InMemoryCatalog::new(self.units.clone())
    }

    /// Build the generator's data.
    ///
    /// # Errors
    ///
    /// Returns an error if the faction graph is inconsistent.
    pub fn generator_data(&self) -> Result<GeneratorData, DataLoadError> {
        let factions = FactionGraph::from_records(self.factions.iter().cloned())?;
        Ok(GeneratorData {
            availability: self.availability.to_rat_data(),
            factions,
            records: UnitRecords::build(&self.catalog(), &self.availability.role_assignments()),
            config: self.config.clone(),
        })
    }

    /// Standard formation templates plus the data set's own.
    #[must_use]
    pub fn formation_registry(&self) -> FormationRegistry {
        let mut registry = FormationRegistry::standard();
        registry.extend(self.formations.iter().cloned());
        registry
    }
}

/// Start loading generator data from `dir` on a worker thread.
///
/// The returned handle yields the data, or the load error reported as
/// [`GenerationError::CatalogUnavailable`].
///
/// # Errors
///
/// Returns an error if the worker thread cannot be started.
pub fn spawn_load(dir: PathBuf) -> Result<CatalogHandle<GeneratorData>, DataLoadError> {
    let handle = CatalogHandle::spawn(move || {
        DataSet::load(&dir)
            .and_then(|data| data.generator_data())
            .map_err(|e| GenerationError::CatalogUnavailable(e.to_string()))
    })?;
    Ok(handle)
}

/// Resolve the default data directory.
///
/// Looks for the data files in standard locations:
/// 1. Environment variable `FORCEGEN_DATA_DIR`
/// 2. `./crates/forcegen_tools/assets/data/` (repo root)
/// 3. `./assets/data/` (running from forcegen_tools)
pub fn default_data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        let path = PathBuf::from(dir);
        if path.is_dir() {
            return Some(path);
        }
    }

    ["crates/forcegen_tools/assets/data", "assets/data"]
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_dir())
}

fn read_ron<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let text = fs::read_to_string(path).map_err(|source| DataLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    ron::from_str(&text).map_err(|source| DataLoadError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn read_optional_ron<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, DataLoadError> {
    if path.exists() {
        read_ron(path).map(Some)
    } else {
        tracing::debug!("{} not present, using defaults", path.display());
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/data")
    }

    #[test]
    fn test_bundled_data_loads() {
        let data = DataSet::load(&asset_dir()).expect("bundled data parses");
        assert!(!data.units.is_empty());
        assert!(!data.factions.is_empty());
        assert!(!data.availability.eras.is_empty());
        let generator_data = data.generator_data().expect("bundled factions are consistent");
        assert!(generator_data.records.model_count() > 0);
    }

    #[test]
    fn test_bundled_formations_extend_standard() {
        let data = DataSet::load(&asset_dir()).expect("bundled data parses");
        let registry = data.formation_registry();
        assert!(registry.get("Battle").is_some());
        for formation in &data.formations {
            assert!(registry.get(&formation.name).is_some());
        }
    }

    #[test]
    fn test_missing_directory() {
        let result = DataSet::load(Path::new("does/not/exist"));
        assert!(matches!(result, Err(DataLoadError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_background_load() {
        let handle = spawn_load(asset_dir()).expect("thread spawns");
        let data = handle.wait().expect("bundled data loads");
        assert!(!data.factions.is_empty());
    }

    #[test]
    fn test_background_load_reports_failure() {
        let handle = spawn_load(PathBuf::from("does/not/exist")).expect("thread spawns");
        assert!(matches!(
            handle.wait(),
            Err(GenerationError::CatalogUnavailable(_))
        ));
    }
}
