//! The unit catalog interface and the start-up readiness barrier.
//!
//! The catalog of unit statistics is owned by the caller. The core only
//! needs to enumerate [`UnitSummary`] entries once, when the chassis and
//! model records are built, and never reads it during a generation run.
//!
//! Loading the catalog is slow, so callers usually do it on a worker
//! thread. [`CatalogHandle`] carries the result across: generation code
//! calls [`CatalogHandle::wait`] once and blocks until the loader reports
//! back.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};
use crate::unit_kind::{CombatRole, MovementMode, UnitType, WeightClass};

/// Technology base of a design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TechBase {
    /// Inner Sphere.
    #[default]
    InnerSphere,
    /// Clan.
    Clan,
    /// Mixed Inner Sphere and Clan.
    Mixed,
}

/// One mounted item of equipment.
///
/// Tags carry what the metric calculation needs to know:
/// `flak`, `ammo`, `incendiary`, `anti_personnel`, `advanced` and the
/// network tags understood by [`crate::unit_kind::NetworkMask::from_tags`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EquipmentSummary {
    /// Equipment name.
    pub name: String,
    /// Battle value contributed by this item (0 for non-weapons).
    #[serde(default)]
    pub battle_value: f64,
    /// Maximum range in hexes (0 for non-weapons).
    #[serde(default)]
    pub max_range: u32,
    /// Classification tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EquipmentSummary {
    /// Check if this item has the specified tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Catalog entry for one unit design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSummary {
    /// Chassis name (e.g. "Atlas").
    pub chassis: String,
    /// Model designation (e.g. "AS7-D"); may be empty.
    #[serde(default)]
    pub model: String,
    /// Unit family.
    pub unit_type: UnitType,
    /// Weight class.
    pub weight_class: WeightClass,
    /// Tonnage.
    #[serde(default)]
    pub tonnage: u32,
    /// Motive type.
    pub movement_mode: MovementMode,
    /// Introduction year.
    pub year: i32,
    /// Tech base.
    #[serde(default)]
    pub tech_base: TechBase,
    /// OmniMek/OmniFighter/OmniVehicle.
    #[serde(default)]
    pub omni: bool,
    /// Walking (cruising/safe thrust) MP.
    #[serde(default)]
    pub walk_mp: u8,
    /// Jumping MP.
    #[serde(default)]
    pub jump_mp: u8,
    /// Armor points.
    #[serde(default)]
    pub armor: u32,
    /// Battlefield role.
    #[serde(default)]
    pub combat_role: CombatRole,
    /// Mounted equipment.
    #[serde(default)]
    pub equipment: Vec<EquipmentSummary>,
}

impl UnitSummary {
    /// Unique catalog key: chassis and model joined by a space.
    #[must_use]
    pub fn key(&self) -> String {
        if self.model.is_empty() {
            self.chassis.clone()
        } else {
            format!("{} {}", self.chassis, self.model)
        }
    }
}

/// Read access to the unit catalog.
pub trait UnitCatalog {
    /// Enumerate every unit in the catalog.
    fn all_units(&self) -> Box<dyn Iterator<Item = &UnitSummary> + '_>;

    /// Look up a unit by its [`UnitSummary::key`].
    fn by_key(&self, key: &str) -> Option<&UnitSummary>;
}

/// Catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    units: Vec<UnitSummary>,
    index: HashMap<String, usize>,
}

impl InMemoryCatalog {
    /// Build a catalog. Later duplicates of a key replace earlier ones.
    #[must_use]
    pub fn new(units: Vec<UnitSummary>) -> Self {
        let mut catalog = Self::default();
        for unit in units {
            catalog.insert(unit);
        }
        catalog
    }

    /// Add or replace a unit.
    pub fn insert(&mut self, unit: UnitSummary) {
        let key = unit.key();
        if let Some(&i) = self.index.get(&key) {
            tracing::warn!("Duplicate catalog entry '{key}', keeping the later one");
            self.units[i] = unit;
        } else {
            self.index.insert(key, self.units.len());
            self.units.push(unit);
        }
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl UnitCatalog for InMemoryCatalog {
    fn all_units(&self) -> Box<dyn Iterator<Item = &UnitSummary> + '_> {
        Box::new(self.units.iter())
    }

    fn by_key(&self, key: &str) -> Option<&UnitSummary> {
        self.index.get(key).map(|&i| &self.units[i])
    }
}

enum HandleState<T> {
    Ready(Arc<T>),
    Pending(mpsc::Receiver<Result<T>>),
}

/// Data that is either loaded or being loaded on a worker thread.
///
/// # Example
///
/// ```
/// use forcegen_core::catalog::CatalogHandle;
///
/// let handle = CatalogHandle::spawn(|| Ok(vec![1, 2, 3])).expect("thread spawned");
/// let data = handle.wait().expect("loaded");
/// assert_eq!(data.len(), 3);
/// ```
pub struct CatalogHandle<T> {
    state: HandleState<T>,
}

impl<T: Send + Sync + 'static> CatalogHandle<T> {
    /// Wrap data that is already loaded.
    #[must_use]
    pub fn ready(data: T) -> Self {
        Self {
            state: HandleState::Ready(Arc::new(data)),
        }
    }

    /// Run `load` on a named worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be started.
    pub fn spawn<F>(load: F) -> Result<Self>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        std::thread::Builder::new()
            .name("catalog-loader".to_string())
            .spawn(move || {
                let result = load();
                if let Err(e) = &result {
                    tracing::error!("Catalog load failed: {e}");
                }
                // The receiver may already be gone if the caller gave up.
                let _ = tx.send(result);
            })
            .map_err(|e| GenerationError::CatalogUnavailable(e.to_string()))?;
        tracing::debug!("Catalog loading started in the background");
        Ok(Self {
            state: HandleState::Pending(rx),
        })
    }

    /// Whether the data is already available without blocking.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, HandleState::Ready(_))
    }

    /// Block until the data is loaded.
    ///
    /// # Errors
    ///
    /// Returns the loader's error, or [`GenerationError::CatalogUnavailable`]
    /// if the loader thread died without reporting.
    pub fn wait(self) -> Result<Arc<T>> {
        match self.state {
            HandleState::Ready(data) => Ok(data),
            HandleState::Pending(rx) => match rx.recv() {
                Ok(result) => result.map(Arc::new),
                Err(_) => Err(GenerationError::CatalogUnavailable(
                    "loader thread exited without a result".to_string(),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(chassis: &str, model: &str) -> UnitSummary {
        UnitSummary {
            chassis: chassis.to_string(),
            model: model.to_string(),
            unit_type: UnitType::Mek,
            weight_class: WeightClass::Medium,
            tonnage: 50,
            movement_mode: MovementMode::Biped,
            year: 3000,
            tech_base: TechBase::InnerSphere,
            omni: false,
            walk_mp: 5,
            jump_mp: 0,
            armor: 100,
            combat_role: CombatRole::Skirmisher,
            equipment: Vec::new(),
        }
    }

    #[test]
    fn test_catalog_lookup_by_key() {
        let catalog = InMemoryCatalog::new(vec![unit("Enforcer", "ENF-4R"), unit("Vulcan", "")]);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.by_key("Enforcer ENF-4R").is_some());
        assert!(catalog.by_key("Vulcan").is_some());
        assert!(catalog.by_key("Enforcer").is_none());
        assert_eq!(catalog.all_units().count(), 2);
    }

    #[test]
    fn test_duplicate_key_replaces() {
        let mut second = unit("Enforcer", "ENF-4R");
        second.year = 3050;
        let catalog = InMemoryCatalog::new(vec![unit("Enforcer", "ENF-4R"), second]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.by_key("Enforcer ENF-4R").map(|u| u.year), Some(3050));
    }

    #[test]
    fn test_handle_waits_for_background_load() {
        let handle = CatalogHandle::spawn(|| Ok(InMemoryCatalog::new(vec![unit("Wasp", "WSP-1A")])))
            .expect("spawn");
        let catalog = handle.wait().expect("load");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_handle_propagates_loader_error() {
        let handle: CatalogHandle<InMemoryCatalog> =
            CatalogHandle::spawn(|| Err(GenerationError::CatalogUnavailable("disk".to_string())))
                .expect("spawn");
        assert!(matches!(
            handle.wait(),
            Err(GenerationError::CatalogUnavailable(_))
        ));
    }

    #[test]
    fn test_ready_handle() {
        let handle = CatalogHandle::ready(InMemoryCatalog::default());
        assert!(handle.is_ready());
        assert!(handle.wait().expect("ready").is_empty());
    }
}
