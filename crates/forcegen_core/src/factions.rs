//! Faction records and the faction inheritance graph.
//!
//! Factions form a directed acyclic graph through their parent lists. Any
//! per-faction datum that a faction leaves undeclared (rating levels, tech
//! mix targets, salvage, weight distributions) is inherited from the first
//! parent that declares it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};
use crate::unit_kind::UnitType;

/// Technology category with a faction-level percentage target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TechCategory {
    /// OmniMeks.
    Omni,
    /// Omni aerospace fighters.
    OmniAero,
    /// Clan-tech Meks.
    Clan,
    /// Clan-tech aerospace units.
    ClanAero,
    /// Clan-tech vehicles.
    ClanVee,
    /// Inner Sphere advanced (Star League level) Meks.
    IsAdvanced,
    /// Inner Sphere advanced aerospace units.
    IsAdvancedAero,
    /// Inner Sphere advanced vehicles.
    IsAdvancedVee,
}

impl TechCategory {
    /// Categories that govern tables of the given unit type, as
    /// `(omni, clan, advanced)`.
    #[must_use]
    pub const fn for_unit_type(unit_type: UnitType) -> (Option<Self>, Option<Self>, Option<Self>) {
        match unit_type {
            UnitType::Mek => (Some(Self::Omni), Some(Self::Clan), Some(Self::IsAdvanced)),
            UnitType::AeroSpaceFighter | UnitType::ConvFighter => (
                Some(Self::OmniAero),
                Some(Self::ClanAero),
                Some(Self::IsAdvancedAero),
            ),
            UnitType::Tank | UnitType::Vtol | UnitType::Naval => {
                (None, Some(Self::ClanVee), Some(Self::IsAdvancedVee))
            }
            _ => (None, None, None),
        }
    }
}

/// Inclusive range of active years; open ends are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct YearRange {
    /// First active year.
    #[serde(default)]
    pub start: Option<i32>,
    /// Last active year.
    #[serde(default)]
    pub end: Option<i32>,
}

impl YearRange {
    /// Whether `year` falls in the range.
    #[must_use]
    pub fn contains(&self, year: i32) -> bool {
        self.start.map_or(true, |s| year >= s) && self.end.map_or(true, |e| year <= e)
    }
}

/// Tech mix targets and correction margins declared for one era.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EraTechMix {
    /// Target percentage per category, one value per rating level (low to high).
    #[serde(default)]
    pub targets: BTreeMap<TechCategory, Vec<i32>>,
    /// Tolerance around the omni target.
    #[serde(default)]
    pub omni_margin: i32,
    /// Tolerance around the Clan target.
    #[serde(default)]
    pub tech_margin: i32,
    /// Tolerance around the Star League upgrade target.
    #[serde(default)]
    pub upgrade_margin: i32,
}

/// Salvage declared for one era.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SalvageSources {
    /// Share of the table made up of salvaged units, 0-100.
    pub pct: i32,
    /// Relative share of each source faction.
    #[serde(default)]
    pub sources: BTreeMap<String, i32>,
}

/// Faction metadata.
///
/// Era-keyed data is looked up by floor: a value declared for 3025 applies
/// until a later era overrides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FactionRecord {
    /// Unique key (e.g. "FS", "CJF").
    pub key: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Alternate display names by first year of use.
    #[serde(default)]
    pub alt_names: BTreeMap<i32, String>,
    /// Minor faction.
    #[serde(default)]
    pub minor: bool,
    /// Clan faction.
    #[serde(default)]
    pub clan: bool,
    /// Periphery faction.
    #[serde(default)]
    pub periphery: bool,
    /// Parents, in inheritance order.
    #[serde(default)]
    pub parent_factions: Vec<String>,
    /// Equipment rating levels, lowest first.
    #[serde(default)]
    pub rating_levels: Vec<String>,
    /// Years the faction exists.
    #[serde(default)]
    pub active_years: Vec<YearRange>,
    /// Tech mix targets by era.
    #[serde(default)]
    pub tech_mix: BTreeMap<i32, EraTechMix>,
    /// Salvage by era.
    #[serde(default)]
    pub salvage: BTreeMap<i32, SalvageSources>,
    /// Weight class distribution by era and unit type, indexed by
    /// [`crate::unit_kind::WeightClass::index`].
    #[serde(default)]
    pub weight_distribution: BTreeMap<i32, BTreeMap<UnitType, Vec<i32>>>,
}

impl FactionRecord {
    /// Create a record with only a key and name.
    #[must_use]
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether the faction is active in `year`. Factions without declared
    /// ranges are always active.
    #[must_use]
    pub fn is_active_in_year(&self, year: i32) -> bool {
        self.active_years.is_empty() || self.active_years.iter().any(|r| r.contains(year))
    }

    /// Display name in effect for `year`.
    #[must_use]
    pub fn name_in_year(&self, year: i32) -> &str {
        self.alt_names
            .range(..=year)
            .next_back()
            .map_or(self.name.as_str(), |(_, n)| n.as_str())
    }

    fn tech_mix_for(&self, era: i32) -> Option<&EraTechMix> {
        self.tech_mix.range(..=era).next_back().map(|(_, m)| m)
    }

    fn own_pct_tech(&self, category: TechCategory, era: i32, rating_index: usize) -> Option<f64> {
        let values = self
            .tech_mix
            .range(..=era)
            .rev()
            .find_map(|(_, m)| m.targets.get(&category))?;
        let value = values.get(rating_index).or_else(|| values.last())?;
        Some(f64::from(*value))
    }

    fn own_salvage(&self, era: i32) -> Option<&SalvageSources> {
        self.salvage.range(..=era).next_back().map(|(_, s)| s)
    }

    fn own_weight_distribution(&self, era: i32, unit_type: UnitType) -> Option<&[i32]> {
        self.weight_distribution
            .range(..=era)
            .rev()
            .find_map(|(_, d)| d.get(&unit_type))
            .map(Vec::as_slice)
    }
}

/// Immutable faction graph keyed by faction key.
///
/// Built once at load time; every query walks parents by key without
/// mutating anything.
#[derive(Debug, Clone, Default)]
pub struct FactionGraph {
    factions: BTreeMap<String, FactionRecord>,
}

impl FactionGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from records, validating keys and parent references.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate keys or when [`FactionGraph::validate`]
    /// reports problems.
    pub fn from_records(records: impl IntoIterator<Item = FactionRecord>) -> Result<Self> {
        let mut graph = Self::new();
        for record in records {
            graph.insert(record)?;
        }
        let errors = graph.validate();
        if !errors.is_empty() {
            return Err(GenerationError::InvalidFactionData(errors));
        }
        Ok(graph)
    }

    /// Add a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is already present.
    pub fn insert(&mut self, record: FactionRecord) -> Result<()> {
        if self.factions.contains_key(&record.key) {
            return Err(GenerationError::DuplicateFaction(record.key));
        }
        self.factions.insert(record.key.clone(), record);
        Ok(())
    }

    /// Get a faction by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FactionRecord> {
        self.factions.get(key)
    }

    /// Whether a faction is known.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.factions.contains_key(key)
    }

    /// All faction records in key order.
    pub fn iter(&self) -> impl Iterator<Item = &FactionRecord> {
        self.factions.values()
    }

    /// Number of factions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factions.len()
    }

    /// Whether the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    /// Check the graph for dangling parents and inheritance cycles.
    ///
    /// Returns every problem found.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for faction in self.factions.values() {
            for parent in &faction.parent_factions {
                if !self.factions.contains_key(parent) {
                    errors.push(format!(
                        "Faction '{}' has unknown parent '{}'",
                        faction.key, parent
                    ));
                }
            }
            for (era, salvage) in &faction.salvage {
                if !(0..100).contains(&salvage.pct) {
                    errors.push(format!(
                        "Faction '{}' declares {}% salvage in {}",
                        faction.key, salvage.pct, era
                    ));
                }
            }
        }

        for key in self.factions.keys() {
            if self.reaches(key, key, &mut BTreeSet::new()) {
                errors.push(format!("Faction '{key}' inherits from itself"));
            }
        }

        errors
    }

    fn reaches<'a>(&'a self, from: &'a str, target: &str, seen: &mut BTreeSet<&'a str>) -> bool {
        let Some(faction) = self.factions.get(from) else {
            return false;
        };
        for parent in &faction.parent_factions {
            if parent == target {
                return true;
            }
            if seen.insert(parent.as_str()) && self.reaches(parent, target, seen) {
                return true;
            }
        }
        false
    }

    /// Parents of a faction, empty for unknown keys.
    #[must_use]
    pub fn parents(&self, key: &str) -> &[String] {
        self.factions
            .get(key)
            .map_or(&[][..], |f| f.parent_factions.as_slice())
    }

    /// The rating level system used by a faction.
    ///
    /// A faction with fewer than two levels inherits the system of the first
    /// parent (searched depth first, in order) that has one. An empty slice
    /// means ratings are not supported for this faction.
    #[must_use]
    pub fn rating_level_system(&self, key: &str) -> &[String] {
        self.find_inherited(key, &mut BTreeSet::new(), &|f| {
            (f.rating_levels.len() >= 2).then_some(f.rating_levels.as_slice())
        })
        .unwrap_or(&[])
    }

    /// Index of `rating` in the faction's rating system.
    ///
    /// Unknown ratings resolve to the middle level; factions without a
    /// rating system yield `None`.
    #[must_use]
    pub fn rating_index(&self, key: &str, rating: Option<&str>) -> Option<usize> {
        let levels = self.rating_level_system(key);
        if levels.len() < 2 {
            return None;
        }
        rating
            .and_then(|r| levels.iter().position(|l| l == r))
            .or(Some(levels.len() / 2))
    }

    /// Tech target for a category, inherited from parents when undeclared.
    #[must_use]
    pub fn pct_tech(
        &self,
        key: &str,
        category: TechCategory,
        era: i32,
        rating_index: usize,
    ) -> Option<f64> {
        self.find_inherited(key, &mut BTreeSet::new(), &|f| {
            f.own_pct_tech(category, era, rating_index)
        })
    }

    /// Margins `(omni, tech, upgrade)` in effect for an era.
    #[must_use]
    pub fn tech_margins(&self, key: &str, era: i32) -> (f64, f64, f64) {
        self.find_inherited(key, &mut BTreeSet::new(), &|f| {
            f.tech_mix_for(era).map(|m| {
                (
                    f64::from(m.omni_margin),
                    f64::from(m.tech_margin),
                    f64::from(m.upgrade_margin),
                )
            })
        })
        .unwrap_or((0.0, 0.0, 0.0))
    }

    /// Salvage declared for an era, inherited from parents when undeclared.
    #[must_use]
    pub fn salvage(&self, key: &str, era: i32) -> Option<&SalvageSources> {
        self.find_inherited(key, &mut BTreeSet::new(), &|f| f.own_salvage(era))
    }

    /// Weight class distribution for an era and unit type.
    #[must_use]
    pub fn weight_distribution(&self, key: &str, era: i32, unit_type: UnitType) -> Option<&[i32]> {
        self.find_inherited(key, &mut BTreeSet::new(), &|f| {
            f.own_weight_distribution(era, unit_type)
        })
    }

    fn find_inherited<'a, T>(
        &'a self,
        key: &str,
        seen: &mut BTreeSet<&'a str>,
        pick: &dyn Fn(&'a FactionRecord) -> Option<T>,
    ) -> Option<T> {
        let faction = self.factions.get(key)?;
        if !seen.insert(faction.key.as_str()) {
            return None;
        }
        if let Some(found) = pick(faction) {
            return Some(found);
        }
        faction
            .parent_factions
            .iter()
            .find_map(|parent| self.find_inherited(parent, seen, pick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn graph() -> FactionGraph {
        let mut is = FactionRecord::new("IS", "Inner Sphere");
        is.rating_levels = levels(&["F", "D", "C", "B", "A"]);
        is.tech_mix.insert(
            3025,
            EraTechMix {
                targets: BTreeMap::from([(TechCategory::IsAdvanced, vec![0, 2, 4, 6, 8])]),
                upgrade_margin: 2,
                ..EraTechMix::default()
            },
        );

        let mut fs = FactionRecord::new("FS", "Federated Suns");
        fs.parent_factions = vec!["IS".to_string()];
        fs.active_years = vec![YearRange {
            start: Some(2317),
            end: Some(3057),
        }];
        fs.alt_names.insert(3040, "Federated Commonwealth".to_string());

        let mut merc = FactionRecord::new("MERC", "Mercenary");
        merc.parent_factions = vec!["FS".to_string(), "IS".to_string()];
        merc.salvage.insert(
            3025,
            SalvageSources {
                pct: 10,
                sources: BTreeMap::from([("FS".to_string(), 1)]),
            },
        );

        FactionGraph::from_records([is, fs, merc]).expect("valid graph")
    }

    #[test]
    fn test_single_parent_inherits_rating_levels() {
        let g = graph();
        assert!(g.get("FS").expect("FS").rating_levels.is_empty());
        assert_eq!(g.rating_level_system("FS"), g.rating_level_system("IS"));
        assert_eq!(g.rating_level_system("FS").len(), 5);
        assert!(g.rating_level_system("nobody").is_empty());
    }

    #[test]
    fn test_rating_index_defaults_to_middle() {
        let g = graph();
        assert_eq!(g.rating_index("FS", Some("A")), Some(4));
        assert_eq!(g.rating_index("FS", Some("Z")), Some(2));
        assert_eq!(g.rating_index("FS", None), Some(2));
        assert_eq!(g.rating_index("nobody", Some("A")), None);
    }

    #[test]
    fn test_active_years_and_names() {
        let g = graph();
        let fs = g.get("FS").expect("FS");
        assert!(fs.is_active_in_year(3025));
        assert!(!fs.is_active_in_year(3060));
        assert_eq!(fs.name_in_year(3025), "Federated Suns");
        assert_eq!(fs.name_in_year(3050), "Federated Commonwealth");
        assert!(g.get("IS").expect("IS").is_active_in_year(1));
    }

    #[test]
    fn test_tech_targets_inherit_and_floor_by_era() {
        let g = graph();
        assert_eq!(g.pct_tech("FS", TechCategory::IsAdvanced, 3050, 4), Some(8.0));
        // Short value lists fall back to their last entry.
        assert_eq!(g.pct_tech("FS", TechCategory::IsAdvanced, 3050, 9), Some(8.0));
        assert_eq!(g.pct_tech("FS", TechCategory::IsAdvanced, 3000, 4), None);
        assert_eq!(g.pct_tech("FS", TechCategory::Clan, 3050, 4), None);
        assert_eq!(g.tech_margins("FS", 3030), (0.0, 0.0, 2.0));
    }

    #[test]
    fn test_salvage_lookup() {
        let g = graph();
        assert_eq!(g.salvage("MERC", 3030).map(|s| s.pct), Some(10));
        assert!(g.salvage("MERC", 3000).is_none());
        assert!(g.salvage("FS", 3030).is_none());
    }

    #[test]
    fn test_validate_reports_dangling_parent_and_cycles() {
        let mut a = FactionRecord::new("A", "A");
        a.parent_factions = vec!["B".to_string()];
        let mut b = FactionRecord::new("B", "B");
        b.parent_factions = vec!["A".to_string(), "Ghost".to_string()];

        let err = FactionGraph::from_records([a, b]).expect_err("invalid graph");
        let GenerationError::InvalidFactionData(errors) = err else {
            panic!("unexpected error kind");
        };
        assert!(errors.iter().any(|e| e.contains("Ghost")));
        assert!(errors.iter().any(|e| e.contains("inherits from itself")));
    }

    #[test]
    fn test_duplicate_faction_rejected() {
        let mut g = FactionGraph::new();
        g.insert(FactionRecord::new("FS", "x")).expect("first insert");
        assert!(matches!(
            g.insert(FactionRecord::new("FS", "y")),
            Err(GenerationError::DuplicateFaction(_))
        ));
    }
}
