//! Availability resolution and random assignment table generation.
//!
//! [`RatGenerator`] owns the loaded data and two caches: resolved
//! availability records, keyed by era, unit, faction and year, and finished
//! tables, keyed by [`Parameters`]. The data itself is never mutated once
//! generation starts.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use crate::availability::{AvailabilityRating, GENERAL_FACTION};
use crate::catalog::CatalogHandle;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::factions::{FactionGraph, TechCategory};
use crate::mission_role::adjust_availability_by_role;
use crate::parameters::Parameters;
use crate::records::{ModelRecord, UnitRecords};
use crate::weighting::{self, TableCandidate, TableEntry, Weighted};

/// Which kind of record an availability code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    /// Chassis-level availability.
    Chassis,
    /// Model-level availability within a chassis.
    Model,
}

type RatingsByFaction = BTreeMap<String, AvailabilityRating>;

/// Availability records for every era.
#[derive(Debug, Clone, Default)]
pub struct RatData {
    eras: BTreeSet<i32>,
    records: BTreeMap<(RecordKind, i32, String), RatingsByFaction>,
}

impl RatData {
    /// Create empty data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an era, even if it has no records.
    pub fn add_era(&mut self, era: i32) {
        self.eras.insert(era);
    }

    /// Add a record, replacing any previous one for the same faction.
    pub fn insert(&mut self, kind: RecordKind, rating: AvailabilityRating) {
        self.eras.insert(rating.era());
        self.records
            .entry((kind, rating.era(), rating.unit_key().to_string()))
            .or_default()
            .insert(rating.faction().to_string(), rating);
    }

    /// Record stored directly for a faction.
    #[must_use]
    pub fn rating(
        &self,
        kind: RecordKind,
        era: i32,
        unit_key: &str,
        faction: &str,
    ) -> Option<&AvailabilityRating> {
        self.records
            .get(&(kind, era, unit_key.to_string()))
            .and_then(|by_faction| by_faction.get(faction))
    }

    /// All eras, ascending.
    pub fn eras(&self) -> impl Iterator<Item = i32> + '_ {
        self.eras.iter().copied()
    }

    /// The era in effect for `year` and the one after it.
    ///
    /// `None` before the first era.
    #[must_use]
    pub fn era_bracket(&self, year: i32) -> Option<(i32, Option<i32>)> {
        let era = self.eras.range(..=year).next_back().copied()?;
        let next = self
            .eras
            .range((Bound::Excluded(year), Bound::Unbounded))
            .next()
            .copied();
        Some((era, next))
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Everything the generator reads.
#[derive(Debug, Clone, Default)]
pub struct GeneratorData {
    /// Availability records.
    pub availability: RatData,
    /// Faction graph.
    pub factions: FactionGraph,
    /// Chassis and model records.
    pub records: UnitRecords,
    /// Tunable constants.
    pub config: GeneratorConfig,
}

type ResolveKey = (RecordKind, i32, String, String, i32);

/// Builds weighted unit tables.
#[derive(Debug)]
pub struct RatGenerator {
    data: Arc<GeneratorData>,
    resolved: HashMap<ResolveKey, Option<AvailabilityRating>>,
    tables: HashMap<Parameters, Arc<[TableEntry]>>,
}

impl RatGenerator {
    /// Create a generator over loaded data.
    #[must_use]
    pub fn new(data: GeneratorData) -> Self {
        Self::from_shared(Arc::new(data))
    }

    /// Create a generator sharing already loaded data.
    #[must_use]
    pub fn from_shared(data: Arc<GeneratorData>) -> Self {
        tracing::info!(
            "Generator ready: {} factions, {} models, {} availability records",
            data.factions.len(),
            data.records.model_count(),
            data.availability.len()
        );
        Self {
            data,
            resolved: HashMap::new(),
            tables: HashMap::new(),
        }
    }

    /// Wait for a background load to finish, then create a generator.
    ///
    /// # Errors
    ///
    /// Returns the loader's error if loading failed.
    pub fn from_handle(handle: CatalogHandle<GeneratorData>) -> Result<Self> {
        handle.wait().map(Self::from_shared)
    }

    /// The loaded data.
    #[must_use]
    pub fn data(&self) -> &GeneratorData {
        &self.data
    }

    /// Drop all cached records and tables.
    pub fn clear_caches(&mut self) {
        self.resolved.clear();
        self.tables.clear();
    }

    /// Resolve the availability record of a unit for a faction.
    ///
    /// Falls back through the faction's parents, merging when there are
    /// several, and finally to the `General` record of the era. Records
    /// that only start after `year` are discarded at every level, so a
    /// parent whose record has not started yet takes no part in a merge.
    pub fn resolve(
        &mut self,
        kind: RecordKind,
        era: i32,
        unit_key: &str,
        faction: &str,
        year: i32,
    ) -> Option<AvailabilityRating> {
        let key = (kind, era, unit_key.to_string(), faction.to_string(), year);
        if let Some(cached) = self.resolved.get(&key) {
            return cached.clone();
        }
        // Guards against revisiting this key through a parent cycle.
        self.resolved.insert(key.clone(), None);

        let data = Arc::clone(&self.data);
        let started = |r: &AvailabilityRating| year >= r.start_year();
        let found = if let Some(direct) = data.availability.rating(kind, era, unit_key, faction) {
            Some(direct.clone()).filter(started)
        } else {
            match data.factions.parents(faction) {
                [] if faction != GENERAL_FACTION => data
                    .availability
                    .rating(kind, era, unit_key, GENERAL_FACTION)
                    .cloned()
                    .filter(started),
                [] => None,
                [parent] => self.resolve(kind, era, unit_key, parent, year),
                parents => {
                    let found: Vec<AvailabilityRating> = parents
                        .iter()
                        .filter_map(|p| self.resolve(kind, era, unit_key, p, year))
                        .collect();
                    AvailabilityRating::merge(faction, &found)
                }
            }
        };
        self.resolved.insert(key, found.clone());
        found
    }

    /// Availability of a unit in `year`, interpolated between the eras
    /// either side of it and adjusted for the faction's rating.
    ///
    /// A record missing on one side counts as 0. `None` when neither era has
    /// a record.
    pub fn interpolated_availability(
        &mut self,
        kind: RecordKind,
        unit_key: &str,
        faction: &str,
        year: i32,
        rating: Option<&str>,
    ) -> Option<f64> {
        let data = Arc::clone(&self.data);
        let (era, next) = data.availability.era_bracket(year)?;
        let levels = data.factions.rating_level_system(faction);
        let rating_index = data.factions.rating_index(faction, rating);

        let av1 = self
            .resolve(kind, era, unit_key, faction, year)
            .map(|r| r.availability_for(rating_index, levels));
        // The later record is the value the ramp heads toward, so it is
        // gated at its own era rather than at `year`.
        let av2 = next.and_then(|next| {
            self.resolve(kind, next, unit_key, faction, year.max(next))
                .map(|r| r.availability_for(rating_index, levels))
        });

        match (av1, av2, next) {
            (None, None, _) => None,
            (Some(av), _, None) => Some(av),
            (av1, av2, Some(next)) => {
                let av1 = av1.unwrap_or(0.0);
                let av2 = av2.unwrap_or(0.0);
                let t = f64::from(year - era) / f64::from(next - era);
                Some(av1 + (av2 - av1) * t)
            }
            (None, Some(_), None) => None,
        }
    }

    /// Build, or fetch from cache, the table for a query.
    ///
    /// An empty table is a normal result when nothing qualifies.
    pub fn generate_table(&mut self, params: &Parameters) -> Arc<[TableEntry]> {
        if let Some(table) = self.tables.get(params) {
            return Arc::clone(table);
        }
        let table: Arc<[TableEntry]> = self.build_table(params).into();
        tracing::debug!(
            "Table for {} {} {}: {} entries",
            params.faction,
            params.unit_type,
            params.year,
            table.len()
        );
        self.tables.insert(params.clone(), Arc::clone(&table));
        table
    }

    fn build_table(&mut self, params: &Parameters) -> Vec<TableEntry> {
        let data = Arc::clone(&self.data);
        let rating = params.rating.as_deref();
        let entries = self.unit_weights(&data, params);
        if entries.is_empty() {
            return Vec::new();
        }

        let shaping = params.shaping_faction();
        let entries = match data
            .factions
            .weight_distribution(shaping, params.year, params.unit_type)
        {
            Some(dist) if params.weight_classes.len() > 1 => {
                weighting::apply_weight_distribution(entries, &params.weight_classes, dist)
            }
            _ => entries,
        };

        let entries = apply_tech_mix(&data.factions, entries, params, shaping, rating);

        let entries = match data.factions.salvage(shaping, params.year) {
            Some(salvage) => weighting::add_salvage(entries, salvage),
            None => entries,
        };

        weighting::rescale(entries, data.config.rescale)
    }

    /// Raw `chassis × model / total model` weights.
    fn unit_weights(&mut self, data: &GeneratorData, params: &Parameters) -> Vec<Weighted> {
        let rating = params.rating.as_deref();
        let filter = params.model_filter();
        let mut entries = Vec::new();

        for chassis in data.records.chassis_of_type(params.unit_type) {
            if chassis.intro_year() > params.year {
                continue;
            }
            let Some(cav) = self.interpolated_availability(
                RecordKind::Chassis,
                &chassis.key,
                &params.faction,
                params.year,
                rating,
            ) else {
                continue;
            };
            if cav <= 0.0 {
                continue;
            }

            let mut models: Vec<(&Arc<ModelRecord>, f64)> = Vec::new();
            for model in chassis.filtered_models(&filter) {
                let Some(mav) = self.interpolated_availability(
                    RecordKind::Model,
                    &model.key,
                    &params.faction,
                    params.year,
                    rating,
                ) else {
                    continue;
                };
                if mav <= 0.0 {
                    continue;
                }
                if let Some(adjusted) = adjust_availability_by_role(
                    mav,
                    &params.roles,
                    model,
                    params.year,
                    params.role_strictness,
                    &data.config.roles,
                ) {
                    models.push((model, AvailabilityRating::calc_weight(adjusted)));
                }
            }

            let total: f64 = models.iter().map(|(_, w)| w).sum();
            if total <= 0.0 {
                continue;
            }
            let chassis_weight = AvailabilityRating::calc_weight(cav);
            entries.extend(models.into_iter().map(|(model, weight)| {
                (
                    TableCandidate::Unit(Arc::clone(model)),
                    chassis_weight * weight / total,
                )
            }));
        }
        entries
    }
}

/// Pull omni, Clan and advanced shares toward the faction's targets.
fn apply_tech_mix(
    factions: &FactionGraph,
    entries: Vec<Weighted>,
    params: &Parameters,
    shaping: &str,
    rating: Option<&str>,
) -> Vec<Weighted> {
    let rating_index = factions.rating_index(shaping, rating).unwrap_or(0);
    let (omni_margin, tech_margin, upgrade_margin) = factions.tech_margins(shaping, params.year);
    let (omni, clan, advanced) = TechCategory::for_unit_type(params.unit_type);
    let target = |category: Option<TechCategory>| {
        category.and_then(|c| factions.pct_tech(shaping, c, params.year, rating_index))
    };

    let mut entries = entries;
    if let Some(pct) = target(omni) {
        entries = weighting::apply_tech_share(entries, |m| m.omni, pct, omni_margin);
    }
    if let Some(pct) = target(clan) {
        entries = weighting::apply_tech_share(entries, |m| m.clan, pct, tech_margin);
    }
    if let Some(pct) = target(advanced) {
        entries =
            weighting::apply_tech_share(entries, |m| m.star_league && !m.clan, pct, upgrade_margin);
    }
    entries
}
