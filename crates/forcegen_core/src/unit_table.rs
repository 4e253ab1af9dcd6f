//! Weighted unit tables with predicate sampling.
//!
//! A [`UnitTable`] wraps one generated table. Salvage rows are resolved when
//! the table is created by generating the salvage faction's table for the
//! same query, so sampling never needs the generator again.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::{Rng, RngCore};

use crate::parameters::Parameters;
use crate::rat_generator::RatGenerator;
use crate::records::ModelRecord;
use crate::weighting::{TableCandidate, TableEntry};

/// A generated table ready for sampling.
#[derive(Debug, Clone)]
pub struct UnitTable {
    params: Parameters,
    entries: Arc<[TableEntry]>,
    salvage: BTreeMap<String, Arc<[TableEntry]>>,
}

impl UnitTable {
    /// Generate the table for `params`.
    pub fn create(generator: &mut RatGenerator, params: Parameters) -> Self {
        let entries = generator.generate_table(&params);
        let mut salvage = BTreeMap::new();
        for entry in entries.iter() {
            if let TableCandidate::Salvage(faction) = &entry.candidate {
                let mut salvage_params = params.clone();
                salvage_params.faction = faction.clone();
                salvage_params.deploying_faction = Some(params.shaping_faction().to_string());
                salvage.insert(faction.clone(), generator.generate_table(&salvage_params));
            }
        }
        Self {
            params,
            entries,
            salvage,
        }
    }

    /// Query this table was built from.
    #[must_use]
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Table rows.
    #[must_use]
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total weight of the unit rows matching `predicate`.
    ///
    /// Used to compare how well tables represent a kind of unit.
    #[must_use]
    pub fn matching_weight(&self, predicate: &dyn Fn(&ModelRecord) -> bool) -> f64 {
        self.pool(predicate).iter().map(|(_, w)| w).sum()
    }

    /// Matching units with their effective weights. Salvage rows spread
    /// their weight over the matching units of the salvage table.
    fn pool(&self, predicate: &dyn Fn(&ModelRecord) -> bool) -> Vec<(Arc<ModelRecord>, f64)> {
        let mut pool = Vec::new();
        for entry in self.entries.iter() {
            match &entry.candidate {
                TableCandidate::Unit(model) => {
                    if predicate(model) {
                        pool.push((Arc::clone(model), f64::from(entry.weight)));
                    }
                }
                TableCandidate::Salvage(faction) => {
                    let Some(table) = self.salvage.get(faction) else {
                        continue;
                    };
                    let matching: Vec<(&Arc<ModelRecord>, u32)> = table
                        .iter()
                        .filter_map(|e| e.candidate.unit().map(|m| (m, e.weight)))
                        .filter(|(m, _)| predicate(m))
                        .collect();
                    let total: u32 = matching.iter().map(|(_, w)| w).sum();
                    for (model, weight) in matching {
                        let share = f64::from(entry.weight) * f64::from(weight) / f64::from(total);
                        pool.push((Arc::clone(model), share));
                    }
                }
            }
        }
        pool
    }

    /// Draw one unit matching `predicate`, or `None` if none matches.
    pub fn sample_one(
        &self,
        rng: &mut dyn RngCore,
        predicate: &dyn Fn(&ModelRecord) -> bool,
    ) -> Option<Arc<ModelRecord>> {
        let mut pool = self.pool(predicate);
        pick(&mut pool, rng)
    }

    /// Draw up to `count` distinct units matching `predicate`.
    ///
    /// Returns fewer than `count` units when fewer distinct units match.
    pub fn sample_many(
        &self,
        rng: &mut dyn RngCore,
        count: usize,
        predicate: &dyn Fn(&ModelRecord) -> bool,
    ) -> Vec<Arc<ModelRecord>> {
        let mut pool = self.pool(predicate);
        // Salvage may list a unit the table already carries.
        merge_duplicates(&mut pool);
        let mut picked = Vec::with_capacity(count);
        while picked.len() < count {
            match pick(&mut pool, rng) {
                Some(model) => picked.push(model),
                None => break,
            }
        }
        picked
    }
}

fn merge_duplicates(pool: &mut Vec<(Arc<ModelRecord>, f64)>) {
    let mut merged: Vec<(Arc<ModelRecord>, f64)> = Vec::with_capacity(pool.len());
    for (model, weight) in pool.drain(..) {
        match merged.iter_mut().find(|(m, _)| m.key == model.key) {
            Some((_, w)) => *w += weight,
            None => merged.push((model, weight)),
        }
    }
    *pool = merged;
}

/// Remove and return one weighted entry.
fn pick(pool: &mut Vec<(Arc<ModelRecord>, f64)>, rng: &mut dyn RngCore) -> Option<Arc<ModelRecord>> {
    let total: f64 = pool.iter().map(|(_, w)| w).sum();
    if pool.is_empty() || total <= 0.0 {
        return None;
    }
    let mut roll = rng.gen_range(0.0..total);
    let mut index = pool.len() - 1;
    for (i, (_, weight)) in pool.iter().enumerate() {
        if roll < *weight {
            index = i;
            break;
        }
        roll -= weight;
    }
    Some(pool.swap_remove(index).0)
}
