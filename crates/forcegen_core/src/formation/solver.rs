//! Formation solving.
//!
//! The solver walks a ladder of relaxations, running the same search at
//! each rung until one produces units:
//!
//! 1. full requirements, assuming a shared motive type for vehicle and
//!    infantry tables (motive combinations tried in order of how well the
//!    tables represent them)
//! 2. no motive assumption
//! 3. smaller networks, then no network
//! 4. best effort only: units matching the template's ideal role
//!
//! If nothing works the result is empty.

use std::sync::Arc;

use rand::{Rng, RngCore};

use super::combinations::{
    find_combinations, find_groups, find_matched_groups, ConstraintSet, Distribution,
    Requirement, SlotKey, MAX_CONSTRAINTS,
};
use super::network::NetworkPlan;
use super::{Constraint, FormationType, GroupingConstraint};
use crate::config::SearchLimits;
use crate::error::{GenerationError, Result};
use crate::parameters::Parameters;
use crate::rat_generator::RatGenerator;
use crate::records::ModelRecord;
use crate::unit_kind::{MovementMode, NetworkMask};
use crate::unit_table::UnitTable;

/// Units tagged with the index of the parameter set they came from.
type Placed = Vec<(usize, Arc<ModelRecord>)>;

/// Remove and return a uniformly chosen element.
fn take_random<T>(pool: &mut Vec<T>, rng: &mut dyn RngCore) -> Option<T> {
    if pool.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..pool.len());
    Some(pool.swap_remove(index))
}

/// Order items by repeated weighted draws without replacement.
fn weighted_order<T>(mut items: Vec<(T, f64)>, rng: &mut dyn RngCore) -> Vec<T> {
    let mut ordered = Vec::with_capacity(items.len());
    while !items.is_empty() {
        let total: f64 = items.iter().map(|(_, w)| w).sum();
        let mut index = items.len() - 1;
        if total > 0.0 {
            let mut roll = rng.gen_range(0.0..total);
            for (i, (_, w)) in items.iter().enumerate() {
                if roll < *w {
                    index = i;
                    break;
                }
                roll -= w;
            }
        }
        ordered.push(items.swap_remove(index).0);
    }
    ordered
}

/// Grouping constraint with overrides applied.
#[derive(Clone, Copy)]
struct ActiveGrouping<'a> {
    constraint: &'a GroupingConstraint,
    size: usize,
    groups: usize,
}

/// One search over fixed tables and a fixed network plan.
struct Search<'a> {
    formation: &'a FormationType,
    numeric: Vec<&'a Constraint>,
    grouping: Option<ActiveGrouping<'a>>,
    tables: Vec<UnitTable>,
    counts: &'a [usize],
    limits: SearchLimits,
}

impl Search<'_> {
    fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    fn slot_matches(&self, key: &SlotKey, plan: Option<&NetworkPlan>, model: &ModelRecord) -> bool {
        self.formation.main_matches(model)
            && key.constraints.indices().all(|i| {
                self.numeric
                    .get(i)
                    .and_then(|c| c.predicate())
                    .map_or(true, |p| p.matches(model))
            })
            && plan.map_or(true, |p| p.accepts(key.network, model))
    }

    fn run(&self, plan: Option<&NetworkPlan>, rng: &mut dyn RngCore) -> Option<Placed> {
        let total = self.total();
        let limit = self.limits.max_distributions;
        let requirements: Vec<Requirement> = self
            .numeric
            .iter()
            .map(|c| Requirement {
                min: c.required(total),
                paired_with_next: c.paired_with_next(),
            })
            .collect();
        let roles = NetworkPlan::roles_for(plan, total);

        let mut combinations = find_combinations(total, &requirements, limit);
        tracing::trace!(
            "{}: {} constraint distributions",
            self.formation.name,
            combinations.len()
        );
        while let Some(combination) = take_random(&mut combinations, rng) {
            let mut layouts = find_groups(&combination, &roles, self.counts, limit);
            while let Some(layout) = take_random(&mut layouts, rng) {
                if let Some(units) = self.try_layout(&layout, plan, rng) {
                    return Some(units);
                }
            }
        }
        None
    }

    fn try_layout(
        &self,
        layout: &Distribution<SlotKey>,
        plan: Option<&NetworkPlan>,
        rng: &mut dyn RngCore,
    ) -> Option<Placed> {
        let Some(grouping) = self.grouping.filter(|g| g.groups > 0) else {
            return self.realize(layout, &[], plan, rng);
        };
        let eligible = |key: &SlotKey| {
            let unit_type = self.tables[key.param].params().unit_type;
            grouping.constraint.unit_types.is_empty()
                || grouping.constraint.unit_types.contains(&unit_type)
        };
        let mut placements = find_matched_groups(
            layout,
            eligible,
            grouping.size,
            grouping.groups,
            self.limits.max_distributions,
        );
        while let Some(placement) = take_random(&mut placements, rng) {
            if let Some(units) = self.realize(layout, &placement, plan, rng) {
                return Some(units);
            }
        }
        None
    }

    fn realize(
        &self,
        layout: &Distribution<SlotKey>,
        groups: &[Vec<SlotKey>],
        plan: Option<&NetworkPlan>,
        rng: &mut dyn RngCore,
    ) -> Option<Placed> {
        let mut remaining = layout.clone();
        let mut units: Placed = Vec::with_capacity(self.total());

        for group in groups {
            for key in group {
                let slot = remaining.get_mut(key)?;
                *slot = slot.checked_sub(1)?;
            }
            units.extend(self.realize_group(group, plan, rng)?);
        }

        for (key, &count) in &remaining {
            if count == 0 {
                continue;
            }
            let table = &self.tables[key.param];
            let predicate = |m: &ModelRecord| self.slot_matches(key, plan, m);
            if key.constraints.is_empty() {
                for _ in 0..count {
                    units.push((key.param, table.sample_one(rng, &predicate)?));
                }
            } else {
                let picked = table.sample_many(rng, count, &predicate);
                if picked.len() < count {
                    tracing::trace!(
                        "{}: only {} of {} units for {:?}",
                        self.formation.name,
                        picked.len(),
                        count,
                        key
                    );
                    return None;
                }
                units.extend(picked.into_iter().map(|m| (key.param, m)));
            }
        }

        let models: Vec<Arc<ModelRecord>> = units.iter().map(|(_, m)| Arc::clone(m)).collect();
        if !self.formation.constraints_met(&models) {
            return None;
        }
        units.sort_by_key(|(param, _)| *param);
        Some(units)
    }

    /// Sample one matched group. If members cannot each meet their own
    /// slot, retry with a leader that meets every member's constraints and
    /// partners that only need to match the leader.
    fn realize_group(
        &self,
        group: &[SlotKey],
        plan: Option<&NetworkPlan>,
        rng: &mut dyn RngCore,
    ) -> Option<Placed> {
        if let Some(members) = self.sample_group(group, None, plan, rng) {
            return Some(members);
        }
        let all = group
            .iter()
            .fold(ConstraintSet::EMPTY, |acc, k| acc.union(k.constraints));
        tracing::trace!("{}: retrying group with inherited criteria", self.formation.name);
        self.sample_group(group, Some(all), plan, rng)
    }

    fn sample_group(
        &self,
        group: &[SlotKey],
        inherited: Option<ConstraintSet>,
        plan: Option<&NetworkPlan>,
        rng: &mut dyn RngCore,
    ) -> Option<Placed> {
        let grouping = self.grouping?.constraint;
        let (first, rest) = group.split_first()?;
        let table = &self.tables[first.param];

        let leader_key = match inherited {
            Some(constraints) => SlotKey {
                constraints,
                ..*first
            },
            None => *first,
        };
        let leader = table.sample_one(rng, &|m| {
            self.slot_matches(&leader_key, plan, m) && grouping.predicate.matches(m)
        })?;

        let mut members = vec![(first.param, Arc::clone(&leader))];
        for key in rest {
            let member_key = if inherited.is_some() {
                SlotKey {
                    constraints: ConstraintSet::EMPTY,
                    ..*key
                }
            } else {
                *key
            };
            let member = table.sample_one(rng, &|m| {
                self.slot_matches(&member_key, plan, m)
                    && grouping.predicate.matches(m)
                    && grouping.pair.matches(&leader, m)
            })?;
            members.push((key.param, member));
        }
        Some(members)
    }

    /// Units matching only the main criteria and the ideal role.
    fn ideal_role(&self, rng: &mut dyn RngCore) -> Option<Placed> {
        let role = self.formation.ideal_role;
        let mut units = Vec::with_capacity(self.total());
        for (param, (table, &count)) in self.tables.iter().zip(self.counts).enumerate() {
            for _ in 0..count {
                let unit = table.sample_one(rng, &|m| {
                    self.formation.main_matches(m) && role.map_or(true, |r| m.combat_role == r)
                })?;
                units.push((param, unit));
            }
        }
        Some(units)
    }
}

/// Fills formation templates with units drawn from generated tables.
pub struct FormationSolver<'g> {
    generator: &'g mut RatGenerator,
}

impl<'g> FormationSolver<'g> {
    /// Create a solver drawing tables from `generator`.
    pub fn new(generator: &'g mut RatGenerator) -> Self {
        Self { generator }
    }

    /// Generate units for `formation`.
    ///
    /// `counts[i]` units are drawn from the table for `param_sets[i]`. The
    /// result lists units in parameter-set order and is empty when the
    /// formation cannot be satisfied. With `best_effort`, the last resort is
    /// to ignore the requirements and pick units by the template's ideal
    /// role.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::MismatchedArguments`] when the slices
    /// differ in length and [`GenerationError::InvalidArgument`] for a zero
    /// group size override or a template with more than
    /// [`MAX_CONSTRAINTS`] counting constraints.
    pub fn generate_formation(
        &mut self,
        formation: &FormationType,
        param_sets: &[Parameters],
        counts: &[usize],
        network: NetworkMask,
        best_effort: bool,
        group_size_override: Option<usize>,
        group_count_override: Option<usize>,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Arc<ModelRecord>>> {
        if param_sets.len() != counts.len() {
            return Err(GenerationError::MismatchedArguments {
                params: param_sets.len(),
                counts: counts.len(),
            });
        }
        if group_size_override == Some(0) {
            return Err(GenerationError::InvalidArgument(
                "group size override must be positive".to_string(),
            ));
        }
        let numeric = formation.numeric_constraints().count();
        if numeric > MAX_CONSTRAINTS {
            return Err(GenerationError::InvalidArgument(format!(
                "{} has {numeric} constraints, at most {MAX_CONSTRAINTS} are supported",
                formation.name
            )));
        }
        let total: usize = counts.iter().sum();
        if total == 0 {
            return Ok(Vec::new());
        }
        if let Some(p) = param_sets
            .iter()
            .find(|p| !formation.allows_unit_type(p.unit_type))
        {
            tracing::debug!("{} does not allow {}", formation.name, p.unit_type);
            return Ok(Vec::new());
        }

        let params: Vec<Parameters> = param_sets.iter().map(|p| formation.restrict(p)).collect();
        let grouping = formation.grouping().and_then(|g| {
            let size = group_size_override.unwrap_or(g.group_size);
            let eligible: usize = params
                .iter()
                .zip(counts)
                .filter(|(p, _)| g.unit_types.is_empty() || g.unit_types.contains(&p.unit_type))
                .map(|(_, n)| n)
                .sum();
            let wanted = group_count_override.unwrap_or(g.num_groups);
            (size > 0).then(|| ActiveGrouping {
                constraint: g,
                size,
                groups: wanted.min(eligible / size),
            })
        });
        let config = self.generator.data().config.clone();
        let full_plan = NetworkPlan::for_mask(network, total, &config.network);

        for motive_params in self.motive_options(formation, &params, rng) {
            let search = self.search(formation, &motive_params, counts, grouping, config.search);
            if let Some(units) = search.run(full_plan.as_ref(), rng) {
                return Ok(finish(formation, units, "assumed motive"));
            }
        }

        let search = self.search(formation, &params, counts, grouping, config.search);
        if let Some(units) = search.run(full_plan.as_ref(), rng) {
            return Ok(finish(formation, units, "full requirements"));
        }

        if let Some(plan) = &full_plan {
            for size in (2..plan.size).rev() {
                tracing::debug!("{}: trying network of {size}", formation.name);
                if let Some(units) = search.run(Some(&plan.resized(size)), rng) {
                    return Ok(finish(formation, units, "reduced network"));
                }
            }
            tracing::debug!("{}: dropping network requirement", formation.name);
            if let Some(units) = search.run(None, rng) {
                return Ok(finish(formation, units, "no network"));
            }
        }

        if best_effort {
            if let Some(units) = search.ideal_role(rng) {
                return Ok(finish(formation, units, "ideal role"));
            }
        }

        tracing::debug!("{}: requirements could not be met", formation.name);
        Ok(Vec::new())
    }

    fn search<'a>(
        &mut self,
        formation: &'a FormationType,
        params: &[Parameters],
        counts: &'a [usize],
        grouping: Option<ActiveGrouping<'a>>,
        limits: SearchLimits,
    ) -> Search<'a> {
        let tables = params
            .iter()
            .map(|p| UnitTable::create(self.generator, p.clone()))
            .collect();
        Search {
            formation,
            numeric: formation.numeric_constraints().collect(),
            grouping,
            tables,
            counts,
            limits,
        }
    }

    /// Motive type combinations for tables that can be split by motive,
    /// ordered by weighted draws on how well each table represents them.
    fn motive_options(
        &mut self,
        formation: &FormationType,
        params: &[Parameters],
        rng: &mut dyn RngCore,
    ) -> Vec<Vec<Parameters>> {
        let mut per_param: Vec<Vec<(Option<MovementMode>, f64)>> = Vec::new();
        for p in params {
            let choices = p.unit_type.motive_choices();
            if !p.movement_modes.is_empty() || choices.is_empty() {
                per_param.push(vec![(None, 1.0)]);
                continue;
            }
            let table = UnitTable::create(self.generator, p.clone());
            let weighted: Vec<(Option<MovementMode>, f64)> = choices
                .iter()
                .filter_map(|&mode| {
                    let weight = table.matching_weight(&|m| {
                        m.movement_mode == mode && formation.main_matches(m)
                    });
                    (weight > 0.0).then_some((Some(mode), weight))
                })
                .collect();
            per_param.push(if weighted.is_empty() {
                vec![(None, 1.0)]
            } else {
                weighted
            });
        }
        if per_param.iter().all(|c| c.iter().all(|(m, _)| m.is_none())) {
            return Vec::new();
        }

        let mut combos: Vec<(Vec<Option<MovementMode>>, f64)> = vec![(Vec::new(), 1.0)];
        for choices in &per_param {
            combos = combos
                .iter()
                .flat_map(|(modes, weight)| {
                    choices.iter().map(move |(mode, w)| {
                        let mut modes = modes.clone();
                        modes.push(*mode);
                        (modes, weight * w)
                    })
                })
                .collect();
        }

        weighted_order(combos, rng)
            .into_iter()
            .map(|modes| {
                params
                    .iter()
                    .zip(modes)
                    .map(|(p, mode)| match mode {
                        Some(mode) => p.clone().with_movement_modes([mode]),
                        None => p.clone(),
                    })
                    .collect()
            })
            .collect()
    }
}

fn finish(formation: &FormationType, units: Placed, level: &str) -> Vec<Arc<ModelRecord>> {
    tracing::debug!("{}: {} units ({level})", formation.name, units.len());
    units.into_iter().map(|(_, m)| m).collect()
}
