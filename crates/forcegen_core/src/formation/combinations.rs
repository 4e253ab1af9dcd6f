//! Enumeration of the ways a formation's requirements can be spread over
//! its units.
//!
//! Every stage works on a [`Distribution`]: how many units share each key.
//! Units are interchangeable, so two assignments that only differ in which
//! unit carries which key are the same distribution and are produced once.
//! Each stage stops after `limit` results.

use std::collections::{BTreeMap, BTreeSet};

use super::network::NetworkRole;

/// Units per key.
pub type Distribution<K> = BTreeMap<K, usize>;

/// Most counting constraints a template may carry.
pub const MAX_CONSTRAINTS: usize = 32;

/// Set of constraint indices a unit must satisfy.
///
/// Indices at or above [`MAX_CONSTRAINTS`] are never members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConstraintSet(u32);

impl ConstraintSet {
    /// No constraints.
    pub const EMPTY: Self = Self(0);

    /// This set plus constraint `index`.
    #[must_use]
    pub const fn with(self, index: usize) -> Self {
        if index < MAX_CONSTRAINTS {
            Self(self.0 | (1 << index))
        } else {
            self
        }
    }

    /// Whether constraint `index` is in the set.
    #[must_use]
    pub const fn contains(self, index: usize) -> bool {
        index < MAX_CONSTRAINTS && self.0 & (1 << index) != 0
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Union of two sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Indices in the set, ascending.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..MAX_CONSTRAINTS).filter(move |i| self.contains(*i))
    }
}

/// What one slot of a formation must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    /// Constraints the unit must satisfy.
    pub constraints: ConstraintSet,
    /// Network role.
    pub network: NetworkRole,
    /// Index of the parameter set (table) the unit comes from.
    pub param: usize,
}

/// Minimum a counting constraint places on the formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    /// Units that must match.
    pub min: usize,
    /// This and the next requirement are alternatives.
    pub paired_with_next: bool,
}

/// Every vector `v` with `v[i] <= capacities[i]` summing to `need`.
fn splits(capacities: &[usize], need: usize, limit: usize) -> Vec<Vec<usize>> {
    fn walk(
        capacities: &[usize],
        need: usize,
        current: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
        limit: usize,
    ) {
        if out.len() >= limit {
            return;
        }
        let i = current.len();
        if i == capacities.len() {
            if need == 0 {
                out.push(current.clone());
            }
            return;
        }
        let rest: usize = capacities[i + 1..].iter().sum();
        let lo = need.saturating_sub(rest);
        let hi = need.min(capacities[i]);
        for take in lo..=hi {
            current.push(take);
            walk(capacities, need - take, current, out, limit);
            current.pop();
        }
    }

    let mut out = Vec::new();
    if capacities.iter().sum::<usize>() >= need {
        walk(capacities, need, &mut Vec::with_capacity(capacities.len()), &mut out, limit);
    }
    out
}

/// Flag `need` more units with constraint `index`, in every distinguishable
/// way.
fn flag_units(
    dist: &Distribution<ConstraintSet>,
    index: usize,
    need: usize,
    limit: usize,
    out: &mut BTreeSet<Distribution<ConstraintSet>>,
) {
    let buckets: Vec<(ConstraintSet, usize)> = dist.iter().map(|(k, v)| (*k, *v)).collect();
    let capacities: Vec<usize> = buckets.iter().map(|(_, n)| *n).collect();
    for split in splits(&capacities, need, limit) {
        let mut next = Distribution::new();
        for ((set, count), take) in buckets.iter().zip(split) {
            if count > &take {
                *next.entry(*set).or_default() += count - take;
            }
            if take > 0 {
                *next.entry(set.with(index)).or_default() += take;
            }
        }
        out.insert(next);
        if out.len() >= limit {
            return;
        }
    }
}

/// All distinguishable ways to mark which units carry which constraints.
///
/// Each requirement marks exactly its minimum number of units. A pair of
/// alternatives produces the distributions of either side. Returns nothing
/// when a requirement exceeds `total`.
#[must_use]
pub fn find_combinations(
    total: usize,
    requirements: &[Requirement],
    limit: usize,
) -> Vec<Distribution<ConstraintSet>> {
    let mut current: BTreeSet<Distribution<ConstraintSet>> = BTreeSet::new();
    current.insert(if total > 0 {
        Distribution::from([(ConstraintSet::EMPTY, total)])
    } else {
        Distribution::new()
    });

    let mut i = 0;
    while i < requirements.len() {
        let alternatives: Vec<usize> =
            if requirements[i].paired_with_next && i + 1 < requirements.len() {
                vec![i, i + 1]
            } else {
                vec![i]
            };
        let mut next = BTreeSet::new();
        for dist in &current {
            for &index in &alternatives {
                let need = requirements[index].min;
                if need <= total {
                    flag_units(dist, index, need, limit, &mut next);
                }
            }
        }
        current = next;
        i += alternatives.len();
    }
    current.into_iter().take(limit).collect()
}

/// Split every bucket of `dist` among labels so label `j` receives exactly
/// `labels[j].1` units.
///
/// The label counts must add up to the distribution total; otherwise the
/// result is empty.
#[must_use]
pub fn distribute<K, L>(
    dist: &Distribution<K>,
    labels: &[(L, usize)],
    limit: usize,
) -> Vec<Distribution<(K, L)>>
where
    K: Ord + Clone,
    L: Ord + Clone,
{
    fn walk<K: Ord + Clone, L: Ord + Clone>(
        keys: &[K],
        remaining: &mut Vec<usize>,
        labels: &[(L, usize)],
        current: &mut Distribution<(K, L)>,
        out: &mut Vec<Distribution<(K, L)>>,
        limit: usize,
    ) {
        if out.len() >= limit {
            return;
        }
        let Some(((label, need), rest)) = labels.split_first() else {
            out.push(current.clone());
            return;
        };
        for split in splits(remaining, *need, limit) {
            for (i, take) in split.iter().enumerate() {
                remaining[i] -= take;
                if *take > 0 {
                    current.insert((keys[i].clone(), label.clone()), *take);
                }
            }
            walk(keys, remaining, rest, current, out, limit);
            for (i, take) in split.iter().enumerate() {
                remaining[i] += take;
                if *take > 0 {
                    current.remove(&(keys[i].clone(), label.clone()));
                }
            }
        }
    }

    let total: usize = dist.values().sum();
    if labels.iter().map(|(_, n)| n).sum::<usize>() != total {
        return Vec::new();
    }
    let keys: Vec<K> = dist.keys().cloned().collect();
    let mut remaining: Vec<usize> = dist.values().copied().collect();
    let mut out = Vec::new();
    walk(&keys, &mut remaining, labels, &mut Distribution::new(), &mut out, limit);
    out
}

/// Combine a constraint distribution with network roles and parameter
/// sets.
///
/// `network` lists role counts and `counts` the units drawn from each
/// parameter set; both must add up to the distribution total.
#[must_use]
pub fn find_groups(
    dist: &Distribution<ConstraintSet>,
    network: &[(NetworkRole, usize)],
    counts: &[usize],
    limit: usize,
) -> Vec<Distribution<SlotKey>> {
    let params: Vec<(usize, usize)> = counts
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, n)| *n > 0)
        .collect();
    let mut out = Vec::new();
    for with_network in distribute(dist, network, limit) {
        for with_params in distribute(&with_network, &params, limit) {
            out.push(
                with_params
                    .into_iter()
                    .map(|(((constraints, network), param), n)| {
                        (
                            SlotKey {
                                constraints,
                                network,
                                param,
                            },
                            n,
                        )
                    })
                    .collect(),
            );
            if out.len() >= limit {
                return out;
            }
        }
    }
    out
}

/// Every multiset of `size` slots from one parameter set that fits within
/// `capacity`, as sorted vectors.
fn group_options(capacity: &[(SlotKey, usize)], size: usize) -> Vec<Vec<SlotKey>> {
    let mut out = Vec::new();
    let mut by_param: BTreeMap<usize, Vec<(SlotKey, usize)>> = BTreeMap::new();
    for (key, n) in capacity {
        by_param.entry(key.param).or_default().push((*key, *n));
    }
    for slots in by_param.values() {
        let caps: Vec<usize> = slots.iter().map(|(_, n)| *n).collect();
        for split in splits(&caps, size, usize::MAX) {
            let mut group = Vec::with_capacity(size);
            for ((key, _), take) in slots.iter().zip(split) {
                group.extend(std::iter::repeat(*key).take(take));
            }
            out.push(group);
        }
    }
    out
}

/// Placements of `num_groups` groups of `group_size` matched units among
/// the eligible slots of `dist`.
///
/// Groups are interchangeable, so each placement lists group options in
/// non-decreasing order. Members of one group always share a parameter
/// set.
#[must_use]
pub fn find_matched_groups(
    dist: &Distribution<SlotKey>,
    eligible: impl Fn(&SlotKey) -> bool,
    group_size: usize,
    num_groups: usize,
    limit: usize,
) -> Vec<Vec<Vec<SlotKey>>> {
    fn place(
        options: &[Vec<SlotKey>],
        capacity: &mut BTreeMap<SlotKey, usize>,
        start: usize,
        remaining: usize,
        current: &mut Vec<usize>,
        out: &mut Vec<Vec<Vec<SlotKey>>>,
        limit: usize,
    ) {
        if out.len() >= limit {
            return;
        }
        if remaining == 0 {
            out.push(current.iter().map(|&i| options[i].clone()).collect());
            return;
        }
        for i in start..options.len() {
            let fits = options[i].iter().all(|key| {
                let used = options[i].iter().filter(|k| *k == key).count();
                capacity.get(key).copied().unwrap_or(0) >= used
            });
            if !fits {
                continue;
            }
            for key in &options[i] {
                if let Some(n) = capacity.get_mut(key) {
                    *n -= 1;
                }
            }
            current.push(i);
            place(options, capacity, i, remaining - 1, current, out, limit);
            current.pop();
            for key in &options[i] {
                if let Some(n) = capacity.get_mut(key) {
                    *n += 1;
                }
            }
        }
    }

    if num_groups == 0 || group_size == 0 {
        return vec![Vec::new()];
    }
    let capacity: Vec<(SlotKey, usize)> = dist
        .iter()
        .filter(|(k, _)| eligible(k))
        .map(|(k, n)| (*k, *n))
        .collect();
    let options = group_options(&capacity, group_size);
    let mut remaining: BTreeMap<SlotKey, usize> = capacity.into_iter().collect();
    let mut out = Vec::new();
    place(
        &options,
        &mut remaining,
        0,
        num_groups,
        &mut Vec::new(),
        &mut out,
        limit,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(min: usize) -> Requirement {
        Requirement {
            min,
            paired_with_next: false,
        }
    }

    fn members(dist: &Distribution<ConstraintSet>, index: usize) -> usize {
        dist.iter()
            .filter(|(k, _)| k.contains(index))
            .map(|(_, n)| n)
            .sum()
    }

    #[test]
    fn test_constraint_set_ignores_out_of_range_indices() {
        let set = ConstraintSet::EMPTY.with(0).with(31);
        assert!(set.contains(31));
        assert_eq!(set.with(MAX_CONSTRAINTS), set);
        assert_eq!(set.with(usize::MAX), set);
        assert!(!set.contains(MAX_CONSTRAINTS));
        assert!(!set.contains(64));
        assert_eq!(set.indices().collect::<Vec<_>>(), vec![0, 31]);
    }

    #[test]
    fn test_splits() {
        assert_eq!(splits(&[1, 2], 2, 100), vec![vec![0, 2], vec![1, 1]]);
        assert!(splits(&[1, 1], 3, 100).is_empty());
        assert_eq!(splits(&[], 0, 100), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn test_single_constraint() {
        let combos = find_combinations(4, &[req(3)], 100);
        assert_eq!(combos.len(), 1);
        assert_eq!(members(&combos[0], 0), 3);
        assert_eq!(combos[0].values().sum::<usize>(), 4);
    }

    #[test]
    fn test_two_constraints_overlap_variants() {
        // 2 of A and 2 of B among 4: overlap 0, 1 or 2
        let combos = find_combinations(4, &[req(2), req(2)], 100);
        assert_eq!(combos.len(), 3);
        for combo in &combos {
            assert_eq!(members(combo, 0), 2);
            assert_eq!(members(combo, 1), 2);
            assert_eq!(combo.values().sum::<usize>(), 4);
        }
    }

    #[test]
    fn test_paired_constraints_are_alternatives() {
        let requirements = [
            Requirement {
                min: 1,
                paired_with_next: true,
            },
            req(2),
        ];
        let combos = find_combinations(4, &requirements, 100);
        assert_eq!(combos.len(), 2);
        assert!(combos
            .iter()
            .all(|c| members(c, 0) >= 1 || members(c, 1) >= 2));
        assert!(combos.iter().any(|c| members(c, 1) == 0));
    }

    #[test]
    fn test_requirement_above_total() {
        assert!(find_combinations(2, &[req(3)], 100).is_empty());
    }

    #[test]
    fn test_limit() {
        let combos = find_combinations(6, &[req(2), req(2), req(2)], 2);
        assert_eq!(combos.len(), 2);
    }

    #[test]
    fn test_find_groups_splits_params_and_network() {
        let dist = Distribution::from([(ConstraintSet::EMPTY.with(0), 2), (ConstraintSet::EMPTY, 2)]);
        let network = [(NetworkRole::Master, 1), (NetworkRole::Slave, 3)];
        let groups = find_groups(&dist, &network, &[3, 1], 1000);
        assert!(!groups.is_empty());
        for g in &groups {
            let master: usize = g
                .iter()
                .filter(|(k, _)| k.network == NetworkRole::Master)
                .map(|(_, n)| n)
                .sum();
            let second: usize = g.iter().filter(|(k, _)| k.param == 1).map(|(_, n)| n).sum();
            let flagged: usize = g
                .iter()
                .filter(|(k, _)| k.constraints.contains(0))
                .map(|(_, n)| n)
                .sum();
            assert_eq!(master, 1);
            assert_eq!(second, 1);
            assert_eq!(flagged, 2);
        }
    }

    #[test]
    fn test_distribute_rejects_mismatched_totals() {
        let dist = Distribution::from([(1_u8, 3)]);
        assert!(distribute(&dist, &[('a', 2)], 10).is_empty());
        assert_eq!(distribute(&dist, &[('a', 2), ('b', 1)], 10).len(), 1);
    }

    #[test]
    fn test_matched_groups() {
        let a = SlotKey {
            constraints: ConstraintSet::EMPTY,
            network: NetworkRole::None,
            param: 0,
        };
        let b = SlotKey {
            constraints: ConstraintSet::EMPTY.with(0),
            ..a
        };
        let dist = Distribution::from([(a, 3), (b, 3)]);
        let placements = find_matched_groups(&dist, |_| true, 2, 3, 1000);
        // group kinds: aa, ab, bb; choose 3 with capacity 3 each
        assert!(!placements.is_empty());
        for placement in &placements {
            assert_eq!(placement.len(), 3);
            let used_a = placement.iter().flatten().filter(|k| **k == a).count();
            assert!(used_a <= 3);
        }
        assert!(find_matched_groups(&dist, |k| k.constraints.is_empty(), 2, 2, 1000).is_empty());
    }
}
