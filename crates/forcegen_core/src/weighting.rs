//! Normalization stages applied to a table's raw weights.
//!
//! Each stage takes the candidate list by value and returns a fresh one, so
//! stages can be tested and reordered in isolation. Weights stay `f64`
//! until [`rescale`] converts them to the integer weights of a finished
//! table.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::RescaleBounds;
use crate::factions::SalvageSources;
use crate::records::ModelRecord;
use crate::unit_kind::WeightClass;

/// One row of a generated table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableCandidate {
    /// A concrete unit.
    Unit(Arc<ModelRecord>),
    /// Roll again on the named faction's table.
    Salvage(String),
}

impl TableCandidate {
    /// The unit, if this row is one.
    #[must_use]
    pub fn unit(&self) -> Option<&Arc<ModelRecord>> {
        match self {
            Self::Unit(m) => Some(m),
            Self::Salvage(_) => None,
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Unit(m) => m.key.clone(),
            Self::Salvage(f) => format!("Salvage: {f}"),
        }
    }
}

/// A candidate with an integer sampling weight.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    /// Sampling weight, always positive.
    pub weight: u32,
    /// What the row yields.
    pub candidate: TableCandidate,
}

/// A candidate with a working weight.
pub type Weighted = (TableCandidate, f64);

fn unit_total(entries: &[Weighted], keep: impl Fn(&ModelRecord) -> bool) -> f64 {
    entries
        .iter()
        .filter_map(|(c, w)| c.unit().filter(|m| keep(m)).map(|_| *w))
        .sum()
}

/// Rescale weight-class buckets so their totals follow a declared
/// distribution.
///
/// `distribution` is indexed by [`WeightClass::index`]. Only requested
/// classes with a positive declared share take part; the combined weight of
/// the participating buckets is preserved.
#[must_use]
pub fn apply_weight_distribution(
    entries: Vec<Weighted>,
    requested: &BTreeSet<WeightClass>,
    distribution: &[i32],
) -> Vec<Weighted> {
    let share = |wc: WeightClass| {
        distribution
            .get(wc.index())
            .copied()
            .filter(|s| *s > 0 && requested.contains(&wc))
            .map(f64::from)
    };
    let participating: Vec<(WeightClass, f64, f64)> = WeightClass::ALL
        .iter()
        .filter_map(|&wc| {
            let s = share(wc)?;
            let total = unit_total(&entries, |m| m.weight_class == wc);
            (total > 0.0).then_some((wc, s, total))
        })
        .collect();
    if participating.len() < 2 {
        return entries;
    }
    let pool: f64 = participating.iter().map(|(_, _, t)| t).sum();
    let shares: f64 = participating.iter().map(|(_, s, _)| s).sum();

    entries
        .into_iter()
        .map(|(candidate, weight)| {
            let factor = candidate
                .unit()
                .and_then(|m| participating.iter().find(|(wc, _, _)| *wc == m.weight_class))
                .map_or(1.0, |(_, s, total)| pool * s / shares / total);
            (candidate, weight * factor)
        })
        .collect()
}

/// Move the share of units matching `in_subset` toward `target` percent.
///
/// Nothing changes while the current share lies within `margin` of the
/// target. Otherwise the subset is scaled so its share lands on the nearest
/// edge of the band.
#[must_use]
pub fn apply_tech_share(
    entries: Vec<Weighted>,
    in_subset: impl Fn(&ModelRecord) -> bool,
    target: f64,
    margin: f64,
) -> Vec<Weighted> {
    let total = unit_total(&entries, |_| true);
    let subset = unit_total(&entries, &in_subset);
    let rest = total - subset;
    if total <= 0.0 || subset <= 0.0 {
        return entries;
    }
    let current = subset / total * 100.0;
    let goal = if current < target - margin {
        target - margin
    } else if current > target + margin {
        target + margin
    } else {
        return entries;
    };
    let goal = goal.clamp(0.0, 100.0);
    if goal >= 100.0 || rest <= 0.0 {
        return entries;
    }
    let factor = goal * rest / ((100.0 - goal) * subset);
    tracing::trace!("Tech share {current:.1}% outside {target}±{margin}, scaling by {factor:.3}");

    entries
        .into_iter()
        .map(|(candidate, weight)| {
            let scaled = candidate.unit().is_some_and(|m| in_subset(m));
            (candidate, if scaled { weight * factor } else { weight })
        })
        .collect()
}

/// Append salvage rows for another faction's tables.
///
/// Salvage takes `pct` percent of the final table, split across the source
/// factions by their declared shares.
#[must_use]
pub fn add_salvage(mut entries: Vec<Weighted>, salvage: &SalvageSources) -> Vec<Weighted> {
    if salvage.pct <= 0 || salvage.pct >= 100 {
        return entries;
    }
    let total = unit_total(&entries, |_| true);
    let shares: i32 = salvage.sources.values().filter(|s| **s > 0).sum();
    if total <= 0.0 || shares <= 0 {
        return entries;
    }
    let pct = f64::from(salvage.pct);
    let salvage_weight = pct / (100.0 - pct) * total;
    for (faction, share) in &salvage.sources {
        if *share > 0 {
            entries.push((
                TableCandidate::Salvage(faction.clone()),
                salvage_weight * f64::from(*share) / f64::from(shares),
            ));
        }
    }
    entries
}

/// Convert working weights to integers.
///
/// A single multiplier raises the smallest positive weight to at least
/// `min_weight`, unless that would push the largest past `max_weight`, in
/// which case the largest is pinned to `max_weight`. Rows rounding to zero
/// are dropped.
#[must_use]
pub fn rescale(entries: Vec<Weighted>, bounds: RescaleBounds) -> Vec<TableEntry> {
    let positive = entries.iter().map(|(_, w)| *w).filter(|w| *w > 0.0);
    let (min, max) = positive.fold((f64::INFINITY, 0.0_f64), |(lo, hi), w| {
        (lo.min(w), hi.max(w))
    });
    if max <= 0.0 {
        return Vec::new();
    }
    let mut multiplier = 1.0;
    if min < bounds.min_weight {
        multiplier = bounds.min_weight / min;
    }
    if max * multiplier > bounds.max_weight {
        multiplier = bounds.max_weight / max;
    }

    entries
        .into_iter()
        .filter_map(|(candidate, weight)| {
            let scaled = (weight * multiplier).round();
            (scaled >= 1.0).then(|| TableEntry {
                weight: scaled as u32,
                candidate,
            })
        })
        .collect()
}
