//! Availability ratings: how common a unit is for one faction in one era.
//!
//! Availability lives on a logarithmic scale where every two points double
//! the sampling weight (`weight = 2^(av/2)`). Ratings are parsed from
//! compact codes of the form `FACTION:VALUE[:START_YEAR]`:
//!
//! ```text
//! FS:6          plain availability 6
//! FS:6+         availability 6, rarer in poorly equipped commands
//! DC:5-         availability 5, rarer in well equipped commands
//! CC:A=7!B=6    explicit value per equipment rating level
//! LA:4:3039     availability 4, not before 3039
//! ```

use std::collections::BTreeMap;

/// Faction key used for records that apply to any faction.
pub const GENERAL_FACTION: &str = "General";

/// Commonness of one unit (chassis or model) for one faction in one era.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRating {
    unit_key: String,
    faction: String,
    era: i32,
    availability: f64,
    rating_adjustment: i8,
    level_overrides: BTreeMap<String, i32>,
    start_year: i32,
}

impl AvailabilityRating {
    /// Create a rating with a plain availability value.
    #[must_use]
    pub fn new(unit_key: impl Into<String>, faction: impl Into<String>, era: i32, availability: f64) -> Self {
        Self {
            unit_key: unit_key.into(),
            faction: faction.into(),
            era,
            availability,
            rating_adjustment: 0,
            level_overrides: BTreeMap::new(),
            start_year: era,
        }
    }

    /// Set the rating adjustment (clamped to -1..=1).
    #[must_use]
    pub fn with_rating_adjustment(mut self, adjustment: i8) -> Self {
        self.rating_adjustment = adjustment.clamp(-1, 1);
        self
    }

    /// Set the first year the record applies.
    #[must_use]
    pub fn with_start_year(mut self, year: i32) -> Self {
        self.start_year = year;
        self
    }

    /// Set per-level overrides. A positive override replaces the scalar
    /// availability with the maximum override.
    #[must_use]
    pub fn with_level_overrides(mut self, overrides: BTreeMap<String, i32>) -> Self {
        if let Some(max) = overrides.values().copied().filter(|v| *v > 0).max() {
            self.availability = f64::from(max);
        }
        self.level_overrides = overrides;
        self
    }

    /// Parse a single availability code for `unit_key` in `era`.
    ///
    /// Malformed numbers are logged and read as zero, so one bad entry
    /// never aborts loading a data set.
    #[must_use]
    pub fn parse(unit_key: &str, era: i32, code: &str) -> Self {
        let mut fields = code.trim().split(':');
        let faction = fields.next().unwrap_or_default().trim();
        let faction = if faction.is_empty() {
            GENERAL_FACTION
        } else {
            faction
        };
        let value = fields.next().unwrap_or_default().trim();
        let mut rating = Self::new(unit_key, faction, era, 0.0);

        if value.contains('=') {
            let mut overrides = BTreeMap::new();
            for level in value.split('!') {
                let Some((name, av)) = level.split_once('=') else {
                    tracing::warn!("Malformed rating override '{level}' for {unit_key} in {era}");
                    continue;
                };
                overrides.insert(name.trim().to_string(), parse_int(av, unit_key, era));
            }
            rating = rating.with_level_overrides(overrides);
        } else if let Some(av) = value.strip_suffix('+') {
            rating.availability = f64::from(parse_int(av, unit_key, era));
            rating.rating_adjustment = 1;
        } else if let Some(av) = value.strip_suffix('-') {
            rating.availability = f64::from(parse_int(av, unit_key, era));
            rating.rating_adjustment = -1;
        } else {
            rating.availability = f64::from(parse_int(value, unit_key, era));
        }

        if let Some(year) = fields.next() {
            rating.start_year = parse_int(year, unit_key, era);
        }
        rating
    }

    /// Parse a comma separated list of codes.
    #[must_use]
    pub fn parse_list(unit_key: &str, era: i32, codes: &str) -> Vec<Self> {
        codes
            .split(',')
            .filter(|c| !c.trim().is_empty())
            .map(|c| Self::parse(unit_key, era, c))
            .collect()
    }

    /// Unit key (chassis key or model key) this record describes.
    #[must_use]
    pub fn unit_key(&self) -> &str {
        &self.unit_key
    }

    /// Faction key this record belongs to.
    #[must_use]
    pub fn faction(&self) -> &str {
        &self.faction
    }

    /// Era this record was declared in.
    #[must_use]
    pub const fn era(&self) -> i32 {
        self.era
    }

    /// First year the record applies.
    #[must_use]
    pub const fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Raw availability, before any rating adjustment.
    #[must_use]
    pub const fn availability(&self) -> f64 {
        self.availability
    }

    /// Rating adjustment: -1, 0 or +1.
    #[must_use]
    pub const fn rating_adjustment(&self) -> i8 {
        self.rating_adjustment
    }

    /// Per-level overrides, possibly empty.
    #[must_use]
    pub fn level_overrides(&self) -> &BTreeMap<String, i32> {
        &self.level_overrides
    }

    /// Availability for a rating index in a system of `num_levels` levels.
    ///
    /// `+` records lose one point per level below the top; `-` records lose
    /// one point per level above the bottom.
    #[must_use]
    pub fn adjust_for_rating(&self, rating_index: usize, num_levels: usize) -> f64 {
        let shift = match self.rating_adjustment {
            0 => 0,
            adj if adj > 0 => num_levels.saturating_sub(1).saturating_sub(rating_index),
            _ => rating_index,
        };
        self.availability - shift as f64
    }

    /// Availability for a rating, looking at per-level overrides first.
    ///
    /// With no usable rating (`rating_index` is `None`) the raw value is
    /// returned.
    #[must_use]
    pub fn availability_for(&self, rating_index: Option<usize>, levels: &[String]) -> f64 {
        let Some(index) = rating_index else {
            return self.availability;
        };
        if let Some(value) = levels
            .get(index)
            .and_then(|level| self.level_overrides.get(level))
        {
            return f64::from(*value);
        }
        self.adjust_for_rating(index, levels.len())
    }

    /// Linear sampling weight for an availability value.
    #[must_use]
    pub fn calc_weight(av: f64) -> f64 {
        (av / 2.0).exp2()
    }

    /// Availability value for a linear sampling weight.
    #[must_use]
    pub fn calc_av_rating(weight: f64) -> f64 {
        2.0 * weight.log2()
    }

    /// Merge several records into one by averaging their linear weights.
    ///
    /// Rating adjustments are averaged and rounded away from zero. The
    /// merged start year is the earliest of the inputs. Returns `None` when
    /// `ratings` is empty.
    #[must_use]
    pub fn merge(faction: &str, ratings: &[Self]) -> Option<Self> {
        let first = ratings.first()?;
        let count = ratings.len() as f64;
        let mean_weight = ratings
            .iter()
            .map(|r| Self::calc_weight(r.availability))
            .sum::<f64>()
            / count;
        let mean_adjustment = ratings
            .iter()
            .map(|r| f64::from(r.rating_adjustment))
            .sum::<f64>()
            / count;
        let rating_adjustment = (if mean_adjustment > 0.0 {
            mean_adjustment.ceil()
        } else {
            mean_adjustment.floor()
        }) as i8;
        let start_year = ratings
            .iter()
            .map(|r| r.start_year)
            .min()
            .unwrap_or(first.start_year);

        Some(Self {
            unit_key: first.unit_key.clone(),
            faction: faction.to_string(),
            era: first.era,
            availability: Self::calc_av_rating(mean_weight),
            rating_adjustment,
            level_overrides: BTreeMap::new(),
            start_year,
        })
    }
}

fn parse_int(text: &str, unit_key: &str, era: i32) -> i32 {
    text.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("Malformed availability value '{text}' for {unit_key} in {era}");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Vec<String> {
        ["F", "D", "C", "B", "A"].iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_plain_code() {
        let r = AvailabilityRating::parse("Atlas[Mek]", 3025, "FS:6");
        assert_eq!(r.faction(), "FS");
        assert!((r.availability() - 6.0).abs() < f64::EPSILON);
        assert_eq!(r.rating_adjustment(), 0);
        assert_eq!(r.start_year(), 3025);
    }

    #[test]
    fn test_parse_adjustment_and_start_year() {
        let plus = AvailabilityRating::parse("x", 3050, "CC:5+:3052");
        assert_eq!(plus.rating_adjustment(), 1);
        assert_eq!(plus.start_year(), 3052);

        let minus = AvailabilityRating::parse("x", 3050, "DC:4-");
        assert_eq!(minus.rating_adjustment(), -1);
        assert!((minus.availability() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_overrides_use_max_as_fallback() {
        let r = AvailabilityRating::parse("x", 3025, "CC:A=7!B=6!C=2");
        assert_eq!(r.level_overrides().len(), 3);
        assert!((r.availability() - 7.0).abs() < f64::EPSILON);
        let lv = levels();
        assert!((r.availability_for(Some(3), &lv) - 6.0).abs() < f64::EPSILON);
        // "D" has no override: fall back to the scalar (max) value.
        assert!((r.availability_for(Some(1), &lv) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_code_reads_as_zero() {
        let r = AvailabilityRating::parse("x", 3025, "FS:lots");
        assert_eq!(r.availability(), 0.0);
        let r = AvailabilityRating::parse("x", 3025, "FS:3:soon");
        assert_eq!(r.start_year(), 0);
    }

    #[test]
    fn test_parse_list() {
        let list = AvailabilityRating::parse_list("x", 3025, "FS:6, LA:5+ ,General:2,");
        assert_eq!(list.len(), 3);
        assert_eq!(list[2].faction(), GENERAL_FACTION);
    }

    #[test]
    fn test_plus_adjustment_penalizes_low_ratings() {
        let r = AvailabilityRating::new("x", "FS", 3025, 6.0).with_rating_adjustment(1);
        assert!((r.adjust_for_rating(4, 5) - 6.0).abs() < f64::EPSILON);
        assert!((r.adjust_for_rating(0, 5) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_minus_adjustment_penalizes_high_ratings() {
        let r = AvailabilityRating::new("x", "FS", 3025, 6.0).with_rating_adjustment(-1);
        assert!((r.adjust_for_rating(0, 5) - 6.0).abs() < f64::EPSILON);
        assert!((r.adjust_for_rating(4, 5) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weight_round_trip() {
        for av in [-4.0, 0.0, 1.0, 2.5, 6.0, 10.0] {
            let back = AvailabilityRating::calc_av_rating(AvailabilityRating::calc_weight(av));
            assert!((back - av).abs() < 1e-9);
        }
        assert!((AvailabilityRating::calc_weight(2.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_merge_averages_linear_weights() {
        let a = AvailabilityRating::new("x", "FS", 3025, 2.0);
        let b = AvailabilityRating::new("x", "LA", 3025, 6.0);
        let merged = AvailabilityRating::merge("FC", &[a, b]).expect("non-empty");
        // Weights 2 and 8 average to 5, not to the weight of av 4 (4).
        let weight = AvailabilityRating::calc_weight(merged.availability());
        assert!((weight - 5.0).abs() < 1e-9);
        assert!((merged.availability() - 4.0).abs() > 0.1);
        assert_eq!(merged.faction(), "FC");
    }

    #[test]
    fn test_merge_rounds_adjustment_away_from_zero() {
        let a = AvailabilityRating::new("x", "A", 3025, 4.0).with_rating_adjustment(1);
        let b = AvailabilityRating::new("x", "B", 3025, 4.0);
        let c = AvailabilityRating::new("x", "C", 3025, 4.0).with_start_year(3020);
        let merged = AvailabilityRating::merge("M", &[a.clone(), b.clone(), c]).expect("non-empty");
        assert_eq!(merged.rating_adjustment(), 1);
        assert_eq!(merged.start_year(), 3020);

        let d = AvailabilityRating::new("x", "D", 3025, 4.0).with_rating_adjustment(-1);
        let merged = AvailabilityRating::merge("M", &[a, d]).expect("non-empty");
        assert_eq!(merged.rating_adjustment(), 0);
        assert!(AvailabilityRating::merge("M", &[]).is_none());
    }
}
