//! Printable and JSON reports of generated tables and forces.

use std::fmt::Write as _;

use forcegen_core::force::{GeneratedForce, GeneratedUnit};
use forcegen_core::parameters::Parameters;
use forcegen_core::unit_kind::{UnitType, WeightClass};
use forcegen_core::weighting::TableEntry;
use serde::Serialize;

/// One row of a table report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Unit key or salvage label.
    pub label: String,
    /// Sampling weight.
    pub weight: u32,
    /// Share of the table's total weight, in percent.
    pub share: f64,
    /// Unit details; `None` for salvage rows.
    pub unit: Option<GeneratedUnit>,
}

/// A generated table together with the query that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    /// The query.
    pub query: Parameters,
    /// Sum of all row weights.
    pub total_weight: u64,
    /// Rows, heaviest first.
    pub rows: Vec<TableRow>,
}

impl TableReport {
    /// Build a report from a generated table.
    #[must_use]
    pub fn new(query: Parameters, entries: &[TableEntry]) -> Self {
        let total_weight: u64 = entries.iter().map(|e| u64::from(e.weight)).sum();
        let mut rows: Vec<TableRow> = entries
            .iter()
            .map(|e| TableRow {
                label: e.candidate.label(),
                weight: e.weight,
                share: if total_weight == 0 {
                    0.0
                } else {
                    f64::from(e.weight) * 100.0 / total_weight as f64
                },
                unit: e.candidate.unit().map(|m| GeneratedUnit::from(m.as_ref())),
            })
            .collect();
        rows.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.label.cmp(&b.label)));
        Self {
            query,
            total_weight,
            rows,
        }
    }

    /// Plain text rendering, one row per line.
    #[must_use]
    pub fn render_text(&self) -> String {
        let q = &self.query;
        let mut out = format!("{} {} {}", q.faction, q.unit_type, q.year);
        if let Some(rating) = &q.rating {
            let _ = write!(out, " ({rating})");
        }
        out.push('\n');
        if self.rows.is_empty() {
            out.push_str("  (empty table)\n");
        }
        for row in &self.rows {
            let _ = writeln!(out, "  {:>5} {:>6.2}%  {}", row.weight, row.share, row.label);
        }
        out
    }
}

/// Indented text rendering of a force tree.
#[must_use]
pub fn render_force(force: &GeneratedForce) -> String {
    let mut out = String::new();
    write_force(&mut out, force, 0);
    out
}

fn write_force(out: &mut String, force: &GeneratedForce, depth: usize) {
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{indent}{}", force.name);
    if let Some(formation) = &force.formation {
        let _ = write!(out, " [{formation}]");
    }
    out.push('\n');
    for unit in &force.units {
        let _ = writeln!(out, "{indent}  - {} ({:?})", unit.key, unit.weight_class);
    }
    for child in &force.subforces {
        write_force(out, child, depth + 1);
    }
}

/// Parse a unit type by name, ignoring case, spaces and dashes.
///
/// Accepts both the variant name (`AeroSpaceFighter`) and the display name
/// (`Conventional Fighter`).
pub fn parse_unit_type(text: &str) -> Result<UnitType, String> {
    let wanted = normalize(text);
    UnitType::ALL
        .into_iter()
        .find(|t| normalize(t.display_name()) == wanted || normalize(&format!("{t:?}")) == wanted)
        .ok_or_else(|| format!("unknown unit type '{text}'"))
}

/// Parse a weight class by name, ignoring case, spaces and dashes.
pub fn parse_weight_class(text: &str) -> Result<WeightClass, String> {
    let wanted = normalize(text);
    WeightClass::ALL
        .into_iter()
        .find(|w| normalize(&format!("{w:?}")) == wanted)
        .ok_or_else(|| format!("unknown weight class '{text}'"))
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use forcegen_test_utils::fixtures::sample_generator;

    #[test]
    fn test_table_report_shares_sum_to_hundred() {
        let mut gen = sample_generator();
        let query = Parameters::new("FS", UnitType::Mek, 3025).with_rating("C");
        let table = gen.generate_table(&query);
        let report = TableReport::new(query, &table);
        assert_eq!(report.rows.len(), table.len());
        let total: f64 = report.rows.iter().map(|r| r.share).sum();
        assert!((total - 100.0).abs() < 1e-6);
        assert!(report.rows.windows(2).all(|w| w[0].weight >= w[1].weight));
    }

    #[test]
    fn test_salvage_rows_have_no_unit() {
        let mut gen = sample_generator();
        let query = Parameters::new("FS", UnitType::Mek, 3025);
        let table = gen.generate_table(&query);
        let report = TableReport::new(query, &table);
        let salvage = report
            .rows
            .iter()
            .find(|r| r.label == "Salvage: DC")
            .expect("FS takes salvage from DC");
        assert!(salvage.unit.is_none());
        assert!(report.render_text().contains("Salvage: DC"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let mut gen = sample_generator();
        let query = Parameters::new("DC", UnitType::Tank, 3025);
        let table = gen.generate_table(&query);
        let json = serde_json::to_value(TableReport::new(query, &table)).expect("serializable");
        assert_eq!(json["query"]["faction"], "DC");
        assert!(json["rows"].as_array().is_some_and(|rows| !rows.is_empty()));
    }

    #[test]
    fn test_empty_table_renders() {
        let report = TableReport::new(Parameters::new("FS", UnitType::DropShip, 3025), &[]);
        assert_eq!(report.total_weight, 0);
        assert!(report.render_text().contains("(empty table)"));
    }

    #[test]
    fn test_parse_unit_type() {
        assert_eq!(parse_unit_type("mek"), Ok(UnitType::Mek));
        assert_eq!(parse_unit_type("VTOL"), Ok(UnitType::Vtol));
        assert_eq!(parse_unit_type("conventional-fighter"), Ok(UnitType::ConvFighter));
        assert_eq!(parse_unit_type("AeroSpaceFighter"), Ok(UnitType::AeroSpaceFighter));
        assert!(parse_unit_type("Zeppelin").is_err());
    }

    #[test]
    fn test_parse_weight_class() {
        assert_eq!(parse_weight_class("heavy"), Ok(WeightClass::Heavy));
        assert_eq!(parse_weight_class("ultra-light"), Ok(WeightClass::UltraLight));
        assert!(parse_weight_class("huge").is_err());
    }
}
