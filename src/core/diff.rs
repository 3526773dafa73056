use std::collections::HashMap;

use crate::core::{LongTable, Result};
use crate::utils::error::EtlError;

/// Columns that never take part in row matching: the raw scenario label and
/// export date differ between files even for identical data points, and
/// scen_name is the axis we are comparing across.
const NON_KEY_COLUMNS: [&str; 3] = ["scenario", "date", "scen_name"];

/// 計算各情境相對基準情境的差異表
///
/// For every table this produces a `<name>_diff` companion holding, per
/// non-baseline scenario, `scenario value - baseline value` for each distinct
/// key. A key missing on either side counts as zero there.
pub fn diff_tables(
    tables: &[LongTable],
    scenarios: &[String],
    baseline: &str,
) -> Result<Vec<LongTable>> {
    let others: Vec<&String> = scenarios.iter().filter(|s| s.as_str() != baseline).collect();
    if others.is_empty() {
        tracing::warn!(
            "⚠️ No scenarios besides the baseline '{}', skipping diff tables",
            baseline
        );
        return Ok(Vec::new());
    }

    let mut diffs = Vec::with_capacity(tables.len());
    for table in tables {
        diffs.push(diff_table(table, &others, baseline)?);
    }
    Ok(diffs)
}

/// Per-scenario totals keyed by the non-value, non-scenario columns.
/// Insertion order is kept so output rows stay deterministic.
#[derive(Default)]
struct ScenarioTotals {
    totals: HashMap<Vec<String>, f64>,
    order: Vec<Vec<String>>,
}

impl ScenarioTotals {
    fn add(&mut self, key: Vec<String>, value: f64) {
        if !self.totals.contains_key(&key) {
            self.order.push(key.clone());
        }
        *self.totals.entry(key).or_insert(0.0) += value;
    }

    fn get(&self, key: &[String]) -> f64 {
        self.totals.get(key).copied().unwrap_or(0.0)
    }
}

fn diff_table(table: &LongTable, others: &[&String], baseline: &str) -> Result<LongTable> {
    let value_idx =
        table
            .column_index("value")
            .ok_or_else(|| EtlError::TransformationError {
                stage: "diff".to_string(),
                details: format!("table '{}' has no value column", table.name),
            })?;
    let scen_idx =
        table
            .column_index("scen_name")
            .ok_or_else(|| EtlError::TransformationError {
                stage: "diff".to_string(),
                details: format!("table '{}' has no scen_name column", table.name),
            })?;

    let key_indices: Vec<usize> = (0..table.columns.len())
        .filter(|&i| i != value_idx && !NON_KEY_COLUMNS.contains(&table.columns[i].as_str()))
        .collect();

    let mut per_scenario: HashMap<&str, ScenarioTotals> = HashMap::new();
    for row in &table.rows {
        let key: Vec<String> = key_indices.iter().map(|&i| row[i].clone()).collect();
        let value = parse_value(&row[value_idx], &table.name)?;
        per_scenario
            .entry(row[scen_idx].as_str())
            .or_default()
            .add(key, value);
    }

    let empty = ScenarioTotals::default();
    let base = per_scenario.get(baseline).unwrap_or(&empty);
    if base.order.is_empty() && !table.rows.is_empty() {
        tracing::warn!(
            "⚠️ Table '{}' has no rows for baseline '{}'",
            table.name,
            baseline
        );
    }

    let mut out_columns = vec!["scen_name".to_string()];
    out_columns.extend(key_indices.iter().map(|&i| table.columns[i].clone()));
    out_columns.push("value".to_string());

    let mut out_rows = Vec::new();
    for scenario in others {
        let scen = per_scenario.get(scenario.as_str()).unwrap_or(&empty);

        // scenario keys first in their own order, then keys only the baseline has
        let mut keys: Vec<&Vec<String>> = scen.order.iter().collect();
        keys.extend(
            base.order
                .iter()
                .filter(|key| !scen.totals.contains_key(*key)),
        );

        for key in keys {
            let delta = scen.get(key) - base.get(key);
            let mut row = Vec::with_capacity(key.len() + 2);
            row.push(scenario.to_string());
            row.extend(key.iter().cloned());
            row.push(delta.to_string());
            out_rows.push(row);
        }
    }

    Ok(LongTable {
        name: format!("{}_diff", table.name),
        columns: out_columns,
        rows: out_rows,
    })
}

/// Empty cells mean "no data" and count as zero, anything else must parse.
fn parse_value(raw: &str, table: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| EtlError::TransformationError {
            stage: "diff".to_string(),
            details: format!(
                "table '{}' column 'value': '{}' is not numeric",
                table, raw
            ),
        })
}
