use crate::core::{LongTable, QueryTable, Result};
use crate::utils::error::EtlError;

/// Year columns are the ones whose name is all digits, e.g. `2020` or `2050`.
fn is_year_column(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}

/// 寬轉長：把年份欄位展開成 year/value 列，並補上 scen_name 欄
///
/// Output columns are the identifier columns in their original order, then
/// `scen_name`, `year`, `value`. Rows come out grouped by year column, every
/// input row for the first year before any row for the second.
pub fn melt_table(table: QueryTable, scenario: &str) -> Result<LongTable> {
    let QueryTable { name, columns, rows } = table;

    for reserved in ["scen_name", "year", "value"] {
        if columns.iter().any(|c| c == reserved) {
            return Err(EtlError::TransformationError {
                stage: "reshape".to_string(),
                details: format!("table '{}' already has a '{}' column", name, reserved),
            });
        }
    }

    let (year_cols, id_cols): (Vec<usize>, Vec<usize>) =
        (0..columns.len()).partition(|&i| is_year_column(&columns[i]));

    if year_cols.is_empty() {
        tracing::warn!("⚠️ Table '{}' has no year columns, nothing to melt", name);
    }

    let mut out_columns: Vec<String> = id_cols.iter().map(|&i| columns[i].clone()).collect();
    out_columns.push("scen_name".to_string());
    out_columns.push("year".to_string());
    out_columns.push("value".to_string());

    let mut out_rows = Vec::with_capacity(rows.len() * year_cols.len());
    for &year in &year_cols {
        for row in &rows {
            let mut out_row: Vec<String> = id_cols.iter().map(|&i| row[i].clone()).collect();
            out_row.push(scenario.to_string());
            out_row.push(columns[year].clone());
            out_row.push(row[year].clone());
            out_rows.push(out_row);
        }
    }

    Ok(LongTable {
        name,
        columns: out_columns,
        rows: out_rows,
    })
}

/// 依表名把各情境的長表串接起來，欄位取聯集對齊，缺格補空字串
///
/// The first fragment for a name fixes the table's position and its column
/// order; later fragments append rows and any new columns go on the end.
pub fn append_aligned(tables: &mut Vec<LongTable>, fragment: LongTable) {
    let existing = match tables.iter_mut().find(|t| t.name == fragment.name) {
        Some(existing) => existing,
        None => {
            tables.push(fragment);
            return;
        }
    };

    for column in &fragment.columns {
        if !existing.columns.contains(column) {
            existing.columns.push(column.clone());
            for row in &mut existing.rows {
                row.push(String::new());
            }
        }
    }

    let index_map: Vec<Option<usize>> = existing
        .columns
        .iter()
        .map(|column| fragment.column_index(column))
        .collect();

    for row in fragment.rows {
        let aligned: Vec<String> = index_map
            .iter()
            .map(|index| index.map(|i| row[i].clone()).unwrap_or_default())
            .collect();
        existing.rows.push(aligned);
    }
}
