use crate::core::{QueryBlock, QueryTable, Result};
use crate::utils::error::EtlError;

/// 正規化區塊：補上 date 欄名、丟棄無名欄位、套用欄位過濾
///
/// The export writes the scenario cell as `<name>,<date>`, so every data row
/// carries one more field than the header declares. Inserting a `date` column
/// name right after the first header column squares the two up again.
pub fn normalize_block(block: QueryBlock, drop_columns: &[String]) -> Result<QueryTable> {
    let QueryBlock {
        name,
        mut header,
        rows,
        ..
    } = block;

    // header always has at least two fields here, single-field rows are sentinels
    header.insert(1, "date".to_string());

    let kept: Vec<(usize, String)> = header
        .into_iter()
        .enumerate()
        .filter(|(_, column)| !column.trim().is_empty())
        .filter(|(_, column)| !drop_columns.contains(column))
        .collect();

    if kept.is_empty() {
        return Err(EtlError::TransformationError {
            stage: "normalize".to_string(),
            details: format!("table '{}' has no columns left after filtering", name),
        });
    }

    let columns: Vec<String> = kept.iter().map(|(_, column)| column.clone()).collect();
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| {
            kept.iter()
                .map(|(i, _)| row.get(*i).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(QueryTable { name, columns, rows })
}
