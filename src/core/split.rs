use crate::core::{QueryBlock, QueryExport, Result};
use crate::utils::error::EtlError;

/// 將單一情境的匯出串流切成多個具名表格區塊
///
/// The export is one header-less CSV stream. A record with a single field is
/// a sentinel naming the table that follows; the next record is that table's
/// header and data rows run until the next sentinel or end of file.
pub fn split_query_export(export: &QueryExport) -> Result<Vec<QueryBlock>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(export.raw.as_slice());

    let mut blocks: Vec<QueryBlock> = Vec::new();
    let mut current: Option<QueryBlock> = None;
    let mut leading_rows = 0usize;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();

        if fields.len() == 1 {
            if fields[0].trim().is_empty() {
                tracing::debug!("Skipping blank row at line {}", line);
                continue;
            }
            if let Some(block) = current.take() {
                finish_block(block, export, &mut blocks)?;
            }
            current = Some(QueryBlock {
                name: fields[0].clone(),
                header: Vec::new(),
                rows: Vec::new(),
                line,
            });
            continue;
        }

        match &mut current {
            None => leading_rows += 1,
            Some(block) if block.header.is_empty() => block.header = fields,
            Some(block) => block.rows.push(fields),
        }
    }

    if let Some(block) = current.take() {
        finish_block(block, export, &mut blocks)?;
    }

    if leading_rows > 0 {
        tracing::warn!(
            "⚠️ Ignored {} rows before the first table name in scenario '{}'",
            leading_rows,
            export.scenario
        );
    }

    if blocks.is_empty() {
        return Err(EtlError::QueryParseError {
            scenario: export.scenario.clone(),
            line: 0,
            message: "no tables found in export".to_string(),
        });
    }

    tracing::debug!(
        "Split {} table blocks from scenario '{}'",
        blocks.len(),
        export.scenario
    );
    Ok(blocks)
}

fn finish_block(
    block: QueryBlock,
    export: &QueryExport,
    blocks: &mut Vec<QueryBlock>,
) -> Result<()> {
    if block.header.is_empty() {
        return Err(EtlError::QueryParseError {
            scenario: export.scenario.clone(),
            line: block.line,
            message: format!("table '{}' has no header row", block.name),
        });
    }
    blocks.push(block);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export(scenario: &str, content: &str) -> QueryExport {
        QueryExport {
            scenario: scenario.to_string(),
            raw: content.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_split_two_tables() {
        let content = "\
elec gen by gen tech
scenario,region,2020,2025,Units
core,2023-03-07,USA,1.5,2.5,EJ
core,2023-03-07,CAN,0.5,0.7,EJ
land allocation
scenario,region,2020,2025,Units
core,2023-03-07,USA,10,11,thous km2
";
        let blocks = split_query_export(&export("core", content)).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "elec gen by gen tech");
        assert_eq!(
            blocks[0].header,
            vec!["scenario", "region", "2020", "2025", "Units"]
        );
        assert_eq!(blocks[0].rows.len(), 2);
        assert_eq!(blocks[0].rows[0].len(), 6);
        assert_eq!(blocks[1].name, "land allocation");
        assert_eq!(blocks[1].line, 5);
        assert_eq!(blocks[1].rows.len(), 1);
    }

    #[test]
    fn test_rows_before_first_sentinel_ignored() {
        let content = "\
stray,row,that,belongs,to,nothing
elec gen by gen tech
scenario,region,2020,Units
core,2023-03-07,USA,1.5,EJ
";
        let blocks = split_query_export(&export("core", content)).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].rows.len(), 1);
    }

    #[test]
    fn test_sentinel_without_header_rejected() {
        let content = "\
elec gen by gen tech
land allocation
scenario,region,2020,Units
core,2023-03-07,USA,10,thous km2
";
        let err = split_query_export(&export("core", content)).unwrap_err();
        match err {
            EtlError::QueryParseError { scenario, line, message } => {
                assert_eq!(scenario, "core");
                assert_eq!(line, 1);
                assert!(message.contains("elec gen by gen tech"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_sentinel_rejected() {
        let content = "\
elec gen by gen tech
scenario,region,2020,Units
core,2023-03-07,USA,1.5,EJ
land allocation
";
        let err = split_query_export(&export("core", content)).unwrap_err();
        assert!(matches!(err, EtlError::QueryParseError { line: 4, .. }));
    }

    #[test]
    fn test_empty_export_rejected() {
        let err = split_query_export(&export("core", "")).unwrap_err();
        assert!(matches!(err, EtlError::QueryParseError { .. }));
    }

    #[test]
    fn test_block_without_data_rows_is_legal() {
        let content = "\
elec gen by gen tech
scenario,region,2020,Units
";
        let blocks = split_query_export(&export("core", content)).unwrap();

        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].rows.is_empty());
    }

    #[test]
    fn test_duplicate_table_names_kept_in_order() {
        let content = "\
elec gen by gen tech
scenario,region,2020,Units
core,2023-03-07,USA,1.5,EJ
elec gen by gen tech
scenario,region,2020,Units
core,2023-03-07,CAN,0.5,EJ
";
        let blocks = split_query_export(&export("core", content)).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, blocks[1].name);
        assert_eq!(blocks[1].rows[0][2], "CAN");
    }

    #[test]
    fn test_blank_lines_between_blocks_skipped() {
        let content = "\
elec gen by gen tech
scenario,region,2020,Units
core,2023-03-07,USA,1.5,EJ

land allocation
scenario,region,2020,Units
core,2023-03-07,USA,10,thous km2
";
        let blocks = split_query_export(&export("core", content)).unwrap();
        assert_eq!(blocks.len(), 2);
    }
}
