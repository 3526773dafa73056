use std::time::Duration;

use regex::Regex;
use serde_json::{json, Value};

use crate::core::{LongTable, Result};
use crate::utils::error::EtlError;

/// Values substituted into the report template's `{{TOKEN}}` placeholders.
pub struct ReportContext {
    pub title: String,
    pub generated_at: String,
    pub baseline: Option<String>,
    pub layout: Value,
    pub tables: Value,
}

/// 下載報表模板，非 2xx 回應一律視為失敗
pub async fn fetch_template(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String> {
    tracing::debug!("🔍 Downloading report template from {}", url);
    let response = client.get(url).timeout(timeout).send().await?;

    if !response.status().is_success() {
        return Err(EtlError::ReportError {
            message: format!(
                "template download from {} failed with status {}",
                url,
                response.status()
            ),
        });
    }

    Ok(response.text().await?)
}

/// 以正規表示式把 `{{TOKEN}}` 佔位符換成報表內容
///
/// Unknown tokens stay in place so templates can carry their own markers.
pub fn render(template: &str, context: &ReportContext) -> Result<String> {
    if !template.contains("{{TABLES_JSON}}") {
        return Err(EtlError::ReportError {
            message: "template has no {{TABLES_JSON}} placeholder".to_string(),
        });
    }

    let tables_json = serde_json::to_string(&context.tables)?;
    let layout_json = serde_json::to_string(&context.layout)?;

    let pattern = Regex::new(r"\{\{([A-Z_]+)\}\}").map_err(|e| EtlError::ReportError {
        message: format!("invalid placeholder pattern: {}", e),
    })?;

    let rendered = pattern.replace_all(template, |caps: &regex::Captures| match &caps[1] {
        "TITLE" => context.title.clone(),
        "GENERATED_AT" => context.generated_at.clone(),
        "BASELINE" => context.baseline.clone().unwrap_or_default(),
        "LAYOUT_JSON" => layout_json.clone(),
        "TABLES_JSON" => tables_json.clone(),
        _ => caps[0].to_string(),
    });

    Ok(rendered.into_owned())
}

/// 組出要嵌入模板的表格 JSON：鍵為表名，值為含標題列的二維陣列
pub fn tables_json(tables: &[LongTable], diffs: &[LongTable], filter: &[String]) -> Value {
    let mut map = serde_json::Map::new();

    for table in tables.iter().chain(diffs.iter()) {
        if !table_selected(&table.name, filter) {
            continue;
        }
        let mut grid: Vec<Value> = Vec::with_capacity(table.rows.len() + 1);
        grid.push(json!(table.columns));
        for row in &table.rows {
            grid.push(json!(row));
        }
        map.insert(table.name.clone(), Value::Array(grid));
    }

    Value::Object(map)
}

/// A filter entry selects the named table and its `_diff` companion.
fn table_selected(name: &str, filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    filter.iter().any(|entry| {
        entry.as_str() == name
            || name
                .strip_suffix("_diff")
                .is_some_and(|stem| entry.as_str() == stem)
    })
}
