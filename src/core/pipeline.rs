use crate::config::run_config::RunConfig;
use crate::core::report::{self, ReportContext};
use crate::core::{diff, normalize, reshape, split};
use crate::core::{LongTable, Pipeline, QueryExport, Result, Storage, TransformResult};
use crate::utils::error::EtlError;
use reqwest::Client;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use zip::write::{FileOptions, ZipWriter};

/// 查詢匯出處理管線：讀檔 → 切表/正規化/寬轉長 → 差異 → 輸出
pub struct QueryPipeline<S: Storage> {
    storage: S,
    config: RunConfig,
    client: Client,
}

impl<S: Storage> QueryPipeline<S> {
    pub fn new(storage: S, config: RunConfig) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }

    async fn render_report(&self, result: &TransformResult) -> Result<String> {
        let report_config =
            self.config
                .report
                .as_ref()
                .ok_or_else(|| EtlError::ReportError {
                    message: "report requested but no [report] section configured".to_string(),
                })?;

        // 本地模板優先，否則從 template_url 下載
        let template = match &report_config.template_file {
            Some(path) => {
                tracing::debug!("Reading report template from {}", path);
                let raw = self.storage.read_file(path).await?;
                String::from_utf8(raw).map_err(|e| EtlError::ReportError {
                    message: format!("template file '{}' is not valid UTF-8: {}", path, e),
                })?
            }
            None => {
                let url = report_config
                    .template_url
                    .as_ref()
                    .ok_or_else(|| EtlError::ReportError {
                        message: "report enabled but neither template_file nor template_url is set"
                            .to_string(),
                    })?;
                let timeout = Duration::from_secs(report_config.timeout_seconds.unwrap_or(30));
                report::fetch_template(&self.client, url, timeout).await?
            }
        };

        let filter = report_config.tables.clone().unwrap_or_default();
        let layout = match &report_config.layout {
            Some(layout) => json!({
                "rows": layout.rows.clone().unwrap_or_default(),
                "cols": layout.cols.clone().unwrap_or_default(),
            }),
            None => json!({}),
        };

        let context = ReportContext {
            title: report_config
                .title
                .clone()
                .unwrap_or_else(|| self.config.run.name.clone()),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            baseline: self.config.baseline().map(|b| b.to_string()),
            layout,
            tables: report::tables_json(&result.tables, &result.diffs, &filter),
        };

        report::render(&template, &context)
    }

    async fn copy_aux_files(&self, output_path: &str) -> Result<()> {
        let files = match self.config.report.as_ref().and_then(|r| r.copy_files.as_ref()) {
            Some(files) => files,
            None => return Ok(()),
        };

        for source in files {
            let base_name = Path::new(source)
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| EtlError::ReportError {
                    message: format!("copy_files entry '{}' has no file name", source),
                })?;
            let data = self.storage.read_file(source).await?;
            self.storage
                .write_file(&format!("{}/{}", output_path, base_name), &data)
                .await?;
            tracing::debug!("Copied {} into {}", source, output_path);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for QueryPipeline<S> {
    async fn extract(&self) -> Result<Vec<QueryExport>> {
        let mut exports = Vec::with_capacity(self.config.scenarios.len());

        for scenario in &self.config.scenarios {
            let file = scenario.file_name();
            tracing::info!("📥 Gathering results from scenario '{}'", scenario.name);
            tracing::debug!("Reading query export file: {}", file);

            let raw = self.storage.read_file(&file).await?;
            exports.push(QueryExport {
                scenario: scenario.name.clone(),
                raw,
            });
        }

        Ok(exports)
    }

    async fn transform(&self, exports: Vec<QueryExport>) -> Result<TransformResult> {
        let mut tables: Vec<LongTable> = Vec::new();

        for export in &exports {
            let blocks = split::split_query_export(export)?;
            tracing::debug!(
                "Scenario '{}' contains {} table blocks",
                export.scenario,
                blocks.len()
            );

            for block in blocks {
                if !self.config.table_included(&block.name) {
                    tracing::debug!("Skipping table '{}' (not in include list)", block.name);
                    continue;
                }
                let table = normalize::normalize_block(block, self.config.drop_columns())?;
                let fragment = reshape::melt_table(table, &export.scenario)?;
                reshape::append_aligned(&mut tables, fragment);
            }
        }

        let diffs = match self.config.baseline() {
            Some(baseline) => {
                tracing::info!("📊 Computing differences against baseline '{}'", baseline);
                diff::diff_tables(&tables, &self.config.scenario_names(), baseline)?
            }
            None => Vec::new(),
        };

        Ok(TransformResult { tables, diffs })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output_path = self.config.output_path();

        if result.tables.is_empty() {
            tracing::warn!("⚠️ No tables selected, nothing to write");
        }

        let mut written: Vec<(String, Vec<u8>)> = Vec::new();
        for table in result.tables.iter().chain(result.diffs.iter()) {
            let file_name = format!("{}.csv", sanitize_table_filename(&table.name));
            let data = encode_csv(table)?;

            tracing::info!("📤 Outputting {}", table.name);
            self.storage
                .write_file(&format!("{}/{}", output_path, file_name), &data)
                .await?;
            written.push((file_name, data));
        }

        if self.config.report_enabled() {
            let html = self.render_report(&result).await?;
            self.storage
                .write_file(&format!("{}/report.html", output_path), html.as_bytes())
                .await?;
            tracing::info!("📋 Report written to {}/report.html", output_path);

            self.copy_aux_files(&output_path).await?;
            written.push(("report.html".to_string(), html.into_bytes()));
        }

        if let Some(compression) = self.config.load.as_ref().and_then(|l| l.compression.as_ref()) {
            if compression.enabled {
                let include_report = compression.include_report.unwrap_or(true);
                let entries: Vec<(&str, &[u8])> = written
                    .iter()
                    .filter(|(name, _)| include_report || name != "report.html")
                    .map(|(name, data)| (name.as_str(), data.as_slice()))
                    .collect();

                tracing::debug!("Creating ZIP bundle with {} files", entries.len());
                let zip_data = bundle(&entries)?;
                self.storage
                    .write_file(
                        &format!("{}/{}", output_path, compression.filename),
                        &zip_data,
                    )
                    .await?;
                tracing::info!("📦 Bundle written to {}/{}", output_path, compression.filename);
            }
        }

        Ok(output_path)
    }
}

/// 把長表編碼成帶標題列的 CSV 位元組
fn encode_csv(table: &LongTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::TransformationError {
            stage: "load".to_string(),
            details: format!("failed to finish CSV for table '{}': {}", table.name, e),
        })
}

/// Table names become file names, so path separators and NUL are replaced.
fn sanitize_table_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect()
}

/// 打包所有輸出檔成單一 ZIP
fn bundle(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, data) in entries {
        zip.start_file::<_, ()>(*name, FileOptions::default())?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
