use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub run: RunInfo,
    pub scenarios: Vec<ScenarioConfig>,
    pub diff: Option<DiffConfig>,
    pub tables: Option<TableConfig>,
    pub filters: Option<FilterConfig>,
    pub load: Option<LoadConfig>,
    pub report: Option<ReportConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub name: String,
    pub description: Option<String>,
    pub results_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    pub baseline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub include: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub drop_columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: Option<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
    pub include_report: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub enabled: Option<bool>,
    pub title: Option<String>,
    pub template_url: Option<String>,
    pub template_file: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub tables: Option<Vec<String>>,
    pub copy_files: Option<Vec<String>>,
    pub layout: Option<LayoutConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub rows: Option<Vec<String>>,
    pub cols: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl ScenarioConfig {
    /// 取得此情境的查詢匯出檔名（未指定時使用預設命名）
    pub fn file_name(&self) -> String {
        self.file
            .clone()
            .unwrap_or_else(|| format!("queryout_{}.csv", self.name))
    }
}

impl RunConfig {
    /// 從 TOML 檔案載入執行配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析執行配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RESULTS_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_non_empty_string("run.name", &self.run.name)?;
        crate::utils::validation::validate_path("run.results_dir", self.results_dir())?;
        crate::utils::validation::validate_path("load.output_path", &self.output_path())?;

        if self.scenarios.is_empty() {
            return Err(EtlError::ConfigValidationError {
                field: "scenarios".to_string(),
                message: "At least one scenario is required".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for scenario in &self.scenarios {
            crate::utils::validation::validate_non_empty_string("scenarios.name", &scenario.name)?;
            if !seen.insert(scenario.name.clone()) {
                return Err(EtlError::ConfigValidationError {
                    field: "scenarios.name".to_string(),
                    message: format!("Duplicate scenario name '{}'", scenario.name),
                });
            }
        }

        let explicit_files: Vec<String> = self
            .scenarios
            .iter()
            .filter_map(|s| s.file.clone())
            .collect();
        crate::utils::validation::validate_file_extensions("scenarios.file", &explicit_files, &["csv"])?;

        if let Some(diff) = &self.diff {
            crate::utils::validation::validate_non_empty_string("diff.baseline", &diff.baseline)?;
            if !seen.contains(&diff.baseline) {
                return Err(EtlError::ConfigValidationError {
                    field: "diff.baseline".to_string(),
                    message: format!(
                        "Baseline '{}' is not one of the configured scenarios",
                        diff.baseline
                    ),
                });
            }
        }

        if let Some(compression) = self.load.as_ref().and_then(|l| l.compression.as_ref()) {
            if compression.enabled {
                crate::utils::validation::validate_non_empty_string(
                    "load.compression.filename",
                    &compression.filename,
                )?;
            }
        }

        if let Some(report) = self.report.as_ref().filter(|_| self.report_enabled()) {
            if report.template_file.is_none() && report.template_url.is_none() {
                return Err(EtlError::MissingConfigError {
                    field: "report.template_url".to_string(),
                });
            }
            if let Some(url) = &report.template_url {
                crate::utils::validation::validate_url("report.template_url", url)?;
            }
            if let Some(file) = &report.template_file {
                crate::utils::validation::validate_path("report.template_file", file)?;
            }
            if let Some(timeout) = report.timeout_seconds {
                crate::utils::validation::validate_range("report.timeout_seconds", timeout, 1, 600)?;
            }
            for file in report.copy_files.iter().flatten() {
                crate::utils::validation::validate_path("report.copy_files", file)?;
            }
        }

        Ok(())
    }

    /// 取得查詢匯出所在的資料夾
    pub fn results_dir(&self) -> &str {
        self.run.results_dir.as_deref().unwrap_or(".")
    }

    /// 取得輸出路徑（預設為 results_dir 下的 csv_results）
    pub fn output_path(&self) -> String {
        self.load
            .as_ref()
            .and_then(|l| l.output_path.clone())
            .unwrap_or_else(|| "csv_results".to_string())
    }

    pub fn baseline(&self) -> Option<&str> {
        self.diff.as_ref().map(|d| d.baseline.as_str())
    }

    pub fn scenario_names(&self) -> Vec<String> {
        self.scenarios.iter().map(|s| s.name.clone()).collect()
    }

    /// 表格是否在輸出清單中（清單為空代表全部輸出）
    pub fn table_included(&self, name: &str) -> bool {
        match self.tables.as_ref().and_then(|t| t.include.as_ref()) {
            Some(include) if !include.is_empty() => include.iter().any(|t| t == name),
            _ => true,
        }
    }

    pub fn drop_columns(&self) -> &[String] {
        self.filters
            .as_ref()
            .and_then(|f| f.drop_columns.as_deref())
            .unwrap_or(&[])
    }

    pub fn report_enabled(&self) -> bool {
        self.report
            .as_ref()
            .map(|r| r.enabled.unwrap_or(true))
            .unwrap_or(false)
    }

    /// CLI 的 --report 旗標：強制開啟報告輸出
    pub fn force_report(&mut self) {
        match &mut self.report {
            Some(report) => report.enabled = Some(true),
            None => {
                self.report = Some(ReportConfig {
                    enabled: Some(true),
                    title: None,
                    template_url: None,
                    template_file: None,
                    timeout_seconds: None,
                    tables: None,
                    copy_files: None,
                    layout: None,
                });
            }
        }
    }

    /// CLI 的 --output-path 旗標：覆寫輸出路徑
    pub fn set_output_path(&mut self, path: String) {
        match &mut self.load {
            Some(load) => load.output_path = Some(path),
            None => {
                self.load = Some(LoadConfig {
                    output_path: Some(path),
                    compression: None,
                });
            }
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
