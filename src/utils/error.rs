use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Query export parse error in scenario '{scenario}' at line {line}: {message}")]
    QueryParseError {
        scenario: String,
        line: u64,
        message: String,
    },

    #[error("Transformation failed at stage '{stage}': {details}")]
    TransformationError { stage: String, details: String },

    #[error("Report generation failed: {message}")]
    ReportError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    DataProcessing,
    System,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::QueryParseError { .. }
            | EtlError::TransformationError { .. }
            | EtlError::ReportError { .. } => ErrorCategory::DataProcessing,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::DataProcessing => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ZipError(_) => "Check free disk space and retry the run".to_string(),
            EtlError::ApiError(_) => {
                "Check the network connection and the report template URL".to_string()
            }
            EtlError::CsvError(_) => {
                "Check that the query export files are unmodified ModelInterface output"
                    .to_string()
            }
            EtlError::IoError(_) => {
                "Check that the results directory and output path exist and are writable"
                    .to_string()
            }
            EtlError::SerializationError(_) => {
                "Check the report configuration for values that cannot be serialized".to_string()
            }
            EtlError::ConfigValidationError { field, .. }
            | EtlError::InvalidConfigValueError { field, .. }
            | EtlError::MissingConfigError { field } => {
                format!("Fix the '{}' entry in the run configuration", field)
            }
            EtlError::QueryParseError { scenario, .. } => format!(
                "Re-export the '{}' scenario from ModelInterface; the dump looks truncated or edited",
                scenario
            ),
            EtlError::TransformationError { stage, .. } => format!(
                "Inspect the named table around the '{}' stage; the export may not match the expected layout",
                stage
            ),
            EtlError::ReportError { .. } => {
                "Check the report template and its placeholder tokens".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ApiError(_) => "Could not reach the report template server".to_string(),
            EtlError::IoError(e) => format!("File access failed: {}", e),
            EtlError::QueryParseError {
                scenario,
                line,
                message,
            } => format!(
                "Scenario '{}' export is malformed (line {}): {}",
                scenario, line, message
            ),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
