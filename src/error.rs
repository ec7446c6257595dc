use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export limit reached ({count}/{limit}). Upgrade to PRO for unlimited exports.")]
    QuotaExceeded { count: u32, limit: u32 },

    #[error("Export failed: {message}")]
    ExtractionFailed { message: String },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    #[error("Unknown request type: {request_type}")]
    UnknownRequestType { request_type: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation was cancelled by user")]
    Cancelled,
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for ExportError {
    fn user_message(&self) -> String {
        match self {
            ExportError::QuotaExceeded { .. } => self.to_string(),
            ExportError::ExtractionFailed { message } => format!("Export failed: {}", message),
            ExportError::InvalidData { .. } => {
                "Error mapping data. Please check your field settings.".to_string()
            }
            ExportError::UnknownRequestType { .. } => "Unknown request type.".to_string(),
            ExportError::InvalidRequest { message } => format!("Invalid request: {}", message),
            ExportError::Storage { message } => format!("Storage error: {}", message),
            ExportError::Config { message } => format!("Configuration error: {}", message),
            ExportError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ExportError::QuotaExceeded { .. } => Some(
                "The counter resets at the start of next month. Run `export-assistant upgrade` to lift the limit.".to_string()
            ),
            ExportError::ExtractionFailed { .. } => Some(
                "Reload the page so all profile sections render, then extract again.".to_string()
            ),
            ExportError::InvalidData { .. } => Some(
                "Check the field mapping with `export-assistant status` and re-submit it with `set-mapping`.".to_string()
            ),
            ExportError::InvalidRequest { .. } => Some(
                "Requests are JSON objects with a \"type\" field and an optional \"payload\".".to_string()
            ),
            ExportError::Storage { .. } => Some(
                "Check that the store file is readable JSON, or point --store at a fresh location.".to_string()
            ),
            ExportError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all values are in range.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ExportError {
    fn from(error: toml::de::Error) -> Self {
        ExportError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
