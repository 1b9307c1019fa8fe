use thiserror::Error;

#[derive(Error, Debug)]
pub enum NutriError {
    #[error("no input provided")]
    NoInputProvided,

    #[error("barcode not found: {barcode}")]
    BarcodeNotFound { barcode: String },

    #[error("image extraction failed: {message}")]
    ImageExtractionFailed { message: String },

    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Extraction,
    Network,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl NutriError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            NutriError::NoInputProvided | NutriError::ValidationError { .. } => {
                ErrorCategory::Input
            }
            NutriError::BarcodeNotFound { .. } | NutriError::ImageExtractionFailed { .. } => {
                ErrorCategory::Extraction
            }
            NutriError::NetworkError(_) => ErrorCategory::Network,
            NutriError::ConfigError { .. }
            | NutriError::ConfigValidationError { .. }
            | NutriError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            NutriError::IoError(_) | NutriError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 擷取失敗不影響手動輸入
            ErrorCategory::Input | ErrorCategory::Extraction => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Message suitable for a non-fatal alert in front of the user.
    pub fn user_friendly_message(&self) -> String {
        match self {
            NutriError::NoInputProvided => {
                "Please provide a food label photo or a barcode.".to_string()
            }
            NutriError::BarcodeNotFound { .. } => {
                "Barcode not found in Open Food Facts database.".to_string()
            }
            NutriError::ImageExtractionFailed { .. } => {
                "Failed to extract nutrition data from the image. Please try again or enter manually."
                    .to_string()
            }
            NutriError::NetworkError(_) => {
                "Could not reach the nutrition service. Please check your connection.".to_string()
            }
            NutriError::ConfigError { .. }
            | NutriError::ConfigValidationError { .. }
            | NutriError::InvalidConfigValueError { .. } => format!("Configuration problem: {}", self),
            NutriError::ValidationError { message } => message.clone(),
            NutriError::IoError(_) | NutriError::SerializationError(_) => {
                format!("Unexpected system error: {}", self)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            NutriError::NoInputProvided => "Pass --photo or --barcode",
            NutriError::BarcodeNotFound { .. } => {
                "Double-check the digits, add a label photo, or enter the values manually"
            }
            NutriError::ImageExtractionFailed { .. } => {
                "Retake the photo with the nutrition facts panel in focus, or enter the values manually"
            }
            NutriError::NetworkError(_) => "Check your network connection and try again",
            NutriError::ConfigError { .. }
            | NutriError::ConfigValidationError { .. }
            | NutriError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command line flags"
            }
            NutriError::ValidationError { .. } => "Correct the input value and try again",
            NutriError::IoError(_) => "Check that the file exists and is readable",
            NutriError::SerializationError(_) => "Report this issue with the failing input",
        }
    }
}

pub type Result<T> = std::result::Result<T, NutriError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_errors_are_low_severity() {
        assert_eq!(NutriError::NoInputProvided.severity(), ErrorSeverity::Low);
        let err = NutriError::BarcodeNotFound {
            barcode: "000".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Extraction);
        assert_eq!(err.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_user_friendly_messages() {
        let err = NutriError::BarcodeNotFound {
            barcode: "000".to_string(),
        };
        assert_eq!(
            err.user_friendly_message(),
            "Barcode not found in Open Food Facts database."
        );

        let err = NutriError::ImageExtractionFailed {
            message: "timeout".to_string(),
        };
        assert!(err.user_friendly_message().contains("enter manually"));
    }

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = NutriError::ConfigValidationError {
            field: "interpreter.endpoint".to_string(),
            message: "must be a URL".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
