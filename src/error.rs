use thiserror::Error;

/// Errors raised by configuration and layout entry points.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Invalid {field}: '{value}'. Expected one of: {expected}")]
    InvalidValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("Negative {field}: {value}")]
    NegativeValue { field: &'static str, value: f64 },
    #[error("{field} must be a finite number, got {value}")]
    NonFiniteValue { field: &'static str, value: f64 },
    #[error("{field} must be greater than zero, got {value}")]
    NonPositiveValue { field: &'static str, value: f64 },
    #[error("Minimum node size {min} exceeds maximum node size {max}")]
    InvalidNodeSizeBounds { min: f64, max: f64 },
    #[error("Failed to parse layout config as {format}: {message}")]
    ConfigParse {
        format: &'static str,
        message: String,
    },
    #[error("Unknown built-in preset '{name}'. Available: {available}")]
    UnknownPreset { name: String, available: String },
    #[error("layout run was cancelled")]
    Cancelled,
}

impl LayoutError {
    pub(crate) fn parse(format: &'static str, err: impl std::fmt::Display) -> Self {
        LayoutError::ConfigParse {
            format,
            message: err.to_string(),
        }
    }
}
