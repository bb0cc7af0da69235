use thiserror::Error;

/// Core error types for MiniFHIR resource handling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unsupported resource type: {0}")]
    UnsupportedType(String),

    #[error("Missing resourceType")]
    MissingType,

    #[error("Unknown field '{field}' for resource type {resource_type}")]
    UnknownField {
        resource_type: String,
        field: String,
    },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Resource type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Resource id is required")]
    MissingId,

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new UnsupportedType error
    pub fn unsupported_type(resource_type: impl Into<String>) -> Self {
        Self::UnsupportedType(resource_type.into())
    }

    /// Create a new UnknownField error
    pub fn unknown_field(resource_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            resource_type: resource_type.into(),
            field: field.into(),
        }
    }

    /// Create a new MalformedPayload error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    /// Create a new TypeMismatch error
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a new InvalidReference error
    pub fn invalid_reference(reference: impl Into<String>) -> Self {
        Self::InvalidReference(reference.into())
    }

    /// Check if this error was caused by client input (4xx category)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::JsonError(_))
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedType(_) => ErrorCategory::UnsupportedType,
            Self::MissingType | Self::UnknownField { .. } | Self::MalformedPayload(_) => {
                ErrorCategory::Decode
            }
            Self::TypeMismatch { .. } | Self::MissingId | Self::InvalidReference(_) => {
                ErrorCategory::Validation
            }
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UnsupportedType,
    Decode,
    Validation,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedType => write!(f, "unsupported_type"),
            Self::Decode => write!(f, "decode"),
            Self::Validation => write!(f, "validation"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_error() {
        let err = CoreError::unsupported_type("Encounter");
        assert_eq!(err.to_string(), "Unsupported resource type: Encounter");
        assert!(err.is_client_error());
        assert_eq!(err.category(), ErrorCategory::UnsupportedType);
    }

    #[test]
    fn test_unknown_field_error() {
        let err = CoreError::unknown_field("Patient", "unknownField");
        assert_eq!(
            err.to_string(),
            "Unknown field 'unknownField' for resource type Patient"
        );
        assert_eq!(err.category(), ErrorCategory::Decode);
    }

    #[test]
    fn test_type_mismatch_error() {
        let err = CoreError::type_mismatch("Patient", "Observation");
        assert_eq!(
            err.to_string(),
            "Resource type mismatch: expected Patient, got Observation"
        );
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(CoreError::MissingId.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let core_err: CoreError = json_err.into();

        assert!(matches!(core_err, CoreError::JsonError(_)));
        assert!(!core_err.is_client_error());
        assert_eq!(core_err.category(), ErrorCategory::Serialization);
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::UnsupportedType.to_string(), "unsupported_type");
        assert_eq!(ErrorCategory::Decode.to_string(), "decode");
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::Serialization.to_string(), "serialization");
    }
}
