/*!
 * Error Handling for the CCA PKA Module
 *
 * Provides the error type shared by the token codec, the facility binding and the
 * key operations, with error codes, user-facing messages, diagnostics and errno
 * mapping for C callers.
 */

use std::collections::HashMap;
use thiserror::Error;

use crate::facility::Verb;

/// Error type for all CCA PKA operations
#[derive(Debug, Error)]
pub enum CcaError {
    #[error("Invalid parameter: {parameter} - expected {expected} - got {actual}")]
    InvalidParameter {
        parameter: String,
        expected: String,
        actual: String,
        error_code: u32,
    },

    #[error("Malformed key token at offset {offset}: {cause}")]
    MalformedToken {
        cause: String,
        offset: usize,
        error_code: u32,
    },

    #[error("Unrecognized key token type: {cause}")]
    UnrecognizedKeyType { cause: String, error_code: u32 },

    #[error("CCA binding unavailable: {entry_point} - {cause}")]
    BindingUnavailable {
        entry_point: String,
        cause: String,
        error_code: u32,
    },

    #[error("{verb} failed: return_code: {return_code} reason_code: {reason_code}")]
    FacilityFailure {
        verb: Verb,
        return_code: i64,
        reason_code: i64,
        error_code: u32,
    },

    #[error("Device not ready: {verb} reports the master keys are not loaded (return_code: {return_code} reason_code: {reason_code})")]
    DeviceNotReady {
        verb: Verb,
        return_code: i64,
        reason_code: i64,
        error_code: u32,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Taxonomy classes of [`CcaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input, including malformed or unrecognized key tokens
    InvalidArgument,
    /// A required CCA entry point could not be resolved
    BindingUnavailable,
    /// A CCA verb returned a nonzero return code
    FacilityFailure,
    /// The master key register targeted by the operation is not loaded
    DeviceNotReady,
    /// Configuration, serialization or file system problems
    Environment,
}

/// Error code constants for different error categories
pub mod error_codes {
    // Argument errors: 1000-1999
    pub const INVALID_ARGUMENT: u32 = 1001;
    pub const UNSUPPORTED_CURVE: u32 = 1002;
    pub const UNSUPPORTED_EXPONENT: u32 = 1003;
    pub const EXPONENT_SIZE_MISMATCH: u32 = 1004;
    pub const UNSUPPORTED_MODULUS_SIZE: u32 = 1005;
    pub const BUFFER_TOO_SMALL: u32 = 1006;
    pub const UNRECOGNIZED_KEY_TYPE: u32 = 1007;

    // Token format errors: 2000-2999
    pub const TOKEN_TOO_SHORT: u32 = 2001;
    pub const TOKEN_LENGTH_EXCEEDS_BUFFER: u32 = 2002;
    pub const NOT_INTERNAL_PKA_TOKEN: u32 = 2003;
    pub const UNSUPPORTED_TOKEN_VERSION: u32 = 2004;
    pub const SECTION_TRUNCATED: u32 = 2005;
    pub const SECTION_LENGTH_INVALID: u32 = 2006;
    pub const SECTION_EXCEEDS_TOKEN: u32 = 2007;
    pub const SECTION_NOT_FOUND: u32 = 2008;
    pub const SECTION_CONTENT_INVALID: u32 = 2009;

    // Binding errors: 3000-3999
    pub const LIBRARY_LOAD_FAILED: u32 = 3001;
    pub const ENTRY_POINT_MISSING: u32 = 3002;

    // Facility errors: 4000-4999
    pub const VERB_FAILED: u32 = 4001;
    pub const MASTER_KEY_NOT_LOADED: u32 = 4002;
    pub const VERB_OUTPUT_INVALID: u32 = 4003;

    // Environment errors: 9000-9999
    pub const CONFIG_INVALID: u32 = 9001;
    pub const SERIALIZATION_FAILED: u32 = 9002;
    pub const IO_FAILED: u32 = 9003;
}

impl CcaError {
    /// Get the numeric error code for this error
    pub fn error_code(&self) -> u32 {
        match self {
            CcaError::InvalidParameter { error_code, .. } => *error_code,
            CcaError::MalformedToken { error_code, .. } => *error_code,
            CcaError::UnrecognizedKeyType { error_code, .. } => *error_code,
            CcaError::BindingUnavailable { error_code, .. } => *error_code,
            CcaError::FacilityFailure { error_code, .. } => *error_code,
            CcaError::DeviceNotReady { error_code, .. } => *error_code,
            CcaError::ConfigError(_) => error_codes::CONFIG_INVALID,
            CcaError::SerializationError(_) => error_codes::SERIALIZATION_FAILED,
            CcaError::IoError(_) => error_codes::IO_FAILED,
        }
    }

    /// Get the taxonomy class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CcaError::InvalidParameter { .. }
            | CcaError::MalformedToken { .. }
            | CcaError::UnrecognizedKeyType { .. } => ErrorKind::InvalidArgument,
            CcaError::BindingUnavailable { .. } => ErrorKind::BindingUnavailable,
            CcaError::FacilityFailure { .. } => ErrorKind::FacilityFailure,
            CcaError::DeviceNotReady { .. } => ErrorKind::DeviceNotReady,
            CcaError::ConfigError(_) | CcaError::SerializationError(_) | CcaError::IoError(_) => {
                ErrorKind::Environment
            }
        }
    }

    /// True for caller-side problems, malformed tokens included
    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }

    /// The facility's return and reason codes, if this error came from a verb
    pub fn facility_codes(&self) -> Option<(i64, i64)> {
        match self {
            // host-side length check, no codes from the verb
            CcaError::FacilityFailure {
                error_code: error_codes::VERB_OUTPUT_INVALID,
                ..
            } => None,
            CcaError::FacilityFailure {
                return_code,
                reason_code,
                ..
            }
            | CcaError::DeviceNotReady {
                return_code,
                reason_code,
                ..
            } => Some((*return_code, *reason_code)),
            _ => None,
        }
    }

    /// Negative errno value for C callers
    pub fn errno(&self) -> i32 {
        match self.kind() {
            ErrorKind::InvalidArgument => -libc::EINVAL,
            ErrorKind::DeviceNotReady => -libc::ENODEV,
            ErrorKind::BindingUnavailable | ErrorKind::FacilityFailure => -libc::EIO,
            ErrorKind::Environment => match self {
                CcaError::ConfigError(_) => -libc::EINVAL,
                _ => -libc::EIO,
            },
        }
    }

    /// Get a user-friendly error message
    pub fn user_friendly_message(&self) -> String {
        match self {
            CcaError::InvalidParameter { parameter, expected, .. } => {
                format!("Invalid parameter '{}'. Expected {}.", parameter, expected)
            }
            CcaError::MalformedToken { .. } => {
                "The key token is damaged or is not a CCA internal PKA key token.".to_string()
            }
            CcaError::UnrecognizedKeyType { .. } => {
                "The key token holds neither an ECC nor an RSA key.".to_string()
            }
            CcaError::BindingUnavailable { entry_point, .. } => {
                format!(
                    "The CCA host library is not usable: '{}' is not available.",
                    entry_point
                )
            }
            CcaError::FacilityFailure { verb, .. } => {
                format!(
                    "The cryptographic coprocessor rejected the {} request.",
                    verb.description()
                )
            }
            CcaError::DeviceNotReady { .. } => {
                "The master keys of the cryptographic coprocessor are not loaded.".to_string()
            }
            CcaError::ConfigError(_) => {
                "The CCA configuration is invalid.".to_string()
            }
            CcaError::SerializationError(_) => {
                "Data serialization failed. Data format may be corrupted.".to_string()
            }
            CcaError::IoError(_) => {
                "Input/output operation failed. Check file permissions and disk space.".to_string()
            }
        }
    }

    /// Get technical details for debugging
    pub fn technical_details(&self) -> HashMap<String, String> {
        let mut details = HashMap::new();

        details.insert("error_code".to_string(), self.error_code().to_string());
        details.insert("error_type".to_string(), self.error_type().to_string());
        details.insert("timestamp".to_string(), chrono::Utc::now().to_rfc3339());

        match self {
            CcaError::InvalidParameter {
                parameter,
                expected,
                actual,
                ..
            } => {
                details.insert("parameter".to_string(), parameter.clone());
                details.insert("expected".to_string(), expected.clone());
                details.insert("actual".to_string(), actual.clone());
            }
            CcaError::MalformedToken { cause, offset, .. } => {
                details.insert("cause".to_string(), cause.clone());
                details.insert("offset".to_string(), offset.to_string());
            }
            CcaError::BindingUnavailable {
                entry_point,
                cause,
                ..
            } => {
                details.insert("entry_point".to_string(), entry_point.clone());
                details.insert("cause".to_string(), cause.clone());
            }
            CcaError::FacilityFailure {
                verb,
                return_code,
                reason_code,
                ..
            }
            | CcaError::DeviceNotReady {
                verb,
                return_code,
                reason_code,
                ..
            } => {
                details.insert("verb".to_string(), verb.entry_point().to_string());
                details.insert("return_code".to_string(), return_code.to_string());
                details.insert("reason_code".to_string(), reason_code.to_string());
            }
            _ => {
                details.insert("details".to_string(), format!("{:?}", self));
            }
        }

        details
    }

    /// Get suggested remediation steps
    pub fn suggested_remediation(&self) -> Option<String> {
        match self {
            CcaError::InvalidParameter { error_code, .. } => match *error_code {
                error_codes::UNSUPPORTED_CURVE => Some(
                    "Use a NIST prime curve (P-192 to P-521) or a brainpool r1 curve.".to_string(),
                ),
                error_codes::UNSUPPORTED_EXPONENT | error_codes::EXPONENT_SIZE_MISMATCH => Some(
                    "Use a public exponent of 3, 5, 17, 257 or 65537, or 0 for keys up to 2048 bits."
                        .to_string(),
                ),
                _ => None,
            },
            CcaError::BindingUnavailable { .. } => Some(
                "Install the CCA host library and check the configured library path.".to_string(),
            ),
            CcaError::DeviceNotReady { .. } => Some(
                "Load the master keys into the coprocessor, then repeat the operation.".to_string(),
            ),
            CcaError::FacilityFailure { .. } => Some(
                "Look up the return and reason codes in the CCA reference.".to_string(),
            ),
            _ => None,
        }
    }

    /// Get the error category/type as a string
    pub fn error_type(&self) -> &'static str {
        match self {
            CcaError::InvalidParameter { .. } => "InvalidParameter",
            CcaError::MalformedToken { .. } => "MalformedToken",
            CcaError::UnrecognizedKeyType { .. } => "UnrecognizedKeyType",
            CcaError::BindingUnavailable { .. } => "BindingUnavailable",
            CcaError::FacilityFailure { .. } => "FacilityFailure",
            CcaError::DeviceNotReady { .. } => "DeviceNotReady",
            CcaError::ConfigError(_) => "ConfigError",
            CcaError::SerializationError(_) => "SerializationError",
            CcaError::IoError(_) => "IoError",
        }
    }
}

/// Convenience constructors for common error types
impl CcaError {
    pub fn invalid_parameter(parameter: &str, expected: &str, actual: &str) -> Self {
        Self::invalid_parameter_with_code(parameter, expected, actual, error_codes::INVALID_ARGUMENT)
    }

    pub fn invalid_parameter_with_code(
        parameter: &str,
        expected: &str,
        actual: &str,
        error_code: u32,
    ) -> Self {
        CcaError::InvalidParameter {
            parameter: parameter.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            error_code,
        }
    }

    pub fn malformed_token(cause: &str, offset: usize, error_code: u32) -> Self {
        CcaError::MalformedToken {
            cause: cause.to_string(),
            offset,
            error_code,
        }
    }

    pub fn binding_unavailable(entry_point: &str, cause: &str, error_code: u32) -> Self {
        CcaError::BindingUnavailable {
            entry_point: entry_point.to_string(),
            cause: cause.to_string(),
            error_code,
        }
    }

    pub fn facility_failure(verb: Verb, return_code: i64, reason_code: i64) -> Self {
        CcaError::FacilityFailure {
            verb,
            return_code,
            reason_code,
            error_code: error_codes::VERB_FAILED,
        }
    }

    pub fn device_not_ready(verb: Verb, return_code: i64, reason_code: i64) -> Self {
        CcaError::DeviceNotReady {
            verb,
            return_code,
            reason_code,
            error_code: error_codes::MASTER_KEY_NOT_LOADED,
        }
    }
}

impl From<std::io::Error> for CcaError {
    fn from(err: std::io::Error) -> Self {
        CcaError::IoError(format!("IO operation failed: {}", err))
    }
}

impl From<serde_json::Error> for CcaError {
    fn from(err: serde_json::Error) -> Self {
        CcaError::SerializationError(err.to_string())
    }
}

/// Result type alias for CCA PKA operations
pub type CcaResult<T> = Result<T, CcaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_token_is_invalid_argument_class() {
        let error = CcaError::malformed_token(
            "section exceeds the token length",
            8,
            error_codes::SECTION_EXCEEDS_TOKEN,
        );
        assert!(error.is_invalid_argument());
        assert_eq!(error.errno(), -libc::EINVAL);
        assert_eq!(error.error_code(), error_codes::SECTION_EXCEEDS_TOKEN);
    }

    #[test]
    fn test_facility_codes_are_preserved() {
        let error = CcaError::facility_failure(Verb::KeyGenerate, 8, 2054);
        assert_eq!(error.kind(), ErrorKind::FacilityFailure);
        assert_eq!(error.facility_codes(), Some((8, 2054)));
        assert_eq!(error.errno(), -libc::EIO);

        let message = error.to_string();
        assert!(message.contains("CSNDPKG"));
        assert!(message.contains("return_code: 8"));
        assert!(message.contains("reason_code: 2054"));
    }

    #[test]
    fn test_device_not_ready_maps_to_enodev() {
        let error = CcaError::device_not_ready(Verb::KeyTokenChange, 12, 764);
        assert_eq!(error.kind(), ErrorKind::DeviceNotReady);
        assert_eq!(error.errno(), -libc::ENODEV);
        assert!(error.suggested_remediation().unwrap().contains("master keys"));
    }

    #[test]
    fn test_technical_details() {
        let error = CcaError::facility_failure(Verb::KeyTokenBuild, 8, 11);
        let details = error.technical_details();
        assert_eq!(details.get("verb").map(String::as_str), Some("CSNDPKB"));
        assert!(details.contains_key("timestamp"));
        assert!(details.contains_key("reason_code"));
    }
}
