//! Error types for the beamnorm crate.
//!
//! One error type covers configuration, integration and persistence
//! failures so that callers can classify them with the `is_*` helpers.

use thiserror::Error;

/// Error type for beamnorm operations.
#[derive(Debug, Error)]
pub enum NormalizerError {
    /// Resolution, tolerance or scan directions are unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the offending setting.
        message: String,
    },

    /// The sphere integral could not be turned into a correction factor.
    #[error(
        "numerical instability for beam at azimuth {azimuth_deg} deg, elevation {elevation_deg} deg: {message}"
    )]
    NumericalInstability {
        /// Steering azimuth of the failing cell (0 for the element pattern).
        azimuth_deg: f64,
        /// Steering elevation of the failing cell (0 for the element pattern).
        elevation_deg: f64,
        /// Integration or log-domain failure.
        message: String,
    },

    /// A tabulated antenna pattern could not be read or is malformed.
    #[error("failed to load antenna pattern from '{path}': {message}")]
    PatternLoad {
        /// Path to the pattern file.
        path: String,
        /// Error message describing the failure.
        message: String,
    },

    /// The correction archive could not be written or read.
    #[error("archive operation failed for '{path}': {message}")]
    Archive {
        /// Path to the archive.
        path: String,
        /// Error message describing the failure.
        message: String,
    },

    /// I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a sphere integral has no correction factor.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum IntegralError {
    /// `I` or `E` is NaN or infinite.
    #[error("integral ({integral}) or its error ({abs_error}) is not finite")]
    NonFinite {
        /// Sphere integral.
        integral: f64,
        /// Estimated absolute error.
        abs_error: f64,
    },

    /// `I - E <= 0`, so the high bound has no logarithm.
    #[error("integral minus its error is not positive (I={integral}, E={abs_error})")]
    NonPositiveLowerBound {
        /// Sphere integral.
        integral: f64,
        /// Estimated absolute error.
        abs_error: f64,
    },
}

/// Result type alias for beamnorm operations.
pub type Result<T> = std::result::Result<T, NormalizerError>;

impl NormalizerError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        NormalizerError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, NormalizerError::InvalidConfiguration { .. })
    }

    /// Returns true if the integration or the log transform failed.
    pub fn is_numerical_error(&self) -> bool {
        matches!(self, NormalizerError::NumericalInstability { .. })
    }

    /// Returns true if this is a file/IO error.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            NormalizerError::PatternLoad { .. }
                | NormalizerError::Archive { .. }
                | NormalizerError::Io(_)
                | NormalizerError::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        let e = NormalizerError::invalid("resolution must be positive");
        assert!(e.is_configuration_error());
        assert!(!e.is_io_error());

        let e = NormalizerError::NumericalInstability {
            azimuth_deg: 10.0,
            elevation_deg: 90.0,
            message: "diverged".to_string(),
        };
        assert!(e.is_numerical_error());
        assert!(e.to_string().contains("azimuth 10 deg"));

        let e = NormalizerError::from(std::io::Error::other("disk full"));
        assert!(e.is_io_error());
    }
}
