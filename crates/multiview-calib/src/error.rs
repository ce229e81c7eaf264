use crate::pose::Convention;

/// Error types for the calibration core.
#[derive(Debug, thiserror::Error)]
pub enum CalibError {
    /// The view set has no training views.
    #[error("view count must be at least 1")]
    EmptyViewSet,

    /// A required scene parameter was not provided.
    #[error("missing scene parameter `{0}`")]
    MissingParameter(&'static str),

    /// A scene parameter is out of its valid range.
    #[error("invalid scene parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// Human readable reason.
        reason: String,
    },

    /// A rotation matrix deviates from orthonormality beyond tolerance.
    #[error("rotation is not orthonormal (deviation {deviation:e}, tolerance {tolerance:e})")]
    NonOrthonormalRotation {
        /// Max-abs deviation of R^T R from identity, or infinity for improper rotations.
        deviation: f64,
        /// Accepted tolerance.
        tolerance: f64,
    },

    /// The viewing direction is parallel to the up vector.
    #[error("look-at is degenerate: viewing direction is parallel to the up vector")]
    DegenerateLookAt,

    /// Average camera distance is too small to rescale the scene.
    #[error("average camera distance {0:e} is too small to normalize the scene")]
    DegenerateScale(f64),

    /// A pose has the wrong transform direction for the operation.
    #[error("expected a {expected:?} pose, got {actual:?}")]
    UnexpectedConvention {
        /// Convention required by the operation.
        expected: Convention,
        /// Convention of the given pose.
        actual: Convention,
    },

    /// Mismatched sizes between paired inputs.
    #[error("Mismatched lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    MismatchedLengths {
        /// Label for the left-hand input.
        left_name: &'static str,
        /// Length of the left-hand input.
        left_len: usize,
        /// Label for the right-hand input.
        right_name: &'static str,
        /// Length of the right-hand input.
        right_len: usize,
    },

    /// The centroid estimator received no rays.
    #[error("cannot estimate a centroid from an empty ray set")]
    EmptyRaySet,

    /// The scene has no transform with this name.
    #[error("unknown scene transform `{0}`")]
    UnknownTransform(String),

    /// A value that would be emitted is NaN or infinite.
    #[error("non-finite value in {0}")]
    NonFinite(String),

    /// Error reading or writing a file.
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),

    /// Error (de)serializing a JSON document.
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}
