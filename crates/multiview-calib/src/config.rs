use std::path::Path;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::CalibError;
use crate::normalize::DEFAULT_CANONICAL_SCALE;
use crate::sampling::DEFAULT_TEST_THETAS;

/// Default orbit radius of the cameras, in scene units.
pub const DEFAULT_RADIUS: f64 = 75.0;

/// Default up vector for views on the pole, the renderer's `+z`.
pub const DEFAULT_POLE_UP: [f64; 3] = [0.0, 0.0, 1.0];

/// Parameters of a calibration run.
///
/// Every field has a default, so a JSON file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibConfig {
    /// Distance of every camera from the world origin.
    pub radius: f64,
    /// Mean training camera distance after normalization.
    pub canonical_scale: f64,
    /// Scene bounding box scale written to the transform manifests.
    pub aabb_scale: u32,
    /// Polar bands of the test grid, in radians.
    pub test_thetas: Vec<f64>,
    /// Number of azimuths of the test grid.
    pub test_azimuths: usize,
    /// Maximum deviation from orthonormality accepted for SfM records.
    pub orthonormal_tolerance: f64,
    /// Up vector retried for views that look straight along the consumer's up.
    ///
    /// Defaults to [`DEFAULT_POLE_UP`]; `null` makes such views an error.
    pub pole_up: Option<[f64; 3]>,
}

impl Default for CalibConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            canonical_scale: DEFAULT_CANONICAL_SCALE,
            aabb_scale: 1,
            test_thetas: DEFAULT_TEST_THETAS.to_vec(),
            test_azimuths: 4,
            orthonormal_tolerance: 1e-6,
            pole_up: Some(DEFAULT_POLE_UP),
        }
    }
}

impl CalibConfig {
    /// Read a configuration from a JSON file and validate it.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// The pole fallback as a vector.
    pub fn pole_up(&self) -> Option<DVec3> {
        self.pole_up.map(DVec3::from_array)
    }

    /// Check that every parameter lies in its valid range.
    pub fn validate(&self) -> Result<(), CalibError> {
        let positive = |name: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(CalibError::InvalidParameter {
                    name,
                    reason: format!("must be positive and finite, got {value}"),
                })
            }
        };

        positive("radius", self.radius)?;
        positive("canonical_scale", self.canonical_scale)?;
        positive("orthonormal_tolerance", self.orthonormal_tolerance)?;

        if self.aabb_scale == 0 {
            return Err(CalibError::InvalidParameter {
                name: "aabb_scale",
                reason: "must be at least 1".to_string(),
            });
        }

        if let Some(theta) = self
            .test_thetas
            .iter()
            .find(|t| !(0.0..=std::f64::consts::PI).contains(*t))
        {
            return Err(CalibError::InvalidParameter {
                name: "test_thetas",
                reason: format!("polar angles must lie in [0, pi], got {theta}"),
            });
        }

        if let Some(up) = self.pole_up() {
            if !up.is_finite() || up.length_squared() == 0.0 {
                return Err(CalibError::InvalidParameter {
                    name: "pole_up",
                    reason: format!("must be a finite non-zero vector, got {up:?}"),
                });
            }
        }

        Ok(())
    }
}
