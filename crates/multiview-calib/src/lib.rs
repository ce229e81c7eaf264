#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera intrinsics.
pub mod camera;

/// Scene centroid estimation from view rays.
pub mod centroid;

/// Pipeline configuration.
pub mod config;

/// Error types.
pub mod error;

/// I/O utilities for writing calibration artifacts.
pub mod io;

/// Scale normalization of camera positions.
pub mod normalize;

/// End-to-end calibration pipeline.
pub mod pipeline;

/// Camera pose construction and convention conversion.
pub mod pose;

/// Typed access to renderer scene parameters.
pub mod scene;

/// Viewing direction sampling.
pub mod sampling;

/// Rotation and quaternion transforms.
pub mod transforms;

mod utils;

pub use error::CalibError;
