use glam::DVec3;

use crate::error::CalibError;
use crate::pose::{CameraPose, Convention};

/// Default mean camera distance after normalization.
pub const DEFAULT_CANONICAL_SCALE: f64 = 4.0;

// average distances below this fraction of the scene extent cannot be rescaled
const RELATIVE_SCALE_TOLERANCE: f64 = 1e-9;

/// Camera-to-world poses recentered on the scene centroid and rescaled.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedScene {
    /// The normalized poses, in input order.
    pub poses: Vec<CameraPose>,
    /// The centroid that was subtracted.
    pub centroid: DVec3,
    /// The factor applied to the recentered translations.
    pub scale: f64,
}

/// Recenter camera positions on `centroid` and rescale them to a canonical mean distance.
///
/// The mean distance is taken over the first `num_train` poses only, and the same factor
/// `canonical_scale / mean` is applied to every pose so test views share the frame.
/// Rotations are left untouched.
///
/// # Arguments
///
/// * `poses` - Camera-to-world poses, training views first.
/// * `num_train` - Number of training poses, in `1..=poses.len()`.
/// * `centroid` - Point moved to the origin.
/// * `canonical_scale` - Target mean distance of the training cameras.
///
/// # Errors
///
/// * [`CalibError::UnexpectedConvention`] if a pose is world-to-camera.
/// * [`CalibError::DegenerateScale`] if the recentered training cameras collapse on the
///   centroid, relative to their distance from the world origin.
pub fn normalize_scene(
    poses: &[CameraPose],
    num_train: usize,
    centroid: DVec3,
    canonical_scale: f64,
) -> Result<NormalizedScene, CalibError> {
    if num_train == 0 {
        return Err(CalibError::EmptyViewSet);
    }

    if num_train > poses.len() {
        return Err(CalibError::MismatchedLengths {
            left_name: "num_train",
            left_len: num_train,
            right_name: "poses",
            right_len: poses.len(),
        });
    }

    if !(canonical_scale.is_finite() && canonical_scale > 0.0) {
        return Err(CalibError::InvalidParameter {
            name: "canonical_scale",
            reason: format!("scale must be positive, got {canonical_scale}"),
        });
    }

    if let Some(pose) = poses
        .iter()
        .find(|p| p.convention != Convention::CameraToWorld)
    {
        return Err(CalibError::UnexpectedConvention {
            expected: Convention::CameraToWorld,
            actual: pose.convention,
        });
    }

    let recentered = poses
        .iter()
        .map(|p| CameraPose::new(p.rotation, p.translation - centroid, p.convention))
        .collect::<Vec<_>>();

    let avg_len = recentered[..num_train]
        .iter()
        .map(|p| p.translation.length())
        .sum::<f64>()
        / num_train as f64;

    let extent = poses[..num_train]
        .iter()
        .map(|p| p.translation.length())
        .fold(centroid.length(), f64::max);

    if !(avg_len > RELATIVE_SCALE_TOLERANCE * extent) {
        return Err(CalibError::DegenerateScale(avg_len));
    }

    let scale = canonical_scale / avg_len;
    log::debug!("average camera distance {avg_len:.6}, scale factor {scale:.6}");

    let poses = recentered
        .into_iter()
        .map(|p| CameraPose::new(p.rotation, p.translation * scale, p.convention))
        .collect();

    Ok(NormalizedScene {
        poses,
        centroid,
        scale,
    })
}
