use glam::{DMat3, DVec3};

use crate::error::CalibError;
use crate::pose::{CameraPose, Convention};

/// Pairs whose squared direction cross product falls below this are skipped.
pub const MIN_PAIR_WEIGHT: f64 = 1e-5;

/// A camera ray in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The ray origin, usually the camera center.
    pub origin: DVec3,
    /// The ray direction, not necessarily normalized.
    pub direction: DVec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self { origin, direction }
    }
}

/// Extract one ray per camera-to-world pose.
///
/// The origin is the camera position and the direction is the third camera axis.
///
/// # Errors
///
/// [`CalibError::UnexpectedConvention`] if any pose is world-to-camera.
pub fn rays_from_poses(poses: &[CameraPose]) -> Result<Vec<Ray>, CalibError> {
    poses
        .iter()
        .map(|pose| match pose.convention {
            Convention::CameraToWorld => Ok(Ray::new(pose.translation, pose.rotation.z_axis)),
            actual => Err(CalibError::UnexpectedConvention {
                expected: Convention::CameraToWorld,
                actual,
            }),
        })
        .collect()
}

/// The midpoint of the closest points between two rays, and its weight.
///
/// The weight is `|d_a x d_b|^2` for the normalized directions, so near-parallel pairs
/// contribute little. Both ray parameters are clamped to `<= 0`, matching cameras whose
/// third axis points away from the scene.
///
/// Returns `None` when the weight is at or below [`MIN_PAIR_WEIGHT`] or a direction is zero.
pub fn closest_point_between_rays(a: &Ray, b: &Ray) -> Option<(DVec3, f64)> {
    let da = a.direction.try_normalize()?;
    let db = b.direction.try_normalize()?;

    let c = da.cross(db);
    let weight = c.length_squared();
    if weight <= MIN_PAIR_WEIGHT {
        return None;
    }

    let t = b.origin - a.origin;
    let ta = (DMat3::from_cols(t, db, c).determinant() / weight).min(0.0);
    let tb = (DMat3::from_cols(t, da, c).determinant() / weight).min(0.0);

    let point = 0.5 * ((a.origin + ta * da) + (b.origin + tb * db));
    Some((point, weight))
}

/// Estimate the common look-at point of a set of rays.
///
/// Every unordered pair `(a, b)` with `a < b` contributes its closest-point midpoint,
/// weighted by [`closest_point_between_rays`]. The sum is folded in pair order, so the
/// result does not change between runs. When no pair contributes the unweighted mean of
/// the origins is returned instead.
///
/// # Errors
///
/// [`CalibError::EmptyRaySet`] if `rays` is empty.
///
/// Example:
///
/// ```
/// use glam::DVec3;
/// use multiview_calib::centroid::{estimate_centroid, Ray};
///
/// let rays = [
///     Ray::new(DVec3::new(2.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0)),
///     Ray::new(DVec3::new(0.0, 2.0, 0.0), DVec3::new(0.0, 1.0, 0.0)),
/// ];
/// let centroid = estimate_centroid(&rays).unwrap();
/// assert!(centroid.length() < 1e-9);
/// ```
pub fn estimate_centroid(rays: &[Ray]) -> Result<DVec3, CalibError> {
    if rays.is_empty() {
        return Err(CalibError::EmptyRaySet);
    }

    let mut total_point = DVec3::ZERO;
    let mut total_weight = 0.0;
    let mut pairs = 0usize;

    for (i, a) in rays.iter().enumerate() {
        for b in &rays[i + 1..] {
            if let Some((point, weight)) = closest_point_between_rays(a, b) {
                total_point += point * weight;
                total_weight += weight;
                pairs += 1;
            }
        }
    }

    if pairs == 0 {
        log::warn!(
            "no ray pair of {} rays is well conditioned, using the mean of the origins",
            rays.len()
        );
        let sum = rays.iter().fold(DVec3::ZERO, |acc, r| acc + r.origin);
        return Ok(sum / rays.len() as f64);
    }

    log::debug!("centroid from {pairs} ray pairs, total weight {total_weight:.6}");

    Ok(total_point / total_weight)
}
