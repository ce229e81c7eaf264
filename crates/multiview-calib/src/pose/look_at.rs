use glam::{DMat3, DMat4, DVec3};
use rayon::prelude::*;

use super::ConsumerConvention;
use crate::error::CalibError;
use crate::sampling::View;
use crate::utils;

/// Direction of a pose transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Maps world coordinates into the camera frame.
    WorldToCamera,
    /// Maps camera coordinates into the world frame.
    CameraToWorld,
}

impl Convention {
    /// The opposite direction.
    pub fn inverse(self) -> Self {
        match self {
            Convention::WorldToCamera => Convention::CameraToWorld,
            Convention::CameraToWorld => Convention::WorldToCamera,
        }
    }
}

/// A rigid camera transform.
///
/// For [`Convention::CameraToWorld`] the columns of `rotation` are the camera axes in world
/// coordinates and `translation` is the camera position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Rotation part, orthonormal with determinant +1.
    pub rotation: DMat3,
    /// Translation part.
    pub translation: DVec3,
    /// Direction of the transform.
    pub convention: Convention,
}

impl CameraPose {
    /// Create a new pose.
    pub fn new(rotation: DMat3, translation: DVec3, convention: Convention) -> Self {
        Self {
            rotation,
            translation,
            convention,
        }
    }

    /// Invert the transform: `R' = R^T`, `t' = -R^T t`.
    ///
    /// Relies on `rotation` being orthonormal; no general matrix inverse is taken.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        Self {
            rotation,
            translation: -(rotation * self.translation),
            convention: self.convention.inverse(),
        }
    }

    /// Return the pose in the requested convention, inverting at most once.
    pub fn to_convention(&self, convention: Convention) -> Self {
        if self.convention == convention {
            *self
        } else {
            self.inverse()
        }
    }

    /// The camera center in world coordinates.
    pub fn position(&self) -> DVec3 {
        match self.convention {
            Convention::CameraToWorld => self.translation,
            Convention::WorldToCamera => -(self.rotation.transpose() * self.translation),
        }
    }

    /// The homogeneous 4x4 matrix of the transform.
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_cols(
            self.rotation.x_axis.extend(0.0),
            self.rotation.y_axis.extend(0.0),
            self.rotation.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }

    /// The homogeneous matrix as a row-major 4x4 array.
    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        utils::dmat4_to_rows(&self.to_matrix())
    }

    /// Build a pose from a row-major homogeneous 4x4 array.
    ///
    /// The bottom row is ignored.
    pub fn from_rows(rows: &[[f64; 4]; 4], convention: Convention) -> Self {
        let m = utils::rows_to_dmat4(rows);
        Self {
            rotation: DMat3::from_mat4(m),
            translation: m.w_axis.truncate(),
            convention,
        }
    }
}

/// Convert spherical angles to a position on a sphere of the given radius.
///
/// The polar axis is `+y`: `x = r sin(theta) sin(phi)`, `y = r cos(theta)`,
/// `z = r sin(theta) cos(phi)`.
pub fn spherical_to_cartesian(radius: f64, theta: f64, phi: f64) -> DVec3 {
    DVec3::new(
        radius * theta.sin() * phi.sin(),
        radius * theta.cos(),
        radius * theta.sin() * phi.cos(),
    )
}

// below this the right vector has no reliable direction
const DEGENERATE_CROSS: f64 = 1e-12;

/// Build the camera-to-world pose of a camera at `eye` looking at `target`.
///
/// The camera frame is the renderer's: `+x` left, `+y` up, `+z` forward. With
/// `forward = normalize(target - eye)`, `right = normalize(forward x up)` and
/// `true_up = right x forward`, the rotation columns are `[-right, true_up, forward]`.
///
/// # Errors
///
/// [`CalibError::DegenerateLookAt`] when `forward` is parallel to `up` or `eye == target`.
pub fn look_at(eye: DVec3, target: DVec3, up: DVec3) -> Result<CameraPose, CalibError> {
    let up = up
        .try_normalize()
        .ok_or_else(|| CalibError::InvalidParameter {
            name: "up",
            reason: "up vector must be non-zero".to_string(),
        })?;
    let forward = (target - eye)
        .try_normalize()
        .ok_or(CalibError::DegenerateLookAt)?;

    let right = forward.cross(up);
    if !(right.length() > DEGENERATE_CROSS) {
        return Err(CalibError::DegenerateLookAt);
    }
    let right = right.normalize();
    let true_up = right.cross(forward);

    Ok(CameraPose::new(
        DMat3::from_cols(-right, true_up, forward),
        eye,
        Convention::CameraToWorld,
    ))
}

/// Builds per-view camera poses in a consumer's convention.
///
/// Cameras sit on a sphere of `radius` around the world origin and look at it.
#[derive(Debug, Clone)]
pub struct PoseBuilder {
    radius: f64,
    consumer: ConsumerConvention,
    pole_up: Option<DVec3>,
}

impl PoseBuilder {
    /// Create a builder for the given orbit radius and consumer.
    pub fn new(radius: f64, consumer: ConsumerConvention) -> Result<Self, CalibError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(CalibError::InvalidParameter {
                name: "radius",
                reason: format!("radius must be positive, got {radius}"),
            });
        }
        Ok(Self {
            radius,
            consumer,
            pole_up: None,
        })
    }

    /// Opt in to an alternative up vector for views that look along the consumer's up.
    pub fn with_pole_up(mut self, pole_up: Option<DVec3>) -> Self {
        self.pole_up = pole_up;
        self
    }

    /// The consumer this builder targets.
    pub fn consumer(&self) -> &ConsumerConvention {
        &self.consumer
    }

    /// The renderer-frame camera-to-world pose of a view, using the consumer's up vector.
    pub fn renderer_pose(&self, view: &View) -> Result<CameraPose, CalibError> {
        let eye = spherical_to_cartesian(self.radius, view.theta, view.phi);
        match (look_at(eye, DVec3::ZERO, self.consumer.up), self.pole_up) {
            (Err(CalibError::DegenerateLookAt), Some(pole_up)) => {
                log::warn!(
                    "view {:?} looks along the up vector of {}, falling back to up {:?}",
                    view,
                    self.consumer.name,
                    pole_up
                );
                look_at(eye, DVec3::ZERO, pole_up)
            }
            (result, _) => result,
        }
    }

    /// The pose of a view in the consumer's axis convention and transform direction.
    pub fn build(&self, view: &View) -> Result<CameraPose, CalibError> {
        let c2w = self.consumer.remap.apply(&self.renderer_pose(view)?);
        Ok(c2w.to_convention(self.consumer.direction))
    }

    /// Build the poses of all views in parallel, preserving order.
    pub fn build_all(&self, views: &[View]) -> Result<Vec<CameraPose>, CalibError> {
        views.par_iter().map(|view| self.build(view)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::AxisRemap;
    use crate::transforms::{axis_angle_to_rotation_matrix, rotation_deviation};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn assert_vec3_eq(a: DVec3, b: DVec3, epsilon: f64) {
        assert_relative_eq!(a.x, b.x, epsilon = epsilon);
        assert_relative_eq!(a.y, b.y, epsilon = epsilon);
        assert_relative_eq!(a.z, b.z, epsilon = epsilon);
    }

    fn assert_pose_eq(a: &CameraPose, b: &CameraPose, epsilon: f64) {
        assert_eq!(a.convention, b.convention);
        for (x, y) in a.rotation.to_cols_array().iter().zip(b.rotation.to_cols_array().iter()) {
            assert_relative_eq!(x, y, epsilon = epsilon);
        }
        assert_vec3_eq(a.translation, b.translation, epsilon);
    }

    #[test]
    fn test_spherical_to_cartesian() {
        assert_vec3_eq(spherical_to_cartesian(2.0, 0.0, 1.3), DVec3::new(0.0, 2.0, 0.0), 1e-12);
        assert_vec3_eq(spherical_to_cartesian(2.0, PI / 2.0, 0.0), DVec3::new(0.0, 0.0, 2.0), 1e-12);
        assert_vec3_eq(
            spherical_to_cartesian(2.0, PI / 2.0, PI / 2.0),
            DVec3::new(2.0, 0.0, 0.0),
            1e-12,
        );
    }

    #[test]
    fn test_look_at_basis() -> Result<(), CalibError> {
        let eye = DVec3::new(0.0, 0.0, 5.0);
        let pose = look_at(eye, DVec3::ZERO, DVec3::Y)?;
        assert_eq!(pose.convention, Convention::CameraToWorld);
        assert_eq!(pose.translation, eye);
        // +x left, +y up, +z forward
        assert_vec3_eq(pose.rotation.x_axis, DVec3::new(-1.0, 0.0, 0.0), 1e-12);
        assert_vec3_eq(pose.rotation.y_axis, DVec3::Y, 1e-12);
        assert_vec3_eq(pose.rotation.z_axis, DVec3::new(0.0, 0.0, -1.0), 1e-12);
        assert!(rotation_deviation(&pose.rotation) < 1e-12);
        Ok(())
    }

    #[test]
    fn test_look_at_degenerate() {
        let eye = DVec3::new(0.0, 3.0, 0.0);
        assert!(matches!(
            look_at(eye, DVec3::ZERO, DVec3::Y),
            Err(CalibError::DegenerateLookAt)
        ));
        assert!(matches!(
            look_at(DVec3::ONE, DVec3::ONE, DVec3::Y),
            Err(CalibError::DegenerateLookAt)
        ));
        assert!(look_at(eye, DVec3::ZERO, DVec3::ZERO).is_err());
    }

    #[test]
    fn test_inverse_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let rotation = axis_angle_to_rotation_matrix(&[0.3, -1.0, 0.5], 1.1)?;
        let pose = CameraPose::new(
            rotation,
            DVec3::new(10.0, -3.0, 75.0),
            Convention::WorldToCamera,
        );
        let inv = pose.inverse();
        assert_eq!(inv.convention, Convention::CameraToWorld);
        assert_pose_eq(&inv.inverse(), &pose, 1e-9);
        assert_vec3_eq(pose.position(), inv.translation, 1e-12);
        Ok(())
    }

    #[test]
    fn test_to_convention_inverts_once() -> Result<(), CalibError> {
        let pose = look_at(DVec3::new(1.0, 2.0, 3.0), DVec3::ZERO, DVec3::Y)?;
        assert_eq!(pose.to_convention(Convention::CameraToWorld), pose);
        let w2c = pose.to_convention(Convention::WorldToCamera);
        assert_eq!(w2c.to_convention(Convention::WorldToCamera), w2c);
        Ok(())
    }

    #[test]
    fn test_rows_roundtrip() -> Result<(), CalibError> {
        let pose = look_at(DVec3::new(1.0, 2.0, 3.0), DVec3::ZERO, DVec3::Y)?;
        let rows = pose.to_rows();
        assert_eq!(rows[3], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(rows[0][3], 1.0);
        assert_eq!(rows[2][3], 3.0);
        assert_eq!(CameraPose::from_rows(&rows, pose.convention), pose);
        Ok(())
    }

    #[test]
    fn test_colmap_pose_looks_at_origin() -> Result<(), CalibError> {
        let builder = PoseBuilder::new(75.0, ConsumerConvention::COLMAP)?;
        let view = View {
            theta: 0.9,
            phi: 2.1,
        };
        let w2c = builder.build(&view)?;
        assert_eq!(w2c.convention, Convention::WorldToCamera);
        // the world origin lies on the optical axis, in front of the camera
        assert_vec3_eq(w2c.translation, DVec3::new(0.0, 0.0, 75.0), 1e-9);
        assert_vec3_eq(
            w2c.position(),
            spherical_to_cartesian(75.0, view.theta, view.phi),
            1e-9,
        );
        Ok(())
    }

    #[test]
    fn test_colmap_matches_opencv_remap() -> Result<(), CalibError> {
        let view = View {
            theta: 1.2,
            phi: -0.4,
        };
        let colmap = PoseBuilder::new(4.0, ConsumerConvention::COLMAP)?.build(&view)?;
        let eye = spherical_to_cartesian(4.0, view.theta, view.phi);
        let expected = AxisRemap::OPENCV_CAMERA
            .apply(&look_at(eye, DVec3::ZERO, DVec3::Y)?)
            .inverse();
        assert_pose_eq(&colmap, &expected, 1e-12);
        Ok(())
    }

    #[test]
    fn test_nerf_pose_axes() -> Result<(), CalibError> {
        let builder = PoseBuilder::new(4.0, ConsumerConvention::NERF)?;
        let view = View {
            theta: PI / 2.0,
            phi: 0.0,
        };
        let c2w = builder.build(&view)?;
        assert_eq!(c2w.convention, Convention::CameraToWorld);
        // renderer (0, 0, 4) lands on the world x axis after the y-up to z-up remap
        assert_vec3_eq(c2w.translation, DVec3::new(4.0, 0.0, 0.0), 1e-12);
        // OpenGL camera: +z points back, away from the origin
        assert_vec3_eq(c2w.rotation.z_axis, DVec3::X, 1e-12);
        // camera up is world up (+z)
        assert_vec3_eq(c2w.rotation.y_axis, DVec3::Z, 1e-12);
        assert!(rotation_deviation(&c2w.rotation) < 1e-12);
        Ok(())
    }

    #[test]
    fn test_pole_fallback() -> Result<(), CalibError> {
        let pole = View { theta: 0.0, phi: 0.3 };
        let strict = PoseBuilder::new(2.0, ConsumerConvention::NERF)?;
        assert!(matches!(strict.build(&pole), Err(CalibError::DegenerateLookAt)));

        let tolerant = strict.with_pole_up(Some(DVec3::Z));
        let pose = tolerant.build(&pole)?;
        assert!(rotation_deviation(&pose.rotation) < 1e-12);
        Ok(())
    }

    #[test]
    fn test_build_all_preserves_order() -> Result<(), CalibError> {
        let views = crate::sampling::golden_spiral(32);
        let builder = PoseBuilder::new(75.0, ConsumerConvention::COLMAP)?;
        let poses = builder.build_all(&views)?;
        assert_eq!(poses.len(), views.len());
        for (view, pose) in views.iter().zip(poses.iter()) {
            assert_eq!(*pose, builder.build(view)?);
        }
        Ok(())
    }

    #[test]
    fn test_invalid_radius() {
        assert!(PoseBuilder::new(0.0, ConsumerConvention::NERF).is_err());
        assert!(PoseBuilder::new(f64::NAN, ConsumerConvention::NERF).is_err());
    }
}
