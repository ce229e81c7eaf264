use glam::{DMat3, DVec3};

use super::{CameraPose, Convention};

/// A fixed change of axes applied to a camera pose.
///
/// `world` is a signed permutation re-expressing world coordinates and `camera` holds
/// per-axis signs re-expressing the camera frame. For a camera-to-world pose the result
/// is `R' = W R S`, `t' = W t`; for world-to-camera it is `R' = S R W^T`, `t' = S t`.
/// Both forms describe the same physical camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRemap {
    /// Signed permutation applied to world coordinates.
    pub world: DMat3,
    /// Signs applied to the camera axes.
    pub camera: DVec3,
}

impl AxisRemap {
    /// Leaves poses unchanged.
    pub const IDENTITY: Self = Self {
        world: DMat3::IDENTITY,
        camera: DVec3::ONE,
    };

    /// Renderer camera (`+x` left, `+y` up, `+z` forward) to OpenCV camera
    /// (`+x` right, `+y` down, `+z` forward). World axes are kept.
    pub const OPENCV_CAMERA: Self = Self {
        world: DMat3::IDENTITY,
        camera: DVec3::new(-1.0, -1.0, 1.0),
    };

    /// Renderer frame to the neural trainer's frame.
    ///
    /// World `(x, y, z)` becomes `(z, x, y)`, turning the renderer's `+y` up into `+z` up.
    /// The camera becomes an OpenGL camera (`+x` right, `+y` up, `+z` back).
    pub const NERF: Self = Self {
        world: DMat3::from_cols(
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 0.0),
        ),
        camera: DVec3::new(-1.0, 1.0, -1.0),
    };

    /// Apply the remap to a pose, keeping its convention.
    pub fn apply(&self, pose: &CameraPose) -> CameraPose {
        let signs = DMat3::from_diagonal(self.camera);
        match pose.convention {
            Convention::CameraToWorld => CameraPose::new(
                self.world * pose.rotation * signs,
                self.world * pose.translation,
                pose.convention,
            ),
            Convention::WorldToCamera => CameraPose::new(
                signs * pose.rotation * self.world.transpose(),
                self.camera * pose.translation,
                pose.convention,
            ),
        }
    }

    /// The remap undoing this one.
    pub fn inverse(&self) -> Self {
        Self {
            world: self.world.transpose(),
            camera: self.camera,
        }
    }

    /// Whether the remap is a signed permutation with unit signs that preserves handedness.
    ///
    /// Proper remaps map rotations to rotations.
    pub fn is_proper(&self) -> bool {
        let unit = |v: f64| v == 1.0 || v == -1.0;
        let signed_permutation = (0..3).all(|i| {
            let row = self.world.row(i).to_array();
            let col = self.world.col(i).to_array();
            let nonzero = |xs: [f64; 3]| xs.iter().filter(|v| **v != 0.0).count() == 1;
            nonzero(row) && nonzero(col) && row.iter().all(|v| *v == 0.0 || unit(*v))
        });
        let handedness =
            self.world.determinant() * self.camera.x * self.camera.y * self.camera.z;
        signed_permutation && self.camera.to_array().iter().all(|v| unit(*v)) && handedness > 0.0
    }
}

/// The pose convention expected by a downstream consumer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumerConvention {
    /// Name used in logs.
    pub name: &'static str,
    /// World up vector handed to the look-at builder.
    pub up: DVec3,
    /// Axis remap applied to the renderer-frame camera-to-world pose.
    pub remap: AxisRemap,
    /// Transform direction the consumer stores.
    pub direction: Convention,
}

impl ConsumerConvention {
    /// The SfM reconstructor: OpenCV cameras, world-to-camera.
    ///
    /// Looking at the scene with up `-y` directly yields the OpenCV camera frame, which
    /// is the same as up `+y` followed by [`AxisRemap::OPENCV_CAMERA`].
    pub const COLMAP: Self = Self {
        name: "colmap",
        up: DVec3::new(0.0, -1.0, 0.0),
        remap: AxisRemap::IDENTITY,
        direction: Convention::WorldToCamera,
    };

    /// The neural trainer: OpenGL cameras in a `+z` up world, camera-to-world.
    pub const NERF: Self = Self {
        name: "nerf",
        up: DVec3::new(0.0, 1.0, 0.0),
        remap: AxisRemap::NERF,
        direction: Convention::CameraToWorld,
    };
}
