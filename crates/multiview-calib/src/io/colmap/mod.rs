mod text;
pub use text::*;

mod types;
pub use types::*;

use std::path::Path;

use crate::error::CalibError;
use crate::io::manifest::PoseManifest;
use crate::io::{ensure_finite, write_file};
use crate::transforms::{check_rotation, rotation_to_quaternion};

/// Directory of the fixed-pose model handed to the triangulator.
pub const MANUAL_DIR: &str = "manual";

/// Directory of the sparse model, relative to the output.
pub const SPARSE_DIR: &str = "sparse/0";

/// Sidecar listing the test images.
pub const TEST_LIST_FILE: &str = "test.txt";

/// Error types for the COLMAP module.
#[derive(Debug, thiserror::Error)]
pub enum ColmapError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),

    /// Invalid calibration input
    #[error(transparent)]
    CalibError(#[from] CalibError),

    /// Invalid number of camera parameters
    #[error("Invalid number of camera parameters")]
    InvalidNumCameraParams(usize),
}

/// A fixed-pose COLMAP model: cameras, posed images and the test image list.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapBundle {
    /// One PINHOLE camera per image.
    pub cameras: Vec<ColmapCamera>,
    /// Posed images, world-to-camera.
    pub images: Vec<ColmapImage>,
    /// Names of every test image, whether included or not.
    pub test_images: Vec<String>,
}

impl ColmapBundle {
    /// Build the bundle from a pose manifest.
    ///
    /// Image and camera ids are the manifest index plus one. Test cameras are always
    /// listed in [`ColmapBundle::test_images`] but only posed when `include_test_cams`
    /// is set.
    ///
    /// # Arguments
    ///
    /// * `manifest` - The pose manifest, world-to-camera view matrices.
    /// * `include_test_cams` - Whether test cameras take part in the reconstruction.
    /// * `tolerance` - Maximum deviation of a view rotation from orthonormality.
    pub fn from_pose_manifest(
        manifest: &PoseManifest,
        include_test_cams: bool,
        tolerance: f64,
    ) -> Result<Self, ColmapError> {
        let mut cameras = Vec::new();
        let mut images = Vec::new();
        let mut test_images = Vec::new();

        for (i, entry) in manifest.cameras.iter().enumerate() {
            if entry.is_test_cam {
                test_images.push(entry.camera_id.clone());
                if !include_test_cams {
                    continue;
                }
            }

            let id = u32::try_from(i + 1).map_err(|_| CalibError::InvalidParameter {
                name: "cameras",
                reason: format!("camera index {i} exceeds the COLMAP id range"),
            })?;

            let pose = entry.pose();
            check_rotation(&pose.rotation, tolerance)?;
            let params = entry.pinhole_params();
            ensure_finite(
                || format!("calibration of {}", entry.camera_id),
                params.into_iter().chain(pose.translation.to_array()),
            )?;

            cameras.push(ColmapCamera {
                camera_id: id,
                model_id: CameraModelId::Pinhole,
                width: entry.intrinsics.resolution[0] as usize,
                height: entry.intrinsics.resolution[1] as usize,
                params: params.to_vec(),
            });

            images.push(ColmapImage {
                name: entry.camera_id.clone(),
                image_id: id,
                camera_id: id,
                rotation: rotation_to_quaternion(&pose.rotation).to_wxyz(),
                translation: pose.translation.to_array(),
            });
        }

        log::debug!(
            "colmap bundle with {} images, {} test images listed",
            images.len(),
            test_images.len()
        );

        Ok(Self {
            cameras,
            images,
            test_images,
        })
    }

    /// Write `manual/{cameras,images,points3D}.txt` and `sparse/0/test.txt` under `output`.
    pub fn write(&self, output: impl AsRef<Path>) -> Result<(), ColmapError> {
        let output = output.as_ref();
        let manual = output.join(MANUAL_DIR);

        // format everything before the first write
        let cameras = format_cameras_txt(&self.cameras)?;
        let images = format_images_txt(&self.images);
        let points = format_points3d_txt();
        let tests = format_test_list(&self.test_images);

        write_file(&manual.join("cameras.txt"), &cameras)?;
        write_file(&manual.join("images.txt"), &images)?;
        write_file(&manual.join("points3D.txt"), &points)?;
        write_file(&output.join(SPARSE_DIR).join(TEST_LIST_FILE), &tests)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Intrinsics;
    use crate::pose::{ConsumerConvention, PoseBuilder};
    use crate::sampling::{ViewSet, DEFAULT_TEST_THETAS};
    use crate::transforms::{quaternion_to_rotation, Quaternion};
    use super::text::reader::{read_cameras_txt, read_images_txt};
    use approx::assert_relative_eq;

    fn manifest() -> Result<PoseManifest, CalibError> {
        let views = ViewSet::sample(4, &DEFAULT_TEST_THETAS, 2)?;
        let intrinsics = Intrinsics::from_fov(128, 96, 40.0, (0.5, -0.5))?;
        let poses = PoseBuilder::new(75.0, ConsumerConvention::COLMAP)?.build_all(views.views())?;
        PoseManifest::from_poses(&poses, &intrinsics, views.num_train())
    }

    #[test]
    fn test_bundle_excludes_test_cams() -> Result<(), ColmapError> {
        let manifest = manifest()?;
        let bundle = ColmapBundle::from_pose_manifest(&manifest, false, 1e-6)?;
        assert_eq!(bundle.images.len(), 4);
        assert_eq!(bundle.cameras.len(), 4);
        assert_eq!(bundle.test_images.len(), 6);
        assert_eq!(bundle.test_images[0], "0004.png");

        for (i, (camera, image)) in bundle.cameras.iter().zip(bundle.images.iter()).enumerate() {
            assert_eq!(camera.camera_id, i as u32 + 1);
            assert_eq!(image.image_id, camera.camera_id);
            assert_eq!(image.camera_id, camera.camera_id);
            assert_eq!(camera.model_id, CameraModelId::Pinhole);
            assert_eq!(camera.params.len(), camera.model_id.num_params());
        }
        Ok(())
    }

    #[test]
    fn test_bundle_includes_test_cams() -> Result<(), ColmapError> {
        let bundle = ColmapBundle::from_pose_manifest(&manifest()?, true, 1e-6)?;
        assert_eq!(bundle.images.len(), 10);
        assert_eq!(bundle.images[9].image_id, 10);
        assert_eq!(bundle.images[9].name, "0009.png");
        assert_eq!(bundle.test_images.len(), 6);
        Ok(())
    }

    #[test]
    fn test_quaternions_match_view_rotation() -> Result<(), ColmapError> {
        let manifest = manifest()?;
        let bundle = ColmapBundle::from_pose_manifest(&manifest, true, 1e-6)?;
        for (entry, image) in manifest.cameras.iter().zip(bundle.images.iter()) {
            let q = Quaternion::from_wxyz(image.rotation);
            assert!(q.w >= 0.0);
            let r = quaternion_to_rotation(&q);
            let expected = entry.pose().rotation;
            for (a, b) in r.to_cols_array().iter().zip(expected.to_cols_array().iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn test_rejects_non_orthonormal() -> Result<(), ColmapError> {
        let mut manifest = manifest()?;
        manifest.cameras[0].extrinsics.view_matrix[0] += 0.01;
        assert!(matches!(
            ColmapBundle::from_pose_manifest(&manifest, false, 1e-6),
            Err(ColmapError::CalibError(CalibError::NonOrthonormalRotation { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_write_layout() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let bundle = ColmapBundle::from_pose_manifest(&manifest()?, false, 1e-6)?;
        bundle.write(dir.path())?;

        let manual = dir.path().join(MANUAL_DIR);
        assert_eq!(read_cameras_txt(manual.join("cameras.txt"))?, bundle.cameras);
        assert_eq!(read_images_txt(manual.join("images.txt"))?, bundle.images);

        let points = std::fs::read_to_string(manual.join("points3D.txt"))?;
        assert!(points.lines().all(|l| l.starts_with('#')));

        let tests = std::fs::read_to_string(dir.path().join(SPARSE_DIR).join(TEST_LIST_FILE))?;
        assert_eq!(tests.lines().count(), 6);
        assert!(tests.starts_with("0004.png\n"));
        Ok(())
    }
}
