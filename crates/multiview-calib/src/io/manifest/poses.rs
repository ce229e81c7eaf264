use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::Intrinsics;
use crate::error::CalibError;
use crate::io::{ensure_finite, write_file};
use crate::pose::{CameraPose, Convention};
use crate::sampling::view_id;

/// File name of the pose manifest.
pub const POSE_MANIFEST_FILE: &str = "poses.json";

/// Per-camera calibration in the SfM reconstructor's convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseManifest {
    /// One entry per view, training views first.
    pub cameras: Vec<PoseEntry>,
}

/// One camera of a [`PoseManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEntry {
    /// Image file name, e.g. `0003.png`.
    pub camera_id: String,
    /// Extrinsic parameters.
    pub extrinsics: ExtrinsicsRecord,
    /// Intrinsic parameters.
    pub intrinsics: IntrinsicsRecord,
    /// Whether the camera belongs to the test split.
    pub is_test_cam: bool,
}

/// The extrinsics of a [`PoseEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrinsicsRecord {
    /// World-to-camera homogeneous matrix, row-major.
    pub view_matrix: [f64; 16],
}

/// The intrinsics of a [`PoseEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicsRecord {
    /// Camera matrix K, row-major.
    pub camera_matrix: [f64; 9],
    /// Image size `[width, height]` in pixels.
    pub resolution: [u32; 2],
}

impl PoseEntry {
    /// The world-to-camera pose stored in the entry.
    pub fn pose(&self) -> CameraPose {
        let mut rows = [[0.0; 4]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            row.copy_from_slice(&self.extrinsics.view_matrix[4 * i..4 * i + 4]);
        }
        CameraPose::from_rows(&rows, Convention::WorldToCamera)
    }

    /// The PINHOLE parameters `[fx, fy, cx, cy]` of the camera matrix.
    pub fn pinhole_params(&self) -> [f64; 4] {
        let k = &self.intrinsics.camera_matrix;
        [k[0], k[4], k[2], k[5]]
    }
}

impl PoseManifest {
    /// Build the manifest from world-to-camera poses sharing one set of intrinsics.
    ///
    /// Views with index `>= num_train` are flagged as test cameras.
    ///
    /// # Errors
    ///
    /// * [`CalibError::UnexpectedConvention`] if a pose is camera-to-world.
    /// * [`CalibError::NonFinite`] if any emitted value is NaN or infinite.
    pub fn from_poses(
        poses: &[CameraPose],
        intrinsics: &Intrinsics,
        num_train: usize,
    ) -> Result<Self, CalibError> {
        let camera_matrix = flatten3(&intrinsics.camera_matrix());
        ensure_finite(|| "camera matrix".to_string(), camera_matrix)?;

        let cameras = poses
            .iter()
            .enumerate()
            .map(|(i, pose)| {
                if pose.convention != Convention::WorldToCamera {
                    return Err(CalibError::UnexpectedConvention {
                        expected: Convention::WorldToCamera,
                        actual: pose.convention,
                    });
                }

                let view_matrix = flatten4(&pose.to_rows());
                let camera_id = format!("{}.png", view_id(i));
                ensure_finite(|| format!("view matrix of {camera_id}"), view_matrix)?;

                Ok(PoseEntry {
                    camera_id,
                    extrinsics: ExtrinsicsRecord { view_matrix },
                    intrinsics: IntrinsicsRecord {
                        camera_matrix,
                        resolution: [intrinsics.width, intrinsics.height],
                    },
                    is_test_cam: i >= num_train,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { cameras })
    }

    /// Serialize the manifest as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, CalibError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the manifest to `path` in a single write.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        write_file(path.as_ref(), &self.to_json_string()?)?;
        Ok(())
    }

    /// Read a manifest written by [`PoseManifest::write`].
    pub fn read(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Number of training cameras.
    pub fn num_train(&self) -> usize {
        self.cameras.iter().filter(|c| !c.is_test_cam).count()
    }
}

fn flatten3(m: &[[f64; 3]; 3]) -> [f64; 9] {
    let mut out = [0.0; 9];
    for (i, row) in m.iter().enumerate() {
        out[3 * i..3 * i + 3].copy_from_slice(row);
    }
    out
}

fn flatten4(m: &[[f64; 4]; 4]) -> [f64; 16] {
    let mut out = [0.0; 16];
    for (i, row) in m.iter().enumerate() {
        out[4 * i..4 * i + 4].copy_from_slice(row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{ConsumerConvention, PoseBuilder};
    use crate::sampling::golden_spiral;
    use glam::DVec3;

    fn manifest() -> Result<PoseManifest, CalibError> {
        let intrinsics = Intrinsics::from_fov(64, 48, 60.0, (0.0, 0.0))?;
        let builder = PoseBuilder::new(75.0, ConsumerConvention::COLMAP)?;
        let poses = builder.build_all(&golden_spiral(3))?;
        PoseManifest::from_poses(&poses, &intrinsics, 2)
    }

    #[test]
    fn test_entries() -> Result<(), CalibError> {
        let manifest = manifest()?;
        assert_eq!(manifest.cameras.len(), 3);
        assert_eq!(manifest.cameras[1].camera_id, "0001.png");
        assert!(!manifest.cameras[1].is_test_cam);
        assert!(manifest.cameras[2].is_test_cam);
        assert_eq!(manifest.num_train(), 2);

        let entry = &manifest.cameras[0];
        assert_eq!(entry.intrinsics.resolution, [64, 48]);
        assert_eq!(entry.extrinsics.view_matrix[12..], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(entry.pinhole_params()[2], 32.0);
        assert_eq!(entry.pinhole_params()[3], 24.0);
        Ok(())
    }

    #[test]
    fn test_pose_readback() -> Result<(), CalibError> {
        let intrinsics = Intrinsics::from_fov(64, 48, 60.0, (0.0, 0.0))?;
        let builder = PoseBuilder::new(75.0, ConsumerConvention::COLMAP)?;
        let poses = builder.build_all(&golden_spiral(2))?;
        let manifest = PoseManifest::from_poses(&poses, &intrinsics, 2)?;
        for (entry, pose) in manifest.cameras.iter().zip(poses.iter()) {
            assert_eq!(entry.pose(), *pose);
        }
        Ok(())
    }

    #[test]
    fn test_file_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(POSE_MANIFEST_FILE);
        let manifest = manifest()?;
        manifest.write(&path)?;

        let text = std::fs::read_to_string(&path)?;
        assert!(text.starts_with("{\n  \"cameras\": ["));
        assert_eq!(PoseManifest::read(&path)?, manifest);
        Ok(())
    }

    #[test]
    fn test_rejects_non_finite() -> Result<(), CalibError> {
        let intrinsics = Intrinsics::from_fov(64, 48, 60.0, (0.0, 0.0))?;
        let pose = CameraPose::new(
            glam::DMat3::IDENTITY,
            DVec3::new(f64::NAN, 0.0, 0.0),
            Convention::WorldToCamera,
        );
        assert!(matches!(
            PoseManifest::from_poses(&[pose], &intrinsics, 1),
            Err(CalibError::NonFinite(_))
        ));
        Ok(())
    }

    #[test]
    fn test_rejects_camera_to_world() -> Result<(), CalibError> {
        let intrinsics = Intrinsics::from_fov(64, 48, 60.0, (0.0, 0.0))?;
        let pose = CameraPose::new(glam::DMat3::IDENTITY, DVec3::ZERO, Convention::CameraToWorld);
        assert!(matches!(
            PoseManifest::from_poses(&[pose], &intrinsics, 1),
            Err(CalibError::UnexpectedConvention { .. })
        ));
        Ok(())
    }
}
