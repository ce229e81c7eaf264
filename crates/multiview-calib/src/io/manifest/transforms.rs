use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::Intrinsics;
use crate::error::CalibError;
use crate::io::{ensure_finite, write_file};
use crate::normalize::NormalizedScene;
use crate::pose::{CameraPose, Convention};
use crate::sampling::view_id;

/// File name of the training transform manifest.
pub const TRAIN_TRANSFORMS_FILE: &str = "transforms.json";

/// File name of the test transform manifest.
pub const TEST_TRANSFORMS_FILE: &str = "transforms_test.json";

/// Per-image sharpness scores keyed by frame file path, e.g. `images/0000.png`.
///
/// Frames without a score get `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharpnessMap(pub BTreeMap<String, f64>);

impl SharpnessMap {
    /// Read scores from a JSON object mapping file paths to numbers.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// The score of `file_path`, or `0.0`.
    pub fn get(&self, file_path: &str) -> f64 {
        self.0.get(file_path).copied().unwrap_or(0.0)
    }
}

/// One frame of a [`TransformManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformFrame {
    /// Image path relative to the manifest.
    pub file_path: String,
    /// Image sharpness score.
    pub sharpness: f64,
    /// Normalized camera-to-world matrix, row-major.
    pub transform_matrix: [[f64; 4]; 4],
    /// Whether the frame belongs to the test document.
    #[serde(skip)]
    pub is_test: bool,
}

impl TransformFrame {
    /// The image path of the view with the given index.
    pub fn file_path_for(index: usize) -> String {
        format!("images/{}.png", view_id(index))
    }

    /// Build the frame of view `index` from its normalized camera-to-world pose.
    pub fn new(
        index: usize,
        pose: &CameraPose,
        sharpness: f64,
        is_test: bool,
    ) -> Result<Self, CalibError> {
        if pose.convention != Convention::CameraToWorld {
            return Err(CalibError::UnexpectedConvention {
                expected: Convention::CameraToWorld,
                actual: pose.convention,
            });
        }

        let file_path = Self::file_path_for(index);
        let transform_matrix = pose.to_rows();
        ensure_finite(
            || format!("transform matrix of {file_path}"),
            transform_matrix.iter().flatten().copied(),
        )?;
        ensure_finite(|| format!("sharpness of {file_path}"), [sharpness])?;

        Ok(Self {
            file_path,
            sharpness,
            transform_matrix,
            is_test,
        })
    }
}

/// A transform manifest for the neural trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformManifest {
    /// Image width in pixels.
    pub w: u32,
    /// Image height in pixels.
    pub h: u32,
    /// Horizontal focal length in pixels.
    pub fl_x: f64,
    /// Vertical focal length in pixels.
    pub fl_y: f64,
    /// Principal point x.
    pub cx: f64,
    /// Principal point y.
    pub cy: f64,
    /// Radial distortion k1, always zero.
    pub k1: f64,
    /// Radial distortion k2, always zero.
    pub k2: f64,
    /// Tangential distortion p1, always zero.
    pub p1: f64,
    /// Tangential distortion p2, always zero.
    pub p2: f64,
    /// Horizontal field of view in radians.
    pub camera_angle_x: f64,
    /// Vertical field of view in radians.
    pub camera_angle_y: f64,
    /// Scene bounding box scale.
    pub aabb_scale: u32,
    /// Frames in view order.
    pub frames: Vec<TransformFrame>,
}

impl TransformManifest {
    /// Build a manifest header from intrinsics and attach `frames`.
    pub fn new(
        intrinsics: &Intrinsics,
        aabb_scale: u32,
        frames: Vec<TransformFrame>,
    ) -> Result<Self, CalibError> {
        let manifest = Self {
            w: intrinsics.width,
            h: intrinsics.height,
            fl_x: intrinsics.focal_length,
            fl_y: intrinsics.focal_length,
            cx: intrinsics.principal_point.0,
            cy: intrinsics.principal_point.1,
            k1: 0.0,
            k2: 0.0,
            p1: 0.0,
            p2: 0.0,
            camera_angle_x: intrinsics.camera_angle_x(),
            camera_angle_y: intrinsics.camera_angle_y(),
            aabb_scale,
            frames,
        };

        ensure_finite(
            || "transform manifest intrinsics".to_string(),
            [
                manifest.fl_x,
                manifest.fl_y,
                manifest.cx,
                manifest.cy,
                manifest.camera_angle_x,
                manifest.camera_angle_y,
            ],
        )?;

        Ok(manifest)
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

    /// Read a manifest from `path`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// The training and test transform manifests of one normalized scene.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformManifests {
    /// Frames of the training views.
    pub train: TransformManifest,
    /// Frames of the test views, ids continuing after the training ids.
    pub test: TransformManifest,
}

impl TransformManifests {
    /// Split the frames of a normalized scene into training and test documents.
    ///
    /// Both documents share the same header and the scene's single normalization.
    pub fn from_scene(
        intrinsics: &Intrinsics,
        aabb_scale: u32,
        scene: &NormalizedScene,
        num_train: usize,
        sharpness: &SharpnessMap,
    ) -> Result<Self, CalibError> {
        let frames = scene
            .poses
            .iter()
            .enumerate()
            .map(|(i, pose)| {
                let file_path = TransformFrame::file_path_for(i);
                TransformFrame::new(i, pose, sharpness.get(&file_path), i >= num_train)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (test, train): (Vec<_>, Vec<_>) = frames.into_iter().partition(|f| f.is_test);

        Ok(Self {
            train: TransformManifest::new(intrinsics, aabb_scale, train)?,
            test: TransformManifest::new(intrinsics, aabb_scale, test)?,
        })
    }

    /// Write both documents into `dir`.
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<(), CalibError> {
        let dir = dir.as_ref();
        // serialize both before touching the disk
        let train = self.train.to_json_string()?;
        let test = self.test.to_json_string()?;
        write_file(&dir.join(TRAIN_TRANSFORMS_FILE), &train)?;
        write_file(&dir.join(TEST_TRANSFORMS_FILE), &test)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DMat3, DVec3};

    fn scene(n: usize) -> NormalizedScene {
        let poses = (0..n)
            .map(|i| {
                CameraPose::new(
                    DMat3::IDENTITY,
                    DVec3::new(i as f64, 0.0, 1.0),
                    Convention::CameraToWorld,
                )
            })
            .collect();
        NormalizedScene {
            poses,
            centroid: DVec3::ZERO,
            scale: 1.0,
        }
    }

    #[test]
    fn test_split_and_ids() -> Result<(), CalibError> {
        let intrinsics = Intrinsics::from_fov(32, 32, 90.0, (0.0, 0.0))?;
        let mut sharpness = SharpnessMap::default();
        sharpness.0.insert("images/0001.png".to_string(), 12.5);

        let manifests = TransformManifests::from_scene(&intrinsics, 1, &scene(5), 3, &sharpness)?;
        assert_eq!(manifests.train.frames.len(), 3);
        assert_eq!(manifests.test.frames.len(), 2);
        assert_eq!(manifests.train.frames[1].sharpness, 12.5);
        assert_eq!(manifests.train.frames[2].sharpness, 0.0);
        assert_eq!(manifests.test.frames[0].file_path, "images/0003.png");
        assert_eq!(manifests.test.frames[0].transform_matrix[0][3], 3.0);
        assert_eq!(manifests.train.w, manifests.test.w);
        assert_eq!(manifests.train.fl_x, manifests.train.fl_y);
        assert_eq!(manifests.train.aabb_scale, 1);
        Ok(())
    }

    #[test]
    fn test_json_layout() -> Result<(), CalibError> {
        let intrinsics = Intrinsics::from_fov(32, 32, 90.0, (0.0, 0.0))?;
        let manifests =
            TransformManifests::from_scene(&intrinsics, 1, &scene(1), 1, &SharpnessMap::default())?;
        let value: serde_json::Value = serde_json::from_str(&manifests.train.to_json_string()?)?;
        assert_eq!(value["k1"], 0.0);
        assert_eq!(value["frames"][0]["file_path"], "images/0000.png");
        assert_eq!(value["frames"][0]["transform_matrix"][3][3], 1.0);
        // the split flag never reaches the document
        assert!(value["frames"][0].get("is_test").is_none());
        assert!(manifests.test.frames.is_empty());
        Ok(())
    }

    #[test]
    fn test_write_both_documents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let intrinsics = Intrinsics::from_fov(32, 32, 90.0, (0.0, 0.0))?;
        let manifests =
            TransformManifests::from_scene(&intrinsics, 2, &scene(4), 2, &SharpnessMap::default())?;
        let out = dir.path().join("unpolarized");
        manifests.write(&out)?;

        let train = TransformManifest::read(out.join(TRAIN_TRANSFORMS_FILE))?;
        let test = TransformManifest::read(out.join(TEST_TRANSFORMS_FILE))?;
        assert_eq!(train.frames.len(), 2);
        assert_eq!(test.frames.len(), 2);
        assert_eq!(train.aabb_scale, 2);
        Ok(())
    }

    #[test]
    fn test_rejects_non_finite() {
        let pose = CameraPose::new(
            DMat3::IDENTITY,
            DVec3::new(f64::INFINITY, 0.0, 0.0),
            Convention::CameraToWorld,
        );
        assert!(matches!(
            TransformFrame::new(0, &pose, 0.0, false),
            Err(CalibError::NonFinite(_))
        ));
        assert!(matches!(
            TransformFrame::new(0, &pose.inverse(), 0.0, false),
            Err(CalibError::UnexpectedConvention { .. })
        ));
    }

    #[test]
    fn test_sharpness_map_from_json() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sharpness.json");
        std::fs::write(&path, r#"{"images/0000.png": 3.25}"#)?;
        let map = SharpnessMap::from_json(&path)?;
        assert_eq!(map.get("images/0000.png"), 3.25);
        assert_eq!(map.get("images/0001.png"), 0.0);
        Ok(())
    }
}
