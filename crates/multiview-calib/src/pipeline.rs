use crate::camera::Intrinsics;
use crate::centroid::{estimate_centroid, rays_from_poses};
use crate::config::CalibConfig;
use crate::error::CalibError;
use crate::io::colmap::{ColmapBundle, ColmapError};
use crate::io::manifest::{PoseManifest, SharpnessMap, TransformManifests};
use crate::normalize::{normalize_scene, NormalizedScene};
use crate::pose::{CameraPose, ConsumerConvention, PoseBuilder};
use crate::sampling::ViewSet;
use crate::scene::SceneParameters;

/// Runs view sampling, pose building, normalization and emission for one scene.
///
/// The pipeline holds only immutable inputs; every stage recomputes from them, so the
/// same pipeline always produces the same artifacts.
#[derive(Debug, Clone)]
pub struct CalibrationPipeline {
    config: CalibConfig,
    intrinsics: Intrinsics,
    views: ViewSet,
}

impl CalibrationPipeline {
    /// Create a pipeline for `num_train` spiral views plus the configured test grid.
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration.
    /// * `scene` - Source of the sensor intrinsics.
    /// * `num_train` - Number of training views, at least 1.
    pub fn new(
        config: CalibConfig,
        scene: &impl SceneParameters,
        num_train: usize,
    ) -> Result<Self, CalibError> {
        config.validate()?;
        let intrinsics = scene.intrinsics()?;
        let views = ViewSet::sample(num_train, &config.test_thetas, config.test_azimuths)?;

        log::info!(
            "{} training and {} test views, {}x{} px, focal length {:.3}",
            views.num_train(),
            views.len() - views.num_train(),
            intrinsics.width,
            intrinsics.height,
            intrinsics.focal_length
        );

        Ok(Self {
            config,
            intrinsics,
            views,
        })
    }

    /// The run configuration.
    pub fn config(&self) -> &CalibConfig {
        &self.config
    }

    /// The sensor intrinsics shared by all views.
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// The sampled views, training first.
    pub fn views(&self) -> &ViewSet {
        &self.views
    }

    /// Build every view's pose for `consumer`.
    pub fn poses(&self, consumer: ConsumerConvention) -> Result<Vec<CameraPose>, CalibError> {
        let builder =
            PoseBuilder::new(self.config.radius, consumer)?.with_pole_up(self.config.pole_up());
        let poses = builder.build_all(self.views.views())?;
        log::debug!("built {} {} poses", poses.len(), consumer.name);
        Ok(poses)
    }

    /// The pose manifest in the SfM reconstructor's convention.
    pub fn pose_manifest(&self) -> Result<PoseManifest, CalibError> {
        let poses = self.poses(ConsumerConvention::COLMAP)?;
        PoseManifest::from_poses(&poses, &self.intrinsics, self.views.num_train())
    }

    /// The neural trainer's poses, recentered on the estimated look-at point and rescaled.
    ///
    /// The centroid is estimated from the rays of every view; the scale from the training
    /// views only.
    pub fn normalized_scene(&self) -> Result<NormalizedScene, CalibError> {
        let poses = self.poses(ConsumerConvention::NERF)?;
        let centroid = estimate_centroid(&rays_from_poses(&poses)?)?;
        let scene = normalize_scene(
            &poses,
            self.views.num_train(),
            centroid,
            self.config.canonical_scale,
        )?;

        log::info!(
            "scene centroid {:?}, scale factor {:.6}",
            scene.centroid.to_array(),
            scene.scale
        );

        Ok(scene)
    }

    /// The training and test transform manifests.
    pub fn transform_manifests(
        &self,
        sharpness: &SharpnessMap,
    ) -> Result<TransformManifests, CalibError> {
        let scene = self.normalized_scene()?;
        TransformManifests::from_scene(
            &self.intrinsics,
            self.config.aabb_scale,
            &scene,
            self.views.num_train(),
            sharpness,
        )
    }

    /// The fixed-pose COLMAP bundle built from this pipeline's pose manifest.
    pub fn colmap_bundle(&self, include_test_cams: bool) -> Result<ColmapBundle, ColmapError> {
        ColmapBundle::from_pose_manifest(
            &self.pose_manifest()?,
            include_test_cams,
            self.config.orthonormal_tolerance,
        )
    }
}
