use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

use crate::camera::Intrinsics;
use crate::error::CalibError;

/// Read-only access to the renderer's sensor description.
pub trait SceneParameters {
    /// The intrinsics of the scene's sensor.
    fn intrinsics(&self) -> Result<Intrinsics, CalibError>;
}

/// Sensor parameters as exported by the renderer.
///
/// Every field is optional on disk so a missing one is reported by name instead of
/// failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorParameters {
    /// Film size in pixels, `[width, height]`.
    pub film_size: Option<[u32; 2]>,
    /// Horizontal field of view in degrees.
    pub x_fov: Option<f64>,
    /// Horizontal offset of the principal point from the image center, in pixels.
    pub principal_point_offset_x: Option<f64>,
    /// Vertical offset of the principal point from the image center, in pixels.
    pub principal_point_offset_y: Option<f64>,
}

impl SensorParameters {
    /// Read sensor parameters from a JSON file.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Replace the film size with a square `resolution x resolution` film.
    pub fn with_resolution(mut self, resolution: Option<u32>) -> Self {
        if let Some(r) = resolution {
            self.film_size = Some([r, r]);
        }
        self
    }
}

impl SceneParameters for SensorParameters {
    fn intrinsics(&self) -> Result<Intrinsics, CalibError> {
        let [width, height] = self
            .film_size
            .ok_or(CalibError::MissingParameter("film_size"))?;
        let x_fov = self.x_fov.ok_or(CalibError::MissingParameter("x_fov"))?;
        let offset_x = self
            .principal_point_offset_x
            .ok_or(CalibError::MissingParameter("principal_point_offset_x"))?;
        let offset_y = self
            .principal_point_offset_y
            .ok_or(CalibError::MissingParameter("principal_point_offset_y"))?;

        Intrinsics::from_fov(width, height, x_fov, (offset_x, offset_y))
    }
}

/// Named object transforms of a scene that can be read and replaced.
pub trait TransformStore {
    /// The current transform of `name`, if the scene has such an object.
    fn transform(&self, name: &str) -> Option<DMat4>;

    /// Replace the transform of `name`.
    fn set_transform(&mut self, name: &str, transform: DMat4) -> Result<(), CalibError>;
}

/// An in-memory [`TransformStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneTransforms {
    transforms: BTreeMap<String, DMat4>,
}

impl SceneTransforms {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object with its initial transform.
    pub fn insert(&mut self, name: impl Into<String>, transform: DMat4) {
        self.transforms.insert(name.into(), transform);
    }
}

impl TransformStore for SceneTransforms {
    fn transform(&self, name: &str) -> Option<DMat4> {
        self.transforms.get(name).copied()
    }

    fn set_transform(&mut self, name: &str, transform: DMat4) -> Result<(), CalibError> {
        match self.transforms.get_mut(name) {
            Some(slot) => {
                *slot = transform;
                Ok(())
            }
            None => Err(CalibError::UnknownTransform(name.to_string())),
        }
    }
}

/// Where hidden objects are moved, far outside any camera frustum.
pub const HIDDEN_OFFSET: DVec3 = DVec3::new(0.0, 10000.0, 0.0);

/// Temporarily overrides object transforms and restores them when dropped.
///
/// The originals are restored on every exit path, including early returns with `?`.
///
/// Example:
///
/// ```
/// use glam::DMat4;
/// use multiview_calib::scene::{SceneTransforms, TransformOverride, TransformStore};
///
/// let mut scene = SceneTransforms::new();
/// scene.insert("occluder", DMat4::IDENTITY);
/// {
///     let guard = TransformOverride::hide(&mut scene, ["occluder"]).unwrap();
///     assert_ne!(guard.transform("occluder"), Some(DMat4::IDENTITY));
/// }
/// assert_eq!(scene.transform("occluder"), Some(DMat4::IDENTITY));
/// ```
pub struct TransformOverride<'a, S: TransformStore> {
    store: &'a mut S,
    originals: Vec<(String, DMat4)>,
}

impl<'a, S: TransformStore> TransformOverride<'a, S> {
    /// Apply `overrides` to `store`.
    ///
    /// Fails without touching the store if any name is unknown.
    pub fn apply<I, K>(store: &'a mut S, overrides: I) -> Result<Self, CalibError>
    where
        I: IntoIterator<Item = (K, DMat4)>,
        K: Into<String>,
    {
        let overrides = overrides
            .into_iter()
            .map(|(name, transform)| (name.into(), transform))
            .collect::<Vec<_>>();

        let originals = overrides
            .iter()
            .map(|(name, _)| {
                store
                    .transform(name)
                    .map(|t| (name.clone(), t))
                    .ok_or_else(|| CalibError::UnknownTransform(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut guard = Self {
            store,
            originals: Vec::with_capacity(originals.len()),
        };
        for ((name, transform), original) in overrides.iter().zip(originals) {
            guard.store.set_transform(name, *transform)?;
            guard.originals.push(original);
        }

        Ok(guard)
    }

    /// Move the named objects to [`HIDDEN_OFFSET`] for the lifetime of the guard.
    pub fn hide<I, K>(store: &'a mut S, names: I) -> Result<Self, CalibError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let hidden = DMat4::from_translation(HIDDEN_OFFSET);
        Self::apply(store, names.into_iter().map(|name| (name, hidden)))
    }
}

impl<S: TransformStore> Deref for TransformOverride<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: TransformStore> DerefMut for TransformOverride<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.store
    }
}

impl<S: TransformStore> Drop for TransformOverride<'_, S> {
    fn drop(&mut self) {
        // restore in reverse so repeated names end up with their first original
        for (name, transform) in self.originals.drain(..).rev() {
            if let Err(e) = self.store.set_transform(&name, transform) {
                log::error!("failed to restore transform of {name}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SceneTransforms {
        let mut scene = SceneTransforms::new();
        scene.insert("polarizer_cam", DMat4::from_translation(DVec3::new(0.0, 0.0, 74.9)));
        scene.insert("polarizer_light", DMat4::from_rotation_y(0.5));
        scene
    }

    #[test]
    fn test_sensor_intrinsics() -> Result<(), CalibError> {
        let sensor = SensorParameters {
            film_size: Some([800, 600]),
            x_fov: Some(90.0),
            principal_point_offset_x: Some(2.0),
            principal_point_offset_y: Some(0.0),
        };
        let intr = sensor.intrinsics()?;
        assert_eq!(intr.width, 800);
        assert_eq!(intr.principal_point, (402.0, 300.0));

        let square = sensor.with_resolution(Some(256)).intrinsics()?;
        assert_eq!((square.width, square.height), (256, 256));
        Ok(())
    }

    #[test]
    fn test_missing_parameter() {
        let sensor = SensorParameters {
            film_size: Some([800, 600]),
            x_fov: Some(45.0),
            principal_point_offset_x: Some(0.0),
            principal_point_offset_y: None,
        };
        assert!(matches!(
            sensor.intrinsics(),
            Err(CalibError::MissingParameter("principal_point_offset_y"))
        ));
    }

    #[test]
    fn test_sensor_from_json() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene.json");
        std::fs::write(
            &path,
            r#"{"film_size": [512, 512], "x_fov": 39.6, "principal_point_offset_x": 0.0}"#,
        )?;
        let sensor = SensorParameters::from_json(&path)?;
        assert_eq!(sensor.film_size, Some([512, 512]));
        assert!(sensor.intrinsics().is_err());
        Ok(())
    }

    #[test]
    fn test_override_restores_on_drop() -> Result<(), CalibError> {
        let mut scene = scene();
        let before = scene.clone();
        {
            let guard = TransformOverride::hide(&mut scene, ["polarizer_cam", "polarizer_light"])?;
            let hidden = guard.transform("polarizer_cam").expect("registered");
            assert_eq!(hidden.w_axis.truncate(), HIDDEN_OFFSET);
        }
        assert_eq!(scene, before);
        Ok(())
    }

    #[test]
    fn test_override_restores_on_error_path() {
        fn render_pass(scene: &mut SceneTransforms) -> Result<(), CalibError> {
            let mut guard = TransformOverride::hide(scene, ["polarizer_cam"])?;
            guard.set_transform("missing", DMat4::IDENTITY)?;
            Ok(())
        }

        let mut scene = scene();
        let before = scene.clone();
        assert!(matches!(
            render_pass(&mut scene),
            Err(CalibError::UnknownTransform(_))
        ));
        assert_eq!(scene, before);
    }

    #[test]
    fn test_override_unknown_name_leaves_store_untouched() {
        let mut scene = scene();
        let before = scene.clone();
        let result = TransformOverride::apply(
            &mut scene,
            [("polarizer_cam", DMat4::IDENTITY), ("head", DMat4::IDENTITY)],
        );
        assert!(matches!(result.err(), Some(CalibError::UnknownTransform(name)) if name == "head"));
        assert_eq!(scene, before);
    }

    #[test]
    fn test_repeated_name_restores_original() -> Result<(), CalibError> {
        let mut scene = scene();
        let before = scene.clone();
        {
            let _guard = TransformOverride::apply(
                &mut scene,
                [
                    ("polarizer_cam", DMat4::IDENTITY),
                    ("polarizer_cam", DMat4::from_scale(DVec3::splat(2.0))),
                ],
            )?;
        }
        assert_eq!(scene, before);
        Ok(())
    }
}
