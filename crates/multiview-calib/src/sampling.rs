use std::f64::consts::PI;

use crate::error::CalibError;

/// A viewing direction on the unit sphere.
///
/// `theta` is the polar angle measured from the vertical axis and `phi` the azimuth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    /// Polar angle in radians, in `[0, pi]`.
    pub theta: f64,
    /// Azimuthal angle in radians, unbounded.
    pub phi: f64,
}

/// Generate `n` near-uniform viewing directions on a golden-angle spiral.
///
/// `theta_i = acos(1 - 2 (i + 0.5) / n)` and `phi_i = pi (1 + sqrt(5)) (i + 0.5)`.
/// For `n = 1` the single view sits at `theta = acos(1) = 0`.
///
/// Example:
///
/// ```
/// use multiview_calib::sampling::golden_spiral;
///
/// let views = golden_spiral(4);
/// assert_eq!(views.len(), 4);
/// assert_eq!(views[0].theta, 0.75f64.acos());
/// ```
pub fn golden_spiral(n: usize) -> Vec<View> {
    let increment = PI * (1.0 + 5.0f64.sqrt());

    if n == 1 {
        return vec![View {
            theta: 1.0f64.acos(),
            phi: increment * 0.5,
        }];
    }

    (0..n)
        .map(|i| {
            let k = i as f64 + 0.5;
            // clamp guards acos against rounding just outside [-1, 1]
            let z = (1.0 - 2.0 * k / n as f64).clamp(-1.0, 1.0);
            View {
                theta: z.acos(),
                phi: increment * k,
            }
        })
        .collect()
}

/// Generate a fixed test grid as the outer product of polar bands and uniform azimuths.
///
/// Views are ordered azimuth-major: for each azimuth `2 pi k / azimuth_count`, every
/// polar band in the order given.
pub fn test_grid(thetas: &[f64], azimuth_count: usize) -> Vec<View> {
    let mut views = Vec::with_capacity(thetas.len() * azimuth_count);
    for k in 0..azimuth_count {
        let phi = 2.0 * PI * k as f64 / azimuth_count as f64;
        views.extend(thetas.iter().map(|&theta| View { theta, phi }));
    }
    views
}

/// Default polar bands of the test grid.
pub const DEFAULT_TEST_THETAS: [f64; 3] = [0.35 * PI, 0.5 * PI, 0.65 * PI];

/// An ordered set of training views followed by test views.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSet {
    views: Vec<View>,
    num_train: usize,
}

impl ViewSet {
    /// Sample `num_train` spiral views and append the test grid.
    ///
    /// # Arguments
    ///
    /// * `num_train` - Number of training views, at least 1.
    /// * `test_thetas` - Polar bands of the test grid.
    /// * `test_azimuths` - Number of azimuths of the test grid.
    pub fn sample(
        num_train: usize,
        test_thetas: &[f64],
        test_azimuths: usize,
    ) -> Result<Self, CalibError> {
        Self::from_parts(golden_spiral(num_train), test_grid(test_thetas, test_azimuths))
    }

    /// Concatenate explicit training and test views.
    pub fn from_parts(train: Vec<View>, test: Vec<View>) -> Result<Self, CalibError> {
        if train.is_empty() {
            return Err(CalibError::EmptyViewSet);
        }

        if let Some(view) = train.iter().chain(test.iter()).find(|v| {
            !v.phi.is_finite() || !v.theta.is_finite() || v.theta < 0.0 || v.theta > PI
        }) {
            return Err(CalibError::InvalidParameter {
                name: "view",
                reason: format!("theta must lie in [0, pi], got {view:?}"),
            });
        }

        let num_train = train.len();
        let mut views = train;
        views.extend(test);
        Ok(Self { views, num_train })
    }

    /// All views, training first.
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Number of training views.
    pub fn num_train(&self) -> usize {
        self.num_train
    }

    /// Total number of views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Always false; a view set has at least one training view.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Whether the view at `index` belongs to the test split.
    pub fn is_test(&self, index: usize) -> bool {
        index >= self.num_train
    }
}

/// The canonical zero-padded identity of a view index, e.g. `0007`.
pub fn view_id(index: usize) -> String {
    format!("{index:04}")
}
