use crate::error::CalibError;

/// Convert a field of view in degrees to a focal length in pixels.
///
/// # Arguments
///
/// * `fov_deg` - The field of view along the image axis, in degrees.
/// * `size` - The image size along the same axis, in pixels.
///
/// Example:
///
/// ```
/// use multiview_calib::camera::fov_to_focal;
///
/// let f = fov_to_focal(90.0, 512.0);
/// assert!((f - 256.0).abs() < 1e-9);
/// ```
pub fn fov_to_focal(fov_deg: f64, size: f64) -> f64 {
    size / (2.0 * (fov_deg.to_radians() / 2.0).tan())
}

/// The intrinsic parameters of a pinhole camera with square pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    /// The image width in pixels.
    pub width: u32,
    /// The image height in pixels.
    pub height: u32,
    /// The focal length in pixels, shared by both axes.
    pub focal_length: f64,
    /// The principal point in pixels (cx, cy).
    pub principal_point: (f64, f64),
}

impl Intrinsics {
    /// Derive intrinsics from the sensor resolution and horizontal field of view.
    ///
    /// The principal point is the image center shifted by `principal_point_offset` pixels.
    ///
    /// # Arguments
    ///
    /// * `width` - Sensor width in pixels.
    /// * `height` - Sensor height in pixels.
    /// * `fov_x_deg` - Horizontal field of view in degrees, in `(0, 180)`.
    /// * `principal_point_offset` - Offset (x, y) of the principal point from the image center.
    pub fn from_fov(
        width: u32,
        height: u32,
        fov_x_deg: f64,
        principal_point_offset: (f64, f64),
    ) -> Result<Self, CalibError> {
        if width == 0 || height == 0 {
            return Err(CalibError::InvalidParameter {
                name: "film_size",
                reason: format!("resolution must be positive, got {width}x{height}"),
            });
        }

        if !(fov_x_deg > 0.0 && fov_x_deg < 180.0) {
            return Err(CalibError::InvalidParameter {
                name: "x_fov",
                reason: format!("field of view must lie in (0, 180) degrees, got {fov_x_deg}"),
            });
        }

        if !principal_point_offset.0.is_finite() || !principal_point_offset.1.is_finite() {
            return Err(CalibError::InvalidParameter {
                name: "principal_point_offset",
                reason: "offsets must be finite".to_string(),
            });
        }

        Ok(Self {
            width,
            height,
            focal_length: fov_to_focal(fov_x_deg, width as f64),
            principal_point: (
                width as f64 / 2.0 + principal_point_offset.0,
                height as f64 / 2.0 + principal_point_offset.1,
            ),
        })
    }

    /// Returns the camera matrix K as a row-major 3x3 array.
    pub fn camera_matrix(&self) -> [[f64; 3]; 3] {
        let f = self.focal_length;
        let (cx, cy) = self.principal_point;
        [[f, 0.0, cx], [0.0, f, cy], [0.0, 0.0, 1.0]]
    }

    /// Horizontal field of view in radians.
    pub fn camera_angle_x(&self) -> f64 {
        (self.width as f64 / (2.0 * self.focal_length)).atan() * 2.0
    }

    /// Vertical field of view in radians.
    pub fn camera_angle_y(&self) -> f64 {
        (self.height as f64 / (2.0 * self.focal_length)).atan() * 2.0
    }

    /// PINHOLE parameters in COLMAP order: fx, fy, cx, cy.
    pub fn pinhole_params(&self) -> [f64; 4] {
        [
            self.focal_length,
            self.focal_length,
            self.principal_point.0,
            self.principal_point.1,
        ]
    }
}
