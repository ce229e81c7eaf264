use glam::DMat3;

use crate::error::CalibError;
use crate::utils;

/// A unit quaternion with components ordered `[w, x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    /// Real part.
    pub w: f64,
    /// i component.
    pub x: f64,
    /// j component.
    pub y: f64,
    /// k component.
    pub z: f64,
}

impl Quaternion {
    /// Create a quaternion from its `[w, x, y, z]` components.
    pub fn from_wxyz(q: [f64; 4]) -> Self {
        Self {
            w: q[0],
            x: q[1],
            y: q[2],
            z: q[3],
        }
    }

    /// Components as `[w, x, y, z]`.
    pub fn to_wxyz(&self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }

    /// Euclidean norm of the four components.
    pub fn norm(&self) -> f64 {
        self.to_wxyz().iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Pick the representative of `{q, -q}` with `w >= 0`.
    ///
    /// When `w` is exactly zero the first non-zero of `x, y, z` is made positive.
    pub fn canonicalize(self) -> Self {
        let lead = self
            .to_wxyz()
            .into_iter()
            .find(|c| *c != 0.0)
            .unwrap_or(0.0);
        if lead < 0.0 {
            Self::from_wxyz(self.to_wxyz().map(|c| -c))
        } else {
            self
        }
    }
}

/// Convert a rotation matrix to a unit quaternion.
///
/// The quaternion is the eigenvector of the largest eigenvalue of the symmetric 4x4
/// matrix built from the rotation entries, which stays stable when the trace of the
/// rotation approaches -1. The sign is canonicalized so that `w >= 0`.
///
/// # Arguments
///
/// * `rotation` - A rotation matrix. Small deviations from orthonormality are tolerated.
///
/// # Returns
///
/// The canonical quaternion `[w, x, y, z]`.
///
/// Example:
///
/// ```
/// use glam::DMat3;
/// use multiview_calib::transforms::rotation_to_quaternion;
///
/// let q = rotation_to_quaternion(&DMat3::IDENTITY);
/// assert!((q.w - 1.0).abs() < 1e-12);
/// ```
pub fn rotation_to_quaternion(rotation: &DMat3) -> Quaternion {
    let [[rxx, ryx, rzx], [rxy, ryy, rzy], [rxz, ryz, rzz]] = utils::dmat3_to_rows(rotation);

    // lower triangle of K, eigenvector components ordered [x, y, z, w]
    let third = 1.0 / 3.0;
    let k = [
        [(rxx - ryy - rzz) * third, 0.0, 0.0, 0.0],
        [(ryx + rxy) * third, (ryy - rxx - rzz) * third, 0.0, 0.0],
        [(rzx + rxz) * third, (rzy + ryz) * third, (rzz - rxx - ryy) * third, 0.0],
        [
            (ryz - rzy) * third,
            (rzx - rxz) * third,
            (rxy - ryx) * third,
            (rxx + ryy + rzz) * third,
        ],
    ];

    let k_mat = utils::lower4_to_faer_mat(&k);
    let evd = k_mat.selfadjoint_eigendecomposition(faer::Side::Lower);
    let eigenvalues = evd.s().column_vector();
    let eigenvectors = evd.u();

    let mut best = 0;
    for i in 1..4 {
        if eigenvalues.read(i) > eigenvalues.read(best) {
            best = i;
        }
    }

    let q = Quaternion {
        w: eigenvectors.read(3, best),
        x: eigenvectors.read(0, best),
        y: eigenvectors.read(1, best),
        z: eigenvectors.read(2, best),
    };

    let norm = q.norm();
    Quaternion::from_wxyz(q.to_wxyz().map(|c| c / norm)).canonicalize()
}

/// Convert a quaternion to a rotation matrix.
///
/// The input is normalized first, so any non-zero quaternion is accepted.
pub fn quaternion_to_rotation(q: &Quaternion) -> DMat3 {
    let norm = q.norm();
    let (w, x, y, z) = (q.w / norm, q.x / norm, q.y / norm, q.z / norm);

    utils::rows_to_dmat3(&[
        [
            1.0 - 2.0 * y * y - 2.0 * z * z,
            2.0 * x * y - 2.0 * w * z,
            2.0 * z * x + 2.0 * w * y,
        ],
        [
            2.0 * x * y + 2.0 * w * z,
            1.0 - 2.0 * x * x - 2.0 * z * z,
            2.0 * y * z - 2.0 * w * x,
        ],
        [
            2.0 * z * x - 2.0 * w * y,
            2.0 * y * z + 2.0 * w * x,
            1.0 - 2.0 * x * x - 2.0 * y * y,
        ],
    ])
}

/// Max-abs deviation of `R^T R` from the identity.
///
/// Returns infinity for matrices with a non-positive determinant.
pub fn rotation_deviation(rotation: &DMat3) -> f64 {
    if !(rotation.determinant() > 0.0) {
        return f64::INFINITY;
    }

    let gram = rotation.transpose() * *rotation - DMat3::IDENTITY;
    gram.to_cols_array()
        .iter()
        .fold(0.0f64, |acc, v| acc.max(v.abs()))
}

/// Fail unless `rotation` is a proper rotation within `tolerance`.
pub fn check_rotation(rotation: &DMat3, tolerance: f64) -> Result<(), CalibError> {
    let deviation = rotation_deviation(rotation);
    // NaN deviations fail here too
    if deviation <= tolerance {
        Ok(())
    } else {
        Err(CalibError::NonOrthonormalRotation {
            deviation,
            tolerance,
        })
    }
}

/// Compute the rotation matrix from an axis and angle.
///
/// PRECONDITION: axis is non-zero; it is normalized internally.
pub fn axis_angle_to_rotation_matrix(axis: &[f64; 3], angle: f64) -> Result<DMat3, CalibError> {
    let axis = glam::DVec3::from_array(*axis);
    let magnitude = axis.length();
    if !(magnitude > 1e-10) {
        return Err(CalibError::InvalidParameter {
            name: "axis",
            reason: "cannot compute rotation matrix from a zero vector".to_string(),
        });
    }
    Ok(DMat3::from_axis_angle(axis / magnitude, angle))
}
