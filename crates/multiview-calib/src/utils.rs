use glam::{DMat3, DMat4};

/// Build a matrix from a row-major 3x3 array.
pub(crate) fn rows_to_dmat3(rows: &[[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols_array_2d(rows).transpose()
}

/// Convert a matrix to a row-major 3x3 array.
pub(crate) fn dmat3_to_rows(m: &DMat3) -> [[f64; 3]; 3] {
    m.transpose().to_cols_array_2d()
}

/// Build a matrix from a row-major 4x4 array.
pub(crate) fn rows_to_dmat4(rows: &[[f64; 4]; 4]) -> DMat4 {
    DMat4::from_cols_array_2d(rows).transpose()
}

/// Convert a matrix to a row-major 4x4 array.
pub(crate) fn dmat4_to_rows(m: &DMat4) -> [[f64; 4]; 4] {
    m.transpose().to_cols_array_2d()
}

/// Build a faer matrix from a symmetric 4x4 array given by its lower triangle.
pub(crate) fn lower4_to_faer_mat(lower: &[[f64; 4]; 4]) -> faer::Mat<f64> {
    faer::Mat::<f64>::from_fn(4, 4, |i, j| if i >= j { lower[i][j] } else { lower[j][i] })
}
