/// Camera models the bundle writer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraModelId {
    /// Pinhole camera with separate focal lengths: fx, fy, cx, cy.
    Pinhole,
}

impl CameraModelId {
    /// The model name used in `cameras.txt`.
    pub fn name(&self) -> &'static str {
        match self {
            CameraModelId::Pinhole => "PINHOLE",
        }
    }

    /// Number of intrinsic parameters of the model.
    pub fn num_params(&self) -> usize {
        match self {
            CameraModelId::Pinhole => 4,
        }
    }
}

/// Represents a camera in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    /// Camera id
    pub camera_id: u32,
    /// Camera model id
    pub model_id: CameraModelId,
    /// Image width
    pub width: usize,
    /// Image height
    pub height: usize,
    /// Camera parameters
    pub params: Vec<f64>,
}

/// Represents an image in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    /// Image name
    pub name: String,
    /// Image id
    pub image_id: u32,
    /// Camera id
    pub camera_id: u32,
    /// Rotation
    pub rotation: [f64; 4], // qw, qx, qy, qz
    /// Translation
    pub translation: [f64; 3], // x, y, z
}
