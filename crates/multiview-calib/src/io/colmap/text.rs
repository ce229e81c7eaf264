use std::fmt::Write;

use super::{CameraModelId, ColmapCamera, ColmapError, ColmapImage};

/// Format `cameras.txt` with the standard header.
///
/// # Errors
///
/// [`ColmapError::InvalidNumCameraParams`] if a camera's parameter count does not match
/// its model.
pub fn format_cameras_txt(cameras: &[ColmapCamera]) -> Result<String, ColmapError> {
    let mut out = String::new();
    out.push_str("# Camera list with one line of data per camera:\n");
    out.push_str("#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]\n");
    let _ = writeln!(out, "# Number of cameras: {}", cameras.len());

    for camera in cameras {
        if camera.params.len() != camera.model_id.num_params() {
            return Err(ColmapError::InvalidNumCameraParams(camera.params.len()));
        }
        let _ = write!(
            out,
            "{} {} {} {}",
            camera.camera_id,
            camera.model_id.name(),
            camera.width,
            camera.height
        );
        for p in &camera.params {
            let _ = write!(out, " {p}");
        }
        out.push('\n');
    }

    Ok(out)
}

/// Format `images.txt` with the standard header.
///
/// Every image gets its pose line followed by an empty observation line.
pub fn format_images_txt(images: &[ColmapImage]) -> String {
    let mut out = String::new();
    out.push_str("# Image list with two lines of data per image:\n");
    out.push_str("#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME\n");
    out.push_str("#   POINTS2D[] as (X, Y, POINT3D_ID)\n");
    let _ = writeln!(
        out,
        "# Number of images: {}, mean observations per image: 0",
        images.len()
    );

    for image in images {
        let [qw, qx, qy, qz] = image.rotation;
        let [tx, ty, tz] = image.translation;
        let _ = writeln!(
            out,
            "{} {qw} {qx} {qy} {qz} {tx} {ty} {tz} {} {}",
            image.image_id, image.camera_id, image.name
        );
        out.push('\n');
    }

    out
}

/// Format an empty `points3D.txt` with the standard header.
pub fn format_points3d_txt() -> String {
    let mut out = String::new();
    out.push_str("# 3D point list with one line of data per point:\n");
    out.push_str("#   POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)\n");
    out.push_str("# Number of points: 0, mean track length: 0\n");
    out
}

/// Format the test image list, one name per line.
pub fn format_test_list(names: &[String]) -> String {
    names.iter().fold(String::new(), |mut out, name| {
        out.push_str(name);
        out.push('\n');
        out
    })
}
