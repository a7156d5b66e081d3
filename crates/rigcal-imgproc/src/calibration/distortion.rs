use super::{CalibrationError, CameraIntrinsic, DistortionModel};
use crate::interpolation::grid::meshgrid_from_fn;
use glam::{DMat3, DVec3};
use rigcal_image::{ImageSize, Map2};

/// Number of fixed-point iterations used to invert the polynomial model.
const UNDISTORT_ITERATIONS: usize = 20;

/// Marker written into the remap tables for samples with no valid source pixel.
pub const INVALID_MAP_VALUE: f32 = -1.0;

/// Represents the polynomial distortion parameters of a camera
///
/// # Fields
///
/// * `k1` - The first radial distortion coefficient
/// * `k2` - The second radial distortion coefficient
/// * `k3` - The third radial distortion coefficient
/// * `k4` - The fourth radial distortion coefficient
/// * `k5` - The fifth radial distortion coefficient
/// * `k6` - The sixth radial distortion coefficient
/// * `p1` - The first tangential distortion coefficient
/// * `p2` - The second tangential distortion coefficient
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolynomialDistortion {
    /// The first radial distortion coefficient
    pub k1: f64,
    /// The second radial distortion coefficient
    pub k2: f64,
    /// The third radial distortion coefficient
    pub k3: f64,
    /// The fourth radial distortion coefficient
    pub k4: f64,
    /// The fifth radial distortion coefficient
    pub k5: f64,
    /// The sixth radial distortion coefficient
    pub k6: f64,
    /// The first tangential distortion coefficient
    pub p1: f64,
    /// The second tangential distortion coefficient
    pub p2: f64,
}

impl PolynomialDistortion {
    /// Build from coefficients in OpenCV order `k1 k2 p1 p2 [k3 [k4 k5 k6]]`.
    pub fn from_coeffs(coeffs: &[f64]) -> Result<Self, CalibrationError> {
        if !matches!(coeffs.len(), 4 | 5 | 8) {
            return Err(CalibrationError::InvalidDistortionLength {
                model: "pinhole",
                len: coeffs.len(),
            });
        }
        let at = |i: usize| coeffs.get(i).copied().unwrap_or(0.0);
        Ok(Self {
            k1: at(0),
            k2: at(1),
            p1: at(2),
            p2: at(3),
            k3: at(4),
            k4: at(5),
            k5: at(6),
            k6: at(7),
        })
    }
}

/// Distort a point in normalized image coordinates.
pub fn distort_normalized(x: f64, y: f64, distortion: &PolynomialDistortion) -> (f64, f64) {
    let PolynomialDistortion {
        k1,
        k2,
        k3,
        k4,
        k5,
        k6,
        p1,
        p2,
    } = *distortion;

    // calculate the radial distance
    let r2 = x * x + y * y;

    // radial distortion
    let kr = (1.0 + k1 * r2 + k2 * r2 * r2 + k3 * r2 * r2 * r2)
        / (1.0 + k4 * r2 + k5 * r2 * r2 + k6 * r2 * r2 * r2);

    // tangential distortion
    let xd = x * kr + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
    let yd = y * kr + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;

    (xd, yd)
}

/// Remove the distortion of a point in normalized image coordinates.
///
/// Inverts [`distort_normalized`] with fixed-point iterations. If the inverse
/// radial factor turns negative the distorted point is returned unchanged.
pub fn undistort_normalized(xd: f64, yd: f64, distortion: &PolynomialDistortion) -> (f64, f64) {
    let PolynomialDistortion {
        k1,
        k2,
        k3,
        k4,
        k5,
        k6,
        p1,
        p2,
    } = *distortion;

    let (mut x, mut y) = (xd, yd);
    for _ in 0..UNDISTORT_ITERATIONS {
        let r2 = x * x + y * y;
        let icdist = (1.0 + ((k6 * r2 + k5) * r2 + k4) * r2)
            / (1.0 + ((k3 * r2 + k2) * r2 + k1) * r2);
        if icdist < 0.0 {
            return (xd, yd);
        }
        let delta_x = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let delta_y = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
        x = (xd - delta_x) * icdist;
        y = (yd - delta_y) * icdist;
    }

    (x, y)
}

/// Undistort a pixel and express it in a rectified camera.
///
/// The pixel is undistorted to normalized coordinates, rotated by `rotation` and
/// projected with `new_intrinsic`. Returns `None` when the rotated ray points
/// away from the image plane.
pub fn undistort_point(
    u: f64,
    v: f64,
    intrinsic: &CameraIntrinsic,
    distortion: &DistortionModel,
    rotation: &DMat3,
    new_intrinsic: &CameraIntrinsic,
) -> Option<(f64, f64)> {
    let (x, y) = distortion.undistort((u - intrinsic.cx) / intrinsic.fx, (v - intrinsic.cy) / intrinsic.fy);
    let p = *rotation * DVec3::new(x, y, 1.0);
    if p.z.abs() < f64::EPSILON {
        return None;
    }
    Some((
        new_intrinsic.fx * p.x / p.z + new_intrinsic.cx,
        new_intrinsic.fy * p.y / p.z + new_intrinsic.cy,
    ))
}

/// Generate the undistort and rectify map of a camera
///
/// For every pixel of the output (rectified) image the tables hold the pixel of
/// the raw image to sample from, in the two-table float convention consumed by
/// [`crate::interpolation::remap`].
///
/// # Arguments
///
/// * `intrinsic` - The intrinsic parameters of the raw camera
/// * `distortion` - The lens distortion of the raw camera
/// * `rotation` - The rectifying rotation (raw camera to rectified camera)
/// * `new_intrinsic` - The intrinsic parameters of the rectified camera
/// * `size` - The size of the output image
///
/// # Returns
///
/// * `map_x` - The x map for undistorting and rectifying the image
/// * `map_y` - The y map for undistorting and rectifying the image
pub fn generate_correction_map(
    intrinsic: &CameraIntrinsic,
    distortion: &DistortionModel,
    rotation: &DMat3,
    new_intrinsic: &CameraIntrinsic,
    size: &ImageSize,
) -> Result<(Map2<f32>, Map2<f32>), CalibrationError> {
    intrinsic.validate()?;
    new_intrinsic.validate()?;

    let inv_rotation = rotation.transpose();

    let (map_x, map_y) = meshgrid_from_fn(size.width, size.height, |x, y| {
        // back-project through the rectified camera and rotate into the raw one
        let xn = (x as f64 - new_intrinsic.cx) / new_intrinsic.fx;
        let yn = (y as f64 - new_intrinsic.cy) / new_intrinsic.fy;
        let p = inv_rotation * DVec3::new(xn, yn, 1.0);
        if p.z <= f64::EPSILON {
            return (INVALID_MAP_VALUE, INVALID_MAP_VALUE);
        }

        let (xd, yd) = distortion.distort(p.x / p.z, p.y / p.z);
        let (u, v) = (intrinsic.fx * xd + intrinsic.cx, intrinsic.fy * yd + intrinsic.cy);
        if !u.is_finite() || !v.is_finite() {
            return (INVALID_MAP_VALUE, INVALID_MAP_VALUE);
        }
        (u as f32, v as f32)
    })?;

    Ok((map_x, map_y))
}
