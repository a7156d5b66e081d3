use super::{
    distortion::undistort_point, rodrigues, rotation_vector, CalibrationError, CameraExtrinsic,
    CameraIntrinsic, DistortionModel,
};
use glam::{DMat3, DMat4, DVec3, DVec4};
use rigcal_image::ImageSize;

/// Minimum stereo baseline accepted by [`stereo_rectify`], in calibration units.
pub const MIN_BASELINE: f64 = 1e-6;

/// One camera of a stereo pair as seen by the rectification.
#[derive(Clone, Copy, Debug)]
pub struct StereoCamera {
    /// The intrinsic parameters of the raw camera.
    pub intrinsic: CameraIntrinsic,
    /// The lens distortion of the raw camera.
    pub distortion: DistortionModel,
}

/// The result of a stereo rectification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StereoRectification {
    /// Rectifying rotations `R1`, `R2` (raw camera to rectified camera).
    pub rotations: [DMat3; 2],
    /// Rectified intrinsics of the left and right cameras.
    pub new_intrinsics: [CameraIntrinsic; 2],
    /// Translation from the rectified left to the rectified right camera.
    pub translation: DVec3,
    /// The disparity-to-depth reprojection matrix.
    pub q: DMat4,
}

/// Compute the rectification of a horizontal stereo pair.
///
/// Follows the zero-disparity convention: both rectified cameras share the
/// focal length and principal point, so corresponding points land on the same
/// row and at infinity on the same column.
///
/// # Arguments
///
/// * `left` - The left camera
/// * `right` - The right camera
/// * `right_from_left` - Transform mapping left camera points into the right camera
/// * `size` - The image size, shared by both cameras and the rectified images
pub fn stereo_rectify(
    left: &StereoCamera,
    right: &StereoCamera,
    right_from_left: &CameraExtrinsic,
    size: &ImageSize,
) -> Result<StereoRectification, CalibrationError> {
    left.intrinsic.validate()?;
    right.intrinsic.validate()?;
    if size.is_empty() {
        return Err(rigcal_image::ImageError::EmptyImageSize(size.width, size.height).into());
    }

    let t_raw = right_from_left.translation;
    let baseline = t_raw.length();
    if !baseline.is_finite() || baseline < MIN_BASELINE {
        return Err(CalibrationError::DegenerateBaseline(baseline));
    }

    // rotate both cameras half way so they share an orientation
    let om = rotation_vector(&right_from_left.rotation);
    let r_r = rodrigues(om * -0.5);
    let t = r_r * t_raw;
    if t.x.abs() < t.y.abs() {
        return Err(CalibrationError::VerticalBaseline);
    }

    // then align the baseline with the x axis
    let uu = DVec3::new(t.x.signum(), 0.0, 0.0);
    let mut ww = t.cross(uu);
    let nw = ww.length();
    if nw > 0.0 {
        ww *= (t.x.abs() / t.length()).clamp(-1.0, 1.0).acos() / nw;
    }
    let w_r = rodrigues(ww);

    let r1 = w_r * r_r.transpose();
    let r2 = w_r * r_r;
    let t_new = r2 * t_raw;

    // a common focal length that does not upscale either camera
    let (nx, ny) = (size.width as f64, size.height as f64);
    let fc_new = [left, right]
        .iter()
        .map(|cam| {
            let fc = cam.intrinsic.fy;
            let k1 = match cam.distortion {
                DistortionModel::Polynomial(d) => d.k1,
                DistortionModel::Fisheye(_) => 0.0,
            };
            if k1 < 0.0 {
                fc * (1.0 + k1 * (nx * nx + ny * ny) / (4.0 * fc * fc))
            } else {
                fc
            }
        })
        .fold(f64::MAX, f64::min);
    if !fc_new.is_finite() || fc_new <= 0.0 {
        return Err(CalibrationError::InvalidFocalLength(fc_new, fc_new));
    }

    // center the rectified images on the average of the projected corners
    let unit = CameraIntrinsic {
        fx: fc_new,
        fy: fc_new,
        cx: 0.0,
        cy: 0.0,
    };
    let corners = [(0.0, 0.0), (nx - 1.0, 0.0), (0.0, ny - 1.0), (nx - 1.0, ny - 1.0)];
    let mut cc = [(0.0, 0.0); 2];
    for (k, (cam, rot)) in [(left, &r1), (right, &r2)].into_iter().enumerate() {
        let (mut sx, mut sy) = (0.0, 0.0);
        for &(u, v) in &corners {
            let (x, y) = undistort_point(u, v, &cam.intrinsic, &cam.distortion, rot, &unit)
                .ok_or(CalibrationError::NonFinite)?;
            sx += x;
            sy += y;
        }
        cc[k] = ((nx - 1.0) / 2.0 - sx / 4.0, (ny - 1.0) / 2.0 - sy / 4.0);
    }
    let cx = (cc[0].0 + cc[1].0) / 2.0;
    let cy = (cc[0].1 + cc[1].1) / 2.0;

    let new_intrinsic = CameraIntrinsic {
        fx: fc_new,
        fy: fc_new,
        cx,
        cy,
    };

    let tx = t_new.x;
    let q = DMat4::from_cols(
        DVec4::new(1.0, 0.0, 0.0, 0.0),
        DVec4::new(0.0, 1.0, 0.0, 0.0),
        DVec4::new(0.0, 0.0, 0.0, -1.0 / tx),
        DVec4::new(-cx, -cy, fc_new, 0.0),
    );

    let rectification = StereoRectification {
        rotations: [r1, r2],
        new_intrinsics: [new_intrinsic, new_intrinsic],
        translation: t_new,
        q,
    };

    if !rectification.is_finite() {
        return Err(CalibrationError::NonFinite);
    }

    log::debug!(
        "stereo rectification: baseline {:.6}, f {:.3}, c ({:.3}, {:.3})",
        baseline,
        fc_new,
        cx,
        cy
    );

    Ok(rectification)
}

impl StereoRectification {
    /// Returns true if every matrix holds finite values.
    pub fn is_finite(&self) -> bool {
        self.rotations.iter().all(|r| r.is_finite())
            && self.translation.is_finite()
            && self.q.is_finite()
            && self
                .new_intrinsics
                .iter()
                .all(|k| k.validate().is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::distortion::PolynomialDistortion;
    use approx::assert_relative_eq;

    fn camera(fx: f64) -> StereoCamera {
        StereoCamera {
            intrinsic: CameraIntrinsic {
                fx,
                fy: fx,
                cx: 319.5,
                cy: 239.5,
            },
            distortion: DistortionModel::Polynomial(PolynomialDistortion::default()),
        }
    }

    fn size() -> ImageSize {
        ImageSize {
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn rectify_ideal_pair() -> Result<(), CalibrationError> {
        // right camera 6cm to the right of the left one
        let right_from_left = CameraExtrinsic {
            rotation: DMat3::IDENTITY,
            translation: DVec3::new(-0.06, 0.0, 0.0),
        };
        let rect = stereo_rectify(&camera(400.0), &camera(400.0), &right_from_left, &size())?;

        assert!(rect.rotations[0].abs_diff_eq(DMat3::IDENTITY, 1e-12));
        assert!(rect.rotations[1].abs_diff_eq(DMat3::IDENTITY, 1e-12));
        assert_relative_eq!(rect.translation.x, -0.06, epsilon = 1e-12);
        assert_relative_eq!(rect.new_intrinsics[0].fx, 400.0);
        assert_relative_eq!(rect.new_intrinsics[0].cx, 319.5, epsilon = 1e-9);
        assert_relative_eq!(rect.new_intrinsics[0].cy, 239.5, epsilon = 1e-9);

        // Q[3][2] encodes the inverse baseline
        assert_relative_eq!(rect.q.z_axis.w, 1.0 / 0.06, epsilon = 1e-9);
        assert_relative_eq!(rect.q.w_axis.z, 400.0);
        Ok(())
    }

    #[test]
    fn rectify_aligns_rows() -> Result<(), CalibrationError> {
        let right_from_left = CameraExtrinsic {
            rotation: rodrigues(DVec3::new(0.01, -0.02, 0.005)),
            translation: DVec3::new(-0.06, 0.002, 0.001),
        };
        let rect = stereo_rectify(&camera(400.0), &camera(410.0), &right_from_left, &size())?;

        // both rectified cameras see a point at the same row
        let p_left = DVec3::new(0.3, -0.2, 2.0);
        let p_right = right_from_left.rotation * p_left + right_from_left.translation;
        let y_left = (rect.rotations[0] * p_left).y / (rect.rotations[0] * p_left).z;
        let y_right = (rect.rotations[1] * p_right).y / (rect.rotations[1] * p_right).z;
        assert_relative_eq!(y_left, y_right, epsilon = 1e-9);

        // the baseline is purely horizontal after rectification
        assert_relative_eq!(rect.translation.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(rect.translation.z, 0.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn rectify_rejects_zero_baseline() {
        let right_from_left = CameraExtrinsic::IDENTITY;
        assert_eq!(
            stereo_rectify(&camera(400.0), &camera(400.0), &right_from_left, &size()),
            Err(CalibrationError::DegenerateBaseline(0.0))
        );
    }

    #[test]
    fn rectify_rejects_vertical_baseline() {
        let right_from_left = CameraExtrinsic {
            rotation: DMat3::IDENTITY,
            translation: DVec3::new(0.0, -0.06, 0.0),
        };
        assert_eq!(
            stereo_rectify(&camera(400.0), &camera(400.0), &right_from_left, &size()),
            Err(CalibrationError::VerticalBaseline)
        );
    }
}
