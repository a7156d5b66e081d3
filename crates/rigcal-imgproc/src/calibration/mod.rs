use glam::{DMat3, DMat4, DVec3, Mat3};
use rigcal_image::ImageError;

/// polynomial (Brown-Conrady / rational) distortion module.
pub mod distortion;

/// Kannala-Brandt fisheye distortion module.
pub mod fisheye;

/// stereo rectification module.
pub mod rectify;

use distortion::PolynomialDistortion;
use fisheye::KannalaBrandtDistortion;

/// An error type for the calibration module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CalibrationError {
    /// The focal lengths must be strictly positive and finite.
    #[error("Invalid focal length: fx={0}, fy={1}")]
    InvalidFocalLength(f64, f64),

    /// The number of distortion coefficients does not fit the lens model.
    #[error("Unsupported number of {model} distortion coefficients: {len}")]
    InvalidDistortionLength {
        /// The lens model name.
        model: &'static str,
        /// The number of coefficients provided.
        len: usize,
    },

    /// The rotation block of a transform is not orthonormal.
    #[error("Rotation matrix is not orthonormal")]
    NonOrthonormalRotation,

    /// The two cameras are (almost) at the same position.
    #[error("Stereo baseline is too short: {0}")]
    DegenerateBaseline(f64),

    /// The baseline is not predominantly horizontal.
    #[error("Vertical stereo baselines are not supported")]
    VerticalBaseline,

    /// The rectification produced NaN or infinite values.
    #[error("Rectification produced non-finite values")]
    NonFinite,

    /// Error from the image buffers.
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Represents the instrinsic parameters of a pinhole camera
///
/// # Fields
///
/// * `fx` - The focal length in the x direction
/// * `fy` - The focal length in the y direction
/// * `cx` - The x coordinate of the principal point
/// * `cy` - The y coordinate of the principal point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraIntrinsic {
    /// The focal length in the x direction
    pub fx: f64,
    /// The focal length in the y direction
    pub fy: f64,
    /// The x coordinate of the principal point
    pub cx: f64,
    /// The y coordinate of the principal point
    pub cy: f64,
}

impl CameraIntrinsic {
    /// Read the intrinsics from a 3x3 camera matrix `K`.
    pub fn from_matrix(k: &Mat3) -> Self {
        // glam is column-major: col(2) holds the principal point
        Self {
            fx: k.x_axis.x as f64,
            fy: k.y_axis.y as f64,
            cx: k.z_axis.x as f64,
            cy: k.z_axis.y as f64,
        }
    }

    /// Build the 3x3 camera matrix `K`.
    pub fn to_matrix(&self) -> Mat3 {
        Mat3::from_cols_array(&[
            self.fx as f32,
            0.0,
            0.0,
            0.0,
            self.fy as f32,
            0.0,
            self.cx as f32,
            self.cy as f32,
            1.0,
        ])
    }

    /// Check the focal lengths are usable.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let valid = |f: f64| f.is_finite() && f > 0.0;
        if !valid(self.fx) || !valid(self.fy) || !self.cx.is_finite() || !self.cy.is_finite() {
            return Err(CalibrationError::InvalidFocalLength(self.fx, self.fy));
        }
        Ok(())
    }
}

/// Represents the extrinsic parameters of a pinhole camera
///
/// A rigid transform `X_dst = rotation * X_src + translation`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraExtrinsic {
    /// The rotation matrix of the camera 3x3
    pub rotation: DMat3,
    /// The translation vector of the camera 3x1
    pub translation: DVec3,
}

impl CameraExtrinsic {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        rotation: DMat3::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Split a homogeneous 4x4 rigid transform.
    pub fn from_matrix(m: &DMat4) -> Self {
        Self {
            rotation: DMat3::from_mat4(*m),
            translation: m.w_axis.truncate(),
        }
    }

    /// Build the homogeneous 4x4 transform.
    pub fn to_matrix(&self) -> DMat4 {
        let mut m = DMat4::from_mat3(self.rotation);
        m.w_axis = self.translation.extend(1.0);
        m
    }

    /// The inverse rigid transform.
    pub fn inverse(&self) -> Self {
        let rt = self.rotation.transpose();
        Self {
            rotation: rt,
            translation: -(rt * self.translation),
        }
    }

    /// Compose `self * rhs`.
    pub fn compose(&self, rhs: &Self) -> Self {
        Self {
            rotation: self.rotation * rhs.rotation,
            translation: self.rotation * rhs.translation + self.translation,
        }
    }

    /// Check the rotation block is orthonormal with a positive determinant.
    pub fn validate(&self, tolerance: f64) -> Result<(), CalibrationError> {
        is_rotation(&self.rotation, tolerance)
            .then_some(())
            .ok_or(CalibrationError::NonOrthonormalRotation)
    }
}

/// Returns true if `r` is orthonormal within `tolerance` and keeps handedness.
pub fn is_rotation(r: &DMat3, tolerance: f64) -> bool {
    let rtr = r.transpose() * *r;
    rtr.abs_diff_eq(DMat3::IDENTITY, tolerance) && (r.determinant() - 1.0).abs() < tolerance
}

/// Rotation matrix from an axis-angle vector (Rodrigues formula).
pub fn rodrigues(v: DVec3) -> DMat3 {
    let theta = v.length();
    if theta < f64::EPSILON {
        return DMat3::IDENTITY;
    }
    DMat3::from_axis_angle(v / theta, theta)
}

/// Axis-angle vector of a rotation matrix.
pub fn rotation_vector(r: &DMat3) -> DVec3 {
    let (axis, angle) = glam::DQuat::from_mat3(r).to_axis_angle();
    // keep the angle in [-pi, pi] so halving the vector halves the rotation
    let angle = if angle > std::f64::consts::PI {
        angle - std::f64::consts::TAU
    } else {
        angle
    };
    axis * angle
}

/// The lens distortion model of a camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DistortionModel {
    /// Brown-Conrady with the rational radial extension.
    Polynomial(PolynomialDistortion),
    /// Kannala-Brandt equidistant fisheye.
    Fisheye(KannalaBrandtDistortion),
}

impl DistortionModel {
    /// Build a model from a coefficient vector in OpenCV order.
    ///
    /// Pinhole accepts `k1 k2 p1 p2 [k3 [k4 k5 k6]]`, fisheye exactly `k1 k2 k3 k4`.
    pub fn from_coeffs(coeffs: &[f64], fisheye: bool) -> Result<Self, CalibrationError> {
        if fisheye {
            KannalaBrandtDistortion::from_coeffs(coeffs).map(Self::Fisheye)
        } else {
            PolynomialDistortion::from_coeffs(coeffs).map(Self::Polynomial)
        }
    }

    /// Apply the distortion to normalized image coordinates.
    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::Polynomial(d) => distortion::distort_normalized(x, y, d),
            Self::Fisheye(d) => fisheye::distort_normalized(x, y, d),
        }
    }

    /// Remove the distortion from normalized image coordinates.
    pub fn undistort(&self, xd: f64, yd: f64) -> (f64, f64) {
        match self {
            Self::Polynomial(d) => distortion::undistort_normalized(xd, yd, d),
            Self::Fisheye(d) => fisheye::undistort_normalized(xd, yd, d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn intrinsic_matrix_round_trip() {
        let intrinsic = CameraIntrinsic {
            fx: 450.0,
            fy: 452.5,
            cx: 320.25,
            cy: 240.5,
        };
        let k = intrinsic.to_matrix();
        assert_eq!(k.row(0).to_array(), [450.0, 0.0, 320.25]);
        assert_eq!(k.row(2).to_array(), [0.0, 0.0, 1.0]);
        assert_eq!(CameraIntrinsic::from_matrix(&k), intrinsic);
    }

    #[test]
    fn intrinsic_validate() {
        let mut intrinsic = CameraIntrinsic {
            fx: 1.0,
            fy: 1.0,
            cx: 0.0,
            cy: 0.0,
        };
        assert!(intrinsic.validate().is_ok());
        intrinsic.fy = 0.0;
        assert_eq!(
            intrinsic.validate(),
            Err(CalibrationError::InvalidFocalLength(1.0, 0.0))
        );
    }

    #[test]
    fn extrinsic_inverse_compose() {
        let ext = CameraExtrinsic {
            rotation: rodrigues(DVec3::new(0.1, -0.2, 0.3)),
            translation: DVec3::new(0.06, 0.001, -0.002),
        };
        let id = ext.compose(&ext.inverse());
        assert!(id.rotation.abs_diff_eq(DMat3::IDENTITY, 1e-12));
        assert!(id.translation.abs_diff_eq(DVec3::ZERO, 1e-12));
        assert!(ext.validate(1e-9).is_ok());

        let back = CameraExtrinsic::from_matrix(&ext.to_matrix());
        assert!(back.rotation.abs_diff_eq(ext.rotation, 1e-12));
        assert_eq!(back.translation, ext.translation);
    }

    #[test]
    fn rodrigues_round_trip() {
        let v = DVec3::new(0.3, 0.1, -0.2);
        let r = rodrigues(v);
        let w = rotation_vector(&r);
        assert_relative_eq!(w.x, v.x, epsilon = 1e-9);
        assert_relative_eq!(w.y, v.y, epsilon = 1e-9);
        assert_relative_eq!(w.z, v.z, epsilon = 1e-9);
        assert_eq!(rodrigues(DVec3::ZERO), DMat3::IDENTITY);
    }

    #[test]
    fn non_rotation_is_rejected() {
        let scaled = DMat3::from_diagonal(DVec3::new(1.0, 2.0, 1.0));
        assert!(!is_rotation(&scaled, 1e-3));
        let mirror = DMat3::from_diagonal(DVec3::new(1.0, 1.0, -1.0));
        assert!(!is_rotation(&mirror, 1e-3));
    }

    #[test]
    fn distortion_model_selection() {
        let coeffs = [0.1, 0.01, 0.0, 0.0];
        assert!(matches!(
            DistortionModel::from_coeffs(&coeffs, false),
            Ok(DistortionModel::Polynomial(_))
        ));
        assert!(matches!(
            DistortionModel::from_coeffs(&coeffs, true),
            Ok(DistortionModel::Fisheye(_))
        ));
        assert!(DistortionModel::from_coeffs(&coeffs[..3], false).is_err());
        assert!(DistortionModel::from_coeffs(&[0.0; 5], true).is_err());
    }
}
