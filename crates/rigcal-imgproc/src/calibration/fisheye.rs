use super::CalibrationError;

const NEWTON_ITERATIONS: usize = 20;
const NEWTON_EPSILON: f64 = 1e-10;

/// Kannala-Brandt (equidistant) fisheye distortion parameters
///
/// `theta_d = theta * (1 + k1 theta^2 + k2 theta^4 + k3 theta^6 + k4 theta^8)`
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KannalaBrandtDistortion {
    /// The first coefficient
    pub k1: f64,
    /// The second coefficient
    pub k2: f64,
    /// The third coefficient
    pub k3: f64,
    /// The fourth coefficient
    pub k4: f64,
}

impl KannalaBrandtDistortion {
    /// Build from exactly four coefficients `k1 k2 k3 k4`.
    pub fn from_coeffs(coeffs: &[f64]) -> Result<Self, CalibrationError> {
        match *coeffs {
            [k1, k2, k3, k4] => Ok(Self { k1, k2, k3, k4 }),
            _ => Err(CalibrationError::InvalidDistortionLength {
                model: "fisheye",
                len: coeffs.len(),
            }),
        }
    }

    fn theta_d(&self, theta: f64) -> f64 {
        let theta2 = theta * theta;
        theta * (1.0 + theta2 * (self.k1 + theta2 * (self.k2 + theta2 * (self.k3 + theta2 * self.k4))))
    }

    fn theta_d_derivative(&self, theta: f64) -> f64 {
        let theta2 = theta * theta;
        1.0 + theta2 * (3.0 * self.k1 + theta2 * (5.0 * self.k2 + theta2 * (7.0 * self.k3 + theta2 * 9.0 * self.k4)))
    }
}

/// Distort a point in normalized image coordinates with the fisheye model.
pub fn distort_normalized(x: f64, y: f64, distortion: &KannalaBrandtDistortion) -> (f64, f64) {
    let r = (x * x + y * y).sqrt();
    if r < 1e-8 {
        return (x, y);
    }
    let theta = r.atan();
    let scale = distortion.theta_d(theta) / r;
    (x * scale, y * scale)
}

/// Remove the fisheye distortion of a point in normalized image coordinates.
///
/// Solves `theta_d(theta) = r_d` with Newton iterations. Points whose solution
/// flips sign are returned as NaN.
pub fn undistort_normalized(xd: f64, yd: f64, distortion: &KannalaBrandtDistortion) -> (f64, f64) {
    let r_d = (xd * xd + yd * yd).sqrt().min(std::f64::consts::FRAC_PI_2);
    if r_d < 1e-8 {
        return (xd, yd);
    }

    let mut theta = r_d;
    for _ in 0..NEWTON_ITERATIONS {
        let fix = (distortion.theta_d(theta) - r_d) / distortion.theta_d_derivative(theta);
        theta -= fix;
        if fix.abs() < NEWTON_EPSILON {
            break;
        }
    }

    if theta < 0.0 || theta >= std::f64::consts::FRAC_PI_2 {
        return (f64::NAN, f64::NAN);
    }

    let scale = theta.tan() / (xd * xd + yd * yd).sqrt();
    (xd * scale, yd * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fisheye_zero_coeffs_is_equidistant() {
        let d = KannalaBrandtDistortion::default();
        let (xd, yd) = distort_normalized(1.0, 0.0, &d);
        assert_relative_eq!(xd, std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
        assert_eq!(yd, 0.0);
    }

    #[test]
    fn fisheye_undistort_inverts_distort() -> Result<(), CalibrationError> {
        let d = KannalaBrandtDistortion::from_coeffs(&[-0.013, 0.021, -0.019, 0.005])?;
        for &(x, y) in &[(0.1, 0.2), (-0.6, 0.4), (1.2, -0.8), (0.0, 0.0)] {
            let (xd, yd) = distort_normalized(x, y, &d);
            let (xu, yu) = undistort_normalized(xd, yd, &d);
            assert_relative_eq!(xu, x, epsilon = 1e-6);
            assert_relative_eq!(yu, y, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn fisheye_requires_four_coeffs() {
        assert_eq!(
            KannalaBrandtDistortion::from_coeffs(&[0.0; 5]),
            Err(CalibrationError::InvalidDistortionLength {
                model: "fisheye",
                len: 5
            })
        );
    }
}
