use glam::{DVec3, Mat3, Vec3, Vec4};
use rigcal_image::ImageSize;
use rigcal_imgproc::calibration::{
    distortion::generate_correction_map,
    rectify::{stereo_rectify, StereoCamera},
    CameraExtrinsic,
};

use crate::{
    calib::{
        is_rigid, CameraEye, Derived, DuoCalibParam, RawInputs, RectifiedEye, Rectification,
        NUM_EYES,
    },
    error::ParamError,
};

fn rotation_only(rotation: glam::DMat3) -> CameraExtrinsic {
    CameraExtrinsic {
        rotation,
        translation: DVec3::ZERO,
    }
}

// the calibration refers to `from`, express it for `to`
fn rescale_eye(eye: &CameraEye, from: ImageSize, to: ImageSize) -> CameraEye {
    let sx = to.width as f32 / from.width as f32;
    let sy = to.height as f32 / from.height as f32;
    CameraEye {
        k: Mat3::from_diagonal(Vec3::new(sx, sy, 1.0)) * eye.k,
        lurd: eye.lurd * Vec4::new(sx, sy, sx, sy),
        ..eye.clone()
    }
}

impl DuoCalibParam {
    /// Derive the stereo rectification and the undistort maps for `new_size`.
    ///
    /// When `new_size` differs from the calibrated image size the camera
    /// matrices and image boundaries are rescaled and `img_size` is set to
    /// `new_size`. The result is available through
    /// [`DuoCalibParam::rectification`] until a raw value changes.
    ///
    /// On error nothing is modified, so a previous rectification stays
    /// usable.
    ///
    /// # Errors
    ///
    /// * [`ParamError::DegenerateTargetSize`] if `new_size` has a zero dimension
    ///   or more pixels than can be addressed.
    /// * [`ParamError::MissingRequiredField`] if the cameras were never loaded.
    /// * [`ParamError::DegenerateGeometry`] if the cameras do not form a usable
    ///   horizontal stereo pair.
    pub fn init_undistort_map(&mut self, new_size: ImageSize) -> Result<(), ParamError> {
        if new_size.is_empty() || new_size.checked_area().is_none() {
            return Err(ParamError::DegenerateTargetSize(new_size));
        }

        let camera = &self.camera;
        match camera.eyes.len() {
            0 => return Err(ParamError::MissingRequiredField("Camera.eyes".to_string())),
            NUM_EYES => {}
            n => {
                return Err(ParamError::DegenerateGeometry(format!(
                    "expected {NUM_EYES} camera eyes, found {n}"
                )))
            }
        }
        if camera.img_size.is_empty() {
            return Err(ParamError::MissingRequiredField(
                "Camera.img_size".to_string(),
            ));
        }
        if !is_rigid(&self.imu.d_t_i) {
            return Err(ParamError::DegenerateGeometry(
                "Imu.D_T_I is not a rigid transform".to_string(),
            ));
        }

        let eyes = camera
            .eyes
            .iter()
            .map(|eye| rescale_eye(eye, camera.img_size, new_size))
            .collect::<Vec<_>>();

        let mut stereo = Vec::with_capacity(NUM_EYES);
        for (i, eye) in eyes.iter().enumerate() {
            if eye.dist_coeff.is_empty() {
                return Err(ParamError::MissingRequiredField(format!(
                    "Camera.eyes[{i}].dist_coeff"
                )));
            }
            let intrinsic = eye.intrinsic();
            if intrinsic.fx == 0.0 || intrinsic.fy == 0.0 {
                return Err(ParamError::MissingRequiredField(format!(
                    "Camera.eyes[{i}].K"
                )));
            }
            intrinsic.validate()?;
            if !is_rigid(&eye.d_t_c) {
                return Err(ParamError::DegenerateGeometry(format!(
                    "Camera.eyes[{i}].D_T_C is not a rigid transform"
                )));
            }
            stereo.push(StereoCamera {
                intrinsic,
                distortion: eye.distortion(camera.fisheye)?,
            });
        }

        let d_t_c = [eyes[0].extrinsic(), eyes[1].extrinsic()];
        let right_from_left = d_t_c[1].inverse().compose(&d_t_c[0]);
        let rect = stereo_rectify(&stereo[0], &stereo[1], &right_from_left, &new_size)?;

        // the rectified device frame is the rectified left camera frame
        let rl_t_d = rotation_only(rect.rotations[0]).compose(&d_t_c[0].inverse());

        let mut rectified_eyes = Vec::with_capacity(NUM_EYES);
        for k in 0..NUM_EYES {
            let (map_x, map_y) = generate_correction_map(
                &stereo[k].intrinsic,
                &stereo[k].distortion,
                &rect.rotations[k],
                &rect.new_intrinsics[k],
                &new_size,
            )?;
            let undist_d_t_c = rl_t_d
                .compose(&d_t_c[k])
                .compose(&rotation_only(rect.rotations[k].transpose()));
            rectified_eyes.push(RectifiedEye {
                map_x,
                map_y,
                undist_k: rect.new_intrinsics[k].to_matrix(),
                undist_d_t_c: undist_d_t_c.to_matrix().as_mat4(),
            });
        }

        let rectification = Rectification {
            eyes: rectified_eyes,
            q: rect.q.as_mat4(),
            undist_d_t_i: (rl_t_d.to_matrix() * self.imu.d_t_i.as_dmat4()).as_mat4(),
            img_size: new_size,
        };

        if camera.img_size != new_size {
            log::info!(
                "rescaled camera calibration from {} to {}",
                camera.img_size,
                new_size
            );
        }
        self.camera.eyes = eyes;
        self.camera.img_size = new_size;
        self.derived = Some(Derived {
            inputs: RawInputs::capture(self),
            rectification,
        });

        log::info!(
            "derived undistort maps for {} at {new_size}, baseline {:.4}",
            self.device_id,
            rect.translation.length()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calib::Camera;
    use approx::assert_relative_eq;
    use glam::Mat4;

    fn size(width: usize, height: usize) -> ImageSize {
        ImageSize { width, height }
    }

    fn stereo_param() -> DuoCalibParam {
        let eye = |x: f32| CameraEye {
            d_t_c: Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
            k: Mat3::from_cols_array(&[400.0, 0.0, 0.0, 0.0, 400.0, 0.0, 319.5, 239.5, 1.0]),
            dist_coeff: vec![-0.1, 0.01, 0.0, 0.0],
            lurd: Vec4::new(0.0, 0.0, 640.0, 480.0),
        };
        DuoCalibParam {
            camera: Camera {
                eyes: vec![eye(0.0), eye(0.06)],
                img_size: size(640, 480),
                fisheye: false,
            },
            ..Default::default()
        }
    }

    #[test]
    fn rescale_keeps_the_camera_geometry() {
        let eye = &stereo_param().camera.eyes[0];
        let scaled = rescale_eye(eye, size(640, 480), size(320, 240));
        assert_relative_eq!(scaled.k.x_axis.x, 200.0);
        assert_relative_eq!(scaled.k.z_axis.x, 159.75);
        assert_relative_eq!(scaled.k.z_axis.y, 119.75);
        assert_relative_eq!(scaled.k.z_axis.z, 1.0);
        assert_eq!(scaled.lurd, Vec4::new(0.0, 0.0, 320.0, 240.0));
        assert_eq!(scaled.d_t_c, eye.d_t_c);
    }

    #[test]
    fn empty_param_is_missing_fields() {
        let mut param = DuoCalibParam::default();
        assert!(matches!(
            param.init_undistort_map(size(640, 480)),
            Err(ParamError::MissingRequiredField(_))
        ));
    }

    #[test]
    fn unaddressable_target_size_is_rejected() {
        let mut param = stereo_param();
        assert!(matches!(
            param.init_undistort_map(size(usize::MAX, 2)),
            Err(ParamError::DegenerateTargetSize(_))
        ));
        assert!(param.rectification().is_none());
    }

    #[test]
    fn zero_intrinsics_are_missing_fields() {
        let mut param = stereo_param();
        param.camera.eyes[1].k = Mat3::ZERO;
        assert!(matches!(
            param.init_undistort_map(size(640, 480)),
            Err(ParamError::MissingRequiredField(ref f)) if f == "Camera.eyes[1].K"
        ));
    }

    #[test]
    fn mono_rig_is_rejected() {
        let mut param = stereo_param();
        param.camera.eyes.pop();
        assert!(matches!(
            param.init_undistort_map(size(640, 480)),
            Err(ParamError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn coincident_cameras_are_rejected() {
        let mut param = stereo_param();
        param.camera.eyes[1].d_t_c = Mat4::IDENTITY;
        assert!(matches!(
            param.init_undistort_map(size(640, 480)),
            Err(ParamError::DegenerateGeometry(_))
        ));
        assert!(param.rectification().is_none());
    }

    #[test]
    fn rectified_extrinsics() -> Result<(), ParamError> {
        let mut param = stereo_param();
        param.init_undistort_map(size(640, 480))?;
        let rect = param.rectification().ok_or(ParamError::DegenerateGeometry(
            "no rectification".to_string(),
        ))?;

        // left camera defines the rectified device frame
        assert!(rect.eyes[0].undist_d_t_c.abs_diff_eq(Mat4::IDENTITY, 1e-6));
        let right = rect.eyes[1].undist_d_t_c;
        assert_relative_eq!(right.w_axis.x, 0.06, epsilon = 1e-6);
        assert_relative_eq!(right.w_axis.y, 0.0, epsilon = 1e-6);
        assert!(rect.undist_d_t_i.abs_diff_eq(Mat4::IDENTITY, 1e-6));
        Ok(())
    }

    #[test]
    fn resize_rescales_raw_values() -> Result<(), ParamError> {
        let mut param = stereo_param();
        param.init_undistort_map(size(320, 240))?;
        assert_eq!(param.camera.img_size, size(320, 240));
        assert_relative_eq!(param.camera.eyes[0].k.x_axis.x, 200.0);

        let rect = param.rectification().ok_or(ParamError::DegenerateGeometry(
            "no rectification".to_string(),
        ))?;
        assert_eq!(rect.img_size, size(320, 240));
        assert_eq!(rect.eyes[1].map_x.size(), size(320, 240));
        Ok(())
    }
}
