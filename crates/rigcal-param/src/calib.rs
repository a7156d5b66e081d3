//! Calibration of a stereo camera + IMU rig.
//!
//! # Native layout
//!
//! Matrices are stored as flat row-major sequences.
//!
//! ```yaml
//! device_id: XP3-0001
//! sensor_type: XP3            # UNKNOWN, LI, XP, XP2 or XP3
//! C_R_B: [1, 0, 0, 0, 1, 0, 0, 0, 1]
//! C_p_B: [0, 0, 0]
//! Imu:
//!   accel_TK: [...]           # 9 values
//!   accel_bias: [0, 0, 0]
//!   gyro_TK: [...]            # 9 values
//!   gyro_bias: [0, 0, 0]
//!   accel_noise_var: [0.01, 0.01, 0.01]
//!   angv_noise_var: [0.001, 0.001, 0.001]
//!   D_T_I: [...]              # 16 values, device <- imu
//! Camera:
//!   img_size: {width: 640, height: 480}
//!   fishEye: false
//!   eyes:                     # exactly two, left then right
//!     - D_T_C: [...]          # 16 values, device <- camera
//!       K: [...]              # 9 values
//!       dist_coeff: [k1, k2, p1, p2]
//!       lurd: [0, 0, 640, 480]
//!   rectified:                # only written while valid, ignored on load
//!     img_size: {width: 640, height: 480}
//!     Q: [...]
//!     undist_D_T_I: [...]
//!     eyes:
//!       - K: [...]
//!         D_T_C: [...]
//! ```
//!
//! # Legacy layout
//!
//! The OpenCV `FileStorage` layout keeps every value at the top level:
//! `device_id`, `sensor_type` (integer code), `C_R_B`, `C_p_B`, the
//! `Imu.<field>` matrices, `image_width`, `image_height`, `fisheye` (0/1,
//! optional) and per eye `D_T_C<n>`, `M<n>`, `D<n>` and `lurd<n>`. The
//! boundary `lurd<n>` may be omitted for `LI` and `UNKNOWN` sensors and
//! defaults to the full image. Rectified values are written as `undist_M<n>`,
//! `undist_D_T_C<n>`, `Imu.undist_D_T_I` and `Q`.

use std::path::Path;
use std::str::FromStr;

use glam::{DMat3, Mat3, Mat4, Vec3, Vec4};
use rigcal_image::{Image, ImageSize, Map2};
use rigcal_imgproc::{
    calibration::{
        is_rotation, CalibrationError, CameraExtrinsic, CameraIntrinsic, DistortionModel,
    },
    interpolation::{remap, InterpolationMode},
};
use serde::{Deserialize, Serialize};

use crate::{
    cv::{CvReader, CvWriter},
    document::{
        mat3_from_rows, mat3_to_rows, mat4_from_rows, mat4_to_rows, parse_native, read_document,
        vec3_from, vec4_from, Dialect,
    },
    error::ParamError,
    param::ParamBase,
};

/// Tolerance of the rigid transform checks.
pub const RIGID_TOLERANCE: f32 = 1e-3;

/// Number of cameras of a stereo rig.
pub const NUM_EYES: usize = 2;

/// The hardware family of a device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorType {
    /// Unknown hardware.
    #[default]
    Unknown = 0,
    /// LI sensor.
    Li = 2,
    /// XP sensor.
    Xp = 3,
    /// XP2 sensor.
    Xp2 = 4,
    /// XP3 sensor.
    Xp3 = 5,
}

impl SensorType {
    /// The integer code used by the legacy layout.
    pub fn code(&self) -> i64 {
        *self as i64
    }

    /// Decode a legacy integer code.
    pub fn from_code(code: i64) -> Result<Self, ParamError> {
        match code {
            0 => Ok(SensorType::Unknown),
            2 => Ok(SensorType::Li),
            3 => Ok(SensorType::Xp),
            4 => Ok(SensorType::Xp2),
            5 => Ok(SensorType::Xp3),
            other => Err(ParamError::MalformedDocument(format!(
                "unknown sensor_type code: {other}"
            ))),
        }
    }

    /// The stable name of the sensor type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Unknown => "UNKNOWN",
            SensorType::Li => "LI",
            SensorType::Xp => "XP",
            SensorType::Xp2 => "XP2",
            SensorType::Xp3 => "XP3",
        }
    }

    /// Returns true for the XP sensor family.
    pub fn is_xp(&self) -> bool {
        matches!(self, SensorType::Xp | SensorType::Xp2 | SensorType::Xp3)
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            SensorType::Unknown,
            SensorType::Li,
            SensorType::Xp,
            SensorType::Xp2,
            SensorType::Xp3,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
        .ok_or_else(|| ParamError::MalformedDocument(format!("unknown sensor_type: {s}")))
    }
}

/// The IMU model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Imu {
    /// Accelerometer scale and cross-coupling.
    pub accel_tk: Mat3,
    /// Accelerometer bias.
    pub accel_bias: Vec3,
    /// Gyroscope scale and cross-coupling.
    pub gyro_tk: Mat3,
    /// Gyroscope bias.
    pub gyro_bias: Vec3,
    /// Accelerometer noise variance in (m/s^2)^2.
    pub accel_noise_var: Vec3,
    /// Angular velocity noise variance in (rad/s)^2.
    pub angv_noise_var: Vec3,
    /// The IMU pose in the device frame (device <- imu).
    pub d_t_i: Mat4,
}

impl Imu {
    /// Check the IMU pose is rigid and the noise variances are usable.
    pub fn validate(&self) -> Result<(), ParamError> {
        if !is_rigid(&self.d_t_i) {
            return Err(ParamError::MalformedDocument(
                "Imu.D_T_I is not a rigid transform".to_string(),
            ));
        }
        for (name, var) in [
            ("accel_noise_var", self.accel_noise_var),
            ("angv_noise_var", self.angv_noise_var),
        ] {
            if !var.is_finite() || var.min_element() < 0.0 {
                return Err(ParamError::MalformedDocument(format!(
                    "Imu.{name} must be finite and non-negative: {var}"
                )));
            }
        }
        Ok(())
    }
}

/// The raw calibration of one camera.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraEye {
    /// The camera pose in the device frame (device <- camera).
    pub d_t_c: Mat4,
    /// The camera matrix.
    pub k: Mat3,
    /// Distortion coefficients in OpenCV order.
    pub dist_coeff: Vec<f32>,
    /// Usable image boundary: left, top, right, bottom.
    pub lurd: Vec4,
}

impl Default for CameraEye {
    fn default() -> Self {
        Self {
            d_t_c: Mat4::IDENTITY,
            k: Mat3::ZERO,
            dist_coeff: Vec::new(),
            lurd: Vec4::ZERO,
        }
    }
}

impl CameraEye {
    /// The intrinsics of the camera matrix.
    pub fn intrinsic(&self) -> CameraIntrinsic {
        CameraIntrinsic::from_matrix(&self.k)
    }

    /// The lens model of the camera.
    pub fn distortion(&self, fisheye: bool) -> Result<DistortionModel, CalibrationError> {
        let coeffs = self
            .dist_coeff
            .iter()
            .map(|&c| c as f64)
            .collect::<Vec<_>>();
        DistortionModel::from_coeffs(&coeffs, fisheye)
    }

    /// The camera pose in the device frame.
    pub fn extrinsic(&self) -> CameraExtrinsic {
        CameraExtrinsic::from_matrix(&self.d_t_c.as_dmat4())
    }

    fn validate(&self, index: usize, fisheye: bool) -> Result<(), ParamError> {
        let malformed = |what: String| ParamError::MalformedDocument(format!("eye {index}: {what}"));
        self.distortion(fisheye)
            .map_err(|err| malformed(err.to_string()))?;
        if !is_rigid(&self.d_t_c) {
            return Err(malformed("D_T_C is not a rigid transform".to_string()));
        }
        if !self.k.is_finite() || !self.lurd.is_finite() {
            return Err(malformed("non-finite camera matrix or boundary".to_string()));
        }
        Ok(())
    }
}

/// The raw calibration of the stereo camera.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Camera {
    /// Left (0) and right (1) cameras.
    pub eyes: Vec<CameraEye>,
    /// The image size the raw calibration refers to.
    pub img_size: ImageSize,
    /// Kannala-Brandt lenses instead of the polynomial model.
    pub fisheye: bool,
}

impl Camera {
    /// Check the camera block describes a stereo rig.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.eyes.len() != NUM_EYES {
            return Err(ParamError::MalformedDocument(format!(
                "expected {NUM_EYES} camera eyes, found {}",
                self.eyes.len()
            )));
        }
        if self.img_size.is_empty() {
            return Err(ParamError::MalformedDocument(format!(
                "empty image size {}",
                self.img_size
            )));
        }
        self.eyes
            .iter()
            .enumerate()
            .try_for_each(|(i, eye)| eye.validate(i, self.fisheye))
    }
}

/// The rectified view of one camera.
#[derive(Clone, Debug, PartialEq)]
pub struct RectifiedEye {
    /// Source column of every rectified pixel, `-1` when invalid.
    pub map_x: Map2<f32>,
    /// Source row of every rectified pixel, `-1` when invalid.
    pub map_y: Map2<f32>,
    /// The rectified camera matrix.
    pub undist_k: Mat3,
    /// The rectified camera pose in the rectified device frame.
    pub undist_d_t_c: Mat4,
}

/// Everything derived by [`DuoCalibParam::init_undistort_map`].
#[derive(Clone, Debug, PartialEq)]
pub struct Rectification {
    /// Left and right rectified cameras.
    pub eyes: Vec<RectifiedEye>,
    /// Disparity-to-depth reprojection matrix.
    pub q: Mat4,
    /// The IMU pose in the rectified device frame.
    pub undist_d_t_i: Mat4,
    /// The size of the rectified images.
    pub img_size: ImageSize,
}

impl Rectification {
    /// Resample a raw image of one eye into its rectified view.
    ///
    /// `dst` must have the size of the rectification.
    pub fn rectify_image<const C: usize>(
        &self,
        eye: usize,
        src: &Image<f32, C>,
        dst: &mut Image<f32, C>,
        interpolation: InterpolationMode,
    ) -> Result<(), ParamError> {
        let rectified = self.eyes.get(eye).ok_or_else(|| {
            ParamError::DegenerateGeometry(format!("no rectified eye {eye}"))
        })?;
        remap(
            src,
            dst,
            &rectified.map_x,
            &rectified.map_y,
            interpolation,
        )?;
        Ok(())
    }
}

/// The raw values a rectification was derived from.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RawInputs {
    eyes: Vec<CameraEye>,
    fisheye: bool,
    img_size: ImageSize,
    d_t_i: Mat4,
}

impl RawInputs {
    pub(crate) fn capture(param: &DuoCalibParam) -> Self {
        Self {
            eyes: param.camera.eyes.clone(),
            fisheye: param.camera.fisheye,
            img_size: param.camera.img_size,
            d_t_i: param.imu.d_t_i,
        }
    }

    fn matches(&self, param: &DuoCalibParam) -> bool {
        self.eyes == param.camera.eyes
            && self.fisheye == param.camera.fisheye
            && self.img_size == param.camera.img_size
            && self.d_t_i == param.imu.d_t_i
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Derived {
    pub(crate) inputs: RawInputs,
    pub(crate) rectification: Rectification,
}

/// The calibration of a stereo camera + IMU rig.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DuoCalibParam {
    /// The IMU model.
    pub imu: Imu,
    /// The stereo camera.
    pub camera: Camera,
    /// Body to left camera rotation.
    pub c_r_b: Mat3,
    /// Body origin in the left camera frame.
    pub c_p_b: Vec3,
    /// The device the calibration belongs to.
    pub device_id: String,
    /// The hardware family of the device.
    pub sensor_type: SensorType,
    pub(crate) derived: Option<Derived>,
}

impl DuoCalibParam {
    /// The rectification, if it was derived from the current raw values.
    ///
    /// Any change of the camera block or of the IMU pose after
    /// [`DuoCalibParam::init_undistort_map`] makes it stale and this returns
    /// `None` until the maps are derived again.
    pub fn rectification(&self) -> Option<&Rectification> {
        self.derived
            .as_ref()
            .filter(|derived| derived.inputs.matches(self))
            .map(|derived| &derived.rectification)
    }

    /// Load only the camera block from a native document.
    ///
    /// The IMU block and the device metadata are left untouched.
    pub fn load_cam_calib_from_yaml(&mut self, path: impl AsRef<Path>) -> Result<(), ParamError> {
        #[derive(Deserialize)]
        struct Section {
            #[serde(rename = "Camera")]
            camera: CameraDoc,
        }

        let path = path.as_ref();
        let section: Section = serde_yaml::from_str(&read_document(path)?)?;
        self.camera = section.camera.into_camera()?;
        log::debug!("loaded camera calibration from {}", path.display());
        Ok(())
    }

    /// Load only the IMU block from a native document.
    ///
    /// The camera block and the device metadata are left untouched.
    pub fn load_imu_calib_from_yaml(&mut self, path: impl AsRef<Path>) -> Result<(), ParamError> {
        #[derive(Deserialize)]
        struct Section {
            #[serde(rename = "Imu")]
            imu: ImuDoc,
        }

        let path = path.as_ref();
        let section: Section = serde_yaml::from_str(&read_document(path)?)?;
        self.imu = section.imu.into_imu()?;
        log::debug!("loaded imu calibration from {}", path.display());
        Ok(())
    }

    fn validate(&self) -> Result<(), ParamError> {
        self.imu.validate()?;
        self.camera.validate()
    }
}

impl ParamBase for DuoCalibParam {
    fn from_document(text: &str, dialect: Dialect) -> Result<Self, ParamError> {
        let param = match dialect {
            Dialect::Native => {
                let doc: CalibDoc = serde_yaml::from_value(parse_native(text)?)?;
                doc.into_param()?
            }
            Dialect::LegacyCv => Self::from_cv(&CvReader::parse(text)?)?,
        };
        param.validate()?;
        Ok(param)
    }

    fn to_document(&self, dialect: Dialect) -> Result<String, ParamError> {
        match dialect {
            Dialect::Native => Ok(serde_yaml::to_string(&CalibDoc::from_param(self))?),
            Dialect::LegacyCv => {
                let mut writer = CvWriter::new();
                self.write_cv(&mut writer);
                writer.finish()
            }
        }
    }
}

// rotation block orthonormal and bottom row [0, 0, 0, 1]
pub(crate) fn is_rigid(m: &Mat4) -> bool {
    m.is_finite()
        && m.row(3).abs_diff_eq(Vec4::W, RIGID_TOLERANCE)
        && is_rotation(&DMat3::from_mat4(m.as_dmat4()), RIGID_TOLERANCE as f64)
}

#[derive(Serialize, Deserialize)]
struct CalibDoc {
    device_id: String,
    sensor_type: SensorType,
    #[serde(rename = "C_R_B")]
    c_r_b: [f32; 9],
    #[serde(rename = "C_p_B")]
    c_p_b: [f32; 3],
    #[serde(rename = "Imu")]
    imu: ImuDoc,
    #[serde(rename = "Camera")]
    camera: CameraDoc,
}

#[derive(Serialize, Deserialize)]
struct ImuDoc {
    #[serde(rename = "accel_TK")]
    accel_tk: [f32; 9],
    accel_bias: [f32; 3],
    #[serde(rename = "gyro_TK")]
    gyro_tk: [f32; 9],
    gyro_bias: [f32; 3],
    accel_noise_var: [f32; 3],
    angv_noise_var: [f32; 3],
    #[serde(rename = "D_T_I")]
    d_t_i: [f32; 16],
}

#[derive(Serialize, Deserialize)]
struct CameraDoc {
    img_size: ImageSize,
    #[serde(rename = "fishEye")]
    fisheye: bool,
    eyes: Vec<EyeDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rectified: Option<RectifiedDoc>,
}

#[derive(Serialize, Deserialize)]
struct EyeDoc {
    #[serde(rename = "D_T_C")]
    d_t_c: [f32; 16],
    #[serde(rename = "K")]
    k: [f32; 9],
    dist_coeff: Vec<f32>,
    lurd: [f32; 4],
}

#[derive(Serialize, Deserialize)]
struct RectifiedDoc {
    img_size: ImageSize,
    #[serde(rename = "Q")]
    q: [f32; 16],
    #[serde(rename = "undist_D_T_I")]
    undist_d_t_i: [f32; 16],
    eyes: Vec<RectifiedEyeDoc>,
}

#[derive(Serialize, Deserialize)]
struct RectifiedEyeDoc {
    #[serde(rename = "K")]
    k: [f32; 9],
    #[serde(rename = "D_T_C")]
    d_t_c: [f32; 16],
}

impl CalibDoc {
    fn from_param(param: &DuoCalibParam) -> Self {
        Self {
            device_id: param.device_id.clone(),
            sensor_type: param.sensor_type,
            c_r_b: mat3_to_rows(&param.c_r_b),
            c_p_b: param.c_p_b.to_array(),
            imu: ImuDoc::from(&param.imu),
            camera: CameraDoc::new(&param.camera, param.rectification()),
        }
    }

    fn into_param(self) -> Result<DuoCalibParam, ParamError> {
        Ok(DuoCalibParam {
            imu: self.imu.into_imu()?,
            camera: self.camera.into_camera()?,
            c_r_b: mat3_from_rows(&self.c_r_b),
            c_p_b: vec3_from(&self.c_p_b),
            device_id: self.device_id,
            sensor_type: self.sensor_type,
            derived: None,
        })
    }
}

impl From<&Imu> for ImuDoc {
    fn from(imu: &Imu) -> Self {
        Self {
            accel_tk: mat3_to_rows(&imu.accel_tk),
            accel_bias: imu.accel_bias.to_array(),
            gyro_tk: mat3_to_rows(&imu.gyro_tk),
            gyro_bias: imu.gyro_bias.to_array(),
            accel_noise_var: imu.accel_noise_var.to_array(),
            angv_noise_var: imu.angv_noise_var.to_array(),
            d_t_i: mat4_to_rows(&imu.d_t_i),
        }
    }
}

impl ImuDoc {
    fn into_imu(self) -> Result<Imu, ParamError> {
        let imu = Imu {
            accel_tk: mat3_from_rows(&self.accel_tk),
            accel_bias: vec3_from(&self.accel_bias),
            gyro_tk: mat3_from_rows(&self.gyro_tk),
            gyro_bias: vec3_from(&self.gyro_bias),
            accel_noise_var: vec3_from(&self.accel_noise_var),
            angv_noise_var: vec3_from(&self.angv_noise_var),
            d_t_i: mat4_from_rows(&self.d_t_i),
        };
        imu.validate()?;
        Ok(imu)
    }
}

impl CameraDoc {
    fn new(camera: &Camera, rectification: Option<&Rectification>) -> Self {
        Self {
            img_size: camera.img_size,
            fisheye: camera.fisheye,
            eyes: camera
                .eyes
                .iter()
                .map(|eye| EyeDoc {
                    d_t_c: mat4_to_rows(&eye.d_t_c),
                    k: mat3_to_rows(&eye.k),
                    dist_coeff: eye.dist_coeff.clone(),
                    lurd: eye.lurd.to_array(),
                })
                .collect(),
            rectified: rectification.map(|rect| RectifiedDoc {
                img_size: rect.img_size,
                q: mat4_to_rows(&rect.q),
                undist_d_t_i: mat4_to_rows(&rect.undist_d_t_i),
                eyes: rect
                    .eyes
                    .iter()
                    .map(|eye| RectifiedEyeDoc {
                        k: mat3_to_rows(&eye.undist_k),
                        d_t_c: mat4_to_rows(&eye.undist_d_t_c),
                    })
                    .collect(),
            }),
        }
    }

    fn into_camera(self) -> Result<Camera, ParamError> {
        if self.rectified.is_some() {
            log::debug!("ignoring stored rectification, derive it again with init_undistort_map");
        }
        let camera = Camera {
            eyes: self
                .eyes
                .into_iter()
                .map(|eye| CameraEye {
                    d_t_c: mat4_from_rows(&eye.d_t_c),
                    k: mat3_from_rows(&eye.k),
                    dist_coeff: eye.dist_coeff,
                    lurd: vec4_from(&eye.lurd),
                })
                .collect(),
            img_size: self.img_size,
            fisheye: self.fisheye,
        };
        camera.validate()?;
        Ok(camera)
    }
}

impl DuoCalibParam {
    fn from_cv(doc: &CvReader) -> Result<Self, ParamError> {
        let sensor_type = SensorType::from_code(doc.i64("sensor_type")?)?;

        let imu = Imu {
            accel_tk: mat3_from_rows(&doc.matrix("Imu.accel_TK", 3, 3)?),
            accel_bias: vec3_from(&doc.fixed_vector("Imu.accel_bias")?),
            gyro_tk: mat3_from_rows(&doc.matrix("Imu.gyro_TK", 3, 3)?),
            gyro_bias: vec3_from(&doc.fixed_vector("Imu.gyro_bias")?),
            accel_noise_var: vec3_from(&doc.fixed_vector("Imu.accel_noise_var")?),
            angv_noise_var: vec3_from(&doc.fixed_vector("Imu.angv_noise_var")?),
            d_t_i: mat4_from_rows(&doc.matrix("Imu.D_T_I", 4, 4)?),
        };

        let dim = |key: &str| {
            usize::try_from(doc.i64(key)?)
                .map_err(|_| ParamError::MalformedDocument(format!("{key} must not be negative")))
        };
        let img_size = ImageSize {
            width: dim("image_width")?,
            height: dim("image_height")?,
        };

        if doc.contains("M0") && !doc.contains("M1") {
            return Err(ParamError::MalformedDocument(format!(
                "expected {NUM_EYES} camera eyes, found 1"
            )));
        }
        let extra = format!("M{NUM_EYES}");
        if doc.contains(&extra) || doc.contains(&format!("D_T_C{NUM_EYES}")) {
            return Err(ParamError::MalformedDocument(format!(
                "expected {NUM_EYES} camera eyes, found {extra}"
            )));
        }

        let full_image = Vec4::new(0.0, 0.0, img_size.width as f32, img_size.height as f32);
        let eyes = (0..NUM_EYES)
            .map(|n| {
                let lurd_key = format!("lurd{n}");
                let lurd = if sensor_type.is_xp() || doc.contains(&lurd_key) {
                    vec4_from(&doc.fixed_vector(&lurd_key)?)
                } else {
                    full_image
                };
                Ok(CameraEye {
                    d_t_c: mat4_from_rows(&doc.matrix(&format!("D_T_C{n}"), 4, 4)?),
                    k: mat3_from_rows(&doc.matrix(&format!("M{n}"), 3, 3)?),
                    dist_coeff: doc.vector(&format!("D{n}"))?,
                    lurd,
                })
            })
            .collect::<Result<Vec<_>, ParamError>>()?;

        // stored rectification must be well formed but is never trusted
        for n in 0..NUM_EYES {
            let key = format!("undist_M{n}");
            if doc.contains(&key) {
                doc.matrix::<9>(&key, 3, 3)?;
            }
        }
        let transforms = (0..NUM_EYES)
            .map(|n| format!("undist_D_T_C{n}"))
            .chain(["Q".to_string(), "Imu.undist_D_T_I".to_string()]);
        for key in transforms {
            if doc.contains(&key) {
                doc.matrix::<16>(&key, 4, 4)?;
            }
        }

        Ok(Self {
            imu,
            camera: Camera {
                eyes,
                img_size,
                fisheye: doc.opt_bool("fisheye")?.unwrap_or(false),
            },
            c_r_b: mat3_from_rows(&doc.matrix("C_R_B", 3, 3)?),
            c_p_b: vec3_from(&doc.fixed_vector("C_p_B")?),
            device_id: doc.str("device_id")?.to_string(),
            sensor_type,
            derived: None,
        })
    }

    fn write_cv(&self, w: &mut CvWriter) {
        w.scalar("device_id", self.device_id.as_str());
        w.scalar("sensor_type", self.sensor_type.code());
        w.matrix("C_R_B", 3, 3, &mat3_to_rows(&self.c_r_b));
        w.matrix("C_p_B", 3, 1, &self.c_p_b.to_array());

        let imu = &self.imu;
        w.matrix("Imu.accel_TK", 3, 3, &mat3_to_rows(&imu.accel_tk));
        w.matrix("Imu.accel_bias", 3, 1, &imu.accel_bias.to_array());
        w.matrix("Imu.gyro_TK", 3, 3, &mat3_to_rows(&imu.gyro_tk));
        w.matrix("Imu.gyro_bias", 3, 1, &imu.gyro_bias.to_array());
        w.matrix("Imu.accel_noise_var", 3, 1, &imu.accel_noise_var.to_array());
        w.matrix("Imu.angv_noise_var", 3, 1, &imu.angv_noise_var.to_array());
        w.matrix("Imu.D_T_I", 4, 4, &mat4_to_rows(&imu.d_t_i));

        let camera = &self.camera;
        w.scalar("image_width", camera.img_size.width as u64);
        w.scalar("image_height", camera.img_size.height as u64);
        w.flag("fisheye", camera.fisheye);
        for (n, eye) in camera.eyes.iter().enumerate() {
            w.matrix(&format!("D_T_C{n}"), 4, 4, &mat4_to_rows(&eye.d_t_c));
            w.matrix(&format!("M{n}"), 3, 3, &mat3_to_rows(&eye.k));
            w.matrix(&format!("D{n}"), 1, eye.dist_coeff.len(), &eye.dist_coeff);
            w.matrix(&format!("lurd{n}"), 1, 4, &eye.lurd.to_array());
        }

        if let Some(rect) = self.rectification() {
            for (n, eye) in rect.eyes.iter().enumerate() {
                w.matrix(&format!("undist_M{n}"), 3, 3, &mat3_to_rows(&eye.undist_k));
                w.matrix(&format!("undist_D_T_C{n}"), 4, 4, &mat4_to_rows(&eye.undist_d_t_c));
            }
            w.matrix("Imu.undist_D_T_I", 4, 4, &mat4_to_rows(&rect.undist_d_t_i));
            w.matrix("Q", 4, 4, &mat4_to_rows(&rect.q));
        }
    }
}
