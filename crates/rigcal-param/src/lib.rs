#![deny(missing_docs)]
//! Calibration and algorithm parameters of a stereo camera + IMU rig.

pub mod algorithm;

pub mod calib;

/// Document dialects and file access.
pub mod document;

/// Error types for the param module.
pub mod error;

/// The persistence contract of parameter sets.
pub mod param;

/// Device id to calibration file resolution.
pub mod registry;

mod cv;
mod undistort;

pub use crate::algorithm::{AlgorithmParam, FeatDetParam, SlaveDet, Tracking};
pub use crate::calib::{
    Camera, CameraEye, DuoCalibParam, Imu, RectifiedEye, Rectification, SensorType,
};
pub use crate::document::Dialect;
pub use crate::error::ParamError;
pub use crate::param::ParamBase;
pub use rigcal_imgproc::interpolation::InterpolationMode;

pub use crate::registry::{
    get_calib_file_from_device_id, load_camera_calib_param, load_imu_calib_param,
    save_camera_calib_param, CalibRegistry,
};
