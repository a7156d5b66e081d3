//! Calibration state for stereo camera + IMU rigs.

#[doc(inline)]
pub use rigcal_image as image;

#[doc(inline)]
pub use rigcal_imgproc as imgproc;

#[doc(inline)]
pub use rigcal_param as param;
