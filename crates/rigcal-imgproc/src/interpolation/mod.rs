//! Pixel interpolation methods used when resampling images through remap tables.
//!
//! - **Nearest**: uses the nearest pixel value
//! - **Bilinear**: linear interpolation between the four adjacent pixels

mod bilinear;

/// Grid generation and coordinate mapping utilities.
pub mod grid;

mod nearest;
mod remap;

pub use remap::remap;

use rigcal_image::Image;

/// Interpolation mode for the remap operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    /// Bilinear interpolation
    #[default]
    Bilinear,
    /// Nearest neighbor interpolation
    Nearest,
}

/// Kernel for interpolating a pixel value
///
/// Samples outside the image (including the `-1` marker of invalid map
/// entries) return `border`.
pub fn interpolate_pixel<const C: usize>(
    image: &Image<f32, C>,
    u: f32,
    v: f32,
    c: usize,
    interpolation: InterpolationMode,
    border: f32,
) -> f32 {
    let max_u = image.cols() as f32 - 1.0;
    let max_v = image.rows() as f32 - 1.0;
    if !(u >= 0.0 && v >= 0.0 && u <= max_u && v <= max_v) {
        return border;
    }

    match interpolation {
        InterpolationMode::Bilinear => bilinear::bilinear_interpolation(image, u, v, c),
        InterpolationMode::Nearest => nearest::nearest_neighbor_interpolation(image, u, v, c),
    }
}
