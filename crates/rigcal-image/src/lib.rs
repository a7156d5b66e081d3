#![deny(missing_docs)]
//! Image size and dense 2D buffer types shared by the rigcal crates.

/// image representation module.
pub mod image;

/// dense 2D lookup table module.
pub mod map;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
pub use crate::map::Map2;
