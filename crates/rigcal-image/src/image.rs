use serde::{Deserialize, Serialize};

use crate::error::ImageError;

/// Size of a camera image in pixels.
///
/// Serialized as a `{width, height}` mapping in calibration documents.
///
/// # Examples
///
/// ```
/// use rigcal_image::ImageSize;
///
/// let size = ImageSize {
///     width: 640,
///     height: 480,
/// };
///
/// assert!(!size.is_empty());
/// assert_eq!(size.to_string(), "640x480");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl ImageSize {
    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered by the size.
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Number of pixels covered by the size, or `None` on overflow.
    pub fn checked_area(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from([width, height]: [usize; 2]) -> Self {
        ImageSize { width, height }
    }
}

fn buffer_len<const CHANNELS: usize>(size: ImageSize) -> Result<usize, ImageError> {
    size.checked_area()
        .and_then(|area| area.checked_mul(CHANNELS))
        .ok_or(ImageError::ImageSizeOverflow(size.width, size.height))
}

/// A dense interleaved image, stored row by row with `CHANNELS` values per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Wrap pixel data of the given size.
    ///
    /// # Errors
    ///
    /// Fails if `data` does not hold `width * height * CHANNELS` values.
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        let expected = buffer_len::<CHANNELS>(size)?;
        if data.len() != expected {
            return Err(ImageError::InvalidChannelShape(data.len(), expected));
        }
        Ok(Self { size, data })
    }

    /// An image filled with `val`.
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let len = buffer_len::<CHANNELS>(size)?;
        Image::new(size, vec![val; len])
    }

    /// The image size.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// The interleaved pixel data.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The interleaved pixel data, mutable.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// A single channel value, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize, channel: usize) -> Option<&T> {
        if row >= self.rows() || col >= self.cols() || channel >= CHANNELS {
            return None;
        }
        self.data.get((row * self.cols() + col) * CHANNELS + channel)
    }
}
