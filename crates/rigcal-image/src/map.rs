use crate::{error::ImageError, ImageSize};

/// A dense row-major 2D buffer.
///
/// Used for per-pixel lookup tables such as the x/y remap tables produced by the
/// undistortion/rectification routines. The shape is `[rows, cols]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Map2<T> {
    /// The shape of the buffer as `[rows, cols]`.
    pub shape: [usize; 2],
    data: Vec<T>,
}

impl<T> Map2<T> {
    /// Create a buffer from a shape and row-major data.
    ///
    /// # Errors
    ///
    /// If `data` does not hold exactly `rows * cols` elements.
    pub fn from_shape_vec(shape: [usize; 2], data: Vec<T>) -> Result<Self, ImageError> {
        let [rows, cols] = shape;
        let expected = rows
            .checked_mul(cols)
            .ok_or(ImageError::ImageSizeOverflow(cols, rows))?;
        if data.len() != expected {
            return Err(ImageError::InvalidChannelShape(data.len(), expected));
        }
        Ok(Self { shape, data })
    }

    /// The size of the buffer as an image size.
    pub fn size(&self) -> ImageSize {
        ImageSize {
            width: self.shape[1],
            height: self.shape[0],
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.shape[1]
    }

    /// Get the element at `[row, col]`.
    pub fn get(&self, index: [usize; 2]) -> Option<&T> {
        if index[0] >= self.shape[0] || index[1] >= self.shape[1] {
            return None;
        }
        self.data.get(index[0] * self.shape[1] + index[1])
    }

    /// Get the data as a row-major slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get the data as a mutable row-major slice.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_indexing() -> Result<(), ImageError> {
        let map = Map2::from_shape_vec([2, 3], vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0])?;
        assert_eq!(map.size(), ImageSize::from([3, 2]));
        assert_eq!(map.get([1, 2]), Some(&12.0));
        assert_eq!(map.get([2, 0]), None);
        assert_eq!(map.get([0, 3]), None);
        Ok(())
    }

    #[test]
    fn map_from_shape_vec() {
        assert!(Map2::from_shape_vec([2, 2], vec![0u8; 4]).is_ok());
        assert_eq!(
            Map2::from_shape_vec([2, 2], vec![0u8; 5]),
            Err(ImageError::InvalidChannelShape(5, 4))
        );
        assert_eq!(
            Map2::from_shape_vec([usize::MAX, 2], vec![0u8; 1]),
            Err(ImageError::ImageSizeOverflow(2, usize::MAX))
        );
    }
}
