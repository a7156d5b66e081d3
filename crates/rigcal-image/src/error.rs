/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when the data length does not match the requested shape.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when two buffers that must share a size do not.
    #[error("Image size mismatch: ({0}, {1}) vs ({2}, {3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when a size has a zero dimension.
    #[error("Image size must be non-zero, got {0}x{1}")]
    EmptyImageSize(usize, usize),

    /// Error when a size holds more elements than can be addressed.
    #[error("Image size {0}x{1} is too large")]
    ImageSizeOverflow(usize, usize),
}
