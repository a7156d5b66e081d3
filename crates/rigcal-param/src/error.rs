use std::path::PathBuf;

use rigcal_image::{ImageError, ImageSize};
use rigcal_imgproc::calibration::CalibrationError;

/// An error type for loading, saving and deriving parameters.
#[derive(thiserror::Error, Debug)]
pub enum ParamError {
    /// The parameter file does not exist.
    #[error("File does not exist: {0}")]
    MissingFile(PathBuf),

    /// The document could not be parsed or holds invalid values.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A required key is absent from the document or the parameters.
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// No calibration file is registered for the device.
    #[error("Unrecognized device id: {0}")]
    UnrecognizedDeviceId(String),

    /// The calibration does not describe a usable stereo rig.
    #[error("Degenerate stereo geometry: {0}")]
    DegenerateGeometry(String),

    /// The requested output size has a zero dimension.
    #[error("Degenerate target size: {0}")]
    DegenerateTargetSize(ImageSize),

    /// The destination file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        /// The destination path.
        path: PathBuf,
        /// The underlying io error.
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_yaml::Error> for ParamError {
    fn from(err: serde_yaml::Error) -> Self {
        let msg = err.to_string();
        match missing_field_name(&msg) {
            Some(field) => ParamError::MissingRequiredField(field.to_string()),
            None => ParamError::MalformedDocument(msg),
        }
    }
}

impl From<CalibrationError> for ParamError {
    fn from(err: CalibrationError) -> Self {
        ParamError::DegenerateGeometry(err.to_string())
    }
}

impl From<ImageError> for ParamError {
    fn from(err: ImageError) -> Self {
        ParamError::DegenerateGeometry(err.to_string())
    }
}

// serde reports absent struct fields as "missing field `name`"
fn missing_field_name(msg: &str) -> Option<&str> {
    const MARKER: &str = "missing field `";
    let start = msg.find(MARKER)? + MARKER.len();
    let len = msg[start..].find('`')?;
    Some(&msg[start..start + len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Doc {
        a: i32,
        b: i32,
    }

    #[test]
    fn yaml_missing_field_is_classified() {
        let err: ParamError = serde_yaml::from_str::<Doc>("a: 1\n").unwrap_err().into();
        assert!(matches!(err, ParamError::MissingRequiredField(ref f) if f == "b"));
    }

    #[test]
    fn yaml_type_error_is_malformed() {
        let err: ParamError = serde_yaml::from_str::<Doc>("a: x\nb: 2\n").unwrap_err().into();
        assert!(matches!(err, ParamError::MalformedDocument(_)));
    }

    #[test]
    fn calibration_error_is_degenerate_geometry() {
        let err: ParamError = CalibrationError::DegenerateBaseline(0.0).into();
        assert!(matches!(err, ParamError::DegenerateGeometry(_)));
    }
}
