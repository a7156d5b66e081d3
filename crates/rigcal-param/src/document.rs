use std::{
    io::{ErrorKind, Write},
    path::Path,
};

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::error::ParamError;

/// The layout family of a parameter document.
///
/// Parameter files come from two producers that disagree on key names and
/// structure. Every load/save routine takes the dialect as a value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// The nested YAML layout written by this crate.
    #[default]
    Native,
    /// The flat OpenCV `FileStorage` layout with `%YAML:1.0` header and
    /// `opencv-matrix` nodes.
    LegacyCv,
}

impl Dialect {
    /// Guess the dialect of a document from its header.
    pub fn detect(text: &str) -> Self {
        // OpenCV writes `%YAML:1.0`, a standard directive has no colon
        if text.trim_start().starts_with("%YAML:") {
            Dialect::LegacyCv
        } else {
            Dialect::Native
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Dialect::Native => write!(f, "native"),
            Dialect::LegacyCv => write!(f, "legacy-cv"),
        }
    }
}

/// Read a whole document into memory.
pub fn read_document(path: &Path) -> Result<String, ParamError> {
    std::fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ParamError::MissingFile(path.to_path_buf()),
        _ => ParamError::MalformedDocument(format!("cannot read {}: {err}", path.display())),
    })
}

/// Publish a document atomically.
///
/// The text is staged in a temporary file next to `path` and renamed over it,
/// so readers never observe a truncated document.
pub fn write_document(path: &Path, text: &str) -> Result<(), ParamError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let fail = |source| ParamError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
    staged.write_all(text.as_bytes()).map_err(fail)?;
    staged.as_file().sync_all().map_err(fail)?;
    staged.persist(path).map_err(|err| fail(err.error))?;

    log::debug!("wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}

/// Parse a native document, mapping an empty document to `Null`.
pub(crate) fn parse_native(text: &str) -> Result<serde_yaml::Value, ParamError> {
    let value: serde_yaml::Value = serde_yaml::from_str(text)?;
    match value {
        serde_yaml::Value::Mapping(_) | serde_yaml::Value::Null => Ok(value),
        _ => Err(ParamError::MalformedDocument(
            "top level must be a mapping".to_string(),
        )),
    }
}

// documents store matrices row-major, glam is column-major

pub(crate) fn mat3_from_rows(rows: &[f32; 9]) -> Mat3 {
    Mat3::from_cols_array(rows).transpose()
}

pub(crate) fn mat3_to_rows(m: &Mat3) -> [f32; 9] {
    m.transpose().to_cols_array()
}

pub(crate) fn mat4_from_rows(rows: &[f32; 16]) -> Mat4 {
    Mat4::from_cols_array(rows).transpose()
}

pub(crate) fn mat4_to_rows(m: &Mat4) -> [f32; 16] {
    m.transpose().to_cols_array()
}

pub(crate) fn vec3_from(v: &[f32; 3]) -> Vec3 {
    Vec3::from_array(*v)
}

pub(crate) fn vec4_from(v: &[f32; 4]) -> Vec4 {
    Vec4::from_array(*v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_dialect() {
        assert_eq!(Dialect::detect("%YAML:1.0\n---\na: 1\n"), Dialect::LegacyCv);
        assert_eq!(Dialect::detect("  %YAML:1.0\n"), Dialect::LegacyCv);
        assert_eq!(Dialect::detect("%YAML 1.2\n---\na: 1\n"), Dialect::Native);
        assert_eq!(Dialect::detect("device_id: x\n"), Dialect::Native);
        assert_eq!(Dialect::detect(""), Dialect::Native);
    }

    #[test]
    fn row_major_conversion() {
        let rows = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let m = mat3_from_rows(&rows);
        assert_eq!(m.row(0).to_array(), [1.0, 2.0, 3.0]);
        assert_eq!(m.col(0).to_array(), [1.0, 4.0, 7.0]);
        assert_eq!(mat3_to_rows(&m), rows);

        let mut rows4 = [0.0; 16];
        rows4[3] = 0.06;
        let m4 = mat4_from_rows(&rows4);
        assert_eq!(m4.w_axis.x, 0.06);
        assert_eq!(mat4_to_rows(&m4), rows4);
    }

    #[test]
    fn read_missing_file() {
        let err = read_document(Path::new("/nonexistent/calib.yaml")).unwrap_err();
        assert!(matches!(err, ParamError::MissingFile(_)));
    }

    #[test]
    fn write_then_read() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("doc.yaml");
        write_document(&path, "a: 1\n")?;
        write_document(&path, "a: 2\n")?;
        assert_eq!(read_document(&path)?, "a: 2\n");
        // only the published file remains
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn write_into_missing_dir_fails() {
        let err = write_document(Path::new("/nonexistent/dir/doc.yaml"), "a: 1\n").unwrap_err();
        assert!(matches!(err, ParamError::WriteFailure { .. }));
    }

    #[test]
    fn parse_native_rejects_scalars() {
        assert!(matches!(parse_native(""), Ok(serde_yaml::Value::Null)));
        assert!(matches!(
            parse_native("42"),
            Err(ParamError::MalformedDocument(_))
        ));
    }
}
