use std::path::Path;

use crate::{
    document::{read_document, write_document, Dialect},
    error::ParamError,
};

/// The persistence contract shared by every parameter set.
///
/// Implementors only provide the in-memory conversion to and from a document
/// of a given [`Dialect`]. File access, atomic publishing and logging are
/// provided on top of it.
pub trait ParamBase: Default + Sized {
    /// Parse a complete document.
    fn from_document(text: &str, dialect: Dialect) -> Result<Self, ParamError>;

    /// Render a complete document.
    fn to_document(&self, dialect: Dialect) -> Result<String, ParamError>;

    /// Load the parameters from a file.
    ///
    /// The file is parsed into a fresh value which replaces `self` only when
    /// the whole document was valid. On error `self` is left untouched.
    fn load(&mut self, path: impl AsRef<Path>, dialect: Dialect) -> Result<(), ParamError> {
        let path = path.as_ref();
        let text = read_document(path)?;
        match Self::from_document(&text, dialect) {
            Ok(value) => {
                *self = value;
                log::debug!("loaded {} ({dialect})", path.display());
                Ok(())
            }
            Err(err) => {
                log::warn!("failed to load {} ({dialect}): {err}", path.display());
                Err(err)
            }
        }
    }

    /// Save the parameters to a file, replacing it atomically.
    fn save(&self, path: impl AsRef<Path>, dialect: Dialect) -> Result<(), ParamError> {
        let text = self.to_document(dialect)?;
        write_document(path.as_ref(), &text)
    }

    /// Load a native document.
    fn load_from_yaml(&mut self, path: impl AsRef<Path>) -> Result<(), ParamError> {
        self.load(path, Dialect::Native)
    }

    /// Save a native document.
    fn write_to_yaml(&self, path: impl AsRef<Path>) -> Result<(), ParamError> {
        self.save(path, Dialect::Native)
    }

    /// Load a legacy OpenCV document.
    fn load_from_cv_yaml(&mut self, path: impl AsRef<Path>) -> Result<(), ParamError> {
        self.load(path, Dialect::LegacyCv)
    }

    /// Save a legacy OpenCV document.
    fn write_to_cv_yaml(&self, path: impl AsRef<Path>) -> Result<(), ParamError> {
        self.save(path, Dialect::LegacyCv)
    }
}
