use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    calib::DuoCalibParam,
    document::{read_document, Dialect},
    error::ParamError,
    param::ParamBase,
};

/// Maps device ids to calibration files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CalibRegistry {
    files: HashMap<String, PathBuf>,
}

#[derive(Deserialize)]
struct IndexDoc {
    #[serde(default)]
    devices: HashMap<String, PathBuf>,
}

impl CalibRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the calibration file of a device, replacing any previous entry.
    pub fn insert(&mut self, device_id: impl Into<String>, path: impl Into<PathBuf>) {
        self.files.insert(device_id.into(), path.into());
    }

    /// Load a registry from an index document.
    ///
    /// ```yaml
    /// devices:
    ///   XP3-0001: calib/xp3-0001.yaml
    ///   LI-0042: /etc/rig/li-0042.yaml
    /// ```
    ///
    /// Relative paths are resolved against the directory of the index.
    pub fn from_index_file(path: impl AsRef<Path>) -> Result<Self, ParamError> {
        let path = path.as_ref();
        let doc: IndexDoc = serde_yaml::from_str(&read_document(path)?)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let files = doc
            .devices
            .into_iter()
            .map(|(id, file)| {
                let file = if file.is_relative() {
                    base.join(file)
                } else {
                    file
                };
                (id, file)
            })
            .collect::<HashMap<_, _>>();

        log::debug!(
            "loaded {} calibration entries from {}",
            files.len(),
            path.display()
        );
        Ok(Self { files })
    }

    /// The calibration file of a device.
    pub fn get(&self, device_id: &str) -> Option<&Path> {
        self.files.get(device_id).map(PathBuf::as_path)
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no device is registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Resolve the calibration file of a device.
pub fn get_calib_file_from_device_id(
    registry: &CalibRegistry,
    device_id: &str,
) -> Result<PathBuf, ParamError> {
    registry
        .get(device_id)
        .map(Path::to_path_buf)
        .ok_or_else(|| ParamError::UnrecognizedDeviceId(device_id.to_string()))
}

/// Load the IMU block of a device calibration.
///
/// Only `param.imu` is modified.
pub fn load_imu_calib_param(
    registry: &CalibRegistry,
    device_id: &str,
    param: &mut DuoCalibParam,
) -> Result<(), ParamError> {
    let path = get_calib_file_from_device_id(registry, device_id)?;
    param.load_imu_calib_from_yaml(&path)?;
    log::info!("loaded imu calibration of {device_id} from {}", path.display());
    Ok(())
}

/// Load a complete calibration file, detecting its dialect.
pub fn load_camera_calib_param(
    path: impl AsRef<Path>,
    param: &mut DuoCalibParam,
) -> Result<(), ParamError> {
    let path = path.as_ref();
    let text = read_document(path)?;
    let dialect = Dialect::detect(&text);
    *param = DuoCalibParam::from_document(&text, dialect).inspect_err(|err| {
        log::warn!("failed to load {} ({dialect}): {err}", path.display());
    })?;
    log::info!(
        "loaded calibration of {} ({}) from {}",
        param.device_id,
        param.sensor_type,
        path.display()
    );
    Ok(())
}

/// Save a complete calibration file in the native dialect.
pub fn save_camera_calib_param(
    path: impl AsRef<Path>,
    param: &DuoCalibParam,
) -> Result<(), ParamError> {
    param.save(path.as_ref(), Dialect::Native)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_device() {
        let mut registry = CalibRegistry::new();
        registry.insert("XP3-0001", "/tmp/xp3.yaml");
        assert_eq!(
            get_calib_file_from_device_id(&registry, "XP3-0001").ok(),
            Some(PathBuf::from("/tmp/xp3.yaml"))
        );
        assert!(matches!(
            get_calib_file_from_device_id(&registry, "XP3-0002"),
            Err(ParamError::UnrecognizedDeviceId(ref id)) if id == "XP3-0002"
        ));
    }

    #[test]
    fn index_resolves_relative_paths() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let index = dir.path().join("index.yaml");
        std::fs::write(
            &index,
            "devices:\n  A: calib/a.yaml\n  B: /abs/b.yaml\n",
        )?;

        let registry = CalibRegistry::from_index_file(&index)?;
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("A"), Some(dir.path().join("calib/a.yaml").as_path()));
        assert_eq!(registry.get("B"), Some(Path::new("/abs/b.yaml")));
        Ok(())
    }

    #[test]
    fn failed_camera_load_keeps_param() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "%YAML:1.0\n---\nsensor_type: 5\n")?;

        let mut param = DuoCalibParam {
            device_id: "XP3-0001".to_string(),
            ..Default::default()
        };
        assert!(load_camera_calib_param(&path, &mut param).is_err());
        assert_eq!(param.device_id, "XP3-0001");
        assert!(matches!(
            load_camera_calib_param(dir.path().join("absent.yaml"), &mut param),
            Err(ParamError::MissingFile(_))
        ));
        Ok(())
    }

    #[test]
    fn empty_index() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let index = dir.path().join("index.yaml");
        std::fs::write(&index, "devices: {}\n")?;
        assert!(CalibRegistry::from_index_file(&index)?.is_empty());
        Ok(())
    }
}
