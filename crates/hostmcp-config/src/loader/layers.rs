//! Reading layer files and resolving their locations.

use super::{CONFIG_DIR, CONFIG_FILE, ConfigLayer, ConfigLayerSource, schema};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Read and schema-check a layer. Missing optional layers yield `None`.
pub(super) fn read_layer(
    source: ConfigLayerSource,
    path: &Path,
    required: bool,
) -> Result<Option<(ConfigLayer, Value)>, ConfigError> {
    if !required && !path.exists() {
        debug!(
            "layer missing (source={:?}, path={})",
            source,
            path.display()
        );
        return Ok(None);
    }
    debug!(
        "loading config layer (source={:?}, path={})",
        source,
        path.display()
    );
    let contents = fs::read_to_string(path).map_err(|err| ConfigError::read(path, err))?;
    let label = format!("{}({})", source.label(), path.display());
    let value: Value =
        json5::from_str(&contents).map_err(|err| ConfigError::parse(label.as_str(), err))?;
    schema::validate_layer(&value, &label)?;
    let layer = ConfigLayer {
        source,
        path: path.to_path_buf(),
    };
    Ok(Some((layer, value)))
}

pub(super) fn system_path(path: &str) -> Option<PathBuf> {
    if cfg!(any(unix, windows)) {
        Some(PathBuf::from(path))
    } else {
        None
    }
}

pub(super) fn user_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Canonicalize when possible; a missing path is kept as given.
pub(super) fn normalize(path: &Path) -> Result<PathBuf, ConfigError> {
    match path.canonicalize() {
        Ok(path) => Ok(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(err) => Err(ConfigError::read(path, err)),
    }
}

pub(super) fn dedup_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Nearest ancestor of `cwd` holding any of `markers`.
pub(super) fn find_project_root(cwd: &Path, markers: &[String]) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|dir| markers.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}
