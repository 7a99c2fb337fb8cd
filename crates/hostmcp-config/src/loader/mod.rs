//! Layered configuration loader with requirement constraints.
//!
//! Discovers config layers (system, user, project, ...), checks each one
//! against the schema, merges them under the requirements layer and produces
//! a validated `HostMcpConfig`.

mod layers;
mod merge;
mod schema;


use crate::{CORS_METHODS, ConfigError, HostMcpConfig, ProbeKind};
use hostmcp_protocol::SESSION_ID_HEADER;
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Config filename looked up in local layers.
const CONFIG_FILE: &str = "hostmcp.json5";
/// Config directory under user or repo roots.
const CONFIG_DIR: &str = ".hostmcp";
/// Entries that mark a project root.
const PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

#[cfg(unix)]
const SYSTEM_CONFIG_PATH: &str = "/etc/hostmcp/hostmcp.json5";
#[cfg(unix)]
const SYSTEM_REQUIREMENTS_PATH: &str = "/etc/hostmcp/requirements.json5";
#[cfg(windows)]
const SYSTEM_CONFIG_PATH: &str = "C:\\ProgramData\\hostmcp\\hostmcp.json5";
#[cfg(windows)]
const SYSTEM_REQUIREMENTS_PATH: &str = "C:\\ProgramData\\hostmcp\\requirements.json5";

/// Effective config plus the layers that produced it.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: HostMcpConfig,
    pub layers: Vec<ConfigLayer>,
}

/// Origin of a config layer, ordered from lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// Locked values no other layer may override.
    Requirements,
    System,
    User,
    Project,
    Cwd,
    Repo,
    /// Explicit `--config` files.
    Runtime,
}

impl ConfigLayerSource {
    fn label(self) -> &'static str {
        match self {
            ConfigLayerSource::Requirements => "requirements",
            ConfigLayerSource::System => "system",
            ConfigLayerSource::User => "user",
            ConfigLayerSource::Project => "project",
            ConfigLayerSource::Cwd => "cwd",
            ConfigLayerSource::Repo => "repo",
            ConfigLayerSource::Runtime => "runtime",
        }
    }
}

/// A layer that was found and loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Where the loader looks for each layer.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    pub cwd: PathBuf,
    /// Defaults to `/etc/hostmcp/hostmcp.json5` on Unix.
    pub system_config_path: Option<PathBuf>,
    /// Defaults to `~/.hostmcp/hostmcp.json5`.
    pub user_config_path: Option<PathBuf>,
    pub requirements_path: Option<PathBuf>,
    /// Applied last, in order.
    pub runtime_paths: Vec<PathBuf>,
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Options with the default layer locations for `cwd`.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layers::system_path(SYSTEM_CONFIG_PATH),
            user_config_path: layers::user_config_path(),
            requirements_path: layers::system_path(SYSTEM_REQUIREMENTS_PATH),
            runtime_paths: Vec::new(),
            project_root_markers: PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Options that only read the given runtime files. Used by tests and
    /// embedders that do not want ambient layers.
    pub fn isolated(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: None,
            user_config_path: None,
            requirements_path: None,
            runtime_paths: Vec::new(),
            project_root_markers: Vec::new(),
        }
    }

    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl HostMcpConfig {
    /// Load a single config file without layering.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("loading config from path: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::read(path, err))?;
        Self::load_from_str(&contents)
    }

    /// Load a single config from JSON5 contents.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value =
            json5::from_str(contents).map_err(|err| ConfigError::parse("config", err))?;
        config_from_value(value, "config")
    }

    /// Load the layered stack from the default locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load the layered stack.
    ///
    /// Precedence (low -> high): system, user, project, cwd, repo, runtime.
    /// Keys present in the requirements layer are locked to its values.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = layers::normalize(&options.cwd)?;
        debug!("loading layered config (cwd={})", cwd.display());

        let mut candidates: Vec<(ConfigLayerSource, PathBuf, bool)> = Vec::new();
        if let Some(path) = options.system_config_path {
            candidates.push((ConfigLayerSource::System, path, false));
        }
        if let Some(path) = options.user_config_path {
            candidates.push((ConfigLayerSource::User, path, false));
        }
        let project_root = layers::find_project_root(&cwd, &options.project_root_markers);
        if let Some(root) = project_root.as_ref() {
            candidates.push((ConfigLayerSource::Project, root.join(CONFIG_FILE), false));
        }
        candidates.push((ConfigLayerSource::Cwd, cwd.join(CONFIG_FILE), false));
        if let Some(root) = project_root.as_ref() {
            candidates.push((
                ConfigLayerSource::Repo,
                root.join(CONFIG_DIR).join(CONFIG_FILE),
                false,
            ));
        }
        for path in options.runtime_paths {
            candidates.push((ConfigLayerSource::Runtime, path, true));
        }

        let mut loaded = Vec::new();
        let requirements = match options.requirements_path {
            Some(path) => layers::read_layer(ConfigLayerSource::Requirements, &path, false)?,
            None => None,
        };
        if let Some((layer, _)) = requirements.as_ref() {
            loaded.push(layer.clone());
        }

        let mut merged = requirements
            .as_ref()
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let constraints = requirements.map(|(_, value)| value);

        let mut seen = HashSet::new();
        for (source, path, required) in candidates {
            if !seen.insert(layers::dedup_key(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let Some((layer, value)) = layers::read_layer(source, &path, required)? else {
                continue;
            };
            merge::overlay(&mut merged, &value, constraints.as_ref());
            loaded.push(layer);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", loaded.len());
        Ok(LayeredConfig {
            config,
            layers: loaded,
        })
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.port == 0 {
            return Err(invalid("host.port", "must be non-zero"));
        }
        if self.host.address.trim().is_empty() {
            return Err(invalid("host.address", "must not be empty"));
        }
        if self.readiness.probe == ProbeKind::Http && !self.host.health_path.starts_with('/') {
            return Err(invalid("host.health_path", "must start with '/'"));
        }
        if self.readiness.max_attempts == 0 {
            return Err(invalid("readiness.max_attempts", "must be at least 1"));
        }
        if self.readiness.probe_timeout_ms == 0 {
            return Err(invalid("readiness.probe_timeout_ms", "must be non-zero"));
        }
        if self.bridge.timeout_ms == 0 {
            return Err(invalid("bridge.timeout_ms", "must be non-zero"));
        }
        if self.server.enabled && self.server.port == 0 {
            return Err(invalid("server.port", "must be non-zero"));
        }
        if self.server.session_idle_secs == 0 {
            return Err(invalid("server.session_idle_secs", "must be non-zero"));
        }

        let cors = &self.server.cors;
        for method in &cors.allow_methods {
            let upper = method.to_ascii_uppercase();
            if !CORS_METHODS.contains(&upper.as_str()) {
                return Err(invalid(
                    "server.cors.allow_methods",
                    &format!("unsupported method {method}"),
                ));
            }
        }
        if !cors
            .expose_headers
            .iter()
            .any(|header| header.eq_ignore_ascii_case(SESSION_ID_HEADER))
        {
            return Err(invalid(
                "server.cors.expose_headers",
                &format!("must include {SESSION_ID_HEADER}"),
            ));
        }

        for (idx, command) in self.startup.prepare_commands.iter().enumerate() {
            if command.install.is_empty() {
                return Err(invalid(
                    &format!("startup.prepare_commands[{idx}].install"),
                    "must not be empty",
                ));
            }
            if matches!(command.check.as_ref(), Some(check) if check.is_empty()) {
                return Err(invalid(
                    &format!("startup.prepare_commands[{idx}].check"),
                    "must not be empty",
                ));
            }
        }

        Ok(())
    }
}

fn invalid(path: &str, message: &str) -> ConfigError {
    ConfigError::InvalidField {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn config_from_value(value: Value, label: &str) -> Result<HostMcpConfig, ConfigError> {
    schema::validate_layer(&value, label)?;
    let config: HostMcpConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
