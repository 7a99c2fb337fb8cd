//! Configuration schema for hostmcp.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root config for the hostmcp bridge.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostMcpConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub startup: StartupConfig,
}

impl HostMcpConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> HostMcpConfigBuilder {
        HostMcpConfigBuilder::new()
    }
}

/// Builder for assembling a `HostMcpConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct HostMcpConfigBuilder {
    config: HostMcpConfig,
}

impl HostMcpConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: HostMcpConfig::default(),
        }
    }

    /// Replace the host target configuration.
    pub fn host(mut self, host: HostConfig) -> Self {
        self.config.host = host;
        self
    }

    /// Replace the readiness polling configuration.
    pub fn readiness(mut self, readiness: ReadinessConfig) -> Self {
        self.config.readiness = readiness;
        self
    }

    /// Replace the bridge configuration.
    pub fn bridge(mut self, bridge: BridgeConfig) -> Self {
        self.config.bridge = bridge;
        self
    }

    /// Replace the tool transport configuration.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Replace the tool configuration.
    pub fn tools(mut self, tools: ToolsConfig) -> Self {
        self.config.tools = tools;
        self
    }

    /// Replace the startup sequence configuration.
    pub fn startup(mut self, startup: StartupConfig) -> Self {
        self.config.startup = startup;
        self
    }

    pub fn build(self) -> HostMcpConfig {
        self.config
    }
}

/// Address of the host service being adapted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_host_address")]
    pub address: String,
    #[serde(default = "default_host_port")]
    pub port: u16,
    /// Minimal health endpoint used by HTTP readiness probes.
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: default_host_address(),
            port: default_host_port(),
            health_path: default_health_path(),
        }
    }
}

impl HostConfig {
    /// `address:port` pair for socket probes.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Base URL of the host HTTP API.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }

    /// Full URL of the health endpoint.
    pub fn health_url(&self) -> String {
        let path = self.health_path.trim_start_matches('/');
        format!("{}/{path}", self.base_url())
    }
}

fn default_host_address() -> String {
    "127.0.0.1".to_string()
}

fn default_host_port() -> u16 {
    7396
}

fn default_health_path() -> String {
    "/system_stats".to_string()
}

/// Probe flavor used by the readiness monitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// GET the health path and expect a 2xx.
    #[default]
    Http,
    /// Plain TCP connect.
    Tcp,
}

/// Readiness polling schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default)]
    pub probe: ProbeKind,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe: ProbeKind::default(),
        }
    }
}

impl ReadinessConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_max_attempts() -> u32 {
    60
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

/// Sync/async bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_bridge_timeout_ms(),
        }
    }
}

impl BridgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_bridge_timeout_ms() -> u64 {
    30_000
}

/// Tool transport binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Server name advertised to tool clients.
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Streamable-HTTP sessions unused for this long are forgotten.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_server_name(),
            listen: default_listen(),
            port: default_server_port(),
            session_idle_secs: default_session_idle_secs(),
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

fn default_server_name() -> String {
    "hostmcp".to_string()
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    7397
}

fn default_session_idle_secs() -> u64 {
    3_600
}

/// HTTP methods a tool transport may allow.
pub const CORS_METHODS: &[&str] = &["GET", "POST", "DELETE", "OPTIONS"];

/// Cross-origin policy applied once when the transport binds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorsConfig {
    #[serde(default = "default_wildcard")]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_methods")]
    pub allow_methods: Vec<String>,
    #[serde(default = "default_wildcard")]
    pub allow_headers: Vec<String>,
    #[serde(default = "default_expose_headers")]
    pub expose_headers: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: default_wildcard(),
            allow_methods: default_cors_methods(),
            allow_headers: default_wildcard(),
            expose_headers: default_expose_headers(),
            allow_credentials: true,
        }
    }
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allow_origins.iter().any(|origin| origin == "*")
    }

    pub fn allows_any_header(&self) -> bool {
        self.allow_headers.iter().any(|header| header == "*")
    }
}

fn default_wildcard() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_methods() -> Vec<String> {
    CORS_METHODS.iter().map(|method| method.to_string()).collect()
}

fn default_expose_headers() -> Vec<String> {
    vec![hostmcp_protocol::SESSION_ID_HEADER.to_string()]
}

fn default_true() -> bool {
    true
}

/// Global tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub output_policy: ToolOutputPolicyConfig,
    /// Built-in tool names that should not be registered.
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// Output policy for structured tool results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutputPolicyConfig {
    #[serde(default = "default_max_string_bytes")]
    pub max_string_bytes: usize,
    #[serde(default = "default_max_array_len")]
    pub max_array_len: usize,
    #[serde(default = "default_max_object_entries")]
    pub max_object_entries: usize,
    #[serde(default)]
    pub redact_keys: Vec<String>,
    #[serde(default = "default_redaction_replacement")]
    pub replacement: String,
}

impl Default for ToolOutputPolicyConfig {
    fn default() -> Self {
        Self {
            max_string_bytes: default_max_string_bytes(),
            max_array_len: default_max_array_len(),
            max_object_entries: default_max_object_entries(),
            redact_keys: Vec::new(),
            replacement: default_redaction_replacement(),
        }
    }
}

/// Host catalogs (node info, history) are large; limits are generous.
fn default_max_string_bytes() -> usize {
    256 * 1024
}

fn default_max_array_len() -> usize {
    4096
}

fn default_max_object_entries() -> usize {
    4096
}

fn default_redaction_replacement() -> String {
    "[REDACTED]".to_string()
}

/// One dependency preparation step run by the startup sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrepareCommand {
    pub name: String,
    /// Optional argv whose success means the dependency is already present.
    #[serde(default)]
    pub check: Option<Vec<String>>,
    /// Argv that installs the dependency.
    pub install: Vec<String>,
}

/// Startup sequence run once the host answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupConfig {
    #[serde(default)]
    pub prepare_commands: Vec<PrepareCommand>,
    /// Re-check host health after the tool transport is up.
    #[serde(default = "default_true")]
    pub health_check: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            prepare_commands: Vec::new(),
            health_check: true,
        }
    }
}
