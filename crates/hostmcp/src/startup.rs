//! The work done once the host answers: prepare dependencies, build the tool
//! registry, serve it, then re-check the host.

use hostmcp_config::{HostMcpConfig, PrepareCommand, ProbeKind};
use hostmcp_protocol::{HostCapabilities, HostError};
use hostmcp_runtime::{Bridge, HttpProbe, PollSchedule, Probe, TcpProbe};
use hostmcp_server::{ServerError, ServerHandle, ToolServer};
use hostmcp_tools::{CatalogReport, HttpHost, ToolRegistry, builtin_tool_registry};
use log::{debug, info, warn};
use std::fmt;
use std::process::{Command, Stdio};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("dependency preparation failed: {0}")]
    Prepare(String),
    #[error("host client: {0}")]
    Host(#[from] HostError),
    #[error("tool server: {0}")]
    Server(#[from] ServerError),
}

/// Makes sure whatever the tools rely on is installed.
pub trait DependencyPreparer: Send + Sync {
    fn prepare(&self) -> Result<(), StartupError>;
}

/// Runs each configured check command and, when the check is missing or
/// fails, the install command.
#[derive(Debug, Clone, Default)]
pub struct CommandPreparer {
    commands: Vec<PrepareCommand>,
}

impl CommandPreparer {
    pub fn new(commands: Vec<PrepareCommand>) -> Self {
        Self { commands }
    }

    fn run(argv: &[String]) -> Result<(), String> {
        let Some((program, args)) = argv.split_first() else {
            return Err("empty command".to_string());
        };
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| format!("{program}: {err}"))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        ))
    }
}

impl DependencyPreparer for CommandPreparer {
    fn prepare(&self) -> Result<(), StartupError> {
        let mut failed = Vec::new();
        for command in &self.commands {
            if let Some(check) = &command.check {
                if Self::run(check).is_ok() {
                    debug!("dependency present (name={})", command.name);
                    continue;
                }
            }
            info!("installing dependency (name={})", command.name);
            if let Err(err) = Self::run(&command.install) {
                warn!(
                    "dependency install failed (name={}, error={})",
                    command.name, err
                );
                failed.push(command.name.clone());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(StartupError::Prepare(failed.join(", ")))
        }
    }
}

/// Probe matching `readiness.probe`.
pub fn readiness_probe(config: &HostMcpConfig) -> Box<dyn Probe> {
    match config.readiness.probe {
        ProbeKind::Http => Box::new(HttpProbe::new(config.host.health_url())),
        ProbeKind::Tcp => Box::new(TcpProbe::new(config.host.socket_addr())),
    }
}

pub fn poll_schedule(config: &HostMcpConfig) -> PollSchedule {
    PollSchedule {
        interval: config.readiness.poll_interval(),
        max_attempts: config.readiness.max_attempts,
        probe_timeout: config.readiness.probe_timeout(),
    }
}

/// What a completed startup produced.
#[derive(Debug)]
pub struct StartupReport {
    pub registry: ToolRegistry,
    pub catalog: CatalogReport,
    /// `None` when `server.enabled` is off.
    pub server: Option<ServerHandle>,
}

/// Startup callback handed to the readiness monitor.
pub struct StartupSequence {
    config: HostMcpConfig,
    host: Arc<dyn HostCapabilities>,
    preparer: Box<dyn DependencyPreparer>,
    health_probe: Option<Box<dyn Probe>>,
}

impl fmt::Debug for StartupSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupSequence")
            .field("server_enabled", &self.config.server.enabled)
            .field("health_check", &self.health_probe.is_some())
            .finish()
    }
}

impl StartupSequence {
    /// Sequence against the HTTP host named in `config`.
    pub fn from_config(config: HostMcpConfig) -> Result<Self, StartupError> {
        let host = HttpHost::new(config.host.base_url())?;
        Ok(Self::new(config, Arc::new(host)))
    }

    pub fn new(config: HostMcpConfig, host: Arc<dyn HostCapabilities>) -> Self {
        let preparer = Box::new(CommandPreparer::new(
            config.startup.prepare_commands.clone(),
        ));
        let health_probe = config
            .startup
            .health_check
            .then(|| readiness_probe(&config));
        Self {
            config,
            host,
            preparer,
            health_probe,
        }
    }

    pub fn with_preparer(mut self, preparer: impl DependencyPreparer + 'static) -> Self {
        self.preparer = Box::new(preparer);
        self
    }

    pub fn with_health_probe(mut self, probe: impl Probe + 'static) -> Self {
        self.health_probe = Some(Box::new(probe));
        self
    }

    pub fn without_health_check(mut self) -> Self {
        self.health_probe = None;
        self
    }

    /// Run every step in order. Only a server failure aborts the sequence.
    pub fn run(self) -> Result<StartupReport, StartupError> {
        info!(
            "running startup sequence (host_api_version={}, server_enabled={})",
            self.host.api_version(),
            self.config.server.enabled
        );
        if let Err(err) = self.preparer.prepare() {
            warn!("dependency preparation failed; continuing (error={})", err);
        }

        let bridge = Bridge::new(self.config.bridge.timeout());
        let (registry, catalog) =
            builtin_tool_registry(self.host.as_ref(), &self.config.tools, bridge);
        info!(
            "tool catalog built (registered={}, skipped={})",
            catalog.registered.len(),
            catalog.skipped.len()
        );

        let server = if self.config.server.enabled {
            Some(ToolServer::serve(registry.clone(), &self.config.server)?)
        } else {
            info!("tool server disabled");
            None
        };

        if let Some(probe) = &self.health_probe {
            match probe.check(self.config.readiness.probe_timeout()) {
                Ok(()) => info!("host healthy after startup (target={})", probe.target()),
                Err(err) => warn!(
                    "post-start health check failed (target={}, error={})",
                    probe.target(),
                    err
                ),
            }
        }

        Ok(StartupReport {
            registry,
            catalog,
            server,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostmcp_config::ServerConfig;
    use hostmcp_runtime::ProbeFailure;
    use hostmcp_test_utils::{FakeHost, RecordingOperation};
    use hostmcp_tools::host::ROUTES;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    fn full_host() -> Arc<dyn HostCapabilities> {
        let mut host = FakeHost::new();
        for route in ROUTES {
            let operation = Arc::new(RecordingOperation::new(route.operation));
            host = host.with_named(route.operation, operation);
        }
        Arc::new(host)
    }

    fn config(server_enabled: bool) -> HostMcpConfig {
        HostMcpConfig::builder()
            .server(ServerConfig {
                enabled: server_enabled,
                listen: "127.0.0.1".to_string(),
                port: 0,
                ..ServerConfig::default()
            })
            .build()
    }

    struct FailingPreparer(Arc<AtomicUsize>);

    impl DependencyPreparer for FailingPreparer {
        fn prepare(&self) -> Result<(), StartupError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(StartupError::Prepare("ffmpeg".to_string()))
        }
    }

    struct CountingProbe(Arc<AtomicUsize>);

    impl Probe for CountingProbe {
        fn target(&self) -> String {
            "counting".to_string()
        }

        fn check(&self, _timeout: Duration) -> Result<(), ProbeFailure> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(ProbeFailure::Status(503))
        }
    }

    #[cfg(unix)]
    #[test]
    fn passing_check_skips_install() {
        let preparer = CommandPreparer::new(vec![PrepareCommand {
            name: "present".to_string(),
            check: Some(argv(&["true"])),
            install: argv(&["false"]),
        }]);
        assert!(preparer.prepare().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn failed_install_is_reported_by_name() {
        let preparer = CommandPreparer::new(vec![
            PrepareCommand {
                name: "installed".to_string(),
                check: Some(argv(&["false"])),
                install: argv(&["true"]),
            },
            PrepareCommand {
                name: "broken".to_string(),
                check: None,
                install: argv(&["false"]),
            },
            PrepareCommand {
                name: "empty".to_string(),
                check: None,
                install: Vec::new(),
            },
        ]);
        match preparer.prepare() {
            Err(StartupError::Prepare(names)) => assert_eq!(names, "broken, empty"),
            other => panic!("expected prepare failure, got {other:?}"),
        }
    }

    #[test]
    fn preparation_failure_does_not_stop_startup() {
        let prepared = Arc::new(AtomicUsize::new(0));
        let report = StartupSequence::new(config(false), full_host())
            .with_preparer(FailingPreparer(prepared.clone()))
            .without_health_check()
            .run()
            .expect("startup");
        assert_eq!(prepared.load(Ordering::SeqCst), 1);
        assert_eq!(report.registry.len(), 23);
        assert!(report.catalog.skipped.is_empty());
        assert!(report.server.is_none());
    }

    #[test]
    fn health_check_runs_once_and_only_logs() {
        let checks = Arc::new(AtomicUsize::new(0));
        let report = StartupSequence::new(config(false), full_host())
            .with_preparer(CommandPreparer::default())
            .with_health_probe(CountingProbe(checks.clone()))
            .run()
            .expect("unhealthy host still completes startup");
        assert_eq!(checks.load(Ordering::SeqCst), 1);
        assert_eq!(report.registry.len(), 23);
    }

    #[test]
    fn disabled_tools_are_left_out() {
        let mut config = config(false);
        config.tools.disabled = vec!["free_memory".to_string()];
        let report = StartupSequence::new(config, full_host())
            .without_health_check()
            .run()
            .expect("startup");
        assert_eq!(report.registry.len(), 22);
        assert!(report.registry.get("free_memory").is_none());
    }

    #[test]
    fn server_is_started_when_enabled() {
        let report = StartupSequence::new(config(true), full_host())
            .without_health_check()
            .run()
            .expect("startup");
        let server = report.server.expect("server handle");
        let body: serde_json::Value = reqwest::blocking::get(format!(
            "http://{}/health",
            server.local_addr()
        ))
        .expect("health")
        .json()
        .expect("json");
        assert_eq!(body["tools"], serde_json::json!(23));
        server.shutdown();
    }

    #[test]
    fn bind_failure_is_a_startup_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let mut config = config(true);
        config.server.port = taken.local_addr().expect("addr").port();
        let result = StartupSequence::new(config, full_host())
            .without_health_check()
            .run();
        assert!(matches!(
            result,
            Err(StartupError::Server(ServerError::Bind { .. }))
        ));
    }

    #[test]
    fn probe_follows_config() {
        let mut config = HostMcpConfig::default();
        assert_eq!(
            readiness_probe(&config).target(),
            "http://127.0.0.1:7396/system_stats"
        );
        config.readiness.probe = ProbeKind::Tcp;
        assert_eq!(readiness_probe(&config).target(), "127.0.0.1:7396");
        assert_eq!(poll_schedule(&config), PollSchedule::default());
    }
}
