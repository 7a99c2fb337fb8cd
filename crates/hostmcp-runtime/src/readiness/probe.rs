use std::net::{TcpStream, ToSocketAddrs};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Why a single readiness attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeFailure {
    #[error("cannot resolve {0}")]
    Resolve(String),
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("unhealthy status {0}")]
    Status(u16),
    #[error("probe client error: {0}")]
    Client(String),
}

/// One lightweight reachability check against the host.
pub trait Probe: Send + Sync {
    /// Where the probe points, for logs.
    fn target(&self) -> String;

    /// Check once, answering within `timeout`.
    fn check(&self, timeout: Duration) -> Result<(), ProbeFailure>;
}

impl<P: Probe + ?Sized> Probe for Box<P> {
    fn target(&self) -> String {
        (**self).target()
    }

    fn check(&self, timeout: Duration) -> Result<(), ProbeFailure> {
        (**self).check(timeout)
    }
}

/// Succeeds when a TCP connection can be opened.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl Probe for TcpProbe {
    fn target(&self) -> String {
        self.address.clone()
    }

    fn check(&self, timeout: Duration) -> Result<(), ProbeFailure> {
        let addrs: Vec<_> = self
            .address
            .to_socket_addrs()
            .map_err(|err| ProbeFailure::Resolve(format!("{}: {err}", self.address)))?
            .collect();
        if addrs.is_empty() {
            return Err(ProbeFailure::Resolve(self.address.clone()));
        }
        let mut last = ProbeFailure::Resolve(self.address.clone());
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(_) => return Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::TimedOut => {
                    last = ProbeFailure::Timeout(timeout);
                }
                Err(err) => last = ProbeFailure::Connect(err.to_string()),
            }
        }
        Err(last)
    }
}

/// GETs a health URL and succeeds on any 2xx.
///
/// The blocking client is created on first use so it lives on the monitor
/// thread rather than on whichever thread built the probe.
#[derive(Debug)]
pub struct HttpProbe {
    url: String,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, ProbeFailure> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|err| ProbeFailure::Client(err.to_string()))?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl Probe for HttpProbe {
    fn target(&self) -> String {
        self.url.clone()
    }

    fn check(&self, timeout: Duration) -> Result<(), ProbeFailure> {
        let response = self
            .client()?
            .get(&self.url)
            .timeout(timeout)
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    ProbeFailure::Timeout(timeout)
                } else {
                    ProbeFailure::Connect(err.to_string())
                }
            })?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeFailure::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn tcp_probe_sees_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let probe = TcpProbe::new(addr.to_string());
        assert!(probe.check(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn tcp_probe_fails_on_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let probe = TcpProbe::new(addr.to_string());
        assert!(probe.check(Duration::from_millis(500)).is_err());
    }

    #[test]
    fn http_probe_fails_on_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let probe = HttpProbe::new(format!("http://{addr}/system_stats"));
        assert!(probe.check(Duration::from_millis(500)).is_err());
    }
}
