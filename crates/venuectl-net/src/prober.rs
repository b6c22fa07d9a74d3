use std::net::IpAddr;
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::{debug, warn};
use surge_ping::{Client, Config as PingConfig, PingIdentifier, PingSequence, ICMP};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Well-known port used for the TCP-SYN fallback when ICMP is unavailable
/// (spec §4.A) — port 7 (echo) is picked purely as a low, commonly-routed
/// port, not because anything is expected to be listening on it.
const PING_FALLBACK_PORT: u16 = 7;

#[derive(Debug, Clone)]
pub struct ProberConfig {
    pub ping_timeout: Duration,
    pub tcp_timeout: Duration,
    pub http_timeout: Duration,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            ping_timeout: Duration::from_secs(2),
            tcp_timeout: Duration::from_secs(1),
            http_timeout: Duration::from_secs(1),
        }
    }
}

/// Outcome of a single, non-retrying reachability probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub success: bool,
    pub elapsed_ms: u64,
    pub message: String,
    pub extra: Option<String>,
}

impl ProbeResult {
    fn ok(elapsed_ms: u64, message: impl Into<String>) -> Self {
        Self {
            success: true,
            elapsed_ms,
            message: message.into(),
            extra: None,
        }
    }

    fn ok_with_extra(elapsed_ms: u64, message: impl Into<String>, extra: impl Into<String>) -> Self {
        Self {
            success: true,
            elapsed_ms,
            message: message.into(),
            extra: Some(extra.into()),
        }
    }

    fn fail(elapsed_ms: u64, message: impl Into<String>) -> Self {
        Self {
            success: false,
            elapsed_ms,
            message: message.into(),
            extra: None,
        }
    }
}

/// Reachability prober: ICMP ping (with TCP fallback), raw TCP connect, and
/// a single HTTP GET. Never retries internally — the retry engine is a
/// separate, explicit layer (spec §4.A).
pub struct Prober {
    config: ProberConfig,
    http_client: reqwest::Client,
}

impl Prober {
    pub fn new(config: ProberConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, http_client }
    }

    /// Fires one ICMP echo with a deadline of `ping_timeout`. Falls back to
    /// a single TCP SYN probe on `PING_FALLBACK_PORT` when the platform
    /// won't let us open an ICMP socket without elevated privileges.
    pub async fn ping(&self, ip: &str) -> ProbeResult {
        let started = Instant::now();
        let addr = match IpAddr::from_str(ip) {
            Ok(addr) => addr,
            Err(e) => return ProbeResult::fail(elapsed_ms(started), format!("invalid address {ip}: {e}")),
        };

        match self.icmp_echo(addr).await {
            Ok(rtt) => ProbeResult::ok_with_extra(
                elapsed_ms(started),
                format!("ping {ip} ok"),
                format!("rtt_ms={}", rtt.as_millis()),
            ),
            Err(e) => {
                debug!("icmp ping to {ip} unavailable ({e}), falling back to tcp probe on port {PING_FALLBACK_PORT}");
                self.tcp_probe(ip, PING_FALLBACK_PORT).await
            }
        }
    }

    async fn icmp_echo(&self, addr: IpAddr) -> Result<Duration, String> {
        let kind = if addr.is_ipv4() { ICMP::V4 } else { ICMP::V6 };
        let client = Client::new(&PingConfig::builder().kind(kind).build()).map_err(|e| e.to_string())?;
        let ident = PingIdentifier(rand::random::<u16>());
        let mut pinger = client.pinger(addr, ident).await;
        pinger.timeout(self.config.ping_timeout);
        let payload = [0u8; 32];
        let (_packet, rtt) = pinger
            .ping(PingSequence(0), &payload)
            .await
            .map_err(|e| e.to_string())?;
        Ok(rtt)
    }

    /// Opens a TCP connection with a deadline and closes it immediately.
    /// Success iff `connect` returns without error.
    pub async fn tcp_probe(&self, ip: &str, port: u16) -> ProbeResult {
        let started = Instant::now();
        let addr = format!("{ip}:{port}");
        match timeout(self.config.tcp_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => ProbeResult::ok(elapsed_ms(started), format!("tcp {addr} open")),
            Ok(Err(e)) => ProbeResult::fail(elapsed_ms(started), format!("tcp {addr} refused: {e}")),
            Err(_) => ProbeResult::fail(elapsed_ms(started), format!("tcp {addr} timed out")),
        }
    }

    /// Issues a single GET to `http://ip:port/`. Success iff status < 500.
    pub async fn http_probe(&self, ip: &str, port: u16) -> ProbeResult {
        let started = Instant::now();
        let url = format!("http://{ip}:{port}/");
        match timeout(self.config.http_timeout, self.http_client.get(&url).send()).await {
            Ok(Ok(resp)) => {
                let status = resp.status();
                if status.as_u16() < 500 {
                    ProbeResult::ok(elapsed_ms(started), format!("http {url} -> {status}"))
                } else {
                    ProbeResult::fail(elapsed_ms(started), format!("http {url} -> {status}"))
                }
            }
            Ok(Err(e)) => {
                warn!("http probe to {url} failed: {e}");
                ProbeResult::fail(elapsed_ms(started), format!("http {url} failed: {e}"))
            }
            Err(_) => ProbeResult::fail(elapsed_ms(started), format!("http {url} timed out")),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tcp_probe_against_closed_port_fails_fast() {
        let prober = Prober::new(ProberConfig {
            tcp_timeout: Duration::from_millis(300),
            ..ProberConfig::default()
        });
        // Port 1 is reserved and almost never listening in test environments.
        let result = prober.tcp_probe("127.0.0.1", 1).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn ping_rejects_malformed_address_without_panicking() {
        let prober = Prober::new(ProberConfig::default());
        let result = prober.ping("not-an-ip").await;
        assert!(!result.success);
        assert!(result.message.contains("invalid address"));
    }
}
