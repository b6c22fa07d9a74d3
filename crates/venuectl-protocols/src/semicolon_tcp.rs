use std::time::Duration;

use async_trait::async_trait;
use venuectl_commons::ErrorKind;
use venuectl_retry::AttemptOutcome;

use crate::adapter::{AdapterTarget, DeviceAdapter, PowerState, StatusOutcome};
use crate::io_util;

const CMD_POWER_ON: &str = "SET(0;Power;1)\r\n";
const CMD_POWER_OFF: &str = "SET(0;Power;0)\r\n";
const CMD_GET_POWER: &str = "get(0;Power)\r\n";

const READ_DEADLINE: Duration = Duration::from_secs(3);
const SETTLE_DELAY: Duration = Duration::from_millis(300);
const MAX_REPLY_BYTES: usize = 512;

/// Custom semicolon-delimited TCP protocol for the Cubes/Medialon video
/// wall processors (spec §4.B). Gated by `AdapterCapabilities` because the
/// source system itself disagrees on whether this protocol is fully
/// implemented (spec §9) — the orchestrator checks the capability flag
/// before dispatching here, this adapter stays unconditionally correct.
pub struct SemicolonTcpAdapter;

impl SemicolonTcpAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn transact(&self, target: &AdapterTarget, command: &str) -> Result<String, ErrorKind> {
        let port = target.port.unwrap_or(7992);
        let mut stream = io_util::connect(&target.ip, port, target.timeout).await?;
        io_util::send(&mut stream, command.as_bytes(), target.timeout).await?;
        tokio::time::sleep(SETTLE_DELAY).await;
        let reply = io_util::read_best_effort(&mut stream, MAX_REPLY_BYTES, READ_DEADLINE).await;
        Ok(String::from_utf8_lossy(&reply).trim().to_string())
    }
}

impl Default for SemicolonTcpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceAdapter for SemicolonTcpAdapter {
    async fn power_on(&self, target: &AdapterTarget) -> AttemptOutcome {
        match self.transact(target, CMD_POWER_ON).await {
            Ok(response) => AttemptOutcome::success(response),
            Err(e) => AttemptOutcome::failure(e),
        }
    }

    async fn power_off(&self, target: &AdapterTarget) -> AttemptOutcome {
        match self.transact(target, CMD_POWER_OFF).await {
            Ok(response) => AttemptOutcome::success(response),
            Err(e) => AttemptOutcome::failure(e),
        }
    }

    async fn status(&self, target: &AdapterTarget) -> StatusOutcome {
        match self.transact(target, CMD_GET_POWER).await {
            Ok(response) => {
                let lowered = response.to_lowercase();
                let power_state = if lowered.contains('1') || lowered.contains("on") {
                    PowerState::On
                } else if lowered.contains('0') || lowered.contains("off") {
                    PowerState::Off
                } else {
                    PowerState::Unknown
                };
                StatusOutcome::from_outcome(AttemptOutcome::success(response), power_state)
            }
            Err(e) => StatusOutcome::from_outcome(AttemptOutcome::failure(e), PowerState::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn status_token_one_means_on() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 64];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(b"1").await;
            }
        });
        let adapter = SemicolonTcpAdapter::new();
        let target = AdapterTarget {
            ip: addr.ip().to_string(),
            port: Some(addr.port()),
            timeout: Duration::from_secs(1),
        };
        let status = adapter.status(&target).await;
        assert_eq!(status.power_state, PowerState::On);
    }

    #[tokio::test]
    async fn absent_reply_on_set_is_not_a_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 64];
                let _ = socket.read(&mut buf).await;
            }
        });
        let adapter = SemicolonTcpAdapter::new();
        let target = AdapterTarget {
            ip: addr.ip().to_string(),
            port: Some(addr.port()),
            timeout: Duration::from_secs(1),
        };
        let outcome = adapter.power_on(&target).await;
        assert!(outcome.success);
    }
}
