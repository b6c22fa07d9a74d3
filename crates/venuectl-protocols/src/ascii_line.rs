use std::time::Duration;

use async_trait::async_trait;
use venuectl_retry::AttemptOutcome;

use crate::adapter::{AdapterTarget, DeviceAdapter, PowerState, StatusOutcome};
use crate::io_util;

const CMD_POWER_ON: &str = "~0000 1\r";
const CMD_POWER_OFF: &str = "~0000 0\r";
const CMD_STATUS: &str = "~00124 1\r";

const READ_DEADLINE: Duration = Duration::from_secs(2);
const SETTLE_DELAY: Duration = Duration::from_millis(300);
const MAX_REPLY_BYTES: usize = 1024;

/// Telnet-style RS232-over-TCP adapter for the Optoma projector family
/// (spec §4.B). A single attempt: connect, send, sleep for the device to
/// process, read what (if anything) comes back, close. Absence of a reply
/// is not itself a failure for on/off — many units never answer.
pub struct AsciiLineAdapter;

impl AsciiLineAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn transact(&self, target: &AdapterTarget, command: &str) -> (Result<(), venuectl_commons::ErrorKind>, String) {
        let port = target.port.unwrap_or(23);
        let mut stream = match io_util::connect(&target.ip, port, target.timeout).await {
            Ok(stream) => stream,
            Err(e) => return (Err(e), String::new()),
        };

        if let Err(e) = io_util::send(&mut stream, command.as_bytes(), target.timeout).await {
            return (Err(e), String::new());
        }

        tokio::time::sleep(SETTLE_DELAY).await;

        let reply = io_util::read_best_effort(&mut stream, MAX_REPLY_BYTES, READ_DEADLINE).await;
        let text = String::from_utf8_lossy(&reply).trim().to_string();
        (Ok(()), text)
    }
}

impl Default for AsciiLineAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceAdapter for AsciiLineAdapter {
    async fn power_on(&self, target: &AdapterTarget) -> AttemptOutcome {
        let (result, response) = self.transact(target, CMD_POWER_ON).await;
        match result {
            Ok(()) => AttemptOutcome::success(response),
            Err(e) => AttemptOutcome::failure(e),
        }
    }

    async fn power_off(&self, target: &AdapterTarget) -> AttemptOutcome {
        let (result, response) = self.transact(target, CMD_POWER_OFF).await;
        match result {
            Ok(()) => AttemptOutcome::success(response),
            Err(e) => AttemptOutcome::failure(e),
        }
    }

    async fn status(&self, target: &AdapterTarget) -> StatusOutcome {
        let (result, response) = self.transact(target, CMD_STATUS).await;
        match result {
            Ok(()) => {
                // An empty reply is ambiguous for status (unlike on/off,
                // where no reply is expected and fine) — spec §9 resolves
                // this by reporting `unknown` rather than guessing.
                let power_state = if response.is_empty() {
                    PowerState::Unknown
                } else if response.contains('1') {
                    PowerState::On
                } else if response.contains('0') {
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
