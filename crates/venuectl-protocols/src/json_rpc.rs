use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use venuectl_commons::ErrorKind;
use venuectl_retry::AttemptOutcome;

use crate::adapter::{AdapterTarget, DeviceAdapter, PowerState, StatusOutcome};
use crate::io_util;

const METHOD_POWER_ON: &str = "system.poweron";
const METHOD_POWER_OFF: &str = "system.poweroff";
const METHOD_POWER_STATE: &str = "system.powerstate.get";
const METHOD_LAMP_TIME: &str = "system.lamptime";

const READ_DEADLINE: Duration = Duration::from_secs(5);

/// JSON-RPC 2.0-over-TCP adapter for the Barco projector family (spec
/// §4.B). Frames are single `\n`-terminated JSON objects in both
/// directions. The request `id` is a monotonic per-adapter counter, shared
/// across every device this adapter instance talks to (mirroring the
/// source system's single per-client counter).
pub struct JsonRpcAdapter {
    next_id: AtomicU64,
}

impl JsonRpcAdapter {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1) }
    }

    fn build_request(&self, method: &str, params: Option<Value>) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "id": id,
        });
        if let Some(params) = params {
            request["params"] = params;
        }
        format!("{}\n", request)
    }

    async fn call(&self, target: &AdapterTarget, method: &str) -> Result<Value, ErrorKind> {
        let port = target.port.unwrap_or(9090);
        let mut stream = io_util::connect(&target.ip, port, target.timeout).await?;

        let request = self.build_request(method, None);
        io_util::send(&mut stream, request.as_bytes(), target.timeout).await?;

        let raw = io_util::read_line_best_effort(&mut stream, READ_DEADLINE).await;
        if raw.is_empty() {
            // Many on/off commands draw no reply; treat as an empty-but-ok
            // result object rather than a hard failure.
            return Ok(Value::Object(Default::default()));
        }

        let text = String::from_utf8_lossy(&raw);
        let parsed: Value = serde_json::from_str(text.trim()).map_err(|_| ErrorKind::ProtocolError)?;

        if let Some(error) = parsed.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown JSON-RPC error")
                .to_string();
            return Err(ErrorKind::remote(code, message));
        }

        Ok(parsed.get("result").cloned().unwrap_or(Value::Object(Default::default())))
    }

    /// Auxiliary diagnostic call (not part of the `DeviceAdapter` surface,
    /// since lamp hours aren't a power operation — spec §4.B names
    /// `system.lamptime` as a method this adapter uses).
    pub async fn lamp_hours(&self, target: &AdapterTarget) -> AttemptOutcome {
        match self.call(target, METHOD_LAMP_TIME).await {
            Ok(result) => AttemptOutcome::success(result.to_string()),
            Err(e) => AttemptOutcome::failure(e),
        }
    }
}

impl Default for JsonRpcAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceAdapter for JsonRpcAdapter {
    async fn power_on(&self, target: &AdapterTarget) -> AttemptOutcome {
        match self.call(target, METHOD_POWER_ON).await {
            Ok(result) => AttemptOutcome::success(result.to_string()),
            Err(e) => AttemptOutcome::failure(e),
        }
    }

    async fn power_off(&self, target: &AdapterTarget) -> AttemptOutcome {
        match self.call(target, METHOD_POWER_OFF).await {
            Ok(result) => AttemptOutcome::success(result.to_string()),
            Err(e) => AttemptOutcome::failure(e),
        }
    }

    async fn status(&self, target: &AdapterTarget) -> StatusOutcome {
        match self.call(target, METHOD_POWER_STATE).await {
            Ok(result) => {
                let power_state = power_state_from_result(&result);
                StatusOutcome::from_outcome(AttemptOutcome::success(result.to_string()), power_state)
            }
            Err(e) => StatusOutcome::from_outcome(AttemptOutcome::failure(e), PowerState::Unknown),
        }
    }
}

fn power_state_from_result(result: &Value) -> PowerState {
    let text = match result {
        Value::String(s) => s.to_lowercase(),
        Value::Object(map) => map
            .get("power")
            .or_else(|| map.get("state"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase(),
        _ => String::new(),
    };
    if text.contains("on") {
        PowerState::On
    } else if text.contains("off") {
        PowerState::Off
    } else {
        PowerState::Unknown
    }
}
