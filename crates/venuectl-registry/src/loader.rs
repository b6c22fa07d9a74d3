use std::collections::HashMap;
use std::time::Duration;

use log::warn;
use venuectl_commons::{is_valid_ipv4, is_valid_port, normalize_mac, DeviceType, RawConfig};

use crate::error::RegistryError;
use crate::model::{Device, Group};

/// Builds the validated device/group maps from a parsed config document.
/// Per spec §4.D, a structurally invalid individual device is dropped with
/// a logged warning; the rest of the registry still loads. This function
/// therefore never fails outright — the caller already validated that the
/// document parsed as JSON.
pub fn build_snapshot(raw: &RawConfig) -> (HashMap<String, Device>, HashMap<String, Group>) {
    let groups: HashMap<String, Group> = raw
        .groups
        .iter()
        .map(|g| {
            (
                g.id.clone(),
                Group {
                    id: g.id.clone(),
                    name: g.name.clone(),
                    priority: g.priority,
                    parallel: g.parallel,
                },
            )
        })
        .collect();

    let mut devices = HashMap::new();
    for raw_device in &raw.devices {
        if devices.contains_key(&raw_device.id) {
            let err = RegistryError::DuplicateDeviceId(raw_device.id.clone());
            warn!("dropping device: {err}");
            continue;
        }

        let device_type = match raw_device.device_type.parse::<DeviceType>() {
            Ok(t) => t,
            Err(()) => {
                let err = RegistryError::UnknownDeviceFamily {
                    device_id: raw_device.id.clone(),
                    raw_type: raw_device.device_type.clone(),
                };
                warn!("dropping device: {err}");
                continue;
            }
        };
        let family = device_type.family();

        if !is_valid_ipv4(&raw_device.ip) {
            let err = RegistryError::InvalidIp {
                device_id: raw_device.id.clone(),
                ip: raw_device.ip.clone(),
            };
            warn!("dropping device: {err}");
            continue;
        }

        if let Some(port) = raw_device.port {
            if !is_valid_port(port) {
                let err = RegistryError::InvalidPort { device_id: raw_device.id.clone(), port };
                warn!("dropping device: {err}");
                continue;
            }
        }

        let mac = raw_device.mac.as_deref().and_then(|raw_mac| match normalize_mac(raw_mac) {
            Some(normalized) => Some(normalized),
            None => {
                warn!("device '{}': ignoring unparseable MAC '{}'", raw_device.id, raw_mac);
                None
            }
        });

        let port = raw_device.port.or_else(|| family.default_port());

        devices.insert(
            raw_device.id.clone(),
            Device {
                id: raw_device.id.clone(),
                name: raw_device.name.clone(),
                group: raw_device.group.clone(),
                family,
                ip: raw_device.ip.clone(),
                port,
                mac,
                enabled: raw_device.enabled,
                timeout: Duration::from_secs(raw_device.timeout_sec),
            },
        );
    }

    (devices, groups)
}

#[cfg(test)]
mod tests {
    use venuectl_commons::config::{RawDevice, RawGroup};

    use super::*;

    fn device(id: &str, device_type: &str, ip: &str) -> RawDevice {
        RawDevice {
            id: id.to_string(),
            name: id.to_string(),
            group: "g1".to_string(),
            device_type: device_type.to_string(),
            ip: ip.to_string(),
            port: None,
            mac: None,
            enabled: true,
            timeout_sec: 10,
        }
    }

    fn minimal_raw(devices: Vec<RawDevice>) -> RawConfig {
        use venuectl_commons::config::{RawMonitoring, RawRetryPolicy, RawSchedule};
        RawConfig {
            schedule: RawSchedule {
                on_time: "09:00".to_string(),
                off_time: "18:00".to_string(),
                timezone: "UTC".to_string(),
                days: vec!["mon".to_string()],
                exclude_dates: vec![],
                misfire_grace_sec: 3600,
            },
            retry_policy: RawRetryPolicy {
                max_attempts: 3,
                base_interval_sec: 30.0,
                backoff_multiplier: 2.0,
                max_delay_sec: None,
            },
            monitoring: RawMonitoring {
                enabled: true,
                status_check_interval_sec: 300,
                alert_threshold: 0.8,
                consecutive_failures_alert: 2,
                multi_device_alert_count: 2,
                network_issue_threshold: 5,
            },
            groups: vec![RawGroup {
                id: "g1".to_string(),
                name: "Group 1".to_string(),
                priority: 1,
                parallel: true,
            }],
            devices,
        }
    }

    #[test]
    fn drops_device_with_unknown_family_but_keeps_the_rest() {
        let raw = minimal_raw(vec![
            device("good", "optoma_telnet", "192.168.1.1"),
            device("bad", "not_a_real_type", "192.168.1.2"),
        ]);
        let (devices, _groups) = build_snapshot(&raw);
        assert_eq!(devices.len(), 1);
        assert!(devices.contains_key("good"));
    }

    #[test]
    fn drops_device_with_invalid_ip() {
        let raw = minimal_raw(vec![device("bad-ip", "optoma_telnet", "999.1.1.1")]);
        let (devices, _groups) = build_snapshot(&raw);
        assert!(devices.is_empty());
    }

    #[test]
    fn assigns_family_default_port_when_absent() {
        let raw = minimal_raw(vec![device("proj", "optoma_telnet", "192.168.1.1")]);
        let (devices, _groups) = build_snapshot(&raw);
        assert_eq!(devices["proj"].port, Some(23));
    }

    #[test]
    fn duplicate_ids_keep_only_the_first() {
        let raw = minimal_raw(vec![
            device("dup", "optoma_telnet", "192.168.1.1"),
            device("dup", "barco_jsonrpc", "192.168.1.2"),
        ]);
        let (devices, _groups) = build_snapshot(&raw);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices["dup"].ip, "192.168.1.1");
    }
}
