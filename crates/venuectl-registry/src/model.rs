use std::time::Duration;

use venuectl_commons::DeviceFamily;

/// Immutable per-reload device snapshot (spec §3). Nothing about a `Device`
/// ever mutates in place — a reload replaces the whole registry snapshot,
/// never an individual record.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub group: String,
    pub family: DeviceFamily,
    pub ip: String,
    pub port: Option<u16>,
    pub mac: Option<String>,
    pub enabled: bool,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub parallel: bool,
}
