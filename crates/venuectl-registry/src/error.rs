use std::fmt;

#[derive(Debug)]
pub enum RegistryError {
    UnknownDeviceFamily { device_id: String, raw_type: String },
    InvalidIp { device_id: String, ip: String },
    InvalidPort { device_id: String, port: u16 },
    DuplicateDeviceId(String),
    DeviceNotFound(String),
    GroupNotFound(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownDeviceFamily { device_id, raw_type } => {
                write!(f, "device '{device_id}' has unknown type '{raw_type}'")
            }
            RegistryError::InvalidIp { device_id, ip } => {
                write!(f, "device '{device_id}' has invalid IPv4 address '{ip}'")
            }
            RegistryError::InvalidPort { device_id, port } => {
                write!(f, "device '{device_id}' has out-of-range port {port}")
            }
            RegistryError::DuplicateDeviceId(id) => write!(f, "duplicate device id '{id}'"),
            RegistryError::DeviceNotFound(id) => write!(f, "device '{id}' not found"),
            RegistryError::GroupNotFound(id) => write!(f, "group '{id}' not found"),
        }
    }
}

impl std::error::Error for RegistryError {}

pub type RegistryResult<T> = Result<T, RegistryError>;
