pub mod config;
pub mod config_error;
pub mod domain;
pub mod error_kind;
pub mod logging;
pub mod validate;

pub use config::RawConfig;
pub use config_error::{ConfigError, ConfigResult};
pub use domain::{Action, DeviceFamily, DeviceType, Trigger};
pub use error_kind::{classify_io_error, ErrorKind};
pub use validate::{is_valid_ipv4, is_valid_port, normalize_mac};
