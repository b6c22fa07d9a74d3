use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// The closed set of device families named in the config `type` field.
/// `exposition_pc` and `generic_tcp` both carry no vendor wire protocol, so
/// both resolve to the passive-pc family below.
///
/// Parsed from the raw config string explicitly (rather than via
/// `#[derive(Deserialize)]` on the whole `devices` array) so that one
/// unrecognised tag drops only that device instead of failing the entire
/// document (spec §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    OptomaTelnet,
    BarcoJsonrpc,
    CubesCustom,
    ExpositionPc,
    GenericTcp,
}

impl FromStr for DeviceType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "optoma_telnet" => Ok(DeviceType::OptomaTelnet),
            "barco_jsonrpc" => Ok(DeviceType::BarcoJsonrpc),
            "cubes_custom" => Ok(DeviceType::CubesCustom),
            "exposition_pc" => Ok(DeviceType::ExpositionPc),
            "generic_tcp" => Ok(DeviceType::GenericTcp),
            _ => Err(()),
        }
    }
}

/// The closed family tag that determines adapter dispatch (spec §3/§4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceFamily {
    AsciiLine,
    JsonRpc,
    SemicolonTcp,
    PassivePc,
}

impl DeviceType {
    pub fn family(self) -> DeviceFamily {
        match self {
            DeviceType::OptomaTelnet => DeviceFamily::AsciiLine,
            DeviceType::BarcoJsonrpc => DeviceFamily::JsonRpc,
            DeviceType::CubesCustom => DeviceFamily::SemicolonTcp,
            DeviceType::ExpositionPc | DeviceType::GenericTcp => DeviceFamily::PassivePc,
        }
    }
}

impl DeviceFamily {
    /// Family-defaulted TCP port per spec §3 (23 / 9090 / 7992 / none).
    pub fn default_port(self) -> Option<u16> {
        match self {
            DeviceFamily::AsciiLine => Some(23),
            DeviceFamily::JsonRpc => Some(9090),
            DeviceFamily::SemicolonTcp => Some(7992),
            DeviceFamily::PassivePc => None,
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceFamily::AsciiLine => "ascii-line",
            DeviceFamily::JsonRpc => "json-rpc",
            DeviceFamily::SemicolonTcp => "semicolon-tcp",
            DeviceFamily::PassivePc => "passive-pc",
        };
        write!(f, "{s}")
    }
}

/// The two operations the orchestrator can fan out (spec §4.E). `status` is
/// read separately per-device and is not itself a batch action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    TurnOn,
    TurnOff,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::TurnOn => write!(f, "on"),
            Action::TurnOff => write!(f, "off"),
        }
    }
}

/// What caused an orchestrator batch to run. Informational only — carried
/// through to the action-log sink and the execution report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Scheduled,
    Manual,
    Api,
    Startup,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
            Trigger::Api => "api",
            Trigger::Startup => "startup",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_pc_and_generic_tcp_both_map_to_passive() {
        assert_eq!(DeviceType::ExpositionPc.family(), DeviceFamily::PassivePc);
        assert_eq!(DeviceType::GenericTcp.family(), DeviceFamily::PassivePc);
    }

    #[test]
    fn parses_known_type_tags_and_rejects_unknown() {
        assert_eq!(
            "optoma_telnet".parse::<DeviceType>().unwrap(),
            DeviceType::OptomaTelnet
        );
        assert_eq!(
            "barco_jsonrpc".parse::<DeviceType>().unwrap(),
            DeviceType::BarcoJsonrpc
        );
        assert!("made_up_vendor".parse::<DeviceType>().is_err());
    }

    #[test]
    fn family_default_ports_match_spec() {
        assert_eq!(DeviceFamily::AsciiLine.default_port(), Some(23));
        assert_eq!(DeviceFamily::JsonRpc.default_port(), Some(9090));
        assert_eq!(DeviceFamily::SemicolonTcp.default_port(), Some(7992));
        assert_eq!(DeviceFamily::PassivePc.default_port(), None);
    }
}
