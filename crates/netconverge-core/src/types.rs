//! Shared vendor, device and result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Proxy type of devices driven through a netmiko-style CLI transport
pub const PROXY_NETMIKO: &str = "netmiko";

/// Proxy type of devices driven through Junos RPCs
pub const PROXY_JUNOS: &str = "junos";

/// Netmiko device type of Arista EOS switches
pub const DEVICE_ARISTA_EOS: &str = "arista_eos";

/// Netmiko device type of Cisco NX-OS switches
pub const DEVICE_CISCO_NXOS: &str = "cisco_nxos";

/// Vendor family of a device; selects the session backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    /// Arista EOS (netmiko, `configure session`)
    Arista,
    /// Cisco NX-OS (netmiko, `configure session`, no diff)
    CiscoNxos,
    /// Juniper Junos (RPC candidate buffer)
    Junos,
    /// Any other netmiko device supporting `configure session`
    GenericNetmiko,
}

impl Vendor {
    /// Derive the vendor from device metadata
    ///
    /// A specific netmiko device type always wins over the generic netmiko
    /// backend. Anything that is neither a netmiko nor a Junos proxy is
    /// rejected.
    pub fn from_metadata(metadata: &DeviceMetadata) -> Result<Self> {
        match metadata.proxytype.as_str() {
            PROXY_JUNOS => Ok(Vendor::Junos),
            PROXY_NETMIKO => Ok(match metadata.device_type.as_deref() {
                Some(DEVICE_ARISTA_EOS) => Vendor::Arista,
                Some(DEVICE_CISCO_NXOS) => Vendor::CiscoNxos,
                _ => Vendor::GenericNetmiko,
            }),
            other => Err(Error::unsupported_vendor(format!(
                "no session backend for proxy type '{}'",
                other
            ))),
        }
    }

    /// Stable lowercase name (for logging)
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Arista => "arista",
            Vendor::CiscoNxos => "cisco_nxos",
            Vendor::Junos => "junos",
            Vendor::GenericNetmiko => "generic_netmiko",
        }
    }

    /// Whether the vendor uses named configuration sessions
    pub fn has_named_sessions(&self) -> bool {
        !matches!(self, Vendor::Junos)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device metadata supplied by the caller's environment
///
/// The core never probes a device to learn what it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    /// Proxy type (`netmiko`, `junos`)
    pub proxytype: String,

    /// Netmiko device type (`arista_eos`, `cisco_nxos`, ...)
    #[serde(default)]
    pub device_type: Option<String>,
}

impl DeviceMetadata {
    /// Create metadata for a netmiko-driven device
    pub fn netmiko(device_type: impl Into<String>) -> Self {
        Self {
            proxytype: PROXY_NETMIKO.to_string(),
            device_type: Some(device_type.into()),
        }
    }

    /// Create metadata for a Junos device
    pub fn junos() -> Self {
        Self {
            proxytype: PROXY_JUNOS.to_string(),
            device_type: None,
        }
    }

    /// Resolve the vendor family
    pub fn vendor(&self) -> Result<Vendor> {
        Vendor::from_metadata(self)
    }
}

/// Stage of a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStage {
    Load,
    Diff,
    Commit,
    Abort,
}

impl fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcileStage::Load => "load",
            ReconcileStage::Diff => "diff",
            ReconcileStage::Commit => "commit",
            ReconcileStage::Abort => "abort",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of a successful reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// No difference; the session was aborted
    Converged,
    /// Difference found in dry-run mode; the session was aborted
    DryRunReported,
    /// Difference found and committed
    Applied,
}

/// Uniform result of one reconciliation pass
///
/// `result` is tri-state: `Some(true)` for applied or already converged,
/// `None` for a dry-run report. Failures are returned as errors, never as
/// `Some(false)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub name: String,
    pub result: Option<bool>,
    pub changes: BTreeMap<String, String>,
    pub comment: String,
    pub outcome: Outcome,
}

/// Running configuration as returned by the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunningConfig {
    /// Line-oriented CLI output
    Text(String),
    /// Structured RPC reply
    Structured(serde_json::Value),
}

impl RunningConfig {
    /// Render as text, pretty-printing structured configuration as JSON
    pub fn to_text(&self) -> Result<String> {
        match self {
            RunningConfig::Text(text) => Ok(text.clone()),
            RunningConfig::Structured(value) => Ok(serde_json::to_string_pretty(value)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_from_metadata() {
        assert_eq!(
            DeviceMetadata::netmiko("arista_eos").vendor().unwrap(),
            Vendor::Arista
        );
        assert_eq!(
            DeviceMetadata::netmiko("cisco_nxos").vendor().unwrap(),
            Vendor::CiscoNxos
        );
        assert_eq!(
            DeviceMetadata::netmiko("cisco_ios").vendor().unwrap(),
            Vendor::GenericNetmiko
        );
        assert_eq!(DeviceMetadata::junos().vendor().unwrap(), Vendor::Junos);
    }

    #[test]
    fn test_junos_ignores_device_type() {
        let metadata = DeviceMetadata {
            proxytype: "junos".to_string(),
            device_type: Some("arista_eos".to_string()),
        };
        assert_eq!(metadata.vendor().unwrap(), Vendor::Junos);
    }

    #[test]
    fn test_unknown_proxy_rejected() {
        let metadata = DeviceMetadata {
            proxytype: "napalm".to_string(),
            device_type: None,
        };
        assert!(matches!(
            metadata.vendor(),
            Err(Error::UnsupportedVendor(_))
        ));
    }

    #[test]
    fn test_result_serialization_keeps_null_result() {
        let result = ReconcileResult {
            name: "core1".to_string(),
            result: None,
            changes: BTreeMap::from([("diff".to_string(), "ip y".to_string())]),
            comment: "Changes would be applied but we are in test mode.".to_string(),
            outcome: Outcome::DryRunReported,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["result"].is_null());
        assert_eq!(json["changes"]["diff"], "ip y");
        assert_eq!(json["outcome"], "dry_run_reported");
    }

    #[test]
    fn test_structured_running_config_to_text() {
        let config = RunningConfig::Structured(serde_json::json!({"system": {"host-name": "r1"}}));
        let text = config.to_text().unwrap();
        assert!(text.contains("\"host-name\": \"r1\""));
    }
}
