//! Running-configuration report
//!
//! Collects the active configuration of several devices into one text
//! document. Devices are queried one after another; a device that fails is
//! reported inline and does not stop the report.

use tracing::{info, warn};

use crate::error::Result;
use crate::traits::ConfigSessionBackend;
use crate::types::RunningConfig;

/// First line of every report
pub const REPORT_HEADER: &str = "The devices running configuration is as follows:";

/// Last line of every report
pub const REPORT_FOOTER: &str = "End of the report.";

/// Running configuration of one device, or why it could not be fetched
#[derive(Debug)]
pub struct DeviceConfig {
    pub name: String,
    pub config: Result<RunningConfig>,
}

/// Fetch the running configuration of every device
pub async fn collect_running_configs<'a, I>(devices: I) -> Vec<DeviceConfig>
where
    I: IntoIterator<Item = (&'a str, &'a dyn ConfigSessionBackend)>,
{
    let mut configs = Vec::new();
    for (name, backend) in devices {
        let config = backend.running_config().await;
        if let Err(e) = &config {
            warn!("Could not fetch running configuration of {}: {}", name, e);
        }
        configs.push(DeviceConfig {
            name: name.to_string(),
            config,
        });
    }
    configs
}

/// Render collected configurations as a text report
pub fn render_report(configs: &[DeviceConfig]) -> String {
    let mut report = format!("{}\n\n", REPORT_HEADER);
    for device in configs {
        let body = match &device.config {
            Ok(config) => config
                .to_text()
                .unwrap_or_else(|e| format!("failed to render running configuration: {}", e)),
            Err(e) => format!("failed to fetch running configuration: {}", e),
        };
        report.push_str(&format!("{}: \n\n{}\n\n", device.name, body));
    }
    report.push_str(REPORT_FOOTER);
    report.push('\n');
    report
}

/// Fetch and render the running configuration of every device
pub async fn running_config_report<'a, I>(devices: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a dyn ConfigSessionBackend)>,
{
    let configs = collect_running_configs(devices).await;
    let failed = configs.iter().filter(|d| d.config.is_err()).count();
    info!(
        "Running configuration report covers {} device(s), {} failed",
        configs.len(),
        failed
    );
    render_report(&configs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn test_render_report() {
        let configs = vec![
            DeviceConfig {
                name: "leaf1".to_string(),
                config: Ok(RunningConfig::Text("hostname leaf1".to_string())),
            },
            DeviceConfig {
                name: "core1".to_string(),
                config: Ok(RunningConfig::Structured(json!({"system": {"host-name": "core1"}}))),
            },
            DeviceConfig {
                name: "spine1".to_string(),
                config: Err(Error::execution("netmiko.send_command", "timed out")),
            },
        ];

        let report = render_report(&configs);

        assert!(report.starts_with("The devices running configuration is as follows:\n\nleaf1: \n\nhostname leaf1\n\n"));
        assert!(report.contains("core1: \n\n{\n  \"system\": {\n    \"host-name\": \"core1\"\n  }\n}\n\n"));
        assert!(report.contains("spine1: \n\nfailed to fetch running configuration: "));
        assert!(report.contains("timed out"));
        assert!(report.ends_with("End of the report.\n"));
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(
            render_report(&[]),
            "The devices running configuration is as follows:\n\nEnd of the report.\n"
        );
    }
}
