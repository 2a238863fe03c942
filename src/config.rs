use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    pub controller: ControllerConfig,
    pub timing: TimingConfig,
    /// Lamp heads shown on the panel. Snapshot entries for other ids are ignored.
    pub lamps: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_ms: u64,
    pub edit_grace_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        PanelConfig {
            controller: ControllerConfig::default(),
            timing: TimingConfig::default(),
            lamps: vec![1, 2, 3, 4],
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            base_url: "http://192.168.4.1".to_string(), // ESP32 soft-AP gateway
            request_timeout_ms: 2_000,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            poll_interval_ms: 1_000,
            edit_grace_ms: crate::lock::DEFAULT_GRACE_MS,
        }
    }
}

impl PanelConfig {
    /// Read a JSON config file. Keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }
}
