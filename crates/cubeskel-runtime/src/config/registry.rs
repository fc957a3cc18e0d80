use super::logger::{LogLevel, LoggerConfig};
use cubeskel_common::device::DeviceType;

/// Configuration of the device registry.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RegistryConfig {
    /// Logger configuration for device discovery.
    #[serde(default)]
    pub logger: LoggerConfig<RegistryLogLevel>,

    /// Device type selected when no explicit selection is given. `None` accepts any type.
    #[serde(default)]
    pub device_type: Option<DeviceType>,

    /// Number of devices selected when no explicit selection is given. `None` takes every
    /// matching device.
    #[serde(default)]
    pub device_count: Option<usize>,
}

/// Log levels for the device registry.
#[derive(Default, Clone, Copy, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub enum RegistryLogLevel {
    /// Registry logging is disabled.
    #[serde(rename = "disabled")]
    Disabled,

    /// Only the number of selected devices is logged.
    #[default]
    #[serde(rename = "basic")]
    Basic,

    /// Every enumerated device and the selection decision is logged.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for RegistryLogLevel {}
