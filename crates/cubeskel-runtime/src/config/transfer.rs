use super::logger::{LogLevel, LoggerConfig};

/// Configuration of host/device transfers.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TransferConfig {
    /// Logger configuration for transfers.
    #[serde(default)]
    pub logger: LoggerConfig<TransferLogLevel>,
}

/// Log levels for transfers.
#[derive(Default, Clone, Copy, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub enum TransferLogLevel {
    /// Transfer logging is disabled.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// Allocations and releases of device buffers are logged.
    #[serde(rename = "basic")]
    Basic,

    /// Every enqueued read and write is logged with its device, offset and size.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for TransferLogLevel {}
