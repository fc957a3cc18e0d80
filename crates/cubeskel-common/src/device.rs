use core::cmp::Ordering;
use core::str::FromStr;

/// The device id.
///
/// The index is the position of the device inside the registry it was selected by, so it is
/// stable for the whole `init` → `clear` lifetime of that registry.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, new, derive_more::Display)]
#[display("Device({index_id})")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceId {
    /// The index id identifies the device number.
    pub index_id: u32,
}

impl DeviceId {
    /// The id as an index usable on ordered device lists.
    pub fn index(&self) -> usize {
        self.index_id as usize
    }
}

impl Ord for DeviceId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index_id.cmp(&other.index_id)
    }
}

impl PartialOrd for DeviceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The location of a device as reported by the backend: the platform it belongs to and its
/// position inside that platform.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, new, derive_more::Display)]
#[display("Platform({platform}):Device({device})")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlatformDeviceId {
    /// Index of the platform in backend enumeration order.
    pub platform: usize,
    /// Index of the device inside its platform.
    pub device: usize,
}

/// The kind of hardware backing a device.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, Default, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceType {
    /// A CPU exposed as a compute device.
    #[display("cpu")]
    #[cfg_attr(feature = "serde", serde(rename = "cpu"))]
    Cpu,
    /// A discrete or integrated GPU.
    #[default]
    #[display("gpu")]
    #[cfg_attr(feature = "serde", serde(rename = "gpu"))]
    Gpu,
    /// A dedicated accelerator that is neither a CPU nor a GPU.
    #[display("accelerator")]
    #[cfg_attr(feature = "serde", serde(rename = "accelerator"))]
    Accelerator,
    /// Anything the backend couldn't classify.
    #[display("other")]
    #[cfg_attr(feature = "serde", serde(rename = "other"))]
    Other,
}

/// Error returned when a device type can't be parsed from a string.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("unknown device type `{_0}`, expected one of: cpu, gpu, accelerator, other")]
pub struct ParseDeviceTypeError(pub String);

impl core::error::Error for ParseDeviceTypeError {}

impl FromStr for DeviceType {
    type Err = ParseDeviceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            "accelerator" | "acc" => Ok(Self::Accelerator),
            "other" => Ok(Self::Other),
            _ => Err(ParseDeviceTypeError(s.to_string())),
        }
    }
}
