use crate::server::{ComputeServer, ServerError};
use cubeskel_common::device::{DeviceType, PlatformDeviceId};

/// Static description of a device, as reported by the backend during enumeration.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Human readable name of the device.
    pub name: String,
    /// The kind of hardware.
    pub device_type: DeviceType,
    /// The maximum number of work items in a work group.
    pub max_work_group_size: usize,
}

/// A platform groups the devices driven by the same backend driver.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct PlatformDescriptor {
    /// Human readable name of the platform.
    pub name: String,
    /// Devices exposed by the platform, in backend order.
    pub devices: Vec<DeviceDescriptor>,
}

/// Entry point of a compute backend: enumerates the available devices and opens a
/// [server](ComputeServer) for a selected one.
pub trait Platform: Send + Sync + core::fmt::Debug + 'static {
    /// The server driving a single device queue.
    type Server: ComputeServer;

    /// The backend name.
    fn name(&self) -> &'static str;

    /// Enumerates every platform and its devices.
    fn platforms(&self) -> Result<Vec<PlatformDescriptor>, ServerError>;

    /// Opens the device at the given location, creating its context and queue.
    fn open(&self, location: PlatformDeviceId) -> Result<Self::Server, ServerError>;
}
