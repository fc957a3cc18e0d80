use super::HostServer;
use crate::{
    platform::{DeviceDescriptor, Platform, PlatformDescriptor},
    server::ServerError,
};
use cubeskel_common::device::{DeviceType, PlatformDeviceId};

/// Default work group size reported by host devices.
pub const HOST_MAX_WORK_GROUP_SIZE: usize = 1024;

/// A platform whose devices live in host memory.
///
/// Useful to run the distributed containers without any accelerator, and to declare arbitrary
/// device topologies in tests.
#[derive(Debug, Clone, Default)]
pub struct HostPlatform {
    platforms: Vec<PlatformDescriptor>,
    failure: Option<String>,
}

impl HostPlatform {
    /// One platform exposing `num_devices` GPU-typed host devices.
    pub fn new(num_devices: usize) -> Self {
        Self::empty().with_platform(num_devices, DeviceType::Gpu)
    }

    /// A backend exposing no platform at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A backend whose enumeration always fails with the given reason.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            platforms: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    /// Add a platform with `num_devices` devices of the given type.
    pub fn with_platform(mut self, num_devices: usize, device_type: DeviceType) -> Self {
        let platform = self.platforms.len();
        let devices = (0..num_devices)
            .map(|device| {
                DeviceDescriptor::new(
                    format!("host-{device_type}-{platform}.{device}"),
                    device_type,
                    HOST_MAX_WORK_GROUP_SIZE,
                )
            })
            .collect();

        self.platforms
            .push(PlatformDescriptor::new(format!("host-{platform}"), devices));
        self
    }

    /// Add a platform with explicitly described devices.
    pub fn with_descriptor(mut self, descriptor: PlatformDescriptor) -> Self {
        self.platforms.push(descriptor);
        self
    }
}

impl Platform for HostPlatform {
    type Server = HostServer;

    fn name(&self) -> &'static str {
        "host"
    }

    fn platforms(&self) -> Result<Vec<PlatformDescriptor>, ServerError> {
        match &self.failure {
            Some(reason) => Err(ServerError::Generic {
                reason: reason.clone(),
            }),
            None => Ok(self.platforms.clone()),
        }
    }

    fn open(&self, location: PlatformDeviceId) -> Result<Self::Server, ServerError> {
        let exists = self
            .platforms
            .get(location.platform)
            .is_some_and(|platform| location.device < platform.devices.len());

        if !exists {
            return Err(ServerError::DeviceUnhealthy {
                reason: format!("no host device at {location}"),
            });
        }

        Ok(HostServer::new())
    }
}
