use super::{Layout, buffer_for, validate_devices};
use crate::{
    ContainerError, DistributionError, Element, buffer::DeviceBuffers, transfer::DownloadBatch,
};
use cubeskel_runtime::{DeviceId, device::Device, event::Events, server::ComputeServer};
use std::sync::Arc;

/// Binary function folding the copies of a replicated container back into one value.
pub type CombineFn<T> = Arc<dyn Fn(T, T) -> T + Send + Sync>;

/// Every device holds a full copy of the container.
///
/// Without combine function the copy of the first device is authoritative when downloading.
/// With one, every copy is downloaded and folded element-wise in device order.
pub struct CopyDistribution<T: Element, S: ComputeServer> {
    devices: Vec<Device<S>>,
    combine: Option<CombineFn<T>>,
}

impl<T: Element, S: ComputeServer> CopyDistribution<T, S> {
    /// Replicates over `devices`.
    pub fn new(devices: Vec<Device<S>>) -> Result<Self, DistributionError> {
        validate_devices(&devices)?;

        Ok(Self {
            devices,
            combine: None,
        })
    }

    /// Replicates over `devices`, merging the copies with `combine` on download.
    pub fn with_combine<F>(devices: Vec<Device<S>>, combine: F) -> Result<Self, DistributionError>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        validate_devices(&devices)?;

        Ok(Self {
            devices,
            combine: Some(Arc::new(combine)),
        })
    }

    /// The devices in distribution order.
    pub fn devices(&self) -> &[Device<S>] {
        &self.devices
    }

    /// The combine function, if any.
    pub fn combine(&self) -> Option<&CombineFn<T>> {
        self.combine.as_ref()
    }

    pub(crate) fn same_combine(&self, other: &Self) -> bool {
        match (&self.combine, &other.combine) {
            (None, None) => true,
            (Some(lhs), Some(rhs)) => Arc::ptr_eq(lhs, rhs),
            _ => false,
        }
    }

    pub(crate) fn size_for_device(&self, layout: &Layout, device: DeviceId) -> usize {
        match self.devices.iter().any(|d| d.id() == device) {
            true => layout.len,
            false => 0,
        }
    }

    pub(crate) fn start_upload(
        &self,
        host: &[T],
        buffers: &DeviceBuffers<T, S>,
        events: &mut Events,
    ) -> Result<(), ContainerError> {
        if host.is_empty() {
            return Ok(());
        }

        for device in self.devices.iter() {
            let buffer = buffer_for(buffers, device.id())?;
            events.push(buffer.write(0, host)?);
        }

        Ok(())
    }

    pub(crate) fn start_download(
        &self,
        layout: &Layout,
        buffers: &DeviceBuffers<T, S>,
        batch: &mut DownloadBatch<T>,
    ) -> Result<(), ContainerError> {
        if layout.len == 0 {
            return Ok(());
        }

        let mut devices = self.devices.iter();
        let Some(first) = devices.next() else {
            return Ok(());
        };
        let buffer = buffer_for(buffers, first.id())?;
        batch.push(buffer.read(0, layout.len)?, 0);

        if let Some(combine) = &self.combine {
            for device in devices {
                let buffer = buffer_for(buffers, device.id())?;
                batch.push_combined(buffer.read(0, layout.len)?, 0, combine.clone());
            }
        }

        Ok(())
    }
}

impl<T: Element, S: ComputeServer> Clone for CopyDistribution<T, S> {
    fn clone(&self) -> Self {
        Self {
            devices: self.devices.clone(),
            combine: self.combine.clone(),
        }
    }
}

impl<T: Element, S: ComputeServer> PartialEq for CopyDistribution<T, S> {
    fn eq(&self, other: &Self) -> bool {
        self.devices == other.devices && self.same_combine(other)
    }
}

impl<T: Element, S: ComputeServer> core::fmt::Debug for CopyDistribution<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CopyDistribution")
            .field("devices", &self.devices)
            .field("combine", &self.combine.is_some())
            .finish()
    }
}
