use super::{Layout, buffer_for};
use crate::{ContainerError, Element, buffer::DeviceBuffers, transfer::DownloadBatch};
use cubeskel_runtime::{DeviceId, device::Device, event::Events, server::ComputeServer};

/// The whole container lives on one device.
#[derive(Debug)]
pub struct SingleDistribution<S: ComputeServer> {
    device: Device<S>,
}

impl<S: ComputeServer> SingleDistribution<S> {
    /// Distribution over `device`.
    pub fn new(device: Device<S>) -> Self {
        Self { device }
    }

    /// The device holding the data.
    pub fn device(&self) -> &Device<S> {
        &self.device
    }

    pub(crate) fn devices(&self) -> &[Device<S>] {
        core::slice::from_ref(&self.device)
    }

    pub(crate) fn size_for_device(&self, layout: &Layout, device: DeviceId) -> usize {
        match device == self.device.id() {
            true => layout.len,
            false => 0,
        }
    }

    pub(crate) fn start_upload<T: Element>(
        &self,
        host: &[T],
        buffers: &DeviceBuffers<T, S>,
        events: &mut Events,
    ) -> Result<(), ContainerError> {
        if host.is_empty() {
            return Ok(());
        }

        let buffer = buffer_for(buffers, self.device.id())?;
        events.push(buffer.write(0, host)?);

        Ok(())
    }

    pub(crate) fn start_download<T: Element>(
        &self,
        layout: &Layout,
        buffers: &DeviceBuffers<T, S>,
        batch: &mut DownloadBatch<T>,
    ) -> Result<(), ContainerError> {
        if layout.len == 0 {
            return Ok(());
        }

        let buffer = buffer_for(buffers, self.device.id())?;
        batch.push(buffer.read(0, layout.len)?, 0);

        Ok(())
    }
}

impl<S: ComputeServer> Clone for SingleDistribution<S> {
    fn clone(&self) -> Self {
        Self {
            device: self.device.clone(),
        }
    }
}

impl<S: ComputeServer> PartialEq for SingleDistribution<S> {
    fn eq(&self, other: &Self) -> bool {
        self.device == other.device
    }
}
