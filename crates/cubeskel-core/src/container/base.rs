use crate::{
    ContainerError, DistributionError, Element,
    buffer::{DeviceBuffer, DeviceBuffers},
    distribution::{Distribution, Layout},
    transfer::DownloadBatch,
};
use cubeskel_runtime::{
    DeviceId, event::Events, platform::Platform, registry::DeviceRegistry, server::ComputeServer,
};

/// Which side holds the authoritative copy of a container's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coherence {
    /// Host and devices agree.
    Clean,
    /// The host was modified, devices must be uploaded to before use.
    HostAhead,
    /// A kernel wrote the device buffers, the host must download before use.
    DeviceAhead,
}

/// Host data, distribution and device buffers shared by every distributed container.
///
/// Transfers only happen in the direction the [coherence](Coherence) requires:
/// [`copy_data_to_devices`](Self::copy_data_to_devices) is a no-op unless the host is ahead and
/// [`copy_data_to_host`](Self::copy_data_to_host) is a no-op unless the devices are ahead.
pub struct DistributedData<T: Element, S: ComputeServer> {
    host: Vec<T>,
    layout: Layout,
    distribution: Option<Distribution<T, S>>,
    buffers: DeviceBuffers<T, S>,
    coherence: Coherence,
}

impl<T: Element, S: ComputeServer> DistributedData<T, S> {
    pub(crate) fn new(host: Vec<T>, layout: Layout) -> Self {
        Self {
            host,
            layout,
            distribution: None,
            buffers: DeviceBuffers::new(),
            coherence: Coherence::HostAhead,
        }
    }

    /// The number of elements.
    pub fn size(&self) -> usize {
        self.layout.len
    }

    /// The shape the distribution splits.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Which side is up to date.
    pub fn coherence(&self) -> Coherence {
        self.coherence
    }

    /// The current distribution, if any.
    pub fn distribution(&self) -> Option<&Distribution<T, S>> {
        self.distribution.as_ref()
    }

    /// Assigns a distribution.
    ///
    /// When the data has to move, the host is first brought up to date under the previous
    /// distribution and the device buffers are dropped. If the container had buffers, new ones are
    /// created and uploaded under `distribution`.
    pub fn set_distribution(
        &mut self,
        mut distribution: Distribution<T, S>,
    ) -> Result<(), ContainerError> {
        if !distribution.is_valid() {
            return Err(DistributionError::NoDevices.into());
        }

        let Some(mut previous) = self.distribution.take() else {
            log::debug!("Assigning {} distribution", distribution.kind());
            self.distribution = Some(distribution);
            return Ok(());
        };

        if !previous.data_exchange_on_distribution_change(&distribution) {
            distribution.inherit(&mut previous);
            self.distribution = Some(distribution);
            return Ok(());
        }

        log::debug!(
            "Changing distribution from {} to {}",
            previous.kind(),
            distribution.kind()
        );

        self.distribution = Some(previous);
        self.copy_data_to_host()?;

        let had_buffers = !self.buffers.is_empty();
        self.release_device_buffers();
        self.distribution = Some(distribution);

        if had_buffers {
            self.create_device_buffers()?;
            self.copy_data_to_devices()?;
        }

        Ok(())
    }

    /// Allocates a buffer on every device of the distribution that doesn't have one yet.
    pub fn create_device_buffers(&mut self) -> Result<(), ContainerError> {
        let distribution = self
            .distribution
            .as_ref()
            .ok_or(ContainerError::NoDistribution)?;

        for device in distribution.devices() {
            if self.buffers.contains_key(&device.id()) {
                continue;
            }

            let len = distribution.size_for_device(&self.layout, device.id());
            let buffer = DeviceBuffer::new(device, len)?;
            self.buffers.insert(device.id(), buffer);
        }

        Ok(())
    }

    /// Enqueues the upload of the host data if the devices are behind.
    ///
    /// The container is considered clean as soon as the writes are enqueued; work enqueued later
    /// on the same devices observes them.
    pub fn start_copy_data_to_devices(&mut self) -> Result<Events, ContainerError> {
        let mut events = Events::new();

        if self.coherence != Coherence::HostAhead {
            return Ok(events);
        }

        self.create_device_buffers()?;
        let distribution = self
            .distribution
            .as_mut()
            .ok_or(ContainerError::NoDistribution)?;
        distribution.start_upload(&self.host, &self.layout, &self.buffers, &mut events)?;
        self.coherence = Coherence::Clean;

        Ok(events)
    }

    /// Uploads the host data if the devices are behind, blocking until done.
    pub fn copy_data_to_devices(&mut self) -> Result<(), ContainerError> {
        let events = self.start_copy_data_to_devices()?;
        events.wait_all()?;

        Ok(())
    }

    /// Downloads the device data if the host is behind, blocking until done.
    pub fn copy_data_to_host(&mut self) -> Result<(), ContainerError> {
        if self.coherence != Coherence::DeviceAhead {
            return Ok(());
        }

        let distribution = self
            .distribution
            .as_ref()
            .ok_or(ContainerError::NoDistribution)?;

        let mut batch = DownloadBatch::new();
        distribution.start_download(&self.layout, &self.buffers, &mut batch)?;
        batch.wait_into(&mut self.host)?;
        self.coherence = Coherence::Clean;

        Ok(())
    }

    /// Marks the device buffers as the authoritative copy.
    pub fn data_on_device_modified(&mut self) {
        self.coherence = Coherence::DeviceAhead;
    }

    /// Marks the host data as the authoritative copy.
    pub fn data_on_host_modified(&mut self) {
        self.coherence = Coherence::HostAhead;
    }

    /// Gets the container ready to be read by a kernel on the devices of `registry`.
    ///
    /// Without a distribution, the data is split evenly over every device of the registry.
    pub fn prepare_input<P: Platform<Server = S>>(
        &mut self,
        registry: &DeviceRegistry<P>,
    ) -> Result<(), ContainerError> {
        self.ensure_distribution(registry)?;
        self.create_device_buffers()?;
        self.copy_data_to_devices()
    }

    /// Gets the container ready to be written by a kernel on the devices of `registry`.
    ///
    /// Nothing is uploaded; the caller marks the data as modified on the devices once the kernel
    /// is enqueued.
    pub fn prepare_output<P: Platform<Server = S>>(
        &mut self,
        registry: &DeviceRegistry<P>,
    ) -> Result<(), ContainerError> {
        self.ensure_distribution(registry)?;
        self.create_device_buffers()
    }

    /// The buffer allocated on `device`, if any.
    pub fn device_buffer(&self, device: DeviceId) -> Option<&DeviceBuffer<T, S>> {
        self.buffers.get(&device)
    }

    /// The buffers in distribution order.
    pub fn device_buffers(&self) -> impl Iterator<Item = &DeviceBuffer<T, S>> + '_ {
        self.distribution
            .iter()
            .flat_map(|distribution| distribution.devices())
            .filter_map(|device| self.buffers.get(&device.id()))
    }

    /// The host data, downloaded first if the devices are ahead.
    pub fn host_data(&mut self) -> Result<&[T], ContainerError> {
        self.copy_data_to_host()?;
        Ok(&self.host)
    }

    /// Mutable host data, downloaded first if the devices are ahead.
    ///
    /// The devices are considered behind afterwards.
    pub fn host_data_mut(&mut self) -> Result<&mut [T], ContainerError> {
        self.copy_data_to_host()?;
        self.coherence = Coherence::HostAhead;
        Ok(&mut self.host)
    }

    pub(crate) fn get(&mut self, index: usize) -> Result<T, ContainerError> {
        let len = self.host.len();
        self.host_data()?
            .get(index)
            .copied()
            .ok_or(ContainerError::IndexOutOfRange { index, len })
    }

    pub(crate) fn set(&mut self, index: usize, value: T) -> Result<(), ContainerError> {
        let len = self.host.len();
        if index >= len {
            return Err(ContainerError::IndexOutOfRange { index, len });
        }

        self.host_data_mut()?[index] = value;

        Ok(())
    }

    /// Replaces the host data with `update(host)` under a new layout.
    ///
    /// The device buffers no longer match and are dropped.
    pub(crate) fn reshape<F>(&mut self, layout: Layout, update: F) -> Result<(), ContainerError>
    where
        F: FnOnce(&mut Vec<T>),
    {
        self.copy_data_to_host()?;
        update(&mut self.host);
        debug_assert_eq!(self.host.len(), layout.len);

        self.layout = layout;
        self.release_device_buffers();

        Ok(())
    }

    pub(crate) fn into_host(mut self) -> Result<Vec<T>, ContainerError> {
        self.copy_data_to_host()?;
        Ok(core::mem::take(&mut self.host))
    }

    fn ensure_distribution<P: Platform<Server = S>>(
        &mut self,
        registry: &DeviceRegistry<P>,
    ) -> Result<(), ContainerError> {
        if self.distribution.is_none() {
            let distribution = Distribution::block_all(registry)?;
            self.set_distribution(distribution)?;
        }

        Ok(())
    }

    fn release_device_buffers(&mut self) {
        self.buffers.clear();
        self.coherence = Coherence::HostAhead;
    }
}

impl<T: Element, S: ComputeServer> core::fmt::Debug for DistributedData<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DistributedData")
            .field("layout", &self.layout)
            .field("coherence", &self.coherence)
            .field("distribution", &self.distribution)
            .field("buffers", &self.buffers.len())
            .finish()
    }
}
