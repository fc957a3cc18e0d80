use super::{
    BlockDistribution, CopyDistribution, Layout, OverlapDistribution, Padding, SingleDistribution,
    Significances,
};
use crate::{
    ContainerError, DistributionError, Element,
    buffer::{DeviceBuffer, DeviceBuffers},
    transfer::DownloadBatch,
};
use cubeskel_runtime::{
    DeviceId,
    device::Device,
    event::Events,
    platform::Platform,
    registry::DeviceRegistry,
    server::ComputeServer,
};

/// How the elements of a container are spread over devices.
///
/// A distribution owns the list of devices it uses, in distribution order. The container owns
/// the data and the device buffers; the distribution decides the size of each buffer and which
/// transfers keep it in sync with the host.
#[derive(Debug)]
pub enum Distribution<T: Element, S: ComputeServer> {
    /// The whole container on one device.
    Single(SingleDistribution<S>),
    /// One contiguous slice per device.
    Block(BlockDistribution<S>),
    /// A full copy per device.
    Copy(CopyDistribution<T, S>),
    /// One slice per device widened by halo rows.
    Overlap(OverlapDistribution<T, S>),
}

impl<T: Element, S: ComputeServer> Distribution<T, S> {
    /// Everything on `device`.
    pub fn single(device: &Device<S>) -> Self {
        Self::Single(SingleDistribution::new(device.clone()))
    }

    /// Even split over `devices`.
    pub fn block(devices: &[Device<S>]) -> Result<Self, DistributionError> {
        BlockDistribution::uniform(devices.to_vec()).map(Self::Block)
    }

    /// Split over `devices` following `significances`.
    pub fn block_weighted(
        devices: &[Device<S>],
        significances: Significances,
    ) -> Result<Self, DistributionError> {
        BlockDistribution::new(devices.to_vec(), significances).map(Self::Block)
    }

    /// Even split over every device of `registry`.
    pub fn block_all<P: Platform<Server = S>>(
        registry: &DeviceRegistry<P>,
    ) -> Result<Self, DistributionError> {
        Self::block(registry.devices())
    }

    /// A full copy on each of `devices`, the first copy being authoritative.
    pub fn copy(devices: &[Device<S>]) -> Result<Self, DistributionError> {
        CopyDistribution::new(devices.to_vec()).map(Self::Copy)
    }

    /// A full copy on each of `devices`, folded with `combine` on download.
    pub fn copy_with_combine<F>(
        devices: &[Device<S>],
        combine: F,
    ) -> Result<Self, DistributionError>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        CopyDistribution::with_combine(devices.to_vec(), combine).map(Self::Copy)
    }

    /// Even split over `devices` with `radius` halo rows on each side.
    pub fn overlap(
        devices: &[Device<S>],
        radius: usize,
        padding: Padding<T>,
    ) -> Result<Self, DistributionError> {
        OverlapDistribution::uniform(devices.to_vec(), radius, padding).map(Self::Overlap)
    }

    /// Split over `devices` following `significances`, with `radius` halo rows on each side.
    pub fn overlap_weighted(
        devices: &[Device<S>],
        significances: Significances,
        radius: usize,
        padding: Padding<T>,
    ) -> Result<Self, DistributionError> {
        OverlapDistribution::new(devices.to_vec(), significances, radius, padding)
            .map(Self::Overlap)
    }

    /// The devices used, in distribution order.
    pub fn devices(&self) -> &[Device<S>] {
        match self {
            Self::Single(dist) => dist.devices(),
            Self::Block(dist) => dist.devices(),
            Self::Copy(dist) => dist.devices(),
            Self::Overlap(dist) => dist.devices(),
        }
    }

    /// Whether the distribution can be used.
    ///
    /// Distributions are validated when built, so this only guards against empty device sets.
    pub fn is_valid(&self) -> bool {
        !self.devices().is_empty()
    }

    /// Whether `device` takes part in the distribution.
    pub fn contains(&self, device: DeviceId) -> bool {
        self.devices().iter().any(|d| d.id() == device)
    }

    /// Number of elements of the buffer allocated on `device` for data of shape `layout`.
    ///
    /// Zero for devices outside of the distribution.
    pub fn size_for_device(&self, layout: &Layout, device: DeviceId) -> usize {
        match self {
            Self::Single(dist) => dist.size_for_device(layout, device),
            Self::Block(dist) => dist.size_for_device(layout, device),
            Self::Copy(dist) => dist.size_for_device(layout, device),
            Self::Overlap(dist) => dist.size_for_device(layout, device),
        }
    }

    /// Whether moving a container from this distribution to `new` needs its data to move.
    ///
    /// Only the same kind of distribution over the same devices with the same parameters keeps
    /// the device buffers valid.
    pub fn data_exchange_on_distribution_change(&self, new: &Self) -> bool {
        match (self, new) {
            (Self::Single(old), Self::Single(new)) => old != new,
            (Self::Block(old), Self::Block(new)) => old != new,
            (Self::Copy(old), Self::Copy(new)) => old.devices() != new.devices(),
            (Self::Overlap(old), Self::Overlap(new)) => !old.same_partitioning(new),
            _ => true,
        }
    }

    /// Enqueues the writes bringing every device buffer up to date with `host`.
    ///
    /// The events are pushed in issue order; the queue of each device keeps them ordered with
    /// later work.
    pub fn start_upload(
        &mut self,
        host: &[T],
        layout: &Layout,
        buffers: &DeviceBuffers<T, S>,
        events: &mut Events,
    ) -> Result<(), ContainerError> {
        match self {
            Self::Single(dist) => dist.start_upload(host, buffers, events),
            Self::Block(dist) => dist.start_upload(host, layout, buffers, events),
            Self::Copy(dist) => dist.start_upload(host, buffers, events),
            Self::Overlap(dist) => dist.start_upload(host, layout, buffers, events),
        }
    }

    /// Enqueues the reads bringing the host up to date with the device buffers.
    pub fn start_download(
        &self,
        layout: &Layout,
        buffers: &DeviceBuffers<T, S>,
        batch: &mut DownloadBatch<T>,
    ) -> Result<(), ContainerError> {
        match self {
            Self::Single(dist) => dist.start_download(layout, buffers, batch),
            Self::Block(dist) => dist.start_download(layout, buffers, batch),
            Self::Copy(dist) => dist.start_download(layout, buffers, batch),
            Self::Overlap(dist) => dist.start_download(layout, buffers, batch),
        }
    }

    /// Takes over state that must survive a change to an equivalent distribution.
    pub(crate) fn inherit(&mut self, previous: &mut Self) {
        if let (Self::Overlap(new), Self::Overlap(old)) = (self, previous) {
            new.inherit_halos(old);
        }
    }

    /// Short name of the kind of distribution.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Single(_) => "single",
            Self::Block(_) => "block",
            Self::Copy(_) => "copy",
            Self::Overlap(_) => "overlap",
        }
    }
}

impl<T: Element, S: ComputeServer> Clone for Distribution<T, S> {
    fn clone(&self) -> Self {
        match self {
            Self::Single(dist) => Self::Single(dist.clone()),
            Self::Block(dist) => Self::Block(dist.clone()),
            Self::Copy(dist) => Self::Copy(dist.clone()),
            Self::Overlap(dist) => Self::Overlap(dist.clone()),
        }
    }
}

impl<T: Element, S: ComputeServer> PartialEq for Distribution<T, S> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Single(lhs), Self::Single(rhs)) => lhs == rhs,
            (Self::Block(lhs), Self::Block(rhs)) => lhs == rhs,
            (Self::Copy(lhs), Self::Copy(rhs)) => lhs == rhs,
            (Self::Overlap(lhs), Self::Overlap(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

pub(crate) fn validate_devices<S: ComputeServer>(
    devices: &[Device<S>],
) -> Result<(), DistributionError> {
    if devices.is_empty() {
        return Err(DistributionError::NoDevices);
    }

    for (index, device) in devices.iter().enumerate() {
        if devices[..index].iter().any(|d| d.id() == device.id()) {
            return Err(DistributionError::DuplicateDevice {
                device: device.id(),
            });
        }
    }

    Ok(())
}

pub(crate) fn buffer_for<T: Element, S: ComputeServer>(
    buffers: &DeviceBuffers<T, S>,
    device: DeviceId,
) -> Result<&DeviceBuffer<T, S>, DistributionError> {
    buffers
        .get(&device)
        .ok_or(DistributionError::MissingBuffer { device })
}
