use super::{Layout, Significances, buffer_for, validate_devices};
use crate::{
    ContainerError, DistributionError, Element, buffer::DeviceBuffers, transfer::DownloadBatch,
};
use core::ops::Range;
use cubeskel_runtime::{DeviceId, device::Device, event::Events, server::ComputeServer};

/// Each device holds one contiguous slice of the container, sized by its significance.
///
/// Matrices are split by whole rows.
#[derive(Debug)]
pub struct BlockDistribution<S: ComputeServer> {
    devices: Vec<Device<S>>,
    significances: Significances,
}

impl<S: ComputeServer> BlockDistribution<S> {
    /// Splits over `devices` following `significances`, one weight per device.
    pub fn new(
        devices: Vec<Device<S>>,
        significances: Significances,
    ) -> Result<Self, DistributionError> {
        validate_devices(&devices)?;

        if significances.len() != devices.len() {
            return Err(DistributionError::SignificanceCount {
                expected: devices.len(),
                actual: significances.len(),
            });
        }

        Ok(Self {
            devices,
            significances,
        })
    }

    /// Splits evenly over `devices`.
    pub fn uniform(devices: Vec<Device<S>>) -> Result<Self, DistributionError> {
        let significances = Significances::new(devices.len());
        Self::new(devices, significances)
    }

    /// The devices in distribution order.
    pub fn devices(&self) -> &[Device<S>] {
        &self.devices
    }

    /// The weight of each device.
    pub fn significances(&self) -> &Significances {
        &self.significances
    }

    /// The element range of the host data assigned to each device, in device order.
    pub fn ranges(&self, layout: &Layout) -> Vec<Range<usize>> {
        self.significances
            .partition(layout.units())
            .into_iter()
            .map(|units| layout.elements(units))
            .collect()
    }

    /// The element range of the host data assigned to `device`.
    pub fn range_for_device(&self, layout: &Layout, device: DeviceId) -> Option<Range<usize>> {
        let position = self.devices.iter().position(|d| d.id() == device)?;
        self.ranges(layout).into_iter().nth(position)
    }

    pub(crate) fn size_for_device(&self, layout: &Layout, device: DeviceId) -> usize {
        self.range_for_device(layout, device)
            .map(|range| range.len())
            .unwrap_or(0)
    }

    pub(crate) fn start_upload<T: Element>(
        &self,
        host: &[T],
        layout: &Layout,
        buffers: &DeviceBuffers<T, S>,
        events: &mut Events,
    ) -> Result<(), ContainerError> {
        for (device, range) in self.devices.iter().zip(self.ranges(layout)) {
            if range.is_empty() {
                continue;
            }

            let buffer = buffer_for(buffers, device.id())?;
            events.push(buffer.write(0, &host[range])?);
        }

        Ok(())
    }

    pub(crate) fn start_download<T: Element>(
        &self,
        layout: &Layout,
        buffers: &DeviceBuffers<T, S>,
        batch: &mut DownloadBatch<T>,
    ) -> Result<(), ContainerError> {
        for (device, range) in self.devices.iter().zip(self.ranges(layout)) {
            if range.is_empty() {
                continue;
            }

            let buffer = buffer_for(buffers, device.id())?;
            batch.push(buffer.read(0, range.len())?, range.start);
        }

        Ok(())
    }
}

impl<S: ComputeServer> Clone for BlockDistribution<S> {
    fn clone(&self) -> Self {
        Self {
            devices: self.devices.clone(),
            significances: self.significances.clone(),
        }
    }
}

impl<S: ComputeServer> PartialEq for BlockDistribution<S> {
    fn eq(&self, other: &Self) -> bool {
        self.devices == other.devices && self.significances == other.significances
    }
}
