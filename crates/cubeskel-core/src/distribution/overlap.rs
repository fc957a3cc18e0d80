use super::{BlockDistribution, Layout, Significances, buffer_for};
use crate::{
    ContainerError, DistributionError, Element, buffer::DeviceBuffers, transfer::DownloadBatch,
};
use core::ops::Range;
use cubeskel_runtime::{DeviceId, device::Device, event::Events, server::ComputeServer};

/// What fills the halo cells that fall outside of the container.
#[derive(Debug, Clone, PartialEq)]
pub enum Padding<T> {
    /// A constant value.
    Neutral(T),
    /// The first element (or row) at the front, the last at the back.
    Nearest,
    /// Like [`Nearest`](Padding::Nearest), but the values are captured at the first upload and
    /// reused by every later upload.
    NearestInitial,
}

/// Block distribution where each device also holds `radius` rows of its neighbours on both sides.
///
/// A device buffer is laid out as `[front halo | slice | back halo]`, each halo being
/// `radius` rows. Halo cells that fall before the first or after the last row of the container
/// are filled according to the [padding](Padding). Downloads only read the slices.
pub struct OverlapDistribution<T: Element, S: ComputeServer> {
    block: BlockDistribution<S>,
    radius: usize,
    padding: Padding<T>,
    initial: Option<Halos<T>>,
}

#[derive(Debug, Clone, PartialEq)]
struct Halos<T> {
    front: Vec<T>,
    back: Vec<T>,
}

/// How one device buffer maps onto the host data, all counts in elements.
#[derive(Debug, PartialEq, Eq)]
struct Window {
    front_padding: usize,
    data: Range<usize>,
    back_padding: usize,
}

impl<T: Element, S: ComputeServer> OverlapDistribution<T, S> {
    /// Overlapping split over `devices` following `significances`.
    pub fn new(
        devices: Vec<Device<S>>,
        significances: Significances,
        radius: usize,
        padding: Padding<T>,
    ) -> Result<Self, DistributionError> {
        Ok(Self {
            block: BlockDistribution::new(devices, significances)?,
            radius,
            padding,
            initial: None,
        })
    }

    /// Even overlapping split over `devices`.
    pub fn uniform(
        devices: Vec<Device<S>>,
        radius: usize,
        padding: Padding<T>,
    ) -> Result<Self, DistributionError> {
        let significances = Significances::new(devices.len());
        Self::new(devices, significances, radius, padding)
    }

    /// The devices in distribution order.
    pub fn devices(&self) -> &[Device<S>] {
        self.block.devices()
    }

    /// The weight of each device.
    pub fn significances(&self) -> &Significances {
        self.block.significances()
    }

    /// Number of halo rows on each side of a slice.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// The padding mode.
    pub fn padding(&self) -> &Padding<T> {
        &self.padding
    }

    /// The element range of the host data owned by each device, halos excluded.
    pub fn ranges(&self, layout: &Layout) -> Vec<Range<usize>> {
        self.block.ranges(layout)
    }

    pub(crate) fn same_partitioning(&self, other: &Self) -> bool {
        self.block == other.block && self.radius == other.radius && self.padding == other.padding
    }

    /// Carries over the values captured by a `NearestInitial` padding.
    pub(crate) fn inherit_halos(&mut self, previous: &mut Self) {
        if self.initial.is_none() {
            self.initial = previous.initial.take();
        }
    }

    fn halo(&self, layout: &Layout) -> usize {
        self.radius * layout.row_len
    }

    pub(crate) fn size_for_device(&self, layout: &Layout, device: DeviceId) -> usize {
        match self.block.range_for_device(layout, device) {
            Some(range) => range.len() + 2 * self.halo(layout),
            None => 0,
        }
    }

    pub(crate) fn start_upload(
        &mut self,
        host: &[T],
        layout: &Layout,
        buffers: &DeviceBuffers<T, S>,
        events: &mut Events,
    ) -> Result<(), ContainerError> {
        let halo = self.halo(layout);
        let halos = self.halos(host, layout);
        let windows: Vec<Window> = self
            .ranges(layout)
            .into_iter()
            .map(|range| Window::new(range, halo, layout.len))
            .collect();
        let targets = self
            .devices()
            .iter()
            .map(|device| buffer_for(buffers, device.id()))
            .collect::<Result<Vec<_>, _>>()?;

        for (buffer, window) in targets.iter().zip(windows.iter()) {
            if window.front_padding > 0 {
                let values = &halos.front[halo - window.front_padding..];
                events.push(buffer.write(0, values)?);
            }
        }

        for (buffer, window) in targets.iter().zip(windows.iter()) {
            if !window.data.is_empty() {
                let values = &host[window.data.clone()];
                events.push(buffer.write(window.front_padding, values)?);
            }
        }

        for (buffer, window) in targets.iter().zip(windows.iter()) {
            if window.back_padding > 0 {
                let values = &halos.back[..window.back_padding];
                let offset = buffer.len() - window.back_padding;
                events.push(buffer.write(offset, values)?);
            }
        }

        Ok(())
    }

    pub(crate) fn start_download(
        &self,
        layout: &Layout,
        buffers: &DeviceBuffers<T, S>,
        batch: &mut DownloadBatch<T>,
    ) -> Result<(), ContainerError> {
        let halo = self.halo(layout);

        for (device, range) in self.devices().iter().zip(self.ranges(layout)) {
            if range.is_empty() {
                continue;
            }

            let buffer = buffer_for(buffers, device.id())?;
            batch.push(buffer.read(halo, range.len())?, range.start);
        }

        Ok(())
    }

    fn halos(&mut self, host: &[T], layout: &Layout) -> Halos<T> {
        let halo = self.halo(layout);

        match &self.padding {
            Padding::Neutral(value) => Halos {
                front: vec![*value; halo],
                back: vec![*value; halo],
            },
            Padding::Nearest => Halos::nearest(host, layout, self.radius),
            Padding::NearestInitial => match &self.initial {
                Some(initial) if initial.front.len() == halo => initial.clone(),
                _ => {
                    let captured = Halos::nearest(host, layout, self.radius);
                    self.initial = Some(captured.clone());
                    captured
                }
            },
        }
    }
}

impl<T: Element> Halos<T> {
    fn nearest(host: &[T], layout: &Layout, radius: usize) -> Self {
        let row_len = layout.row_len;
        let zeros = vec![T::zeroed(); row_len];
        let first = host.get(..row_len).unwrap_or(zeros.as_slice());
        let last = host
            .len()
            .checked_sub(row_len)
            .and_then(|start| host.get(start..))
            .unwrap_or(zeros.as_slice());

        Self {
            front: first.repeat(radius),
            back: last.repeat(radius),
        }
    }
}

impl Window {
    /// Maps the buffer of a device owning `range` onto host data of `len` elements.
    ///
    /// The buffer covers `range` widened by `halo` on both sides; the parts before `0` and past
    /// `len` are padding.
    fn new(range: Range<usize>, halo: usize, len: usize) -> Self {
        let lo = range.start as isize - halo as isize;
        let hi = (range.end + halo) as isize;
        let total = (hi - lo) as usize;
        let len = len as isize;

        let front_padding = (-lo).clamp(0, hi - lo) as usize;
        let back_padding = (hi - lo.max(len)).clamp(0, hi - lo) as usize;
        let data_start = lo.max(0) as usize;
        let data_len = total - front_padding - back_padding;

        Self {
            front_padding,
            data: data_start..data_start + data_len,
            back_padding,
        }
    }
}

impl<T: Element, S: ComputeServer> Clone for OverlapDistribution<T, S> {
    fn clone(&self) -> Self {
        Self {
            block: self.block.clone(),
            radius: self.radius,
            padding: self.padding.clone(),
            initial: self.initial.clone(),
        }
    }
}

impl<T: Element, S: ComputeServer> PartialEq for OverlapDistribution<T, S> {
    fn eq(&self, other: &Self) -> bool {
        self.same_partitioning(other)
    }
}

impl<T: Element, S: ComputeServer> core::fmt::Debug for OverlapDistribution<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OverlapDistribution")
            .field("block", &self.block)
            .field("radius", &self.radius)
            .field("padding", &self.padding)
            .finish()
    }
}
