use crate::Element;
use core::marker::PhantomData;
use cubeskel_runtime::{
    DeviceId,
    device::Device,
    event::{Event, ReadEvent},
    server::{ComputeServer, Handle, IoError},
};

/// Device buffers of a container, keyed by device.
pub type DeviceBuffers<T, S> = hashbrown::HashMap<DeviceId, DeviceBuffer<T, S>>;

/// A typed buffer allocated on one device.
///
/// The memory is released on the device when the buffer is dropped.
pub struct DeviceBuffer<T: Element, S: ComputeServer> {
    device: Device<S>,
    handle: Handle,
    len: usize,
    _elem: PhantomData<T>,
}

impl<T: Element, S: ComputeServer> DeviceBuffer<T, S> {
    /// Allocates room for `len` elements on `device`.
    pub fn new(device: &Device<S>, len: usize) -> Result<Self, IoError> {
        let size = (len * size_of::<T>()) as u64;
        let handle = device.create_buffer(size)?;

        Ok(Self {
            device: device.clone(),
            handle,
            len,
            _elem: PhantomData,
        })
    }

    /// The device owning the memory.
    pub fn device(&self) -> &Device<S> {
        &self.device
    }

    /// Shortcut for `self.device().id()`.
    pub fn device_id(&self) -> DeviceId {
        self.device.id()
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no element.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The size of the buffer in bytes.
    pub fn size_in_bytes(&self) -> u64 {
        self.handle.size()
    }

    /// The backend handle, used by kernels to bind the buffer.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Enqueues a write of `values` starting at element `offset`.
    pub fn write(&self, offset: usize, values: &[T]) -> Result<Event, IoError> {
        let bytes = bytemuck::cast_slice::<T, u8>(values).to_vec();
        self.device
            .enqueue_write(&self.handle, byte_offset::<T>(offset), bytes)
    }

    /// Enqueues a read of `len` elements starting at element `offset`.
    pub fn read(&self, offset: usize, len: usize) -> Result<ReadEvent, IoError> {
        self.device.enqueue_read(
            &self.handle,
            byte_offset::<T>(offset),
            byte_offset::<T>(len),
        )
    }
}

fn byte_offset<T>(elems: usize) -> u64 {
    (elems * size_of::<T>()) as u64
}

impl<T: Element, S: ComputeServer> Drop for DeviceBuffer<T, S> {
    fn drop(&mut self) {
        self.device.release_buffer(&self.handle);
    }
}

impl<T: Element, S: ComputeServer> core::fmt::Debug for DeviceBuffer<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("device", &self.device.id())
            .field("len", &self.len)
            .field("handle", &self.handle.id)
            .finish()
    }
}
