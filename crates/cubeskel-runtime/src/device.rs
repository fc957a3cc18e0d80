use crate::{
    config::{Logger, transfer::TransferLogLevel},
    event::{Event, ReadEvent},
    platform::DeviceDescriptor,
    server::{ComputeServer, Handle, IoError, MemoryUsage, ServerError},
};
use cubeskel_common::device::{DeviceId, DeviceType, PlatformDeviceId};
use cubeskel_common::reader::read_sync;
use std::sync::Arc;

/// Information about a device selected by a registry.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Where the backend exposes the device.
    pub location: PlatformDeviceId,
    /// The static description reported by the backend.
    pub descriptor: DeviceDescriptor,
}

/// Handle to one compute device and its queue.
///
/// Cloning a device is cheap and every clone drives the same queue. Operations are enqueued in
/// call order and return immediately with an [event](Event).
pub struct Device<S: ComputeServer> {
    id: DeviceId,
    info: Arc<DeviceInfo>,
    server: Arc<spin::Mutex<S>>,
    logger: Arc<spin::Mutex<Logger>>,
}

impl<S: ComputeServer> Clone for Device<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            info: self.info.clone(),
            server: self.server.clone(),
            logger: self.logger.clone(),
        }
    }
}

impl<S: ComputeServer> PartialEq for Device<S> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.server, &other.server)
    }
}

impl<S: ComputeServer> Eq for Device<S> {}

impl<S: ComputeServer> core::fmt::Debug for Device<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("name", &self.info.descriptor.name)
            .field("type", &self.info.descriptor.device_type)
            .field("location", &self.info.location)
            .finish()
    }
}

impl<S: ComputeServer> Device<S> {
    /// Wraps an opened server.
    pub fn new(
        id: DeviceId,
        info: DeviceInfo,
        server: S,
        logger: Arc<spin::Mutex<Logger>>,
    ) -> Self {
        Self {
            id,
            info: Arc::new(info),
            server: Arc::new(spin::Mutex::new(server)),
            logger,
        }
    }

    /// The stable id of the device in its registry.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Device information.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// The kind of hardware.
    pub fn device_type(&self) -> DeviceType {
        self.info.descriptor.device_type
    }

    /// Human readable name.
    pub fn name(&self) -> &str {
        &self.info.descriptor.name
    }

    /// The maximum number of work items in a work group.
    pub fn max_work_group_size(&self) -> usize {
        self.info.descriptor.max_work_group_size
    }

    /// Allocates a buffer of `size` bytes.
    pub fn create_buffer(&self, size: u64) -> Result<Handle, IoError> {
        let handle = self.server.lock().create(size)?;
        self.log_transfer(TransferLogLevel::Basic, || {
            format!("[{}] allocated {size} bytes ({:?})", self.id, handle.id)
        });
        Ok(handle)
    }

    /// Releases a buffer previously allocated on this device.
    pub fn release_buffer(&self, handle: &Handle) {
        self.server.lock().release(handle);
        self.log_transfer(TransferLogLevel::Basic, || {
            format!("[{}] released {} bytes ({:?})", self.id, handle.size(), handle.id)
        });
    }

    /// Enqueues a write of `data` at byte `offset` of the buffer.
    pub fn enqueue_write(
        &self,
        handle: &Handle,
        offset: u64,
        data: Vec<u8>,
    ) -> Result<Event, IoError> {
        let size = data.len() as u64;
        handle.check_range(offset, size)?;
        self.log_transfer(TransferLogLevel::Full, || {
            format!(
                "[{}] write {size} bytes at offset {offset} ({:?})",
                self.id, handle.id
            )
        });

        let fut = self.server.lock().write(handle, offset, data);
        Ok(Event::new(self.id, fut))
    }

    /// Enqueues a read of `size` bytes at byte `offset` of the buffer.
    pub fn enqueue_read(
        &self,
        handle: &Handle,
        offset: u64,
        size: u64,
    ) -> Result<ReadEvent, IoError> {
        handle.check_range(offset, size)?;
        self.log_transfer(TransferLogLevel::Full, || {
            format!(
                "[{}] read {size} bytes at offset {offset} ({:?})",
                self.id, handle.id
            )
        });

        let fut = self.server.lock().read(handle, offset, size);
        Ok(ReadEvent::new(self.id, fut))
    }

    /// Blocks until every operation enqueued on this device has completed.
    pub fn wait(&self) -> Result<(), ServerError> {
        let fut = self.server.lock().sync();
        read_sync(fut)
    }

    /// The current memory usage of the device.
    pub fn memory_usage(&self) -> MemoryUsage {
        self.server.lock().memory_usage()
    }

    fn log_transfer<F: FnOnce() -> String>(&self, level: TransferLogLevel, msg: F) {
        let mut logger = self.logger.lock();
        let enabled = match (logger.log_level_transfer(), level) {
            (TransferLogLevel::Disabled, _) => false,
            (TransferLogLevel::Basic, TransferLogLevel::Full) => false,
            _ => true,
        };

        if enabled {
            logger.log_transfer(&msg());
        }
    }
}
