use core::sync::atomic::{AtomicU64, Ordering};
use cubeskel_common::future::DynFut;
use thiserror::Error;

/// Error that can happen asynchronously while a backend executes enqueued work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// A generic runtime error.
    #[error("An error happened during execution\nCaused by:\n  {reason}")]
    Generic {
        /// The details of the generic error.
        reason: String,
    },

    /// The device can't accept any more work.
    #[error("The device is in an invalid state\nCaused by:\n  {reason}")]
    DeviceUnhealthy {
        /// The details of the failure.
        reason: String,
    },

    /// An IO error reported by the device queue.
    #[error("An io error happened during execution\nCaused by:\n  {0}")]
    Io(#[from] IoError),
}

/// Error returned from `create`/`read`/`write` functions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// Buffer size exceeds the max available.
    #[error("can't allocate buffer of size: {size}")]
    BufferTooBig {
        /// The size of the buffer in bytes.
        size: u64,
    },

    /// Handle wasn't found on the server.
    #[error("couldn't find resource for handle {handle}")]
    InvalidHandle {
        /// The raw value of the handle id.
        handle: u64,
    },

    /// The requested range doesn't fit in the buffer.
    #[error(
        "access of {size} bytes at offset {offset} is out of bounds for a buffer of {buffer_size} bytes"
    )]
    OutOfBounds {
        /// Offset of the access in bytes.
        offset: u64,
        /// Size of the access in bytes.
        size: u64,
        /// Size of the buffer in bytes.
        buffer_size: u64,
    },
}

/// Unique id of a buffer allocated on a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId {
    value: u64,
}

static HANDLE_COUNT: AtomicU64 = AtomicU64::new(0);

impl HandleId {
    /// Create a new, process-unique id.
    pub fn new() -> Self {
        let value = HANDLE_COUNT.fetch_add(1, Ordering::Relaxed);
        if value == u64::MAX {
            panic!("Handle ID overflowed");
        }
        Self { value }
    }

    /// The raw value of the id.
    pub fn value(&self) -> u64 {
        self.value
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Server handle pointing to a buffer in device memory.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    /// Buffer id.
    pub id: HandleId,
    /// Length of the buffer in bytes.
    size: u64,
}

impl Handle {
    /// Length of the buffer in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Checks that `[offset, offset + size)` lies inside the buffer.
    pub fn check_range(&self, offset: u64, size: u64) -> Result<(), IoError> {
        match offset.checked_add(size) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(IoError::OutOfBounds {
                offset,
                size,
                buffer_size: self.size,
            }),
        }
    }
}

/// Memory usage of a server.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    /// The number of live allocations.
    pub number_allocs: u64,
    /// The number of bytes currently allocated.
    pub bytes_in_use: u64,
}

impl core::fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} allocation(s), {} byte(s) in use",
            self.number_allocs, self.bytes_in_use
        )
    }
}

/// The compute server owns one device queue and the memory allocated on that device.
///
/// Every operation is enqueued in order and returns a future resolving once the device has
/// completed it. Everything in the server is mutable, therefore it should be solely accessed
/// through a [`Device`](crate::device::Device) for thread safety.
pub trait ComputeServer: Send + core::fmt::Debug + 'static
where
    Self: Sized,
{
    /// Allocates a buffer of `size` bytes.
    fn create(&mut self, size: u64) -> Result<Handle, IoError>;

    /// Releases the memory behind the handle. Pending operations on it still complete.
    fn release(&mut self, handle: &Handle);

    /// Enqueues a write of `data` at byte `offset` of the buffer.
    fn write(&mut self, handle: &Handle, offset: u64, data: Vec<u8>)
    -> DynFut<Result<(), ServerError>>;

    /// Enqueues a read of `size` bytes at byte `offset` of the buffer.
    fn read(&mut self, handle: &Handle, offset: u64, size: u64)
    -> DynFut<Result<Vec<u8>, ServerError>>;

    /// Wait for the completion of every task in the queue.
    fn sync(&mut self) -> DynFut<Result<(), ServerError>>;

    /// The current memory usage of the server.
    fn memory_usage(&self) -> MemoryUsage;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn handle_ids_are_unique() {
        let first = HandleId::new();
        let second = HandleId::new();

        assert_ne!(first, second);
    }

    #[test_log::test]
    fn check_range_accepts_the_full_buffer() {
        let handle = Handle::new(HandleId::new(), 16);

        assert_eq!(handle.check_range(0, 16), Ok(()));
        assert_eq!(handle.check_range(16, 0), Ok(()));
    }

    #[test_log::test]
    fn check_range_rejects_overflow() {
        let handle = Handle::new(HandleId::new(), 16);

        assert_eq!(
            handle.check_range(8, 9),
            Err(IoError::OutOfBounds {
                offset: 8,
                size: 9,
                buffer_size: 16
            })
        );
        assert!(handle.check_range(u64::MAX, 2).is_err());
    }
}
