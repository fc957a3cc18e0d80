use crate::server::{ComputeServer, Handle, HandleId, IoError, MemoryUsage, ServerError};
use cubeskel_common::future::{DynFut, ready};
use hashbrown::HashMap;

/// Server keeping every buffer in host memory.
///
/// Operations are executed in enqueue order at the moment they are enqueued, so the returned
/// futures are always ready. Reads therefore observe every write enqueued before them, which is
/// the ordering an in-order device queue guarantees.
#[derive(Debug, Default)]
pub struct HostServer {
    buffers: HashMap<HandleId, Vec<u8>>,
}

impl HostServer {
    /// Create a server with no allocation.
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self, handle: &Handle) -> Result<&Vec<u8>, IoError> {
        self.buffers
            .get(&handle.id)
            .ok_or(IoError::InvalidHandle {
                handle: handle.id.value(),
            })
    }

    fn buffer_mut(&mut self, handle: &Handle) -> Result<&mut Vec<u8>, IoError> {
        self.buffers
            .get_mut(&handle.id)
            .ok_or(IoError::InvalidHandle {
                handle: handle.id.value(),
            })
    }
}

impl ComputeServer for HostServer {
    fn create(&mut self, size: u64) -> Result<Handle, IoError> {
        let len = usize::try_from(size).map_err(|_| IoError::BufferTooBig { size })?;
        let handle = Handle::new(HandleId::new(), size);
        self.buffers.insert(handle.id, vec![0; len]);
        Ok(handle)
    }

    fn release(&mut self, handle: &Handle) {
        self.buffers.remove(&handle.id);
    }

    fn write(
        &mut self,
        handle: &Handle,
        offset: u64,
        data: Vec<u8>,
    ) -> DynFut<Result<(), ServerError>> {
        let result = self.buffer_mut(handle).and_then(|buffer| {
            let start = offset as usize;
            let end = start + data.len();
            match buffer.get_mut(start..end) {
                Some(region) => {
                    region.copy_from_slice(&data);
                    Ok(())
                }
                None => Err(IoError::OutOfBounds {
                    offset,
                    size: data.len() as u64,
                    buffer_size: buffer.len() as u64,
                }),
            }
        });

        ready(result.map_err(ServerError::from))
    }

    fn read(
        &mut self,
        handle: &Handle,
        offset: u64,
        size: u64,
    ) -> DynFut<Result<Vec<u8>, ServerError>> {
        let result = self.buffer(handle).and_then(|buffer| {
            let start = offset as usize;
            let end = start + size as usize;
            buffer
                .get(start..end)
                .map(|region| region.to_vec())
                .ok_or(IoError::OutOfBounds {
                    offset,
                    size,
                    buffer_size: buffer.len() as u64,
                })
        });

        ready(result.map_err(ServerError::from))
    }

    fn sync(&mut self) -> DynFut<Result<(), ServerError>> {
        // Every operation already completed when it was enqueued.
        ready(Ok(()))
    }

    fn memory_usage(&self) -> MemoryUsage {
        MemoryUsage {
            number_allocs: self.buffers.len() as u64,
            bytes_in_use: self.buffers.values().map(|b| b.len() as u64).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubeskel_common::reader::read_sync;

    #[test_log::test]
    fn created_buffer_is_zeroed() {
        let mut server = HostServer::new();
        let handle = server.create(4).unwrap();

        let data = read_sync(server.read(&handle, 0, 4)).unwrap();

        assert_eq!(data, vec![0, 0, 0, 0]);
    }

    #[test_log::test]
    fn read_observes_previous_write() {
        let mut server = HostServer::new();
        let handle = server.create(6).unwrap();

        read_sync(server.write(&handle, 2, vec![7, 8, 9])).unwrap();
        let data = read_sync(server.read(&handle, 1, 4)).unwrap();

        assert_eq!(data, vec![0, 7, 8, 9]);
    }

    #[test_log::test]
    fn released_buffer_is_invalid() {
        let mut server = HostServer::new();
        let handle = server.create(8).unwrap();
        assert_eq!(server.memory_usage().number_allocs, 1);
        assert_eq!(server.memory_usage().bytes_in_use, 8);

        server.release(&handle);

        assert_eq!(server.memory_usage(), MemoryUsage::default());
        assert_eq!(
            read_sync(server.read(&handle, 0, 1)),
            Err(ServerError::Io(IoError::InvalidHandle {
                handle: handle.id.value()
            }))
        );
    }

    #[test_log::test]
    fn out_of_bounds_write_fails() {
        let mut server = HostServer::new();
        let handle = server.create(2).unwrap();

        let result = read_sync(server.write(&handle, 1, vec![1, 2]));

        assert!(matches!(
            result,
            Err(ServerError::Io(IoError::OutOfBounds { .. }))
        ));
    }
}
