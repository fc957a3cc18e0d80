use crate::{ContainerError, Element, distribution::CombineFn};
use cubeskel_runtime::{event::ReadEvent, server::ServerError};

/// Reads issued by a download, scattered into the host array once they complete.
///
/// Reads are applied in issue order. A read with a combine function folds the device values into
/// what is already on the host instead of overwriting it.
pub struct DownloadBatch<T: Element> {
    reads: Vec<PendingRead<T>>,
}

struct PendingRead<T: Element> {
    event: ReadEvent,
    host_offset: usize,
    combine: Option<CombineFn<T>>,
}

impl<T: Element> Default for DownloadBatch<T> {
    fn default() -> Self {
        Self { reads: Vec::new() }
    }
}

impl<T: Element> DownloadBatch<T> {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a read whose elements land at `host_offset`.
    pub fn push(&mut self, event: ReadEvent, host_offset: usize) {
        self.reads.push(PendingRead {
            event,
            host_offset,
            combine: None,
        });
    }

    /// Registers a read whose elements are folded into the host values at `host_offset`.
    pub fn push_combined(&mut self, event: ReadEvent, host_offset: usize, combine: CombineFn<T>) {
        self.reads.push(PendingRead {
            event,
            host_offset,
            combine: Some(combine),
        });
    }

    /// The number of reads not yet waited on.
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    /// Whether the batch holds no read.
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Waits on every read in issue order and writes the results into `host`.
    pub fn wait_into(self, host: &mut [T]) -> Result<(), ContainerError> {
        for read in self.reads {
            let device = read.event.device();
            let bytes = read.event.wait()?;
            let values: Vec<T> = bytemuck::pod_collect_to_vec(&bytes);

            let host_len = host.len();
            let end = read.host_offset + values.len();
            let target = host.get_mut(read.host_offset..end).ok_or_else(|| {
                ServerError::Generic {
                    reason: format!(
                        "{device} returned {} element(s) for host range {}..{end} of {host_len}",
                        values.len(),
                        read.host_offset,
                    ),
                }
            })?;

            match read.combine {
                Some(combine) => {
                    for (dst, value) in target.iter_mut().zip(values) {
                        *dst = combine(*dst, value);
                    }
                }
                None => target.copy_from_slice(&values),
            }
        }

        Ok(())
    }
}

impl<T: Element> core::fmt::Debug for DownloadBatch<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DownloadBatch")
            .field("reads", &self.reads.len())
            .finish()
    }
}
