use core::future::Future;

/// Read a future synchronously.
///
/// Backend operations return futures; containers that need the data on the host right away
/// (element reads, distribution changes) go through this function.
pub fn read_sync<F: Future<Output = T>, T>(f: F) -> T {
    super::future::block_on(f)
}
