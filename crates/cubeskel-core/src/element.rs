/// Element type that can be stored in a distributed container.
///
/// Elements are moved to and from device memory as raw bytes, so they must be plain old data.
pub trait Element: bytemuck::Pod + Send + Sync + core::fmt::Debug + PartialEq {}

impl<T> Element for T where T: bytemuck::Pod + Send + Sync + core::fmt::Debug + PartialEq {}
