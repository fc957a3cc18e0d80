#![allow(dead_code)]

use cubeskel_core::{
    Element,
    buffer::DeviceBuffer,
    container::{DistributedData, Matrix, Vector},
};
use cubeskel_runtime::{
    config::{GlobalConfig, Logger},
    event::Events,
    host::{HostPlatform, HostServer},
    registry::{DeviceRegistry, DeviceSelection},
};
use std::sync::Arc;

pub type HostVector<T> = Vector<T, HostServer>;
pub type HostMatrix<T> = Matrix<T, HostServer>;

/// A registry of `num_devices` host devices.
pub fn registry(num_devices: usize) -> DeviceRegistry<HostPlatform> {
    let logger = Logger::from_config(Arc::new(GlobalConfig::default()));
    let mut registry = DeviceRegistry::with_logger(HostPlatform::new(num_devices), logger);
    registry.init(&DeviceSelection::all()).unwrap();
    registry
}

/// Everything stored in `buffer`, halos included.
pub fn buffer_contents<T: Element>(buffer: &DeviceBuffer<T, HostServer>) -> Vec<T> {
    let bytes = buffer.read(0, buffer.len()).unwrap().wait().unwrap();
    bytemuck::pod_collect_to_vec(&bytes)
}

/// Stands in for a kernel applying `f` to every element of every device buffer.
pub fn map_on_devices<T: Element>(data: &mut DistributedData<T, HostServer>, f: impl Fn(T) -> T) {
    let mut events = Events::new();
    for buffer in data.device_buffers() {
        let mapped = buffer_contents(buffer)
            .into_iter()
            .map(&f)
            .collect::<Vec<_>>();
        events.push(buffer.write(0, &mapped).unwrap());
    }
    events.wait_all().unwrap();
    data.data_on_device_modified();
}
