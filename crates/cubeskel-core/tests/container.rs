mod common;

use common::{HostMatrix, HostVector, buffer_contents, map_on_devices, registry};
use cubeskel_core::{
    ContainerError, DistributionError,
    container::Coherence,
    distribution::{Distribution, Padding},
};
use cubeskel_runtime::{
    DeviceId,
    device::Device,
    host::{HostPlatform, HostServer},
    registry::DeviceRegistry,
    server::MemoryUsage,
};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng, rngs::StdRng};

fn distributions(devices: &[Device<HostServer>]) -> Vec<Distribution<u32, HostServer>> {
    vec![
        Distribution::single(&devices[1]),
        Distribution::block(devices).unwrap(),
        Distribution::copy(devices).unwrap(),
        Distribution::overlap(devices, 1, Padding::Nearest).unwrap(),
        Distribution::overlap(devices, 3, Padding::Neutral(0)).unwrap(),
    ]
}

#[test_log::test]
fn round_trip_through_devices() {
    let registry = registry(3);
    let mut rng = StdRng::seed_from_u64(42);

    for len in [0, 1, 2, 7, 64, 1000] {
        let values: Vec<u32> = (0..len).map(|_| rng.random()).collect();

        for distribution in distributions(registry.devices()) {
            let kind = distribution.kind();
            let mut vector = HostVector::from_vec(values.clone());
            vector.set_distribution(distribution).unwrap();
            vector.prepare_input(&registry).unwrap();
            map_on_devices(&mut vector, |x| x.wrapping_add(1));

            let expected = values.iter().map(|x| x.wrapping_add(1)).collect::<Vec<_>>();
            assert_eq!(vector.into_vec().unwrap(), expected, "{kind} with {len} element(s)");
        }
    }
}

#[test_log::test]
fn unmodified_download_is_identity() {
    let registry = registry(2);
    let mut rng = StdRng::seed_from_u64(7);
    let values: Vec<u32> = (0..33).map(|_| rng.random()).collect();

    for distribution in distributions(registry.devices()) {
        let mut vector = HostVector::from_vec(values.clone());
        vector.set_distribution(distribution).unwrap();
        vector.copy_data_to_devices().unwrap();
        vector.data_on_device_modified();

        assert_eq!(vector.into_vec().unwrap(), values);
    }
}

#[test_log::test]
fn coherence_follows_the_last_writer() {
    let registry = registry(2);
    let mut vector = HostVector::from_vec(vec![1.5f32; 8]);
    assert_eq!(vector.coherence(), Coherence::HostAhead);

    vector.prepare_input(&registry).unwrap();
    assert_eq!(vector.coherence(), Coherence::Clean);

    map_on_devices(&mut vector, |x| x * 2.0);
    assert_eq!(vector.coherence(), Coherence::DeviceAhead);

    assert_eq!(vector.get(0).unwrap(), 3.0);
    assert_eq!(vector.coherence(), Coherence::Clean);

    vector.set(0, 0.0).unwrap();
    assert_eq!(vector.coherence(), Coherence::HostAhead);

    vector.copy_data_to_devices().unwrap();
    assert_eq!(vector.coherence(), Coherence::Clean);
    let buffer = vector.device_buffer(DeviceId::new(0)).unwrap();
    assert_eq!(buffer_contents(buffer), vec![0.0, 3.0, 3.0, 3.0]);
}

#[test_log::test]
fn clean_container_skips_transfers() {
    let registry = registry(1);
    let mut vector = HostVector::from_vec(vec![1u32, 2, 3]);
    vector.prepare_input(&registry).unwrap();

    let buffer = vector.device_buffer(DeviceId::new(0)).unwrap();
    buffer.write(0, &[9u32, 9, 9]).unwrap().wait().unwrap();

    assert_eq!(vector.as_slice().unwrap(), &[1, 2, 3]);
    assert!(vector.start_copy_data_to_devices().unwrap().is_empty());
}

#[test_log::test]
fn prepare_input_defaults_to_block_over_registry() {
    let registry = registry(3);
    let mut vector = HostVector::from_vec((0..6).collect::<Vec<u32>>());

    vector.prepare_input(&registry).unwrap();

    assert_eq!(vector.distribution().map(|d| d.kind()), Some("block"));
    let contents = vector
        .device_buffers()
        .map(buffer_contents)
        .collect::<Vec<_>>();
    assert_eq!(contents, vec![vec![0, 1], vec![2, 3], vec![4, 5]]);
}

#[test_log::test]
fn prepare_output_allocates_without_uploading() {
    let registry = registry(2);
    let mut vector = HostVector::filled(4, 5u32);

    vector.prepare_output(&registry).unwrap();

    assert_eq!(vector.device_buffers().count(), 2);
    for buffer in vector.device_buffers() {
        assert_eq!(buffer_contents(buffer), vec![0, 0]);
    }

    for buffer in vector.device_buffers() {
        buffer.write(0, &[8u32, 8]).unwrap().wait().unwrap();
    }
    vector.data_on_device_modified();
    assert_eq!(vector.into_vec().unwrap(), vec![8, 8, 8, 8]);
}

#[test_log::test]
fn prepare_input_needs_devices() {
    let registry = DeviceRegistry::new(HostPlatform::new(2));
    let mut vector = HostVector::from_vec(vec![1u32]);

    let err = vector.prepare_input(&registry).unwrap_err();

    assert_eq!(err, ContainerError::Distribution(DistributionError::NoDevices));
}

#[test_log::test]
fn out_of_range_access() {
    let mut vector = HostVector::from_vec(vec![1u8, 2, 3]);

    assert_eq!(
        vector.get(3).unwrap_err(),
        ContainerError::IndexOutOfRange { index: 3, len: 3 }
    );
    assert_eq!(
        vector.set(10, 0).unwrap_err(),
        ContainerError::IndexOutOfRange { index: 10, len: 3 }
    );
    assert_eq!(vector.front().unwrap(), 1);
    assert_eq!(vector.back().unwrap(), 3);

    let mut empty = HostVector::<u8>::new();
    assert!(empty.front().is_err());
    assert!(empty.back().is_err());
}

#[test_log::test]
fn resize_drops_device_buffers() {
    let registry = registry(2);
    let device = &registry.devices()[0];
    let mut vector = HostVector::from_vec(vec![1u32, 2, 3, 4]);
    vector.prepare_input(&registry).unwrap();
    map_on_devices(&mut vector, |x| x * 10);
    assert_eq!(device.memory_usage().number_allocs, 1);

    vector.resize(6, 7).unwrap();

    assert_eq!(vector.len(), 6);
    assert_eq!(vector.device_buffers().count(), 0);
    assert_eq!(vector.coherence(), Coherence::HostAhead);
    assert_eq!(device.memory_usage(), MemoryUsage::default());
    assert_eq!(vector.as_slice().unwrap(), &[10, 20, 30, 40, 7, 7]);

    vector.prepare_input(&registry).unwrap();
    let buffer = vector.device_buffer(device.id()).unwrap();
    assert_eq!(buffer_contents(buffer), vec![10, 20, 30]);
}

#[test_log::test]
fn push_grows_the_vector() {
    let mut vector = HostVector::from_vec(vec![1i16]);

    vector.push(2).unwrap();
    vector.push(3).unwrap();

    assert_eq!(vector.len(), 3);
    assert_eq!(vector.into_vec().unwrap(), vec![1, 2, 3]);
}

#[test_log::test]
fn dropping_a_container_releases_device_memory() {
    let registry = registry(2);

    {
        let mut vector = HostVector::from_vec(vec![0u64; 100]);
        vector.prepare_input(&registry).unwrap();
        for device in registry.devices() {
            assert_eq!(device.memory_usage().bytes_in_use, 50 * 8);
            let buffer = vector.device_buffer(device.id()).unwrap();
            assert_eq!(buffer.size_in_bytes(), 50 * 8);
        }
    }

    for device in registry.devices() {
        assert_eq!(device.memory_usage(), MemoryUsage::default());
    }
}

#[test_log::test]
fn matrix_rejects_wrong_shape() {
    let err = HostMatrix::from_vec(2, 3, vec![0u32; 5]).unwrap_err();

    assert_eq!(
        err,
        ContainerError::ShapeMismatch {
            rows: 2,
            cols: 3,
            expected: 6,
            actual: 5
        }
    );
}

#[test_log::test]
fn matrix_is_split_by_rows() {
    let registry = registry(2);
    let mut matrix = HostMatrix::from_vec(5, 2, (0..10).collect::<Vec<u32>>()).unwrap();

    matrix.prepare_input(&registry).unwrap();

    let contents = matrix
        .device_buffers()
        .map(buffer_contents)
        .collect::<Vec<_>>();
    assert_eq!(contents, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7, 8, 9]]);
}

#[test_log::test]
fn matrix_element_access() {
    let mut matrix = HostMatrix::filled(2, 3, 0i32);

    matrix.set(1, 2, 5).unwrap();

    assert_eq!(matrix.shape(), (2, 3));
    assert_eq!(matrix.get(1, 2).unwrap(), 5);
    assert_eq!(matrix.row(1).unwrap(), &[0, 0, 5]);
    assert!(matrix.get(2, 0).is_err());
    assert!(matrix.get(0, 3).is_err());
    assert!(matrix.row(2).is_err());
}

#[test_log::test]
fn matrix_resize_keeps_top_left_block() {
    let registry = registry(2);
    let mut matrix = HostMatrix::from_vec(2, 3, vec![1u32, 2, 3, 4, 5, 6]).unwrap();
    matrix.prepare_input(&registry).unwrap();
    map_on_devices(&mut matrix, |x| x + 10);

    matrix.resize(3, 2, 0).unwrap();

    assert_eq!(matrix.shape(), (3, 2));
    assert_eq!(matrix.device_buffers().count(), 0);
    assert_eq!(matrix.into_vec().unwrap(), vec![11, 12, 14, 15, 0, 0]);
}

#[test_log::test]
fn half_precision_elements() {
    let registry = registry(2);
    let values = (0..5).map(|x| half::f16::from_f32(x as f32)).collect::<Vec<_>>();
    let mut vector = HostVector::from_vec(values);

    vector.prepare_input(&registry).unwrap();
    map_on_devices(&mut vector, |x| x + half::f16::ONE);

    let expected = (1..6).map(|x| half::f16::from_f32(x as f32)).collect::<Vec<_>>();
    assert_eq!(vector.into_vec().unwrap(), expected);
}
