mod common;

use common::{HostVector, buffer_contents, map_on_devices, registry};
use cubeskel_core::{
    ContainerError, DistributionError,
    container::Coherence,
    distribution::{Distribution, Layout, Padding, Significances},
};
use cubeskel_runtime::{DeviceId, host::HostServer};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng, rngs::StdRng};

#[test_log::test]
fn block_splits_evenly() {
    let registry = registry(2);
    let mut vector = HostVector::from_vec((0..10).collect::<Vec<i32>>());

    vector
        .set_distribution(Distribution::block(registry.devices()).unwrap())
        .unwrap();
    vector.copy_data_to_devices().unwrap();

    let first = vector.device_buffer(DeviceId::new(0)).unwrap();
    let second = vector.device_buffer(DeviceId::new(1)).unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(second.len(), 5);
    assert_eq!(buffer_contents(first), vec![0, 1, 2, 3, 4]);
    assert_eq!(buffer_contents(second), vec![5, 6, 7, 8, 9]);
}

#[test_log::test]
fn block_gives_remainder_to_last_device() {
    let registry = registry(2);
    let distribution = Distribution::<i32, _>::block(registry.devices()).unwrap();
    let layout = Layout::vector(11);

    assert_eq!(distribution.size_for_device(&layout, DeviceId::new(0)), 5);
    assert_eq!(distribution.size_for_device(&layout, DeviceId::new(1)), 6);
}

fn block_sizes(distribution: &Distribution<f32, HostServer>, len: usize) -> Vec<usize> {
    let layout = Layout::vector(len);
    distribution
        .devices()
        .iter()
        .map(|device| distribution.size_for_device(&layout, device.id()))
        .collect()
}

fn random_weights(rng: &mut StdRng, count: usize) -> Significances {
    let raw: Vec<f64> = (0..count).map(|_| rng.random_range(0.0..1.0)).collect();
    let total: f64 = raw.iter().sum();
    let mut weights: Vec<f64> = raw[..count - 1].iter().map(|w| w / total).collect();
    let rest: f64 = weights.iter().sum();
    weights.push((1.0 - rest).max(0.0));

    Significances::from_weights(weights).unwrap()
}

#[test_log::test]
fn block_sizes_sum_to_container_size() {
    let registry = registry(64);
    let mut rng = StdRng::seed_from_u64(3);

    for count in [1, 2, 3, 5, 7, 16, 49, 64] {
        let devices = &registry.devices()[..count];
        let uniform = Distribution::block(devices).unwrap();
        let significances = random_weights(&mut rng, count);
        let weighted = Distribution::block_weighted(devices, significances).unwrap();

        for len in (0..130).chain([997, 4096]) {
            for distribution in [&uniform, &weighted] {
                let total: usize = block_sizes(distribution, len).iter().sum();
                assert_eq!(total, len, "{count} device(s), {len} element(s)");
            }
        }
    }
}

#[test_log::test]
fn uniform_block_gives_each_device_its_share() {
    let registry = registry(49);
    let distribution = Distribution::block(registry.devices()).unwrap();

    assert_eq!(block_sizes(&distribution, 49), vec![1; 49]);
    assert_eq!(block_sizes(&distribution, 98), vec![2; 49]);
}

#[test_log::test]
fn weighted_block_sizes_are_not_floored_below_integers() {
    let registry = registry(2);
    let significances = Significances::from_weights(vec![0.29, 0.71]).unwrap();
    let distribution = Distribution::block_weighted(registry.devices(), significances).unwrap();

    assert_eq!(block_sizes(&distribution, 100), vec![29, 71]);
}

#[test_log::test]
fn weighted_block() {
    let registry = registry(2);
    let significances = Significances::from_weights(vec![0.75, 0.25]).unwrap();
    let mut vector = HostVector::from_vec((0..8).collect::<Vec<u32>>());

    vector
        .set_distribution(Distribution::block_weighted(registry.devices(), significances).unwrap())
        .unwrap();
    vector.copy_data_to_devices().unwrap();

    let first = vector.device_buffer(DeviceId::new(0)).unwrap();
    let second = vector.device_buffer(DeviceId::new(1)).unwrap();
    assert_eq!(buffer_contents(first), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(buffer_contents(second), vec![6, 7]);
}

#[test_log::test]
fn block_over_more_devices_than_elements() {
    let registry = registry(4);
    let mut vector = HostVector::from_vec(vec![1.0f32, 2.0]);

    vector.prepare_input(&registry).unwrap();
    map_on_devices(&mut vector, |x| x * 10.0);

    assert_eq!(vector.into_vec().unwrap(), vec![10.0, 20.0]);
}

#[test_log::test]
fn single_holds_everything_on_one_device() {
    let registry = registry(3);
    let device = &registry.devices()[1];
    let mut vector = HostVector::from_vec(vec![3u8, 1, 4, 1, 5]);

    vector
        .set_distribution(Distribution::single(device))
        .unwrap();
    vector.create_device_buffers().unwrap();

    let distribution = vector.distribution().unwrap();
    let layout = vector.layout();
    assert_eq!(distribution.size_for_device(&layout, DeviceId::new(0)), 0);
    assert_eq!(distribution.size_for_device(&layout, DeviceId::new(1)), 5);
    assert!(vector.device_buffer(DeviceId::new(0)).is_none());
    assert!(vector.device_buffer(DeviceId::new(1)).is_some());
}

#[test_log::test]
fn copy_replicates_and_downloads_first_device() {
    let registry = registry(3);
    let mut vector = HostVector::from_vec(vec![1i64, 2, 3]);

    vector
        .set_distribution(Distribution::copy(registry.devices()).unwrap())
        .unwrap();
    vector.copy_data_to_devices().unwrap();

    for device in registry.devices() {
        let buffer = vector.device_buffer(device.id()).unwrap();
        assert_eq!(buffer_contents(buffer), vec![1, 2, 3]);
    }

    let first = vector.device_buffer(DeviceId::new(0)).unwrap();
    first.write(0, &[7i64]).unwrap().wait().unwrap();
    let last = vector.device_buffer(DeviceId::new(2)).unwrap();
    last.write(0, &[9i64]).unwrap().wait().unwrap();
    vector.data_on_device_modified();

    assert_eq!(vector.as_slice().unwrap(), &[7, 2, 3]);
}

#[test_log::test]
fn copy_with_combine_folds_in_device_order() {
    let registry = registry(3);
    let mut vector = HostVector::from_vec(vec![1i32, 2, 3]);

    vector
        .set_distribution(
            Distribution::copy_with_combine(registry.devices(), |acc, x| acc * 10 + x).unwrap(),
        )
        .unwrap();
    vector.copy_data_to_devices().unwrap();
    vector.data_on_device_modified();

    assert_eq!(vector.into_vec().unwrap(), vec![111, 222, 333]);
}

#[test_log::test]
fn copy_with_combine_reduces_partial_results() {
    let registry = registry(2);
    let mut vector = HostVector::filled(4, 0u32);
    vector
        .set_distribution(
            Distribution::copy_with_combine(registry.devices(), |a, b| a + b).unwrap(),
        )
        .unwrap();
    vector.copy_data_to_devices().unwrap();

    for (position, device) in registry.devices().iter().enumerate() {
        let partial = vec![position as u32 + 1; 4];
        let buffer = vector.device_buffer(device.id()).unwrap();
        buffer.write(0, &partial).unwrap().wait().unwrap();
    }
    vector.data_on_device_modified();

    assert_eq!(vector.into_vec().unwrap(), vec![3, 3, 3, 3]);
}

#[test_log::test]
fn distributions_need_devices() {
    let err = Distribution::<f32, HostServer>::block(&[]).unwrap_err();

    assert_eq!(err, DistributionError::NoDevices);
}

#[test_log::test]
fn distributions_reject_duplicate_devices() {
    let registry = registry(2);
    let devices = vec![registry.devices()[1].clone(), registry.devices()[1].clone()];

    let err = Distribution::<f32, _>::copy(&devices).unwrap_err();

    assert_eq!(
        err,
        DistributionError::DuplicateDevice {
            device: DeviceId::new(1)
        }
    );
}

#[test_log::test]
fn significances_must_match_devices() {
    let registry = registry(3);

    let err = Distribution::<f32, _>::block_weighted(registry.devices(), Significances::new(2))
        .unwrap_err();

    assert_eq!(
        err,
        DistributionError::SignificanceCount {
            expected: 3,
            actual: 2
        }
    );
}

#[test_log::test]
fn exchange_needed_only_when_partitioning_changes() {
    let registry = registry(2);
    let devices = registry.devices();
    let block = Distribution::<f32, _>::block(devices).unwrap();
    let other_block = Distribution::block(devices).unwrap();
    let first_only = Distribution::block(&devices[..1]).unwrap();
    let copy = Distribution::copy(devices).unwrap();
    let summing = Distribution::copy_with_combine(devices, |a: f32, b| a + b).unwrap();
    let overlap = Distribution::overlap(devices, 1, Padding::Nearest).unwrap();
    let wider = Distribution::overlap(devices, 2, Padding::Nearest).unwrap();

    assert!(!block.data_exchange_on_distribution_change(&other_block));
    assert!(block.data_exchange_on_distribution_change(&first_only));
    assert!(block.data_exchange_on_distribution_change(&copy));
    assert!(!copy.data_exchange_on_distribution_change(&summing));
    assert!(block.data_exchange_on_distribution_change(&overlap));
    assert!(overlap.data_exchange_on_distribution_change(&wider));
    assert!(
        !Distribution::single(&devices[0])
            .data_exchange_on_distribution_change(&Distribution::<f32, _>::single(&devices[0]))
    );
    assert!(
        Distribution::single(&devices[0])
            .data_exchange_on_distribution_change(&Distribution::<f32, _>::single(&devices[1]))
    );
}

#[test_log::test]
fn changing_distribution_keeps_device_results() {
    let registry = registry(3);
    let mut vector = HostVector::from_vec((0..9).collect::<Vec<i32>>());

    vector.prepare_input(&registry).unwrap();
    map_on_devices(&mut vector, |x| x + 100);
    vector
        .set_distribution(Distribution::single(&registry.devices()[2]))
        .unwrap();

    assert_eq!(vector.coherence(), Coherence::Clean);
    let buffer = vector.device_buffer(DeviceId::new(2)).unwrap();
    assert_eq!(buffer.len(), 9);
    assert_eq!(
        buffer_contents(buffer),
        (100..109).collect::<Vec<i32>>()
    );
    assert!(vector.device_buffer(DeviceId::new(0)).is_none());
}

#[test_log::test]
fn changing_distribution_without_buffers_stays_on_host() {
    let registry = registry(2);
    let mut vector = HostVector::from_vec(vec![1u16, 2, 3]);

    vector
        .set_distribution(Distribution::copy(registry.devices()).unwrap())
        .unwrap();
    vector
        .set_distribution(Distribution::block(registry.devices()).unwrap())
        .unwrap();

    assert_eq!(vector.device_buffers().count(), 0);
    assert_eq!(vector.coherence(), Coherence::HostAhead);
}

#[test_log::test]
fn equivalent_distribution_keeps_buffers() {
    let registry = registry(2);
    let mut vector = HostVector::from_vec(vec![5u32; 6]);

    vector.prepare_input(&registry).unwrap();
    let before = registry.devices()[0].memory_usage();
    vector
        .set_distribution(Distribution::block(registry.devices()).unwrap())
        .unwrap();

    assert_eq!(registry.devices()[0].memory_usage(), before);
    assert_eq!(vector.coherence(), Coherence::Clean);
}

#[test_log::test]
fn transfers_need_a_distribution() {
    let mut vector = HostVector::from_vec(vec![1.0f64]);

    assert_eq!(
        vector.create_device_buffers().unwrap_err(),
        ContainerError::NoDistribution
    );
    assert_eq!(
        vector.copy_data_to_devices().unwrap_err(),
        ContainerError::NoDistribution
    );
}
