#![warn(missing_docs)]

//! CubeSkel runtime crate: the process-side view of the compute devices.
//!
//! It defines the seam with compute backends ([`server::ComputeServer`] and
//! [`platform::Platform`]), the [`device::Device`] handle used to enqueue transfers, the
//! [`registry::DeviceRegistry`] that selects devices once per process, and the global
//! configuration with its loggers.

#[macro_use]
extern crate derive_new;

/// Global configuration and loggers.
pub mod config;
/// Device handle.
pub mod device;
/// Events returned by asynchronous backend operations.
pub mod event;
/// Backend platform enumeration.
pub mod platform;
/// Device registry.
pub mod registry;
/// Compute server module.
pub mod server;

/// In-process backend keeping device memory on the host.
#[cfg(feature = "host")]
pub mod host;

pub use cubeskel_common::device::{DeviceId, DeviceType, PlatformDeviceId};
