#![warn(missing_docs)]

//! CubeSkel core crate: distributed containers and the distributions that decide how their
//! elements are spread over the devices of a
//! [registry](cubeskel_runtime::registry::DeviceRegistry).
//!
//! A container keeps the authoritative copy of its data either on the host or on the devices and
//! only transfers when the other side is behind. Skeletons call
//! [`prepare_input`](container::DistributedData::prepare_input) and
//! [`prepare_output`](container::DistributedData::prepare_output) before launching kernels on the
//! per-device buffers.

#[macro_use]
extern crate derive_new;

/// Per-device memory backing a container.
pub mod buffer;
/// Distributed containers.
pub mod container;
/// Data distributions.
pub mod distribution;
/// Batches of in-flight transfers.
pub mod transfer;

mod element;
mod error;

pub use element::*;
pub use error::*;

pub use cubeskel_runtime as runtime;
