#![warn(missing_docs)]

//! Common crate for CubeSkel, holding the leaf types shared by the runtime and the
//! distributed containers.

#[macro_use]
extern crate derive_new;

/// Device identification and classification.
pub mod device;

/// Future utils with a compatible API for native and non-native targets.
pub mod future;

/// Blocking helpers to wait on backend operations.
pub mod reader;
