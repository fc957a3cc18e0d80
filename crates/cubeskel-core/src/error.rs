use cubeskel_runtime::{
    DeviceId,
    server::{IoError, ServerError},
};
use thiserror::Error;

/// Errors raised while building or applying a distribution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    /// A distribution was built over an empty device set.
    #[error("A distribution needs at least one device")]
    NoDevices,

    /// The same device was given twice.
    #[error("{device} appears more than once in the distribution")]
    DuplicateDevice {
        /// The repeated device.
        device: DeviceId,
    },

    /// The number of significances doesn't match the number of devices.
    #[error("Expected {expected} significance(s), one per device, got {actual}")]
    SignificanceCount {
        /// The number of devices.
        expected: usize,
        /// The number of significances given.
        actual: usize,
    },

    /// A significance is negative, infinite or NaN.
    #[error("Significances must be finite and non-negative, got {value} at index {index}")]
    InvalidSignificance {
        /// Position of the offending weight.
        index: usize,
        /// The offending weight.
        value: f64,
    },

    /// The significances don't sum to one.
    #[error("Significances must sum to 1 (tolerance {tolerance}), got {sum}")]
    SignificanceSum {
        /// The actual sum.
        sum: f64,
        /// The accepted distance from one.
        tolerance: f64,
    },

    /// A transfer was requested for a device that has no buffer.
    #[error("No device buffer allocated on {device}")]
    MissingBuffer {
        /// The device without buffer.
        device: DeviceId,
    },
}

/// Errors raised by distributed containers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContainerError {
    /// The operation needs a distribution and none is assigned.
    #[error("The container has no distribution assigned")]
    NoDistribution,

    /// Element access outside of the container.
    #[error("Index {index} is out of range for a container of {len} element(s)")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of elements.
        len: usize,
    },

    /// The data given to a matrix doesn't match its shape.
    #[error("Expected {expected} element(s) for a {rows}x{cols} matrix, got {actual}")]
    ShapeMismatch {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
        /// `rows * cols`.
        expected: usize,
        /// The number of elements given.
        actual: usize,
    },

    /// The distribution couldn't be applied.
    #[error(transparent)]
    Distribution(#[from] DistributionError),

    /// A transfer couldn't be enqueued.
    #[error("An io error happened during a transfer\nCaused by:\n  {0}")]
    Io(#[from] IoError),

    /// A device reported an error while completing a transfer.
    #[error("A device operation failed\nCaused by:\n  {0}")]
    Server(#[from] ServerError),
}
