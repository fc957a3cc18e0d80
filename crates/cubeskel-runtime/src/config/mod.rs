/// Distribution config module.
pub mod distribution;
/// Registry config module.
pub mod registry;
/// Transfer config module.
pub mod transfer;

mod base;
mod logger;

pub use base::*;
pub use logger::{LogCrateLevel, LogLevel, Logger, LoggerConfig};
