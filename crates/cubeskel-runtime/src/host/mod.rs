mod platform;
mod server;

pub use platform::*;
pub use server::*;
