mod base;
mod matrix;
mod vector;

pub use base::*;
pub use matrix::*;
pub use vector::*;
