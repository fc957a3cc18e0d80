mod base;
mod block;
mod copy;
mod layout;
mod overlap;
mod significances;
mod single;

pub use base::*;
pub use block::*;
pub use copy::*;
pub use layout::*;
pub use overlap::*;
pub use significances::*;
pub use single::*;
