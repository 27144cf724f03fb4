mod counter;
mod lock;

pub use counter::*;
pub use lock::*;
