mod scheduler;
mod trellis;
mod vine;

pub use scheduler::*;
pub use trellis::*;
pub use vine::*;
