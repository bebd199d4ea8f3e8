pub mod channel;
pub mod frame;
pub mod retry;
pub mod scheduler;

pub use channel::*;
pub use frame::*;
pub use retry::*;
pub use scheduler::*;
