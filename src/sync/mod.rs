//! Blocking primitives: the fair semaphore and the interrupt handle that can
//! cancel a thread parked inside it.

pub mod interrupt;
pub mod semaphore;
mod waiter;

pub use interrupt::Interrupt;
pub use semaphore::{FairSemaphore, PermitSemaphore};
