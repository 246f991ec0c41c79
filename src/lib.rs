//! # Palantir Pool
//!
//! A bounded-resource concurrency simulation built on a FIFO-fair semaphore.
//!
//! A fixed set of *stones* is shared by a larger set of *gazer* threads. Each
//! gazer repeatedly acquires a stone, holds it for a random interval, gazes into
//! it, and releases it. The crate exists to make the concurrency guarantees
//! around that loop explicit and checkable:
//!
//! - **Fair admission**: permits are granted in arrival order and handed
//!   directly to the longest waiter on release, so nobody barges or starves.
//! - **Interruptible blocking**: a thread parked on the semaphore can be woken
//!   and removed from the queue through its [`sync::Interrupt`] handle, without
//!   losing or duplicating a permit.
//! - **Exclusive binding**: each stone has at most one owner and each gazer
//!   holds at most one stone; an independent counter is checked against the
//!   pool size on every acquire and release.
//! - **Clean shutdown**: cancellation wakes every blocked gazer and waits until
//!   all of them have exited.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use palantir_pool::builders::build_simulation;
//! use palantir_pool::config::SimulationConfig;
//!
//! let config = SimulationConfig::default()
//!     .with_stone_count(5)
//!     .with_gazer_count(8)
//!     .with_iterations(1_000);
//!
//! let controller = build_simulation(&config)?;
//! let state = controller.start()?;
//! println!("finished: {state:?}, permits back: {}", controller.available_permits());
//! # Ok::<(), palantir_pool::core::SimulationError>(())
//! ```
//!
//! ## Layout
//!
//! - [`sync`]: `FairSemaphore` and `Interrupt`
//! - [`core`]: stones, gazers, the two pool strategies, the worker manager and
//!   the `SimulationController`
//! - [`config`] / [`builders`]: serde configuration and wiring
//! - [`util`]: identifiers, clock and tracing setup

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core simulation abstractions and capacity accounting.
pub mod core;
/// Configuration models for a simulation run.
pub mod config;
/// Builders to construct a simulation from configuration.
pub mod builders;
/// Fair semaphore and thread interruption.
pub mod sync;
/// Shared utilities.
pub mod util;
