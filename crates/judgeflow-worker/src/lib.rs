//! Worker pool (§4.5): fixed slots pulling from named queues with
//! prefetch 1, dispatching to registered task handlers, and shutting down
//! gracefully within a configured grace period.

mod error;
mod handler;
mod pool;

pub use error::Error;
pub use handler::{TaskHandler, TaskRegistry};
pub use pool::{shutdown_signal, RunningPool, WorkerPool};
