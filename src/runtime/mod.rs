//! Runtime adapters: spawning, the per-channel work driver and deferred
//! scheduling.

pub mod deferred;
pub(crate) mod driver;
pub mod spawn;

pub use deferred::{Deferral, DeferredCallback, DeferredTrigger};
pub use spawn::{Spawn, TokioSpawner};
