//! Reactive invalidation substrate.
//!
//! The dispatch engine does not depend on an ambient reactivity framework;
//! it carries a small explicit one. Three pieces:
//!
//! - [`Dependency`]: an invalidation source with `depend()` / `changed()`
//!   semantics.
//! - [`Computation`]: a re-run-on-invalidate execution scope with
//!   `on_invalidate` callbacks and precise `stop()`.
//! - [`ReactiveVar`]: a value cell wired to a dependency.
//!
//! The scheduler is thread-local and single-threaded by design: reruns are
//! queued by `changed()` and drained by [`flush`]. There is no parallelism,
//! only interleaving of invalidation cycles. Server-side dispatch runs one
//! engine per request thread.

mod computation;
mod dependency;
mod runtime;
mod var;

pub use computation::{CompCtx, Computation};
pub use dependency::Dependency;
pub use runtime::{NodeId, flush, nonreactive};
pub use var::ReactiveVar;
