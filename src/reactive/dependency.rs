//! Invalidation source with `depend()` / `changed()` semantics.

use super::computation;
use super::runtime::{NodeId, try_with_runtime, with_runtime};

/// An invalidation source.
///
/// Calling [`depend`](Self::depend) inside a running [`Computation`]
/// subscribes that computation; [`changed`](Self::changed) schedules every
/// subscriber for rerun. Dependency tracking is transparent to the caller:
/// reads outside any computation are simply untracked.
///
/// [`Computation`]: super::Computation
#[derive(Debug)]
pub struct Dependency {
	id: NodeId,
}

impl Dependency {
	pub fn new() -> Self {
		Self { id: NodeId::next() }
	}

	/// Subscribe the currently executing computation, if any.
	///
	/// Returns `true` when a subscription was recorded.
	pub fn depend(&self) -> bool {
		with_runtime(|rt| match rt.current_observer() {
			Some(observer) => {
				rt.link(self.id, observer);
				true
			}
			None => false,
		})
	}

	/// Invalidate every subscribed computation.
	pub fn changed(&self) {
		let subscribers = with_runtime(|rt| rt.subscribers_of(self.id));
		for id in subscribers {
			computation::invalidate_by_id(id);
		}
	}

	/// Whether any live computation is currently subscribed.
	pub fn has_dependents(&self) -> bool {
		with_runtime(|rt| rt.has_subscribers(self.id))
	}
}

impl Default for Dependency {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for Dependency {
	fn drop(&mut self) {
		// May run during thread teardown, after the runtime is gone.
		try_with_runtime(|rt| rt.remove_dependency(self.id));
	}
}
