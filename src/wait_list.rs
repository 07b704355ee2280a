//! Aggregation of asynchronous readiness sources.
//!
//! A [`WaitList`] tracks a set of [`ReadyHandle`]s and reports aggregate
//! readiness reactively. The not-ready count is maintained incrementally
//! by one small computation per handle, so `ready()` is O(1) and observers
//! are notified exactly at the all-ready / not-all-ready transitions.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::reactive::{Computation, Dependency, ReactiveVar};

/// A readiness source. Any subscription-like object qualifies; `ready()`
/// is expected to be a reactive read.
pub trait ReadyHandle {
	fn ready(&self) -> bool;
}

/// A trivially toggleable [`ReadyHandle`], handy for tests and for adapting
/// imperative readiness sources.
pub struct ReadyFlag {
	state: ReactiveVar<bool>,
}

impl ReadyFlag {
	pub fn new(ready: bool) -> Rc<Self> {
		Rc::new(Self {
			state: ReactiveVar::new(ready),
		})
	}

	pub fn set_ready(&self, ready: bool) {
		self.state.set(ready);
	}
}

impl ReadyHandle for ReadyFlag {
	fn ready(&self) -> bool {
		self.state.get()
	}
}

/// Reactive aggregator over registered readiness sources.
///
/// With zero registered sources, `ready()` is vacuously true.
#[derive(Default)]
pub struct WaitList {
	not_ready: Rc<Cell<usize>>,
	dep: Rc<Dependency>,
	watchers: RefCell<Vec<Computation>>,
	registered: Cell<usize>,
}

impl WaitList {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a readiness source.
	///
	/// A per-handle computation re-evaluates `handle.ready()` whenever it
	/// invalidates and adjusts the shared not-ready count; the list
	/// dependency fires only on 0↔1 transitions of that count.
	pub fn wait(&self, handle: Rc<dyn ReadyHandle>) {
		self.registered.set(self.registered.get() + 1);
		let count = Rc::clone(&self.not_ready);
		let dep = Rc::clone(&self.dep);
		let last = Cell::new(true);

		let watcher = Computation::new(move |_| {
			let ready = handle.ready();
			if ready == last.get() {
				return;
			}
			last.set(ready);
			if ready {
				count.set(count.get() - 1);
				if count.get() == 0 {
					dep.changed();
				}
			} else {
				if count.get() == 0 {
					dep.changed();
				}
				count.set(count.get() + 1);
			}
		});
		self.watchers.borrow_mut().push(watcher);
	}

	/// True iff every registered source is currently ready. Reactive.
	pub fn ready(&self) -> bool {
		self.dep.depend();
		self.not_ready.get() == 0
	}

	/// Number of registered sources.
	pub fn len(&self) -> usize {
		self.registered.get()
	}

	pub fn is_empty(&self) -> bool {
		self.registered.get() == 0
	}

	/// Drop every registered source and associated computation.
	pub fn clear(&self) {
		let was_blocked = self.not_ready.get() > 0;
		self.watchers.borrow_mut().clear();
		self.not_ready.set(0);
		self.registered.set(0);
		if was_blocked {
			// Aggregate state flipped to vacuously ready.
			self.dep.changed();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reactive::{Computation, flush};
	use serial_test::serial;

	#[test]
	#[serial]
	fn test_empty_list_is_vacuously_ready() {
		let list = WaitList::new();
		assert!(list.ready());
		assert!(list.is_empty());
	}

	#[test]
	#[serial]
	fn test_ready_tracks_all_handles() {
		let list = WaitList::new();
		let a = ReadyFlag::new(false);
		let b = ReadyFlag::new(false);
		list.wait(a.clone());
		list.wait(b.clone());
		assert!(!list.ready());

		a.set_ready(true);
		flush();
		assert!(!list.ready());

		b.set_ready(true);
		flush();
		assert!(list.ready());
	}

	#[test]
	#[serial]
	fn test_notifies_exactly_on_transition() {
		let list = Rc::new(WaitList::new());
		let a = ReadyFlag::new(false);
		let b = ReadyFlag::new(false);
		list.wait(a.clone());
		list.wait(b.clone());

		let observed = Rc::new(RefCell::new(Vec::new()));
		let list_c = Rc::clone(&list);
		let observed_c = Rc::clone(&observed);
		let _observer = Computation::new(move |_| {
			observed_c.borrow_mut().push(list_c.ready());
		});
		assert_eq!(*observed.borrow(), vec![false]);

		// First handle readying does not cross the threshold: no rerun.
		a.set_ready(true);
		flush();
		assert_eq!(*observed.borrow(), vec![false]);

		// Last handle readying does.
		b.set_ready(true);
		flush();
		assert_eq!(*observed.borrow(), vec![false, true]);

		// Going not-ready again notifies once more.
		a.set_ready(false);
		flush();
		assert_eq!(*observed.borrow(), vec![false, true, false]);
	}

	#[test]
	#[serial]
	fn test_clear_releases_watchers() {
		let list = WaitList::new();
		let a = ReadyFlag::new(false);
		list.wait(a.clone());
		assert!(!list.ready());

		list.clear();
		assert!(list.ready());

		// The old watcher is gone; toggling the handle changes nothing.
		a.set_ready(true);
		flush();
		assert!(list.ready());
		assert!(list.is_empty());
	}
}
