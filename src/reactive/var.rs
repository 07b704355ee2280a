//! Reactive value cell.

use std::cell::RefCell;
use std::rc::Rc;

use super::Dependency;

struct VarInner<T> {
	dep: Dependency,
	value: RefCell<T>,
}

/// A value cell wired to a [`Dependency`].
///
/// `get()` inside a computation subscribes it; `set()` notifies every
/// subscriber. Clones share the same underlying cell.
pub struct ReactiveVar<T> {
	inner: Rc<VarInner<T>>,
}

impl<T> Clone for ReactiveVar<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: Clone> ReactiveVar<T> {
	pub fn new(value: T) -> Self {
		Self {
			inner: Rc::new(VarInner {
				dep: Dependency::new(),
				value: RefCell::new(value),
			}),
		}
	}

	/// Read the value, tracking the dependency.
	pub fn get(&self) -> T {
		self.inner.dep.depend();
		self.inner.value.borrow().clone()
	}

	/// Read the value without tracking.
	pub fn get_untracked(&self) -> T {
		self.inner.value.borrow().clone()
	}

	/// Replace the value and notify subscribers. Every `set` notifies,
	/// even when the new value compares equal to the old one.
	pub fn set(&self, value: T) {
		*self.inner.value.borrow_mut() = value;
		self.inner.dep.changed();
	}
}
