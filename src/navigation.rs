//! Navigation / history store boundary.
//!
//! The engine treats the URL store purely as a reactive source of path
//! changes and a sink for programmatic navigation. Browser history,
//! same-origin checks, and click interception live behind this trait.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::reactive::ReactiveVar;

/// Options for a programmatic location change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetOptions {
	/// Replace the current history entry instead of pushing a new one.
	pub replace: bool,
	/// Opaque navigation state stored alongside the entry.
	pub state: Option<serde_json::Value>,
}

/// External URL/history store.
pub trait LocationStore {
	/// The current path. Reactive: reading it inside a computation
	/// subscribes to future changes.
	fn get(&self) -> String;

	/// Navigate to `path`, pushing or replacing per `options`.
	fn set(&self, path: &str, options: &SetOptions);
}

/// In-memory reactive location store, used by tests and server dispatch.
pub struct MemoryLocation {
	current: ReactiveVar<String>,
	history: RefCell<Vec<String>>,
}

impl MemoryLocation {
	pub fn new(initial: &str) -> Rc<Self> {
		Rc::new(Self {
			current: ReactiveVar::new(initial.to_string()),
			history: RefCell::new(vec![initial.to_string()]),
		})
	}

	/// Recorded history entries, oldest first.
	pub fn entries(&self) -> Vec<String> {
		self.history.borrow().clone()
	}
}

impl LocationStore for MemoryLocation {
	fn get(&self) -> String {
		self.current.get()
	}

	fn set(&self, path: &str, options: &SetOptions) {
		{
			let mut history = self.history.borrow_mut();
			if options.replace {
				history.pop();
			}
			history.push(path.to_string());
		}
		self.current.set(path.to_string());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reactive::{Computation, flush};
	use serial_test::serial;
	use std::cell::RefCell;

	#[test]
	#[serial]
	fn test_push_and_replace() {
		let location = MemoryLocation::new("/");
		location.set("/a", &SetOptions::default());
		location.set(
			"/b",
			&SetOptions {
				replace: true,
				state: None,
			},
		);
		assert_eq!(location.entries(), vec!["/".to_string(), "/b".to_string()]);
		assert_eq!(location.get(), "/b");
	}

	#[test]
	#[serial]
	fn test_get_is_reactive() {
		let location = MemoryLocation::new("/");
		let seen = Rc::new(RefCell::new(Vec::new()));

		let loc = location.clone();
		let seen_c = seen.clone();
		let _comp = Computation::new(move |_| {
			seen_c.borrow_mut().push(loc.get());
		});

		location.set("/next", &SetOptions::default());
		flush();
		assert_eq!(*seen.borrow(), vec!["/".to_string(), "/next".to_string()]);
	}
}
