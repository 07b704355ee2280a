//! Per-dispatch route context.
//!
//! A [`RouteContext`] is the ephemeral value threaded through middleware
//! stacks and controller runs for one dispatch: the matched path, decoded
//! params, optional navigation state, and a reactive result slot an
//! external renderer can observe.

use http::Method;

use crate::config::Where;
use crate::params::Params;
use crate::reactive::ReactiveVar;

/// Ephemeral per-dispatch value.
#[derive(Clone)]
pub struct RouteContext {
	/// The dispatched path, including any query string and fragment.
	pub path: String,
	/// Decoded parameters of the matched pattern.
	pub params: Params,
	/// Name of the matched route, once matching has happened.
	pub route_name: Option<String>,
	/// Execution context of the dispatching router.
	pub environment: Where,
	/// HTTP method for server-side dispatches.
	pub method: Option<Method>,
	/// Opaque navigation state from the history store.
	pub state: Option<serde_json::Value>,
	result: ReactiveVar<String>,
}

impl RouteContext {
	pub fn new(path: &str, environment: Where) -> Self {
		Self {
			path: path.to_string(),
			params: Params::new(),
			route_name: None,
			environment,
			method: None,
			state: None,
			result: ReactiveVar::new(String::new()),
		}
	}

	/// The last value stored with [`set_result`](Self::set_result), or the
	/// empty string if never set. Reactive.
	pub fn result(&self) -> String {
		self.result.get()
	}

	/// Store a computed result and invalidate dependents, exactly once per
	/// call.
	pub fn set_result(&self, value: impl Into<String>) {
		self.result.set(value.into());
	}

	/// Store a result computed on demand.
	pub fn set_result_with<F>(&self, f: F)
	where
		F: FnOnce() -> String,
	{
		self.result.set(f());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reactive::{Computation, flush};
	use serial_test::serial;
	use std::cell::RefCell;
	use std::rc::Rc;

	#[test]
	#[serial]
	fn test_result_defaults_to_empty_string() {
		let ctx = RouteContext::new("/posts/1", Where::Client);
		assert_eq!(ctx.result(), "");
	}

	#[test]
	#[serial]
	fn test_result_invalidates_once_per_set() {
		let ctx = RouteContext::new("/", Where::Client);
		let seen = Rc::new(RefCell::new(Vec::new()));

		let ctx_c = ctx.clone();
		let seen_c = seen.clone();
		let _observer = Computation::new(move |_| {
			seen_c.borrow_mut().push(ctx_c.result());
		});

		ctx.set_result("first");
		flush();
		ctx.set_result_with(|| "second".to_string());
		flush();
		assert_eq!(
			*seen.borrow(),
			vec!["".to_string(), "first".to_string(), "second".to_string()]
		);
	}
}
