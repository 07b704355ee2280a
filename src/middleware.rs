//! Ordered, filterable handler stacks with explicit continuation control.
//!
//! A [`MiddlewareStack`] dispatches a path through its entries in insertion
//! order. Each admitted handler receives a [`Next`] token; the pipeline
//! continues to the following admitted entry only if the handler invoked
//! it. Omitting the call halts the pipeline, which is the short-circuit
//! mechanism before-stacks use to block an action. If no entry is admitted
//! at all, the stack reports [`StackOutcome::Unhandled`].

use std::cell::Cell;
use std::rc::Rc;

use http::Method;

use crate::config::Where;
use crate::context::RouteContext;
use crate::error::Result;
use crate::pattern::PathPattern;

/// Handler signature for stack entries.
pub type StackHandler = Rc<dyn Fn(&mut RouteContext, &Next)>;

/// Continuation token handed to each handler.
///
/// Call [`proceed`](Self::proceed) to pass control to the following
/// admitted entry; returning without calling it halts the pipeline.
pub struct Next {
	called: Cell<bool>,
}

impl Next {
	fn new() -> Self {
		Self {
			called: Cell::new(false),
		}
	}

	/// Continue to the next admitted entry after this handler returns.
	pub fn proceed(&self) {
		self.called.set(true);
	}

	fn was_called(&self) -> bool {
		self.called.get()
	}
}

/// Admission filters attached to a stack entry.
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
	/// Run only for these route names.
	pub only: Vec<String>,
	/// Never run for these route names.
	pub except: Vec<String>,
	/// Restrict to an execution context.
	pub where_: Option<Where>,
	/// Restrict to an HTTP method (per-verb route sub-handlers).
	pub method: Option<Method>,
	/// Diagnostic name for tracing.
	pub name: Option<String>,
}

impl EntryOptions {
	/// Whether this entry admits the current dispatch context.
	pub fn admits(&self, ctx: &RouteContext) -> bool {
		if let Some(where_) = self.where_
			&& where_ != ctx.environment
		{
			return false;
		}
		if let Some(method) = &self.method
			&& ctx.method.as_ref() != Some(method)
		{
			return false;
		}
		match ctx.route_name.as_deref() {
			Some(name) => {
				if !self.only.is_empty() && !self.only.iter().any(|n| n == name) {
					return false;
				}
				if self.except.iter().any(|n| n == name) {
					return false;
				}
				true
			}
			// No route matched yet: name-based filters cannot admit.
			None => self.only.is_empty(),
		}
	}
}

#[derive(Clone)]
struct Entry {
	pattern: Option<PathPattern>,
	handler: StackHandler,
	options: EntryOptions,
}

/// Outcome of a stack dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOutcome {
	/// Some handler ran and did not call `next()`.
	Halted,
	/// Every admitted handler called `next()`.
	Continue,
	/// No entry was admitted for this dispatch.
	Unhandled,
}

/// An ordered sequence of (pattern, handler, options) entries.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
	entries: Vec<Entry>,
}

impl MiddlewareStack {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Append an entry. A `None` pattern matches every path.
	pub fn push<F>(&mut self, pattern: Option<&str>, handler: F, options: EntryOptions) -> Result<()>
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		let pattern = match pattern {
			Some(template) => Some(PathPattern::compile(template)?),
			None => None,
		};
		self.entries.push(Entry {
			pattern,
			handler: Rc::new(handler),
			options,
		});
		Ok(())
	}

	/// Append an entry mounted on an already compiled pattern.
	pub fn push_compiled<F>(&mut self, pattern: PathPattern, handler: F, options: EntryOptions)
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		self.entries.push(Entry {
			pattern: Some(pattern),
			handler: Rc::new(handler),
			options,
		});
	}

	/// Append several handlers sharing one set of options, matching every
	/// path.
	pub fn append(&mut self, handlers: Vec<StackHandler>, options: EntryOptions) {
		for handler in handlers {
			self.entries.push(Entry {
				pattern: None,
				handler,
				options: options.clone(),
			});
		}
	}

	/// Combine two stacks into a new one without mutating either input.
	pub fn concat(&self, other: &MiddlewareStack) -> MiddlewareStack {
		let mut entries = self.entries.clone();
		entries.extend(other.entries.iter().cloned());
		MiddlewareStack { entries }
	}

	/// Run the stack for `path` against `ctx`.
	pub fn dispatch(&self, path: &str, ctx: &mut RouteContext) -> StackOutcome {
		let mut admitted = 0usize;
		for entry in &self.entries {
			if let Some(pattern) = &entry.pattern
				&& !pattern.test(path)
			{
				continue;
			}
			if !entry.options.admits(ctx) {
				continue;
			}
			admitted += 1;
			let next = Next::new();
			(entry.handler)(ctx, &next);
			if !next.was_called() {
				return StackOutcome::Halted;
			}
		}
		if admitted == 0 {
			StackOutcome::Unhandled
		} else {
			StackOutcome::Continue
		}
	}

	/// Like [`dispatch`](Self::dispatch), invoking `done` when no entry was
	/// admitted.
	pub fn dispatch_with_done<F>(&self, path: &str, ctx: &mut RouteContext, done: F) -> StackOutcome
	where
		F: FnOnce(&mut RouteContext),
	{
		let outcome = self.dispatch(path, ctx);
		if outcome == StackOutcome::Unhandled {
			done(ctx);
		}
		outcome
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;

	fn ctx(path: &str) -> RouteContext {
		RouteContext::new(path, Where::Client)
	}

	fn recording_handler(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str, call_next: bool) -> impl Fn(&mut RouteContext, &Next) + use<> {
		let log = Rc::clone(log);
		move |_, next| {
			log.borrow_mut().push(tag);
			if call_next {
				next.proceed();
			}
		}
	}

	#[test]
	fn test_dispatch_in_insertion_order() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut stack = MiddlewareStack::new();
		stack
			.push(None, recording_handler(&log, "first", true), EntryOptions::default())
			.unwrap();
		stack
			.push(None, recording_handler(&log, "second", true), EntryOptions::default())
			.unwrap();

		let outcome = stack.dispatch("/x", &mut ctx("/x"));
		assert_eq!(outcome, StackOutcome::Continue);
		assert_eq!(*log.borrow(), vec!["first", "second"]);
	}

	#[test]
	fn test_omitting_next_halts_pipeline() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut stack = MiddlewareStack::new();
		stack
			.push(None, recording_handler(&log, "gate", false), EntryOptions::default())
			.unwrap();
		stack
			.push(None, recording_handler(&log, "never", true), EntryOptions::default())
			.unwrap();

		let outcome = stack.dispatch("/x", &mut ctx("/x"));
		assert_eq!(outcome, StackOutcome::Halted);
		assert_eq!(*log.borrow(), vec!["gate"]);
	}

	#[test]
	fn test_pattern_filters_entries() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut stack = MiddlewareStack::new();
		stack
			.push(Some("/admin/*"), recording_handler(&log, "admin", true), EntryOptions::default())
			.unwrap();
		stack
			.push(None, recording_handler(&log, "all", true), EntryOptions::default())
			.unwrap();

		stack.dispatch("/public", &mut ctx("/public"));
		assert_eq!(*log.borrow(), vec!["all"]);

		log.borrow_mut().clear();
		stack.dispatch("/admin/users", &mut ctx("/admin/users"));
		assert_eq!(*log.borrow(), vec!["admin", "all"]);
	}

	#[test]
	fn test_unhandled_fires_done() {
		let mut stack = MiddlewareStack::new();
		stack
			.push(Some("/only-here"), |_, next| next.proceed(), EntryOptions::default())
			.unwrap();

		let done_called = Rc::new(Cell::new(false));
		let done_c = Rc::clone(&done_called);
		let outcome = stack.dispatch_with_done("/elsewhere", &mut ctx("/elsewhere"), move |_| {
			done_c.set(true);
		});
		assert_eq!(outcome, StackOutcome::Unhandled);
		assert!(done_called.get());
	}

	#[test]
	fn test_only_except_filters() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut stack = MiddlewareStack::new();
		stack
			.push(
				None,
				recording_handler(&log, "only-posts", true),
				EntryOptions {
					only: vec!["posts".to_string()],
					..EntryOptions::default()
				},
			)
			.unwrap();
		stack
			.push(
				None,
				recording_handler(&log, "except-admin", true),
				EntryOptions {
					except: vec!["admin".to_string()],
					..EntryOptions::default()
				},
			)
			.unwrap();

		let mut posts = ctx("/posts");
		posts.route_name = Some("posts".to_string());
		stack.dispatch("/posts", &mut posts);
		assert_eq!(*log.borrow(), vec!["only-posts", "except-admin"]);

		log.borrow_mut().clear();
		let mut admin = ctx("/admin");
		admin.route_name = Some("admin".to_string());
		stack.dispatch("/admin", &mut admin);
		assert!(log.borrow().is_empty());
	}

	#[test]
	fn test_where_filter() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut stack = MiddlewareStack::new();
		stack
			.push(
				None,
				recording_handler(&log, "server-only", true),
				EntryOptions {
					where_: Some(Where::Server),
					..EntryOptions::default()
				},
			)
			.unwrap();

		stack.dispatch("/x", &mut ctx("/x"));
		assert!(log.borrow().is_empty());

		let mut server_ctx = RouteContext::new("/x", Where::Server);
		stack.dispatch("/x", &mut server_ctx);
		assert_eq!(*log.borrow(), vec!["server-only"]);
	}

	#[test]
	fn test_method_filter() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut stack = MiddlewareStack::new();
		stack
			.push(
				None,
				recording_handler(&log, "post-only", false),
				EntryOptions {
					method: Some(Method::POST),
					..EntryOptions::default()
				},
			)
			.unwrap();

		let mut get_ctx = ctx("/x");
		get_ctx.method = Some(Method::GET);
		assert_eq!(stack.dispatch("/x", &mut get_ctx), StackOutcome::Unhandled);

		let mut post_ctx = ctx("/x");
		post_ctx.method = Some(Method::POST);
		assert_eq!(stack.dispatch("/x", &mut post_ctx), StackOutcome::Halted);
		assert_eq!(*log.borrow(), vec!["post-only"]);
	}

	#[test]
	fn test_concat_does_not_mutate_inputs() {
		let mut a = MiddlewareStack::new();
		a.push(None, |_, next| next.proceed(), EntryOptions::default())
			.unwrap();
		let mut b = MiddlewareStack::new();
		b.push(None, |_, next| next.proceed(), EntryOptions::default())
			.unwrap();

		let combined = a.concat(&b);
		assert_eq!(combined.len(), 2);
		assert_eq!(a.len(), 1);
		assert_eq!(b.len(), 1);
	}

	#[test]
	fn test_append_shares_options() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut stack = MiddlewareStack::new();
		let h1: StackHandler = {
			let log = Rc::clone(&log);
			Rc::new(move |_, next: &Next| {
				log.borrow_mut().push("h1");
				next.proceed();
			})
		};
		let h2: StackHandler = {
			let log = Rc::clone(&log);
			Rc::new(move |_, next: &Next| {
				log.borrow_mut().push("h2");
				next.proceed();
			})
		};
		stack.append(
			vec![h1, h2],
			EntryOptions {
				only: vec!["posts".to_string()],
				..EntryOptions::default()
			},
		);

		let mut posts = ctx("/posts");
		posts.route_name = Some("posts".to_string());
		stack.dispatch("/posts", &mut posts);
		assert_eq!(*log.borrow(), vec!["h1", "h2"]);
	}
}
