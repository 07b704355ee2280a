//! Re-run-on-invalidate execution scopes.
//!
//! A [`Computation`] runs its closure immediately on construction and again
//! (via [`flush`](super::flush)) each time a [`Dependency`](super::Dependency)
//! it read signals change. The owner handle stops the computation when
//! dropped, so holders can release reactive resources precisely.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::runtime::{NodeId, try_with_runtime, with_runtime};

type CompFn = Box<dyn FnMut(&CompCtx<'_>)>;
type InvalidateFn = Box<dyn FnOnce()>;

thread_local! {
	/// Closure storage, keyed by computation id.
	static FUNCTIONS: RefCell<BTreeMap<NodeId, CompFn>> = const { RefCell::new(BTreeMap::new()) };
	/// Shared-state registry so dependencies can invalidate by id.
	static STATES: RefCell<BTreeMap<NodeId, Weak<CompState>>> = const { RefCell::new(BTreeMap::new()) };
}

pub(crate) struct CompState {
	id: NodeId,
	stopped: Cell<bool>,
	invalidated: Cell<bool>,
	first_run: Cell<bool>,
	on_invalidate: RefCell<Vec<InvalidateFn>>,
}

/// Owner handle for a reactive computation.
///
/// Dropping the handle stops the computation. Computations created inside
/// another computation are stopped automatically when the enclosing
/// computation is invalidated or stopped.
pub struct Computation {
	state: Rc<CompState>,
}

/// Borrowed view of the executing computation, passed to the closure.
pub struct CompCtx<'a> {
	state: &'a Rc<CompState>,
}

impl Computation {
	/// Create a computation and run `f` immediately.
	///
	/// Inside `f`, [`CompCtx::first_run`] distinguishes the initial run from
	/// invalidation-driven reruns.
	pub fn new<F>(f: F) -> Self
	where
		F: FnMut(&CompCtx<'_>) + 'static,
	{
		let state = Rc::new(CompState {
			id: NodeId::next(),
			stopped: Cell::new(false),
			invalidated: Cell::new(false),
			first_run: Cell::new(true),
			on_invalidate: RefCell::new(Vec::new()),
		});

		STATES.with(|s| {
			s.borrow_mut().insert(state.id, Rc::downgrade(&state));
		});
		FUNCTIONS.with(|s| {
			s.borrow_mut().insert(state.id, Box::new(f));
		});

		// A computation created inside another computation is scoped to it:
		// it stops when the parent is invalidated or stopped.
		let parent = with_runtime(|rt| rt.current_observer());
		if let Some(parent_id) = parent
			&& let Some(parent_state) = lookup(parent_id)
		{
			let child = Rc::downgrade(&state);
			parent_state.on_invalidate.borrow_mut().push(Box::new(move || {
				if let Some(child) = child.upgrade() {
					stop_state(&child);
				}
			}));
		}

		execute(&state);
		state.first_run.set(false);

		Self { state }
	}

	/// Whether the computation has been stopped.
	pub fn stopped(&self) -> bool {
		self.state.stopped.get()
	}

	/// Schedule a rerun, as if a read dependency had changed.
	pub fn invalidate(&self) {
		invalidate_state(&self.state);
	}

	/// Register a callback fired once on the next invalidation (or stop).
	pub fn on_invalidate<F>(&self, cb: F)
	where
		F: FnOnce() + 'static,
	{
		if self.state.stopped.get() || self.state.invalidated.get() {
			cb();
		} else {
			self.state.on_invalidate.borrow_mut().push(Box::new(cb));
		}
	}

	/// Stop the computation: it never reruns and its subscriptions are
	/// released. Idempotent.
	pub fn stop(&self) {
		stop_state(&self.state);
	}
}

impl Drop for Computation {
	fn drop(&mut self) {
		stop_state(&self.state);
	}
}

impl CompCtx<'_> {
	/// True only during the initial, construction-time run.
	pub fn first_run(&self) -> bool {
		self.state.first_run.get()
	}

	/// Stop the computation from inside its own closure.
	pub fn stop(&self) {
		stop_state(self.state);
	}

	/// Register a callback fired once on the next invalidation (or stop).
	pub fn on_invalidate<F>(&self, cb: F)
	where
		F: FnOnce() + 'static,
	{
		if self.state.stopped.get() || self.state.invalidated.get() {
			cb();
		} else {
			self.state.on_invalidate.borrow_mut().push(Box::new(cb));
		}
	}
}

fn lookup(id: NodeId) -> Option<Rc<CompState>> {
	STATES.with(|s| s.borrow().get(&id).and_then(Weak::upgrade))
}

pub(crate) fn invalidate_by_id(id: NodeId) {
	if let Some(state) = lookup(id) {
		invalidate_state(&state);
	}
}

fn invalidate_state(state: &Rc<CompState>) {
	if state.stopped.get() || state.invalidated.get() {
		return;
	}
	state.invalidated.set(true);
	fire_invalidate_callbacks(state);
	with_runtime(|rt| rt.schedule(state.id));
}

fn stop_state(state: &Rc<CompState>) {
	if state.stopped.get() {
		return;
	}
	state.stopped.set(true);
	fire_invalidate_callbacks(state);
	// Stop may run from a Drop during thread teardown; skip whatever
	// thread-local storage is already destroyed.
	try_with_runtime(|rt| {
		rt.clear_reads(state.id);
		rt.unschedule(state.id);
	});
	let _ = STATES.try_with(|s| {
		s.borrow_mut().remove(&state.id);
	});
	let _ = FUNCTIONS.try_with(|s| {
		s.borrow_mut().remove(&state.id);
	});
}

fn fire_invalidate_callbacks(state: &Rc<CompState>) {
	let callbacks = std::mem::take(&mut *state.on_invalidate.borrow_mut());
	for cb in callbacks {
		cb();
	}
}

/// Re-execute a scheduled computation. Called by the flush loop.
pub(crate) fn rerun(id: NodeId) {
	let Some(state) = lookup(id) else { return };
	if state.stopped.get() {
		return;
	}
	state.invalidated.set(false);
	execute(&state);
}

fn execute(state: &Rc<CompState>) {
	with_runtime(|rt| {
		rt.clear_reads(state.id);
		rt.push_observer(state.id);
	});

	// Take the closure out of storage for the duration of the call so the
	// closure itself may create or stop computations without re-borrowing.
	let func = FUNCTIONS.with(|s| s.borrow_mut().remove(&state.id));
	if let Some(mut func) = func {
		let ctx = CompCtx { state };
		func(&ctx);
		if !state.stopped.get() {
			FUNCTIONS.with(|s| {
				s.borrow_mut().insert(state.id, func);
			});
		}
	}

	with_runtime(|rt| rt.pop_observer());
}
