//! Thread-local reactive runtime.
//!
//! Tracks the observer stack (which computation is currently executing),
//! the dependency graph edges, and the queue of computations pending rerun.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{trace, warn};

/// Unique identifier for a reactive node (dependency or computation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
	pub(crate) fn next() -> Self {
		with_runtime(|rt| {
			let id = rt.next_id.get();
			rt.next_id.set(id + 1);
			NodeId(id)
		})
	}
}

/// Bail out of a runaway flush after this many reruns. A cooperative
/// system cannot prove termination; it can at least refuse to spin.
const MAX_FLUSH_ITERATIONS: usize = 10_000;

pub(crate) struct Runtime {
	next_id: Cell<u64>,
	/// Stack of currently executing computations, innermost last.
	observers: RefCell<Vec<NodeId>>,
	/// dependency id -> subscribed computation ids, in subscription order.
	subscribers: RefCell<HashMap<NodeId, Vec<NodeId>>>,
	/// computation id -> dependency ids it read during its last run.
	reads: RefCell<HashMap<NodeId, HashSet<NodeId>>>,
	/// Computations scheduled for rerun.
	pending: RefCell<VecDeque<NodeId>>,
	flushing: Cell<bool>,
}

thread_local! {
	static RUNTIME: Runtime = Runtime {
		next_id: Cell::new(1),
		observers: RefCell::new(Vec::new()),
		subscribers: RefCell::new(HashMap::new()),
		reads: RefCell::new(HashMap::new()),
		pending: RefCell::new(VecDeque::new()),
		flushing: Cell::new(false),
	};
}

pub(crate) fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
	RUNTIME.with(f)
}

/// Like [`with_runtime`], but a no-op once the thread-local runtime has
/// been destroyed. Drop implementations must go through this: reactive
/// nodes owned by other thread-locals can outlive the runtime during
/// thread teardown, and panicking in a destructor aborts the process.
pub(crate) fn try_with_runtime(f: impl FnOnce(&Runtime)) {
	let _ = RUNTIME.try_with(f);
}

impl Runtime {
	pub(crate) fn current_observer(&self) -> Option<NodeId> {
		self.observers.borrow().last().copied()
	}

	pub(crate) fn push_observer(&self, id: NodeId) {
		self.observers.borrow_mut().push(id);
	}

	pub(crate) fn pop_observer(&self) {
		self.observers.borrow_mut().pop();
	}

	/// Record that `observer` read `dep` during its current run.
	pub(crate) fn link(&self, dep: NodeId, observer: NodeId) {
		let mut subs = self.subscribers.borrow_mut();
		let entry = subs.entry(dep).or_default();
		if !entry.contains(&observer) {
			entry.push(observer);
		}
		self.reads
			.borrow_mut()
			.entry(observer)
			.or_default()
			.insert(dep);
	}

	/// Snapshot of the computations subscribed to `dep`.
	pub(crate) fn subscribers_of(&self, dep: NodeId) -> Vec<NodeId> {
		self.subscribers
			.borrow()
			.get(&dep)
			.cloned()
			.unwrap_or_default()
	}

	pub(crate) fn has_subscribers(&self, dep: NodeId) -> bool {
		self.subscribers
			.borrow()
			.get(&dep)
			.is_some_and(|s| !s.is_empty())
	}

	/// Drop every edge involving `observer`; called before a rerun and on stop.
	pub(crate) fn clear_reads(&self, observer: NodeId) {
		let deps = self.reads.borrow_mut().remove(&observer);
		if let Some(deps) = deps {
			let mut subs = self.subscribers.borrow_mut();
			for dep in deps {
				if let Some(list) = subs.get_mut(&dep) {
					list.retain(|id| *id != observer);
				}
			}
		}
	}

	/// Remove a dependency node entirely.
	pub(crate) fn remove_dependency(&self, dep: NodeId) {
		self.subscribers.borrow_mut().remove(&dep);
	}

	pub(crate) fn schedule(&self, id: NodeId) {
		let mut pending = self.pending.borrow_mut();
		if !pending.contains(&id) {
			pending.push_back(id);
		}
	}

	pub(crate) fn unschedule(&self, id: NodeId) {
		self.pending.borrow_mut().retain(|p| *p != id);
	}
}

/// Run `f` with no current observer.
///
/// Reactive reads inside `f` do not subscribe the calling computation, and
/// computations created inside `f` are not scoped to it.
pub fn nonreactive<T>(f: impl FnOnce() -> T) -> T {
	let saved = with_runtime(|rt| std::mem::take(&mut *rt.observers.borrow_mut()));
	let result = f();
	with_runtime(|rt| *rt.observers.borrow_mut() = saved);
	result
}

/// Drain the rerun queue, re-executing every invalidated computation.
///
/// Reentrant calls are no-ops; the outermost flush drains work queued
/// during the drain itself.
pub fn flush() {
	let already = with_runtime(|rt| {
		if rt.flushing.get() {
			true
		} else {
			rt.flushing.set(true);
			false
		}
	});
	if already {
		return;
	}

	let mut iterations = 0usize;
	loop {
		let next = with_runtime(|rt| rt.pending.borrow_mut().pop_front());
		let Some(id) = next else { break };
		iterations += 1;
		if iterations > MAX_FLUSH_ITERATIONS {
			warn!(
				iterations,
				"reactive flush exceeded iteration limit; possible invalidation loop"
			);
			with_runtime(|rt| rt.pending.borrow_mut().clear());
			break;
		}
		trace!(id = id.0, "rerunning invalidated computation");
		super::computation::rerun(id);
	}

	with_runtime(|rt| rt.flushing.set(false));
}
