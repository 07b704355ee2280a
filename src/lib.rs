//! Reactive client/server route-dispatch engine.
//!
//! Routes are compiled path patterns with lifecycle hooks and middleware
//! stacks attached. Dispatching a path picks the first matching route,
//! instantiates a [`controller::RouteController`] for it, and runs the
//! controller's cycle inside a reactive computation, so params changes,
//! readiness transitions, and anything else the hooks read rerun the cycle
//! automatically. Rendering and URL/history management stay outside the
//! engine, behind [`render::RenderSink`] and [`navigation::LocationStore`].
//!
//! The reactive substrate is thread-local and single-threaded; server-side
//! use runs one engine per request thread.

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod hooks;
pub mod middleware;
pub mod navigation;
pub mod params;
pub mod pattern;
pub mod reactive;
pub mod render;
pub mod route;
pub mod router;
pub mod wait_list;

pub use error::{Result, RouterError};
pub use router::Router;

/// Commonly used types.
pub mod prelude {
	pub use crate::config::{RouterConfig, Where};
	pub use crate::context::RouteContext;
	pub use crate::controller::{ControllerDef, RouteController, WaitInput};
	pub use crate::error::{Result, RouterError};
	pub use crate::hooks::{Hook, HookCtl, HookFilter, HookKind};
	pub use crate::middleware::{EntryOptions, MiddlewareStack, Next, StackOutcome};
	pub use crate::navigation::{LocationStore, MemoryLocation, SetOptions};
	pub use crate::params::{Params, ResolveParams};
	pub use crate::pattern::{PathPattern, ResolveOptions};
	pub use crate::render::{RecordingSink, RenderOptions, RenderSink};
	pub use crate::route::{Route, RouteOptions};
	pub use crate::router::Router;
	pub use crate::wait_list::{ReadyFlag, ReadyHandle, WaitList};
}
