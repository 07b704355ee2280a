//! The router: route table, dispatch loop, and the reactive current
//! controller.
//!
//! Dispatch is first-match-wins over the registration order. Every
//! completed top-level dispatch invalidates [`Router::current`] exactly
//! once, even when redirects chain further dispatches inside it. A started
//! router also watches its [`LocationStore`] and dispatches on every path
//! change it did not itself cause.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use http::Method;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::RouterConfig;
use crate::context::RouteContext;
use crate::controller::{ControllerDef, ControllerRegistry, RouteController};
use crate::error::{Result, RouterError};
use crate::hooks::{Hook, HookCtl, HookFilter, HookFn, HookKind, HookRegistry};
use crate::middleware::{EntryOptions, MiddlewareStack, Next, StackOutcome};
use crate::navigation::{LocationStore, SetOptions};
use crate::params::{Params, ResolveParams};
use crate::pattern::ResolveOptions;
use crate::reactive::{Computation, Dependency, flush, nonreactive};
use crate::render::{RenderOptions, RenderSink};
use crate::route::{Route, RouteOptions};

/// Fallback invoked when no route matches a dispatched path.
pub type UnhandledFn = Rc<dyn Fn(&mut RouteContext)>;

pub(crate) struct RouterInner {
	config: RouterConfig,
	routes: RefCell<Vec<Rc<Route>>>,
	middleware: RefCell<MiddlewareStack>,
	global_hooks: RefCell<Vec<(HookKind, HookFilter, Hook)>>,
	controllers: RefCell<ControllerRegistry>,
	hook_registry: RefCell<HookRegistry>,
	current: RefCell<Option<Rc<RouteController>>>,
	current_dep: Dependency,
	dispatch_depth: Cell<usize>,
	pending_change: Cell<bool>,
	sink: RefCell<Option<Rc<dyn RenderSink>>>,
	location: RefCell<Option<Rc<dyn LocationStore>>>,
	location_comp: RefCell<Option<Computation>>,
	last_dispatched: RefCell<Option<String>>,
	started: Cell<bool>,
	unhandled: RefCell<Option<UnhandledFn>>,
}

impl RouterInner {
	pub(crate) fn config(&self) -> &RouterConfig {
		&self.config
	}

	pub(crate) fn sink(&self) -> Option<Rc<dyn RenderSink>> {
		self.sink.borrow().clone()
	}

	pub(crate) fn resolve_hook_name(&self, name: &str) -> Result<HookFn> {
		self.hook_registry
			.borrow()
			.lookup(name)
			.ok_or_else(|| RouterError::UnknownHook(name.to_string()))
	}

	/// Router-level hooks of one kind admitted for a route, in registration
	/// order.
	pub(crate) fn global_hooks_for(
		&self,
		kind: HookKind,
		route_name: &str,
		environment: crate::config::Where,
	) -> Vec<Hook> {
		self.global_hooks
			.borrow()
			.iter()
			.filter(|(k, filter, _)| *k == kind && filter.admits(route_name, environment))
			.map(|(_, _, hook)| hook.clone())
			.collect()
	}

	fn lookup(&self, name: &str) -> Option<Rc<Route>> {
		self.routes
			.borrow()
			.iter()
			.find(|route| route.name() == name)
			.cloned()
	}

	/// First registered route serving this environment that matches.
	fn find_route(&self, path: &str) -> Option<Rc<Route>> {
		self.routes
			.borrow()
			.iter()
			.find(|route| {
				route
					.where_()
					.map(|w| w == self.config.environment)
					.unwrap_or(true)
					&& route.matches(path)
			})
			.cloned()
	}

	/// Navigate to a path (leading `/`) or a route name.
	pub(crate) fn go(
		self: &Rc<Self>,
		target: &str,
		params: &ResolveParams,
		resolve_options: &ResolveOptions,
		set_options: &SetOptions,
	) -> Result<()> {
		let path = if target.starts_with('/') {
			target.to_string()
		} else {
			let route = self
				.lookup(target)
				.ok_or_else(|| RouterError::RouteNotFound(target.to_string()))?;
			route.path(params, resolve_options)?
		};

		let location = self.location.borrow().clone();
		if let Some(location) = location {
			location.set(&path, set_options);
			if self.location_comp.borrow().is_some() {
				// The location watcher picks the change up from here.
				flush();
				return Ok(());
			}
		}
		self.dispatch(&path, None, set_options.state.clone(), None)
	}

	pub(crate) fn dispatch(
		self: &Rc<Self>,
		path: &str,
		method: Option<Method>,
		state: Option<Value>,
		overrides: Option<RouteOptions>,
	) -> Result<()> {
		self.dispatch_depth.set(self.dispatch_depth.get() + 1);
		// Dispatch must not subscribe whatever computation triggered it, and
		// controller cycles must outlive that computation's reruns.
		let result = nonreactive(|| self.dispatch_inner(path, method, state, overrides));
		self.dispatch_depth.set(self.dispatch_depth.get() - 1);
		if self.dispatch_depth.get() == 0 {
			if self.pending_change.replace(false) {
				self.current_dep.changed();
			}
			flush();
		}
		result
	}

	fn dispatch_inner(
		self: &Rc<Self>,
		path: &str,
		method: Option<Method>,
		state: Option<Value>,
		overrides: Option<RouteOptions>,
	) -> Result<()> {
		debug!(path, "dispatching");
		*self.last_dispatched.borrow_mut() = Some(path.to_string());

		let mut ctx = RouteContext::new(path, self.config.environment);
		ctx.method = method;
		ctx.state = state;

		// Router middleware runs before matching; halting handles the
		// dispatch outright. Handlers get a snapshot of the stack so they
		// may mount more middleware without re-entering the borrow.
		let middleware = self.middleware.borrow().clone();
		if middleware.dispatch(path, &mut ctx) == StackOutcome::Halted {
			return Ok(());
		}

		match self.find_route(path) {
			Some(route) => self.run_route(route, ctx, overrides),
			None => {
				self.handle_unmatched(ctx);
				Ok(())
			}
		}
	}

	fn run_route(
		self: &Rc<Self>,
		route: Rc<Route>,
		mut ctx: RouteContext,
		overrides: Option<RouteOptions>,
	) -> Result<()> {
		ctx.route_name = Some(route.name().to_string());
		ctx.params = route.params_for(&ctx.path).unwrap_or_else(Params::new);

		// Same route still running: reconfigure instead of tearing down, so
		// the cycle reruns with the new params rather than restarting.
		// Per-run overrides are fixed at construction, so a dispatch that
		// carries them (or follows one that did) gets a fresh controller.
		let reusable = self
			.current
			.borrow()
			.as_ref()
			.filter(|c| {
				overrides.is_none()
					&& !c.has_overrides()
					&& !c.is_stopped()
					&& Rc::ptr_eq(c.route(), &route)
			})
			.cloned();
		if let Some(controller) = reusable {
			debug!(route = route.name(), "reusing running controller");
			controller.reconfigure(ctx);
			self.pending_change.set(true);
			return Ok(());
		}

		// Release the borrow before stop hooks run; they may look at the
		// router.
		let old = self.current.borrow_mut().take();
		if let Some(old) = old {
			old.stop_controller();
		}

		let def = route.resolve_controller(
			&self.controllers.borrow(),
			self.config.default_controller.as_deref(),
		)?;
		let controller = RouteController::new(self, Rc::clone(&route), def, ctx, overrides);
		*self.current.borrow_mut() = Some(Rc::clone(&controller));
		self.pending_change.set(true);
		controller.run_cycle()
	}

	fn handle_unmatched(self: &Rc<Self>, mut ctx: RouteContext) {
		warn!(path = %ctx.path, "no route matched");
		let old = self.current.borrow_mut().take();
		if let Some(old) = old {
			old.stop_controller();
			self.pending_change.set(true);
		}
		let unhandled = self.unhandled.borrow().clone();
		if let Some(unhandled) = unhandled {
			unhandled(&mut ctx);
			return;
		}
		if let Some(template) = &self.config.not_found_template
			&& let Some(sink) = self.sink()
		{
			sink.render(template, &RenderOptions::default());
		}
	}
}

/// The route-dispatch engine.
///
/// Cheap to clone; clones share the same route table and state.
#[derive(Clone)]
pub struct Router {
	inner: Rc<RouterInner>,
}

impl Router {
	pub fn new(config: RouterConfig) -> Self {
		Self {
			inner: Rc::new(RouterInner {
				config,
				routes: RefCell::new(Vec::new()),
				middleware: RefCell::new(MiddlewareStack::new()),
				global_hooks: RefCell::new(Vec::new()),
				controllers: RefCell::new(ControllerRegistry::new()),
				hook_registry: RefCell::new(HookRegistry::with_builtins()),
				current: RefCell::new(None),
				current_dep: Dependency::new(),
				dispatch_depth: Cell::new(0),
				pending_change: Cell::new(false),
				sink: RefCell::new(None),
				location: RefCell::new(None),
				location_comp: RefCell::new(None),
				last_dispatched: RefCell::new(None),
				started: Cell::new(false),
				unhandled: RefCell::new(None),
			}),
		}
	}

	pub fn config(&self) -> &RouterConfig {
		&self.inner.config
	}

	/// Register a route. Re-registering a name replaces the old route in
	/// place, preserving its position in the match order.
	pub fn route(&self, name: impl Into<String>, options: RouteOptions) -> Result<Rc<Route>> {
		let route = Route::new(name, options)?;
		let mut routes = self.inner.routes.borrow_mut();
		if let Some(pos) = routes.iter().position(|r| r.name() == route.name()) {
			debug!(route = route.name(), "route redefined in place");
			routes[pos] = Rc::clone(&route);
		} else {
			routes.push(Rc::clone(&route));
		}
		Ok(route)
	}

	pub fn lookup(&self, name: &str) -> Option<Rc<Route>> {
		self.inner.lookup(name)
	}

	pub fn routes(&self) -> Vec<Rc<Route>> {
		self.inner.routes.borrow().clone()
	}

	pub fn register_controller(&self, def: Rc<ControllerDef>) -> Result<()> {
		self.inner.controllers.borrow_mut().register(def)
	}

	/// Register a named hook for `Hook::Named` references.
	pub fn register_hook<F>(&self, name: impl Into<String>, hook: F)
	where
		F: Fn(&RouteController, &HookCtl) + 'static,
	{
		self.inner.hook_registry.borrow_mut().register(name, hook);
	}

	/// Attach a router-level lifecycle hook. Router-level hooks run after
	/// every route-level hook of the same kind.
	pub fn add_hook(&self, kind: HookKind, filter: HookFilter, hook: Hook) {
		self.inner.global_hooks.borrow_mut().push((kind, filter, hook));
	}

	/// Unfiltered router-level `on_before_action` hook.
	pub fn on_before_action<F>(&self, hook: F)
	where
		F: Fn(&RouteController, &HookCtl) + 'static,
	{
		self.add_hook(HookKind::OnBeforeAction, HookFilter::default(), Hook::func(hook));
	}

	/// Unfiltered router-level `on_after_action` hook.
	pub fn on_after_action<F>(&self, hook: F)
	where
		F: Fn(&RouteController, &HookCtl) + 'static,
	{
		self.add_hook(HookKind::OnAfterAction, HookFilter::default(), Hook::func(hook));
	}

	/// Mount router-level middleware, run before route matching on every
	/// dispatch. A `None` pattern matches every path.
	pub fn use_middleware<F>(&self, pattern: Option<&str>, handler: F, options: EntryOptions) -> Result<()>
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		self.inner.middleware.borrow_mut().push(pattern, handler, options)
	}

	/// Replace the unmatched-path fallback.
	pub fn on_unhandled<F>(&self, f: F)
	where
		F: Fn(&mut RouteContext) + 'static,
	{
		*self.inner.unhandled.borrow_mut() = Some(Rc::new(f));
	}

	/// Attach a render sink without starting location watching, for
	/// server-style dispatch.
	pub fn set_sink(&self, sink: Rc<dyn RenderSink>) {
		*self.inner.sink.borrow_mut() = Some(sink);
	}

	/// Dispatch a path through middleware and the route table.
	pub fn dispatch(&self, path: &str) -> Result<()> {
		self.inner.dispatch(path, None, None, None)
	}

	/// Dispatch with an HTTP method and navigation state attached.
	pub fn dispatch_with(&self, path: &str, method: Option<Method>, state: Option<Value>) -> Result<()> {
		self.inner.dispatch(path, method, state, None)
	}

	/// Dispatch with per-run route option overrides.
	///
	/// Override hooks run before every other hook tier; an override
	/// template, action, data function, layout, or `wait_on` takes
	/// precedence over the matched route's own options for this run only.
	pub fn dispatch_with_overrides(&self, path: &str, overrides: RouteOptions) -> Result<()> {
		self.inner.dispatch(path, None, None, Some(overrides))
	}

	/// Navigate to a path (leading `/`) or a named route.
	pub fn go(&self, target: &str) -> Result<()> {
		self.inner.go(
			target,
			&ResolveParams::new(),
			&ResolveOptions::default(),
			&SetOptions::default(),
		)
	}

	pub fn go_with(
		&self,
		target: &str,
		params: &ResolveParams,
		resolve_options: &ResolveOptions,
		set_options: &SetOptions,
	) -> Result<()> {
		self.inner.go(target, params, resolve_options, set_options)
	}

	/// Start watching the location store and dispatching its changes.
	pub fn start(&self, location: Rc<dyn LocationStore>, sink: Rc<dyn RenderSink>) -> Result<()> {
		if self.inner.started.replace(true) {
			warn!("router already started");
			return Ok(());
		}
		info!(environment = %self.inner.config.environment, "router started");
		*self.inner.sink.borrow_mut() = Some(sink);
		*self.inner.location.borrow_mut() = Some(Rc::clone(&location));

		let inner_weak = Rc::downgrade(&self.inner);
		let auto_start = self.inner.config.auto_start;
		let comp = Computation::new(move |cctx| {
			let Some(inner) = inner_weak.upgrade() else {
				cctx.stop();
				return;
			};
			let path = location.get();
			if cctx.first_run() && !auto_start {
				return;
			}
			if inner.last_dispatched.borrow().as_deref() == Some(path.as_str()) {
				return;
			}
			if let Err(err) = inner.dispatch(&path, None, None, None) {
				error!(path, error = %err, "dispatch failed");
			}
		});
		*self.inner.location_comp.borrow_mut() = Some(comp);
		Ok(())
	}

	/// Stop location watching and the current controller.
	pub fn stop(&self) {
		let comp = self.inner.location_comp.borrow_mut().take();
		if let Some(comp) = comp {
			comp.stop();
		}
		let controller = self.inner.current.borrow_mut().take();
		if let Some(controller) = controller {
			controller.stop_controller();
			self.inner.current_dep.changed();
		}
		self.inner.started.set(false);
		flush();
	}

	pub fn is_started(&self) -> bool {
		self.inner.started.get()
	}

	/// The controller serving the latest completed dispatch. Reactive:
	/// invalidates exactly once per completed top-level dispatch.
	pub fn current(&self) -> Option<Rc<RouteController>> {
		self.inner.current_dep.depend();
		self.inner.current.borrow().clone()
	}

	/// The route of the current controller. Reactive.
	pub fn current_route(&self) -> Option<Rc<Route>> {
		self.current().map(|c| Rc::clone(c.route()))
	}

	/// Generate a path for a named route.
	pub fn path_for(&self, name: &str, params: &ResolveParams, options: &ResolveOptions) -> Result<String> {
		let route = self
			.lookup(name)
			.ok_or_else(|| RouterError::RouteNotFound(name.to_string()))?;
		route.path(params, options)
	}

	/// Generate an absolute URL for a named route using the configured
	/// origin.
	pub fn url_for(&self, name: &str, params: &ResolveParams, options: &ResolveOptions) -> Result<String> {
		let origin = self
			.inner
			.config
			.origin
			.clone()
			.ok_or_else(|| RouterError::NavigationFailed("no origin configured".to_string()))?;
		let route = self
			.lookup(name)
			.ok_or_else(|| RouterError::RouteNotFound(name.to_string()))?;
		route.url(&origin, params, options)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::navigation::MemoryLocation;
	use crate::render::RecordingSink;
	use serial_test::serial;

	fn client_router() -> Router {
		Router::new(RouterConfig::new())
	}

	#[test]
	#[serial]
	fn test_route_redefinition_preserves_position() {
		let router = client_router();
		router.route("first", RouteOptions::new().path("/a")).unwrap();
		router.route("second", RouteOptions::new().path("/b")).unwrap();
		router.route("first", RouteOptions::new().path("/a2")).unwrap();

		let names: Vec<_> = router.routes().iter().map(|r| r.name().to_string()).collect();
		assert_eq!(names, vec!["first", "second"]);
		assert!(router.lookup("first").unwrap().matches("/a2"));
	}

	#[test]
	#[serial]
	fn test_first_match_wins() {
		let router = client_router();
		let sink = RecordingSink::new();
		router.set_sink(sink.clone());
		router
			.route("specific", RouteOptions::new().path("/posts/new").template("New"))
			.unwrap();
		router
			.route("generic", RouteOptions::new().path("/posts/:id").template("Show"))
			.unwrap();

		router.dispatch("/posts/new").unwrap();
		assert_eq!(sink.last_main_render(), Some("New".to_string()));
		assert_eq!(
			router.current().unwrap().route().name(),
			"specific"
		);

		router.dispatch("/posts/7").unwrap();
		assert_eq!(sink.last_main_render(), Some("Show".to_string()));
	}

	#[test]
	#[serial]
	fn test_unmatched_renders_not_found() {
		let mut config = RouterConfig::new();
		config.not_found_template = Some("NotFound".to_string());
		let router = Router::new(config);
		let sink = RecordingSink::new();
		router.set_sink(sink.clone());

		router.dispatch("/nowhere").unwrap();
		assert_eq!(sink.last_main_render(), Some("NotFound".to_string()));
		assert!(router.current().is_none());
	}

	#[test]
	#[serial]
	fn test_go_by_name_resolves_params() {
		let router = client_router();
		let sink = RecordingSink::new();
		router.set_sink(sink.clone());
		router
			.route("post.show", RouteOptions::new().path("/posts/:id"))
			.unwrap();

		router
			.go_with(
				"post.show",
				&ResolveParams::new().set("id", "42"),
				&ResolveOptions::default(),
				&SetOptions::default(),
			)
			.unwrap();
		let current = router.current().unwrap();
		assert_eq!(current.param("id").as_deref(), Some("42"));
	}

	#[test]
	#[serial]
	fn test_go_to_unknown_name_is_fatal() {
		let router = client_router();
		assert!(matches!(
			router.go("never.registered"),
			Err(RouterError::RouteNotFound(_))
		));
	}

	#[test]
	#[serial]
	fn test_start_dispatches_initial_location() {
		let router = client_router();
		let sink = RecordingSink::new();
		let location = MemoryLocation::new("/home");
		router
			.route("home", RouteOptions::new().template("Home"))
			.unwrap();

		router.start(location.clone(), sink.clone()).unwrap();
		flush();
		assert_eq!(sink.last_main_render(), Some("Home".to_string()));

		location.set("/home", &SetOptions::default());
		flush();
		// Same path again: the watcher does not re-dispatch.
		assert_eq!(sink.rendered_templates().len(), 1);
	}

	#[test]
	#[serial]
	fn test_url_for_requires_origin() {
		let router = client_router();
		router.route("home", RouteOptions::new()).unwrap();
		assert!(matches!(
			router.url_for("home", &ResolveParams::new(), &ResolveOptions::default()),
			Err(RouterError::NavigationFailed(_))
		));

		let mut config = RouterConfig::new();
		config.origin = Some("https://example.com".to_string());
		let router = Router::new(config);
		router.route("home", RouteOptions::new()).unwrap();
		assert_eq!(
			router
				.url_for("home", &ResolveParams::new(), &ResolveOptions::default())
				.unwrap(),
			"https://example.com/home"
		);
	}
}
