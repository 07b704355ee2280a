//! Controller definitions and the per-dispatch run cycle.
//!
//! A [`ControllerDef`] is a reusable, named bundle of lifecycle hooks, an
//! action, named action methods, and rendering defaults, optionally
//! extending a parent definition. A [`RouteController`] is the per-dispatch
//! instance: it owns the run-cycle computation, the wait list, and the
//! running/paused/stopped state machine.
//!
//! Within one hook kind, hooks run in this order: instance option hooks,
//! definition-chain hooks (root first), hooks added on the instance, route
//! option hooks, then router-level hooks.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::Where;
use crate::context::RouteContext;
use crate::error::{Result, RouterError};
use crate::hooks::{Hook, HookCtl, HookFn, HookKind};
use crate::middleware::StackOutcome;
use crate::navigation::SetOptions;
use crate::params::{Params, ResolveParams};
use crate::pattern::ResolveOptions;
use crate::reactive::{CompCtx, Computation, ReactiveVar};
use crate::render::RenderOptions;
use crate::route::{DataFn, Route, RouteOptions};
use crate::router::RouterInner;
use crate::wait_list::{ReadyHandle, WaitList};

/// Readiness-source collector evaluated on every run of the cycle.
pub type WaitOn = Rc<dyn Fn(&RouteController) -> WaitInput>;

/// What a wait-on collector may produce.
#[derive(Clone)]
pub enum WaitInput {
	/// Nothing to wait on this run.
	None,
	Handle(Rc<dyn ReadyHandle>),
	Many(Vec<WaitInput>),
}

impl From<Rc<dyn ReadyHandle>> for WaitInput {
	fn from(handle: Rc<dyn ReadyHandle>) -> Self {
		Self::Handle(handle)
	}
}

pub(crate) fn collect_handles(input: &WaitInput, out: &mut Vec<Rc<dyn ReadyHandle>>) {
	match input {
		WaitInput::None => {}
		WaitInput::Handle(handle) => out.push(Rc::clone(handle)),
		WaitInput::Many(inputs) => {
			for input in inputs {
				collect_handles(input, out);
			}
		}
	}
}

/// A reusable controller definition.
///
/// Definitions form explicit inheritance chains through
/// [`parent`](Self::parent); there is no implicit lookup between them.
#[derive(Default)]
pub struct ControllerDef {
	name: Option<String>,
	parent: Option<Rc<ControllerDef>>,
	template: Option<String>,
	layout_template: Option<String>,
	loading_template: Option<String>,
	action: Option<Hook>,
	actions: HashMap<String, HookFn>,
	hooks: Vec<(HookKind, Hook)>,
	wait_on: Option<WaitOn>,
	data: Option<DataFn>,
}

impl ControllerDef {
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			..Self::default()
		}
	}

	pub fn anonymous() -> Self {
		Self::default()
	}

	/// The empty definition used when nothing resolves.
	pub(crate) fn base() -> Rc<Self> {
		Rc::new(Self::default())
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Extend another definition. Parent hooks run before this
	/// definition's own.
	pub fn parent(mut self, parent: Rc<ControllerDef>) -> Self {
		self.parent = Some(parent);
		self
	}

	pub fn template(mut self, template: impl Into<String>) -> Self {
		self.template = Some(template.into());
		self
	}

	pub fn layout_template(mut self, template: impl Into<String>) -> Self {
		self.layout_template = Some(template.into());
		self
	}

	pub fn loading_template(mut self, template: impl Into<String>) -> Self {
		self.loading_template = Some(template.into());
		self
	}

	pub fn action<F>(mut self, action: F) -> Self
	where
		F: Fn(&RouteController, &HookCtl) + 'static,
	{
		self.action = Some(Hook::func(action));
		self
	}

	/// Register a named action method, addressable from route options.
	pub fn action_method<F>(mut self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(&RouteController, &HookCtl) + 'static,
	{
		self.actions.insert(name.into(), Rc::new(f));
		self
	}

	pub fn on(mut self, kind: HookKind, hook: Hook) -> Self {
		self.hooks.push((kind, hook));
		self
	}

	pub fn wait_on<F>(mut self, f: F) -> Self
	where
		F: Fn(&RouteController) -> WaitInput + 'static,
	{
		self.wait_on = Some(Rc::new(f));
		self
	}

	pub fn data<F>(mut self, f: F) -> Self
	where
		F: Fn(&RouteController) -> Option<Value> + 'static,
	{
		self.data = Some(Rc::new(f));
		self
	}

	/// The definition chain, root first.
	fn chain(self: &Rc<Self>) -> Vec<Rc<ControllerDef>> {
		let mut chain = Vec::new();
		let mut cursor = Some(Rc::clone(self));
		while let Some(def) = cursor {
			cursor = def.parent.clone();
			chain.push(def);
		}
		chain.reverse();
		chain
	}

	/// Hooks of one kind across the chain, root first, declaration order
	/// preserved within each definition.
	fn chain_hooks(self: &Rc<Self>, kind: HookKind) -> Vec<Hook> {
		self.chain()
			.iter()
			.flat_map(|def| {
				def.hooks
					.iter()
					.filter(|(k, _)| *k == kind)
					.map(|(_, h)| h.clone())
					.collect::<Vec<_>>()
			})
			.collect()
	}

	/// Leaf-most `Some` across the chain.
	fn chain_first<T, F>(self: &Rc<Self>, pick: F) -> Option<T>
	where
		F: Fn(&ControllerDef) -> Option<T>,
	{
		let mut cursor = Some(Rc::clone(self));
		while let Some(def) = cursor {
			if let Some(value) = pick(&def) {
				return Some(value);
			}
			cursor = def.parent.clone();
		}
		None
	}

	fn chain_action(self: &Rc<Self>) -> Option<Hook> {
		self.chain_first(|def| def.action.clone())
	}

	fn chain_action_method(self: &Rc<Self>, name: &str) -> Option<HookFn> {
		self.chain_first(|def| def.actions.get(name).cloned())
	}

	fn chain_wait_ons(self: &Rc<Self>) -> Vec<WaitOn> {
		self.chain()
			.iter()
			.filter_map(|def| def.wait_on.clone())
			.collect()
	}
}

/// Registry of named controller definitions.
#[derive(Default)]
pub struct ControllerRegistry {
	defs: HashMap<String, Rc<ControllerDef>>,
}

impl ControllerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a definition under its own name. Anonymous definitions
	/// cannot be registered.
	pub fn register(&mut self, def: Rc<ControllerDef>) -> Result<()> {
		let name = def
			.name()
			.ok_or(RouterError::InvalidConstruction)?
			.to_string();
		if self.defs.insert(name.clone(), def).is_some() {
			debug!(controller = %name, "controller definition replaced");
		}
		Ok(())
	}

	pub fn lookup(&self, name: &str) -> Option<Rc<ControllerDef>> {
		self.defs.get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.defs.contains_key(name)
	}
}

/// Outcome of running one hook group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupOutcome {
	Completed,
	Paused,
}

/// Per-dispatch controller instance.
///
/// Created by the router when a route matches; reruns of its cycle are
/// driven by reactive invalidation (params, readiness, anything the hooks
/// read). A stopped controller never reruns.
pub struct RouteController {
	router: Weak<RouterInner>,
	route: Rc<Route>,
	def: Rc<ControllerDef>,
	overrides: Option<RouteOptions>,
	ctx: RefCell<RouteContext>,
	params: ReactiveVar<Params>,
	wait_list: WaitList,
	running: Cell<bool>,
	stopped: Cell<bool>,
	paused: Cell<bool>,
	in_hook: Cell<bool>,
	cycle: RefCell<Option<Computation>>,
	instance_hooks: RefCell<Vec<(HookKind, Hook)>>,
	data: RefCell<Option<Value>>,
	rendered_regions: RefCell<Vec<String>>,
	last_layout: RefCell<Option<String>>,
}

impl RouteController {
	pub(crate) fn new(
		router: &Rc<RouterInner>,
		route: Rc<Route>,
		def: Rc<ControllerDef>,
		ctx: RouteContext,
		overrides: Option<RouteOptions>,
	) -> Rc<Self> {
		let params = ReactiveVar::new(ctx.params.clone());
		Rc::new(Self {
			router: Rc::downgrade(router),
			route,
			def,
			overrides,
			ctx: RefCell::new(ctx),
			params,
			wait_list: WaitList::new(),
			running: Cell::new(false),
			stopped: Cell::new(false),
			paused: Cell::new(false),
			in_hook: Cell::new(false),
			cycle: RefCell::new(None),
			instance_hooks: RefCell::new(Vec::new()),
			data: RefCell::new(None),
			rendered_regions: RefCell::new(Vec::new()),
			last_layout: RefCell::new(None),
		})
	}

	pub fn route(&self) -> &Rc<Route> {
		&self.route
	}

	pub fn definition(&self) -> &Rc<ControllerDef> {
		&self.def
	}

	pub(crate) fn has_overrides(&self) -> bool {
		self.overrides.is_some()
	}

	/// Snapshot of the dispatch context.
	pub fn context(&self) -> RouteContext {
		self.ctx.borrow().clone()
	}

	/// Current params. Reactive: reading inside the cycle subscribes it to
	/// reconfiguration.
	pub fn params(&self) -> Params {
		self.params.get()
	}

	/// One named param, reactively.
	pub fn param(&self, name: &str) -> Option<String> {
		self.params.get().get(name).map(str::to_string)
	}

	pub fn is_running(&self) -> bool {
		self.running.get()
	}

	pub fn is_stopped(&self) -> bool {
		self.stopped.get()
	}

	pub fn is_paused(&self) -> bool {
		self.paused.get()
	}

	/// Aggregate readiness of everything waited on this cycle. Reactive.
	pub fn ready(&self) -> bool {
		self.wait_list.ready()
	}

	/// Add a readiness source for the remainder of the current cycle.
	pub fn wait(&self, handle: Rc<dyn ReadyHandle>) {
		self.wait_list.wait(handle);
	}

	/// Value produced by the data function this cycle, if any.
	pub fn data(&self) -> Option<Value> {
		self.data.borrow().clone()
	}

	pub fn set_data(&self, data: Option<Value>) {
		*self.data.borrow_mut() = data;
	}

	/// Add a lifecycle hook on this instance; it runs after
	/// definition-chain hooks and before route option hooks.
	pub fn add_hook(&self, kind: HookKind, hook: Hook) {
		self.instance_hooks.borrow_mut().push((kind, hook));
	}

	/// Emit a render instruction through the router's sink.
	pub fn render(&self, template: &str, options: Option<RenderOptions>) {
		let Some(router) = self.router.upgrade() else {
			warn!(template, "render after router dropped");
			return;
		};
		let Some(sink) = router.sink() else {
			warn!(template, "render before router start");
			return;
		};
		let options = options.unwrap_or_default();
		if let Some(region) = &options.to {
			let mut regions = self.rendered_regions.borrow_mut();
			if !regions.iter().any(|r| r == region) {
				regions.push(region.clone());
			}
		}
		sink.render(template, &options);
	}

	/// Template the default action renders: per-run override, then route
	/// option, then definition chain, then the classified route name.
	pub fn resolved_template(&self) -> String {
		self.overrides
			.as_ref()
			.and_then(|o| o.template.clone())
			.or_else(|| self.route.options().template.clone())
			.or_else(|| self.def.chain_first(|def| def.template.clone()))
			.unwrap_or_else(|| self.route.effective_template())
	}

	/// The loading template in effect: route, then definition chain, then
	/// router config.
	pub fn loading_template(&self) -> Option<String> {
		if let Some(template) = &self.route.options().loading_template {
			return Some(template.clone());
		}
		if let Some(template) = self.def.chain_first(|def| def.loading_template.clone()) {
			return Some(template);
		}
		self.router
			.upgrade()
			.and_then(|router| router.config().loading_template.clone())
	}

	/// Start the run cycle. Fails when one is already active.
	pub(crate) fn run_cycle(self: &Rc<Self>) -> Result<()> {
		if self.running.get() {
			return Err(RouterError::AlreadyRunning);
		}
		if self.router.upgrade().is_none() {
			return Err(RouterError::InvalidConstruction);
		}
		self.running.set(true);
		self.stopped.set(false);

		let first_err: Rc<RefCell<Option<RouterError>>> = Rc::new(RefCell::new(None));
		// The controller owns the computation; a weak capture keeps the
		// closure from owning the controller back.
		let this = Rc::downgrade(self);
		let err_slot = Rc::clone(&first_err);
		let comp = Computation::new(move |cctx| {
			let Some(this) = this.upgrade() else {
				cctx.stop();
				return;
			};
			if this.stopped.get() {
				cctx.stop();
				return;
			}
			this.paused.set(false);
			if let Err(err) = this.cycle_body(cctx) {
				cctx.stop();
				if cctx.first_run() {
					*err_slot.borrow_mut() = Some(err);
				} else {
					error!(route = this.route.name(), error = %err, "run cycle failed");
					this.stop_controller();
				}
			}
		});
		// A hook may have stopped the controller during the first run.
		if self.stopped.get() {
			comp.stop();
		}
		*self.cycle.borrow_mut() = Some(comp);

		let err = first_err.borrow_mut().take();
		if let Some(err) = err {
			self.stop_controller();
			return Err(err);
		}
		Ok(())
	}

	/// Point an already running controller at a new dispatch of the same
	/// route. The params change invalidates the cycle.
	pub(crate) fn reconfigure(&self, ctx: RouteContext) {
		let params = ctx.params.clone();
		*self.ctx.borrow_mut() = ctx;
		self.params.set(params);
	}

	fn cycle_body(self: &Rc<Self>, cctx: &CompCtx<'_>) -> Result<()> {
		// Subscribe to reconfiguration and refresh the dispatch context.
		let params = self.params.get();
		let path = {
			let mut ctx = self.ctx.borrow_mut();
			ctx.params = params;
			ctx.path.clone()
		};

		self.rebuild_wait_list();
		self.sync_layout();

		if cctx.first_run() {
			if self.run_hook_group(HookKind::OnRun)? == GroupOutcome::Paused {
				return Ok(());
			}
		} else if self.run_hook_group(HookKind::OnRerun)? == GroupOutcome::Paused {
			return Ok(());
		}
		if self.stopped.get() {
			return Ok(());
		}

		if self.run_hook_group(HookKind::OnBeforeAction)? == GroupOutcome::Paused {
			return Ok(());
		}
		if self.stopped.get() {
			return Ok(());
		}

		if self.dispatch_stack(|ctx| self.route.dispatch_before(&path, ctx)) == StackOutcome::Halted {
			return Ok(());
		}
		if self.stopped.get() {
			return Ok(());
		}

		self.evaluate_data();
		self.invoke_action(&path)?;
		if self.stopped.get() {
			return Ok(());
		}

		self.dispatch_stack(|ctx| self.route.dispatch_after(&path, ctx));
		self.run_hook_group(HookKind::OnAfterAction)?;
		Ok(())
	}

	/// Run a middleware stack against a context snapshot, writing the
	/// snapshot back afterwards.
	fn dispatch_stack<F>(&self, f: F) -> StackOutcome
	where
		F: FnOnce(&mut RouteContext) -> StackOutcome,
	{
		let mut ctx = self.ctx.borrow().clone();
		let outcome = f(&mut ctx);
		*self.ctx.borrow_mut() = ctx;
		outcome
	}

	fn rebuild_wait_list(self: &Rc<Self>) {
		self.wait_list.clear();
		let mut collectors: Vec<WaitOn> = Vec::new();
		if let Some(router) = self.router.upgrade()
			&& let Some(wait_on) = &router.config().wait_on
		{
			collectors.push(Rc::clone(wait_on));
		}
		collectors.extend(self.def.chain_wait_ons());
		if let Some(wait_on) = &self.route.options().wait_on {
			collectors.push(Rc::clone(wait_on));
		}
		if let Some(overrides) = &self.overrides
			&& let Some(wait_on) = &overrides.wait_on
		{
			collectors.push(Rc::clone(wait_on));
		}

		let mut handles = Vec::new();
		for collector in collectors {
			collect_handles(&collector(self), &mut handles);
		}
		for handle in handles {
			self.wait_list.wait(handle);
		}
	}

	/// Tell the sink about the effective layout when it changes.
	fn sync_layout(&self) {
		let layout = self
			.overrides
			.as_ref()
			.and_then(|o| o.layout_template.clone())
			.or_else(|| self.route.options().layout_template.clone())
			.or_else(|| self.def.chain_first(|def| def.layout_template.clone()))
			.or_else(|| {
				self.router
					.upgrade()
					.and_then(|router| router.config().layout_template.clone())
			});
		let Some(layout) = layout else { return };
		if self.last_layout.borrow().as_deref() == Some(layout.as_str()) {
			return;
		}
		if let Some(router) = self.router.upgrade()
			&& let Some(sink) = router.sink()
		{
			sink.set_layout(&layout);
		}
		*self.last_layout.borrow_mut() = Some(layout);
	}

	fn evaluate_data(self: &Rc<Self>) {
		let data_fn = self
			.overrides
			.as_ref()
			.and_then(|o| o.data.clone())
			.or_else(|| self.route.options().data.clone())
			.or_else(|| self.def.chain_first(|def| def.data.clone()));
		if let Some(data_fn) = data_fn {
			*self.data.borrow_mut() = data_fn(self);
		}
	}

	/// Hooks of one kind in precedence order.
	fn collect_hooks(&self, kind: HookKind) -> Vec<Hook> {
		let mut hooks = Vec::new();
		if let Some(overrides) = &self.overrides {
			hooks.extend(
				overrides
					.hooks
					.iter()
					.filter(|(k, _)| *k == kind)
					.map(|(_, h)| h.clone()),
			);
		}
		hooks.extend(self.def.chain_hooks(kind));
		hooks.extend(
			self.instance_hooks
				.borrow()
				.iter()
				.filter(|(k, _)| *k == kind)
				.map(|(_, h)| h.clone()),
		);
		hooks.extend(
			self.route
				.options()
				.hooks
				.iter()
				.filter(|(k, _)| *k == kind)
				.map(|(_, h)| h.clone()),
		);
		if let Some(router) = self.router.upgrade() {
			let environment = self.ctx.borrow().environment;
			hooks.extend(router.global_hooks_for(kind, self.route.name(), environment));
		}
		hooks
	}

	/// Run the hooks of one kind in precedence order, with any extra hooks
	/// appended after the collected ones. Returns `true` when a hook paused
	/// the sequence.
	pub fn run_hooks(self: &Rc<Self>, kind: HookKind, extra: &[Hook]) -> Result<bool> {
		let mut hooks = self.collect_hooks(kind);
		hooks.extend(extra.iter().cloned());
		if hooks.is_empty() {
			return Ok(false);
		}
		let ctl = HookCtl::new();
		self.in_hook.set(true);
		let outcome = self.run_hooks_inner(&hooks, &ctl);
		self.in_hook.set(false);
		outcome?;
		if ctl.is_paused() {
			self.paused.set(true);
			debug!(route = self.route.name(), kind = %kind, "hook paused the sequence");
			return Ok(true);
		}
		Ok(false)
	}

	fn run_hook_group(self: &Rc<Self>, kind: HookKind) -> Result<GroupOutcome> {
		if self.run_hooks(kind, &[])? {
			Ok(GroupOutcome::Paused)
		} else {
			Ok(GroupOutcome::Completed)
		}
	}

	fn run_hooks_inner(self: &Rc<Self>, hooks: &[Hook], ctl: &HookCtl) -> Result<()> {
		for hook in hooks {
			if self.stopped.get() {
				break;
			}
			let f = self.resolve_hook(hook)?;
			f(self, ctl);
			if ctl.is_paused() {
				break;
			}
		}
		Ok(())
	}

	fn resolve_hook(&self, hook: &Hook) -> Result<HookFn> {
		match hook {
			Hook::Fn(f) => Ok(Rc::clone(f)),
			Hook::Named(name) => {
				let router = self
					.router
					.upgrade()
					.ok_or(RouterError::InvalidConstruction)?;
				router.resolve_hook_name(name)
			}
		}
	}

	fn invoke_action(self: &Rc<Self>, path: &str) -> Result<()> {
		// Per-verb handlers mounted on the route win when one handles the
		// dispatch.
		if self.dispatch_stack(|ctx| self.route.dispatch_action_stack(path, ctx)) == StackOutcome::Halted {
			return Ok(());
		}

		let spec = self
			.overrides
			.as_ref()
			.and_then(|o| o.action.clone())
			.or_else(|| self.route.options().action.clone())
			.or_else(|| self.def.chain_action());

		let action: Option<HookFn> = match spec {
			Some(Hook::Fn(f)) => Some(f),
			Some(Hook::Named(name)) => Some(
				self.def
					.chain_action_method(&name)
					.ok_or_else(|| RouterError::UndefinedAction(name.clone()))?,
			),
			None => None,
		};

		match action {
			Some(action) => {
				let ctl = HookCtl::new();
				self.in_hook.set(true);
				action(self, &ctl);
				self.in_hook.set(false);
				Ok(())
			}
			None => {
				let auto_render = self
					.router
					.upgrade()
					.map(|router| router.config().auto_render)
					.unwrap_or(true);
				if auto_render {
					self.render(
						&self.resolved_template(),
						Some(RenderOptions {
							to: None,
							data: self.data(),
						}),
					);
					Ok(())
				} else {
					Err(RouterError::UndefinedAction(self.route.name().to_string()))
				}
			}
		}
	}

	/// Stop this controller: no further reruns, wait list released, stop
	/// hooks run once.
	pub fn stop(&self) {
		if self.in_hook.get() && !self.stopped.get() {
			warn!(
				route = self.route.name(),
				"controller stopped from inside a hook; remaining hooks are skipped"
			);
		}
		self.stop_controller();
	}

	pub(crate) fn stop_controller(&self) {
		if self.stopped.replace(true) {
			return;
		}
		if let Some(comp) = self.cycle.borrow_mut().take() {
			comp.stop();
		}
		self.run_stop_hooks();
		self.wait_list.clear();
		self.clear_regions();
		self.running.set(false);
		self.paused.set(false);
	}

	fn run_stop_hooks(&self) {
		let hooks = self.collect_hooks(HookKind::OnStop);
		if hooks.is_empty() {
			return;
		}
		// Resolve eagerly so one unknown name cannot skip the rest silently.
		let mut resolved = Vec::with_capacity(hooks.len());
		for hook in &hooks {
			match self.resolve_hook(hook) {
				Ok(f) => resolved.push(f),
				Err(err) => error!(route = self.route.name(), error = %err, "stop hook skipped"),
			}
		}
		// Stop can arrive from inside another hook; restore that scope's
		// flag instead of clearing it.
		let ctl = HookCtl::new();
		let was_in_hook = self.in_hook.replace(true);
		for f in resolved {
			f(self, &ctl);
		}
		self.in_hook.set(was_in_hook);
	}

	fn clear_regions(&self) {
		let regions = std::mem::take(&mut *self.rendered_regions.borrow_mut());
		if regions.is_empty() {
			return;
		}
		if let Some(router) = self.router.upgrade()
			&& let Some(sink) = router.sink()
		{
			for region in regions {
				sink.clear_region(&region);
			}
		}
	}

	/// Stop this controller and navigate elsewhere.
	pub fn redirect(
		&self,
		target: &str,
		params: &ResolveParams,
		options: &ResolveOptions,
	) -> Result<()> {
		let router = self
			.router
			.upgrade()
			.ok_or(RouterError::InvalidConstruction)?;
		self.stop_controller();
		router.go(target, params, options, &SetOptions::default())
	}

	/// Execution context of the dispatch this controller serves.
	pub fn environment(&self) -> Where {
		self.ctx.borrow().environment
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::wait_list::ReadyFlag;

	#[test]
	fn test_chain_is_root_first() {
		let root = Rc::new(ControllerDef::named("Root").on(HookKind::OnRun, Hook::func(|_, _| {})));
		let mid = Rc::new(
			ControllerDef::named("Mid")
				.parent(Rc::clone(&root))
				.on(HookKind::OnRun, Hook::func(|_, _| {})),
		);
		let leaf = Rc::new(ControllerDef::named("Leaf").parent(Rc::clone(&mid)));

		let chain = leaf.chain();
		let names: Vec<_> = chain.iter().map(|d| d.name().unwrap().to_string()).collect();
		assert_eq!(names, vec!["Root", "Mid", "Leaf"]);
		assert_eq!(leaf.chain_hooks(HookKind::OnRun).len(), 2);
	}

	#[test]
	fn test_chain_first_prefers_leaf() {
		let root = Rc::new(ControllerDef::named("Root").template("RootTemplate"));
		let leaf = Rc::new(
			ControllerDef::named("Leaf")
				.parent(Rc::clone(&root))
				.template("LeafTemplate"),
		);
		assert_eq!(
			leaf.chain_first(|d| d.template.clone()),
			Some("LeafTemplate".to_string())
		);

		let bare = Rc::new(ControllerDef::named("Bare").parent(root));
		assert_eq!(
			bare.chain_first(|d| d.template.clone()),
			Some("RootTemplate".to_string())
		);
	}

	#[test]
	fn test_registry_rejects_anonymous() {
		let mut registry = ControllerRegistry::new();
		assert!(matches!(
			registry.register(Rc::new(ControllerDef::anonymous())),
			Err(RouterError::InvalidConstruction)
		));
		registry
			.register(Rc::new(ControllerDef::named("PostController")))
			.unwrap();
		assert!(registry.contains("PostController"));
	}

	#[test]
	fn test_collect_handles_flattens() {
		let a: Rc<dyn ReadyHandle> = ReadyFlag::new(true);
		let b: Rc<dyn ReadyHandle> = ReadyFlag::new(false);
		let input = WaitInput::Many(vec![
			WaitInput::Handle(a),
			WaitInput::None,
			WaitInput::Many(vec![WaitInput::Handle(b)]),
		]);
		let mut out = Vec::new();
		collect_handles(&input, &mut out);
		assert_eq!(out.len(), 2);
	}

	#[test]
	fn test_chain_action_method_lookup() {
		let root = Rc::new(ControllerDef::named("Root").action_method("show", |_, _| {}));
		let leaf = Rc::new(ControllerDef::named("Leaf").parent(root));
		assert!(leaf.chain_action_method("show").is_some());
		assert!(leaf.chain_action_method("missing").is_none());
	}
}
