//! Named routes: a compiled pattern plus configuration and handler stacks.
//!
//! A [`Route`] owns one [`PathPattern`], a bag of [`RouteOptions`], and
//! three middleware stacks. The before and after stacks wrap the action
//! within a controller run; the action stack holds per-verb handlers for
//! server-style dispatch and wins over the resolved controller action
//! whenever one of its entries handles the dispatch.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use http::Method;
use serde_json::Value;

use crate::config::{CacheRule, Where};
use crate::context::RouteContext;
use crate::controller::{ControllerDef, ControllerRegistry, RouteController, WaitOn};
use crate::error::{Result, RouterError};
use crate::hooks::{Hook, HookKind};
use crate::middleware::{EntryOptions, MiddlewareStack, Next};
use crate::params::{Params, ResolveParams};
use crate::pattern::{PathPattern, ResolveOptions};

/// Route-level data function, evaluated reactively inside the run cycle.
pub type DataFn = Rc<dyn Fn(&RouteController) -> Option<Value>>;

/// How a route names its controller.
#[derive(Clone)]
pub enum ControllerSpec {
	/// A controller definition attached directly.
	Def(Rc<ControllerDef>),
	/// A name resolved through the router's controller registry.
	Named(String),
}

impl fmt::Debug for ControllerSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Def(def) => f.debug_tuple("ControllerSpec::Def").field(&def.name()).finish(),
			Self::Named(name) => f.debug_tuple("ControllerSpec::Named").field(name).finish(),
		}
	}
}

/// Per-route options.
///
/// Built fluently; every setter consumes and returns the builder. Lifecycle
/// hooks registered here run after controller-definition hooks and before
/// router-level hooks of the same kind.
#[derive(Clone, Default)]
pub struct RouteOptions {
	pub(crate) path: Option<String>,
	pub(crate) template: Option<String>,
	pub(crate) layout_template: Option<String>,
	pub(crate) loading_template: Option<String>,
	pub(crate) controller: Option<ControllerSpec>,
	pub(crate) where_: Option<Where>,
	pub(crate) action: Option<Hook>,
	pub(crate) wait_on: Option<WaitOn>,
	pub(crate) hooks: Vec<(HookKind, Hook)>,
	pub(crate) data: Option<DataFn>,
	pub(crate) strict: bool,
	pub(crate) sensitive: bool,
	pub(crate) cache: Option<CacheRule>,
	pub(crate) extra: Vec<(String, Value)>,
}

impl RouteOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Path template. Defaults to `/<route name>` when omitted.
	pub fn path(mut self, template: impl Into<String>) -> Self {
		self.path = Some(template.into());
		self
	}

	/// Template rendered by the default action. Defaults to the classified
	/// route name.
	pub fn template(mut self, template: impl Into<String>) -> Self {
		self.template = Some(template.into());
		self
	}

	/// Layout template overriding the router-wide one.
	pub fn layout_template(mut self, template: impl Into<String>) -> Self {
		self.layout_template = Some(template.into());
		self
	}

	/// Template the built-in `loading` hook renders for this route.
	pub fn loading_template(mut self, template: impl Into<String>) -> Self {
		self.loading_template = Some(template.into());
		self
	}

	pub fn controller(mut self, def: Rc<ControllerDef>) -> Self {
		self.controller = Some(ControllerSpec::Def(def));
		self
	}

	/// Name a registered controller. Resolution failure at dispatch time is
	/// fatal.
	pub fn controller_named(mut self, name: impl Into<String>) -> Self {
		self.controller = Some(ControllerSpec::Named(name.into()));
		self
	}

	/// Restrict the route to one execution context.
	pub fn where_(mut self, where_: Where) -> Self {
		self.where_ = Some(where_);
		self
	}

	/// Main action, overriding any controller-defined action.
	pub fn action<F>(mut self, action: F) -> Self
	where
		F: Fn(&RouteController, &crate::hooks::HookCtl) + 'static,
	{
		self.action = Some(Hook::func(action));
		self
	}

	/// Name a controller action method as the main action.
	pub fn action_named(mut self, name: impl Into<String>) -> Self {
		self.action = Some(Hook::Named(name.into()));
		self
	}

	/// Readiness sources collected into the controller's wait list.
	pub fn wait_on(mut self, wait_on: WaitOn) -> Self {
		self.wait_on = Some(wait_on);
		self
	}

	/// Register a lifecycle hook under a canonical kind.
	pub fn on(mut self, kind: HookKind, hook: Hook) -> Self {
		self.hooks.push((kind, hook));
		self
	}

	/// Register a lifecycle hook by kind name; legacy aliases (`load`,
	/// `before`, `after`, `unload`) are accepted with a deprecation notice.
	pub fn hook(self, kind_name: &str, hook: Hook) -> Result<Self> {
		let kind = HookKind::normalize(kind_name)
			.ok_or_else(|| RouterError::UnknownHook(kind_name.to_string()))?;
		Ok(self.on(kind, hook))
	}

	/// Shorthand for an `on_before_action` hook.
	pub fn before<F>(self, hook: F) -> Self
	where
		F: Fn(&RouteController, &crate::hooks::HookCtl) + 'static,
	{
		self.on(HookKind::OnBeforeAction, Hook::func(hook))
	}

	/// Shorthand for an `on_after_action` hook.
	pub fn after<F>(self, hook: F) -> Self
	where
		F: Fn(&RouteController, &crate::hooks::HookCtl) + 'static,
	{
		self.on(HookKind::OnAfterAction, Hook::func(hook))
	}

	/// Data function whose result is published on the controller.
	pub fn data<F>(mut self, f: F) -> Self
	where
		F: Fn(&RouteController) -> Option<Value> + 'static,
	{
		self.data = Some(Rc::new(f));
		self
	}

	/// Require a trailing-slash-exact match.
	pub fn strict(mut self, strict: bool) -> Self {
		self.strict = strict;
		self
	}

	/// Match case-sensitively.
	pub fn sensitive(mut self, sensitive: bool) -> Self {
		self.sensitive = sensitive;
		self
	}

	/// Subscription caching policy passed through to the application.
	pub fn cache(mut self, rule: CacheRule) -> Self {
		self.cache = Some(rule);
		self
	}

	/// Attach an unrecognized option for application-level use.
	pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
		self.extra.push((key.into(), value));
		self
	}
}

/// A named route.
pub struct Route {
	name: String,
	pattern: PathPattern,
	options: RouteOptions,
	before: RefCell<MiddlewareStack>,
	action_stack: RefCell<MiddlewareStack>,
	after: RefCell<MiddlewareStack>,
}

impl Route {
	/// Build a route. The pattern is compiled once, here; compilation
	/// failures surface immediately rather than at dispatch time.
	pub fn new(name: impl Into<String>, options: RouteOptions) -> Result<Rc<Self>> {
		let name = name.into();
		let template = match &options.path {
			Some(path) => path.clone(),
			None => format!("/{name}"),
		};
		let pattern = PathPattern::compile_with(&template, options.strict, options.sensitive)?;
		Ok(Rc::new(Self {
			name,
			pattern,
			options,
			before: RefCell::new(MiddlewareStack::new()),
			action_stack: RefCell::new(MiddlewareStack::new()),
			after: RefCell::new(MiddlewareStack::new()),
		}))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	pub fn options(&self) -> &RouteOptions {
		&self.options
	}

	/// Execution context this route serves, if restricted.
	pub fn where_(&self) -> Option<Where> {
		self.options.where_
	}

	/// Template rendered by the default action: the configured one, or the
	/// classified route name.
	pub fn effective_template(&self) -> String {
		self.options
			.template
			.clone()
			.unwrap_or_else(|| classify(&self.name))
	}

	pub fn matches(&self, path: &str) -> bool {
		self.pattern.test(path)
	}

	/// Decoded params for a matching path.
	pub fn params_for(&self, path: &str) -> Option<Params> {
		self.pattern.params(path)
	}

	/// Generate a path from this route's pattern.
	pub fn path(&self, params: &ResolveParams, options: &ResolveOptions) -> Result<String> {
		self.pattern.resolve(params, options)
	}

	/// Generate an absolute URL by prefixing `origin`.
	pub fn url(&self, origin: &str, params: &ResolveParams, options: &ResolveOptions) -> Result<String> {
		let path = self.path(params, options)?;
		Ok(format!("{}{}", origin.trim_end_matches('/'), path))
	}

	/// Append a handler to the before stack. Halting here skips the action
	/// and the after stack of the dispatch.
	pub fn add_before<F>(&self, handler: F)
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		self.before
			.borrow_mut()
			.push_compiled(self.pattern.clone(), handler, EntryOptions::default());
	}

	/// Append a handler to the after stack.
	pub fn add_after<F>(&self, handler: F)
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		self.after
			.borrow_mut()
			.push_compiled(self.pattern.clone(), handler, EntryOptions::default());
	}

	/// Mount a handler for one HTTP method on the action stack.
	pub fn on_method<F>(&self, method: Method, handler: F)
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		self.action_stack.borrow_mut().push_compiled(
			self.pattern.clone(),
			handler,
			EntryOptions {
				method: Some(method),
				name: Some(self.name.clone()),
				..EntryOptions::default()
			},
		);
	}

	pub fn get<F>(&self, handler: F)
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		self.on_method(Method::GET, handler);
	}

	pub fn post<F>(&self, handler: F)
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		self.on_method(Method::POST, handler);
	}

	pub fn put<F>(&self, handler: F)
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		self.on_method(Method::PUT, handler);
	}

	pub fn delete<F>(&self, handler: F)
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		self.on_method(Method::DELETE, handler);
	}

	pub fn patch<F>(&self, handler: F)
	where
		F: Fn(&mut RouteContext, &Next) + 'static,
	{
		self.on_method(Method::PATCH, handler);
	}

	// Stacks are dispatched on snapshots so handlers may mount further
	// entries without re-entering the borrow.

	pub(crate) fn dispatch_before(&self, path: &str, ctx: &mut RouteContext) -> crate::middleware::StackOutcome {
		let stack = self.before.borrow().clone();
		stack.dispatch(path, ctx)
	}

	pub(crate) fn dispatch_action_stack(&self, path: &str, ctx: &mut RouteContext) -> crate::middleware::StackOutcome {
		let stack = self.action_stack.borrow().clone();
		stack.dispatch(path, ctx)
	}

	pub(crate) fn dispatch_after(&self, path: &str, ctx: &mut RouteContext) -> crate::middleware::StackOutcome {
		let stack = self.after.borrow().clone();
		stack.dispatch(path, ctx)
	}

	/// Resolve this route's controller definition.
	///
	/// Precedence: an attached definition, then a route-named registry
	/// lookup (fatal if absent), then the router default (fatal if absent),
	/// then the `<ClassifiedName>Controller` convention (silently skipped
	/// when unregistered), then the anonymous base definition.
	pub(crate) fn resolve_controller(
		&self,
		registry: &ControllerRegistry,
		default_name: Option<&str>,
	) -> Result<Rc<ControllerDef>> {
		match &self.options.controller {
			Some(ControllerSpec::Def(def)) => Ok(Rc::clone(def)),
			Some(ControllerSpec::Named(name)) => registry
				.lookup(name)
				.ok_or_else(|| RouterError::ControllerNotFound(name.clone())),
			None => {
				if let Some(default) = default_name {
					return registry
						.lookup(default)
						.ok_or_else(|| RouterError::ControllerNotFound(default.to_string()));
				}
				let conventional = format!("{}Controller", classify(&self.name));
				match registry.lookup(&conventional) {
					Some(def) => Ok(def),
					None => Ok(ControllerDef::base()),
				}
			}
		}
	}
}

impl fmt::Debug for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("name", &self.name)
			.field("pattern", &self.pattern.source())
			.finish()
	}
}

/// Upper-camel-case a route name: `post.show` and `post_show` both become
/// `PostShow`.
pub(crate) fn classify(name: &str) -> String {
	name.split(['.', '_', '-'])
		.filter(|segment| !segment.is_empty())
		.map(|segment| {
			let mut chars = segment.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
				None => String::new(),
			}
		})
		.collect()
}
