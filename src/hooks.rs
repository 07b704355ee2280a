//! Hook kinds, hook values, and the named-hook registry.
//!
//! A hook is a named extension point in the controller lifecycle. Hook
//! values are either direct callables or strings resolved through a
//! [`HookRegistry`]; referencing an unregistered name is a fatal
//! configuration error. Legacy hook names (`load`, `before`, `after`,
//! `unload`) are rewritten to their canonical equivalents once, at
//! configuration time, with a deprecation notice.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::config::Where;
use crate::controller::RouteController;
use crate::error::{Result, RouterError};

/// Resolved hook callable.
pub type HookFn = Rc<dyn Fn(&RouteController, &HookCtl)>;

/// Lifecycle extension points, in execution order within one run cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
	/// First activation of a run cycle only; never re-fires on reruns.
	OnRun,
	/// Invalidation-driven reruns of an active cycle.
	OnRerun,
	OnBeforeAction,
	OnAfterAction,
	OnStop,
}

impl HookKind {
	pub fn canonical_name(&self) -> &'static str {
		match self {
			Self::OnRun => "on_run",
			Self::OnRerun => "on_rerun",
			Self::OnBeforeAction => "on_before_action",
			Self::OnAfterAction => "on_after_action",
			Self::OnStop => "on_stop",
		}
	}

	/// Parse a canonical or legacy hook-kind name. The boolean is true when
	/// the name was a legacy alias that callers should migrate away from.
	pub fn parse(name: &str) -> Option<(Self, bool)> {
		match name {
			"on_run" | "onRun" => Some((Self::OnRun, false)),
			"on_rerun" | "onRerun" => Some((Self::OnRerun, false)),
			"on_before_action" | "onBeforeAction" => Some((Self::OnBeforeAction, false)),
			"on_after_action" | "onAfterAction" => Some((Self::OnAfterAction, false)),
			"on_stop" | "onStop" => Some((Self::OnStop, false)),
			// Legacy aliases, kept working with a deprecation notice.
			"load" => Some((Self::OnRun, true)),
			"before" => Some((Self::OnBeforeAction, true)),
			"after" => Some((Self::OnAfterAction, true)),
			"unload" => Some((Self::OnStop, true)),
			_ => None,
		}
	}

	/// Rewrite a legacy alias to its canonical kind, warning once per call
	/// site.
	pub(crate) fn normalize(name: &str) -> Option<Self> {
		let (kind, legacy) = Self::parse(name)?;
		if legacy {
			warn!(
				legacy = name,
				canonical = kind.canonical_name(),
				"legacy hook name is deprecated; use the canonical name"
			);
		}
		Some(kind)
	}
}

impl fmt::Display for HookKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.canonical_name())
	}
}

/// A hook value: a direct callable or a name resolved via the registry.
#[derive(Clone)]
pub enum Hook {
	Fn(HookFn),
	Named(String),
}

impl Hook {
	pub fn func<F>(f: F) -> Self
	where
		F: Fn(&RouteController, &HookCtl) + 'static,
	{
		Self::Fn(Rc::new(f))
	}

	pub fn named(name: impl Into<String>) -> Self {
		Self::Named(name.into())
	}

	/// Resolve to a callable; unknown names are fatal.
	pub fn resolve(&self, registry: &HookRegistry) -> Result<HookFn> {
		match self {
			Self::Fn(f) => Ok(Rc::clone(f)),
			Self::Named(name) => registry
				.lookup(name)
				.ok_or_else(|| RouterError::UnknownHook(name.clone())),
		}
	}
}

impl fmt::Debug for Hook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Fn(_) => f.write_str("Hook::Fn(..)"),
			Self::Named(name) => f.debug_tuple("Hook::Named").field(name).finish(),
		}
	}
}

/// Per-sequence control handle handed to each hook.
///
/// Calling [`pause`](Self::pause) prevents any subsequent hook in the same
/// sequence from executing; it does not stop the controller.
#[derive(Default)]
pub struct HookCtl {
	paused: Cell<bool>,
}

impl HookCtl {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Skip the remaining hooks of this sequence.
	pub fn pause(&self) {
		self.paused.set(true);
	}

	pub fn is_paused(&self) -> bool {
		self.paused.get()
	}
}

/// Admission filter for router-level hooks.
#[derive(Debug, Clone, Default)]
pub struct HookFilter {
	pub only: Vec<String>,
	pub except: Vec<String>,
	pub where_: Option<Where>,
}

impl HookFilter {
	pub fn admits(&self, route_name: &str, environment: Where) -> bool {
		if let Some(where_) = self.where_
			&& where_ != environment
		{
			return false;
		}
		if !self.only.is_empty() && !self.only.iter().any(|n| n == route_name) {
			return false;
		}
		!self.except.iter().any(|n| n == route_name)
	}
}

/// Registry of built-in hooks addressable by name.
#[derive(Default)]
pub struct HookRegistry {
	hooks: HashMap<String, HookFn>,
}

impl HookRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry preloaded with the built-in hooks.
	///
	/// - `"loading"`: pauses the sequence and renders the configured
	///   loading template while the controller is not ready.
	pub fn with_builtins() -> Self {
		let mut registry = Self::new();
		registry.register("loading", |controller: &RouteController, ctl: &HookCtl| {
			if !controller.ready() {
				if let Some(template) = controller.loading_template() {
					controller.render(&template, None);
				}
				ctl.pause();
			}
		});
		registry
	}

	pub fn register<F>(&mut self, name: impl Into<String>, hook: F)
	where
		F: Fn(&RouteController, &HookCtl) + 'static,
	{
		self.hooks.insert(name.into(), Rc::new(hook));
	}

	pub fn lookup(&self, name: &str) -> Option<HookFn> {
		self.hooks.get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.hooks.contains_key(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_canonical_names() {
		assert_eq!(
			HookKind::parse("on_before_action"),
			Some((HookKind::OnBeforeAction, false))
		);
		assert_eq!(HookKind::parse("onRun"), Some((HookKind::OnRun, false)));
		assert_eq!(HookKind::parse("nonsense"), None);
	}

	#[test]
	fn test_parse_legacy_names() {
		assert_eq!(HookKind::parse("load"), Some((HookKind::OnRun, true)));
		assert_eq!(HookKind::parse("before"), Some((HookKind::OnBeforeAction, true)));
		assert_eq!(HookKind::parse("after"), Some((HookKind::OnAfterAction, true)));
		assert_eq!(HookKind::parse("unload"), Some((HookKind::OnStop, true)));
	}

	#[test]
	fn test_filter_admits() {
		let filter = HookFilter {
			only: vec!["posts".to_string()],
			except: vec![],
			where_: None,
		};
		assert!(filter.admits("posts", Where::Client));
		assert!(!filter.admits("admin", Where::Client));

		let filter = HookFilter {
			only: vec![],
			except: vec!["admin".to_string()],
			where_: Some(Where::Server),
		};
		assert!(!filter.admits("posts", Where::Client));
		assert!(filter.admits("posts", Where::Server));
		assert!(!filter.admits("admin", Where::Server));
	}

	#[test]
	fn test_unknown_hook_is_fatal() {
		let registry = HookRegistry::new();
		let hook = Hook::named("missing");
		assert!(matches!(
			hook.resolve(&registry),
			Err(RouterError::UnknownHook(name)) if name == "missing"
		));
	}

	#[test]
	fn test_registry_lookup() {
		let mut registry = HookRegistry::new();
		registry.register("noop", |_, _| {});
		assert!(registry.contains("noop"));
		assert!(Hook::named("noop").resolve(&registry).is_ok());
	}

	#[test]
	fn test_builtin_loading_registered() {
		let registry = HookRegistry::with_builtins();
		assert!(registry.contains("loading"));
	}
}
