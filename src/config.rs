//! Router-wide configuration.
//!
//! Configuration is a flat option map: a handful of recognized, typed keys
//! plus a pass-through bag for anything application-specific. Unrecognized
//! keys are never interpreted by the engine.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::controller::WaitOn;

/// Execution context a route or hook is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Where {
	#[default]
	Client,
	Server,
}

impl fmt::Display for Where {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Client => f.write_str("client"),
			Self::Server => f.write_str("server"),
		}
	}
}

/// Subscription caching policy, passed through to an external cache
/// collaborator. The engine itself never evicts anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheRule {
	/// Keep up to this many cached subscriptions.
	pub cache: Option<u32>,
	/// Expire cached subscriptions after this many minutes.
	pub expire_in: Option<u32>,
}

/// Router-wide options.
///
/// Recognized keys configure rendering defaults, controller resolution,
/// and dispatch behavior; everything else lands in [`extra`](Self::extra)
/// untouched for application-level use.
#[derive(Clone, Default)]
pub struct RouterConfig {
	/// Template rendered as the outermost shell.
	pub layout_template: Option<String>,
	/// Template rendered when no route matches a dispatched path.
	pub not_found_template: Option<String>,
	/// Template the built-in `loading` hook renders while waiting.
	pub loading_template: Option<String>,
	/// Name of the registered controller used when a route names none.
	pub default_controller: Option<String>,
	/// Readiness sources evaluated for every controller run.
	pub wait_on: Option<WaitOn>,
	/// Render route templates automatically when no action is given.
	pub auto_render: bool,
	/// Dispatch on location changes as soon as the router is started.
	pub auto_start: bool,
	/// Origin prefix used by `url()` generation, e.g. `https://example.com`.
	pub origin: Option<String>,
	/// Which execution context this router serves.
	pub environment: Where,
	/// Default subscription caching policy, passed through untouched.
	pub cache: Option<CacheRule>,
	/// Unrecognized keys, preserved for application-level use.
	pub extra: HashMap<String, serde_json::Value>,
}

impl RouterConfig {
	pub fn new() -> Self {
		Self {
			auto_render: true,
			auto_start: true,
			..Self::default()
		}
	}
}

impl fmt::Debug for RouterConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouterConfig")
			.field("layout_template", &self.layout_template)
			.field("not_found_template", &self.not_found_template)
			.field("loading_template", &self.loading_template)
			.field("default_controller", &self.default_controller)
			.field("has_wait_on", &self.wait_on.is_some())
			.field("auto_render", &self.auto_render)
			.field("auto_start", &self.auto_start)
			.field("origin", &self.origin)
			.field("environment", &self.environment)
			.field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
			.finish()
	}
}
