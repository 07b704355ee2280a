//! Error types for the route-dispatch engine.
//!
//! Configuration and resolution mistakes (unknown route names, missing
//! parameters, unresolvable controllers) are hard errors surfaced as
//! [`RouterError`] values. Runtime navigation conditions such as "no route
//! matched this path" are not errors; they flow through the router's
//! unhandled hook instead.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Error type for router, route, and controller operations.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
	/// Lookup by route name failed.
	#[error("route not found: {0}")]
	RouteNotFound(String),

	/// A required path parameter was absent during URL generation.
	#[error("missing required parameter '{param}' for pattern '{pattern}'")]
	MissingParameter {
		/// Name of the absent parameter (wildcards are reported positionally).
		param: String,
		/// Source template of the pattern being resolved.
		pattern: String,
	},

	/// A path template failed to compile.
	#[error("invalid path pattern '{pattern}': {reason}")]
	InvalidPattern {
		/// The offending template.
		pattern: String,
		/// Compiler diagnostic.
		reason: String,
	},

	/// An explicitly named controller is not present in the registry.
	#[error("controller not found: {0}")]
	ControllerNotFound(String),

	/// A hook was referenced by a name the hook registry does not know.
	#[error("unknown hook: {0}")]
	UnknownHook(String),

	/// No action could be resolved for a route.
	#[error("no action defined for route '{0}'")]
	UndefinedAction(String),

	/// A controller run cycle was started while one was already active.
	#[error("controller is already running")]
	AlreadyRunning,

	/// A controller outlived its router.
	#[error("controller requires a live router and route")]
	InvalidConstruction,

	/// Programmatic navigation could not be performed.
	#[error("navigation failed: {0}")]
	NavigationFailed(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_display() {
		assert_eq!(
			RouterError::RouteNotFound("post.show".to_string()).to_string(),
			"route not found: post.show"
		);
		assert_eq!(
			RouterError::MissingParameter {
				param: "id".to_string(),
				pattern: "/posts/:id".to_string(),
			}
			.to_string(),
			"missing required parameter 'id' for pattern '/posts/:id'"
		);
		assert_eq!(
			RouterError::UnknownHook("loading".to_string()).to_string(),
			"unknown hook: loading"
		);
	}
}
