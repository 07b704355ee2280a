//! Parameter values exchanged between patterns, contexts, and controllers.
//!
//! [`Params`] is the decoded result of matching a path: named captures in
//! declaration order, positional wildcard captures, merged query pairs, and
//! an optional fragment. [`ResolveParams`] is the input side, used to build
//! a path back out of a pattern.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Decoded parameters extracted from a matched path.
///
/// Named entries preserve the declaration order of the pattern's keys.
/// Query-string pairs are merged in and consulted by [`get`](Self::get)
/// after named captures, so a path capture shadows a query key of the
/// same name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
	named: Vec<(String, String)>,
	positional: Vec<String>,
	query: Vec<(String, String)>,
	hash: Option<String>,
}

impl Params {
	pub fn new() -> Self {
		Self::default()
	}

	/// Look up a value by name: named captures first, then query pairs.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.named
			.iter()
			.find(|(k, _)| k == name)
			.or_else(|| self.query.iter().find(|(k, _)| k == name))
			.map(|(_, v)| v.as_str())
	}

	/// Positional (wildcard) captures in declaration order.
	pub fn positional(&self) -> &[String] {
		&self.positional
	}

	/// Merged query-string pairs in source order.
	pub fn query(&self) -> &[(String, String)] {
		&self.query
	}

	/// The decoded `#fragment`, when the matched URL carried one.
	pub fn hash(&self) -> Option<&str> {
		self.hash.as_deref()
	}

	/// Named captures in pattern declaration order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.named.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn is_empty(&self) -> bool {
		self.named.is_empty()
			&& self.positional.is_empty()
			&& self.query.is_empty()
			&& self.hash.is_none()
	}

	pub(crate) fn insert_named(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.named.push((name.into(), value.into()));
	}

	pub(crate) fn push_positional(&mut self, value: impl Into<String>) {
		self.positional.push(value.into());
	}

	pub(crate) fn push_query(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.query.push((key.into(), value.into()));
	}

	pub(crate) fn set_hash(&mut self, hash: impl Into<String>) {
		self.hash = Some(hash.into());
	}
}

/// A parameter value supplied to [`PathPattern::resolve`].
///
/// `Lazy` values are thunks invoked with the full parameter set to obtain
/// the concrete value just before encoding, mirroring function-valued
/// parameters in dynamic callers.
///
/// [`PathPattern::resolve`]: crate::pattern::PathPattern::resolve
#[derive(Clone)]
pub enum ParamValue {
	Value(String),
	Lazy(Rc<dyn Fn(&ResolveParams) -> String>),
}

impl ParamValue {
	pub fn lazy<F>(f: F) -> Self
	where
		F: Fn(&ResolveParams) -> String + 'static,
	{
		Self::Lazy(Rc::new(f))
	}

	pub(crate) fn materialize(&self, params: &ResolveParams) -> String {
		match self {
			Self::Value(v) => v.clone(),
			Self::Lazy(f) => f(params),
		}
	}
}

impl fmt::Debug for ParamValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
			Self::Lazy(_) => f.write_str("Lazy(..)"),
		}
	}
}

impl From<&str> for ParamValue {
	fn from(v: &str) -> Self {
		Self::Value(v.to_string())
	}
}

impl From<String> for ParamValue {
	fn from(v: String) -> Self {
		Self::Value(v)
	}
}

impl From<i64> for ParamValue {
	fn from(v: i64) -> Self {
		Self::Value(v.to_string())
	}
}

impl From<u64> for ParamValue {
	fn from(v: u64) -> Self {
		Self::Value(v.to_string())
	}
}

/// Input parameters for URL generation.
#[derive(Debug, Clone, Default)]
pub struct ResolveParams {
	named: HashMap<String, ParamValue>,
	positional: Vec<ParamValue>,
}

impl ResolveParams {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set a named parameter (builder style).
	pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
		self.named.insert(name.into(), value.into());
		self
	}

	/// Append a positional (wildcard) parameter.
	pub fn push(mut self, value: impl Into<ParamValue>) -> Self {
		self.positional.push(value.into());
		self
	}

	pub fn get(&self, name: &str) -> Option<&ParamValue> {
		self.named.get(name)
	}

	pub(crate) fn positional(&self, index: usize) -> Option<&ParamValue> {
		self.positional.get(index)
	}
}

impl From<&Params> for ResolveParams {
	/// Reuse decoded params as resolve input, e.g. to rebuild the URL of
	/// the currently matched route.
	fn from(params: &Params) -> Self {
		let mut out = Self::new();
		for (k, v) in params.iter() {
			out = out.set(k, v);
		}
		for v in params.positional() {
			out = out.push(v.as_str());
		}
		out
	}
}
