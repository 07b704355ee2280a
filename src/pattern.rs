//! Path pattern compilation and bidirectional param/path conversion.
//!
//! A template compiles once, at route construction, into an anchored regex
//! plus an ordered list of capture slots. Supported syntax:
//!
//! - literal segments, matched case-insensitively unless `sensitive` is set
//! - `:name` — one path segment (`[^/]+`)
//! - `:name?` — the segment *and its preceding separator* become optional
//!   as a unit, so `/logs/:year?` matches both `/logs` and `/logs/2026`
//! - `:name(regexp)` — custom capture class (use non-capturing groups
//!   inside the custom expression)
//! - `.:ext` — a `.` separator switches the default class to `[^/.]+`
//! - `*` — greedy across slashes, captured positionally
//!
//! Unless `strict` is set, a trailing slash is always permitted.

use regex::{Regex, RegexBuilder};

use crate::error::{Result, RouterError};
use crate::params::{Params, ResolveParams};

/// Guard against pathological templates compiling into huge automata.
const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

/// Query string input for [`PathPattern::resolve`].
#[derive(Debug, Clone)]
pub enum QueryInput {
	/// A pre-built query string, used verbatim (without leading `?`).
	Raw(String),
	/// Key/value pairs, percent-encoded and joined with `&`.
	Pairs(Vec<(String, String)>),
}

impl From<&str> for QueryInput {
	fn from(raw: &str) -> Self {
		Self::Raw(raw.trim_start_matches('?').to_string())
	}
}

impl From<Vec<(String, String)>> for QueryInput {
	fn from(pairs: Vec<(String, String)>) -> Self {
		Self::Pairs(pairs)
	}
}

/// Options for [`PathPattern::resolve`].
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
	pub query: Option<QueryInput>,
	pub hash: Option<String>,
}

#[derive(Debug, Clone)]
enum Token {
	Literal(String),
	Key {
		name: String,
		optional: bool,
		/// Separator character owned by this key's unit (`/` or `.`).
		sep: Option<char>,
		/// Custom capture class from `:name(...)`.
		class: Option<String>,
	},
	Wildcard,
}

/// A capture slot, in regex group order.
#[derive(Debug, Clone)]
enum Slot {
	Named { name: String },
	Wild,
}

/// A compiled path template.
///
/// Compiled once at [`Route`](crate::route::Route) construction and
/// immutable thereafter. For any compiled pattern,
/// `test(path) == exec(path).is_some()`.
#[derive(Debug, Clone)]
pub struct PathPattern {
	source: String,
	regex: Regex,
	tokens: Vec<Token>,
	slots: Vec<Slot>,
	raw_regex: bool,
	strict: bool,
	sensitive: bool,
}

impl PathPattern {
	/// Compile a path template with default flags (lenient trailing slash,
	/// case-insensitive literals).
	pub fn compile(template: &str) -> Result<Self> {
		Self::compile_with(template, false, false)
	}

	/// Compile a path template with explicit `strict` / `sensitive` flags.
	pub fn compile_with(template: &str, strict: bool, sensitive: bool) -> Result<Self> {
		let tokens = tokenize(template)?;
		let (regex, slots) = build_regex(template, &tokens, strict, sensitive)?;
		Ok(Self {
			source: template.to_string(),
			regex,
			tokens,
			slots,
			raw_regex: false,
			strict,
			sensitive,
		})
	}

	/// Wrap a raw regular expression as a matcher.
	///
	/// Raw-regex patterns match and capture positionally but cannot be
	/// resolved back into a path.
	pub fn from_regex(pattern: &str, sensitive: bool) -> Result<Self> {
		let anchored = format!("^(?:{})$", pattern);
		let regex = RegexBuilder::new(&anchored)
			.case_insensitive(!sensitive)
			.size_limit(MAX_REGEX_SIZE)
			.build()
			.map_err(|e| RouterError::InvalidPattern {
				pattern: pattern.to_string(),
				reason: e.to_string(),
			})?;
		Ok(Self {
			source: pattern.to_string(),
			regex,
			tokens: Vec::new(),
			slots: Vec::new(),
			raw_regex: true,
			strict: true,
			sensitive,
		})
	}

	/// The original template string.
	pub fn source(&self) -> &str {
		&self.source
	}

	pub fn is_strict(&self) -> bool {
		self.strict
	}

	pub fn is_sensitive(&self) -> bool {
		self.sensitive
	}

	/// Path-only test; any query string or fragment is ignored.
	pub fn test(&self, path: &str) -> bool {
		let (path_only, _, _) = split_url(path);
		self.regex.is_match(path_only)
	}

	/// Raw capture groups, one slot per key/wildcard in declaration order.
	/// `None` entries correspond to absent optional segments. Returns
	/// `None` iff [`test`](Self::test) returns false.
	pub fn exec(&self, path: &str) -> Option<Vec<Option<String>>> {
		let (path_only, _, _) = split_url(path);
		let caps = self.regex.captures(path_only)?;
		Some(
			(1..caps.len())
				.map(|i| caps.get(i).map(|m| m.as_str().to_string()))
				.collect(),
		)
	}

	/// Decode a matched path into [`Params`]: named captures in declaration
	/// order, wildcard captures positionally, query pairs merged in, and a
	/// `hash` entry when a fragment is present.
	pub fn params(&self, path: &str) -> Option<Params> {
		let (path_only, query, hash) = split_url(path);
		let caps = self.regex.captures(path_only)?;

		let mut params = Params::new();
		for (i, slot) in self.slots.iter().enumerate() {
			let value = caps.get(i + 1).map(|m| decode(m.as_str()));
			match slot {
				Slot::Named { name } => {
					if let Some(value) = value {
						params.insert_named(name.clone(), value);
					}
				}
				Slot::Wild => {
					if let Some(value) = value {
						params.push_positional(value);
					}
				}
			}
		}
		if let Some(query) = query {
			for (k, v) in parse_query(query) {
				params.push_query(k, v);
			}
		}
		if let Some(hash) = hash {
			params.set_hash(decode(hash));
		}
		Some(params)
	}

	/// Substitute parameters back into the template.
	///
	/// Absent optional keys drop their whole unit (separator included), so
	/// `/:a?/:b` resolved with only `b` yields `/x`, never `//x`. A missing
	/// required key is a [`RouterError::MissingParameter`]. Named values are
	/// percent-encoded; wildcard values are encoded per segment so their
	/// slashes survive.
	pub fn resolve(&self, params: &ResolveParams, options: &ResolveOptions) -> Result<String> {
		if self.raw_regex {
			return Err(RouterError::InvalidPattern {
				pattern: self.source.clone(),
				reason: "raw-regex patterns cannot be resolved".to_string(),
			});
		}

		let mut out = String::new();
		let mut wild_index = 0usize;
		for token in &self.tokens {
			match token {
				Token::Literal(lit) => out.push_str(lit),
				Token::Key {
					name,
					optional,
					sep,
					..
				} => match params.get(name) {
					Some(value) => {
						if let Some(sep) = sep {
							out.push(*sep);
						}
						out.push_str(&encode(&value.materialize(params)));
					}
					None if *optional => {}
					None => {
						return Err(RouterError::MissingParameter {
							param: name.clone(),
							pattern: self.source.clone(),
						});
					}
				},
				Token::Wildcard => {
					let value = params.positional(wild_index).ok_or_else(|| {
						RouterError::MissingParameter {
							param: format!("*{}", wild_index),
							pattern: self.source.clone(),
						}
					})?;
					wild_index += 1;
					out.push_str(&encode_path(&value.materialize(params)));
				}
			}
		}
		if out.is_empty() {
			out.push('/');
		}

		match &options.query {
			Some(QueryInput::Raw(raw)) if !raw.is_empty() => {
				out.push('?');
				out.push_str(raw);
			}
			Some(QueryInput::Pairs(pairs)) if !pairs.is_empty() => {
				out.push('?');
				let encoded: Vec<String> = pairs
					.iter()
					.map(|(k, v)| format!("{}={}", encode(k), encode(v)))
					.collect();
				out.push_str(&encoded.join("&"));
			}
			_ => {}
		}
		if let Some(hash) = &options.hash {
			out.push('#');
			out.push_str(&encode(hash));
		}
		Ok(out)
	}
}

fn tokenize(template: &str) -> Result<Vec<Token>> {
	let mut tokens = Vec::new();
	let mut literal = String::new();
	let mut chars = template.chars().peekable();

	let flush = |literal: &mut String, tokens: &mut Vec<Token>| {
		if !literal.is_empty() {
			tokens.push(Token::Literal(std::mem::take(literal)));
		}
	};

	while let Some(c) = chars.next() {
		match c {
			':' => {
				let mut name = String::new();
				while let Some(&next) = chars.peek() {
					if next.is_alphanumeric() || next == '_' {
						name.push(next);
						chars.next();
					} else {
						break;
					}
				}
				if name.is_empty() {
					// A bare colon is just a literal character.
					literal.push(':');
					continue;
				}

				let mut class = None;
				if chars.peek() == Some(&'(') {
					chars.next();
					let mut depth = 1usize;
					let mut custom = String::new();
					for next in chars.by_ref() {
						match next {
							'(' => depth += 1,
							')' => {
								depth -= 1;
								if depth == 0 {
									break;
								}
							}
							_ => {}
						}
						custom.push(next);
					}
					if depth != 0 {
						return Err(RouterError::InvalidPattern {
							pattern: template.to_string(),
							reason: format!("unbalanced parentheses after ':{}'", name),
						});
					}
					class = Some(custom);
				}

				let optional = if chars.peek() == Some(&'?') {
					chars.next();
					true
				} else {
					false
				};

				// The preceding separator belongs to the key's unit so
				// optional keys can drop it wholesale.
				let sep = match literal.chars().last() {
					Some(last @ ('/' | '.')) => {
						literal.pop();
						Some(last)
					}
					_ => None,
				};
				flush(&mut literal, &mut tokens);
				tokens.push(Token::Key {
					name,
					optional,
					sep,
					class,
				});
			}
			'*' => {
				flush(&mut literal, &mut tokens);
				tokens.push(Token::Wildcard);
			}
			_ => literal.push(c),
		}
	}
	flush(&mut literal, &mut tokens);
	Ok(tokens)
}

fn build_regex(
	template: &str,
	tokens: &[Token],
	strict: bool,
	sensitive: bool,
) -> Result<(Regex, Vec<Slot>)> {
	let mut pattern = String::from("^");
	let mut slots = Vec::new();

	for token in tokens {
		match token {
			Token::Literal(lit) => pattern.push_str(&regex::escape(lit)),
			Token::Key {
				name,
				optional,
				sep,
				class,
			} => {
				let class = class.clone().unwrap_or_else(|| {
					if *sep == Some('.') {
						// Extension-like segment: stop at dots too.
						"[^/.]+".to_string()
					} else {
						"[^/]+".to_string()
					}
				});
				let sep_re = sep
					.map(|s| regex::escape(&s.to_string()))
					.unwrap_or_default();
				if *optional {
					pattern.push_str(&format!("(?:{}({}))?", sep_re, class));
				} else {
					pattern.push_str(&format!("{}({})", sep_re, class));
				}
				slots.push(Slot::Named { name: name.clone() });
			}
			Token::Wildcard => {
				pattern.push_str("(.*)");
				slots.push(Slot::Wild);
			}
		}
	}

	if !strict {
		pattern.push_str("/?");
	}
	pattern.push('$');

	let regex = RegexBuilder::new(&pattern)
		.case_insensitive(!sensitive)
		.size_limit(MAX_REGEX_SIZE)
		.build()
		.map_err(|e| RouterError::InvalidPattern {
			pattern: template.to_string(),
			reason: e.to_string(),
		})?;
	Ok((regex, slots))
}

/// Split `path?query#hash` into its three parts.
fn split_url(url: &str) -> (&str, Option<&str>, Option<&str>) {
	let (before_hash, hash) = match url.split_once('#') {
		Some((p, h)) => (p, Some(h)),
		None => (url, None),
	};
	let (path, query) = match before_hash.split_once('?') {
		Some((p, q)) => (p, Some(q)),
		None => (before_hash, None),
	};
	(path, query, hash)
}

fn parse_query(query: &str) -> Vec<(String, String)> {
	query
		.split('&')
		.filter(|part| !part.is_empty())
		.map(|part| match part.split_once('=') {
			Some((k, v)) => (decode(k), decode(v)),
			None => (decode(part), String::new()),
		})
		.collect()
}

fn decode(raw: &str) -> String {
	urlencoding::decode(raw)
		.map(|cow| cow.into_owned())
		.unwrap_or_else(|_| raw.to_string())
}

fn encode(raw: &str) -> String {
	urlencoding::encode(raw).into_owned()
}

/// Percent-encode a wildcard value without touching its slashes.
fn encode_path(raw: &str) -> String {
	raw.split('/')
		.map(|segment| encode(segment))
		.collect::<Vec<_>>()
		.join("/")
}
