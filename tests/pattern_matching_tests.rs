//! Path pattern matching and URL generation tests.
//!
//! Covers named keys, optional segments, custom capture classes, wildcards,
//! strict/sensitive flags, and resolve round-trips.

use rstest::rstest;
use wayfinder::RouterError;
use wayfinder::params::ResolveParams;
use wayfinder::pattern::{PathPattern, QueryInput, ResolveOptions};

#[rstest]
#[case("/posts/:id", "/posts/7", true)]
#[case("/posts/:id", "/posts/7/edit", false)]
#[case("/posts/:id/edit", "/posts/7/edit", true)]
#[case("/files/*", "/files/a/b/c.txt", true)]
#[case("/files/*", "/files", false)]
#[case("/", "/", true)]
fn test_basic_matching(#[case] template: &str, #[case] path: &str, #[case] expected: bool) {
	let pattern = PathPattern::compile(template).unwrap();
	assert_eq!(pattern.test(path), expected, "{template} vs {path}");
	assert_eq!(pattern.exec(path).is_some(), expected);
}

#[test]
fn test_named_params_decoded() {
	let pattern = PathPattern::compile("/posts/:postId/comments/:commentId").unwrap();
	let params = pattern.params("/posts/a%20b/comments/42").unwrap();
	assert_eq!(params.get("postId"), Some("a b"));
	assert_eq!(params.get("commentId"), Some("42"));
}

#[test]
fn test_optional_segment_matches_both_forms() {
	let pattern = PathPattern::compile("/docs/:section?/:page").unwrap();
	assert!(pattern.test("/docs/intro/one"));
	assert!(pattern.test("/docs/one"));

	let with = pattern.params("/docs/intro/one").unwrap();
	assert_eq!(with.get("section"), Some("intro"));
	assert_eq!(with.get("page"), Some("one"));

	let without = pattern.params("/docs/one").unwrap();
	assert_eq!(without.get("section"), None);
	assert_eq!(without.get("page"), Some("one"));
}

#[test]
fn test_custom_capture_class() {
	let pattern = PathPattern::compile("/items/:id(\\d+)").unwrap();
	assert!(pattern.test("/items/42"));
	assert!(!pattern.test("/items/abc"));
}

#[test]
fn test_wildcard_captures_positionally() {
	let pattern = PathPattern::compile("/files/*").unwrap();
	let params = pattern.params("/files/a/b/c.txt").unwrap();
	assert_eq!(params.positional(), &["a/b/c.txt".to_string()]);
}

#[test]
fn test_query_and_hash_merge_into_params() {
	let pattern = PathPattern::compile("/posts/:id").unwrap();
	let params = pattern.params("/posts/7?sort=asc&page=2#comments").unwrap();
	assert_eq!(params.get("id"), Some("7"));
	assert_eq!(params.get("sort"), Some("asc"));
	assert_eq!(params.get("page"), Some("2"));
	assert_eq!(params.hash(), Some("comments"));
}

#[test]
fn test_named_param_shadows_query() {
	let pattern = PathPattern::compile("/posts/:id").unwrap();
	let params = pattern.params("/posts/7?id=999").unwrap();
	assert_eq!(params.get("id"), Some("7"));
}

#[test]
fn test_trailing_slash_tolerated_unless_strict() {
	let relaxed = PathPattern::compile("/about").unwrap();
	assert!(relaxed.test("/about/"));

	let strict = PathPattern::compile_with("/about", true, false).unwrap();
	assert!(strict.test("/about"));
	assert!(!strict.test("/about/"));
}

#[test]
fn test_case_sensitivity_flag() {
	let relaxed = PathPattern::compile("/About").unwrap();
	assert!(relaxed.test("/about"));

	let sensitive = PathPattern::compile_with("/About", false, true).unwrap();
	assert!(sensitive.test("/About"));
	assert!(!sensitive.test("/about"));
}

#[test]
fn test_resolve_substitutes_and_encodes() {
	let pattern = PathPattern::compile("/posts/:id").unwrap();
	let path = pattern
		.resolve(
			&ResolveParams::new().set("id", "a b"),
			&ResolveOptions::default(),
		)
		.unwrap();
	assert_eq!(path, "/posts/a%20b");
}

#[test]
fn test_resolve_drops_absent_optional_unit() {
	let pattern = PathPattern::compile("/docs/:section?/:page").unwrap();
	let path = pattern
		.resolve(
			&ResolveParams::new().set("page", "one"),
			&ResolveOptions::default(),
		)
		.unwrap();
	assert_eq!(path, "/docs/one");
}

#[test]
fn test_resolve_missing_required_param() {
	let pattern = PathPattern::compile("/posts/:id").unwrap();
	let err = pattern
		.resolve(&ResolveParams::new(), &ResolveOptions::default())
		.unwrap_err();
	assert!(matches!(
		err,
		RouterError::MissingParameter { param, .. } if param == "id"
	));
}

#[test]
fn test_resolve_appends_query_and_hash() {
	let pattern = PathPattern::compile("/posts/:id").unwrap();
	let path = pattern
		.resolve(
			&ResolveParams::new().set("id", "7"),
			&ResolveOptions {
				query: Some(QueryInput::Pairs(vec![("sort".to_string(), "asc".to_string())])),
				hash: Some("comments".to_string()),
			},
		)
		.unwrap();
	assert_eq!(path, "/posts/7?sort=asc#comments");
}

#[test]
fn test_resolve_wildcard_preserves_slashes() {
	let pattern = PathPattern::compile("/files/*").unwrap();
	let path = pattern
		.resolve(
			&ResolveParams::new().push("a/b c.txt"),
			&ResolveOptions::default(),
		)
		.unwrap();
	assert_eq!(path, "/files/a/b%20c.txt");
}

#[test]
fn test_resolve_round_trip() {
	let pattern = PathPattern::compile("/posts/:postId/comments/:commentId").unwrap();
	let path = pattern
		.resolve(
			&ResolveParams::new().set("postId", "12").set("commentId", "3"),
			&ResolveOptions::default(),
		)
		.unwrap();
	let params = pattern.params(&path).unwrap();
	assert_eq!(params.get("postId"), Some("12"));
	assert_eq!(params.get("commentId"), Some("3"));
}

#[test]
fn test_raw_regex_pattern_matches_but_never_resolves() {
	let pattern = PathPattern::from_regex(r"^/legacy/\d+$", false).unwrap();
	assert!(pattern.test("/legacy/42"));
	assert!(!pattern.test("/legacy/x"));
	assert!(matches!(
		pattern.resolve(&ResolveParams::new(), &ResolveOptions::default()),
		Err(RouterError::InvalidPattern { .. })
	));
}

#[test]
fn test_invalid_template_reports_pattern() {
	let err = PathPattern::compile("/x/:id([").unwrap_err();
	assert!(matches!(
		err,
		RouterError::InvalidPattern { pattern, .. } if pattern == "/x/:id(["
	));
}
