//! Readiness aggregation and loading-gate integration tests.
//!
//! A route waits on asynchronous readiness sources; the built-in `loading`
//! hook pauses the cycle and renders the loading template until every
//! source is ready, after which the cycle reruns and the action fires.

use std::rc::Rc;

use serial_test::serial;
use wayfinder::hooks::{Hook, HookKind};
use wayfinder::prelude::*;
use wayfinder::reactive::flush;

fn loading_router() -> (Router, Rc<RecordingSink>) {
	let mut config = RouterConfig::new();
	config.loading_template = Some("Loading".to_string());
	let router = Router::new(config);
	let sink = RecordingSink::new();
	router.set_sink(sink.clone());
	(router, sink)
}

#[test]
#[serial]
fn test_loading_gate_defers_action_until_ready() {
	let (router, sink) = loading_router();
	let flag = ReadyFlag::new(false);

	let flag_c = flag.clone();
	router
		.route(
			"home",
			RouteOptions::new()
				.path("/")
				.template("Home")
				.wait_on(Rc::new(move |_| WaitInput::Handle(flag_c.clone())))
				.on(HookKind::OnBeforeAction, Hook::named("loading")),
		)
		.unwrap();

	router.dispatch("/").unwrap();
	assert_eq!(sink.rendered_templates(), vec!["Loading".to_string()]);
	let current = router.current().unwrap();
	assert!(!current.ready());
	assert!(current.is_paused());

	flag.set_ready(true);
	flush();
	assert_eq!(
		sink.rendered_templates(),
		vec!["Loading".to_string(), "Home".to_string()]
	);
	assert!(router.current().unwrap().ready());
	assert!(!router.current().unwrap().is_paused());
}

#[test]
#[serial]
fn test_partial_readiness_does_not_rerun_cycle() {
	let (router, sink) = loading_router();
	let a = ReadyFlag::new(false);
	let b = ReadyFlag::new(false);

	let a_c = a.clone();
	let b_c = b.clone();
	router
		.route(
			"home",
			RouteOptions::new()
				.path("/")
				.template("Home")
				.wait_on(Rc::new(move |_| {
					WaitInput::Many(vec![
						WaitInput::Handle(a_c.clone()),
						WaitInput::Handle(b_c.clone()),
					])
				}))
				.on(HookKind::OnBeforeAction, Hook::named("loading")),
		)
		.unwrap();

	router.dispatch("/").unwrap();
	assert_eq!(sink.rendered_templates().len(), 1);

	// One of two sources readying does not cross the all-ready threshold.
	a.set_ready(true);
	flush();
	assert_eq!(sink.rendered_templates().len(), 1);
	assert!(!router.current().unwrap().ready());

	b.set_ready(true);
	flush();
	assert_eq!(
		sink.rendered_templates(),
		vec!["Loading".to_string(), "Home".to_string()]
	);
}

#[test]
#[serial]
fn test_router_wide_wait_on_applies_to_every_route() {
	let mut config = RouterConfig::new();
	config.loading_template = Some("Loading".to_string());
	let session = ReadyFlag::new(false);
	let session_c = session.clone();
	config.wait_on = Some(Rc::new(move |_| WaitInput::Handle(session_c.clone())));

	let router = Router::new(config);
	let sink = RecordingSink::new();
	router.set_sink(sink.clone());
	router
		.route(
			"home",
			RouteOptions::new()
				.path("/")
				.template("Home")
				.on(HookKind::OnBeforeAction, Hook::named("loading")),
		)
		.unwrap();

	router.dispatch("/").unwrap();
	assert_eq!(sink.rendered_templates(), vec!["Loading".to_string()]);

	session.set_ready(true);
	flush();
	assert_eq!(sink.last_main_render(), Some("Home".to_string()));
}

#[test]
#[serial]
fn test_stopping_releases_readiness_watchers() {
	let (router, sink) = loading_router();
	let flag = ReadyFlag::new(false);

	let flag_c = flag.clone();
	router
		.route(
			"home",
			RouteOptions::new()
				.path("/")
				.template("Home")
				.wait_on(Rc::new(move |_| WaitInput::Handle(flag_c.clone())))
				.on(HookKind::OnBeforeAction, Hook::named("loading")),
		)
		.unwrap();
	router
		.route("other", RouteOptions::new().path("/other").template("Other"))
		.unwrap();

	router.dispatch("/").unwrap();
	router.dispatch("/other").unwrap();
	assert_eq!(sink.last_main_render(), Some("Other".to_string()));
	let renders = sink.rendered_templates().len();

	// The stopped controller's watchers are gone; readiness flips change
	// nothing.
	flag.set_ready(true);
	flush();
	assert_eq!(sink.rendered_templates().len(), renders);
}

#[test]
#[serial]
fn test_hook_added_wait_applies_to_current_cycle() {
	let (router, sink) = loading_router();
	let flag = ReadyFlag::new(false);

	let flag_c = flag.clone();
	router
		.route(
			"home",
			RouteOptions::new()
				.path("/")
				.template("Home")
				.on(
					HookKind::OnRun,
					Hook::func(move |c, _| c.wait(flag_c.clone())),
				)
				.on(HookKind::OnBeforeAction, Hook::named("loading")),
		)
		.unwrap();

	router.dispatch("/").unwrap();
	assert_eq!(sink.rendered_templates(), vec!["Loading".to_string()]);

	flag.set_ready(true);
	flush();
	assert_eq!(sink.last_main_render(), Some("Home".to_string()));
}
