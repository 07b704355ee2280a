//! Render sink boundary.
//!
//! The engine never implements template lookup or DOM diffing; it emits
//! render and clear instructions to an external renderer through
//! [`RenderSink`]. [`RecordingSink`] is the in-crate test double.

use std::cell::RefCell;
use std::rc::Rc;

/// Options accompanying a render instruction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
	/// Named region the template renders into; `None` is the main region.
	pub to: Option<String>,
	/// Data context handed to the template.
	pub data: Option<serde_json::Value>,
}

/// External renderer interface.
pub trait RenderSink {
	/// Render `template` according to `options`.
	fn render(&self, template: &str, options: &RenderOptions);

	/// Clear a previously rendered named region.
	fn clear_region(&self, region: &str);

	/// Install `template` as the outermost layout shell. Called only when
	/// the effective layout actually changes.
	fn set_layout(&self, template: &str);
}

/// One recorded sink instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
	Render {
		template: String,
		region: Option<String>,
	},
	Clear {
		region: String,
	},
	Layout {
		template: String,
	},
}

/// A [`RenderSink`] that records every instruction, for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
	events: RefCell<Vec<RenderEvent>>,
}

impl RecordingSink {
	pub fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	/// Every instruction seen so far, in order.
	pub fn events(&self) -> Vec<RenderEvent> {
		self.events.borrow().clone()
	}

	/// Templates from render instructions, in order.
	pub fn rendered_templates(&self) -> Vec<String> {
		self.events
			.borrow()
			.iter()
			.filter_map(|e| match e {
				RenderEvent::Render { template, .. } => Some(template.clone()),
				_ => None,
			})
			.collect()
	}

	/// The template most recently rendered into the main region.
	pub fn last_main_render(&self) -> Option<String> {
		self.events
			.borrow()
			.iter()
			.rev()
			.find_map(|e| match e {
				RenderEvent::Render {
					template,
					region: None,
				} => Some(template.clone()),
				_ => None,
			})
	}

	pub fn clear_events(&self) {
		self.events.borrow_mut().clear();
	}
}

impl RenderSink for RecordingSink {
	fn render(&self, template: &str, options: &RenderOptions) {
		self.events.borrow_mut().push(RenderEvent::Render {
			template: template.to_string(),
			region: options.to.clone(),
		});
	}

	fn clear_region(&self, region: &str) {
		self.events.borrow_mut().push(RenderEvent::Clear {
			region: region.to_string(),
		});
	}

	fn set_layout(&self, template: &str) {
		self.events.borrow_mut().push(RenderEvent::Layout {
			template: template.to_string(),
		});
	}
}
