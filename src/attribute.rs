//! Directive semantics: committing resolved attribute values onto elements.

use crate::{
	dom::Dom,
	expression::Context,
	interpolation::Interpolation,
	settings::{Directive, Settings},
	Error, NodeHandle, Scope, Value,
};
use tracing::trace;

/// Permissive boolean reading used by presentational directives.
///
/// `"true"`, `"1"`, `true` and `1` are true; `"false"`, `"0"`, `false`, `0` and strings with unresolved tokens are false.
/// Anything else is as truthy as it would be in a script.
pub(crate) fn to_boolean(value: &Value, settings: &Settings) -> bool {
	match value {
		Value::String(s) => match &**s {
			"true" | "1" => true,
			"false" | "0" => false,
			s if settings.has_token(s) => false,
			s => !s.is_empty(),
		},
		value => value.is_truthy(),
	}
}

/// One tracked attribute of an element node.
#[derive(Debug, Clone)]
pub(crate) struct Attribute {
	raw_name: String,
	raw_value: String,
	name: Interpolation,
	value: Interpolation,
	/// Name and value as last committed.
	current_name: String,
	current_value: String,
	previous_name: Option<String>,
	pub invalidate: bool,
	/// Native event, for event attributes.
	pub event: Option<&'static str>,
}

impl Attribute {
	pub fn new(name: &str, value: &str, settings: &Settings) -> Self {
		Self {
			raw_name: name.to_owned(),
			raw_value: value.to_owned(),
			name: Interpolation::new(name, settings),
			value: Interpolation::new(value, settings),
			current_name: name.to_owned(),
			current_value: value.to_owned(),
			previous_name: None,
			invalidate: true,
			event: settings.event(name),
		}
	}

	/// Raw, uninterpolated name.
	pub fn raw_name(&self) -> &str {
		&self.raw_name
	}

	pub fn raw_value(&self) -> &str {
		&self.raw_value
	}

	fn is_structural(&self, settings: &Settings) -> bool {
		self.event.is_some()
			|| matches!(
				settings.directive(&self.raw_name),
				Some(Directive::Repeat | Directive::Skip | Directive::Template)
			)
	}

	pub fn update(&mut self, scope: &Scope, element: NodeHandle, parent_element: Option<NodeHandle>, transform: &dyn Fn(&str, &Value, Value) -> Value) {
		let context = Context {
			element: Some(element),
			parent_element,
			attribute: Some((self.raw_name.as_str(), self.raw_value.as_str())),
		};
		let mut changed = self.name.update(scope, &context, transform);
		changed |= self.value.update(scope, &context, transform);
		if changed {
			self.invalidate = true;
		}
	}

	/// Writes the attribute itself if it changed.
	pub fn render(&mut self, dom: &dyn Dom, element: NodeHandle, settings: &Settings) {
		if !self.invalidate {
			return;
		}
		self.invalidate = false;
		if self.is_structural(settings) {
			return;
		}

		self.previous_name = Some(core::mem::replace(&mut self.current_name, self.name.render()));
		self.current_value = self.value.render();
		trace!(name = %self.current_name, value = %self.current_value, "Committing attribute");

		match settings.directive(&self.current_name) {
			Some(Directive::Src) => dom.set_attribute(element, "src", &self.current_value),
			Some(Directive::Href) => dom.set_attribute(element, "href", &self.current_value),
			_ => {
				if let Some(previous) = self.previous_name.as_deref().filter(|&p| p != self.current_name) {
					if previous == "class" {
						dom.set_attribute(element, "class", "");
					}
					dom.remove_attribute(element, previous);
				}
				dom.set_attribute(element, &self.current_name, &self.current_value);
			}
		}
	}

	/// Re-applies derived presentation state (classes, visibility, form-control flags).
	///
	/// Runs every pass, but only touches the document where its state disagrees.
	///
	/// # Errors
	///
	/// [`Error::MalformedClass`] if a class directive isn't a JSON object.
	pub fn apply_directives(&self, dom: &dyn Dom, element: NodeHandle, settings: &Settings) -> Result<(), Error> {
		match settings.directive(&self.current_name) {
			Some(Directive::Class) => {
				let classes: serde_json::Map<String, serde_json::Value> =
					serde_json::from_str(&self.current_value).map_err(|source| Error::MalformedClass {
						value: self.current_value.clone(),
						source,
					})?;
				for (class, enabled) in classes {
					let enabled = to_boolean(&enabled.into(), settings);
					if enabled != dom.has_class(element, &class) {
						if enabled {
							dom.add_class(element, &class);
						} else {
							dom.remove_class(element, &class);
						}
					}
				}
			}
			Some(directive @ (Directive::Show | Directive::Hide)) => {
				let truthy = to_boolean(&self.current_value.as_str().into(), settings);
				let visible = truthy == (directive == Directive::Show);
				let display = if visible { "" } else { "none" };
				if dom.style(element, "display") != display {
					dom.set_style(element, "display", display);
				}
			}
			Some(directive) => {
				if let Some(property) = directive.boolean_property() {
					let enabled = to_boolean(&self.current_value.as_str().into(), settings);
					if dom.property(element, property) != enabled {
						dom.set_property(element, property, enabled);
					}
					match (enabled, dom.attribute(element, property).is_some()) {
						(true, false) => dom.set_attribute(element, property, property),
						(false, true) => dom.remove_attribute(element, property),
						_ => (),
					}
				}
			}
			None => (),
		}

		if self.current_name == "class" && self.current_value.split_whitespace().any(|c| c == settings.cloak()) && dom.has_class(element, settings.cloak()) {
			dom.remove_class(element, settings.cloak());
		}
		Ok(())
	}
}
