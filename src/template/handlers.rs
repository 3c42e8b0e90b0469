//! Declarative event handlers of compiled elements.

use super::{
	node::{Node, NodeKey},
	State, Template, TemplateShared,
};
use crate::{
	expression::{Context, Expression},
	Event, Listener, Value,
};
use std::rc::Rc;
use tracing::{trace, warn};

impl State {
	/// Binds one listener per event attribute of `key`'s element, replacing earlier bindings for the same event.
	pub(super) fn bind_events(&mut self, shared: &Rc<TemplateShared>, key: NodeKey) {
		let node = match self.nodes.get_mut(key) {
			Some(node) => node,
			None => return,
		};
		let element = node.element;
		let element_node = match node.element_node_mut() {
			Some(element_node) => element_node,
			None => return,
		};
		let events: Vec<&'static str> = element_node.attributes.iter().filter_map(|attribute| attribute.event).collect();
		for event in events {
			let template = Rc::downgrade(shared);
			let listener: Listener = Rc::new(move |payload: Rc<Event>| {
				if let Some(template) = template.upgrade() {
					Template(template).dispatch(key, event, payload);
				}
			});
			let id = shared.bind(element, event, listener);
			match element_node.events.iter_mut().find(|(bound, _)| *bound == event) {
				Some(slot) => slot.1 = id,
				None => element_node.events.push((event, id)),
			}
		}
	}
}

impl Template {
	/// Resolves the handler for `event` on `key` from the current scope and calls it.
	fn dispatch(&self, key: NodeKey, event: &'static str, payload: Rc<Event>) {
		let shared = &self.0;
		let resolved = {
			let state = match shared.state.try_borrow() {
				Ok(state) => state,
				Err(_) => {
					warn!(event, "Event fired while its template was rendering; ignored.");
					return;
				}
			};
			let node = match state.nodes.get(key) {
				Some(node) => node,
				None => return,
			};
			let attribute = match node
				.element_node()
				.and_then(|element_node| element_node.attributes.iter().find(|attribute| attribute.event == Some(event)))
			{
				Some(attribute) => attribute,
				None => return,
			};
			let expression = Expression::parse(attribute.raw_value());
			let context = Context {
				element: Some(node.element),
				parent_element: shared.dom.parent(node.element),
				attribute: Some((attribute.raw_name(), attribute.raw_value())),
			};
			resolve(node, &expression, &context)
		};

		match resolved {
			(Value::Function(function), params, _) => {
				trace!(event, "Dispatching to handler.");
				let mut args = Vec::with_capacity(params.len() + 1);
				args.push(Value::Event(payload));
				args.extend(params);
				function.call(&args);
			}
			(other, _, pattern) => warn!(event, %pattern, ?other, "Event handler doesn't resolve to a function."),
		}
	}
}

fn resolve(node: &Node, expression: &Expression, context: &Context<'_>) -> (Value, Vec<Value>, String) {
	(
		expression.function(&node.scope, context),
		expression.params(&node.scope, context),
		expression.pattern().to_owned(),
	)
}
