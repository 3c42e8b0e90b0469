//! Compute and commit passes over the node tree, and its teardown.

use super::{
	node::{NodeKey, NodeKind},
	watched, State, TemplateShared, Watchers,
};
use crate::{expression::Context, Error, NodeHandle, Value};
use std::rc::Rc;
use tracing::trace;

impl State {
	/// Recomputes bindings below and including `key`. Never writes to the document.
	///
	/// Repeated clones are only visited with `pooled` set. Render passes leave them to reconciliation.
	pub(super) fn update_node(&mut self, shared: &TemplateShared, watchers: &Watchers, key: NodeKey, pooled: bool) {
		let node = match self.nodes.get_mut(key) {
			Some(node) => node,
			None => return,
		};
		let element = node.element;
		if shared.hosts_other(element) {
			return;
		}
		let scope = node.scope.clone();
		let transform = |pattern: &str, old: &Value, new: Value| watched(watchers, element, &scope, pattern, old, new);

		match &mut node.kind {
			NodeKind::Text { interpolation, html_host } => {
				let context = Context {
					element: Some(element),
					parent_element: html_host.or_else(|| shared.dom.parent(element)),
					attribute: None,
				};
				if interpolation.update(&scope, &context, &transform) {
					node.invalidate = true;
				}
			}
			NodeKind::Element(element_node) => {
				let parent_element = shared.dom.parent(element);
				for attribute in &mut element_node.attributes {
					attribute.update(&scope, element, parent_element, &transform);
				}
			}
		}

		let children = if pooled { node.descendant_keys() } else { node.children.clone() };
		for child in children {
			self.update_node(shared, watchers, child, pooled);
		}
	}

	/// Commits invalidated bindings below and including `key`, and reconciles repeaters.
	pub(super) fn render_node(&mut self, shared: &Rc<TemplateShared>, watchers: &Watchers, key: NodeKey) -> Result<(), Error> {
		let settings = &self.settings;
		let node = match self.nodes.get_mut(key) {
			Some(node) => node,
			None => return Ok(()),
		};
		let element = node.element;
		if shared.hosts_other(element) {
			return Ok(());
		}
		let dom = &*shared.dom;

		match &mut node.kind {
			NodeKind::Text { interpolation, html_host } => {
				if node.invalidate {
					let text = interpolation.render();
					trace!(?element, %text, "Committing text.");
					match html_host {
						Some(host) => dom.set_inner_html(*host, &text),
						None => dom.set_text(element, &text),
					}
				}
			}
			NodeKind::Element(element_node) => {
				if element_node.repeater.is_some() {
					node.invalidate = false;
					return self.reconcile(shared, watchers, key);
				}
				for attribute in &mut element_node.attributes {
					attribute.render(dom, element, settings);
				}
				for attribute in &element_node.attributes {
					attribute.apply_directives(dom, element, settings)?;
				}
			}
		}
		node.invalidate = false;

		for child in node.children.clone() {
			self.render_node(shared, watchers, child)?;
		}
		Ok(())
	}

	pub(super) fn invalidate_node(&mut self, key: NodeKey) {
		let node = match self.nodes.get_mut(key) {
			Some(node) => node,
			None => return,
		};
		node.invalidate = true;
		if let NodeKind::Element(element_node) = &mut node.kind {
			for attribute in &mut element_node.attributes {
				attribute.invalidate = true;
			}
		}
		for child in node.descendant_keys() {
			self.invalidate_node(child);
		}
	}

	/// Removes `key` and everything below it from the arena, unbinding listeners on the way.
	pub(super) fn dispose_node(&mut self, shared: &TemplateShared, key: NodeKey) {
		let node = match self.nodes.remove(key) {
			Some(node) => node,
			None => return,
		};
		if let NodeKind::Element(element_node) = &node.kind {
			shared.unbind(node.element, &element_node.events);
			if element_node.owns_scope {
				node.scope.detach();
			}
		}
		for child in node.descendant_keys() {
			self.dispose_node(shared, child);
		}
	}

	/// Collects the elements of repeaters below and including `key` that are out of the document.
	pub(super) fn detached_blueprints(&self, shared: &TemplateShared, key: NodeKey, out: &mut Vec<NodeHandle>) {
		let node = match self.nodes.get(key) {
			Some(node) => node,
			None => return,
		};
		if node.repeater().is_some() && shared.dom.parent(node.element).is_none() {
			out.push(node.element);
		}
		for child in node.descendant_keys() {
			self.detached_blueprints(shared, child, out);
		}
	}

	pub(super) fn clear_events_node(&mut self, shared: &TemplateShared, key: NodeKey) {
		let node = match self.nodes.get_mut(key) {
			Some(node) => node,
			None => return,
		};
		if shared.hosts_other(node.element) {
			return;
		}
		let element = node.element;
		if let NodeKind::Element(element_node) = &mut node.kind {
			shared.unbind(element, &element_node.events);
			element_node.events.clear();
		}
		for child in node.descendant_keys() {
			self.clear_events_node(shared, child);
		}
	}
}
