//! Repeater reconciliation.
//!
//! Clones are matched to collection entries purely by position. Entry `i` always renders into pooled clone `i`,
//! so moving an entry re-renders the clones it passes over rather than moving DOM nodes.

use super::{
	node::{Node, NodeKey},
	State, TemplateShared, Watchers,
};
use crate::{expression::Context, Error, NodeHandle, Scope, Value};
use std::rc::Rc;
use tracing::{debug, instrument, warn};

/// What every clone of one repeater is made from.
struct Blueprint {
	element: NodeHandle,
	scope: Scope,
	item: String,
	previous_sibling: Option<NodeHandle>,
	next_sibling: Option<NodeHandle>,
	parent_element: Option<NodeHandle>,
}

impl State {
	#[instrument(level = "debug", skip(self, shared, watchers))]
	pub(super) fn reconcile(&mut self, shared: &Rc<TemplateShared>, watchers: &Watchers, key: NodeKey) -> Result<(), Error> {
		let (blueprint, data) = match self.nodes.get(key) {
			Some(node) => match node.repeater() {
				Some(repeater) => {
					let context = Context {
						element: Some(node.element),
						parent_element: repeater.parent_element,
						attribute: None,
					};
					let data = repeater.collection.evaluate(&node.scope, &context);
					let blueprint = Blueprint {
						element: node.element,
						scope: node.scope.clone(),
						item: repeater.item.clone(),
						previous_sibling: repeater.previous_sibling,
						next_sibling: repeater.next_sibling,
						parent_element: repeater.parent_element,
					};
					(blueprint, data)
				}
				None => return Ok(()),
			},
			None => return Ok(()),
		};

		let mut previous = None;
		let count = match &data {
			Value::Array(items) => {
				for (index, item) in items.iter().enumerate() {
					let binding = ("$index", Value::from(index));
					previous = Some(self.reconcile_item(shared, watchers, key, &blueprint, index, item.clone(), binding, previous)?);
				}
				items.len()
			}
			Value::Object(entries) => {
				for (index, (name, item)) in entries.iter().enumerate() {
					let binding = ("$key", Value::from(name.as_str()));
					previous = Some(self.reconcile_item(shared, watchers, key, &blueprint, index, item.clone(), binding, previous)?);
				}
				entries.len()
			}
			Value::Undefined | Value::Null => 0,
			other => {
				warn!(?other, "Repeated collection is neither an array nor an object.");
				0
			}
		};
		self.truncate_pool(shared, key, count);

		if shared.dom.parent(blueprint.element).is_some() {
			shared.dom.remove(blueprint.element);
		}
		Ok(())
	}

	/// Renders entry `index` into its pooled clone, cloning one first if needed. Returns the clone's element.
	#[allow(clippy::too_many_arguments)]
	fn reconcile_item(
		&mut self,
		shared: &Rc<TemplateShared>,
		watchers: &Watchers,
		key: NodeKey,
		blueprint: &Blueprint,
		index: usize,
		item: Value,
		(binding, binding_value): (&str, Value),
		previous: Option<NodeHandle>,
	) -> Result<NodeHandle, Error> {
		let pooled = self
			.nodes
			.get(key)
			.and_then(Node::repeater)
			.and_then(|repeater| repeater.pool.get(index).copied());
		if let Some((child, element, scope)) =
			pooled.and_then(|child| self.nodes.get(child).map(|node| (child, node.element, node.scope.clone())))
		{
			scope.set(blueprint.item.as_str(), item);
			scope.set(binding, binding_value);
			self.update_node(shared, watchers, child, false);
			self.render_node(shared, watchers, child)?;
			return Ok(element);
		}

		let dom = &*shared.dom;
		let clone = dom.clone_node(blueprint.element);
		match blueprint.parent_element {
			Some(parent) => {
				let attached = |node: &NodeHandle| dom.parent(*node) == Some(parent);
				if let Some(reference) = previous.filter(attached).or_else(|| blueprint.previous_sibling.filter(attached)) {
					dom.insert_after(parent, clone, reference);
				} else {
					dom.insert_before(parent, clone, blueprint.next_sibling.filter(attached));
				}
			}
			None => warn!("Repeated element has no parent, so its clones stay detached."),
		}
		debug!(index, ?clone, "Cloned repeated element.");

		let scope = blueprint.scope.child();
		scope.set(blueprint.item.as_str(), item);
		scope.set(binding, binding_value);
		let child = self.compile_element(shared, clone, Some(key), &scope, true);
		if let Some(element_node) = self.nodes.get_mut(child).and_then(Node::element_node_mut) {
			element_node.owns_scope = true;
		}
		if let Some(repeater) = self.nodes.get_mut(key).and_then(Node::repeater_mut) {
			repeater.pool.push(child);
		}
		self.update_node(shared, watchers, child, false);
		self.render_node(shared, watchers, child)?;
		Ok(clone)
	}

	/// Disposes, detaches and releases pooled clones from `len` on.
	///
	/// Nested repeaters' detached blueprints are released along with the clone containing them.
	fn truncate_pool(&mut self, shared: &TemplateShared, key: NodeKey, len: usize) {
		let excess = match self.nodes.get_mut(key).and_then(Node::repeater_mut) {
			Some(repeater) if repeater.pool.len() > len => repeater.pool.split_off(len),
			_ => return,
		};
		debug!(removed = excess.len(), "Shrinking repeater.");
		let dom = &*shared.dom;
		for child in excess {
			let element = match self.nodes.get(child) {
				Some(node) => node.element,
				None => continue,
			};
			let mut blueprints = Vec::new();
			self.detached_blueprints(shared, child, &mut blueprints);
			dom.remove(element);
			self.dispose_node(shared, child);
			dom.release(element);
			for blueprint in blueprints {
				dom.release(blueprint);
			}
		}
	}
}
