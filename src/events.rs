//! Per-node, per-event listener bookkeeping shared by all templates of an engine.

use crate::{identity_map::IdentityMap, Dom, Listener, ListenerId, NodeHandle};
use hashbrown::HashMap;
use tracing::trace;

/// At most one declarative listener per node and event type.
#[derive(Debug, Default)]
pub(crate) struct EventRegistry(IdentityMap<NodeHandle, HashMap<&'static str, ListenerId>>);

impl EventRegistry {
	/// Adds `listener`, removing whatever was registered for `event` on `node` before.
	pub fn bind(&mut self, dom: &dyn Dom, node: NodeHandle, event: &'static str, listener: Listener) -> ListenerId {
		let id = dom.add_listener(node, event, listener);
		if let Some(replaced) = self.0.get_or_insert_with(node, HashMap::new).insert(event, id) {
			trace!(?node, event, "Replacing listener.");
			dom.remove_listener(node, event, replaced);
		}
		id
	}

	/// Removes the listener for `event` on `node`, but only if it's still `id`.
	pub fn unbind(&mut self, dom: &dyn Dom, node: NodeHandle, event: &'static str, id: ListenerId) {
		let emptied = match self.0.get_mut(&node) {
			Some(events) if events.get(event) == Some(&id) => {
				events.remove(event);
				dom.remove_listener(node, event, id);
				events.is_empty()
			}
			_ => false,
		};
		if emptied {
			self.0.remove(&node);
		}
	}

	/// Removes every listener registered on `node`.
	pub fn clear(&mut self, dom: &dyn Dom, node: NodeHandle) {
		if let Some(events) = self.0.remove(&node) {
			for (event, id) in events {
				dom.remove_listener(node, event, id);
			}
		}
	}

	#[cfg(test)]
	pub fn count(&self, node: NodeHandle) -> usize {
		self.0.get(&node).map_or(0, HashMap::len)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Event, MemoryDocument};
	use std::rc::Rc;

	#[test]
	fn rebinding_replaces() {
		let document = MemoryDocument::parse("<button></button>");
		let button = document.elements_by_tag("button")[0];
		let mut registry = EventRegistry::default();
		let first = registry.bind(&document, button, "click", Rc::new(|_: Rc<Event>| ()));
		let second = registry.bind(&document, button, "click", Rc::new(|_: Rc<Event>| ()));
		assert_eq!(document.listener_count(button), 1);
		assert_eq!(registry.count(button), 1);

		registry.unbind(&document, button, "click", first);
		assert_eq!(document.listener_count(button), 1);
		registry.unbind(&document, button, "click", second);
		assert_eq!(document.listener_count(button), 0);
		assert_eq!(registry.count(button), 0);
	}

	#[test]
	fn clearing_removes_all_events() {
		let document = MemoryDocument::parse("<input>");
		let input = document.elements_by_tag("input")[0];
		let mut registry = EventRegistry::default();
		registry.bind(&document, input, "input", Rc::new(|_: Rc<Event>| ()));
		registry.bind(&document, input, "focus", Rc::new(|_: Rc<Event>| ()));
		registry.clear(&document, input);
		assert_eq!(document.listener_count(input), 0);
	}
}
