//! The compiled mirror of a template's element tree.

use crate::{
	attribute::Attribute, expression::Expression, interpolation::Interpolation, ListenerId, NodeHandle, Scope,
};

/// Index of a [`Node`] within its template's [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeKey(u32);

/// One compiled position: an interpolated text node or an element.
#[derive(Debug)]
pub(crate) struct Node {
	pub element: NodeHandle,
	pub scope: Scope,
	pub children: Vec<NodeKey>,
	pub invalidate: bool,
	pub kind: NodeKind,
}

#[derive(Debug)]
pub(crate) enum NodeKind {
	Text {
		interpolation: Interpolation,
		/// Element whose whole content this interpolates as markup, if it carries the html directive.
		html_host: Option<NodeHandle>,
	},
	Element(ElementNode),
}

#[derive(Debug, Default)]
pub(crate) struct ElementNode {
	pub attributes: Vec<Attribute>,
	pub skip: bool,
	pub html: bool,
	pub repeater: Option<Repeater>,
	/// Bound declarative handlers.
	pub events: Vec<(&'static str, ListenerId)>,
	/// Set on repeated clones, whose item scope dies with them.
	pub owns_scope: bool,
}

/// Bookkeeping for an element carrying the repeat directive.
///
/// The element itself only serves as the blueprint and is detached after the first reconciliation.
#[derive(Debug)]
pub(crate) struct Repeater {
	pub item: String,
	pub collection: Expression,
	/// Compiled clones, in document order.
	pub pool: Vec<NodeKey>,
	pub previous_sibling: Option<NodeHandle>,
	pub next_sibling: Option<NodeHandle>,
	pub parent_element: Option<NodeHandle>,
}

impl Repeater {
	/// Parses `item in collection`.
	pub fn parse(source: &str) -> Option<(String, Expression)> {
		let (item, collection) = source.split_once(" in ")?;
		let item = item.trim();
		let collection = collection.trim();
		if item.is_empty() || collection.is_empty() {
			return None;
		}
		Some((item.to_owned(), Expression::parse(collection)))
	}
}

impl Node {
	pub fn element_node(&self) -> Option<&ElementNode> {
		match &self.kind {
			NodeKind::Element(element) => Some(element),
			NodeKind::Text { .. } => None,
		}
	}

	pub fn element_node_mut(&mut self) -> Option<&mut ElementNode> {
		match &mut self.kind {
			NodeKind::Element(element) => Some(element),
			NodeKind::Text { .. } => None,
		}
	}

	pub fn repeater(&self) -> Option<&Repeater> {
		self.element_node()?.repeater.as_ref()
	}

	pub fn repeater_mut(&mut self) -> Option<&mut Repeater> {
		self.element_node_mut()?.repeater.as_mut()
	}

	/// Child nodes followed by repeated clones.
	pub fn descendant_keys(&self) -> Vec<NodeKey> {
		let mut keys = self.children.clone();
		if let Some(repeater) = self.repeater() {
			keys.extend_from_slice(&repeater.pool);
		}
		keys
	}
}

/// Slot storage for [`Node`]s. Freed slots are reused.
#[derive(Debug, Default)]
pub(crate) struct Arena {
	slots: Vec<Option<Node>>,
	free: Vec<u32>,
}

impl Arena {
	#[allow(clippy::cast_possible_truncation)]
	pub fn insert(&mut self, node: Node) -> NodeKey {
		if let Some(index) = self.free.pop() {
			self.slots[index as usize] = Some(node);
			NodeKey(index)
		} else {
			self.slots.push(Some(node));
			NodeKey((self.slots.len() - 1) as u32)
		}
	}

	pub fn get(&self, key: NodeKey) -> Option<&Node> {
		self.slots.get(key.0 as usize)?.as_ref()
	}

	pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
		self.slots.get_mut(key.0 as usize)?.as_mut()
	}

	pub fn remove(&mut self, key: NodeKey) -> Option<Node> {
		let node = self.slots.get_mut(key.0 as usize)?.take()?;
		self.free.push(key.0);
		Some(node)
	}

	pub fn len(&self) -> usize {
		self.slots.len() - self.free.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn element(handle: u32) -> Node {
		Node {
			element: NodeHandle(handle),
			scope: Scope::new(),
			children: Vec::new(),
			invalidate: true,
			kind: NodeKind::Element(ElementNode::default()),
		}
	}

	#[test]
	fn slots_are_reused() {
		let mut arena = Arena::default();
		let a = arena.insert(element(1));
		let b = arena.insert(element(2));
		assert_eq!(arena.remove(a).map(|n| n.element), Some(NodeHandle(1)));
		assert!(arena.get(a).is_none());
		let c = arena.insert(element(3));
		assert_eq!(c, a);
		assert_eq!(arena.len(), 2);
		assert_eq!(arena.get(b).map(|n| n.element), Some(NodeHandle(2)));
	}

	#[test]
	fn repeat_sources() {
		let (item, collection) = Repeater::parse(" user in  ../users ").unwrap();
		assert_eq!(item, "user");
		assert_eq!(collection.pattern(), "../users");
		let scope = Scope::new();
		assert!(collection.evaluate(&scope, &Default::default()).is_undefined());
		assert!(Repeater::parse("users").is_none());
		assert!(Repeater::parse(" in users").is_none());
	}
}
