//! The structured document a template is compiled from and rendered into.
//!
//! Templates never hold native nodes. Every position is addressed by a [`NodeHandle`],
//! which the [`Dom`] implementation resolves against its own storage.

use core::{
	any::Any,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;

/// Opaque, copyable reference to a node of one particular [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub(crate) u32);
impl NodeHandle {
	#[must_use]
	pub fn index(self) -> usize {
		self.0 as usize
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	Document,
	Element,
	Text,
	Comment,
	Other,
}

/// A dispatched event, as handed to declarative event handlers.
pub struct Event {
	pub kind: String,
	pub target: NodeHandle,
	native: Option<Box<dyn Any>>,
}
impl Event {
	#[must_use]
	pub fn new(kind: impl Into<String>, target: NodeHandle) -> Self {
		Self {
			kind: kind.into(),
			target,
			native: None,
		}
	}

	#[must_use]
	pub fn with_native(mut self, native: impl Any) -> Self {
		self.native = Some(Box::new(native));
		self
	}

	/// The backend's own event object, if there is one.
	#[must_use]
	pub fn native<T: Any>(&self) -> Option<&T> {
		self.native.as_ref()?.downcast_ref()
	}
}
impl Debug for Event {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event")
			.field("kind", &self.kind)
			.field("target", &self.target)
			.field("native", &self.native.is_some())
			.finish()
	}
}

pub type Listener = Rc<dyn Fn(Rc<Event>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Document capabilities the template engine relies on.
///
/// All methods take `&self`; implementations use interior mutability, like the browser DOM does.
/// Operations on handles the implementation doesn't know are no-ops.
/// Implementations must not hold internal borrows while invoking [`Listener`]s or ready callbacks,
/// since those routinely call back into the template engine.
pub trait Dom {
	/// The topmost node, scanned by auto-bootstrapping.
	fn root(&self) -> NodeHandle;
	fn node_type(&self, node: NodeHandle) -> NodeType;
	fn tag_name(&self, node: NodeHandle) -> Option<String>;

	fn parent(&self, node: NodeHandle) -> Option<NodeHandle>;
	fn children(&self, node: NodeHandle) -> Vec<NodeHandle>;
	fn previous_sibling(&self, node: NodeHandle) -> Option<NodeHandle>;
	fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle>;

	/// Character data of a text or comment node.
	fn text(&self, node: NodeHandle) -> Option<String>;
	fn set_text(&self, node: NodeHandle, text: &str);
	/// Serialized children of `node`.
	fn inner_html(&self, node: NodeHandle) -> String;
	/// Replaces all children of `node` with parsed `markup`. The replaced children are released.
	fn set_inner_html(&self, node: NodeHandle, markup: &str);

	/// Attributes in document order.
	fn attributes(&self, node: NodeHandle) -> Vec<(String, String)>;
	fn attribute(&self, node: NodeHandle, name: &str) -> Option<String>;
	fn set_attribute(&self, node: NodeHandle, name: &str, value: &str);
	fn remove_attribute(&self, node: NodeHandle, name: &str);

	fn has_class(&self, node: NodeHandle, class: &str) -> bool;
	fn add_class(&self, node: NodeHandle, class: &str);
	fn remove_class(&self, node: NodeHandle, class: &str);

	/// Inline style property, empty if unset.
	fn style(&self, node: NodeHandle, property: &str) -> String;
	fn set_style(&self, node: NodeHandle, property: &str, value: &str);

	/// Boolean IDL properties like `checked` or `disabled`.
	fn property(&self, node: NodeHandle, name: &str) -> bool;
	fn set_property(&self, node: NodeHandle, name: &str, value: bool);

	/// Deep clone. The clone is detached and carries no listeners.
	fn clone_node(&self, node: NodeHandle) -> NodeHandle;
	/// Inserts (or moves) `child` into `parent` before `reference`, or last if there is none.
	fn insert_before(&self, parent: NodeHandle, child: NodeHandle, reference: Option<NodeHandle>);
	/// Detaches `node` from its parent.
	fn remove(&self, node: NodeHandle);
	/// Forgets the detached `node` and everything below it, listeners included.
	/// Their handles may be handed out again afterwards.
	///
	/// Attached nodes are left alone.
	fn release(&self, node: NodeHandle);

	fn add_listener(&self, node: NodeHandle, event: &str, listener: Listener) -> ListenerId;
	fn remove_listener(&self, node: NodeHandle, event: &str, id: ListenerId);

	/// Runs `callback` once the document is interactive, synchronously if it already is.
	fn on_ready(&self, callback: Box<dyn FnOnce()>);

	fn is_element(&self, node: NodeHandle) -> bool {
		self.node_type(node) == NodeType::Element
	}

	/// Inserts `child` directly after `reference` within `parent`.
	fn insert_after(&self, parent: NodeHandle, child: NodeHandle, reference: NodeHandle) {
		let next = self.next_sibling(reference);
		self.insert_before(parent, child, next);
	}

	/// `node` followed by all of its descendants, in document order.
	fn descendants(&self, node: NodeHandle) -> Vec<NodeHandle> {
		let mut found = vec![node];
		let mut i = 0;
		while i < found.len() {
			let mut children = self.children(found[i]);
			let at = i + 1;
			found.splice(at..at, children.drain(..));
			i += 1;
		}
		found
	}
}
