//! [`Dom`] over the browser's document, via [`web_sys`].

use crate::{Dom, Event, Listener, ListenerId, NodeHandle, NodeType};
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use js_sys::{Map, Reflect};
use std::rc::Rc;
use tracing::{error, instrument, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{CharacterData, Element, HtmlElement, Node};

/// The IDL name of a reflected boolean attribute.
fn property_name(attribute: &str) -> &str {
	match attribute {
		"readonly" => "readOnly",
		other => other,
	}
}

struct Binding {
	node: NodeHandle,
	event: String,
	closure: Closure<dyn Fn(web_sys::Event)>,
}

/// The live document of the current page.
///
/// Native nodes are assigned a [`NodeHandle`] the first time they're seen.
/// Handles stay valid until the node is [released](`Dom::release`), after which their slot is reused.
pub struct WebDocument {
	document: web_sys::Document,
	nodes: RefCell<Vec<Option<Node>>>,
	free: RefCell<Vec<NodeHandle>>,
	handles: Map,
	bindings: RefCell<HashMap<ListenerId, Binding>>,
	next_listener: Cell<u64>,
}

impl WebDocument {
	/// The current window's document, if there is one.
	#[must_use]
	pub fn new() -> Option<Self> {
		Some(Self::from_document(web_sys::window()?.document()?))
	}

	#[must_use]
	pub fn from_document(document: web_sys::Document) -> Self {
		Self {
			document,
			nodes: RefCell::default(),
			free: RefCell::default(),
			handles: Map::new(),
			bindings: RefCell::default(),
			next_listener: Cell::new(0),
		}
	}

	/// The handle for `node`, assigning one if necessary.
	#[allow(clippy::cast_possible_truncation)]
	pub fn handle(&self, node: &Node) -> NodeHandle {
		if let Some(index) = self.existing_handle(node) {
			return index;
		}
		let mut nodes = self.nodes.borrow_mut();
		let handle = match self.free.borrow_mut().pop() {
			Some(handle) => {
				nodes[handle.index()] = Some(node.clone());
				handle
			}
			None => {
				nodes.push(Some(node.clone()));
				NodeHandle((nodes.len() - 1) as u32)
			}
		};
		self.handles.set(node.as_ref(), &JsValue::from(handle.0));
		handle
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn existing_handle(&self, node: &Node) -> Option<NodeHandle> {
		self.handles.get(node.as_ref()).as_f64().map(|index| NodeHandle(index as u32))
	}

	#[must_use]
	pub fn node(&self, handle: NodeHandle) -> Option<Node> {
		self.nodes.borrow().get(handle.index()).cloned().flatten()
	}

	/// Number of nodes that currently have a handle.
	#[must_use]
	pub fn handle_count(&self) -> usize {
		self.nodes.borrow().len() - self.free.borrow().len()
	}

	/// Collects the handles of `node` and its native descendants that have one.
	fn subtree_handles(&self, node: &Node, handles: &mut Vec<(NodeHandle, Node)>) {
		let child_nodes = node.child_nodes();
		for child in (0..child_nodes.length()).filter_map(|i| child_nodes.item(i)) {
			self.subtree_handles(&child, handles);
		}
		if let Some(handle) = self.existing_handle(node) {
			handles.push((handle, node.clone()));
		}
	}

	/// Unhooks listeners below and including the detached `native` and frees their handles.
	fn forget(&self, native: &Node) {
		let mut released = Vec::new();
		self.subtree_handles(native, &mut released);

		let stale: Vec<(ListenerId, NodeHandle, String)> = self
			.bindings
			.borrow()
			.iter()
			.filter(|(_, binding)| released.iter().any(|(handle, _)| *handle == binding.node))
			.map(|(&id, binding)| (id, binding.node, binding.event.clone()))
			.collect();
		for (id, target, event) in stale {
			self.remove_listener(target, &event, id);
		}

		let mut nodes = self.nodes.borrow_mut();
		let mut free = self.free.borrow_mut();
		for (handle, native) in &released {
			self.handles.delete(native.as_ref());
			if let Some(slot) = nodes.get_mut(handle.index()) {
				*slot = None;
			}
			free.push(*handle);
		}
		trace!(released = released.len(), "Released nodes.");
	}
}

impl Dom for WebDocument {
	fn root(&self) -> NodeHandle {
		self.handle(self.document.as_ref())
	}

	fn node_type(&self, node: NodeHandle) -> NodeType {
		match self.node(node).map(|node| node.node_type()) {
			Some(Node::ELEMENT_NODE) => NodeType::Element,
			Some(Node::TEXT_NODE) => NodeType::Text,
			Some(Node::COMMENT_NODE) => NodeType::Comment,
			Some(Node::DOCUMENT_NODE) => NodeType::Document,
			_ => NodeType::Other,
		}
	}

	fn tag_name(&self, node: NodeHandle) -> Option<String> {
		Some(self.element(node)?.tag_name().to_ascii_lowercase())
	}

	fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
		let parent = self.node(node)?.parent_node()?;
		Some(self.handle(&parent))
	}

	fn children(&self, node: NodeHandle) -> Vec<NodeHandle> {
		let node = match self.node(node) {
			Some(node) => node,
			None => return Vec::new(),
		};
		let child_nodes = node.child_nodes();
		(0..child_nodes.length())
			.filter_map(|i| child_nodes.item(i))
			.map(|child| self.handle(&child))
			.collect()
	}

	fn previous_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
		let sibling = self.node(node)?.previous_sibling()?;
		Some(self.handle(&sibling))
	}

	fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
		let sibling = self.node(node)?.next_sibling()?;
		Some(self.handle(&sibling))
	}

	fn text(&self, node: NodeHandle) -> Option<String> {
		Some(self.node(node)?.dyn_into::<CharacterData>().ok()?.data())
	}

	fn set_text(&self, node: NodeHandle, text: &str) {
		match self.node(node).and_then(|node| node.dyn_into::<CharacterData>().ok()) {
			Some(data) => data.set_data(text),
			None => error!(?node, "Expected character data to update."),
		}
	}

	fn inner_html(&self, node: NodeHandle) -> String {
		self.element(node).map(|element| element.inner_html()).unwrap_or_default()
	}

	fn set_inner_html(&self, node: NodeHandle, markup: &str) {
		let element = match self.element(node) {
			Some(element) => element,
			None => return error!(?node, "Expected an element to replace the content of."),
		};
		let child_nodes = element.child_nodes();
		let replaced: Vec<Node> = (0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).collect();
		element.set_inner_html(markup);
		for child in &replaced {
			self.forget(child);
		}
	}

	fn attributes(&self, node: NodeHandle) -> Vec<(String, String)> {
		let attributes = match self.element(node) {
			Some(element) => element.attributes(),
			None => return Vec::new(),
		};
		(0..attributes.length())
			.filter_map(|i| attributes.item(i))
			.map(|attribute| (attribute.name(), attribute.value()))
			.collect()
	}

	fn attribute(&self, node: NodeHandle, name: &str) -> Option<String> {
		self.element(node)?.get_attribute(name)
	}

	fn set_attribute(&self, node: NodeHandle, name: &str, value: &str) {
		if let Some(element) = self.element(node) {
			if let Err(error) = element.set_attribute(name, value) {
				error!("Failed to set attribute {:?}: {:?}", name, error);
			}
		}
	}

	fn remove_attribute(&self, node: NodeHandle, name: &str) {
		if let Some(element) = self.element(node) {
			if let Err(error) = element.remove_attribute(name) {
				error!("Failed to remove attribute {:?}: {:?}", name, error);
			}
		}
	}

	fn has_class(&self, node: NodeHandle, class: &str) -> bool {
		self.element(node).map_or(false, |element| element.class_list().contains(class))
	}

	fn add_class(&self, node: NodeHandle, class: &str) {
		if let Some(element) = self.element(node) {
			if let Err(error) = element.class_list().add_1(class) {
				error!("Failed to add class {:?}: {:?}", class, error);
			}
		}
	}

	fn remove_class(&self, node: NodeHandle, class: &str) {
		if let Some(element) = self.element(node) {
			if let Err(error) = element.class_list().remove_1(class) {
				error!("Failed to remove class {:?}: {:?}", class, error);
			}
		}
	}

	fn style(&self, node: NodeHandle, property: &str) -> String {
		self.html_element(node)
			.and_then(|element| element.style().get_property_value(property).ok())
			.unwrap_or_default()
	}

	fn set_style(&self, node: NodeHandle, property: &str, value: &str) {
		if let Some(element) = self.html_element(node) {
			if let Err(error) = element.style().set_property(property, value) {
				error!("Failed to set style {:?}: {:?}", property, error);
			}
		}
	}

	fn property(&self, node: NodeHandle, name: &str) -> bool {
		self.node(node)
			.and_then(|node| Reflect::get(node.as_ref(), &JsValue::from_str(property_name(name))).ok())
			.and_then(|value| value.as_bool())
			.unwrap_or(false)
	}

	fn set_property(&self, node: NodeHandle, name: &str, value: bool) {
		if let Some(node) = self.node(node) {
			if let Err(error) = Reflect::set(node.as_ref(), &JsValue::from_str(property_name(name)), &JsValue::from_bool(value)) {
				error!("Failed to set property {:?}: {:?}", name, error);
			}
		}
	}

	fn clone_node(&self, node: NodeHandle) -> NodeHandle {
		match self.node(node).map(|node| node.clone_node_with_deep(true)) {
			Some(Ok(clone)) => self.handle(&clone),
			Some(Err(error)) => {
				error!("Failed to clone node: {:?}", error);
				node
			}
			None => node,
		}
	}

	fn insert_before(&self, parent: NodeHandle, child: NodeHandle, reference: Option<NodeHandle>) {
		let (parent, child) = match (self.node(parent), self.node(child)) {
			(Some(parent), Some(child)) => (parent, child),
			_ => return error!("Unknown node handle; nothing inserted."),
		};
		let reference = reference.and_then(|reference| self.node(reference));
		if let Err(error) = parent.insert_before(&child, reference.as_ref()) {
			error!("Failed to insert node: {:?}", error);
		}
	}

	fn remove(&self, node: NodeHandle) {
		let node = match self.node(node) {
			Some(node) => node,
			None => return,
		};
		match node.parent_node() {
			Some(parent) => {
				if let Err(error) = parent.remove_child(&node) {
					error!("Failed to remove the node: {:?}", error);
				}
			}
			None => trace!("Node to remove is already detached."),
		}
	}

	fn release(&self, node: NodeHandle) {
		match self.node(node) {
			Some(native) if native.parent_node().is_none() => self.forget(&native),
			_ => trace!(?node, "Not releasing an attached or unknown node."),
		}
	}

	#[instrument(skip(self, listener))]
	fn add_listener(&self, node: NodeHandle, event: &str, listener: Listener) -> ListenerId {
		let id = ListenerId(self.next_listener.get());
		self.next_listener.set(id.0 + 1);
		let target = match self.node(node) {
			Some(target) => target,
			None => return id,
		};
		let closure = Closure::wrap(Box::new(move |native: web_sys::Event| {
			listener(Rc::new(Event::new(native.type_(), node).with_native(native)));
		}) as Box<dyn Fn(web_sys::Event)>);
		if let Err(error) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
			error!("Failed to add event listener: {:?}", error);
			return id;
		}
		self.bindings.borrow_mut().insert(
			id,
			Binding {
				node,
				event: event.to_owned(),
				closure,
			},
		);
		id
	}

	fn remove_listener(&self, node: NodeHandle, event: &str, id: ListenerId) {
		let binding = match self.bindings.borrow_mut().remove(&id) {
			Some(binding) => binding,
			None => return,
		};
		debug_assert!(binding.node == node && binding.event == event);
		if let Some(target) = self.node(binding.node) {
			if let Err(error) = target.remove_event_listener_with_callback(&binding.event, binding.closure.as_ref().unchecked_ref()) {
				error!("Failed to remove event listener: {:?}", error);
			}
		}
	}

	fn on_ready(&self, callback: Box<dyn FnOnce()>) {
		if self.document.ready_state() != "loading" {
			return callback();
		}
		let options = web_sys::AddEventListenerOptions::new();
		options.set_once(true);
		let closure = Closure::once_into_js(move || callback());
		if let Err(error) = self.document.add_event_listener_with_callback_and_add_event_listener_options(
			"DOMContentLoaded",
			closure.unchecked_ref(),
			&options,
		) {
			error!("Failed to wait for the document: {:?}", error);
		}
	}
}
