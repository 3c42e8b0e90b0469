//! An arena-backed [`Dom`] that lives entirely in Rust memory.
//!
//! Useful for server-side rendering and for testing templates without a browser.
//! Markup is parsed with `html5ever`. Detached nodes stay in the arena until they are [released](`Dom::release`).

use crate::dom::{Dom, Event, Listener, ListenerId, NodeHandle, NodeType};
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use html5ever::{parse_document, tendril::TendrilSink};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use std::rc::Rc;
use tracing::{instrument, trace, warn};

const VOID_ELEMENTS: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];
/// Elements whose text is serialized as is.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone)]
enum Data {
	Document,
	Element(ElementData),
	Text(String),
	Comment(String),
}

#[derive(Debug, Clone, Default)]
struct ElementData {
	tag: String,
	attributes: Vec<(String, String)>,
	style: Vec<(String, String)>,
	properties: HashMap<String, bool>,
}
impl ElementData {
	fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
	}

	fn set_attribute(&mut self, name: &str, value: &str) {
		match self.attributes.iter_mut().find(|(n, _)| n == name) {
			Some((_, v)) => *v = value.to_owned(),
			None => self.attributes.push((name.to_owned(), value.to_owned())),
		}
	}

	fn classes(&self) -> Vec<String> {
		self.attribute("class").unwrap_or_default().split_whitespace().map(str::to_owned).collect()
	}
}

struct MemoryNode {
	parent: Option<NodeHandle>,
	children: Vec<NodeHandle>,
	data: Data,
	listeners: Vec<(String, ListenerId, Listener)>,
}
impl MemoryNode {
	fn new(data: Data) -> Self {
		Self {
			parent: None,
			children: Vec::new(),
			data,
			listeners: Vec::new(),
		}
	}
}

#[derive(Default)]
struct Arena {
	nodes: Vec<Option<MemoryNode>>,
	free: Vec<NodeHandle>,
}
impl Arena {
	#[allow(clippy::cast_possible_truncation)]
	fn push(&mut self, data: Data) -> NodeHandle {
		match self.free.pop() {
			Some(handle) => {
				self.nodes[handle.index()] = Some(MemoryNode::new(data));
				handle
			}
			None => {
				let handle = NodeHandle(self.nodes.len() as u32);
				self.nodes.push(Some(MemoryNode::new(data)));
				handle
			}
		}
	}

	fn get(&self, node: NodeHandle) -> Option<&MemoryNode> {
		self.nodes.get(node.index())?.as_ref()
	}

	fn get_mut(&mut self, node: NodeHandle) -> Option<&mut MemoryNode> {
		self.nodes.get_mut(node.index())?.as_mut()
	}

	fn len(&self) -> usize {
		self.nodes.len() - self.free.len()
	}

	/// Frees `node` and its subtree. Returns how many slots were freed.
	fn release(&mut self, node: NodeHandle) -> usize {
		let released = match self.nodes.get_mut(node.index()).and_then(Option::take) {
			Some(released) => released,
			None => return 0,
		};
		self.free.push(node);
		released.children.into_iter().map(|child| self.release(child)).sum::<usize>() + 1
	}

	fn element(&self, node: NodeHandle) -> Option<&ElementData> {
		match &self.get(node)?.data {
			Data::Element(element) => Some(element),
			_ => None,
		}
	}

	fn element_mut(&mut self, node: NodeHandle) -> Option<&mut ElementData> {
		match &mut self.get_mut(node)?.data {
			Data::Element(element) => Some(element),
			_ => None,
		}
	}

	fn detach(&mut self, node: NodeHandle) -> bool {
		let parent = match self.get_mut(node).and_then(|n| n.parent.take()) {
			Some(parent) => parent,
			None => return false,
		};
		if let Some(parent) = self.get_mut(parent) {
			parent.children.retain(|&c| c != node);
		}
		true
	}

	fn append(&mut self, parent: NodeHandle, child: NodeHandle) {
		self.detach(child);
		if let Some(p) = self.get_mut(parent) {
			p.children.push(child);
			if let Some(c) = self.get_mut(child) {
				c.parent = Some(parent);
			}
		}
	}

	fn deep_clone(&mut self, node: NodeHandle) -> Option<NodeHandle> {
		let data = self.get(node)?.data.clone();
		let children = self.get(node)?.children.clone();
		let clone = self.push(data);
		for child in children {
			if let Some(child_clone) = self.deep_clone(child) {
				self.append(clone, child_clone);
			}
		}
		Some(clone)
	}

	/// Copies an `html5ever` tree below `parent`.
	fn load(&mut self, handle: &Handle, parent: NodeHandle) {
		match &handle.data {
			RcNodeData::Document => {
				for child in handle.children.borrow().iter() {
					self.load(child, parent);
				}
			}
			RcNodeData::Text { contents } => {
				let id = self.push(Data::Text(contents.borrow().to_string()));
				self.append(parent, id);
			}
			RcNodeData::Comment { contents } => {
				let id = self.push(Data::Comment(contents.to_string()));
				self.append(parent, id);
			}
			RcNodeData::Element { name, attrs, .. } => {
				let element = ElementData {
					tag: name.local.to_string(),
					attributes: attrs.borrow().iter().map(|a| (a.name.local.to_string(), a.value.to_string())).collect(),
					..ElementData::default()
				};
				let id = self.push(Data::Element(element));
				self.append(parent, id);
				for child in handle.children.borrow().iter() {
					self.load(child, id);
				}
			}
			RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => (),
		}
	}
}

/// Finds `<body>` in a parsed document. Fragments always land there.
fn parsed_body(dom: &RcDom) -> Option<Handle> {
	fn find(handle: &Handle, tag: &str) -> Option<Handle> {
		handle
			.children
			.borrow()
			.iter()
			.find(|child| matches!(&child.data, RcNodeData::Element { name, .. } if &*name.local == tag))
			.cloned()
	}
	find(&find(&dom.document, "html")?, "body")
}

/// An in-memory document.
///
/// Every mutating [`Dom`] call counts as one write, see [`MemoryDocument::writes`].
pub struct MemoryDocument {
	arena: RefCell<Arena>,
	root: NodeHandle,
	body: NodeHandle,
	writes: Cell<usize>,
	next_listener: Cell<u64>,
	ready: Cell<bool>,
	pending: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Default for MemoryDocument {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDocument {
	/// A ready document consisting of `<html><body></body></html>`.
	#[must_use]
	pub fn new() -> Self {
		let mut arena = Arena::default();
		let root = arena.push(Data::Document);
		let html = arena.push(Data::Element(ElementData {
			tag: "html".to_owned(),
			..ElementData::default()
		}));
		let body = arena.push(Data::Element(ElementData {
			tag: "body".to_owned(),
			..ElementData::default()
		}));
		arena.append(root, html);
		arena.append(html, body);
		Self {
			arena: RefCell::new(arena),
			root,
			body,
			writes: Cell::new(0),
			next_listener: Cell::new(0),
			ready: Cell::new(true),
			pending: RefCell::default(),
		}
	}

	/// A document that is still loading. [`Dom::on_ready`] callbacks queue until [`MemoryDocument::finish_loading`].
	#[must_use]
	pub fn loading() -> Self {
		let document = Self::new();
		document.ready.set(false);
		document
	}

	/// A ready document whose `<body>` contains `markup`.
	#[must_use]
	pub fn parse(markup: &str) -> Self {
		let document = Self::new();
		document.append_markup(document.body, markup);
		document.writes.set(0);
		document
	}

	/// Marks the document interactive and flushes queued ready callbacks in order.
	pub fn finish_loading(&self) {
		if self.ready.replace(true) {
			return;
		}
		let pending = self.pending.take();
		trace!("Flushing {} ready callback(s).", pending.len());
		for callback in pending {
			callback();
		}
	}

	#[must_use]
	pub fn body(&self) -> NodeHandle {
		self.body
	}

	/// Number of nodes currently held, attached or not.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.arena.borrow().len()
	}

	/// Number of mutating calls made so far.
	#[must_use]
	pub fn writes(&self) -> usize {
		self.writes.get()
	}

	pub fn create_element(&self, tag: &str) -> NodeHandle {
		self.arena.borrow_mut().push(Data::Element(ElementData {
			tag: tag.to_ascii_lowercase(),
			..ElementData::default()
		}))
	}

	pub fn create_text(&self, text: &str) -> NodeHandle {
		self.arena.borrow_mut().push(Data::Text(text.to_owned()))
	}

	pub fn append_child(&self, parent: NodeHandle, child: NodeHandle) {
		self.insert_before(parent, child, None);
	}

	/// Parses `markup` and appends the result to `parent`.
	#[instrument(skip(self, markup))]
	pub fn append_markup(&self, parent: NodeHandle, markup: &str) {
		let dom = parse_document(RcDom::default(), Default::default()).one(markup);
		match parsed_body(&dom) {
			Some(body) => {
				let mut arena = self.arena.borrow_mut();
				for child in body.children.borrow().iter() {
					arena.load(child, parent);
				}
			}
			None => warn!("Parsed markup has no body; nothing was appended."),
		}
	}

	/// Fires `kind` on `node`'s own listeners, returning how many ran.
	///
	/// Events don't bubble.
	pub fn dispatch(&self, node: NodeHandle, kind: &str) -> usize {
		let listeners: Vec<Listener> = match self.arena.borrow().get(node) {
			Some(n) => n.listeners.iter().filter(|(k, _, _)| k == kind).map(|(_, _, l)| Listener::clone(l)).collect(),
			None => return 0,
		};
		let event = Rc::new(Event::new(kind, node));
		for listener in &listeners {
			listener(Rc::clone(&event));
		}
		listeners.len()
	}

	#[must_use]
	pub fn listener_count(&self, node: NodeHandle) -> usize {
		self.arena.borrow().get(node).map_or(0, |n| n.listeners.len())
	}

	/// Concatenated text of `node` and its descendants.
	#[must_use]
	pub fn text_content(&self, node: NodeHandle) -> String {
		let arena = self.arena.borrow();
		let mut text = String::new();
		collect_text(&arena, node, &mut text);
		text
	}

	#[must_use]
	pub fn outer_html(&self, node: NodeHandle) -> String {
		let arena = self.arena.borrow();
		let mut html = String::new();
		serialize(&arena, node, &mut html);
		html
	}

	/// First attached element (in document order) with `name="value"`.
	#[must_use]
	pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<NodeHandle> {
		self.descendants(self.root).into_iter().find(|&node| self.attribute(node, name).as_deref() == Some(value))
	}

	#[must_use]
	pub fn find_by_id(&self, id: &str) -> Option<NodeHandle> {
		self.find_by_attribute("id", id)
	}

	/// Attached elements with the given tag name, in document order.
	#[must_use]
	pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeHandle> {
		self.descendants(self.root)
			.into_iter()
			.filter(|&node| self.tag_name(node).as_deref() == Some(tag))
			.collect()
	}

	fn write(&self) {
		self.writes.set(self.writes.get() + 1);
	}
}

fn collect_text(arena: &Arena, node: NodeHandle, text: &mut String) {
	if let Some(n) = arena.get(node) {
		if let Data::Text(t) = &n.data {
			text.push_str(t);
		}
		for &child in &n.children {
			collect_text(arena, child, text);
		}
	}
}

fn escape_text(text: &str, out: &mut String) {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			c => out.push(c),
		}
	}
}

fn escape_attribute(value: &str, out: &mut String) {
	for c in value.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			c => out.push(c),
		}
	}
}

fn serialize(arena: &Arena, node: NodeHandle, out: &mut String) {
	let n = match arena.get(node) {
		Some(n) => n,
		None => return,
	};
	match &n.data {
		Data::Document => {
			for &child in &n.children {
				serialize(arena, child, out);
			}
		}
		Data::Text(text) => escape_text(text, out),
		Data::Comment(comment) => {
			out.push_str("<!--");
			out.push_str(comment);
			out.push_str("-->");
		}
		Data::Element(element) => {
			out.push('<');
			out.push_str(&element.tag);
			for (name, value) in &element.attributes {
				out.push(' ');
				out.push_str(name);
				out.push_str("=\"");
				escape_attribute(value, out);
				out.push('"');
			}
			out.push('>');
			if VOID_ELEMENTS.contains(&element.tag.as_str()) {
				return;
			}
			if RAW_TEXT_ELEMENTS.contains(&element.tag.as_str()) {
				for &child in &n.children {
					if let Some(Data::Text(text)) = arena.get(child).map(|c| &c.data) {
						out.push_str(text);
					}
				}
			} else {
				for &child in &n.children {
					serialize(arena, child, out);
				}
			}
			out.push_str("</");
			out.push_str(&element.tag);
			out.push('>');
		}
	}
}

impl Dom for MemoryDocument {
	fn root(&self) -> NodeHandle {
		self.root
	}

	fn node_type(&self, node: NodeHandle) -> NodeType {
		match self.arena.borrow().get(node).map(|n| &n.data) {
			Some(Data::Document) => NodeType::Document,
			Some(Data::Element(_)) => NodeType::Element,
			Some(Data::Text(_)) => NodeType::Text,
			Some(Data::Comment(_)) => NodeType::Comment,
			None => NodeType::Other,
		}
	}

	fn tag_name(&self, node: NodeHandle) -> Option<String> {
		self.arena.borrow().element(node).map(|e| e.tag.clone())
	}

	fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
		self.arena.borrow().get(node)?.parent
	}

	fn children(&self, node: NodeHandle) -> Vec<NodeHandle> {
		self.arena.borrow().get(node).map(|n| n.children.clone()).unwrap_or_default()
	}

	fn previous_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
		let arena = self.arena.borrow();
		let siblings = &arena.get(arena.get(node)?.parent?)?.children;
		let i = siblings.iter().position(|&c| c == node)?;
		i.checked_sub(1).map(|i| siblings[i])
	}

	fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
		let arena = self.arena.borrow();
		let siblings = &arena.get(arena.get(node)?.parent?)?.children;
		let i = siblings.iter().position(|&c| c == node)?;
		siblings.get(i + 1).copied()
	}

	fn text(&self, node: NodeHandle) -> Option<String> {
		match &self.arena.borrow().get(node)?.data {
			Data::Text(text) | Data::Comment(text) => Some(text.clone()),
			_ => None,
		}
	}

	fn set_text(&self, node: NodeHandle, text: &str) {
		if let Some(n) = self.arena.borrow_mut().get_mut(node) {
			if let Data::Text(t) | Data::Comment(t) = &mut n.data {
				*t = text.to_owned();
			}
		}
		self.write();
	}

	fn inner_html(&self, node: NodeHandle) -> String {
		let arena = self.arena.borrow();
		let mut html = String::new();
		for &child in arena.get(node).map(|n| n.children.as_slice()).unwrap_or_default() {
			serialize(&arena, child, &mut html);
		}
		html
	}

	fn set_inner_html(&self, node: NodeHandle, markup: &str) {
		{
			let mut arena = self.arena.borrow_mut();
			for child in arena.get(node).map(|n| n.children.clone()).unwrap_or_default() {
				arena.detach(child);
				arena.release(child);
			}
		}
		self.append_markup(node, markup);
		self.write();
	}

	fn attributes(&self, node: NodeHandle) -> Vec<(String, String)> {
		self.arena.borrow().element(node).map(|e| e.attributes.clone()).unwrap_or_default()
	}

	fn attribute(&self, node: NodeHandle, name: &str) -> Option<String> {
		self.arena.borrow().element(node)?.attribute(name).map(str::to_owned)
	}

	fn set_attribute(&self, node: NodeHandle, name: &str, value: &str) {
		if let Some(element) = self.arena.borrow_mut().element_mut(node) {
			element.set_attribute(name, value);
		}
		self.write();
	}

	fn remove_attribute(&self, node: NodeHandle, name: &str) {
		if let Some(element) = self.arena.borrow_mut().element_mut(node) {
			element.attributes.retain(|(n, _)| n != name);
		}
		self.write();
	}

	fn has_class(&self, node: NodeHandle, class: &str) -> bool {
		self.arena.borrow().element(node).map_or(false, |e| e.classes().iter().any(|c| c == class))
	}

	fn add_class(&self, node: NodeHandle, class: &str) {
		if let Some(element) = self.arena.borrow_mut().element_mut(node) {
			let mut classes = element.classes();
			if !classes.iter().any(|c| c == class) {
				classes.push(class.to_owned());
			}
			element.set_attribute("class", &classes.join(" "));
		}
		self.write();
	}

	fn remove_class(&self, node: NodeHandle, class: &str) {
		if let Some(element) = self.arena.borrow_mut().element_mut(node) {
			let mut classes = element.classes();
			classes.retain(|c| c != class);
			element.set_attribute("class", &classes.join(" "));
		}
		self.write();
	}

	fn style(&self, node: NodeHandle, property: &str) -> String {
		self.arena
			.borrow()
			.element(node)
			.and_then(|e| e.style.iter().find(|(p, _)| p == property).map(|(_, v)| v.clone()))
			.unwrap_or_default()
	}

	fn set_style(&self, node: NodeHandle, property: &str, value: &str) {
		if let Some(element) = self.arena.borrow_mut().element_mut(node) {
			element.style.retain(|(p, _)| p != property);
			if !value.is_empty() {
				element.style.push((property.to_owned(), value.to_owned()));
			}
		}
		self.write();
	}

	fn property(&self, node: NodeHandle, name: &str) -> bool {
		self.arena.borrow().element(node).and_then(|e| e.properties.get(name).copied()).unwrap_or(false)
	}

	fn set_property(&self, node: NodeHandle, name: &str, value: bool) {
		if let Some(element) = self.arena.borrow_mut().element_mut(node) {
			element.properties.insert(name.to_owned(), value);
		}
		self.write();
	}

	fn clone_node(&self, node: NodeHandle) -> NodeHandle {
		let mut arena = self.arena.borrow_mut();
		match arena.deep_clone(node) {
			Some(clone) => clone,
			None => {
				warn!("Cloning unknown node {:?}; substituting an empty text node.", node);
				arena.push(Data::Text(String::new()))
			}
		}
	}

	fn insert_before(&self, parent: NodeHandle, child: NodeHandle, reference: Option<NodeHandle>) {
		{
			let mut arena = self.arena.borrow_mut();
			arena.detach(child);
			let index = reference.and_then(|r| arena.get(parent)?.children.iter().position(|&c| c == r));
			match (index, arena.get_mut(parent)) {
				(Some(i), Some(p)) => p.children.insert(i, child),
				(None, Some(p)) => p.children.push(child),
				(_, None) => return warn!("Inserting into unknown node {:?}.", parent),
			}
			if let Some(c) = arena.get_mut(child) {
				c.parent = Some(parent);
			}
		}
		self.write();
	}

	fn remove(&self, node: NodeHandle) {
		if self.arena.borrow_mut().detach(node) {
			self.write();
		}
	}

	fn release(&self, node: NodeHandle) {
		if node == self.root {
			return;
		}
		let mut arena = self.arena.borrow_mut();
		if arena.get(node).map_or(true, |n| n.parent.is_some()) {
			trace!(?node, "Not releasing an attached or unknown node.");
			return;
		}
		let released = arena.release(node);
		trace!(?node, released, "Released nodes.");
	}

	fn add_listener(&self, node: NodeHandle, event: &str, listener: Listener) -> ListenerId {
		let id = ListenerId(self.next_listener.get());
		self.next_listener.set(id.0 + 1);
		if let Some(n) = self.arena.borrow_mut().get_mut(node) {
			n.listeners.push((event.to_owned(), id, listener));
		}
		id
	}

	fn remove_listener(&self, node: NodeHandle, event: &str, id: ListenerId) {
		if let Some(n) = self.arena.borrow_mut().get_mut(node) {
			n.listeners.retain(|(k, i, _)| !(k == event && *i == id));
		}
	}

	fn on_ready(&self, callback: Box<dyn FnOnce()>) {
		if self.ready.get() {
			callback();
		} else {
			self.pending.borrow_mut().push(callback);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_into_body() {
		let document = MemoryDocument::parse(r#"<div id="a" class="x y">Hello <b>there</b></div>"#);
		let div = document.find_by_id("a").unwrap();
		assert_eq!(document.tag_name(div).as_deref(), Some("div"));
		assert_eq!(document.text_content(div), "Hello there");
		assert!(document.has_class(div, "y"));
		assert_eq!(document.parent(div), Some(document.body()));
		assert_eq!(document.writes(), 0);
	}

	#[test]
	fn clones_are_detached_and_deep() {
		let document = MemoryDocument::parse("<ul><li>a</li></ul>");
		let ul = document.elements_by_tag("ul")[0];
		let clone = document.clone_node(ul);
		assert_eq!(document.parent(clone), None);
		assert_eq!(document.outer_html(clone), "<ul><li>a</li></ul>");
		assert_eq!(document.elements_by_tag("li").len(), 1);
	}

	#[test]
	fn serialization_escapes_by_context() {
		let document = MemoryDocument::parse(
			r#"<p title="a &quot;b&quot; &amp; <c>">"quoted" &amp; &lt;tag&gt;</p><script>if (a < b && c) {}</script><style>a > b {}</style>"#,
		);
		let p = document.elements_by_tag("p")[0];
		assert_eq!(
			document.outer_html(p),
			r#"<p title="a &quot;b&quot; &amp; &lt;c&gt;">"quoted" &amp; &lt;tag&gt;</p>"#
		);
		let script = document.elements_by_tag("script")[0];
		assert_eq!(document.outer_html(script), "<script>if (a < b && c) {}</script>");
		let style = document.elements_by_tag("style")[0];
		assert_eq!(document.inner_html(style), "a > b {}");
	}

	#[test]
	fn insertion_and_siblings() {
		let document = MemoryDocument::parse("<p>1</p><p>3</p>");
		let ps = document.elements_by_tag("p");
		let two = document.create_element("p");
		document.insert_after(document.body(), two, ps[0]);
		assert_eq!(document.next_sibling(ps[0]), Some(two));
		assert_eq!(document.previous_sibling(ps[1]), Some(two));
		document.remove(two);
		assert_eq!(document.next_sibling(ps[0]), Some(ps[1]));
	}

	#[test]
	fn released_slots_are_reused() {
		let document = MemoryDocument::parse("<ul><li>a</li></ul>");
		let ul = document.elements_by_tag("ul")[0];
		let count = document.node_count();

		let clone = document.clone_node(ul);
		assert_eq!(document.node_count(), count + 3);
		document.release(clone);
		assert_eq!(document.node_count(), count);
		assert_eq!(document.tag_name(clone), None);

		let again = document.clone_node(ul);
		assert!(again.index() < count + 3);
		assert_eq!(document.outer_html(again), "<ul><li>a</li></ul>");
	}

	#[test]
	fn attached_nodes_are_not_released() {
		let document = MemoryDocument::parse("<p>a</p>");
		let p = document.elements_by_tag("p")[0];
		let count = document.node_count();
		document.release(p);
		document.release(document.root());
		assert_eq!(document.node_count(), count);
		assert_eq!(document.text_content(p), "a");
	}

	#[test]
	fn classes_live_in_the_class_attribute() {
		let document = MemoryDocument::parse("<p class=\"a\"></p>");
		let p = document.elements_by_tag("p")[0];
		document.add_class(p, "b");
		document.remove_class(p, "a");
		assert_eq!(document.attribute(p, "class").as_deref(), Some("b"));
	}

	#[test]
	fn ready_callbacks_queue_until_loaded() {
		let document = MemoryDocument::loading();
		let order = Rc::new(RefCell::new(Vec::new()));
		for i in 0..2 {
			let order = order.clone();
			document.on_ready(Box::new(move || order.borrow_mut().push(i)));
		}
		assert!(order.borrow().is_empty());
		document.finish_loading();
		assert_eq!(*order.borrow(), [0, 1]);

		let late = order.clone();
		document.on_ready(Box::new(move || late.borrow_mut().push(2)));
		assert_eq!(*order.borrow(), [0, 1, 2]);
	}
}
