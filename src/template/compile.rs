use super::{
	node::{ElementNode, Node, NodeKey, NodeKind, Repeater},
	State, TemplateShared,
};
use crate::{
	attribute::Attribute,
	interpolation::Interpolation,
	settings::{Directive, Settings},
	NodeHandle, NodeType, Scope,
};
use std::rc::Rc;
use tracing::{trace, warn};

/// Whether an attribute needs a binding at all.
fn tracked(settings: &Settings, name: &str, value: &str, directive: Option<Directive>) -> bool {
	settings.has_token(name)
		|| settings.has_token(value)
		|| settings.event(name).is_some()
		|| matches!(directive, Some(d) if d != Directive::Template)
		|| (name == "class" && value.split_whitespace().any(|class| class == settings.cloak()))
}

impl State {
	/// Compiles `handle` and its subtree. `None` for comments and for text without tokens.
	pub(super) fn compile(
		&mut self,
		shared: &Rc<TemplateShared>,
		handle: NodeHandle,
		parent: Option<NodeKey>,
		scope: &Scope,
	) -> Option<NodeKey> {
		match shared.dom.node_type(handle) {
			NodeType::Element => Some(self.compile_element(shared, handle, parent, scope, false)),
			NodeType::Text => {
				let text = shared.dom.text(handle)?;
				if !self.settings.has_token(&text) {
					return None;
				}
				Some(self.nodes.insert(Node {
					element: handle,
					scope: scope.clone(),
					children: Vec::new(),
					invalidate: true,
					kind: NodeKind::Text {
						interpolation: Interpolation::new(&text, &self.settings),
						html_host: None,
					},
				}))
			}
			NodeType::Document | NodeType::Comment | NodeType::Other => None,
		}
	}

	/// Compiles an element. `repeated` marks the root of a repeated clone, whose repeat directive was already expanded.
	pub(super) fn compile_element(
		&mut self,
		shared: &Rc<TemplateShared>,
		handle: NodeHandle,
		parent: Option<NodeKey>,
		scope: &Scope,
		repeated: bool,
	) -> NodeKey {
		let settings = Rc::clone(&self.settings);
		let dom = &*shared.dom;
		let nested = parent.is_some() && shared.hosts_other(handle);

		let mut element = ElementNode::default();
		let mut repeat = None;
		for (name, value) in dom.attributes(handle) {
			let directive = settings.directive(&name);
			match directive {
				Some(Directive::Skip) => element.skip = true,
				Some(Directive::Html) => element.html = true,
				Some(Directive::Repeat) if !repeated => repeat = Some(value.clone()),
				_ => (),
			}
			if tracked(&settings, &name, &value, directive) {
				element.attributes.push(Attribute::new(&name, &value, &settings));
			}
		}

		if let Some(source) = repeat {
			match Repeater::parse(&source) {
				Some((item, collection)) => {
					element.attributes.clear();
					element.repeater = Some(Repeater {
						item,
						collection,
						pool: Vec::new(),
						previous_sibling: dom.previous_sibling(handle),
						next_sibling: dom.next_sibling(handle),
						parent_element: dom.parent(handle),
					});
				}
				None => warn!(%source, "Malformed repeat directive, expected `item in collection`."),
			}
		}

		let bind = !nested && element.repeater.is_none();
		let descend = bind && !element.skip;
		let html = element.html;
		trace!(?handle, attributes = element.attributes.len(), nested, "Compiled element.");

		let key = self.nodes.insert(Node {
			element: handle,
			scope: scope.clone(),
			children: Vec::new(),
			invalidate: true,
			kind: NodeKind::Element(element),
		});
		if bind {
			self.bind_events(shared, key);
		}
		if descend {
			let children = if html {
				self.compile_markup(shared, handle, scope).into_iter().collect()
			} else {
				dom.children(handle)
					.into_iter()
					.filter_map(|child| self.compile(shared, child, Some(key), scope))
					.collect()
			};
			if let Some(node) = self.nodes.get_mut(key) {
				node.children = children;
			}
		}
		key
	}

	/// Compiles the whole content of an html directive host into one markup interpolation.
	/// `None` if the markup has no tokens.
	fn compile_markup(&mut self, shared: &Rc<TemplateShared>, host: NodeHandle, scope: &Scope) -> Option<NodeKey> {
		let markup = shared.dom.inner_html(host);
		if !self.settings.has_token(&markup) {
			return None;
		}
		trace!(?host, %markup, "Compiled html content.");
		Some(self.nodes.insert(Node {
			element: host,
			scope: scope.clone(),
			children: Vec::new(),
			invalidate: true,
			kind: NodeKind::Text {
				interpolation: Interpolation::new(&markup, &self.settings),
				html_host: Some(host),
			},
		}))
	}
}
