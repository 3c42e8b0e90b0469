//! Compiled templates.
//!
//! A [`Template`] mirrors one element subtree as a tree of compiled nodes.
//! [`Template::update`] recomputes every binding against the template's [`Scope`] without touching the document,
//! [`Template::render`] does the same and then commits whatever changed.

mod compile;
mod handlers;
mod node;
mod render;
mod repeat;

use self::node::{Arena, NodeKey};
use crate::{
	engine::EngineShared, identity_map::IdentityMap, settings::Settings, Dom, Error, ListenerId, Listener, NodeHandle,
	Scope, Value,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	ptr,
};
use std::rc::{Rc, Weak};
use tracing::{error, instrument, warn};

/// What a watcher is registered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchKey {
	/// Every expression evaluated for this text node or element.
	Node(NodeHandle),
	/// Every expression with this (trimmed) pattern.
	Pattern(String),
}
impl From<NodeHandle> for WatchKey {
	fn from(node: NodeHandle) -> Self {
		Self::Node(node)
	}
}
impl From<&str> for WatchKey {
	fn from(pattern: &str) -> Self {
		Self::Pattern(pattern.trim().to_owned())
	}
}
impl From<String> for WatchKey {
	fn from(pattern: String) -> Self {
		pattern.as_str().into()
	}
}

/// Handed to watchers for each recomputed expression.
#[derive(Debug)]
pub struct WatchContext<'a> {
	/// The value before this pass.
	pub old: &'a Value,
	/// The freshly computed value, possibly already replaced by a node watcher.
	pub new: &'a Value,
	pub pattern: &'a str,
	pub scope: &'a Scope,
	pub element: NodeHandle,
}

/// Returns a replacement for [`WatchContext::new`], or `None` to keep it.
pub type Watcher = Rc<dyn Fn(&WatchContext<'_>) -> Option<Value>>;

type Watchers = IdentityMap<WatchKey, Watcher>;

/// Runs node watcher then pattern watcher over `new`.
fn watched(watchers: &Watchers, element: NodeHandle, scope: &Scope, pattern: &str, old: &Value, mut new: Value) -> Value {
	if watchers.is_empty() {
		return new;
	}
	for key in [WatchKey::Node(element), WatchKey::from(pattern)] {
		if let Some(watcher) = watchers.get(&key) {
			let context = WatchContext {
				old,
				new: &new,
				pattern: pattern.trim(),
				scope,
				element,
			};
			if let Some(replacement) = watcher(&context) {
				new = replacement;
			}
		}
	}
	new
}

pub(crate) struct State {
	settings: Rc<Settings>,
	nodes: Arena,
	root: Option<NodeKey>,
}

pub(crate) struct TemplateShared {
	engine: Weak<EngineShared>,
	dom: Rc<dyn Dom>,
	scope: Scope,
	element: Cell<Option<NodeHandle>>,
	state: RefCell<State>,
	watchers: RefCell<Watchers>,
	disposed: Cell<bool>,
}

impl TemplateShared {
	/// Whether `element` is the root of a different registered template.
	fn hosts_other(&self, element: NodeHandle) -> bool {
		self.engine.upgrade().map_or(false, |engine| {
			engine
				.registry
				.borrow()
				.get(&element)
				.map_or(false, |template| !ptr::eq(&*template.0, self))
		})
	}

	fn bind(&self, element: NodeHandle, event: &'static str, listener: Listener) -> ListenerId {
		match self.engine.upgrade() {
			Some(engine) => engine.events.borrow_mut().bind(&*self.dom, element, event, listener),
			None => self.dom.add_listener(element, event, listener),
		}
	}

	fn unbind(&self, element: NodeHandle, events: &[(&'static str, ListenerId)]) {
		let engine = self.engine.upgrade();
		for &(event, id) in events {
			match &engine {
				Some(engine) => engine.events.borrow_mut().unbind(&*self.dom, element, event, id),
				None => self.dom.remove_listener(element, event, id),
			}
		}
	}
}

/// A compiled element subtree bound to a [`Scope`].
///
/// Cloning a [`Template`] clones the handle.
#[derive(Clone)]
pub struct Template(pub(crate) Rc<TemplateShared>);

impl Debug for Template {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Template")
			.field("element", &self.0.element.get())
			.field("disposed", &self.0.disposed.get())
			.finish_non_exhaustive()
	}
}

impl Template {
	/// An uncompiled template whose scope inherits the engine's helpers.
	pub(crate) fn new(engine: &Rc<EngineShared>) -> Self {
		Self(Rc::new(TemplateShared {
			engine: Rc::downgrade(engine),
			dom: Rc::clone(&engine.dom),
			scope: engine.helpers.child(),
			element: Cell::new(None),
			state: RefCell::new(State {
				settings: engine.settings(),
				nodes: Arena::default(),
				root: None,
			}),
			watchers: RefCell::default(),
			disposed: Cell::new(false),
		}))
	}

	fn live(&self) -> Result<&Rc<TemplateShared>, Error> {
		if self.0.disposed.get() {
			Err(Error::Disposed)
		} else {
			Ok(&self.0)
		}
	}

	/// (Re)builds the node tree from `element` and registers this template for it.
	///
	/// A different template registered for the same element is disposed first.
	///
	/// # Errors
	///
	/// [`Error::NotAnElement`], [`Error::Disposed`], and [`Error::Reentrant`] when called from one of this template's own bindings.
	#[instrument(skip(self))]
	pub fn compile(&self, element: NodeHandle) -> Result<(), Error> {
		let shared = self.live()?;
		if !shared.dom.is_element(element) {
			return Err(Error::NotAnElement(element));
		}
		let mut state = shared.state.try_borrow_mut().map_err(|_| Error::Reentrant)?;
		if let Some(root) = state.root.take() {
			state.dispose_node(shared, root);
		}

		let previous = shared.element.replace(Some(element));
		if let Some(engine) = shared.engine.upgrade() {
			state.settings = engine.settings();
			if let Some(previous) = previous.filter(|&p| p != element) {
				engine.deregister(previous, shared);
			}
			if let Some(displaced) = engine.register(element, self.clone()) {
				if !Rc::ptr_eq(&displaced.0, shared) {
					displaced.dispose();
				}
			}
		}

		let scope = shared.scope.clone();
		state.root = Some(state.compile_element(shared, element, None, &scope, false));
		Ok(())
	}

	/// Recomputes every binding without touching the document.
	///
	/// # Errors
	///
	/// [`Error::Disposed`], or [`Error::Reentrant`] when called from one of this template's own bindings.
	#[instrument(skip(self))]
	pub fn update(&self) -> Result<(), Error> {
		let shared = self.live()?;
		let mut state = shared.state.try_borrow_mut().map_err(|_| Error::Reentrant)?;
		let watchers = shared.watchers.borrow().clone();
		if let Some(root) = state.root {
			state.update_node(shared, &watchers, root, true);
		}
		drop(state);
		self.finish();
		Ok(())
	}

	/// Replaces the scope's data, keeping `_`-prefixed entries, then [`update`](`Template::update`)s.
	///
	/// # Errors
	///
	/// As [`Template::update`].
	pub fn update_with(&self, data: impl Into<Value>) -> Result<(), Error> {
		self.replace_data(&data.into());
		self.update()
	}

	/// Recomputes every binding and commits what changed to the document.
	///
	/// # Errors
	///
	/// [`Error::MalformedClass`] aborts the pass. [`Error::Disposed`], and [`Error::Reentrant`] when called from one of this template's own bindings.
	#[instrument(skip(self))]
	pub fn render(&self) -> Result<(), Error> {
		let shared = self.live()?;
		let mut state = shared.state.try_borrow_mut().map_err(|_| Error::Reentrant)?;
		let watchers = shared.watchers.borrow().clone();
		let result = match state.root {
			Some(root) => {
				state.update_node(shared, &watchers, root, false);
				state.render_node(shared, &watchers, root)
			}
			None => Ok(()),
		};
		drop(state);
		self.finish();
		result
	}

	/// [`render`](`Template::render`) after replacing the scope's data like [`Template::update_with`].
	///
	/// # Errors
	///
	/// As [`Template::render`].
	pub fn render_with(&self, data: impl Into<Value>) -> Result<(), Error> {
		self.replace_data(&data.into());
		self.render()
	}

	fn replace_data(&self, data: &Value) {
		match data {
			Value::Object(_) => self.0.scope.replace_data(data),
			other => warn!(?other, "Template data must be an object; the scope was left unchanged."),
		}
	}

	/// Marks every binding dirty so the next render rewrites it.
	///
	/// # Errors
	///
	/// [`Error::Disposed`] or [`Error::Reentrant`].
	pub fn invalidate(&self) -> Result<(), Error> {
		let shared = self.live()?;
		let mut state = shared.state.try_borrow_mut().map_err(|_| Error::Reentrant)?;
		if let Some(root) = state.root {
			state.invalidate_node(root);
		}
		Ok(())
	}

	/// Registers `watcher` to transform values computed for `key`, replacing any watcher there.
	pub fn watch(&self, key: impl Into<WatchKey>, watcher: impl Fn(&WatchContext<'_>) -> Option<Value> + 'static) {
		self.0.watchers.borrow_mut().replace(key.into(), Rc::new(watcher));
	}

	/// Returns whether there was a watcher for `key`.
	pub fn unwatch(&self, key: impl Into<WatchKey>) -> bool {
		self.0.watchers.borrow_mut().remove(&key.into()).is_some()
	}

	/// Removes every listener this template bound, leaving nested templates alone.
	///
	/// # Errors
	///
	/// [`Error::Reentrant`] while this template is updating or rendering.
	pub fn clear_events(&self) -> Result<(), Error> {
		let shared = &self.0;
		let mut state = shared.state.try_borrow_mut().map_err(|_| Error::Reentrant)?;
		if let Some(root) = state.root {
			state.clear_events_node(shared, root);
		}
		Ok(())
	}

	/// Deregisters the template, drops its watchers and tears down the node tree.
	///
	/// The document itself is left as it is, except that listeners are removed.
	#[instrument(skip(self))]
	pub fn dispose(&self) {
		let shared = &self.0;
		if shared.disposed.replace(true) {
			return;
		}
		if let (Some(engine), Some(element)) = (shared.engine.upgrade(), shared.element.get()) {
			engine.deregister(element, shared);
		}
		shared.watchers.borrow_mut().dispose().for_each(drop);
		self.finish();
		shared.scope.detach();
	}

	/// Tears down the node tree of a disposed template once nothing is borrowing it.
	fn finish(&self) {
		let shared = &self.0;
		if !shared.disposed.get() {
			return;
		}
		match shared.state.try_borrow_mut() {
			Ok(mut state) => {
				if let Some(root) = state.root.take() {
					state.dispose_node(shared, root);
				}
			}
			Err(_) => error!("Template disposed during its own pass; the node tree goes when the pass ends."),
		}
	}

	/// The element last compiled.
	#[must_use]
	pub fn element(&self) -> Option<NodeHandle> {
		self.0.element.get()
	}

	/// The element hosting the compiled root node, if there is one.
	#[must_use]
	pub fn root(&self) -> Option<NodeHandle> {
		let state = self.0.state.try_borrow().ok()?;
		state.nodes.get(state.root?).map(|node| node.element)
	}

	/// The root scope. Its parent holds the engine's helpers.
	#[must_use]
	pub fn scope(&self) -> Scope {
		self.0.scope.clone()
	}

	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.0.disposed.get()
	}

	/// Number of compiled nodes, repeated clones included.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.0.state.try_borrow().map_or(0, |state| state.nodes.len())
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
