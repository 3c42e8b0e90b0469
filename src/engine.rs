//! The per-document context: template registry, helpers, readiness gate and bootstrapping.

use crate::{
	events::EventRegistry,
	expression::{Context, Expression},
	identity_map::IdentityMap,
	settings::{Directive, Settings},
	template::{Template, TemplateShared},
	Dom, Error, Event, Listener, ListenerId, NodeHandle, Scope, Value,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	ptr,
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{debug, error, instrument, warn};

/// Where [`Engine::create`] takes a template from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
	/// Markup to write into the target element, which then becomes the template.
	Markup(&'a str),
	/// An element already in the document.
	Element(NodeHandle),
}
impl<'a> From<&'a str> for Source<'a> {
	fn from(markup: &'a str) -> Self {
		Self::Markup(markup)
	}
}
impl From<NodeHandle> for Source<'_> {
	fn from(element: NodeHandle) -> Self {
		Self::Element(element)
	}
}

/// Called with a freshly compiled template during bootstrapping.
pub type Bootstrap = Rc<dyn Fn(&Template) -> Result<(), Error>>;

#[derive(Default)]
struct ReadyGate {
	ready: bool,
	queue: Vec<Box<dyn FnOnce()>>,
}

pub(crate) struct EngineShared {
	pub dom: Rc<dyn Dom>,
	settings: RefCell<Rc<Settings>>,
	pub registry: RefCell<IdentityMap<NodeHandle, Template>>,
	pub helpers: Scope,
	pub events: RefCell<EventRegistry>,
	ready: RefCell<ReadyGate>,
	flushing: Cell<bool>,
	bootstraps: RefCell<HashMap<String, Bootstrap>>,
}

impl EngineShared {
	pub fn settings(&self) -> Rc<Settings> {
		Rc::clone(&self.settings.borrow())
	}

	/// Registers `template` for `element`, handing back the template displaced there.
	pub fn register(&self, element: NodeHandle, template: Template) -> Option<Template> {
		self.registry.borrow_mut().replace(element, template)
	}

	/// Deregisters `element` if `template` is what's registered for it.
	pub fn deregister(&self, element: NodeHandle, template: &TemplateShared) {
		let removed = self
			.registry
			.borrow_mut()
			.remove_if(&element, |registered| ptr::eq(&*registered.0, template));
		drop(removed);
	}
}

/// Builds an [`Engine`] with settings and named bootstrap factories in place before the document becomes ready.
pub struct EngineBuilder {
	dom: Rc<dyn Dom>,
	settings: Settings,
	bootstraps: HashMap<String, Bootstrap>,
}

impl EngineBuilder {
	#[must_use]
	pub fn settings(mut self, settings: Settings) -> Self {
		self.settings = settings;
		self
	}

	/// Makes `factory` available to `data-template="name"` entry points.
	#[must_use]
	pub fn bootstrap(mut self, name: impl Into<String>, factory: impl Fn(&Template) -> Result<(), Error> + 'static) -> Self {
		self.bootstraps.insert(name.into(), Rc::new(factory));
		self
	}

	/// Creates the engine and hooks it up to the document's readiness.
	///
	/// With [`Settings::auto_bootstrap`] enabled, [`Engine::auto_bootstrap`] runs once the document is ready,
	/// which for an already loaded document means right here.
	#[must_use]
	pub fn build(self) -> Engine {
		let auto_bootstrap = self.settings.auto_bootstrap();
		let engine = Engine(Rc::new(EngineShared {
			dom: self.dom,
			settings: RefCell::new(Rc::new(self.settings)),
			registry: RefCell::default(),
			helpers: Scope::new(),
			events: RefCell::default(),
			ready: RefCell::default(),
			flushing: Cell::new(false),
			bootstraps: RefCell::new(self.bootstraps),
		}));
		if auto_bootstrap {
			let weak = Rc::downgrade(&engine.0);
			engine.ready(move || {
				if let Some(shared) = weak.upgrade() {
					Engine(shared).auto_bootstrap();
				}
			});
		}
		let weak = Rc::downgrade(&engine.0);
		engine.0.dom.on_ready(Box::new(move || {
			if let Some(shared) = weak.upgrade() {
				Engine(shared).flush_ready();
			}
		}));
		engine
	}
}

/// Entry point for one document.
///
/// Cloning an [`Engine`] clones the handle. Templates only hold on to their engine weakly,
/// so keep at least one handle around for as long as templates are in use.
#[derive(Clone)]
pub struct Engine(Rc<EngineShared>);

impl Debug for Engine {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Engine")
			.field("templates", &self.0.registry.borrow().len())
			.field("ready", &self.0.ready.borrow().ready)
			.finish_non_exhaustive()
	}
}

impl Engine {
	/// An engine with default [`Settings`].
	#[must_use]
	pub fn new(dom: Rc<dyn Dom>) -> Self {
		Self::builder(dom).build()
	}

	#[must_use]
	pub fn builder(dom: Rc<dyn Dom>) -> EngineBuilder {
		EngineBuilder {
			dom,
			settings: Settings::default(),
			bootstraps: HashMap::new(),
		}
	}

	#[must_use]
	pub fn dom(&self) -> Rc<dyn Dom> {
		Rc::clone(&self.0.dom)
	}

	#[must_use]
	pub fn settings(&self) -> Rc<Settings> {
		self.0.settings()
	}

	/// Replaces the settings used by templates compiled from now on.
	///
	/// Compiled templates keep the delimiters they were compiled with.
	pub fn set_settings(&self, settings: Settings) {
		*self.0.settings.borrow_mut() = Rc::new(settings);
	}

	/// Compiles a new template.
	///
	/// For [`Source::Markup`], the markup replaces the content of `target`, which becomes the template root.
	///
	/// # Errors
	///
	/// [`Error::MissingTarget`] for markup without `target`, [`Error::NotAnElement`] if `target` isn't an element,
	/// [`Error::InvalidSource`] if the source node isn't an element.
	#[instrument(skip(self, source))]
	pub fn create<'a>(&self, source: impl Into<Source<'a>>, target: Option<NodeHandle>) -> Result<Template, Error> {
		let dom = &*self.0.dom;
		let element = match source.into() {
			Source::Markup(markup) => {
				let target = target.ok_or(Error::MissingTarget)?;
				if !dom.is_element(target) {
					return Err(Error::NotAnElement(target));
				}
				dom.set_inner_html(target, markup);
				target
			}
			Source::Element(element) => {
				if !dom.is_element(element) {
					return Err(Error::InvalidSource(element));
				}
				element
			}
		};
		let template = Template::new(&self.0);
		template.compile(element)?;
		Ok(template)
	}

	/// The template registered for `element`.
	#[must_use]
	pub fn get(&self, element: NodeHandle) -> Option<Template> {
		self.0.registry.borrow().get(&element).cloned()
	}

	/// Renders every registered template.
	///
	/// # Errors
	///
	/// The first error encountered. Remaining templates are still rendered.
	pub fn render_all(&self) -> Result<(), Error> {
		let templates: Vec<Template> = self.0.registry.borrow().values().cloned().collect();
		let mut result = Ok(());
		for template in templates {
			if let Err(error) = template.render() {
				error!(%error, ?template, "Rendering failed.");
				if result.is_ok() {
					result = Err(error);
				}
			}
		}
		result
	}

	/// Merges `helpers` into the scope every template's root scope inherits from.
	pub fn helpers<K: Into<String>, V: Into<Value>>(&self, helpers: impl IntoIterator<Item = (K, V)>) {
		for (key, value) in helpers {
			self.0.helpers.set(key, value);
		}
	}

	/// The scope holding the helpers.
	#[must_use]
	pub fn helper_scope(&self) -> Scope {
		self.0.helpers.clone()
	}

	/// Compiles `element` and passes the new template to `factory`.
	///
	/// # Errors
	///
	/// Whatever compiling or `factory` fails with. The template stays registered either way it got compiled.
	#[instrument(skip(self, factory))]
	pub fn bootstrap(
		&self,
		marker: &str,
		element: NodeHandle,
		factory: impl FnOnce(&Template) -> Result<(), Error>,
	) -> Result<Template, Error> {
		let template = self.create(element, None)?;
		factory(&template)?;
		debug!("Bootstrapped.");
		Ok(template)
	}

	/// Makes `factory` available to `data-template="name"` entry points.
	pub fn register_bootstrap(&self, name: impl Into<String>, factory: impl Fn(&Template) -> Result<(), Error> + 'static) {
		self.0.bootstraps.borrow_mut().insert(name.into(), Rc::new(factory));
	}

	/// Bootstraps every element carrying the entry-point attribute, in document order.
	///
	/// The attribute names a registered factory, optionally followed by `()`.
	/// Failures are logged, never returned.
	#[instrument(skip(self))]
	pub fn auto_bootstrap(&self) {
		let dom = &*self.0.dom;
		let attribute = self.settings().attribute(Directive::Template);
		for element in dom.descendants(dom.root()) {
			let marker = match dom.attribute(element, &attribute) {
				Some(marker) => marker,
				None => continue,
			};
			let name = marker.trim();
			let name = name.strip_suffix("()").unwrap_or(name).trim();
			let factory = self.0.bootstraps.borrow().get(name).cloned();
			match factory {
				Some(factory) => {
					if let Err(error) = self.bootstrap(&marker, element, |template| factory(template)) {
						error!(%error, %marker, "Auto-bootstrap failed.");
					}
				}
				None => error!(%marker, "No bootstrap registered under this name."),
			}
		}
	}

	/// Runs `callback` once the document is ready, right away if it already is.
	///
	/// Callbacks queued before readiness run in order.
	pub fn ready(&self, callback: impl FnOnce() + 'static) {
		let mut gate = self.0.ready.borrow_mut();
		if gate.ready && !self.0.flushing.get() {
			drop(gate);
			callback();
		} else {
			gate.queue.push(Box::new(callback));
		}
	}

	fn flush_ready(&self) {
		self.0.ready.borrow_mut().ready = true;
		self.0.flushing.set(true);
		loop {
			let queue = core::mem::take(&mut self.0.ready.borrow_mut().queue);
			if queue.is_empty() {
				break;
			}
			debug!(callbacks = queue.len(), "Document ready.");
			for callback in queue {
				callback();
			}
		}
		self.0.flushing.set(false);
	}

	/// Attaches `listener` directly, outside any template.
	pub fn add_event(&self, element: NodeHandle, event: &str, listener: impl Fn(Rc<Event>) + 'static) -> ListenerId {
		self.0.dom.add_listener(element, event, Rc::new(listener))
	}

	pub fn remove_event(&self, element: NodeHandle, event: &str, id: ListenerId) {
		self.0.dom.remove_listener(element, event, id);
	}

	/// Binds the event attributes of `element` (and of descendants down to `depth` levels, all if `None`)
	/// to functions in `handlers`, once. Later changes to the attributes are not picked up.
	///
	/// # Errors
	///
	/// [`Error::NotAnElement`].
	#[instrument(skip(self, handlers))]
	pub fn parse_events(&self, element: NodeHandle, handlers: &Scope, depth: Option<usize>) -> Result<(), Error> {
		if !self.0.dom.is_element(element) {
			return Err(Error::NotAnElement(element));
		}
		let settings = self.settings();
		self.parse_events_at(&settings, element, handlers, depth);
		Ok(())
	}

	fn parse_events_at(&self, settings: &Settings, element: NodeHandle, handlers: &Scope, depth: Option<usize>) {
		let dom = &*self.0.dom;
		for (name, value) in dom.attributes(element) {
			let event = match settings.event(&name) {
				Some(event) => event,
				None => continue,
			};
			let expression = Expression::parse(&value);
			let scope = handlers.clone();
			let listener: Listener = Rc::new(move |payload: Rc<Event>| {
				let context = Context {
					element: Some(element),
					parent_element: None,
					attribute: None,
				};
				match expression.function(&scope, &context) {
					Value::Function(function) => {
						let mut args = vec![Value::Event(payload)];
						args.extend(expression.params(&scope, &context));
						function.call(&args);
					}
					other => warn!(pattern = expression.pattern(), ?other, "Event handler doesn't resolve to a function."),
				}
			});
			self.0.events.borrow_mut().bind(dom, element, event, listener);
		}

		if depth != Some(0) {
			for child in dom.children(element) {
				if dom.is_element(child) {
					self.parse_events_at(settings, child, handlers, depth.map(|d| d - 1));
				}
			}
		}
	}

	/// Removes the declarative listeners of `element` and its descendants, skipping subtrees owned by other templates.
	///
	/// # Errors
	///
	/// [`Error::NotAnElement`].
	pub fn clear_events(&self, element: NodeHandle) -> Result<(), Error> {
		let dom = &*self.0.dom;
		if !dom.is_element(element) {
			return Err(Error::NotAnElement(element));
		}
		let owner = self.get(element);
		let mut pending = vec![element];
		while let Some(node) = pending.pop() {
			if node != element {
				let foreign = self
					.0
					.registry
					.borrow()
					.get(&node)
					.map_or(false, |template| !owner.as_ref().map_or(false, |owner| owner.ptr_eq(template)));
				if foreign {
					continue;
				}
			}
			self.0.events.borrow_mut().clear(dom, node);
			pending.extend(dom.children(node));
		}
		Ok(())
	}
}
