//! Glue for dependency injection containers.
//!
//! Containers only need to hand out child scopes that accept named bindings.

use crate::{Engine, Error, NodeHandle, Scope, Template};
use tracing::instrument;

/// A value bound into an injection scope by [`TemplatePlugin::create_template`].
#[derive(Debug, Clone)]
pub enum Injected {
	Template(Template),
	Scope(Scope),
	Element(NodeHandle),
}

/// A child injection scope.
pub trait Bindings {
	fn bind(&mut self, name: &str, value: Injected);
}

/// Creates child injection scopes.
pub trait Injector {
	type Child: Bindings;
	fn create_child(&self) -> Self::Child;
}

/// Compiles templates and constructs their controllers in fresh injection scopes.
#[derive(Debug)]
pub struct TemplatePlugin<I> {
	engine: Engine,
	injector: I,
}

impl<I: Injector> TemplatePlugin<I> {
	#[must_use]
	pub fn new(engine: Engine, injector: I) -> Self {
		Self { engine, injector }
	}

	#[must_use]
	pub fn engine(&self) -> &Engine {
		&self.engine
	}

	/// Compiles `element`, then calls `construct` with a child scope in which
	/// `template`, `scope` and `element` are bound.
	///
	/// # Errors
	///
	/// Whatever [`Engine::create`] fails with. `construct` isn't called then.
	#[instrument(skip(self, construct))]
	pub fn create_template<T>(&self, element: NodeHandle, construct: impl FnOnce(&mut I::Child) -> T) -> Result<T, Error> {
		let template = self.engine.create(element, None)?;
		let mut child = self.injector.create_child();
		child.bind("scope", Injected::Scope(template.scope()));
		child.bind("element", Injected::Element(element));
		child.bind("template", Injected::Template(template));
		Ok(construct(&mut child))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Dom, MemoryDocument};
	use hashbrown::HashMap;
	use std::rc::Rc;

	#[derive(Default)]
	struct Container;

	#[derive(Default)]
	struct Child(HashMap<String, Injected>);

	impl Bindings for Child {
		fn bind(&mut self, name: &str, value: Injected) {
			self.0.insert(name.to_owned(), value);
		}
	}

	impl Injector for Container {
		type Child = Child;
		fn create_child(&self) -> Child {
			Child::default()
		}
	}

	#[test]
	fn constructs_with_bindings() {
		let document = Rc::new(MemoryDocument::parse(r#"<div id="app">{{greeting}}</div>"#));
		let app = document.find_by_id("app").unwrap();
		let plugin = TemplatePlugin::new(Engine::new(document.clone()), Container);

		let template = plugin
			.create_template(app, |child| match child.0.get("template") {
				Some(Injected::Template(template)) => {
					assert!(matches!(child.0.get("element"), Some(Injected::Element(e)) if *e == app));
					assert!(matches!(child.0.get("scope"), Some(Injected::Scope(s)) if s.ptr_eq(&template.scope())));
					template.clone()
				}
				_ => panic!("template not bound"),
			})
			.unwrap();
		assert!(plugin.engine().get(app).unwrap().ptr_eq(&template));
	}

	#[test]
	fn creation_errors_skip_construction() {
		let document = Rc::new(MemoryDocument::parse("text only"));
		let text = document.children(document.body())[0];
		let plugin = TemplatePlugin::new(Engine::new(document.clone()), Container);
		assert!(matches!(plugin.create_template(text, |_| ()), Err(Error::InvalidSource(_))));
	}
}
