//! Chained data contexts.

use crate::value::{Map, Value};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};

struct ScopeData {
	values: Map,
	parent: Weak<RefCell<ScopeData>>,
	children: Vec<Scope>,
}

/// Reactive data visible to one compiled subtree.
///
/// Cloning a [`Scope`] clones the handle, not the data. A scope owns its children and only weakly refers to its parent.
#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Default for Scope {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for Scope {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.0.try_borrow() {
			Ok(data) => f
				.debug_struct("Scope")
				.field("keys", &data.values.keys().collect::<Vec<_>>())
				.field("children", &data.children.len())
				.finish(),
			Err(_) => f.write_str("Scope(<borrowed>)"),
		}
	}
}

impl Scope {
	/// A new root scope.
	#[must_use]
	pub fn new() -> Self {
		Self(Rc::new(RefCell::new(ScopeData {
			values: Map::new(),
			parent: Weak::new(),
			children: Vec::new(),
		})))
	}

	/// A root scope holding the entries of `value` if it is an object.
	#[must_use]
	pub fn from_value(value: &Value) -> Self {
		let scope = Self::new();
		scope.assign(value);
		scope
	}

	/// Creates a scope that inherits from this one.
	#[must_use]
	pub fn child(&self) -> Self {
		let child = Self(Rc::new(RefCell::new(ScopeData {
			values: Map::new(),
			parent: Rc::downgrade(&self.0),
			children: Vec::new(),
		})));
		self.0.borrow_mut().children.push(child.clone());
		child
	}

	#[must_use]
	pub fn parent(&self) -> Option<Self> {
		self.0.borrow().parent.upgrade().map(Self)
	}

	/// Walks `depth` parents up. `None` if the chain is shorter.
	#[must_use]
	pub fn ancestor(&self, depth: usize) -> Option<Self> {
		let mut scope = self.clone();
		for _ in 0..depth {
			scope = scope.parent()?;
		}
		Some(scope)
	}

	#[must_use]
	pub fn children(&self) -> Vec<Self> {
		self.0.borrow().children.clone()
	}

	/// This scope's own value for `key`, without consulting parents.
	#[must_use]
	pub fn get(&self, key: &str) -> Option<Value> {
		self.0.borrow().values.get(key).cloned()
	}

	/// The first value for `key` found walking up the chain.
	#[must_use]
	pub fn lookup(&self, key: &str) -> Option<Value> {
		let mut scope = Some(self.clone());
		while let Some(s) = scope {
			if let Some(value) = s.get(key) {
				return Some(value);
			}
			scope = s.parent();
		}
		None
	}

	pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
		self.0.borrow_mut().values.insert(key.into(), value.into());
	}

	pub fn remove(&self, key: &str) -> Option<Value> {
		self.0.borrow_mut().values.shift_remove(key)
	}

	#[must_use]
	pub fn keys(&self) -> Vec<String> {
		self.0.borrow().values.keys().cloned().collect()
	}

	/// Copies the entries of an object value into this scope.
	pub fn assign(&self, value: &Value) {
		if let Value::Object(map) = value {
			let mut data = self.0.borrow_mut();
			for (k, v) in map.iter() {
				data.values.insert(k.clone(), v.clone());
			}
		}
	}

	/// Drops every key not starting with `_`, then assigns `value`.
	pub fn replace_data(&self, value: &Value) {
		self.0.borrow_mut().values.retain(|k, _| k.starts_with('_'));
		self.assign(value);
	}

	/// Unlinks this scope from its parent's children.
	pub fn detach(&self) {
		let parent = self.0.borrow_mut().parent.upgrade();
		if let Some(parent) = parent {
			parent.borrow_mut().children.retain(|c| !Rc::ptr_eq(&c.0, &self.0));
		}
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lookup_walks_up() {
		let root = Scope::new();
		root.set("a", 1);
		let child = root.child();
		child.set("b", 2);
		assert_eq!(child.lookup("a").and_then(|v| v.as_f64()), Some(1.0));
		assert!(root.lookup("b").is_none());
		assert!(child.get("a").is_none());
	}

	#[test]
	fn parents_are_weak() {
		let child = Scope::new().child();
		assert!(child.parent().is_none());
	}

	#[test]
	fn detaching_unlinks_from_parent() {
		let root = Scope::new();
		let child = root.child();
		assert_eq!(root.children().len(), 1);
		child.detach();
		assert!(root.children().is_empty());
		assert!(child.parent().is_some());
	}

	#[test]
	fn replacing_data_keeps_internal_keys() {
		let scope = Scope::new();
		scope.set("_internal", true);
		scope.set("old", 1);
		scope.replace_data(&Value::from(serde_json::json!({"new": 2})));
		assert_eq!(scope.keys(), ["_internal", "new"]);
	}
}
