//! Dynamic values as seen by template expressions.

use crate::{dom::Event, NodeHandle, Scope};
use core::fmt::{self, Debug, Formatter};
use indexmap::IndexMap;
use std::rc::Rc;

/// A keyed collection as stored in a [`Value::Object`]. Iteration follows insertion order.
pub type Map = IndexMap<String, Value>;

/// A callable scope value.
///
/// Equality is identity: two [`Function`]s are the same only if they were cloned from one another.
#[derive(Clone)]
pub struct Function(Rc<dyn Fn(&[Value]) -> Value>);
impl Function {
	pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
		Self(Rc::new(f))
	}

	pub fn call(&self, args: &[Value]) -> Value {
		(self.0)(args)
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::as_ptr(&self.0).cast::<()>() == Rc::as_ptr(&other.0).cast::<()>()
	}
}
impl Debug for Function {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Function({:p})", Rc::as_ptr(&self.0).cast::<()>())
	}
}

#[derive(Debug, Clone)]
pub enum Value {
	Undefined,
	Null,
	Bool(bool),
	Number(f64),
	String(Rc<str>),
	Array(Rc<Vec<Value>>),
	Object(Rc<Map>),
	Function(Function),
	Node(NodeHandle),
	Event(Rc<Event>),
	Scope(Scope),
}

impl Default for Value {
	fn default() -> Self {
		Self::Undefined
	}
}

impl Value {
	#[must_use]
	pub fn is_undefined(&self) -> bool {
		matches!(self, Self::Undefined)
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_f64(&self) -> Option<f64> {
		match *self {
			Self::Number(n) => Some(n),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_function(&self) -> Option<&Function> {
		match self {
			Self::Function(f) => Some(f),
			_ => None,
		}
	}

	/// Strict equality: primitives compare by value, everything else by identity.
	///
	/// `NaN` is never equal to itself, so a `NaN` expression is recommitted on every render.
	#[must_use]
	pub fn same(&self, other: &Self) -> bool {
		#[allow(clippy::float_cmp)]
		match (self, other) {
			(Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Number(a), Self::Number(b)) => a == b,
			(Self::String(a), Self::String(b)) => a == b,
			(Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
			(Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
			(Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
			(Self::Node(a), Self::Node(b)) => a == b,
			(Self::Event(a), Self::Event(b)) => Rc::ptr_eq(a, b),
			(Self::Scope(a), Self::Scope(b)) => a.ptr_eq(b),
			_ => false,
		}
	}

	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Self::Undefined | Self::Null => false,
			Self::Bool(b) => *b,
			Self::Number(n) => *n != 0.0 && !n.is_nan(),
			Self::String(s) => !s.is_empty(),
			_ => true,
		}
	}

	/// Looks up a single property the way a path segment does.
	#[must_use]
	pub fn property(&self, name: &str) -> Value {
		match self {
			Self::Object(map) => map.get(name).cloned().unwrap_or_default(),
			Self::Array(items) => match name {
				"length" => Value::from(items.len()),
				index => index.parse::<usize>().ok().and_then(|i| items.get(i).cloned()).unwrap_or_default(),
			},
			Self::String(s) if name == "length" => Value::from(s.chars().count()),
			Self::Scope(scope) => scope.get(name).unwrap_or_default(),
			_ => Value::Undefined,
		}
	}

	/// Text as written into the document. `undefined` and `null` become empty.
	#[must_use]
	pub fn to_text(&self) -> String {
		match self {
			Self::Undefined | Self::Null => String::new(),
			Self::Bool(b) => b.to_string(),
			Self::Number(n) => number_to_text(*n),
			Self::String(s) => s.to_string(),
			Self::Array(items) => items.iter().map(Value::to_text).collect::<Vec<_>>().join(","),
			Self::Object(_) | Self::Scope(_) => "[object Object]".to_owned(),
			Self::Function(_) => "function".to_owned(),
			Self::Node(_) => "[object Node]".to_owned(),
			Self::Event(event) => format!("[object Event {}]", event.kind),
		}
	}
}

fn number_to_text(n: f64) -> String {
	if n.is_nan() {
		"NaN".to_owned()
	} else if n.is_infinite() {
		if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
	} else if n == n.trunc() && n.abs() < 1e15 {
		#[allow(clippy::cast_possible_truncation)]
		let integer = n as i64;
		integer.to_string()
	} else {
		n.to_string()
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Self::String(s.into())
	}
}
impl From<String> for Value {
	fn from(s: String) -> Self {
		Self::String(s.into())
	}
}
impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}
impl From<f64> for Value {
	fn from(n: f64) -> Self {
		Self::Number(n)
	}
}
impl From<i32> for Value {
	fn from(n: i32) -> Self {
		Self::Number(n.into())
	}
}
impl From<usize> for Value {
	#[allow(clippy::cast_precision_loss)]
	fn from(n: usize) -> Self {
		Self::Number(n as f64)
	}
}
impl From<Function> for Value {
	fn from(f: Function) -> Self {
		Self::Function(f)
	}
}
impl From<NodeHandle> for Value {
	fn from(node: NodeHandle) -> Self {
		Self::Node(node)
	}
}
impl From<Scope> for Value {
	fn from(scope: Scope) -> Self {
		Self::Scope(scope)
	}
}
impl From<Map> for Value {
	fn from(map: Map) -> Self {
		Self::Object(Rc::new(map))
	}
}
impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Self::Array(Rc::new(items.into_iter().map(Into::into).collect()))
	}
}
impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

impl From<serde_json::Value> for Value {
	fn from(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Self::Null,
			serde_json::Value::Bool(b) => Self::Bool(b),
			serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
			serde_json::Value::String(s) => Self::from(s),
			serde_json::Value::Array(items) => Self::from(items),
			serde_json::Value::Object(map) => Self::from(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect::<Map>()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn numbers_print_like_the_dom_would() {
		assert_eq!(Value::from(3).to_text(), "3");
		assert_eq!(Value::from(-0.0).to_text(), "0");
		assert_eq!(Value::from(1.5).to_text(), "1.5");
		assert_eq!(Value::Number(f64::NAN).to_text(), "NaN");
	}

	#[test]
	fn nothing_renders_as_empty() {
		assert_eq!(Value::Undefined.to_text(), "");
		assert_eq!(Value::Null.to_text(), "");
		assert_eq!(Value::from(vec![1, 2, 3]).to_text(), "1,2,3");
	}

	#[test]
	fn containers_compare_by_identity() {
		let a = Value::from(json!({"x": 1}));
		let b = Value::from(json!({"x": 1}));
		assert!(a.same(&a.clone()));
		assert!(!a.same(&b));
		assert!(Value::from("x").same(&Value::from("x")));
		assert!(!Value::Number(f64::NAN).same(&Value::Number(f64::NAN)));
	}

	#[test]
	fn json_objects_keep_their_order() {
		let value = Value::from(json!({"b": 1, "a": 2}));
		match value {
			Value::Object(map) => assert_eq!(map.keys().collect::<Vec<_>>(), ["b", "a"]),
			other => panic!("expected an object, got {:?}", other),
		}
	}

	#[test]
	fn properties() {
		let value = Value::from(json!({"items": ["a", "b"]}));
		assert_eq!(value.property("items").property("1").as_str(), Some("b"));
		assert_eq!(value.property("items").property("length").as_f64(), Some(2.0));
		assert!(value.property("missing").property("deeper").is_undefined());
	}
}
