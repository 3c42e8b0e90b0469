//! Single patterns: literals, property paths and function calls.
//!
//! What a pattern *is* gets decided once, on parse. Evaluation only resolves it against a scope chain.

use crate::{
	value::{Map, Value},
	NodeHandle, Scope,
};

/// Marks one step up the scope chain at the start of a path.
pub const ESCAPE: &str = "../";

/// Contextual values for the reserved `$…` identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Context<'a> {
	pub element: Option<NodeHandle>,
	pub parent_element: Option<NodeHandle>,
	/// Name and raw value of the attribute being evaluated.
	pub attribute: Option<(&'a str, &'a str)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reserved {
	Element,
	ParentElement,
	Attribute,
	Scope,
}
impl Reserved {
	fn parse(pattern: &str) -> Option<Self> {
		match pattern {
			"$element" => Some(Self::Element),
			"$parentElement" => Some(Self::ParentElement),
			"$attribute" => Some(Self::Attribute),
			"$scope" => Some(Self::Scope),
			_ => None,
		}
	}

	fn resolve(self, scope: &Scope, context: &Context<'_>) -> Value {
		match self {
			Self::Element => context.element.map_or(Value::Undefined, Value::Node),
			Self::ParentElement => context.parent_element.map_or(Value::Undefined, Value::Node),
			Self::Attribute => context.attribute.map_or(Value::Undefined, |(name, value)| {
				let mut map = Map::new();
				map.insert("name".to_owned(), name.into());
				map.insert("value".to_owned(), value.into());
				map.into()
			}),
			Self::Scope => Value::Scope(scope.clone()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Path {
	/// Number of leading escapes.
	depth: usize,
	segments: Vec<String>,
}
impl Path {
	fn parse(pattern: &str) -> Self {
		let mut rest = pattern.trim();
		let mut depth = 0;
		while let Some(r) = rest.strip_prefix(ESCAPE) {
			depth += 1;
			rest = r;
		}
		let segments = rest
			.split(|c| matches!(c, '.' | '[' | ']'))
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(|s| unquote(s).unwrap_or(s).to_owned())
			.collect();
		Self { depth, segments }
	}

	/// Resolves against the escaped-to ancestor, falling back to its parents while the result is undefined.
	fn resolve(&self, scope: &Scope) -> Value {
		let mut selected = match scope.ancestor(self.depth) {
			Some(selected) => selected,
			None => return Value::Undefined,
		};
		loop {
			let value = self.walk(&selected);
			if !value.is_undefined() {
				return value;
			}
			selected = match selected.parent() {
				Some(parent) => parent,
				None => return Value::Undefined,
			};
		}
	}

	fn walk(&self, scope: &Scope) -> Value {
		let (first, rest) = match self.segments.split_first() {
			Some(split) => split,
			None => return Value::Scope(scope.clone()),
		};
		let mut value = scope.get(first).unwrap_or_default();
		for segment in rest {
			if value.is_undefined() {
				break;
			}
			value = value.property(segment);
		}
		value
	}
}

#[derive(Debug, Clone)]
enum Kind {
	Literal(Value),
	Context(Reserved),
	Path(Path),
	Invocation { path: Path, params: Vec<Expression> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
	/// Call functions and return their result.
	Invoke,
	/// Return the function itself.
	Function,
}

/// One parsed pattern together with its last computed value.
#[derive(Debug, Clone)]
pub(crate) struct Expression {
	pattern: String,
	kind: Kind,
	value: Value,
}

impl Expression {
	pub fn parse(pattern: &str) -> Self {
		let trimmed = pattern.trim();
		let kind = if let Some(reserved) = Reserved::parse(trimmed) {
			Kind::Context(reserved)
		} else if let Some(string) = unquote(trimmed) {
			Kind::Literal(string.into())
		} else if let Some(number) = parse_number(trimmed) {
			Kind::Literal(number.into())
		} else {
			match trimmed.find('(') {
				Some(open) if trimmed.ends_with(')') => Kind::Invocation {
					path: Path::parse(&trimmed[..open]),
					params: split_params(&trimmed[open + 1..trimmed.len() - 1]).into_iter().map(Expression::parse).collect(),
				},
				_ => Kind::Path(Path::parse(trimmed)),
			}
		};
		Self {
			pattern: pattern.to_owned(),
			kind,
			value: Value::Undefined,
		}
	}

	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// The value as of the last [`Expression::update`].
	pub fn value(&self) -> &Value {
		&self.value
	}

	/// Evaluates the pattern, calling a resolved function with the evaluated parameters.
	pub fn evaluate(&self, scope: &Scope, context: &Context<'_>) -> Value {
		self.resolve(scope, context, Mode::Invoke)
	}

	/// Resolves the pattern's target without calling it, for event handlers.
	pub fn function(&self, scope: &Scope, context: &Context<'_>) -> Value {
		self.resolve(scope, context, Mode::Function)
	}

	/// Evaluated call parameters, empty unless the pattern is a call.
	pub fn params(&self, scope: &Scope, context: &Context<'_>) -> Vec<Value> {
		match &self.kind {
			Kind::Invocation { params, .. } => params.iter().map(|p| p.evaluate(scope, context)).collect(),
			_ => Vec::new(),
		}
	}

	/// Recomputes the value, passing it through `transform` first.
	///
	/// Returns whether the stored value changed.
	pub fn update(&mut self, scope: &Scope, context: &Context<'_>, transform: &dyn Fn(&str, &Value, Value) -> Value) -> bool {
		let computed = self.evaluate(scope, context);
		let new = transform(&self.pattern, &self.value, computed);
		if new.same(&self.value) {
			false
		} else {
			self.value = new;
			true
		}
	}

	fn resolve(&self, scope: &Scope, context: &Context<'_>, mode: Mode) -> Value {
		let (path, args) = match &self.kind {
			Kind::Literal(value) => return value.clone(),
			Kind::Context(reserved) => return reserved.resolve(scope, context),
			Kind::Path(path) => (path, Vec::new()),
			Kind::Invocation { path, params } => (path, params.iter().map(|p| p.evaluate(scope, context)).collect()),
		};
		match (path.resolve(scope), mode) {
			(Value::Function(f), Mode::Invoke) => f.call(&args),
			(value, _) => value,
		}
	}
}

/// Content of a string wrapped in matching quotes.
fn unquote(s: &str) -> Option<&str> {
	let quote = s.chars().next().filter(|&c| c == '"' || c == '\'')?;
	if s.len() >= 2 && s.ends_with(quote) {
		Some(&s[1..s.len() - 1])
	} else {
		None
	}
}

fn parse_number(s: &str) -> Option<f64> {
	// Rust accepts `inf` and `nan`, which are valid property names here.
	let first = s.chars().next()?;
	if first.is_ascii_digit() || matches!(first, '-' | '+' | '.') {
		s.parse().ok()
	} else {
		None
	}
}

/// Splits call parameters on top-level commas.
fn split_params(source: &str) -> Vec<&str> {
	if source.trim().is_empty() {
		return Vec::new();
	}
	let mut params = Vec::new();
	let mut depth = 0_usize;
	let mut quote = None;
	let mut start = 0;
	for (i, c) in source.char_indices() {
		match (quote, c) {
			(Some(q), c) if c == q => quote = None,
			(Some(_), _) => (),
			(None, '"' | '\'') => quote = Some(c),
			(None, '(' | '[') => depth += 1,
			(None, ')' | ']') => depth = depth.saturating_sub(1),
			(None, ',') if depth == 0 => {
				params.push(source[start..i].trim());
				start = i + 1;
			}
			(None, _) => (),
		}
	}
	params.push(source[start..].trim());
	params
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::Function;
	use serde_json::json;

	fn eval(pattern: &str, scope: &Scope) -> Value {
		Expression::parse(pattern).evaluate(scope, &Context::default())
	}

	#[test]
	fn literals_never_touch_the_scope() {
		let scope = Scope::new();
		scope.set("5", "five");
		scope.set("'a'", "quoted");
		assert_eq!(eval("'a'", &scope).as_str(), Some("a"));
		assert_eq!(eval("\"b c\"", &scope).as_str(), Some("b c"));
		assert_eq!(eval("5", &scope).as_f64(), Some(5.0));
		assert_eq!(eval("-1.5", &scope).as_f64(), Some(-1.5));
	}

	#[test]
	fn number_like_names_are_paths() {
		let scope = Scope::new();
		scope.set("nan", "not a number");
		assert_eq!(eval("nan", &scope).as_str(), Some("not a number"));
	}

	#[test]
	fn paths_walk_properties() {
		let scope = Scope::from_value(&json!({"user": {"name": "Soma", "tags": ["a", "b"]}}).into());
		assert_eq!(eval("user.name", &scope).as_str(), Some("Soma"));
		assert_eq!(eval("user.tags[1]", &scope).as_str(), Some("b"));
		assert_eq!(eval("user['name']", &scope).as_str(), Some("Soma"));
		assert!(eval("user.missing.deeper", &scope).is_undefined());
	}

	#[test]
	fn inherits_from_parent_scopes() {
		let parent = Scope::new();
		parent.set("name", "parent");
		let child = parent.child();
		assert_eq!(eval("name", &child).as_str(), Some("parent"));
		child.set("name", "child");
		assert_eq!(eval("name", &child).as_str(), Some("child"));
	}

	#[test]
	fn escapes_select_an_ancestor() {
		let root = Scope::new();
		root.set("name", "root");
		let parent = root.child();
		parent.set("name", "parent");
		let child = parent.child();
		child.set("name", "child");
		assert_eq!(eval("../name", &child).as_str(), Some("parent"));
		assert_eq!(eval("../../name", &child).as_str(), Some("root"));
		assert!(eval("../../../name", &child).is_undefined());
	}

	#[test]
	fn calls_functions_with_evaluated_params() {
		let scope = Scope::new();
		scope.set("user", Value::from(json!({"name": "World"})));
		scope.set(
			"greet",
			Function::new(|args| Value::from(format!("Hello {}{}", args[0].to_text(), args[1].to_text()))),
		);
		assert_eq!(eval("greet(user.name, \"!\")", &scope).as_str(), Some("Hello World!"));
		assert_eq!(eval("greet('a, b', 1)", &scope).as_str(), Some("Hello a, b1"));
	}

	#[test]
	fn plain_paths_to_functions_are_called() {
		let scope = Scope::new();
		scope.set("answer", Function::new(|args| Value::from(args.len())));
		assert_eq!(eval("answer", &scope).as_f64(), Some(0.0));
		assert!(Expression::parse("answer").function(&scope, &Context::default()).as_function().is_some());
	}

	#[test]
	fn params_are_evaluated_separately() {
		let scope = Scope::new();
		scope.set("x", 2);
		let expression = Expression::parse("handler(x, 'y', nested(1))");
		let params = expression.params(&scope, &Context::default());
		assert_eq!(params.len(), 3);
		assert_eq!(params[0].as_f64(), Some(2.0));
		assert_eq!(params[1].as_str(), Some("y"));
	}

	#[test]
	fn reserved_identifiers_come_from_the_context() {
		let scope = Scope::new();
		scope.set("$element", "shadowed");
		let context = Context {
			element: Some(NodeHandle(7)),
			parent_element: None,
			attribute: Some(("title", "{{x}}")),
		};
		assert!(matches!(Expression::parse("$element").evaluate(&scope, &context), Value::Node(NodeHandle(7))));
		assert!(Expression::parse("$parentElement").evaluate(&scope, &context).is_undefined());
		let attribute = Expression::parse("$attribute").evaluate(&scope, &context);
		assert_eq!(attribute.property("name").as_str(), Some("title"));
		assert!(matches!(Expression::parse("$scope").evaluate(&scope, &context), Value::Scope(s) if s.ptr_eq(&scope)));
	}

	#[test]
	fn update_reports_changes_only() {
		let scope = Scope::new();
		scope.set("x", "a");
		let mut expression = Expression::parse("x");
		let identity = |_: &str, _: &Value, v: Value| v;
		assert!(expression.update(&scope, &Context::default(), &identity));
		assert!(!expression.update(&scope, &Context::default(), &identity));
		scope.set("x", "b");
		assert!(expression.update(&scope, &Context::default(), &identity));
		assert_eq!(expression.value().as_str(), Some("b"));
	}
}
