use crate::{
	expression::{Context, Expression},
	settings::{Piece, Settings},
	Scope, Value,
};

#[derive(Debug, Clone)]
enum Part {
	Literal(String),
	/// Index into [`Interpolation::expressions`].
	Expression(usize),
}

/// A string split into literal fragments and embedded expressions.
#[derive(Debug, Clone)]
pub(crate) struct Interpolation {
	raw: String,
	parts: Vec<Part>,
	expressions: Vec<Expression>,
}

impl Interpolation {
	pub fn new(raw: &str, settings: &Settings) -> Self {
		let mut parts = Vec::new();
		let mut expressions = Vec::new();
		for piece in settings.split(raw) {
			match piece {
				Piece::Literal(literal) => parts.push(Part::Literal(literal.to_owned())),
				Piece::Token(pattern) => {
					parts.push(Part::Expression(expressions.len()));
					expressions.push(Expression::parse(pattern));
				}
			}
		}
		Self {
			raw: raw.to_owned(),
			parts,
			expressions,
		}
	}

	pub fn is_dynamic(&self) -> bool {
		!self.expressions.is_empty()
	}

	/// Recomputes every expression. Returns whether any of them changed.
	pub fn update(&mut self, scope: &Scope, context: &Context<'_>, transform: &dyn Fn(&str, &Value, Value) -> Value) -> bool {
		let mut changed = false;
		for expression in &mut self.expressions {
			changed |= expression.update(scope, context, transform);
		}
		changed
	}

	/// Joins the current fragment and expression values.
	pub fn render(&self) -> String {
		if !self.is_dynamic() {
			return self.raw.clone();
		}
		let mut text = String::new();
		for part in &self.parts {
			match part {
				Part::Literal(literal) => text.push_str(literal),
				Part::Expression(i) => text.push_str(&self.expressions[*i].value().to_text()),
			}
		}
		text
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn identity(_: &str, _: &Value, v: Value) -> Value {
		v
	}

	#[test]
	fn renders_current_values() {
		let settings = Settings::default();
		let scope = Scope::new();
		scope.set("name", "World");
		let mut interpolation = Interpolation::new("Hello {{name}}!", &settings);
		assert_eq!(interpolation.render(), "Hello !");
		assert!(interpolation.update(&scope, &Context::default(), &identity));
		assert_eq!(interpolation.render(), "Hello World!");
		assert!(!interpolation.update(&scope, &Context::default(), &identity));
	}

	#[test]
	fn static_strings_render_verbatim() {
		let interpolation = Interpolation::new("just text", &Settings::default());
		assert!(!interpolation.is_dynamic());
		assert_eq!(interpolation.render(), "just text");
	}

	#[test]
	fn missing_values_render_empty() {
		let mut interpolation = Interpolation::new("[{{a}}|{{b.c}}]", &Settings::default());
		interpolation.update(&Scope::new(), &Context::default(), &identity);
		assert_eq!(interpolation.render(), "[|]");
	}
}
