//! Interpolation delimiters and the directive vocabulary.

use crate::Error;
use hashbrown::HashMap;
use regex::Regex;
use std::borrow::Cow;

/// Native events that can be bound declaratively as `<prefix><event>="handler(…)"`.
pub const EVENT_NAMES: &[&str] = &[
	"click", "dblclick", "mousedown", "mouseup", "mouseover", "mouseout", "mousemove", "mouseenter", "mouseleave",
	"contextmenu", "keydown", "keyup", "keypress", "focus", "blur", "change", "input", "submit", "reset", "select",
	"scroll", "resize", "touchstart", "touchend", "touchmove", "touchcancel", "dragstart", "drag", "dragenter",
	"dragleave", "dragover", "drop", "dragend",
];

/// Attributes with structural or presentational meaning, without their prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
	Repeat,
	Skip,
	Html,
	Show,
	Hide,
	Src,
	Href,
	Class,
	Checked,
	Disabled,
	Multiple,
	Readonly,
	Selected,
	/// Auto-bootstrap entry point.
	Template,
}
impl Directive {
	const ALL: [Directive; 14] = [
		Self::Repeat,
		Self::Skip,
		Self::Html,
		Self::Show,
		Self::Hide,
		Self::Src,
		Self::Href,
		Self::Class,
		Self::Checked,
		Self::Disabled,
		Self::Multiple,
		Self::Readonly,
		Self::Selected,
		Self::Template,
	];

	#[must_use]
	pub fn suffix(self) -> &'static str {
		match self {
			Self::Repeat => "repeat",
			Self::Skip => "skip",
			Self::Html => "html",
			Self::Show => "show",
			Self::Hide => "hide",
			Self::Src => "src",
			Self::Href => "href",
			Self::Class => "class",
			Self::Checked => "checked",
			Self::Disabled => "disabled",
			Self::Multiple => "multiple",
			Self::Readonly => "readonly",
			Self::Selected => "selected",
			Self::Template => "template",
		}
	}

	/// The reflected boolean property/attribute, for form-control directives.
	#[must_use]
	pub fn boolean_property(self) -> Option<&'static str> {
		match self {
			Self::Checked | Self::Disabled | Self::Multiple | Self::Readonly | Self::Selected => Some(self.suffix()),
			_ => None,
		}
	}
}

/// A piece of a string split on interpolation tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Piece<'a> {
	Literal(&'a str),
	/// Token contents, delimiters stripped.
	Token(&'a str),
}

/// Engine configuration.
///
/// Immutable once built; the derived matchers always agree with the delimiters.
#[derive(Debug, Clone)]
pub struct Settings {
	start: String,
	end: String,
	prefix: String,
	cloak: String,
	auto_bootstrap: bool,
	sequence: Regex,
	token: Regex,
	strip: Regex,
	events: HashMap<String, &'static str>,
}

impl Default for Settings {
	fn default() -> Self {
		Settings::builder().build().expect("default delimiters are valid")
	}
}

impl Settings {
	#[must_use]
	pub fn builder() -> SettingsBuilder {
		SettingsBuilder::default()
	}

	#[must_use]
	pub fn token_start(&self) -> &str {
		&self.start
	}

	#[must_use]
	pub fn token_end(&self) -> &str {
		&self.end
	}

	#[must_use]
	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// Class removed from elements once they have been rendered.
	#[must_use]
	pub fn cloak(&self) -> &str {
		&self.cloak
	}

	#[must_use]
	pub fn auto_bootstrap(&self) -> bool {
		self.auto_bootstrap
	}

	/// Full attribute name of `directive`, e.g. `data-repeat`.
	#[must_use]
	pub fn attribute(&self, directive: Directive) -> String {
		format!("{}{}", self.prefix, directive.suffix())
	}

	#[must_use]
	pub fn directive(&self, attribute: &str) -> Option<Directive> {
		let suffix = attribute.strip_prefix(self.prefix.as_str())?;
		Directive::ALL.iter().copied().find(|d| d.suffix() == suffix)
	}

	/// Native event bound by `attribute`, if it is an event attribute.
	#[must_use]
	pub fn event(&self, attribute: &str) -> Option<&'static str> {
		self.events.get(attribute).copied()
	}

	#[must_use]
	pub fn has_token(&self, text: &str) -> bool {
		self.token.is_match(text)
	}

	/// Removes all delimiters from `text`.
	#[must_use]
	pub fn strip_tokens<'a>(&self, text: &'a str) -> Cow<'a, str> {
		self.strip.replace_all(text, "")
	}

	pub(crate) fn split<'a>(&self, text: &'a str) -> Vec<Piece<'a>> {
		let mut pieces = Vec::new();
		let mut last = 0;
		for captures in self.sequence.captures_iter(text) {
			let (whole, inner) = match (captures.get(0), captures.get(1)) {
				(Some(whole), Some(inner)) => (whole, inner),
				_ => continue,
			};
			if whole.start() > last {
				pieces.push(Piece::Literal(&text[last..whole.start()]));
			}
			pieces.push(Piece::Token(inner.as_str()));
			last = whole.end();
		}
		if last < text.len() {
			pieces.push(Piece::Literal(&text[last..]));
		}
		pieces
	}
}

#[derive(Debug, Clone)]
pub struct SettingsBuilder {
	start: String,
	end: String,
	prefix: String,
	cloak: Option<String>,
	auto_bootstrap: bool,
}

impl Default for SettingsBuilder {
	fn default() -> Self {
		Self {
			start: "{{".to_owned(),
			end: "}}".to_owned(),
			prefix: "data-".to_owned(),
			cloak: None,
			auto_bootstrap: true,
		}
	}
}

impl SettingsBuilder {
	#[must_use]
	pub fn tokens(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
		self.start = start.into();
		self.end = end.into();
		self
	}

	/// Directive and event attribute prefix. The cloak class follows it unless set explicitly.
	#[must_use]
	pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}

	#[must_use]
	pub fn cloak(mut self, cloak: impl Into<String>) -> Self {
		self.cloak = Some(cloak.into());
		self
	}

	#[must_use]
	pub fn auto_bootstrap(mut self, enabled: bool) -> Self {
		self.auto_bootstrap = enabled;
		self
	}

	/// # Errors
	///
	/// [`Error::InvalidDelimiter`] if either delimiter is empty.
	pub fn build(self) -> Result<Settings, Error> {
		let first = self.start.chars().next().ok_or(Error::InvalidDelimiter)?;
		if self.end.is_empty() {
			return Err(Error::InvalidDelimiter);
		}

		let start = regex::escape(&self.start);
		let end = regex::escape(&self.end);
		// `{{{x}}}` must yield `{` + `{{x}}` + `}`, so a token can't begin with the delimiter's own character.
		let head = if self.start.chars().all(|c| c == first) {
			format!("[^{}]", regex::escape(&first.to_string()))
		} else {
			".".to_owned()
		};

		let events = EVENT_NAMES.iter().map(|&event| (format!("{}{}", self.prefix, event), event)).collect();

		Ok(Settings {
			sequence: Regex::new(&format!("(?s){start}({head}.*?){end}"))?,
			token: Regex::new(&format!("(?s){start}{head}.*?{end}"))?,
			strip: Regex::new(&format!("{start}|{end}"))?,
			cloak: self.cloak.unwrap_or_else(|| format!("{}cloak", self.prefix)),
			start: self.start,
			end: self.end,
			prefix: self.prefix,
			auto_bootstrap: self.auto_bootstrap,
			events,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_literals_and_tokens() {
		let settings = Settings::default();
		assert_eq!(
			settings.split("Hello {{name}}!"),
			[Piece::Literal("Hello "), Piece::Token("name"), Piece::Literal("!")]
		);
		assert_eq!(settings.split("{{a}}{{b}}"), [Piece::Token("a"), Piece::Token("b")]);
		assert_eq!(settings.split("plain"), [Piece::Literal("plain")]);
	}

	#[test]
	fn tolerates_adjacent_delimiter_characters() {
		let settings = Settings::default();
		assert_eq!(
			settings.split("{{{x}}}"),
			[Piece::Literal("{"), Piece::Token("x"), Piece::Literal("}")]
		);
	}

	#[test]
	fn custom_delimiters_rebuild_every_matcher() {
		let settings = Settings::builder().tokens("[[", "]]").build().unwrap();
		assert!(settings.has_token("a [[b]] c"));
		assert!(!settings.has_token("a {{b}} c"));
		assert_eq!(settings.strip_tokens("[[b]]"), "b");
		assert_eq!(settings.split("<[[x.y]]>"), [Piece::Literal("<"), Piece::Token("x.y"), Piece::Literal(">")]);
	}

	#[test]
	fn empty_delimiters_are_rejected() {
		assert!(matches!(Settings::builder().tokens("", "}}").build(), Err(Error::InvalidDelimiter)));
		assert!(matches!(Settings::builder().tokens("{{", "").build(), Err(Error::InvalidDelimiter)));
	}

	#[test]
	fn directive_vocabulary_follows_the_prefix() {
		let settings = Settings::builder().prefix("x-").build().unwrap();
		assert_eq!(settings.directive("x-repeat"), Some(Directive::Repeat));
		assert_eq!(settings.directive("data-repeat"), None);
		assert_eq!(settings.event("x-click"), Some("click"));
		assert_eq!(settings.event("x-selected"), None);
		assert_eq!(settings.attribute(Directive::Class), "x-class");
		assert_eq!(settings.cloak(), "x-cloak");
	}
}
