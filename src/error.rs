use crate::NodeHandle;

/// Everything that can make a template structurally unusable.
///
/// None of these are retried internally. An error raised during [`update`](`crate::Template::update`)
/// or [`render`](`crate::Template::render`) aborts the current cycle and is handed to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// [`Engine::create`](`crate::Engine::create`) was given markup but nothing to host it in.
	#[error("a target element is required to host template markup")]
	MissingTarget,

	/// The template source is neither markup nor an element.
	#[error("{0:?} is neither template markup nor an element")]
	InvalidSource(NodeHandle),

	/// A `data-class` value that isn't a JSON object after interpolation.
	#[error("malformed class directive {value:?}: {source}")]
	MalformedClass {
		value: String,
		#[source]
		source: serde_json::Error,
	},

	#[error("{0:?} is not an element")]
	NotAnElement(NodeHandle),

	#[error("interpolation delimiters must not be empty")]
	InvalidDelimiter,

	#[error("invalid delimiter pattern: {0}")]
	Pattern(#[from] regex::Error),

	/// A template was updated or rendered from inside one of its own expressions.
	#[error("template is already being updated or rendered")]
	Reentrant,

	#[error("template has been disposed")]
	Disposed,
}
