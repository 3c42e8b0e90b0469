#![doc(html_root_url = "https://docs.rs/cambium-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Reactive templates over DOM trees.
//!
//! An [`Engine`] compiles element subtrees into [`Template`]s. Text and attribute values containing
//! `{{expression}}` tokens are bound to the template's [`Scope`], `data-repeat="item in items"` repeats an element
//! once per collection entry, and attributes like `data-click="save(item)"` call scope functions on events.
//!
//! The document is abstracted behind [`Dom`]. [`MemoryDocument`] keeps everything in memory,
//! `WebDocument` drives the browser's document on `wasm32` targets.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod attribute;
mod dom;
mod engine;
mod error;
mod events;
mod expression;
mod identity_map;
mod interpolation;
mod memory;
pub mod plugin;
mod scope;
mod settings;
mod template;
mod value;
#[cfg(target_arch = "wasm32")]
mod web;

pub use dom::{Dom, Event, Listener, ListenerId, NodeHandle, NodeType};
pub use engine::{Bootstrap, Engine, EngineBuilder, Source};
pub use error::Error;
pub use expression::ESCAPE;
pub use memory::MemoryDocument;
pub use scope::Scope;
pub use settings::{Directive, Settings, SettingsBuilder, EVENT_NAMES};
pub use template::{Template, WatchContext, WatchKey, Watcher};
pub use value::{Function, Map, Value};
#[cfg(target_arch = "wasm32")]
pub use web::WebDocument;
