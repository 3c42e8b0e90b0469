use cambium_dom::{Dom, Engine, Event, Function, MemoryDocument, Template, Value};
use serde_json::json;
use std::{cell::RefCell, rc::Rc};
use tracing_test::traced_test;

fn setup(markup: &str) -> (Rc<MemoryDocument>, Engine) {
	let document = Rc::new(MemoryDocument::parse(markup));
	let engine = Engine::new(document.clone());
	(document, engine)
}

fn compile(document: &MemoryDocument, engine: &Engine, id: &str) -> Template {
	engine.create(document.find_by_id(id).unwrap(), None).unwrap()
}

fn texts(document: &MemoryDocument, tag: &str) -> Vec<String> {
	document.elements_by_tag(tag).into_iter().map(|node| document.text_content(node)).collect()
}

#[test]
fn clones_are_pooled_by_position() {
	let (document, engine) = setup(r#"<ul id="l"><li data-repeat="item in items">{{item}}</li></ul>"#);
	let template = compile(&document, &engine, "l");

	template.render_with(json!({ "items": ["a", "b", "c"] })).unwrap();
	assert_eq!(texts(&document, "li"), ["a", "b", "c"]);
	let first = document.elements_by_tag("li");
	// List, placeholder, and an element plus a text node per clone.
	assert_eq!(template.node_count(), 8);
	assert_eq!(template.scope().children().len(), 3);

	template.render_with(json!({ "items": ["x", "b"] })).unwrap();
	assert_eq!(texts(&document, "li"), ["x", "b"]);
	assert_eq!(document.elements_by_tag("li"), first[..2]);
	assert_eq!(template.node_count(), 6);
	assert_eq!(template.scope().children().len(), 2);
	assert_eq!(document.parent(first[2]), None);

	template.render_with(json!({ "items": ["x", "b", "z"] })).unwrap();
	let regrown = document.elements_by_tag("li");
	assert_eq!(regrown[..2], first[..2]);
	assert_eq!(template.node_count(), 8);
	assert_eq!(texts(&document, "li"), ["x", "b", "z"]);
}

#[test]
fn shrinking_releases_clones() {
	let (document, engine) = setup(r#"<ul id="l"><li data-repeat="x in xs"><b>{{x}}</b></li></ul>"#);
	let template = compile(&document, &engine, "l");
	template.render_with(json!({ "xs": [] })).unwrap();
	let baseline = document.node_count();

	for _ in 0..100 {
		template.render_with(json!({ "xs": ["a", "b", "c"] })).unwrap();
		template.render_with(json!({ "xs": [] })).unwrap();
	}
	assert_eq!(document.node_count(), baseline);
	assert!(document.create_element("i").index() < baseline + 9);
}

#[test]
fn shrinking_releases_nested_blueprints() {
	let (document, engine) = setup(r#"<div id="g"><p data-repeat="row in rows"><i data-repeat="cell in row">{{cell}}</i></p></div>"#);
	let template = compile(&document, &engine, "g");
	template.render_with(json!({ "rows": [] })).unwrap();
	let baseline = document.node_count();

	for _ in 0..10 {
		template.render_with(json!({ "rows": [[1, 2], [3]] })).unwrap();
		assert_eq!(texts(&document, "i"), ["1", "2", "3"]);
		template.render_with(json!({ "rows": [] })).unwrap();
	}
	assert_eq!(document.node_count(), baseline);
}

#[test]
fn pooled_items_are_computed_once_per_render() {
	let (document, engine) = setup(r#"<ul id="l"><li data-repeat="x in xs">{{_tick(x)}}</li></ul>"#);
	let template = compile(&document, &engine, "l");
	let ticks = Rc::new(RefCell::new(0));
	template.scope().set(
		"_tick",
		Function::new({
			let ticks = ticks.clone();
			move |args| {
				*ticks.borrow_mut() += 1;
				args[0].clone()
			}
		}),
	);

	template.render_with(json!({ "xs": ["a"] })).unwrap();
	assert_eq!(*ticks.borrow(), 1);
	template.render_with(json!({ "xs": ["b"] })).unwrap();
	assert_eq!(*ticks.borrow(), 2);
	assert_eq!(texts(&document, "li"), ["b"]);

	template.update().unwrap();
	assert_eq!(*ticks.borrow(), 3);
}

#[test]
fn unchanged_items_are_not_rewritten() {
	let (document, engine) = setup(r#"<ul id="l"><li data-repeat="item in items">{{item}}</li></ul>"#);
	let template = compile(&document, &engine, "l");
	template.render_with(json!({ "items": ["a", "b"] })).unwrap();

	let writes = document.writes();
	template.render_with(json!({ "items": ["a", "c"] })).unwrap();
	assert_eq!(document.writes(), writes + 1);
}

#[test]
fn objects_repeat_with_keys() {
	let (document, engine) = setup(r#"<dl id="d"><dt data-repeat="value in entries">{{$key}}={{value}}</dt></dl>"#);
	let template = compile(&document, &engine, "d");

	template.render_with(json!({ "entries": { "a": 1, "b": 2 } })).unwrap();
	assert_eq!(texts(&document, "dt"), ["a=1", "b=2"]);

	template.render_with(json!({ "entries": { "b": 3 } })).unwrap();
	assert_eq!(texts(&document, "dt"), ["b=3"]);
}

#[test]
fn arrays_bind_indices() {
	let (document, engine) = setup(r#"<ol id="o"><li data-repeat="fruit in fruits">{{$index}}. {{fruit}}</li></ol>"#);
	let template = compile(&document, &engine, "o");
	template.render_with(json!({ "fruits": ["apple", "pear"] })).unwrap();
	assert_eq!(texts(&document, "li"), ["0. apple", "1. pear"]);
}

#[test]
fn clones_stay_between_their_siblings() {
	let (document, engine) = setup(r#"<ul id="l"><li>first</li><li data-repeat="x in xs">{{x}}</li><li>last</li></ul>"#);
	let template = compile(&document, &engine, "l");

	template.render_with(json!({ "xs": ["a", "b"] })).unwrap();
	assert_eq!(texts(&document, "li"), ["first", "a", "b", "last"]);

	template.render_with(json!({ "xs": [] })).unwrap();
	assert_eq!(texts(&document, "li"), ["first", "last"]);

	template.render_with(json!({ "xs": ["c", "d", "e"] })).unwrap();
	assert_eq!(texts(&document, "li"), ["first", "c", "d", "e", "last"]);
}

#[test]
fn missing_collections_are_empty() {
	let (document, engine) = setup(r#"<ul id="l"><li data-repeat="x in xs">{{x}}</li></ul>"#);
	let template = compile(&document, &engine, "l");
	template.render().unwrap();
	assert!(document.elements_by_tag("li").is_empty());

	template.render_with(json!({ "xs": null })).unwrap();
	assert!(document.elements_by_tag("li").is_empty());
}

#[test]
#[traced_test]
fn other_values_are_empty_too() {
	let (document, engine) = setup(r#"<ul id="l"><li data-repeat="x in xs">{{x}}</li></ul>"#);
	let template = compile(&document, &engine, "l");
	template.render_with(json!({ "xs": ["a"] })).unwrap();
	template.render_with(json!({ "xs": 5 })).unwrap();
	assert!(document.elements_by_tag("li").is_empty());
	assert!(logs_contain("neither an array nor an object"));
}

#[test]
#[traced_test]
fn malformed_repeats_render_in_place() {
	let (document, engine) = setup(r#"<ul id="l"><li data-repeat="nonsense">{{x}}</li></ul>"#);
	let template = compile(&document, &engine, "l");
	template.render_with(json!({ "x": "kept" })).unwrap();
	assert_eq!(texts(&document, "li"), ["kept"]);
	assert!(logs_contain("Malformed repeat directive"));
}

#[test]
fn repeaters_nest() {
	let (document, engine) = setup(
		r#"<div id="g"><div data-repeat="row in rows"><span data-repeat="cell in row.cells">{{row.name}}{{cell}}</span></div></div>"#,
	);
	let g = document.find_by_id("g").unwrap();
	let template = compile(&document, &engine, "g");

	template
		.render_with(json!({ "rows": [{ "name": "a", "cells": [1, 2] }, { "name": "b", "cells": [3] }] }))
		.unwrap();
	assert_eq!(texts(&document, "span"), ["a1", "a2", "b3"]);
	assert_eq!(document.children(g).len(), 2);

	template.render_with(json!({ "rows": [{ "name": "c", "cells": [4] }] })).unwrap();
	assert_eq!(document.text_content(g), "c4");
	assert_eq!(document.children(g).len(), 1);
}

#[test]
fn escapes_reach_past_the_item_scope() {
	let (document, engine) = setup(r#"<ul id="l"><li data-repeat="name in names">{{name}}/{{../name}}</li></ul>"#);
	let template = compile(&document, &engine, "l");
	template.render_with(json!({ "name": "outer", "names": ["inner"] })).unwrap();
	assert_eq!(texts(&document, "li"), ["inner/outer"]);
}

#[test]
fn repeated_items_bind_their_own_events() {
	let (document, engine) = setup(r#"<ul id="l"><li data-repeat="x in xs" data-click="_pick($index, x)">{{x}}</li></ul>"#);
	let template = compile(&document, &engine, "l");
	template.render_with(json!({ "xs": ["a", "b", "c"] })).unwrap();

	let picks = Rc::new(RefCell::new(Vec::new()));
	template.scope().set(
		"_pick",
		Function::new({
			let picks = picks.clone();
			move |args| {
				assert!(matches!(&args[0], Value::Event(event) if event.kind == "click"));
				picks.borrow_mut().push((args[1].as_f64(), args[2].to_text()));
				Value::Undefined
			}
		}),
	);

	let items = document.elements_by_tag("li");
	assert!(items.iter().all(|&li| document.listener_count(li) == 1));
	assert_eq!(document.dispatch(items[1], "click"), 1);
	assert_eq!(*picks.borrow(), [(Some(1.0), "b".to_owned())]);

	template.render_with(json!({ "xs": ["a"] })).unwrap();
	assert_eq!(document.listener_count(items[2]), 0);
	assert_eq!(document.dispatch(items[2], "click"), 0);

	// Pooled clones resolve the item at dispatch time.
	template.render_with(json!({ "xs": ["z"] })).unwrap();
	document.dispatch(items[0], "click");
	assert_eq!(picks.borrow().last(), Some(&(Some(0.0), "z".to_owned())));
}

#[test]
fn custom_listeners_see_the_event() {
	let (document, engine) = setup(r#"<ul id="l"><li>static</li></ul>"#);
	let li = document.elements_by_tag("li")[0];
	let seen = Rc::new(RefCell::new(None));
	engine.add_event(li, "click", {
		let seen = seen.clone();
		move |event: Rc<Event>| *seen.borrow_mut() = Some(event.target)
	});
	document.dispatch(li, "click");
	assert_eq!(*seen.borrow(), Some(li));
}
