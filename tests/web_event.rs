#![cfg(target_arch = "wasm32")]

use cambium_dom::{Dom, Engine, Function, Value, WebDocument};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::HtmlElement;

wasm_bindgen_test_configure!(run_in_browser);

static mut LOG_INITIALIZED: bool = false;

#[wasm_bindgen_test]
fn click() {
	unsafe {
		if !LOG_INITIALIZED {
			tracing_wasm::set_as_global_default();
			LOG_INITIALIZED = true;
		}
	}

	let document = Rc::new(WebDocument::new().unwrap());
	let body = document.body().unwrap();
	document.set_inner_html(body, r#"<div id="app"><button id="test-button" data-click="count(step)"></button></div>"#);

	let engine = Engine::new(document.clone());
	let template = engine.create(document.element_by_id("app").unwrap(), None).unwrap();
	let click_count = Rc::new(RefCell::new(0.0));
	template.scope().set("step", 2);
	template.scope().set(
		"count",
		Function::new({
			let click_count = click_count.clone();
			move |args| {
				assert!(matches!(&args[0], Value::Event(event) if event.kind == "click" && event.native::<web_sys::Event>().is_some()));
				*click_count.borrow_mut() += args[1].as_f64().unwrap_or_default();
				Value::Undefined
			}
		}),
	);

	let button: HtmlElement = document.node(document.element_by_id("test-button").unwrap()).unwrap().dyn_into().unwrap();
	assert_eq!(*click_count.borrow(), 0.0);
	button.click();
	assert_eq!(*click_count.borrow(), 2.0);

	template.dispose();
	button.click();
	assert_eq!(*click_count.borrow(), 2.0);
}
