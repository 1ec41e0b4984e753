#![cfg(target_arch = "wasm32")]
#![forbid(unsafe_code)]

//! The adapter against a real browser DOM.
//!
//! All tests share one page, so the patches are installed once and each
//! test builds its own elements. The shade rule is one-shot, so only one
//! test may register on `#red-ui-editor-shade`.
//!
//! Run:
//!   wasm-pack test --headless --chrome crates/flowpatch-web

use std::cell::Cell;
use std::rc::Rc;

use flowpatch_core::PatchConfig;
use flowpatch_web::WebPatches;
use js_sys::{Function, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{
    Document, Element, Event, HtmlElement, MouseEvent, MouseEventInit, PointerEvent,
    PointerEventInit,
};

wasm_bindgen_test_configure!(run_in_browser);

const SVG_NS: &str = "http://www.w3.org/2000/svg";

thread_local! {
    static PATCHES: WebPatches = {
        let window = web_sys::window().expect("window");
        let document = window.document().expect("document");
        flowpatch_web::install(&window, &document, &PatchConfig::default())
            .expect("patches install")
    };
}

fn with_patches<R>(f: impl FnOnce(&WebPatches, &Document, &HtmlElement) -> R) -> R {
    PATCHES.with(|patches| {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .expect("document");
        let body = document.body().expect("body");
        f(patches, &document, &body)
    })
}

/// Listener counting its calls; optionally stops propagation.
fn counter(stop: bool) -> (Rc<Cell<u32>>, Function) {
    let hits = Rc::new(Cell::new(0));
    let seen = Rc::clone(&hits);
    let callback = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        seen.set(seen.get() + 1);
        if stop {
            event.stop_propagation();
        }
    })
    .into_js_value()
    .unchecked_into::<Function>();
    (hits, callback)
}

fn mouse(name: &str, button: i16) -> MouseEvent {
    let init = MouseEventInit::new();
    init.set_bubbles(true);
    init.set_cancelable(true);
    init.set_button(button);
    MouseEvent::new_with_mouse_event_init_dict(name, &init).expect("mouse event")
}

fn pointer_click() -> PointerEvent {
    let init = PointerEventInit::new();
    init.set_bubbles(true);
    init.set_cancelable(true);
    init.set_button(0);
    PointerEvent::new_with_event_init_dict("click", &init).expect("pointer event")
}

fn div_prototype_overridden() -> bool {
    let constructor = Reflect::get(&js_sys::global(), &"HTMLDivElement".into()).expect("class");
    let prototype: Object = Reflect::get(&constructor, &"prototype".into())
        .expect("prototype")
        .unchecked_into();
    prototype.has_own_property(&"addEventListener".into())
}

fn palette_heading(document: &Document, body: &HtmlElement, name: &str) -> Element {
    let heading = document.create_element("div").expect("div");
    heading.set_class_name("red-ui-palette-module-name");
    let label = document.create_element("span").expect("span");
    label.set_text_content(Some(name));
    heading.append_child(&label).expect("append");
    body.append_child(&heading).expect("append");
    label
}

#[wasm_bindgen_test]
fn shade_corrective_runs_first_then_div_entry_point_is_restored() {
    with_patches(|patches, document, body| {
        let code: HtmlElement = document
            .create_element("textarea")
            .expect("textarea")
            .unchecked_into();
        body.append_child(&code).expect("append");
        let shade = document.create_element("div").expect("div");
        shade.set_id("red-ui-editor-shade");
        body.append_child(&shade).expect("append");
        assert!(div_prototype_overridden());

        let (closes, close_tray) = counter(false);
        shade
            .add_event_listener_with_callback("click", &close_tray)
            .expect("register");
        assert_eq!(patches.rules_left(), 1);
        assert!(!div_prototype_overridden());

        code.focus().expect("focus");
        shade.dispatch_event(&mouse("click", 0)).expect("dispatch");
        assert_eq!(closes.get(), 0);

        code.blur().expect("blur");
        shade.dispatch_event(&mouse("click", 0)).expect("dispatch");
        assert_eq!(closes.get(), 1);
    });
}

#[wasm_bindgen_test]
fn middle_press_on_a_wire_reaches_the_canvas() {
    with_patches(|_, document, body| {
        let canvas = document.create_element("div").expect("div");
        let svg = document.create_element_ns(Some(SVG_NS), "svg").expect("svg");
        let wire = document.create_element_ns(Some(SVG_NS), "path").expect("path");
        wire.set_attribute("class", "red-ui-flow-link-path").expect("class");
        svg.append_child(&wire).expect("append");
        canvas.append_child(&svg).expect("append");
        body.append_child(&canvas).expect("append");

        let (drags, drag) = counter(false);
        canvas
            .add_event_listener_with_callback("mousedown", &drag)
            .expect("register");
        let (selects, select) = counter(true);
        wire.add_event_listener_with_callback("mousedown", &select)
            .expect("register");
        assert!(wire.has_attribute("data-fixed"));

        wire.dispatch_event(&mouse("mousedown", 1)).expect("dispatch");
        assert_eq!((selects.get(), drags.get()), (0, 1));

        wire.dispatch_event(&mouse("mousedown", 0)).expect("dispatch");
        assert_eq!((selects.get(), drags.get()), (1, 1));
    });
}

#[wasm_bindgen_test]
fn reopening_the_menu_keeps_one_dismissal_pair() {
    with_patches(|patches, document, body| {
        let first = palette_heading(document, body, "node-red-contrib-foo");
        let second = palette_heading(document, body, "node-red-dashboard");
        let opened = patches.menus_opened();

        for label in [&first, &second] {
            let proceeded = label.dispatch_event(&mouse("contextmenu", 2)).expect("dispatch");
            assert!(!proceeded, "native menu should be suppressed");
        }
        assert_eq!(patches.menus_opened(), opened + 2);
        assert!(patches.menu_is_open());

        let calls = patches.dismissal_calls();
        body.dispatch_event(&mouse("mousedown", 0)).expect("dispatch");
        assert_eq!(patches.dismissal_calls(), calls + 1);
        assert!(patches.menu_is_open());

        body.dispatch_event(&pointer_click()).expect("dispatch");
        assert_eq!(patches.dismissal_calls(), calls + 2);
        assert!(!patches.menu_is_open());

        body.dispatch_event(&mouse("mousedown", 1)).expect("dispatch");
        body.dispatch_event(&pointer_click()).expect("dispatch");
        assert_eq!(patches.dismissal_calls(), calls + 2);
    });
}

#[wasm_bindgen_test]
fn unrecognized_right_clicks_keep_the_native_menu() {
    with_patches(|patches, document, body| {
        let heading = palette_heading(document, body, "Subflows");
        let opened = patches.menus_opened();
        let proceeded = heading.dispatch_event(&mouse("contextmenu", 2)).expect("dispatch");
        assert!(proceeded);
        assert_eq!(patches.menus_opened(), opened);
    });
}
