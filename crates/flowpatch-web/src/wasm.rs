#![forbid(unsafe_code)]

//! `wasm-bindgen` entry point installing the patches on the live page.
//!
//! Listener interception overrides `addEventListener` on the
//! `HTMLDivElement` and `SVGPathElement` prototypes with a function that
//! asks the core [`InterceptionRegistry`] how to perform each call, then
//! performs it through the native `EventTarget.prototype.addEventListener`.
//! A prototype's override is deleted once no rule for its kind is left.
//!
//! Listeners installed here live as long as the page, so their closures
//! are handed to JS and never dropped. Only compiled on `wasm32` targets.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AbortController, AddEventListenerOptions, Document, Element, Event, EventTarget, HtmlElement,
    KeyboardEvent, MouseEvent, PointerEvent, WheelEvent, Window,
};

use flowpatch_core::badge::output_ordinal;
use flowpatch_core::config::{BadgeConfig, MenuConfig, PatchConfig};
use flowpatch_core::intercept::{Interception, InterceptionRegistry, Registration};
use flowpatch_core::menu::{self, DISABLED_CLASS, LIBRARY_LABEL, MenuLinks, PACKAGE_LABEL};
use flowpatch_core::rules::{self, WheelAction, ZoomDirection};
use flowpatch_core::{DomEvent, ElementKind, ElementProbe, EventInterface, EventType, Point, Size};

use crate::bridge::{RawEvent, marker_attribute, prototype_name, px};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

fn console_call(method: &str, msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(log) = Reflect::get(&console, &method.into()) else {
        return;
    };
    let Ok(log_fn) = log.dyn_into::<Function>() else {
        return;
    };
    let _ = log_fn.call1(&console, &JsValue::from_str(msg));
}

fn console_error(msg: &str) {
    console_call("error", msg);
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

fn report(context: &str, result: Result<(), JsValue>) {
    if let Err(err) = result {
        console_error(&format!("flowpatch {context} failed: {err:?}"));
    }
}

/// Core snapshot of a live event.
fn snapshot(event: &Event) -> DomEvent {
    let name = event.type_();
    let key = event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key);
    let mut raw = RawEvent {
        name: &name,
        key: key.as_deref(),
        ..RawEvent::default()
    };
    if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
        raw.interface = Some(if event.is_instance_of::<WheelEvent>() {
            EventInterface::WheelEvent
        } else if event.is_instance_of::<PointerEvent>() {
            EventInterface::PointerEvent
        } else {
            EventInterface::MouseEvent
        });
        raw.button = Some(mouse.button());
        raw.client_x = f64::from(mouse.client_x());
        raw.client_y = f64::from(mouse.client_y());
        raw.ctrl = mouse.ctrl_key();
        raw.shift = mouse.shift_key();
        raw.alt = mouse.alt_key();
        raw.meta = mouse.meta_key();
    }
    if let Some(wheel) = event.dyn_ref::<WheelEvent>() {
        raw.delta_y = wheel.delta_y();
        raw.wheel_delta_y = Reflect::get(event, &"wheelDeltaY".into())
            .ok()
            .and_then(|v| v.as_f64());
    }
    if let Some(keyboard) = event.dyn_ref::<KeyboardEvent>() {
        raw.interface = Some(EventInterface::KeyboardEvent);
        raw.ctrl = keyboard.ctrl_key();
        raw.shift = keyboard.shift_key();
        raw.alt = keyboard.alt_key();
        raw.meta = keyboard.meta_key();
    }
    raw.to_dom_event()
}

fn event_element(event: &Event) -> Option<Element> {
    event.target().and_then(|t| t.dyn_into::<Element>().ok())
}

fn add_listener(
    target: &EventTarget,
    name: &str,
    options: &AddEventListenerOptions,
    f: impl FnMut(Event) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(Event)>::new(f);
    target.add_event_listener_with_callback_and_add_event_listener_options(
        name,
        closure.as_ref().unchecked_ref(),
        options,
    )?;
    closure.forget();
    Ok(())
}

fn active_options() -> AddEventListenerOptions {
    let options = AddEventListenerOptions::new();
    options.set_passive(false);
    options
}

// ---------------------------------------------------------------------------
// Listener interception
// ---------------------------------------------------------------------------

/// A live `Element` as seen by the registry.
struct LiveElement<'a>(&'a Element);

impl ElementProbe for LiveElement<'_> {
    fn kind(&self) -> ElementKind {
        ElementKind::from_tag(&self.0.local_name())
    }

    fn has_id(&self, id: &str) -> bool {
        self.0.id() == id
    }

    fn has_class(&self, class: &str) -> bool {
        self.0.class_list().contains(class)
    }

    fn has_marker(&self, marker: &str) -> bool {
        self.0.has_attribute(&marker_attribute(marker))
    }

    fn set_marker(&mut self, marker: &str) {
        report(
            "wire marker",
            self.0.set_attribute(&marker_attribute(marker), "1"),
        );
    }
}

/// A JS listener (function or `handleEvent` object).
#[derive(Clone)]
struct JsListener(JsValue);

struct Interceptor {
    registry: InterceptionRegistry<JsListener>,
    native: Function,
    patched: Vec<(ElementKind, Object)>,
}

impl Interceptor {
    fn restore_idle_prototypes(&mut self) {
        let registry = &self.registry;
        self.patched.retain(|(kind, prototype)| {
            if registry.is_intercepting(kind) {
                return true;
            }
            report(
                "prototype restore",
                Reflect::delete_property(prototype, &"addEventListener".into()).map(drop),
            );
            tracing::debug!(kind = kind.tag(), "prototype override removed");
            false
        });
    }
}

fn install_interceptor(
    config: &PatchConfig,
    document: &Document,
) -> Result<Rc<RefCell<Interceptor>>, JsValue> {
    let global = js_sys::global();
    let event_target = Reflect::get(&global, &"EventTarget".into())?;
    let prototype = Reflect::get(&event_target, &"prototype".into())?;
    let native: Function = Reflect::get(&prototype, &"addEventListener".into())?.dyn_into()?;

    let focus_source = document.clone();
    let shade_corrective = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let focused = focus_source
            .active_element()
            .map(|element| ElementKind::from_tag(&element.local_name()));
        if focused.is_some_and(|kind| rules::shade_click_blocked(&kind)) {
            event.stop_immediate_propagation();
        }
    })
    .into_js_value();

    let mut registry = InterceptionRegistry::new();
    registry.add_rule(rules::wire_middle_click_rule(&config.wire));
    registry.add_rule(rules::shade_click_rule(
        &config.shade,
        JsListener(shade_corrective),
    ));

    let state = Rc::new(RefCell::new(Interceptor {
        registry,
        native,
        patched: Vec::new(),
    }));

    let handle = Rc::clone(&state);
    let hook = Closure::<dyn FnMut(JsValue, JsValue, JsValue, JsValue)>::new(
        move |this: JsValue, event_type: JsValue, listener: JsValue, options: JsValue| {
            report(
                "listener registration",
                on_registration(&handle, &this, &event_type, listener, &options),
            );
        },
    );
    // `this` is not reachable from a Rust closure; a thin JS shim forwards it.
    let factory = Function::new_with_args(
        "hook",
        concat!(
            "return function (type, listener, options) ",
            "{ return hook(this, type, listener, options); };",
        ),
    );
    let override_fn = factory.call1(&JsValue::NULL, hook.as_ref())?;
    hook.forget();

    for kind in [ElementKind::Div, ElementKind::SvgPath] {
        let Some(name) = prototype_name(&kind) else {
            continue;
        };
        let prototype: Object =
            Reflect::get(&Reflect::get(&global, &name.into())?, &"prototype".into())?.dyn_into()?;
        Reflect::set(&prototype, &"addEventListener".into(), &override_fn)?;
        state.borrow_mut().patched.push((kind, prototype));
    }
    Ok(state)
}

fn on_registration(
    state: &Rc<RefCell<Interceptor>>,
    this: &JsValue,
    event_type: &JsValue,
    listener: JsValue,
    options: &JsValue,
) -> Result<(), JsValue> {
    let native = state.borrow().native.clone();
    let Some(element) = this.dyn_ref::<Element>() else {
        native.call3(this, event_type, &listener, options)?;
        return Ok(());
    };

    let name = event_type.as_string().unwrap_or_default();
    let decision = {
        let mut state = state.borrow_mut();
        let decision = state.registry.intercept(
            &mut LiveElement(element),
            Registration::new(EventType::from_dom_name(&name), JsListener(listener)),
        );
        state.restore_idle_prototypes();
        decision
    };

    match decision {
        Interception::Forward(registration) => {
            native.call3(this, event_type, &registration.listener.0, options)?;
        }
        Interception::Guarded {
            registration,
            guard,
            ..
        } => {
            let wrapped = match registration.listener.0.dyn_ref::<Function>() {
                Some(callback) => {
                    let callback = callback.clone();
                    let target = this.clone();
                    Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                        if guard(&snapshot(&event)) {
                            report(
                                "guarded listener",
                                callback.call1(&target, &event).map(drop),
                            );
                        }
                    })
                    .into_js_value()
                }
                None => registration.listener.0,
            };
            native.call3(this, event_type, &wrapped, options)?;
        }
        Interception::Preceded {
            corrective,
            registration,
            ..
        } => {
            native.call2(
                this,
                &JsValue::from_str(corrective.event_type.dom_name()),
                &corrective.listener.0,
            )?;
            native.call3(this, event_type, &registration.listener.0, options)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Window-level input rules
// ---------------------------------------------------------------------------

fn install_input_rules(
    window: &Window,
    document: &Document,
    config: &PatchConfig,
) -> Result<(), JsValue> {
    let zoom = config.zoom.clone();
    let buttons = document.clone();
    add_listener(window, "wheel", &active_options(), move |event| {
        let action = rules::wheel_action(&snapshot(&event), zoom.modifier);
        if action == WheelAction::PassThrough {
            return;
        }
        event.prevent_default();
        if let WheelAction::Redirect(direction) = action {
            let id = match direction {
                ZoomDirection::In => &zoom.zoom_in_id,
                ZoomDirection::Out => &zoom.zoom_out_id,
            };
            if let Some(button) = buttons
                .get_element_by_id(id)
                .and_then(|element| element.dyn_into::<HtmlElement>().ok())
            {
                button.click();
            }
        }
    })?;

    add_listener(window, "keydown", &active_options(), |event| {
        if rules::is_save_shortcut(&snapshot(&event)) {
            event.prevent_default();
        }
    })?;

    add_listener(window, "mousedown", &active_options(), |event| {
        if rules::is_autoscroll_press(&snapshot(&event)) {
            event.prevent_default();
        }
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Context menu
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct MenuDom {
    root: HtmlElement,
    library_item: Element,
    library_link: Element,
    package_link: Element,
    dismiss: JsValue,
}

struct WebMenu {
    config: MenuConfig,
    dom: Option<MenuDom>,
    session: Option<AbortController>,
    opened: usize,
    dismissal_calls: usize,
}

fn text_of(element: &Element) -> String {
    element
        .dyn_ref::<HtmlElement>()
        .map_or_else(|| element.text_content().unwrap_or_default(), HtmlElement::inner_text)
}

fn resolve_label(target: &Element, config: &MenuConfig) -> Result<Option<String>, JsValue> {
    for (container, label) in [
        (&config.sidebar_item_selector, &config.sidebar_label_selector),
        (&config.palette_module_selector, &config.palette_label_selector),
    ] {
        if let Some(found) = target.closest(container)? {
            return Ok(found.query_selector(label)?.map(|span| text_of(&span)));
        }
    }
    Ok(None)
}

fn close_menu(state: &Rc<RefCell<WebMenu>>) {
    let mut state = state.borrow_mut();
    let Some(session) = state.session.take() else {
        return;
    };
    session.abort();
    if let Some(dom) = &state.dom {
        report("menu close", dom.root.style().set_property("display", "none"));
    }
    tracing::debug!("menu closed");
}

fn ensure_menu_dom(
    state: &Rc<RefCell<WebMenu>>,
    document: &Document,
) -> Result<MenuDom, JsValue> {
    if let Some(dom) = &state.borrow().dom {
        return Ok(dom.clone());
    }

    let root: HtmlElement = document.create_element("ul")?.dyn_into()?;
    root.set_class_name("red-ui-menu-dropdown red-ui-menu-dropdown-noicons");
    let style = root.style();
    style.set_property("position", "absolute")?;
    style.set_property("padding", "0")?;
    style.set_property("display", "none")?;

    let entry = |label: &str| -> Result<(Element, Element), JsValue> {
        let item = document.create_element("li")?;
        let link = document.create_element("a")?;
        link.set_attribute("target", "_blank")?;
        link.set_attribute("tabindex", "-1")?;
        link.set_attribute("href", "#")?;
        link.set_attribute("style", "text-decoration:none")?;
        let text = document.create_element("span")?;
        text.set_class_name("red-ui-menu-label");
        text.set_text_content(Some(label));
        link.append_child(&text)?;
        item.append_child(&link)?;
        root.append_child(&item)?;
        Ok((item, link))
    };
    let (library_item, library_link) = entry(LIBRARY_LABEL)?;
    let (_, package_link) = entry(PACKAGE_LABEL)?;

    let item = library_item.clone();
    add_listener(&library_link, "click", &active_options(), move |event| {
        if item.class_list().contains(DISABLED_CLASS) {
            event.prevent_default();
            event.stop_propagation();
        }
    })?;

    let handle = Rc::clone(state);
    let dismiss = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        handle.borrow_mut().dismissal_calls += 1;
        if menu::dismisses(&snapshot(&event)) {
            close_menu(&handle);
        }
    })
    .into_js_value();

    if let Some(body) = document.body() {
        body.prepend_with_node_1(&root)?;
    }

    let dom = MenuDom {
        root,
        library_item,
        library_link,
        package_link,
        dismiss,
    };
    state.borrow_mut().dom = Some(dom.clone());
    Ok(dom)
}

fn open_menu(
    state: &Rc<RefCell<WebMenu>>,
    window: &Window,
    document: &Document,
    entity: &str,
    anchor: Point,
) -> Result<(), JsValue> {
    let dom = ensure_menu_dom(state, document)?;
    let links = MenuLinks::for_entity(entity, &state.borrow().config);

    dom.library_link.set_attribute("href", &links.library.href)?;
    dom.package_link.set_attribute("href", &links.package.href)?;
    if links.library.enabled {
        dom.library_item.class_list().remove_1(DISABLED_CLASS)?;
    } else {
        dom.library_item.class_list().add_1(DISABLED_CLASS)?;
    }

    // Shown first: hidden elements measure zero.
    let style = dom.root.style();
    style.set_property("display", "block")?;
    let size = Size::new(
        f64::from(dom.root.offset_width()),
        f64::from(dom.root.offset_height()),
    );
    let viewport = Size::new(
        window.inner_width()?.as_f64().unwrap_or(0.0),
        window.inner_height()?.as_f64().unwrap_or(0.0),
    );
    let position = menu::clamp_to_viewport(anchor, size, viewport);
    style.set_property("left", &px(position.x))?;
    style.set_property("top", &px(position.y))?;

    // Abort first: re-adding the same function while it is still registered
    // would be a no-op that the later abort then removes.
    if let Some(previous) = state.borrow_mut().session.take() {
        previous.abort();
    }
    let controller = AbortController::new()?;
    let options = active_options();
    options.set_signal(&controller.signal());
    for name in ["click", "mousedown"] {
        window.add_event_listener_with_callback_and_add_event_listener_options(
            name,
            dom.dismiss.unchecked_ref(),
            &options,
        )?;
    }
    {
        let mut state = state.borrow_mut();
        state.session = Some(controller);
        state.opened += 1;
    }
    tracing::debug!(entity, x = position.x, y = position.y, "menu opened");
    Ok(())
}

fn install_menu(
    window: &Window,
    document: &Document,
    config: &MenuConfig,
) -> Result<Rc<RefCell<WebMenu>>, JsValue> {
    let state = Rc::new(RefCell::new(WebMenu {
        config: config.clone(),
        dom: None,
        session: None,
        opened: 0,
        dismissal_calls: 0,
    }));
    let handle = Rc::clone(&state);
    let (menu_window, menu_document) = (window.clone(), document.clone());
    add_listener(window, "contextmenu", &active_options(), move |event| {
        let Some(target) = event_element(&event) else {
            return;
        };
        let config = handle.borrow().config.clone();
        let entity = match resolve_label(&target, &config) {
            Ok(label) => label.and_then(|label| menu::accept_entity_name(&label, &config)),
            Err(err) => {
                console_error(&format!("flowpatch menu lookup failed: {err:?}"));
                None
            }
        };
        let Some(entity) = entity else {
            return;
        };
        event.prevent_default();
        let anchor = snapshot(&event).client;
        report(
            "menu",
            open_menu(&handle, &menu_window, &menu_document, &entity, anchor),
        );
    })?;
    Ok(state)
}

// ---------------------------------------------------------------------------
// Output badge
// ---------------------------------------------------------------------------

struct BadgeDom {
    root: Element,
    index: Element,
    number: Element,
    remove: JsValue,
}

struct WebBadge {
    config: BadgeConfig,
    dom: Option<Rc<BadgeDom>>,
    pending: Option<i32>,
}

fn create_badge_dom(document: &Document) -> Result<BadgeDom, JsValue> {
    let root = document.create_element_ns(Some(SVG_NS), "foreignObject")?;
    for (name, value) in [
        ("width", "120"),
        ("height", "22"),
        ("x", "15"),
        ("y", "-6.3"),
        ("style", "pointer-events: none;"),
    ] {
        root.set_attribute(name, value)?;
    }
    let frame = document.create_element_ns(Some(XHTML_NS), "div")?;
    frame.set_attribute(
        "style",
        "background-color:#0004;padding:0 5px 2px;width:fit-content;border-radius:3px;\
         color:var(--red-ui-primary-text-color);",
    )?;
    let tag = document.create_element_ns(Some(XHTML_NS), "b")?;
    tag.set_attribute("style", "font-family: Consolas;")?;
    let index = document.create_element_ns(Some(XHTML_NS), "span")?;
    let number = document.create_element_ns(Some(XHTML_NS), "span")?;

    tag.append_child(&document.create_text_node("["))?;
    tag.append_child(&index)?;
    tag.append_child(&document.create_text_node("]"))?;
    frame.append_child(&tag)?;
    frame.append_child(&document.create_text_node(" Output "))?;
    frame.append_child(&number)?;
    root.append_child(&frame)?;

    let detached = root.clone();
    let remove = Closure::<dyn FnMut()>::new(move || detached.remove()).into_js_value();
    Ok(BadgeDom {
        root,
        index,
        number,
        remove,
    })
}

fn show_badge(
    state: &Rc<RefCell<WebBadge>>,
    window: &Window,
    document: &Document,
    target: &Element,
) -> Result<(), JsValue> {
    let mut state = state.borrow_mut();
    if !target.matches(&state.config.port_selector)? {
        return Ok(());
    }
    let group_selector = state.config.output_group_selector.clone();
    let Some(group) = target
        .parent_element()
        .filter(|group| group.matches(&group_selector).unwrap_or(false))
    else {
        return Ok(());
    };

    let preceding = std::iter::successors(
        group.previous_element_sibling(),
        Element::previous_element_sibling,
    )
    .map(|sibling| sibling.matches(&group_selector).unwrap_or(false));
    let Some(index) = output_ordinal(preceding, group.next_element_sibling().is_some()) else {
        return Ok(());
    };

    let dom = match &state.dom {
        Some(dom) => Rc::clone(dom),
        None => {
            let dom = Rc::new(create_badge_dom(document)?);
            state.dom = Some(Rc::clone(&dom));
            dom
        }
    };

    if let Some(pending) = state.pending.take() {
        window.clear_timeout_with_handle(pending);
    }
    dom.index.set_text_content(Some(&index.to_string()));
    dom.number.set_text_content(Some(&(index + 1).to_string()));
    group.append_child(&dom.root)?;
    tracing::debug!(index, "output badge shown");
    let delay = i32::try_from(state.config.timeout_ms).unwrap_or(i32::MAX);
    let remove = dom.remove.unchecked_ref();
    let handle = window.set_timeout_with_callback_and_timeout_and_arguments_0(remove, delay)?;
    state.pending = Some(handle);
    Ok(())
}

fn install_badge(
    window: &Window,
    document: &Document,
    config: &BadgeConfig,
) -> Result<(), JsValue> {
    let state = Rc::new(RefCell::new(WebBadge {
        config: config.clone(),
        dom: None,
        pending: None,
    }));
    let (badge_window, badge_document) = (window.clone(), document.clone());
    add_listener(window, "click", &active_options(), move |event| {
        if let Some(target) = event_element(&event) {
            report(
                "badge",
                show_badge(&state, &badge_window, &badge_document, &target),
            );
        }
    })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Handles to the patches installed on a live page.
pub struct WebPatches {
    interceptor: Rc<RefCell<Interceptor>>,
    menu: Rc<RefCell<WebMenu>>,
}

impl WebPatches {
    /// Interception rules still waiting for a registration.
    #[must_use]
    pub fn rules_left(&self) -> usize {
        self.interceptor.borrow().registry.len()
    }

    #[must_use]
    pub fn menu_is_open(&self) -> bool {
        self.menu.borrow().session.is_some()
    }

    /// Menus opened since installation, reopenings included.
    #[must_use]
    pub fn menus_opened(&self) -> usize {
        self.menu.borrow().opened
    }

    /// Events delivered to the menu's dismissal listener so far.
    #[must_use]
    pub fn dismissal_calls(&self) -> usize {
        self.menu.borrow().dismissal_calls
    }
}

/// Install every patch on `document` regardless of its title.
///
/// Overrides the listener registration entry points globally; call it once
/// per page, before the editor's own scripts run.
pub fn install(
    window: &Window,
    document: &Document,
    config: &PatchConfig,
) -> Result<WebPatches, JsValue> {
    let interceptor = install_interceptor(config, document)?;
    install_input_rules(window, document, config)?;
    let menu = install_menu(window, document, &config.menu)?;
    install_badge(window, document, &config.badge)?;
    console_call("log", "flowpatch: usability patches active");
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "usability patches active");
    Ok(WebPatches { interceptor, menu })
}

/// Module start: patch the page if it is the Node-RED editor.
///
/// Must run before the editor's own scripts so listener registrations are
/// seen by the interception layer.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    install_panic_hook();
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let config = PatchConfig::default();
    if !flowpatch_core::should_activate(&document.title(), &config) {
        return Ok(());
    }
    install(&window, &document, &config).map(drop)
}
