#![forbid(unsafe_code)]

//! Input correction rules.
//!
//! Three fixes are plain window-level listeners with a narrow guard:
//!
//! - modifier+wheel is redirected to the editor's own zoom buttons instead
//!   of scaling the page;
//! - Ctrl+S never opens the browser's save dialog;
//! - a middle-button press never enters the browser's autoscroll mode.
//!
//! Two fixes need to run relative to listeners the editor attaches itself,
//! so they are expressed as [`InterceptionRule`]s:
//!
//! - wires: the editor's `mousedown` handler stops propagation, which keeps
//!   a middle-button drag from reaching the canvas pan handler. The handler
//!   is wrapped so it only runs for other buttons.
//! - shade: releasing a text selection over the tray shade fires a `click`
//!   that closes the tray. A click handler is placed ahead of the editor's
//!   and swallows the click while a code area has focus.
//!
//! The decision functions are shared with the browser adapter; the
//! `install` entry point wires them into the in-memory host.

use std::rc::Rc;

use crate::config::{PatchConfig, ShadeConfig, WireConfig, ZoomModifier};
use crate::dom::{Document, Listener};
use crate::element::ElementKind;
use crate::event::{DomEvent, EventType, Modifiers, MouseButton};
use crate::intercept::{EventGuard, InterceptionRule, ListenerOptions, RuleId};

/// Registry name of the wire rule.
pub const WIRE_RULE: &str = "wire-middle-click";
/// Registry name of the shade rule.
pub const SHADE_RULE: &str = "shade-text-selection";

/// Which editor zoom button a wheel gesture maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// What the wheel listener does with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelAction {
    /// Modifier not held; let the page scroll.
    PassThrough,
    /// Suppress page zoom without zooming the canvas (zero delta).
    Suppress,
    /// Suppress page zoom and press the matching editor button.
    Redirect(ZoomDirection),
}

/// Classify a wheel event.
#[must_use]
pub fn wheel_action(event: &DomEvent, modifier: ZoomModifier) -> WheelAction {
    if !event.modifiers.contains(modifier.flag()) {
        return WheelAction::PassThrough;
    }
    if event.wheel_delta_y > 0.0 {
        WheelAction::Redirect(ZoomDirection::In)
    } else if event.wheel_delta_y < 0.0 {
        WheelAction::Redirect(ZoomDirection::Out)
    } else {
        WheelAction::Suppress
    }
}

/// Ctrl+S, matched on the unshifted key.
#[must_use]
pub fn is_save_shortcut(event: &DomEvent) -> bool {
    event.modifiers.contains(Modifiers::CTRL) && event.key.as_deref() == Some("s")
}

/// A press that would start autoscroll.
#[must_use]
pub fn is_autoscroll_press(event: &DomEvent) -> bool {
    event.event_type == EventType::MouseDown && event.is_button(MouseButton::Auxiliary)
}

/// Whether a shade click must be kept from the editor's close handler.
#[must_use]
pub fn shade_click_blocked(focused: &ElementKind) -> bool {
    focused.is_multiline_text_input()
}

/// Guard used by the wire rule: everything except the middle button.
#[must_use]
pub fn not_middle_button() -> EventGuard {
    Rc::new(|event: &DomEvent| !event.is_button(MouseButton::Auxiliary))
}

/// Wrap the first `mousedown` handler of every wire path.
#[must_use]
pub fn wire_middle_click_rule<L>(config: &WireConfig) -> InterceptionRule<L> {
    InterceptionRule::guard(WIRE_RULE, ElementKind::SvgPath, not_middle_button())
        .on_event(EventType::MouseDown)
        .with_class(&config.path_class)
        .once_per_target(&config.marker)
        .persistent()
}

/// Place `corrective` ahead of the first listener the editor adds to the
/// shade, whatever its event.
#[must_use]
pub fn shade_click_rule<L>(config: &ShadeConfig, corrective: L) -> InterceptionRule<L> {
    InterceptionRule::precede(SHADE_RULE, ElementKind::Div, EventType::Click, corrective)
        .with_id(&config.element_id)
}

/// Handles to the installed input rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRules {
    pub wire_rule: RuleId,
    pub shade_rule: RuleId,
}

impl InputRules {
    /// Install every input correction on `doc`.
    ///
    /// Must run before the editor registers its own listeners, or the
    /// interception rules never see them.
    pub fn install(doc: &mut Document, config: &PatchConfig) -> Self {
        let zoom = config.zoom.clone();
        let on_wheel: Listener = Rc::new(move |doc, event| {
            let action = wheel_action(event, zoom.modifier);
            if action == WheelAction::PassThrough {
                return;
            }
            event.prevent_default();
            if let WheelAction::Redirect(direction) = action {
                let id = match direction {
                    ZoomDirection::In => &zoom.zoom_in_id,
                    ZoomDirection::Out => &zoom.zoom_out_id,
                };
                tracing::debug!(?direction, button = %id, "wheel zoom redirected");
                if let Some(button) = doc.get_element_by_id(id) {
                    doc.click(button);
                }
            }
        });
        doc.add_window_listener(EventType::Wheel, on_wheel, ListenerOptions::active());

        doc.add_window_listener(
            EventType::KeyDown,
            Rc::new(|_, event| {
                if is_save_shortcut(event) {
                    event.prevent_default();
                }
            }),
            ListenerOptions::active(),
        );

        doc.add_window_listener(
            EventType::MouseDown,
            Rc::new(|_, event| {
                if is_autoscroll_press(event) {
                    event.prevent_default();
                }
            }),
            ListenerOptions::active(),
        );

        let wire_rule = doc
            .interceptor_mut()
            .add_rule(wire_middle_click_rule(&config.wire));

        let corrective: Listener = Rc::new(|doc, event| {
            let focused = doc.active_element();
            if shade_click_blocked(doc.element(focused).kind()) {
                tracing::debug!(focused = %focused, "shade click kept from the tray");
                event.stop_immediate_propagation();
            }
        });
        let shade_rule = doc
            .interceptor_mut()
            .add_rule(shade_click_rule(&config.shade, corrective));

        Self {
            wire_rule,
            shade_rule,
        }
    }
}
