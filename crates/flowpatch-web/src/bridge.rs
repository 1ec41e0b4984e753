#![forbid(unsafe_code)]

//! Conversions between browser values and the core model.
//!
//! Kept free of `web-sys` types so it builds and tests natively; the wasm
//! module reads the raw fields off live events and hands them over here.

use flowpatch_core::{
    DomEvent, ElementKind, EventInterface, EventType, Modifiers, MouseButton, Point,
};

/// Fields read off a browser event.
#[derive(Debug, Clone, Default)]
pub struct RawEvent<'a> {
    pub name: &'a str,
    pub interface: Option<EventInterface>,
    /// `MouseEvent.button`, when the event is a mouse event.
    pub button: Option<i16>,
    pub client_x: f64,
    pub client_y: f64,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
    /// Legacy `wheelDeltaY`, if the browser exposes it.
    pub wheel_delta_y: Option<f64>,
    /// Standard `deltaY`.
    pub delta_y: f64,
    pub key: Option<&'a str>,
}

impl RawEvent<'_> {
    /// Snapshot usable by the core decision functions.
    #[must_use]
    pub fn to_dom_event(&self) -> DomEvent {
        let mut event = DomEvent::new(EventType::from_dom_name(self.name));
        event.interface = self.interface.unwrap_or(EventInterface::Event);
        event.button = self.button.and_then(MouseButton::from_dom_code);
        event.client = Point::new(self.client_x, self.client_y);
        event.modifiers = self.modifiers();
        event.wheel_delta_y = legacy_wheel_delta(self.wheel_delta_y, self.delta_y);
        event.key = self.key.map(Into::into);
        event
    }

    fn modifiers(&self) -> Modifiers {
        let mut modifiers = Modifiers::empty();
        modifiers.set(Modifiers::CTRL, self.ctrl);
        modifiers.set(Modifiers::SHIFT, self.shift);
        modifiers.set(Modifiers::ALT, self.alt);
        modifiers.set(Modifiers::META, self.meta);
        modifiers
    }
}

/// `wheelDeltaY` sign convention (positive rolls away from the user).
///
/// Falls back to the negated standard `deltaY` where the legacy field is
/// missing.
#[must_use]
pub fn legacy_wheel_delta(wheel_delta_y: Option<f64>, delta_y: f64) -> f64 {
    match wheel_delta_y {
        Some(delta) => delta,
        None if delta_y == 0.0 => 0.0,
        None => -delta_y,
    }
}

/// Global constructor whose prototype carries the registration entry point
/// for `kind`.
#[must_use]
pub fn prototype_name(kind: &ElementKind) -> Option<&'static str> {
    match kind {
        ElementKind::Div => Some("HTMLDivElement"),
        ElementKind::SvgPath => Some("SVGPathElement"),
        _ => None,
    }
}

/// Attribute name backing a `dataset` marker.
#[must_use]
pub fn marker_attribute(marker: &str) -> String {
    format!("data-{marker}")
}

/// CSS pixel value for an inline style.
#[must_use]
pub fn px(value: f64) -> String {
    format!("{value}px")
}
