#![forbid(unsafe_code)]

//! DOM event model shared by the reference host and the browser adapter.
//!
//! Design notes:
//! - `EventType` covers the event names the patches care about; anything
//!   else is carried verbatim in [`EventType::Other`].
//! - [`MouseButton`] follows the DOM `MouseEvent.button` numbering.
//! - [`EventInterface`] records which DOM interface constructed the event.
//!   Modern browsers deliver `click` as a `PointerEvent`, which matters for
//!   the menu dismissal rule.
//! - Propagation flags mirror `preventDefault` / `stopPropagation` /
//!   `stopImmediatePropagation`. `preventDefault` is ignored while the event
//!   is being handled by a passive listener.

use bitflags::bitflags;

use crate::element::NodeId;

/// Event name as passed to `addEventListener`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    MouseDown,
    MouseUp,
    ContextMenu,
    Wheel,
    KeyDown,
    Other(Box<str>),
}

impl EventType {
    /// Parse a DOM event name.
    #[must_use]
    pub fn from_dom_name(name: &str) -> Self {
        match name {
            "click" => Self::Click,
            "mousedown" => Self::MouseDown,
            "mouseup" => Self::MouseUp,
            "contextmenu" => Self::ContextMenu,
            "wheel" => Self::Wheel,
            "keydown" => Self::KeyDown,
            other => Self::Other(other.into()),
        }
    }

    /// DOM event name.
    #[must_use]
    pub fn dom_name(&self) -> &str {
        match self {
            Self::Click => "click",
            Self::MouseDown => "mousedown",
            Self::MouseUp => "mouseup",
            Self::ContextMenu => "contextmenu",
            Self::Wheel => "wheel",
            Self::KeyDown => "keydown",
            Self::Other(name) => name,
        }
    }
}

impl core::fmt::Display for EventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.dom_name())
    }
}

/// Mouse button in DOM `MouseEvent.button` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Button 0, usually the left button.
    Primary,
    /// Button 1, the wheel (middle) button.
    Auxiliary,
    /// Button 2, usually the right button.
    Secondary,
    /// Button 3.
    Back,
    /// Button 4.
    Forward,
}

impl MouseButton {
    /// Map a DOM button code. Unknown codes yield `None`.
    #[must_use]
    pub const fn from_dom_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Primary),
            1 => Some(Self::Auxiliary),
            2 => Some(Self::Secondary),
            3 => Some(Self::Back),
            4 => Some(Self::Forward),
            _ => None,
        }
    }

    #[must_use]
    pub const fn dom_code(self) -> i16 {
        match self {
            Self::Primary => 0,
            Self::Auxiliary => 1,
            Self::Secondary => 2,
            Self::Back => 3,
            Self::Forward => 4,
        }
    }
}

bitflags! {
    /// Modifier keys held while the event fired.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const META  = 0b1000;
    }
}

/// DOM interface the event was constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventInterface {
    Event,
    MouseEvent,
    PointerEvent,
    WheelEvent,
    KeyboardEvent,
}

/// Client-area coordinates in CSS pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width/height in CSS pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// One event travelling through a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    pub event_type: EventType,
    pub interface: EventInterface,
    pub button: Option<MouseButton>,
    pub client: Point,
    pub modifiers: Modifiers,
    /// Legacy `wheelDeltaY`: positive when the wheel rolls away from the user.
    pub wheel_delta_y: f64,
    pub key: Option<Box<str>>,
    /// Dispatch target; set by the in-memory host, absent for browser snapshots.
    pub target: Option<NodeId>,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    in_passive_listener: bool,
}

impl DomEvent {
    /// A bare `Event` of the given type.
    #[must_use]
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            interface: EventInterface::Event,
            button: None,
            client: Point::default(),
            modifiers: Modifiers::empty(),
            wheel_delta_y: 0.0,
            key: None,
            target: None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            in_passive_listener: false,
        }
    }

    #[must_use]
    pub fn mouse_down(button: MouseButton, at: Point) -> Self {
        Self::mouse(EventType::MouseDown, EventInterface::MouseEvent, button, at)
    }

    #[must_use]
    pub fn mouse_up(button: MouseButton, at: Point) -> Self {
        Self::mouse(EventType::MouseUp, EventInterface::MouseEvent, button, at)
    }

    /// A `click`, delivered as a `PointerEvent` the way current browsers do.
    #[must_use]
    pub fn click(button: MouseButton, at: Point) -> Self {
        Self::mouse(EventType::Click, EventInterface::PointerEvent, button, at)
    }

    #[must_use]
    pub fn context_menu(at: Point) -> Self {
        Self::mouse(
            EventType::ContextMenu,
            EventInterface::PointerEvent,
            MouseButton::Secondary,
            at,
        )
    }

    #[must_use]
    pub fn wheel(wheel_delta_y: f64) -> Self {
        let mut event = Self::new(EventType::Wheel);
        event.interface = EventInterface::WheelEvent;
        event.button = Some(MouseButton::Primary);
        event.wheel_delta_y = wheel_delta_y;
        event
    }

    #[must_use]
    pub fn key_down(key: &str) -> Self {
        let mut event = Self::new(EventType::KeyDown);
        event.interface = EventInterface::KeyboardEvent;
        event.key = Some(key.into());
        event
    }

    fn mouse(
        event_type: EventType,
        interface: EventInterface,
        button: MouseButton,
        at: Point,
    ) -> Self {
        let mut event = Self::new(event_type);
        event.interface = interface;
        event.button = Some(button);
        event.client = at;
        event
    }

    /// Builder: set held modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// `preventDefault()`. No effect inside a passive listener.
    pub fn prevent_default(&mut self) {
        if !self.in_passive_listener {
            self.default_prevented = true;
        }
    }

    /// `stopPropagation()`.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// `stopImmediatePropagation()`: also skips remaining listeners on the
    /// current target.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    #[must_use]
    pub const fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    #[must_use]
    pub const fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    #[must_use]
    pub const fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    /// True when this is a mouse event for the given button.
    #[must_use]
    pub fn is_button(&self, button: MouseButton) -> bool {
        self.button == Some(button)
    }

    pub(crate) fn set_passive(&mut self, passive: bool) {
        self.in_passive_listener = passive;
    }
}
