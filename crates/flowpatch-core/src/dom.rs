#![forbid(unsafe_code)]

//! In-memory host document.
//!
//! A deterministic stand-in for the editor page, driven entirely by the
//! caller: the test (or embedding host) builds elements, registers host
//! listeners, dispatches events and advances time explicitly.
//!
//! Semantics kept from the browser:
//! - listeners fire in registration order per target; dispatch bubbles from
//!   the target through its ancestors to the window;
//! - `stopImmediatePropagation` skips the remaining listeners on the current
//!   target, `stopPropagation` stops after it;
//! - listeners whose signal is cancelled are skipped, even mid-dispatch;
//! - un-prevented events run a default action (page zoom, save dialog,
//!   autoscroll, native context menu, link navigation);
//! - `offsetWidth`/`offsetHeight` read zero while an element is not rendered.
//!
//! Registration on elements goes through [`Document::add_event_listener`],
//! which consults the [`InterceptionRegistry`] for the element's kind before
//! falling through to the native store ([`Document::add_listener_native`]).

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use core::time::Duration;

use crate::cancellation::CancellationToken;
use crate::element::{ElementKind, ElementProbe, NodeId};
use crate::event::{DomEvent, EventType, Modifiers, MouseButton, Point, Size};
use crate::intercept::{Interception, InterceptionRegistry, ListenerOptions, Registration};
use crate::selector::{Selector, SelectorTree};
use crate::timer::{DeterministicClock, TimerId, TimerQueue};

/// Listener representation in the in-memory host.
pub type Listener = Rc<dyn Fn(&mut Document, &mut DomEvent)>;

type TimerCallback = Box<dyn FnOnce(&mut Document)>;

/// Default viewport of a fresh document.
pub const DEFAULT_VIEWPORT: Size = Size::new(1280.0, 800.0);

const PAGE_ZOOM_STEP: f64 = 1.1;

/// Structural misuse of the document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomError {
    /// The id does not belong to this document.
    UnknownNode(NodeId),
    /// Inserting `child` under `parent` would create a cycle.
    HierarchyRequest { parent: NodeId, child: NodeId },
}

impl core::fmt::Display for DomError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownNode(node) => write!(f, "unknown node {node}"),
            Self::HierarchyRequest { parent, child } => {
                write!(f, "cannot insert {child} into its own subtree at {parent}")
            }
        }
    }
}

impl std::error::Error for DomError {}

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    Window,
    Node(NodeId),
}

/// Browser behavior that runs when an event's default is not prevented.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultAction {
    /// Ctrl+wheel page scaling.
    PageZoom { wheel_delta_y: f64 },
    /// Ctrl+S "save page as".
    SavePageDialog,
    /// Middle-button smooth-scroll mode.
    Autoscroll,
    /// The browser's own context menu.
    NativeContextMenu,
    /// Activating a link.
    FollowLink { href: String },
}

/// CSS `display` as far as the overlays use it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    #[default]
    Initial,
    Block,
    None,
}

/// Inline style subset.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Style {
    pub display: Display,
    /// `left`/`top` in CSS pixels when absolutely positioned.
    pub position: Option<Point>,
}

/// One element of the in-memory tree.
#[derive(Debug, Clone)]
pub struct Element {
    kind: ElementKind,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    dataset: BTreeMap<String, String>,
    text: String,
    style: Style,
    intrinsic_size: Size,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            dataset: BTreeMap::new(),
            text: String::new(),
            style: Style::default(),
            intrinsic_size: Size::ZERO,
            parent: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: &str) -> &mut Self {
        self.id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) -> &mut Self {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
        self
    }

    pub fn remove_class(&mut self, class: &str) -> &mut Self {
        self.classes.retain(|c| c != class);
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) -> &mut Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn remove_attribute(&mut self, name: &str) -> &mut Self {
        self.attributes.remove(name);
        self
    }

    /// `dataset[key]`.
    #[must_use]
    pub fn data(&self, key: &str) -> Option<&str> {
        self.dataset.get(key).map(String::as_str)
    }

    pub fn set_data(&mut self, key: &str, value: &str) -> &mut Self {
        self.dataset.insert(key.to_string(), value.to_string());
        self
    }

    /// Own text, excluding descendants.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub const fn style(&self) -> &Style {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut Style {
        &mut self.style
    }

    /// Size the element occupies once rendered.
    pub fn set_intrinsic_size(&mut self, size: Size) -> &mut Self {
        self.intrinsic_size = size;
        self
    }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

struct NodeProbe<'a> {
    element: &'a mut Element,
}

impl ElementProbe for NodeProbe<'_> {
    fn kind(&self) -> ElementKind {
        self.element.kind.clone()
    }

    fn has_id(&self, id: &str) -> bool {
        self.element.id() == Some(id)
    }

    fn has_class(&self, class: &str) -> bool {
        self.element.has_class(class)
    }

    fn has_marker(&self, marker: &str) -> bool {
        self.element.data(marker).is_some()
    }

    fn set_marker(&mut self, marker: &str) {
        self.element.set_data(marker, "1");
    }
}

struct ListenerEntry {
    event_type: EventType,
    listener: Listener,
    options: ListenerOptions,
}

impl ListenerEntry {
    fn is_live(&self) -> bool {
        !self
            .options
            .signal
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// The in-memory page.
pub struct Document {
    title: String,
    nodes: Vec<Element>,
    root: NodeId,
    body: NodeId,
    viewport: Size,
    active_element: Option<NodeId>,
    listeners: HashMap<ListenerTarget, Vec<ListenerEntry>>,
    interceptor: InterceptionRegistry<Listener>,
    clock: DeterministicClock,
    timers: TimerQueue<TimerCallback>,
    page_zoom: f64,
    default_actions: Vec<DefaultAction>,
}

impl core::fmt::Debug for Document {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Document")
            .field("title", &self.title)
            .field("nodes", &self.nodes.len())
            .field("interceptor", &self.interceptor)
            .field("page_zoom", &self.page_zoom)
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Empty page (`html > body`) with the given title.
    #[must_use]
    pub fn new(title: &str) -> Self {
        let mut nodes = vec![Element::new(ElementKind::Html), Element::new(ElementKind::Body)];
        let root = NodeId(0);
        let body = NodeId(1);
        nodes[0].children.push(body);
        nodes[1].parent = Some(root);
        Self {
            title: title.to_string(),
            nodes,
            root,
            body,
            viewport: DEFAULT_VIEWPORT,
            active_element: None,
            listeners: HashMap::new(),
            interceptor: InterceptionRegistry::new(),
            clock: DeterministicClock::new(),
            timers: TimerQueue::new(),
            page_zoom: 1.0,
            default_actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub const fn body(&self) -> NodeId {
        self.body
    }

    #[must_use]
    pub const fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Browser page scale factor (1.0 = 100%).
    #[must_use]
    pub const fn page_zoom(&self) -> f64 {
        self.page_zoom
    }

    /// Default actions performed so far, oldest first.
    #[must_use]
    pub fn default_actions(&self) -> &[DefaultAction] {
        &self.default_actions
    }

    /// Drain the default-action log.
    pub fn take_default_actions(&mut self) -> Vec<DefaultAction> {
        std::mem::take(&mut self.default_actions)
    }

    // ------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&mut self, kind: ElementKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Element::new(kind));
        id
    }

    /// Create an element and append it to `parent`.
    pub fn create_child(&mut self, parent: NodeId, kind: ElementKind) -> NodeId {
        let child = self.create_element(kind);
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
        child
    }

    /// Element by handle.
    ///
    /// # Panics
    ///
    /// Panics if `node` was not created by this document.
    #[must_use]
    pub fn element(&self, node: NodeId) -> &Element {
        &self.nodes[node.index()]
    }

    /// Mutable element by handle.
    ///
    /// # Panics
    ///
    /// Panics if `node` was not created by this document.
    pub fn element_mut(&mut self, node: NodeId) -> &mut Element {
        &mut self.nodes[node.index()]
    }

    fn check(&self, node: NodeId) -> Result<(), DomError> {
        if node.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::UnknownNode(node))
        }
    }

    /// `parent.appendChild(child)`: moves `child` if it is attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_child(parent, child, None)
    }

    /// `parent.prepend(child)`.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_child(parent, child, Some(0))
    }

    fn insert_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        at: Option<usize>,
    ) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        self.remove(child);
        let children = &mut self.nodes[parent.index()].children;
        match at {
            Some(index) => children.insert(index.min(children.len()), child),
            None => children.push(child),
        }
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// `node.remove()`: detach from the parent, if any.
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != node);
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes[current.index()].parent;
        }
        false
    }

    /// Whether `node` is attached to the document root.
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(self.root, node)
    }

    #[must_use]
    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    fn sibling(&self, node: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.nodes[node.index()].parent?;
        let siblings = &self.nodes[parent.index()].children;
        let pos = siblings.iter().position(|c| *c == node)?;
        let target = pos.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }

    #[must_use]
    pub fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, -1)
    }

    #[must_use]
    pub fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, 1)
    }

    /// Concatenated text of `node` and its descendants.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let element = &self.nodes[node.index()];
        out.push_str(&element.text);
        for child in &element.children {
            self.collect_text(*child, out);
        }
    }

    /// `document.getElementById`, connected elements only.
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|node| self.nodes[node.index()].id() == Some(id))
    }

    /// Descendants of `scope` in document order, excluding `scope`.
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[scope.index()]
            .children
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.index()].children.iter().rev().copied());
        }
        out
    }

    #[must_use]
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// `node.closest(selector)`.
    #[must_use]
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.matches(current, selector) {
                return Some(current);
            }
            cursor = self.parent_element(current);
        }
        None
    }

    /// `scope.querySelector(selector)`.
    #[must_use]
    pub fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|node| self.matches(*node, selector))
    }

    // ------------------------------------------------------------------
    // Focus and layout
    // ------------------------------------------------------------------

    pub fn focus(&mut self, node: NodeId) {
        self.active_element = Some(node);
    }

    pub fn blur(&mut self) {
        self.active_element = None;
    }

    /// `document.activeElement`; `body` when nothing is focused.
    #[must_use]
    pub fn active_element(&self) -> NodeId {
        self.active_element.unwrap_or(self.body)
    }

    /// Connected and not inside a `display: none` subtree.
    #[must_use]
    pub fn is_rendered(&self, node: NodeId) -> bool {
        if !self.is_connected(node) {
            return false;
        }
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.nodes[current.index()].style.display == Display::None {
                return false;
            }
            cursor = self.parent_element(current);
        }
        true
    }

    /// `offsetWidth` / `offsetHeight`.
    #[must_use]
    pub fn offset_size(&self, node: NodeId) -> Size {
        if self.is_rendered(node) {
            self.nodes[node.index()].intrinsic_size
        } else {
            Size::ZERO
        }
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Read access to the interception registry.
    #[must_use]
    pub fn interceptor(&self) -> &InterceptionRegistry<Listener> {
        &self.interceptor
    }

    /// Mutable access, for installing rules before the host runs.
    pub fn interceptor_mut(&mut self) -> &mut InterceptionRegistry<Listener> {
        &mut self.interceptor
    }

    /// `element.addEventListener(...)` as seen by page code.
    ///
    /// Registrations on element kinds with live interception rules are
    /// routed through the registry first.
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event_type: EventType,
        listener: Listener,
        options: ListenerOptions,
    ) {
        let registration = Registration::new(event_type, listener).with_options(options);
        let target = ListenerTarget::Node(node);
        if !self.interceptor.is_intercepting(self.nodes[node.index()].kind()) {
            self.add_listener_native(target, registration);
            return;
        }

        let mut probe = NodeProbe {
            element: &mut self.nodes[node.index()],
        };
        match self.interceptor.intercept(&mut probe, registration) {
            Interception::Forward(registration) => self.add_listener_native(target, registration),
            Interception::Guarded {
                registration,
                guard,
                ..
            } => {
                let inner = registration.listener;
                let wrapped: Listener = Rc::new(move |doc, event| {
                    if guard(event) {
                        inner(doc, event);
                    }
                });
                self.add_listener_native(
                    target,
                    Registration::new(registration.event_type, wrapped)
                        .with_options(registration.options),
                );
            }
            Interception::Preceded {
                corrective,
                registration,
                ..
            } => {
                self.add_listener_native(target, corrective);
                self.add_listener_native(target, registration);
            }
        }
    }

    /// `window.addEventListener(...)`.
    pub fn add_window_listener(
        &mut self,
        event_type: EventType,
        listener: Listener,
        options: ListenerOptions,
    ) {
        self.add_listener_native(
            ListenerTarget::Window,
            Registration::new(event_type, listener).with_options(options),
        );
    }

    /// The native entry point (`EventTarget.prototype.addEventListener`),
    /// bypassing interception.
    pub fn add_listener_native(
        &mut self,
        target: ListenerTarget,
        registration: Registration<Listener>,
    ) {
        let entries = self.listeners.entry(target).or_default();
        entries.retain(ListenerEntry::is_live);
        entries.push(ListenerEntry {
            event_type: registration.event_type,
            listener: registration.listener,
            options: registration.options,
        });
    }

    /// Number of live listeners for `event_type` on `target`.
    #[must_use]
    pub fn listener_count(&self, target: ListenerTarget, event_type: &EventType) -> usize {
        self.listeners.get(&target).map_or(0, |entries| {
            entries
                .iter()
                .filter(|entry| entry.is_live() && &entry.event_type == event_type)
                .count()
        })
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Dispatch `event` at `target`, bubbling to the window, then run the
    /// default action unless prevented. Returns the event's final state.
    pub fn dispatch_event(&mut self, target: NodeId, mut event: DomEvent) -> DomEvent {
        event.target = Some(target);

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(ListenerTarget::Node(node));
            cursor = self.parent_element(node);
        }
        if self.is_connected(target) {
            path.push(ListenerTarget::Window);
        }

        for current in path {
            self.invoke_listeners(current, &mut event);
            if event.propagation_stopped() {
                break;
            }
        }

        tracing::trace!(
            event = %event.event_type,
            target = %target,
            default_prevented = event.default_prevented(),
            propagation_stopped = event.propagation_stopped(),
            "dispatch done"
        );

        if !event.default_prevented()
            && let Some(action) = self.default_action(target, &event)
        {
            self.perform_default_action(action);
        }
        event
    }

    fn invoke_listeners(&mut self, current: ListenerTarget, event: &mut DomEvent) {
        let snapshot: Vec<(Listener, ListenerOptions)> = self
            .listeners
            .get(&current)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.event_type == event.event_type)
                    .map(|entry| (Rc::clone(&entry.listener), entry.options.clone()))
                    .collect()
            })
            .unwrap_or_default();

        for (listener, options) in snapshot {
            if options
                .signal
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                continue;
            }
            event.set_passive(options.passive);
            listener(self, event);
            event.set_passive(false);
            if event.immediate_propagation_stopped() {
                break;
            }
        }
    }

    fn default_action(&self, target: NodeId, event: &DomEvent) -> Option<DefaultAction> {
        match event.event_type {
            EventType::Wheel if event.modifiers.contains(Modifiers::CTRL) => {
                Some(DefaultAction::PageZoom {
                    wheel_delta_y: event.wheel_delta_y,
                })
            }
            EventType::KeyDown
                if event.modifiers == Modifiers::CTRL
                    && event.key.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("s")) =>
            {
                Some(DefaultAction::SavePageDialog)
            }
            EventType::MouseDown if event.is_button(MouseButton::Auxiliary) => {
                Some(DefaultAction::Autoscroll)
            }
            EventType::ContextMenu => Some(DefaultAction::NativeContextMenu),
            EventType::Click if event.is_button(MouseButton::Primary) => {
                let mut cursor = Some(target);
                while let Some(node) = cursor {
                    let element = &self.nodes[node.index()];
                    if element.kind == ElementKind::Anchor
                        && let Some(href) = element.attribute("href")
                    {
                        return Some(DefaultAction::FollowLink {
                            href: href.to_string(),
                        });
                    }
                    cursor = element.parent;
                }
                None
            }
            _ => None,
        }
    }

    fn perform_default_action(&mut self, action: DefaultAction) {
        if let DefaultAction::PageZoom { wheel_delta_y } = action {
            if wheel_delta_y > 0.0 {
                self.page_zoom *= PAGE_ZOOM_STEP;
            } else if wheel_delta_y < 0.0 {
                self.page_zoom /= PAGE_ZOOM_STEP;
            }
        }
        tracing::trace!(action = ?action, "default action");
        self.default_actions.push(action);
    }

    /// `element.click()`: a synthetic primary-button click.
    pub fn click(&mut self, node: NodeId) -> DomEvent {
        self.dispatch_event(node, DomEvent::click(MouseButton::Primary, Point::default()))
    }

    /// A physical press: `mousedown`, `mouseup` and, for the primary
    /// button, `click`. Returns the `mousedown` event's final state.
    pub fn press(&mut self, node: NodeId, button: MouseButton, at: Point) -> DomEvent {
        let down = self.dispatch_event(node, DomEvent::mouse_down(button, at));
        self.dispatch_event(node, DomEvent::mouse_up(button, at));
        if button == MouseButton::Primary {
            self.dispatch_event(node, DomEvent::click(button, at));
        }
        down
    }

    /// Key press delivered to the focused element.
    pub fn key_down(&mut self, key: &str, modifiers: Modifiers) -> DomEvent {
        let target = self.active_element();
        self.dispatch_event(target, DomEvent::key_down(key).with_modifiers(modifiers))
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// Monotonic time since the document was created.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.clock.now()
    }

    /// `setTimeout`.
    pub fn set_timeout(
        &mut self,
        delay: Duration,
        callback: impl FnOnce(&mut Document) + 'static,
    ) -> TimerId {
        let deadline = self.clock.now().saturating_add(delay);
        self.timers.schedule(deadline, Box::new(callback))
    }

    /// `clearTimeout`. Returns `false` if the timer already fired.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Advance the clock and run every timer that came due, in order.
    pub fn advance_time(&mut self, dt: Duration) {
        self.clock.advance(dt);
        let now = self.clock.now();
        while let Some((_, callback)) = self.timers.pop_due(now) {
            callback(self);
        }
    }
}

impl SelectorTree for Document {
    type Node = NodeId;

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    fn tag_is(&self, node: NodeId, tag: &str) -> bool {
        self.nodes[node.index()].kind.tag() == tag
    }

    fn id_is(&self, node: NodeId, id: &str) -> bool {
        self.nodes[node.index()].id() == Some(id)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes[node.index()].has_class(class)
    }

    fn element_index(&self, node: NodeId) -> usize {
        self.nodes[node.index()]
            .parent
            .and_then(|parent| {
                self.nodes[parent.index()]
                    .children
                    .iter()
                    .position(|c| *c == node)
            })
            .map_or(1, |pos| pos + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationSource;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> Listener {
        let log = Rc::clone(log);
        Rc::new(move |_doc, _event| log.borrow_mut().push(name))
    }

    #[test]
    fn append_moves_and_rejects_cycles() {
        let mut doc = Document::new("t");
        let a = doc.create_child(doc.body(), ElementKind::Div);
        let b = doc.create_child(doc.body(), ElementKind::Div);
        let c = doc.create_child(a, ElementKind::Span);

        doc.append_child(b, c).unwrap();
        assert_eq!(doc.element(a).children(), &[] as &[NodeId]);
        assert_eq!(doc.parent_element(c), Some(b));
        assert_eq!(
            doc.append_child(c, b),
            Err(DomError::HierarchyRequest { parent: c, child: b })
        );
        assert_eq!(
            doc.append_child(a, NodeId(99)),
            Err(DomError::UnknownNode(NodeId(99)))
        );
    }

    #[test]
    fn prepend_places_first() {
        let mut doc = Document::new("t");
        let first = doc.create_child(doc.body(), ElementKind::Div);
        let menu = doc.create_element(ElementKind::Ul);
        doc.prepend_child(doc.body(), menu).unwrap();
        assert_eq!(doc.element(doc.body()).children(), &[menu, first]);
        assert_eq!(doc.next_element_sibling(menu), Some(first));
        assert_eq!(doc.previous_element_sibling(menu), None);
    }

    #[test]
    fn listeners_bubble_to_window_in_registration_order() {
        let mut doc = Document::new("t");
        let outer = doc.create_child(doc.body(), ElementKind::Div);
        let inner = doc.create_child(outer, ElementKind::Span);
        let log = Rc::new(RefCell::new(Vec::new()));

        doc.add_window_listener(
            EventType::Click,
            recorder(&log, "window"),
            ListenerOptions::active(),
        );
        doc.add_event_listener(
            outer,
            EventType::Click,
            recorder(&log, "outer"),
            ListenerOptions::active(),
        );
        doc.add_event_listener(
            inner,
            EventType::Click,
            recorder(&log, "inner-1"),
            ListenerOptions::active(),
        );
        doc.add_event_listener(
            inner,
            EventType::Click,
            recorder(&log, "inner-2"),
            ListenerOptions::active(),
        );
        doc.add_event_listener(
            inner,
            EventType::MouseDown,
            recorder(&log, "other"),
            ListenerOptions::active(),
        );

        doc.click(inner);
        assert_eq!(*log.borrow(), vec!["inner-1", "inner-2", "outer", "window"]);
    }

    #[test]
    fn stop_immediate_skips_same_target_listeners() {
        let mut doc = Document::new("t");
        let node = doc.create_child(doc.body(), ElementKind::Div);
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.add_event_listener(
            node,
            EventType::Click,
            Rc::new(|_, event| event.stop_immediate_propagation()),
            ListenerOptions::active(),
        );
        doc.add_event_listener(
            node,
            EventType::Click,
            recorder(&log, "later"),
            ListenerOptions::active(),
        );
        doc.add_window_listener(
            EventType::Click,
            recorder(&log, "window"),
            ListenerOptions::active(),
        );

        let event = doc.click(node);
        assert!(event.immediate_propagation_stopped());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn cancelled_listeners_are_skipped_mid_dispatch() {
        let mut doc = Document::new("t");
        let node = doc.create_child(doc.body(), ElementKind::Div);
        let log = Rc::new(RefCell::new(Vec::new()));
        let source = Rc::new(CancellationSource::new());

        let canceller = Rc::clone(&source);
        doc.add_window_listener(
            EventType::Click,
            Rc::new(move |_, _| canceller.cancel()),
            ListenerOptions::with_signal(source.token()),
        );
        doc.add_window_listener(
            EventType::Click,
            recorder(&log, "sibling"),
            ListenerOptions::with_signal(source.token()),
        );
        assert_eq!(doc.listener_count(ListenerTarget::Window, &EventType::Click), 2);

        doc.click(node);
        assert!(log.borrow().is_empty());
        assert_eq!(doc.listener_count(ListenerTarget::Window, &EventType::Click), 0);
    }

    #[test]
    fn passive_listener_cannot_prevent_default() {
        let mut doc = Document::new("t");
        let node = doc.create_child(doc.body(), ElementKind::Div);
        doc.add_window_listener(
            EventType::Wheel,
            Rc::new(|_, event| event.prevent_default()),
            ListenerOptions::passive(),
        );
        doc.dispatch_event(node, DomEvent::wheel(120.0).with_modifiers(Modifiers::CTRL));
        assert!(doc.page_zoom() > 1.0);
        assert_eq!(
            doc.take_default_actions(),
            vec![DefaultAction::PageZoom { wheel_delta_y: 120.0 }]
        );
    }

    #[test]
    fn link_click_follows_href_unless_prevented() {
        let mut doc = Document::new("t");
        let anchor = doc.create_child(doc.body(), ElementKind::Anchor);
        doc.element_mut(anchor).set_attribute("href", "https://example.org/x");
        let label = doc.create_child(anchor, ElementKind::Span);

        doc.click(label);
        assert_eq!(
            doc.take_default_actions(),
            vec![DefaultAction::FollowLink {
                href: "https://example.org/x".to_string()
            }]
        );

        doc.add_event_listener(
            anchor,
            EventType::Click,
            Rc::new(|_, event| event.prevent_default()),
            ListenerOptions::active(),
        );
        doc.click(label);
        assert!(doc.default_actions().is_empty());
    }

    #[test]
    fn hidden_elements_measure_zero() {
        let mut doc = Document::new("t");
        let menu = doc.create_child(doc.body(), ElementKind::Ul);
        doc.element_mut(menu).set_intrinsic_size(Size::new(200.0, 60.0));
        assert_eq!(doc.offset_size(menu), Size::new(200.0, 60.0));
        doc.element_mut(menu).style_mut().display = Display::None;
        assert_eq!(doc.offset_size(menu), Size::ZERO);
        let detached = doc.create_element(ElementKind::Div);
        doc.element_mut(detached).set_intrinsic_size(Size::new(5.0, 5.0));
        assert_eq!(doc.offset_size(detached), Size::ZERO);
    }

    #[test]
    fn timers_run_when_time_advances() {
        let mut doc = Document::new("t");
        let fired = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&fired);
        let id = doc.set_timeout(Duration::from_secs(1), move |_| *counter.borrow_mut() += 1);
        doc.advance_time(Duration::from_millis(999));
        assert_eq!(*fired.borrow(), 0);
        doc.advance_time(Duration::from_millis(1));
        assert_eq!(*fired.borrow(), 1);
        assert!(!doc.clear_timeout(id));
    }

    #[test]
    fn selectors_resolve_against_the_tree() {
        let mut doc = Document::new("t");
        let list = doc.create_child(doc.body(), ElementKind::Ol);
        doc.create_child(list, ElementKind::Li);
        let second = doc.create_child(list, ElementKind::Li);
        let label = doc.create_child(second, ElementKind::Span);
        doc.element_mut(label).add_class("label").set_text("node-red-contrib-x");

        let item = Selector::parse("ol>li:nth-child(2)").unwrap();
        let span = Selector::parse("span.label").unwrap();
        assert_eq!(doc.closest(label, &item), Some(second));
        assert_eq!(doc.query_selector(second, &span), Some(label));
        assert_eq!(doc.text_content(list), "node-red-contrib-x");
    }
}
