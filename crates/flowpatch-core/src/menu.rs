#![forbid(unsafe_code)]

//! Contextual link menu for installed modules.
//!
//! A right-click on a module name (sidebar palette manager or palette
//! heading) opens a small menu linking to the module's flow-library page and
//! its package-registry page. Anything else keeps the browser's own menu.
//!
//! Each open-to-close lifecycle is a session. Opening installs two window
//! listeners (`click` and `mousedown`) sharing one [`CancellationSource`];
//! whichever dismisses first cancels the source, revoking both. Opening
//! while a session is live cancels the old source first, so exactly one
//! pair is ever live.
//!
//! Left-button `mousedown` does not dismiss: the menu must survive until the
//! click completes so the link it lands on still navigates. Every other
//! press dismisses immediately, and `click` (a `PointerEvent`) always does.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cancellation::CancellationSource;
use crate::config::{MenuConfig, NAME_PLACEHOLDER};
use crate::dom::{Display, Document, Listener};
use crate::element::{ElementKind, NodeId};
use crate::event::{DomEvent, EventInterface, EventType, MouseButton, Point, Size};
use crate::intercept::ListenerOptions;
use crate::selector::{Selector, SelectorError};

/// Rendered size of the menu in the in-memory host.
pub const MENU_SIZE: Size = Size::new(180.0, 52.0);

/// Class marking an entry that must not activate.
pub const DISABLED_CLASS: &str = "disabled";

pub const LIBRARY_LABEL: &str = "Node-RED library page";
pub const PACKAGE_LABEL: &str = "NPM package page";

/// One menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLink {
    pub label: &'static str,
    pub href: String,
    pub enabled: bool,
}

/// The two entries for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLinks {
    pub library: MenuLink,
    pub package: MenuLink,
}

impl MenuLinks {
    /// Links for `name`. Names without a library page keep the entry, disabled.
    #[must_use]
    pub fn for_entity(name: &str, config: &MenuConfig) -> Self {
        let library_enabled = !config.library_less_names.iter().any(|n| n == name);
        Self {
            library: MenuLink {
                label: LIBRARY_LABEL,
                href: config.library_url_template.replace(NAME_PLACEHOLDER, name),
                enabled: library_enabled,
            },
            package: MenuLink {
                label: PACKAGE_LABEL,
                href: config.package_url_template.replace(NAME_PLACEHOLDER, name),
                enabled: true,
            },
        }
    }
}

/// Accept a resolved label as a module name.
///
/// Empty labels and headings that are not modules yield `None`.
#[must_use]
pub fn accept_entity_name(label: &str, config: &MenuConfig) -> Option<String> {
    let name = label.trim();
    if name.is_empty() || config.ignored_names.iter().any(|n| n == name) {
        return None;
    }
    Some(name.to_string())
}

/// Top-left corner keeping a `menu`-sized box inside `viewport`.
///
/// The box is moved, never resized; it sticks to the top-left edge when it
/// is larger than the viewport.
#[must_use]
pub fn clamp_to_viewport(anchor: Point, menu: Size, viewport: Size) -> Point {
    Point::new(
        anchor.x.min(viewport.width - menu.width).max(0.0),
        anchor.y.min(viewport.height - menu.height).max(0.0),
    )
}

/// Whether an event seen by a dismissal listener closes the menu.
///
/// Primary-button `MouseEvent`s are left to the following `click`.
#[must_use]
pub fn dismisses(event: &DomEvent) -> bool {
    !(event.interface == EventInterface::MouseEvent && event.is_button(MouseButton::Primary))
}

/// Structural patterns that identify a module label.
#[derive(Debug, Clone)]
pub struct EntitySelectors {
    patterns: Vec<(Selector, Selector)>,
}

impl EntitySelectors {
    pub fn from_config(config: &MenuConfig) -> Result<Self, SelectorError> {
        Ok(Self {
            patterns: vec![
                (
                    Selector::parse(&config.sidebar_item_selector)?,
                    Selector::parse(&config.sidebar_label_selector)?,
                ),
                (
                    Selector::parse(&config.palette_module_selector)?,
                    Selector::parse(&config.palette_label_selector)?,
                ),
            ],
        })
    }

    /// Label text for a right-click on `target`.
    ///
    /// Patterns are tried in order; the first container found decides, even
    /// if it holds no label.
    #[must_use]
    pub fn resolve_label(&self, doc: &Document, target: NodeId) -> Option<String> {
        self.patterns.iter().find_map(|(container, label)| {
            doc.closest(target, container).map(|found| {
                doc.query_selector(found, label)
                    .map(|span| doc.text_content(span))
            })
        })?
    }
}

/// Elements of the injected menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuOverlay {
    pub root: NodeId,
    pub library_link: NodeId,
    pub package_link: NodeId,
}

/// Snapshot of the open session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub entity: String,
    pub anchor: Point,
    pub position: Point,
    pub links: MenuLinks,
}

struct Session {
    info: SessionInfo,
    dismissal: CancellationSource,
}

struct MenuState {
    config: MenuConfig,
    selectors: EntitySelectors,
    overlay: Option<MenuOverlay>,
    session: Option<Session>,
    opened: u64,
}

/// Menu controller bound to the in-memory host.
#[derive(Clone)]
pub struct MenuController {
    state: Rc<RefCell<MenuState>>,
}

impl core::fmt::Debug for MenuController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MenuController")
            .field("overlay", &state.overlay)
            .field("session", &state.session.as_ref().map(|s| &s.info))
            .finish_non_exhaustive()
    }
}

impl MenuController {
    /// Listen for right-clicks on `doc`.
    pub fn install(doc: &mut Document, config: &MenuConfig) -> Result<Self, SelectorError> {
        let controller = Self {
            state: Rc::new(RefCell::new(MenuState {
                selectors: EntitySelectors::from_config(config)?,
                config: config.clone(),
                overlay: None,
                session: None,
                opened: 0,
            })),
        };
        let handle = controller.clone();
        doc.add_window_listener(
            EventType::ContextMenu,
            Rc::new(move |doc, event| handle.on_context_menu(doc, event)),
            ListenerOptions::active(),
        );
        Ok(controller)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.borrow().session.is_some()
    }

    #[must_use]
    pub fn session(&self) -> Option<SessionInfo> {
        self.state.borrow().session.as_ref().map(|s| s.info.clone())
    }

    /// The injected elements, once the menu has been shown.
    #[must_use]
    pub fn overlay(&self) -> Option<MenuOverlay> {
        self.state.borrow().overlay
    }

    /// Sessions opened so far.
    #[must_use]
    pub fn opened_count(&self) -> u64 {
        self.state.borrow().opened
    }

    fn on_context_menu(&self, doc: &mut Document, event: &mut DomEvent) {
        let Some(target) = event.target else {
            return;
        };
        let entity = {
            let state = self.state.borrow();
            state
                .selectors
                .resolve_label(doc, target)
                .and_then(|label| accept_entity_name(&label, &state.config))
        };
        let Some(entity) = entity else {
            return;
        };
        event.prevent_default();
        self.open(doc, entity, event.client);
    }

    fn open(&self, doc: &mut Document, entity: String, anchor: Point) {
        let overlay = self.ensure_overlay(doc);
        let mut state = self.state.borrow_mut();
        let links = MenuLinks::for_entity(&entity, &state.config);

        doc.element_mut(overlay.library_link)
            .set_attribute("href", &links.library.href);
        doc.element_mut(overlay.package_link)
            .set_attribute("href", &links.package.href);
        if let Some(item) = doc.parent_element(overlay.library_link) {
            let item = doc.element_mut(item);
            if links.library.enabled {
                item.remove_class(DISABLED_CLASS);
            } else {
                item.add_class(DISABLED_CLASS);
            }
        }

        // Shown first: hidden elements measure zero.
        doc.element_mut(overlay.root).style_mut().display = Display::Block;
        let size = doc.offset_size(overlay.root);
        let position = clamp_to_viewport(anchor, size, doc.viewport());
        doc.element_mut(overlay.root).style_mut().position = Some(position);

        if let Some(previous) = state.session.take() {
            previous.dismissal.cancel();
            tracing::debug!(entity = %previous.info.entity, "menu session superseded");
        }

        let dismissal = CancellationSource::new();
        for event_type in [EventType::Click, EventType::MouseDown] {
            let handle = self.clone();
            let on_dismiss: Listener = Rc::new(move |doc, event| {
                if dismisses(event) {
                    handle.close(doc);
                }
            });
            doc.add_window_listener(
                event_type,
                on_dismiss,
                ListenerOptions::with_signal(dismissal.token()),
            );
        }

        tracing::debug!(entity = %entity, x = position.x, y = position.y, "menu opened");
        state.opened += 1;
        state.session = Some(Session {
            info: SessionInfo {
                entity,
                anchor,
                position,
                links,
            },
            dismissal,
        });
    }

    /// Hide the menu and revoke both dismissal listeners.
    pub fn close(&self, doc: &mut Document) {
        let mut state = self.state.borrow_mut();
        let Some(session) = state.session.take() else {
            return;
        };
        session.dismissal.cancel();
        if let Some(overlay) = state.overlay {
            doc.element_mut(overlay.root).style_mut().display = Display::None;
        }
        tracing::debug!(entity = %session.info.entity, "menu closed");
    }

    fn ensure_overlay(&self, doc: &mut Document) -> MenuOverlay {
        if let Some(overlay) = self.state.borrow().overlay {
            return overlay;
        }

        let root = doc.create_element(ElementKind::Ul);
        doc.element_mut(root)
            .add_class("red-ui-menu-dropdown")
            .add_class("red-ui-menu-dropdown-noicons")
            .set_intrinsic_size(MENU_SIZE)
            .style_mut()
            .display = Display::None;

        let entry = |doc: &mut Document, label: &str| {
            let item = doc.create_child(root, ElementKind::Li);
            let link = doc.create_child(item, ElementKind::Anchor);
            doc.element_mut(link)
                .set_attribute("target", "_blank")
                .set_attribute("href", "#");
            let text = doc.create_child(link, ElementKind::Span);
            doc.element_mut(text).add_class("red-ui-menu-label").set_text(label);
            (item, link)
        };
        let (library_item, library_link) = entry(doc, LIBRARY_LABEL);
        let (_, package_link) = entry(doc, PACKAGE_LABEL);

        doc.add_event_listener(
            library_link,
            EventType::Click,
            Rc::new(move |doc, event| {
                if doc.element(library_item).has_class(DISABLED_CLASS) {
                    event.prevent_default();
                    event.stop_propagation();
                }
            }),
            ListenerOptions::active(),
        );

        let body = doc.body();
        // Cannot fail: `root` is fresh and detached.
        let _ = doc.prepend_child(body, root);

        let overlay = MenuOverlay {
            root,
            library_link,
            package_link,
        };
        self.state.borrow_mut().overlay = Some(overlay);
        overlay
    }
}
