//! Context menu lifecycle: opening, links, clamping and dismissal.

mod common;

use flowpatch_core::dom::Display;
use flowpatch_core::menu::{DISABLED_CLASS, MENU_SIZE};
use flowpatch_core::{
    DefaultAction, DomEvent, EventType, ListenerTarget, MouseButton, NodeId, Point, Size,
};
use pretty_assertions::assert_eq;

use common::Editor;

fn right_click(editor: &mut Editor, target: NodeId, at: Point) -> DomEvent {
    editor.doc.dispatch_event(target, DomEvent::context_menu(at))
}

fn window_listeners(editor: &Editor) -> (usize, usize) {
    (
        editor
            .doc
            .listener_count(ListenerTarget::Window, &EventType::Click),
        editor
            .doc
            .listener_count(ListenerTarget::Window, &EventType::MouseDown),
    )
}

#[test]
fn unrecognized_targets_keep_the_native_menu() {
    let mut editor = Editor::boot();
    for target in [editor.canvas, editor.sidebar_other, editor.palette_labels[1]] {
        let event = right_click(&mut editor, target, Point::new(40.0, 40.0));
        assert!(!event.default_prevented());
    }
    assert!(!editor.patches.menu.is_open());
    assert_eq!(editor.patches.menu.overlay(), None);
    assert_eq!(
        editor.doc.take_default_actions(),
        vec![DefaultAction::NativeContextMenu; 3]
    );
}

#[test]
fn sidebar_module_opens_menu_with_both_links() {
    let mut editor = Editor::boot();
    let label = editor.sidebar_labels[1];
    let event = right_click(&mut editor, label, Point::new(120.0, 300.0));
    assert!(event.default_prevented());
    assert!(editor.doc.default_actions().is_empty());

    let session = editor.patches.menu.session().unwrap();
    assert_eq!(session.entity, "node-red-dashboard");
    assert_eq!(session.position, Point::new(120.0, 300.0));
    assert_eq!(
        session.links.library.href,
        "https://flows.nodered.org/node/node-red-dashboard"
    );
    assert_eq!(
        session.links.package.href,
        "https://www.npmjs.com/package/node-red-dashboard"
    );

    let overlay = editor.patches.menu.overlay().unwrap();
    let root = editor.doc.element(overlay.root);
    assert_eq!(root.style().display, Display::Block);
    assert_eq!(root.style().position, Some(Point::new(120.0, 300.0)));
    assert_eq!(
        editor.doc.element(editor.doc.body()).children().first(),
        Some(&overlay.root)
    );
    assert_eq!(
        editor.doc.element(overlay.package_link).attribute("href"),
        Some("https://www.npmjs.com/package/node-red-dashboard")
    );
}

#[test]
fn palette_heading_opens_menu() {
    let mut editor = Editor::boot();
    let label = editor.palette_labels[0];
    right_click(&mut editor, label, Point::new(10.0, 10.0));
    assert_eq!(
        editor.patches.menu.session().map(|s| s.entity).as_deref(),
        Some("node-red-contrib-foo")
    );
}

#[test]
fn reserved_name_disables_library_link_and_swallows_its_click() {
    let mut editor = Editor::boot();
    let label = editor.sidebar_labels[0];
    right_click(&mut editor, label, Point::new(50.0, 50.0));

    let session = editor.patches.menu.session().unwrap();
    assert_eq!(session.entity, "node-red");
    assert!(!session.links.library.enabled);
    assert!(session.links.package.enabled);

    let overlay = editor.patches.menu.overlay().unwrap();
    let item = editor.doc.parent_element(overlay.library_link).unwrap();
    assert!(editor.doc.element(item).has_class(DISABLED_CLASS));

    editor
        .doc
        .press(overlay.library_link, MouseButton::Primary, Point::new(60.0, 60.0));
    assert!(editor.patches.menu.is_open());
    assert!(editor.doc.default_actions().is_empty());

    editor
        .doc
        .press(overlay.package_link, MouseButton::Primary, Point::new(60.0, 80.0));
    assert!(!editor.patches.menu.is_open());
    assert_eq!(
        editor.doc.take_default_actions(),
        vec![DefaultAction::FollowLink {
            href: "https://www.npmjs.com/package/node-red".to_string()
        }]
    );
}

#[test]
fn disabled_state_is_cleared_for_the_next_module() {
    let mut editor = Editor::boot();
    let (reserved, module) = (editor.sidebar_labels[0], editor.sidebar_labels[1]);
    right_click(&mut editor, reserved, Point::default());
    right_click(&mut editor, module, Point::default());

    let overlay = editor.patches.menu.overlay().unwrap();
    let item = editor.doc.parent_element(overlay.library_link).unwrap();
    assert!(!editor.doc.element(item).has_class(DISABLED_CLASS));

    editor
        .doc
        .press(overlay.library_link, MouseButton::Primary, Point::default());
    assert!(!editor.patches.menu.is_open());
    assert_eq!(
        editor.doc.take_default_actions(),
        vec![DefaultAction::FollowLink {
            href: "https://flows.nodered.org/node/node-red-dashboard".to_string()
        }]
    );
}

#[test]
fn menu_is_clamped_into_the_viewport() {
    let mut editor = Editor::boot();
    editor.doc.set_viewport(Size::new(1000.0, 700.0));
    let label = editor.palette_labels[0];
    right_click(&mut editor, label, Point::new(990.0, 690.0));
    let session = editor.patches.menu.session().unwrap();
    assert_eq!(session.anchor, Point::new(990.0, 690.0));
    assert_eq!(
        session.position,
        Point::new(1000.0 - MENU_SIZE.width, 700.0 - MENU_SIZE.height)
    );
}

#[test]
fn reopening_keeps_exactly_one_dismissal_pair() {
    let mut editor = Editor::boot();
    let (base_click, base_mousedown) = window_listeners(&editor);

    for label in [editor.sidebar_labels[1], editor.palette_labels[0], editor.sidebar_labels[0]] {
        right_click(&mut editor, label, Point::new(5.0, 5.0));
        assert_eq!(
            window_listeners(&editor),
            (base_click + 1, base_mousedown + 1)
        );
    }
    assert_eq!(editor.patches.menu.opened_count(), 3);
    assert_eq!(
        editor.patches.menu.session().map(|s| s.entity).as_deref(),
        Some("node-red")
    );

    let canvas = editor.canvas;
    editor.doc.click(canvas);
    assert!(!editor.patches.menu.is_open());
    assert_eq!(window_listeners(&editor), (base_click, base_mousedown));
}

#[test]
fn left_mousedown_waits_for_click_other_buttons_dismiss_at_once() {
    let mut editor = Editor::boot();
    let (label, canvas) = (editor.sidebar_labels[1], editor.canvas);

    right_click(&mut editor, label, Point::default());
    editor
        .doc
        .dispatch_event(canvas, DomEvent::mouse_down(MouseButton::Primary, Point::default()));
    assert!(editor.patches.menu.is_open());
    editor
        .doc
        .dispatch_event(canvas, DomEvent::click(MouseButton::Primary, Point::default()));
    assert!(!editor.patches.menu.is_open());

    for button in [MouseButton::Auxiliary, MouseButton::Secondary, MouseButton::Back] {
        right_click(&mut editor, label, Point::default());
        editor
            .doc
            .dispatch_event(canvas, DomEvent::mouse_down(button, Point::default()));
        assert!(!editor.patches.menu.is_open(), "{button:?} should dismiss");
    }

    let overlay = editor.patches.menu.overlay().unwrap();
    assert_eq!(editor.doc.element(overlay.root).style().display, Display::None);
    assert_eq!(editor.doc.offset_size(overlay.root), Size::ZERO);
}
