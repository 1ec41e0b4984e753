//! Window-level input corrections and the shade fix, end to end.

mod common;

use flowpatch_core::config::ZoomModifier;
use flowpatch_core::{DefaultAction, DomEvent, Modifiers, MouseButton, PatchConfig, Point};
use pretty_assertions::assert_eq;

use common::Editor;

#[test]
fn ctrl_wheel_drives_editor_zoom_not_page_zoom() {
    let mut editor = Editor::boot();
    let canvas = editor.canvas;

    for delta in [120.0, -120.0, 240.0] {
        let event = editor
            .doc
            .dispatch_event(canvas, DomEvent::wheel(delta).with_modifiers(Modifiers::CTRL));
        assert!(event.default_prevented());
    }

    assert_eq!(editor.take_log(), vec!["zoom-in", "zoom-out", "zoom-in"]);
    assert_eq!(editor.doc.page_zoom(), 1.0);
    assert!(editor.doc.default_actions().is_empty());
}

#[test]
fn zero_delta_suppresses_without_zooming() {
    let mut editor = Editor::boot();
    let canvas = editor.canvas;
    editor
        .doc
        .dispatch_event(canvas, DomEvent::wheel(0.0).with_modifiers(Modifiers::CTRL));
    assert!(editor.take_log().is_empty());
    assert_eq!(editor.doc.page_zoom(), 1.0);
}

#[test]
fn plain_wheel_is_left_alone() {
    let mut editor = Editor::boot();
    let canvas = editor.canvas;
    let event = editor.doc.dispatch_event(canvas, DomEvent::wheel(120.0));
    assert!(!event.default_prevented());
    assert!(editor.take_log().is_empty());
}

#[test]
fn configured_modifier_replaces_ctrl() {
    let mut config = PatchConfig::default();
    config.zoom.modifier = ZoomModifier::Alt;
    let mut editor = Editor::boot_with(&config);
    let canvas = editor.canvas;

    editor
        .doc
        .dispatch_event(canvas, DomEvent::wheel(-1.0).with_modifiers(Modifiers::ALT));
    editor
        .doc
        .dispatch_event(canvas, DomEvent::wheel(1.0).with_modifiers(Modifiers::CTRL));

    assert_eq!(editor.take_log(), vec!["zoom-out"]);
    assert_eq!(
        editor.doc.take_default_actions(),
        vec![DefaultAction::PageZoom { wheel_delta_y: 1.0 }]
    );
}

#[test]
fn ctrl_s_never_opens_the_save_dialog() {
    let mut editor = Editor::boot();
    let code_area = editor.code_area;
    editor.doc.focus(code_area);

    let event = editor.doc.key_down("s", Modifiers::CTRL);
    assert!(event.default_prevented());
    editor.doc.key_down("s", Modifiers::empty());
    assert!(
        !editor
            .doc
            .default_actions()
            .contains(&DefaultAction::SavePageDialog)
    );
}

#[test]
fn middle_press_never_starts_autoscroll() {
    let mut editor = Editor::boot();
    let canvas = editor.canvas;
    let down = editor
        .doc
        .press(canvas, MouseButton::Auxiliary, Point::new(300.0, 200.0));
    assert!(down.default_prevented());
    assert_eq!(editor.take_log(), vec!["canvas-drag"]);
    assert!(editor.doc.default_actions().is_empty());
}

#[test]
fn middle_press_on_wire_pans_the_canvas() {
    let mut editor = Editor::boot();
    let wire = editor.wires[1];
    let down = editor
        .doc
        .press(wire, MouseButton::Auxiliary, Point::new(10.0, 10.0));
    assert!(!down.propagation_stopped());
    assert_eq!(editor.take_log(), vec!["canvas-drag"]);

    let down = editor.doc.press(wire, MouseButton::Primary, Point::new(10.0, 10.0));
    assert!(down.propagation_stopped());
    assert_eq!(editor.take_log(), vec!["wire-select"]);
}

#[test]
fn shade_click_keeps_tray_open_while_code_area_is_focused() {
    let mut editor = Editor::boot();
    let (shade, code_area, name_input) = (editor.shade, editor.code_area, editor.name_input);

    editor.doc.focus(code_area);
    let click = editor.doc.click(shade);
    assert!(click.immediate_propagation_stopped());
    assert!(editor.take_log().is_empty());

    editor.doc.focus(name_input);
    editor.doc.click(shade);
    assert_eq!(editor.take_log(), vec!["close-tray"]);

    editor.doc.blur();
    editor.doc.click(shade);
    assert_eq!(editor.take_log(), vec!["close-tray"]);
}
