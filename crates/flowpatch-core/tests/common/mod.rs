//! A miniature editor page for integration tests.
//!
//! Mirrors the DOM shape of the Node-RED editor closely enough for every
//! patch to find its targets, plus stand-ins for the editor's own listeners
//! that record what they saw in `log`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use flowpatch_core::{
    Document, ElementKind, EventType, ListenerOptions, NodeId, PatchConfig, Patches, activate,
};

pub type Log = Rc<RefCell<Vec<String>>>;

pub struct Editor {
    pub doc: Document,
    pub patches: Patches,
    pub log: Log,
    pub zoom_in: NodeId,
    pub zoom_out: NodeId,
    pub canvas: NodeId,
    pub wires: Vec<NodeId>,
    pub shade: NodeId,
    pub code_area: NodeId,
    pub name_input: NodeId,
    /// Sidebar module labels: `node-red`, `node-red-dashboard`.
    pub sidebar_labels: Vec<NodeId>,
    /// Sidebar entry outside the module list.
    pub sidebar_other: NodeId,
    /// Palette heading labels: `node-red-contrib-foo`, `Subflows`.
    pub palette_labels: Vec<NodeId>,
    /// Output port rects of a three-output node.
    pub multi_ports: Vec<NodeId>,
    /// Output port rect of a single-output node.
    pub single_port: NodeId,
    /// Input port rect of the three-output node.
    pub input_port: NodeId,
}

pub fn recorder(log: &Log, entry: &'static str) -> flowpatch_core::Listener {
    let log = Rc::clone(log);
    Rc::new(move |_doc, _event| log.borrow_mut().push(entry.to_string()))
}

fn child(doc: &mut Document, parent: NodeId, tag: &str) -> NodeId {
    doc.create_child(parent, ElementKind::from_tag(tag))
}

impl Editor {
    /// Activate the patches, then let the "editor" build its UI.
    pub fn boot() -> Self {
        Self::boot_with(&PatchConfig::default())
    }

    pub fn boot_with(config: &PatchConfig) -> Self {
        let mut doc = Document::new("Node-RED");
        let patches = activate(&mut doc, config)
            .expect("valid config")
            .expect("title matches");
        let log: Log = Rc::default();
        let body = doc.body();

        // Header zoom buttons.
        let toolbar = child(&mut doc, body, "div");
        let zoom_in = child(&mut doc, toolbar, "button");
        doc.element_mut(zoom_in).set_id("red-ui-view-zoom-in");
        let zoom_out = child(&mut doc, toolbar, "button");
        doc.element_mut(zoom_out).set_id("red-ui-view-zoom-out");
        doc.add_event_listener(
            zoom_in,
            EventType::Click,
            recorder(&log, "zoom-in"),
            ListenerOptions::active(),
        );
        doc.add_event_listener(
            zoom_out,
            EventType::Click,
            recorder(&log, "zoom-out"),
            ListenerOptions::active(),
        );

        // Canvas with wires; the canvas pans on mousedown, wires select and
        // stop propagation.
        let canvas = child(&mut doc, body, "div");
        doc.element_mut(canvas).set_id("red-ui-workspace-chart");
        doc.add_event_listener(
            canvas,
            EventType::MouseDown,
            recorder(&log, "canvas-drag"),
            ListenerOptions::active(),
        );
        let links = child(&mut doc, canvas, "g");
        let mut wires = Vec::new();
        for _ in 0..2 {
            let wire = child(&mut doc, links, "path");
            doc.element_mut(wire).add_class("red-ui-flow-link-path");
            let log = Rc::clone(&log);
            doc.add_event_listener(
                wire,
                EventType::MouseDown,
                Rc::new(move |_doc, event| {
                    log.borrow_mut().push("wire-select".to_string());
                    event.stop_propagation();
                }),
                ListenerOptions::active(),
            );
            wires.push(wire);
        }

        // Nodes.
        let nodes = child(&mut doc, canvas, "g");
        let multi = child(&mut doc, nodes, "g");
        child(&mut doc, multi, "rect");
        let input = child(&mut doc, multi, "g");
        doc.element_mut(input).add_class("red-ui-flow-port-input");
        let input_port = child(&mut doc, input, "rect");
        doc.element_mut(input_port).add_class("red-ui-flow-port");
        let mut multi_ports = Vec::new();
        for _ in 0..3 {
            let group = child(&mut doc, multi, "g");
            doc.element_mut(group).add_class("red-ui-flow-port-output");
            let port = child(&mut doc, group, "rect");
            doc.element_mut(port).add_class("red-ui-flow-port");
            multi_ports.push(port);
        }
        let single = child(&mut doc, nodes, "g");
        child(&mut doc, single, "rect");
        let group = child(&mut doc, single, "g");
        doc.element_mut(group).add_class("red-ui-flow-port-output");
        let single_port = child(&mut doc, group, "rect");
        doc.element_mut(single_port).add_class("red-ui-flow-port");

        // Edit tray: shade closes it on click.
        let tray = child(&mut doc, body, "div");
        let code_area = child(&mut doc, tray, "textarea");
        let name_input = child(&mut doc, tray, "input");
        let shade = child(&mut doc, body, "div");
        doc.element_mut(shade).set_id("red-ui-editor-shade");
        doc.add_event_listener(
            shade,
            EventType::Click,
            recorder(&log, "close-tray"),
            ListenerOptions::active(),
        );

        // Sidebar palette manager: second panel, second section, module list.
        let sidebar = child(&mut doc, body, "div");
        doc.element_mut(sidebar).set_id("red-ui-sidebar-content");
        let info = child(&mut doc, sidebar, "div");
        let sidebar_other_list = child(&mut doc, info, "ol");
        let sidebar_other = child(&mut doc, sidebar_other_list, "li");
        doc.element_mut(sidebar_other).set_text("Flow 1");
        let panel = child(&mut doc, sidebar, "div");
        let sections = child(&mut doc, panel, "ol");
        child(&mut doc, sections, "li");
        let modules = child(&mut doc, sections, "li");
        let module_list = child(&mut doc, modules, "ol");
        let mut sidebar_labels = Vec::new();
        for name in ["node-red", "node-red-dashboard"] {
            let item = child(&mut doc, module_list, "li");
            let row = child(&mut doc, item, "div");
            let label = child(&mut doc, row, "span");
            doc.element_mut(label)
                .add_class("red-ui-treeList-label-text")
                .set_text(name);
            sidebar_labels.push(label);
        }

        // Palette headings.
        let palette = child(&mut doc, body, "div");
        let mut palette_labels = Vec::new();
        for name in ["node-red-contrib-foo", "Subflows"] {
            let heading = child(&mut doc, palette, "div");
            doc.element_mut(heading).add_class("red-ui-palette-module-name");
            let label = child(&mut doc, heading, "span");
            doc.element_mut(label).set_text(name);
            palette_labels.push(label);
        }

        Self {
            doc,
            patches,
            log,
            zoom_in,
            zoom_out,
            canvas,
            wires,
            shade,
            code_area,
            name_input,
            sidebar_labels,
            sidebar_other,
            palette_labels,
            multi_ports,
            single_port,
            input_port,
        }
    }

    /// Entries logged so far, drained.
    pub fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}
