#![forbid(unsafe_code)]

//! Output-port badge.
//!
//! Clicking an output port of a node with several outputs shows which
//! output it is (`[1] Output 2`). One badge element is created on first use
//! and moved between ports afterwards; a single removal timer is restarted
//! on every click.

use std::cell::RefCell;
use std::rc::Rc;

use core::time::Duration;

use crate::config::BadgeConfig;
use crate::dom::Document;
use crate::element::{ElementKind, NodeId};
use crate::event::{DomEvent, EventType, Size};
use crate::intercept::ListenerOptions;
use crate::selector::{Selector, SelectorError};
use crate::timer::TimerId;

/// 0-based output index of a port group.
///
/// `preceding` yields, nearest first, whether each previous sibling of the
/// group is an output group; counting stops at the first that is not.
/// `has_next` tells whether the group has a following sibling. A lone
/// output has no index worth showing and yields `None`.
#[must_use]
pub fn output_ordinal(preceding: impl IntoIterator<Item = bool>, has_next: bool) -> Option<usize> {
    let index = preceding.into_iter().take_while(|is_output| *is_output).count();
    if index == 0 && !has_next {
        None
    } else {
        Some(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BadgeNodes {
    root: NodeId,
    index: NodeId,
    number: NodeId,
}

#[derive(Debug)]
struct BadgeState {
    port: Selector,
    output_group: Selector,
    timeout: Duration,
    nodes: Option<BadgeNodes>,
    removal: Option<TimerId>,
    shown: Option<usize>,
}

/// Badge controller bound to the in-memory host.
#[derive(Debug, Clone)]
pub struct BadgeController {
    state: Rc<RefCell<BadgeState>>,
}

impl BadgeController {
    /// Listen for port clicks on `doc`.
    pub fn install(doc: &mut Document, config: &BadgeConfig) -> Result<Self, SelectorError> {
        let controller = Self {
            state: Rc::new(RefCell::new(BadgeState {
                port: Selector::parse(&config.port_selector)?,
                output_group: Selector::parse(&config.output_group_selector)?,
                timeout: Duration::from_millis(config.timeout_ms),
                nodes: None,
                removal: None,
                shown: None,
            })),
        };
        let handle = controller.clone();
        doc.add_window_listener(
            EventType::Click,
            Rc::new(move |doc, event| handle.on_click(doc, event)),
            ListenerOptions::active(),
        );
        Ok(controller)
    }

    /// Index currently on display.
    #[must_use]
    pub fn shown_index(&self) -> Option<usize> {
        self.state.borrow().shown
    }

    /// Badge element, once created.
    #[must_use]
    pub fn element(&self) -> Option<NodeId> {
        self.state.borrow().nodes.map(|nodes| nodes.root)
    }

    /// Rendered label, while the badge is attached.
    #[must_use]
    pub fn label(&self, doc: &Document) -> Option<String> {
        let nodes = self.state.borrow().nodes?;
        doc.is_connected(nodes.root).then(|| {
            format!(
                "[{}] Output {}",
                doc.text_content(nodes.index),
                doc.text_content(nodes.number)
            )
        })
    }

    fn on_click(&self, doc: &mut Document, event: &mut DomEvent) {
        let Some(target) = event.target else {
            return;
        };
        let mut state = self.state.borrow_mut();
        if !doc.matches(target, &state.port) {
            return;
        }
        let Some(group) = doc
            .parent_element(target)
            .filter(|group| doc.matches(*group, &state.output_group))
        else {
            return;
        };

        let preceding = std::iter::successors(doc.previous_element_sibling(group), |node| {
            doc.previous_element_sibling(*node)
        })
        .map(|node| doc.matches(node, &state.output_group));
        let Some(index) = output_ordinal(preceding, doc.next_element_sibling(group).is_some())
        else {
            return;
        };

        let nodes = match state.nodes {
            Some(nodes) => nodes,
            None => {
                let nodes = create_badge(doc);
                state.nodes = Some(nodes);
                nodes
            }
        };

        if let Some(pending) = state.removal.take() {
            doc.clear_timeout(pending);
        }
        doc.element_mut(nodes.index).set_text(index.to_string());
        doc.element_mut(nodes.number).set_text((index + 1).to_string());
        // Cannot fail: the badge never contains a port group.
        let _ = doc.append_child(group, nodes.root);
        state.shown = Some(index);

        let handle = self.clone();
        let timeout = state.timeout;
        state.removal = Some(doc.set_timeout(timeout, move |doc| {
            let mut state = handle.state.borrow_mut();
            doc.remove(nodes.root);
            state.removal = None;
            state.shown = None;
            tracing::debug!("output badge removed");
        }));
        tracing::debug!(index, group = %group, "output badge shown");
    }
}

fn create_badge(doc: &mut Document) -> BadgeNodes {
    let root = doc.create_element(ElementKind::SvgForeignObject);
    doc.element_mut(root)
        .add_class("flowpatch-output-badge")
        .set_attribute("x", "15")
        .set_attribute("y", "-6.3")
        .set_intrinsic_size(Size::new(120.0, 22.0));
    let frame = doc.create_child(root, ElementKind::Div);
    let tag = doc.create_child(frame, ElementKind::Bold);
    let index = doc.create_child(tag, ElementKind::Span);
    let number = doc.create_child(frame, ElementKind::Span);
    BadgeNodes {
        root,
        index,
        number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_output_has_no_ordinal() {
        assert_eq!(output_ordinal([false; 0], false), None);
    }

    #[test]
    fn first_of_several_is_zero() {
        assert_eq!(output_ordinal([false; 0], true), Some(0));
    }

    #[test]
    fn counting_stops_at_first_non_output() {
        assert_eq!(output_ordinal([true, true, false, true], false), Some(2));
        assert_eq!(output_ordinal([false, true], true), Some(0));
    }
}
