#![forbid(unsafe_code)]

//! Usability patches for the Node-RED flow editor.
//!
//! The core is host-independent: decisions and the listener interception
//! registry are plain Rust, and [`dom::Document`] is a deterministic
//! in-memory page the patches can be installed on and driven from tests.
//! The `flowpatch-web` crate binds the same core to a live browser page.
//!
//! # Example
//!
//! ```
//! use flowpatch_core::{activate, Document, PatchConfig};
//!
//! let mut doc = Document::new("Node-RED");
//! let patches = activate(&mut doc, &PatchConfig::default()).unwrap();
//! assert!(patches.is_some());
//! ```

pub mod badge;
pub mod cancellation;
pub mod config;
pub mod dom;
pub mod element;
pub mod event;
pub mod intercept;
pub mod menu;
pub mod patcher;
pub mod rules;
pub mod selector;
pub mod timer;

pub use badge::BadgeController;
pub use cancellation::{CancellationSource, CancellationToken};
pub use config::{PatchConfig, PatchConfigError};
pub use dom::{DefaultAction, Document, DomError, Listener, ListenerTarget};
pub use element::{ElementKind, ElementProbe, NodeId};
pub use event::{DomEvent, EventInterface, EventType, Modifiers, MouseButton, Point, Size};
pub use intercept::{
    Interception, InterceptionRegistry, InterceptionRule, ListenerOptions, Registration, RuleId,
};
pub use menu::MenuController;
pub use patcher::{Patches, activate, should_activate};
pub use rules::InputRules;
pub use selector::{Selector, SelectorError};
