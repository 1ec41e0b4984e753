#![forbid(unsafe_code)]

//! Patch configuration.
//!
//! Captures the host-specific identifiers, selectors and templates every
//! component consumes as a single [`PatchConfig`] that can be loaded from
//! TOML or JSON.
//!
//! # Loading
//!
//! ```toml
//! # flowpatch.toml
//! [activation]
//! page_title = "Node-RED"
//!
//! [badge]
//! timeout_ms = 3000
//! ```
//!
//! ```rust,ignore
//! let config = PatchConfig::from_toml_file("flowpatch.toml")?.validated()?;
//! ```
//!
//! # Defaults
//!
//! Every field defaults to the identifier the Node-RED editor currently
//! uses, so `PatchConfig::default()` targets a stock editor.

#[cfg(feature = "config-files")]
use std::path::Path;

#[cfg(feature = "config-files")]
use serde::{Deserialize, Serialize};

use crate::event::Modifiers;
use crate::selector::Selector;

/// Placeholder substituted with the entity name in link templates.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct PatchConfig {
    pub activation: ActivationConfig,
    pub zoom: ZoomConfig,
    pub wire: WireConfig,
    pub shade: ShadeConfig,
    pub menu: MenuConfig,
    pub badge: BadgeConfig,
}

impl PatchConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config-files")]
    pub fn from_toml_str(s: &str) -> Result<Self, PatchConfigError> {
        toml::from_str(s).map_err(PatchConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PatchConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PatchConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-files")]
    pub fn from_json_str(s: &str) -> Result<Self, PatchConfigError> {
        serde_json::from_str(s).map_err(PatchConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PatchConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PatchConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Check every field. An empty list means the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.activation.page_title.is_empty() {
            errors.push("activation.page_title must not be empty".to_string());
        }

        for (field, value) in [
            ("zoom.zoom_in_id", &self.zoom.zoom_in_id),
            ("zoom.zoom_out_id", &self.zoom.zoom_out_id),
            ("wire.path_class", &self.wire.path_class),
            ("wire.marker", &self.wire.marker),
            ("shade.element_id", &self.shade.element_id),
        ] {
            if value.is_empty() {
                errors.push(format!("{field} must not be empty"));
            }
        }

        for (field, value) in [
            ("menu.sidebar_item_selector", &self.menu.sidebar_item_selector),
            ("menu.sidebar_label_selector", &self.menu.sidebar_label_selector),
            ("menu.palette_module_selector", &self.menu.palette_module_selector),
            ("menu.palette_label_selector", &self.menu.palette_label_selector),
            ("badge.port_selector", &self.badge.port_selector),
            ("badge.output_group_selector", &self.badge.output_group_selector),
        ] {
            if let Err(e) = Selector::parse(value) {
                errors.push(format!("{field}: {e}"));
            }
        }

        for (field, value) in [
            ("menu.library_url_template", &self.menu.library_url_template),
            ("menu.package_url_template", &self.menu.package_url_template),
        ] {
            if !value.contains(NAME_PLACEHOLDER) {
                errors.push(format!("{field} must contain {NAME_PLACEHOLDER}"));
            }
        }

        if self.badge.timeout_ms == 0 {
            errors.push(format!(
                "badge.timeout_ms must be > 0, got {}",
                self.badge.timeout_ms
            ));
        }

        errors
    }

    /// `self` if [`validate`](Self::validate) reports nothing.
    pub fn validated(self) -> Result<Self, PatchConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(PatchConfigError::Validation(errors))
        }
    }
}

/// When the patches switch on.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct ActivationConfig {
    /// Exact `document.title` of the editor page.
    pub page_title: String,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            page_title: "Node-RED".to_string(),
        }
    }
}

/// Modifier that turns a wheel gesture into a canvas zoom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(rename_all = "lowercase"))]
pub enum ZoomModifier {
    #[default]
    Ctrl,
    Meta,
    Alt,
    Shift,
}

impl ZoomModifier {
    #[must_use]
    pub const fn flag(self) -> Modifiers {
        match self {
            Self::Ctrl => Modifiers::CTRL,
            Self::Meta => Modifiers::META,
            Self::Alt => Modifiers::ALT,
            Self::Shift => Modifiers::SHIFT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct ZoomConfig {
    /// Id of the editor's zoom-in button.
    pub zoom_in_id: String,
    /// Id of the editor's zoom-out button.
    pub zoom_out_id: String,
    pub modifier: ZoomModifier,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            zoom_in_id: "red-ui-view-zoom-in".to_string(),
            zoom_out_id: "red-ui-view-zoom-out".to_string(),
            modifier: ZoomModifier::Ctrl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct WireConfig {
    /// Class carried by wire `<path>` elements.
    pub path_class: String,
    /// `data-*` key marking an already patched wire.
    pub marker: String,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            path_class: "red-ui-flow-link-path".to_string(),
            marker: "fixed".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct ShadeConfig {
    /// Id of the overlay shade behind the edit tray.
    pub element_id: String,
}

impl Default for ShadeConfig {
    fn default() -> Self {
        Self {
            element_id: "red-ui-editor-shade".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct MenuConfig {
    /// Installed-module entries in the sidebar's palette manager.
    pub sidebar_item_selector: String,
    /// Label inside a sidebar entry, relative to the entry.
    pub sidebar_label_selector: String,
    /// Module heading inside the palette.
    pub palette_module_selector: String,
    /// Label inside a palette module heading.
    pub palette_label_selector: String,
    /// Flow library page for a module.
    pub library_url_template: String,
    /// Package registry page for a module.
    pub package_url_template: String,
    /// Names with a registry entry but no library page.
    pub library_less_names: Vec<String>,
    /// Palette headings that are not modules.
    pub ignored_names: Vec<String>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            sidebar_item_selector:
                "div#red-ui-sidebar-content>div:nth-child(2) ol>li:nth-child(2) ol>li".to_string(),
            sidebar_label_selector: "span.red-ui-treeList-label-text".to_string(),
            palette_module_selector: ".red-ui-palette-module-name".to_string(),
            palette_label_selector: "span".to_string(),
            library_url_template: "https://flows.nodered.org/node/{name}".to_string(),
            package_url_template: "https://www.npmjs.com/package/{name}".to_string(),
            library_less_names: vec!["node-red".to_string()],
            ignored_names: vec!["Subflows".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct BadgeConfig {
    /// Clickable output port.
    pub port_selector: String,
    /// Group wrapping one output port.
    pub output_group_selector: String,
    /// How long the badge stays up after the last click.
    pub timeout_ms: u64,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            port_selector: "rect.red-ui-flow-port".to_string(),
            output_group_selector: "g.red-ui-flow-port-output".to_string(),
            timeout_ms: 5_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a patch configuration.
#[derive(Debug)]
pub enum PatchConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-files")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-files")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for PatchConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for PatchConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
