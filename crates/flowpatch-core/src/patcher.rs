#![forbid(unsafe_code)]

//! One-call activation of every patch on a page.

use crate::badge::BadgeController;
use crate::config::{PatchConfig, PatchConfigError};
use crate::dom::Document;
use crate::menu::MenuController;
use crate::rules::InputRules;

/// Handles to everything [`activate`] installed.
#[derive(Debug, Clone)]
pub struct Patches {
    pub input: InputRules,
    pub menu: MenuController,
    pub badge: BadgeController,
}

/// Whether `title` is the page the patches are written for.
#[must_use]
pub fn should_activate(title: &str, config: &PatchConfig) -> bool {
    title == config.activation.page_title
}

/// Install every patch on `doc` if its title matches.
///
/// Returns `Ok(None)` on any other page. The interception rules are live
/// on return, so call this before the editor builds its UI.
pub fn activate(
    doc: &mut Document,
    config: &PatchConfig,
) -> Result<Option<Patches>, PatchConfigError> {
    if !should_activate(doc.title(), config) {
        tracing::debug!(title = doc.title(), "page title does not match; patches stay off");
        return Ok(None);
    }
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(PatchConfigError::Validation(errors));
    }

    let input = InputRules::install(doc, config);
    let menu = MenuController::install(doc, &config.menu)
        .map_err(|e| PatchConfigError::Validation(vec![format!("menu: {e}")]))?;
    let badge = BadgeController::install(doc, &config.badge)
        .map_err(|e| PatchConfigError::Validation(vec![format!("badge: {e}")]))?;

    tracing::info!(
        rules = doc.interceptor().len(),
        version = env!("CARGO_PKG_VERSION"),
        "usability patches active"
    );
    Ok(Some(Patches { input, menu, badge }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_pages_are_left_alone() {
        let mut doc = Document::new("Grafana");
        let patches = activate(&mut doc, &PatchConfig::default()).unwrap();
        assert!(patches.is_none());
        assert!(doc.interceptor().is_empty());
    }

    #[test]
    fn editor_page_gets_both_interception_rules() {
        let mut doc = Document::new("Node-RED");
        let patches = activate(&mut doc, &PatchConfig::default()).unwrap();
        assert!(patches.is_some());
        assert_eq!(
            doc.interceptor().rule_names(),
            vec![crate::rules::WIRE_RULE, crate::rules::SHADE_RULE]
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_installing() {
        let mut doc = Document::new("Node-RED");
        let mut config = PatchConfig::default();
        config.badge.timeout_ms = 0;
        let err = activate(&mut doc, &config).unwrap_err();
        assert!(matches!(err, PatchConfigError::Validation(_)));
        assert!(doc.interceptor().is_empty());
    }
}
