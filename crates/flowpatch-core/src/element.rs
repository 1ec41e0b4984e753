#![forbid(unsafe_code)]

//! Element kinds and the probe interface the interception registry queries.

/// Handle to an element in the in-memory host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element families distinguished by their DOM interface.
///
/// Interception overrides are installed per kind, mirroring per-prototype
/// `addEventListener` overrides in the browser.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Html,
    Body,
    Div,
    Span,
    Ol,
    Ul,
    Li,
    Anchor,
    Bold,
    TextArea,
    Input,
    SvgGroup,
    SvgPath,
    SvgRect,
    SvgForeignObject,
    Other(Box<str>),
}

impl ElementKind {
    /// Kind from a lowercase tag name.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "html" => Self::Html,
            "body" => Self::Body,
            "div" => Self::Div,
            "span" => Self::Span,
            "ol" => Self::Ol,
            "ul" => Self::Ul,
            "li" => Self::Li,
            "a" => Self::Anchor,
            "b" => Self::Bold,
            "textarea" => Self::TextArea,
            "input" => Self::Input,
            "g" => Self::SvgGroup,
            "path" => Self::SvgPath,
            "rect" => Self::SvgRect,
            "foreignObject" => Self::SvgForeignObject,
            other => Self::Other(other.into()),
        }
    }

    /// Tag name used in selectors.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Html => "html",
            Self::Body => "body",
            Self::Div => "div",
            Self::Span => "span",
            Self::Ol => "ol",
            Self::Ul => "ul",
            Self::Li => "li",
            Self::Anchor => "a",
            Self::Bold => "b",
            Self::TextArea => "textarea",
            Self::Input => "input",
            Self::SvgGroup => "g",
            Self::SvgPath => "path",
            Self::SvgRect => "rect",
            Self::SvgForeignObject => "foreignObject",
            Self::Other(tag) => tag,
        }
    }

    /// Multi-line text input (the editor's code areas).
    #[must_use]
    pub const fn is_multiline_text_input(&self) -> bool {
        matches!(self, Self::TextArea)
    }
}

/// Read/mark access to the element a listener is being registered on.
///
/// Implemented by the reference host for its arena nodes and by the browser
/// adapter for live `Element`s.
pub trait ElementProbe {
    fn kind(&self) -> ElementKind;

    fn has_id(&self, id: &str) -> bool;

    fn has_class(&self, class: &str) -> bool;

    /// Whether a `data-*` marker is set on the element.
    fn has_marker(&self, marker: &str) -> bool;

    fn set_marker(&mut self, marker: &str);
}
