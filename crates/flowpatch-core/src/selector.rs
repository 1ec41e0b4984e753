#![forbid(unsafe_code)]

//! A small CSS selector engine covering the host editor's structural selectors.
//!
//! Supported grammar:
//! - compound selectors: `tag`, `*`, `#id`, `.class`, `:nth-child(n)`;
//! - combinators: descendant (whitespace) and child (`>`).
//!
//! Matching walks right-to-left and backtracks across ancestors, so
//! `div ol>li` matches whenever *some* ancestor chain satisfies it.

/// Selector parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Empty or whitespace-only selector.
    Empty,
    /// A character sequence the grammar does not accept.
    UnexpectedToken(String),
    /// `>` without a compound on both sides.
    DanglingCombinator,
    /// `:nth-child(...)` argument is not a positive integer.
    InvalidNth(String),
}

impl core::fmt::Display for SelectorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty selector"),
            Self::UnexpectedToken(token) => write!(f, "unexpected selector token: {token}"),
            Self::DanglingCombinator => write!(f, "combinator without operand"),
            Self::InvalidNth(raw) => write!(f, "invalid :nth-child argument: {raw}"),
        }
    }
}

impl std::error::Error for SelectorError {}

/// Tree access needed to evaluate a selector.
pub trait SelectorTree {
    type Node: Copy;

    fn parent_element(&self, node: Self::Node) -> Option<Self::Node>;

    fn tag_is(&self, node: Self::Node, tag: &str) -> bool;

    fn id_is(&self, node: Self::Node, id: &str) -> bool;

    fn has_class(&self, node: Self::Node, class: &str) -> bool;

    /// One-based position among the parent's element children.
    fn element_index(&self, node: Self::Node) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    nth_child: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorPart {
    compound: Compound,
    // Relation to the part on the left.
    combinator: Option<Combinator>,
}

/// Parsed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    parts: Vec<SelectorPart>,
}

enum Token {
    Compound(String),
    Child,
}

impl Selector {
    /// Parse a selector string.
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut parts: Vec<SelectorPart> = Vec::new();
        let mut pending: Option<Combinator> = None;
        for token in tokenize(trimmed) {
            match token {
                Token::Child => {
                    if pending.is_some() || parts.is_empty() {
                        return Err(SelectorError::DanglingCombinator);
                    }
                    pending = Some(Combinator::Child);
                }
                Token::Compound(raw) => {
                    let compound = parse_compound(&raw)?;
                    let combinator = if parts.is_empty() {
                        None
                    } else {
                        Some(pending.take().unwrap_or(Combinator::Descendant))
                    };
                    parts.push(SelectorPart {
                        compound,
                        combinator,
                    });
                }
            }
        }
        if pending.is_some() || parts.is_empty() {
            return Err(SelectorError::DanglingCombinator);
        }

        Ok(Self {
            source: trimmed.to_string(),
            parts,
        })
    }

    /// Whether `node` matches this selector.
    pub fn matches<T: SelectorTree>(&self, tree: &T, node: T::Node) -> bool {
        self.matches_from(tree, node, self.parts.len() - 1)
    }

    fn matches_from<T: SelectorTree>(&self, tree: &T, node: T::Node, index: usize) -> bool {
        let part = &self.parts[index];
        if !compound_matches(tree, node, &part.compound) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match part.combinator.unwrap_or(Combinator::Descendant) {
            Combinator::Child => tree
                .parent_element(node)
                .is_some_and(|parent| self.matches_from(tree, parent, index - 1)),
            Combinator::Descendant => {
                let mut cursor = tree.parent_element(node);
                while let Some(ancestor) = cursor {
                    if self.matches_from(tree, ancestor, index - 1) {
                        return true;
                    }
                    cursor = tree.parent_element(ancestor);
                }
                false
            }
        }
    }
}

impl core::fmt::Display for Selector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.source)
    }
}

fn compound_matches<T: SelectorTree>(tree: &T, node: T::Node, compound: &Compound) -> bool {
    if let Some(tag) = &compound.tag
        && !tree.tag_is(node, tag)
    {
        return false;
    }
    if let Some(id) = &compound.id
        && !tree.id_is(node, id)
    {
        return false;
    }
    if !compound
        .classes
        .iter()
        .all(|class| tree.has_class(node, class))
    {
        return false;
    }
    compound
        .nth_child
        .is_none_or(|nth| tree.element_index(node) == nth)
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let flush = |current: &mut String, tokens: &mut Vec<Token>| {
        if !current.is_empty() {
            tokens.push(Token::Compound(std::mem::take(current)));
        }
    };
    for ch in source.chars() {
        match ch {
            '>' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Child);
            }
            c if c.is_whitespace() => flush(&mut current, &mut tokens),
            c => current.push(c),
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_ident_char(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn parse_compound(raw: &str) -> Result<Compound, SelectorError> {
    const NTH_CHILD: &str = ":nth-child(";

    let chars: Vec<char> = raw.chars().collect();
    let mut compound = Compound::default();
    let mut pos = 0;

    if chars.first() == Some(&'*') {
        pos = 1;
    } else if chars.first().is_some_and(|c| c.is_ascii_alphabetic()) {
        let (tag, next) = read_ident(&chars, 0);
        compound.tag = Some(tag);
        pos = next;
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' | '.' => {
                let (ident, next) = read_ident(&chars, pos + 1);
                if ident.is_empty() {
                    return Err(SelectorError::UnexpectedToken(raw.to_string()));
                }
                if chars[pos] == '#' {
                    compound.id = Some(ident);
                } else {
                    compound.classes.push(ident);
                }
                pos = next;
            }
            ':' => {
                let rest: String = chars[pos..].iter().collect();
                if !rest.starts_with(NTH_CHILD) {
                    return Err(SelectorError::UnexpectedToken(rest));
                }
                let Some(close) = rest.find(')') else {
                    return Err(SelectorError::InvalidNth(rest));
                };
                let arg = &rest[NTH_CHILD.len()..close];
                let nth = arg
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| SelectorError::InvalidNth(arg.to_string()))?;
                compound.nth_child = Some(nth);
                pos += rest[..=close].chars().count();
            }
            _ => return Err(SelectorError::UnexpectedToken(raw.to_string())),
        }
    }

    Ok(compound)
}
