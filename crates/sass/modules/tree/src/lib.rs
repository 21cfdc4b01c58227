//! Static tree nodes shared by the flatten and extend passes.
//!
//! The tree this module describes is the one produced by evaluation: control
//! flow and script values are gone, selectors are concrete, but rules may
//! still nest and `@extend`/`@at-root` are unresolved. The flatten pass
//! consumes this shape and produces the same node kinds in CSS shape — no
//! nested rules, no `@extend` nodes, directives bubbled to the top level.

mod at_root;
mod error;
mod media;

use sass_selectors::{CommaSequence, Sequence};
use std::fmt;

pub use at_root::{AtRootKind, AtRootQuery};
pub use error::{ErrorKind, SassError};
pub use media::{MediaQuery, MediaQueryList};

/// Output style, as far as the tree transforms care: only the `Nested` style
/// tracks indentation depth while flattening.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputStyle {
    #[default]
    Nested,
    Expanded,
    Compact,
    Compressed,
}

/// The payload of one tree node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// The document root.
    Root,
    /// A style rule. Before flattening the selector may be written relative
    /// to its parent (and may contain `&`); afterwards it is absolute.
    Rule { selector: CommaSequence },
    /// A declaration. Properties may nest; flattening dash-joins the names.
    Property { name: String, value: String },
    /// A comment. Silent (`//`) comments never reach CSS output.
    Comment { text: String, silent: bool },
    /// A directive the tree has no deeper model of, e.g. `@font-face` or
    /// `@keyframes`, with its resolved value text.
    Directive {
        name: String,
        value: String,
        has_children: bool,
    },
    /// `@media` with a resolved query list.
    Media { query: MediaQueryList },
    /// `@supports` with a resolved condition.
    Supports { name: String, condition: String },
    /// A plain CSS `@import` that is passed through (and hoisted to the top
    /// of the document).
    CssImport { uri: String },
    /// `@extend`, removed by the extend pass.
    Extend {
        selector: CommaSequence,
        optional: bool,
    },
    /// `@at-root` with a resolved exclusion query.
    AtRoot { query: AtRootQuery },
    /// `@charset`.
    Charset { name: String },
}

/// One node of the static tree: a kind, children, and the bookkeeping the
/// renderer needs (1-based source line, indentation depth, and whether a
/// blank line should follow this node).
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    pub line: u32,
    pub tabs: usize,
    pub group_end: bool,
}

impl Node {
    pub fn new(kind: NodeKind, line: u32) -> Self {
        Self {
            kind,
            children: Vec::new(),
            line,
            tabs: 0,
            group_end: false,
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    /// A copy of this node without its children, keeping tabs and grouping.
    pub fn clone_childless(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            children: Vec::new(),
            line: self.line,
            tabs: self.tabs,
            group_end: self.group_end,
        }
    }

    pub fn is_rule(&self) -> bool {
        matches!(self.kind, NodeKind::Rule { .. })
    }

    pub fn is_media(&self) -> bool {
        matches!(self.kind, NodeKind::Media { .. })
    }

    /// Nodes that produce no CSS output: silent comments, valueless
    /// childless properties, and rules whose entire selector is made of
    /// placeholders.
    pub fn is_invisible(&self) -> bool {
        match &self.kind {
            NodeKind::Comment { silent, .. } => *silent,
            NodeKind::Property { value, .. } => {
                value.trim().is_empty() && self.children.is_empty()
            }
            NodeKind::Rule { selector } => {
                selector.members().iter().all(Sequence::has_placeholder)
            }
            _ => false,
        }
    }

    /// The identity of this node on the directive stack that scopes
    /// `@extend`: its name plus resolved value. `None` for nodes that are
    /// not directives.
    pub fn directive_identity(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Media { query } => Some(format!("@media {query}")),
            NodeKind::Supports { name, condition } => Some(format!("@{name} {condition}")),
            NodeKind::Directive { name, value, .. } => {
                if value.is_empty() {
                    Some(format!("@{name}"))
                } else {
                    Some(format!("@{name} {value}"))
                }
            }
            _ => None,
        }
    }

    /// The name `@at-root` queries know this node by, e.g. `rule` or
    /// `media`. `None` for nodes at-root never excludes.
    pub fn at_root_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Rule { .. } => Some("rule"),
            NodeKind::Media { .. } => Some("media"),
            NodeKind::Supports { .. } => Some("supports"),
            NodeKind::Directive { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Root => write!(fmt, "<root>"),
            NodeKind::Rule { selector } => write!(fmt, "{selector}"),
            NodeKind::Property { name, value } => write!(fmt, "{name}: {value}"),
            NodeKind::Comment { text, .. } => write!(fmt, "{text}"),
            NodeKind::Directive { name, value, .. } => {
                if value.is_empty() {
                    write!(fmt, "@{name}")
                } else {
                    write!(fmt, "@{name} {value}")
                }
            }
            NodeKind::Media { query } => write!(fmt, "@media {query}"),
            NodeKind::Supports { name, condition } => write!(fmt, "@{name} {condition}"),
            NodeKind::CssImport { uri } => write!(fmt, "@import {uri}"),
            NodeKind::Extend { selector, optional } => {
                if *optional {
                    write!(fmt, "@extend {selector} !optional")
                } else {
                    write!(fmt, "@extend {selector}")
                }
            }
            NodeKind::AtRoot { query } => write!(fmt, "@at-root {query}"),
            NodeKind::Charset { name } => write!(fmt, "@charset \"{name}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Node, NodeKind};
    use sass_selectors::parse_comma_sequence;

    #[test]
    fn silent_comments_and_empty_properties_are_invisible() {
        let silent = Node::new(
            NodeKind::Comment {
                text: "// note".to_owned(),
                silent: true,
            },
            1,
        );
        assert!(silent.is_invisible());

        let loud = Node::new(
            NodeKind::Comment {
                text: "/* note */".to_owned(),
                silent: false,
            },
            1,
        );
        assert!(!loud.is_invisible());

        let empty_property = Node::new(
            NodeKind::Property {
                name: "color".to_owned(),
                value: String::new(),
            },
            2,
        );
        assert!(empty_property.is_invisible());
    }

    #[test]
    fn placeholder_only_rules_are_invisible() {
        let hidden = Node::new(
            NodeKind::Rule {
                selector: parse_comma_sequence("%base").unwrap(),
            },
            1,
        );
        assert!(hidden.is_invisible());

        let partially_hidden = Node::new(
            NodeKind::Rule {
                selector: parse_comma_sequence("%base, .a").unwrap(),
            },
            1,
        );
        assert!(!partially_hidden.is_invisible());
    }

    #[test]
    fn directive_identity_covers_scoping_directives() {
        let supports = Node::new(
            NodeKind::Supports {
                name: "supports".to_owned(),
                condition: "(display: flex)".to_owned(),
            },
            1,
        );
        assert_eq!(
            supports.directive_identity(),
            Some("@supports (display: flex)".to_owned())
        );
        let rule = Node::new(
            NodeKind::Rule {
                selector: parse_comma_sequence(".a").unwrap(),
            },
            1,
        );
        assert_eq!(rule.directive_identity(), None);
    }
}
