//! Parent-reference resolution over the whole tree.

use sass_selectors::CommaSequence;
use sass_tree::{ErrorKind, Node, NodeKind, SassError};

/// Rewrite every rule selector in the tree to its absolute form, resolving
/// `&` and the implicit parent prefix against the enclosing rule. The first
/// rule level under an `@at-root` that moves out of rules drops the implicit
/// prefix while keeping `&` meaningful.
pub fn resolve_tree_selectors(
    node: &mut Node,
    parent_selector: Option<&CommaSequence>,
    implicit_parent: bool,
    filename: Option<&str>,
) -> Result<(), SassError> {
    match &mut node.kind {
        NodeKind::Rule { selector } => {
            if selector.contains_interpolation() {
                return Err(SassError::new(
                    ErrorKind::InternalInvariantViolation,
                    format!("unresolved interpolation in selector \"{selector}\""),
                    node.line,
                )
                .with_filename(filename));
            }
            let resolved = selector
                .resolve_parent_refs(parent_selector, implicit_parent)
                .map_err(|error| {
                    SassError::from_selector(&error, node.line).with_filename(filename)
                })?;
            *selector = resolved;
            let own = selector.clone();
            for child in &mut node.children {
                resolve_tree_selectors(child, Some(&own), true, filename)?;
            }
        }
        NodeKind::AtRoot { query } => {
            let keeps_rule_context = !query.excludes_name("rule");
            for child in &mut node.children {
                resolve_tree_selectors(child, parent_selector, keeps_rule_context, filename)?;
            }
        }
        _ => {
            for child in &mut node.children {
                resolve_tree_selectors(child, parent_selector, implicit_parent, filename)?;
            }
        }
    }
    Ok(())
}
