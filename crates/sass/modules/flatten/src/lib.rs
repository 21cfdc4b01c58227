//! The flatten (cssize) pass: turns an evaluated, still-nested tree into a
//! flat CSS-shaped tree.
//!
//! Three things happen in one traversal:
//!
//! - nested rules are hoisted out of their parents, with the parent's
//!   remaining declarations re-wrapped in a copy of the parent rule;
//! - `@media`/`@supports`/unknown directives and `@at-root` nodes *bubble*
//!   up through enclosing rules, duplicating the rule around their children
//!   as they go;
//! - every `@extend` is recorded into the extend registry, keyed by its
//!   target's simple-selector set, and produces no output node.
//!
//! Parent references are resolved in a pre-pass before flattening, so the
//! visitor itself only ever sees absolute selectors.

mod resolve;
mod visitor;

pub use resolve::resolve_tree_selectors;
pub use visitor::cssize;
