//! Sass selector model — simple selectors, compound selectors, combinator
//! sequences, and comma-separated selector lists.
//!
//! The model is value-based: selectors are compared and hashed by semantic
//! content (formatting-only newline markers are ignored), and are effectively
//! immutable once constructed. On top of the data model this module provides
//! the selector algebra the extend machinery is built from:
//!
//! - `unify` — the AND-combination of two selectors (the selector matching
//!   exactly the elements both operands match), or "impossible"
//! - `superselector` — subsumption testing (does one selector match
//!   everything another matches?)
//! - parent-reference resolution (`&`)
//! - specificity, with the standard base-1000 weighting
//! - rendering back to selector text
//!
//! A small hand-rolled parser for selector text lives in `parser`; it exists
//! for hosts and tests that want to build selector lists from text rather
//! than assembling the model by hand.

mod comma;
mod compound;
mod parser;
mod sequence;
mod simple;

use thiserror::Error;

pub use comma::CommaSequence;
pub use compound::Compound;
pub use parser::parse_comma_sequence;
pub use sequence::{
    Combinator, Sequence, SequenceItem, parent_superselector_items, superselector_items,
};
pub use simple::{PseudoKind, SPECIFICITY_BASE, SimpleSelector};

/// Error for malformed selector text or invalid parent-reference use.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct SelectorError {
    pub message: String,
}

impl SelectorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
