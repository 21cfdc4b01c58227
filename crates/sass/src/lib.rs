//! Sass selector/extend core: flattens an evaluated rule tree into CSS
//! shape and applies `@extend`.
//!
//! This crate is the facade over the module crates: feed [`compile`] a tree
//! whose control flow and script values are already evaluated (rules may
//! still nest, `@extend` and `@at-root` are unresolved) and get back a flat
//! tree ready for rendering. See `sass_flatten` and `sass_extend` for the
//! two passes, and `sass_selectors` for the selector algebra they share.

use anyhow::Result;

pub use sass_extend::{ExtendRegistry, ExtendStatus, Extension, apply_extends};
pub use sass_flatten::{cssize, resolve_tree_selectors};
pub use sass_selectors::{
    CommaSequence, Combinator, Compound, PseudoKind, SelectorError, Sequence, SequenceItem,
    SimpleSelector, parse_comma_sequence,
};
pub use sass_tree::{
    AtRootKind, AtRootQuery, ErrorKind, MediaQuery, MediaQueryList, Node, NodeKind, OutputStyle,
    SassError,
};

/// Host-facing compilation options.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    pub style: OutputStyle,
    /// Used in error reports only; the core does no file I/O.
    pub filename: Option<String>,
}

/// Run both passes over an evaluated tree: flatten (collecting extend
/// records on the way), then apply and validate the extends.
pub fn compile(root: Node, options: &CompileOptions) -> std::result::Result<Node, SassError> {
    let filename = options.filename.as_deref();
    let (flattened, registry) = cssize(root, options.style, filename)?;
    apply_extends(flattened, &registry, filename)
}

/// A reusable entry point for hosts that don't care about the structured
/// error taxonomy.
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn run(&self, root: Node) -> Result<Node> {
        Ok(compile(root, &self.options)?)
    }
}
