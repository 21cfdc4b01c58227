//! Selector extension: the `@extend` registry, the weaving algebra that
//! computes extended selectors, and the tree pass that applies it.
//!
//! The flatten pass records one [`Extension`] per (target member × extending
//! rule member) pair into an [`ExtendRegistry`], keyed by the target's
//! simple-selector set. After flattening, [`apply_extends`] rewrites every
//! rule's selector list through the registry and then verifies that every
//! required extension fired.

mod apply;
mod registry;
mod transform;
mod weave;

pub use apply::{extend_comma_sequence, extend_compound, extend_sequence};
pub use registry::{ExtendRegistry, ExtendStatus, Extension};
pub use transform::apply_extends;
pub use weave::{trim, weave};
