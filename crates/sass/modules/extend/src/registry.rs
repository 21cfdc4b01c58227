//! Bookkeeping for `@extend`: one record per registered extension, indexed
//! by the target's simple-selector set.

use sass_selectors::{Sequence, SimpleSelector};
use sass_subset_map::SubsetMap;
use std::cell::Cell;
use std::rc::Rc;

/// Whether an extension has matched anything yet. Every record starts as
/// `NotFound`; the extend algorithm upgrades it as rules are processed, and
/// the final validation sweep reads it once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendStatus {
    NotFound,
    FailedToUnify,
    Succeeded,
}

/// One registered `@extend`: the extending rule's selector member, the
/// target's simple selectors, the directive stack the `@extend` appeared
/// under, and its match status.
#[derive(Debug)]
pub struct Extension {
    extender: Sequence,
    target: Vec<SimpleSelector>,
    directives: Vec<String>,
    optional: bool,
    line: u32,
    status: Cell<ExtendStatus>,
}

impl Extension {
    pub fn new(
        extender: Sequence,
        target: Vec<SimpleSelector>,
        directives: Vec<String>,
        optional: bool,
        line: u32,
    ) -> Self {
        Self {
            extender,
            target,
            directives,
            optional,
            line,
            status: Cell::new(ExtendStatus::NotFound),
        }
    }

    pub fn extender(&self) -> &Sequence {
        &self.extender
    }

    pub fn target(&self) -> &[SimpleSelector] {
        &self.target
    }

    pub fn target_text(&self) -> String {
        self.target
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<String>>()
            .join("")
    }

    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    pub fn optional(&self) -> bool {
        self.optional
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn status(&self) -> ExtendStatus {
        self.status.get()
    }

    /// Downgrade to `FailedToUnify` unless a previous rule already unified.
    pub fn mark_failed_to_unify(&self) {
        if self.status.get() != ExtendStatus::Succeeded {
            self.status.set(ExtendStatus::FailedToUnify);
        }
    }

    pub fn mark_succeeded(&self) {
        self.status.set(ExtendStatus::Succeeded);
    }
}

/// The extend index: a subset map from target selector sets to extension
/// records, shared between the flatten pass (which fills it) and the extend
/// pass (which consumes it).
#[derive(Debug, Default)]
pub struct ExtendRegistry {
    map: SubsetMap<SimpleSelector, Rc<Extension>>,
}

impl ExtendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn register(&mut self, extension: Extension) {
        let key_set = extension.target.clone();
        self.map.put(key_set, Rc::new(extension));
    }

    /// Every extension whose target set is a subset of `members`, with the
    /// stored target set, in registration order.
    pub fn get(&self, members: &[SimpleSelector]) -> Vec<(Rc<Extension>, Vec<SimpleSelector>)> {
        self.map
            .get(members)
            .into_iter()
            .map(|(extension, key_set)| (Rc::clone(extension), key_set.to_vec()))
            .collect()
    }

    /// Every registered extension, in registration order.
    pub fn extensions(&self) -> impl Iterator<Item = &Rc<Extension>> {
        self.map.values()
    }
}
