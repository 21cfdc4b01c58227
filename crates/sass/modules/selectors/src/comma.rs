//! Comma-separated selector lists, the selector type carried by a rule.

use crate::SelectorError;
use crate::sequence::{Sequence, SequenceItem};
use std::fmt;

/// A full CSS selector list, e.g. `.a, .b > .c`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommaSequence {
    members: Vec<Sequence>,
}

impl CommaSequence {
    pub fn new(members: Vec<Sequence>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Sequence] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Sequence> {
        self.members
    }

    pub fn contains_parent_ref(&self) -> bool {
        self.members.iter().any(Sequence::contains_parent_ref)
    }

    pub fn contains_placeholder(&self) -> bool {
        self.members.iter().any(Sequence::has_placeholder)
    }

    pub fn contains_interpolation(&self) -> bool {
        self.members.iter().any(Sequence::contains_interpolation)
    }

    /// Resolve parent references against an enclosing selector list. With no
    /// enclosing list, a parent reference is an error and the list must not
    /// begin or end with a bare combinator; with one, every (enclosing
    /// member × own member) combination is resolved and concatenated.
    pub fn resolve_parent_refs(
        &self,
        super_cseq: Option<&Self>,
        implicit_parent: bool,
    ) -> Result<Self, SelectorError> {
        let Some(parent) = super_cseq else {
            if self.contains_parent_ref() {
                return Err(SelectorError::new(
                    "Base-level rules cannot contain the parent-selector-referencing character '&'",
                ));
            }
            for seq in &self.members {
                let dangling = matches!(seq.members().first(), Some(SequenceItem::Combinator(_)))
                    || matches!(seq.members().last(), Some(SequenceItem::Combinator(_)));
                if dangling {
                    return Err(SelectorError::new(format!(
                        "Base-level rules cannot contain the combinator-led selector \"{seq}\""
                    )));
                }
            }
            return Ok(self.clone());
        };
        let mut out = Vec::with_capacity(parent.members.len() * self.members.len());
        for super_seq in &parent.members {
            for seq in &self.members {
                out.push(seq.resolve_parent_refs(super_seq, implicit_parent)?);
            }
        }
        Ok(Self::new(out))
    }
}

impl fmt::Display for CommaSequence {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.members.iter().map(|seq| seq.to_string()).collect();
        // A sequence beginning with a newline marker puts its line break
        // directly after the comma.
        write!(fmt, "{}", rendered.join(", ").replace(", \n", ",\n"))
    }
}
