//! Compound selectors: simple selectors applying to a single element.

use crate::sequence::Sequence;
use crate::simple::SimpleSelector;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An ordered list of simple selectors with no combinators, e.g. `.a.b` or
/// `div.warning:hover`.
///
/// `sources` tracks the extender sequences whose `@extend` produced this
/// compound; it feeds the specificity floor of the trim pass and is excluded
/// from equality and hashing. `subject` marks the compound as the subject of
/// its sequence (written with a trailing `!`).
#[derive(Clone, Debug)]
pub struct Compound {
    members: Vec<SimpleSelector>,
    subject: bool,
    sources: HashSet<Sequence>,
}

impl Compound {
    pub fn new(members: Vec<SimpleSelector>, subject: bool) -> Self {
        Self {
            members,
            subject,
            sources: HashSet::new(),
        }
    }

    pub fn members(&self) -> &[SimpleSelector] {
        &self.members
    }

    pub fn subject(&self) -> bool {
        self.subject
    }

    pub fn sources(&self) -> &HashSet<Sequence> {
        &self.sources
    }

    /// A copy of this compound with `extra` unioned into its sources.
    pub fn with_more_sources(&self, extra: &HashSet<Sequence>) -> Self {
        let mut out = self.clone();
        out.sources.extend(extra.iter().cloned());
        out
    }

    /// The element or universal selector, if any. At most one can be
    /// present, and always first.
    pub fn base(&self) -> Option<&SimpleSelector> {
        self.members.first().filter(|member| {
            matches!(
                member,
                SimpleSelector::Element { .. } | SimpleSelector::Universal { .. }
            )
        })
    }

    /// Pseudo-element members other than the base.
    pub fn pseudo_elements(&self) -> Vec<&SimpleSelector> {
        self.members
            .iter()
            .filter(|member| member.is_pseudo_element())
            .collect()
    }

    /// Everything that is neither the base nor a pseudo-element, as an
    /// unordered set for subset comparisons.
    pub fn rest(&self) -> HashSet<&SimpleSelector> {
        let base = self.base();
        self.members
            .iter()
            .filter(|member| Some(*member) != base && !member.is_pseudo_element())
            .collect()
    }

    pub fn specificity(&self) -> u64 {
        self.members
            .iter()
            .map(SimpleSelector::specificity)
            .sum()
    }

    pub fn starts_with_parent(&self) -> bool {
        matches!(self.members.first(), Some(SimpleSelector::Parent))
    }

    pub fn contains_parent_ref(&self) -> bool {
        self.members
            .iter()
            .any(|member| matches!(member, SimpleSelector::Parent))
    }

    pub fn contains_placeholder(&self) -> bool {
        self.members
            .iter()
            .any(|member| matches!(member, SimpleSelector::Placeholder(_)))
    }

    pub fn contains_interpolation(&self) -> bool {
        self.members
            .iter()
            .any(|member| matches!(member, SimpleSelector::Interpolation(_)))
    }

    /// Fold every member of this compound into `other_members`, producing the
    /// compound matching the intersection of both, or `None` if any member
    /// pair is impossible to combine. The result is a subject if either
    /// operand was.
    pub fn unify(&self, other_members: &[SimpleSelector], other_subject: bool) -> Option<Self> {
        let mut accum = other_members.to_vec();
        for member in &self.members {
            accum = member.unify(&accum)?;
        }
        Some(Self::new(accum, self.subject || other_subject))
    }

    /// Whether this compound matches every element `other` matches: same (or
    /// absent) base, identical pseudo-elements, and the rest a subset of the
    /// other's rest.
    pub fn is_superselector(&self, other: &Self) -> bool {
        if let Some(base) = self.base() {
            if other.base() != Some(base) {
                return false;
            }
        }
        let own_pseudos: HashSet<&SimpleSelector> = self.pseudo_elements().into_iter().collect();
        let other_pseudos: HashSet<&SimpleSelector> = other.pseudo_elements().into_iter().collect();
        own_pseudos == other_pseudos && self.rest().is_subset(&other.rest())
    }
}

impl PartialEq for Compound {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members && self.subject == other.subject
    }
}

impl Eq for Compound {}

impl Hash for Compound {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.members.hash(state);
        self.subject.hash(state);
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for member in &self.members {
            write!(fmt, "{member}")?;
        }
        if self.subject {
            write!(fmt, "!")?;
        }
        Ok(())
    }
}
