//! Combinator sequences: compound selectors joined by `>`, `+`, `~`, or
//! descendant adjacency.

use crate::SelectorError;
use crate::compound::Compound;
use crate::simple::SimpleSelector;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An explicit combinator between two compound selectors. The descendant
/// combinator is implicit: two adjacent compounds with no combinator item
/// between them are in a descendant relationship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    FollowingSibling,
}

impl fmt::Display for Combinator {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Child => ">",
            Self::NextSibling => "+",
            Self::FollowingSibling => "~",
        };
        write!(fmt, "{symbol}")
    }
}

/// One position in a sequence: a compound selector, an explicit combinator,
/// or a formatting-only newline marker. Newline markers are ignored by
/// equality, hashing, and the selector algebra.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SequenceItem {
    Compound(Compound),
    Combinator(Combinator),
    Newline,
}

impl SequenceItem {
    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Self::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Self::Compound(_))
    }

    /// True for combinators and newline markers, the "operator" positions of
    /// a sequence.
    pub fn is_op(&self) -> bool {
        !self.is_compound()
    }
}

impl fmt::Display for SequenceItem {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compound(compound) => write!(fmt, "{compound}"),
            Self::Combinator(combinator) => write!(fmt, "{combinator}"),
            Self::Newline => writeln!(fmt),
        }
    }
}

/// An ordered list of compound selectors and combinators, e.g. `.a > .b .c`.
#[derive(Clone, Debug)]
pub struct Sequence {
    members: Vec<SequenceItem>,
}

impl Sequence {
    pub fn new(members: Vec<SequenceItem>) -> Self {
        Self { members }
    }

    /// A sequence holding a single compound selector.
    pub fn from_compound(compound: Compound) -> Self {
        Self::new(vec![SequenceItem::Compound(compound)])
    }

    pub fn members(&self) -> &[SequenceItem] {
        &self.members
    }

    pub fn into_members(self) -> Vec<SequenceItem> {
        self.members
    }

    /// The compound selectors of this sequence, in order.
    pub fn compounds(&self) -> impl Iterator<Item = &Compound> {
        self.members.iter().filter_map(SequenceItem::as_compound)
    }

    pub fn last_compound(&self) -> Option<&Compound> {
        match self.members.last() {
            Some(SequenceItem::Compound(compound)) => Some(compound),
            _ => None,
        }
    }

    pub fn has_placeholder(&self) -> bool {
        self.compounds().any(Compound::contains_placeholder)
    }

    pub fn contains_parent_ref(&self) -> bool {
        self.compounds().any(Compound::contains_parent_ref)
    }

    pub fn contains_interpolation(&self) -> bool {
        self.compounds().any(Compound::contains_interpolation)
    }

    /// Sum of the specificities of the member compounds.
    pub fn specificity(&self) -> u64 {
        self.compounds().map(Compound::specificity).sum()
    }

    /// A copy of this sequence with `extra` unioned into the sources of every
    /// member compound.
    pub fn add_sources(&self, extra: &HashSet<Self>) -> Self {
        let members = self
            .members
            .iter()
            .map(|item| match item {
                SequenceItem::Compound(compound) => {
                    SequenceItem::Compound(compound.with_more_sources(extra))
                }
                other => other.clone(),
            })
            .collect();
        Self::new(members)
    }

    /// Whether this sequence matches every element `other` matches.
    pub fn is_superselector(&self, other: &Self) -> bool {
        superselector_items(&self.members, &other.members)
    }

    /// Whether this sequence matches everything the single compound `other`
    /// matches.
    pub fn is_superselector_of_compound(&self, other: &Compound) -> bool {
        superselector_items(
            &self.members,
            &[SequenceItem::Compound(other.clone())],
        )
    }

    /// Resolve parent references against an enclosing sequence. A sequence
    /// with no explicit `&` is prefixed with the enclosing sequence as a
    /// descendant context — unless `implicit_parent` is false (the first
    /// rule level under `@at-root` suppresses the implicit prefix while `&`
    /// keeps working); one with `&` has the enclosing sequence spliced in at
    /// each reference.
    pub fn resolve_parent_refs(
        &self,
        super_seq: &Self,
        implicit_parent: bool,
    ) -> Result<Self, SelectorError> {
        let mut members = self.members.clone();
        let leading_newline = matches!(members.first(), Some(SequenceItem::Newline));
        if leading_newline {
            members.remove(0);
        }
        let has_parent_ref = members
            .iter()
            .any(|item| matches!(item, SequenceItem::Compound(compound) if compound.contains_parent_ref()));
        if !has_parent_ref && !implicit_parent {
            return Ok(self.clone());
        }
        if !has_parent_ref {
            let mut out = super_seq.members.clone();
            if leading_newline {
                out.push(SequenceItem::Newline);
            }
            out.extend(members);
            return Ok(Self::new(out));
        }
        let mut out = Vec::new();
        if leading_newline {
            out.push(SequenceItem::Newline);
        }
        for item in members {
            match item {
                SequenceItem::Compound(compound) if compound.contains_parent_ref() => {
                    out.extend(resolve_compound_parent(&compound, super_seq)?);
                }
                other => out.push(other),
            }
        }
        Ok(Self::new(out))
    }
}

/// Splice an enclosing sequence into one `&`-bearing compound. `&` must be
/// the first member; `&.foo` appends `.foo` onto the enclosing sequence's
/// final compound.
fn resolve_compound_parent(
    compound: &Compound,
    super_seq: &Sequence,
) -> Result<Vec<SequenceItem>, SelectorError> {
    if !compound.starts_with_parent()
        || compound.members()[1..]
            .iter()
            .any(|member| matches!(member, SimpleSelector::Parent))
    {
        return Err(SelectorError::new(format!(
            "Invalid use of '&' in \"{compound}\": the parent reference must \
             begin a compound selector"
        )));
    }
    if compound.members().len() == 1 && !compound.subject() {
        return Ok(super_seq.members().to_vec());
    }
    let Some(last) = super_seq.last_compound() else {
        return Err(SelectorError::new(format!(
            "Invalid parent selector for \"{compound}\": \"{super_seq}\""
        )));
    };
    let mut merged_members = last.members().to_vec();
    merged_members.extend_from_slice(&compound.members()[1..]);
    let merged = Compound::new(merged_members, compound.subject() || last.subject());
    let mut out = super_seq.members()[..super_seq.members().len() - 1].to_vec();
    out.push(SequenceItem::Compound(merged));
    Ok(out)
}

/// Superselector test over raw item lists: does `seq1` match every element
/// `seq2` matches? Newline markers are ignored; sequences with leading or
/// trailing combinators are neither superselectors nor subselectors.
pub fn superselector_items(seq1: &[SequenceItem], seq2: &[SequenceItem]) -> bool {
    let seq1: Vec<SequenceItem> = seq1
        .iter()
        .filter(|item| !matches!(item, SequenceItem::Newline))
        .cloned()
        .collect();
    let seq2: Vec<SequenceItem> = seq2
        .iter()
        .filter(|item| !matches!(item, SequenceItem::Newline))
        .cloned()
        .collect();
    superselector_trimmed(&seq1, &seq2)
}

fn superselector_trimmed(seq1: &[SequenceItem], seq2: &[SequenceItem]) -> bool {
    let (Some(first1), Some(last1)) = (seq1.first(), seq1.last()) else {
        return false;
    };
    let (Some(first2), Some(last2)) = (seq2.first(), seq2.last()) else {
        return false;
    };
    if first1.is_op() || last1.is_op() || first2.is_op() || last2.is_op() {
        return false;
    }
    // More complex selectors are never superselectors of less complex ones.
    if seq1.len() > seq2.len() {
        return false;
    }
    let Some(compound1) = first1.as_compound() else {
        return false;
    };
    if seq1.len() == 1 {
        return last2
            .as_compound()
            .is_some_and(|compound2| compound1.is_superselector(compound2));
    }
    // Find the first element of seq2 (other than its last) that seq1's head
    // is a superselector of.
    let mut found = None;
    for (index, item) in seq2.iter().enumerate() {
        if index == seq2.len() - 1 {
            return false;
        }
        let Some(candidate) = item.as_compound() else {
            continue;
        };
        if compound1.is_superselector(candidate) {
            found = Some(index);
            break;
        }
    }
    let Some(start) = found else {
        return false;
    };
    match (&seq1[1], seq2.get(start + 1)) {
        (SequenceItem::Combinator(op1), Some(SequenceItem::Combinator(op2))) => {
            // `.foo ~ .bar` is a superselector of `.foo + .bar`.
            let compatible = match op1 {
                Combinator::FollowingSibling => *op2 != Combinator::Child,
                _ => op1 == op2,
            };
            compatible && superselector_trimmed(&seq1[2..], &seq2[start + 2..])
        }
        (SequenceItem::Combinator(_), _) => false,
        (_, Some(SequenceItem::Combinator(op2))) => {
            *op2 == Combinator::Child && superselector_trimmed(&seq1[1..], &seq2[start + 2..])
        }
        _ => superselector_trimmed(&seq1[1..], &seq2[start + 1..]),
    }
}

/// The parent-superselector variant: both item lists are extended with an
/// identical synthetic trailing compound, so that `B` counts as covering
/// `B A` in the sense the extend trimming needs.
pub fn parent_superselector_items(seq1: &[SequenceItem], seq2: &[SequenceItem]) -> bool {
    let marker = SequenceItem::Compound(Compound::new(
        vec![SimpleSelector::Placeholder("<temp>".to_owned())],
        false,
    ));
    let mut extended1 = seq1.to_vec();
    extended1.push(marker.clone());
    let mut extended2 = seq2.to_vec();
    extended2.push(marker);
    superselector_items(&extended1, &extended2)
}

fn semantic_members(members: &[SequenceItem]) -> impl Iterator<Item = &SequenceItem> {
    members
        .iter()
        .filter(|item| !matches!(item, SequenceItem::Newline))
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        semantic_members(&self.members).eq(semantic_members(&other.members))
    }
}

impl Eq for Sequence {}

impl Hash for Sequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for item in semantic_members(&self.members) {
            item.hash(state);
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.members.iter().map(|item| item.to_string()).collect();
        let joined = rendered.join(" ");
        // Newline markers swallow the spaces around them.
        let cleaned = joined.replace(" \n ", "\n").replace(" \n", "\n").replace("\n ", "\n");
        write!(fmt, "{cleaned}")
    }
}
