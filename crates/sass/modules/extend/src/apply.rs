//! Computing the extended forms of compounds, sequences, and selector lists.

use crate::registry::{ExtendRegistry, Extension};
use crate::weave::{paths, trim, weave};
use sass_selectors::{CommaSequence, Compound, Sequence, SequenceItem, SimpleSelector};
use sass_tree::{ErrorKind, SassError};
use std::collections::HashSet;
use std::rc::Rc;

/// All sequences produced by applying the registered extensions to one
/// compound selector. Fires every extension whose target set is a subset of
/// the compound's members, unifying the extender's final compound with the
/// remainder, and recurses on the results to honor chained extends (guarded
/// against cycles by `seen`).
pub fn extend_compound(
    compound: &Compound,
    registry: &ExtendRegistry,
    directive_stack: &[String],
    seen: &HashSet<Vec<SimpleSelector>>,
) -> Result<Vec<Sequence>, SassError> {
    type Group = (Sequence, Vec<(Rc<Extension>, Vec<SimpleSelector>)>);
    let mut groups: Vec<Group> = Vec::new();
    for (extension, key_set) in registry.get(compound.members()) {
        let position = groups
            .iter()
            .position(|(existing, _)| existing == extension.extender());
        match position {
            Some(index) => groups[index].1.push((extension, key_set)),
            None => {
                let extender = extension.extender().clone();
                groups.push((extender, vec![(extension, key_set)]));
            }
        }
    }

    let mut staged: Vec<(Vec<SimpleSelector>, Sequence)> = Vec::new();
    for (extender, group) in groups {
        let sels: Vec<SimpleSelector> = group
            .iter()
            .flat_map(|(_, key_set)| key_set.iter().cloned())
            .collect();
        let remainder = array_minus(compound.members(), &sels);
        for (extension, _) in &group {
            extension.mark_failed_to_unify();
        }
        let Some(last) = extender.last_compound() else {
            continue;
        };
        let Some(unified) = last.unify(&remainder, compound.subject()) else {
            continue;
        };
        for (extension, _) in &group {
            extension.mark_succeeded();
        }
        for (extension, _) in &group {
            check_directives_match(extension, directive_stack)?;
        }
        let mut new_members =
            extender.members()[..extender.members().len() - 1].to_vec();
        new_members.push(SequenceItem::Compound(unified));
        let mut provenance: HashSet<Sequence> = compound.sources().clone();
        provenance.insert(extender.clone());
        let new_seq = Sequence::new(new_members).add_sources(&provenance);
        staged.push((sels, new_seq));
    }

    let mut results: Vec<Sequence> = Vec::new();
    for (sels, seq) in staged {
        if seen.contains(&sels) {
            results.push(seq);
            continue;
        }
        let mut deeper_seen = seen.clone();
        deeper_seen.insert(sels);
        results.extend(extend_sequence(&seq, registry, directive_stack, &deeper_seen)?);
    }
    Ok(dedupe_sequences(results))
}

/// All sequences produced by extending each compound position of a sequence
/// and weaving the choices back together. The unmodified compound is kept as
/// a choice unless one of its extensions already covers it.
pub fn extend_sequence(
    sequence: &Sequence,
    registry: &ExtendRegistry,
    directive_stack: &[String],
    seen: &HashSet<Vec<SimpleSelector>>,
) -> Result<Vec<Sequence>, SassError> {
    let mut choices_per_item: Vec<Vec<Vec<SequenceItem>>> = Vec::new();
    for item in sequence.members() {
        let SequenceItem::Compound(compound) = item else {
            choices_per_item.push(vec![vec![item.clone()]]);
            continue;
        };
        let extended = extend_compound(compound, registry, directive_stack, seen)?;
        let keep_original = !extended
            .iter()
            .any(|candidate| candidate.is_superselector_of_compound(compound));
        let mut choices: Vec<Vec<SequenceItem>> = extended
            .into_iter()
            .map(Sequence::into_members)
            .collect();
        if keep_original {
            choices.insert(0, vec![item.clone()]);
        }
        choices_per_item.push(choices);
    }
    let mut woven_groups: Vec<Vec<Vec<SequenceItem>>> = Vec::new();
    for path in paths(&choices_per_item) {
        woven_groups.push(weave(&path));
    }
    Ok(trim(woven_groups).into_iter().map(Sequence::new).collect())
}

/// Extend every member of a selector list. The first law of extend: the
/// original member always leads its extensions unless it contains a
/// placeholder or is already among them.
pub fn extend_comma_sequence(
    selector: &CommaSequence,
    registry: &ExtendRegistry,
    directive_stack: &[String],
) -> Result<CommaSequence, SassError> {
    let mut out: Vec<Sequence> = Vec::new();
    for seq in selector.members() {
        let mut extended =
            extend_sequence(seq, registry, directive_stack, &HashSet::new())?;
        if !seq.has_placeholder() && !extended.contains(seq) {
            extended.insert(0, seq.clone());
        }
        out.extend(extended);
    }
    Ok(CommaSequence::new(out))
}

/// The directive stack captured at the `@extend` must be a subsequence of
/// the directive stack of the rule being extended; otherwise the extend is
/// reaching out of its own directive scope.
fn check_directives_match(
    extension: &Extension,
    parent_directives: &[String],
) -> Result<(), SassError> {
    if is_subsequence(extension.directives(), parent_directives) {
        return Ok(());
    }
    let innermost = extension
        .directives()
        .last()
        .map_or_else(|| "@media".to_owned(), |identity| {
            identity
                .split_whitespace()
                .next()
                .unwrap_or(identity)
                .to_owned()
        });
    Err(SassError::new(
        ErrorKind::ExtendAcrossDirectiveBoundary,
        format!(
            "You may not @extend an outer selector from within {innermost}.\n\
             You may only @extend selectors within the same directive."
        ),
        extension.line(),
    )
    .with_trace(innermost))
}

fn is_subsequence<T: PartialEq>(needle: &[T], haystack: &[T]) -> bool {
    let mut candidates = haystack.iter();
    needle
        .iter()
        .all(|wanted| candidates.any(|found| found == wanted))
}

/// Ordered set difference: every member of `members` not present in `remove`.
fn array_minus(members: &[SimpleSelector], remove: &[SimpleSelector]) -> Vec<SimpleSelector> {
    members
        .iter()
        .filter(|member| !remove.contains(member))
        .cloned()
        .collect()
}

fn dedupe_sequences(sequences: Vec<Sequence>) -> Vec<Sequence> {
    let mut out: Vec<Sequence> = Vec::new();
    for seq in sequences {
        if !out.contains(&seq) {
            out.push(seq);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{extend_comma_sequence, is_subsequence};
    use crate::registry::{ExtendRegistry, Extension};
    use sass_selectors::{CommaSequence, parse_comma_sequence};

    fn register(registry: &mut ExtendRegistry, extender: &str, target: &str, directives: &[&str]) {
        let extender_seq = parse_comma_sequence(extender).unwrap().members()[0].clone();
        let target_members = parse_comma_sequence(target).unwrap().members()[0]
            .last_compound()
            .unwrap()
            .members()
            .to_vec();
        registry.register(Extension::new(
            extender_seq,
            target_members,
            directives.iter().map(|name| (*name).to_owned()).collect(),
            false,
            1,
        ));
    }

    fn extend(selector: &str, registry: &ExtendRegistry) -> CommaSequence {
        let parsed = parse_comma_sequence(selector).unwrap();
        extend_comma_sequence(&parsed, registry, &[]).unwrap()
    }

    #[test]
    fn class_extension_adds_the_extender() {
        let mut registry = ExtendRegistry::new();
        register(&mut registry, ".seriousError", ".error", &[]);
        let extended = extend(".error", &registry);
        assert_eq!(extended.to_string(), ".error, .seriousError");
    }

    #[test]
    fn extension_unifies_with_the_remainder() {
        let mut registry = ExtendRegistry::new();
        register(&mut registry, ".hoverlink", "a:hover", &[]);
        let extended = extend("a:hover", &registry);
        assert_eq!(extended.to_string(), "a:hover, .hoverlink");
        // Only part of the compound is the target; the remainder unifies
        // with the extender, and the matched part is replaced.
        let partial = extend("a.important:hover", &registry);
        assert_eq!(partial.to_string(), "a.important:hover, .important.hoverlink");
    }

    #[test]
    fn nested_extender_weaves_contexts() {
        let mut registry = ExtendRegistry::new();
        register(&mut registry, "#fake-links .link", "a", &[]);
        let extended = extend("a", &registry);
        assert_eq!(extended.to_string(), "a, #fake-links .link");
    }

    #[test]
    fn extending_a_nested_rule_weaves_both_contexts() {
        let mut registry = ExtendRegistry::new();
        register(&mut registry, ".a .x", ".b", &[]);
        let extended = extend(".foo .b", &registry);
        assert_eq!(
            extended.to_string(),
            ".foo .b, .foo .a .x, .a .foo .x"
        );
    }

    #[test]
    fn chained_extends_follow_through() {
        let mut registry = ExtendRegistry::new();
        register(&mut registry, ".b", ".a", &[]);
        register(&mut registry, ".c", ".b", &[]);
        let extended = extend(".a", &registry);
        assert_eq!(extended.to_string(), ".a, .b, .c");
    }

    #[test]
    fn cyclic_extends_terminate() {
        let mut registry = ExtendRegistry::new();
        register(&mut registry, ".b", ".a", &[]);
        register(&mut registry, ".a", ".b", &[]);
        let extended = extend(".a", &registry);
        assert_eq!(extended.to_string(), ".a, .b");
    }

    #[test]
    fn placeholder_selectors_do_not_reassert_themselves() {
        let mut registry = ExtendRegistry::new();
        register(&mut registry, ".concrete", "%base", &[]);
        let extended = extend("%base", &registry);
        assert_eq!(extended.to_string(), "%base, .concrete");
    }

    #[test]
    fn extension_never_weakens_specificity() {
        let mut registry = ExtendRegistry::new();
        register(&mut registry, "#big .deep", ".a", &[]);
        let parsed = parse_comma_sequence(".a.b").unwrap();
        let original_spec = parsed.members()[0].specificity();
        let extender_spec = parse_comma_sequence("#big .deep").unwrap().members()[0].specificity();
        let floor = original_spec.min(extender_spec);
        let extended = extend_comma_sequence(&parsed, &registry, &[]).unwrap();
        assert!(extended.members().len() > 1);
        for seq in extended.members() {
            assert!(
                seq.specificity() >= floor,
                "\"{seq}\" fell below the specificity floor"
            );
        }
    }

    #[test]
    fn extend_across_directive_boundary_is_fatal() {
        let mut registry = ExtendRegistry::new();
        register(&mut registry, ".inner", ".outer", &["@media screen"]);
        let parsed = parse_comma_sequence(".outer").unwrap();
        let result = extend_comma_sequence(&parsed, &registry, &[]);
        assert!(result.is_err());
        // The same extend applied under a matching directive stack is fine.
        let stacked = extend_comma_sequence(
            &parsed,
            &registry,
            &["@media screen".to_owned()],
        );
        assert!(stacked.is_ok());
    }

    #[test]
    fn subsequence_check_is_order_sensitive() {
        let media = "@media screen".to_owned();
        let supports = "@supports (color: red)".to_owned();
        assert!(is_subsequence(&[media.clone()], &[supports.clone(), media.clone()]));
        assert!(is_subsequence::<String>(&[], &[media.clone()]));
        assert!(!is_subsequence(&[media.clone(), supports.clone()], &[supports, media]));
    }
}
