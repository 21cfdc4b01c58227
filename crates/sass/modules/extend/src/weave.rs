//! Selector weaving: interleaving an extender sequence with the sequence it
//! extends while preserving the relative order of both.

use log::warn;
use sass_selectors::{
    Combinator, Compound, Sequence, SequenceItem, parent_superselector_items,
    superselector_items,
};

/// Past this many candidate groups the redundancy trim becomes quadratic in
/// practice, so it degrades to deduplication only.
const TRIM_GROUP_LIMIT: usize = 100;

/// Interleave a path of selector groups left to right. Each group's last
/// item is the "real" target of that step and is re-appended untouched;
/// everything before it is subwoven into the prefixes built so far.
pub fn weave(path: &[Vec<SequenceItem>]) -> Vec<Vec<SequenceItem>> {
    let mut prefixes: Vec<Vec<SequenceItem>> = vec![Vec::new()];
    for group in path {
        let mut current = group.clone();
        let Some(last) = current.pop() else {
            continue;
        };
        let mut next_prefixes = Vec::new();
        for prefix in &prefixes {
            let Some(subwoven) = subweave(prefix, &current) else {
                continue;
            };
            for mut candidate in subwoven {
                candidate.push(last.clone());
                next_prefixes.push(candidate);
            }
        }
        prefixes = next_prefixes;
    }
    prefixes
}

/// All orderings that merge `seq1` and `seq2` such that both keep their
/// internal order, with combinator runs merged at the edges and common
/// (parent-superselector-equal) chunks shared. `None` means the two cannot
/// be merged at all.
fn subweave(seq1: &[SequenceItem], seq2: &[SequenceItem]) -> Option<Vec<Vec<SequenceItem>>> {
    if seq1.is_empty() {
        return Some(vec![seq2.to_vec()]);
    }
    if seq2.is_empty() {
        return Some(vec![seq1.to_vec()]);
    }
    let mut seq1 = seq1.to_vec();
    let mut seq2 = seq2.to_vec();
    let init = merge_initial_ops(&mut seq1, &mut seq2)?;
    let mut fin: Vec<FinalPiece> = Vec::new();
    merge_final_ops(&mut seq1, &mut seq2, &mut fin)?;

    let mut grouped1 = group_selectors(seq1);
    let mut grouped2 = group_selectors(seq2);
    let mut lcs = lcs_groups(&grouped2, &grouped1);

    let mut diff: Vec<Vec<Vec<SequenceItem>>> = vec![vec![init]];
    while let Some(common) = lcs.first().cloned() {
        let alternatives = chunks(&mut grouped1, &mut grouped2, |rest| {
            rest.first()
                .is_some_and(|group| parent_superselector_items(group, &common))
        });
        diff.push(alternatives);
        diff.push(vec![common]);
        lcs.remove(0);
        if !grouped1.is_empty() {
            grouped1.remove(0);
        }
        if !grouped2.is_empty() {
            grouped2.remove(0);
        }
    }
    let tail = chunks(&mut grouped1, &mut grouped2, <[Vec<SequenceItem>]>::is_empty);
    diff.push(tail);
    for piece in fin {
        match piece {
            FinalPiece::Item(item) => diff.push(vec![vec![item]]),
            FinalPiece::Choice(alternatives) => diff.push(alternatives),
        }
    }
    diff.retain(|choices| !choices.is_empty());

    let mut results = Vec::new();
    for path in paths(&diff) {
        let flat: Vec<SequenceItem> = path.into_iter().flatten().collect();
        if !has_two_subjects(&flat) {
            results.push(flat);
        }
    }
    Some(results)
}

/// Merge the leading combinator runs of two sequences. Succeeds only when
/// one run is a subsequence of the other; the longer run wins. A leading
/// newline marker on either side is preserved.
fn merge_initial_ops(
    seq1: &mut Vec<SequenceItem>,
    seq2: &mut Vec<SequenceItem>,
) -> Option<Vec<SequenceItem>> {
    let mut ops1: Vec<SequenceItem> = Vec::new();
    while seq1.first().is_some_and(SequenceItem::is_op) {
        ops1.push(seq1.remove(0));
    }
    let mut ops2: Vec<SequenceItem> = Vec::new();
    while seq2.first().is_some_and(SequenceItem::is_op) {
        ops2.push(seq2.remove(0));
    }
    let mut newline = false;
    if matches!(ops1.first(), Some(SequenceItem::Newline)) {
        ops1.remove(0);
        newline = true;
    }
    if matches!(ops2.first(), Some(SequenceItem::Newline)) {
        ops2.remove(0);
        newline = true;
    }
    let common = lcs_equal(&ops1, &ops2);
    if common != ops1 && common != ops2 {
        return None;
    }
    let mut out = Vec::new();
    if newline {
        out.push(SequenceItem::Newline);
    }
    out.extend(if ops1.len() > ops2.len() { ops1 } else { ops2 });
    Some(out)
}

/// One position of the merged trailing run: either a fixed item or a set of
/// alternative runs produced by a combinator special case.
enum FinalPiece {
    Item(SequenceItem),
    Choice(Vec<Vec<SequenceItem>>),
}

/// Merge the trailing combinator runs of two sequences into `result`
/// (front-loaded, in source order). Handles the sibling-combinator special
/// cases pair by pair; multiple trailing operators on both sides only merge
/// when one run is a supersequence of the other.
fn merge_final_ops(
    seq1: &mut Vec<SequenceItem>,
    seq2: &mut Vec<SequenceItem>,
    result: &mut Vec<FinalPiece>,
) -> Option<()> {
    let mut ops1: Vec<SequenceItem> = Vec::new();
    while seq1.last().is_some_and(SequenceItem::is_op) {
        if let Some(item) = seq1.pop() {
            ops1.push(item);
        }
    }
    let mut ops2: Vec<SequenceItem> = Vec::new();
    while seq2.last().is_some_and(SequenceItem::is_op) {
        if let Some(item) = seq2.pop() {
            ops2.push(item);
        }
    }
    ops1.retain(|item| !matches!(item, SequenceItem::Newline));
    ops2.retain(|item| !matches!(item, SequenceItem::Newline));
    if ops1.is_empty() && ops2.is_empty() {
        return Some(());
    }
    if ops1.len() > 1 || ops2.len() > 1 {
        // Multiple trailing operators only merge if one run subsumes the
        // other wholesale.
        let common = lcs_equal(&ops1, &ops2);
        if common != ops1 && common != ops2 {
            return None;
        }
        let longer = if ops1.len() > ops2.len() { ops1 } else { ops2 };
        // The run was popped back to front; restore source order.
        let restored: Vec<FinalPiece> = longer.into_iter().rev().map(FinalPiece::Item).collect();
        result.splice(0..0, restored);
        return Some(());
    }
    let op1 = ops1.first().and_then(as_combinator);
    let op2 = ops2.first().and_then(as_combinator);
    match (op1, op2) {
        (Some(op1), Some(op2)) => {
            let sel1 = pop_compound(seq1)?;
            let sel2 = pop_compound(seq2)?;
            merge_final_pair(seq1, seq2, result, (sel1, op1), (sel2, op2))?;
            merge_final_ops(seq1, seq2, result)
        }
        (Some(op1), None) => {
            if op1 == Combinator::Child
                && let (Some(SequenceItem::Compound(last2)), Some(SequenceItem::Compound(last1))) =
                    (seq2.last(), seq1.last())
                && last2.is_superselector(last1)
            {
                seq2.pop();
            }
            let sel1 = pop_compound(seq1)?;
            result.splice(
                0..0,
                vec![
                    FinalPiece::Item(SequenceItem::Compound(sel1)),
                    FinalPiece::Item(SequenceItem::Combinator(op1)),
                ],
            );
            merge_final_ops(seq1, seq2, result)
        }
        (None, Some(op2)) => {
            if op2 == Combinator::Child
                && let (Some(SequenceItem::Compound(last1)), Some(SequenceItem::Compound(last2))) =
                    (seq1.last(), seq2.last())
                && last1.is_superselector(last2)
            {
                seq1.pop();
            }
            let sel2 = pop_compound(seq2)?;
            result.splice(
                0..0,
                vec![
                    FinalPiece::Item(SequenceItem::Compound(sel2)),
                    FinalPiece::Item(SequenceItem::Combinator(op2)),
                ],
            );
            merge_final_ops(seq1, seq2, result)
        }
        (None, None) => Some(()),
    }
}

/// The per-pair special cases for two trailing combinators.
fn merge_final_pair(
    seq1: &mut Vec<SequenceItem>,
    seq2: &mut Vec<SequenceItem>,
    result: &mut Vec<FinalPiece>,
    (sel1, op1): (Compound, Combinator),
    (sel2, op2): (Compound, Combinator),
) -> Option<()> {
    use Combinator::{Child, FollowingSibling, NextSibling};
    let unshift_pair = |result: &mut Vec<FinalPiece>, sel: Compound, op: Combinator| {
        result.splice(
            0..0,
            vec![
                FinalPiece::Item(SequenceItem::Compound(sel)),
                FinalPiece::Item(SequenceItem::Combinator(op)),
            ],
        );
    };
    match (op1, op2) {
        (FollowingSibling, FollowingSibling) => {
            if sel1.is_superselector(&sel2) {
                unshift_pair(result, sel2, FollowingSibling);
            } else if sel2.is_superselector(&sel1) {
                unshift_pair(result, sel1, FollowingSibling);
            } else {
                let merged = sel1.unify(sel2.members(), sel2.subject());
                let mut choices = vec![
                    run(&[&sel1], FollowingSibling, &[&sel2], Some(FollowingSibling)),
                    run(&[&sel2], FollowingSibling, &[&sel1], Some(FollowingSibling)),
                ];
                if let Some(merged) = merged {
                    choices.push(vec![
                        SequenceItem::Compound(merged),
                        SequenceItem::Combinator(FollowingSibling),
                    ]);
                }
                result.insert(0, FinalPiece::Choice(choices));
            }
        }
        (FollowingSibling, NextSibling) | (NextSibling, FollowingSibling) => {
            let (tilde_sel, plus_sel) = if op1 == FollowingSibling {
                (sel1, sel2)
            } else {
                (sel2, sel1)
            };
            if tilde_sel.is_superselector(&plus_sel) {
                unshift_pair(result, plus_sel, NextSibling);
            } else {
                let merged = tilde_sel.unify(plus_sel.members(), plus_sel.subject());
                let mut choices = vec![run(
                    &[&tilde_sel],
                    FollowingSibling,
                    &[&plus_sel],
                    Some(NextSibling),
                )];
                if let Some(merged) = merged {
                    choices.push(vec![
                        SequenceItem::Compound(merged),
                        SequenceItem::Combinator(NextSibling),
                    ]);
                }
                result.insert(0, FinalPiece::Choice(choices));
            }
        }
        (Child, FollowingSibling | NextSibling) => {
            // `>` binds tighter; emit the sibling pair and retry with the
            // child combinator back in place.
            unshift_pair(result, sel2, op2);
            seq1.push(SequenceItem::Compound(sel1));
            seq1.push(SequenceItem::Combinator(op1));
        }
        (FollowingSibling | NextSibling, Child) => {
            unshift_pair(result, sel1, op1);
            seq2.push(SequenceItem::Compound(sel2));
            seq2.push(SequenceItem::Combinator(op2));
        }
        (_, _) if op1 == op2 => {
            let merged = sel1.unify(sel2.members(), sel2.subject())?;
            unshift_pair(result, merged, op1);
        }
        _ => return None,
    }
    Some(())
}

/// A run of `left` items, a combinator, the `right` items, and optionally a
/// trailing combinator — a helper for building choice runs.
fn run(
    left: &[&Compound],
    op: Combinator,
    right: &[&Compound],
    trailing: Option<Combinator>,
) -> Vec<SequenceItem> {
    let mut out = Vec::new();
    for sel in left {
        out.push(SequenceItem::Compound((*sel).clone()));
    }
    out.push(SequenceItem::Combinator(op));
    for sel in right {
        out.push(SequenceItem::Compound((*sel).clone()));
    }
    if let Some(op) = trailing {
        out.push(SequenceItem::Combinator(op));
    }
    out
}

fn as_combinator(item: &SequenceItem) -> Option<Combinator> {
    match item {
        SequenceItem::Combinator(op) => Some(*op),
        _ => None,
    }
}

fn pop_compound(seq: &mut Vec<SequenceItem>) -> Option<Compound> {
    match seq.pop() {
        Some(SequenceItem::Compound(compound)) => Some(compound),
        _ => None,
    }
}

/// Group a sequence into runs: compounds that are glued to a neighbor by an
/// explicit combinator stay in one group, bare compounds stand alone.
fn group_selectors(seq: Vec<SequenceItem>) -> Vec<Vec<SequenceItem>> {
    let mut grouped: Vec<Vec<SequenceItem>> = Vec::new();
    let mut rest = seq.into_iter().peekable();
    while rest.peek().is_some() {
        let mut head: Vec<SequenceItem> = Vec::new();
        loop {
            let Some(item) = rest.next() else {
                break;
            };
            head.push(item);
            let glued = head.last().is_some_and(SequenceItem::is_op)
                || rest.peek().is_some_and(SequenceItem::is_op);
            if rest.peek().is_none() || !glued {
                break;
            }
        }
        grouped.push(head);
    }
    grouped
}

/// Collect the leading groups of both lists up to the point `done` accepts,
/// and return the possible interleavings of the two chunks, flattened.
fn chunks(
    seq1: &mut Vec<Vec<SequenceItem>>,
    seq2: &mut Vec<Vec<SequenceItem>>,
    done: impl Fn(&[Vec<SequenceItem>]) -> bool,
) -> Vec<Vec<SequenceItem>> {
    let mut chunk1: Vec<Vec<SequenceItem>> = Vec::new();
    while !seq1.is_empty() && !done(seq1) {
        chunk1.push(seq1.remove(0));
    }
    let mut chunk2: Vec<Vec<SequenceItem>> = Vec::new();
    while !seq2.is_empty() && !done(seq2) {
        chunk2.push(seq2.remove(0));
    }
    let flatten = |groups: &[Vec<SequenceItem>]| -> Vec<SequenceItem> {
        groups.iter().flatten().cloned().collect()
    };
    match (chunk1.is_empty(), chunk2.is_empty()) {
        (true, true) => Vec::new(),
        (true, false) => vec![flatten(&chunk2)],
        (false, true) => vec![flatten(&chunk1)],
        (false, false) => {
            let mut forward = chunk1.clone();
            forward.extend(chunk2.iter().cloned());
            let mut backward = chunk2;
            backward.extend(chunk1);
            vec![flatten(&forward), flatten(&backward)]
        }
    }
}

/// Longest common subsequence of two group lists, matching by structural
/// equality or parent-superselector subsumption (keeping the more specific
/// group of a matched pair).
fn lcs_groups(
    groups1: &[Vec<SequenceItem>],
    groups2: &[Vec<SequenceItem>],
) -> Vec<Vec<SequenceItem>> {
    lcs_with(groups1, groups2, |left, right| {
        if left == right {
            return Some(left.clone());
        }
        if !left.first().is_some_and(SequenceItem::is_compound)
            || !right.first().is_some_and(SequenceItem::is_compound)
        {
            return None;
        }
        if parent_superselector_items(left, right) {
            return Some(right.clone());
        }
        if parent_superselector_items(right, left) {
            return Some(left.clone());
        }
        None
    })
}

/// Plain-equality LCS over sequence items.
fn lcs_equal(left: &[SequenceItem], right: &[SequenceItem]) -> Vec<SequenceItem> {
    lcs_with(left, right, |first, second| {
        (first == second).then(|| first.clone())
    })
}

/// Dynamic-programming LCS with a custom matcher that also picks which of a
/// matched pair to keep.
fn lcs_with<T: Clone>(
    left: &[T],
    right: &[T],
    matcher: impl Fn(&T, &T) -> Option<T>,
) -> Vec<T> {
    let rows = left.len() + 1;
    let cols = right.len() + 1;
    let mut table = vec![vec![0usize; cols]; rows];
    for row in 1..rows {
        for col in 1..cols {
            table[row][col] = if matcher(&left[row - 1], &right[col - 1]).is_some() {
                table[row - 1][col - 1] + 1
            } else {
                table[row][col - 1].max(table[row - 1][col])
            };
        }
    }
    let mut out = Vec::new();
    let mut row = left.len();
    let mut col = right.len();
    while row > 0 && col > 0 {
        if let Some(chosen) = matcher(&left[row - 1], &right[col - 1]) {
            out.push(chosen);
            row -= 1;
            col -= 1;
        } else if table[row][col - 1] > table[row - 1][col] {
            col -= 1;
        } else {
            row -= 1;
        }
    }
    out.reverse();
    out
}

/// Cartesian product of choice groups, preserving choice order.
pub(crate) fn paths<T: Clone>(choices: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = vec![Vec::new()];
    for group in choices {
        let mut next = Vec::with_capacity(out.len().saturating_mul(group.len()));
        for option in group {
            for path in &out {
                let mut extended = path.clone();
                extended.push(option.clone());
                next.push(extended);
            }
        }
        out = next;
    }
    out
}

/// A sequence may contain at most one subject marker.
fn has_two_subjects(items: &[SequenceItem]) -> bool {
    let mut seen_subject = false;
    for item in items {
        let Some(compound) = item.as_compound() else {
            continue;
        };
        if !compound.subject() {
            continue;
        }
        if seen_subject {
            return true;
        }
        seen_subject = true;
    }
    false
}

fn items_specificity(items: &[SequenceItem]) -> u64 {
    items
        .iter()
        .filter_map(SequenceItem::as_compound)
        .map(Compound::specificity)
        .sum()
}

/// The highest specificity among the extender sequences that produced this
/// candidate; 0 when it has no extend provenance.
fn sources_max_specificity(items: &[SequenceItem]) -> u64 {
    items
        .iter()
        .filter_map(SequenceItem::as_compound)
        .flat_map(|compound| compound.sources().iter())
        .map(Sequence::specificity)
        .max()
        .unwrap_or(0)
}

/// Remove candidates another group already covers: a candidate is dropped
/// when a candidate in a *different* group is a superselector of it with
/// specificity at least the dropped candidate's extend-provenance floor.
/// Past `TRIM_GROUP_LIMIT` groups only deduplication happens.
pub fn trim(groups: Vec<Vec<Vec<SequenceItem>>>) -> Vec<Vec<SequenceItem>> {
    if groups.len() > TRIM_GROUP_LIMIT {
        warn!(
            "extend produced {} selector groups; skipping redundancy trimming",
            groups.len()
        );
        return dedupe(groups.into_iter().flatten().collect());
    }
    let mut result = groups.clone();
    for (index, group) in groups.iter().enumerate() {
        let kept: Vec<Vec<SequenceItem>> = group
            .iter()
            .filter(|candidate| {
                let floor = sources_max_specificity(candidate);
                let covered = result.iter().enumerate().any(|(other_index, other_group)| {
                    other_index != index
                        && other_group.iter().any(|other| {
                            items_specificity(other) >= floor
                                && superselector_items(other, candidate)
                        })
                });
                !covered
            })
            .cloned()
            .collect();
        result[index] = kept;
    }
    dedupe(result.into_iter().flatten().collect())
}

/// Order-preserving deduplication by semantic (newline-insensitive) equality.
fn dedupe(candidates: Vec<Vec<SequenceItem>>) -> Vec<Vec<SequenceItem>> {
    let mut seen: Vec<Sequence> = Vec::new();
    let mut out = Vec::new();
    for candidate in candidates {
        let as_sequence = Sequence::new(candidate.clone());
        if seen.contains(&as_sequence) {
            continue;
        }
        seen.push(as_sequence);
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{group_selectors, paths, trim, weave};
    use sass_selectors::{Sequence, SequenceItem, parse_comma_sequence};

    fn items(text: &str) -> Vec<SequenceItem> {
        parse_comma_sequence(text).unwrap().members()[0]
            .members()
            .to_vec()
    }

    fn render(woven: &[Vec<SequenceItem>]) -> Vec<String> {
        woven
            .iter()
            .map(|candidate| Sequence::new(candidate.clone()).to_string())
            .collect()
    }

    #[test]
    fn weave_of_single_compounds_is_trivial() {
        let woven = weave(&[items(".a"), items(".b")]);
        assert_eq!(render(&woven), vec![".a .b"]);
    }

    #[test]
    fn weave_interleaves_disjoint_prefixes() {
        let woven = weave(&[items(".foo .x"), items(".bar .y")]);
        assert_eq!(
            render(&woven),
            vec![".foo .x .bar .y", ".bar .foo .x .y"]
        );
    }

    #[test]
    fn weave_interleaves_around_a_shared_target() {
        let woven = weave(&[items(".foo"), items(".a .x")]);
        assert_eq!(render(&woven), vec![".foo .a .x", ".a .foo .x"]);
    }

    #[test]
    fn weave_shares_a_common_prefix() {
        let woven = weave(&[items(".shared .x"), items(".shared .y")]);
        assert_eq!(render(&woven), vec![".shared .x .y"]);
    }

    #[test]
    fn weave_bounded_by_cross_product() {
        let woven = weave(&[items(".a > .b + .c"), items(".d > .e + .f")]);
        assert!(woven.len() <= 9, "expected at most n*m paths, got {}", woven.len());
    }

    #[test]
    fn trailing_child_combinator_merges_into_the_prefix() {
        let woven = weave(&[items(".a > .x"), items(".b > .x")]);
        assert_eq!(render(&woven), vec![".a > .x .b > .x"]);
    }

    #[test]
    fn trailing_sibling_run_attaches_after_the_prefix() {
        let woven = weave(&[items(".a + .x"), items(".b + .y")]);
        assert_eq!(render(&woven), vec![".a + .x .b + .y"]);
    }

    #[test]
    fn groups_keep_combinator_runs_together() {
        let grouped = group_selectors(items(".a > .b .c"));
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].len(), 3);
        assert_eq!(grouped[1].len(), 1);
    }

    #[test]
    fn paths_is_an_ordered_cross_product() {
        let product = paths(&[vec![1, 2], vec![3, 4]]);
        assert_eq!(product, vec![vec![1, 3], vec![2, 3], vec![1, 4], vec![2, 4]]);
    }

    #[test]
    fn trim_drops_candidates_covered_by_other_groups() {
        // `.a .x` (from another group) covers `.a.b .x` once specificity
        // allows; candidates without provenance have a floor of zero.
        let keep = items(".a .x");
        let drop = items(".a.b .x");
        let trimmed = trim(vec![vec![drop], vec![keep.clone()]]);
        assert_eq!(trimmed, vec![keep]);
    }

    #[test]
    fn trim_keeps_unrelated_candidates() {
        let left = items(".a .x");
        let right = items(".b .y");
        let trimmed = trim(vec![vec![left.clone()], vec![right.clone()]]);
        assert_eq!(trimmed, vec![left, right]);
    }
}
