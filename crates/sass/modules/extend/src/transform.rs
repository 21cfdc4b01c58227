//! The extend pass: rewrite every rule's selector list through the registry,
//! then verify that every required extension fired.

use crate::apply::extend_comma_sequence;
use crate::registry::{ExtendRegistry, ExtendStatus};
use log::debug;
use sass_tree::{ErrorKind, Node, NodeKind, SassError};

/// Walk a flattened tree, rewriting rule selectors via the extend registry.
/// After the walk, any registered extension that is still unmatched (or
/// never unified) and not `!optional` aborts the compilation.
pub fn apply_extends(
    mut root: Node,
    registry: &ExtendRegistry,
    filename: Option<&str>,
) -> Result<Node, SassError> {
    if !registry.is_empty() {
        debug!("applying {} extend records", registry.len());
        let mut directive_stack: Vec<String> = Vec::new();
        visit(&mut root, registry, &mut directive_stack, filename)?;
    }
    verify_extends_satisfied(registry, filename)?;
    Ok(root)
}

fn visit(
    node: &mut Node,
    registry: &ExtendRegistry,
    directive_stack: &mut Vec<String>,
    filename: Option<&str>,
) -> Result<(), SassError> {
    if let NodeKind::Rule { selector } = &mut node.kind {
        let extended = extend_comma_sequence(selector, registry, directive_stack)
            .map_err(|error| error.with_filename(filename))?;
        *selector = extended;
    }
    let identity = node.directive_identity();
    if let Some(identity) = identity {
        directive_stack.push(identity);
        for child in &mut node.children {
            visit(child, registry, directive_stack, filename)?;
        }
        directive_stack.pop();
    } else {
        for child in &mut node.children {
            visit(child, registry, directive_stack, filename)?;
        }
    }
    Ok(())
}

fn verify_extends_satisfied(
    registry: &ExtendRegistry,
    filename: Option<&str>,
) -> Result<(), SassError> {
    for extension in registry.extensions() {
        if extension.optional() || extension.status() == ExtendStatus::Succeeded {
            continue;
        }
        let target = extension.target_text();
        let reason = match extension.status() {
            ExtendStatus::NotFound => {
                format!("The selector \"{target}\" was not found.")
            }
            _ => format!(
                "No selectors matching \"{target}\" could be unified with \"{}\".",
                extension.extender()
            ),
        };
        return Err(SassError::new(
            ErrorKind::ExtendNotSatisfied,
            format!(
                "\"{}\" failed to @extend \"{target}\".\n{reason}\n\
                 Use \"@extend {target} !optional\" if the extend should be able to fail.",
                extension.extender()
            ),
            extension.line(),
        )
        .with_filename(filename));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::apply_extends;
    use crate::registry::{ExtendRegistry, Extension};
    use sass_selectors::parse_comma_sequence;
    use sass_tree::{ErrorKind, Node, NodeKind};

    fn rule(selector: &str, line: u32) -> Node {
        Node::new(
            NodeKind::Rule {
                selector: parse_comma_sequence(selector).unwrap(),
            },
            line,
        )
    }

    fn extension(extender: &str, target: &str, optional: bool) -> Extension {
        let extender_seq = parse_comma_sequence(extender).unwrap().members()[0].clone();
        let target_members = parse_comma_sequence(target).unwrap().members()[0]
            .last_compound()
            .unwrap()
            .members()
            .to_vec();
        Extension::new(extender_seq, target_members, Vec::new(), optional, 2)
    }

    #[test]
    fn unmatched_required_extend_is_fatal() {
        let mut registry = ExtendRegistry::new();
        registry.register(extension(".a", ".nowhere", false));
        let root = Node::new(NodeKind::Root, 1).with_children(vec![rule(".b", 1)]);
        let error = apply_extends(root, &registry, Some("style.scss")).unwrap_err();
        assert_eq!(error.kind, ErrorKind::ExtendNotSatisfied);
        assert_eq!(error.line, 2);
        assert_eq!(error.filename.as_deref(), Some("style.scss"));
        assert!(error.message.contains("was not found"));
    }

    #[test]
    fn unmatched_optional_extend_is_silent() {
        let mut registry = ExtendRegistry::new();
        registry.register(extension(".a", ".nowhere", true));
        let root = Node::new(NodeKind::Root, 1).with_children(vec![rule(".b", 1)]);
        let result = apply_extends(root, &registry, None).unwrap();
        let NodeKind::Rule { selector } = &result.children[0].kind else {
            unreachable!("expected a rule");
        };
        assert_eq!(selector.to_string(), ".b");
    }

    #[test]
    fn matched_extend_rewrites_the_rule() {
        let mut registry = ExtendRegistry::new();
        registry.register(extension(".seriousError", ".error", false));
        let root = Node::new(NodeKind::Root, 1).with_children(vec![rule(".error", 1)]);
        let result = apply_extends(root, &registry, None).unwrap();
        let NodeKind::Rule { selector } = &result.children[0].kind else {
            unreachable!("expected a rule");
        };
        assert_eq!(selector.to_string(), ".error, .seriousError");
    }

    #[test]
    fn matched_but_ununifiable_extend_reports_unification() {
        // `#b { @extend .a }` matches the rule `#a.a`, but the leftover `#a`
        // clashes with the extender's id.
        let mut registry = ExtendRegistry::new();
        registry.register(extension("#b", ".a", false));
        let root = Node::new(NodeKind::Root, 1).with_children(vec![rule("#a.a", 1)]);
        let error = apply_extends(root, &registry, None).unwrap_err();
        assert_eq!(error.kind, ErrorKind::ExtendNotSatisfied);
        assert!(error.message.contains("could be unified"));
    }

    #[test]
    fn directive_stack_scopes_nested_rules() {
        let mut registry = ExtendRegistry::new();
        let mut record = extension(".inner", ".outer", false);
        record = Extension::new(
            record.extender().clone(),
            record.target().to_vec(),
            vec!["@media screen".to_owned()],
            false,
            2,
        );
        registry.register(record);
        // The extended rule lives inside the same media query, so the extend
        // is in scope.
        let media = Node::new(
            NodeKind::Media {
                query: sass_tree::MediaQueryList::new(vec![sass_tree::MediaQuery::for_type(
                    "screen",
                )]),
            },
            1,
        )
        .with_children(vec![rule(".outer", 1)]);
        let root = Node::new(NodeKind::Root, 1).with_children(vec![media]);
        let result = apply_extends(root, &registry, None).unwrap();
        let NodeKind::Rule { selector } = &result.children[0].children[0].kind else {
            unreachable!("expected a rule");
        };
        assert_eq!(selector.to_string(), ".outer, .inner");
    }
}
