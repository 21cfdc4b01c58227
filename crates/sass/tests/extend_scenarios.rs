use sass::{
    CompileOptions, ErrorKind, MediaQuery, MediaQueryList, Node, NodeKind, compile,
    parse_comma_sequence,
};

fn options() -> CompileOptions {
    let _ = env_logger::builder().is_test(true).try_init();
    CompileOptions::default()
}

fn root(children: Vec<Node>) -> Node {
    Node::new(NodeKind::Root, 1).with_children(children)
}

fn rule(selector: &str, line: u32, children: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Rule {
            selector: parse_comma_sequence(selector).unwrap(),
        },
        line,
    )
    .with_children(children)
}

fn property(name: &str, value: &str, line: u32) -> Node {
    Node::new(
        NodeKind::Property {
            name: name.to_owned(),
            value: value.to_owned(),
        },
        line,
    )
}

fn extend(target: &str, optional: bool, line: u32) -> Node {
    Node::new(
        NodeKind::Extend {
            selector: parse_comma_sequence(target).unwrap(),
            optional,
        },
        line,
    )
}

fn selector_text(node: &Node) -> String {
    let NodeKind::Rule { selector } = &node.kind else {
        unreachable!("expected a rule, got {node}");
    };
    selector.to_string()
}

#[test]
fn extended_rule_gains_the_extender() {
    // .error { border: 1px; }
    // .seriousError { @extend .error; border-width: 3px; }
    let tree = root(vec![
        rule(".error", 1, vec![property("border", "1px", 1)]),
        rule(
            ".seriousError",
            2,
            vec![extend(".error", false, 2), property("border-width", "3px", 2)],
        ),
    ]);
    let flat = compile(tree, &options()).unwrap();
    assert_eq!(flat.children.len(), 2);
    assert_eq!(selector_text(&flat.children[0]), ".error, .seriousError");
    assert_eq!(flat.children[0].children.len(), 1);
    assert_eq!(selector_text(&flat.children[1]), ".seriousError");
    assert_eq!(flat.children[1].children.len(), 1);
}

#[test]
fn extending_a_nested_selector_weaves_contexts() {
    // .a .b { x } and .c { @extend .b }
    let tree = root(vec![
        rule(".a", 1, vec![rule(".b", 2, vec![property("color", "red", 2)])]),
        rule(".c", 3, vec![extend(".b", false, 3)]),
    ]);
    let flat = compile(tree, &options()).unwrap();
    assert_eq!(selector_text(&flat.children[0]), ".a .b, .a .c");
}

#[test]
fn missing_required_extend_target_is_fatal() {
    let tree = root(vec![rule(
        ".a",
        1,
        vec![extend(".nowhere", false, 2), property("color", "red", 1)],
    )]);
    let error = compile(tree, &options()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::ExtendNotSatisfied);
    assert_eq!(error.line, 2);
    assert!(error.message.contains(".nowhere"));
}

#[test]
fn missing_optional_extend_target_is_silent() {
    let tree = root(vec![rule(
        ".a",
        1,
        vec![extend(".nowhere", true, 2), property("color", "red", 1)],
    )]);
    let flat = compile(tree, &options()).unwrap();
    assert_eq!(flat.children.len(), 1);
    assert_eq!(selector_text(&flat.children[0]), ".a");
}

#[test]
fn extend_target_with_combinators_is_invalid() {
    let tree = root(vec![
        rule(".a .b", 1, vec![property("color", "red", 1)]),
        rule(".c", 2, vec![extend(".a .b", false, 2)]),
    ]);
    let error = compile(tree, &options()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::InvalidExtendTarget);
}

#[test]
fn extend_outside_a_rule_is_invalid() {
    let tree = root(vec![extend(".a", false, 1)]);
    let error = compile(tree, &options()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::InvalidExtendTarget);
}

#[test]
fn extending_across_a_media_boundary_is_fatal() {
    // @media screen { .inner { @extend .outer } }  .outer { x }
    let media = Node::new(
        NodeKind::Media {
            query: MediaQueryList::new(vec![MediaQuery::for_type("screen")]),
        },
        1,
    )
    .with_children(vec![rule(
        ".inner",
        2,
        vec![extend(".outer", false, 2), property("color", "red", 2)],
    )]);
    let tree = root(vec![
        media,
        rule(".outer", 4, vec![property("color", "blue", 4)]),
    ]);
    let error = compile(tree, &options()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::ExtendAcrossDirectiveBoundary);
    assert_eq!(error.line, 2);
}

#[test]
fn extending_within_the_same_media_scope_works() {
    let media = Node::new(
        NodeKind::Media {
            query: MediaQueryList::new(vec![MediaQuery::for_type("screen")]),
        },
        1,
    )
    .with_children(vec![
        rule(".outer", 2, vec![property("color", "blue", 2)]),
        rule(
            ".inner",
            3,
            vec![extend(".outer", false, 3), property("color", "red", 3)],
        ),
    ]);
    let tree = root(vec![media]);
    let flat = compile(tree, &options()).unwrap();
    let media_node = &flat.children[0];
    assert_eq!(selector_text(&media_node.children[0]), ".outer, .inner");
}

#[test]
fn top_level_extend_reaches_into_directives() {
    // A top-level @extend may extend a selector inside a @media block.
    let media = Node::new(
        NodeKind::Media {
            query: MediaQueryList::new(vec![MediaQuery::for_type("screen")]),
        },
        1,
    )
    .with_children(vec![rule(".outer", 2, vec![property("color", "blue", 2)])]);
    let tree = root(vec![
        media,
        rule(".inner", 4, vec![extend(".outer", false, 4), property("color", "red", 4)]),
    ]);
    let flat = compile(tree, &options()).unwrap();
    let media_node = &flat.children[0];
    assert_eq!(selector_text(&media_node.children[0]), ".outer, .inner");
}

#[test]
fn placeholder_base_is_extended_but_stays_invisible() {
    let tree = root(vec![
        rule("%button-base", 1, vec![property("padding", "4px", 1)]),
        rule(
            ".button",
            2,
            vec![extend("%button-base", false, 2), property("color", "red", 2)],
        ),
    ]);
    let flat = compile(tree, &options()).unwrap();
    assert_eq!(
        selector_text(&flat.children[0]),
        "%button-base, .button"
    );
    // A renderer drops placeholder sequences; a rule that is placeholders
    // only would be invisible outright.
    assert!(!flat.children[0].is_invisible());
}

#[test]
fn chained_extends_compile_through() {
    let tree = root(vec![
        rule(".base", 1, vec![property("color", "red", 1)]),
        rule(".mid", 2, vec![extend(".base", false, 2), property("x", "y", 2)]),
        rule(".leaf", 3, vec![extend(".mid", false, 3), property("z", "w", 3)]),
    ]);
    let flat = compile(tree, &options()).unwrap();
    assert_eq!(selector_text(&flat.children[0]), ".base, .mid, .leaf");
    assert_eq!(selector_text(&flat.children[1]), ".mid, .leaf");
    assert_eq!(selector_text(&flat.children[2]), ".leaf");
}

#[test]
fn extend_applies_to_flattened_nested_rules() {
    // The target rule was written nested and flattened before extension.
    let tree = root(vec![
        rule(
            ".card",
            1,
            vec![rule(".title", 2, vec![property("font-weight", "bold", 2)])],
        ),
        rule(".promo", 4, vec![extend(".title", false, 4), property("color", "red", 4)]),
    ]);
    let flat = compile(tree, &options()).unwrap();
    assert_eq!(
        selector_text(&flat.children[0]),
        ".card .title, .card .promo"
    );
}

#[test]
fn multiple_extends_in_one_rule_all_apply() {
    let tree = root(vec![
        rule(".a", 1, vec![property("color", "red", 1)]),
        rule(".b", 2, vec![property("color", "blue", 2)]),
        rule(
            ".both",
            3,
            vec![
                extend(".a", false, 3),
                extend(".b", false, 3),
                property("color", "green", 3),
            ],
        ),
    ]);
    let flat = compile(tree, &options()).unwrap();
    assert_eq!(selector_text(&flat.children[0]), ".a, .both");
    assert_eq!(selector_text(&flat.children[1]), ".b, .both");
}
