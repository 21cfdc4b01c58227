//! The flattening visitor and its bubble machinery.

use crate::resolve::resolve_tree_selectors;
use log::debug;
use sass_extend::{ExtendRegistry, Extension};
use sass_selectors::SequenceItem;
use sass_tree::{AtRootQuery, ErrorKind, Node, NodeKind, OutputStyle, SassError};

/// Flatten an evaluated tree. Returns the CSS-shaped tree and the extend
/// registry populated from every `@extend` encountered on the way.
pub fn cssize(
    root: Node,
    style: OutputStyle,
    filename: Option<&str>,
) -> Result<(Node, ExtendRegistry), SassError> {
    let mut root = root;
    resolve_tree_selectors(&mut root, None, true, filename)?;
    let mut pass = Cssize::new(style);
    let flattened = pass
        .visit_root(root)
        .map_err(|error| error.with_filename(filename))?;
    Ok((flattened, pass.registry))
}

/// A node that must be spliced in as a sibling of its logical parent rather
/// than staying a child, with the indentation and grouping it should carry
/// once it lands.
struct Bubble {
    node: Node,
    tabs: usize,
    group_end: bool,
}

/// The result of flattening one node: either a finished node, or a bubble
/// the enclosing visit has to hoist further.
enum Flattened {
    Node(Node),
    Bubble(Box<Bubble>),
}

impl Flattened {
    fn add_tabs(&mut self, extra: usize) {
        match self {
            Self::Node(node) => node.tabs += extra,
            Self::Bubble(bubble) => bubble.tabs += extra,
        }
    }

    fn set_group_end(&mut self, value: bool) {
        match self {
            Self::Node(node) => node.group_end = value,
            Self::Bubble(bubble) => bubble.group_end = value,
        }
    }
}

struct Cssize {
    parents: Vec<Node>,
    registry: ExtendRegistry,
    style: OutputStyle,
}

impl Cssize {
    fn new(style: OutputStyle) -> Self {
        Self {
            parents: Vec::new(),
            registry: ExtendRegistry::new(),
            style,
        }
    }

    fn parent(&self) -> Option<&Node> {
        self.parents.last()
    }

    fn parent_is_rule(&self) -> bool {
        self.parent().is_some_and(Node::is_rule)
    }

    fn visit_root(&mut self, node: Node) -> Result<Node, SassError> {
        if !matches!(node.kind, NodeKind::Root) {
            return Err(SassError::new(
                ErrorKind::InternalInvariantViolation,
                "flattening must start at the document root",
                node.line,
            ));
        }
        let frame = node.clone_childless();
        let Node {
            children,
            line,
            tabs,
            group_end,
            ..
        } = node;
        let visited = self.visit_children(frame, children)?;
        let mut out: Vec<Node> = Vec::with_capacity(visited.len());
        for item in visited {
            match item {
                Flattened::Node(child) => out.push(child),
                Flattened::Bubble(bubble) => {
                    return Err(SassError::new(
                        ErrorKind::InternalInvariantViolation,
                        format!("\"{}\" bubbled past the document root", bubble.node),
                        bubble.node.line,
                    ));
                }
            }
        }
        Ok(Node {
            kind: NodeKind::Root,
            children: hoist_imports(out),
            line,
            tabs,
            group_end,
        })
    }

    fn visit(&mut self, node: Node) -> Result<Vec<Flattened>, SassError> {
        match &node.kind {
            NodeKind::Root => Err(SassError::new(
                ErrorKind::InternalInvariantViolation,
                "nested document root",
                node.line,
            )),
            NodeKind::Rule { .. } => self.visit_rule(node),
            NodeKind::Extend { .. } => self.visit_extend(&node),
            NodeKind::Media { .. } => self.visit_media(node),
            NodeKind::Supports { .. } => self.visit_directive_like(node),
            NodeKind::Directive { has_children, .. } => {
                if *has_children {
                    self.visit_directive_like(node)
                } else {
                    Ok(vec![Flattened::Node(node)])
                }
            }
            NodeKind::AtRoot { .. } => self.visit_at_root(node),
            NodeKind::Property { .. } => self.visit_property(node),
            NodeKind::Comment { .. } | NodeKind::CssImport { .. } | NodeKind::Charset { .. } => {
                Ok(vec![Flattened::Node(node)])
            }
        }
    }

    fn visit_children(
        &mut self,
        frame: Node,
        children: Vec<Node>,
    ) -> Result<Vec<Flattened>, SassError> {
        self.parents.push(frame);
        let mut out = Vec::new();
        let mut failure = None;
        for child in children {
            match self.visit(child) {
                Ok(items) => out.extend(items),
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        self.parents.pop();
        failure.map_or(Ok(out), Err)
    }

    /// Hoist nested rules out, wrap remaining declarations in a copy of this
    /// rule, and splice any bubbles through.
    fn visit_rule(&mut self, node: Node) -> Result<Vec<Flattened>, SassError> {
        let frame = node.clone_childless();
        let Node {
            kind,
            children,
            line,
            tabs,
            group_end,
        } = node;
        let visited = self.visit_children(frame, children)?;

        let mut bubblable: Vec<Flattened> = Vec::new();
        let mut declarations: Vec<Node> = Vec::new();
        for item in visited {
            match item {
                Flattened::Bubble(_) => bubblable.push(item),
                Flattened::Node(child) if child.is_rule() => {
                    bubblable.push(Flattened::Node(child));
                }
                Flattened::Node(child) => {
                    if !child.is_invisible() {
                        declarations.push(child);
                    }
                }
            }
        }
        if !declarations.is_empty() {
            if self.style == OutputStyle::Nested {
                for item in &mut bubblable {
                    item.add_tabs(1);
                }
            }
            let own = Node {
                kind,
                children: declarations,
                line,
                tabs,
                group_end,
            };
            bubblable.insert(0, Flattened::Node(own));
        }
        let mut rules = self.debubble(bubblable, None)?;
        if !self.parent_is_rule()
            && let Some(last) = rules.last_mut()
        {
            last.set_group_end(true);
        }
        Ok(rules)
    }

    /// Register one extend record per (target member × enclosing selector
    /// member) pair. Produces no output node.
    fn visit_extend(&mut self, node: &Node) -> Result<Vec<Flattened>, SassError> {
        let NodeKind::Extend { selector, optional } = &node.kind else {
            return Err(SassError::new(
                ErrorKind::InternalInvariantViolation,
                "visit_extend on a non-extend node",
                node.line,
            ));
        };
        let Some(enclosing) = self.parents.iter().rev().find(|parent| parent.is_rule()) else {
            return Err(SassError::new(
                ErrorKind::InvalidExtendTarget,
                "Extend directives may only be used within rules",
                node.line,
            ));
        };
        let NodeKind::Rule {
            selector: enclosing_selector,
        } = &enclosing.kind
        else {
            return Err(SassError::new(
                ErrorKind::InternalInvariantViolation,
                "rule frame without a selector",
                node.line,
            ));
        };
        let directives: Vec<String> = self
            .parents
            .iter()
            .filter_map(Node::directive_identity)
            .collect();
        let mut records = Vec::new();
        for seq in selector.members() {
            let compounds: Vec<_> = seq.compounds().collect();
            let nested = compounds.len() != 1
                || seq
                    .members()
                    .iter()
                    .any(|item| matches!(item, SequenceItem::Combinator(_)));
            if nested {
                return Err(SassError::new(
                    ErrorKind::InvalidExtendTarget,
                    format!("Can't extend {seq}: can't extend nested selectors"),
                    node.line,
                ));
            }
            let target = compounds[0];
            if target.contains_interpolation() {
                return Err(SassError::new(
                    ErrorKind::InternalInvariantViolation,
                    format!("unresolved interpolation in @extend target \"{target}\""),
                    node.line,
                ));
            }
            if target.contains_parent_ref() {
                return Err(SassError::new(
                    ErrorKind::InvalidExtendTarget,
                    format!("Can't extend {target}: parent references aren't allowed here"),
                    node.line,
                ));
            }
            for member in enclosing_selector.members() {
                if member.last_compound().is_none() {
                    return Err(SassError::new(
                        ErrorKind::InvalidExtendTarget,
                        format!("{member} can't extend: invalid selector"),
                        node.line,
                    ));
                }
                records.push(Extension::new(
                    member.clone(),
                    target.members().to_vec(),
                    directives.clone(),
                    *optional,
                    node.line,
                ));
            }
        }
        for record in records {
            self.registry.register(record);
        }
        Ok(Vec::new())
    }

    /// Bubble through an enclosing rule, or flatten in place and merge any
    /// `@media` children by query intersection.
    fn visit_media(&mut self, node: Node) -> Result<Vec<Flattened>, SassError> {
        if self.parent_is_rule() {
            return Ok(vec![self.bubble_wrapping_parent(node)]);
        }
        let frame = node.clone_childless();
        let Node { kind, children, .. } = node;
        let visited = self.visit_children(frame.clone(), children)?;
        let NodeKind::Media { query } = &kind else {
            return Err(SassError::new(
                ErrorKind::InternalInvariantViolation,
                "visit_media on a non-media node",
                frame.line,
            ));
        };
        let mut media_children: Vec<Node> = Vec::new();
        let mut rest: Vec<Flattened> = Vec::new();
        for item in visited {
            match item {
                Flattened::Node(child) if child.is_media() => media_children.push(child),
                other => rest.push(other),
            }
        }
        let mut merged: Vec<Flattened> = Vec::new();
        for mut child in media_children {
            let NodeKind::Media { query: child_query } = &child.kind else {
                continue;
            };
            match child_query.merge(query) {
                Some(combined) => {
                    child.kind = NodeKind::Media { query: combined };
                    merged.push(Flattened::Node(child));
                }
                None => {
                    debug!("dropping nested @media: queries cannot intersect");
                }
            }
        }
        let mut out = self.debubble(rest, Some(&frame))?;
        out.extend(merged);
        Ok(out)
    }

    /// `@supports` and unknown directives with bodies share the media path,
    /// minus query merging.
    fn visit_directive_like(&mut self, node: Node) -> Result<Vec<Flattened>, SassError> {
        if self.parent_is_rule() {
            return Ok(vec![self.bubble_wrapping_parent(node)]);
        }
        let frame = node.clone_childless();
        let Node { children, .. } = node;
        let visited = self.visit_children(frame.clone(), children)?;
        self.debubble(visited, Some(&frame))
    }

    /// `@at-root`: splice in place once nothing it excludes remains above
    /// it, otherwise bubble (duplicating a non-excluded immediate parent
    /// around its children first).
    fn visit_at_root(&mut self, node: Node) -> Result<Vec<Flattened>, SassError> {
        let NodeKind::AtRoot { query } = &node.kind else {
            return Err(SassError::new(
                ErrorKind::InternalInvariantViolation,
                "visit_at_root on a non-at-root node",
                node.line,
            ));
        };
        let query = query.clone();
        let any_excluded = self
            .parents
            .iter()
            .any(|parent| excludes_node(&query, parent));
        if !any_excluded {
            let frame = node.clone_childless();
            let Node {
                children,
                tabs,
                group_end,
                ..
            } = node;
            let mut out = self.visit_children(frame, children)?;
            for item in &mut out {
                item.add_tabs(tabs);
            }
            if let Some(last) = out.last_mut() {
                last.set_group_end(group_end);
            }
            return Ok(out);
        }
        let parent_excluded = self
            .parent()
            .is_some_and(|parent| excludes_node(&query, parent));
        if parent_excluded {
            return Ok(vec![Flattened::Bubble(Box::new(Bubble {
                node,
                tabs: 0,
                group_end: false,
            }))]);
        }
        Ok(vec![self.bubble_wrapping_parent(node)])
    }

    /// Dash-join nested property names and splice nested declarations out as
    /// siblings.
    fn visit_property(&mut self, node: Node) -> Result<Vec<Flattened>, SassError> {
        let Node {
            kind,
            children,
            line,
            tabs,
            group_end,
        } = node;
        let NodeKind::Property { name, value } = kind else {
            return Err(SassError::new(
                ErrorKind::InternalInvariantViolation,
                "visit_property on a non-property node",
                line,
            ));
        };
        let (full_name, own_tabs) = match self.parent() {
            Some(Node {
                kind:
                    NodeKind::Property {
                        name: parent_name,
                        value: parent_value,
                    },
                tabs: parent_tabs,
                ..
            }) => {
                let merged = format!("{parent_name}-{name}");
                let merged_tabs = if self.style == OutputStyle::Nested {
                    parent_tabs + usize::from(!parent_value.trim().is_empty())
                } else {
                    tabs
                };
                (merged, merged_tabs)
            }
            _ => (name, tabs),
        };
        let this = Node {
            kind: NodeKind::Property {
                name: full_name,
                value: value.clone(),
            },
            children: Vec::new(),
            line,
            tabs: own_tabs,
            group_end,
        };
        let visited = self.visit_children(this.clone_childless(), children)?;
        let mut out = Vec::new();
        if !value.trim().is_empty() {
            out.push(Flattened::Node(this));
        }
        out.extend(visited);
        Ok(out)
    }

    /// Duplicate the innermost parent around this node's children and mark
    /// the node itself as a bubble.
    fn bubble_wrapping_parent(&self, node: Node) -> Flattened {
        let wrapper_template = self
            .parent()
            .map_or_else(|| Node::new(NodeKind::Root, node.line), Node::clone_childless);
        let Node {
            kind,
            children,
            line,
            tabs,
            group_end,
        } = node;
        let mut wrapper = wrapper_template;
        wrapper.children = children;
        Flattened::Bubble(Box::new(Bubble {
            node: Node {
                kind,
                children: vec![wrapper],
                line,
                tabs,
                group_end,
            },
            tabs: 0,
            group_end: false,
        }))
    }

    /// Unwrap bubbles by re-visiting their nodes one level up, wrapping runs
    /// of plain siblings in a copy of `wrapper` (reusing the previous copy
    /// unless a bubble produced output in between).
    fn debubble(
        &mut self,
        children: Vec<Flattened>,
        wrapper: Option<&Node>,
    ) -> Result<Vec<Flattened>, SassError> {
        let mut out: Vec<Flattened> = Vec::new();
        let mut open_wrapper: Option<usize> = None;
        let mut queue = children.into_iter().peekable();
        while let Some(item) = queue.next() {
            match item {
                Flattened::Node(first) => {
                    let mut run = vec![first];
                    while matches!(queue.peek(), Some(Flattened::Node(_))) {
                        if let Some(Flattened::Node(next)) = queue.next() {
                            run.push(next);
                        }
                    }
                    match wrapper {
                        None => out.extend(run.into_iter().map(Flattened::Node)),
                        Some(wrap) => {
                            if let Some(index) = open_wrapper {
                                if let Flattened::Node(existing) = &mut out[index] {
                                    existing.children.extend(run);
                                }
                            } else {
                                let mut copy = wrap.clone_childless();
                                copy.children = run;
                                open_wrapper = Some(out.len());
                                out.push(Flattened::Node(copy));
                            }
                        }
                    }
                }
                Flattened::Bubble(bubble) => {
                    let Bubble {
                        node: mut inner,
                        tabs,
                        group_end,
                    } = *bubble;
                    inner.tabs += tabs;
                    inner.group_end = group_end;
                    let results = self.visit(inner)?;
                    if !results.is_empty() {
                        open_wrapper = None;
                    }
                    out.extend(results);
                }
            }
        }
        Ok(out)
    }
}

fn excludes_node(query: &AtRootQuery, node: &Node) -> bool {
    node.at_root_name()
        .is_some_and(|name| query.excludes_name(name))
}

/// CSS requires `@import` to precede other rules: any import found after the
/// leading charset/comment/import header block is hoisted to the end of that
/// block.
fn hoist_imports(children: Vec<Node>) -> Vec<Node> {
    let header_end = children.iter().position(|child| {
        !matches!(
            child.kind,
            NodeKind::Comment { .. } | NodeKind::Charset { .. } | NodeKind::CssImport { .. }
        )
    });
    let Some(limit) = header_end else {
        return children;
    };
    let mut head: Vec<Node> = Vec::with_capacity(children.len());
    let mut moved: Vec<Node> = Vec::new();
    let mut tail: Vec<Node> = Vec::new();
    for (index, child) in children.into_iter().enumerate() {
        if index < limit {
            head.push(child);
        } else if matches!(child.kind, NodeKind::CssImport { .. }) {
            moved.push(child);
        } else {
            tail.push(child);
        }
    }
    head.extend(moved);
    head.extend(tail);
    head
}
