//! Simple selectors: the atomic terms a compound selector is built from.

use crate::CommaSequence;
use std::fmt;

/// Weight of a class/attribute/pseudo-class selector when computing
/// specificity. Ids weigh `SPECIFICITY_BASE` squared, elements and
/// pseudo-elements weigh 1, the universal selector weighs 0.
pub const SPECIFICITY_BASE: u64 = 1000;

/// Whether a pseudo selector was written with one colon (class) or two
/// (element). The distinction is purely syntactic here; legacy single-colon
/// pseudo-elements keep the class kind they were written with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PseudoKind {
    Class,
    Element,
}

/// One atomic selector term.
///
/// `Interpolation` is only meaningful before evaluation; the flatten and
/// extend passes treat an interpolation that reaches them as an internal
/// invariant violation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleSelector {
    /// The parent reference `&`.
    Parent,
    /// `.name`
    Class(String),
    /// `#name`
    Id(String),
    /// `%name` — matches nothing unless extended.
    Placeholder(String),
    /// `*`, `ns|*`, `*|*`, `|*`. `None` is the default namespace, `Some("*")`
    /// any namespace, `Some("")` no namespace.
    Universal { namespace: Option<String> },
    /// `name`, `ns|name`, …
    Element {
        name: String,
        namespace: Option<String>,
    },
    /// `[name]`, `[name=value]`, `[ns|name^=value i]`, …
    /// The value is stored as written, quotes included.
    Attribute {
        name: String,
        namespace: Option<String>,
        operator: Option<String>,
        value: Option<String>,
        flags: Option<String>,
    },
    /// `:name`, `::name`, `:name(arg)`.
    Pseudo {
        kind: PseudoKind,
        name: String,
        arg: Option<String>,
    },
    /// A pseudo-class wrapping a full selector list, e.g. `:not(.a, .b)`.
    SelectorPseudo {
        name: String,
        selector: Box<CommaSequence>,
    },
    /// Unresolved `#{...}` interpolation, opaque to the core.
    Interpolation(String),
}

impl SimpleSelector {
    /// True for pseudo selectors of either flavor; these sort to the end of
    /// a compound selector during unification.
    pub fn is_pseudo(&self) -> bool {
        matches!(self, Self::Pseudo { .. } | Self::SelectorPseudo { .. })
    }

    pub fn is_pseudo_element(&self) -> bool {
        matches!(
            self,
            Self::Pseudo {
                kind: PseudoKind::Element,
                ..
            }
        )
    }

    /// Specificity weight of this selector alone.
    pub fn specificity(&self) -> u64 {
        match self {
            Self::Id(_) => SPECIFICITY_BASE * SPECIFICITY_BASE,
            Self::Class(_)
            | Self::Placeholder(_)
            | Self::Attribute { .. }
            | Self::SelectorPseudo { .. }
            | Self::Pseudo {
                kind: PseudoKind::Class,
                ..
            } => SPECIFICITY_BASE,
            Self::Element { .. }
            | Self::Pseudo {
                kind: PseudoKind::Element,
                ..
            } => 1,
            Self::Universal { .. } | Self::Parent | Self::Interpolation(_) => 0,
        }
    }

    /// Unify this selector into the member list of a compound selector,
    /// returning the member list of a compound matching the intersection of
    /// both, or `None` when the intersection is empty by construction (two
    /// different ids, two different pseudo-elements, clashing namespaces).
    pub fn unify(&self, sels: &[Self]) -> Option<Vec<Self>> {
        match self {
            Self::Universal { namespace } => unify_universal(namespace.as_deref(), sels),
            Self::Element { name, namespace } => {
                unify_element(name, namespace.as_deref(), sels, self)
            }
            Self::Id(name) => {
                let conflict = sels
                    .iter()
                    .any(|sel| matches!(sel, Self::Id(other) if other != name));
                if conflict {
                    return None;
                }
                self.unify_default(sels)
            }
            Self::Pseudo {
                kind: PseudoKind::Element,
                name,
                arg,
            } => {
                let conflict = sels.iter().any(|sel| {
                    matches!(
                        sel,
                        Self::Pseudo {
                            kind: PseudoKind::Element,
                            name: other_name,
                            arg: other_arg,
                        } if other_name != name || other_arg != arg
                    )
                });
                if conflict {
                    return None;
                }
                self.unify_default(sels)
            }
            _ => self.unify_default(sels),
        }
    }

    /// The common unification path: identical selectors deduplicate, pseudo
    /// selectors defer to the end, everything else appends before them.
    fn unify_default(&self, sels: &[Self]) -> Option<Vec<Self>> {
        if sels.iter().any(|sel| sel == self) {
            return Some(sels.to_vec());
        }
        let position = if self.is_pseudo() {
            if sels.last().is_some_and(Self::is_pseudo_element) {
                sels.iter()
                    .position(|sel| matches!(sel, Self::Pseudo { .. }))
            } else {
                None
            }
        } else {
            sels.iter().position(Self::is_pseudo)
        };
        let mut out = Vec::with_capacity(sels.len() + 1);
        match position {
            None => {
                out.extend_from_slice(sels);
                out.push(self.clone());
            }
            Some(index) => {
                out.extend_from_slice(&sels[..index]);
                out.push(self.clone());
                out.extend_from_slice(&sels[index..]);
            }
        }
        Some(out)
    }
}

/// Unify two namespace annotations. Returns the resolved namespace, or
/// `None` when two explicit, differing namespaces make the combination
/// impossible. A default (`None`) namespace unifies with anything; `*`
/// yields the other side's namespace.
fn unify_namespaces(ns1: Option<&str>, ns2: Option<&str>) -> Option<Option<String>> {
    let compatible = ns1 == ns2
        || ns1.is_none()
        || ns1 == Some("*")
        || ns2.is_none()
        || ns2 == Some("*");
    if !compatible {
        return None;
    }
    if ns1 == Some("*") {
        return Some(ns2.map(str::to_owned));
    }
    if ns2 == Some("*") {
        return Some(ns1.map(str::to_owned));
    }
    Some(ns1.or(ns2).map(str::to_owned))
}

fn unify_universal(
    namespace: Option<&str>,
    sels: &[SimpleSelector],
) -> Option<Vec<SimpleSelector>> {
    let first_namespace = match sels.first() {
        Some(SimpleSelector::Universal {
            namespace: other_ns,
        })
        | Some(SimpleSelector::Element {
            namespace: other_ns,
            ..
        }) => other_ns.as_deref(),
        _ => {
            // No base selector to merge namespaces with. An explicitly
            // namespaced universal must stay; a plain one is absorbed unless
            // the remainder is empty, in which case a literal `*` is re-added.
            if !(namespace.is_none() || namespace == Some("*")) {
                let mut out = vec![SimpleSelector::Universal {
                    namespace: namespace.map(str::to_owned),
                }];
                out.extend_from_slice(sels);
                return Some(out);
            }
            if !sels.is_empty() {
                return Some(sels.to_vec());
            }
            return Some(vec![SimpleSelector::Universal {
                namespace: namespace.map(str::to_owned),
            }]);
        }
    };
    let merged_ns = unify_namespaces(namespace, first_namespace)?;
    let merged_first = match &sels[0] {
        SimpleSelector::Element { name, .. } => SimpleSelector::Element {
            name: name.clone(),
            namespace: merged_ns,
        },
        _ => SimpleSelector::Universal {
            namespace: merged_ns,
        },
    };
    let mut out = vec![merged_first];
    out.extend_from_slice(&sels[1..]);
    Some(out)
}

fn unify_element(
    name: &str,
    namespace: Option<&str>,
    sels: &[SimpleSelector],
    this: &SimpleSelector,
) -> Option<Vec<SimpleSelector>> {
    let first_namespace = match sels.first() {
        Some(SimpleSelector::Universal {
            namespace: other_ns,
        }) => other_ns.as_deref(),
        Some(SimpleSelector::Element {
            name: other_name,
            namespace: other_ns,
        }) => {
            if other_name != name {
                return None;
            }
            other_ns.as_deref()
        }
        _ => {
            // The element selector becomes the new base, sorted first.
            let mut out = vec![this.clone()];
            out.extend_from_slice(sels);
            return Some(out);
        }
    };
    let merged_ns = unify_namespaces(namespace, first_namespace)?;
    let mut out = vec![SimpleSelector::Element {
        name: name.to_owned(),
        namespace: merged_ns,
    }];
    out.extend_from_slice(&sels[1..]);
    Some(out)
}

fn write_namespace(fmt: &mut fmt::Formatter<'_>, namespace: Option<&str>) -> fmt::Result {
    if let Some(ns) = namespace {
        write!(fmt, "{ns}|")?;
    }
    Ok(())
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => write!(fmt, "&"),
            Self::Class(name) => write!(fmt, ".{name}"),
            Self::Id(name) => write!(fmt, "#{name}"),
            Self::Placeholder(name) => write!(fmt, "%{name}"),
            Self::Universal { namespace } => {
                write_namespace(fmt, namespace.as_deref())?;
                write!(fmt, "*")
            }
            Self::Element { name, namespace } => {
                write_namespace(fmt, namespace.as_deref())?;
                write!(fmt, "{name}")
            }
            Self::Attribute {
                name,
                namespace,
                operator,
                value,
                flags,
            } => {
                write!(fmt, "[")?;
                write_namespace(fmt, namespace.as_deref())?;
                write!(fmt, "{name}")?;
                if let (Some(op), Some(val)) = (operator, value) {
                    write!(fmt, "{op}{val}")?;
                }
                if let Some(flag_text) = flags {
                    write!(fmt, " {flag_text}")?;
                }
                write!(fmt, "]")
            }
            Self::Pseudo { kind, name, arg } => {
                let colons = match kind {
                    PseudoKind::Class => ":",
                    PseudoKind::Element => "::",
                };
                write!(fmt, "{colons}{name}")?;
                if let Some(arg_text) = arg {
                    write!(fmt, "({arg_text})")?;
                }
                Ok(())
            }
            Self::SelectorPseudo { name, selector } => {
                write!(fmt, ":{name}({selector})")
            }
            Self::Interpolation(text) => write!(fmt, "#{{{text}}}"),
        }
    }
}
