//! `@at-root` exclusion queries.

use crate::error::{ErrorKind, SassError};
use std::collections::HashSet;
use std::fmt;

/// Whether the listed names are the nodes to keep (`with`) or the nodes to
/// move out of (`without`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtRootKind {
    With,
    Without,
}

/// The resolved exclusion set of an `@at-root` node. Names are directive
/// names without their `@`, plus the special tokens `rule` and `all`.
/// A plain `@at-root` is `without: (rule)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtRootQuery {
    kind: AtRootKind,
    names: HashSet<String>,
}

impl AtRootQuery {
    pub fn new(kind: AtRootKind, names: HashSet<String>, line: u32) -> Result<Self, SassError> {
        if names.is_empty() {
            return Err(SassError::new(
                ErrorKind::MalformedAtRootQuery,
                "Invalid @at-root query: expected at least one directive name",
                line,
            ));
        }
        Ok(Self { kind, names })
    }

    /// The default `@at-root` query: move out of all enclosing rules.
    pub fn without_rule() -> Self {
        Self {
            kind: AtRootKind::Without,
            names: std::iter::once("rule".to_owned()).collect(),
        }
    }

    /// Whether this query excludes nodes named `name` (`rule` for style
    /// rules, a directive name otherwise).
    pub fn excludes_name(&self, name: &str) -> bool {
        if self.names.contains("all") {
            return self.kind == AtRootKind::Without;
        }
        (self.kind == AtRootKind::Without) == self.names.contains(name)
    }
}

impl fmt::Display for AtRootQuery {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.kind {
            AtRootKind::With => "with",
            AtRootKind::Without => "without",
        };
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        write!(fmt, "({keyword}: {})", names.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::{AtRootKind, AtRootQuery};
    use std::collections::HashSet;

    fn names(list: &[&str]) -> HashSet<String> {
        list.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn default_query_excludes_only_rules() {
        let query = AtRootQuery::without_rule();
        assert!(query.excludes_name("rule"));
        assert!(!query.excludes_name("media"));
    }

    #[test]
    fn without_excludes_the_listed_names() {
        let query = AtRootQuery::new(AtRootKind::Without, names(&["media"]), 1).unwrap();
        assert!(query.excludes_name("media"));
        assert!(!query.excludes_name("rule"));
        assert!(!query.excludes_name("supports"));
    }

    #[test]
    fn with_excludes_everything_else() {
        let query = AtRootQuery::new(AtRootKind::With, names(&["media"]), 1).unwrap();
        assert!(!query.excludes_name("media"));
        assert!(query.excludes_name("rule"));
        assert!(query.excludes_name("supports"));
    }

    #[test]
    fn without_all_excludes_everything() {
        let query = AtRootQuery::new(AtRootKind::Without, names(&["all"]), 1).unwrap();
        assert!(query.excludes_name("rule"));
        assert!(query.excludes_name("media"));
    }

    #[test]
    fn with_all_excludes_nothing() {
        let query = AtRootQuery::new(AtRootKind::With, names(&["all"]), 1).unwrap();
        assert!(!query.excludes_name("rule"));
        assert!(!query.excludes_name("media"));
    }

    #[test]
    fn empty_name_set_is_malformed() {
        assert!(AtRootQuery::new(AtRootKind::Without, HashSet::new(), 4).is_err());
    }
}
