//! Media query model and query-list intersection.

use log::debug;
use std::fmt;

/// One media query, e.g. `only screen and (max-width: 600px)`. Features are
/// kept as resolved `(name: value)` text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MediaQuery {
    pub modifier: Option<String>,
    pub media_type: Option<String>,
    pub features: Vec<String>,
}

impl MediaQuery {
    pub fn new(
        modifier: Option<String>,
        media_type: Option<String>,
        features: Vec<String>,
    ) -> Self {
        Self {
            modifier,
            media_type,
            features,
        }
    }

    /// A plain `type` query.
    pub fn for_type(media_type: &str) -> Self {
        Self::new(None, Some(media_type.to_owned()), Vec::new())
    }

    fn modifier_text(&self) -> String {
        self.modifier
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    fn type_text(&self) -> String {
        self.media_type
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// Intersect this query with an enclosing one. Returns `None` when the
    /// two cannot both apply (`screen` inside `print`, `not screen` inside
    /// `screen`, …). Feature lists concatenate, enclosing first.
    pub fn merge(&self, other: &Self) -> Option<Self> {
        let modifier1 = self.modifier_text();
        let modifier2 = other.modifier_text();
        let mut type1 = self.type_text();
        let mut type2 = other.type_text();
        if type1.is_empty() {
            type1.clone_from(&type2);
        }
        if type2.is_empty() {
            type2.clone_from(&type1);
        }
        let (modifier, media_type) = if (modifier1 == "not") ^ (modifier2 == "not") {
            if type1 == type2 {
                return None;
            }
            if modifier1 == "not" {
                (modifier2, type2)
            } else {
                (modifier1, type1)
            }
        } else if modifier1 == "not" && modifier2 == "not" {
            // `not` queries only intersect if they exclude the same type.
            if type1 != type2 {
                return None;
            }
            ("not".to_owned(), type1)
        } else if type1 != type2 {
            return None;
        } else {
            let modifier = if modifier1.is_empty() {
                modifier2
            } else {
                modifier1
            };
            (modifier, type1)
        };
        let mut features = other.features.clone();
        features.extend(self.features.iter().cloned());
        Some(Self::new(
            Some(modifier).filter(|text| !text.is_empty()),
            Some(media_type).filter(|text| !text.is_empty()),
            features,
        ))
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(modifier) = &self.modifier {
            parts.push(modifier.clone());
        }
        if let Some(media_type) = &self.media_type {
            parts.push(media_type.clone());
        }
        for feature in &self.features {
            if !parts.is_empty() {
                parts.push("and".to_owned());
            }
            parts.push(format!("({feature})"));
        }
        write!(fmt, "{}", parts.join(" "))
    }
}

/// A comma-separated list of media queries, as carried by a `@media` node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MediaQueryList {
    pub queries: Vec<MediaQuery>,
}

impl MediaQueryList {
    pub fn new(queries: Vec<MediaQuery>) -> Self {
        Self { queries }
    }

    /// Intersect two query lists pairwise, dropping pairs that cannot both
    /// apply. Returns `None` when no combination survives, meaning the inner
    /// `@media` can never match inside the outer one.
    pub fn merge(&self, other: &Self) -> Option<Self> {
        let mut merged = Vec::new();
        for own in &self.queries {
            for theirs in &other.queries {
                if let Some(query) = own.merge(theirs) {
                    merged.push(query);
                }
            }
        }
        if merged.is_empty() {
            debug!("media queries \"{self}\" and \"{other}\" cannot intersect");
            return None;
        }
        Some(Self::new(merged))
    }
}

impl fmt::Display for MediaQueryList {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.queries.iter().map(|query| query.to_string()).collect();
        write!(fmt, "{}", rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::{MediaQuery, MediaQueryList};

    fn query(modifier: Option<&str>, media_type: Option<&str>, features: &[&str]) -> MediaQuery {
        MediaQuery::new(
            modifier.map(str::to_owned),
            media_type.map(str::to_owned),
            features.iter().map(|feature| (*feature).to_owned()).collect(),
        )
    }

    #[test]
    fn same_type_queries_concatenate_features() {
        let outer = query(None, Some("screen"), &["min-width: 100px"]);
        let inner = query(None, Some("screen"), &["max-width: 300px"]);
        let merged = inner.merge(&outer).unwrap();
        assert_eq!(
            merged.to_string(),
            "screen and (min-width: 100px) and (max-width: 300px)"
        );
    }

    #[test]
    fn differing_types_cannot_intersect() {
        let outer = query(None, Some("print"), &[]);
        let inner = query(None, Some("screen"), &[]);
        assert_eq!(inner.merge(&outer), None);
    }

    #[test]
    fn typeless_query_inherits_the_other_type() {
        let outer = query(None, Some("screen"), &[]);
        let inner = query(None, None, &["color"]);
        let merged = inner.merge(&outer).unwrap();
        assert_eq!(merged.to_string(), "screen and (color)");
    }

    #[test]
    fn not_against_other_type_keeps_the_positive_query() {
        let outer = query(Some("not"), Some("print"), &[]);
        let inner = query(None, Some("screen"), &[]);
        let merged = inner.merge(&outer).unwrap();
        assert_eq!(merged.to_string(), "screen");
    }

    #[test]
    fn not_against_same_type_is_empty() {
        let outer = query(Some("not"), Some("screen"), &[]);
        let inner = query(None, Some("screen"), &[]);
        assert_eq!(inner.merge(&outer), None);
    }

    #[test]
    fn list_merge_drops_impossible_pairs() {
        let outer = MediaQueryList::new(vec![
            query(None, Some("screen"), &[]),
            query(None, Some("print"), &[]),
        ]);
        let inner = MediaQueryList::new(vec![query(None, Some("screen"), &["color"])]);
        let merged = inner.merge(&outer).unwrap();
        assert_eq!(merged.to_string(), "screen and (color)");
    }

    #[test]
    fn list_merge_with_no_survivors_is_none() {
        let outer = MediaQueryList::new(vec![query(None, Some("print"), &[])]);
        let inner = MediaQueryList::new(vec![query(None, Some("screen"), &[])]);
        assert_eq!(inner.merge(&outer), None);
    }
}
