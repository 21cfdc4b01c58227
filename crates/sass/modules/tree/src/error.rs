//! The structured error produced by the flatten and extend passes.

use sass_selectors::SelectorError;
use std::fmt;
use thiserror::Error;

/// Classification of a compilation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// An `@extend` target contains combinators, parent references, or
    /// anything but a single compound selector, or the extending rule cannot
    /// host an extension.
    InvalidExtendTarget,
    /// An `@extend` inside a directive reaches for a selector defined
    /// outside its own directive nesting.
    ExtendAcrossDirectiveBoundary,
    /// A required (non-`!optional`) `@extend` never matched anything, or
    /// matched but never unified.
    ExtendNotSatisfied,
    /// An `@at-root` exclusion set that cannot be interpreted.
    MalformedAtRootQuery,
    /// Malformed selector text or invalid parent-reference use.
    SelectorParse,
    /// An unresolved interpolation reached the core. Always an upstream bug,
    /// never user-recoverable.
    InternalInvariantViolation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidExtendTarget => "invalid extend target",
            Self::ExtendAcrossDirectiveBoundary => "extend across directive boundary",
            Self::ExtendNotSatisfied => "extend not satisfied",
            Self::MalformedAtRootQuery => "malformed at-root query",
            Self::SelectorParse => "selector parse error",
            Self::InternalInvariantViolation => "internal invariant violation",
        };
        write!(fmt, "{label}")
    }
}

/// A fatal compilation error: message, 1-based source line, optional
/// filename, and an optional trace label naming the directive or rule the
/// error was detected inside.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct SassError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: u32,
    pub filename: Option<String>,
    pub trace: Option<String>,
}

impl SassError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            filename: None,
            trace: None,
        }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: Option<&str>) -> Self {
        if self.filename.is_none() {
            self.filename = filename.map(str::to_owned);
        }
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Wrap a selector-model error detected at `line`.
    pub fn from_selector(error: &SelectorError, line: u32) -> Self {
        Self::new(ErrorKind::SelectorParse, error.message.clone(), line)
    }

    /// Human-readable source location, e.g. `style.scss:12` or `line 12`.
    pub fn location(&self) -> String {
        match &self.filename {
            Some(filename) => format!("{filename}:{}", self.line),
            None => format!("line {}", self.line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, SassError};

    #[test]
    fn location_includes_filename_when_known() {
        let bare = SassError::new(ErrorKind::ExtendNotSatisfied, "nope", 12);
        assert_eq!(bare.location(), "line 12");
        let with_file = bare.with_filename(Some("style.scss"));
        assert_eq!(with_file.location(), "style.scss:12");
    }

    #[test]
    fn display_is_the_message() {
        let error = SassError::new(ErrorKind::MalformedAtRootQuery, "bad query", 3);
        assert_eq!(error.to_string(), "bad query");
    }
}
