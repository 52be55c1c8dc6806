//! Field paths and the validation issue collector.
//!
//! Validation passes push every failure into an [`Issues`] collector instead of
//! returning on the first one. The collector is turned into an immutable
//! [`ValidationErrors`] list only when the pass is over.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One step in a [`FieldPath`]: an object key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{}", i),
            PathSegment::Key(k) => f.write_str(k),
        }
    }
}

/// Location of a value inside a document, e.g. `spec.nodes.0.type`.
///
/// Serializes as a list (`["spec", "nodes", 0, "type"]`), displays dot-joined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(SmallVec<[PathSegment; 6]>);

impl FieldPath {
    pub fn root() -> Self { Self::default() }

    /// Parse a dot-joined path; purely numeric segments become indices.
    pub fn from_dotted(s: &str) -> Self {
        let mut p = Self::root();
        for seg in s.split('.').filter(|s| !s.is_empty()) {
            match seg.parse::<usize>() {
                Ok(i) => p.0.push(PathSegment::Index(i)),
                Err(_) => p.0.push(PathSegment::Key(seg.to_string())),
            }
        }
        p
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut p = self.clone();
        p.0.push(PathSegment::Key(key.into()));
        p
    }

    pub fn index(&self, i: usize) -> Self {
        let mut p = self.clone();
        p.0.push(PathSegment::Index(i));
        p
    }

    pub fn is_root(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 { f.write_str(".")?; }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

/// Classification of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    GreaterThanEqual,
    LessThanEqual,
    TooShort,
    TooLong,
    StringPatternMismatch,
    Enum,
    ValueError,
    TypeError,
    Duplicate,
    LengthMismatch,
    ReferentialIntegrity,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Missing => "missing",
            IssueKind::GreaterThanEqual => "greater_than_equal",
            IssueKind::LessThanEqual => "less_than_equal",
            IssueKind::TooShort => "too_short",
            IssueKind::TooLong => "too_long",
            IssueKind::StringPatternMismatch => "string_pattern_mismatch",
            IssueKind::Enum => "enum",
            IssueKind::ValueError => "value_error",
            IssueKind::TypeError => "type_error",
            IssueKind::Duplicate => "duplicate",
            IssueKind::LengthMismatch => "length_mismatch",
            IssueKind::ReferentialIntegrity => "referential_integrity",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A single `(location, message, kind)` validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub loc: FieldPath,
    pub msg: String,
    pub kind: IssueKind,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.loc.is_root() {
            write!(f, "{} [{}]", self.msg, self.kind)
        } else {
            write!(f, "{}: {} [{}]", self.loc, self.msg, self.kind)
        }
    }
}

/// Mutable collector threaded through a validation pass.
#[derive(Debug, Default)]
pub struct Issues {
    errors: Vec<FieldError>,
}

impl Issues {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, loc: FieldPath, kind: IssueKind, msg: impl Into<String>) {
        self.errors.push(FieldError { loc, msg: msg.into(), kind });
    }

    pub fn missing(&mut self, loc: FieldPath) {
        self.push(loc, IssueKind::Missing, "field required");
    }

    pub fn min_len(&mut self, loc: &FieldPath, value: &str, min: usize) -> bool {
        let n = value.chars().count();
        if n < min {
            self.push(loc.clone(), IssueKind::TooShort, format!("ensure this value has at least {} characters", min));
            return false;
        }
        true
    }

    pub fn max_len(&mut self, loc: &FieldPath, value: &str, max: usize) -> bool {
        let n = value.chars().count();
        if n > max {
            self.push(loc.clone(), IssueKind::TooLong, format!("ensure this value has at most {} characters", max));
            return false;
        }
        true
    }

    pub fn non_negative(&mut self, loc: &FieldPath, value: i64) -> bool {
        if value < 0 {
            self.push(loc.clone(), IssueKind::GreaterThanEqual, "ensure this value is greater than or equal to 0");
            return false;
        }
        true
    }

    /// Move every issue of `other` into this collector.
    pub fn absorb(&mut self, other: ValidationErrors) {
        self.errors.extend(other.0);
    }

    pub fn len(&self) -> usize { self.errors.len() }

    pub fn is_empty(&self) -> bool { self.errors.is_empty() }

    pub fn into_errors(self) -> ValidationErrors { ValidationErrors(self.errors) }

    /// `Ok(())` when nothing was collected, the full list otherwise.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() { Ok(()) } else { Err(self.into_errors()) }
    }
}

/// Immutable, never-truncated list of validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(transparent)]
#[error("{}", render(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn render(errors: &[FieldError]) -> String {
    let mut out = format!(
        "{} validation error{}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
    for e in errors {
        out.push_str("\n  ");
        out.push_str(&e.to_string());
    }
    out
}

impl ValidationErrors {
    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> { self.0.iter() }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}
