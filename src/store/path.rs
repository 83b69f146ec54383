//! Document and collection paths
//!
//! Paths follow the hierarchical document-store layout:
//! - Segments separated by `/`, no leading or trailing slash
//! - Odd segment count = collection (`cartes/r1/characters`)
//! - Even segment count = document (`cartes/r1/characters/c1`)
//! - Segments are non-empty, not `.` or `..`, and not of the reserved `__name__` form
//! - Max 1024 bytes total

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// Maximum encoded length of a path
pub const MAX_PATH_LEN: usize = 1024;

/// Validation errors for document paths
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path cannot be empty")]
    Empty,

    #[error("path must be {MAX_PATH_LEN} bytes or less")]
    TooLong,

    #[error("path cannot contain empty segments")]
    EmptySegment,

    #[error("segment '{0}' is reserved")]
    ReservedSegment(String),

    #[error("'{0}' does not name a collection (odd segment count expected)")]
    NotACollection(String),

    #[error("'{0}' does not name a document (even segment count expected)")]
    NotADocument(String),
}

/// Reserved identifiers: `.`, `..` and anything wrapped in double underscores
static RESERVED_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\.{1,2}|__.*__)$").expect("static regex"));

fn validate_segments(path: &str) -> Result<usize, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if path.len() > MAX_PATH_LEN {
        return Err(PathError::TooLong);
    }

    let mut count = 0;
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(PathError::EmptySegment);
        }
        if RESERVED_SEGMENT.is_match(segment) {
            return Err(PathError::ReservedSegment(segment.to_string()));
        }
        count += 1;
    }
    Ok(count)
}

/// Validate a single segment (callers reject `/` first)
fn validate_id(id: &str) -> Result<(), PathError> {
    validate_segments(id).map(|_| ())
}

/// Path to a collection of documents
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Parse and validate a collection path
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let count = validate_segments(path)?;
        if count % 2 == 0 {
            return Err(PathError::NotACollection(path.to_string()));
        }
        Ok(Self(path.to_string()))
    }

    /// Path of a document inside this collection
    pub fn doc(&self, id: &str) -> Result<DocPath, PathError> {
        if id.contains('/') {
            return Err(PathError::NotADocument(format!("{}/{}", self.0, id)));
        }
        validate_id(id)?;
        Ok(DocPath(format!("{}/{}", self.0, id)))
    }

    /// Final segment of the path
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `doc` lives directly inside this collection
    pub fn contains(&self, doc: &DocPath) -> bool {
        doc.0
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|id| !id.contains('/'))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path to a single document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath(String);

impl DocPath {
    /// Parse and validate a document path
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let count = validate_segments(path)?;
        if count % 2 != 0 {
            return Err(PathError::NotADocument(path.to_string()));
        }
        Ok(Self(path.to_string()))
    }

    /// Document id (final segment)
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Collection holding this document
    pub fn parent(&self) -> CollectionPath {
        match self.0.rfind('/') {
            Some(pos) => CollectionPath(self.0[..pos].to_string()),
            // Unreachable for validated paths: documents have at least two segments
            None => CollectionPath(self.0.clone()),
        }
    }

    /// Sub-collection below this document
    pub fn collection(&self, name: &str) -> Result<CollectionPath, PathError> {
        if name.contains('/') {
            return Err(PathError::NotACollection(format!("{}/{}", self.0, name)));
        }
        validate_id(name)?;
        Ok(CollectionPath(format!("{}/{}", self.0, name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_and_document_parity() {
        assert!(CollectionPath::parse("users").is_ok());
        assert!(CollectionPath::parse("cartes/r1/characters").is_ok());
        assert_eq!(
            CollectionPath::parse("users/u1"),
            Err(PathError::NotACollection("users/u1".to_string()))
        );

        assert!(DocPath::parse("users/u1").is_ok());
        assert_eq!(
            DocPath::parse("cartes/r1/characters"),
            Err(PathError::NotADocument("cartes/r1/characters".to_string()))
        );
    }

    #[test]
    fn test_empty_and_malformed() {
        assert_eq!(CollectionPath::parse(""), Err(PathError::Empty));
        assert_eq!(DocPath::parse("users//u1"), Err(PathError::EmptySegment));
        assert_eq!(DocPath::parse("/users/u1"), Err(PathError::EmptySegment));
        assert_eq!(CollectionPath::parse("users/"), Err(PathError::EmptySegment));
    }

    #[test]
    fn test_reserved_segments() {
        assert_eq!(
            DocPath::parse("users/__meta__"),
            Err(PathError::ReservedSegment("__meta__".to_string()))
        );
        assert_eq!(
            DocPath::parse("users/.."),
            Err(PathError::ReservedSegment("..".to_string()))
        );
        // Single leading underscore is fine
        assert!(DocPath::parse("users/_draft").is_ok());
    }

    #[test]
    fn test_too_long() {
        let long = format!("users/{}", "a".repeat(MAX_PATH_LEN));
        assert_eq!(DocPath::parse(&long), Err(PathError::TooLong));
    }

    #[test]
    fn test_navigation() {
        let chars = CollectionPath::parse("cartes/r1/characters").unwrap();
        let doc = chars.doc("c1").unwrap();
        assert_eq!(doc.as_str(), "cartes/r1/characters/c1");
        assert_eq!(doc.id(), "c1");
        assert_eq!(doc.parent(), chars);
        assert_eq!(chars.name(), "characters");

        let reports = DocPath::parse("cartes/r1/combat/c1")
            .unwrap()
            .collection("rapport")
            .unwrap();
        assert_eq!(reports.as_str(), "cartes/r1/combat/c1/rapport");
    }

    #[test]
    fn test_ids_cannot_contain_slash() {
        let chars = CollectionPath::parse("cartes/r1/characters").unwrap();
        assert!(chars.doc("a/b").is_err());
        assert!(chars.doc("").is_err());
    }

    #[test]
    fn test_contains() {
        let chars = CollectionPath::parse("cartes/r1/characters").unwrap();
        assert!(chars.contains(&DocPath::parse("cartes/r1/characters/c1").unwrap()));
        assert!(!chars.contains(&DocPath::parse("cartes/r1/charactersx/c1").unwrap()));
        assert!(!chars.contains(
            &DocPath::parse("cartes/r1/characters/c1/notes/n1").unwrap()
        ));
        assert!(!chars.contains(&DocPath::parse("cartes/r2/characters/c1").unwrap()));
    }

    #[test]
    fn test_names_with_spaces_and_accents() {
        // Bonus collections are keyed by character display name
        let bonus = CollectionPath::parse("Bonus/r1/Élise la Brave").unwrap();
        assert_eq!(bonus.name(), "Élise la Brave");
    }
}
