//! Relationship type filter applied to every edge lookup of a search.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::{FlavorError, Result};

const MAX_TAG_LEN: usize = 100;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.:-]+$").expect("Invalid regex pattern"))
}

/// Check that `tag` is usable as a relationship type.
///
/// The importer applies the same rule, so every stored type can be filtered on.
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.len() > MAX_TAG_LEN || !tag_pattern().is_match(tag) {
        return Err(FlavorError::InvalidParameter(format!(
            "relationship type '{}' must be 1-{} characters of letters, digits, '_', '-', '.' or ':'",
            tag, MAX_TAG_LEN
        )));
    }
    Ok(())
}

/// Restricts which relationship types a search may traverse.
///
/// Tags are compared exactly. A well-formed tag that no stored edge carries
/// is accepted and simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipFilter {
    types: Option<BTreeSet<String>>,
}

impl RelationshipFilter {
    /// Traverse every relationship type.
    pub fn all() -> Self {
        Self { types: None }
    }

    /// Traverse only the given types. An empty iterator still means "only these",
    /// i.e. nothing; use [`RelationshipFilter::parse`] for request input.
    pub fn only<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: Some(types.into_iter().map(Into::into).collect()),
        }
    }

    /// Build a filter from raw request values.
    ///
    /// Each value may hold several comma-separated tags. Blank pieces are dropped;
    /// if nothing remains the filter allows every type.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        let mut types = BTreeSet::new();
        for value in raw {
            for tag in value.as_ref().split(',').map(str::trim).filter(|t| !t.is_empty()) {
                validate_tag(tag)?;
                types.insert(tag.to_string());
            }
        }

        if types.is_empty() {
            Ok(Self::all())
        } else {
            Ok(Self { types: Some(types) })
        }
    }

    pub fn is_all(&self) -> bool {
        self.types.is_none()
    }

    pub fn matches(&self, relationship_type: &str) -> bool {
        match &self.types {
            None => true,
            Some(types) => types.contains(relationship_type),
        }
    }

    /// The allowed types in sorted order, or `None` when unrestricted.
    pub fn types(&self) -> Option<Vec<&str>> {
        self.types
            .as_ref()
            .map(|types| types.iter().map(String::as_str).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_matches_everything() {
        let filter = RelationshipFilter::all();
        assert!(filter.is_all());
        assert!(filter.matches("contains"));
        assert!(filter.types().is_none());
    }

    #[test]
    fn test_only_restricts() {
        let filter = RelationshipFilter::only(["contains"]);
        assert!(filter.matches("contains"));
        assert!(!filter.matches("found_in"));
        assert_eq!(filter.types(), Some(vec!["contains"]));
    }

    #[test]
    fn test_parse_comma_separated_and_repeated() {
        let filter = RelationshipFilter::parse(&["contains, found_in", "related_to"]).unwrap();
        assert_eq!(filter.types(), Some(vec!["contains", "found_in", "related_to"]));
    }

    #[test]
    fn test_parse_blank_means_all() {
        assert!(RelationshipFilter::parse(&[" , ", ""]).unwrap().is_all());
        assert!(RelationshipFilter::parse::<&str>(&[]).unwrap().is_all());
    }

    #[test]
    fn test_parse_rejects_malformed_tag() {
        let err = RelationshipFilter::parse(&["contains; DROP TABLE"]).unwrap_err();
        assert!(matches!(err, FlavorError::InvalidParameter(_)));

        let too_long = "x".repeat(MAX_TAG_LEN + 1);
        assert!(RelationshipFilter::parse(&[too_long]).is_err());
    }

    #[test]
    fn test_parse_accepts_unknown_well_formed_tag() {
        let filter = RelationshipFilter::parse(&["never_stored"]).unwrap();
        assert!(!filter.matches("contains"));
    }

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag("rich_in").is_ok());
        assert!(validate_tag("ns:found-in.v2").is_ok());
        assert!(validate_tag("rich in").is_err());
        assert!(validate_tag("a,b").is_err());
        assert!(validate_tag("").is_err());
    }
}
