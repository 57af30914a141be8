use serde::Serialize;

use super::{Keyword, KeywordVocabulary};
use crate::path::PropertyPath;

/// Case sensitivity of a single part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreCase {
    #[default]
    Never,
    /// Requested on the part itself with `IgnoreCase`.
    Always,
    /// Requested for the whole method with `AllIgnoreCase`; applies where the
    /// property type supports it.
    WhenPossible,
}

/// One atomic predicate: a property path compared through a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    property: PropertyPath,
    keyword: Keyword,
    ignore_case: IgnoreCase,
}

impl Part {
    pub fn new(property: PropertyPath, keyword: Keyword, ignore_case: IgnoreCase) -> Self {
        Self {
            property,
            keyword,
            ignore_case,
        }
    }

    pub fn property(&self) -> &PropertyPath {
        &self.property
    }

    pub fn keyword(&self) -> &Keyword {
        &self.keyword
    }

    pub fn ignore_case(&self) -> IgnoreCase {
        self.ignore_case
    }

    /// Bound arguments this part consumes.
    pub fn argument_count(&self) -> usize {
        self.keyword.arity()
    }

    /// Method-name spelling of the part without the `AllIgnoreCase` marker.
    pub fn canonical(&self, vocabulary: &KeywordVocabulary, separator: char) -> String {
        let mut out = self.property.canonical(separator);
        if let Some(token) = vocabulary.token_for(&self.keyword) {
            out.push_str(token);
        }
        if self.ignore_case == IgnoreCase::Always {
            out.push_str("IgnoreCase");
        }
        out
    }
}

/// Parts joined by `And`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct AndGroup(Vec<Part>);

impl AndGroup {
    pub fn new(parts: Vec<Part>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[Part] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a AndGroup {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Part>> for AndGroup {
    fn from(parts: Vec<Part>) -> Self {
        Self(parts)
    }
}
