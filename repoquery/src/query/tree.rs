use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use super::{AndGroup, IgnoreCase, KeywordVocabulary, Part};
use crate::path::PropertyPath;

/// Selection intent denoted by the introducer of a method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Find,
    Count,
    Exists,
    Delete,
    Stream,
}

impl Intent {
    /// Introducer written when rendering a tree back into a method name.
    pub fn introducer(&self) -> &'static str {
        match self {
            Intent::Find => "find",
            Intent::Count => "count",
            Intent::Exists => "exists",
            Intent::Delete => "delete",
            Intent::Stream => "stream",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.introducer())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn token(&self) -> &'static str {
        match self {
            Direction::Asc => "Asc",
            Direction::Desc => "Desc",
        }
    }
}

/// One entry of the `OrderBy` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub property: PropertyPath,
    pub direction: Direction,
    pub ignore_case: bool,
}

/// Parsed form of a query method name: OR-connected groups of AND-connected parts
/// plus ordering, distinct and limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredicateTree {
    pub(crate) intent: Intent,
    pub(crate) distinct: bool,
    pub(crate) limit: Option<NonZeroUsize>,
    pub(crate) or_groups: Vec<AndGroup>,
    pub(crate) ordering: Vec<Order>,
    pub(crate) root_type: String,
    #[serde(skip)]
    pub(crate) separator: char,
}

impl PredicateTree {
    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn limit(&self) -> Option<NonZeroUsize> {
        self.limit
    }

    pub fn or_groups(&self) -> &[AndGroup] {
        &self.or_groups
    }

    pub fn ordering(&self) -> &[Order] {
        &self.ordering
    }

    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    /// Path separator the tree was parsed with; reused by [`Self::canonical`].
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Every part of every group, in method-name order.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.or_groups.iter().flat_map(AndGroup::iter)
    }

    pub fn has_predicate(&self) -> bool {
        self.parts().next().is_some()
    }

    pub fn is_count(&self) -> bool {
        self.intent == Intent::Count
    }

    pub fn is_exists(&self) -> bool {
        self.intent == Intent::Exists
    }

    pub fn is_delete(&self) -> bool {
        self.intent == Intent::Delete
    }

    pub fn is_limiting(&self) -> bool {
        self.limit.is_some()
    }

    /// Arguments a method with this name has to bind, summed over all parts.
    pub fn argument_count(&self) -> usize {
        self.parts().map(Part::argument_count).sum()
    }

    /// Render the tree back into a method name that parses to an equal tree.
    pub fn canonical(&self, vocabulary: &KeywordVocabulary) -> String {
        let separator = self.separator;
        let mut out = String::from(self.intent.introducer());
        if self.distinct {
            out.push_str("Distinct");
        }
        match self.limit.map(NonZeroUsize::get) {
            Some(1) => out.push_str("First"),
            Some(limit) => out.push_str(&format!("Top{limit}")),
            None => {}
        }

        let all_ignore_case = self.parts().any(|part| part.ignore_case() == IgnoreCase::WhenPossible)
            || self.ordering.iter().any(|order| order.ignore_case);
        if !self.has_predicate() && self.ordering.is_empty() && !all_ignore_case {
            return out;
        }

        out.push_str("By");
        let criteria = self
            .or_groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|part| part.canonical(vocabulary, separator))
                    .collect::<Vec<_>>()
                    .join("And")
            })
            .collect::<Vec<_>>()
            .join("Or");
        out.push_str(&criteria);
        if all_ignore_case {
            out.push_str("AllIgnoreCase");
        }

        if !self.ordering.is_empty() {
            out.push_str("OrderBy");
            for order in &self.ordering {
                out.push_str(&order.property.canonical(separator));
                out.push_str(order.direction.token());
            }
        }
        out
    }
}
