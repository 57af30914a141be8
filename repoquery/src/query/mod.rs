//! Query method parsing: keyword vocabulary, predicate tree and the parser.

mod keyword;
mod parser;
mod part;
mod tree;

pub use keyword::{Keyword, KeywordToken, KeywordVocabulary};
pub use parser::QueryMethodParser;
pub use part::{AndGroup, IgnoreCase, Part};
pub use tree::{Direction, Intent, Order, PredicateTree};
