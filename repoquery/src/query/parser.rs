//! Method-name parser.
//!
//! `findDistinctTop3ByAddressCityAndAgeGreaterThanOrNameIgnoreCaseOrderByAgeDesc`
//! is read as introducer (`find`), subject (`DistinctTop3`), criteria and ordering.
//! Criteria are split on `Or`, then `And`, only where both sides of the split
//! parse; every resulting segment is a property path followed by an optional
//! keyword token.

use std::num::NonZeroUsize;
use std::sync::Arc;

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{AndGroup, Direction, IgnoreCase, Intent, Keyword, KeywordVocabulary, Order, Part, PredicateTree};
use crate::config::{IntroducerSpec, ParserConfig};
use crate::errors::{ConfigError, PathReferenceError, QuerySyntaxError, SyntaxErrorKind};
use crate::mapping::EntityRegistry;
use crate::path::{PathResolver, PropertyPath};

static LIMIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(First|Top)(\d*)(?:\p{Lu}|$)").expect("valid limit pattern"));

const BY: &str = "By";
const ORDER_BY: &str = "OrderBy";
const OR: &str = "Or";
const AND: &str = "And";
const ALL_IGNORE_CASE: [&str; 2] = ["AllIgnoringCase", "AllIgnoreCase"];
const IGNORE_CASE: [&str; 2] = ["IgnoringCase", "IgnoreCase"];

/// Parses query method names into [`PredicateTree`]s against a shared registry.
#[derive(Debug, Clone)]
pub struct QueryMethodParser {
    registry: Arc<EntityRegistry>,
    vocabulary: KeywordVocabulary,
    /// Longest prefix first.
    introducers: Vec<IntroducerSpec>,
    separator: char,
}

/// A criteria or ordering fragment and its byte offset in the method name.
#[derive(Debug, Clone, Copy)]
struct Span<'m> {
    text: &'m str,
    offset: usize,
}

impl<'m> Span<'m> {
    fn new(text: &'m str, offset: usize) -> Self {
        Self { text, offset }
    }

    fn slice(&self, start: usize, end: usize) -> Span<'m> {
        Span::new(&self.text[start..end], self.offset + start)
    }

    fn after(&self, start: usize) -> Span<'m> {
        self.slice(start, self.text.len())
    }

    fn before(&self, end: usize) -> Span<'m> {
        self.slice(0, end)
    }
}

impl QueryMethodParser {
    /// Parser with the default introducers and keyword vocabulary.
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        let config = ParserConfig::default();
        Self {
            registry,
            vocabulary: KeywordVocabulary::builtin(),
            introducers: sorted_introducers(&config),
            separator: config.separator,
        }
    }

    pub fn with_config(registry: Arc<EntityRegistry>, config: &ParserConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            registry,
            vocabulary: config.vocabulary()?,
            introducers: sorted_introducers(config),
            separator: config.separator,
        })
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    pub fn vocabulary(&self) -> &KeywordVocabulary {
        &self.vocabulary
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Resolve a single property path with this parser's separator.
    pub fn resolve_path(&self, source: &str, root_type: &str) -> Result<PropertyPath, PathReferenceError> {
        self.resolver().resolve(source, root_type)
    }

    fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(&self.registry).with_separator(self.separator)
    }

    pub fn parse(&self, method: &str, root_type: &str) -> Result<PredicateTree, QuerySyntaxError> {
        if method.is_empty() {
            return Err(QuerySyntaxError::new(SyntaxErrorKind::EmptyMethodName, method, 0));
        }
        debug!("parsing `{method}` against `{root_type}`");

        let mut tree = PredicateTree {
            intent: Intent::Find,
            distinct: false,
            limit: None,
            or_groups: Vec::new(),
            ordering: Vec::new(),
            root_type: root_type.to_string(),
            separator: self.separator,
        };

        let body = match self.introducer(method) {
            Some(introducer) => {
                tree.intent = introducer.intent;
                let rest = Span::new(method, 0).after(introducer.prefix.len());
                let (subject, body) = split_subject(rest);
                tree.distinct = subject.text.contains("Distinct");
                tree.limit = parse_limit(subject)?;
                body
            }
            // a bare criteria string selects with the default intent
            None => Span::new(method, 0),
        };

        let (criteria, ordering) = split_order_by(body)?;
        let (criteria, all_ignore_case) = strip_all_ignore_case(criteria);

        let context = Context {
            parser: self,
            resolver: self.resolver(),
            root_type,
            all_ignore_case,
        };
        if !criteria.text.is_empty() {
            tree.or_groups = context.parse_or(criteria)?;
        }
        if let Some(ordering) = ordering {
            tree.ordering = context.parse_ordering(ordering)?;
        }

        debug!(
            "parsed `{method}`: {} group(s), {} order(s)",
            tree.or_groups.len(),
            tree.ordering.len()
        );
        Ok(tree)
    }

    fn introducer(&self, method: &str) -> Option<&IntroducerSpec> {
        self.introducers.iter().find(|introducer| {
            method
                .strip_prefix(introducer.prefix.as_str())
                .is_some_and(|rest| starts_upper_or_empty(rest))
        })
    }
}

fn sorted_introducers(config: &ParserConfig) -> Vec<IntroducerSpec> {
    let mut introducers = config.introducers.clone();
    introducers.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
    introducers
}

fn starts_upper_or_empty(text: &str) -> bool {
    text.chars().next().is_none_or(char::is_uppercase)
}

/// Byte offsets where `token` starts in `text` followed by an uppercase letter,
/// skipping offset 0.
fn connector_positions<'t>(text: &'t str, token: &'t str) -> impl Iterator<Item = usize> + 't {
    text.match_indices(token)
        .map(|(index, _)| index)
        .filter(move |&index| index > 0 && starts_upper(&text[index + token.len()..]))
}

fn starts_upper(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_uppercase)
}

/// Split the text after the introducer into subject and criteria at the first `By`.
fn split_subject(rest: Span<'_>) -> (Span<'_>, Span<'_>) {
    let by = rest
        .text
        .match_indices(BY)
        .map(|(index, _)| index)
        .find(|&index| starts_upper_or_empty(&rest.text[index + BY.len()..]));
    match by {
        // `findAllOrderByName`: the first `By` belongs to the ordering clause
        Some(index) if rest.text[..index].ends_with("Order") => {
            let start = index - "Order".len();
            (rest.before(start), rest.after(start))
        }
        Some(index) => (rest.before(index), rest.after(index + BY.len())),
        None => (rest, rest.after(rest.text.len())),
    }
}

fn parse_limit(subject: Span<'_>) -> Result<Option<NonZeroUsize>, QuerySyntaxError> {
    let Some(captures) = LIMIT.captures(subject.text) else {
        return Ok(None);
    };
    let (Some(keyword), Some(digits)) = (captures.get(1), captures.get(2)) else {
        return Ok(None);
    };
    let invalid = || {
        QuerySyntaxError::new(
            SyntaxErrorKind::InvalidLimit,
            &subject.text[keyword.start()..digits.end()],
            subject.offset + keyword.start(),
        )
    };
    if digits.as_str().is_empty() {
        return Ok(NonZeroUsize::new(1));
    }
    let limit: usize = digits.as_str().parse().map_err(|_| invalid())?;
    NonZeroUsize::new(limit).map(Some).ok_or_else(invalid)
}

/// Split criteria from the `OrderBy` clause, which may appear at most once.
fn split_order_by(body: Span<'_>) -> Result<(Span<'_>, Option<Span<'_>>), QuerySyntaxError> {
    let mut positions = body
        .text
        .match_indices(ORDER_BY)
        .map(|(index, _)| index)
        .filter(|&index| starts_upper_or_empty(&body.text[index + ORDER_BY.len()..]));

    let Some(first) = positions.next() else {
        return Ok((body, None));
    };
    if let Some(second) = positions.next() {
        return Err(QuerySyntaxError::new(
            SyntaxErrorKind::RepeatedOrderBy,
            ORDER_BY,
            body.offset + second,
        ));
    }
    let ordering = body.after(first + ORDER_BY.len());
    if ordering.text.is_empty() {
        return Err(QuerySyntaxError::new(
            SyntaxErrorKind::EmptyOrderBy,
            ORDER_BY,
            body.offset + first,
        ));
    }
    Ok((body.before(first), Some(ordering)))
}

fn strip_all_ignore_case(criteria: Span<'_>) -> (Span<'_>, bool) {
    for marker in ALL_IGNORE_CASE {
        if let Some(rest) = criteria.text.strip_suffix(marker) {
            return (criteria.before(rest.len()), true);
        }
    }
    (criteria, false)
}

struct Context<'p> {
    parser: &'p QueryMethodParser,
    resolver: PathResolver<'p>,
    root_type: &'p str,
    all_ignore_case: bool,
}

/// Outcome of trying every split point of a fragment.
#[derive(Default)]
struct SplitErrors {
    /// Right side failed after the left side parsed.
    right: Option<QuerySyntaxError>,
    left: Option<QuerySyntaxError>,
}

impl SplitErrors {
    fn pick(self, whole: QuerySyntaxError, span: Span<'_>, connector: &str) -> QuerySyntaxError {
        if let Some(dangling) = dangling_connector(span, connector) {
            return dangling;
        }
        self.right.or(self.left).unwrap_or(whole)
    }
}

/// `NameAnd` or `AndName`: a connector with nothing on one side.
fn dangling_connector(span: Span<'_>, connector: &str) -> Option<QuerySyntaxError> {
    if span.text.ends_with(connector) {
        let position = span.offset + span.text.len() - connector.len();
        return Some(QuerySyntaxError::new(SyntaxErrorKind::InvalidSplit, connector, position));
    }
    let rest = span.text.strip_prefix(connector)?;
    starts_upper(rest).then(|| QuerySyntaxError::new(SyntaxErrorKind::InvalidSplit, connector, span.offset))
}

impl Context<'_> {
    fn parse_or(&self, span: Span<'_>) -> Result<Vec<AndGroup>, QuerySyntaxError> {
        let mut errors = SplitErrors::default();
        for index in connector_positions(span.text, OR) {
            trace!("trying `Or` split of `{}` at {index}", span.text);
            let left = match self.parse_and(span.before(index)) {
                Ok(left) => left,
                Err(err) => {
                    errors.left.get_or_insert(err);
                    continue;
                }
            };
            match self.parse_or(span.after(index + OR.len())) {
                Ok(rest) => {
                    let mut groups = vec![AndGroup::new(left)];
                    groups.extend(rest);
                    return Ok(groups);
                }
                Err(err) => {
                    errors.right.get_or_insert(err);
                }
            }
        }
        match self.parse_and(span) {
            Ok(parts) => Ok(vec![AndGroup::new(parts)]),
            Err(whole) => Err(errors.pick(whole, span, OR)),
        }
    }

    fn parse_and(&self, span: Span<'_>) -> Result<Vec<Part>, QuerySyntaxError> {
        let mut errors = SplitErrors::default();
        for index in connector_positions(span.text, AND) {
            let left = match self.parse_part(span.before(index)) {
                Ok(left) => left,
                Err(err) => {
                    errors.left.get_or_insert(err);
                    continue;
                }
            };
            match self.parse_and(span.after(index + AND.len())) {
                Ok(rest) => {
                    let mut parts = vec![left];
                    parts.extend(rest);
                    return Ok(parts);
                }
                Err(err) => {
                    errors.right.get_or_insert(err);
                }
            }
        }
        match self.parse_part(span) {
            Ok(part) => Ok(vec![part]),
            Err(whole) => Err(errors.pick(whole, span, AND)),
        }
    }

    fn parse_part(&self, span: Span<'_>) -> Result<Part, QuerySyntaxError> {
        let (span, ignore_case) = self.strip_ignore_case(span);
        if span.text.is_empty() {
            return Err(QuerySyntaxError::new(SyntaxErrorKind::InvalidSplit, span.text, span.offset));
        }

        let mut keyword_error = None;
        for (prefix, keyword) in self.parser.vocabulary.candidates(span.text) {
            match self.resolver.resolve(prefix, self.root_type) {
                Ok(path) => return Ok(Part::new(path, keyword.clone(), ignore_case)),
                Err(err) => {
                    keyword_error.get_or_insert_with(|| QuerySyntaxError::unresolved(prefix, span.offset, err));
                }
            }
        }

        match self.resolver.resolve(span.text, self.root_type) {
            Ok(path) => Ok(Part::new(path, Keyword::SimpleProperty, ignore_case)),
            Err(err) => Err(keyword_error.unwrap_or_else(|| QuerySyntaxError::unresolved(span.text, span.offset, err))),
        }
    }

    fn strip_ignore_case<'m>(&self, span: Span<'m>) -> (Span<'m>, IgnoreCase) {
        let stripped = IGNORE_CASE
            .iter()
            .filter_map(|marker| span.text.strip_suffix(*marker))
            .find(|rest| !rest.is_empty());
        if let Some(rest) = stripped {
            return (span.before(rest.len()), IgnoreCase::Always);
        }
        let fallback = if self.all_ignore_case {
            IgnoreCase::WhenPossible
        } else {
            IgnoreCase::Never
        };
        (span, fallback)
    }

    fn parse_ordering(&self, span: Span<'_>) -> Result<Vec<Order>, QuerySyntaxError> {
        let mut errors = SplitErrors::default();
        for (index, skip) in order_boundaries(span.text) {
            let left = match self.parse_order(span.before(index)) {
                Ok(left) => left,
                Err(err) => {
                    errors.left.get_or_insert(err);
                    continue;
                }
            };
            match self.parse_ordering(span.after(index + skip)) {
                Ok(rest) => {
                    let mut orders = vec![left];
                    orders.extend(rest);
                    return Ok(orders);
                }
                Err(err) => {
                    errors.right.get_or_insert(err);
                }
            }
        }
        match self.parse_order(span) {
            Ok(order) => Ok(vec![order]),
            Err(whole) => Err(errors.pick(whole, span, AND)),
        }
    }

    fn parse_order(&self, span: Span<'_>) -> Result<Order, QuerySyntaxError> {
        let (property, direction) = if let Some(rest) = span.text.strip_suffix(Direction::Desc.token()) {
            (span.before(rest.len()), Some(Direction::Desc))
        } else if let Some(rest) = span.text.strip_suffix(Direction::Asc.token()) {
            (span.before(rest.len()), Some(Direction::Asc))
        } else {
            (span, None)
        };
        if property.text.is_empty() {
            return Err(QuerySyntaxError::new(
                SyntaxErrorKind::InvalidOrderDirection,
                span.text,
                span.offset,
            ));
        }

        let order = |property, direction| Order {
            property,
            direction,
            ignore_case: self.all_ignore_case,
        };
        match self.resolver.resolve(property.text, self.root_type) {
            Ok(path) => Ok(order(path, direction.unwrap_or_default())),
            Err(err) => match direction {
                // the marker may belong to the property name itself
                Some(_) => self
                    .resolver
                    .resolve(span.text, self.root_type)
                    .map(|path| order(path, Direction::Asc))
                    .map_err(|_| QuerySyntaxError::unresolved(property.text, property.offset, err)),
                None => Err(QuerySyntaxError::unresolved(property.text, property.offset, err)),
            },
        }
    }
}

/// Split points of an ordering clause, left to right: after an `Asc`/`Desc`
/// marker (nothing skipped) or before an `And` connector (connector skipped).
fn order_boundaries(text: &str) -> Vec<(usize, usize)> {
    let mut boundaries: Vec<(usize, usize)> = [Direction::Asc.token(), Direction::Desc.token()]
        .into_iter()
        .flat_map(|marker| {
            text.match_indices(marker)
                .map(move |(index, _)| index + marker.len())
                .filter(|&end| starts_upper(&text[end..]))
                .map(|end| (end, 0))
                .collect::<Vec<_>>()
        })
        .chain(connector_positions(text, AND).map(|index| (index, AND.len())))
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::StaticInspector;
    use crate::types::{TypeDescriptor, TypeRef};

    fn parser() -> QueryMethodParser {
        let inspector = StaticInspector::new()
            .with_type(
                TypeDescriptor::new("Person")
                    .member("id", TypeRef::named("u64"))
                    .member("firstname", TypeRef::named("String"))
                    .member("lastname", TypeRef::named("String"))
                    .member("age", TypeRef::named("u32"))
                    .member("active", TypeRef::named("bool"))
                    .member("address", TypeRef::named("Address")),
            )
            .with_type(TypeDescriptor::new("Address").member("city", TypeRef::named("String")));
        let registry = Arc::new(EntityRegistry::with_defaults(Arc::new(inspector)));
        QueryMethodParser::new(registry)
    }

    #[test]
    fn subject_is_split_at_first_by() {
        let rest = Span::new("DistinctTop3ByAge", 4);
        let (subject, criteria) = split_subject(rest);
        assert_eq!(subject.text, "DistinctTop3");
        assert_eq!(criteria.text, "Age");
        assert_eq!(criteria.offset, 18);

        let (subject, criteria) = split_subject(Span::new("AllOrderByAge", 4));
        assert_eq!(subject.text, "All");
        assert_eq!(criteria.text, "OrderByAge");

        let (subject, criteria) = split_subject(Span::new("All", 4));
        assert_eq!(subject.text, "All");
        assert!(criteria.text.is_empty());
    }

    #[test]
    fn limits_are_read_from_subject() {
        let limit = |text| parse_limit(Span::new(text, 0));
        assert_eq!(limit("Top3").unwrap(), NonZeroUsize::new(3));
        assert_eq!(limit("First").unwrap(), NonZeroUsize::new(1));
        assert_eq!(limit("DistinctFirst10Users").unwrap(), NonZeroUsize::new(10));
        assert_eq!(limit("Firstnames").unwrap(), None);
        assert_eq!(limit("").unwrap(), None);

        let err = limit("Top0").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidLimit);
        assert_eq!(err.fragment, "Top0");
    }

    #[test]
    fn order_by_is_split_once() {
        let body = Span::new("AgeOrderByNameDesc", 6);
        let (criteria, ordering) = split_order_by(body).unwrap();
        assert_eq!(criteria.text, "Age");
        assert_eq!(ordering.unwrap().text, "NameDesc");

        let err = split_order_by(Span::new("AgeOrderBy", 6)).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::EmptyOrderBy);
        assert_eq!(err.position, 9);

        let err = split_order_by(Span::new("AgeOrderByNameOrderByAge", 0)).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::RepeatedOrderBy);
        assert_eq!(err.position, 14);
    }

    #[test]
    fn order_boundaries_follow_markers_and_connectors() {
        assert_eq!(order_boundaries("NameAscAgeDesc"), [(7, 0)]);
        assert_eq!(order_boundaries("NameAndAge"), [(4, 3)]);
        assert!(order_boundaries("Description").is_empty());
    }

    #[test]
    fn keyword_suffix_and_default_equality() {
        let tree = parser().parse("findByAgeGreaterThanEqualAndLastname", "Person").unwrap();
        let parts: Vec<_> = tree.parts().collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].keyword(), &Keyword::GreaterThanEqual);
        assert_eq!(parts[1].keyword(), &Keyword::SimpleProperty);
        assert_eq!(tree.argument_count(), 2);
    }

    #[test]
    fn no_introducer_means_bare_criteria() {
        let tree = parser().parse("AgeAndLastname", "Person").unwrap();
        assert_eq!(tree.intent(), Intent::Find);
        assert_eq!(tree.parts().count(), 2);
    }

    #[test]
    fn ignore_case_markers() {
        let tree = parser().parse("findByFirstnameAndLastnameAllIgnoreCase", "Person").unwrap();
        assert!(tree.parts().all(|part| part.ignore_case() == IgnoreCase::WhenPossible));

        let tree = parser().parse("findByFirstnameIgnoringCaseAndAge", "Person").unwrap();
        let cases: Vec<_> = tree.parts().map(Part::ignore_case).collect();
        assert_eq!(cases, [IgnoreCase::Always, IgnoreCase::Never]);
    }

    #[test]
    fn unresolved_segment_reports_position() {
        let err = parser().parse("findByAgeAndNickname", "Person").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnresolvedSegment);
        assert_eq!(err.fragment, "Nickname");
        assert_eq!(err.position, 12);
        assert!(err.cause.is_some());
    }

    #[test]
    fn dangling_connectors_are_invalid_splits() {
        let err = parser().parse("findByAgeAnd", "Person").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidSplit);
        assert_eq!(err.position, 9);

        let err = parser().parse("findByAgeOrOrLastname", "Person").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidSplit);
    }

    #[test]
    fn bare_direction_is_rejected() {
        let err = parser().parse("findByAgeOrderByDesc", "Person").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidOrderDirection);
        assert_eq!(err.fragment, "Desc");
    }

    #[test]
    fn empty_method_name() {
        let err = parser().parse("", "Person").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::EmptyMethodName);
    }
}
