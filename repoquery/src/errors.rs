use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type returned by the convenience APIs and the CLI.
#[derive(Debug, Error)]
pub enum Error {
    /// Entity metadata could not be built for a type.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A property path did not resolve against the type graph.
    #[error(transparent)]
    PathReference(#[from] PathReferenceError),

    /// A query method name could not be parsed.
    #[error(transparent)]
    Syntax(#[from] QuerySyntaxError),

    /// Parser configuration was unreadable or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure while building the metadata of a single type.
///
/// Failures are fatal for the affected type only; entities already cached by the
/// registry stay valid.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("type `{type_name}` cannot be described by the member inspector")]
    Undescribable { type_name: String },

    #[error("type `{type_name}` has no usable properties")]
    NoProperties { type_name: String },

    #[error("type `{type_name}` declares more than one identifier: {candidates:?}")]
    AmbiguousIdentifier { type_name: String, candidates: Vec<String> },

    #[error("type `{type_name}` declares property `{property}` more than once")]
    DuplicateProperty { type_name: String, property: String },

    /// The inspector answered for a different type than the one requested.
    #[error("member inspector described `{described}` when asked for `{requested}`")]
    TypeMismatch { requested: String, described: String },

    #[error("type `{type_name}` is terminal and carries no metadata")]
    TerminalType { type_name: String },

    /// The type was requested again while this thread is still constructing it.
    #[error("type `{type_name}` is already under construction on this thread")]
    Cycle { type_name: String },

    #[error("association `{type_name}.{property}` could not be registered")]
    Association {
        type_name: String,
        property: String,
        #[source]
        source: Box<MetadataError>,
    },
}

impl MetadataError {
    /// Name of the type the failure is attributed to.
    pub fn type_name(&self) -> &str {
        match self {
            MetadataError::Undescribable { type_name }
            | MetadataError::NoProperties { type_name }
            | MetadataError::AmbiguousIdentifier { type_name, .. }
            | MetadataError::DuplicateProperty { type_name, .. }
            | MetadataError::TerminalType { type_name }
            | MetadataError::Cycle { type_name }
            | MetadataError::Association { type_name, .. } => type_name,
            MetadataError::TypeMismatch { requested, .. } => requested,
        }
    }

    /// Innermost error of an association chain.
    pub fn root_cause(&self) -> &MetadataError {
        match self {
            MetadataError::Association { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// No segmentation of a path string resolves against the type graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no property `{unresolved}` found on type `{type_name}` while resolving `{source_path}`")]
pub struct PathReferenceError {
    /// The complete path string handed to the resolver.
    pub source_path: String,
    /// Remainder that could not be matched.
    pub unresolved: String,
    /// Type the remainder was resolved against.
    pub type_name: String,
    #[source]
    pub cause: Option<Box<MetadataError>>,
}

impl PathReferenceError {
    pub fn new(source_path: impl Into<String>, unresolved: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            unresolved: unresolved.into(),
            type_name: type_name.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: MetadataError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

/// Category of a [`QuerySyntaxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    EmptyMethodName,
    /// A predicate segment did not resolve to a property path.
    UnresolvedSegment,
    /// No split at `Or`/`And` boundaries yields resolvable segments.
    InvalidSplit,
    EmptyOrderBy,
    RepeatedOrderBy,
    InvalidOrderDirection,
    InvalidLimit,
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SyntaxErrorKind::EmptyMethodName => "empty method name",
            SyntaxErrorKind::UnresolvedSegment => "unresolved property segment",
            SyntaxErrorKind::InvalidSplit => "invalid Or/And split",
            SyntaxErrorKind::EmptyOrderBy => "OrderBy clause without properties",
            SyntaxErrorKind::RepeatedOrderBy => "OrderBy used more than once",
            SyntaxErrorKind::InvalidOrderDirection => "ordering direction without property",
            SyntaxErrorKind::InvalidLimit => "limit must be a positive number",
        };
        f.write_str(text)
    }
}

/// A method name could not be turned into a predicate tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} at position {position}: `{fragment}`")]
pub struct QuerySyntaxError {
    pub kind: SyntaxErrorKind,
    /// Offending substring of the method name.
    pub fragment: String,
    /// Byte offset of `fragment` within the method name.
    pub position: usize,
    #[source]
    pub cause: Option<PathReferenceError>,
}

impl QuerySyntaxError {
    pub fn new(kind: SyntaxErrorKind, fragment: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            fragment: fragment.into(),
            position,
            cause: None,
        }
    }

    pub fn unresolved(fragment: impl Into<String>, position: usize, cause: PathReferenceError) -> Self {
        Self {
            kind: SyntaxErrorKind::UnresolvedSegment,
            fragment: fragment.into(),
            position,
            cause: Some(cause),
        }
    }
}

/// Invalid or unreadable parser configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown keyword `{0}`")]
    UnknownKeyword(String),

    #[error("keyword token must be non-empty and start with an uppercase letter: `{0}`")]
    InvalidToken(String),

    #[error("introducer prefix must be a non-empty lowercase word: `{0}`")]
    InvalidIntroducer(String),

    #[error("separator `{0}` must be an ASCII punctuation character")]
    InvalidSeparator(char),
}
