//! Parser configuration.
//!
//! Everything the parser treats as vocabulary is configuration: introducer
//! prefixes, keyword tokens and the set of terminal types. The defaults
//! reproduce the standard naming convention; a host can load overrides from TOML.
//!
//! ```toml
//! separator = "_"
//! terminal_types = ["Money"]
//!
//! [[keyword_aliases]]
//! keyword = "GreaterThan"
//! token = "Above"
//!
//! [[custom_keywords]]
//! name = "Fuzzy"
//! tokens = ["IsFuzzy", "Fuzzy"]
//! arity = 1
//! ```

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::query::{Intent, Keyword, KeywordVocabulary};

/// Default separator for explicit nested-path disambiguation.
pub const DEFAULT_SEPARATOR: char = '_';

const DEFAULT_TERMINAL_TYPES: &[&str] = &[
    "bool", "char", "str", "String", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128",
    "usize", "f32", "f64", "Cow", "DateTime", "NaiveDate", "NaiveDateTime", "NaiveTime", "Duration", "SystemTime",
    "Instant", "Uuid", "Decimal", "Url", "PathBuf", "Path", "OsString", "IpAddr", "Ipv4Addr", "Ipv6Addr", "Value",
    "Bytes",
];

static DEFAULT_INTRODUCERS: Lazy<Vec<IntroducerSpec>> = Lazy::new(|| {
    [
        ("find", Intent::Find),
        ("read", Intent::Find),
        ("get", Intent::Find),
        ("query", Intent::Find),
        ("search", Intent::Find),
        ("stream", Intent::Stream),
        ("count", Intent::Count),
        ("exists", Intent::Exists),
        ("delete", Intent::Delete),
        ("remove", Intent::Delete),
    ]
    .into_iter()
    .map(|(prefix, intent)| IntroducerSpec {
        prefix: prefix.to_string(),
        intent,
    })
    .collect()
});

/// Types treated as leaf values that the path resolver never decomposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalTypes {
    names: HashSet<String>,
}

impl Default for TerminalTypes {
    fn default() -> Self {
        Self::defaults()
    }
}

impl TerminalTypes {
    /// Primitive and common library value types.
    pub fn defaults() -> Self {
        Self {
            names: DEFAULT_TERMINAL_TYPES.iter().map(|name| (*name).to_string()).collect(),
        }
    }

    pub fn empty() -> Self {
        Self { names: HashSet::new() }
    }

    pub fn with(mut self, type_name: impl Into<String>) -> Self {
        self.insert(type_name);
        self
    }

    pub fn insert(&mut self, type_name: impl Into<String>) {
        self.names.insert(type_name.into());
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.names.contains(type_name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A method-name prefix and the selection intent it denotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroducerSpec {
    pub prefix: String,
    pub intent: Intent,
}

/// Additional token for a built-in keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordAlias {
    /// Built-in keyword name, e.g. `GreaterThan`.
    pub keyword: String,
    pub token: String,
}

/// Host-defined keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomKeywordSpec {
    pub name: String,
    pub tokens: Vec<String>,
    #[serde(default = "default_custom_arity")]
    pub arity: usize,
}

fn default_custom_arity() -> usize {
    1
}

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

fn default_introducers() -> Vec<IntroducerSpec> {
    DEFAULT_INTRODUCERS.clone()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default = "default_separator")]
    pub separator: char,
    /// Replaces the default introducers when present.
    #[serde(default = "default_introducers")]
    pub introducers: Vec<IntroducerSpec>,
    #[serde(default)]
    pub keyword_aliases: Vec<KeywordAlias>,
    #[serde(default)]
    pub custom_keywords: Vec<CustomKeywordSpec>,
    /// Terminal types added to the defaults.
    #[serde(default)]
    pub terminal_types: Vec<String>,
    #[serde(default = "default_true")]
    pub include_default_terminals: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            introducers: default_introducers(),
            keyword_aliases: Vec::new(),
            custom_keywords: Vec::new(),
            terminal_types: Vec::new(),
            include_default_terminals: true,
        }
    }
}

impl ParserConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ParserConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_terminal_type(mut self, type_name: impl Into<String>) -> Self {
        self.terminal_types.push(type_name.into());
        self
    }

    pub fn with_keyword_alias(mut self, keyword: impl Into<String>, token: impl Into<String>) -> Self {
        self.keyword_aliases.push(KeywordAlias {
            keyword: keyword.into(),
            token: token.into(),
        });
        self
    }

    pub fn with_custom_keyword<I, S>(mut self, name: impl Into<String>, arity: usize, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_keywords.push(CustomKeywordSpec {
            name: name.into(),
            tokens: tokens.into_iter().map(Into::into).collect(),
            arity,
        });
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.separator.is_ascii_punctuation() {
            return Err(ConfigError::InvalidSeparator(self.separator));
        }
        for introducer in &self.introducers {
            let prefix = &introducer.prefix;
            if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(ConfigError::InvalidIntroducer(prefix.clone()));
            }
        }
        for alias in &self.keyword_aliases {
            if Keyword::from_name(&alias.keyword).is_none() {
                return Err(ConfigError::UnknownKeyword(alias.keyword.clone()));
            }
            validate_token(&alias.token)?;
        }
        for custom in &self.custom_keywords {
            if custom.tokens.is_empty() {
                return Err(ConfigError::InvalidToken(custom.name.clone()));
            }
            for token in &custom.tokens {
                validate_token(token)?;
            }
        }
        Ok(())
    }

    /// Built-in vocabulary extended with the configured aliases and custom keywords.
    pub fn vocabulary(&self) -> Result<KeywordVocabulary, ConfigError> {
        self.validate()?;
        let mut vocabulary = KeywordVocabulary::builtin();
        for alias in &self.keyword_aliases {
            let keyword =
                Keyword::from_name(&alias.keyword).ok_or_else(|| ConfigError::UnknownKeyword(alias.keyword.clone()))?;
            vocabulary.add_alias(keyword, alias.token.clone());
        }
        for custom in &self.custom_keywords {
            vocabulary.add_custom(custom.name.clone(), custom.arity, custom.tokens.iter().cloned());
        }
        Ok(vocabulary)
    }

    pub fn terminal(&self) -> TerminalTypes {
        let mut terminal = if self.include_default_terminals {
            TerminalTypes::defaults()
        } else {
            TerminalTypes::empty()
        };
        for name in &self.terminal_types {
            terminal.insert(name.clone());
        }
        terminal
    }
}

fn validate_token(token: &str) -> Result<(), ConfigError> {
    match token.chars().next() {
        Some(first) if first.is_ascii_uppercase() && token.chars().all(|c| c.is_ascii_alphanumeric()) => Ok(()),
        _ => Err(ConfigError::InvalidToken(token.to_string())),
    }
}
