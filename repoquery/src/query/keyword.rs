use serde::Serialize;

/// Operator of a single predicate part.
///
/// The built-in variants form the closed vocabulary of the naming convention.
/// `Custom` carries keywords a host application adds through configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Keyword {
    Between,
    IsNotNull,
    IsNull,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Before,
    After,
    NotLike,
    Like,
    StartingWith,
    EndingWith,
    IsNotEmpty,
    IsEmpty,
    NotContaining,
    Containing,
    NotIn,
    In,
    Near,
    Within,
    Regex,
    Exists,
    True,
    False,
    NegatingSimpleProperty,
    SimpleProperty,
    Custom { name: String, arity: usize },
}

impl Keyword {
    /// Every built-in keyword in declaration order.
    pub fn builtins() -> [Keyword; 27] {
        use Keyword::*;
        [
            Between,
            IsNotNull,
            IsNull,
            LessThan,
            LessThanEqual,
            GreaterThan,
            GreaterThanEqual,
            Before,
            After,
            NotLike,
            Like,
            StartingWith,
            EndingWith,
            IsNotEmpty,
            IsEmpty,
            NotContaining,
            Containing,
            NotIn,
            In,
            Near,
            Within,
            Regex,
            Exists,
            True,
            False,
            NegatingSimpleProperty,
            SimpleProperty,
        ]
    }

    /// Number of bound arguments the keyword consumes.
    pub fn arity(&self) -> usize {
        match self {
            Keyword::Between => 2,
            Keyword::IsNotNull
            | Keyword::IsNull
            | Keyword::IsNotEmpty
            | Keyword::IsEmpty
            | Keyword::Exists
            | Keyword::True
            | Keyword::False => 0,
            Keyword::LessThan
            | Keyword::LessThanEqual
            | Keyword::GreaterThan
            | Keyword::GreaterThanEqual
            | Keyword::Before
            | Keyword::After
            | Keyword::NotLike
            | Keyword::Like
            | Keyword::StartingWith
            | Keyword::EndingWith
            | Keyword::NotContaining
            | Keyword::Containing
            | Keyword::NotIn
            | Keyword::In
            | Keyword::Near
            | Keyword::Within
            | Keyword::Regex
            | Keyword::NegatingSimpleProperty
            | Keyword::SimpleProperty => 1,
            Keyword::Custom { arity, .. } => *arity,
        }
    }

    /// Method-name tokens of a built-in keyword; the first one is canonical.
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            Keyword::Between => &["Between", "IsBetween"],
            Keyword::IsNotNull => &["IsNotNull", "NotNull"],
            Keyword::IsNull => &["IsNull", "Null"],
            Keyword::LessThan => &["LessThan", "IsLessThan"],
            Keyword::LessThanEqual => &["LessThanEqual", "IsLessThanEqual"],
            Keyword::GreaterThan => &["GreaterThan", "IsGreaterThan"],
            Keyword::GreaterThanEqual => &["GreaterThanEqual", "IsGreaterThanEqual"],
            Keyword::Before => &["Before", "IsBefore"],
            Keyword::After => &["After", "IsAfter"],
            Keyword::NotLike => &["NotLike", "IsNotLike"],
            Keyword::Like => &["Like", "IsLike"],
            Keyword::StartingWith => &["StartingWith", "IsStartingWith", "StartsWith"],
            Keyword::EndingWith => &["EndingWith", "IsEndingWith", "EndsWith"],
            Keyword::IsNotEmpty => &["IsNotEmpty", "NotEmpty"],
            Keyword::IsEmpty => &["IsEmpty", "Empty"],
            Keyword::NotContaining => &["NotContaining", "IsNotContaining", "NotContains"],
            Keyword::Containing => &["Containing", "IsContaining", "Contains"],
            Keyword::NotIn => &["NotIn", "IsNotIn"],
            Keyword::In => &["In", "IsIn"],
            Keyword::Near => &["Near", "IsNear"],
            Keyword::Within => &["Within", "IsWithin"],
            Keyword::Regex => &["MatchesRegex", "Matches", "Regex"],
            Keyword::Exists => &["Exists"],
            Keyword::True => &["True", "IsTrue"],
            Keyword::False => &["False", "IsFalse"],
            Keyword::NegatingSimpleProperty => &["Not", "IsNot"],
            Keyword::SimpleProperty => &["Equals", "Is"],
            Keyword::Custom { .. } => &[],
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Keyword::Between => "Between",
            Keyword::IsNotNull => "IsNotNull",
            Keyword::IsNull => "IsNull",
            Keyword::LessThan => "LessThan",
            Keyword::LessThanEqual => "LessThanEqual",
            Keyword::GreaterThan => "GreaterThan",
            Keyword::GreaterThanEqual => "GreaterThanEqual",
            Keyword::Before => "Before",
            Keyword::After => "After",
            Keyword::NotLike => "NotLike",
            Keyword::Like => "Like",
            Keyword::StartingWith => "StartingWith",
            Keyword::EndingWith => "EndingWith",
            Keyword::IsNotEmpty => "IsNotEmpty",
            Keyword::IsEmpty => "IsEmpty",
            Keyword::NotContaining => "NotContaining",
            Keyword::Containing => "Containing",
            Keyword::NotIn => "NotIn",
            Keyword::In => "In",
            Keyword::Near => "Near",
            Keyword::Within => "Within",
            Keyword::Regex => "Regex",
            Keyword::Exists => "Exists",
            Keyword::True => "True",
            Keyword::False => "False",
            Keyword::NegatingSimpleProperty => "NegatingSimpleProperty",
            Keyword::SimpleProperty => "SimpleProperty",
            Keyword::Custom { name, .. } => name,
        }
    }

    /// Look up a built-in keyword by its [`name`](Keyword::name).
    pub fn from_name(name: &str) -> Option<Keyword> {
        Keyword::builtins().into_iter().find(|keyword| keyword.name() == name)
    }

    pub fn is_negating(&self) -> bool {
        matches!(
            self,
            Keyword::IsNotNull
                | Keyword::NotLike
                | Keyword::IsNotEmpty
                | Keyword::NotContaining
                | Keyword::NotIn
                | Keyword::NegatingSimpleProperty
        )
    }
}

/// One recognizable suffix token and the keyword it denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordToken {
    pub token: String,
    pub keyword: Keyword,
}

/// Ordered set of keyword tokens, longest token first.
///
/// Ordering by decreasing length keeps a token that is a suffix of a longer one
/// (`GreaterThan` inside `IsGreaterThan`, `In` inside `NotIn`) from winning.
#[derive(Debug, Clone)]
pub struct KeywordVocabulary {
    tokens: Vec<KeywordToken>,
    custom: Vec<Keyword>,
}

impl Default for KeywordVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KeywordVocabulary {
    pub fn builtin() -> Self {
        let mut vocabulary = Self {
            tokens: Vec::new(),
            custom: Vec::new(),
        };
        for keyword in Keyword::builtins() {
            for token in keyword.tokens() {
                vocabulary.tokens.push(KeywordToken {
                    token: (*token).to_string(),
                    keyword: keyword.clone(),
                });
            }
        }
        vocabulary.sort();
        vocabulary
    }

    /// Register an additional token for an existing keyword.
    pub fn add_alias(&mut self, keyword: Keyword, token: impl Into<String>) {
        self.tokens.push(KeywordToken {
            token: token.into(),
            keyword,
        });
        self.sort();
    }

    /// Register a host-defined keyword recognized by `tokens`.
    pub fn add_custom<I, S>(&mut self, name: impl Into<String>, arity: usize, tokens: I) -> Keyword
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keyword = Keyword::Custom {
            name: name.into(),
            arity,
        };
        for token in tokens {
            self.tokens.push(KeywordToken {
                token: token.into(),
                keyword: keyword.clone(),
            });
        }
        self.custom.push(keyword.clone());
        self.sort();
        keyword
    }

    fn sort(&mut self) {
        // stable: equal lengths keep registration order
        self.tokens.sort_by(|a, b| b.token.len().cmp(&a.token.len()));
    }

    /// Tokens in matching order.
    pub fn iter(&self) -> impl Iterator<Item = &KeywordToken> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Built-in keywords followed by custom ones.
    pub fn keywords(&self) -> Vec<Keyword> {
        let mut keywords: Vec<Keyword> = Keyword::builtins().into();
        keywords.extend(self.custom.iter().cloned());
        keywords
    }

    /// Every token that `segment` ends with, longest first, paired with the
    /// non-empty prefix left after stripping it.
    pub fn candidates<'a>(&'a self, segment: &'a str) -> impl Iterator<Item = (&'a str, &'a Keyword)> + 'a {
        self.tokens.iter().filter_map(move |entry| {
            let prefix = segment.strip_suffix(entry.token.as_str())?;
            (!prefix.is_empty()).then_some((prefix, &entry.keyword))
        })
    }

    /// Canonical token used when rendering `keyword` back into a method name.
    pub fn token_for(&self, keyword: &Keyword) -> Option<&str> {
        match keyword {
            Keyword::Custom { .. } => self
                .tokens
                .iter()
                .filter(|entry| &entry.keyword == keyword)
                .max_by_key(|entry| entry.token.len())
                .map(|entry| entry.token.as_str()),
            builtin => builtin.tokens().first().copied(),
        }
    }

    /// All tokens registered for `keyword`, in matching order.
    pub fn tokens_for<'a>(&'a self, keyword: &'a Keyword) -> impl Iterator<Item = &'a str> + 'a {
        self.tokens
            .iter()
            .filter(move |entry| &entry.keyword == keyword)
            .map(|entry| entry.token.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longer_tokens_are_tried_first() {
        let vocabulary = KeywordVocabulary::builtin();
        let first = vocabulary.candidates("AgeGreaterThanEqual").next();
        assert_eq!(first, Some(("Age", &Keyword::GreaterThanEqual)));

        let first = vocabulary.candidates("AgeIsNotNull").next();
        assert_eq!(first, Some(("Age", &Keyword::IsNotNull)));
    }

    #[test]
    fn every_candidate_is_reported_for_backtracking() {
        let vocabulary = KeywordVocabulary::builtin();
        let keywords: Vec<_> = vocabulary.candidates("StatusNotIn").map(|(_, k)| k.clone()).collect();
        assert_eq!(keywords, vec![Keyword::NotIn, Keyword::In]);
    }

    #[test]
    fn a_bare_token_is_not_a_candidate() {
        let vocabulary = KeywordVocabulary::builtin();
        assert_eq!(vocabulary.candidates("Between").count(), 0);
    }

    #[test]
    fn arity_follows_keyword() {
        assert_eq!(Keyword::Between.arity(), 2);
        assert_eq!(Keyword::IsNull.arity(), 0);
        assert_eq!(Keyword::True.arity(), 0);
        assert_eq!(Keyword::In.arity(), 1);
        assert_eq!(Keyword::SimpleProperty.arity(), 1);
        assert_eq!(Keyword::Custom { name: "Fuzzy".into(), arity: 3 }.arity(), 3);
    }

    #[test]
    fn custom_keywords_and_aliases_extend_the_vocabulary() {
        let mut vocabulary = KeywordVocabulary::builtin();
        let builtin_len = vocabulary.len();
        vocabulary.add_alias(Keyword::GreaterThan, "Above");
        let fuzzy = vocabulary.add_custom("Fuzzy", 1, ["IsFuzzy", "Fuzzy"]);

        assert_eq!(vocabulary.len(), builtin_len + 3);
        assert_eq!(vocabulary.candidates("AgeAbove").next(), Some(("Age", &Keyword::GreaterThan)));
        assert_eq!(vocabulary.candidates("NameFuzzy").next(), Some(("Name", &fuzzy)));
        assert_eq!(vocabulary.token_for(&fuzzy), Some("IsFuzzy"));
        assert_eq!(vocabulary.keywords().last(), Some(&fuzzy));
    }

    #[test]
    fn names_round_trip() {
        for keyword in Keyword::builtins() {
            assert_eq!(Keyword::from_name(keyword.name()), Some(keyword.clone()));
            assert!(!keyword.tokens().is_empty());
        }
        assert_eq!(Keyword::from_name("Nope"), None);
    }
}
