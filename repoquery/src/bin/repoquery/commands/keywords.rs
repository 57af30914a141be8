use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use repoquery::{Intent, Keyword, KeywordVocabulary};
use serde::Serialize;
use std::path::Path;

use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputFormat, OutputManager, TableDisplay, set_header, themed_table};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Vocabulary",
    commands: &[
        "repoquery keywords                    # Keywords, tokens and arities",
        "repoquery keywords --introducers      # Also list method prefixes",
        "repoquery --config ci.toml keywords   # Vocabulary with another configuration",
    ],
}];

#[derive(Args, Debug)]
pub struct KeywordsArgs {
    /// Also list the method-name introducers
    #[arg(short = 'i', long)]
    pub introducers: bool,
}

#[derive(Debug, Serialize)]
pub struct KeywordView {
    pub keyword: String,
    pub tokens: Vec<String>,
    pub arguments: usize,
    pub negating: bool,
    pub custom: bool,
}

#[derive(Debug, Serialize)]
pub struct IntroducerView {
    pub prefix: String,
    pub intent: Intent,
}

#[derive(Debug, Serialize)]
pub struct Vocabulary {
    pub separator: char,
    pub keywords: Vec<KeywordView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub introducers: Vec<IntroducerView>,
}

impl Vocabulary {
    pub fn new(vocabulary: &KeywordVocabulary, separator: char) -> Self {
        let keywords = vocabulary
            .keywords()
            .into_iter()
            .map(|keyword| KeywordView {
                tokens: vocabulary.tokens_for(&keyword).map(str::to_string).collect(),
                keyword: keyword.name().to_string(),
                arguments: keyword.arity(),
                negating: keyword.is_negating(),
                custom: matches!(keyword, Keyword::Custom { .. }),
            })
            .collect();
        Self {
            separator,
            keywords,
            introducers: Vec::new(),
        }
    }
}

impl TableDisplay for Vocabulary {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        set_header(&mut table, options, &["Keyword", "Tokens", "Arguments", "Negating"]);
        for keyword in &self.keywords {
            let name = if keyword.custom {
                format!("{} (custom)", keyword.keyword)
            } else {
                keyword.keyword.clone()
            };
            table.add_row(vec![
                Cell::new(name),
                Cell::new(keyword.tokens.join(", ")),
                Cell::new(keyword.arguments),
                Cell::new(if keyword.negating { "yes" } else { "" }),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.keywords
            .iter()
            .map(|keyword| format!("{}/{}: {}", keyword.keyword, keyword.arguments, keyword.tokens.join(" ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn handle_keywords(args: KeywordsArgs, config: Option<&Path>, output: &OutputManager) -> Result<()> {
    let ctx = ProjectContext::find(config)?;
    output.verbose(&format!("configuration: {}", ctx.config_source()));
    let parser_config = &ctx.config.parser;
    let vocabulary = parser_config.vocabulary()?;

    let mut view = Vocabulary::new(&vocabulary, parser_config.separator);
    if args.introducers {
        view.introducers = parser_config
            .introducers
            .iter()
            .map(|introducer| IntroducerView {
                prefix: introducer.prefix.clone(),
                intent: introducer.intent,
            })
            .collect();
    }

    output.display(&view)?;

    if output.options.output_format == OutputFormat::Table {
        output.key_value("Path separator", &view.separator.to_string());
        if !view.introducers.is_empty() {
            output.heading("Introducers");
            for introducer in &view.introducers {
                output.bullet(&format!("{} -> {}", introducer.prefix, introducer.intent));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoquery::ParserConfig;

    #[test]
    fn test_vocabulary_view() {
        let config = ParserConfig::default().with_custom_keyword("Fuzzy", 1, ["Fuzzy", "IsFuzzy"]);
        let vocabulary = config.vocabulary().unwrap();
        let view = Vocabulary::new(&vocabulary, config.separator);

        let between = view.keywords.iter().find(|k| k.keyword == "Between").unwrap();
        assert_eq!(between.arguments, 2);
        assert_eq!(between.tokens, ["IsBetween", "Between"]);

        let fuzzy = view.keywords.last().unwrap();
        assert_eq!(fuzzy.keyword, "Fuzzy");
        assert!(fuzzy.custom);
        assert_eq!(fuzzy.tokens, ["IsFuzzy", "Fuzzy"]);

        let not_in = view.keywords.iter().find(|k| k.keyword == "NotIn").unwrap();
        assert!(not_in.negating);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["separator"], "_");
        assert!(json.get("introducers").is_none());
    }
}
