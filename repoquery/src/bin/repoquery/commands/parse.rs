use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use repoquery::{Direction, IgnoreCase, Intent, KeywordVocabulary, PredicateTree, QuerySyntaxError};
use serde::Serialize;
use std::path::Path;

use super::{Session, SourceArgs};
use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputFormat, OutputManager, TableDisplay, set_header, themed_table};
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Parse Method Names",
        commands: &[
            "repoquery parse findByLastnameAndAgeGreaterThan --root Person",
            "repoquery parse findTop3ByAddress_CityOrderByAgeDesc --root Person",
            "repoquery parse countDistinctByStatus existsByEmailIgnoreCase --root Customer",
        ],
    },
    ExampleGroup {
        title: "Scripting",
        commands: &[
            "repoquery --output json parse findByAddressZipCode --root Person",
            "repoquery --output compact parse findByNameIn --root Person -s crates/domain/src",
        ],
    },
];

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Query method names to parse
    #[arg(required = true, value_name = "METHOD")]
    pub methods: Vec<String>,

    /// Entity type the methods query
    #[arg(short = 'r', long = "root", value_name = "TYPE")]
    pub root: String,

    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Debug, Serialize)]
pub struct PartView {
    pub path: String,
    pub keyword: String,
    pub arguments: usize,
    pub ignore_case: IgnoreCase,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub path: String,
    pub direction: Direction,
    pub ignore_case: bool,
}

/// A parsed method as printed by the CLI.
#[derive(Debug, Serialize)]
pub struct TreeView {
    pub method: String,
    pub root_type: String,
    pub intent: Intent,
    pub distinct: bool,
    pub limit: Option<usize>,
    pub or_groups: Vec<Vec<PartView>>,
    pub ordering: Vec<OrderView>,
    pub argument_count: usize,
    pub canonical: String,
}

impl TreeView {
    pub fn new(method: &str, tree: &PredicateTree, vocabulary: &KeywordVocabulary) -> Self {
        Self {
            method: method.to_string(),
            root_type: tree.root_type().to_string(),
            intent: tree.intent(),
            distinct: tree.is_distinct(),
            limit: tree.limit().map(|limit| limit.get()),
            or_groups: tree
                .or_groups()
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .map(|part| PartView {
                            path: part.property().to_dot_path(),
                            keyword: part.keyword().name().to_string(),
                            arguments: part.argument_count(),
                            ignore_case: part.ignore_case(),
                        })
                        .collect()
                })
                .collect(),
            ordering: tree
                .ordering()
                .iter()
                .map(|order| OrderView {
                    path: order.property.to_dot_path(),
                    direction: order.direction,
                    ignore_case: order.ignore_case,
                })
                .collect(),
            argument_count: tree.argument_count(),
            canonical: tree.canonical(vocabulary),
        }
    }

    fn ordering_summary(&self) -> String {
        if self.ordering.is_empty() {
            return "-".to_string();
        }
        self.ordering
            .iter()
            .map(|order| format!("{} {}", order.path, order.direction.token()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl TableDisplay for TreeView {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        set_header(&mut table, options, &["Group", "Property", "Keyword", "Arguments", "Ignore case"]);

        if self.or_groups.is_empty() {
            table.add_row(vec![Cell::new("-"), Cell::new("(no criteria)")]);
            return table;
        }

        for (index, group) in self.or_groups.iter().enumerate() {
            for part in group {
                table.add_row(vec![
                    Cell::new(index + 1),
                    Cell::new(&part.path),
                    Cell::new(&part.keyword),
                    Cell::new(part.arguments),
                    Cell::new(format!("{:?}", part.ignore_case)),
                ]);
            }
        }
        table
    }

    fn to_compact(&self) -> String {
        format!("{} => {} ({} argument(s))", self.method, self.canonical, self.argument_count)
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct TreeViews(pub Vec<TreeView>);

impl TableDisplay for TreeViews {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        set_header(&mut table, options, &["Method", "Canonical", "Arguments"]);
        for view in &self.0 {
            table.add_row(vec![
                Cell::new(&view.method),
                Cell::new(&view.canonical),
                Cell::new(view.argument_count),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0.iter().map(TreeView::to_compact).collect::<Vec<_>>().join("\n")
    }
}

pub fn handle_parse(args: ParseArgs, config: Option<&Path>, output: &OutputManager) -> Result<()> {
    let session = Session::open(config, &args.sources, output)?;
    let vocabulary = session.parser.vocabulary();

    let mut views = Vec::new();
    let mut failures = 0usize;
    for method in &args.methods {
        match session.parser.parse(method, &args.root) {
            Ok(tree) => {
                log::debug!("parsed {method} against {}", args.root);
                views.push(TreeView::new(method, &tree, vocabulary));
            }
            Err(err) => {
                failures += 1;
                report_syntax_error(output, method, &err);
            }
        }
    }

    match output.options.output_format {
        OutputFormat::Table => {
            for view in &views {
                output.heading(&view.method);
                output.key_value("Root", &view.root_type);
                output.key_value("Intent", &view.intent.to_string());
                if view.distinct {
                    output.key_value("Distinct", "yes");
                }
                if let Some(limit) = view.limit {
                    output.key_value("Limit", &limit.to_string());
                }
                output.key_value("Order by", &view.ordering_summary());
                output.key_value("Canonical", &view.canonical);
                output.display(view)?;
            }
        }
        _ => match views.as_slice() {
            [] => {}
            [single] => output.display(single)?,
            _ => output.display(&TreeViews(views))?,
        },
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} method name(s) could not be parsed", args.methods.len());
    }
    Ok(())
}

fn report_syntax_error(output: &OutputManager, method: &str, err: &QuerySyntaxError) {
    output.error(&format!("{method}: {err}"));
    if !method.is_empty() {
        output.pointer(method, err.position);
    }
    if let Some(cause) = &err.cause {
        output.indented(ICONS.arrow, &cause.to_string());
        if let Some(metadata) = &cause.cause {
            output.indented(ICONS.arrow, &metadata.root_cause().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoquery::{EntityRegistry, QueryMethodParser, StaticInspector, TypeDescriptor, TypeRef};
    use std::sync::Arc;

    fn parser() -> QueryMethodParser {
        let inspector = StaticInspector::new()
            .with_type(
                TypeDescriptor::new("Person")
                    .id("id", TypeRef::named("u64"))
                    .member("lastname", TypeRef::named("String"))
                    .member("age", TypeRef::named("u32")),
            );
        QueryMethodParser::new(Arc::new(EntityRegistry::with_defaults(Arc::new(inspector))))
    }

    #[test]
    fn test_tree_view() {
        let parser = parser();
        let method = "findTop2ByLastnameAndAgeGreaterThanOrderByAgeDesc";
        let tree = parser.parse(method, "Person").unwrap();
        let view = TreeView::new(method, &tree, parser.vocabulary());

        assert_eq!(view.limit, Some(2));
        assert_eq!(view.or_groups.len(), 1);
        assert_eq!(view.or_groups[0][1].keyword, "GreaterThan");
        assert_eq!(view.argument_count, 2);
        assert_eq!(view.ordering_summary(), "age Desc");
        assert!(view.to_compact().starts_with(method));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["intent"], "find");
        assert_eq!(json["or_groups"][0][0]["path"], "lastname");
    }

    #[test]
    fn test_tree_view_table() {
        let parser = parser();
        let tree = parser.parse("findAll", "Person").unwrap();
        let view = TreeView::new("findAll", &tree, parser.vocabulary());
        let options = GlobalOptions {
            no_color: true,
            ..Default::default()
        };
        assert!(view.to_table(&options).to_string().contains("(no criteria)"));
        assert_eq!(view.ordering_summary(), "-");
    }
}
