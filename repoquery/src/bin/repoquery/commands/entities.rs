use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use repoquery::PersistentEntity;
use serde::Serialize;
use std::path::Path;

use super::{Session, SourceArgs};
use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputFormat, OutputManager, TableDisplay, set_header, themed_table};
use crate::scanner::ScannedProject;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Entity Metadata",
        commands: &[
            "repoquery entities                        # Every type deriving Entity and what it reaches",
            "repoquery entities --root Person -p       # Person's graph with property details",
        ],
    },
    ExampleGroup {
        title: "Scripting",
        commands: &["repoquery --output json entities -s crates/domain/src"],
    },
];

#[derive(Args, Debug)]
pub struct EntitiesArgs {
    /// Only build metadata reachable from this type
    #[arg(short = 'r', long = "root", value_name = "TYPE")]
    pub root: Option<String>,

    /// Show the properties of every entity
    #[arg(short = 'p', long)]
    pub properties: bool,

    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Debug, Serialize)]
pub struct PropertyView {
    pub name: String,
    pub declared_type: String,
    pub actual_type: String,
    pub association: bool,
    pub identifier: bool,
}

#[derive(Debug, Serialize)]
pub struct EntityView {
    pub type_name: String,
    pub identifier: Option<String>,
    /// `path:line` of the declaration
    pub source: Option<String>,
    pub properties: Vec<PropertyView>,
}

impl EntityView {
    pub fn new(entity: &PersistentEntity, project: &ScannedProject) -> Self {
        Self {
            type_name: entity.type_name().to_string(),
            identifier: entity.identifier().map(|property| property.name().to_string()),
            source: project
                .find(entity.type_name())
                .map(|scanned| format!("{}:{}", scanned.relative_path, scanned.line)),
            properties: entity
                .properties()
                .iter()
                .map(|property| PropertyView {
                    name: property.name().to_string(),
                    declared_type: property.declared_type().to_string(),
                    actual_type: property.actual_type().to_string(),
                    association: property.is_association(),
                    identifier: property.is_identifier(),
                })
                .collect(),
        }
    }

    fn association_count(&self) -> usize {
        self.properties.iter().filter(|property| property.association).count()
    }
}

impl TableDisplay for EntityView {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        set_header(&mut table, options, &["Property", "Declared type", "Association", "Identifier"]);
        for property in &self.properties {
            table.add_row(vec![
                Cell::new(&property.name),
                Cell::new(&property.declared_type),
                Cell::new(if property.association { "yes" } else { "" }),
                Cell::new(if property.identifier { "yes" } else { "" }),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let names: Vec<&str> = self.properties.iter().map(|property| property.name.as_str()).collect();
        format!("{}({})", self.type_name, names.join(", "))
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct EntityList(pub Vec<EntityView>);

impl TableDisplay for EntityList {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        set_header(&mut table, options, &["Entity", "Identifier", "Properties", "Associations", "Source"]);
        for entity in &self.0 {
            table.add_row(vec![
                Cell::new(&entity.type_name),
                Cell::new(entity.identifier.as_deref().unwrap_or("-")),
                Cell::new(entity.properties.len()),
                Cell::new(entity.association_count()),
                Cell::new(entity.source.as_deref().unwrap_or("-")),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0.iter().map(EntityView::to_compact).collect::<Vec<_>>().join("\n")
    }
}

pub fn handle_entities(args: EntitiesArgs, config: Option<&Path>, output: &OutputManager) -> Result<()> {
    let session = Session::open(config, &args.sources, output)?;

    let roots: Vec<String> = match &args.root {
        Some(root) => vec![root.clone()],
        None => session.project.entity_names().into_iter().map(str::to_string).collect(),
    };

    let mut failures = 0usize;
    for root in &roots {
        if let Err(err) = session.registry.entity_for(root) {
            failures += 1;
            output.error(&format!("{root}: {err}"));
            let cause = err.root_cause();
            if cause != &err {
                output.verbose(&format!("caused by: {cause}"));
            }
        }
    }

    let entities = EntityList(
        session
            .registry
            .entities()
            .iter()
            .map(|entity| EntityView::new(entity, &session.project))
            .collect(),
    );

    if entities.0.is_empty() {
        output.info("No entity metadata could be built.");
    } else {
        output.display(&entities)?;
        if args.properties && output.options.output_format == OutputFormat::Table {
            for entity in &entities.0 {
                output.heading(&entity.type_name);
                output.display(entity)?;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("metadata could not be built for {failures} of {} type(s)", roots.len());
    }
    let count = entities.0.len();
    output.success(&format!("{count} {} registered", if count == 1 { "entity" } else { "entities" }));
    Ok(())
}
