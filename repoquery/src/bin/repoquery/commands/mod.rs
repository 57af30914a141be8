pub mod entities;
pub mod keywords;
pub mod parse;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use repoquery::{EntityRegistry, QueryMethodParser};

use crate::context::ProjectContext;
use crate::output::OutputManager;
use crate::scanner::ScannedProject;

/// Where to look for struct declarations.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Source directory to scan, relative to the project root (repeatable; replaces [scan].sources)
    #[arg(short = 's', long = "source", value_name = "DIR")]
    pub sources: Vec<PathBuf>,
}

/// Scanned project with a registry and parser built from its configuration.
pub struct Session {
    pub project: ScannedProject,
    pub registry: Arc<EntityRegistry>,
    pub parser: QueryMethodParser,
}

impl Session {
    pub fn open(config: Option<&Path>, sources: &SourceArgs, output: &OutputManager) -> Result<Self> {
        let ctx = ProjectContext::find(config)?;
        output.verbose(&format!("project root: {}", ctx.project_root.display()));
        output.verbose(&format!("configuration: {}", ctx.config_source()));

        let project = ScannedProject::scan(&ctx, &sources.sources, output)?;
        if project.is_empty() {
            output.warning("No structs with named fields found in the scanned sources.");
        }

        let registry = Arc::new(EntityRegistry::from_config(
            Arc::new(project.inspector()),
            &ctx.config.parser,
        ));
        let parser = QueryMethodParser::with_config(Arc::clone(&registry), &ctx.config.parser)?;

        Ok(Self {
            project,
            registry,
            parser,
        })
    }
}
