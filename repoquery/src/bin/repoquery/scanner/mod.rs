//! Source scanning: finds struct declarations in a project and describes them
//! for a [`StaticInspector`].

mod discovery;
mod parser;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use repoquery::StaticInspector;

use crate::context::ProjectContext;
use crate::output::OutputManager;

pub use discovery::discover_sources;
pub use parser::{ScannedType, parse_source_file};

/// Every struct described in the scanned sources, keyed by registered name.
pub struct ScannedProject {
    pub types: Vec<ScannedType>,
}

impl ScannedProject {
    pub fn scan(ctx: &ProjectContext, explicit_sources: &[PathBuf], output: &OutputManager) -> Result<Self> {
        let dirs = ctx.source_dirs(explicit_sources);
        let files = discover_sources(&ctx.project_root, &dirs)?;
        output.verbose(&format!("scanning {} file(s)", files.len()));

        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut types: Vec<ScannedType> = Vec::new();
        for file in &files {
            for scanned in parse_source_file(&file.path, &file.relative_path)? {
                match by_name.get(&scanned.descriptor.name) {
                    Some(&index) => {
                        output.warning(&format!(
                            "{} is declared in both {}:{} and {}:{}; using the latter",
                            scanned.descriptor.name,
                            types[index].relative_path,
                            types[index].line,
                            scanned.relative_path,
                            scanned.line
                        ));
                        types[index] = scanned;
                    }
                    None => {
                        by_name.insert(scanned.descriptor.name.clone(), types.len());
                        types.push(scanned);
                    }
                }
            }
        }

        log::debug!("described {} type(s) from {} file(s)", types.len(), files.len());
        Ok(Self { types })
    }

    pub fn inspector(&self) -> StaticInspector {
        self.types.iter().map(|scanned| scanned.descriptor.clone()).collect()
    }

    /// Names of structs deriving `Entity`; every scanned struct when none does.
    pub fn entity_names(&self) -> Vec<&str> {
        let derived: Vec<&str> = self
            .types
            .iter()
            .filter(|scanned| scanned.derives_entity)
            .map(|scanned| scanned.descriptor.name.as_str())
            .collect();
        if derived.is_empty() {
            self.types.iter().map(|scanned| scanned.descriptor.name.as_str()).collect()
        } else {
            derived
        }
    }

    pub fn find(&self, type_name: &str) -> Option<&ScannedType> {
        self.types.iter().find(|scanned| scanned.descriptor.name == type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::GlobalOptions;
    use repoquery::MemberInspector;

    #[test]
    fn test_scan_project() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(
            src.join("model.rs"),
            "#[derive(Entity)]\nstruct Person { id: u64, address: Address }\nstruct Address { city: String }\n",
        )
        .unwrap();

        let ctx = ProjectContext::from_root(dir.path().to_path_buf(), None).unwrap();
        let output = OutputManager::new(GlobalOptions {
            quiet: true,
            ..Default::default()
        });
        let project = ScannedProject::scan(&ctx, &[], &output).unwrap();

        assert_eq!(project.entity_names(), ["Person"]);
        assert!(project.find("Address").is_some());
        assert!(project.inspector().describe("Address").is_some());
        assert!(!project.is_empty());
    }
}
