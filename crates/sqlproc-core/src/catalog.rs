//! Procedure definition discovery
//!
//! Procedures are kept as one `.sql` file each in a `proceduresMethods`
//! directory, named after the procedure they create.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::Result;

/// Directory searched by [`ProcedureCatalog::discover`], relative to the
/// working directory
pub const DEFAULT_PROCEDURES_DIR: &str = "proceduresMethods";

const DEFINITION_EXTENSION: &str = "sql";

/// A procedure definition loaded from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureDefinition {
    /// File stem, used as the procedure name
    pub name: String,
    pub path: PathBuf,
    /// SQL text of the file
    pub definition: String,
}

/// Procedure definitions keyed by name
#[derive(Debug, Clone, Default)]
pub struct ProcedureCatalog {
    procedures: BTreeMap<String, ProcedureDefinition>,
}

impl ProcedureCatalog {
    /// Load `proceduresMethods` from the current working directory.
    pub fn discover() -> Result<Self> {
        let dir = std::env::current_dir()?.join(DEFAULT_PROCEDURES_DIR);
        Self::from_dir(dir)
    }

    /// Load every `.sql` file in `dir`.
    ///
    /// A missing directory is not an error; it yields an empty catalog.
    /// Subdirectories are not searched.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "procedures directory not found, using an empty catalog");
            return Ok(Self::default());
        }

        let mut procedures = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || !has_definition_extension(&path) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!(path = %path.display(), "skipping procedure file with a non UTF-8 name");
                continue;
            };

            let definition = std::fs::read_to_string(&path)?;
            procedures.insert(
                name.to_string(),
                ProcedureDefinition {
                    name: name.to_string(),
                    path: path.clone(),
                    definition,
                },
            );
        }

        tracing::debug!(dir = %dir.display(), count = procedures.len(), "procedure catalog loaded");
        Ok(Self { procedures })
    }

    pub fn get(&self, name: &str) -> Option<&ProcedureDefinition> {
        self.procedures.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.procedures.contains_key(name)
    }

    /// Procedure names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcedureDefinition> {
        self.procedures.values()
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

fn has_definition_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DEFINITION_EXTENSION))
}

#[cfg(test)]
mod tests;
