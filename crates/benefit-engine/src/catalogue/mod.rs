//! Program catalogue: validated benefit programs with their rule sets and form schemas.
//!
//! Every configuration defect is reported by [`Catalogue::from_json`] and friends, so a
//! loaded catalogue can be evaluated without any further failure modes.

mod domain;
mod loader;

pub use domain::{
    Criterion, CriterionKind, EvaluationModel, FieldSpec, FieldType, FormSchema, NamedPredicate,
    Program, ProgramCategory, ProgramId, ProgramSummary, Rule, RuleSet,
};
pub use loader::{
    CatalogueDefinition, CatalogueError, CriterionDefinition, FieldDefinition, ProgramDefinition,
};

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, RwLock};

const STANDARD_CATALOGUE: &str = include_str!("../../data/standard_catalogue.json");

/// Immutable, ordered program registry.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    programs: Vec<Program>,
    index: HashMap<ProgramId, usize>,
}

impl Catalogue {
    pub fn from_definition(definition: CatalogueDefinition) -> Result<Self, CatalogueError> {
        let programs = loader::build_programs(definition)?;
        let index = programs
            .iter()
            .enumerate()
            .map(|(position, program)| (program.id.clone(), position))
            .collect();
        Ok(Self { programs, index })
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogueError> {
        let definition: CatalogueDefinition = serde_json::from_str(raw)?;
        Self::from_definition(definition)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogueError> {
        let definition: CatalogueDefinition = serde_json::from_reader(reader)?;
        Self::from_definition(definition)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogueError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| CatalogueError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Built-in catalogue covering the common federal programs.
    pub fn standard() -> Result<Self, CatalogueError> {
        Self::from_json(STANDARD_CATALOGUE)
    }

    /// Programs in catalogue order.
    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn get(&self, id: &ProgramId) -> Option<&Program> {
        self.index
            .get(id)
            .and_then(|position| self.programs.get(*position))
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn summaries(&self) -> Vec<ProgramSummary> {
        self.programs.iter().map(Program::summary).collect()
    }
}

/// Shared holder that swaps whole catalogue snapshots.
#[derive(Debug)]
pub struct CatalogueStore {
    current: RwLock<Arc<Catalogue>>,
}

impl CatalogueStore {
    pub fn new(catalogue: Catalogue) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalogue)),
        }
    }

    /// Snapshot that stays consistent for as long as the caller holds it.
    pub fn snapshot(&self) -> Arc<Catalogue> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Installs `catalogue` and returns the snapshot it replaced.
    pub fn replace(&self, catalogue: Catalogue) -> Arc<Catalogue> {
        let next = Arc::new(catalogue);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalogue_loads_in_declared_order() {
        let catalogue = Catalogue::standard().expect("standard catalogue is valid");
        let ids: Vec<&str> = catalogue
            .programs()
            .iter()
            .map(|program| program.id.as_str())
            .collect();

        assert_eq!(
            ids,
            [
                "wohngeld",
                "buergergeld",
                "kindergeld",
                "kinderzuschlag",
                "bafoeg",
                "elterngeld"
            ]
        );
        let elterngeld = catalogue
            .get(&ProgramId("elterngeld".to_string()))
            .expect("elterngeld present");
        assert_eq!(elterngeld.model, EvaluationModel::Graph);
        assert!(!elterngeld.exclusions.is_empty());
    }

    #[test]
    fn from_json_reports_parse_errors() {
        let error = Catalogue::from_json("{ \"programs\": [").expect_err("truncated JSON");
        assert!(matches!(error, CatalogueError::Parse(_)));
    }

    #[test]
    fn from_path_reports_missing_files() {
        let error = Catalogue::from_path("/definitely/not/here.json").expect_err("missing file");
        assert!(matches!(error, CatalogueError::Io { .. }));
    }

    #[test]
    fn store_replace_keeps_existing_snapshots_intact() {
        let store = CatalogueStore::new(Catalogue::standard().expect("standard"));
        let before = store.snapshot();

        let previous = store.replace(Catalogue::default());

        assert_eq!(before.len(), 6);
        assert_eq!(previous.len(), 6);
        assert!(store.snapshot().is_empty());
    }
}
