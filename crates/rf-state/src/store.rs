//! Project persistence
//!
//! Projects are stored one JSON file per project under a root directory,
//! next to an `assets/` directory holding imported audio copies.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rf_core::{RfError, RfResult};

use crate::{Project, ProjectId};

/// Listing entry
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub node_count: usize,
}

/// Load/save boundary for project graphs
pub trait ProjectStore {
    fn load(&self, id: ProjectId) -> RfResult<Project>;
    fn save(&self, project: &Project) -> RfResult<()>;
    /// Newest first
    fn list(&self) -> RfResult<Vec<ProjectSummary>>;
    fn delete(&self, id: ProjectId) -> RfResult<()>;
}

/// Directory of `<id>.json` project files
#[derive(Debug, Clone)]
pub struct JsonProjectStore {
    root: PathBuf,
}

impl JsonProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Per-user data directory
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("rf-choreo"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where imported audio copies live
    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn path_for(&self, id: ProjectId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

impl ProjectStore for JsonProjectStore {
    fn load(&self, id: ProjectId) -> RfResult<Project> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(RfError::State(format!("project {id} not found")));
        }
        Project::load_from(path)
    }

    fn save(&self, project: &Project) -> RfResult<()> {
        project.save_to(self.path_for(project.id))?;
        log::info!("Saved project '{}' to {}", project.name, self.root.display());
        Ok(())
    }

    fn list(&self) -> RfResult<Vec<ProjectSummary>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match Project::load_from(&path) {
                Ok(p) => summaries.push(ProjectSummary {
                    id: p.id,
                    name: p.name.clone(),
                    created_at: p.created_at,
                    node_count: p.nodes().len(),
                }),
                Err(e) => log::warn!("Skipping unreadable project '{}': {}", path.display(), e),
            }
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    fn delete(&self, id: ProjectId) -> RfResult<()> {
        fs::remove_file(self.path_for(id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example_guitar;

    #[test]
    fn test_store_roundtrip_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonProjectStore::new(dir.path());

        let project = example_guitar().unwrap();
        store.save(&project).unwrap();

        let loaded = store.load(project.id).unwrap();
        assert_eq!(loaded, project);

        let list = store.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "Example Project 2");
        assert_eq!(list[0].node_count, 1);

        store.delete(project.id).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(store.load(project.id).is_err());
    }

    #[test]
    fn test_list_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("junk.json"), "{not json").unwrap();
        let store = JsonProjectStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());
    }
}
