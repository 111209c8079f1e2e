//! Project container

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rf_core::{number_of_beats, timeline_end, Bpm, RfError, RfResult, TimeSignature};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{next_default_name, AudioClip, ClipId, Node, NodeId};

/// On-disk format version written by this build
pub const PROJECT_SCHEMA_VERSION: u32 = 1;

/// Unique project identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = RfError;

    fn from_str(s: &str) -> RfResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| RfError::InvalidParam(format!("bad project id '{s}': {e}")))
    }
}

/// A song: tempo, meter and the speakers choreographed over it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default = "current_schema")]
    pub schema_version: u32,
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub(crate) bpm: Bpm,
    pub(crate) time_signature: TimeSignature,
    /// Sorted by layout index
    pub(crate) nodes: Vec<Node>,
}

fn current_schema() -> u32 {
    PROJECT_SCHEMA_VERSION
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema_version: PROJECT_SCHEMA_VERSION,
            id: ProjectId::new(),
            name: name.into(),
            created_at: Utc::now(),
            bpm: Bpm::default(),
            time_signature: TimeSignature::default(),
            nodes: Vec::new(),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    pub fn bpm(&self) -> Bpm {
        self.bpm
    }

    #[inline]
    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> RfResult<&Node> {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| RfError::NodeNotFound(id.to_string()))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> RfResult<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| RfError::NodeNotFound(id.to_string()))
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Node currently holding `clip`
    pub fn clip_owner(&self, clip: ClipId) -> Option<(&Node, &AudioClip)> {
        self.nodes
            .iter()
            .find_map(|n| n.clip(clip).map(|c| (n, c)))
    }

    /// True when any node is soloed
    pub fn solo_active(&self) -> bool {
        self.nodes.iter().any(|n| n.solo)
    }

    // ─── Timeline ────────────────────────────────────────────────────────

    /// Latest clip end across all nodes at the current tempo
    pub fn max_clip_end(&self) -> Option<f64> {
        self.nodes
            .iter()
            .filter_map(|n| n.max_clip_end(self.bpm))
            .reduce(f64::max)
    }

    pub fn number_of_beats(&self) -> u32 {
        number_of_beats(self.max_clip_end(), self.time_signature)
    }

    /// Offset at which playback stops on its own
    pub fn timeline_end(&self) -> f64 {
        timeline_end(self.number_of_beats(), self.time_signature)
    }

    // ─── Structure ───────────────────────────────────────────────────────

    /// Append a node in the next layout slot; `None` picks a default name
    pub(crate) fn push_node(&mut self, name: Option<String>) -> NodeId {
        let layout_index = self
            .nodes
            .iter()
            .map(|n| n.layout_index + 1)
            .max()
            .unwrap_or(0);
        let name = name.unwrap_or_else(|| next_default_name(self.nodes.iter().map(|n| n.name.as_str())));
        let node = Node::new(name, layout_index);
        let id = node.id;
        self.nodes.push(node);
        self.nodes.sort_by_key(|n| n.layout_index);
        id
    }

    /// Insert a fully built node (demo content, imports)
    pub fn insert_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        self.nodes.sort_by_key(|n| n.layout_index);
        id
    }

    // ─── Validation / IO ─────────────────────────────────────────────────

    pub fn validate(&self) -> RfResult<()> {
        if self.schema_version > PROJECT_SCHEMA_VERSION {
            return Err(RfError::Serialization(format!(
                "project schema {} is newer than supported {}",
                self.schema_version, PROJECT_SCHEMA_VERSION
            )));
        }
        for node in &self.nodes {
            node.validate()?;
        }
        Ok(())
    }

    /// Load and validate a project file
    pub fn load_from<P: AsRef<Path>>(path: P) -> RfResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut project: Project =
            serde_json::from_str(&content).map_err(|e| RfError::Serialization(e.to_string()))?;
        project.nodes.sort_by_key(|n| n.layout_index);
        project.validate()?;
        log::debug!("Loaded project '{}' ({} nodes)", project.name, project.nodes.len());
        Ok(project)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> RfResult<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| RfError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new("New Project")
    }
}
