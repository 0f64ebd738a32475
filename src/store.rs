//! Versioned binary artifacts for graphs, the card mapping and the feature
//! schema.
//!
//! Each file is a bincode-encoded [`Artifact`] header plus payload. Loading
//! checks the magic bytes, the format version and the artifact kind, and a
//! loaded graph is re-validated before it is handed out.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GraphError, Result};
use crate::features::FeatureSchema;
use crate::graph::BipartiteGraph;
use crate::registry::EntityIndex;

/// Magic bytes for card graph artifacts ("CGRF").
pub const MAGIC: [u8; 4] = [0x43, 0x47, 0x52, 0x46];

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Graph,
    CardMapping,
    FeatureSchema,
}

#[derive(Serialize, Deserialize)]
struct Artifact<T> {
    magic: [u8; 4],
    version: u32,
    kind: ArtifactKind,
    payload: T,
}

fn write_artifact<T: Serialize>(path: &Path, kind: ArtifactKind, payload: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let artifact = Artifact {
        magic: MAGIC,
        version: FORMAT_VERSION,
        kind,
        payload,
    };
    bincode::serialize_into(&mut writer, &artifact)?;
    writer.flush()?;
    Ok(())
}

fn read_artifact<T: DeserializeOwned>(path: &Path, kind: ArtifactKind) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    let artifact: Artifact<T> = bincode::deserialize_from(reader)?;
    if artifact.magic != MAGIC {
        return Err(GraphError::InvalidArtifact(format!(
            "{} is not a card graph artifact",
            path.display()
        )));
    }
    if artifact.version != FORMAT_VERSION {
        return Err(GraphError::VersionMismatch {
            found: artifact.version,
            expected: FORMAT_VERSION,
        });
    }
    if artifact.kind != kind {
        return Err(GraphError::InvalidArtifact(format!(
            "{} holds {:?}, expected {:?}",
            path.display(),
            artifact.kind,
            kind
        )));
    }
    Ok(artifact.payload)
}

/// Writes `graph` to `path` and returns the path as the load handle.
pub fn save<P: AsRef<Path>>(graph: &BipartiteGraph, path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    write_artifact(path, ArtifactKind::Graph, graph)?;
    Ok(path.to_path_buf())
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<BipartiteGraph> {
    let graph: BipartiteGraph = read_artifact(path.as_ref(), ArtifactKind::Graph)?;
    graph.validate()?;
    Ok(graph)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphName {
    Train,
    Eval,
}

impl GraphName {
    pub fn file_name(&self) -> &'static str {
        match self {
            GraphName::Train => "train_graph.bin",
            GraphName::Eval => "eval_graph.bin",
        }
    }
}

/// Directory holding the named graphs and their shared artifacts.
#[derive(Debug, Clone)]
pub struct GraphStore {
    root: PathBuf,
}

impl GraphStore {
    const MAPPING_FILE: &'static str = "card_mapping.bin";
    const SCHEMA_FILE: &'static str = "feature_schema.bin";

    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    pub fn graph_path(&self, name: GraphName) -> PathBuf {
        self.root.join(name.file_name())
    }

    pub fn save_graph(&self, name: GraphName, graph: &BipartiteGraph) -> Result<PathBuf> {
        let path = save(graph, self.graph_path(name))?;
        info!("Graph saved to '{}'", path.display());
        Ok(path)
    }

    pub fn load_graph(&self, name: GraphName) -> Result<BipartiteGraph> {
        load(self.graph_path(name))
    }

    pub fn save_mapping(&self, mapping: &EntityIndex) -> Result<PathBuf> {
        let path = self.root.join(Self::MAPPING_FILE);
        write_artifact(&path, ArtifactKind::CardMapping, mapping)?;
        info!("Card mapping ({} ids) saved to '{}'", mapping.len(), path.display());
        Ok(path)
    }

    pub fn load_mapping(&self) -> Result<EntityIndex> {
        read_artifact(&self.root.join(Self::MAPPING_FILE), ArtifactKind::CardMapping)
    }

    pub fn save_schema(&self, schema: &FeatureSchema) -> Result<PathBuf> {
        let path = self.root.join(Self::SCHEMA_FILE);
        write_artifact(&path, ArtifactKind::FeatureSchema, schema)?;
        Ok(path)
    }

    pub fn load_schema(&self) -> Result<FeatureSchema> {
        read_artifact(&self.root.join(Self::SCHEMA_FILE), ArtifactKind::FeatureSchema)
    }
}
