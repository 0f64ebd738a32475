//! Card identifier → dense index registry.
//!
//! The mapping is fitted once on the training records ([`IndexAssigner`]) and
//! then reused read-only for every later build ([`IndexLookup`]), so card
//! indices are comparable between the train and eval graphs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Outcome of resolving a raw card identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Known(usize),
    /// Not present in a reused mapping. Callers skip the edge.
    Unseen,
}

/// Insertion-ordered table of raw card ids. Index `i` belongs to the i-th
/// distinct id observed while fitting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct EntityIndex {
    raw_ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl EntityIndex {
    pub fn len(&self) -> usize {
        self.raw_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_ids.is_empty()
    }

    pub fn get(&self, raw_id: &str) -> Option<usize> {
        self.positions.get(raw_id).copied()
    }

    pub fn raw_id(&self, index: usize) -> Option<&str> {
        self.raw_ids.get(index).map(String::as_str)
    }

    /// `(raw_id, dense_index)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.raw_ids
            .iter()
            .enumerate()
            .map(|(index, raw)| (raw.as_str(), index))
    }

    fn insert(&mut self, raw_id: &str) -> usize {
        if let Some(&index) = self.positions.get(raw_id) {
            return index;
        }
        let index = self.raw_ids.len();
        self.raw_ids.push(raw_id.to_string());
        self.positions.insert(raw_id.to_string(), index);
        index
    }
}

impl TryFrom<Vec<String>> for EntityIndex {
    type Error = GraphError;

    fn try_from(raw_ids: Vec<String>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(raw_ids.len());
        for (index, raw) in raw_ids.iter().enumerate() {
            if positions.insert(raw.clone(), index).is_some() {
                return Err(GraphError::DuplicateEntity(raw.clone()));
            }
        }
        Ok(Self { raw_ids, positions })
    }
}

impl From<EntityIndex> for Vec<String> {
    fn from(index: EntityIndex) -> Self {
        index.raw_ids
    }
}

/// Resolves raw card ids during graph assembly.
pub trait EntityResolver {
    fn resolve(&mut self, raw_id: &str) -> Resolution;

    /// Number of card nodes the assembled graph must carry.
    fn entity_count(&self) -> usize;
}

/// Fit mode: every new id gets the next unused index. `&mut` keeps a single
/// writer so allocation stays gap-free and reproducible.
#[derive(Debug, Default)]
pub struct IndexAssigner {
    index: EntityIndex,
}

impl IndexAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> EntityIndex {
        self.index
    }
}

impl EntityResolver for IndexAssigner {
    fn resolve(&mut self, raw_id: &str) -> Resolution {
        Resolution::Known(self.index.insert(raw_id))
    }

    fn entity_count(&self) -> usize {
        self.index.len()
    }
}

/// Reuse mode: pure lookup against a frozen mapping.
#[derive(Debug, Clone, Copy)]
pub struct IndexLookup<'a> {
    index: &'a EntityIndex,
}

impl<'a> IndexLookup<'a> {
    pub fn new(index: &'a EntityIndex) -> Result<Self> {
        if index.is_empty() {
            return Err(GraphError::EmptyMapping);
        }
        Ok(Self { index })
    }

    pub fn lookup(&self, raw_id: &str) -> Resolution {
        match self.index.get(raw_id) {
            Some(index) => Resolution::Known(index),
            None => Resolution::Unseen,
        }
    }
}

impl EntityResolver for IndexLookup<'_> {
    fn resolve(&mut self, raw_id: &str) -> Resolution {
        self.lookup(raw_id)
    }

    fn entity_count(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigns_in_first_seen_order() {
        let mut assigner = IndexAssigner::new();
        let resolved: Vec<Resolution> = ["B", "A", "B", "C", "A"]
            .iter()
            .map(|id| assigner.resolve(id))
            .collect();

        assert_eq!(
            resolved,
            vec![
                Resolution::Known(0),
                Resolution::Known(1),
                Resolution::Known(0),
                Resolution::Known(2),
                Resolution::Known(1),
            ]
        );
        let index = assigner.finish();
        assert_eq!(index.len(), 3);
        assert_eq!(index.raw_id(2), Some("C"));
        assert_eq!(index.iter().collect::<Vec<_>>(), vec![("B", 0), ("A", 1), ("C", 2)]);
    }

    #[test]
    fn test_lookup_reports_unseen_without_growing() {
        let mut assigner = IndexAssigner::new();
        assigner.resolve("A");
        assigner.resolve("B");
        let index = assigner.finish();

        let mut lookup = IndexLookup::new(&index).unwrap();
        assert_eq!(lookup.resolve("B"), Resolution::Known(1));
        assert_eq!(lookup.resolve("Z"), Resolution::Unseen);
        assert_eq!(lookup.entity_count(), 2);
        assert_eq!(index.len(), 2, "Lookup must never add ids");
    }

    #[test]
    fn test_lookup_on_empty_mapping_is_configuration_error() {
        let index = EntityIndex::default();
        let err = IndexLookup::new(&index).unwrap_err();
        assert!(matches!(err, GraphError::EmptyMapping));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_deserialize_rejects_duplicates() {
        let bytes = bincode::serialize(&vec!["A".to_string(), "A".to_string()]).unwrap();
        assert!(bincode::deserialize::<EntityIndex>(&bytes).is_err());
    }

    #[test]
    fn test_serialized_form_rebuilds_lookup() {
        let index = EntityIndex::try_from(vec!["x".to_string(), "y".to_string()]).unwrap();
        let bytes = bincode::serialize(&index).unwrap();
        let restored: EntityIndex = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.get("y"), Some(1));
        assert_eq!(restored, index);
    }
}
