use ndarray::Array2;
use serde::Serialize;
use tracing::{debug, info};

use crate::csv_reader::TransactionRecord;
use crate::error::{GraphError, Result};
use crate::graph::{BipartiteGraph, CardNodes, EdgeIndex, Relation, TransactionNodes};
use crate::registry::{EntityResolver, Resolution};

/// Transactions kept as nodes but left out of edge construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub missing_entity: usize,
    pub unseen_entity: usize,
}

impl AssemblyReport {
    pub fn skipped(&self) -> usize {
        self.missing_entity + self.unseen_entity
    }
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub graph: BipartiteGraph,
    pub report: AssemblyReport,
}

/// Builds the bipartite graph for one dataset.
///
/// Every record becomes a transaction node at its record position. Records
/// whose card is missing or unseen by `resolver` get no edge. The card node
/// count is whatever `resolver` knows after the pass.
pub fn assemble<R: EntityResolver>(
    records: &[TransactionRecord],
    features: Array2<f32>,
    labels: Option<Vec<bool>>,
    resolver: &mut R,
) -> Result<Assembly> {
    if features.nrows() != records.len() {
        return Err(GraphError::ShapeMismatch {
            what: "feature matrix",
            expected: records.len(),
            actual: features.nrows(),
        });
    }
    if let Some(labels) = &labels {
        if labels.len() != records.len() {
            return Err(GraphError::ShapeMismatch {
                what: "fraud labels",
                expected: records.len(),
                actual: labels.len(),
            });
        }
    }

    let mut report = AssemblyReport::default();
    let mut pairs = Vec::with_capacity(records.len());
    for (tx, record) in records.iter().enumerate() {
        let Some(raw_id) = record.card() else {
            report.missing_entity += 1;
            continue;
        };
        match resolver.resolve(raw_id) {
            Resolution::Known(card) => pairs.push((tx, card)),
            Resolution::Unseen => report.unseen_entity += 1,
        }
    }
    debug!(
        "Resolved {} edges ({} missing card, {} unseen card)",
        pairs.len(),
        report.missing_entity,
        report.unseen_entity
    );

    let card_count = resolver.entity_count();
    let uses = EdgeIndex::new(Relation::Uses, pairs);
    let rev_uses = uses.reversed(Relation::RevUses);
    let graph = BipartiteGraph::new(
        TransactionNodes { features, labels },
        CardNodes::placeholder(card_count),
        uses,
        rev_uses,
    )?;

    info!(
        "Assembled graph: {} transactions, {} cards, {} edges per direction",
        graph.num_transactions(),
        graph.num_cards(),
        graph.num_edges()
    );
    Ok(Assembly { graph, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{IndexAssigner, IndexLookup};

    fn records(cards: &[Option<&str>]) -> Vec<TransactionRecord> {
        cards
            .iter()
            .enumerate()
            .map(|(i, card)| TransactionRecord::new(i.to_string(), *card, 10.0, "W"))
            .collect()
    }

    #[test]
    fn test_forward_edges_in_record_order() {
        let recs = records(&[Some("A"), None, Some("B"), Some("A")]);
        let mut assigner = IndexAssigner::new();
        let assembly = assemble(&recs, Array2::zeros((4, 2)), None, &mut assigner).unwrap();

        assert_eq!(assembly.graph.uses().pairs(), &[(0, 0), (2, 1), (3, 0)]);
        assert_eq!(assembly.graph.rev_uses().pairs(), &[(0, 0), (1, 2), (0, 3)]);
        assert_eq!(assembly.graph.num_transactions(), 4);
        assert_eq!(assembly.graph.num_cards(), 2);
        assert_eq!(assembly.report.missing_entity, 1);
    }

    #[test]
    fn test_unseen_cards_are_skipped() {
        let mut assigner = IndexAssigner::new();
        assigner.resolve("A");
        let index = assigner.finish();

        let recs = records(&[Some("A"), Some("Z")]);
        let mut lookup = IndexLookup::new(&index).unwrap();
        let assembly = assemble(&recs, Array2::zeros((2, 1)), None, &mut lookup).unwrap();

        assert_eq!(assembly.graph.num_edges(), 1);
        assert_eq!(assembly.graph.num_cards(), 1);
        assert_eq!(assembly.report.unseen_entity, 1);
        assert_eq!(assembly.report.skipped(), 1);
    }

    #[test]
    fn test_rejects_misaligned_features() {
        let recs = records(&[Some("A"), Some("B")]);
        let err = assemble(&recs, Array2::zeros((1, 1)), None, &mut IndexAssigner::new()).unwrap_err();
        assert!(matches!(err, GraphError::ShapeMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_rejects_misaligned_labels() {
        let recs = records(&[Some("A")]);
        let err = assemble(&recs, Array2::zeros((1, 1)), Some(vec![true, false]), &mut IndexAssigner::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::ShapeMismatch { .. }));
    }
}
