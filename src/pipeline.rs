//! Train and eval graph builds.
//!
//! The training build fits the card mapping and the feature schema; the eval
//! build borrows both read-only, so the two graphs share card indices and
//! feature width but no node or edge storage.

use serde::Serialize;
use tracing::{info, warn};

use crate::assembler::{assemble, AssemblyReport};
use crate::csv_reader::TransactionRecord;
use crate::error::Result;
use crate::features::{EncodeReport, FeatureEncoder, FeatureSchema};
use crate::graph::BipartiteGraph;
use crate::registry::{EntityIndex, IndexAssigner, IndexLookup};

/// Recovered per-record issues of one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub records: usize,
    pub encoding: EncodeReport,
    pub assembly: AssemblyReport,
    /// Records without a fraud label in a dataset that otherwise has them.
    pub missing_labels: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingBuild {
    pub graph: BipartiteGraph,
    pub mapping: EntityIndex,
    pub schema: FeatureSchema,
    pub report: BuildReport,
}

#[derive(Debug, Clone)]
pub struct EvalBuild {
    pub graph: BipartiteGraph,
    pub report: BuildReport,
}

/// Labels for the whole dataset, or `None` unless every record carries one.
fn collect_labels(records: &[TransactionRecord]) -> (Option<Vec<bool>>, usize) {
    let labels: Vec<Option<bool>> = records.iter().map(TransactionRecord::label).collect();
    let missing = labels.iter().filter(|l| l.is_none()).count();
    if missing == 0 {
        return (Some(labels.into_iter().flatten().collect()), 0);
    }
    if missing < records.len() {
        warn!(
            "{} of {} records have no fraud label; treating the dataset as unlabeled",
            missing,
            records.len()
        );
        return (None, missing);
    }
    (None, 0)
}

// Builds the training graph and fits what the eval build reuses
// Inputs: training records in file order
// Outputs: graph, card mapping, feature schema and recovered-issue report
// Key steps:
// 1. Fit product levels and encode features
// 2. Collect labels (all or nothing)
// 3. Assemble edges while assigning card indices
pub fn build_training_graph(records: &[TransactionRecord]) -> Result<TrainingBuild> {
    info!("Processing card nodes and transaction features for {} records", records.len());

    let mut encoder = FeatureEncoder::new();
    encoder.fit(records);
    let encoded = encoder.encode(records)?;
    let (labels, missing_labels) = collect_labels(records);

    let mut assigner = IndexAssigner::new();
    let assembly = assemble(records, encoded.matrix, labels, &mut assigner)?;
    let mapping = assigner.finish();
    info!("Found {} unique cards", mapping.len());

    let schema = encoder.schema().cloned().unwrap_or_default();
    Ok(TrainingBuild {
        graph: assembly.graph,
        mapping,
        schema,
        report: BuildReport {
            records: records.len(),
            encoding: encoded.report,
            assembly: assembly.report,
            missing_labels,
        },
    })
}

/// Builds an eval graph against a frozen training mapping and schema. Cards
/// absent from `mapping` leave their transactions without edges.
pub fn build_eval_graph(
    records: &[TransactionRecord],
    mapping: &EntityIndex,
    schema: &FeatureSchema,
) -> Result<EvalBuild> {
    let mut lookup = IndexLookup::new(mapping)?;
    let encoder = FeatureEncoder::with_schema(schema.clone());
    let encoded = encoder.encode(records)?;
    let (labels, missing_labels) = collect_labels(records);

    let assembly = assemble(records, encoded.matrix, labels, &mut lookup)?;
    if assembly.report.unseen_entity > 0 {
        info!(
            "{} eval transactions reference cards unseen in training",
            assembly.report.unseen_entity
        );
    }

    Ok(EvalBuild {
        graph: assembly.graph,
        report: BuildReport {
            records: records.len(),
            encoding: encoded.report,
            assembly: assembly.report,
            missing_labels,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn test_partial_labels_make_dataset_unlabeled() {
        let records = vec![
            TransactionRecord::new("1", Some("A"), 1.0, "W").with_label(true),
            TransactionRecord::new("2", Some("A"), 1.0, "W"),
        ];
        let build = build_training_graph(&records).unwrap();

        assert!(!build.graph.is_labeled());
        assert_eq!(build.report.missing_labels, 1);
    }

    #[test]
    fn test_eval_needs_fitted_mapping() {
        let records = vec![TransactionRecord::new("1", Some("A"), 1.0, "W")];
        let err = build_eval_graph(&records, &EntityIndex::default(), &FeatureSchema::default()).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, GraphError::EmptyMapping));
    }

    #[test]
    fn test_training_outputs_share_schema_width() {
        let records = vec![
            TransactionRecord::new("1", Some("A"), 10.0, "W").with_label(false),
            TransactionRecord::new("2", Some("B"), 20.0, "C").with_label(true),
        ];
        let build = build_training_graph(&records).unwrap();

        assert_eq!(build.graph.feature_width(), build.schema.width());
        assert_eq!(build.mapping.len(), 2);
        assert_eq!(build.report.records, 2);
    }
}
