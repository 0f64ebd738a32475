//! Transaction feature encoding.
//!
//! Each transaction becomes `[log1p(amount), one-hot(product)]`. The product
//! levels are fitted once on the training records and frozen into a
//! [`FeatureSchema`], so train and eval feature matrices share one width.

use std::collections::BTreeSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::csv_reader::TransactionRecord;
use crate::error::{GraphError, Result};

const CATEGORY_PREFIX: &str = "prod";

/// Frozen feature layout: the amount column followed by one column per
/// product level, levels sorted lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    levels: Vec<String>,
}

impl FeatureSchema {
    pub fn fit(records: &[TransactionRecord]) -> Self {
        let levels: BTreeSet<&str> = records.iter().filter_map(|r| r.category()).collect();
        Self {
            levels: levels.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn from_levels<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let levels: BTreeSet<String> = levels.into_iter().map(Into::into).collect();
        Self {
            levels: levels.into_iter().collect(),
        }
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn width(&self) -> usize {
        1 + self.levels.len()
    }

    pub fn feature_names(&self) -> Vec<String> {
        std::iter::once("log_amount".to_string())
            .chain(
                self.levels
                    .iter()
                    .map(|level| format!("{CATEGORY_PREFIX}_{level}")),
            )
            .collect()
    }

    fn column_of(&self, level: &str) -> Option<usize> {
        self.levels
            .binary_search_by(|probe| probe.as_str().cmp(level))
            .ok()
            .map(|pos| pos + 1)
    }
}

/// Per-record data problems recovered while encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EncodeReport {
    /// Missing, negative or non-finite amounts, encoded as 0.0.
    pub clamped_amounts: usize,
    /// Levels absent from the schema, encoded as an all-zero one-hot.
    pub novel_categories: usize,
    pub missing_categories: usize,
}

#[derive(Debug, Clone)]
pub struct EncodedFeatures {
    pub matrix: Array2<f32>,
    pub report: EncodeReport,
}

/// Recovers the monetary amount from an encoded amount column value.
pub fn decode_amount(log_amount: f32) -> f64 {
    f64::from(log_amount).exp_m1()
}

pub struct FeatureEncoder {
    schema: Option<FeatureSchema>,
}

impl FeatureEncoder {
    /// An encoder with no fitted levels; call [`FeatureEncoder::fit`] first.
    pub fn new() -> Self {
        Self { schema: None }
    }

    pub fn with_schema(schema: FeatureSchema) -> Self {
        Self {
            schema: Some(schema),
        }
    }

    pub fn fit(&mut self, records: &[TransactionRecord]) -> &FeatureSchema {
        let schema = FeatureSchema::fit(records);
        debug!("Fitted {} product levels: {:?}", schema.levels.len(), schema.levels);
        self.schema.insert(schema)
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_ref()
    }

    pub fn encode(&self, records: &[TransactionRecord]) -> Result<EncodedFeatures> {
        let schema = self.schema.as_ref().ok_or(GraphError::UnfittedEncoder)?;
        let mut matrix = Array2::<f32>::zeros((records.len(), schema.width()));
        let mut report = EncodeReport::default();

        for (row, record) in records.iter().enumerate() {
            let amount = match record.amount {
                Some(amount) if amount.is_finite() && amount >= 0.0 => amount,
                _ => {
                    report.clamped_amounts += 1;
                    0.0
                }
            };
            matrix[[row, 0]] = amount.ln_1p() as f32;

            match record.category() {
                Some(level) => match schema.column_of(level) {
                    Some(col) => matrix[[row, col]] = 1.0,
                    None => report.novel_categories += 1,
                },
                None => report.missing_categories += 1,
            }
        }

        if report.clamped_amounts > 0 {
            warn!(
                "Clamped {} missing, negative or non-finite amounts to 0",
                report.clamped_amounts
            );
        }
        if report.novel_categories > 0 {
            warn!(
                "{} transactions carry product levels unknown to the schema",
                report.novel_categories
            );
        }

        Ok(EncodedFeatures { matrix, report })
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}
