//! Degree and fraud-concentration statistics over a [`BipartiteGraph`].
//!
//! Per-card and per-transaction accumulation is a scatter-add over the
//! forward edges. Edges are split into chunks that rayon folds in parallel;
//! the merge is plain integer addition, so the result does not depend on the
//! chunk size or thread count.
//!
//! Quantities over an empty group are `None`, never NaN. A graph without
//! transactions yields [`Analysis::NoData`].

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::connectivity::{self, ComponentSummary};
use crate::graph::BipartiteGraph;

pub const DEFAULT_CHUNK_SIZE: usize = 65_536;
pub const DEFAULT_TOP_K: usize = 5;

// Sums `weight(pair)` into slot `key(pair)` for every edge pair
// Inputs: edge pairs, output length, chunk size, key and weight functions
// Outputs: one total per slot
// Key steps:
// 1. Each chunk folds into its own zeroed vector
// 2. Partial vectors are added element-wise
fn scatter_add<K, W>(
    pairs: &[(usize, usize)],
    len: usize,
    chunk_size: usize,
    key: K,
    weight: W,
) -> Vec<u64>
where
    K: Fn(&(usize, usize)) -> usize + Sync,
    W: Fn(&(usize, usize)) -> u64 + Sync,
{
    pairs
        .par_chunks(chunk_size.max(1))
        .fold(
            || vec![0u64; len],
            |mut acc, chunk| {
                for pair in chunk {
                    acc[key(pair)] += weight(pair);
                }
                acc
            },
        )
        .reduce(
            || vec![0u64; len],
            |mut merged, partial| {
                for (total, part) in merged.iter_mut().zip(partial) {
                    *total += part;
                }
                merged
            },
        )
}

/// Incident forward edges per card.
pub fn entity_degrees(graph: &BipartiteGraph, chunk_size: usize) -> Vec<u64> {
    scatter_add(
        graph.uses().pairs(),
        graph.num_cards(),
        chunk_size,
        |&(_, card)| card,
        |_| 1,
    )
}

/// Outgoing forward edges per transaction.
pub fn transaction_degrees(graph: &BipartiteGraph, chunk_size: usize) -> Vec<u64> {
    scatter_add(
        graph.uses().pairs(),
        graph.num_transactions(),
        chunk_size,
        |&(tx, _)| tx,
        |_| 1,
    )
}

/// Fraud-labeled incident transactions per card. The outer `None` means the
/// graph is unlabeled; a card with degree 0 gets `None`.
pub fn entity_fraud_counts(
    graph: &BipartiteGraph,
    degrees: &[u64],
    chunk_size: usize,
) -> Option<Vec<Option<u64>>> {
    let labels = graph.labels()?;
    let sums = scatter_add(
        graph.uses().pairs(),
        graph.num_cards(),
        chunk_size,
        |&(_, card)| card,
        |&(tx, _)| u64::from(labels[tx]),
    );
    Some(
        sums.into_iter()
            .zip(degrees)
            .map(|(fraud, &degree)| (degree > 0).then_some(fraud))
            .collect(),
    )
}

pub fn fraud_ratio(fraud_count: u64, degree: u64) -> Option<f64> {
    (degree > 0).then(|| fraud_count as f64 / degree as f64)
}

fn mean(sum: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityCategory {
    /// No fraud among the card's transactions.
    Clean,
    /// Every transaction on the card is fraud.
    Compromised,
    Mixed,
    /// No incident transactions.
    Isolated,
}

pub fn categorize(degree: u64, fraud_count: u64) -> EntityCategory {
    if degree == 0 {
        EntityCategory::Isolated
    } else if fraud_count == 0 {
        EntityCategory::Clean
    } else if fraud_count >= degree {
        EntityCategory::Compromised
    } else {
        EntityCategory::Mixed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub clean: usize,
    pub compromised: usize,
    pub mixed: usize,
    pub isolated: usize,
}

impl CategoryCounts {
    pub fn from_counts(degrees: &[u64], fraud: &[Option<u64>]) -> Self {
        let mut counts = Self::default();
        for (&degree, fraud) in degrees.iter().zip(fraud) {
            match categorize(degree, fraud.unwrap_or(0)) {
                EntityCategory::Clean => counts.clean += 1,
                EntityCategory::Compromised => counts.compromised += 1,
                EntityCategory::Mixed => counts.mixed += 1,
                EntityCategory::Isolated => counts.isolated += 1,
            }
        }
        counts
    }

    pub fn get(&self, category: EntityCategory) -> usize {
        match category {
            EntityCategory::Clean => self.clean,
            EntityCategory::Compromised => self.compromised,
            EntityCategory::Mixed => self.mixed,
            EntityCategory::Isolated => self.isolated,
        }
    }

    pub fn total(&self) -> usize {
        self.clean + self.compromised + self.mixed + self.isolated
    }
}

/// Fixed card-degree bands, upper bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DegreeBand {
    ExactlyOne,
    TwoToTen,
    ElevenToHundred,
    HundredOneToThousand,
    OverThousand,
}

impl DegreeBand {
    pub const ALL: [DegreeBand; 5] = [
        DegreeBand::ExactlyOne,
        DegreeBand::TwoToTen,
        DegreeBand::ElevenToHundred,
        DegreeBand::HundredOneToThousand,
        DegreeBand::OverThousand,
    ];

    pub fn of(degree: u64) -> Option<Self> {
        match degree {
            0 => None,
            1 => Some(DegreeBand::ExactlyOne),
            2..=10 => Some(DegreeBand::TwoToTen),
            11..=100 => Some(DegreeBand::ElevenToHundred),
            101..=1000 => Some(DegreeBand::HundredOneToThousand),
            _ => Some(DegreeBand::OverThousand),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DegreeBand::ExactlyOne => "exactly 1",
            DegreeBand::TwoToTen => "2 to 10",
            DegreeBand::ElevenToHundred => "11 to 100",
            DegreeBand::HundredOneToThousand => "101 to 1000",
            DegreeBand::OverThousand => "> 1000",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DegreeBuckets {
    pub exactly_one: usize,
    pub two_to_ten: usize,
    pub eleven_to_hundred: usize,
    pub hundred_one_to_thousand: usize,
    pub over_thousand: usize,
}

impl DegreeBuckets {
    pub fn from_degrees(degrees: &[u64]) -> Self {
        let mut buckets = Self::default();
        for band in degrees.iter().filter_map(|&d| DegreeBand::of(d)) {
            *buckets.slot(band) += 1;
        }
        buckets
    }

    fn slot(&mut self, band: DegreeBand) -> &mut usize {
        match band {
            DegreeBand::ExactlyOne => &mut self.exactly_one,
            DegreeBand::TwoToTen => &mut self.two_to_ten,
            DegreeBand::ElevenToHundred => &mut self.eleven_to_hundred,
            DegreeBand::HundredOneToThousand => &mut self.hundred_one_to_thousand,
            DegreeBand::OverThousand => &mut self.over_thousand,
        }
    }

    pub fn get(&self, band: DegreeBand) -> usize {
        match band {
            DegreeBand::ExactlyOne => self.exactly_one,
            DegreeBand::TwoToTen => self.two_to_ten,
            DegreeBand::ElevenToHundred => self.eleven_to_hundred,
            DegreeBand::HundredOneToThousand => self.hundred_one_to_thousand,
            DegreeBand::OverThousand => self.over_thousand,
        }
    }

    pub fn total(&self) -> usize {
        self.exactly_one
            + self.two_to_ten
            + self.eleven_to_hundred
            + self.hundred_one_to_thousand
            + self.over_thousand
    }
}

/// Mean out-degree of fraud vs non-fraud transactions, each over every
/// transaction of its group. Transactions without a card edge are included
/// with degree 0; they are not dropped from the mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DegreeSplit {
    pub fraud_transactions: usize,
    pub non_fraud_transactions: usize,
    pub fraud_mean: Option<f64>,
    pub non_fraud_mean: Option<f64>,
}

impl DegreeSplit {
    pub fn compute(tx_degrees: &[u64], labels: &[bool]) -> Self {
        let (mut fraud_sum, mut fraud_n) = (0u64, 0usize);
        let (mut legit_sum, mut legit_n) = (0u64, 0usize);
        for (&degree, &is_fraud) in tx_degrees.iter().zip(labels) {
            if is_fraud {
                fraud_sum += degree;
                fraud_n += 1;
            } else {
                legit_sum += degree;
                legit_n += 1;
            }
        }
        Self {
            fraud_transactions: fraud_n,
            non_fraud_transactions: legit_n,
            fraud_mean: mean(fraud_sum as f64, fraud_n),
            non_fraud_mean: mean(legit_sum as f64, legit_n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransactionSummary {
    pub total: usize,
    pub fraud: Option<usize>,
    pub legit: Option<usize>,
    pub fraud_rate: Option<f64>,
}

/// How heavily cards are used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardUsage {
    pub total_cards: usize,
    pub used_cards: usize,
    /// Mean transactions per card over cards with at least one.
    pub mean_transactions: Option<f64>,
    pub max_transactions: Option<u64>,
    pub multi_use_cards: usize,
    /// `multi_use_cards` over all cards.
    pub multi_use_share: Option<f64>,
    /// Highest card degrees, descending.
    pub top_degrees: Vec<u64>,
}

impl CardUsage {
    pub fn compute(degrees: &[u64], top_k: usize) -> Self {
        let used: Vec<u64> = degrees.iter().copied().filter(|&d| d > 0).collect();
        let multi_use_cards = used.iter().filter(|&&d| d > 1).count();
        let mut top_degrees = used.clone();
        top_degrees.sort_unstable_by(|a, b| b.cmp(a));
        top_degrees.truncate(top_k);

        Self {
            total_cards: degrees.len(),
            used_cards: used.len(),
            mean_transactions: mean(used.iter().sum::<u64>() as f64, used.len()),
            max_transactions: used.iter().copied().max(),
            multi_use_cards,
            multi_use_share: mean(multi_use_cards as f64, degrees.len()),
            top_degrees,
        }
    }
}

/// Fraud ratios of cards used more than once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FraudConcentration {
    pub mean_ratio: Option<f64>,
    pub max_ratio: Option<f64>,
    /// One ratio per multi-use card, in card order.
    pub ratios: Vec<f64>,
}

impl FraudConcentration {
    pub fn compute(degrees: &[u64], fraud: &[Option<u64>]) -> Self {
        let ratios: Vec<f64> = degrees
            .iter()
            .zip(fraud)
            .filter(|(&degree, _)| degree > 1)
            .filter_map(|(&degree, fraud)| fraud.and_then(|f| fraud_ratio(f, degree)))
            .collect();

        Self {
            mean_ratio: mean(ratios.iter().sum(), ratios.len()),
            max_ratio: ratios.iter().copied().reduce(f64::max),
            ratios,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphAnalysis {
    pub transactions: TransactionSummary,
    pub edges: usize,
    pub card_degrees: Vec<u64>,
    pub transaction_degrees: Vec<u64>,
    /// Per-card fraud count; absent for unlabeled graphs.
    pub fraud_per_card: Option<Vec<Option<u64>>>,
    pub categories: Option<CategoryCounts>,
    pub buckets: DegreeBuckets,
    pub usage: CardUsage,
    pub concentration: Option<FraudConcentration>,
    pub degree_split: Option<DegreeSplit>,
    pub components: ComponentSummary,
}

impl GraphAnalysis {
    pub fn card_degree(&self, card: usize) -> Option<u64> {
        self.card_degrees.get(card).copied()
    }

    pub fn card_fraud(&self, card: usize) -> Option<u64> {
        self.fraud_per_card.as_ref()?.get(card).copied().flatten()
    }

    pub fn card_fraud_ratio(&self, card: usize) -> Option<f64> {
        fraud_ratio(self.card_fraud(card)?, self.card_degree(card)?)
    }

    /// `None` for unlabeled graphs or out-of-range cards.
    pub fn card_category(&self, card: usize) -> Option<EntityCategory> {
        let degree = self.card_degree(card)?;
        self.fraud_per_card.as_ref()?;
        Some(categorize(degree, self.card_fraud(card).unwrap_or(0)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "analysis", rename_all = "snake_case")]
pub enum Analysis {
    NoData,
    Ready(Box<GraphAnalysis>),
}

impl Analysis {
    pub fn ready(&self) -> Option<&GraphAnalysis> {
        match self {
            Analysis::Ready(analysis) => Some(analysis.as_ref()),
            Analysis::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Analysis::NoData)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    pub chunk_size: usize,
    pub top_k: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl Aggregator {
    pub fn new(chunk_size: usize, top_k: usize) -> Self {
        Self { chunk_size, top_k }
    }

    // Computes every statistic of one graph
    // Inputs: a validated graph
    // Outputs: Analysis::NoData for a graph without transactions, else the full report
    // Key steps:
    // 1. Card and transaction degrees by scatter-add
    // 2. Fraud counts, categories and concentration (labeled graphs only)
    // 3. Degree buckets, card usage and connected components
    pub fn analyze(&self, graph: &BipartiteGraph) -> Analysis {
        if graph.num_transactions() == 0 {
            debug!("Graph has no transactions; skipping analysis");
            return Analysis::NoData;
        }

        let card_degrees = entity_degrees(graph, self.chunk_size);
        let transaction_degrees = transaction_degrees(graph, self.chunk_size);
        let fraud_per_card = entity_fraud_counts(graph, &card_degrees, self.chunk_size);

        let total = graph.num_transactions();
        let fraud_total = graph.labels().map(|l| l.iter().filter(|&&f| f).count());
        let transactions = TransactionSummary {
            total,
            fraud: fraud_total,
            legit: fraud_total.map(|f| total - f),
            fraud_rate: fraud_total.and_then(|f| mean(f as f64, total)),
        };

        let categories = fraud_per_card
            .as_deref()
            .map(|fraud| CategoryCounts::from_counts(&card_degrees, fraud));
        let concentration = fraud_per_card
            .as_deref()
            .map(|fraud| FraudConcentration::compute(&card_degrees, fraud));
        let degree_split = graph
            .labels()
            .map(|labels| DegreeSplit::compute(&transaction_degrees, labels));

        debug!(
            "Aggregated {} edges over {} cards",
            graph.num_edges(),
            graph.num_cards()
        );

        Analysis::Ready(Box::new(GraphAnalysis {
            transactions,
            edges: graph.num_edges(),
            buckets: DegreeBuckets::from_degrees(&card_degrees),
            usage: CardUsage::compute(&card_degrees, self.top_k),
            components: connectivity::components(graph),
            card_degrees,
            transaction_degrees,
            fraud_per_card,
            categories,
            concentration,
            degree_split,
        }))
    }
}
