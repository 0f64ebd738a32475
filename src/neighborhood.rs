//! Per-card neighbourhoods and showcase card selection for external plotting.

use serde::Serialize;

use crate::aggregate::{categorize, EntityCategory};
use crate::features::decode_amount;
use crate::graph::BipartiteGraph;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborTransaction {
    pub transaction: usize,
    /// Amount recovered from the log-scaled feature.
    pub amount: f64,
    pub is_fraud: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardNeighborhood {
    pub card: usize,
    pub transactions: Vec<NeighborTransaction>,
}

impl CardNeighborhood {
    pub fn fraud_count(&self) -> usize {
        self.transactions
            .iter()
            .filter(|tx| tx.is_fraud == Some(true))
            .count()
    }
}

/// Transactions incident to `card`, in edge order. `None` if the card index
/// is out of range.
pub fn card_neighborhood(graph: &BipartiteGraph, card: usize) -> Option<CardNeighborhood> {
    if card >= graph.num_cards() {
        return None;
    }
    let features = graph.transaction_features();
    let labels = graph.labels();
    let transactions = graph
        .rev_uses()
        .pairs()
        .iter()
        .filter(|&&(c, _)| c == card)
        .map(|&(_, tx)| NeighborTransaction {
            transaction: tx,
            amount: decode_amount(features[[tx, 0]]),
            is_fraud: labels.map(|l| l[tx]),
        })
        .collect();
    Some(CardNeighborhood { card, transactions })
}

/// One representative card per fraud pattern, if the graph has one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Exemplars {
    /// Every transaction fraudulent, at least 3 transactions.
    pub compromised: Option<usize>,
    /// At least 2 fraudulent among at least 6 transactions.
    pub mixed: Option<usize>,
    /// Exactly 8 transactions, none fraudulent.
    pub clean: Option<usize>,
}

impl Exemplars {
    pub fn cards(&self) -> Vec<(EntityCategory, usize)> {
        [
            (EntityCategory::Compromised, self.compromised),
            (EntityCategory::Mixed, self.mixed),
            (EntityCategory::Clean, self.clean),
        ]
        .into_iter()
        .filter_map(|(category, card)| card.map(|c| (category, c)))
        .collect()
    }
}

// Picks the lowest-indexed card matching each pattern
// Skips cards without a fraud count
pub fn pick_exemplars(degrees: &[u64], fraud: &[Option<u64>]) -> Exemplars {
    let mut picks = Exemplars::default();
    for (card, (&degree, fraud)) in degrees.iter().zip(fraud).enumerate() {
        let Some(fraud) = *fraud else { continue };
        match categorize(degree, fraud) {
            EntityCategory::Compromised if degree >= 3 => {
                picks.compromised.get_or_insert(card);
            }
            EntityCategory::Mixed if fraud >= 2 && degree >= 6 => {
                picks.mixed.get_or_insert(card);
            }
            EntityCategory::Clean if degree == 8 => {
                picks.clean.get_or_insert(card);
            }
            _ => {}
        }
    }
    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{CardNodes, EdgeIndex, Relation, TransactionNodes};
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_neighborhood_recovers_amounts() {
        let uses = EdgeIndex::new(Relation::Uses, vec![(0, 1), (1, 0), (2, 1)]);
        let rev = uses.reversed(Relation::RevUses);
        let graph = BipartiteGraph::new(
            TransactionNodes {
                features: array![[(100.0f64).ln_1p() as f32], [0.0], [(5.5f64).ln_1p() as f32]],
                labels: Some(vec![true, false, false]),
            },
            CardNodes::placeholder(2),
            uses,
            rev,
        )
        .unwrap();

        let hood = card_neighborhood(&graph, 1).unwrap();
        assert_eq!(hood.transactions.len(), 2);
        assert_eq!(hood.transactions[0].transaction, 0);
        assert_relative_eq!(hood.transactions[0].amount, 100.0, max_relative = 1e-5);
        assert_relative_eq!(hood.transactions[1].amount, 5.5, max_relative = 1e-5);
        assert_eq!(hood.fraud_count(), 1);
        assert!(card_neighborhood(&graph, 2).is_none());
    }

    #[test]
    fn test_pick_exemplars() {
        let degrees = [3, 2, 6, 8, 4, 8];
        let fraud = [Some(3), Some(2), Some(2), Some(0), Some(4), Some(0)];
        let picks = pick_exemplars(&degrees, &fraud);

        assert_eq!(picks.compromised, Some(0));
        assert_eq!(picks.mixed, Some(2));
        assert_eq!(picks.clean, Some(3));
        assert_eq!(picks.cards().len(), 3);
    }

    #[test]
    fn test_no_exemplars_without_matches() {
        let picks = pick_exemplars(&[1, 1], &[Some(1), Some(0)]);
        assert_eq!(picks, Exemplars::default());
        assert!(picks.cards().is_empty());
    }
}
