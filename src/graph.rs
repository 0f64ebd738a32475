//! Bipartite transaction ↔ card graph.
//!
//! A graph owns two node collections and two edge relations. Construction
//! goes through [`BipartiteGraph::new`], which rejects out-of-range edge
//! endpoints and reverse edges that are not the exact swap of the forward
//! ones. The value is read-only afterwards.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Width of the placeholder feature row carried by every card node.
pub const ENTITY_FEATURE_WIDTH: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Transaction,
    Card,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Transaction => write!(f, "transaction"),
            NodeType::Card => write!(f, "card"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// transaction → card
    Uses,
    /// card → transaction
    RevUses,
}

impl Relation {
    pub fn name(&self) -> &'static str {
        match self {
            Relation::Uses => "uses",
            Relation::RevUses => "rev_uses",
        }
    }

    pub fn source(&self) -> NodeType {
        match self {
            Relation::Uses => NodeType::Transaction,
            Relation::RevUses => NodeType::Card,
        }
    }

    pub fn target(&self) -> NodeType {
        match self {
            Relation::Uses => NodeType::Card,
            Relation::RevUses => NodeType::Transaction,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.source(), self.name(), self.target())
    }
}

/// Ordered `(source, target)` pairs of one relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeIndex {
    relation: Relation,
    pairs: Vec<(usize, usize)>,
}

impl EdgeIndex {
    pub fn new(relation: Relation, pairs: Vec<(usize, usize)>) -> Self {
        Self { relation, pairs }
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The same edges with endpoints swapped, tagged with `relation`.
    pub fn reversed(&self, relation: Relation) -> Self {
        Self {
            relation,
            pairs: self.pairs.iter().map(|&(src, dst)| (dst, src)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionNodes {
    pub features: Array2<f32>,
    /// `None` for unlabeled (evaluation) datasets.
    pub labels: Option<Vec<bool>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardNodes {
    /// Zero-filled `(cards, ENTITY_FEATURE_WIDTH)` placeholder.
    pub features: Array2<f32>,
}

impl CardNodes {
    pub fn placeholder(count: usize) -> Self {
        Self {
            features: Array2::zeros((count, ENTITY_FEATURE_WIDTH)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BipartiteGraph {
    transactions: TransactionNodes,
    cards: CardNodes,
    uses: EdgeIndex,
    rev_uses: EdgeIndex,
}

impl BipartiteGraph {
    pub fn new(
        transactions: TransactionNodes,
        cards: CardNodes,
        uses: EdgeIndex,
        rev_uses: EdgeIndex,
    ) -> Result<Self> {
        let graph = Self {
            transactions,
            cards,
            uses,
            rev_uses,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// A graph with no transactions, carrying `card_count` isolated cards.
    pub fn empty(feature_width: usize, card_count: usize, labeled: bool) -> Self {
        Self {
            transactions: TransactionNodes {
                features: Array2::zeros((0, feature_width)),
                labels: labeled.then(Vec::new),
            },
            cards: CardNodes::placeholder(card_count),
            uses: EdgeIndex::new(Relation::Uses, Vec::new()),
            rev_uses: EdgeIndex::new(Relation::RevUses, Vec::new()),
        }
    }

    /// Checks feature width, edge bounds, label length and forward/reverse
    /// symmetry.
    pub fn validate(&self) -> Result<()> {
        let tx_count = self.num_transactions();
        let card_count = self.num_cards();

        if self.feature_width() == 0 {
            return Err(GraphError::ShapeMismatch {
                what: "transaction feature columns",
                expected: 1,
                actual: 0,
            });
        }
        if let Some(labels) = &self.transactions.labels {
            if labels.len() != tx_count {
                return Err(GraphError::ShapeMismatch {
                    what: "transaction labels",
                    expected: tx_count,
                    actual: labels.len(),
                });
            }
        }
        if self.cards.features.ncols() != ENTITY_FEATURE_WIDTH {
            return Err(GraphError::ShapeMismatch {
                what: "card feature columns",
                expected: ENTITY_FEATURE_WIDTH,
                actual: self.cards.features.ncols(),
            });
        }
        if self.uses.relation != Relation::Uses || self.rev_uses.relation != Relation::RevUses {
            return Err(GraphError::AsymmetricEdges);
        }

        for &(src, dst) in &self.uses.pairs {
            if src >= tx_count || dst >= card_count {
                return Err(GraphError::EdgeOutOfBounds {
                    relation: Relation::Uses.name(),
                    src,
                    dst,
                    src_count: tx_count,
                    dst_count: card_count,
                });
            }
        }

        let symmetric = self.uses.len() == self.rev_uses.len()
            && self
                .uses
                .pairs
                .iter()
                .zip(&self.rev_uses.pairs)
                .all(|(&(t, c), &(rc, rt))| t == rt && c == rc);
        if !symmetric {
            return Err(GraphError::AsymmetricEdges);
        }
        Ok(())
    }

    pub fn num_transactions(&self) -> usize {
        self.transactions.features.nrows()
    }

    pub fn num_cards(&self) -> usize {
        self.cards.features.nrows()
    }

    pub fn num_nodes(&self, node_type: NodeType) -> usize {
        match node_type {
            NodeType::Transaction => self.num_transactions(),
            NodeType::Card => self.num_cards(),
        }
    }

    pub fn feature_width(&self) -> usize {
        self.transactions.features.ncols()
    }

    pub fn transaction_features(&self) -> &Array2<f32> {
        &self.transactions.features
    }

    pub fn card_features(&self) -> &Array2<f32> {
        &self.cards.features
    }

    pub fn labels(&self) -> Option<&[bool]> {
        self.transactions.labels.as_deref()
    }

    pub fn is_labeled(&self) -> bool {
        self.transactions.labels.is_some()
    }

    pub fn edges(&self, relation: Relation) -> &EdgeIndex {
        match relation {
            Relation::Uses => &self.uses,
            Relation::RevUses => &self.rev_uses,
        }
    }

    pub fn uses(&self) -> &EdgeIndex {
        &self.uses
    }

    pub fn rev_uses(&self) -> &EdgeIndex {
        &self.rev_uses
    }

    pub fn num_edges(&self) -> usize {
        self.uses.len()
    }
}

impl fmt::Display for BipartiteGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BipartiteGraph(")?;
        writeln!(
            f,
            "  transaction={{ x=[{}, {}], labeled={} }},",
            self.num_transactions(),
            self.feature_width(),
            self.is_labeled()
        )?;
        writeln!(
            f,
            "  card={{ x=[{}, {}] }},",
            self.num_cards(),
            ENTITY_FEATURE_WIDTH
        )?;
        writeln!(f, "  {}={{ edges={} }},", Relation::Uses, self.uses.len())?;
        writeln!(f, "  {}={{ edges={} }}", Relation::RevUses, self.rev_uses.len())?;
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(tx: usize) -> TransactionNodes {
        TransactionNodes {
            features: Array2::zeros((tx, 2)),
            labels: Some(vec![false; tx]),
        }
    }

    #[test]
    fn test_rejects_out_of_bounds_card() {
        let uses = EdgeIndex::new(Relation::Uses, vec![(0, 3)]);
        let rev = uses.reversed(Relation::RevUses);
        let err = BipartiteGraph::new(nodes(1), CardNodes::placeholder(2), uses, rev).unwrap_err();
        assert!(matches!(err, GraphError::EdgeOutOfBounds { dst: 3, .. }));
    }

    #[test]
    fn test_rejects_asymmetric_reverse() {
        let uses = EdgeIndex::new(Relation::Uses, vec![(0, 0), (1, 1)]);
        let rev = EdgeIndex::new(Relation::RevUses, vec![(0, 0), (1, 0)]);
        let err = BipartiteGraph::new(nodes(2), CardNodes::placeholder(2), uses, rev).unwrap_err();
        assert!(matches!(err, GraphError::AsymmetricEdges));
    }

    #[test]
    fn test_rejects_label_length_mismatch() {
        let mut tx = nodes(2);
        tx.labels = Some(vec![true]);
        let uses = EdgeIndex::new(Relation::Uses, vec![]);
        let rev = uses.reversed(Relation::RevUses);
        assert!(BipartiteGraph::new(tx, CardNodes::placeholder(1), uses, rev).is_err());
    }

    #[test]
    fn test_rejects_zero_width_features() {
        let tx = TransactionNodes {
            features: Array2::zeros((1, 0)),
            labels: None,
        };
        let uses = EdgeIndex::new(Relation::Uses, vec![(0, 0)]);
        let rev = uses.reversed(Relation::RevUses);
        let err = BipartiteGraph::new(tx, CardNodes::placeholder(1), uses, rev).unwrap_err();
        assert!(matches!(
            err,
            GraphError::ShapeMismatch { what: "transaction feature columns", actual: 0, .. }
        ));
    }

    #[test]
    fn test_accessors() {
        let uses = EdgeIndex::new(Relation::Uses, vec![(0, 1), (1, 1)]);
        let rev = uses.reversed(Relation::RevUses);
        let graph = BipartiteGraph::new(nodes(2), CardNodes::placeholder(2), uses, rev).unwrap();

        assert_eq!(graph.num_nodes(NodeType::Transaction), 2);
        assert_eq!(graph.num_nodes(NodeType::Card), 2);
        assert_eq!(graph.edges(Relation::RevUses).pairs(), &[(1, 0), (1, 1)]);
        assert_eq!(graph.rev_uses().relation(), Relation::RevUses);
        assert_eq!(graph.card_features().sum(), 0.0);
        assert!(graph.to_string().contains("(transaction, uses, card)={ edges=2 }"));
    }
}
