//! Card graph library
//!
//! Builds a bipartite transaction ↔ card graph from tabular transaction
//! records and computes connectivity and fraud-concentration statistics over
//! it, for a training dataset and an eval dataset that reuses the training
//! card mapping.

pub mod aggregate;
pub mod assembler;
pub mod config;
pub mod connectivity;
pub mod csv_reader;
pub mod error;
pub mod features;
pub mod graph;
pub mod neighborhood;
pub mod pipeline;
pub mod registry;
pub mod store;


pub use aggregate::{Aggregator, Analysis, EntityCategory, GraphAnalysis};
pub use config::AppConfig;
pub use csv_reader::TransactionRecord;
pub use error::{GraphError, Result};
pub use features::{FeatureEncoder, FeatureSchema};
pub use graph::{BipartiteGraph, NodeType, Relation};
pub use pipeline::{build_eval_graph, build_training_graph};
pub use registry::EntityIndex;
pub use store::{GraphName, GraphStore};
