// Command-line entry point. Builds the train and eval card graphs, then
// reports degree and fraud statistics for either of them.
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use card_graph::aggregate::{DegreeBand, GraphAnalysis};
use card_graph::csv_reader::read_transactions;
use card_graph::neighborhood::{card_neighborhood, pick_exemplars};
use card_graph::pipeline::BuildReport;
use card_graph::{
    build_eval_graph, build_training_graph, Analysis, AppConfig, GraphName, GraphStore,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "card_graph", about = "Transaction/card graph builder and analyzer")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = card_graph::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the training graph and fit the card mapping
    BuildTrain,
    /// Build the eval graph against the saved training mapping
    BuildEval,
    /// Print graph statistics and write them as JSON
    Analyze {
        #[arg(long, value_enum, default_value_t = Which::Train)]
        graph: Which,
    },
    /// Print one representative card per fraud pattern
    Exemplars {
        #[arg(long, value_enum, default_value_t = Which::Train)]
        graph: Which,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Which {
    Train,
    Eval,
}

impl From<Which> for GraphName {
    fn from(which: Which) -> Self {
        match which {
            Which::Train => GraphName::Train,
            Which::Eval => GraphName::Eval,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = if cli.config.exists() {
        AppConfig::load_from_path(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        AppConfig::default()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let store = GraphStore::open(&config.store.dir)
        .with_context(|| format!("Failed to open store at {}", config.store.dir.display()))?;

    match cli.command {
        Command::BuildTrain => build_train(&config, &store),
        Command::BuildEval => build_eval(&config, &store),
        Command::Analyze { graph } => analyze(&config, &store, graph.into()),
        Command::Exemplars { graph } => exemplars(&config, &store, graph.into()),
    }
}

fn build_train(config: &AppConfig, store: &GraphStore) -> Result<()> {
    let records = read_transactions(&config.data.train_csv)
        .with_context(|| format!("Failed to read {}", config.data.train_csv.display()))?;
    let build = build_training_graph(&records)?;

    println!("\nGraph Construction Complete!");
    println!("{}", build.graph);
    print_build_report(&build.report);

    store.save_graph(GraphName::Train, &build.graph)?;
    store.save_mapping(&build.mapping)?;
    store.save_schema(&build.schema)?;
    Ok(())
}

fn build_eval(config: &AppConfig, store: &GraphStore) -> Result<()> {
    let mapping = store
        .load_mapping()
        .context("Training card mapping not found; run build-train first")?;
    let schema = store
        .load_schema()
        .context("Training feature schema not found; run build-train first")?;
    let records = read_transactions(&config.data.eval_csv)
        .with_context(|| format!("Failed to read {}", config.data.eval_csv.display()))?;

    let build = build_eval_graph(&records, &mapping, &schema)?;
    println!("{}", build.graph);
    print_build_report(&build.report);

    store.save_graph(GraphName::Eval, &build.graph)?;
    Ok(())
}

fn analyze(config: &AppConfig, store: &GraphStore, name: GraphName) -> Result<()> {
    let graph = store.load_graph(name)?;
    let analysis = config.analysis.aggregator().analyze(&graph);

    match &analysis {
        Analysis::NoData => println!("Graph has no transactions; no statistics to report."),
        Analysis::Ready(stats) => print_analysis(stats),
    }

    let report_dir = config.report_dir();
    std::fs::create_dir_all(report_dir)?;
    let path = report_dir.join(format!(
        "{}_stats.json",
        name.file_name().trim_end_matches("_graph.bin")
    ));
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, &analysis)?;
    info!("Statistics written to {}", path.display());
    Ok(())
}

fn exemplars(config: &AppConfig, store: &GraphStore, name: GraphName) -> Result<()> {
    let graph = store.load_graph(name)?;
    let analysis = config.analysis.aggregator().analyze(&graph);
    let Some((stats, fraud)) = analysis
        .ready()
        .and_then(|stats| Some((stats, stats.fraud_per_card.as_deref()?)))
    else {
        println!("Graph is empty or unlabeled; no exemplars to pick.");
        return Ok(());
    };

    let picks = pick_exemplars(&stats.card_degrees, fraud);
    if picks.cards().is_empty() {
        println!("No card matches any exemplar pattern.");
    }
    for (category, card) in picks.cards() {
        let Some(hood) = card_neighborhood(&graph, card) else { continue };
        println!("\n{:?} card {} ({} transactions)", category, card, hood.transactions.len());
        for tx in &hood.transactions {
            let marker = if tx.is_fraud == Some(true) { "fraud" } else { "legit" };
            println!("  Tx {:>8}  ${:>10.2}  {}", tx.transaction, tx.amount, marker);
        }
    }
    Ok(())
}

// Prints the per-record issues recovered during a build
fn print_build_report(report: &BuildReport) {
    println!("Records: {}", report.records);
    println!("  - Missing card id:        {}", report.assembly.missing_entity);
    println!("  - Card unseen in training: {}", report.assembly.unseen_entity);
    println!("  - Clamped amounts:        {}", report.encoding.clamped_amounts);
    println!("  - Unknown product levels: {}", report.encoding.novel_categories);
    if report.missing_labels > 0 {
        println!("  - Missing fraud labels:   {}", report.missing_labels);
    }
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn num(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

// Prints the connectivity and fraud summary of one graph
// Key steps:
// 1. Overall transaction and card totals
// 2. Card degree buckets and usage
// 3. Card categories and fraud concentration (labeled graphs only)
// 4. Connected components
fn print_analysis(stats: &GraphAnalysis) {
    println!("\n[1] OVERALL TRANSACTION SUMMARY");
    println!("Total Transactions: {}", stats.transactions.total);
    if let (Some(fraud), Some(legit)) = (stats.transactions.fraud, stats.transactions.legit) {
        println!("  - Not Fraud: {}", legit);
        println!("  - Fraud:     {} ({})", fraud, pct(stats.transactions.fraud_rate));
    }
    println!("Total Unique Cards: {}", stats.usage.total_cards);

    println!("\n[2] HOW MANY TRANSACTIONS ARE CONNECTED TO EACH CARD?");
    for band in DegreeBand::ALL {
        println!("  - Cards with {:<12} transactions: {}", band.label(), stats.buckets.get(band));
    }
    println!("Average Transactions per Card: {}", num(stats.usage.mean_transactions));
    if let Some(max) = stats.usage.max_transactions {
        println!("Max Transactions on a Single Card: {}", max);
    }
    println!(
        "Cards used more than once: {} ({})",
        stats.usage.multi_use_cards,
        pct(stats.usage.multi_use_share)
    );
    println!("Top high-degree cards: {:?}", stats.usage.top_degrees);

    if let Some(categories) = &stats.categories {
        println!("\n[3] CARD CATEGORIES");
        println!("  - CLEAN CARDS (0% Fraud):          {}", categories.clean);
        println!("  - COMPROMISED CARDS (100% Fraud):  {}", categories.compromised);
        println!("  - MIXED CARDS (Fraud and Not):     {}", categories.mixed);
        println!("  - ISOLATED CARDS (no transactions): {}", categories.isolated);
    }
    if let Some(concentration) = &stats.concentration {
        println!("Average fraud ratio per card: {}", num(concentration.mean_ratio));
        println!("Max fraud ratio on a card:    {}", num(concentration.max_ratio));
    }
    if let Some(split) = &stats.degree_split {
        println!("Average degree (Fraud tx):     {}", num(split.fraud_mean));
        println!("Average degree (Non-fraud tx): {}", num(split.non_fraud_mean));
    }

    println!("\n[4] CONNECTIVITY");
    println!("Connected Components: {}", stats.components.components);
    match stats.components.largest {
        Some(largest) => println!("Largest component size: {}", largest),
        None => println!("Largest component size: n/a"),
    }
    println!("Nodes without edges: {}", stats.components.isolated_nodes);
}
