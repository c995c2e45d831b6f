//! Correlation Network CLI
//!
//! Builds a correlation network for a CSV file and prints node positions and
//! significant edges, or writes a synthetic demo dataset.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use correlnet::config::NetworkConfig;
use correlnet::data::{demo, CsvOptions};
use correlnet::ObservationTable;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "correlnet")]
#[command(about = "Correlation networks for tabular data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Shortcut for --log-level debug
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a correlation network for a CSV file
    Network {
        /// Input CSV with a header row
        input: PathBuf,

        /// Columns to use (comma separated)
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Treat the first column as row labels
        #[arg(long)]
        index_col: bool,

        /// Node positions (random, var_tsne, correl_tsne)
        #[arg(long)]
        pos: Option<String>,

        /// Correlation method (pearson, spearman, kendall)
        #[arg(long)]
        method: Option<String>,

        /// Multiple-testing correction, "none" to disable
        #[arg(long)]
        correction: Option<String>,

        /// Significance threshold
        #[arg(long)]
        alpha: Option<f64>,

        /// t-SNE perplexity
        #[arg(long)]
        perplexity: Option<f64>,

        /// Random seed [default: the config seed, else 19]
        #[arg(long)]
        seed: Option<u64>,

        /// TOML configuration file; command-line options override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum node label length before shortening
        #[arg(long, default_value = "5")]
        max_label_len: usize,

        /// Title printed above the output
        #[arg(long, default_value = "Correlation Network")]
        title: String,
    },

    /// Write normally distributed demo data
    Demo {
        /// Number of observations
        #[arg(short, default_value = "200")]
        n: usize,

        /// Number of variables
        #[arg(short, default_value = "50")]
        p: usize,

        /// Random seed
        #[arg(long, default_value = "19")]
        seed: u64,

        /// Output path
        #[arg(short, long, default_value = "demo_data.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match (&cli.log_level, cli.verbose) {
        (Some(level), _) => level.clone(),
        (None, true) => "debug".to_string(),
        (None, false) => match &cli.command {
            Commands::Network {
                config: Some(path), ..
            } => NetworkConfig::load(path)
                .map(|c| c.logging.level)
                .unwrap_or_else(|_| "info".to_string()),
            _ => "info".to_string(),
        },
    };

    // Setup logging
    let level = match log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Network {
            input,
            columns,
            index_col,
            pos,
            method,
            correction,
            alpha,
            perplexity,
            seed,
            config,
            max_label_len,
            title,
        } => {
            let mut settings = match &config {
                Some(path) => NetworkConfig::load(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => NetworkConfig::default(),
            };
            if let Some(pos) = pos {
                settings.embedding = pos;
            }
            if let Some(method) = method {
                settings.method = method;
            }
            if let Some(correction) = correction {
                settings.correction = match correction.as_str() {
                    "none" => None,
                    _ => Some(correction),
                };
            }
            if let Some(alpha) = alpha {
                settings.alpha = alpha;
            }
            if let Some(perplexity) = perplexity {
                settings.tsne.perplexity = perplexity;
            }
            settings.override_seed(seed);

            let mut options = CsvOptions::default().with_index_col(index_col);
            if let Some(columns) = columns {
                options = options.with_columns(columns);
            }
            let table = ObservationTable::from_csv(&input, &options)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let network = settings
                .builder()?
                .build(&table)
                .context("Failed to build correlation network")?;
            let render = network.render_data();
            let labels = render.shortened_labels(max_label_len);

            println!("\n{}", title);
            println!(
                "method: {}  correction: {}  embedding: {}  alpha: {}",
                network.method_name(),
                settings.correction.as_deref().unwrap_or("none"),
                settings.embedding,
                network.alpha()
            );
            println!("{:=<60}", "");

            println!("\nNodes ({})", network.n_variables());
            println!("{:-<60}", "");
            println!(
                "{:>5} {:<12} {:>14} {:>14}",
                "#", "label", render.axes[0], render.axes[1]
            );
            for (i, ((x, y), label)) in render.positions.iter().zip(&labels).enumerate() {
                println!("{:>5} {:<12} {:>14.4} {:>14.4}", i, label, x, y);
            }
            for diagnostic in network.embedding().diagnostics() {
                println!("warning: {}", diagnostic);
            }

            let edges = network.undirected_edges();
            println!("\nSignificant edges ({})", edges.len());
            println!("{:-<60}", "");
            println!(
                "{:<12} {:<12} {:>14} {:>14}",
                "source", "target", "statistic", "p-value"
            );
            for edge in &edges {
                println!(
                    "{:<12} {:<12} {:>14.4} {:>14.3e}",
                    labels[edge.source_index],
                    labels[edge.target_index],
                    edge.statistic,
                    edge.pvalue
                );
            }

            let graph = network.graph();
            println!("\nDensity: {:.4}", graph.density());
            println!("Components: {}", graph.connected_components().len());
        }

        Commands::Demo { n, p, seed, output } => {
            info!("Generating {} observations of {} variables", n, p);

            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let table = demo::multivariate_normal(n, p, seed)?;
            table
                .to_csv(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!("Wrote {} x {} demo data to {}", n, p, output.display());
        }
    }

    Ok(())
}
