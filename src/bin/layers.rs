use anyhow::{Result, bail};
use clap::Parser;
use lineage_layout::cli;
use lineage_layout::hierarchic::{HierarchicLayout, LayoutOutcome};
use std::path::PathBuf;

/// Prints the layer and order assignment of a graph
#[derive(Parser, Debug)]
#[command(name = "lineage-layers")]
#[command(version)]
#[command(about = "Show how a graph is split into layers and ordered", long_about = None)]
struct Args {
    /// Input graph document, JSON or YAML (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Layout config file (TOML or YAML)
    #[arg(short, long, value_name = "CONFIG", conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Built-in config preset
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,

    /// Layering strategy: DEFAULT, TOPOLOGICAL, BFS or WEIGHTED
    #[arg(long)]
    strategy: Option<String>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    cli::init_tracing(args.verbose);

    let source = cli::read_source(&args.input)?;
    let document = cli::parse_document(&args.input, &source)?;
    let mut config = cli::resolve_config(
        args.config.as_deref(),
        args.preset.as_deref(),
        document.config.clone(),
    )?;
    if let Some(strategy) = &args.strategy {
        config.set_layering_strategy(strategy)?;
    }

    let layout = HierarchicLayout::new(document.nodes, document.edges, config);
    let result = match layout.execute_ordering()? {
        LayoutOutcome::Completed(result) => result,
        LayoutOutcome::Cancelled => bail!("Layout was cancelled"),
    };

    let order = result.sequence.unwrap_or_default();
    for (index, layer) in order.layers.iter().enumerate() {
        println!("layer {index}: {}", layer.join(", "));
    }
    let reversed = result.layers.map(|l| l.reversed_edges).unwrap_or_default();
    if !reversed.is_empty() {
        println!("reversed: {}", reversed.join(", "));
    }
    if !order.crossing_history.is_empty() {
        let history: Vec<String> = order.crossing_history.iter().map(|c| c.to_string()).collect();
        println!("crossings: {}", history.join(" -> "));
    }
    Ok(())
}
