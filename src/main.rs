use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use lineage_layout::cli;
use lineage_layout::config::LayoutConfig;
use lineage_layout::hierarchic::{HierarchicLayout, LayoutOutcome};
use std::path::PathBuf;

/// Hierarchic layout for lineage graphs
#[derive(Parser, Debug)]
#[command(name = "lineage-layout")]
#[command(version)]
#[command(about = "Compute layered node positions for a directed graph", long_about = None)]
struct Args {
    /// Input graph document, JSON or YAML (use "-" for stdin)
    #[arg(value_name = "INPUT", required_unless_present_any = ["completions", "list_presets"])]
    input: Option<PathBuf>,

    /// Output file path (defaults to stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Layout config file (TOML or YAML)
    #[arg(short, long, value_name = "CONFIG", conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Built-in config preset
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,

    /// Layer direction: LR, TB, RL or BT
    #[arg(long)]
    orientation: Option<String>,

    /// Layering strategy: DEFAULT, TOPOLOGICAL, BFS or WEIGHTED
    #[arg(long)]
    strategy: Option<String>,

    /// Node weight heuristic: BARYCENTER or MEDIAN
    #[arg(long)]
    heuristic: Option<String>,

    /// Component arrangement: COMPACT or SPREAD
    #[arg(long)]
    arrangement: Option<String>,

    /// Seed for randomized restarts
    #[arg(long)]
    seed: Option<u64>,

    /// Try randomized start orders during crossing minimization
    #[arg(long)]
    randomize: bool,

    /// Include layer and sequence assignments in the output
    #[arg(long)]
    with_layers: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    /// List built-in presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn apply_overrides(config: &mut LayoutConfig, args: &Args) -> Result<()> {
    if let Some(value) = &args.orientation {
        config.set_layout_orientation(value)?;
    }
    if let Some(value) = &args.strategy {
        config.set_layering_strategy(value)?;
    }
    if let Some(value) = &args.heuristic {
        config.set_weight_heuristic(value)?;
    }
    if let Some(value) = &args.arrangement {
        config.set_arrangement_policy(value)?;
    }
    if let Some(seed) = args.seed {
        config.sequencing.random_seed = seed;
    }
    if args.randomize {
        config.sequencing.randomize = true;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "lineage-layout", &mut std::io::stdout());
        return Ok(());
    }
    if args.list_presets {
        for name in LayoutConfig::list_builtins() {
            println!("{name}");
        }
        return Ok(());
    }

    cli::init_tracing(args.verbose);

    let Some(input) = args.input.as_deref() else {
        bail!("No input given");
    };
    let source = cli::read_source(input)?;
    let document = cli::parse_document(input, &source)?;
    let mut config = cli::resolve_config(
        args.config.as_deref(),
        args.preset.as_deref(),
        document.config.clone(),
    )?;
    apply_overrides(&mut config, &args)?;

    let layout = HierarchicLayout::new(document.nodes, document.edges, config);
    let mut result = match layout.execute_layout()? {
        LayoutOutcome::Completed(result) => result,
        LayoutOutcome::Cancelled => bail!("Layout was cancelled"),
    };
    if !args.with_layers {
        result.layers = None;
        result.sequence = None;
        result.crossings = None;
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .context("Failed to serialize layout result")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            eprintln!("Layout saved to: {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
