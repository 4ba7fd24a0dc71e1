//! Cutflow Demo - one traversal, many results
//!
//! This binary books a small selection over synthetic events:
//! 1. Generate events with jets and missing energy
//! 2. Book named filters, a derived column and several actions
//! 3. Read the results, which runs a single traversal
//! 4. Print the cutflow report and traversal metrics
//!
//! # Usage
//!
//! ```bash
//! cargo run --package rowflow-playground --bin cutflow-demo -- --slots 4
//! ```

use std::sync::Arc;

use clap::Parser;
use log::info;

use common_config::ExecutionConfig;
use common_error::FlowResult;
use rowflow_engine::{Engine, Histogram1D};

use rowflow_playground::{print_divider, print_header, print_report, synthetic_events};

/// Cutflow Demo CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "cutflow-demo")]
#[command(about = "Run a cutflow analysis over synthetic events")]
struct Args {
    /// Number of events to generate
    #[arg(short = 'n', long, default_value_t = 100_000)]
    events: usize,

    /// Worker slots (1 runs sequentially)
    #[arg(short, long, default_value_t = 1)]
    slots: usize,

    /// Seed of the event generator
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Minimum jet transverse momentum
    #[arg(long, default_value_t = 30.0)]
    jet_pt: f64,

    /// Print the per-traversal metrics
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> FlowResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = if args.slots > 1 {
        ExecutionConfig::threaded(args.slots)
    } else {
        ExecutionConfig::sequential()
    };

    print_header("Step 1: Generate Events");
    let source = synthetic_events(args.events, args.seed)?;
    println!("{} events, seed {}", source.len(), args.seed);

    print_header("Step 2: Book the Analysis");
    let engine = Engine::with_default_branches(Arc::new(source), config, &["jet_pt"])?;
    let min_pt = args.jet_pt;

    let selected = engine
        .root()
        .define(
            "good_jets",
            move |pt: Vec<f64>| pt.into_iter().filter(|&p| p > min_pt).collect::<Vec<_>>(),
            &[],
        )?
        .define("n_good", |good: Vec<f64>| good.len() as i64, &["good_jets"])?
        .filter_named(|n: i64| n >= 2, &["n_good"], "twoJets")?
        .filter_named(|met: f64| met > 20.0, &["met"], "met")?;
    let leading = selected
        .define(
            "lead_pt",
            |good: Vec<f64>| good.into_iter().fold(0.0, f64::max),
            &["good_jets"],
        )?
        .filter_named(|lead: f64| lead > 100.0, &["lead_pt"], "hardJet")?;

    let all_events = engine.root().count()?;
    let selected_events = selected.count()?;
    let mean_met = selected.mean("met")?;
    let jet_pt = selected.histo1d(Histogram1D::new("good_jets", 10, 0.0, 300.0)?, "good_jets")?;
    let hard = leading.count()?;
    let max_lead = leading.max::<f64>("lead_pt")?;
    println!(
        "booked {} actions, nothing has run yet",
        engine.pending_actions()?
    );

    print_header("Step 3: Results");
    println!("events:            {}", all_events.get()?);
    println!("selected:          {}", selected_events.get()?);
    println!("mean MET selected: {:.2}", mean_met.get()?);
    println!("hard-jet events:   {}", hard.get()?);
    if let Some(lead) = max_lead.get()? {
        println!("hardest jet:       {lead:.1}");
    }
    print_divider();
    let histo = jet_pt.get()?;
    for (bin, count) in histo.counts().iter().enumerate() {
        println!("  bin {bin:>2}: {count}");
    }
    println!("  overflow: {}", histo.overflow());

    print_header("Step 4: Cutflow");
    let report = leading.report()?;
    print_report(&report);

    info!("{} traversal(s) over {} slot(s)", engine.metrics().traversals(), engine.n_slots());
    if args.verbose {
        print_divider();
        print!("{}", engine.metrics().format_summary());
    }

    Ok(())
}
