//! Burr Puzzle Disassembly Planner
//!
//! Plans how to take apart a sliding voxel burr puzzle: imports a puzzle
//! file, searches the graph of reachable configurations for the shortest
//! sequence of sliding moves that removes pieces one subassembly at a time,
//! and prints the resulting plan as ASCII grids.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use burr::graph::DisassemblyGraph;
use burr::persistence;

/// Plans the disassembly of sliding voxel burr puzzles.
#[derive(Parser)]
#[command(name = "burr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List valid puzzle files in a folder.
    Scan {
        #[arg(default_value = "puzzles")]
        dir: PathBuf,
    },
    /// Import a puzzle and print its starting configuration.
    Show { file: PathBuf },
    /// Import a puzzle and print the complete disassembly plan.
    Solve {
        file: PathBuf,
        /// Per-phase cap on discovered configurations.
        #[arg(long)]
        node_cap: Option<usize>,
        /// Seed for the piece color generator (colors only, not the search).
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Scan { dir } => run_scan(&dir),
        Command::Show { file } => run_show(&file),
        Command::Solve {
            file,
            node_cap,
            seed,
        } => run_solve(&file, node_cap, seed),
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Lists puzzle files recognized by their magic number.
fn run_scan(dir: &Path) -> ExitCode {
    let files = persistence::detect_puzzle_files(dir);
    if files.is_empty() {
        println!("No puzzle files found in {}", dir.display());
    } else {
        for file in files {
            println!("{}", file.display());
        }
    }
    ExitCode::SUCCESS
}

/// Imports a puzzle and prints the untouched root configuration.
fn run_show(file: &Path) -> ExitCode {
    let mut graph = DisassemblyGraph::new();
    let mut rng = make_rng(None);

    if let Err(e) = graph.import_puzzle(file, &mut rng) {
        eprintln!("Failed to import {}: {e}", file.display());
        return ExitCode::FAILURE;
    }

    let root = graph.config(0);
    let bounds = root.bounds();
    println!("{}", root.format_grid());
    println!();
    println!(
        "{} pieces, {}x{} grid",
        root.piece_count(),
        bounds.size_x,
        bounds.size_z
    );
    ExitCode::SUCCESS
}

/// Imports a puzzle, builds the complete disassembly and prints the plan.
fn run_solve(file: &Path, node_cap: Option<usize>, seed: Option<u64>) -> ExitCode {
    let mut graph = DisassemblyGraph::new();
    if let Some(cap) = node_cap {
        graph.set_node_cap(cap);
    }
    let mut rng = make_rng(seed);

    if let Err(e) = graph.import_puzzle(file, &mut rng) {
        eprintln!("Failed to import {}: {e}", file.display());
        return ExitCode::FAILURE;
    }

    graph.build_complete_disassembly_graph();

    if !graph.is_built() {
        eprintln!(
            "No disassembly plan found ({} configs explored)",
            graph.config_count()
        );
        return ExitCode::FAILURE;
    }

    if graph.plan_len() == 0 {
        println!("Puzzle is already a single piece; nothing to disassemble");
        return ExitCode::SUCCESS;
    }

    println!("{}", graph.format_plan());
    println!();
    println!(
        "{} moves, {} configs explored",
        graph.plan_len() - 1,
        graph.config_count()
    );
    if let Some(difficulty) = graph.difficulty() {
        println!("Difficulty: {difficulty}");
    }
    ExitCode::SUCCESS
}
