//! # N-Queens by Dancing Links
//!
//! Counts the ways to place `N` non-attacking queens on an `N`×`N` board with
//! the exact cover solver, or with plain backtracking for comparison.

use std::ops::ControlFlow;
use std::time::Instant;

use anyhow::{ensure, Context};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use queens_dlx::queens::{backtrack, Board, Constraint, NQueens};
use queens_dlx::{
    ColumnSelector, ExactCoverSolver, FirstColumn, MinSize, PruneConfig, SearchStats,
    StatisticalPrune, Uniform,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Fewest remaining rows, centre ranks and files first on ties
    Min,
    /// Leftmost uncovered column
    First,
    /// Uniformly random column
    Random,
    /// Fewest remaining rows with statistical pruning (may miss solutions)
    Prune,
}

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Board size
    #[arg(default_value_t = 8)]
    n: usize,

    /// Column selection strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::Min)]
    strategy: Strategy,

    /// Seed for the random strategy
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Stop at the first solution and draw it
    #[arg(long)]
    first: bool,

    /// Count with plain backtracking instead of Dancing Links
    #[arg(long, conflicts_with_all = ["strategy", "first"])]
    naive: bool,

    /// Samples kept per search depth when pruning
    #[arg(long, default_value_t = PruneConfig::default().sample_cap)]
    prune_cap: usize,

    /// Standard deviations above the mean a pruned branch may remove
    #[arg(long, default_value_t = PruneConfig::default().deviations)]
    prune_deviations: f64,

    /// Samples a depth needs before it prunes
    #[arg(long, default_value_t = PruneConfig::default().min_samples)]
    prune_warmup: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn prune_config(&self) -> PruneConfig {
        PruneConfig {
            sample_cap: self.prune_cap,
            deviations: self.prune_deviations,
            min_samples: self.prune_warmup,
        }
    }

    fn selector(&self, queens: NQueens) -> Box<dyn ColumnSelector<Constraint>> {
        let centre = move |column| queens.priority(column);
        match self.strategy {
            Strategy::Min => Box::new(MinSize::new(centre)),
            Strategy::First => Box::new(FirstColumn),
            Strategy::Random => Box::new(Uniform::seeded(self.seed)),
            Strategy::Prune => Box::new(StatisticalPrune::new(
                MinSize::new(centre),
                self.prune_config(),
            )),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    ensure!(
        cli.prune_deviations.is_finite() && cli.prune_deviations >= 0.0,
        "--prune-deviations must be a finite non-negative number"
    );

    let now = Instant::now();
    if cli.naive {
        let count = backtrack::count(cli.n);
        println!(
            "{} queens: {} solutions, {} subproblems",
            cli.n, count.solutions, count.subproblems
        );
        println!("took {:.3} seconds", now.elapsed().as_secs_f64());
        return Ok(());
    }

    let queens = NQueens::new(cli.n);
    let mut matrix = queens
        .matrix()
        .with_context(|| format!("building the {} queens matrix", cli.n))?;
    let mut solver = ExactCoverSolver::new(cli.selector(queens));

    let stats: SearchStats = if cli.first {
        let mut board = None;
        let stats = solver
            .run(&mut matrix, |solution| {
                board = Some(Board::new(cli.n, &queens.decode(solution)));
                ControlFlow::Break(())
            })
            .context("searching for a placement")?;
        match board {
            Some(board) => println!("{}", board.colored()),
            None => println!("{}", "no placement exists".red()),
        }
        stats
    } else {
        solver
            .count(&mut matrix)
            .context("counting placements")?
    };

    println!(
        "{} queens: {} solutions, {} nodes",
        cli.n,
        stats.solutions.to_string().green().bold(),
        stats.nodes
    );
    if cli.strategy == Strategy::Prune {
        println!(
            "{} branches pruned; the count is a lower bound",
            stats.pruned.to_string().yellow()
        );
    }
    println!("took {:.3} seconds", now.elapsed().as_secs_f64());
    Ok(())
}
