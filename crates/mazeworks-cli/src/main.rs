use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

use mazeworks_core::app::{Control, NUMBER_OF_THREADS, PoolSlot, RunnerBuilder, Services};
use mazeworks_core::config::Settings;
use mazeworks_core::domain::{FormulaId, JobId, Label, MazeType, PoolError, SolutionPath};
use mazeworks_core::impls::MemoryStore;
use mazeworks_core::observability::{self, FormulaCounts, QueueCounts};
use mazeworks_core::ports::{Store, SystemClock, UlidGenerator};
use mazeworks_core::solver::MazeSolver;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "mazeworks", about = "Generate, reduce and solve maze formulas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the worker pool over an in-memory store.
    Run {
        /// TOML file with a [settings] table, layered over the defaults.
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Overrides number_of_threads.
        #[arg(long)]
        threads: Option<usize>,
        /// Maze types to generate (default: all).
        #[arg(long = "maze-type")]
        maze_types: Vec<MazeType>,
        /// Expand every generated formula into permutations.
        #[arg(long)]
        permutations: bool,
        /// Solve the permutations (implies --permutations).
        #[arg(long)]
        solve: bool,
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Solve one layout given as row-major square labels.
    Solve {
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
        #[arg(long = "maze-type", default_value = "simple")]
        maze_type: MazeType,
        squares: Vec<Label>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct Summary {
    jobs: QueueCounts,
    formulas: Vec<FormulaCounts>,
    permutations: usize,
    candidates: usize,
    unique_candidates: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();
    match Cli::parse().command {
        Command::Run {
            settings,
            threads,
            maze_types,
            permutations,
            solve,
            json,
        } => {
            let options = RunOptions {
                settings,
                threads,
                maze_types,
                permutations: permutations || solve,
                solve,
                json,
            };
            tokio::select! {
                result = run(options) => result,
                _ = tokio::signal::ctrl_c() => {
                    warn!("interrupted; stopping worker pool");
                    shutdown(PoolSlot::global())
                }
            }
        }
        Command::Solve {
            width,
            height,
            maze_type,
            squares,
            json,
        } => solve_layout(width, height, maze_type, squares, json),
    }
}

/// Stops the pool held by `slot` and clears it. An empty slot is fine.
fn shutdown(slot: &PoolSlot) -> Result<()> {
    match slot.stop() {
        Ok(()) | Err(PoolError::NotRunning) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

struct RunOptions {
    settings: Option<PathBuf>,
    threads: Option<usize>,
    maze_types: Vec<MazeType>,
    permutations: bool,
    solve: bool,
    json: bool,
}

async fn run(options: RunOptions) -> Result<()> {
    let mut settings = Settings::defaults();
    if let Some(path) = &options.settings {
        let file = Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?;
        settings = settings.merge(file);
    }

    let store = MemoryStore::new();
    settings.apply_to(&store)?;
    let services = Services {
        store: Arc::new(store.clone()),
        ids: Arc::new(UlidGenerator::new(SystemClock)),
        clock: Arc::new(SystemClock),
        runner: Arc::new(RunnerBuilder::standard().build()?),
    };
    let control = Control::global(services);
    if let Some(threads) = options.threads {
        control.update_number_of_threads(threads)?;
    }
    info!(threads = store.setting(NUMBER_OF_THREADS)?, "starting");
    control.start()?;

    let maze_types = if options.maze_types.is_empty() {
        MazeType::ALL.to_vec()
    } else {
        options.maze_types.clone()
    };
    let job = control.enqueue_formula_generation_job_for(&maze_types)?;
    wait_for(&store, &[job]).await?;

    let formulas: Vec<FormulaId> = maze_types
        .iter()
        .map(|maze_type| store.formulas_by_type(*maze_type))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .map(|record| record.id)
        .collect();
    info!(formulas = formulas.len(), "formulas generated");

    if options.permutations {
        let jobs = formulas
            .iter()
            .map(|formula_id| control.enqueue_permutation_job(*formula_id))
            .collect::<Result<Vec<_>, _>>()?;
        wait_for(&store, &jobs).await?;
    }
    if options.solve {
        let jobs = formulas
            .iter()
            .map(|formula_id| control.enqueue_solve_job(*formula_id))
            .collect::<Result<Vec<_>, _>>()?;
        wait_for(&store, &jobs).await?;
    }

    control.stop()?;
    let summary = summarize(&store, &maze_types, &formulas)?;
    print_summary(&summary, options.json)
}

/// Polls until every job has completed or failed.
async fn wait_for(store: &MemoryStore, jobs: &[JobId]) -> Result<()> {
    loop {
        let mut done = true;
        for job_id in jobs {
            let Some(job) = store.job(*job_id)? else {
                bail!("job {job_id} disappeared");
            };
            done &= job.status.is_terminal();
        }
        if done {
            return Ok(());
        }
        sleep(POLL_INTERVAL).await;
    }
}

fn summarize(store: &MemoryStore, maze_types: &[MazeType], formulas: &[FormulaId]) -> Result<Summary> {
    let mut permutations = 0;
    let mut candidates = 0;
    let mut unique_candidates = 0;
    for formula_id in formulas {
        permutations += store.permutations_for_formula(*formula_id)?.len();
        let solved = store.candidates_for_formula(*formula_id)?;
        candidates += solved.len();
        unique_candidates += solved.iter().filter(|c| c.has_unique_solution()).count();
    }
    Ok(Summary {
        jobs: QueueCounts::from_store(store)?,
        formulas: maze_types
            .iter()
            .map(|maze_type| FormulaCounts::from_store(store, *maze_type))
            .collect::<Result<Vec<_>, _>>()?,
        permutations,
        candidates,
        unique_candidates,
    })
}

fn print_summary(summary: &Summary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    println!(
        "jobs: {} completed, {} failed",
        summary.jobs.completed, summary.jobs.failed
    );
    for counts in &summary.formulas {
        println!("{:>7} formulas: {}", counts.maze_type.title(), counts.total());
    }
    println!("permutations: {}", summary.permutations);
    println!(
        "candidates: {} ({} with a unique solution)",
        summary.candidates, summary.unique_candidates
    );
    Ok(())
}

fn solve_layout(
    width: usize,
    height: usize,
    maze_type: MazeType,
    squares: Vec<Label>,
    json: bool,
) -> Result<()> {
    let solver = MazeSolver::from_layout(width, height, squares, maze_type)?;
    let solutions: Vec<SolutionPath> = solver.solutions();
    if json {
        println!("{}", serde_json::to_string_pretty(&solutions)?);
        return Ok(());
    }
    if solutions.is_empty() {
        println!("no solution");
    }
    for (i, path) in solutions.iter().enumerate() {
        let cells: Vec<String> = path.iter().map(ToString::to_string).collect();
        println!("solution {}: {}", i + 1, cells.join(" -> "));
    }
    Ok(())
}
