//! PENDULUM-EVO - CLI Entry Point
//!
//! Evolves cart-pendulum swing-up controllers.

use clap::{Parser, Subcommand};
use pendulum_evo::shared::{TrainerCommand, TrainingHandle};
use pendulum_evo::{benchmark, Config, Trainer};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Console refresh period for `watch`
const WATCH_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "pendulum-evo")]
#[command(version)]
#[command(about = "Neuroevolution of cart-pendulum controllers with a parallel generational GA")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a population in fast mode
    Train {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of generations to run
        #[arg(short, long, default_value = "100")]
        generations: u64,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Write per-generation stats as JSON
        #[arg(long)]
        stats_out: Option<PathBuf>,

        /// Print a champion playback trace of this many frames
        #[arg(long, default_value = "0")]
        playback_steps: usize,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Train on a background thread and print live snapshots
    Watch {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Wall-clock seconds to watch
        #[arg(short, long, default_value = "10")]
        seconds: f32,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Whole generations per tick instead of real-time frames
        #[arg(long)]
        fast: bool,

        /// Also run the champion playback
        #[arg(long)]
        playback: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of generations
        #[arg(short, long, default_value = "10")]
        generations: u64,

        /// Population size
        #[arg(short, long, default_value = "256")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            config,
            generations,
            seed,
            stats_out,
            playback_steps,
            quiet,
        } => run_training(config, generations, seed, stats_out, playback_steps, quiet),

        Commands::Watch {
            config,
            seconds,
            seed,
            fast,
            playback,
        } => run_watch(config, seconds, seed, fast, playback),

        Commands::Benchmark {
            generations,
            population,
        } => {
            init_logging("warn");
            run_benchmark(generations, population)
        }

        Commands::Init { output } => {
            init_logging("info");
            generate_config(output)
        }
    }
}

fn run_training(
    config_path: PathBuf,
    generations: u64,
    seed: Option<u64>,
    stats_out: Option<PathBuf>,
    playback_steps: usize,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load or create config
    let config = if config_path.exists() {
        println!("Loading config from: {:?}", config_path);
        Config::from_file(&config_path)?
    } else {
        println!("Using default configuration");
        Config::default()
    };
    init_logging(if quiet { "warn" } else { &config.logging.log_level });

    let dt = config.evaluation.step_dt;
    let mut trainer = match seed {
        Some(s) => Trainer::new_with_seed(config.clone(), s)?,
        None => Trainer::new(config.clone())?,
    };

    println!("Starting training");
    println!("  Population: {}", config.evaluation.population_size);
    println!("  Workers: {}", trainer.workers());
    println!("  Evaluation: {:.1}s at dt {:.5}s", config.evaluation.eval_duration, dt);
    println!("  Generations: {}", generations);
    println!("  Seed: {}", trainer.seed());
    println!();

    trainer.start();
    let start = Instant::now();
    for _ in 0..generations {
        trainer.advance_generation(dt)?;
    }
    trainer.stop();

    let elapsed = start.elapsed().as_secs_f64();
    println!();
    println!("=== Training Complete ===");
    println!("Time: {:.2}s", elapsed);
    println!("Generations: {}", trainer.generation());
    if elapsed > 0.0 {
        println!("Speed: {:.2} generations/s", trainer.generation() as f64 / elapsed);
    }
    println!("Best fitness: {:.3}", trainer.best_fitness().unwrap_or(0.0));
    if let Some(champion) = trainer.champion() {
        println!(
            "Champion: fitness {:.3} from generation {} ({} hidden units)",
            champion.fitness, champion.generation, champion.genome.hidden
        );
    }

    if let Some(path) = stats_out {
        trainer.history().save(&path.to_string_lossy())?;
        println!("Stats history: {:?}", path);
    }

    if playback_steps > 0 {
        print_playback(&mut trainer, playback_steps);
    }

    trainer.shutdown();
    Ok(())
}

fn print_playback(trainer: &mut Trainer, frames: usize) {
    let dt = trainer.config().evaluation.max_frame_dt;
    let env = trainer.config().environment;

    println!();
    println!("=== Champion Playback ===");
    println!(
        "{:>5} {:>8} {:>9} {:>9} {:>8} {:>8}",
        "loop", "time", "pivot_x", "theta", "upright", "fitness"
    );
    for _ in 0..frames {
        let Some(agent) = trainer.step_playback(dt).copied() else {
            println!("No champion yet");
            return;
        };
        let playback = trainer.playback();
        println!(
            "{:>5} {:>8.3} {:>9.2} {:>9.3} {:>8} {:>8.3}",
            playback.loops(),
            playback.elapsed(),
            agent.pivot_x,
            agent.theta,
            if agent.is_balanced(&env) { "yes" } else { "no" },
            agent.fitness
        );
    }
}

fn run_watch(
    config_path: PathBuf,
    seconds: f32,
    seed: Option<u64>,
    fast: bool,
    playback: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };
    init_logging(&config.logging.log_level);

    let mut handle = TrainingHandle::spawn(config, seed)?;
    handle.send(TrainerCommand::SetFastMode(fast));
    handle.send(TrainerCommand::SetPlayback(playback));
    handle.send(TrainerCommand::Start);

    println!(
        "{:>6} {:>7} {:>7} {:>9} {:>9} {:>9} {:>9}",
        "gen", "stage", "t", "leader", "best", "champion", "replay"
    );
    let deadline = Instant::now() + Duration::from_secs_f32(seconds.max(0.0).min(86_400.0));
    while Instant::now() < deadline {
        std::thread::sleep(WATCH_INTERVAL);
        let Some(snapshot) = handle.try_recv_snapshot() else {
            continue;
        };
        let fmt = |v: Option<f32>| v.map_or_else(|| "-".to_string(), |f| format!("{:.3}", f));
        println!(
            "{:>6} {:>7} {:>7.2} {:>9} {:>9} {:>9} {:>9}",
            snapshot.generation,
            format!("{:?}", snapshot.stage),
            snapshot.eval_time,
            fmt(snapshot.best_agent().map(|a| a.fitness)),
            fmt(snapshot.best_fitness),
            fmt(snapshot.champion_fitness),
            fmt(snapshot.playback.map(|a| a.theta)),
        );
    }

    handle.send(TrainerCommand::Stop);
    handle.shutdown();
    Ok(())
}

fn run_benchmark(generations: u64, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== PENDULUM-EVO Benchmark ===");
    println!("Generations: {}", generations);
    println!("Population: {}", population);
    println!();

    let result = benchmark(generations, population)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
