// Tunesmith — CLI entry point.
//
// Generates one melody and prints it to stdout, either as a bar-by-bar text
// listing or as JSON for a downstream renderer. Settings come from an
// optional JSON config file; command-line flags override it.
//
// Usage:
//   cargo run -p tunesmith -- [--config FILE] [--table FILE] [--tonic C]
//     [--modality major] [--strategy pack|bounded] [--events N] [--bars N]
//     [--phrase-length N] [--selector uniform|contour] [--runs N]
//     [--start-octave N] [--octave-range N] [--tempo BPM] [--seed N] [--json]
//
// Modalities: major, minor, mixolydian, dorian, phrygian, lydian
// Set RUST_LOG=debug to trace bar assembly.

use clap::{Parser, ValueEnum};
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::process::ExitCode;
use tunesmith::{
    ContourMotion, GenerationError, GeneratorConfig, Modality, RhythmStrategy, SelectorKind,
    TransitionTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// One long walk packed into padded bars.
    Pack,
    /// One capacity-bounded walk per bar.
    Bounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SelectorArg {
    Uniform,
    Contour,
}

#[derive(Parser, Debug)]
#[command(name = "generate", about = "Generate a Markov-chain melody")]
struct Args {
    /// JSON generator config; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON rhythm transition table.
    #[arg(long)]
    table: Option<PathBuf>,

    /// Tonic name, e.g. C, F#, Bb.
    #[arg(long)]
    tonic: Option<String>,

    #[arg(long)]
    modality: Option<Modality>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Transitions to sample for the pack strategy.
    #[arg(long)]
    events: Option<usize>,

    /// Bars to generate for the bounded strategy.
    #[arg(long)]
    bars: Option<usize>,

    /// Bars per phrase; each phrase ends on the tonic.
    #[arg(long)]
    phrase_length: Option<usize>,

    #[arg(long, value_enum)]
    selector: Option<SelectorArg>,

    /// Contour only: hold each direction for up to N notes.
    #[arg(long)]
    runs: Option<usize>,

    #[arg(long, allow_hyphen_values = true)]
    start_octave: Option<i8>,

    #[arg(long)]
    octave_range: Option<u8>,

    #[arg(long)]
    tempo: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Print the phrase as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), GenerationError> {
    let config = build_config(args)?;

    let mut rng = match args.seed {
        Some(seed) => {
            info!("seed {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let phrase = config.generate(&mut rng)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&phrase)?);
    } else {
        println!("=== Tunesmith ===");
        println!("Key: {}", config.key()?);
        print!("{phrase}");
    }
    Ok(())
}

fn build_config(args: &Args) -> Result<GeneratorConfig, GenerationError> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };

    if let Some(path) = &args.table {
        config.transitions = Some(TransitionTable::load(path)?);
    }
    if let Some(tonic) = &args.tonic {
        config.tonic = tonic.clone();
    }
    if let Some(modality) = args.modality {
        config.modality = modality;
    }
    if let Some(n) = args.phrase_length {
        config.phrase_length = n;
    }
    if let Some(octave) = args.start_octave {
        config.start_octave = octave;
    }
    if let Some(range) = args.octave_range {
        config.octave_range = range;
    }
    if args.tempo.is_some() {
        config.tempo_bpm = args.tempo;
    }

    config.strategy = match (args.strategy, config.strategy) {
        (Some(StrategyArg::Pack), RhythmStrategy::PackAndPad { event_count, start })
        | (None, RhythmStrategy::PackAndPad { event_count, start }) => RhythmStrategy::PackAndPad {
            event_count: args.events.unwrap_or(event_count),
            start,
        },
        (Some(StrategyArg::Bounded), RhythmStrategy::BoundedPerBar { bar_count, seed })
        | (None, RhythmStrategy::BoundedPerBar { bar_count, seed }) => {
            RhythmStrategy::BoundedPerBar {
                bar_count: args.bars.unwrap_or(bar_count),
                seed,
            }
        }
        (Some(StrategyArg::Pack), RhythmStrategy::BoundedPerBar { seed, .. }) => {
            RhythmStrategy::PackAndPad {
                event_count: args.events.unwrap_or(16),
                start: seed,
            }
        }
        (Some(StrategyArg::Bounded), RhythmStrategy::PackAndPad { start, .. }) => {
            RhythmStrategy::BoundedPerBar {
                bar_count: args.bars.unwrap_or(8),
                seed: start,
            }
        }
    };

    let motion = match args.runs {
        Some(max_run) => ContourMotion::Runs { max_run },
        None => match config.selector {
            SelectorKind::Contour { motion } => motion,
            SelectorKind::Uniform => ContourMotion::Memoryless,
        },
    };
    config.selector = match (args.selector, config.selector) {
        (Some(SelectorArg::Uniform), _) => SelectorKind::Uniform,
        (Some(SelectorArg::Contour), _) | (None, SelectorKind::Contour { .. }) => {
            SelectorKind::Contour { motion }
        }
        (None, SelectorKind::Uniform) => SelectorKind::Uniform,
    };

    info!(
        "config: {} {} from octave {} (+{}), start symbol {}",
        config.tonic,
        config.modality,
        config.start_octave,
        config.octave_range,
        match config.strategy {
            RhythmStrategy::PackAndPad { start, .. } => start,
            RhythmStrategy::BoundedPerBar { seed, .. } => seed,
        }
    );
    Ok(config)
}
