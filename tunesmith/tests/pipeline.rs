// End-to-end tests for the generation pipeline.
//
// Each test builds a configuration the way a caller would, runs the full
// chain -> selector -> assembler path with a seeded generator, and checks
// the bar-level properties of the output.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use tunesmith::{
    ContourMotion, DurationSymbol, EmptyBarPolicy, GenerationError, GeneratorConfig, Key, Modality,
    RhythmChain, RhythmStrategy, SelectorKind, TransitionTable,
};

const CADENCE_LENGTH: f64 = 1.0;

fn data(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

#[test]
fn test_shipped_table_matches_default() {
    let table = TransitionTable::load(&data("default_table.json")).unwrap();
    assert_eq!(table, TransitionTable::default_table());
}

#[test]
fn test_shipped_config_generates_eight_bars() {
    let config = GeneratorConfig::load(&data("contour_minor.json")).unwrap();
    let key = config.key().unwrap();
    let ladder = key.ladder(config.start_octave, config.octave_range).unwrap();

    let phrase = config.generate(&mut StdRng::seed_from_u64(2)).unwrap();
    assert_eq!(phrase.bars.len(), 8);
    assert_eq!(phrase.tempo_bpm, Some(90.0));
    for bar in &phrase.bars {
        assert!(bar.total_length() <= bar.capacity + CADENCE_LENGTH);
        for event in &bar.events {
            if let Some(pitch) = event.pitch() {
                assert!(ladder.pitches().contains(&pitch), "{pitch} is off the ladder");
            }
        }
    }
}

#[test]
fn test_pack_strategy_bars_are_full_across_many_seeds() {
    for seed in 0..50 {
        let config = GeneratorConfig {
            strategy: RhythmStrategy::PackAndPad {
                event_count: 40,
                start: DurationSymbol::One,
            },
            phrase_length: 3,
            ..Default::default()
        };
        let phrase = config.generate(&mut StdRng::seed_from_u64(seed)).unwrap();
        for (i, bar) in phrase.bars.iter().enumerate() {
            let cadence = if (i + 1) % 3 == 0 { CADENCE_LENGTH } else { 0.0 };
            assert_eq!(bar.total_length() - cadence, 4.0, "seed {seed}, bar {}", i + 1);
        }
    }
}

#[test]
fn test_cadence_count_is_floor_of_half() {
    let key = Key::new(Modality::Major, 0);
    let tonic = key.tonic_pitch(4).unwrap();
    for bars in 1..=9 {
        let config = GeneratorConfig {
            strategy: RhythmStrategy::BoundedPerBar {
                bar_count: bars,
                seed: DurationSymbol::One,
            },
            ..Default::default()
        };
        let assembler = config.assembler().unwrap();
        let mut rng = StdRng::seed_from_u64(bars as u64);
        // Candidates from octave 5 keep the octave-4 tonic unique to cadences.
        let candidates = key.scale_pitches(5, 1).unwrap();
        let mut selector = tunesmith::UniformSelector::new(candidates).unwrap();
        let phrase = assembler.assemble(&mut selector, &mut rng).unwrap();
        let cadences: Vec<usize> = phrase
            .bars
            .iter()
            .enumerate()
            .filter(|(_, b)| b.events.iter().any(|e| e.pitch() == Some(tonic)))
            .map(|(i, _)| i + 1)
            .collect();
        assert_eq!(cadences.len(), bars / 2);
        assert!(cadences.iter().all(|i| i % 2 == 0));
    }
}

#[test]
fn test_single_path_bounded_walk_is_exact() {
    let table = TransitionTable::from_json(
        r#"{ "1": { "0.5": 1.0 }, "0.5": { "0.25": 1.0 }, "0.25": { "0.25": 1.0 } }"#,
    )
    .unwrap();
    let chain = RhythmChain::new(table).unwrap();
    let walk = chain
        .generate_bounded(DurationSymbol::One, 1.0, &mut StdRng::seed_from_u64(0))
        .unwrap();
    assert_eq!(
        walk,
        [DurationSymbol::Half, DurationSymbol::Quarter, DurationSymbol::Quarter]
    );
}

#[test]
fn test_unfillable_bars_are_skipped() {
    // Only a rest can follow the seed, and a rest never fits a half-beat bar.
    let mut table = TransitionTable::new();
    table.insert(DurationSymbol::Half, DurationSymbol::Rest, 1.0);
    let config = GeneratorConfig {
        bar_capacity: 0.5,
        strategy: RhythmStrategy::BoundedPerBar {
            bar_count: 5,
            seed: DurationSymbol::Half,
        },
        empty_bars: EmptyBarPolicy::Skip,
        transitions: Some(table),
        ..Default::default()
    };
    let phrase = config.generate(&mut StdRng::seed_from_u64(0)).unwrap();
    assert!(phrase.bars.is_empty());
}

#[test]
fn test_unknown_seed_aborts_without_output() {
    let mut table = TransitionTable::new();
    table.insert(DurationSymbol::One, DurationSymbol::Half, 1.0);
    table.insert(DurationSymbol::Half, DurationSymbol::One, 1.0);
    let config = GeneratorConfig {
        strategy: RhythmStrategy::BoundedPerBar {
            bar_count: 4,
            seed: DurationSymbol::Rest,
        },
        transitions: Some(table),
        ..Default::default()
    };
    let result = config.generate(&mut StdRng::seed_from_u64(0));
    assert!(matches!(result, Err(GenerationError::UnknownState(DurationSymbol::Rest))));
}

#[test]
fn test_huge_event_count_is_a_configuration_error() {
    let config = GeneratorConfig {
        strategy: RhythmStrategy::PackAndPad {
            event_count: usize::MAX,
            start: DurationSymbol::One,
        },
        ..Default::default()
    };
    let result = config.generate(&mut StdRng::seed_from_u64(0));
    assert!(matches!(result, Err(GenerationError::InvalidConfiguration(_))));
}

#[test]
fn test_contour_runs_produce_stepwise_melody() {
    let config = GeneratorConfig {
        octave_range: 3,
        selector: SelectorKind::Contour {
            motion: ContourMotion::Runs { max_run: 5 },
        },
        strategy: RhythmStrategy::PackAndPad {
            event_count: 64,
            start: DurationSymbol::One,
        },
        ..Default::default()
    };
    let ladder = config.key().unwrap().ladder(4, 3).unwrap();
    let phrase = config.generate(&mut StdRng::seed_from_u64(31)).unwrap();

    let mut previous: Option<usize> = None;
    for (i, bar) in phrase.bars.iter().enumerate() {
        // Every second bar ends with a cadence that sits outside the walk.
        let walked = if (i + 1) % 2 == 0 {
            &bar.events[..bar.events.len() - 1]
        } else {
            &bar.events[..]
        };
        for pitch in walked.iter().filter_map(|e| e.pitch()) {
            let index = ladder.pitches().iter().position(|&p| p == pitch).unwrap();
            if let Some(prev) = previous {
                assert!(index.abs_diff(prev) <= 2);
            }
            previous = Some(index);
        }
    }
}

#[test]
fn test_phrase_round_trips_through_json() {
    let phrase = GeneratorConfig::default()
        .generate(&mut StdRng::seed_from_u64(5))
        .unwrap();
    let json = serde_json::to_string(&phrase).unwrap();
    assert!(json.contains(r#""kind":"note""#));
    let back: tunesmith::Phrase = serde_json::from_str(&json).unwrap();
    assert_eq!(back, phrase);
}
