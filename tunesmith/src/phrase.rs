// Phrase assembly: laying rhythm into bars and resolving pitches.
//
// The assembler drives the rhythm chain, hands every sounded duration to a
// pitch selector, groups the resulting events into bars, and closes each
// phrase with a cadential tonic note. Two rhythm strategies are available
// and are never mixed within one phrase:
//
// - `PackAndPad`: one long unconstrained walk, packed greedily. When the
//   next event would overflow the bar, the bar is closed with a filler rest
//   of exactly the remaining length and the event opens the next bar. Every
//   bar therefore totals exactly the bar capacity before cadences are added.
// - `BoundedPerBar`: one bounded walk per bar, seeded with the same symbol
//   each time. Bars are not padded and may end short of capacity. A walk
//   that yields nothing is handled by `EmptyBarPolicy`.
//
// Rests always occupy one beat. After rhythm and pitch are placed, every bar
// whose 1-based position is a multiple of the phrase length receives one
// extra beat-long tonic note, even if that pushes it past capacity.

use crate::chain::{LENGTH_EPSILON, RhythmChain};
use crate::duration::DurationSymbol;
use crate::error::GenerationError;
use crate::pitch::{Pitch, PitchSelector};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the cadential tonic note, in quarter notes.
pub const CADENCE_LENGTH: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Rest { length: f64 },
    Note { length: f64, pitch: Pitch },
}

impl Event {
    pub fn length(&self) -> f64 {
        match *self {
            Event::Rest { length } | Event::Note { length, .. } => length,
        }
    }

    pub fn pitch(&self) -> Option<Pitch> {
        match *self {
            Event::Rest { .. } => None,
            Event::Note { pitch, .. } => Some(pitch),
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Event::Rest { .. })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Rest { length } => write!(f, "rest({length})"),
            Event::Note { length, pitch } => write!(f, "{pitch}({length})"),
        }
    }
}

/// One measure of events with a nominal capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub capacity: f64,
    pub events: Vec<Event>,
}

impl Bar {
    pub fn new(capacity: f64) -> Self {
        Bar {
            capacity,
            events: Vec::new(),
        }
    }

    /// A bar holding a single rest that fills it.
    pub fn silent(capacity: f64) -> Self {
        Bar {
            capacity,
            events: vec![Event::Rest { length: capacity }],
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn total_length(&self) -> f64 {
        self.events.iter().map(Event::length).sum()
    }

    /// Capacity left, never negative.
    pub fn remaining(&self) -> f64 {
        (self.capacity - self.total_length()).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Fill the rest of the bar with one filler rest. A full bar is left alone.
    pub fn pad_to_capacity(&mut self) {
        let remaining = self.remaining();
        if remaining > LENGTH_EPSILON {
            self.events.push(Event::Rest { length: remaining });
        }
    }

    fn fits(&self, length: f64) -> bool {
        self.total_length() + length <= self.capacity + LENGTH_EPSILON
    }
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let events: Vec<String> = self.events.iter().map(Event::to_string).collect();
        write!(f, "{}", events.join(" "))
    }
}

/// The assembled output: bars in order plus the passthrough tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub bars: Vec<Bar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_bpm: Option<f64>,
}

impl Phrase {
    pub fn event_count(&self) -> usize {
        self.bars.iter().map(|b| b.events.len()).sum()
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(bpm) = self.tempo_bpm {
            writeln!(f, "tempo {bpm} bpm")?;
        }
        for (i, bar) in self.bars.iter().enumerate() {
            writeln!(f, "bar {:>3} | {}", i + 1, bar)?;
        }
        Ok(())
    }
}

/// How rhythm is obtained for the phrase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RhythmStrategy {
    /// `event_count` transitions after `start`, packed into padded bars.
    PackAndPad {
        event_count: usize,
        start: DurationSymbol,
    },
    /// `bar_count` bars, each from a bounded walk seeded with `seed`.
    BoundedPerBar {
        bar_count: usize,
        seed: DurationSymbol,
    },
}

impl Default for RhythmStrategy {
    fn default() -> Self {
        RhythmStrategy::PackAndPad {
            event_count: 16,
            start: DurationSymbol::One,
        }
    }
}

/// What to do with a bounded bar whose walk produced no events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBarPolicy {
    /// Emit the bar as one full-length rest.
    #[default]
    Silence,
    /// Leave the bar out; cadence positions count emitted bars only.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhraseConfig {
    pub bar_capacity: f64,
    /// Bars per phrase; a cadence closes every phrase.
    pub phrase_length: usize,
    pub tonic: Pitch,
    pub strategy: RhythmStrategy,
    pub empty_bars: EmptyBarPolicy,
    pub tempo_bpm: Option<f64>,
}

impl PhraseConfig {
    pub fn new(tonic: Pitch, strategy: RhythmStrategy) -> Self {
        PhraseConfig {
            bar_capacity: 4.0,
            phrase_length: 2,
            tonic,
            strategy,
            empty_bars: EmptyBarPolicy::default(),
            tempo_bpm: None,
        }
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if !self.bar_capacity.is_finite() || self.bar_capacity <= 0.0 {
            return Err(GenerationError::invalid(format!(
                "bar capacity must be positive, got {}",
                self.bar_capacity
            )));
        }
        if self.phrase_length == 0 {
            return Err(GenerationError::invalid("phrase length must be at least 1"));
        }
        if matches!(self.strategy, RhythmStrategy::PackAndPad { .. })
            && self.bar_capacity < DurationSymbol::LONGEST
        {
            return Err(GenerationError::invalid(format!(
                "bar capacity {} cannot hold a {}-beat event",
                self.bar_capacity,
                DurationSymbol::LONGEST
            )));
        }
        if let Some(bpm) = self.tempo_bpm {
            if !bpm.is_finite() || bpm <= 0.0 {
                return Err(GenerationError::invalid(format!("tempo must be positive, got {bpm}")));
            }
        }
        Ok(())
    }
}

pub struct PhraseAssembler {
    config: PhraseConfig,
    chain: RhythmChain,
}

impl PhraseAssembler {
    pub fn new(config: PhraseConfig, chain: RhythmChain) -> Result<Self, GenerationError> {
        config.validate()?;
        Ok(PhraseAssembler { config, chain })
    }

    pub fn config(&self) -> &PhraseConfig {
        &self.config
    }

    /// Generate one phrase. Any chain error aborts the whole phrase.
    pub fn assemble(
        &self,
        selector: &mut impl PitchSelector,
        rng: &mut impl Rng,
    ) -> Result<Phrase, GenerationError> {
        let mut bars = match self.config.strategy {
            RhythmStrategy::PackAndPad { event_count, start } => {
                self.pack_and_pad(event_count, start, selector, rng)?
            }
            RhythmStrategy::BoundedPerBar { bar_count, seed } => {
                self.bounded_per_bar(bar_count, seed, selector, rng)?
            }
        };
        let cadences = self.add_cadences(&mut bars);
        info!("assembled {} bars with {} cadences", bars.len(), cadences);
        Ok(Phrase {
            bars,
            tempo_bpm: self.config.tempo_bpm,
        })
    }

    fn pack_and_pad(
        &self,
        event_count: usize,
        start: DurationSymbol,
        selector: &mut impl PitchSelector,
        rng: &mut impl Rng,
    ) -> Result<Vec<Bar>, GenerationError> {
        let capacity = self.config.bar_capacity;
        let symbols = self.chain.generate_sequence(event_count, start, rng)?;

        let mut bars = Vec::new();
        let mut current = Bar::new(capacity);
        for symbol in symbols {
            if !current.fits(symbol.rendered_length()) {
                current.pad_to_capacity();
                debug!("bar {} closed: {}", bars.len() + 1, current);
                bars.push(std::mem::replace(&mut current, Bar::new(capacity)));
            }
            current.push(resolve_event(symbol, selector, rng));
        }
        current.pad_to_capacity();
        debug!("bar {} closed: {}", bars.len() + 1, current);
        bars.push(current);
        Ok(bars)
    }

    fn bounded_per_bar(
        &self,
        bar_count: usize,
        seed: DurationSymbol,
        selector: &mut impl PitchSelector,
        rng: &mut impl Rng,
    ) -> Result<Vec<Bar>, GenerationError> {
        let capacity = self.config.bar_capacity;
        let mut bars = Vec::with_capacity(bar_count);
        for slot in 1..=bar_count {
            let symbols = self.chain.generate_bounded(seed, capacity, rng)?;
            if symbols.is_empty() {
                match self.config.empty_bars {
                    EmptyBarPolicy::Silence => {
                        debug!("bar slot {slot} has no rhythm, emitting silence");
                        bars.push(Bar::silent(capacity));
                    }
                    EmptyBarPolicy::Skip => warn!("bar slot {slot} has no rhythm, skipping it"),
                }
                continue;
            }
            let mut bar = Bar::new(capacity);
            for symbol in symbols {
                bar.push(resolve_event(symbol, selector, rng));
            }
            debug!("bar slot {slot} filled: {bar}");
            bars.push(bar);
        }
        Ok(bars)
    }

    /// Append the tonic to every bar ending a phrase. Returns how many.
    fn add_cadences(&self, bars: &mut [Bar]) -> usize {
        let phrase_length = self.config.phrase_length;
        let mut count = 0;
        for bar in bars.iter_mut().skip(phrase_length - 1).step_by(phrase_length) {
            bar.push(Event::Note {
                length: CADENCE_LENGTH,
                pitch: self.config.tonic,
            });
            count += 1;
        }
        count
    }
}

fn resolve_event(
    symbol: DurationSymbol,
    selector: &mut impl PitchSelector,
    rng: &mut impl Rng,
) -> Event {
    let length = symbol.rendered_length();
    if symbol.is_rest() {
        Event::Rest { length }
    } else {
        Event::Note {
            length,
            pitch: selector.resolve(symbol, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::TransitionTable;
    use crate::duration::DurationSymbol::{Half, One, Quarter, Rest};
    use crate::pitch::{ContourMotion, ContourSelector, PitchLadder, UniformSelector};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tonic() -> Pitch {
        "C4".parse().unwrap()
    }

    fn uniform() -> UniformSelector {
        let candidates = ["D4", "E4", "G4"].iter().map(|p| p.parse().unwrap()).collect();
        UniformSelector::new(candidates).unwrap()
    }

    fn assembler(strategy: RhythmStrategy, table: TransitionTable) -> PhraseAssembler {
        PhraseAssembler::new(PhraseConfig::new(tonic(), strategy), RhythmChain::new(table).unwrap())
            .unwrap()
    }

    fn is_cadence(event: &Event) -> bool {
        event.pitch() == Some(tonic())
    }

    #[test]
    fn test_packed_bars_are_exactly_full_before_cadence() {
        let asm = assembler(
            RhythmStrategy::PackAndPad { event_count: 60, start: One },
            TransitionTable::default_table(),
        );
        let mut rng = StdRng::seed_from_u64(17);
        let phrase = asm.assemble(&mut uniform(), &mut rng).unwrap();
        assert!(phrase.bars.len() > 1);
        for (i, bar) in phrase.bars.iter().enumerate() {
            let mut total = bar.total_length();
            if (i + 1) % 2 == 0 {
                assert!(is_cadence(bar.events.last().unwrap()));
                total -= CADENCE_LENGTH;
            }
            assert_eq!(total, 4.0, "bar {} is {bar}", i + 1);
        }
    }

    #[test]
    fn test_packing_opens_a_new_bar_on_overflow() {
        // 1, then 0.5 forever: the eighth symbol no longer fits the first bar.
        let mut table = TransitionTable::new();
        table.insert(One, Half, 1.0);
        table.insert(Half, Half, 1.0);
        let asm = assembler(RhythmStrategy::PackAndPad { event_count: 7, start: One }, table);
        let mut rng = StdRng::seed_from_u64(1);
        let phrase = asm.assemble(&mut uniform(), &mut rng).unwrap();
        assert_eq!(phrase.bars.len(), 2);
        // 1 + 6 * 0.5 = 4.0 exactly, then one more half opens bar 2.
        assert_eq!(phrase.bars[0].events.len(), 7);
        assert_eq!(phrase.bars[1].events[0].length(), 0.5);
        // Bar 2: the half, a 3.5 filler, then the cadence.
        assert_eq!(phrase.bars[1].events[1], Event::Rest { length: 3.5 });
        assert!(is_cadence(&phrase.bars[1].events[2]));
    }

    #[test]
    fn test_rests_are_one_beat_in_both_strategies() {
        let mut table = TransitionTable::new();
        table.insert(One, Rest, 1.0);
        table.insert(Rest, Rest, 1.0);
        for strategy in [
            RhythmStrategy::PackAndPad { event_count: 3, start: One },
            RhythmStrategy::BoundedPerBar { bar_count: 1, seed: One },
        ] {
            let asm = assembler(strategy, table.clone());
            let mut rng = StdRng::seed_from_u64(4);
            let phrase = asm.assemble(&mut uniform(), &mut rng).unwrap();
            for event in phrase.bars.iter().flat_map(|b| &b.events) {
                if event.is_rest() {
                    assert_eq!(event.length(), 1.0);
                }
            }
        }
    }

    #[test]
    fn test_cadences_land_on_every_second_bar() {
        let asm = assembler(
            RhythmStrategy::BoundedPerBar { bar_count: 7, seed: One },
            TransitionTable::default_table(),
        );
        let mut rng = StdRng::seed_from_u64(5);
        let phrase = asm.assemble(&mut uniform(), &mut rng).unwrap();
        assert_eq!(phrase.bars.len(), 7);
        let with_cadence: Vec<usize> = phrase
            .bars
            .iter()
            .enumerate()
            .filter(|(_, b)| b.events.last().is_some_and(is_cadence))
            .map(|(i, _)| i + 1)
            .collect();
        assert_eq!(with_cadence, [2, 4, 6]);
    }

    #[test]
    fn test_bounded_bars_stay_within_capacity_and_are_not_padded() {
        let mut table = TransitionTable::new();
        table.insert(One, Half, 1.0);
        table.insert(Half, One, 1.0);
        let strategy = RhythmStrategy::BoundedPerBar { bar_count: 3, seed: One };
        let mut config = PhraseConfig::new(tonic(), strategy);
        config.bar_capacity = 2.0;
        config.phrase_length = 3;
        let asm = PhraseAssembler::new(config, RhythmChain::new(table).unwrap()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let phrase = asm.assemble(&mut uniform(), &mut rng).unwrap();
        // Walk from 1: 0.5, 1 (1.5 used), then 0.5 fits (2.0), then 1 does not.
        for bar in &phrase.bars[..2] {
            let lengths: Vec<f64> = bar.events.iter().map(Event::length).collect();
            assert_eq!(lengths, [0.5, 1.0, 0.5]);
            assert!(bar.events.iter().all(|e| !e.is_rest()));
        }
        assert_eq!(phrase.bars[2].total_length(), 2.0 + CADENCE_LENGTH);
    }

    #[test]
    fn test_bounded_bars_can_end_short() {
        let mut table = TransitionTable::new();
        table.insert(One, One, 1.0);
        let strategy = RhythmStrategy::BoundedPerBar { bar_count: 2, seed: One };
        let mut config = PhraseConfig::new(tonic(), strategy);
        config.bar_capacity = 2.5;
        let asm = PhraseAssembler::new(config, RhythmChain::new(table).unwrap()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let phrase = asm.assemble(&mut uniform(), &mut rng).unwrap();
        assert_eq!(phrase.bars[0].total_length(), 2.0);
        assert_eq!(phrase.bars[0].remaining(), 0.5);
    }

    #[test]
    fn test_empty_bars_follow_policy() {
        let mut table = TransitionTable::new();
        table.insert(One, One, 1.0);
        let strategy = RhythmStrategy::BoundedPerBar { bar_count: 4, seed: One };

        let mut config = PhraseConfig::new(tonic(), strategy);
        config.bar_capacity = 0.5;
        let chain = RhythmChain::new(table.clone()).unwrap();
        let asm = PhraseAssembler::new(config.clone(), chain).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let phrase = asm.assemble(&mut uniform(), &mut rng).unwrap();
        assert_eq!(phrase.bars.len(), 4);
        assert_eq!(phrase.bars[0], Bar::silent(0.5));
        assert!(is_cadence(&phrase.bars[1].events[1]));

        config.empty_bars = EmptyBarPolicy::Skip;
        let asm = PhraseAssembler::new(config, RhythmChain::new(table).unwrap()).unwrap();
        let phrase = asm.assemble(&mut uniform(), &mut rng).unwrap();
        assert!(phrase.bars.is_empty());
    }

    #[test]
    fn test_invalid_configurations_fail_before_generation() {
        let chain = || RhythmChain::new(TransitionTable::default_table()).unwrap();
        let strategy = RhythmStrategy::default();

        let mut config = PhraseConfig::new(tonic(), strategy);
        config.bar_capacity = 0.0;
        assert!(PhraseAssembler::new(config, chain()).is_err());

        let mut config = PhraseConfig::new(tonic(), strategy);
        config.phrase_length = 0;
        assert!(PhraseAssembler::new(config, chain()).is_err());

        let mut config = PhraseConfig::new(tonic(), strategy);
        config.bar_capacity = 0.75;
        assert!(PhraseAssembler::new(config, chain()).is_err());

        let mut config = PhraseConfig::new(tonic(), strategy);
        config.tempo_bpm = Some(-60.0);
        assert!(PhraseAssembler::new(config, chain()).is_err());
    }

    #[test]
    fn test_chain_errors_abort_the_phrase() {
        let mut table = TransitionTable::new();
        table.insert(One, Quarter, 1.0);
        let asm = assembler(RhythmStrategy::PackAndPad { event_count: 4, start: One }, table);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            asm.assemble(&mut uniform(), &mut rng),
            Err(GenerationError::UnknownState(Quarter))
        ));
    }

    #[test]
    fn test_contour_selector_drives_pitches() {
        let ladder = PitchLadder::new(
            ["C4", "D4", "E4", "F4", "G4"].iter().map(|p| p.parse().unwrap()).collect(),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let mut selector =
            ContourSelector::new(ladder.clone(), ContourMotion::Memoryless, &mut rng).unwrap();
        let asm = assembler(
            RhythmStrategy::PackAndPad { event_count: 20, start: One },
            TransitionTable::default_table(),
        );
        let phrase = asm.assemble(&mut selector, &mut rng).unwrap();
        for event in phrase.bars.iter().flat_map(|b| &b.events) {
            if let Some(pitch) = event.pitch() {
                assert!(ladder.pitches().contains(&pitch));
            }
        }
    }

    #[test]
    fn test_pad_is_idempotent() {
        let mut bar = Bar::new(4.0);
        bar.push(Event::Rest { length: 1.0 });
        bar.pad_to_capacity();
        assert_eq!(bar.events.len(), 2);
        bar.pad_to_capacity();
        assert_eq!(bar.events.len(), 2);
        assert_eq!(bar.total_length(), 4.0);
    }
}
