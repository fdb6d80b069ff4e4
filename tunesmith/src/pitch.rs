// Pitches and the strategies that choose them.
//
// A `Pitch` is a MIDI note number that prints as scientific pitch notation
// ("C4", "F#5"). A `PitchLadder` is a non-empty set of pitches sorted by
// height.
//
// Selectors turn each sounded duration into a pitch:
// - `UniformSelector`: independent uniform choice from a candidate set.
// - `ContourSelector`: a bounded random walk over a ladder. Each event moves
//   the cursor one or two rungs and clamps at either end (no wrap, no
//   reflection). With `ContourMotion::Memoryless` the direction is redrawn
//   after every event, so there is no sustained arc despite the name; with
//   `ContourMotion::Runs` the direction is held for a random number of
//   events before it flips, producing rising and falling runs.
//
// A contour selector owns its cursor, so one instance belongs to exactly
// one assembly at a time.

use crate::duration::DurationSymbol;
use crate::error::GenerationError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Parse a pitch-class name ("C", "F#", "Bb") into 0-11.
pub fn parse_pitch_class(name: &str) -> Option<u8> {
    spelled_offset(name).map(|offset| offset.rem_euclid(12) as u8)
}

/// Semitones above the C of the spelled octave, before wrapping. "Cb" is -1
/// and "B#" is 12, so the octave carry is kept.
fn spelled_offset(name: &str) -> Option<i8> {
    let mut chars = name.chars();
    let natural = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental: i8 = match chars.as_str() {
        "" => 0,
        "#" => 1,
        "b" => -1,
        _ => return None,
    };
    Some(natural + accidental)
}

pub fn pitch_class_name(pc: u8) -> &'static str {
    SHARP_NAMES[(pc % 12) as usize]
}

/// A performable pitch, identified by MIDI note number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pitch {
    midi: u8,
}

impl Pitch {
    pub const MAX_MIDI: u8 = 127;

    pub fn from_midi(midi: u8) -> Option<Self> {
        (midi <= Self::MAX_MIDI).then_some(Pitch { midi })
    }

    /// Pitch class `pc` in scientific octave `octave` (C4 = MIDI 60).
    pub fn from_class_and_octave(pc: u8, octave: i8) -> Option<Self> {
        let midi = (octave as i16 + 1) * 12 + (pc % 12) as i16;
        u8::try_from(midi).ok().and_then(Self::from_midi)
    }

    pub fn midi(self) -> u8 {
        self.midi
    }

    pub fn pitch_class(self) -> u8 {
        self.midi % 12
    }

    pub fn octave(self) -> i8 {
        (self.midi / 12) as i8 - 1
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", pitch_class_name(self.pitch_class()), self.octave())
    }
}

impl FromStr for Pitch {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_digit() || c == '-')
            .ok_or_else(|| GenerationError::invalid(format!("pitch '{s}' has no octave")))?;
        let (name, octave) = s.split_at(split);
        let offset = spelled_offset(name)
            .ok_or_else(|| GenerationError::invalid(format!("unknown pitch name '{name}'")))?;
        let octave: i8 = octave
            .parse()
            .map_err(|_| GenerationError::invalid(format!("bad octave in pitch '{s}'")))?;
        let midi = (octave as i16 + 1) * 12 + offset as i16;
        u8::try_from(midi)
            .ok()
            .and_then(Pitch::from_midi)
            .ok_or_else(|| GenerationError::invalid(format!("pitch '{s}' is out of MIDI range")))
    }
}

impl TryFrom<String> for Pitch {
    type Error = GenerationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pitch> for String {
    fn from(pitch: Pitch) -> String {
        pitch.to_string()
    }
}

/// Pitches in ascending order of height, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PitchLadder {
    rungs: Vec<Pitch>,
}

impl PitchLadder {
    pub fn new(mut pitches: Vec<Pitch>) -> Result<Self, GenerationError> {
        if pitches.is_empty() {
            return Err(GenerationError::invalid("pitch ladder is empty"));
        }
        pitches.sort();
        pitches.dedup();
        Ok(PitchLadder { rungs: pitches })
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    /// Always false; a ladder has at least one rung.
    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Pitch> {
        self.rungs.get(index).copied()
    }

    pub fn pitches(&self) -> &[Pitch] {
        &self.rungs
    }
}

/// Resolves the pitch of each sounded event.
pub trait PitchSelector {
    fn resolve(&mut self, duration: DurationSymbol, rng: &mut impl Rng) -> Pitch;
}

/// Uniform choice from a fixed candidate set, independent across calls.
#[derive(Debug, Clone)]
pub struct UniformSelector {
    candidates: Vec<Pitch>,
}

impl UniformSelector {
    pub fn new(candidates: Vec<Pitch>) -> Result<Self, GenerationError> {
        if candidates.is_empty() {
            return Err(GenerationError::invalid("uniform selector needs at least one candidate"));
        }
        Ok(UniformSelector { candidates })
    }

    pub fn candidates(&self) -> &[Pitch] {
        &self.candidates
    }
}

impl PitchSelector for UniformSelector {
    fn resolve(&mut self, _duration: DurationSymbol, rng: &mut impl Rng) -> Pitch {
        self.candidates[rng.random_range(0..self.candidates.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn random(rng: &mut impl Rng) -> Self {
        if rng.random_bool(0.5) {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    fn flipped(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// How the contour walk chooses its direction between events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContourMotion {
    /// Redraw the direction uniformly after every event.
    #[default]
    Memoryless,
    /// Hold a direction for `1..=max_run` events, then reverse it.
    Runs { max_run: usize },
}

/// Bounded random walk over a pitch ladder.
#[derive(Debug, Clone)]
pub struct ContourSelector {
    ladder: PitchLadder,
    cursor: usize,
    direction: Direction,
    motion: ContourMotion,
    /// Events left before a `Runs` walk reverses.
    run_left: usize,
}

impl ContourSelector {
    /// Start at the middle rung heading in a random direction.
    pub fn new(
        ladder: PitchLadder,
        motion: ContourMotion,
        rng: &mut impl Rng,
    ) -> Result<Self, GenerationError> {
        if let ContourMotion::Runs { max_run: 0 } = motion {
            return Err(GenerationError::invalid("contour run length must be at least 1"));
        }
        let cursor = ladder.len() / 2;
        let direction = Direction::random(rng);
        let mut selector = ContourSelector {
            ladder,
            cursor,
            direction,
            motion,
            run_left: 0,
        };
        selector.run_left = selector.draw_run(rng);
        Ok(selector)
    }

    /// Place the cursor, clamped to the ladder.
    pub fn with_cursor(mut self, cursor: usize) -> Self {
        self.cursor = cursor.min(self.ladder.len() - 1);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn ladder(&self) -> &PitchLadder {
        &self.ladder
    }

    /// Move `step` rungs in the current direction, sticking at either end.
    pub fn advance(&mut self, step: usize) -> usize {
        let top = self.ladder.len() - 1;
        self.cursor = match self.direction {
            Direction::Up => (self.cursor + step).min(top),
            Direction::Down => self.cursor.saturating_sub(step),
        };
        self.cursor
    }

    fn draw_run(&self, rng: &mut impl Rng) -> usize {
        match self.motion {
            ContourMotion::Memoryless => 1,
            ContourMotion::Runs { max_run } => rng.random_range(1..=max_run),
        }
    }

    fn next_direction(&mut self, rng: &mut impl Rng) {
        match self.motion {
            ContourMotion::Memoryless => self.direction = Direction::random(rng),
            ContourMotion::Runs { .. } => {
                self.run_left = self.run_left.saturating_sub(1);
                if self.run_left == 0 {
                    self.direction = self.direction.flipped();
                    self.run_left = self.draw_run(rng);
                }
            }
        }
    }
}

impl PitchSelector for ContourSelector {
    fn resolve(&mut self, _duration: DurationSymbol, rng: &mut impl Rng) -> Pitch {
        let step = rng.random_range(1..=2);
        let index = self.advance(step);
        self.next_direction(rng);
        self.ladder.rungs[index]
    }
}

/// Either selector, chosen at runtime.
#[derive(Debug, Clone)]
pub enum Selector {
    Uniform(UniformSelector),
    Contour(ContourSelector),
}

impl PitchSelector for Selector {
    fn resolve(&mut self, duration: DurationSymbol, rng: &mut impl Rng) -> Pitch {
        match self {
            Selector::Uniform(s) => s.resolve(duration, rng),
            Selector::Contour(s) => s.resolve(duration, rng),
        }
    }
}
