// Generator configuration: everything one run needs, in one serde struct.
//
// Defaults reproduce the stock generator: C major from octave 4, one octave
// of candidates, 4/4 bars, a cadence every two bars, sixteen packed
// transitions after a one-beat start, uniform pitch choice, and the default
// rhythm table. A config can be loaded from JSON; missing fields fall back
// to these defaults.
//
// `generate` validates everything (key, octave range, table, phrase
// settings) before the first random draw.

use crate::chain::{RhythmChain, TransitionTable};
use crate::error::GenerationError;
use crate::phrase::{EmptyBarPolicy, Phrase, PhraseAssembler, PhraseConfig, RhythmStrategy};
use crate::pitch::{ContourMotion, ContourSelector, Selector, UniformSelector};
use crate::scale::{Key, Modality};
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which pitch selector to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectorKind {
    #[default]
    Uniform,
    Contour {
        #[serde(default)]
        motion: ContourMotion,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Tonic name, e.g. "C", "F#", "Bb".
    pub tonic: String,
    pub modality: Modality,
    /// Lowest octave of the candidate pitches; also the cadence octave.
    pub start_octave: i8,
    pub octave_range: u8,
    pub bar_capacity: f64,
    pub phrase_length: usize,
    pub strategy: RhythmStrategy,
    pub selector: SelectorKind,
    pub empty_bars: EmptyBarPolicy,
    /// Carried through to the output untouched.
    pub tempo_bpm: Option<f64>,
    /// Rhythm table; the stock table when absent.
    pub transitions: Option<TransitionTable>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            tonic: "C".to_string(),
            modality: Modality::Major,
            start_octave: 4,
            octave_range: 1,
            bar_capacity: 4.0,
            phrase_length: 2,
            strategy: RhythmStrategy::default(),
            selector: SelectorKind::Uniform,
            empty_bars: EmptyBarPolicy::Silence,
            tempo_bpm: None,
            transitions: None,
        }
    }
}

impl GeneratorConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, GenerationError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(json: &str) -> Result<Self, GenerationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn key(&self) -> Result<Key, GenerationError> {
        Key::from_names(&self.tonic, self.modality)
    }

    /// Build the validated assembler for this configuration.
    pub fn assembler(&self) -> Result<PhraseAssembler, GenerationError> {
        let key = self.key()?;
        let table = self
            .transitions
            .clone()
            .unwrap_or_else(TransitionTable::default_table);
        let chain = RhythmChain::new(table)?;
        let phrase = PhraseConfig {
            bar_capacity: self.bar_capacity,
            phrase_length: self.phrase_length,
            tonic: key.tonic_pitch(self.start_octave)?,
            strategy: self.strategy,
            empty_bars: self.empty_bars,
            tempo_bpm: self.tempo_bpm,
        };
        PhraseAssembler::new(phrase, chain)
    }

    /// Build a fresh selector. Contour selectors draw their starting
    /// direction from `rng`.
    pub fn selector(&self, rng: &mut impl Rng) -> Result<Selector, GenerationError> {
        let key = self.key()?;
        Ok(match self.selector {
            SelectorKind::Uniform => Selector::Uniform(UniformSelector::new(
                key.scale_pitches(self.start_octave, self.octave_range)?,
            )?),
            SelectorKind::Contour { motion } => Selector::Contour(ContourSelector::new(
                key.ladder(self.start_octave, self.octave_range)?,
                motion,
                rng,
            )?),
        })
    }

    /// Run one generation with fresh state.
    pub fn generate(&self, rng: &mut impl Rng) -> Result<Phrase, GenerationError> {
        let assembler = self.assembler()?;
        let mut selector = self.selector(rng)?;
        info!(
            "generating in {} with {:?} and {:?}",
            self.key()?,
            self.strategy,
            self.selector
        );
        assembler.assemble(&mut selector, rng)
    }
}
