// Tonic and modality lookup.
//
// Turns a tonic name and a modality into the concrete pitches the selectors
// draw from. Each modality is a pattern of seven semitone offsets from the
// tonic. `scale_pitches` lays the seven degrees out octave by octave,
// ascending from the tonic of each octave, so the result is already sorted
// by height and can be used directly as a contour ladder.
//
// Pitch names are spelled with sharps regardless of key.

use crate::error::GenerationError;
use crate::pitch::{Pitch, PitchLadder, parse_pitch_class, pitch_class_name};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Major,
    /// Natural minor.
    Minor,
    Mixolydian,
    Dorian,
    Phrygian,
    Lydian,
}

impl Modality {
    pub const ALL: [Modality; 6] = [
        Modality::Major,
        Modality::Minor,
        Modality::Mixolydian,
        Modality::Dorian,
        Modality::Phrygian,
        Modality::Lydian,
    ];

    /// Semitone offsets from the tonic to degrees 1-7.
    pub fn intervals(self) -> [u8; 7] {
        match self {
            Modality::Major => [0, 2, 4, 5, 7, 9, 11],
            Modality::Minor => [0, 2, 3, 5, 7, 8, 10],
            Modality::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            Modality::Dorian => [0, 2, 3, 5, 7, 9, 10],
            Modality::Phrygian => [0, 1, 3, 5, 7, 8, 10],
            Modality::Lydian => [0, 2, 4, 6, 7, 9, 11],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Modality::Major => "major",
            Modality::Minor => "minor",
            Modality::Mixolydian => "mixolydian",
            Modality::Dorian => "dorian",
            Modality::Phrygian => "phrygian",
            Modality::Lydian => "lydian",
        }
    }
}

impl FromStr for Modality {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Modality::ALL
            .into_iter()
            .find(|m| m.name() == lower)
            .ok_or_else(|| GenerationError::invalid(format!("unknown modality '{s}'")))
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A modality rooted on a tonic pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub modality: Modality,
    /// Pitch class of the tonic (0 = C, 2 = D, ...).
    pub tonic: u8,
}

impl Key {
    pub fn new(modality: Modality, tonic: u8) -> Self {
        Key {
            modality,
            tonic: tonic % 12,
        }
    }

    /// Build a key from a tonic name such as "C", "F#" or "Bb".
    pub fn from_names(tonic: &str, modality: Modality) -> Result<Self, GenerationError> {
        let pc = parse_pitch_class(tonic.trim())
            .ok_or_else(|| GenerationError::invalid(format!("unknown tonic '{tonic}'")))?;
        Ok(Key::new(modality, pc))
    }

    /// The tonic in the given octave; the cadential pitch of a phrase.
    pub fn tonic_pitch(&self, octave: i8) -> Result<Pitch, GenerationError> {
        Pitch::from_class_and_octave(self.tonic, octave).ok_or_else(|| {
            GenerationError::invalid(format!(
                "tonic {} in octave {octave} is outside the MIDI range",
                pitch_class_name(self.tonic)
            ))
        })
    }

    /// All seven degrees for each octave in
    /// `start_octave .. start_octave + octave_range`, ascending.
    pub fn scale_pitches(
        &self,
        start_octave: i8,
        octave_range: u8,
    ) -> Result<Vec<Pitch>, GenerationError> {
        if octave_range == 0 {
            return Err(GenerationError::invalid("octave range must be at least 1"));
        }
        let mut pitches = Vec::with_capacity(7 * octave_range as usize);
        for offset in 0..octave_range {
            let root = self.tonic_pitch(start_octave.saturating_add(offset as i8))?;
            for interval in self.modality.intervals() {
                let midi = root.midi() as u16 + interval as u16;
                let pitch = u8::try_from(midi)
                    .ok()
                    .and_then(Pitch::from_midi)
                    .ok_or_else(|| {
                        GenerationError::invalid(format!(
                            "scale degree {interval} above {root} is outside the MIDI range"
                        ))
                    })?;
                pitches.push(pitch);
            }
        }
        Ok(pitches)
    }

    pub fn ladder(
        &self,
        start_octave: i8,
        octave_range: u8,
    ) -> Result<PitchLadder, GenerationError> {
        PitchLadder::new(self.scale_pitches(start_octave, octave_range)?)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", pitch_class_name(self.tonic), self.modality)
    }
}
