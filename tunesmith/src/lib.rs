// Tunesmith: Markov-chain rhythm and melody generator.
//
// Produces short melodies as bars of timed events. A first-order Markov
// chain over duration symbols supplies the rhythm; a pitch selector turns
// each sounded duration into a pitch; the phrase assembler lays the result
// into fixed-capacity bars and closes every phrase on the tonic.
//
// Architecture:
// - duration.rs: Duration symbols (1, 0.5, 0.25 and the rest sentinel -1)
// - chain.rs: Transition tables and the rhythm chain (unbounded and
//   capacity-bounded walks)
// - pitch.rs: Pitches, pitch ladders, uniform and contour selectors
// - scale.rs: Tonic and modality lookup producing candidate pitches
// - phrase.rs: Events, bars, and the phrase assembler (pack-and-pad or
//   per-bar bounded rhythm, cadence insertion)
// - config.rs: Serializable generator configuration and the one-call
//   `generate` entry point
// - error.rs: The shared error type
//
// All randomness comes from a caller-supplied `rand::Rng`, so output is
// deterministic given a seeded generator. Rendering to notation or audio is
// left to the caller.

pub mod chain;
pub mod config;
pub mod duration;
pub mod error;
pub mod phrase;
pub mod pitch;
pub mod scale;

pub use chain::{RhythmChain, TransitionTable};
pub use config::{GeneratorConfig, SelectorKind};
pub use duration::DurationSymbol;
pub use error::GenerationError;
pub use phrase::{
    Bar, EmptyBarPolicy, Event, Phrase, PhraseAssembler, PhraseConfig, RhythmStrategy,
};
pub use pitch::{
    ContourMotion, ContourSelector, Pitch, PitchLadder, PitchSelector, Selector, UniformSelector,
};
pub use scale::{Key, Modality};
