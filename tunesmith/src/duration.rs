// Duration symbols: the state space of the rhythm chain.
//
// Values are in quarter-note units. The domain is closed: a one-beat note,
// a half-beat note, a quarter-beat note, and the rest sentinel `-1`. A rest
// always occupies exactly one beat in a bar, in both rhythm strategies and
// in the capacity filter of the bounded walk.
//
// Symbols serialize as their canonical numeric string ("0.5") so they can
// key JSON objects in transition-table files. Deserialization also accepts
// plain JSON numbers.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DurationSymbol {
    /// One beat. Also the conventional start symbol of a walk.
    One,
    Half,
    Quarter,
    /// The rest sentinel, value `-1`.
    Rest,
}

impl DurationSymbol {
    pub const ALL: [DurationSymbol; 4] = [
        DurationSymbol::One,
        DurationSymbol::Half,
        DurationSymbol::Quarter,
        DurationSymbol::Rest,
    ];

    /// Longest rendered length of any symbol.
    pub const LONGEST: f64 = 1.0;

    /// Signed symbol value as it appears in transition tables.
    pub fn value(self) -> f64 {
        match self {
            DurationSymbol::One => 1.0,
            DurationSymbol::Half => 0.5,
            DurationSymbol::Quarter => 0.25,
            DurationSymbol::Rest => -1.0,
        }
    }

    /// Length the symbol occupies in a bar, in quarter notes.
    pub fn rendered_length(self) -> f64 {
        match self {
            DurationSymbol::Rest => 1.0,
            other => other.value(),
        }
    }

    pub fn is_rest(self) -> bool {
        self == DurationSymbol::Rest
    }

    /// Map an exact table value back to its symbol.
    pub fn from_value(value: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.value() == value)
    }
}

impl fmt::Display for DurationSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DurationSymbol::One => "1",
            DurationSymbol::Half => "0.5",
            DurationSymbol::Quarter => "0.25",
            DurationSymbol::Rest => "-1",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a duration symbol (expected 1, 0.5, 0.25 or -1)")]
pub struct ParseDurationError(String);

impl FromStr for DurationSymbol {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<f64>()
            .ok()
            .and_then(DurationSymbol::from_value)
            .ok_or_else(|| ParseDurationError(s.to_string()))
    }
}

impl Serialize for DurationSymbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DurationSymbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = DurationSymbol;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("one of 1, 0.5, 0.25, -1 as a number or string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        DurationSymbol::from_value(v)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Float(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        DurationSymbol::from_value(v as f64)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        DurationSymbol::from_value(v as f64)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }
}
