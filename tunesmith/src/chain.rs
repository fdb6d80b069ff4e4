// First-order Markov chain over duration symbols.
//
// The transition table maps each duration symbol to a weighted distribution
// over the next symbol. Weights are unnormalized; sampling divides by the
// row sum. Tables are loaded from JSON (keys are symbol strings such as
// "0.5") or built in code; `default_table` carries the stock rhythm
// probabilities.
//
// Two walks are offered:
// - `generate_sequence`: a fixed-length walk with no duration budget.
// - `generate_bounded`: a walk that only proposes transitions whose rendered
//   length fits the remaining bar capacity, and stops when none fits.
//
// The chain consumes randomness only through the `rng` argument, so a seeded
// generator gives reproducible output.

use crate::duration::DurationSymbol;
use crate::error::GenerationError;
use log::trace;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Tolerance when comparing accumulated lengths against a capacity.
pub(crate) const LENGTH_EPSILON: f64 = 1e-9;

/// Outgoing weights from one duration symbol.
pub type TransitionRow = BTreeMap<DurationSymbol, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionTable {
    rows: BTreeMap<DurationSymbol, TransitionRow>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock rhythm table: short values favoured after long ones,
    /// occasional rests, and a small chance of returning to a full beat.
    pub fn default_table() -> Self {
        use crate::duration::DurationSymbol::{Half, One, Quarter, Rest};

        let mut table = Self::new();
        for (from, row) in [
            (One, [(Half, 0.45), (Quarter, 0.4), (One, 0.1), (Rest, 0.05)]),
            (Half, [(Quarter, 0.4), (Half, 0.25), (One, 0.15), (Rest, 0.2)]),
            (Quarter, [(Quarter, 0.5), (Half, 0.25), (One, 0.05), (Rest, 0.2)]),
            (Rest, [(Quarter, 0.5), (Half, 0.3), (One, 0.1), (Rest, 0.1)]),
        ] {
            for (to, weight) in row {
                table.insert(from, to, weight);
            }
        }
        table
    }

    /// Set the weight of the `from -> to` transition, creating the row if needed.
    pub fn insert(&mut self, from: DurationSymbol, to: DurationSymbol, weight: f64) {
        self.rows.entry(from).or_default().insert(to, weight);
    }

    pub fn row(&self, state: DurationSymbol) -> Option<&TransitionRow> {
        self.rows.get(&state)
    }

    pub fn states(&self) -> impl Iterator<Item = DurationSymbol> + '_ {
        self.rows.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, GenerationError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(json: &str) -> Result<Self, GenerationError> {
        let table: TransitionTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Reject negative or non-finite weights. Rows whose weights are all
    /// zero are allowed; reaching one ends a bounded walk.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.rows.is_empty() {
            return Err(GenerationError::invalid("transition table has no states"));
        }
        for (from, row) in &self.rows {
            for (to, &weight) in row {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(GenerationError::invalid(format!(
                        "transition {from} -> {to} has weight {weight}; expected finite and >= 0"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Markov chain over duration symbols, driven by a validated table.
#[derive(Debug, Clone)]
pub struct RhythmChain {
    table: TransitionTable,
}

impl RhythmChain {
    pub fn new(table: TransitionTable) -> Result<Self, GenerationError> {
        table.validate()?;
        Ok(RhythmChain { table })
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn row(&self, state: DurationSymbol) -> Result<&TransitionRow, GenerationError> {
        self.table
            .row(state)
            .ok_or(GenerationError::UnknownState(state))
    }

    /// Draw the symbol following `current`, proportional to its weight.
    pub fn sample_next(
        &self,
        current: DurationSymbol,
        rng: &mut impl Rng,
    ) -> Result<DurationSymbol, GenerationError> {
        let row = self.row(current)?;
        sample_weighted(row.iter().map(|(&s, &w)| (s, w)), rng.random())
            .ok_or(GenerationError::EmptyDistribution(current))
    }

    /// Unconstrained walk: `start` followed by `count` sampled symbols.
    /// A `count` too large to hold in memory is `InvalidConfiguration`.
    pub fn generate_sequence(
        &self,
        count: usize,
        start: DurationSymbol,
        rng: &mut impl Rng,
    ) -> Result<Vec<DurationSymbol>, GenerationError> {
        let too_long = || GenerationError::invalid(format!("cannot generate {count} transitions"));
        let len = count.checked_add(1).ok_or_else(too_long)?;
        let mut symbols = Vec::new();
        symbols.try_reserve_exact(len).map_err(|_| too_long())?;
        symbols.push(start);
        let mut current = start;
        for _ in 0..count {
            current = self.sample_next(current, rng)?;
            symbols.push(current);
        }
        Ok(symbols)
    }

    /// Walk from `start` proposing only transitions that fit the remaining
    /// capacity. The seed itself is not part of the output. The result's
    /// total rendered length never exceeds `capacity`, and may fall short.
    pub fn generate_bounded(
        &self,
        start: DurationSymbol,
        capacity: f64,
        rng: &mut impl Rng,
    ) -> Result<Vec<DurationSymbol>, GenerationError> {
        let mut symbols = Vec::new();
        let mut remaining = capacity;
        let mut current = start;

        loop {
            let row = self.row(current)?;
            let fitting = row
                .iter()
                .filter(|(s, _)| s.rendered_length() <= remaining + LENGTH_EPSILON)
                .map(|(&s, &w)| (s, w));
            let Some(next) = sample_weighted(fitting, rng.random()) else {
                trace!("bounded walk stops after {current} with {remaining} remaining");
                break;
            };
            remaining -= next.rendered_length();
            symbols.push(next);
            current = next;
        }

        Ok(symbols)
    }
}

/// Pick an entry with probability proportional to its weight, using a
/// uniform `rng_val` in [0, 1). Zero-weight entries are never chosen.
/// Returns `None` when no entry has positive weight.
fn sample_weighted(
    entries: impl Iterator<Item = (DurationSymbol, f64)>,
    rng_val: f64,
) -> Option<DurationSymbol> {
    let candidates: Vec<(DurationSymbol, f64)> = entries.filter(|&(_, w)| w > 0.0).collect();
    let total: f64 = candidates.iter().map(|&(_, w)| w).sum();
    if candidates.is_empty() || total <= 0.0 {
        return None;
    }

    let target = rng_val * total;
    let mut cumulative = 0.0;
    for &(symbol, weight) in &candidates {
        cumulative += weight;
        if cumulative > target {
            return Some(symbol);
        }
    }
    // Rounding can leave the target at the very top of the range.
    candidates.last().map(|&(s, _)| s)
}
