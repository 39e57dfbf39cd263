use std::cmp::{Ordering, Reverse};
use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashSet, FxHasher};

use crate::dict::Dictionary;
use crate::fill::ExclusionSet;
use crate::grid::Grid;
use crate::parse::SlotMap;
use crate::trie::WILDCARD;
use crate::Lexicon;

/// A concrete word proposed for a specific slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub word: String,
    pub score: u8,
    /// True iff every intersecting unfilled slot still admits at least one
    /// word after this placement.
    pub viable: bool,
    /// Sum of the intersecting slots' residual domain sizes after placement.
    pub residual_sum: usize,
    /// How many unfilled intersecting slots the residual sum covers.
    pub crossing_count: usize,
    /// Projected grid quality if placed; filled in on request.
    pub grid_score: Option<f64>,
}

impl Candidate {
    /// Ordering score for interactive queries: word score plus half the
    /// average residual crossing domain. Not affected by the rng seed.
    pub fn composite(&self) -> f64 {
        let lookahead = if self.crossing_count == 0 {
            0.0
        } else {
            self.residual_sum as f64 / self.crossing_count as f64
        };
        f64::from(self.score) + 0.5 * lookahead
    }
}

/// The constraints that define a slot's live domain.
pub(crate) struct Constraints<'a> {
    pub min_score: u8,
    pub exclude: &'a ExclusionSet,
    pub used: &'a FxHashSet<String>,
}

impl Constraints<'_> {
    fn admits(&self, word: &str, score: u8, skip: Option<&str>) -> bool {
        score >= self.min_score
            && !self.exclude.contains(word)
            && !self.used.contains(word)
            && skip != Some(word)
    }
}

/// Count the words admitted for `pattern`, optionally skipping one word (the
/// candidate being evaluated cannot reappear in a crossing slot).
pub(crate) fn domain_count(
    lex: &Lexicon,
    pattern: &str,
    constraints: &Constraints<'_>,
    skip: Option<&str>,
) -> usize {
    lex.matches(pattern)
        .iter()
        .filter(|e| constraints.admits(&e.word, e.score, skip))
        .count()
}

/// Enumerate and annotate the live candidates for one slot: viability and the
/// depth-1 look-ahead over intersections.
pub(crate) fn annotate(
    lex: &Lexicon,
    slots: &SlotMap,
    grid: &Grid,
    slot_idx: usize,
    constraints: &Constraints<'_>,
) -> Vec<Candidate> {
    let slot = slots.slot(slot_idx);
    let pattern = grid.read_pattern(slot);

    // Current patterns of the unfilled crossing slots; the candidate's letter
    // is substituted per candidate below.
    let open_crossings: Vec<(usize, usize, Vec<u8>)> = slots
        .crossings(slot_idx)
        .iter()
        .filter_map(|crossing| {
            let other_pattern = grid.read_pattern(slots.slot(crossing.other));
            if other_pattern.contains(WILDCARD as char) {
                Some((crossing.at, crossing.other_at, other_pattern.into_bytes()))
            } else {
                None
            }
        })
        .collect();

    let mut candidates = Vec::new();
    for entry in lex.matches(&pattern).iter() {
        if !constraints.admits(&entry.word, entry.score, None) {
            continue;
        }
        let mut viable = true;
        let mut residual_sum = 0;
        for &(at, other_at, ref base) in &open_crossings {
            let letter = entry.word.as_bytes()[at];
            let crossed: String = base
                .iter()
                .enumerate()
                .map(|(i, &b)| if i == other_at { letter as char } else { b as char })
                .collect();
            let residual = domain_count(lex, &crossed, constraints, Some(&entry.word));
            if residual == 0 {
                viable = false;
            }
            residual_sum += residual;
        }
        candidates.push(Candidate {
            word: entry.word.clone(),
            score: entry.score,
            viable,
            residual_sum,
            crossing_count: open_crossings.len(),
            grid_score: None,
        });
    }
    candidates
}

/// Deterministic per-word jitter: a fixed seedless hash over
/// (seed, attempt, word), identical across runs and machines.
pub(crate) fn jitter(seed: u64, attempt: u32, word: &str) -> u64 {
    let mut hasher = FxHasher::default();
    seed.hash(&mut hasher);
    attempt.hash(&mut hasher);
    word.hash(&mut hasher);
    hasher.finish()
}

/// Search ordering: score, then the least-constraining-value look-ahead, then
/// jitter to diversify retries without losing reproducibility.
pub(crate) fn order_for_search(candidates: &mut [Candidate], seed: u64, attempt: u32) {
    candidates.sort_by_cached_key(|c| {
        (
            Reverse(c.score),
            Reverse(c.residual_sum),
            jitter(seed, attempt, &c.word),
            c.word.clone(),
        )
    });
}

/// Interactive ordering: composite score, best first. The rng seed plays no
/// part here.
pub(crate) fn order_for_display(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.composite()
            .partial_cmp(&a.composite())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.word.cmp(&b.word))
    });
}

/// Grid quality: the average slot-word score when the grid is complete,
/// otherwise the average over filled slots scaled by the fraction of filled
/// cells.
pub(crate) fn quality(dict: &Dictionary, slots: &SlotMap, grid: &Grid) -> f64 {
    let mut filled_scores = Vec::with_capacity(slots.len());
    let mut all_filled = true;
    for slot in slots.slots() {
        let pattern = grid.read_pattern(slot);
        if pattern.contains(WILDCARD as char) {
            all_filled = false;
        } else {
            filled_scores.push(f64::from(dict.score(&pattern)));
        }
    }
    if filled_scores.is_empty() {
        return 0.0;
    }
    let mean = filled_scores.iter().sum::<f64>() / filled_scores.len() as f64;
    if all_filled {
        mean
    } else {
        mean * (grid.filled_cells() as f64 / grid.open_cells() as f64)
    }
}
