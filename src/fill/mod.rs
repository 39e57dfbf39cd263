use std::fmt;
use std::time::{Duration, Instant};

use log::debug;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::grid::{Grid, GridError};
use crate::order::{self, Candidate, Constraints};
use crate::parse::{Direction, SlotId, SlotMap};
use crate::trie::WILDCARD;
use crate::Lexicon;

pub mod cache;
pub mod solver;

use solver::{Search, SearchOutcome};

/// Default minimum acceptable word score.
pub const DEFAULT_MIN_SCORE: u8 = 25;
/// Default soft deadline for a fill.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default number of independent retry searches.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;
/// Default cap on candidates returned by [`Engine::candidates_for_slot`].
pub const DEFAULT_MAX_CANDIDATES: usize = 50;

/// Words the engine must not place, normalized on construction by uppercasing
/// and stripping non-letters; empty strings are dropped.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    words: FxHashSet<String>,
}

impl ExclusionSet {
    pub fn from_words<I, S>(words: I) -> ExclusionSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = ExclusionSet::default();
        for word in words {
            set.insert(word.as_ref());
        }
        set
    }

    pub fn insert(&mut self, word: &str) {
        let normalized: String = word
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if !normalized.is_empty() {
            self.words.insert(normalized);
        }
    }

    /// Membership probe for an already-normalized (uppercase) word.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FillOptions {
    pub min_score: u8,
    pub exclude: ExclusionSet,
    pub timeout: Duration,
    pub max_attempts: u32,
    /// Seed for the deterministic candidate jitter. Fixed default; never
    /// wall-clock derived.
    pub rng_seed: u64,
    pub max_candidates: usize,
}

impl Default for FillOptions {
    fn default() -> FillOptions {
        FillOptions {
            min_score: DEFAULT_MIN_SCORE,
            exclude: ExclusionSet::default(),
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rng_seed: 0,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    NoSolution,
    InvalidGrid,
}

impl FailureReason {
    /// Short stable reason code for caller-facing payloads.
    pub fn code(self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::NoSolution => "noSolution",
            FailureReason::InvalidGrid => "invalidGrid",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Search statistics, reported on success and (partially) on failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillStats {
    pub attempts: u32,
    pub nodes: u64,
    pub backtracks: u64,
    /// High-water mark of simultaneously filled slots.
    pub slots_filled: usize,
    pub slot_count: usize,
}

#[derive(Debug, Clone)]
pub struct FillSuccess {
    pub solution: Grid,
    /// (slot id, word) for every slot, across entries first.
    pub words: Vec<(SlotId, String)>,
    pub quality_score: f64,
    pub average_word_score: f64,
    pub elapsed: Duration,
    pub stats: FillStats,
}

#[derive(Debug, Clone)]
pub struct FillFailure {
    pub reason: FailureReason,
    /// Populated for [`FailureReason::InvalidGrid`].
    pub detail: Option<GridError>,
    pub elapsed: Duration,
    pub stats: FillStats,
}

impl fmt::Display for FillFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "fill failed: {} ({})", self.reason, detail),
            None => write!(f, "fill failed: {}", self.reason),
        }
    }
}

impl std::error::Error for FillFailure {}

/// Candidates for a single slot under the current grid.
#[derive(Debug, Clone)]
pub struct SlotCandidates {
    pub slot: SlotId,
    pub candidates: Vec<Candidate>,
    /// Live-domain size before truncation to `max_candidates`.
    pub total_candidates: usize,
}

/// The most constrained unfilled slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestSlot {
    pub slot: SlotId,
    pub domain_size: usize,
    pub reason: String,
}

/// Programmer errors; operational failures travel in [`FillFailure`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown slot {0}")]
    UnknownSlot(SlotId),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// The fill engine: borrows a read-only [`Lexicon`] and owns nothing, so any
/// number of engines may run in parallel over the same lexicon.
pub struct Engine<'l> {
    lex: &'l Lexicon,
}

impl<'l> Engine<'l> {
    pub fn new(lex: &'l Lexicon) -> Engine<'l> {
        Engine { lex }
    }

    /// Search for a completed grid. The input grid is never modified; the
    /// solution is returned as a new grid.
    pub fn quick_fill(&self, grid: &Grid, opts: &FillOptions) -> Result<FillSuccess, FillFailure> {
        let started = Instant::now();
        let mut stats = FillStats::default();

        let slots = match SlotMap::build(grid) {
            Ok(slots) => slots,
            Err(err) => {
                return Err(FillFailure {
                    reason: FailureReason::InvalidGrid,
                    detail: Some(err),
                    elapsed: started.elapsed(),
                    stats,
                })
            }
        };
        stats.slot_count = slots.len();

        // Normalize: fully-clued slots must read distinct dictionary words,
        // and every unfilled slot must start with a non-empty domain.
        let mut used = FxHashSet::default();
        for slot in slots.slots() {
            let pattern = grid.read_pattern(slot);
            if pattern.contains(WILDCARD as char) {
                continue;
            }
            if !self.lex.dictionary().has(&pattern) || !used.insert(pattern) {
                return Err(self.no_solution(started, stats));
            }
            stats.slots_filled += 1;
        }
        {
            let constraints = Constraints {
                min_score: opts.min_score,
                exclude: &opts.exclude,
                used: &used,
            };
            for slot in slots.slots() {
                let pattern = grid.read_pattern(slot);
                if pattern.contains(WILDCARD as char)
                    && order::domain_count(self.lex, &pattern, &constraints, None) == 0
                {
                    return Err(self.no_solution(started, stats));
                }
            }
        }

        let deadline = started + opts.timeout;
        let mut work = grid.clone();

        for attempt in 0..opts.max_attempts.max(1) {
            if Instant::now() >= deadline {
                return Err(self.timeout(started, stats));
            }
            let mut search = Search::new(
                self.lex,
                &slots,
                opts,
                deadline,
                attempt,
                used.clone(),
                backtrack_limit(attempt),
            );
            let outcome = search.run(&mut work);
            stats.attempts = attempt + 1;
            stats.nodes += search.nodes;
            stats.backtracks += search.backtracks;
            stats.slots_filled = stats.slots_filled.max(search.max_filled);
            match outcome {
                SearchOutcome::Solved => {
                    return Ok(self.success(&slots, work, started, stats));
                }
                SearchOutcome::Exhausted => {
                    // A completed search proves there is nothing to find;
                    // further jittered retries would re-explore the same tree.
                    return Err(self.no_solution(started, stats));
                }
                SearchOutcome::TimedOut => {
                    return Err(self.timeout(started, stats));
                }
                SearchOutcome::OverBudget => {
                    debug!(
                        "attempt {} exceeded its backtrack budget ({} nodes so far)",
                        attempt + 1,
                        stats.nodes
                    );
                }
            }
        }
        Err(self.no_solution(started, stats))
    }

    /// Up to `opts.max_candidates` candidates for `id`, ordered by composite
    /// score.
    pub fn candidates_for_slot(
        &self,
        grid: &Grid,
        id: SlotId,
        opts: &FillOptions,
        compute_grid_score: bool,
    ) -> Result<SlotCandidates, EngineError> {
        let slots = SlotMap::build(grid)?;
        let (idx, slot) = slots.get(id).ok_or(EngineError::UnknownSlot(id))?;

        let mut used = complete_words(grid, &slots);
        let pattern = grid.read_pattern(slot);
        if !pattern.contains(WILDCARD as char) {
            // The slot's own word must not veto itself.
            used.remove(&pattern);
        }

        let constraints = Constraints {
            min_score: opts.min_score,
            exclude: &opts.exclude,
            used: &used,
        };
        let mut candidates = order::annotate(self.lex, &slots, grid, idx, &constraints);
        let total_candidates = candidates.len();
        order::order_for_display(&mut candidates);
        candidates.truncate(opts.max_candidates);

        if compute_grid_score {
            for candidate in &mut candidates {
                let mut projected = grid.clone();
                if projected.place(slot, &candidate.word).is_ok() {
                    candidate.grid_score =
                        Some(order::quality(self.lex.dictionary(), &slots, &projected));
                }
            }
        }

        Ok(SlotCandidates {
            slot: id,
            candidates,
            total_candidates,
        })
    }

    /// The unfilled slot with the smallest live domain; `None` when the grid
    /// is complete. Ties prefer longer slots, then lower slot ids.
    pub fn best_slot(
        &self,
        grid: &Grid,
        opts: &FillOptions,
    ) -> Result<Option<BestSlot>, EngineError> {
        let slots = SlotMap::build(grid)?;
        let used = complete_words(grid, &slots);
        let constraints = Constraints {
            min_score: opts.min_score,
            exclude: &opts.exclude,
            used: &used,
        };

        let mut best: Option<(usize, &crate::parse::Slot)> = None;
        for slot in slots.slots() {
            let pattern = grid.read_pattern(slot);
            if !pattern.contains(WILDCARD as char) {
                continue;
            }
            let count = order::domain_count(self.lex, &pattern, &constraints, None);
            let better = match best {
                None => true,
                Some((best_count, best_slot)) => {
                    (count, std::cmp::Reverse(slot.len), slot.id)
                        < (best_count, std::cmp::Reverse(best_slot.len), best_slot.id)
                }
            };
            if better {
                best = Some((count, slot));
            }
        }

        Ok(best.map(|(domain_size, slot)| BestSlot {
            slot: slot.id,
            domain_size,
            reason: format!("smallest live domain ({} words)", domain_size),
        }))
    }

    /// Grid quality as defined in [`order::quality`].
    pub fn evaluate_grid(&self, grid: &Grid) -> Result<f64, EngineError> {
        let slots = SlotMap::build(grid)?;
        Ok(order::quality(self.lex.dictionary(), &slots, grid))
    }

    fn success(
        &self,
        slots: &SlotMap,
        solution: Grid,
        started: Instant,
        mut stats: FillStats,
    ) -> FillSuccess {
        stats.slots_filled = slots.len();

        let mut order: Vec<usize> = (0..slots.len()).collect();
        order.sort_by_key(|&i| {
            let slot = slots.slot(i);
            (slot.direction == Direction::Down, slot.id.number)
        });
        let words: Vec<(SlotId, String)> = order
            .into_iter()
            .map(|i| {
                let slot = slots.slot(i);
                (slot.id, solution.read_pattern(slot))
            })
            .collect();

        let average_word_score = if words.is_empty() {
            0.0
        } else {
            words
                .iter()
                .map(|(_, word)| f64::from(self.lex.dictionary().score(word)))
                .sum::<f64>()
                / words.len() as f64
        };
        let quality_score = order::quality(self.lex.dictionary(), slots, &solution);

        FillSuccess {
            solution,
            words,
            quality_score,
            average_word_score,
            elapsed: started.elapsed(),
            stats,
        }
    }

    fn no_solution(&self, started: Instant, stats: FillStats) -> FillFailure {
        FillFailure {
            reason: FailureReason::NoSolution,
            detail: None,
            elapsed: started.elapsed(),
            stats,
        }
    }

    fn timeout(&self, started: Instant, stats: FillStats) -> FillFailure {
        FillFailure {
            reason: FailureReason::Timeout,
            detail: None,
            elapsed: started.elapsed(),
            stats,
        }
    }
}

/// Words already read by fully-filled slots; seeds the duplicate-suppression
/// set.
fn complete_words(grid: &Grid, slots: &SlotMap) -> FxHashSet<String> {
    let mut used = FxHashSet::default();
    for slot in slots.slots() {
        let pattern = grid.read_pattern(slot);
        if !pattern.contains(WILDCARD as char) {
            used.insert(pattern);
        }
    }
    used
}

/// Per-attempt backtrack budget: starts small so early attempts fail fast
/// into a re-jittered retry, doubles per attempt so late attempts approach a
/// complete search.
fn backtrack_limit(attempt: u32) -> u64 {
    512u64.saturating_mul(1u64 << attempt.min(12))
}
