//! Constraint-satisfaction fill engine for 5x5 mini crosswords.
//!
//! The crate is composed bottom-up: a scored [`dict::Dictionary`] loaded once
//! per process, a per-length [`trie::PatternIndex`] answering positional
//! pattern queries through a bounded LRU cache, a typed [`grid::Grid`] with
//! derived slots and crossings, and the backtracking [`fill::Engine`] on top.
//!
//! ```no_run
//! use minifill::{Engine, FillOptions, Grid, Lexicon};
//!
//! let lex = Lexicon::load_dir(std::path::Path::new("words"))?;
//! let engine = Engine::new(&lex);
//! let result = engine.quick_fill(&Grid::blank(), &FillOptions::default());
//! match result {
//!     Ok(success) => print!("{}", success.solution),
//!     Err(failure) => eprintln!("{}", failure.reason),
//! }
//! # Ok::<(), minifill::DictionaryError>(())
//! ```

use std::path::Path;
use std::sync::{Arc, OnceLock};

use log::info;

pub mod dict;
pub mod fill;
pub mod grid;
pub mod order;
pub mod parse;
pub mod seed;
pub mod trie;

pub use dict::{Dictionary, DictionaryError, WordEntry};
pub use fill::cache::{CacheStats, PatternCache, DEFAULT_CACHE_CAPACITY};
pub use fill::{
    BestSlot, Engine, EngineError, ExclusionSet, FailureReason, FillFailure, FillOptions,
    FillStats, FillSuccess, SlotCandidates,
};
pub use grid::{Cell, Grid, GridError, Placement, Snapshot};
pub use order::Candidate;
pub use parse::{Crossing, Direction, Slot, SlotId, SlotMap};
pub use seed::place_seeds;
pub use trie::{PatternIndex, Trie, WILDCARD};

/// The read-only word knowledge shared by every solver invocation: the
/// dictionary, its pattern tries, and the pattern cache. The cache is the
/// only mutable piece and carries its own locking, so a `&Lexicon` is all an
/// engine needs and lexicons are freely shared across threads.
#[derive(Debug)]
pub struct Lexicon {
    dict: Dictionary,
    index: PatternIndex,
    cache: PatternCache,
    /// Full per-length buckets as shareable lists, so all-wildcard queries
    /// return the bucket in source order without touching trie or cache.
    buckets: Vec<Arc<Vec<WordEntry>>>,
}

impl Lexicon {
    pub fn new(dict: Dictionary) -> Lexicon {
        Lexicon::with_cache_capacity(dict, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(dict: Dictionary, capacity: usize) -> Lexicon {
        let index = PatternIndex::build(&dict);
        let buckets = (0..=dict::MAX_WORD_LEN)
            .map(|len| Arc::new(dict.words_of_length(len).to_vec()))
            .collect();
        Lexicon {
            dict,
            index,
            cache: PatternCache::new(capacity),
            buckets,
        }
    }

    /// Load the per-length word lists from `dir` and build the indexes.
    pub fn load_dir(dir: &Path) -> Result<Lexicon, DictionaryError> {
        let dict = Dictionary::load_dir(dir)?;
        info!("loaded {} words from {}", dict.len(), dir.display());
        Ok(Lexicon::new(dict))
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    pub fn index(&self) -> &PatternIndex {
        &self.index
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolve a pattern query through the cache. All-wildcard patterns are
    /// answered from the per-length bucket (source order); everything else
    /// comes from the trie in traversal order and is cached.
    pub fn matches(&self, pattern: &str) -> Arc<Vec<WordEntry>> {
        if pattern.bytes().all(|b| b == WILDCARD) {
            return match self.buckets.get(pattern.len()) {
                Some(bucket) => Arc::clone(bucket),
                None => Arc::new(Vec::new()),
            };
        }
        if let Some(words) = self.cache.get(pattern) {
            return words;
        }
        let words = Arc::new(self.index.matches(pattern, None));
        self.cache.insert(pattern.to_string(), Arc::clone(&words));
        words
    }
}

static GLOBAL: OnceLock<Lexicon> = OnceLock::new();

/// Process-wide lexicon, loaded lazily on first use. Initialization happens
/// at most once; later calls return the existing lexicon no matter which
/// directory they name. Callers that need a fresh load (tests) construct a
/// [`Lexicon`] of their own instead.
pub fn init_global(dir: &Path) -> Result<&'static Lexicon, DictionaryError> {
    if let Some(lex) = GLOBAL.get() {
        return Ok(lex);
    }
    let built = Lexicon::load_dir(dir)?;
    Ok(GLOBAL.get_or_init(|| built))
}

/// The global lexicon, if [`init_global`] has succeeded.
pub fn global() -> Option<&'static Lexicon> {
    GLOBAL.get()
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::testutil::lexicon;
    use crate::{
        Engine, ExclusionSet, FailureReason, FillOptions, Grid, Lexicon, SlotId,
    };

    fn open_options() -> FillOptions {
        FillOptions {
            min_score: 0,
            ..FillOptions::default()
        }
    }

    fn assert_sound(lex: &Lexicon, result: &crate::FillSuccess, opts: &FillOptions) {
        let mut seen = std::collections::HashSet::new();
        for (slot, word) in &result.words {
            assert!(
                lex.dictionary().has(word),
                "{} filled with non-word {:?}",
                slot,
                word
            );
            assert!(
                lex.dictionary().score(word) >= opts.min_score,
                "{} scored below the floor",
                slot
            );
            assert!(!opts.exclude.contains(word), "{} used excluded word", slot);
            assert!(seen.insert(word.clone()), "{:?} appears twice", word);
        }
        assert!(result.solution.is_complete());
    }

    #[test]
    fn open_grid_fills_with_ten_distinct_words() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let opts = open_options();

        let result = engine.quick_fill(&Grid::blank(), &opts).unwrap();

        assert_eq!(10, result.words.len());
        assert!(result.words.iter().all(|(_, w)| w.len() == 5));
        assert_sound(&lex, &result, &opts);
        // Across entries come first in the word list.
        let ids: Vec<String> = result.words.iter().map(|(id, _)| id.to_string()).collect();
        assert_eq!(
            vec!["1A", "6A", "7A", "8A", "9A", "1D", "2D", "3D", "4D", "5D"],
            ids
        );
    }

    #[test]
    fn seeded_grid_keeps_its_clues() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let opts = open_options();
        let grid = Grid::parse(
            "
            ACTOR
            D....
            M....
            I....
            T....
            ",
        )
        .unwrap();

        let result = engine.quick_fill(&grid, &opts).unwrap();

        assert_sound(&lex, &result, &opts);
        let words: std::collections::HashMap<String, String> = result
            .words
            .iter()
            .map(|(id, w)| (id.to_string(), w.clone()))
            .collect();
        assert_eq!("ACTOR", words["1A"]);
        assert_eq!("ADMIT", words["1D"]);
        // Crossing cells agree byte for byte.
        for row in 0..5 {
            for col in 0..5 {
                assert!(result.solution.cell(row, col).letter().is_some());
            }
        }
    }

    #[test]
    fn exclusions_are_respected() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let opts = FillOptions {
            min_score: 0,
            exclude: ExclusionSet::from_words(["DRIVE", "tides!", "  "]),
            ..FillOptions::default()
        };

        let result = engine.quick_fill(&Grid::blank(), &opts).unwrap();

        assert_sound(&lex, &result, &opts);
        for (_, word) in &result.words {
            assert_ne!("DRIVE", word);
            assert_ne!("TIDES", word);
        }
    }

    #[test]
    fn min_score_floor_is_honored() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let opts = FillOptions {
            min_score: 30,
            ..FillOptions::default()
        };

        let result = engine.quick_fill(&Grid::blank(), &opts).unwrap();
        assert_sound(&lex, &result, &opts);
    }

    #[test]
    fn corner_block_layout_fills() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let opts = open_options();
        let grid = Grid::parse(
            "
            #....
            .....
            .....
            .....
            ....#
            ",
        )
        .unwrap();

        let result = engine.quick_fill(&grid, &opts).unwrap();

        assert_eq!(10, result.words.len());
        assert_sound(&lex, &result, &opts);
    }

    #[test]
    fn unsolvable_prefix_fails_fast_and_leaves_grid_alone() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let grid = Grid::parse(
            "
            Q....
            X....
            .....
            .....
            .....
            ",
        )
        .unwrap();
        let before = grid.clone();

        let failure = engine.quick_fill(&grid, &open_options()).unwrap_err();

        assert_eq!(FailureReason::NoSolution, failure.reason);
        assert_eq!("noSolution", failure.reason.code());
        assert!(failure.elapsed <= Duration::from_millis(50));
        assert_eq!(before, grid);
    }

    #[test]
    fn zero_timeout_reports_timeout_with_partial_stats() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let opts = FillOptions {
            min_score: 0,
            timeout: Duration::ZERO,
            ..FillOptions::default()
        };
        let grid = Grid::blank();
        let before = grid.clone();

        let failure = engine.quick_fill(&grid, &opts).unwrap_err();

        assert_eq!(FailureReason::Timeout, failure.reason);
        assert_eq!(10, failure.stats.slot_count);
        assert_eq!(before, grid);
    }

    #[test]
    fn results_are_deterministic_for_equal_inputs() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let opts = FillOptions {
            min_score: 0,
            rng_seed: 42,
            ..FillOptions::default()
        };

        let a = engine.quick_fill(&Grid::blank(), &opts).unwrap();
        let b = engine.quick_fill(&Grid::blank(), &opts).unwrap();

        assert_eq!(a.words, b.words);
        assert_eq!(a.solution, b.solution);
        assert_eq!(a.quality_score, b.quality_score);
    }

    #[test]
    fn candidates_for_slot_fit_the_crossing_pattern() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let opts = open_options();
        let grid = Grid::parse(
            "
            ACTOR
            .....
            .....
            .....
            .....
            ",
        )
        .unwrap();
        let id: SlotId = "2D".parse().unwrap();

        let result = engine
            .candidates_for_slot(&grid, id, &opts, true)
            .unwrap();

        assert_eq!(id, result.slot);
        assert!(!result.candidates.is_empty());
        assert!(result.candidates.len() <= opts.max_candidates);
        for candidate in &result.candidates {
            // 2D crosses ACTOR at its second letter.
            assert!(candidate.word.starts_with('C'));
            assert!(candidate.grid_score.is_some());
        }
        // CRANE and CRONE both fit; composite ordering puts the stronger
        // word first.
        assert_eq!("CRANE", result.candidates[0].word);
    }

    #[test]
    fn candidates_for_unknown_slot_is_a_typed_error() {
        let lex = lexicon();
        let engine = Engine::new(&lex);

        let err = engine
            .candidates_for_slot(&Grid::blank(), "9D".parse().unwrap(), &open_options(), false)
            .unwrap_err();
        assert!(matches!(err, crate::EngineError::UnknownSlot(_)));
    }

    #[test]
    fn best_slot_tracks_the_smallest_domain() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let opts = open_options();
        let grid = Grid::parse(
            "
            ACTOR
            .....
            .....
            .....
            .....
            ",
        )
        .unwrap();

        let best = engine.best_slot(&grid, &opts).unwrap().unwrap();

        // Its domain must be minimal among all unfilled slots.
        let slots = crate::SlotMap::build(&grid).unwrap();
        for slot in slots.slots() {
            let pattern = grid.read_pattern(slot);
            if !pattern.contains('.') {
                continue;
            }
            let candidates = engine
                .candidates_for_slot(&grid, slot.id, &opts, false)
                .unwrap();
            assert!(
                best.domain_size <= candidates.total_candidates,
                "{} has a smaller domain than {}",
                slot.id,
                best.slot
            );
        }
    }

    #[test]
    fn best_slot_is_none_on_a_complete_grid() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let grid = Grid::parse(
            "
            ACTOR
            DRIVE
            MODES
            INERT
            TESTS
            ",
        )
        .unwrap();

        assert!(engine.best_slot(&grid, &open_options()).unwrap().is_none());
    }

    #[test]
    fn evaluate_grid_matches_success_quality() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let opts = open_options();

        let result = engine.quick_fill(&Grid::blank(), &opts).unwrap();
        let quality = engine.evaluate_grid(&result.solution).unwrap();

        assert!((quality - result.quality_score).abs() < 1e-9);
        assert!((quality - result.average_word_score).abs() < 1e-9);
    }

    #[test]
    fn pattern_cache_hits_on_repeat_queries() {
        let lex = lexicon();

        let first = lex.matches("C....");
        let before = lex.cache_stats();
        let second = lex.matches("C....");
        let after = lex.cache_stats();

        assert_eq!(first, second);
        assert_eq!(before.hits + 1, after.hits);
    }

    #[test]
    fn all_wildcard_queries_return_the_bucket_in_source_order() {
        let lex = lexicon();

        let bucket = lex.matches(".....");
        let expected: Vec<&str> = crate::testutil::WORDS
            .iter()
            .filter(|(w, _)| w.len() == 5)
            .map(|&(w, _)| w)
            .collect();
        let got: Vec<&str> = bucket.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(expected, got);
    }

    #[test]
    fn invalid_grid_is_reported_as_such() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        let grid = Grid::parse(
            "
            .#...
            #....
            .....
            .....
            .....
            ",
        )
        .unwrap();

        let failure = engine.quick_fill(&grid, &open_options()).unwrap_err();
        assert_eq!(FailureReason::InvalidGrid, failure.reason);
        assert!(failure.detail.is_some());
    }

    #[test]
    fn clued_non_word_is_no_solution() {
        let lex = lexicon();
        let engine = Engine::new(&lex);
        // Full top row spells a non-dictionary string.
        let grid = Grid::parse(
            "
            ZZZZZ
            .....
            .....
            .....
            .....
            ",
        )
        .unwrap();

        let failure = engine.quick_fill(&grid, &open_options()).unwrap_err();
        assert_eq!(FailureReason::NoSolution, failure.reason);
    }
}
