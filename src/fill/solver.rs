use std::cmp::Reverse;
use std::time::Instant;

use log::trace;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::fill::FillOptions;
use crate::grid::Grid;
use crate::order::{self, Constraints};
use crate::parse::SlotMap;
use crate::trie::WILDCARD;
use crate::Lexicon;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchOutcome {
    Solved,
    /// The whole subtree was explored and holds no solution.
    Exhausted,
    /// The attempt's backtrack budget ran out before the tree was explored.
    OverBudget,
    TimedOut,
}

/// One backtracking attempt over a grid. The search places words in place
/// and unwinds them through placement guards, so whatever the outcome, the
/// grid it was handed ends up byte-identical to how it started unless a
/// solution was committed into it.
pub(crate) struct Search<'a> {
    lex: &'a Lexicon,
    slots: &'a SlotMap,
    opts: &'a FillOptions,
    deadline: Instant,
    attempt: u32,
    used: FxHashSet<String>,
    backtrack_limit: u64,
    pub nodes: u64,
    pub backtracks: u64,
    pub max_filled: usize,
}

impl<'a> Search<'a> {
    pub fn new(
        lex: &'a Lexicon,
        slots: &'a SlotMap,
        opts: &'a FillOptions,
        deadline: Instant,
        attempt: u32,
        used: FxHashSet<String>,
        backtrack_limit: u64,
    ) -> Search<'a> {
        Search {
            lex,
            slots,
            opts,
            deadline,
            attempt,
            used,
            backtrack_limit,
            nodes: 0,
            backtracks: 0,
            max_filled: 0,
        }
    }

    pub fn run(&mut self, grid: &mut Grid) -> SearchOutcome {
        let outcome = self.step(grid);
        trace!(
            "attempt {}: {:?} after {} nodes, {} backtracks",
            self.attempt + 1,
            outcome,
            self.nodes,
            self.backtracks
        );
        outcome
    }

    fn step(&mut self, grid: &mut Grid) -> SearchOutcome {
        // Soft deadline, checked once per node rather than in inner loops.
        if Instant::now() >= self.deadline {
            return SearchOutcome::TimedOut;
        }
        self.nodes += 1;
        let slots = self.slots;

        // Most-constrained-variable selection over the unfilled slots.
        // Ties prefer longer slots, then slot-id order.
        let mut filled = 0;
        let mut target: Option<(usize, usize)> = None;
        {
            let constraints = Constraints {
                min_score: self.opts.min_score,
                exclude: &self.opts.exclude,
                used: &self.used,
            };
            for (idx, slot) in slots.slots().iter().enumerate() {
                let pattern = grid.read_pattern(slot);
                if !pattern.contains(WILDCARD as char) {
                    filled += 1;
                    continue;
                }
                let count = order::domain_count(self.lex, &pattern, &constraints, None);
                let better = match target {
                    None => true,
                    Some((best_idx, best_count)) => {
                        let best = slots.slot(best_idx);
                        (count, Reverse(slot.len), slot.id)
                            < (best_count, Reverse(best.len), best.id)
                    }
                };
                if better {
                    target = Some((idx, count));
                }
            }
        }
        self.max_filled = self.max_filled.max(filled);

        let (target_idx, domain_size) = match target {
            None => return SearchOutcome::Solved,
            Some(found) => found,
        };
        if domain_size == 0 {
            return self.backtrack();
        }

        let mut candidates = {
            let constraints = Constraints {
                min_score: self.opts.min_score,
                exclude: &self.opts.exclude,
                used: &self.used,
            };
            order::annotate(self.lex, slots, grid, target_idx, &constraints)
        };
        order::order_for_search(&mut candidates, self.opts.rng_seed, self.attempt);

        let slot = slots.slot(target_idx);
        for candidate in &candidates {
            if Instant::now() >= self.deadline {
                return SearchOutcome::TimedOut;
            }
            // Forward checking: a candidate that empties any crossing domain
            // is never placed. For a crossing this placement fills to the
            // end, the residual count also vouched that the implied word is
            // admitted.
            if !candidate.viable {
                continue;
            }
            let open_crossings: SmallVec<[usize; 8]> = slots
                .crossings(target_idx)
                .iter()
                .map(|c| c.other)
                .filter(|&j| {
                    grid.read_pattern(slots.slot(j)).contains(WILDCARD as char)
                })
                .collect();
            let mut placement = match grid.placement(slot, &candidate.word) {
                Ok(placement) => placement,
                // The pattern query admitted the word, so this is
                // unreachable; skipping keeps the search sound regardless.
                Err(_) => continue,
            };

            // Every word this placement completes takes part in duplicate
            // suppression: the placed word, plus any crossing slot whose
            // last open cell it fills.
            let mut completed: SmallVec<[String; 4]> = SmallVec::new();
            completed.push(candidate.word.clone());
            for &j in &open_crossings {
                let word = placement.grid().read_pattern(slots.slot(j));
                if !word.contains(WILDCARD as char) {
                    completed.push(word);
                }
            }
            // Two crossings completing to the same word at once is the one
            // duplicate the per-crossing look-ahead cannot see.
            let clash = completed.iter().any(|w| self.used.contains(w))
                || (1..completed.len()).any(|i| completed[..i].contains(&completed[i]));
            if clash {
                continue;
            }

            for word in &completed {
                self.used.insert(word.clone());
            }
            let outcome = self.step(placement.grid());
            match outcome {
                SearchOutcome::Solved => {
                    placement.commit();
                    return SearchOutcome::Solved;
                }
                SearchOutcome::Exhausted => {
                    // Guard drop restores the cells; try the next candidate.
                    for word in &completed {
                        self.used.remove(word);
                    }
                }
                SearchOutcome::OverBudget | SearchOutcome::TimedOut => {
                    for word in &completed {
                        self.used.remove(word);
                    }
                    return outcome;
                }
            }
        }
        self.backtrack()
    }

    fn backtrack(&mut self) -> SearchOutcome {
        self.backtracks += 1;
        if self.backtracks > self.backtrack_limit {
            SearchOutcome::OverBudget
        } else {
            SearchOutcome::Exhausted
        }
    }
}
