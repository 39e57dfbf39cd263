use log::debug;

use crate::dict::{normalize, MAX_WORD_LEN, MIN_WORD_LEN};
use crate::grid::{Cell, Grid, GridError, SIZE};
use crate::parse::{Direction, SlotMap};

/// Place caller-validated seed words into `grid`, longest first.
///
/// Seeds become clue cells the solver cannot overwrite. A seed shorter than
/// the board is terminated by block cells, and every block added this way
/// also adds its 180-degree-rotated twin so the block pattern stays
/// rotationally symmetric. Positions are scanned deterministically (across
/// row-major, then down) with backtracking over earlier seeds, so an early
/// seed shifts when its first home would strand a later one.
pub fn place_seeds<S: AsRef<str>>(grid: &Grid, seeds: &[S]) -> Result<Grid, GridError> {
    let mut words = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let word = normalize(seed.as_ref()).ok_or_else(|| GridError::SeedDoesNotFit {
            word: seed.as_ref().to_string(),
        })?;
        if !(MIN_WORD_LEN..=MAX_WORD_LEN).contains(&word.len()) {
            return Err(GridError::SeedDoesNotFit { word });
        }
        words.push(word);
    }
    // Longest first; equal lengths keep caller order.
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));

    match place_all(grid, &words) {
        Some(placed) => {
            debug!("seeded {} words:\n{}", words.len(), placed);
            Ok(placed)
        }
        None => Err(GridError::SeedDoesNotFit {
            word: words.last().cloned().unwrap_or_default(),
        }),
    }
}

fn place_all(grid: &Grid, words: &[String]) -> Option<Grid> {
    let (word, rest) = match words.split_first() {
        None => return Some(grid.clone()),
        Some(split) => split,
    };
    for direction in [Direction::Across, Direction::Down] {
        for row in 0..SIZE {
            for col in 0..SIZE {
                if let Some(candidate) = try_position(grid, word, direction, row, col) {
                    if let Some(done) = place_all(&candidate, rest) {
                        return Some(done);
                    }
                }
            }
        }
    }
    None
}

fn try_position(
    grid: &Grid,
    word: &str,
    direction: Direction,
    row: usize,
    col: usize,
) -> Option<Grid> {
    let len = word.len();
    let span_end = match direction {
        Direction::Across => col + len,
        Direction::Down => row + len,
    };
    if span_end > SIZE {
        return None;
    }

    let cell_at = |i: usize| match direction {
        Direction::Across => (row, col + i),
        Direction::Down => (row + i, col),
    };

    let mut candidate = grid.clone();

    // Letters first: every covered cell must be empty or already agree.
    for (i, &letter) in word.as_bytes().iter().enumerate() {
        let (r, c) = cell_at(i);
        match candidate.cell(r, c) {
            Cell::Block => return None,
            Cell::Clue(have) | Cell::Fill(have) if have != letter => return None,
            _ => candidate.set(r, c, Cell::Clue(letter)),
        }
    }

    // Terminating blocks (plus rotated twins) for words shorter than the
    // board. A block may not land on a letter, the seed's own cells included.
    let mut walls = Vec::new();
    match direction {
        Direction::Across => {
            if col > 0 {
                walls.push((row, col - 1));
            }
            if col + len < SIZE {
                walls.push((row, col + len));
            }
        }
        Direction::Down => {
            if row > 0 {
                walls.push((row - 1, col));
            }
            if row + len < SIZE {
                walls.push((row + len, col));
            }
        }
    }
    let mut blocks = Vec::new();
    for (r, c) in walls {
        blocks.push((r, c));
        blocks.push((SIZE - 1 - r, SIZE - 1 - c));
    }
    for (r, c) in blocks {
        match candidate.cell(r, c) {
            Cell::Block => {}
            Cell::Empty => candidate.set(r, c, Cell::Block),
            Cell::Clue(_) | Cell::Fill(_) => return None,
        }
    }

    // The grid must still derive cleanly (no single-cell runs).
    if SlotMap::build(&candidate).is_err() {
        return None;
    }
    Some(candidate)
}
