use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

use crate::parse::Slot;
use crate::trie::WILDCARD;

/// Board edge length. The mandatory shape is 5x5; everything below indexes
/// through [`Grid::idx`] so the constant is the only thing pinning the size.
pub const SIZE: usize = 5;

/// Block glyph accepted in external grid input (U+25A0).
pub const BLOCK_GLYPH: char = '■';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid must be {SIZE} rows of {SIZE} cells")]
    Shape,
    #[error("invalid cell value {value:?} at row {row}, column {col}")]
    BadCell {
        row: usize,
        col: usize,
        value: String,
    },
    #[error("single-cell run at row {row}, column {col}")]
    SingleCellRun { row: usize, col: usize },
    #[error("conflicting letter at row {row}, column {col}: have {have}, want {want}")]
    Conflict {
        row: usize,
        col: usize,
        have: char,
        want: char,
    },
    #[error("word {word:?} does not fit slot of length {len}")]
    LengthMismatch { word: String, len: usize },
    #[error("seed word {word:?} cannot be placed")]
    SeedDoesNotFit { word: String },
}

/// One board position. Letters pre-fixed by the caller (`Clue`) and letters
/// written by the solver (`Fill`) are distinct variants so that undo never
/// touches clue cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Block,
    Empty,
    Clue(u8),
    Fill(u8),
}

impl Cell {
    pub fn letter(self) -> Option<u8> {
        match self {
            Cell::Clue(letter) | Cell::Fill(letter) => Some(letter),
            Cell::Block | Cell::Empty => None,
        }
    }

    pub fn is_block(self) -> bool {
        self == Cell::Block
    }

    pub fn is_open(self) -> bool {
        self != Cell::Block
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

/// The board: a fixed 5x5 array of typed cells.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [Cell; SIZE * SIZE],
}

/// Prior cell states captured by [`Grid::place`]; consumed by
/// [`Grid::unplace`] to restore them exactly.
#[derive(Debug, Clone)]
pub struct Snapshot {
    cells: SmallVec<[(usize, Cell); SIZE]>,
}

impl Default for Grid {
    fn default() -> Grid {
        Grid::blank()
    }
}

impl Grid {
    pub fn blank() -> Grid {
        Grid {
            cells: [Cell::Empty; SIZE * SIZE],
        }
    }

    #[inline]
    pub fn idx(row: usize, col: usize) -> usize {
        row * SIZE + col
    }

    /// Build a grid from the canonical external form: a 5x5 array of arrays
    /// where each entry is a single uppercase letter, the empty string, or
    /// `"■"`. Anything else is a typed error.
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Result<Grid, GridError> {
        if rows.len() != SIZE || rows.iter().any(|row| row.len() != SIZE) {
            return Err(GridError::Shape);
        }
        let mut grid = Grid::blank();
        for (row, cells) in rows.iter().enumerate() {
            for (col, value) in cells.iter().enumerate() {
                let value = value.as_ref();
                let cell = match value {
                    "" => Cell::Empty,
                    v if v.chars().count() == 1 => {
                        let ch = v.chars().next().unwrap_or(' ');
                        if ch == BLOCK_GLYPH {
                            Cell::Block
                        } else if ch.is_ascii_uppercase() {
                            Cell::Clue(ch as u8)
                        } else {
                            return Err(GridError::BadCell {
                                row,
                                col,
                                value: value.to_string(),
                            });
                        }
                    }
                    _ => {
                        return Err(GridError::BadCell {
                            row,
                            col,
                            value: value.to_string(),
                        })
                    }
                };
                grid.cells[Grid::idx(row, col)] = cell;
            }
        }
        Ok(grid)
    }

    /// Developer-facing template form: five lines of `.` (empty), `#` or `■`
    /// (block), and letters. Blank lines are skipped so grids can be written
    /// as indented string literals in tests.
    pub fn parse(template: &str) -> Result<Grid, GridError> {
        let lines: Vec<&str> = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.len() != SIZE {
            return Err(GridError::Shape);
        }
        let mut grid = Grid::blank();
        for (row, line) in lines.iter().enumerate() {
            let chars: Vec<char> = line.chars().collect();
            if chars.len() != SIZE {
                return Err(GridError::Shape);
            }
            for (col, &ch) in chars.iter().enumerate() {
                let cell = match ch {
                    '.' => Cell::Empty,
                    '#' | BLOCK_GLYPH => Cell::Block,
                    c if c.is_ascii_alphabetic() => Cell::Clue(c.to_ascii_uppercase() as u8),
                    c => {
                        return Err(GridError::BadCell {
                            row,
                            col,
                            value: c.to_string(),
                        })
                    }
                };
                grid.cells[Grid::idx(row, col)] = cell;
            }
        }
        Ok(grid)
    }

    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.cells[Grid::idx(row, col)]
    }

    #[inline]
    pub fn cell_at(&self, idx: usize) -> Cell {
        self.cells[idx]
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[Grid::idx(row, col)] = cell;
    }

    /// True when every non-block cell holds a letter.
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    pub fn open_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_open()).count()
    }

    pub fn filled_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.letter().is_some())
            .count()
    }

    /// The slot's current positional pattern: letters where cells are filled,
    /// `.` where they are empty.
    pub fn read_pattern(&self, slot: &Slot) -> String {
        slot.cells
            .iter()
            .map(|&idx| match self.cells[idx].letter() {
                Some(letter) => letter as char,
                None => WILDCARD as char,
            })
            .collect()
    }

    /// Write `word` into the slot's cells as solver fill. Fails without
    /// modifying anything if a cell already holds a different letter. The
    /// returned snapshot restores the exact prior state via [`Grid::unplace`].
    pub fn place(&mut self, slot: &Slot, word: &str) -> Result<Snapshot, GridError> {
        let letters = word.as_bytes();
        if letters.len() != slot.len {
            return Err(GridError::LengthMismatch {
                word: word.to_string(),
                len: slot.len,
            });
        }
        // Validate before touching any cell so errors never leave the grid
        // half-written.
        for (&idx, &want) in slot.cells.iter().zip(letters) {
            if let Some(have) = self.cells[idx].letter() {
                if have != want {
                    return Err(GridError::Conflict {
                        row: idx / SIZE,
                        col: idx % SIZE,
                        have: have as char,
                        want: want as char,
                    });
                }
            }
        }
        let mut snapshot = Snapshot {
            cells: SmallVec::new(),
        };
        for (&idx, &letter) in slot.cells.iter().zip(letters) {
            if self.cells[idx].is_empty() {
                snapshot.cells.push((idx, self.cells[idx]));
                self.cells[idx] = Cell::Fill(letter);
            }
        }
        Ok(snapshot)
    }

    /// Exact inverse of the matching [`Grid::place`].
    pub fn unplace(&mut self, snapshot: Snapshot) {
        for (idx, cell) in snapshot.cells {
            self.cells[idx] = cell;
        }
    }

    /// Scoped placement: the returned guard restores the snapshot on any exit
    /// path unless [`Placement::commit`] is called.
    pub fn placement<'g>(&'g mut self, slot: &Slot, word: &str) -> Result<Placement<'g>, GridError> {
        let snapshot = self.place(slot, word)?;
        Ok(Placement {
            grid: self,
            snapshot: Some(snapshot),
        })
    }
}

pub struct Placement<'g> {
    grid: &'g mut Grid,
    snapshot: Option<Snapshot>,
}

impl Placement<'_> {
    pub fn grid(&mut self) -> &mut Grid {
        self.grid
    }

    /// Keep the placement; the guard becomes a no-op.
    pub fn commit(mut self) {
        self.snapshot = None;
    }
}

impl Drop for Placement<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.grid.unplace(snapshot);
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..SIZE {
            for col in 0..SIZE {
                let glyph = match self.cell(row, col) {
                    Cell::Block => BLOCK_GLYPH,
                    Cell::Empty => '·',
                    Cell::Clue(letter) | Cell::Fill(letter) => letter as char,
                };
                write!(f, "{}", glyph)?;
                if col != SIZE - 1 {
                    write!(f, " ")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, Grid, GridError};
    use crate::parse::SlotMap;

    #[test]
    fn from_rows_accepts_canonical_values() {
        let rows: Vec<Vec<&str>> = vec![
            vec!["A", "", "", "", "■"],
            vec![""; 5],
            vec![""; 5],
            vec![""; 5],
            vec!["■", "", "", "", "Z"],
        ];

        let grid = Grid::from_rows(&rows).unwrap();
        assert_eq!(Cell::Clue(b'A'), grid.cell(0, 0));
        assert_eq!(Cell::Block, grid.cell(0, 4));
        assert_eq!(Cell::Empty, grid.cell(2, 2));
        assert_eq!(Cell::Clue(b'Z'), grid.cell(4, 4));
    }

    #[test]
    fn from_rows_rejects_junk() {
        let mut rows: Vec<Vec<&str>> = vec![vec![""; 5]; 5];
        rows[1][2] = "a";
        assert!(matches!(
            Grid::from_rows(&rows),
            Err(GridError::BadCell { row: 1, col: 2, .. })
        ));

        let mut rows: Vec<Vec<&str>> = vec![vec![""; 5]; 5];
        rows[0][0] = "AB";
        assert!(matches!(
            Grid::from_rows(&rows),
            Err(GridError::BadCell { .. })
        ));

        let rows: Vec<Vec<&str>> = vec![vec![""; 5]; 4];
        assert!(matches!(Grid::from_rows(&rows), Err(GridError::Shape)));
    }

    #[test]
    fn parse_round_trips_template() {
        let grid = Grid::parse(
            "
            #ABLE
            .....
            .....
            .....
            PALE#
            ",
        )
        .unwrap();

        assert_eq!(Cell::Block, grid.cell(0, 0));
        assert_eq!(Cell::Clue(b'A'), grid.cell(0, 1));
        assert_eq!(Cell::Clue(b'P'), grid.cell(4, 0));
        assert_eq!(Cell::Block, grid.cell(4, 4));
        assert!(!grid.is_complete());
    }

    #[test]
    fn place_and_unplace_are_exact_inverses() {
        let mut grid = Grid::parse(
            "
            A....
            .....
            .....
            .....
            .....
            ",
        )
        .unwrap();
        let slots = SlotMap::build(&grid).unwrap();
        let (_, slot) = slots.get("1A".parse().unwrap()).unwrap();

        let before = grid.clone();
        let snapshot = grid.place(slot, "ACTOR").unwrap();
        assert_eq!(Some(b'C'), grid.cell(0, 1).letter());
        assert_eq!(Cell::Clue(b'A'), grid.cell(0, 0));
        assert_eq!(Cell::Fill(b'R'), grid.cell(0, 4));

        grid.unplace(snapshot);
        assert_eq!(before, grid);
    }

    #[test]
    fn place_rejects_conflicts_without_writing() {
        let mut grid = Grid::parse(
            "
            A....
            .....
            .....
            .....
            .....
            ",
        )
        .unwrap();
        let slots = SlotMap::build(&grid).unwrap();
        let (_, slot) = slots.get("1A".parse().unwrap()).unwrap();

        let before = grid.clone();
        assert!(matches!(
            grid.place(slot, "CRANE"),
            Err(GridError::Conflict { row: 0, col: 0, .. })
        ));
        assert_eq!(before, grid);

        assert!(matches!(
            grid.place(slot, "ACT"),
            Err(GridError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn placement_guard_restores_unless_committed() {
        let mut grid = Grid::blank();
        let slots = SlotMap::build(&grid).unwrap();
        let (_, slot) = slots.get("1A".parse().unwrap()).unwrap();
        let slot = slot.clone();

        let before = grid.clone();
        {
            let mut placement = grid.placement(&slot, "ACTOR").unwrap();
            assert_eq!(Some(b'A'), placement.grid().cell(0, 0).letter());
        }
        assert_eq!(before, grid);

        grid.placement(&slot, "ACTOR").unwrap().commit();
        assert_eq!(Cell::Fill(b'A'), grid.cell(0, 0));
        assert_eq!("ACTOR", grid.read_pattern(&slot));
    }

    #[test]
    fn read_pattern_mixes_letters_and_wildcards() {
        let grid = Grid::parse(
            "
            A.C..
            .....
            .....
            .....
            .....
            ",
        )
        .unwrap();
        let slots = SlotMap::build(&grid).unwrap();
        let (_, slot) = slots.get("1A".parse().unwrap()).unwrap();

        assert_eq!("A.C..", grid.read_pattern(slot));
    }
}
