use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::grid::{Grid, GridError, SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    pub fn suffix(self) -> char {
        match self {
            Direction::Across => 'A',
            Direction::Down => 'D',
        }
    }
}

/// Canonical slot identifier, e.g. `1A` or `3D`. Ordering is by number, then
/// across before down, which is the tie-break order the solver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId {
    pub number: u16,
    pub direction: Direction,
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.direction.suffix())
    }
}

impl FromStr for SlotId {
    type Err = String;

    fn from_str(s: &str) -> Result<SlotId, String> {
        let (digits, suffix) = s.split_at(s.len().saturating_sub(1));
        let number: u16 = digits
            .parse()
            .map_err(|_| format!("bad slot id {:?}", s))?;
        let direction = match suffix {
            "A" | "a" => Direction::Across,
            "D" | "d" => Direction::Down,
            _ => return Err(format!("bad slot id {:?}", s)),
        };
        Ok(SlotId { number, direction })
    }
}

/// A maximal run of non-block cells in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: SlotId,
    pub direction: Direction,
    pub row: usize,
    pub col: usize,
    pub len: usize,
    /// Grid indices of the slot's cells, in reading order.
    pub cells: SmallVec<[usize; SIZE]>,
}

/// A shared cell between an across slot and a down slot: cell `at` of this
/// slot is cell `other_at` of slot `other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub at: usize,
    pub other: usize,
    pub other_at: usize,
}

/// The derived slot structure of a grid: the slot list in numbering order,
/// the per-slot crossing table, and id/cell lookups. Built once per grid
/// shape; placements do not change it.
#[derive(Debug)]
pub struct SlotMap {
    slots: Vec<Slot>,
    crossings: Vec<SmallVec<[Crossing; SIZE]>>,
    by_id: FxHashMap<SlotId, usize>,
    /// Per cell: the (slot index, position) covering it, across then down.
    cell_slots: Vec<[Option<(usize, usize)>; 2]>,
}

impl SlotMap {
    /// Walk the grid and derive slots, numbering cells in row-major order:
    /// a cell gets the next number iff it begins an across or down run of
    /// length >= 2. Any length-1 run anywhere is an invalid grid.
    pub fn build(grid: &Grid) -> Result<SlotMap, GridError> {
        let mut slots = Vec::new();
        let mut number: u16 = 0;

        for row in 0..SIZE {
            for col in 0..SIZE {
                if grid.cell(row, col).is_block() {
                    continue;
                }
                let starts_across = col == 0 || grid.cell(row, col - 1).is_block();
                let starts_down = row == 0 || grid.cell(row - 1, col).is_block();

                let across_len = if starts_across {
                    (col..SIZE)
                        .take_while(|&c| grid.cell(row, c).is_open())
                        .count()
                } else {
                    0
                };
                let down_len = if starts_down {
                    (row..SIZE)
                        .take_while(|&r| grid.cell(r, col).is_open())
                        .count()
                } else {
                    0
                };

                if starts_across && across_len == 1 && starts_down && down_len == 1 {
                    return Err(GridError::SingleCellRun { row, col });
                }

                let numbered = (starts_across && across_len >= 2) || (starts_down && down_len >= 2);
                if numbered {
                    number += 1;
                }

                if starts_across && across_len >= 2 {
                    slots.push(Slot {
                        id: SlotId {
                            number,
                            direction: Direction::Across,
                        },
                        direction: Direction::Across,
                        row,
                        col,
                        len: across_len,
                        cells: (col..col + across_len).map(|c| Grid::idx(row, c)).collect(),
                    });
                }
                if starts_down && down_len >= 2 {
                    slots.push(Slot {
                        id: SlotId {
                            number,
                            direction: Direction::Down,
                        },
                        direction: Direction::Down,
                        row,
                        col,
                        len: down_len,
                        cells: (row..row + down_len).map(|r| Grid::idx(r, col)).collect(),
                    });
                }
            }
        }

        // Cell index: which slot covers each cell per direction. A cell
        // inside a run of length >= 2 one way can still be a single-cell run
        // the other way; every open cell must sit in one slot per direction.
        let mut cell_slots: Vec<[Option<(usize, usize)>; 2]> = vec![[None; 2]; SIZE * SIZE];
        for (i, slot) in slots.iter().enumerate() {
            let axis = slot.direction as usize;
            for (pos, &idx) in slot.cells.iter().enumerate() {
                cell_slots[idx][axis] = Some((i, pos));
            }
        }
        for row in 0..SIZE {
            for col in 0..SIZE {
                let covered = cell_slots[Grid::idx(row, col)];
                if grid.cell(row, col).is_open() && (covered[0].is_none() || covered[1].is_none())
                {
                    return Err(GridError::SingleCellRun { row, col });
                }
            }
        }

        let mut by_id = FxHashMap::default();
        for (i, slot) in slots.iter().enumerate() {
            by_id.insert(slot.id, i);
        }

        // Crossings, straight off the cell index.
        let mut crossings: Vec<SmallVec<[Crossing; SIZE]>> = vec![SmallVec::new(); slots.len()];
        for (i, slot) in slots.iter().enumerate() {
            if slot.direction != Direction::Across {
                continue;
            }
            for (pos, &idx) in slot.cells.iter().enumerate() {
                if let Some((j, other_pos)) = cell_slots[idx][Direction::Down as usize] {
                    crossings[i].push(Crossing {
                        at: pos,
                        other: j,
                        other_at: other_pos,
                    });
                    crossings[j].push(Crossing {
                        at: other_pos,
                        other: i,
                        other_at: pos,
                    });
                }
            }
        }

        Ok(SlotMap {
            slots,
            crossings,
            by_id,
            cell_slots,
        })
    }

    /// The slots covering a cell, across then down, with the cell's position
    /// inside each.
    pub fn slots_at(&self, row: usize, col: usize) -> [Option<(&Slot, usize)>; 2] {
        let covered = self.cell_slots[Grid::idx(row, col)];
        covered.map(|entry| entry.map(|(i, pos)| (&self.slots[i], pos)))
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, idx: usize) -> &Slot {
        &self.slots[idx]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: SlotId) -> Option<(usize, &Slot)> {
        self.by_id.get(&id).map(|&idx| (idx, &self.slots[idx]))
    }

    /// The crossings of the slot at `idx`, ordered by position within it.
    pub fn crossings(&self, idx: usize) -> &[Crossing] {
        &self.crossings[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, SlotId, SlotMap};
    use crate::grid::{Grid, GridError};

    #[test]
    fn slot_ids_parse_and_print() {
        let id: SlotId = "1A".parse().unwrap();
        assert_eq!(1, id.number);
        assert_eq!(Direction::Across, id.direction);
        assert_eq!("1A", id.to_string());

        let id: SlotId = "12d".parse().unwrap();
        assert_eq!("12D", id.to_string());

        assert!("".parse::<SlotId>().is_err());
        assert!("A1".parse::<SlotId>().is_err());
        assert!("7X".parse::<SlotId>().is_err());
    }

    #[test]
    fn open_grid_derives_ten_slots() {
        let slots = SlotMap::build(&Grid::blank()).unwrap();

        assert_eq!(10, slots.len());
        let ids: Vec<String> = slots.slots().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(
            vec!["1A", "1D", "2D", "3D", "4D", "5D", "6A", "7A", "8A", "9A"],
            ids
        );
        let (_, one_across) = slots.get("1A".parse().unwrap()).unwrap();
        assert_eq!(5, one_across.len);
        assert_eq!((0, 0), (one_across.row, one_across.col));
    }

    #[test]
    fn blocked_grid_numbers_like_a_newspaper() {
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
        let slots = SlotMap::build(&grid).unwrap();

        assert_eq!(10, slots.len());
        let ids: Vec<String> = slots.slots().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(
            vec!["1A", "1D", "2D", "3D", "4D", "5A", "5D", "6A", "7A", "8A"],
            ids
        );

        let (_, first) = slots.get("1A".parse().unwrap()).unwrap();
        assert_eq!(4, first.len);
        assert_eq!((0, 1), (first.row, first.col));
        let (_, five_down) = slots.get("5D".parse().unwrap()).unwrap();
        assert_eq!(4, five_down.len);
        assert_eq!((1, 0), (five_down.row, five_down.col));
        let (_, last) = slots.get("8A".parse().unwrap()).unwrap();
        assert_eq!(4, last.len);
        assert_eq!((4, 0), (last.row, last.col));
    }

    #[test]
    fn crossings_pair_across_and_down() {
        let slots = SlotMap::build(&Grid::blank()).unwrap();

        let (one_across, _) = slots.get("1A".parse().unwrap()).unwrap();
        let crossings = slots.crossings(one_across);
        assert_eq!(5, crossings.len());
        for (pos, crossing) in crossings.iter().enumerate() {
            assert_eq!(pos, crossing.at);
            // Every crossing of a row-0 across slot meets a down slot at its
            // first cell.
            assert_eq!(0, crossing.other_at);
            assert_eq!(
                Direction::Down,
                slots.slot(crossing.other).direction
            );
        }
    }

    #[test]
    fn cell_index_names_both_covering_slots() {
        let slots = SlotMap::build(&Grid::blank()).unwrap();

        let [across, down] = slots.slots_at(2, 3);
        let (across, across_pos) = across.unwrap();
        let (down, down_pos) = down.unwrap();
        assert_eq!("7A", across.id.to_string());
        assert_eq!(3, across_pos);
        assert_eq!("4D", down.id.to_string());
        assert_eq!(2, down_pos);

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
        let slots = SlotMap::build(&grid).unwrap();
        let [across, down] = slots.slots_at(0, 0);
        assert!(across.is_none());
        assert!(down.is_none());
    }

    #[test]
    fn single_cell_islands_are_rejected() {
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
        assert!(matches!(
            SlotMap::build(&grid),
            Err(GridError::SingleCellRun { row: 0, col: 0 })
        ));
    }

    #[test]
    fn length_one_run_in_one_direction_is_rejected() {
        // Top-left cell has a 5-long down run but a 1-long across run.
        let grid = Grid::parse(
            "
            .#...
            .....
            .....
            .....
            .....
            ",
        )
        .unwrap();
        assert!(matches!(
            SlotMap::build(&grid),
            Err(GridError::SingleCellRun { .. })
        ));
    }

    #[test]
    fn all_block_rows_are_fine_if_runs_stay_legal() {
        let grid = Grid::parse(
            "
            ..#..
            ..#..
            #####
            ..#..
            ..#..
            ",
        )
        .unwrap();
        let slots = SlotMap::build(&grid).unwrap();

        assert_eq!(16, slots.len());
        assert!(slots.slots().iter().all(|s| s.len == 2));
    }
}
