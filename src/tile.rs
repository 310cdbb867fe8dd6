//! Tile state (§4.2): a worker's slice of the image, plus the neighbour
//! table that tells the boundary query engine who to talk to.

use crate::direction::{Direction, Rank, ABSENT};
use crate::matrix::Matrix;

/// Eight neighbour slots, indexed by [`Direction`]. `None` means the tile
/// edge touches the image boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeighbourTable([Option<Rank>; 8]);

impl NeighbourTable {
    pub fn new() -> Self {
        NeighbourTable([None; 8])
    }

    pub fn set(&mut self, direction: Direction, rank: Option<Rank>) {
        self.0[direction.index()] = rank;
    }

    pub fn get(&self, direction: Direction) -> Option<Rank> {
        self.0[direction.index()]
    }

    /// Iterates over the directions that have an actual neighbour.
    pub fn existing(&self) -> impl Iterator<Item = (Direction, Rank)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |d| self.get(d).map(|rank| (d, rank)))
    }

    /// Encodes a slot as the wire representation: the rank, or `-1` if
    /// absent.
    pub fn wire_value(&self, direction: Direction) -> Rank {
        self.get(direction).unwrap_or(ABSENT)
    }

    pub fn from_wire(direction: Direction, value: Rank) -> Option<Rank> {
        if value == ABSENT {
            None
        } else {
            Some(value)
        }
    }
}

/// A worker's rectangular slice of the image (§3 Tile).
pub struct Tile {
    rows: usize,
    cols: usize,
    observed: Matrix<i8>,
    current: Matrix<i8>,
    neighbours: NeighbourTable,
}

impl Tile {
    pub fn new(rows: usize, cols: usize, observed: Matrix<i8>, neighbours: NeighbourTable) -> Self {
        debug_assert_eq!(observed.rows, rows);
        debug_assert_eq!(observed.cols, cols);
        let current = observed.clone();
        Tile {
            rows,
            cols,
            observed,
            current,
            neighbours,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn observed(&self) -> &Matrix<i8> {
        &self.observed
    }

    pub fn current(&self) -> &Matrix<i8> {
        &self.current
    }

    pub fn neighbours(&self) -> &NeighbourTable {
        &self.neighbours
    }

    /// Negates `current[r, c]`. The only way `current` may be mutated.
    pub fn flip(&mut self, r: usize, c: usize) {
        self.current[(r, c)] = -self.current[(r, c)];
    }

    /// Sum of `current[i, j]` over the 3x3 window around `(center_row,
    /// center_col)`, excluding the center and anything outside tile bounds
    /// (§4.2, §4.3, §4.4 all reduce to this one computation).
    pub fn window_sum(&self, center_row: isize, center_col: isize) -> i32 {
        let mut sum = 0_i32;
        for dr in -1..=1_isize {
            for dc in -1..=1_isize {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let r = center_row + dr;
                let c = center_col + dc;
                if self.current.in_bounds(r, c) {
                    sum += self.current[(r as usize, c as usize)] as i32;
                }
            }
        }
        sum
    }
}
