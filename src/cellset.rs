//! A fixed-size set of grid cells packed into an unsigned integer.
//!
//! `CellSet<T, N>` stores membership for an `N×N` grid in the bits of `T`,
//! indexed by `(col, row)`. Ship footprints, per-ship damage and the hit/miss
//! overlays are all cell sets, so overlap and "fully covered" checks are a
//! single bitwise operation.

use core::ops::{BitAnd, BitOr, Sub};
use core::{fmt, mem};

use num_traits::{PrimInt, Unsigned, Zero};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::config::GRID_SIZE;

/// A grid coordinate, column first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Cell {
    pub col: usize,
    pub row: usize,
}

impl Cell {
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }

    /// True when both coordinates fall inside a `size×size` grid.
    pub fn in_bounds(&self, size: usize) -> bool {
        self.col < size && self.row < size
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CellSetError {
    #[error("cell ({col},{row}) is outside the {size}x{size} grid")]
    OutOfBounds { col: usize, row: usize, size: usize },
}

/// Cell set sized for the game grid.
pub type Grid = CellSet<u128, GRID_SIZE>;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CellSet<T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    bits: T,
}

impl<T, const N: usize> CellSet<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    const CELLS: usize = N * N;
    const FITS: () = assert!(N * N <= mem::size_of::<T>() * 8, "grid does not fit in T");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::FITS;
        Self { bits: T::zero() }
    }

    /// Build a set from cells, failing on the first out-of-bounds one.
    pub fn from_cells<I>(cells: I) -> Result<Self, CellSetError>
    where
        I: IntoIterator<Item = Cell>,
    {
        let mut set = Self::new();
        for cell in cells {
            set.insert(cell)?;
        }
        Ok(set)
    }

    #[inline]
    fn index(cell: Cell) -> Result<usize, CellSetError> {
        if cell.in_bounds(N) {
            Ok(cell.row * N + cell.col)
        } else {
            Err(CellSetError::OutOfBounds {
                col: cell.col,
                row: cell.row,
                size: N,
            })
        }
    }

    /// Out-of-bounds cells are never members.
    pub fn contains(&self, cell: Cell) -> bool {
        match Self::index(cell) {
            Ok(idx) => ((self.bits >> idx) & T::one()) != T::zero(),
            Err(_) => false,
        }
    }

    /// Add a cell. Returns `true` if it was not already present.
    pub fn insert(&mut self, cell: Cell) -> Result<bool, CellSetError> {
        let idx = Self::index(cell)?;
        let bit = T::one() << idx;
        let fresh = (self.bits & bit).is_zero();
        self.bits = self.bits | bit;
        Ok(fresh)
    }

    /// Remove a cell. Returns `true` if it was present.
    pub fn remove(&mut self, cell: Cell) -> bool {
        match Self::index(cell) {
            Ok(idx) => {
                let bit = T::one() << idx;
                let present = !(self.bits & bit).is_zero();
                self.bits = self.bits & !bit;
                present
            }
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_zero()
    }

    pub fn clear(&mut self) {
        self.bits = T::zero();
    }

    pub fn is_superset(&self, other: &Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !(self.bits & other.bits).is_zero()
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> Cells<'_, T, N> {
        Cells { set: self, idx: 0 }
    }
}

impl<T, const N: usize> Default for CellSet<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> BitOr for CellSet<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl<T, const N: usize> BitAnd for CellSet<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self {
            bits: self.bits & rhs.bits,
        }
    }
}

impl<T, const N: usize> Sub for CellSet<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            bits: self.bits & !rhs.bits,
        }
    }
}

impl<T, const N: usize> fmt::Debug for CellSet<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, const N: usize> fmt::Display for CellSet<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..N {
            for col in 0..N {
                let mark = if self.contains(Cell::new(col, row)) { '■' } else { '□' };
                write!(f, "{} ", mark)?;
            }
            if row + 1 < N {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl<T, const N: usize> Serialize for CellSet<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<T, const N: usize> FromIterator<Cell> for CellSet<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    /// Out-of-bounds cells are skipped.
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        let mut set = Self::new();
        for cell in iter {
            let _ = set.insert(cell);
        }
        set
    }
}

/// Iterator over the members of a [`CellSet`].
#[derive(Clone, Copy)]
pub struct Cells<'a, T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    set: &'a CellSet<T, N>,
    idx: usize,
}

impl<'a, T, const N: usize> Iterator for Cells<'a, T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        while self.idx < CellSet::<T, N>::CELLS {
            let idx = self.idx;
            self.idx += 1;
            if ((self.set.bits >> idx) & T::one()) != T::zero() {
                return Some(Cell::new(idx % N, idx / N));
            }
        }
        None
    }
}
