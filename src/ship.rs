//! Ship types and their placements on the grid.

use core::fmt;
use core::str::FromStr;

use serde::Serialize;

use crate::cellset::{Cell, Grid};
use crate::config::GRID_SIZE;
use crate::error::PlacementError;

/// Stable identifier of a ship type within a catalog.
pub type ShipId = &'static str;

/// Render colour as an RGB triple.
pub type Rgb = (u8, u8, u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

impl FromStr for Orientation {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h" | "horizontal" => Ok(Orientation::Horizontal),
            "v" | "vertical" => Ok(Orientation::Vertical),
            _ => Err(PlacementError::UnknownOrientation(s.to_string())),
        }
    }
}

/// Immutable description of one kind of ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShipType {
    id: ShipId,
    name: &'static str,
    length: usize,
    color: Rgb,
}

impl ShipType {
    pub const fn new(id: ShipId, name: &'static str, length: usize, color: Rgb) -> Self {
        Self {
            id,
            name,
            length,
            color,
        }
    }

    pub fn id(&self) -> ShipId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn color(&self) -> Rgb {
        self.color
    }
}

/// A committed ship position. The cell count always equals the ship length
/// and every cell lies inside the grid.
#[derive(Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    ship: ShipId,
    origin: Cell,
    orientation: Orientation,
    cells: Grid,
}

impl Placement {
    /// Lay `ship` out from `origin` along `orientation`.
    pub fn new(ship: &ShipType, origin: Cell, orientation: Orientation) -> Result<Self, PlacementError> {
        let out_of_bounds = || PlacementError::OutOfBounds {
            ship: ship.id(),
            origin,
            orientation,
        };
        let mut cells = Grid::new();
        for i in 0..ship.length() {
            let cell = match orientation {
                Orientation::Horizontal => origin.col.checked_add(i).map(|col| Cell::new(col, origin.row)),
                Orientation::Vertical => origin.row.checked_add(i).map(|row| Cell::new(origin.col, row)),
            };
            match cell {
                Some(cell) if cell.in_bounds(GRID_SIZE) => {
                    cells.insert(cell).map_err(|_| out_of_bounds())?;
                }
                _ => return Err(out_of_bounds()),
            }
        }
        Ok(Self {
            ship: ship.id(),
            origin,
            orientation,
            cells,
        })
    }

    pub fn ship(&self) -> ShipId {
        self.ship
    }

    pub fn origin(&self) -> Cell {
        self.origin
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn cells(&self) -> Grid {
        self.cells
    }

    pub fn covers(&self, cell: Cell) -> bool {
        self.cells.contains(cell)
    }
}

impl fmt::Debug for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Placement {{ ship: {:?}, origin: ({}), orientation: {:?}, cells: {} }}",
            self.ship,
            self.origin,
            self.orientation,
            self.cells.len()
        )
    }
}
