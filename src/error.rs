//! Errors reported synchronously to callers of the board and shot engine.

use thiserror::Error;

use crate::cellset::Cell;
use crate::ship::{Orientation, ShipId};

/// Why a placement request was refused. The board is never partially mutated
/// when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("no ship named {0:?} in the catalog")]
    UnknownShip(String),
    #[error("unknown orientation {0:?} (expected h or v)")]
    UnknownOrientation(String),
    #[error("{ship} at ({origin}) {orientation:?} does not fit on the grid")]
    OutOfBounds {
        ship: ShipId,
        origin: Cell,
        orientation: Orientation,
    },
    #[error("{ship} would overlap {other}")]
    Overlaps { ship: ShipId, other: ShipId },
    #[error("catalog cannot fit on the grid: {0}")]
    CatalogTooLarge(&'static str),
}

/// Refusals from the shot engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShotError {
    #[error("target ({0}) is outside the grid")]
    OutOfBounds(Cell),
    #[error("the match is frozen")]
    Frozen,
}
