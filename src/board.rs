//! The local player's fleet: which cells each of its ships occupies.

use std::collections::BTreeMap;

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::cellset::{Cell, Grid};
use crate::config::{GRID_SIZE, RANDOMIZE_ATTEMPTS, SHIPS};
use crate::error::PlacementError;
use crate::ship::{Orientation, Placement, ShipId, ShipType};

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
    pub placements: Vec<Placement>,
    pub occupied: Grid,
    pub fully_placed: bool,
    pub orientation: Orientation,
}

/// Ship placements for one player. No two distinct ships ever share a cell.
#[derive(Debug, Clone)]
pub struct BoardModel {
    catalog: Vec<ShipType>,
    placements: BTreeMap<ShipId, Placement>,
    orientation: Orientation,
}

impl Default for BoardModel {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardModel {
    /// Empty board using the standard four-ship catalog.
    pub fn new() -> Self {
        Self::with_catalog(SHIPS.to_vec())
    }

    pub fn with_catalog(catalog: Vec<ShipType>) -> Self {
        Self {
            catalog,
            placements: BTreeMap::new(),
            orientation: Orientation::Horizontal,
        }
    }

    pub fn catalog(&self) -> &[ShipType] {
        &self.catalog
    }

    pub fn ship_type(&self, id: &str) -> Option<&ShipType> {
        self.catalog.iter().find(|t| t.id() == id)
    }

    pub fn placement(&self, id: &str) -> Option<&Placement> {
        self.placements.get(id)
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.placements.values()
    }

    /// Union of every placed ship's cells.
    pub fn occupied(&self) -> Grid {
        self.placements
            .values()
            .fold(Grid::new(), |acc, p| acc | p.cells())
    }

    pub fn ship_at(&self, cell: Cell) -> Option<ShipId> {
        self.placements
            .values()
            .find(|p| p.covers(cell))
            .map(|p| p.ship())
    }

    pub fn is_fully_placed(&self) -> bool {
        self.catalog
            .iter()
            .all(|t| self.placements.contains_key(t.id()))
    }

    /// Validate a placement without committing it. Overlap with the ship's
    /// own current cells is allowed so a placed ship can be nudged around.
    pub fn can_place(
        &self,
        id: &str,
        origin: Cell,
        orientation: Orientation,
    ) -> Result<Placement, PlacementError> {
        let ship = self
            .ship_type(id)
            .ok_or_else(|| PlacementError::UnknownShip(id.to_string()))?;
        let candidate = Placement::new(ship, origin, orientation)?;
        let clash = self
            .placements
            .values()
            .filter(|p| p.ship() != ship.id())
            .find(|p| p.cells().intersects(&candidate.cells()));
        match clash {
            Some(other) => Err(PlacementError::Overlaps {
                ship: ship.id(),
                other: other.ship(),
            }),
            None => Ok(candidate),
        }
    }

    /// Place (or reposition) a ship. On failure the board is untouched.
    pub fn place(
        &mut self,
        id: &str,
        origin: Cell,
        orientation: Orientation,
    ) -> Result<(), PlacementError> {
        let placement = self.can_place(id, origin, orientation)?;
        self.placements.insert(placement.ship(), placement);
        Ok(())
    }

    /// Remove whichever ship covers `cell`, returning its id.
    pub fn remove_at(&mut self, cell: Cell) -> Option<ShipId> {
        let id = self.ship_at(cell)?;
        self.placements.remove(id);
        Some(id)
    }

    pub fn reset(&mut self) {
        self.placements.clear();
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn toggle_orientation(&mut self) -> Orientation {
        self.orientation = self.orientation.toggled();
        self.orientation
    }

    /// Candidate cells for `id` at `origin` using the editor's current orientation.
    pub fn preview(&self, id: &str, origin: Cell) -> Result<Placement, PlacementError> {
        self.can_place(id, origin, self.orientation)
    }

    /// Clear the board and place every catalog ship at random.
    ///
    /// Each ship gets [`RANDOMIZE_ATTEMPTS`] draws. If one runs out, the whole
    /// board is cleared and the procedure starts over from a seed derived from
    /// the current generator.
    pub fn randomize(&mut self, seed: Option<u64>) -> Result<(), PlacementError> {
        let mut rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        self.randomize_with(&mut rng)
    }

    pub fn randomize_with<R: Rng>(&mut self, rng: &mut R) -> Result<(), PlacementError> {
        self.check_catalog_fits()?;
        let mut attempt_rng = SmallRng::seed_from_u64(rng.random());
        let mut restarts = 0u32;
        while !self.try_fill(&mut attempt_rng) {
            restarts += 1;
            debug!("random placement exhausted its budget, restart #{}", restarts);
            attempt_rng = SmallRng::seed_from_u64(attempt_rng.random());
        }
        Ok(())
    }

    fn try_fill(&mut self, rng: &mut SmallRng) -> bool {
        self.reset();
        for idx in 0..self.catalog.len() {
            let ship = self.catalog[idx];
            let placed = (0..RANDOMIZE_ATTEMPTS).any(|_| {
                let (origin, orientation) = random_origin(rng, ship.length());
                self.place(ship.id(), origin, orientation).is_ok()
            });
            if !placed {
                self.reset();
                return false;
            }
        }
        true
    }

    fn check_catalog_fits(&self) -> Result<(), PlacementError> {
        if self.catalog.iter().any(|t| t.length() == 0 || t.length() > GRID_SIZE) {
            return Err(PlacementError::CatalogTooLarge("a ship is empty or longer than the grid"));
        }
        let total: usize = self.catalog.iter().map(|t| t.length()).sum();
        if total > GRID_SIZE * GRID_SIZE {
            return Err(PlacementError::CatalogTooLarge("fleet has more cells than the grid"));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            placements: self.placements.values().copied().collect(),
            occupied: self.occupied(),
            fully_placed: self.is_fully_placed(),
            orientation: self.orientation,
        }
    }
}

fn random_origin<R: Rng>(rng: &mut R, length: usize) -> (Cell, Orientation) {
    let orientation = if rng.random() {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    };
    let span = GRID_SIZE - length;
    let origin = match orientation {
        Orientation::Horizontal => Cell::new(rng.random_range(0..=span), rng.random_range(0..GRID_SIZE)),
        Orientation::Vertical => Cell::new(rng.random_range(0..GRID_SIZE), rng.random_range(0..=span)),
    };
    (origin, orientation)
}
