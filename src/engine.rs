//! Shot resolution: the countdown that fires volleys, adjudication of
//! incoming shots against the local board, and score accounting.
//!
//! The engine performs no I/O. Every operation that would touch the network
//! returns [`Outbound`] commands for the session to dispatch, which keeps the
//! state machine deterministic under a seeded generator.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::Rng;
use serde::Serialize;

use crate::board::BoardModel;
use crate::cellset::{Cell, Grid};
use crate::config::{GRID_SIZE, MIN_ACTIVE_PLAYERS};
use crate::error::ShotError;
use crate::protocol::AckMessage;
use crate::registry::Registry;
use crate::ship::ShipId;

/// Network work requested by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outbound {
    Shot { to: IpAddr, cell: Cell },
    Ack { to: IpAddr, ack: AckMessage },
    Lost { to: IpAddr },
}

/// Hit and miss overlays for one grid. A cell is never in both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShotRecord {
    misses: Grid,
    hits: Grid,
}

impl ShotRecord {
    /// Ignored for cells already recorded as hits.
    pub fn record_miss(&mut self, cell: Cell) -> bool {
        if self.hits.contains(cell) {
            return false;
        }
        self.misses.insert(cell).unwrap_or(false)
    }

    pub fn record_hit(&mut self, cell: Cell) -> bool {
        self.misses.remove(cell);
        self.hits.insert(cell).unwrap_or(false)
    }

    pub fn misses(&self) -> Grid {
        self.misses
    }

    pub fn hits(&self) -> Grid {
        self.hits
    }

    pub fn is_hit(&self, cell: Cell) -> bool {
        self.hits.contains(cell)
    }

    pub fn is_miss(&self, cell: Cell) -> bool {
        self.misses.contains(cell)
    }
}

/// What the firer knows about its latest volley at one peer. There is no miss
/// acknowledgment on the wire, so a volley resolves to a miss only when the
/// next one goes out without an ack having arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotOutcome {
    Pending,
    ConfirmedMiss,
    ConfirmedHit,
    ConfirmedSunk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Fewer than two active participants; the countdown is frozen.
    AwaitingPlayers,
    /// Counting down with no target chosen.
    Armed,
    /// Counting down toward a manually chosen target.
    TargetPending,
    /// Counting down with auto-fire on.
    AutoTargeting,
    ExitPending,
    GameOver,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Score {
    pub shots_fired: u32,
    pub hits_taken: u32,
    pub hits_by_peer: BTreeMap<IpAddr, u32>,
    pub destroyed_by_peer: BTreeMap<IpAddr, u32>,
    pub distinct_peers_hit: u32,
    pub final_score: i64,
}

/// Render-ready state of the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotSnapshot {
    pub phase: Phase,
    pub countdown_remaining: f32,
    pub selected_target: Option<Cell>,
    pub auto_fire: bool,
    pub last_volley: Option<Cell>,
    pub outgoing: ShotRecord,
    pub incoming: ShotRecord,
    pub sunk: Vec<ShipId>,
    pub outcomes: BTreeMap<IpAddr, ShotOutcome>,
    pub defeated_peers: Vec<IpAddr>,
    pub game_over: bool,
    pub score: Score,
}

pub struct ShotEngine {
    countdown_total: f32,
    countdown: f32,
    target: Option<Cell>,
    auto_fire: bool,
    last_volley: Option<Cell>,
    shots_fired: u32,
    hits_taken: u32,
    hits_by_peer: BTreeMap<IpAddr, u32>,
    destroyed_by_peer: BTreeMap<IpAddr, u32>,
    damage: BTreeMap<ShipId, Grid>,
    sunk: BTreeSet<ShipId>,
    /// Hits already acknowledged, per attacker.
    acked_hits: BTreeSet<(IpAddr, Cell)>,
    outgoing: ShotRecord,
    incoming: ShotRecord,
    outcomes: BTreeMap<IpAddr, ShotOutcome>,
    defeated_peers: BTreeSet<IpAddr>,
    game_over: bool,
    exit_pending: bool,
    rng: SmallRng,
}

impl ShotEngine {
    pub fn new(countdown_secs: f32, rng: SmallRng) -> Self {
        Self {
            countdown_total: countdown_secs,
            countdown: countdown_secs,
            target: None,
            auto_fire: false,
            last_volley: None,
            shots_fired: 0,
            hits_taken: 0,
            hits_by_peer: BTreeMap::new(),
            destroyed_by_peer: BTreeMap::new(),
            damage: BTreeMap::new(),
            sunk: BTreeSet::new(),
            acked_hits: BTreeSet::new(),
            outgoing: ShotRecord::default(),
            incoming: ShotRecord::default(),
            outcomes: BTreeMap::new(),
            defeated_peers: BTreeSet::new(),
            game_over: false,
            exit_pending: false,
            rng,
        }
    }

    /// Game over or exit pending: nothing but exit intents are accepted.
    pub fn is_frozen(&self) -> bool {
        self.game_over || self.exit_pending
    }

    fn random_cell(&mut self) -> Cell {
        Cell::new(
            self.rng.random_range(0..GRID_SIZE),
            self.rng.random_range(0..GRID_SIZE),
        )
    }

    /// Advance the countdown by `dt` seconds and fire a volley when it runs
    /// out. The countdown only moves while at least two participants are
    /// active, self included.
    pub fn tick(&mut self, dt: f32, registry: &Registry) -> Vec<Outbound> {
        if self.is_frozen() || registry.active_count() < MIN_ACTIVE_PLAYERS {
            return Vec::new();
        }
        self.countdown -= dt;
        if self.countdown > 0.0 {
            return Vec::new();
        }

        if self.target.is_none() && self.auto_fire {
            self.target = Some(self.random_cell());
        }
        let out = match self.target.take() {
            Some(cell) => self.fire(cell, registry),
            None => Vec::new(),
        };

        self.countdown = self.countdown_total;
        if self.auto_fire {
            self.target = Some(self.random_cell());
        }
        out
    }

    fn fire(&mut self, cell: Cell, registry: &Registry) -> Vec<Outbound> {
        for outcome in self.outcomes.values_mut() {
            if *outcome == ShotOutcome::Pending {
                *outcome = ShotOutcome::ConfirmedMiss;
            }
        }
        let out: Vec<Outbound> = registry
            .active_peers()
            .map(|to| Outbound::Shot { to, cell })
            .collect();
        for shot in &out {
            if let Outbound::Shot { to, .. } = shot {
                self.outcomes.insert(*to, ShotOutcome::Pending);
            }
        }
        if out.is_empty() {
            warn!("firing at {} with no active peers", cell);
        }
        self.outgoing.record_miss(cell);
        self.shots_fired += 1;
        self.last_volley = Some(cell);
        info!("volley #{} at {} -> {} peer(s)", self.shots_fired, cell, out.len());
        out
    }

    /// Adjudicate a shot fired at the local board by `from`.
    ///
    /// A miss is recorded silently. A hit is acknowledged with `hit`, and with
    /// `destroyed` as well when it sinks a ship; the last sinking also ends the
    /// game. Each attacker is acknowledged at most once per cell; a different
    /// attacker landing on an already damaged cell still gets its `hit`.
    pub fn receive_shot(
        &mut self,
        from: IpAddr,
        cell: Cell,
        board: &BoardModel,
        registry: &Registry,
    ) -> Result<Vec<Outbound>, ShotError> {
        if !cell.in_bounds(GRID_SIZE) {
            return Err(ShotError::OutOfBounds(cell));
        }
        if self.is_frozen() {
            return Err(ShotError::Frozen);
        }

        let Some(ship) = board.ship_at(cell) else {
            self.incoming.record_miss(cell);
            debug!("{} missed at {}", from, cell);
            return Ok(Vec::new());
        };
        if !self.acked_hits.insert((from, cell)) {
            debug!("duplicate shot from {} at {}, ignoring", from, cell);
            return Ok(Vec::new());
        }

        self.incoming.record_hit(cell);
        self.hits_taken += 1;
        let damage = self.damage.entry(ship).or_default();
        // In bounds was checked above.
        let _ = damage.insert(cell);
        let damage = *damage;
        info!("{} hit {} at {}", from, ship, cell);

        let mut out = vec![Outbound::Ack {
            to: from,
            ack: AckMessage::Hit,
        }];
        let sunk_now = board
            .placement(ship)
            .is_some_and(|p| damage.is_superset(&p.cells()));
        if sunk_now && self.sunk.insert(ship) {
            info!("{} sunk by {}", ship, from);
            out.push(Outbound::Ack {
                to: from,
                ack: AckMessage::Destroyed,
            });
            out.extend(self.evaluate_game_over(board, registry));
        }
        Ok(out)
    }

    /// Enter game over once every placed ship is sunk, notifying each active
    /// peer. Later calls return nothing.
    pub fn evaluate_game_over(&mut self, board: &BoardModel, registry: &Registry) -> Vec<Outbound> {
        if self.game_over {
            return Vec::new();
        }
        let mut placed = board.placements().peekable();
        if placed.peek().is_none() {
            return Vec::new();
        }
        if !placed.all(|p| self.sunk.contains(p.ship())) {
            return Vec::new();
        }
        self.game_over = true;
        self.target = None;
        info!("all ships sunk, game over");
        registry.active_peers().map(|to| Outbound::Lost { to }).collect()
    }

    /// Credit an acknowledgment from `from` to the score tables.
    pub fn receive_ack(&mut self, from: IpAddr, ack: AckMessage) -> Result<(), ShotError> {
        if self.is_frozen() {
            return Err(ShotError::Frozen);
        }
        match ack {
            AckMessage::Hit => {
                *self.hits_by_peer.entry(from).or_insert(0) += 1;
                let outcome = self.outcomes.entry(from).or_insert(ShotOutcome::ConfirmedHit);
                if *outcome != ShotOutcome::ConfirmedSunk {
                    *outcome = ShotOutcome::ConfirmedHit;
                }
            }
            AckMessage::Destroyed => {
                *self.destroyed_by_peer.entry(from).or_insert(0) += 1;
                self.outcomes.insert(from, ShotOutcome::ConfirmedSunk);
            }
        }
        debug!("{} from {}", ack, from);
        Ok(())
    }

    /// Record that `from` reported losing its whole fleet.
    pub fn record_lost(&mut self, from: IpAddr) -> bool {
        self.defeated_peers.insert(from)
    }

    pub fn select_target(&mut self, cell: Cell) -> Result<(), ShotError> {
        if !cell.in_bounds(GRID_SIZE) {
            return Err(ShotError::OutOfBounds(cell));
        }
        if self.is_frozen() {
            return Err(ShotError::Frozen);
        }
        self.target = Some(cell);
        Ok(())
    }

    /// Flip auto-fire. Switching it on with no target pre-selects one.
    pub fn toggle_auto_fire(&mut self) -> Result<bool, ShotError> {
        if self.is_frozen() {
            return Err(ShotError::Frozen);
        }
        self.auto_fire = !self.auto_fire;
        if self.auto_fire && self.target.is_none() {
            self.target = Some(self.random_cell());
        }
        Ok(self.auto_fire)
    }

    pub fn request_exit(&mut self) {
        self.exit_pending = true;
    }

    pub fn cancel_exit(&mut self) {
        self.exit_pending = false;
    }

    pub fn exit_pending(&self) -> bool {
        self.exit_pending
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn countdown_remaining(&self) -> f32 {
        self.countdown
    }

    pub fn selected_target(&self) -> Option<Cell> {
        self.target
    }

    pub fn auto_fire(&self) -> bool {
        self.auto_fire
    }

    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    pub fn hits_taken(&self) -> u32 {
        self.hits_taken
    }

    pub fn outgoing(&self) -> &ShotRecord {
        &self.outgoing
    }

    pub fn incoming(&self) -> &ShotRecord {
        &self.incoming
    }

    pub fn is_sunk(&self, ship: &str) -> bool {
        self.sunk.contains(ship)
    }

    pub fn sunk(&self) -> impl Iterator<Item = ShipId> + '_ {
        self.sunk.iter().copied()
    }

    pub fn outcome(&self, peer: IpAddr) -> Option<ShotOutcome> {
        self.outcomes.get(&peer).copied()
    }

    pub fn defeated_peers(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.defeated_peers.iter().copied()
    }

    pub fn phase(&self, registry: &Registry) -> Phase {
        if self.game_over {
            Phase::GameOver
        } else if self.exit_pending {
            Phase::ExitPending
        } else if registry.active_count() < MIN_ACTIVE_PLAYERS {
            Phase::AwaitingPlayers
        } else if self.auto_fire {
            Phase::AutoTargeting
        } else if self.target.is_some() {
            Phase::TargetPending
        } else {
            Phase::Armed
        }
    }

    /// Distinct peers hit minus hits taken, computed from the current tallies.
    pub fn score(&self) -> Score {
        let distinct_peers_hit = self.hits_by_peer.values().filter(|n| **n > 0).count() as u32;
        Score {
            shots_fired: self.shots_fired,
            hits_taken: self.hits_taken,
            hits_by_peer: self.hits_by_peer.clone(),
            destroyed_by_peer: self.destroyed_by_peer.clone(),
            distinct_peers_hit,
            final_score: i64::from(distinct_peers_hit) - i64::from(self.hits_taken),
        }
    }

    pub fn snapshot(&self, registry: &Registry) -> ShotSnapshot {
        ShotSnapshot {
            phase: self.phase(registry),
            countdown_remaining: self.countdown,
            selected_target: self.target,
            auto_fire: self.auto_fire,
            last_volley: self.last_volley,
            outgoing: self.outgoing,
            incoming: self.incoming,
            sunk: self.sunk.iter().copied().collect(),
            outcomes: self.outcomes.clone(),
            defeated_peers: self.defeated_peers.iter().copied().collect(),
            game_over: self.game_over,
            score: self.score(),
        }
    }
}
