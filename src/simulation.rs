//! Headless matches between several peers on an in-memory network.

use std::net::{IpAddr, Ipv4Addr};

use anyhow::Context;
use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::board::BoardModel;
use crate::config::SessionConfig;
use crate::engine::Score;
use crate::session::{Intent, Session};
use crate::ship::ShipId;
use crate::transport::in_memory::InMemoryNetwork;

const SETTLE_FRAMES: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct PeerReport {
    pub address: IpAddr,
    pub game_over: bool,
    pub sunk: Vec<ShipId>,
    pub defeated_peers: Vec<IpAddr>,
    pub score: Score,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub seed: u64,
    pub frames: u64,
    pub simulated_secs: f64,
    pub survivors: Vec<IpAddr>,
    pub peers: Vec<PeerReport>,
}

/// Address of the `index`th simulated peer.
pub fn peer_address(index: usize) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, (index / 250) as u8, (index % 250 + 1) as u8))
}

/// Run `peers` auto-firing peers with random fleets, `dt` simulated seconds
/// per frame, until at most one is still afloat or `max_frames` pass.
pub fn simulate(peers: usize, seed: u64, dt: f32, max_frames: u64) -> anyhow::Result<SimReport> {
    let network = InMemoryNetwork::new();
    let config = SessionConfig::default();
    let mut sessions = Vec::with_capacity(peers);
    for i in 0..peers {
        let peer_seed = seed.wrapping_add(i as u64);
        let mut board = BoardModel::new();
        board
            .randomize(Some(peer_seed))
            .with_context(|| format!("placing fleet for peer {}", i))?;
        let rng = SmallRng::seed_from_u64(peer_seed.rotate_left(32));
        let mut session = Session::on_network(&network, peer_address(i), &config, board, rng);
        session.apply(Intent::ToggleAutoFire)?;
        session.start();
        sessions.push(session);
    }

    let afloat = |sessions: &[Session]| sessions.iter().filter(|s| !s.engine().is_game_over()).count();
    let mut frames = 0;
    while frames < max_frames && afloat(&sessions) > 1 {
        for session in sessions.iter_mut() {
            session.poll_once(dt);
        }
        frames += 1;
    }
    info!("simulation stopped after {} frames, {} afloat", frames, afloat(&sessions));

    // Let notices and acks already in flight land before reporting.
    for _ in 0..SETTLE_FRAMES {
        for session in sessions.iter_mut() {
            session.poll_once(0.0);
        }
    }

    for session in sessions.iter_mut() {
        session.close();
    }
    let survivors = sessions
        .iter()
        .filter(|s| !s.engine().is_game_over())
        .map(Session::local_ip)
        .collect();
    let peers = sessions
        .iter()
        .map(|s| {
            let engine = s.engine();
            PeerReport {
                address: s.local_ip(),
                game_over: engine.is_game_over(),
                sunk: engine.sunk().collect(),
                defeated_peers: engine.defeated_peers().collect(),
                score: engine.score(),
            }
        })
        .collect();
    Ok(SimReport {
        seed,
        frames,
        simulated_secs: frames as f64 * f64::from(dt),
        survivors,
        peers,
    })
}
