//! The session context and its control loop.
//!
//! A [`Session`] owns every piece of per-process state: the registry, the
//! local board, the shot engine and both channels. One call to
//! [`Session::poll_once`] is one loop iteration: at most one discovery
//! datagram, at most one acknowledgment, then one engine tick.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};

use crate::board::{BoardModel, BoardSnapshot};
use crate::cellset::Cell;
use crate::config::{SessionConfig, ROSTER_JOIN_TIMEOUT};
use crate::discovery::{Discovery, DiscoveryEvent};
use crate::engine::{Outbound, ShotEngine, ShotSnapshot};
use crate::error::ShotError;
use crate::protocol::AckMessage;
use crate::registry::{Participant, Registry};
use crate::roster::{RosterPublisher, RosterView};
use crate::transport::in_memory::InMemoryNetwork;
use crate::transport::tcp::TcpAckChannel;
use crate::transport::udp::{detect_local_ip, UdpTransport};
use crate::transport::AckChannel;

/// User intents accepted once the match is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    SelectTarget(Cell),
    ToggleAutoFire,
    RequestExit,
    CancelExit,
    ConfirmExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub local: IpAddr,
    pub participants: Vec<Participant>,
    pub board: BoardSnapshot,
    pub shots: ShotSnapshot,
}

pub struct Session {
    registry: Registry,
    board: BoardModel,
    engine: ShotEngine,
    discovery: Discovery,
    acks: Box<dyn AckChannel>,
    roster: Option<RosterPublisher>,
    roster_view: Option<RosterView>,
    closed: bool,
}

impl Session {
    pub fn new(
        local_ip: IpAddr,
        board: BoardModel,
        engine: ShotEngine,
        discovery: Discovery,
        acks: Box<dyn AckChannel>,
    ) -> Self {
        Self {
            registry: Registry::new(local_ip),
            board,
            engine,
            discovery,
            acks,
            roster: None,
            roster_view: None,
            closed: false,
        }
    }

    /// Bind real sockets on the configured ports.
    pub fn bind(config: &SessionConfig, board: BoardModel, rng: SmallRng) -> anyhow::Result<Self> {
        let local_ip = resolve_local_ip(config.local_ip, detect_local_ip)?;
        info!("local address {}", local_ip);
        let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let udp = UdpTransport::bind(SocketAddr::new(any, config.udp_port))
            .context("opening discovery channel")?;
        let acks = TcpAckChannel::bind(
            SocketAddr::new(any, config.ack_port),
            config.ack_port,
            config.ack_timeout(),
        )
        .context("opening acknowledgment channel")?;
        let discovery = Discovery::new(Box::new(udp), local_ip, config.udp_port, config.broadcast_addr);
        let engine = ShotEngine::new(config.countdown_secs, rng);
        Ok(Self::new(local_ip, board, engine, discovery, Box::new(acks)))
    }

    /// Attach to an in-memory network as `local_ip`.
    pub fn on_network(
        network: &InMemoryNetwork,
        local_ip: IpAddr,
        config: &SessionConfig,
        board: BoardModel,
        rng: SmallRng,
    ) -> Self {
        let datagrams = network.datagram_endpoint(SocketAddr::new(local_ip, config.udp_port));
        let acks = network.ack_endpoint(SocketAddr::new(local_ip, config.ack_port), config.ack_port);
        let discovery = Discovery::new(Box::new(datagrams), local_ip, config.udp_port, config.broadcast_addr);
        let engine = ShotEngine::new(config.countdown_secs, rng);
        Self::new(local_ip, board, engine, discovery, Box::new(acks))
    }

    pub fn with_roster(mut self, publisher: RosterPublisher) -> Self {
        publisher.publish(self.registry.snapshot());
        self.roster = Some(publisher);
        self
    }

    /// Publish membership to a roster view task that prints each snapshot.
    /// Needs a tokio runtime.
    pub fn spawn_roster_view<F>(&mut self, render: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        let publisher = match self.roster.take() {
            Some(p) => p,
            None => RosterPublisher::new(self.registry.snapshot()).0,
        };
        let view = RosterView::spawn(publisher.subscribe(), self.registry.local_address(), render);
        publisher.publish(self.registry.snapshot());
        self.roster = Some(publisher);
        self.roster_view = Some(view);
    }

    /// Announce ourselves to the broadcast domain.
    pub fn start(&mut self) {
        self.discovery.announce_join();
        self.publish_roster();
    }

    fn publish_roster(&self) {
        if let Some(roster) = &self.roster {
            roster.publish(self.registry.snapshot());
        }
    }

    /// One control-loop iteration, `dt` seconds after the previous one.
    pub fn poll_once(&mut self, dt: f32) {
        if let Some(event) = self.discovery.poll(&mut self.registry) {
            self.handle_discovery(event);
        }
        self.poll_ack();
        let out = self.engine.tick(dt, &self.registry);
        self.dispatch(out);
    }

    fn handle_discovery(&mut self, event: DiscoveryEvent) {
        if event.membership_changed() {
            self.publish_roster();
        }
        match event {
            DiscoveryEvent::Shot { from, cell } => {
                match self.engine.receive_shot(from, cell, &self.board, &self.registry) {
                    Ok(out) => self.dispatch(out),
                    Err(e) => warn!("dropping shot from {} at {}: {}", from, cell, e),
                }
            }
            DiscoveryEvent::Lost(from) => {
                self.engine.record_lost(from);
            }
            DiscoveryEvent::Joined { .. } | DiscoveryEvent::Left { .. } | DiscoveryEvent::Synced { .. } => {}
        }
    }

    fn poll_ack(&mut self) {
        let inbound = match self.acks.try_recv() {
            Ok(Some(inbound)) => inbound,
            Ok(None) => return,
            Err(e) => {
                warn!("acknowledgment channel failed: {:#}", e);
                return;
            }
        };
        let from = inbound.source.ip();
        let result = AckMessage::decode(&inbound.text)
            .map_err(anyhow::Error::from)
            .and_then(|ack| self.engine.receive_ack(from, ack).map_err(anyhow::Error::from));
        if let Err(e) = result {
            warn!("dropping acknowledgment from {}: {}", from, e);
        }
    }

    fn dispatch(&mut self, out: Vec<Outbound>) {
        for cmd in out {
            match cmd {
                Outbound::Shot { to, cell } => {
                    self.discovery.send_shot(to, cell);
                }
                Outbound::Ack { to, ack } => {
                    if let Err(e) = self.acks.send(to, ack) {
                        warn!("could not send {} to {}: {:#}", ack, to, e);
                    }
                }
                Outbound::Lost { to } => {
                    self.discovery.send_lost(to);
                }
            }
        }
    }

    pub fn apply(&mut self, intent: Intent) -> Result<Flow, ShotError> {
        debug!("intent {:?}", intent);
        match intent {
            Intent::SelectTarget(cell) => self.engine.select_target(cell)?,
            Intent::ToggleAutoFire => {
                let on = self.engine.toggle_auto_fire()?;
                info!("auto-fire {}", if on { "on" } else { "off" });
            }
            Intent::RequestExit => self.engine.request_exit(),
            Intent::CancelExit => self.engine.cancel_exit(),
            Intent::ConfirmExit => {
                self.close();
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Broadcast the leave notice. Only the first call sends anything.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.discovery.announce_leave();
    }

    /// Close and stop the roster view, waiting at most
    /// [`ROSTER_JOIN_TIMEOUT`] for it.
    pub async fn shutdown(&mut self) {
        self.close();
        if let Some(view) = self.roster_view.take() {
            view.shutdown(ROSTER_JOIN_TIMEOUT).await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn local_ip(&self) -> IpAddr {
        self.registry.local_address()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn board(&self) -> &BoardModel {
        &self.board
    }

    pub fn engine(&self) -> &ShotEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            local: self.registry.local_address(),
            participants: self.registry.snapshot(),
            board: self.board.snapshot(),
            shots: self.engine.snapshot(&self.registry),
        }
    }
}

/// Our identity on the network: the configured address, else the detected
/// one. A failed detection, or a loopback or unspecified result, is an error.
pub fn resolve_local_ip<F>(configured: Option<IpAddr>, detect: F) -> anyhow::Result<IpAddr>
where
    F: FnOnce() -> anyhow::Result<IpAddr>,
{
    if let Some(ip) = configured {
        return Ok(ip);
    }
    const HINT: &str = "pass --local-ip <addr> or set local_ip in the config file";
    let ip = detect().with_context(|| format!("could not detect the local address; {}", HINT))?;
    if ip.is_loopback() || ip.is_unspecified() {
        anyhow::bail!("detected local address {} cannot identify this peer; {}", ip, HINT);
    }
    Ok(ip)
}

/// The presentation side of a running session.
pub trait Frontend {
    /// Intents gathered since the last frame. Must not block.
    fn poll_intents(&mut self) -> Vec<Intent>;

    fn present(&mut self, snapshot: &SessionSnapshot);

    fn rejected(&mut self, intent: Intent, err: ShotError);
}

/// Drive `session` at `frame` intervals until the frontend confirms exit or
/// the process is interrupted, then tear it down.
pub async fn run<F: Frontend>(session: &mut Session, frontend: &mut F, frame: Duration) -> anyhow::Result<()> {
    session.start();
    let mut interval = tokio::time::interval(frame);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut signals = true;
    let mut last = Instant::now();

    'frames: loop {
        tokio::select! {
            _ = interval.tick() => {}
            res = &mut ctrl_c, if signals => match res {
                Ok(()) => {
                    info!("interrupted, leaving session");
                    break 'frames;
                }
                Err(e) => {
                    warn!("cannot listen for ctrl-c: {}", e);
                    signals = false;
                }
            },
        }
        let now = Instant::now();
        session.poll_once(now.duration_since(last).as_secs_f32());
        last = now;

        for intent in frontend.poll_intents() {
            match session.apply(intent) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break 'frames,
                Err(e) => frontend.rejected(intent, e),
            }
        }
        frontend.present(&session.snapshot());
    }

    session.shutdown().await;
    Ok(())
}
