//! Session membership over the datagram transport.
//!
//! [`Discovery`] owns the transport and turns inbound datagrams into registry
//! updates and [`DiscoveryEvent`]s. It never blocks: [`Discovery::poll`]
//! handles at most one datagram per call.

use std::net::{IpAddr, SocketAddr};

use log::{debug, info, warn};

use crate::cellset::Cell;
use crate::protocol::Message;
use crate::registry::Registry;
use crate::transport::DatagramTransport;

/// What one handled datagram meant to the session. `changed` reports whether
/// the registry was actually modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    Joined { peer: IpAddr, changed: bool },
    Left { peer: IpAddr, changed: bool },
    Synced { from: IpAddr, changed: bool },
    Shot { from: IpAddr, cell: Cell },
    Lost(IpAddr),
}

impl DiscoveryEvent {
    /// True for events after which the roster should be republished.
    pub fn membership_changed(&self) -> bool {
        match self {
            DiscoveryEvent::Joined { changed, .. }
            | DiscoveryEvent::Left { changed, .. }
            | DiscoveryEvent::Synced { changed, .. } => *changed,
            DiscoveryEvent::Shot { .. } | DiscoveryEvent::Lost(_) => false,
        }
    }
}

pub struct Discovery {
    transport: Box<dyn DatagramTransport>,
    local_ip: IpAddr,
    port: u16,
    broadcast: IpAddr,
}

impl Discovery {
    pub fn new(
        transport: Box<dyn DatagramTransport>,
        local_ip: IpAddr,
        port: u16,
        broadcast: IpAddr,
    ) -> Self {
        Self {
            transport,
            local_ip,
            port,
            broadcast,
        }
    }

    pub fn local_ip(&self) -> IpAddr {
        self.local_ip
    }

    /// Send a message, logging instead of failing. Returns whether the send
    /// was handed to the transport.
    fn send(&mut self, msg: &Message, target: SocketAddr) -> bool {
        match self.transport.send_to(msg.encode().as_bytes(), target) {
            Ok(()) => true,
            Err(e) => {
                warn!("could not send {:?} to {}: {:#}", msg, target, e);
                false
            }
        }
    }

    fn broadcast_target(&self) -> SocketAddr {
        SocketAddr::new(self.broadcast, self.port)
    }

    pub fn announce_join(&mut self) -> bool {
        info!("announcing join on {}", self.broadcast_target());
        self.send(&Message::Connecting, self.broadcast_target())
    }

    pub fn announce_leave(&mut self) -> bool {
        info!("announcing departure on {}", self.broadcast_target());
        self.send(&Message::Leaving, self.broadcast_target())
    }

    pub fn send_to_peer(&mut self, msg: &Message, peer: IpAddr) -> bool {
        self.send(msg, SocketAddr::new(peer, self.port))
    }

    pub fn send_shot(&mut self, peer: IpAddr, cell: Cell) -> bool {
        debug!("shot at {} -> {}", cell, peer);
        self.send_to_peer(&Message::Shot(cell), peer)
    }

    pub fn send_lost(&mut self, peer: IpAddr) -> bool {
        self.send_to_peer(&Message::Lost, peer)
    }

    /// Handle at most one pending datagram. Returns `None` when nothing was
    /// waiting or the datagram was dropped.
    pub fn poll(&mut self, registry: &mut Registry) -> Option<DiscoveryEvent> {
        let datagram = match self.transport.try_recv() {
            Ok(Some(d)) => d,
            Ok(None) => return None,
            Err(e) => {
                warn!("discovery receive failed: {:#}", e);
                return None;
            }
        };
        let from = datagram.source.ip();
        if from == self.local_ip {
            return None;
        }
        let text = String::from_utf8_lossy(&datagram.payload);
        let msg = match Message::decode(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("dropping datagram from {}: {}", from, e);
                return None;
            }
        };
        Some(self.handle(from, msg, registry))
    }

    fn handle(&mut self, from: IpAddr, msg: Message, registry: &mut Registry) -> DiscoveryEvent {
        match msg {
            Message::Connecting => {
                let changed = registry.upsert_active(from);
                info!("{} joined ({} known)", from, registry.count());
                let reply = Message::Participants(registry.known_addresses());
                self.send_to_peer(&reply, from);
                DiscoveryEvent::Joined {
                    peer: from,
                    changed,
                }
            }
            Message::Leaving => {
                let changed = registry.mark_inactive(from);
                info!("{} left", from);
                DiscoveryEvent::Left {
                    peer: from,
                    changed,
                }
            }
            Message::Participants(addrs) => {
                let mut changed = registry.observe(from);
                for addr in addrs.into_iter().filter(|a| *a != self.local_ip) {
                    changed |= registry.upsert_active(addr);
                }
                debug!("participant list from {}: {} active", from, registry.active_count());
                DiscoveryEvent::Synced { from, changed }
            }
            Message::Shot(cell) => {
                if registry.observe(from) {
                    info!("first contact from {} was a shot", from);
                }
                DiscoveryEvent::Shot { from, cell }
            }
            Message::Lost => {
                registry.observe(from);
                info!("{} has lost all ships", from);
                DiscoveryEvent::Lost(from)
            }
        }
    }
}
