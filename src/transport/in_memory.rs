//! A process-local network for tests and simulations.
//!
//! Endpoints are registered on a shared [`InMemoryNetwork`]. Datagrams sent to
//! the limited-broadcast address reach every datagram endpoint on the target
//! port, the sender included, the way a real broadcast echoes back. Datagrams
//! to an unregistered address vanish; acks to one are refused.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};

use log::trace;

use crate::protocol::AckMessage;
use crate::transport::{AckChannel, Datagram, DatagramTransport, InboundAck};

#[derive(Default)]
struct Fabric {
    datagrams: HashMap<SocketAddr, VecDeque<Datagram>>,
    acks: HashMap<SocketAddr, VecDeque<InboundAck>>,
}

#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    fabric: Arc<Mutex<Fabric>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Fabric> {
        self.fabric.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a datagram endpoint bound at `local`.
    pub fn datagram_endpoint(&self, local: SocketAddr) -> InMemoryDatagram {
        self.lock().datagrams.entry(local).or_default();
        InMemoryDatagram {
            network: self.clone(),
            local,
        }
    }

    /// Register an ack endpoint listening at `local`; its sends go to
    /// `peer_port` on the target host.
    pub fn ack_endpoint(&self, local: SocketAddr, peer_port: u16) -> InMemoryAck {
        self.lock().acks.entry(local).or_default();
        InMemoryAck {
            network: self.clone(),
            local,
            peer_port,
        }
    }

    /// Inject a datagram as if `source` had sent it to `target`.
    pub fn inject_datagram(&self, source: SocketAddr, target: SocketAddr, payload: &[u8]) {
        if let Some(queue) = self.lock().datagrams.get_mut(&target) {
            queue.push_back(Datagram {
                source,
                payload: payload.to_vec(),
            });
        }
    }

    /// Datagrams waiting at `addr`.
    pub fn pending_datagrams(&self, addr: SocketAddr) -> usize {
        self.lock().datagrams.get(&addr).map_or(0, VecDeque::len)
    }

    /// Remove and return everything queued at `addr`.
    pub fn drain_datagrams(&self, addr: SocketAddr) -> Vec<Datagram> {
        self.lock()
            .datagrams
            .get_mut(&addr)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn drain_acks(&self, addr: SocketAddr) -> Vec<InboundAck> {
        self.lock()
            .acks
            .get_mut(&addr)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }
}

fn is_broadcast(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_broadcast(),
        IpAddr::V6(_) => false,
    }
}

pub struct InMemoryDatagram {
    network: InMemoryNetwork,
    local: SocketAddr,
}

impl InMemoryDatagram {
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

impl DatagramTransport for InMemoryDatagram {
    fn send_to(&mut self, payload: &[u8], target: SocketAddr) -> anyhow::Result<()> {
        let mut fabric = self.network.lock();
        let datagram = Datagram {
            source: self.local,
            payload: payload.to_vec(),
        };
        if is_broadcast(target.ip()) {
            for (addr, queue) in fabric.datagrams.iter_mut() {
                if addr.port() == target.port() {
                    queue.push_back(datagram.clone());
                }
            }
        } else if let Some(queue) = fabric.datagrams.get_mut(&target) {
            queue.push_back(datagram);
        } else {
            trace!("datagram from {} to unbound {} lost", self.local, target);
        }
        Ok(())
    }

    fn try_recv(&mut self) -> anyhow::Result<Option<Datagram>> {
        Ok(self
            .network
            .lock()
            .datagrams
            .get_mut(&self.local)
            .and_then(VecDeque::pop_front))
    }
}

pub struct InMemoryAck {
    network: InMemoryNetwork,
    local: SocketAddr,
    peer_port: u16,
}

impl AckChannel for InMemoryAck {
    fn send(&mut self, target: IpAddr, msg: AckMessage) -> anyhow::Result<()> {
        let addr = SocketAddr::new(target, self.peer_port);
        let mut fabric = self.network.lock();
        let queue = fabric
            .acks
            .get_mut(&addr)
            .ok_or_else(|| anyhow::anyhow!("connection to {} refused", addr))?;
        queue.push_back(InboundAck {
            source: self.local,
            text: msg.as_str().to_string(),
        });
        Ok(())
    }

    fn try_recv(&mut self) -> anyhow::Result<Option<InboundAck>> {
        Ok(self
            .network
            .lock()
            .acks
            .get_mut(&self.local)
            .and_then(VecDeque::pop_front))
    }
}
