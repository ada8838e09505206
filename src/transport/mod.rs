//! Transports underneath the discovery and acknowledgment channels.
//!
//! Both traits are polled from the single control loop, so every method must
//! return without waiting on the network.

use std::net::{IpAddr, SocketAddr};

use crate::protocol::AckMessage;

pub mod in_memory;
pub mod tcp;
pub mod udp;

/// One received datagram, source included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub source: SocketAddr,
    pub payload: Vec<u8>,
}

/// One received acknowledgment connection, still undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundAck {
    pub source: SocketAddr,
    pub text: String,
}

/// Connectionless, broadcast-capable, unreliable transport.
pub trait DatagramTransport: Send {
    /// Queue one datagram for `target`, which may be a broadcast address.
    fn send_to(&mut self, payload: &[u8], target: SocketAddr) -> anyhow::Result<()>;

    /// Next pending datagram, or `Ok(None)` immediately when there is none.
    fn try_recv(&mut self) -> anyhow::Result<Option<Datagram>>;
}

/// Reliable point-to-point delivery of hit/destroyed confirmations.
pub trait AckChannel: Send {
    /// Start delivering `msg` to `target`. Failures that happen after this
    /// returns are logged by the channel, never reported back.
    fn send(&mut self, target: IpAddr, msg: AckMessage) -> anyhow::Result<()>;

    /// Next fully received acknowledgment, or `Ok(None)` immediately.
    fn try_recv(&mut self) -> anyhow::Result<Option<InboundAck>>;
}
