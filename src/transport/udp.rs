use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use anyhow::Context;
use log::{debug, info};

use crate::config::{DATAGRAM_BUFFER, ROUTE_PROBE};
use crate::transport::{Datagram, DatagramTransport};

/// Non-blocking UDP socket with broadcast enabled.
pub struct UdpTransport {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpTransport {
    pub fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let socket =
            UdpSocket::bind(addr).with_context(|| format!("binding discovery socket on {}", addr))?;
        socket
            .set_broadcast(true)
            .context("enabling SO_BROADCAST on discovery socket")?;
        socket
            .set_nonblocking(true)
            .context("switching discovery socket to non-blocking")?;
        info!("discovery socket bound to {}", socket.local_addr()?);
        Ok(Self {
            socket,
            buf: vec![0u8; DATAGRAM_BUFFER],
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl DatagramTransport for UdpTransport {
    fn send_to(&mut self, payload: &[u8], target: SocketAddr) -> anyhow::Result<()> {
        self.socket
            .send_to(payload, target)
            .with_context(|| format!("sending {} bytes to {}", payload.len(), target))?;
        Ok(())
    }

    fn try_recv(&mut self) -> anyhow::Result<Option<Datagram>> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((len, source)) => Ok(Some(Datagram {
                source,
                payload: self.buf[..len].to_vec(),
            })),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            // ICMP port-unreachable from an earlier send surfaces here on some stacks.
            Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                debug!("ignoring connection reset on discovery socket");
                Ok(None)
            }
            Err(e) => Err(e).context("receiving on discovery socket"),
        }
    }
}

/// Ask the OS which local address routes toward [`ROUTE_PROBE`]. Connecting
/// a datagram socket selects a route without sending anything.
pub fn detect_local_ip() -> anyhow::Result<IpAddr> {
    let probe = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
        .context("binding route probe socket")?;
    probe
        .connect(ROUTE_PROBE)
        .with_context(|| format!("no route toward {}", ROUTE_PROBE))?;
    Ok(probe.local_addr()?.ip())
}
