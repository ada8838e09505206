use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};

use anyhow::Context;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::time::{timeout, Duration, Instant};

use crate::config::ACK_READ_BUFFER;
use crate::protocol::AckMessage;
use crate::transport::{AckChannel, InboundAck};

/// An accepted connection whose payload has not fully arrived yet.
struct PendingRead {
    stream: TcpStream,
    peer: SocketAddr,
    buf: Vec<u8>,
    accepted_at: Instant,
}

enum ReadState {
    Waiting,
    Done,
    Failed(std::io::Error),
}

impl PendingRead {
    /// Drain whatever has arrived. A connection carries exactly one message,
    /// terminated by the sender closing its half or by the buffer filling up.
    fn pump(&mut self) -> ReadState {
        let mut chunk = [0u8; ACK_READ_BUFFER];
        loop {
            let room = ACK_READ_BUFFER - self.buf.len();
            if room == 0 {
                return ReadState::Done;
            }
            match self.stream.read(&mut chunk[..room]) {
                Ok(0) => return ReadState::Done,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return ReadState::Waiting,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return ReadState::Failed(e),
            }
        }
    }

    fn finish(self) -> InboundAck {
        InboundAck {
            source: self.peer,
            text: String::from_utf8_lossy(&self.buf).trim().to_string(),
        }
    }
}

/// Acknowledgment channel over short-lived TCP connections: one connection
/// per message, accepted and read without ever blocking the caller.
pub struct TcpAckChannel {
    listener: TcpListener,
    peer_port: u16,
    connect_timeout: Duration,
    pending: Vec<PendingRead>,
    ready: VecDeque<InboundAck>,
}

impl TcpAckChannel {
    /// Listen on `addr`; outgoing acks go to `peer_port` on the target host.
    pub fn bind(addr: SocketAddr, peer_port: u16, connect_timeout: Duration) -> anyhow::Result<Self> {
        let listener =
            TcpListener::bind(addr).with_context(|| format!("binding ack listener on {}", addr))?;
        listener
            .set_nonblocking(true)
            .context("switching ack listener to non-blocking")?;
        info!("ack listener bound to {}", listener.local_addr()?);
        Ok(Self {
            listener,
            peer_port,
            connect_timeout,
            pending: Vec::new(),
            ready: VecDeque::new(),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    fn accept_one(&mut self) -> anyhow::Result<()> {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                stream
                    .set_nonblocking(true)
                    .with_context(|| format!("switching ack stream from {} to non-blocking", peer))?;
                debug!("accepted ack connection from {}", peer);
                self.pending.push(PendingRead {
                    stream,
                    peer,
                    buf: Vec::with_capacity(16),
                    accepted_at: Instant::now(),
                });
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e).context("accepting ack connection"),
        }
    }

    fn pump_pending(&mut self) {
        let stale_after = self.connect_timeout;
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut read in self.pending.drain(..) {
            match read.pump() {
                ReadState::Done => self.ready.push_back(read.finish()),
                ReadState::Failed(e) => warn!("dropping ack from {}: {}", read.peer, e),
                ReadState::Waiting if read.accepted_at.elapsed() > stale_after => {
                    if read.buf.is_empty() {
                        warn!("ack connection from {} sent nothing, dropping", read.peer);
                    } else {
                        self.ready.push_back(read.finish());
                    }
                }
                ReadState::Waiting => still_pending.push(read),
            }
        }
        self.pending = still_pending;
    }
}

impl AckChannel for TcpAckChannel {
    fn send(&mut self, target: IpAddr, msg: AckMessage) -> anyhow::Result<()> {
        let handle = Handle::try_current().context("ack delivery needs a tokio runtime")?;
        let addr = SocketAddr::new(target, self.peer_port);
        let connect_timeout = self.connect_timeout;
        handle.spawn(async move {
            match send_message(addr, msg.as_str(), connect_timeout).await {
                Ok(()) => debug!("delivered {} to {}", msg, addr),
                Err(e) => warn!("could not deliver {} to {}: {:#}", msg, addr, e),
            }
        });
        Ok(())
    }

    fn try_recv(&mut self) -> anyhow::Result<Option<InboundAck>> {
        // Connections already accepted keep draining while accept fails
        // (for example when out of file descriptors).
        if let Err(e) = self.accept_one() {
            warn!("{:#}", e);
        }
        self.pump_pending();
        Ok(self.ready.pop_front())
    }
}

/// Open a connection to `addr`, write `text`, close. The connect step is
/// bounded by `connect_timeout` so a dead peer costs at most that long.
pub async fn send_message(addr: SocketAddr, text: &str, connect_timeout: Duration) -> anyhow::Result<()> {
    let mut stream = timeout(connect_timeout, tokio::net::TcpStream::connect(addr))
        .await
        .map_err(|_| anyhow::anyhow!("connect to {} timed out after {:?}", addr, connect_timeout))?
        .with_context(|| format!("connecting to {}", addr))?;
    stream
        .write_all(text.as_bytes())
        .await
        .with_context(|| format!("writing to {}", addr))?;
    stream.shutdown().await.ok();
    Ok(())
}
