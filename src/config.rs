//! Constants, the ship catalog and runtime session configuration.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::ship::ShipType;

pub const GRID_SIZE: usize = 10;
pub const NUM_SHIPS: usize = 4;
pub const SHIPS: [ShipType; NUM_SHIPS] = [
    ShipType::new("carrier", "Aircraft Carrier", 5, (214, 118, 62)),
    ShipType::new("bomber", "Bomber", 4, (92, 168, 112)),
    ShipType::new("submarine", "Submarine", 3, (110, 132, 214)),
    ShipType::new("patrol", "Patrol Boat", 2, (204, 184, 86)),
];

/// Well-known port of the discovery (datagram) channel.
pub const DEFAULT_UDP_PORT: u16 = 5000;
/// Well-known port of the acknowledgment (stream) channel.
pub const DEFAULT_ACK_PORT: u16 = 5001;
pub const DEFAULT_BROADCAST: IpAddr = IpAddr::V4(Ipv4Addr::BROADCAST);

/// External address used only to ask the OS which interface routes outward.
/// Nothing is ever sent to it.
pub const ROUTE_PROBE: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80);

pub const COUNTDOWN_SECS: f32 = 10.0;
/// Self plus at least one peer.
pub const MIN_ACTIVE_PLAYERS: usize = 2;
pub const ACK_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
pub const ACK_READ_BUFFER: usize = 1024;
pub const DATAGRAM_BUFFER: usize = 1024;
pub const ROSTER_JOIN_TIMEOUT: Duration = Duration::from_secs(1);
pub const RANDOMIZE_ATTEMPTS: u32 = 5000;
pub const FRAME_RATE: u32 = 60;

/// Runtime settings for one peer. Every field has a default, so a JSON file
/// only needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub udp_port: u16,
    pub ack_port: u16,
    pub broadcast_addr: IpAddr,
    /// Skips outbound-route detection when set.
    pub local_ip: Option<IpAddr>,
    pub countdown_secs: f32,
    pub ack_timeout_ms: u64,
    pub frame_rate: u32,
    pub roster_view: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            udp_port: DEFAULT_UDP_PORT,
            ack_port: DEFAULT_ACK_PORT,
            broadcast_addr: DEFAULT_BROADCAST,
            local_ip: None,
            countdown_secs: COUNTDOWN_SECS,
            ack_timeout_ms: ACK_CONNECT_TIMEOUT.as_millis() as u64,
            frame_rate: FRAME_RATE,
            roster_view: true,
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}
