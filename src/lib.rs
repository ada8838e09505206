pub mod board;
pub mod cellset;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod registry;
pub mod roster;
pub mod session;
pub mod ship;
pub mod simulation;
pub mod transport;

pub use board::{BoardModel, BoardSnapshot};
pub use cellset::{Cell, CellSet, CellSetError, Grid};
pub use config::*;
pub use discovery::{Discovery, DiscoveryEvent};
pub use engine::{Outbound, Phase, Score, ShotEngine, ShotOutcome, ShotRecord, ShotSnapshot};
pub use error::{PlacementError, ShotError};
pub use logging::init_logging;
pub use protocol::{AckMessage, Message, ProtocolError};
pub use registry::{Participant, Registry};
pub use roster::{render_roster, RosterPublisher, RosterView};
pub use session::{resolve_local_ip, run, Flow, Frontend, Intent, Session, SessionSnapshot};
pub use ship::{Orientation, Placement, ShipId, ShipType};
pub use simulation::{simulate, SimReport};
pub use transport::in_memory::InMemoryNetwork;
pub use transport::tcp::TcpAckChannel;
pub use transport::udp::UdpTransport;
pub use transport::{AckChannel, DatagramTransport};
