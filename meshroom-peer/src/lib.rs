pub mod config;
pub mod error;
pub mod relay;
pub mod session;
pub mod transport;

pub use config::SessionConfig;
pub use error::{ConnectionError, RelaySendError, SessionError, TransportInitError};
pub use relay::{RelayOutcome, fan_out};
pub use session::{Notice, NoticeKind, Phase, Role, RoomSnapshot, Session, SessionEvent, SessionHandle};
pub use transport::{
    Connection, ConnectionRole, DataLink, MemoryNetwork, MemoryTransport, RtcTransport, Transport,
    TransportConfig, TransportEvent,
};
