mod connection;
mod link;
mod memory;
mod rtc;
mod transport_config;
mod transport_event;

pub use connection::*;
pub use link::*;
pub use memory::*;
pub use rtc::RtcTransport;
pub use transport_config::*;
pub use transport_event::*;
