mod connection_wrapper;
mod link_registry;
mod rendezvous_client;
mod rtc_transport;

pub use rtc_transport::RtcTransport;
