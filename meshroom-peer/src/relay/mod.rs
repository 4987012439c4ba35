mod fan_out;
mod hub;
mod spoke;

pub use fan_out::{RelayOutcome, fan_out};
