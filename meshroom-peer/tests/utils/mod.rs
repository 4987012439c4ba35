pub mod fake_hub;
pub mod session_helpers;

pub use fake_hub::*;
pub use scripted_transport::*;
pub use session_helpers::*;
