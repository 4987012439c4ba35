
pub use ws_client::*;
