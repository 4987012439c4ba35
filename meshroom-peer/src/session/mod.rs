mod session;
mod session_command;
mod session_handle;
mod snapshot;

pub use session::Session;
pub(crate) use session_command::SessionCommand;
pub use session_handle::SessionHandle;
pub use snapshot::{Notice, NoticeKind, Phase, Role, RoomSnapshot, SessionEvent};
