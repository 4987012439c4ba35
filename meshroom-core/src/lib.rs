mod display_name;
mod invite;
mod membership;
mod model;

pub use display_name::random_display_name;
pub use invite::{InviteError, ROOM_QUERY_PARAM, invite_link, parse_invite};
pub use membership::Membership;
pub use model::*;
