pub use bubbles_shared::protocol::{
    ClientMsg, InitUserMsg, ServerMsg, UserLeftMsg, UserMsg, PROTOCOL_VERSION as CLIENT_PROTOCOL_VERSION,
};
pub use bubbles_shared::user::{UserId, UserState};
