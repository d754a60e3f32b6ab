//! Wire framing, byte order, and message-number packing (§4.1).

pub mod body;
pub mod header;
pub mod message;

pub use body::{type_code, Body, ParamKind};
pub use header::{full_message_number, pack_message_number, Direction, Header, HEADER_LEN};
pub use message::Message;
