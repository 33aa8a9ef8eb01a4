mod message;
pub mod tags;

pub use message::{Attachment, Message, MessageId, Role, BLANK_CONTENT};
