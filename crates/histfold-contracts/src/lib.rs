pub mod events;
pub mod history;
pub mod names;
pub mod request;
