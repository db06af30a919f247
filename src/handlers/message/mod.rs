pub mod message;

pub use message::{delete_message, edit_message, list_messages, send_message};
