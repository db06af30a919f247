pub mod chat;
pub mod participants;

pub use chat::{create_chat, delete_chat, get_chat, list_chats, update_chat};
pub use participants::{add_participant, remove_participant};
