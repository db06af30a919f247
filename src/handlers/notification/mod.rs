pub mod notification;

pub use notification::{
    delete_notification, list_notifications, mark_all_read, mark_read, unread_count,
};
