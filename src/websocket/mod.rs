pub mod handler;
pub mod msg_change_handler;
pub mod msg_comment_handler;
pub mod msg_cursor_handler;
pub mod msg_join_handler;
pub mod msg_typing_handler;
