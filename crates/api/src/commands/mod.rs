//! Collaborator-facing commands

pub mod replies;
pub mod session;

pub use replies::{create_reply, delete_reply, edit_reply, load_replies};
pub use session::{auth_fetch, get_valid_token, is_authenticated, login, logout, FetchOptions};
