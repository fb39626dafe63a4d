//! Reply state management
//!
//! Reply lists are driven by a tagged action enum and a pure reducer; every
//! optimistic change goes through [`OptimisticMutation`].

pub mod optimistic;
pub mod reducer;
pub mod service;
pub mod store;

pub use optimistic::OptimisticMutation;
pub use reducer::{reduce, ReplyAction, ReplyState};
pub use service::ReplyService;
pub use store::ReducerStore;
