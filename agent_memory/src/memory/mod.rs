//! Per-user memory on top of the store
//!
//! Lets an agent remember facts about a user across conversational sessions

pub mod user_memory;

pub use user_memory::{UserMemory, MEMORIES_ROOT};
