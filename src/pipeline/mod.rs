//! Image → caption → story → speech pipeline.

pub mod coordinator;
pub mod messages;
