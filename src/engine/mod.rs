pub mod coordinator;
pub mod messages;
pub mod queue;
