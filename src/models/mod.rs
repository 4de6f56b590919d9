pub mod actor;
pub mod delivery;
pub mod donation;
pub mod notification;
