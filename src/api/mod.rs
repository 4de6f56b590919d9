pub mod extract;
pub mod identity;
pub mod rest;
