//! Route handlers

pub mod health;
pub mod reactions;
pub mod reports;
