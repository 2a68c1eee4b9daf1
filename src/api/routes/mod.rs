//! API Routes
//!
//! Route handlers organized by functionality.

pub mod health;
pub mod pipes;
pub mod query;
pub mod variables;
