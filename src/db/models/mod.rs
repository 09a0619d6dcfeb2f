//! Database models split into domain-specific modules.

pub mod focus_session;
pub mod task;
pub mod user;

pub use focus_session::*;
pub use task::*;
pub use user::*;
