//! Real-time session synchronization engine

pub mod action;
pub mod character;
pub mod engine;
pub mod patch;
pub mod session;
pub mod user;

pub use engine::Engine;
pub use session::{Session, SessionCmd, SessionHandle};
pub use user::{User, UserId};
