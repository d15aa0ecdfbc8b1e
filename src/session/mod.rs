//! Session lifecycle, persistence interface and coordinator

pub mod instance;
pub mod manager;
pub mod repository;

pub use instance::{Session, SessionRoster, SessionStatus};
pub use manager::SessionManager;
pub use repository::{InMemorySessionRepository, SessionRepository};
