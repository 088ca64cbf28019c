// src/handlers/mod.rs
pub mod dashboard;
pub mod error;
pub mod view;

pub use dashboard::{Dashboard, DashboardState};
pub use error::{ActionError, Notice};
