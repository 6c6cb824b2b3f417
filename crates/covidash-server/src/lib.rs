//! Web dashboard for local and national covid figures and news, with
//! user-scheduled refreshes.

pub mod api;
pub mod middleware;
pub mod refresh;
pub mod render;
pub mod scheduler;
pub mod store;
