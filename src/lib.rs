// src/lib.rs

pub mod config;
pub mod counters;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod privacy;
pub mod routes;
pub mod sse;
pub mod state;
pub mod utils;

// Re-export specific items for convenience if needed
pub use routes::create_router;
