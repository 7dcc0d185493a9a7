// src/handlers/mod.rs

pub mod auth;
pub mod follows;
pub mod interaction;
pub mod notifications;
pub mod posts;
pub mod profile;
