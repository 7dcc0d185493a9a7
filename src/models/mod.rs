// src/models/mod.rs

pub mod comment;
pub mod follow;
pub mod like;
pub mod notification;
pub mod post;
pub mod profile;
pub mod user;
