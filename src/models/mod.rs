//! Data models for the wine backend.
//!
//! These models define the JSON shapes exchanged with clients.

mod wine;

pub use wine::*;
