//! Core library components.

pub mod cache;
pub mod discovery;
pub mod domain;
pub mod engine;
pub mod observability;
pub mod stream;
