//! Core types, config, and errors for Amar Shastho.

pub mod config;
pub mod error;
pub mod types;
