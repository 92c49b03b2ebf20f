// src/utils/mod.rs

//! Utility functions and helpers.

pub mod hash;
pub mod http;
pub mod log;
