// src/handlers/mod.rs
pub mod error;
pub mod scan;
pub mod targets;
pub mod trends;
