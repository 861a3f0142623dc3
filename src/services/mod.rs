// src/services/mod.rs
pub mod calculations;
pub mod fallback;
pub mod history;
pub mod orchestrator;
pub mod predictions;
pub mod registry;
pub mod scoring;
pub mod sources;
pub mod store;
pub mod topics;
pub mod velocity;
