// src/handlers/mod.rs
pub mod benchmark;
pub mod error;
pub mod panel;
pub mod stocks;
