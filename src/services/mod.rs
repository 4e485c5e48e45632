// src/services/mod.rs
pub mod annual_sheet;
pub mod dataset;
pub mod returns;
pub mod rolling;
pub mod stats;
pub mod stooq;
pub mod universe;
