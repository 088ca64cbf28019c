// src/services/mod.rs
pub mod cache;
pub mod calculator;
pub mod fetcher;
pub mod format;
pub mod heatmap;
pub mod market;
pub mod parsers;
pub mod returns;
pub mod stats;
