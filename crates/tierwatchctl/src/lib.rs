//! Tierwatch Control - file-backed host adapter for the tierwatch engine.
//!
//! Loads a captured ticket bundle (the equivalents of the five data-source
//! fetches, as one JSON document) and drives the engine against it. All
//! SLA decisions live in the library; this crate only loads, runs, and
//! prints.

pub mod bundle;
pub mod render;
