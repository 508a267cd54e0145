//! `fioul-stats` library crate.
//!
//! Weighted heating-fuel statistics over INSEE "Logement" census extracts.
//! The binary (`fioul`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - the store and report modules can be reused by other front-ends

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
