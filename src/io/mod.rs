//! Input/output helpers.
//!
//! - raw extract access, plain or zipped (`source`)
//! - field normalization (`ingest`)
//! - aggregate JSON read/write (`store`)

pub mod ingest;
pub mod source;
pub mod store;

pub use ingest::*;
pub use source::*;
pub use store::*;
