//! Aggregation stages.
//!
//! Responsibilities:
//!
//! - keep only rows heated with the target fuel
//! - compute the weighted cross-tabulations of one survey year
//! - count rows per fuel code (unweighted census)

pub mod census;
pub mod filter;
pub mod weighted;

pub use census::*;
pub use filter::*;
pub use weighted::*;
