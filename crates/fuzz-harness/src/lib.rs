//! Orbit Dashboard Fuzz Harness
//!
//! Property-based testing infrastructure shared by the dashboard crates.
//! Provides catalog-shaped generators, a small runner that reports results
//! through `tracing`, and the named targets the `dashboard-fuzz` binary runs.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fuzz_harness::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn continuity(input in bound_input()) {
//!         // ...
//!     }
//! }
//! ```

pub mod generators;
pub mod runner;
pub mod targets;

pub mod prelude {
    pub use crate::generators::*;
    pub use crate::runner::{FuzzConfig, FuzzResult, FuzzRunner};
    pub use proptest::prelude::*;
}

// Re-export proptest for convenience
pub use proptest;
