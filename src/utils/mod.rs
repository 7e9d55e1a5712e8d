//! Support code for the experiment binaries.
//!
//! - **`perf`**: peak resident set size and wall-clock measurement, used by the
//!   `scalability` runner to compare the Arnoldi and Lanczos variants.

pub mod perf;
