//! Speaking-test record reconciliation
//!
//! Services that complete, de-duplicate and summarize the records of a
//! records root, the live test [`session::Session`], and the run report
//! printed by the `sptest-rr` binary.

pub mod pipeline;
pub mod report;
pub mod services;
pub mod session;

pub use pipeline::{Pipeline, Stages};
pub use report::{CliFormatter, RunReport};
pub use session::Session;
