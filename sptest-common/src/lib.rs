//! # Speaking Test Common Library
//!
//! Shared code for every caller of the speaking test record store:
//! - Records-root layout and file naming
//! - Record name, timestamp and student identity parsing
//! - Answer line decoding and scoring
//! - Point scale and record header synthesis/extraction
//! - Class roster lookup
//! - Configuration loading

pub mod config;
pub mod error;
pub mod layout;
pub mod point_scale;
pub mod record;
pub mod roster;
pub mod time;

pub use error::{Error, Result};
pub use point_scale::PointScale;
pub use record::{RecordName, StudentKey};
pub use time::RecordInstant;
