//! # Force Generator Tools
//!
//! Everything that touches the filesystem lives here:
//! - RON data loading
//! - Data validation
//! - Serializable reports for the `forcegen` command line

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod data_loader;
pub mod report;
pub mod validate;
