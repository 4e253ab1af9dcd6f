//! Data structures for availability files.
//!
//! This module contains pure data structures describing how common each
//! chassis and model is per era. All structs are designed to be
//! deserialized from RON files.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `forcegen_tools`.

mod availability_data;

pub use availability_data::{AvailabilityData, ChassisAvailability, EraData, ModelAvailability};
