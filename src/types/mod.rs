//! Data types for `RadioRA` entities.
//!
//! This module contains the core data structures used throughout the library:
//! - Output identifiers
//! - Status events
//! - Set-level parameters

pub mod output;

pub use output::{OutputId, SetLevel, StatusEvent};
