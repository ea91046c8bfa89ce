//! Gait-Core: Foundation types for gait phase processing
//!
//! Trials, column tables, leg identifiers and the shared error type.

pub mod trial;
pub mod table;
pub mod gait_types;
pub mod mapping;
pub mod error;

pub use trial::*;
pub use table::*;
pub use gait_types::*;
pub use mapping::{ChannelMap, ChannelMapping};
pub use error::{GaitError, GaitResult};
