//! Common functionality shared across modules

pub mod traits;
