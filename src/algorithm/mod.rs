//! Algorithm implementations
//!
//! Case identification and control matching for nested case-control studies.

pub mod matching;
