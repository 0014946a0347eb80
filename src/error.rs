//! Error handling for metazip operations
//!
//! This module re-exports the error type used throughout the codecs. It is
//! built with thiserror; `std::io::Error` converts into it with `?`.

pub use crate::common::MetazipError;
pub use crate::common::Result;
