//! Reading and writing JVM class files
//!
//! The class file model is deliberately shallow: only the pieces that call site redirection
//! touches (constants, method code, stack map frames) are decoded, and everything else is kept
//! as raw bytes so that it round-trips unchanged.

mod access_flags;
mod binary_format;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
mod names;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
