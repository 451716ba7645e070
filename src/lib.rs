//! Load-time redirection of JVM virtual call sites
//!
//! A [`redirect::Registry`] lists `(owner, name, descriptor)` methods along with, for each, the
//! runtime receiver types that should be sent to an alternate static method instead. The
//! [`redirect::ClassTransformer`] then takes compiled classes as they are loaded and rewrites
//! matching `invokevirtual`/`invokeinterface` instructions, either straight to the replacement
//! (when the static receiver type is already known to match) or to a synthesized dispatcher that
//! tests the receiver at runtime and falls back to the original call.

pub mod jvm;
pub mod redirect;
mod util;
