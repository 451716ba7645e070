//! Redirection of virtual call sites to static replacements
//!
//! Populate a [`Registry`] (directly or with [`load_registrations`]), then hand out a shared
//! [`ClassTransformer`] to whatever loads classes.

mod config;
mod errors;
mod registry;
mod rewriter;
mod settings;
mod synthesizer;
mod transformer;

pub use config::*;
pub use errors::*;
pub use registry::*;
pub use rewriter::*;
pub use settings::*;
pub use synthesizer::*;
pub use transformer::*;
