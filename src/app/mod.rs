//! Application assembly
//!
//! Modules collect registrations; [`AppBuilder::build`] runs them phase by
//! phase and returns an [`App`] that owns the container and lifecycle.

mod application;
mod builder;
mod module;
mod scope;

pub use application::App;
pub use builder::AppBuilder;
pub use module::Module;
pub use scope::Scope;
