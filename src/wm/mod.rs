//! Window Manager Module
//!
//! The display-independent window-management core: geometry, clients,
//! containers, layouts, bindings and the model that ties them together.

pub mod binding;
pub mod client;
pub mod client_flags;
pub mod command;
pub mod connection;
pub mod context;
pub mod cycle;
pub mod decoration;
pub mod event;
pub mod geometry;
pub mod hints;
pub mod layout;
pub mod model;
pub mod moveresize;
pub mod placement;
pub mod rules;
pub mod screen;
pub mod selector;
pub mod stacking;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use model::Model;
