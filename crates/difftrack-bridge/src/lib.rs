//! External state bridge for difftrack.
//!
//! The diff engine owns versioned state; the rest of the application reads a
//! plain "current value" registry. This crate is the one-way link between
//! them: when a tracked key's computed state changes, the bridge writes it
//! into the registry and hands the raw new state to the key's setter, if one
//! was supplied. It never calls back into the engine.
//!
//! # Modules
//!
//! - [`registry`] - The [`StateRegistry`] trait and [`InMemoryStateRegistry`]
//! - [`bridge`] - [`ExternalStateBridge`], [`Propagation`] and [`Delivery`]

pub mod bridge;
pub mod registry;

pub use bridge::{Delivery, ExternalStateBridge, Propagation, StateSetter};
pub use registry::{InMemoryStateRegistry, StateRegistry};
