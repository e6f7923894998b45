#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Umbrella crate for the Authgear platform bridge.
//!
//! Re-exports everything from `authkit-core`; foreign bindings are
//! generated against this crate.

pub use authkit_core::*;
