#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Platform bridge for Authgear clients.
//!
//! Exposes three authentication-adjacent capabilities to a host
//! application: biometric-gated RSA signing keys with compact JWT
//! assertions bound to them ([`key_manager`], [`assertion`]), a small
//! secret store ([`secret_store`]), and OS web-authentication sessions
//! ([`web_auth`]). All OS-mediated operations sit behind the traits in
//! [`platform`]; [`bridge::AuthKitBridge`] is the entry point.

pub mod assertion;
pub mod biometric;
pub mod bridge;

mod capabilities;
pub use capabilities::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

pub mod jwk;
pub mod key_manager;
pub mod logger;
pub mod platform;
pub mod secret_store;
pub mod web_auth;

uniffi::setup_scaffolding!("authkit_core");
