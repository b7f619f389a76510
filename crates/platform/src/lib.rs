//! Catalog platform API client.
//!
//! Async `reqwest` client for the platform's JSON endpoints: login,
//! upload-initiation candidates, asset link/create, build trigger and
//! status, and item creation. Every call after login carries the session's
//! bearer token; the client itself holds no per-account state.

pub mod client;
pub mod config;

pub use client::{Client, Error};
pub use config::{ApiPaths, PlatformConfig};
