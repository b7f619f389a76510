//! Upload orchestration engine.
//!
//! Turns a local package into a sellable catalog item on behalf of a
//! linked account. The engine is a library with no UI dependencies: the
//! caller supplies a [`PlatformApi`] (normally the reqwest-backed
//! `assetlane_platform::Client`) and a read-only [`AccountStore`].
//!
//! # Pipeline
//!
//! 1. **Prepare**: look up the account, resolve the category,
//!    re-authenticate and discover a transfer target by trying the
//!    configured candidate endpoints in order
//! 2. **Transfer**: the caller `PUT`s the bytes straight to storage
//! 3. **Finalize**: link the transferred file to an asset (with one
//!    create-asset fallback), trigger the build, create the item
//!
//! Each attempt is an [`UploadSession`] whose state only moves forward.

pub mod account;
pub mod auth;
pub mod engine;
pub mod error;
pub mod finalize;
pub mod platform;
pub mod scanner;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

// Re-export primary types for convenience.
pub use account::{AccountStore, AccountStoreError, StaticAccountStore};
pub use auth::{AuthenticationClient, LoginOutcome};
pub use engine::{EngineSettings, UploadEngine};
pub use error::UploadError;
pub use finalize::{BuildPollSettings, FinalizePipeline, FinalizeSettings};
pub use platform::{BoxFuture, PlatformApi};
pub use scanner::EndpointScanner;
pub use session::{FinalizeRequest, SessionState, UploadSession, UploadTicket};
pub use types::{AccountCheck, FinalizeOutcome, PublishedItem, UploadEvent};
