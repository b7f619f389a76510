//! Wire and data types for the assetlane catalog upload protocol.
//!
//! Everything here is plain data: linked accounts, bearer tokens, the JSON
//! payloads exchanged with the platform, the configurable upload-initiation
//! candidates and the category lookup table. No I/O happens in this crate.

pub mod candidate;
pub mod category;
pub mod messages;
pub mod types;

pub use candidate::{Acceptance, EndpointCandidate};
pub use category::{CategoryMap, CategoryMapError};
pub use types::{
    AccountStatus, BearerToken, Credentials, FileDescriptor, LinkedAccount, Profile,
    TransferTarget,
};
