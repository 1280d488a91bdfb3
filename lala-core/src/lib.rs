//! # lala-core
//!
//! Core types shared by the lala platform client crates.
//!
//! - **Config**: identity provider and API settings, loaded from `LALA_*` variables
//! - **Storage**: the [`KeyValueStore`] abstraction with memory and file backends
//! - **Clock**: injectable time source for token freshness checks
//! - **Errors**: configuration and storage error types
//!
//! ## Example
//!
//! ```rust
//! use lala_core::{AuthConfig, KeyValueStore, MemoryStore};
//!
//! let config = AuthConfig::new(
//!     "https://lala.auth.us-east-1.amazoncognito.com/",
//!     "client-id",
//!     "http://localhost:5173",
//! );
//! assert_eq!(config.hosted_domain, "lala.auth.us-east-1.amazoncognito.com");
//! assert_eq!(config.redirect_uri, "http://localhost:5173/");
//!
//! let store = MemoryStore::new();
//! store.set("id_token", "eyJ...").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod errors;
pub mod storage;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use config::{AuthConfig, ClientConfig, HostedUiEndpoints};
pub use errors::{ConfigError, LalaError, MissingSettings, StorageError, StorageResult};
pub use storage::{FileStore, KeyValueStore, MemoryStore, SharedStore};

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::{AuthConfig, ClientConfig, HostedUiEndpoints};
    pub use crate::errors::{ConfigError, LalaError, StorageError};
    pub use crate::storage::{FileStore, KeyValueStore, MemoryStore};
}
