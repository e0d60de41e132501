//! In-memory key registry client for field-level encryption.
//!
//! Stores key encryption keys (KEKs) and data encryption keys (DEKs) the way
//! the registry service would, without any network I/O:
//!
//! - registration is idempotent (the first write wins)
//! - soft-deleted records are only returned to requests that ask for them
//! - DEK version "-1" resolves to the highest registered version
//!
//! ```
//! use dek_registry::{DekClient, MockDekRegistryClient, LATEST_VERSION};
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let mut cli = MockDekRegistryClient::default();
//!     cli.register_dek("kek1", "sub1", "AES256", 1, Some("Zm9v")).await.unwrap();
//!     cli.register_dek("kek1", "sub1", "AES256", 2, None).await.unwrap();
//!
//!     let dek = cli
//!         .get_dek("kek1", "sub1", "AES256", LATEST_VERSION, false)
//!         .await
//!         .unwrap();
//!     assert_eq!(dek.version, 2);
//! });
//! ```

pub mod cache_key;
pub mod client;
pub mod config;
pub mod constants;
pub mod dek;
pub mod errors;
pub mod kek;
pub mod mock;

pub use crate::{
    client::DekClient,
    config::ClientConfig,
    constants::{DEFAULT_DEK_VERSION, LATEST_VERSION, MOCK_TS},
    dek::Dek,
    errors::{Error, Result},
    kek::Kek,
    mock::MockDekRegistryClient,
};
